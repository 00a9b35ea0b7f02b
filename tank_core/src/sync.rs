//! Bidirectional synchronization with the remote key/path store.
//!
//! Outbound writes are independent and non-transactional; a failed write is reported and
//! never rolls back local state. Inbound updates arrive on the transport's context, are
//! parsed there and handed to the control cycle through an `OverrideInbox`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use tank_traits::{RemoteStore, StreamEvent};

use crate::error::TankError;
use crate::hw_error::map_remote_error;
use crate::inbox::{
    EMPTY_LEVEL, FULL_LEVEL, MOTOR_STAT, OverrideInbox, PERCENT, RemoteOverride, SUBSCRIBED,
    WATER_LEVEL, unquote,
};
use crate::level::Calibration;
use crate::pump::PumpState;

// last_motor: 0 until the first motorStat write
const MOTOR_FALSE: u8 = 1;
const MOTOR_TRUE: u8 = 2;

/// What one cycle publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub level: i32,
    pub percent: u8,
    pub pump: PumpState,
}

/// Outcome of a batch of independent writes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub written: usize,
    pub failed: Vec<(&'static str, TankError)>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, path: &'static str, res: Result<(), TankError>) {
        match res {
            Ok(()) => self.written += 1,
            Err(e) => {
                tracing::warn!(path, error = %e, "remote write failed");
                self.failed.push((path, e));
            }
        }
    }
}

/// State shared with the stream callback.
#[derive(Default)]
struct Shared {
    last_motor: AtomicU8,
    stream_timeouts: AtomicU64,
    rejected: AtomicU64,
    heal_calibration: AtomicBool,
}

pub struct SyncBridge<St: RemoteStore> {
    store: St,
    base: String,
    timeout: Duration,
    shared: Arc<Shared>,
    subscribed: bool,
}

impl<St: RemoteStore> SyncBridge<St> {
    pub fn new(store: St, base_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            base: base_path.into(),
            timeout,
            shared: Arc::new(Shared::default()),
            subscribed: false,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base
    }

    fn path(&self, child: &str) -> String {
        format!("{}{child}", self.base)
    }

    fn set_int(&mut self, child: &str, value: i64) -> Result<(), TankError> {
        let path = self.path(child);
        self.store
            .set_int(&path, value, self.timeout)
            .map_err(|e| map_remote_error(&*e))
    }

    fn set_motor(&mut self, state: PumpState) -> Result<(), TankError> {
        let stat = state.motor_stat();
        // recorded before the write so a synchronous echo is recognized
        self.shared.last_motor.store(
            if stat { MOTOR_TRUE } else { MOTOR_FALSE },
            Ordering::SeqCst,
        );
        let path = self.path(MOTOR_STAT);
        self.store
            .set_bool(&path, stat, self.timeout)
            .map_err(|e| map_remote_error(&*e))
    }

    /// Per-cycle snapshot: `waterLevel`, `percent`, `motorStat`.
    pub fn publish(&mut self, snap: &Snapshot) -> PublishReport {
        let mut report = PublishReport::default();
        let res = self.set_int(WATER_LEVEL, i64::from(snap.level));
        report.record(WATER_LEVEL, res);
        let res = self.set_int(PERCENT, i64::from(snap.percent));
        report.record(PERCENT, res);
        let res = self.set_motor(snap.pump);
        report.record(MOTOR_STAT, res);
        report
    }

    /// Single `motorStat` write after a transition.
    pub fn publish_motor(&mut self, state: PumpState) -> Result<(), TankError> {
        self.set_motor(state).inspect_err(|e| {
            tracing::warn!(path = MOTOR_STAT, error = %e, "remote write failed");
        })
    }

    /// `tankEmptyLevel` and `tankFullLevel`.
    pub fn publish_calibration(&mut self, cal: &Calibration) -> PublishReport {
        let mut report = PublishReport::default();
        let res = self.set_int(EMPTY_LEVEL, i64::from(cal.empty_level()));
        report.record(EMPTY_LEVEL, res);
        let res = self.set_int(FULL_LEVEL, i64::from(cal.full_level()));
        report.record(FULL_LEVEL, res);
        report
    }

    /// Start the inbound stream. Established once; later calls are no-ops.
    pub fn subscribe(&mut self, inbox: OverrideInbox) -> Result<(), TankError> {
        if self.subscribed {
            return Ok(());
        }
        let shared = Arc::clone(&self.shared);
        let sink = Box::new(move |ev: StreamEvent| handle_event(&shared, &inbox, ev));
        self.store
            .subscribe(&self.base, &SUBSCRIBED, sink)
            .map_err(|e| map_remote_error(&*e))?;
        self.subscribed = true;
        tracing::info!(base = %self.base, "remote stream subscribed");
        Ok(())
    }

    /// True once after an inbound calibration value was rejected.
    pub fn take_calibration_heal(&self) -> bool {
        self.shared.heal_calibration.swap(false, Ordering::SeqCst)
    }

    pub fn stream_timeouts(&self) -> u64 {
        self.shared.stream_timeouts.load(Ordering::Relaxed)
    }

    /// Inbound values dropped as unparseable.
    pub fn rejected(&self) -> u64 {
        self.shared.rejected.load(Ordering::Relaxed)
    }
}

fn handle_event(shared: &Shared, inbox: &OverrideInbox, ev: StreamEvent) {
    let (path, value) = match ev {
        StreamEvent::Timeout => {
            let n = shared.stream_timeouts.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(count = n, "remote stream timeout");
            return;
        }
        StreamEvent::Data { path, value } => (path, value),
    };

    if path == MOTOR_STAT && is_own_motor_echo(shared, &value) {
        tracing::trace!(value = %value, "ignoring motorStat echo");
        return;
    }

    match RemoteOverride::parse(&path, &value) {
        Ok(Some(o)) => {
            tracing::debug!(path = %path, value = %value, ?o, "remote override queued");
            inbox.push(o);
        }
        Ok(None) => {}
        Err(e) => {
            shared.rejected.fetch_add(1, Ordering::Relaxed);
            shared.heal_calibration.store(true, Ordering::SeqCst);
            tracing::warn!(path = %path, error = %e, "remote override rejected");
        }
    }
}

fn is_own_motor_echo(shared: &Shared, value: &str) -> bool {
    let last = shared.last_motor.load(Ordering::SeqCst);
    match unquote(value) {
        "true" => last == MOTOR_TRUE,
        "false" => last == MOTOR_FALSE,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tank_traits::{BoxError, StreamSink};

    #[derive(Default, Clone)]
    struct Loopback {
        writes: Arc<Mutex<Vec<(String, String)>>>,
        sinks: Arc<Mutex<Vec<StreamSink>>>,
        fail_on: Option<&'static str>,
    }

    impl Loopback {
        fn deliver(&self, ev: StreamEvent) {
            for s in self.sinks.lock().unwrap().iter_mut() {
                s(ev.clone());
            }
        }
        fn write(&mut self, path: &str, v: String) -> Result<(), BoxError> {
            if self.fail_on.is_some_and(|f| path.ends_with(f)) {
                return Err("link down".into());
            }
            self.writes.lock().unwrap().push((path.to_string(), v.clone()));
            let child = path.trim_start_matches("/Test").to_string();
            self.deliver(StreamEvent::Data { path: child, value: v });
            Ok(())
        }
    }

    impl RemoteStore for Loopback {
        fn set_bool(&mut self, path: &str, value: bool, _t: Duration) -> Result<(), BoxError> {
            self.write(path, value.to_string())
        }
        fn set_int(&mut self, path: &str, value: i64, _t: Duration) -> Result<(), BoxError> {
            self.write(path, value.to_string())
        }
        fn subscribe(&mut self, _b: &str, _c: &[&str], sink: StreamSink) -> Result<(), BoxError> {
            self.sinks.lock().unwrap().push(sink);
            Ok(())
        }
    }

    fn bridge(store: Loopback) -> (SyncBridge<Loopback>, OverrideInbox) {
        let inbox = OverrideInbox::new();
        let mut b = SyncBridge::new(store, "/Test", Duration::from_millis(100));
        b.subscribe(inbox.clone()).unwrap();
        (b, inbox)
    }

    #[test]
    fn snapshot_writes_three_paths() {
        let store = Loopback::default();
        let (mut b, _inbox) = bridge(store.clone());
        let report = b.publish(&Snapshot {
            level: 40,
            percent: 53,
            pump: PumpState::On,
        });
        assert!(report.is_complete());
        assert_eq!(report.written, 3);
        let writes = store.writes.lock().unwrap().clone();
        assert_eq!(
            writes,
            vec![
                ("/Test/waterLevel".into(), "40".into()),
                ("/Test/percent".into(), "53".into()),
                ("/Test/motorStat".into(), "false".into()),
            ]
        );
    }

    #[test]
    fn own_motor_writes_do_not_come_back_as_stop() {
        let store = Loopback::default();
        let (mut b, inbox) = bridge(store);
        b.publish_motor(PumpState::On).unwrap();
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn foreign_motor_value_is_a_stop() {
        let store = Loopback::default();
        let (mut b, inbox) = bridge(store.clone());
        b.publish_motor(PumpState::On).unwrap();
        store.deliver(StreamEvent::Data {
            path: MOTOR_STAT.into(),
            value: "off".into(),
        });
        assert!(inbox.drain().stop);
    }

    #[test]
    fn partial_failure_is_reported_not_fatal() {
        let store = Loopback {
            fail_on: Some(PERCENT),
            ..Loopback::default()
        };
        let (mut b, _inbox) = bridge(store);
        let report = b.publish(&Snapshot {
            level: 10,
            percent: 95,
            pump: PumpState::Off,
        });
        assert_eq!(report.written, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PERCENT);
    }

    #[test]
    fn bad_calibration_value_requests_heal() {
        let store = Loopback::default();
        let (b, inbox) = bridge(store.clone());
        store.deliver(StreamEvent::Data {
            path: FULL_LEVEL.into(),
            value: "ten".into(),
        });
        assert!(inbox.drain().is_empty());
        assert_eq!(b.rejected(), 1);
        assert!(b.take_calibration_heal());
        assert!(!b.take_calibration_heal());
    }

    #[test]
    fn stream_timeouts_are_counted() {
        let store = Loopback::default();
        let (b, _inbox) = bridge(store.clone());
        store.deliver(StreamEvent::Timeout);
        store.deliver(StreamEvent::Timeout);
        assert_eq!(b.stream_timeouts(), 2);
    }
}
