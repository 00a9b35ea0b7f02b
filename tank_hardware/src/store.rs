//! In-memory stand-in for the remote key/path store.
//!
//! Mirrors the semantics the controller relies on: independent writes, multi-path
//! subscriptions that also echo the device's own writes back, and stream timeouts.
//! A `RemoteInjector` plays the part of the human or automation on the far side.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tank_traits::{BoxError, RemoteStore, StreamEvent, StreamSink};

use crate::error::HwError;

struct Subscription {
    base: String,
    children: Vec<String>,
    sink: StreamSink,
}

#[derive(Default)]
struct Shared {
    values: Mutex<BTreeMap<String, String>>,
    writes: Mutex<BTreeMap<String, u64>>,
    subscriptions: Mutex<Vec<Subscription>>,
    fail_writes: AtomicBool,
}

impl Shared {
    fn store(&self, path: &str, value: String) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(path.to_string(), value.clone());
        }
        self.dispatch_data(path, &value);
    }

    fn dispatch_data(&self, path: &str, value: &str) {
        let Ok(mut subs) = self.subscriptions.lock() else {
            return;
        };
        for sub in subs.iter_mut() {
            let Some(child) = path.strip_prefix(sub.base.as_str()) else {
                continue;
            };
            if sub.children.iter().any(|c| c == child) {
                (sub.sink)(StreamEvent::Data {
                    path: child.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    fn dispatch_timeout(&self) {
        if let Ok(mut subs) = self.subscriptions.lock() {
            for sub in subs.iter_mut() {
                (sub.sink)(StreamEvent::Timeout);
            }
        }
    }
}

/// Simulated remote store; the controller owns this half.
#[derive(Default)]
pub struct SimulatedStore {
    shared: Arc<Shared>,
}

/// Remote-side handle: injects writes and faults, inspects what the device published.
#[derive(Clone)]
pub struct RemoteInjector {
    shared: Arc<Shared>,
}

impl SimulatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn injector(&self) -> RemoteInjector {
        RemoteInjector {
            shared: self.shared.clone(),
        }
    }

    fn write(&self, path: &str, value: String) -> Result<(), BoxError> {
        if self.shared.fail_writes.load(Ordering::Relaxed) {
            return Err(Box::new(HwError::RemoteUnavailable(format!(
                "write {path} rejected"
            ))));
        }
        if let Ok(mut writes) = self.shared.writes.lock() {
            *writes.entry(path.to_string()).or_insert(0) += 1;
        }
        self.shared.store(path, value);
        Ok(())
    }
}

impl RemoteStore for SimulatedStore {
    fn set_bool(&mut self, path: &str, value: bool, _timeout: Duration) -> Result<(), BoxError> {
        self.write(path, value.to_string())
    }

    fn set_int(&mut self, path: &str, value: i64, _timeout: Duration) -> Result<(), BoxError> {
        self.write(path, value.to_string())
    }

    fn subscribe(
        &mut self,
        base: &str,
        children: &[&str],
        sink: StreamSink,
    ) -> Result<(), BoxError> {
        let mut subs = self
            .shared
            .subscriptions
            .lock()
            .map_err(|_| HwError::RemoteUnavailable("subscription table poisoned".into()))?;
        subs.push(Subscription {
            base: base.to_string(),
            children: children.iter().map(|c| (*c).to_string()).collect(),
            sink,
        });
        tracing::debug!(base, ?children, "simulated stream started");
        Ok(())
    }
}

impl RemoteInjector {
    /// Write `value` at `path` from the remote side and notify subscribers.
    pub fn set(&self, path: &str, value: &str) {
        self.shared.store(path, value.to_string());
    }

    /// Deliver a stream timeout notification to every subscriber.
    pub fn timeout(&self) {
        self.shared.dispatch_timeout();
    }

    /// Make device-side writes fail until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Current value at `path`, if any.
    pub fn get(&self, path: &str) -> Option<String> {
        self.shared
            .values
            .lock()
            .ok()
            .and_then(|v| v.get(path).cloned())
    }

    /// Number of successful device-side writes to `path`.
    pub fn writes(&self, path: &str) -> u64 {
        self.shared
            .writes
            .lock()
            .ok()
            .and_then(|w| w.get(path).copied())
            .unwrap_or(0)
    }
}
