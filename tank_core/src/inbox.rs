//! Hand-off of remote overrides from the transport thread to the control cycle.
//!
//! One single-slot channel per override kind: a newer value of the same kind replaces an
//! older undelivered one, different kinds never displace each other.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::error::TankError;

/// Remote path of the pump status flag, relative to the base path.
pub const MOTOR_STAT: &str = "/motorStat";
pub const WATER_LEVEL: &str = "/waterLevel";
pub const PERCENT: &str = "/percent";
pub const EMPTY_LEVEL: &str = "/tankEmptyLevel";
pub const FULL_LEVEL: &str = "/tankFullLevel";

/// Children of the base path the controller listens on.
pub const SUBSCRIBED: [&str; 3] = [MOTOR_STAT, EMPTY_LEVEL, FULL_LEVEL];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOverride {
    Stop,
    EmptyLevel(i32),
    FullLevel(i32),
}

impl RemoteOverride {
    /// Interpret a stream update. Unknown paths yield `Ok(None)`.
    ///
    /// `motorStat` values other than `true` request a stop. Calibration values must be
    /// plain integers; range checks happen when the override is applied.
    pub fn parse(path: &str, value: &str) -> Result<Option<Self>, TankError> {
        let v = unquote(value);
        match path {
            MOTOR_STAT => Ok((v != "true").then_some(Self::Stop)),
            EMPTY_LEVEL => parse_level(path, v).map(|l| Some(Self::EmptyLevel(l))),
            FULL_LEVEL => parse_level(path, v).map(|l| Some(Self::FullLevel(l))),
            _ => Ok(None),
        }
    }
}

/// Strip whitespace and one pair of surrounding double quotes.
pub(crate) fn unquote(value: &str) -> &str {
    let v = value.trim();
    v.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(v)
}

fn parse_level(path: &str, v: &str) -> Result<i32, TankError> {
    v.parse::<i32>()
        .map_err(|_| TankError::InvalidOverride(format!("{path}: {v:?} is not an integer")))
}

#[derive(Clone)]
struct Slot<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    fn put(&self, mut v: T) {
        loop {
            match self.tx.try_send(v) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.rx.try_recv();
                    v = back;
                }
            }
        }
    }

    fn take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    fn is_full(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Overrides collected since the last drain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub stop: bool,
    pub empty_level: Option<i32>,
    pub full_level: Option<i32>,
}

impl Pending {
    pub fn is_empty(&self) -> bool {
        !self.stop && self.empty_level.is_none() && self.full_level.is_none()
    }
}

/// Cloneable handle shared by the stream callback (producer) and the controller (consumer).
#[derive(Clone)]
pub struct OverrideInbox {
    stop: Slot<()>,
    empty: Slot<i32>,
    full: Slot<i32>,
}

impl Default for OverrideInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideInbox {
    pub fn new() -> Self {
        Self {
            stop: Slot::new(),
            empty: Slot::new(),
            full: Slot::new(),
        }
    }

    /// Never blocks.
    pub fn push(&self, o: RemoteOverride) {
        match o {
            RemoteOverride::Stop => self.stop.put(()),
            RemoteOverride::EmptyLevel(v) => self.empty.put(v),
            RemoteOverride::FullLevel(v) => self.full.put(v),
        }
    }

    /// A stop is waiting to be drained. Does not consume it.
    pub fn stop_pending(&self) -> bool {
        self.stop.is_full()
    }

    pub fn drain(&self) -> Pending {
        Pending {
            stop: self.stop.take().is_some(),
            empty_level: self.empty.take(),
            full_level: self.full.take(),
        }
    }
}
