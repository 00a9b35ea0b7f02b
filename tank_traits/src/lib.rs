pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::Duration;

/// Error type used at every trait boundary in the workspace.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Ultrasonic time-of-flight ranging front end.
///
/// One call fires a trigger pulse and returns the width of the echo pulse.
/// Implementations must give up once `timeout` has elapsed and return an error
/// instead of blocking.
pub trait EchoSensor {
    fn echo(&mut self, timeout: Duration) -> Result<Duration, BoxError>;
}

/// Digital output driving the pump relay.
pub trait Relay {
    fn energize(&mut self) -> Result<(), BoxError>;
    fn deenergize(&mut self) -> Result<(), BoxError>;
}

/// Event delivered by a remote store subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A child path changed. `path` is relative to the subscribed base (e.g. `/motorStat`),
    /// `value` is the raw textual payload.
    Data { path: String, value: String },
    /// The stream saw no traffic for longer than its read timeout.
    Timeout,
}

/// Callback invoked by the transport for every inbound stream event.
pub type StreamSink = Box<dyn FnMut(StreamEvent) + Send>;

/// Semantic contract of the remote key/path store.
///
/// Writes are independent and non-transactional and must give up after `timeout`.
/// `subscribe` registers interest in the given children of `base`; events are delivered
/// through `sink` from whatever context the transport runs in (possibly another thread,
/// possibly from inside a write that echoes back), so sinks must not block.
pub trait RemoteStore {
    fn set_bool(&mut self, path: &str, value: bool, timeout: Duration) -> Result<(), BoxError>;
    fn set_int(&mut self, path: &str, value: i64, timeout: Duration) -> Result<(), BoxError>;
    fn subscribe(
        &mut self,
        base: &str,
        children: &[&str],
        sink: StreamSink,
    ) -> Result<(), BoxError>;
}

/// Local status readout (display, console, ...).
pub trait StatusPresenter {
    /// `percent` is always clamped to `0..=100` by the caller.
    fn render(&mut self, percent: u8);
}

impl<T: EchoSensor + ?Sized> EchoSensor for Box<T> {
    fn echo(&mut self, timeout: Duration) -> Result<Duration, BoxError> {
        (**self).echo(timeout)
    }
}

impl<T: Relay + ?Sized> Relay for Box<T> {
    fn energize(&mut self) -> Result<(), BoxError> {
        (**self).energize()
    }
    fn deenergize(&mut self) -> Result<(), BoxError> {
        (**self).deenergize()
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for Box<T> {
    fn set_bool(&mut self, path: &str, value: bool, timeout: Duration) -> Result<(), BoxError> {
        (**self).set_bool(path, value, timeout)
    }
    fn set_int(&mut self, path: &str, value: i64, timeout: Duration) -> Result<(), BoxError> {
        (**self).set_int(path, value, timeout)
    }
    fn subscribe(
        &mut self,
        base: &str,
        children: &[&str],
        sink: StreamSink,
    ) -> Result<(), BoxError> {
        (**self).subscribe(base, children, sink)
    }
}

impl<T: StatusPresenter + ?Sized> StatusPresenter for Box<T> {
    fn render(&mut self, percent: u8) {
        (**self).render(percent);
    }
}
