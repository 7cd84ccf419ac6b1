//! Event delivery from a session worker to its caller.

use crate::error::SerialError;
use tokio::sync::mpsc::UnboundedSender;

/// Receives a session's events, in the order they happened, on the worker
/// thread.
///
/// Implementations must not block for long: the worker does not read from the
/// device or drain writes while a callback runs.
pub trait EventSink: Send + 'static {
    /// Bytes read from the device. Ownership passes to the sink.
    fn on_data(&mut self, data: Vec<u8>);

    /// A fault on this session. See [`SerialError::is_terminal`] for whether
    /// the session survives it.
    fn on_error(&mut self, error: SerialError);
}

/// A pair of closures acting as an [`EventSink`].
pub struct Callbacks<D, E> {
    on_data: D,
    on_error: E,
}

impl<D, E> Callbacks<D, E>
where
    D: FnMut(Vec<u8>) + Send + 'static,
    E: FnMut(SerialError) + Send + 'static,
{
    pub fn new(on_data: D, on_error: E) -> Self {
        Self { on_data, on_error }
    }
}

impl<D, E> EventSink for Callbacks<D, E>
where
    D: FnMut(Vec<u8>) + Send + 'static,
    E: FnMut(SerialError) + Send + 'static,
{
    fn on_data(&mut self, data: Vec<u8>) {
        (self.on_data)(data)
    }

    fn on_error(&mut self, error: SerialError) {
        (self.on_error)(error)
    }
}

/// One session event, for channel-based delivery.
#[derive(Debug)]
pub enum SessionEvent {
    Data(Vec<u8>),
    Error(SerialError),
}

/// Forwards events into a tokio channel so async code can `recv()` them.
/// The channel closes when the worker exits.
impl EventSink for UnboundedSender<SessionEvent> {
    fn on_data(&mut self, data: Vec<u8>) {
        let _ = self.send(SessionEvent::Data(data));
    }

    fn on_error(&mut self, error: SerialError) {
        let _ = self.send(SessionEvent::Error(error));
    }
}
