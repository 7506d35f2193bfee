use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Quit,
    Pause,
    Resume,
    Resize { width: u16, height: u16 },
}

/// Where playback control requests come from.
///
/// `poll` is used while music is running and must return as soon as an event
/// arrives or `timeout` elapses. `wait` is used while paused and blocks until
/// the next event.
pub trait ControlSource {
    fn poll(&mut self, timeout: Duration) -> Result<Option<ControlEvent>>;

    fn wait(&mut self) -> Result<ControlEvent>;
}

/// Controls sent from another thread.
///
/// A disconnected sender reads as silence while playing and as `Quit` while
/// paused, since nothing could ever resume playback.
impl ControlSource for Receiver<ControlEvent> {
    fn poll(&mut self, timeout: Duration) -> Result<Option<ControlEvent>> {
        match self.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn wait(&mut self) -> Result<ControlEvent> {
        Ok(self.recv().unwrap_or(ControlEvent::Quit))
    }
}
