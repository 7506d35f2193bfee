use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info, trace};

use super::{ControlEvent, ControlSource};
use crate::error::{PlayerError, Result};
use crate::keys::classify;
use crate::transport::{InputTransport, Transport};
use crate::ui::Display;

/// State shared with the input callback. Output and display are locked
/// separately: relaying sound never waits on terminal drawing.
struct Relay<T, D> {
    output: Mutex<T>,
    display: Mutex<D>,
    failure: Mutex<Option<PlayerError>>,
}

impl<T: Transport, D: Display> Relay<T, D> {
    fn forward(&self, message: &[u8]) -> Result<()> {
        self.output.lock().send(message)?;
        // no look-ahead in a live stream, so no repeated-note shortening
        if let Some(change) = classify(message)? {
            let mut display = self.display.lock();
            display.set_key_state(change.pitch, change.state);
            display.render()?;
        }
        Ok(())
    }

    fn relayout(&self, width: u16, height: u16) -> Result<()> {
        let mut display = self.display.lock();
        display.resize(width, height);
        display.render()
    }
}

/// Relays live input to the output and the display until quit.
///
/// Every inbound message is forwarded as soon as it arrives. A failure inside
/// the callback stops relaying and is returned once the control loop sees it.
pub fn run_live<I, T, D, C>(
    input: I,
    output: T,
    display: D,
    controls: &mut C,
    poll_interval: Duration,
) -> Result<()>
where
    I: InputTransport,
    T: Transport + Send + 'static,
    D: Display + Send + 'static,
    C: ControlSource,
{
    let relay = Arc::new(Relay {
        output: Mutex::new(output),
        display: Mutex::new(display),
        failure: Mutex::new(None),
    });
    relay.display.lock().render()?;

    let callback_relay = Arc::clone(&relay);
    let connection = input.register_callback(move |timestamp, message| {
        trace!(timestamp, ?message, "live input");
        if callback_relay.failure.lock().is_some() {
            return;
        }
        if let Err(err) = callback_relay.forward(message) {
            error!(%err, "live relay failed");
            let mut failure = callback_relay.failure.lock();
            if failure.is_none() {
                *failure = Some(err);
            }
        }
    })?;

    let result = loop {
        if let Some(err) = relay.failure.lock().take() {
            break Err(err);
        }
        match controls.poll(poll_interval) {
            Ok(Some(ControlEvent::Quit)) => break Ok(()),
            Ok(Some(ControlEvent::Resize { width, height })) => {
                if let Err(err) = relay.relayout(width, height) {
                    break Err(err);
                }
            }
            // no pause when playing live
            Ok(Some(ControlEvent::Pause | ControlEvent::Resume) | None) => {}
            Err(err) => break Err(err),
        }
    };

    drop(connection);
    info!("live input closed");
    result
}
