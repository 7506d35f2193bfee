use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{ControlEvent, ControlSource};
use crate::error::Result;
use crate::events::{Moment, Timeline};
use crate::transport::Transport;
use crate::ui::Display;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
    /// The transport or the display failed mid-playback.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

enum Wait {
    Elapsed,
    Cancelled,
}

/// Replays a timeline in real time against a transport and a display.
pub struct Scheduler<T, D> {
    transport: T,
    display: D,
    poll_interval: Duration,
    state: PlaybackState,
    cursor: usize,
}

impl<T: Transport, D: Display> Scheduler<T, D> {
    pub fn new(transport: T, display: D) -> Self {
        Self {
            transport,
            display,
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: PlaybackState::Idle,
            cursor: 0,
        }
    }

    /// Longest single wait for control input; bounds how late a quit is seen.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the moment most recently dispatched.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn into_parts(self) -> (T, D) {
        (self.transport, self.display)
    }

    fn set_state(&mut self, state: PlaybackState) {
        debug!(from = ?self.state, to = ?state, cursor = self.cursor, "playback state");
        self.state = state;
    }

    pub fn play<C: ControlSource>(
        &mut self,
        timeline: &Timeline,
        controls: &mut C,
    ) -> Result<PlaybackOutcome> {
        self.cursor = 0;
        self.set_state(PlaybackState::Running);

        let played = self.run(timeline, controls);
        if let Err(err) = &played {
            self.set_state(PlaybackState::Failed);
            warn!(%err, moment = self.cursor, "playback failed");
        }
        played
    }

    fn run<C: ControlSource>(
        &mut self,
        timeline: &Timeline,
        controls: &mut C,
    ) -> Result<PlaybackOutcome> {
        let moments = timeline.moments();
        for (index, moment) in moments.iter().enumerate() {
            self.cursor = index;
            self.dispatch(moment)?;

            let Some(next) = moments.get(index + 1) else {
                break;
            };
            let interval = Duration::from_nanos(next.time - moment.time);
            if let Wait::Cancelled = self.wait(interval, controls)? {
                self.set_state(PlaybackState::Cancelled);
                info!(moment = index, of = moments.len(), "playback cancelled");
                return Ok(PlaybackOutcome::Cancelled);
            }
        }

        self.set_state(PlaybackState::Completed);
        info!(moments = moments.len(), "playback completed");
        Ok(PlaybackOutcome::Completed)
    }

    fn dispatch(&mut self, moment: &Moment) -> Result<()> {
        for change in &moment.key_changes {
            self.display.set_key_state(change.pitch, change.state);
        }
        self.display.render()?;

        for message in &moment.messages {
            self.transport.send(message)?;
        }
        Ok(())
    }

    /// Waits out `interval` of running time while watching for controls.
    /// Time spent paused is not counted.
    fn wait<C: ControlSource>(&mut self, interval: Duration, controls: &mut C) -> Result<Wait> {
        let mut started = Instant::now();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= interval {
                return Ok(Wait::Elapsed);
            }
            let remaining = interval - elapsed;

            match controls.poll(remaining.min(self.poll_interval))? {
                Some(ControlEvent::Quit) => return Ok(Wait::Cancelled),
                Some(ControlEvent::Pause) => {
                    let paused_at = Instant::now();
                    if let Wait::Cancelled = self.pause(controls)? {
                        return Ok(Wait::Cancelled);
                    }
                    started += paused_at.elapsed();
                }
                Some(ControlEvent::Resize { width, height }) => self.relayout(width, height)?,
                Some(ControlEvent::Resume) | None => {}
            }
        }
    }

    fn pause<C: ControlSource>(&mut self, controls: &mut C) -> Result<Wait> {
        self.set_state(PlaybackState::Paused);
        loop {
            match controls.wait()? {
                ControlEvent::Quit => return Ok(Wait::Cancelled),
                ControlEvent::Resume => break,
                ControlEvent::Resize { width, height } => self.relayout(width, height)?,
                ControlEvent::Pause => {}
            }
        }
        self.set_state(PlaybackState::Running);
        Ok(Wait::Elapsed)
    }

    fn relayout(&mut self, width: u16, height: u16) -> Result<()> {
        self.display.resize(width, height);
        self.display.render()
    }
}
