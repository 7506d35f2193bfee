//! Plays Standard MIDI Files on a MIDI output while showing the keys being
//! pressed on a terminal piano.
//!
//! The pipeline runs in four stages, each validating its own input and
//! output and aborting on the first violation:
//!
//! 1. [`smf::decode`] reads the file into channel events with absolute
//!    nanosecond times.
//! 2. [`keys::extract_key_transitions`] derives key presses and releases,
//!    opening a small gap between repeated notes of the same key.
//! 3. [`timing::build_timeline`] groups everything into moments.
//! 4. [`timing::Scheduler`] replays the moments in real time.

pub mod config;
pub mod error;
pub mod events;
pub mod keys;
pub mod logging;
pub mod smf;
pub mod timing;
pub mod transport;
pub mod ui;

use std::path::Path;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use events::{ChannelEvent, KeyChange, KeyState, KeyTransition, Moment, Timeline};

/// Runs the decode, extraction and grouping stages on an in-memory file.
pub fn load_timeline(bytes: &[u8]) -> Result<Timeline> {
    let song = smf::decode(bytes)?;
    let transitions = keys::extract_key_transitions(&song.events)?;
    timing::build_timeline(&song.events, &transitions)
}

pub fn load_timeline_from_file(path: &Path) -> Result<Timeline> {
    let bytes = std::fs::read(path)?;
    load_timeline(&bytes)
}
