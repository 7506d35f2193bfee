mod control;
mod live;
mod scheduler;
mod timeline;

pub use control::{ControlEvent, ControlSource};
pub use live::run_live;
pub use scheduler::{DEFAULT_POLL_INTERVAL, PlaybackOutcome, PlaybackState, Scheduler};
pub use timeline::build_timeline;
