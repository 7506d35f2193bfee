use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    // Malformed or unsupported file layout.
    #[error("Error: not a midi file (wrong {0} header)")]
    BadMagic(&'static str),

    #[error("Error: not a midi file (wrong header size {0}, expected 6)")]
    BadHeaderLength(u32),

    #[error("Error: unsupported midi file format {0}")]
    UnsupportedFormat(u16),

    #[error("Error: midi file of type \"single track\" declares {0} tracks")]
    SingleTrackCount(u16),

    #[error("Error: midi file contains an invalid number of frames per second ({0})")]
    InvalidFrameRate(u8),

    #[error("Error: a quarter note is made of 0 pulses according to the midi data")]
    ZeroDivision,

    #[error("Invalid relative timing at offset {offset}: maximum size allowed is 4 bytes, bytes used: {len}")]
    RelativeTimeTooLong { offset: usize, len: usize },

    #[error("Variable length value at offset {offset} uses {len} bytes, at most 8 are supported")]
    VariableLengthTooLong { offset: usize, len: usize },

    #[error("Running status required at offset {0} but no previous status byte exists")]
    MissingRunningStatus(usize),

    #[error("Error: invalid type of MIDI event 0x{status:02X} at offset {offset}")]
    InvalidStatus { status: u8, offset: usize },

    #[error("Error: unexpected end of midi data at offset {0}")]
    UnexpectedEof(usize),

    #[error("Error: invalid midi file ({0} extra bytes after end of MIDI data)")]
    TrailingBytes(usize),

    #[error("Error: tempo event has an invalid size ({0} bytes)")]
    InvalidTempoSize(usize),

    // Well-formed input this player refuses to interpret.
    #[error("Error: tempo changes mid-song are not supported ({previous} -> {found} us per quarter note)")]
    TempoChange { previous: u32, found: u32 },

    #[error("Error: {0} must be sorted by time")]
    NotSorted(&'static str),

    #[error("Error: midi message {0:02X?} is both a key press and a key release")]
    AmbiguousKeyEvent(Vec<u8>),

    #[error("Error: key {pitch} pressed at {time} ns was never released")]
    UnreleasedKey { pitch: u8, time: u64 },

    #[error("Error: key {pitch} is pressed and released at the same time ({time} ns)")]
    SimultaneousPressRelease { pitch: u8, time: u64 },

    #[error("Error: the moment at {0} ns does not contain any midi or key event")]
    EmptyMoment(u64),

    #[error("Error while grouping events by time, {0} events magically appeared")]
    EventsCreated(usize),

    #[error("Error while grouping events by time, {0} events just disappeared")]
    EventsLost(usize),

    #[error("Error: two different moments share the timestamp {0} ns")]
    DuplicateMoment(u64),

    #[error("Error: event time of {0} ticks does not fit in nanoseconds")]
    TimeOverflow(u64),

    // Runtime collaborators.
    #[error("Sound system error: {0}")]
    Transport(String),

    #[error("Sound system error: no {direction} port with index {index}")]
    PortNotFound { direction: &'static str, index: usize },

    #[error("Display error: {0}")]
    Display(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
