/// A channel MIDI message with its absolute time in nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    pub time: u64,
    /// Status byte followed by its data bytes.
    pub bytes: Vec<u8>,
}

impl ChannelEvent {
    pub fn new(time: u64, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            time,
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyState {
    Pressed,
    #[default]
    Released,
}

/// What happens to one piano key, without timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChange {
    pub pitch: u8,
    pub state: KeyState,
}

impl KeyChange {
    pub fn pressed(pitch: u8) -> Self {
        Self {
            pitch,
            state: KeyState::Pressed,
        }
    }

    pub fn released(pitch: u8) -> Self {
        Self {
            pitch,
            state: KeyState::Released,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTransition {
    pub time: u64,
    pub change: KeyChange,
}

impl KeyTransition {
    pub fn pressed(time: u64, pitch: u8) -> Self {
        Self {
            time,
            change: KeyChange::pressed(pitch),
        }
    }

    pub fn released(time: u64, pitch: u8) -> Self {
        Self {
            time,
            change: KeyChange::released(pitch),
        }
    }

    pub fn pitch(&self) -> u8 {
        self.change.pitch
    }

    pub fn is_pressed(&self) -> bool {
        self.change.state == KeyState::Pressed
    }

    pub fn is_released(&self) -> bool {
        self.change.state == KeyState::Released
    }
}

/// Everything that happens at one exact instant of the song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moment {
    pub time: u64,
    pub messages: Vec<Vec<u8>>,
    pub key_changes: Vec<KeyChange>,
}

impl Moment {
    pub(crate) fn new(time: u64) -> Self {
        Self {
            time,
            messages: Vec::new(),
            key_changes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.key_changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len() + self.key_changes.len()
    }
}

/// Moments in strictly increasing time order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    moments: Vec<Moment>,
}

impl Timeline {
    pub(crate) fn from_sorted(moments: Vec<Moment>) -> Self {
        Self { moments }
    }

    pub fn moments(&self) -> &[Moment] {
        &self.moments
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Moment> {
        self.moments.iter()
    }

    /// Time of the last moment, i.e. how long playback lasts.
    pub fn duration(&self) -> u64 {
        self.moments.last().map_or(0, |m| m.time)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Moment;
    type IntoIter = std::slice::Iter<'a, Moment>;

    fn into_iter(self) -> Self::IntoIter {
        self.moments.iter()
    }
}
