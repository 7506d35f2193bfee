use crate::events::KeyState;

/// Lowest key of an 88 key piano (A0).
pub const LOWEST_KEY: u8 = 21;
/// Highest key of an 88 key piano (C8).
pub const HIGHEST_KEY: u8 = 108;

pub const WHITE_KEY_WIDTH: u16 = 3;
pub const WHITE_KEY_HEIGHT: u16 = 8;
pub const BLACK_KEY_HEIGHT: u16 = 5;
/// 52 white keys plus the closing border.
pub const KEYBOARD_WIDTH: u16 = 52 * WHITE_KEY_WIDTH + 1;

const WHITE_KEYS_BEFORE: [u16; 12] = [0, 1, 1, 2, 2, 3, 4, 4, 5, 5, 6, 6];

pub fn is_black_key(pitch: u8) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}

pub fn is_on_keyboard(pitch: u8) -> bool {
    (LOWEST_KEY..=HIGHEST_KEY).contains(&pitch)
}

/// Index of the white key a pitch sits on (the next white key for black
/// keys), counted from A0.
fn white_index(pitch: u8) -> u16 {
    let absolute = |p: u8| u16::from(p / 12) * 7 + WHITE_KEYS_BEFORE[usize::from(p % 12)];
    absolute(pitch) - absolute(LOWEST_KEY)
}

/// Horizontal cell span of a key, relative to the left edge of the keyboard.
///
/// Black keys straddle the border between their two white neighbours.
pub fn key_columns(pitch: u8) -> Option<(u16, u16)> {
    if !is_on_keyboard(pitch) {
        return None;
    }
    let x = white_index(pitch) * WHITE_KEY_WIDTH;
    if is_black_key(pitch) {
        Some((x - 1, 2))
    } else {
        Some((x + 1, WHITE_KEY_WIDTH - 1))
    }
}

/// Top-left corner that centers the keyboard in a terminal of the given size.
pub fn centered_origin(width: u16, height: u16) -> (u16, u16) {
    (
        width.saturating_sub(KEYBOARD_WIDTH) / 2,
        height.saturating_sub(WHITE_KEY_HEIGHT) / 2,
    )
}

/// Highlight state of every MIDI key.
#[derive(Debug, Clone)]
pub struct KeyboardState {
    keys: [KeyState; 128],
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self {
            keys: [KeyState::Released; 128],
        }
    }
}

impl KeyboardState {
    pub fn set(&mut self, pitch: u8, state: KeyState) {
        if let Some(key) = self.keys.get_mut(usize::from(pitch)) {
            *key = state;
        }
    }

    pub fn get(&self, pitch: u8) -> KeyState {
        self.keys
            .get(usize::from(pitch))
            .copied()
            .unwrap_or_default()
    }

    pub fn pressed(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=127u8).filter(|&p| self.get(p) == KeyState::Pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_keys() {
        assert!(!is_black_key(60)); // C4
        assert!(is_black_key(61));
        assert!(is_black_key(22)); // A#0
        assert!(!is_black_key(LOWEST_KEY));
    }

    #[test]
    fn test_key_columns() {
        assert_eq!(key_columns(LOWEST_KEY), Some((1, 2)));
        assert_eq!(key_columns(22), Some((2, 2))); // A#0 between A0 and B0
        assert_eq!(key_columns(23), Some((4, 2))); // B0
        assert_eq!(key_columns(24), Some((7, 2))); // C1
        assert_eq!(key_columns(HIGHEST_KEY), Some((51 * 3 + 1, 2)));
        assert_eq!(key_columns(20), None);
        assert_eq!(key_columns(109), None);
    }

    #[test]
    fn test_keys_fit_inside_the_keyboard() {
        for pitch in LOWEST_KEY..=HIGHEST_KEY {
            let (x, width) = key_columns(pitch).unwrap();
            assert!(x + width < KEYBOARD_WIDTH, "pitch {pitch}");
        }
    }

    #[test]
    fn test_centered_origin() {
        assert_eq!(centered_origin(200, 40), ((200 - KEYBOARD_WIDTH) / 2, 16));
        assert_eq!(centered_origin(80, 4), (0, 0));
    }

    #[test]
    fn test_keyboard_state() {
        let mut keyboard = KeyboardState::default();
        keyboard.set(60, KeyState::Pressed);
        keyboard.set(64, KeyState::Pressed);
        keyboard.set(60, KeyState::Released);
        assert_eq!(keyboard.get(64), KeyState::Pressed);
        assert_eq!(keyboard.pressed().collect::<Vec<_>>(), vec![64]);

        // out of range pitches are ignored
        keyboard.set(200, KeyState::Pressed);
        assert_eq!(keyboard.get(200), KeyState::Released);
    }
}
