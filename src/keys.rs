//! Piano key press/release extraction.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{PlayerError, Result};
use crate::events::{ChannelEvent, KeyChange, KeyTransition};

/// Upper bound of the gap opened between two repeated notes of the same key.
pub const MAX_SHORTENING_NS: u64 = 75_000_000;

fn is_key_press(message: &[u8]) -> bool {
    message.len() == 3 && message[0] & 0xF0 == 0x90 && message[2] != 0
}

fn is_key_release(message: &[u8]) -> bool {
    message.len() == 3
        && (message[0] & 0xF0 == 0x80 || (message[0] & 0xF0 == 0x90 && message[2] == 0))
}

/// Which key, if any, a channel message presses or releases.
pub fn classify(message: &[u8]) -> Result<Option<KeyChange>> {
    match (is_key_press(message), is_key_release(message)) {
        (true, true) => Err(PlayerError::AmbiguousKeyEvent(message.to_vec())),
        (true, false) => Ok(Some(KeyChange::pressed(message[1]))),
        (false, true) => Ok(Some(KeyChange::released(message[1]))),
        (false, false) => Ok(None),
    }
}

fn is_sorted_by_time<T>(items: &[T], time: impl Fn(&T) -> u64) -> bool {
    items.windows(2).all(|pair| time(&pair[0]) <= time(&pair[1]))
}

/// Key transitions of a time-sorted event list, with repeated notes shortened.
///
/// The result is not guaranteed to be sorted: a shortened release may move
/// before transitions of other keys.
pub fn extract_key_transitions(events: &[ChannelEvent]) -> Result<Vec<KeyTransition>> {
    if !is_sorted_by_time(events, |e| e.time) {
        return Err(PlayerError::NotSorted("midi events"));
    }

    let mut transitions = Vec::new();
    for event in events {
        if let Some(change) = classify(&event.bytes)? {
            transitions.push(KeyTransition {
                time: event.time,
                change,
            });
        }
    }

    if !is_sorted_by_time(&transitions, |t| t.time) {
        return Err(PlayerError::NotSorted("key events"));
    }

    let shortened = shorten_repeated_notes(&mut transitions)?;
    debug!(
        transitions = transitions.len(),
        shortened, "extracted key transitions"
    );

    check_no_simultaneous_press_release(&transitions)?;
    Ok(transitions)
}

/// Moves a release earlier when the same key is pressed again at the exact
/// instant it is released, so the two notes do not read as one held key.
///
/// Returns how many releases were moved.
pub fn shorten_repeated_notes(transitions: &mut [KeyTransition]) -> Result<usize> {
    let mut presses: HashMap<u8, Vec<usize>> = HashMap::new();
    let mut releases: HashMap<u8, Vec<usize>> = HashMap::new();
    let mut press_times: HashSet<(u8, u64)> = HashSet::new();
    for (index, transition) in transitions.iter().enumerate() {
        let pitch = transition.pitch();
        if transition.is_pressed() {
            presses.entry(pitch).or_default().push(index);
            press_times.insert((pitch, transition.time));
        } else {
            releases.entry(pitch).or_default().push(index);
        }
    }

    let mut shortened = 0;
    let mut unreleased: Option<(u64, u8)> = None;
    for (pitch, mut pitch_presses) in presses {
        pitch_presses.sort_by_key(|&i| transitions[i].time);
        let mut pitch_releases = releases.remove(&pitch).unwrap_or_default();
        pitch_releases.sort_by_key(|&i| transitions[i].time);

        // a moved release stays after its press and before any later
        // release, so the release list remains sorted as presses advance
        let mut cursor = 0;
        for press in pitch_presses {
            let pressed_at = transitions[press].time;
            while cursor < pitch_releases.len()
                && transitions[pitch_releases[cursor]].time <= pressed_at
            {
                cursor += 1;
            }
            let Some(&release) = pitch_releases.get(cursor) else {
                // later presses of this key are unreleased as well
                let found = (pressed_at, pitch);
                unreleased = Some(unreleased.map_or(found, |earliest| earliest.min(found)));
                break;
            };

            let released_at = transitions[release].time;
            if press_times.contains(&(pitch, released_at)) {
                let duration = released_at - pressed_at;
                transitions[release].time -= MAX_SHORTENING_NS.min(duration / 4);
                shortened += 1;
            }
        }
    }

    match unreleased {
        Some((time, pitch)) => Err(PlayerError::UnreleasedKey { pitch, time }),
        None => Ok(shortened),
    }
}

/// Rejects any key pressed and released at the very same instant.
///
/// Files where several instruments share a note can produce this; they are
/// refused rather than guessed at.
pub fn check_no_simultaneous_press_release(transitions: &[KeyTransition]) -> Result<()> {
    let presses: HashSet<(u64, u8)> = transitions
        .iter()
        .filter(|t| t.is_pressed())
        .map(|t| (t.time, t.pitch()))
        .collect();

    match transitions
        .iter()
        .find(|t| t.is_released() && presses.contains(&(t.time, t.pitch())))
    {
        Some(t) => Err(PlayerError::SimultaneousPressRelease {
            pitch: t.pitch(),
            time: t.time,
        }),
        None => Ok(()),
    }
}
