use std::collections::HashMap;

use tracing::debug;

use crate::error::{PlayerError, Result};
use crate::events::{ChannelEvent, KeyState, KeyTransition, Moment, Timeline};
use crate::keys::{self, classify};

/// Groups channel events and key transitions into moments of identical time.
///
/// Neither input needs to be sorted. Inside each moment, note releases are
/// moved ahead of note presses so that a key struck again at the instant it is
/// released is not silenced by its own previous note.
pub fn build_timeline(
    channel_events: &[ChannelEvent],
    key_transitions: &[KeyTransition],
) -> Result<Timeline> {
    let mut moments: Vec<Moment> = Vec::new();
    let mut by_time: HashMap<u64, usize> = HashMap::new();

    let mut moment_at = |time: u64, moments: &mut Vec<Moment>| -> usize {
        *by_time.entry(time).or_insert_with(|| {
            moments.push(Moment::new(time));
            moments.len() - 1
        })
    };

    for event in channel_events {
        let index = moment_at(event.time, &mut moments);
        moments[index].messages.push(event.bytes.clone());
    }
    for transition in key_transitions {
        let index = moment_at(transition.time, &mut moments);
        moments[index].key_changes.push(transition.change);
    }

    moments.sort_by_key(|m| m.time);

    validate(&moments, channel_events.len() + key_transitions.len())?;

    for moment in &mut moments {
        releases_first(&mut moment.messages)?;
    }

    debug!(moments = moments.len(), "built timeline");
    Ok(Timeline::from_sorted(moments))
}

fn validate(moments: &[Moment], expected: usize) -> Result<()> {
    if let Some(empty) = moments.iter().find(|m| m.is_empty()) {
        return Err(PlayerError::EmptyMoment(empty.time));
    }

    let grouped: usize = moments.iter().map(Moment::len).sum();
    if grouped > expected {
        return Err(PlayerError::EventsCreated(grouped - expected));
    }
    if grouped < expected {
        return Err(PlayerError::EventsLost(expected - grouped));
    }

    if let Some(pair) = moments.windows(2).find(|pair| pair[0].time == pair[1].time) {
        return Err(PlayerError::DuplicateMoment(pair[1].time));
    }

    for moment in moments {
        let transitions: Vec<KeyTransition> = moment
            .key_changes
            .iter()
            .map(|&change| KeyTransition {
                time: moment.time,
                change,
            })
            .collect();
        keys::check_no_simultaneous_press_release(&transitions)?;
    }

    Ok(())
}

/// Reorders a moment's messages so every note release precedes every note
/// press, keeping the relative order of everything else.
fn releases_first(messages: &mut [Vec<u8>]) -> Result<()> {
    let mut kinds: Vec<Option<KeyState>> = Vec::with_capacity(messages.len());
    for message in messages.iter() {
        kinds.push(classify(message)?.map(|change| change.state));
    }

    let mut i = 0;
    while i < messages.len() {
        if kinds[i] == Some(KeyState::Pressed) {
            let release = (i + 1..messages.len()).find(|&j| kinds[j] == Some(KeyState::Released));
            match release {
                Some(j) => {
                    messages[i..=j].rotate_right(1);
                    kinds[i..=j].rotate_right(1);
                }
                None => break,
            }
        }
        i += 1;
    }

    Ok(())
}
