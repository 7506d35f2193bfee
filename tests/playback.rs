use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::unbounded;
use pianola::Result;
use pianola::events::{ChannelEvent, KeyState, KeyTransition, Timeline};
use pianola::timing::{ControlEvent, PlaybackOutcome, PlaybackState, Scheduler, build_timeline};
use pianola::transport::Transport;
use pianola::ui::Display;

const MS: u64 = 1_000_000;

#[derive(Default)]
struct Recorder {
    sent: Vec<(Instant, Vec<u8>)>,
}

impl Transport for Recorder {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.sent.push((Instant::now(), message.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
struct Keys {
    pressed: Vec<u8>,
}

impl Display for Keys {
    fn set_key_state(&mut self, pitch: u8, state: KeyState) {
        match state {
            KeyState::Pressed => self.pressed.push(pitch),
            KeyState::Released => self.pressed.retain(|&p| p != pitch),
        }
    }

    fn render(&mut self) -> Result<()> {
        Ok(())
    }

    fn resize(&mut self, _width: u16, _height: u16) {}
}

/// One note held for `length` nanoseconds.
fn held_note(length: u64) -> Timeline {
    let events = vec![
        ChannelEvent::new(0, [0x90, 60, 100]),
        ChannelEvent::new(length, [0x80, 60, 0]),
    ];
    let transitions = vec![
        KeyTransition::pressed(0, 60),
        KeyTransition::released(length, 60),
    ];
    build_timeline(&events, &transitions).unwrap()
}

#[test]
fn test_quit_is_seen_within_one_poll_interval() {
    let timeline = held_note(10_000 * MS);
    let (tx, mut rx) = unbounded();
    let mut scheduler = Scheduler::new(Recorder::default(), Keys::default())
        .poll_interval(Duration::from_millis(20));

    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        tx.send(ControlEvent::Quit).unwrap();
    });

    let started = Instant::now();
    let outcome = scheduler.play(&timeline, &mut rx).unwrap();
    let elapsed = started.elapsed();
    sender.join().unwrap();

    assert_eq!(outcome, PlaybackOutcome::Cancelled);
    assert_eq!(scheduler.state(), PlaybackState::Cancelled);
    assert!(elapsed >= Duration::from_millis(40));
    assert!(elapsed < Duration::from_secs(1), "quit took {elapsed:?}");

    // the release was never sent, the key stays down on screen
    assert_eq!(scheduler.transport().sent.len(), 1);
    assert_eq!(scheduler.display().pressed, vec![60]);
}

#[test]
fn test_paused_time_is_not_counted() {
    let timeline = held_note(100 * MS);
    let (tx, mut rx) = unbounded();
    let mut scheduler = Scheduler::new(Recorder::default(), Keys::default())
        .poll_interval(Duration::from_millis(10));

    let controller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        tx.send(ControlEvent::Pause).unwrap();
        thread::sleep(Duration::from_millis(200));
        tx.send(ControlEvent::Resume).unwrap();
    });

    let outcome = scheduler.play(&timeline, &mut rx).unwrap();
    controller.join().unwrap();
    assert_eq!(outcome, PlaybackOutcome::Completed);

    let sent = &scheduler.transport().sent;
    assert_eq!(sent.len(), 2);
    let gap = sent[1].0 - sent[0].0;
    // 100ms of music plus about 200ms paused
    assert!(gap >= Duration::from_millis(250), "gap was {gap:?}");
    assert!(scheduler.display().pressed.is_empty());
}

#[test]
fn test_disconnected_controls_let_playback_finish() {
    let timeline = held_note(40 * MS);
    let (tx, mut rx) = unbounded::<ControlEvent>();
    drop(tx);

    let mut scheduler = Scheduler::new(Recorder::default(), Keys::default());
    let outcome = scheduler.play(&timeline, &mut rx).unwrap();
    assert_eq!(outcome, PlaybackOutcome::Completed);
    assert_eq!(scheduler.transport().sent.len(), 2);
}

#[test]
fn test_scheduler_can_borrow_its_parts() {
    let timeline = held_note(MS);
    let (_tx, mut rx) = unbounded();
    let mut output = Recorder::default();
    let mut keys = Keys::default();

    Scheduler::new(&mut output, &mut keys)
        .play(&timeline, &mut rx)
        .unwrap();
    assert_eq!(output.sent.len(), 2);
    assert!(keys.pressed.is_empty());
}
