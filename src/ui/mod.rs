pub mod keyboard;

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};
use tracing::debug;

use crate::error::{PlayerError, Result};
use crate::events::KeyState;
use crate::timing::{ControlEvent, ControlSource};
use keyboard::{
    BLACK_KEY_HEIGHT, HIGHEST_KEY, KeyboardState, LOWEST_KEY, WHITE_KEY_HEIGHT, centered_origin,
    is_black_key, is_on_keyboard, key_columns,
};

/// Visual observer of key presses.
pub trait Display {
    fn set_key_state(&mut self, pitch: u8, state: KeyState);

    fn render(&mut self) -> Result<()>;

    /// The output area changed size; the next `render` lays out again.
    fn resize(&mut self, width: u16, height: u16);
}

impl<D: Display + ?Sized> Display for &mut D {
    fn set_key_state(&mut self, pitch: u8, state: KeyState) {
        (**self).set_key_state(pitch, state)
    }

    fn render(&mut self) -> Result<()> {
        (**self).render()
    }

    fn resize(&mut self, width: u16, height: u16) {
        (**self).resize(width, height)
    }
}

const KEY_CELL: char = '\u{2588}';

/// An 88 key piano drawn in the terminal.
///
/// Owns the terminal for its lifetime: raw mode and the alternate screen are
/// restored on drop.
pub struct TerminalKeyboard {
    out: Stdout,
    keys: KeyboardState,
    origin: (u16, u16),
}

impl TerminalKeyboard {
    pub fn new() -> Result<Self> {
        let mut out = io::stdout();
        enable_raw_mode()
            .and_then(|_| execute!(out, EnterAlternateScreen, Hide))
            .map_err(|e| PlayerError::Display(format!("couldn't set up the terminal: {e}")))?;
        let (width, height) = terminal::size()?;

        Ok(Self {
            out,
            keys: KeyboardState::default(),
            origin: centered_origin(width, height),
        })
    }

    pub fn keys(&self) -> &KeyboardState {
        &self.keys
    }

    fn fill(&mut self, col: u16, row: u16, width: u16, height: u16, color: Color) -> io::Result<()> {
        let (ox, oy) = self.origin;
        let line: String = std::iter::repeat_n(KEY_CELL, usize::from(width)).collect();
        queue!(self.out, SetForegroundColor(color))?;
        for y in row..row + height {
            queue!(self.out, MoveTo(ox + col, oy + y), Print(&line))?;
        }
        Ok(())
    }

    fn draw(&mut self) -> io::Result<()> {
        let (ox, oy) = self.origin;
        queue!(self.out, ResetColor, Clear(ClearType::All))?;

        for pitch in (LOWEST_KEY..=HIGHEST_KEY).filter(|&p| !is_black_key(p)) {
            let Some((col, width)) = key_columns(pitch) else {
                continue;
            };
            let color = match self.keys.get(pitch) {
                KeyState::Pressed => Color::Blue,
                KeyState::Released => Color::White,
            };
            self.fill(col, 0, width, WHITE_KEY_HEIGHT, color)?;
            queue!(self.out, SetForegroundColor(Color::Black), SetBackgroundColor(Color::White))?;
            for y in 0..WHITE_KEY_HEIGHT {
                queue!(self.out, MoveTo(ox + col - 1, oy + y), Print('\u{2502}'))?;
            }
            queue!(self.out, ResetColor)?;
        }
        let right_edge = key_columns(HIGHEST_KEY).map_or(0, |(col, width)| col + width);
        queue!(self.out, SetForegroundColor(Color::Black), SetBackgroundColor(Color::White))?;
        for y in 0..WHITE_KEY_HEIGHT {
            queue!(self.out, MoveTo(ox + right_edge, oy + y), Print('\u{2502}'))?;
        }
        queue!(self.out, ResetColor)?;

        for pitch in (LOWEST_KEY..=HIGHEST_KEY).filter(|&p| is_black_key(p)) {
            let Some((col, width)) = key_columns(pitch) else {
                continue;
            };
            let color = match self.keys.get(pitch) {
                KeyState::Pressed => Color::Cyan,
                KeyState::Released => Color::Black,
            };
            self.fill(col, 0, width, BLACK_KEY_HEIGHT, color)?;
        }

        queue!(
            self.out,
            SetForegroundColor(Color::Magenta),
            MoveTo(ox, oy + WHITE_KEY_HEIGHT + 2),
            Print("press <CTRL + q> to quit"),
            MoveTo(ox, oy + WHITE_KEY_HEIGHT + 3),
            Print("press <space> to pause/unpause"),
            ResetColor
        )?;
        self.out.flush()
    }
}

impl Display for TerminalKeyboard {
    fn set_key_state(&mut self, pitch: u8, state: KeyState) {
        if !is_on_keyboard(pitch) {
            debug!(pitch, "key is not representable on an 88 key piano");
        }
        self.keys.set(pitch, state);
    }

    fn render(&mut self) -> Result<()> {
        Ok(self.draw()?)
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.origin = centered_origin(width, height);
    }
}

impl Drop for TerminalKeyboard {
    fn drop(&mut self) {
        let _ = execute!(self.out, ResetColor, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Playback controls read from the keyboard of the terminal.
///
/// Ctrl+Q or Ctrl+C quits, space pauses and resumes.
#[derive(Debug, Default)]
pub struct TerminalControls;

fn translate(event: Event, paused: bool) -> Option<ControlEvent> {
    match event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) => match code {
            KeyCode::Char('q' | 'c') if modifiers.contains(KeyModifiers::CONTROL) => {
                Some(ControlEvent::Quit)
            }
            KeyCode::Char(' ') if paused => Some(ControlEvent::Resume),
            KeyCode::Char(' ') => Some(ControlEvent::Pause),
            _ => None,
        },
        Event::Resize(width, height) => Some(ControlEvent::Resize { width, height }),
        _ => None,
    }
}

impl ControlSource for TerminalControls {
    fn poll(&mut self, timeout: Duration) -> Result<Option<ControlEvent>> {
        if event::poll(timeout)? {
            return Ok(translate(event::read()?, false));
        }
        Ok(None)
    }

    fn wait(&mut self) -> Result<ControlEvent> {
        loop {
            if let Some(control) = translate(event::read()?, true) {
                return Ok(control);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_translate_quit() {
        let ctrl_q = key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(translate(ctrl_q.clone(), false), Some(ControlEvent::Quit));
        assert_eq!(translate(ctrl_q, true), Some(ControlEvent::Quit));
        assert_eq!(
            translate(key(KeyCode::Char('c'), KeyModifiers::CONTROL), false),
            Some(ControlEvent::Quit)
        );
        assert_eq!(translate(key(KeyCode::Char('q'), KeyModifiers::NONE), false), None);
    }

    #[test]
    fn test_translate_space_depends_on_pause() {
        let space = key(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(translate(space.clone(), false), Some(ControlEvent::Pause));
        assert_eq!(translate(space, true), Some(ControlEvent::Resume));
    }

    #[test]
    fn test_translate_resize() {
        assert_eq!(
            translate(Event::Resize(120, 40), false),
            Some(ControlEvent::Resize {
                width: 120,
                height: 40
            })
        );
        assert_eq!(translate(Event::FocusGained, false), None);
    }
}
