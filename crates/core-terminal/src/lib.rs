//! Terminal backend abstraction and crossterm implementation.
//!
//! The backend owns the terminal mode transitions (raw mode + alternate
//! screen) and the keystroke source. Painting, layout and styling live in
//! the render crate; everything here must stay safe to
//! call exactly once on the way in and once on the way out, including the
//! panic path, which is why entering hands out an RAII guard.

use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use core_keymap::Key;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn size(&self) -> Result<(u16, u16)>;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard ensuring terminal state restoration even if caller
/// early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(crossterm::terminal::size()?)
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}

/// Terminal input relevant to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermEvent {
    Key(Key),
    Resize(u16, u16),
    /// Ctrl-C. Raw mode swallows the signal, so the interrupt arrives as a
    /// key chord and the event loop turns it into a clean quit.
    Interrupt,
}

/// Block until the next key or resize arrives.
pub fn read_event() -> Result<TermEvent> {
    loop {
        if let Some(ev) = translate(event::read()?) {
            return Ok(ev);
        }
    }
}

/// Wait at most `timeout` for a key or resize; `None` when the budget ran
/// out. This is the "nonblocking" input mode used while views are loading.
pub fn poll_event(timeout: Duration) -> Result<Option<TermEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    Ok(translate(event::read()?))
}

/// Map a crossterm event onto the subset the dispatcher understands.
/// Releases, media keys and mouse traffic are dropped.
fn translate(event: Event) -> Option<TermEvent> {
    match event {
        Event::Key(key) => {
            if key.kind != KeyEventKind::Release
                && key.modifiers.contains(KeyModifiers::CONTROL)
                && key.code == KeyCode::Char('c')
            {
                return Some(TermEvent::Interrupt);
            }
            translate_key(&key).map(TermEvent::Key)
        }
        Event::Resize(cols, rows) => Some(TermEvent::Resize(cols, rows)),
        _ => None,
    }
}

fn translate_key(event: &KeyEvent) -> Option<Key> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Insert => Key::Insert,
        KeyCode::Delete => Key::Delete,
        KeyCode::F(n) => Key::F(n),
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn key_event(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::empty(),
        }
    }

    #[test]
    fn maps_basic_char() {
        let ev = key_event(KeyCode::Char('j'), KeyEventKind::Press);
        assert_eq!(translate_key(&ev), Some(Key::Char('j')));
    }

    #[test]
    fn maps_named_keys() {
        assert_eq!(
            translate_key(&key_event(KeyCode::Enter, KeyEventKind::Press)),
            Some(Key::Enter)
        );
        assert_eq!(
            translate_key(&key_event(KeyCode::PageDown, KeyEventKind::Press)),
            Some(Key::PageDown)
        );
        assert_eq!(
            translate_key(&key_event(KeyCode::F(5), KeyEventKind::Press)),
            Some(Key::F(5))
        );
    }

    #[test]
    fn releases_are_dropped() {
        let ev = key_event(KeyCode::Char('j'), KeyEventKind::Release);
        assert_eq!(translate_key(&ev), None);
    }

    #[test]
    fn repeats_pass_through() {
        let ev = key_event(KeyCode::Down, KeyEventKind::Repeat);
        assert_eq!(translate_key(&ev), Some(Key::Down));
    }

    #[test]
    fn resize_translates() {
        assert_eq!(
            translate(Event::Resize(80, 24)),
            Some(TermEvent::Resize(80, 24))
        );
    }
}
