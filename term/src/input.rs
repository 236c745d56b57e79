//! Keyboard input, read on its own thread.
//!
//! Terminals without the keyboard enhancement protocol only report presses
//! (and auto-repeats), so in that case a key counts as held for
//! [`HOLD_WINDOW`] after it was last seen.

use chip8vm_core::{Key, Keypad};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parking_lot::Mutex;
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

pub const HOLD_WINDOW: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press(Key),
    Release(Key),
    Redraw,
    Quit,
    Ignore,
}

/// Map a terminal event onto the keypad
pub fn translate(event: &Event) -> Action {
    match event {
        Event::Key(KeyEvent {
            code, modifiers, kind, ..
        }) => match code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char(c) => match Key::from_qwerty(*c) {
                Some(key) if *kind == KeyEventKind::Release => Action::Release(key),
                Some(key) => Action::Press(key),
                None => Action::Ignore,
            },
            _ => Action::Ignore,
        },
        Event::Resize(..) | Event::FocusGained => Action::Redraw,
        _ => Action::Ignore,
    }
}

/// Key state shared between the input thread and the main loop
#[derive(Debug)]
pub struct InputState {
    release_events: bool,
    last_pressed: [Option<Instant>; 16],
    redraw: bool,
    quit: bool,
}

impl InputState {
    pub fn new(release_events: bool) -> Self {
        Self {
            release_events,
            last_pressed: [None; 16],
            redraw: false,
            quit: false,
        }
    }

    pub fn apply(&mut self, action: Action, now: Instant) {
        match action {
            Action::Press(key) => self.last_pressed[key.value() as usize] = Some(now),
            Action::Release(key) => self.last_pressed[key.value() as usize] = None,
            Action::Redraw => self.redraw = true,
            Action::Quit => self.quit = true,
            Action::Ignore => (),
        }
    }

    /// Keys held as of `now`
    pub fn keypad(&self, now: Instant) -> Keypad {
        let mut keypad = Keypad::default();
        for key in Key::all() {
            let held = match self.last_pressed[key.value() as usize] {
                Some(_) if self.release_events => true,
                Some(pressed) => now.saturating_duration_since(pressed) < HOLD_WINDOW,
                None => false,
            };
            if held {
                keypad.key_down(key);
            }
        }
        keypad
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    /// Returns whether a redraw was requested since the last call
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }
}

/// Read terminal events until a quit is requested
pub fn spawn(state: Arc<Mutex<InputState>>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("input".to_owned())
        .spawn(move || {
            loop {
                let event = match event::read() {
                    Ok(event) => event,
                    Err(err) => {
                        log::error!("Could not read terminal events: {err}");
                        state.lock().request_quit();
                        return;
                    }
                };

                let action = translate(&event);
                log::trace!("{event:?} -> {action:?}");

                let mut state = state.lock();
                state.apply(action, Instant::now());
                if state.quit_requested() {
                    return;
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: KeyCode, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind))
    }

    fn key(value: u8) -> Key {
        Key::new(value).unwrap()
    }

    #[test]
    fn translate_keys() {
        assert_eq!(
            translate(&key_event(KeyCode::Char('1'), KeyEventKind::Press)),
            Action::Press(key(0x1))
        );
        assert_eq!(
            translate(&key_event(KeyCode::Char('v'), KeyEventKind::Repeat)),
            Action::Press(key(0xF))
        );
        assert_eq!(
            translate(&key_event(KeyCode::Char('X'), KeyEventKind::Release)),
            Action::Release(key(0x0))
        );
        assert_eq!(
            translate(&key_event(KeyCode::Char('p'), KeyEventKind::Press)),
            Action::Ignore
        );
        assert_eq!(
            translate(&key_event(KeyCode::Enter, KeyEventKind::Press)),
            Action::Ignore
        );
    }

    #[test]
    fn translate_quit() {
        assert_eq!(
            translate(&key_event(KeyCode::Esc, KeyEventKind::Press)),
            Action::Quit
        );
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(translate(&ctrl_c), Action::Quit);
        assert_eq!(translate(&Event::Resize(80, 24)), Action::Redraw);
    }

    #[test]
    fn release_events_hold_until_released() {
        let start = Instant::now();
        let mut state = InputState::new(true);

        state.apply(Action::Press(key(0xA)), start);
        state.apply(Action::Press(key(0x3)), start);
        let later = start + Duration::from_secs(5);
        assert_eq!(state.keypad(later).bits(), 1 << 0xA | 1 << 0x3);

        state.apply(Action::Release(key(0xA)), later);
        assert_eq!(state.keypad(later).bits(), 1 << 0x3);
    }

    #[test]
    fn presses_expire_without_release_events() {
        let start = Instant::now();
        let mut state = InputState::new(false);

        state.apply(Action::Press(key(0x5)), start);
        assert!(state.keypad(start + HOLD_WINDOW / 2).is_held(key(0x5)));
        assert!(!state.keypad(start + HOLD_WINDOW).is_held(key(0x5)));

        // auto-repeat keeps it alive
        state.apply(Action::Press(key(0x5)), start + HOLD_WINDOW / 2);
        assert!(state.keypad(start + HOLD_WINDOW).is_held(key(0x5)));
    }

    #[test]
    fn quit_and_redraw_flags() {
        let now = Instant::now();
        let mut state = InputState::new(true);
        assert!(!state.quit_requested());
        assert!(!state.take_redraw());

        state.apply(Action::Redraw, now);
        assert!(state.take_redraw());
        assert!(!state.take_redraw());

        state.apply(Action::Quit, now);
        assert!(state.quit_requested());
    }
}
