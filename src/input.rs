// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::{KeyboardState, Keycode, Scancode};

/// Keys the driver reacts to. Everything else maps to `Other`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    Escape,
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
    Other,
}

impl From<Keycode> for Key {
    fn from(keycode: Keycode) -> Self {
        match keycode {
            Keycode::Escape => Key::Escape,
            Keycode::W => Key::W,
            Keycode::A => Key::A,
            Keycode::S => Key::S,
            Keycode::D => Key::D,
            Keycode::Up => Key::Up,
            Keycode::Down => Key::Down,
            Keycode::Left => Key::Left,
            Keycode::Right => Key::Right,
            _ => Key::Other,
        }
    }
}

impl Key {
    fn scancode(self) -> Option<Scancode> {
        match self {
            Key::Escape => Some(Scancode::Escape),
            Key::W => Some(Scancode::W),
            Key::A => Some(Scancode::A),
            Key::S => Some(Scancode::S),
            Key::D => Some(Scancode::D),
            Key::Up => Some(Scancode::Up),
            Key::Down => Some(Scancode::Down),
            Key::Left => Some(Scancode::Left),
            Key::Right => Some(Scancode::Right),
            Key::Other => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyAction {
    Press,
    Repeat,
    Release,
}

/// Extracts the key transition carried by a keyboard event, if any.
pub fn key_event(event: &Event) -> Option<(Key, KeyAction)> {
    match event {
        Event::KeyDown {
            keycode: Some(keycode),
            repeat,
            ..
        } => {
            let action = if *repeat {
                KeyAction::Repeat
            } else {
                KeyAction::Press
            };
            Some((Key::from(*keycode), action))
        }
        Event::KeyUp {
            keycode: Some(keycode),
            ..
        } => Some((Key::from(*keycode), KeyAction::Release)),
        _ => None,
    }
}

/// The window closes when Escape is let go, not when it goes down.
pub fn requests_close(key: Key, action: KeyAction) -> bool {
    key == Key::Escape && action == KeyAction::Release
}

/// Whether `event` should raise the window's close flag: Escape released, an
/// OS quit, or the window manager closing the window.
pub fn close_requested(event: &Event) -> bool {
    match event {
        Event::Quit { .. }
        | Event::Window {
            win_event: WindowEvent::Close,
            ..
        } => true,
        other => key_event(other).is_some_and(|(key, action)| requests_close(key, action)),
    }
}

/// Snapshot of the held movement keys for one frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub look_up: bool,
    pub look_down: bool,
    pub look_left: bool,
    pub look_right: bool,
}

impl MovementKeys {
    pub fn set(&mut self, key: Key, held: bool) {
        match key {
            Key::W => self.forward = held,
            Key::S => self.back = held,
            Key::A => self.left = held,
            Key::D => self.right = held,
            Key::Up => self.look_up = held,
            Key::Down => self.look_down = held,
            Key::Left => self.look_left = held,
            Key::Right => self.look_right = held,
            Key::Escape | Key::Other => {}
        }
    }

    pub fn from_held<I: IntoIterator<Item = Key>>(keys: I) -> Self {
        let mut movement = Self::default();
        for key in keys {
            movement.set(key, true);
        }
        movement
    }

    /// Samples the current keyboard state.
    pub fn sample(keyboard: &KeyboardState) -> Self {
        const TRACKED: [Key; 8] = [
            Key::W,
            Key::A,
            Key::S,
            Key::D,
            Key::Up,
            Key::Down,
            Key::Left,
            Key::Right,
        ];

        Self::from_held(TRACKED.into_iter().filter(|key| {
            key.scancode()
                .is_some_and(|scancode| keyboard.is_scancode_pressed(scancode))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdl2::keyboard::Mod;

    fn key_down(keycode: Keycode, repeat: bool) -> Event {
        Event::KeyDown {
            timestamp: 0,
            window_id: 1,
            keycode: Some(keycode),
            scancode: Scancode::from_keycode(keycode),
            keymod: Mod::NOMOD,
            repeat,
        }
    }

    fn key_up(keycode: Keycode) -> Event {
        Event::KeyUp {
            timestamp: 0,
            window_id: 1,
            keycode: Some(keycode),
            scancode: Scancode::from_keycode(keycode),
            keymod: Mod::NOMOD,
            repeat: false,
        }
    }

    #[test]
    fn key_events_carry_press_repeat_and_release() {
        assert_eq!(
            key_event(&key_down(Keycode::Escape, false)),
            Some((Key::Escape, KeyAction::Press))
        );
        assert_eq!(
            key_event(&key_down(Keycode::Escape, true)),
            Some((Key::Escape, KeyAction::Repeat))
        );
        assert_eq!(
            key_event(&key_up(Keycode::Escape)),
            Some((Key::Escape, KeyAction::Release))
        );
        assert_eq!(key_event(&Event::Quit { timestamp: 0 }), None);
    }

    #[test]
    fn escape_key_up_event_requests_close() {
        assert!(close_requested(&key_up(Keycode::Escape)));
    }

    #[test]
    fn escape_key_down_event_does_not_request_close() {
        assert!(!close_requested(&key_down(Keycode::Escape, false)));
        assert!(!close_requested(&key_down(Keycode::Escape, true)));
    }

    #[test]
    fn other_key_up_event_does_not_request_close() {
        assert!(!close_requested(&key_up(Keycode::W)));
    }

    #[test]
    fn quit_event_requests_close() {
        assert!(close_requested(&Event::Quit { timestamp: 0 }));
    }

    #[test]
    fn escape_release_requests_close() {
        assert!(requests_close(Key::Escape, KeyAction::Release));
    }

    #[test]
    fn escape_press_and_repeat_do_not_request_close() {
        assert!(!requests_close(Key::Escape, KeyAction::Press));
        assert!(!requests_close(Key::Escape, KeyAction::Repeat));
    }

    #[test]
    fn other_key_release_does_not_request_close() {
        assert!(!requests_close(Key::W, KeyAction::Release));
        assert!(!requests_close(Key::Other, KeyAction::Release));
    }

    #[test]
    fn keycodes_map_to_tracked_keys() {
        assert_eq!(Key::from(Keycode::Escape), Key::Escape);
        assert_eq!(Key::from(Keycode::D), Key::D);
        assert_eq!(Key::from(Keycode::Left), Key::Left);
        assert_eq!(Key::from(Keycode::Space), Key::Other);
    }

    #[test]
    fn from_held_sets_matching_flags() {
        let keys = MovementKeys::from_held([Key::D, Key::A, Key::Up, Key::Escape]);
        assert!(keys.right);
        assert!(keys.left);
        assert!(keys.look_up);
        assert!(!keys.forward);
        assert!(!keys.look_down);
    }

    #[test]
    fn set_can_release_a_key() {
        let mut keys = MovementKeys::from_held([Key::W]);
        keys.set(Key::W, false);
        assert_eq!(keys, MovementKeys::default());
    }
}
