use crate::definitions::keyboard;

#[cfg_attr(test, mockall::automock)]
/// The display sink, the runner hands it everything the host has to present.
pub trait DisplayCommands {
    /// Will display all the pixels, one byte per pixel (`0` or `1`), row-major.
    fn display(&mut self, pixels: &[u8]);
    /// Will start (`true`) or stop (`false`) the tone.
    fn sound(&mut self, active: bool);
}

#[cfg_attr(test, mockall::automock)]
/// The input source, translating host events into the keypad state.
pub trait KeyboardCommands {
    /// Will return the current state of all the keys, or `None` once
    /// the host requested the emulation to stop.
    fn poll(&mut self) -> Option<[bool; keyboard::SIZE]>;
}

/// Will represent the internal keyboard
///
/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    keys: [bool; keyboard::SIZE],
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    /// Will set the given key, keys outside of the keypad are ignored.
    pub fn set_key(&mut self, key: usize, to: bool) {
        if let Some(state) = self.keys.get_mut(key) {
            *state = to;
        }
    }

    pub fn set_mult(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keys.copy_from_slice(keys);
    }

    pub fn get_keys(&self) -> &[bool] {
        &self.keys
    }

    /// Will return the state of the given key, `None` if there is no such key.
    pub fn is_pressed(&self, key: usize) -> Option<bool> {
        self.keys.get(key).copied()
    }

    /// Will return the lowest key that is currently pressed.
    pub fn first_pressed(&self) -> Option<usize> {
        self.keys.iter().position(|&key| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pressed() {
        let mut keyboard = Keyboard::new();
        assert_eq!(None, keyboard.first_pressed());

        keyboard.set_key(0xC, true);
        keyboard.set_key(0x3, true);
        assert_eq!(Some(0x3), keyboard.first_pressed());

        keyboard.set_key(0x3, false);
        assert_eq!(Some(0xC), keyboard.first_pressed());
    }

    #[test]
    fn test_set_key_outside_keypad() {
        let mut keyboard = Keyboard::new();
        keyboard.set_key(keyboard::SIZE, true);
        keyboard.set_key(usize::MAX, true);

        assert_eq!(&[false; keyboard::SIZE][..], keyboard.get_keys());
        assert_eq!(None, keyboard.first_pressed());
    }

    #[test]
    fn test_is_pressed_bounds() {
        let mut keys = [false; keyboard::SIZE];
        keys[0xF] = true;

        let mut keyboard = Keyboard::new();
        keyboard.set_mult(&keys);

        assert_eq!(Some(true), keyboard.is_pressed(0xF));
        assert_eq!(Some(false), keyboard.is_pressed(0x0));
        assert_eq!(None, keyboard.is_pressed(keyboard::SIZE));
        assert_eq!(&keys[..], keyboard.get_keys());
    }
}
