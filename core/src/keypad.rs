use core::fmt;

/// Host keys for each keypad key, indexed by key value.
///
/// ```text
/// Keypad       Keyboard
/// 1 2 3 C      1 2 3 4
/// 4 5 6 D      Q W E R
/// 7 8 9 E  =>  A S D F
/// A 0 B F      Z X C V
/// ```
pub const QWERTY_LAYOUT: [char; 16] = [
    'x', '1', '2', '3', 'q', 'w', 'e', 'a', 's', 'd', 'z', 'c', '4', 'r', 'f', 'v',
];

/// One of the 16 keys on the hexadecimal keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(u8);

impl Key {
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 0xF { Some(Self(value)) } else { None }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub fn from_qwerty(c: char) -> Option<Self> {
        let c = c.to_ascii_lowercase();
        QWERTY_LAYOUT
            .iter()
            .position(|&mapped| mapped == c)
            .map(|i| Self(i as u8))
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..16).map(Self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

/// Which keys are currently held, one bit per key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keypad {
    held: u16,
}

impl Keypad {
    pub fn key_down(&mut self, key: Key) {
        self.held |= 1u16 << key.0;
    }

    pub fn key_up(&mut self, key: Key) {
        self.held &= !(1u16 << key.0);
    }

    pub fn is_held(&self, key: Key) -> bool {
        (self.held >> key.0) & 0b1 == 1
    }

    pub fn lowest_held(&self) -> Option<Key> {
        if self.held == 0 {
            None
        } else {
            Some(Key(self.held.trailing_zeros() as u8))
        }
    }

    pub fn bits(&self) -> u16 {
        self.held
    }

    pub fn release_all(&mut self) {
        self.held = 0;
    }
}
