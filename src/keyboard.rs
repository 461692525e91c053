use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

/// Identifier handed to a key sink: one press-and-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c:?}"),
            Key::Backspace => f.write_str("Backspace"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_Q: u32 = 16;
pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_A: u32 = 30;
pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_BACKSLASH: u32 = 43;
pub const KEY_Z: u32 = 44;
pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;
pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

// Each physical row of a US keyboard starts at a known keycode and the
// keycodes run consecutively along it.
const US_ROWS: [(u32, &str, &str); 4] = [
    (KEY_1, "1234567890-=", "!@#$%^&*()_+"),
    (KEY_Q, "qwertyuiop[]", "QWERTYUIOP{}"),
    (KEY_A, "asdfghjkl;'`", "ASDFGHJKL:\"~"),
    (KEY_Z, "zxcvbnm,./", "ZXCVBNM<>?"),
];

/// Keystroke producing `c` on a US QWERTY layout.
pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    match c {
        ' ' => {
            return Some(KeyStroke {
                keycode: KEY_SPACE,
                shift: false,
            })
        }
        '\n' => {
            return Some(KeyStroke {
                keycode: KEY_ENTER,
                shift: false,
            })
        }
        '\\' | '|' => {
            return Some(KeyStroke {
                keycode: KEY_BACKSLASH,
                shift: c == '|',
            })
        }
        _ => {}
    }

    US_ROWS.iter().find_map(|(first, plain, shifted)| {
        let (offset, shift) = match plain.chars().position(|p| p == c) {
            Some(offset) => (offset, false),
            None => (shifted.chars().position(|s| s == c)?, true),
        };
        Some(KeyStroke {
            keycode: first + offset as u32,
            shift,
        })
    })
}

pub fn typed_char_for_output_char(c: char) -> Option<char> {
    match c {
        '\n' => Some('\n'),
        '\t' | '\r' => None,

        // Editors with smart-quote substitution turn the ASCII keystroke back into
        // the curly form.
        '’' | '‘' => Some('\''),
        '”' | '“' => Some('"'),

        c if c.is_ascii_graphic() || c == ' ' => Some(c),
        _ => None,
    }
}

pub fn keystroke_for_output_char(c: char) -> Option<KeyStroke> {
    typed_char_for_output_char(c).and_then(char_to_keystroke)
}

pub fn keystroke_for_key(key: Key) -> Option<KeyStroke> {
    match key {
        Key::Char(c) => keystroke_for_output_char(c),
        Key::Backspace => Some(KeyStroke {
            keycode: KEY_BACKSPACE,
            shift: false,
        }),
    }
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| keystroke_for_output_char(c).is_none())
}

fn qwerty_neighbors(base: char) -> &'static [char] {
    match base {
        'a' => &['q', 'w', 's', 'z'],
        'b' => &['v', 'g', 'h', 'n'],
        'c' => &['x', 'd', 'f', 'v'],
        'd' => &['e', 'r', 'f', 'c', 'x', 's'],
        'e' => &['w', 's', 'd', 'f', 'r'],
        'f' => &['r', 't', 'g', 'd', 'v', 'c'],
        'g' => &['t', 'y', 'f', 'h', 'v', 'b'],
        'h' => &['y', 'u', 'g', 'j', 'n', 'b'],
        'i' => &['u', 'j', 'k', 'o'],
        'j' => &['u', 'i', 'k', 'h', 'm'],
        'k' => &['i', 'j', 'o', 'l', 'm', ','],
        'l' => &['k', 'o', 'p', ';', '.'],
        'm' => &['n', 'j', ','],
        'n' => &['b', 'h', 'j', 'm'],
        'o' => &['i', 'k', 'l', 'p'],
        'p' => &['o', 'l', ';', '['],
        'q' => &['w', 'a', 's'],
        'r' => &['e', 'd', 'f', 'g', 't'],
        's' => &['a', 'q', 'w', 'z', 'e', 'd', 'x'],
        't' => &['r', 'f', 'g', 'y'],
        'u' => &['y', 'h', 'j', 'i'],
        'v' => &['c', 'f', 'g', 'b'],
        'w' => &['q', 'a', 's', 'e'],
        'x' => &['z', 's', 'd', 'c'],
        'y' => &['t', 'u', 'g', 'h'],
        'z' => &['a', 's', 'x'],
        '1' => &['2', 'q'],
        '2' => &['1', '3', 'w'],
        '3' => &['2', '4', 'e'],
        '4' => &['3', '5', 'r'],
        '5' => &['4', '6', 't'],
        '6' => &['5', '7', 'y'],
        '7' => &['6', '8', 'u'],
        '8' => &['7', '9', 'i'],
        '9' => &['8', '0', 'o'],
        '0' => &['9', 'p'],
        '\'' => &[';'],
        _ => &[],
    }
}

/// A key next to `c` on a QWERTY keyboard, matching its case.
pub fn qwerty_adjacent_char(c: char, rng: &mut impl Rng) -> Option<char> {
    let chosen = *qwerty_neighbors(c.to_ascii_lowercase()).choose(rng)?;
    Some(if c.is_ascii_uppercase() {
        chosen.to_ascii_uppercase()
    } else {
        chosen
    })
}
