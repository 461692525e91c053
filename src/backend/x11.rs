use anyhow::{anyhow, Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::dispatch::KeySink;
use crate::error::KeyInjectionError;
use crate::keyboard::{
    char_to_keystroke, keystroke_for_key, Key, KEY_LEFTALT, KEY_LEFTCTRL, KEY_LEFTSHIFT,
    KEY_RIGHTALT, KEY_RIGHTCTRL, KEY_RIGHTSHIFT,
};

// X11 special focus value: the focused window follows the pointer.
const POINTER_ROOT: xproto::Window = 1;

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Option<u8> {
    // On Linux Xorg setups X11 keycodes are evdev + 8.
    u8::try_from(evdev_keycode.checked_add(8)?).ok()
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;
    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }
    Ok(())
}

fn require_explicit_focus(conn: &impl Connection) -> Result<()> {
    let focus = conn
        .get_input_focus()
        .context("failed to request input focus")?
        .reply()
        .context("failed to read input focus reply")?;

    if focus.focus == x11rb::NONE {
        return Err(anyhow!(
            "no X11 input focus detected; click into the target window before starting"
        ));
    }
    if focus.focus == POINTER_ROOT {
        return Err(anyhow!(
            "X11 input focus is set to PointerRoot; click into the target window to give it explicit focus"
        ));
    }
    Ok(())
}

/// Check a few representative keys so we don't type garbage on a non-US layout.
fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    for (plain, shifted) in [('a', 'A'), ('q', 'Q'), ('1', '!'), ('-', '_'), ('\'', '"')] {
        let stroke = char_to_keystroke(plain)
            .ok_or_else(|| anyhow!("no keystroke for {plain:?} in the US table"))?;
        let keycode = evdev_to_x11_keycode(stroke.keycode)
            .ok_or_else(|| anyhow!("evdev keycode {} out of range", stroke.keycode))?;

        let reply = conn
            .get_keyboard_mapping(keycode, 1)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to read keyboard mapping")?;

        // Latin-1 keysyms equal their character codes.
        let got0 = reply.keysyms.first().copied().unwrap_or(x11rb::NO_SYMBOL);
        let got1 = reply.keysyms.get(1).copied().unwrap_or(x11rb::NO_SYMBOL);
        if got0 != plain as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but keycode {keycode} maps to {got0:#x}/{got1:#x}. Try `setxkbmap us`."
            ));
        }
    }
    Ok(())
}

/// Virtual keyboard backed by the XTEST extension.
pub struct X11Sink {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Sink {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;
        require_explicit_focus(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?
            .root;

        let sink = Self { conn, root };
        sink.release_modifiers_best_effort();
        debug!(screen = screen_num, "connected to X11 with XTEST");
        Ok(sink)
    }

    fn fake_key(&self, evdev_keycode: u32, pressed: bool) -> Result<(), KeyInjectionError> {
        let keycode = evdev_to_x11_keycode(evdev_keycode).ok_or_else(|| {
            KeyInjectionError::Backend(format!("evdev keycode {evdev_keycode} out of range"))
        })?;
        let type_ = if pressed {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .map_err(|err| KeyInjectionError::Backend(err.to_string()))?;
        Ok(())
    }

    /// Release modifiers left down by an aborted earlier run.
    fn release_modifiers_best_effort(&self) {
        for keycode in [
            KEY_LEFTSHIFT,
            KEY_RIGHTSHIFT,
            KEY_LEFTCTRL,
            KEY_RIGHTCTRL,
            KEY_LEFTALT,
            KEY_RIGHTALT,
        ] {
            let _ = self.fake_key(keycode, false);
        }
        let _ = self.conn.flush();
    }
}

impl KeySink for X11Sink {
    fn send_key(&mut self, key: Key) -> Result<(), KeyInjectionError> {
        let stroke = keystroke_for_key(key).ok_or(KeyInjectionError::Unsupported(key))?;

        if stroke.shift {
            self.fake_key(KEY_LEFTSHIFT, true)?;
        }
        self.fake_key(stroke.keycode, true)?;
        self.fake_key(stroke.keycode, false)?;
        if stroke.shift {
            self.fake_key(KEY_LEFTSHIFT, false)?;
        }

        self.conn.flush().map_err(|err| {
            KeyInjectionError::Backend(format!("failed to flush X11 connection: {err}"))
        })
    }
}

impl Drop for X11Sink {
    fn drop(&mut self) {
        self.release_modifiers_best_effort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x11_keycodes_are_evdev_plus_eight() {
        assert_eq!(evdev_to_x11_keycode(crate::keyboard::KEY_A), Some(38));
        assert_eq!(evdev_to_x11_keycode(300), None);
    }
}
