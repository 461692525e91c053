#[cfg(feature = "x11")]
pub mod x11;

use std::io::Write;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::dispatch::{CancelToken, KeySink, Pacer, ThreadPacer};
use crate::error::KeyInjectionError;
use crate::keyboard::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    X11,
    /// Write the typed text to stdout instead of a virtual keyboard.
    Echo,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn backend_unavailable_message() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();

    let mut parts = Vec::new();
    for name in ["WAYLAND_DISPLAY", "WAYLAND_SOCKET", "DISPLAY"] {
        if env_is_set(name) {
            parts.push(format!("{name} is set"));
        }
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No display session detected (expected an X11 DISPLAY).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

fn auto_backend() -> PlaybackBackend {
    // Xwayland sessions export DISPLAY too, so X11 covers both.
    if env_is_set("DISPLAY") {
        PlaybackBackend::X11
    } else {
        PlaybackBackend::Auto
    }
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    let resolved = match requested {
        PlaybackBackend::Auto => auto_backend(),
        other => other,
    };

    match resolved {
        PlaybackBackend::Echo => Ok(resolved),
        PlaybackBackend::X11 => {
            if cfg!(feature = "x11") {
                Ok(resolved)
            } else {
                let how = match requested {
                    PlaybackBackend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {details}",
                    details = backend_unavailable_message()
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!(
            "No supported playback backend detected. {details}\n\
             Try `--backend echo` to print the typing to this terminal.",
            details = backend_unavailable_message(),
        )),
    }
}

/// Open the key sink for a resolved backend.
pub fn open_sink(backend: PlaybackBackend) -> Result<Box<dyn KeySink>> {
    match resolve_backend(backend)? {
        PlaybackBackend::Echo => Ok(Box::new(EchoSink::new(std::io::stdout()))),
        #[cfg(feature = "x11")]
        PlaybackBackend::X11 => Ok(Box::new(x11::X11Sink::connect()?)),
        other => Err(anyhow!("no sink available for backend {other:?}")),
    }
}

/// Count down on the log before typing starts. Returns false if cancelled.
pub fn countdown(secs: u64, cancel: &CancelToken) -> bool {
    if secs == 0 {
        return !cancel.is_cancelled();
    }

    info!("Focus the target window. Starting in {secs}s...");
    let mut pacer = ThreadPacer::default();
    for remaining in (1..=secs).rev() {
        if cancel.is_cancelled() {
            return false;
        }
        info!("{remaining}...");
        pacer.wait(std::time::Duration::from_secs(1), cancel);
    }
    !cancel.is_cancelled()
}

/// Key sink that writes characters to any writer; backspace erases the last
/// cell the way a terminal does.
#[derive(Debug)]
pub struct EchoSink<W: Write> {
    out: W,
}

impl<W: Write> EchoSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> KeySink for EchoSink<W> {
    fn send_key(&mut self, key: Key) -> Result<(), KeyInjectionError> {
        match key {
            Key::Char(c) => write!(self.out, "{c}")?,
            Key::Backspace => self.out.write_all(b"\x08 \x08")?,
        }
        self.out.flush()?;
        Ok(())
    }
}
