//! Windowing-independent input events and the pause-aware router
//!
//! The application adapts native window events into [`InputEvent`]s at the
//! boundary; everything past that point is plain data and can be driven from
//! tests.

pub mod router;

pub use router::{InputRouter, PauseState};

/// Logical keys the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Backward,
    Left,
    Right,
    Pause,
    Escape,
    Other,
}

/// A single input event, already translated from the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { key: Key, pressed: bool },
    /// Absolute cursor position in window pixels.
    CursorMoved { x: f64, y: f64 },
    /// Field-of-view change in degrees; negative zooms in.
    Scroll { dy: f32 },
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// How the windowing layer should treat the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Hidden and locked to the window for free-look.
    Captured,
    /// Visible and free to interact with the settings panel.
    Free,
}

/// Side effect the application must carry out after routing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterAction {
    None,
    Exit,
    SetCursorMode(CursorMode),
    Resize(u32, u32),
}
