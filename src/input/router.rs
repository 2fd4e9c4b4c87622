//! Pause state machine routing input into the camera

use crate::gfx::camera::{Camera, CameraMovement};

use super::{CursorMode, InputEvent, Key, RouterAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseState {
    #[default]
    Unpaused,
    Paused,
}

impl PauseState {
    fn toggled(self) -> Self {
        match self {
            PauseState::Unpaused => PauseState::Paused,
            PauseState::Paused => PauseState::Unpaused,
        }
    }

    fn cursor_mode(self) -> CursorMode {
        match self {
            PauseState::Unpaused => CursorMode::Captured,
            PauseState::Paused => CursorMode::Free,
        }
    }
}

const MOVEMENT_KEYS: [(Key, CameraMovement); 4] = [
    (Key::Forward, CameraMovement::Forward),
    (Key::Backward, CameraMovement::Backward),
    (Key::Left, CameraMovement::Left),
    (Key::Right, CameraMovement::Right),
];

/// Routes input events to the camera according to the pause state.
///
/// Movement keys are tracked as held state and applied once per frame by
/// [`InputRouter::apply_movement`], so movement speed does not depend on key
/// repeat rates. Look and zoom input is applied as events arrive.
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    state: PauseState,
    last_cursor: Option<(f64, f64)>,
    held: [bool; MOVEMENT_KEYS.len()],
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PauseState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == PauseState::Paused
    }

    pub fn cursor_mode(&self) -> CursorMode {
        self.state.cursor_mode()
    }

    /// Forgets the cursor baseline; the next sample reports no movement.
    pub fn reset_cursor(&mut self) {
        self.last_cursor = None;
    }

    /// Handles one event and reports what the application must do next.
    pub fn handle(&mut self, event: InputEvent, camera: &mut Camera) -> RouterAction {
        match event {
            InputEvent::CloseRequested => RouterAction::Exit,
            InputEvent::Resized { width, height } => RouterAction::Resize(width, height),
            InputEvent::Key { key, pressed } => self.handle_key(key, pressed),
            InputEvent::CursorMoved { x, y } => {
                let (dx, dy) = self.cursor_delta(x, y);
                if !self.is_paused() {
                    camera.process_mouse_movement(dx, dy);
                }
                RouterAction::None
            }
            // zoom is not look input, the wheel works in both states
            InputEvent::Scroll { dy } => {
                camera.process_mouse_scroll(dy);
                RouterAction::None
            }
        }
    }

    /// Moves the camera for every held movement key, scaled by `dt` seconds.
    pub fn apply_movement(&self, dt: f32, camera: &mut Camera) {
        if self.is_paused() {
            return;
        }
        for (held, (_, movement)) in self.held.iter().zip(MOVEMENT_KEYS) {
            if *held {
                camera.process_keyboard(movement, dt);
            }
        }
    }

    fn handle_key(&mut self, key: Key, pressed: bool) -> RouterAction {
        if let Some(index) = MOVEMENT_KEYS.iter().position(|(k, _)| *k == key) {
            self.held[index] = pressed;
            return RouterAction::None;
        }

        match key {
            Key::Escape if pressed => RouterAction::Exit,
            Key::Pause if pressed => {
                self.state = self.state.toggled();
                log::debug!("Input state is now {:?}", self.state);
                RouterAction::SetCursorMode(self.state.cursor_mode())
            }
            _ => RouterAction::None,
        }
    }

    /// Delta from the previous sample, y reversed since screen y grows
    /// downward. The baseline follows the cursor even while paused.
    fn cursor_delta(&mut self, x: f64, y: f64) -> (f32, f32) {
        let delta = match self.last_cursor {
            Some((last_x, last_y)) => ((x - last_x) as f32, (last_y - y) as f32),
            None => (0.0, 0.0),
        };
        self.last_cursor = Some((x, y));
        delta
    }
}
