//! Keyboard/mouse state and its mapping onto camera and session actions.

use std::collections::HashSet;

use recon_game::{Camera, Movement};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, VirtualKeyCode};

/// Degrees of FOV change per frame while the zoom button is held (or released).
pub const ZOOM_STEP: f32 = 2.0;
/// Pixels per wheel "line" for touchpads reporting pixel deltas.
const PIXELS_PER_LINE: f32 = 40.0;

/// One-shot actions triggered on key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleGlitch,
    ToggleBloom,
    Restart,
}

pub fn movement_for(key: VirtualKeyCode) -> Option<Movement> {
    match key {
        VirtualKeyCode::W => Some(Movement::Forward),
        VirtualKeyCode::S => Some(Movement::Backward),
        VirtualKeyCode::A => Some(Movement::Left),
        VirtualKeyCode::D => Some(Movement::Right),
        VirtualKeyCode::Space => Some(Movement::Up),
        VirtualKeyCode::LShift => Some(Movement::Down),
        _ => None,
    }
}

pub fn action_for(key: VirtualKeyCode) -> Option<Action> {
    match key {
        VirtualKeyCode::Escape => Some(Action::Quit),
        VirtualKeyCode::G => Some(Action::ToggleGlitch),
        VirtualKeyCode::B => Some(Action::ToggleBloom),
        VirtualKeyCode::R => Some(Action::Restart),
        _ => None,
    }
}

/// Scroll amount in wheel lines, positive away from the user.
pub fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
    }
}

#[derive(Debug, Default)]
pub struct Controls {
    held: HashSet<Movement>,
    zooming: bool,
    shots: u32,
}

impl Controls {
    /// Track a key. Returns the action to run, only on the press edge.
    pub fn key(&mut self, key: VirtualKeyCode, state: ElementState) -> Option<Action> {
        let pressed = state == ElementState::Pressed;
        if let Some(m) = movement_for(key) {
            if pressed {
                self.held.insert(m);
            } else {
                self.held.remove(&m);
            }
            return None;
        }
        match action_for(key) {
            Some(a) if pressed => Some(a),
            _ => None,
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Right => self.zooming = pressed,
            MouseButton::Left if pressed => self.shots += 1,
            _ => {}
        }
    }

    /// Shots fired since the last call.
    pub fn take_shots(&mut self) -> u32 {
        std::mem::take(&mut self.shots)
    }

    pub fn is_zooming(&self) -> bool {
        self.zooming
    }

    /// Per-frame camera update from held keys and the zoom button.
    pub fn apply(&self, camera: &mut Camera, dt: f32) {
        for m in &self.held {
            camera.process_movement(*m, dt);
        }
        if self.zooming {
            camera.process_zoom(ZOOM_STEP);
        } else {
            camera.relax_zoom(ZOOM_STEP);
        }
    }

    /// Drop held state, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held.clear();
        self.zooming = false;
    }
}
