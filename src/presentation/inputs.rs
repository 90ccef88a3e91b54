use crate::domain::color::Rgb;
use crate::domain::models::TrainState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Speed,
    Brightness,
    Color,
}

/// Values behind the control screen widgets.
///
/// They follow the mirrored [`TrainState`], except for a control the user
/// is still holding: confirmations of earlier values would drag it back
/// while the pointer is down.
#[derive(Debug, Default)]
pub struct ControlInputs {
    pub speed: u8,
    pub brightness: u8,
    pub color: [u8; 3],
    speed_held: bool,
    brightness_held: bool,
    color_held: bool,
}

impl ControlInputs {
    pub fn new(state: &TrainState) -> Self {
        let mut inputs = Self::default();
        inputs.sync(state);
        inputs
    }

    /// Copy the mirror into every control that is not held.
    pub fn sync(&mut self, state: &TrainState) {
        for control in [Control::Speed, Control::Brightness, Control::Color] {
            if !self.is_held(control) {
                self.sync_one(control, state);
            }
        }
    }

    /// Record this frame's interaction with `control`. A control becomes
    /// held when it changes under a pressed pointer and is released with
    /// the pointer, at which point it catches up with `state`.
    pub fn track(&mut self, control: Control, changed: bool, pointer_down: bool, state: &TrainState) {
        let was_held = self.is_held(control);
        let held = (changed || was_held) && pointer_down;
        *self.held_mut(control) = held;
        if was_held && !held {
            self.sync_one(control, state);
        }
    }

    pub fn is_held(&self, control: Control) -> bool {
        match control {
            Control::Speed => self.speed_held,
            Control::Brightness => self.brightness_held,
            Control::Color => self.color_held,
        }
    }

    fn held_mut(&mut self, control: Control) -> &mut bool {
        match control {
            Control::Speed => &mut self.speed_held,
            Control::Brightness => &mut self.brightness_held,
            Control::Color => &mut self.color_held,
        }
    }

    fn sync_one(&mut self, control: Control, state: &TrainState) {
        match control {
            Control::Speed => self.speed = state.speed,
            Control::Brightness => self.brightness = state.brightness,
            Control::Color => {
                if let Ok(color) = state.light_color.parse::<Rgb>() {
                    self.color = color.to_array();
                }
            }
        }
    }
}
