//! Data types for the relayed autopilot state.
//!
//! Defines the full state record pushed to displays and the partial
//! update shape posted by producers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::mode::{map_mode, Mode};

/// The autopilot's selected mode and its five tracked values.
///
/// This is also the exact JSON shape each display receives.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AutopilotState {
    /// Selected mode.
    pub mode: Mode,

    /// Altitude target in feet.
    pub altitude: f64,

    /// Vertical speed target in feet per minute.
    pub vertical_speed: f64,

    /// Heading target in degrees.
    pub heading: f64,

    /// Course in degrees.
    pub crs: f64,

    /// Indicated airspeed target in knots.
    pub ias: f64,
}

/// A producer update naming any subset of the state fields.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialAutopilotState {
    pub mode: Option<Mode>,
    pub altitude: Option<f64>,
    pub vertical_speed: Option<f64>,
    pub heading: Option<f64>,
    pub crs: Option<f64>,
    pub ias: Option<f64>,
}

impl PartialAutopilotState {
    /// Extracts the known fields from a JSON body.
    ///
    /// Unknown keys and wrong-typed values are ignored. A non-object body
    /// yields an empty update.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let number = |key: &str| obj.get(key).and_then(Value::as_f64);

        let mode = match obj.get("mode") {
            Some(Value::String(label)) => Some(Mode::from_label(label)),
            Some(Value::Number(code)) => code.as_f64().map(map_mode),
            Some(Value::Null) => Some(Mode::Unset),
            _ => None,
        };

        Self {
            mode,
            altitude: number("altitude"),
            vertical_speed: number("vertical_speed"),
            heading: number("heading"),
            crs: number("crs"),
            ias: number("ias"),
        }
    }

    /// Returns true if the update names no field.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrites the fields of `state` that this update names.
    pub fn apply_to(&self, state: &mut AutopilotState) {
        if let Some(mode) = self.mode {
            state.mode = mode;
        }
        if let Some(altitude) = self.altitude {
            state.altitude = altitude;
        }
        if let Some(vertical_speed) = self.vertical_speed {
            state.vertical_speed = vertical_speed;
        }
        if let Some(heading) = self.heading {
            state.heading = heading;
        }
        if let Some(crs) = self.crs {
            state.crs = crs;
        }
        if let Some(ias) = self.ias {
            state.ias = ias;
        }
    }
}

/// A committed state together with its store version.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Number of commits so far; 0 means nothing was ever applied.
    pub version: u64,
    pub state: AutopilotState,
}
