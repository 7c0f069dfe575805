//! Autopilot mode identifiers and the selected-bug code mapping.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The autopilot's currently selected target parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Altitude hold.
    Alt,
    /// Vertical speed.
    Vs,
    /// Heading.
    Hdg,
    /// Course.
    Crs,
    /// Indicated airspeed.
    Ias,
    /// A source code or label that does not name a known mode.
    Unknown,
    /// Nothing has been bootstrapped or posted yet.
    #[default]
    Unset,
}

/// Maps a raw `(L:SELECTED_BUG_MODE)` code to a mode.
///
/// Total: anything outside 1..=5 (including NaN and non-integers) is `Unknown`.
pub fn map_mode(code: f64) -> Mode {
    if code.fract() != 0.0 {
        return Mode::Unknown;
    }
    match code as i64 {
        1 => Mode::Alt,
        2 => Mode::Vs,
        3 => Mode::Hdg,
        4 => Mode::Crs,
        5 => Mode::Ias,
        _ => Mode::Unknown,
    }
}

impl Mode {
    /// Wire label, `None` for `Unset`.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Mode::Alt => Some("ALT"),
            Mode::Vs => Some("VS"),
            Mode::Hdg => Some("HDG"),
            Mode::Crs => Some("CRS"),
            Mode::Ias => Some("IAS"),
            Mode::Unknown => Some("Unknown"),
            Mode::Unset => None,
        }
    }

    /// Parses a producer-supplied label. Unrecognized labels become `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "ALT" => Mode::Alt,
            "VS" => Mode::Vs,
            "HDG" => Mode::Hdg,
            "CRS" => Mode::Crs,
            "IAS" => Mode::Ias,
            _ => Mode::Unknown,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("UNSET"))
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(label) => serializer.serialize_str(label),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label: Option<String> = Option::deserialize(deserializer)?;
        Ok(label.map_or(Mode::Unset, |l| Mode::from_label(&l)))
    }
}
