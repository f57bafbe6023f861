use serde::{Deserialize, Serialize};

/// A tagged physical quantity, converted to seconds / radians / rad per second with `si()`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Sec(f64),
    Millis(f64),
    Micros(f64),
    Radians(f64),
    Degrees(f64),
    RadPerSec(f64),
    Hz(f64),
}

impl Unit {
    pub fn si(&self) -> f64 {
        match *self {
            Unit::Sec(v) => v,
            Unit::Millis(v) => v*1e-3,
            Unit::Micros(v) => v*1e-6,
            Unit::Radians(v) => v,
            Unit::Degrees(v) => v.to_radians(),
            Unit::RadPerSec(v) => v,
            Unit::Hz(v) => 2.0*std::f64::consts::PI*v,
        }
    }
}
