//! Shared value types used across the pipeline, the driver and the config.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PpoiError {
    #[error("Point of interest ({x}, {y}) must lie within [0, 1] x [0, 1]")]
    OutOfRange { x: f64, y: f64 },
    #[error("Invalid point of interest '{0}', expected '<x>x<y>' such as '0.5x0.5'")]
    Parse(String),
}

/// Primary point of interest: the visually important spot of a source image,
/// as fractions of its width and height.
///
/// Always within `[0, 1] x [0, 1]`; construction rejects anything else.
/// The textual form is `<x>x<y>`, e.g. `0.5x0.5` for the center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ppoi {
    x: f64,
    y: f64,
}

impl Ppoi {
    pub const CENTER: Ppoi = Ppoi { x: 0.5, y: 0.5 };

    pub fn new(x: f64, y: f64) -> Result<Self, PpoiError> {
        let valid = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if valid(x) && valid(y) {
            Ok(Self { x, y })
        } else {
            Err(PpoiError::OutOfRange { x, y })
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Default for Ppoi {
    fn default() -> Self {
        Self::CENTER
    }
}

impl fmt::Display for Ppoi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

impl FromStr for Ppoi {
    type Err = PpoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || PpoiError::Parse(s.to_string());
        let (x, y) = s.trim().split_once('x').ok_or_else(parse_err)?;
        let x: f64 = x.trim().parse().map_err(|_| parse_err())?;
        let y: f64 = y.trim().parse().map_err(|_| parse_err())?;
        Self::new(x, y)
    }
}

impl TryFrom<String> for Ppoi {
    type Error = PpoiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ppoi> for String {
    fn from(ppoi: Ppoi) -> Self {
        ppoi.to_string()
    }
}
