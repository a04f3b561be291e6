//! Colors and color scales.
//!
//! Colors are 8-bit sRGB and parse from `#rgb` or `#rrggbb`. Scales
//! interpolate in CIE Lab (D50 white point).

mod scale;

pub use scale::{ColorScale, ScaleDomain, ScaleOptions};

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised when building colors or scales.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ColorError {
    /// Not a `#rgb` or `#rrggbb` string.
    #[error("invalid color '{0}'")]
    InvalidColor(String),

    /// Scales take two (linear) or three (diverging) colors.
    #[error("expected 2 or 3 colors, got {0}")]
    ColorCount(usize),

    /// A diverging scale needs the domain mean.
    #[error("a three-color scale needs the domain mean")]
    MissingMean,
}

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb` or `#rrggbb` (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        let invalid = || ColorError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Converts to CIE Lab.
    pub fn to_lab(self) -> Lab {
        let r = srgb_to_linear(self.r);
        let g = srgb_to_linear(self.g);
        let b = srgb_to_linear(self.b);

        let y = xyz_to_lab((0.2225045 * r + 0.7168786 * g + 0.0606169 * b) / YN);
        let (x, z) = if self.r == self.g && self.g == self.b {
            (y, y)
        } else {
            (
                xyz_to_lab((0.4360747 * r + 0.3850649 * g + 0.1430804 * b) / XN),
                xyz_to_lab((0.0139322 * r + 0.0971045 * g + 0.7141733 * b) / ZN),
            )
        };

        Lab {
            l: 116.0 * y - 16.0,
            a: 500.0 * (x - y),
            b: 200.0 * (y - z),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

// D50 reference white.
const XN: f64 = 0.96422;
const YN: f64 = 1.0;
const ZN: f64 = 0.82521;

const T0: f64 = 4.0 / 29.0;
const T1: f64 = 6.0 / 29.0;
const T2: f64 = 3.0 * T1 * T1;
const T3: f64 = T1 * T1 * T1;

fn srgb_to_linear(channel: u8) -> f64 {
    let x = channel as f64 / 255.0;
    if x <= 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(x: f64) -> f64 {
    255.0
        * if x <= 0.0031308 {
            12.92 * x
        } else {
            1.055 * x.powf(1.0 / 2.4) - 0.055
        }
}

fn xyz_to_lab(t: f64) -> f64 {
    if t > T3 {
        t.cbrt()
    } else {
        t / T2 + T0
    }
}

fn lab_to_xyz(t: f64) -> f64 {
    if t > T1 {
        t * t * t
    } else {
        T2 * (t - T0)
    }
}

fn to_channel(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.round().clamp(0.0, 255.0) as u8
    }
}

/// A color in CIE Lab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

impl Lab {
    /// Converts back to sRGB, clamping out-of-gamut channels.
    pub fn to_color(self) -> Color {
        let y = (self.l + 16.0) / 116.0;
        let x = y + self.a / 500.0;
        let z = y - self.b / 200.0;

        let x = XN * lab_to_xyz(x);
        let y = YN * lab_to_xyz(y);
        let z = ZN * lab_to_xyz(z);

        Color::rgb(
            to_channel(linear_to_srgb(3.1338561 * x - 1.6168667 * y - 0.4906146 * z)),
            to_channel(linear_to_srgb(-0.9787684 * x + 1.9161415 * y + 0.0334540 * z)),
            to_channel(linear_to_srgb(0.0719453 * x - 0.2289914 * y + 1.4052427 * z)),
        )
    }

    /// Linear interpolation; `t` outside `[0, 1]` extrapolates.
    pub fn lerp(self, other: Lab, t: f64) -> Lab {
        Lab {
            l: self.l + (other.l - self.l) * t,
            a: self.a + (other.a - self.a) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short_forms() {
        assert_eq!(Color::parse("#ff8000").unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(Color::parse("#F80").unwrap(), Color::rgb(255, 136, 0));
        assert_eq!("#eeeeee".parse::<Color>().unwrap(), Color::rgb(238, 238, 238));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "ff8000", "#ff80", "#gg0000", "#ff80001", "#é12"] {
            assert!(Color::parse(bad).is_err(), "{:?} should not parse", bad);
        }
    }

    #[test]
    fn test_display_is_lowercase_hex() {
        assert_eq!(Color::rgb(255, 136, 0).to_string(), "#ff8800");
    }

    #[test]
    fn test_lab_roundtrip() {
        for color in ["#ffffff", "#000000", "#1a9850", "#d73027", "#ffffbf", "#808080"] {
            let c = Color::parse(color).unwrap();
            assert_eq!(c.to_lab().to_color(), c, "roundtrip of {}", color);
        }
    }

    #[test]
    fn test_known_lab_values() {
        let white = Color::rgb(255, 255, 255).to_lab();
        assert!((white.l - 100.0).abs() < 1e-3);
        assert!(white.a.abs() < 1e-9 && white.b.abs() < 1e-9);

        // Pure red in D50 Lab.
        let red = Color::rgb(255, 0, 0).to_lab();
        assert!((red.l - 54.29).abs() < 0.05, "l = {}", red.l);
        assert!((red.a - 80.8).abs() < 0.1, "a = {}", red.a);
        assert!((red.b - 69.89).abs() < 0.1, "b = {}", red.b);
    }
}
