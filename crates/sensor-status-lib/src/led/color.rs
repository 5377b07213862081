//! Status LED palette for HomeSeer HS-W*200+ switches.
//!
//! Each LED accepts one of eight fixed colors; the numeric value is what
//! the Z-Wave configuration parameter expects.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LedColor {
    Off = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Magenta = 4,
    Yellow = 5,
    Cyan = 6,
    White = 7,
}

impl LedColor {
    /// The full palette in parameter-value order.
    pub const ALL: [LedColor; 8] = [
        LedColor::Off,
        LedColor::Red,
        LedColor::Green,
        LedColor::Blue,
        LedColor::Magenta,
        LedColor::Yellow,
        LedColor::Cyan,
        LedColor::White,
    ];

    /// Configuration parameter value for this color.
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            LedColor::Off => "Off",
            LedColor::Red => "Red",
            LedColor::Green => "Green",
            LedColor::Blue => "Blue",
            LedColor::Magenta => "Magenta",
            LedColor::Yellow => "Yellow",
            LedColor::Cyan => "Cyan",
            LedColor::White => "White",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a color name (case-insensitive) or parameter value `0`–`7`.
pub fn parse_color(s: &str) -> crate::error::Result<LedColor> {
    let s = s.trim();

    if let Some(color) = LedColor::ALL
        .iter()
        .find(|c| c.name().eq_ignore_ascii_case(s))
    {
        return Ok(*color);
    }

    match s.parse::<usize>() {
        Ok(n) if n < LedColor::ALL.len() => Ok(LedColor::ALL[n]),
        _ => Err(crate::SensorStatusError::Color(format!(
            "Invalid color: {s} (use Off, Red, Green, Blue, Magenta, Yellow, Cyan, White or 0-7)"
        ))),
    }
}

/// Colors that count as "worth noticing" — everything except `Off` and the
/// background color.
pub fn interesting_colors(bg_color: LedColor) -> Vec<LedColor> {
    LedColor::ALL
        .iter()
        .copied()
        .filter(|&c| c != LedColor::Off && c != bg_color)
        .collect()
}
