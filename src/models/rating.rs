//! Letter ratings and eco-driving tips for an emission value.

use serde::Serialize;
use std::fmt;

/// A (very low) to F (very high) emission band, in g/km
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EmissionRating {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl EmissionRating {
    pub fn from_emission(grams_per_km: f64) -> Self {
        match grams_per_km {
            v if v < 100.0 => Self::A,
            v if v < 120.0 => Self::B,
            v if v < 140.0 => Self::C,
            v if v < 160.0 => Self::D,
            v if v < 180.0 => Self::E,
            _ => Self::F,
        }
    }
}

impl fmt::Display for EmissionRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        };
        f.write_str(letter)
    }
}

/// Advice accumulated from the highest band down to the general tips
pub fn eco_tips(grams_per_km: f64) -> Vec<&'static str> {
    let mut tips = Vec::new();
    if grams_per_km > 160.0 {
        tips.extend([
            "Consider switching to a more fuel-efficient vehicle",
            "Regular maintenance helps reduce emissions",
            "Avoid hard acceleration and braking",
        ]);
    }
    if grams_per_km > 140.0 {
        tips.extend([
            "Check tyre pressure regularly",
            "Remove excess weight from the vehicle",
        ]);
    }
    tips.extend([
        "Practise eco-driving techniques",
        "Plan trips to avoid traffic congestion",
    ]);
    tips
}
