use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Charging station class. Each has a fixed contract current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargerType {
    #[default]
    Fast,
    Standard,
}

impl ChargerType {
    pub fn max_current_a(self) -> f64 {
        match self {
            ChargerType::Fast => 500.0,
            ChargerType::Standard => 125.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChargerType::Fast => "fast",
            ChargerType::Standard => "standard",
        }
    }
}

impl fmt::Display for ChargerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChargerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(ChargerType::Fast),
            "standard" => Ok(ChargerType::Standard),
            other => Err(format!("unknown charger type '{other}' (expected fast or standard)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_outruns_standard() {
        assert!(ChargerType::Fast.max_current_a() > ChargerType::Standard.max_current_a());
    }

    #[test]
    fn test_parse_and_serde_names_agree() {
        for charger in [ChargerType::Fast, ChargerType::Standard] {
            assert_eq!(charger.name().parse::<ChargerType>(), Ok(charger));
            let json = serde_json::to_string(&charger).unwrap();
            assert_eq!(json, format!("\"{}\"", charger.name()));
        }
        assert!("supercharger".parse::<ChargerType>().is_err());
    }
}
