//! Profile data mode (processing stage) handling.

use serde::{Deserialize, Serialize};

/// Processing stage of a profile as published by the archive.
///
/// Encoded in the source files as a single character per profile:
/// `R` (real-time), `D` (delayed-mode) or `A` (adjusted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataMode {
    RealTime,
    DelayedMode,
    Adjusted,
}

impl DataMode {
    /// Decode from the archive's single-character code.
    ///
    /// Anything other than the three known codes falls back to real-time,
    /// which is what the archive itself assumes for unlabeled data.
    pub fn from_code(code: char) -> Self {
        match code.to_ascii_uppercase() {
            'D' => DataMode::DelayedMode,
            'A' => DataMode::Adjusted,
            _ => DataMode::RealTime,
        }
    }

    /// The single-character code stored in the database.
    pub fn as_code(&self) -> &'static str {
        match self {
            DataMode::RealTime => "R",
            DataMode::DelayedMode => "D",
            DataMode::Adjusted => "A",
        }
    }
}

impl Default for DataMode {
    fn default() -> Self {
        DataMode::RealTime
    }
}

impl std::fmt::Display for DataMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataMode::RealTime => "Real-Time",
            DataMode::DelayedMode => "Delayed-Mode",
            DataMode::Adjusted => "Adjusted",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(DataMode::from_code('R'), DataMode::RealTime);
        assert_eq!(DataMode::from_code('D'), DataMode::DelayedMode);
        assert_eq!(DataMode::from_code('a'), DataMode::Adjusted);
    }

    #[test]
    fn test_unknown_code_defaults_to_real_time() {
        assert_eq!(DataMode::from_code('x'), DataMode::RealTime);
        assert_eq!(DataMode::from_code(' '), DataMode::RealTime);
    }

    #[test]
    fn test_code_roundtrip() {
        for mode in [DataMode::RealTime, DataMode::DelayedMode, DataMode::Adjusted] {
            let code = mode.as_code().chars().next().unwrap();
            assert_eq!(DataMode::from_code(code), mode);
        }
    }
}
