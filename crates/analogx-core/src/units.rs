//! Unit-tagged scalar types
//!
//! Preset fields and chain parameters live in different unit domains. A knob
//! position is not a frequency, and a frequency is not a mix level; these
//! wrappers keep them apart at the type level. All of them serialize as a
//! bare JSON number.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! unit_type {
    ($(#[$meta:meta])* $name:ident, $suffix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> f64 {
                self.0
            }
        }

        impl From<f64> for $name {
            fn from(value: f64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", self.0, $suffix)
            }
        }
    };
}

unit_type!(
    /// Knob position in control space, independent of the parameter it drives
    Normalized,
    ""
);

unit_type!(
    /// Frequency in Hz (also used for rate-like values such as LFO speed)
    Hertz,
    " Hz"
);

unit_type!(
    /// Duration in seconds
    Seconds,
    " s"
);

unit_type!(
    /// Dimensionless physical amount: mix, gain, feedback, modulation depth
    Amount,
    ""
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_serialize_as_bare_numbers() {
        assert_eq!(serde_json::to_string(&Hertz(440.0)).unwrap(), "440.0");
        assert_eq!(serde_json::from_str::<Seconds>("0.25").unwrap(), Seconds(0.25));
    }

    #[test]
    fn test_units_reject_strings() {
        assert!(serde_json::from_str::<Normalized>("\"0.5\"").is_err());
    }

    #[test]
    fn test_display_carries_unit_suffix() {
        assert_eq!(Hertz(30.0).to_string(), "30 Hz");
        assert_eq!(Seconds(0.5).to_string(), "0.5 s");
    }
}
