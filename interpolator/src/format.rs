//! Names and keywords of the model file format.
//!
//! A model file holds one record per layer, terminal layer first. Every record stores the bias
//! row above the weight matrix and a header describing the layer and the input normalization.

use std::{fmt, str::FromStr};

/// Version stamped by the serializer, normalization statistics are fixed calibration values.
pub const VERSION_SAVED: &str = "0.0.2";

/// Version stamped by the patcher, with parameter descriptors and data derived statistics.
pub const VERSION_PATCHED: &str = "0.0.3";

/// Name of the record holding the output layer.
pub const TERMINAL_RECORD: &str = "TERM_WEIGHTS";

/// Amount of physical input parameters: effective temperature, surface gravity and metallicity.
pub const N_PARAMS: usize = 3;

/// Prefix of every normalization keyword, removed as a whole by the patcher.
pub const NORM_PREFIX: &str = "I_PR_";

/// Prefix of the parameter descriptor keywords.
pub const PARAM_PREFIX: &str = "I_P_";

pub const AFUNC: &str = "I_AFUNC";
pub const LAYER: &str = "I_LAYER";
pub const VERSION: &str = "I_VERSIO";
pub const PREPRO: &str = "I_PREPRO";
pub const POSTPR: &str = "I_POSTPR";
pub const HLAYER: &str = "I_HLAYER";

pub const CRPIX1: &str = "CRPIX1";
pub const CTYPE1: &str = "CTYPE1";
pub const CRVAL1: &str = "CRVAL1";
pub const CDELT1: &str = "CDELT1";

pub const AFUNC_COMMENT: &str = "Activation function";
pub const LAYER_COMMENT: &str = "Index of the target layer";
pub const VERSION_COMMENT: &str = "Version of the perceptron file format";
pub const PREPRO_COMMENT: &str = "Identification of the pre-processing function";
pub const POSTPR_COMMENT: &str = "Identification of the post-processing function";
pub const HLAYER_COMMENT: &str = "Number of hidden layers";
pub const CRVAL1_COMMENT: &str = r"Wavelength at first pixel \AA";
pub const CDELT1_COMMENT: &str = r"Step size in \AA";

/// Fixed normalization keywords of a saved file, `(mean, std)` per parameter.
pub const SAVED_STATS_KEYS: [(&str, &str); N_PARAMS] = [
    ("I_PR_TMU", "I_PR_TSI"),
    ("I_PR_GMU", "I_PR_GSI"),
    ("I_PR_MMU", "I_PR_MSI"),
];

/// Short names used in the comments of the fixed normalization keywords.
pub const SAVED_STATS_NAMES: [&str; N_PARAMS] = ["Teff", "logg", "[Fe/H]"];

/// Returns the name of the record of the `k`-th hidden layer, counted from 1 on the input side.
pub fn hidden_record(k: usize) -> String {
    format!("HIDDEN_LAYER_{k}")
}

/// The per parameter keywords written by the patcher, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    Name,
    Unit,
    Lower,
    Upper,
    Step,
    Mean,
    Std,
}

impl ParamField {
    pub const ALL: [ParamField; 7] = [
        Self::Name,
        Self::Unit,
        Self::Lower,
        Self::Upper,
        Self::Step,
        Self::Mean,
        Self::Std,
    ];

    /// Returns the keyword of this field for parameter `j`, counted from 1.
    pub fn key(self, j: usize) -> String {
        let stem = match self {
            Self::Name => "I_P_NM",
            Self::Unit => "I_P_UN",
            Self::Lower => "I_P_LB",
            Self::Upper => "I_P_HB",
            Self::Step => "I_P_ST",
            Self::Mean => "I_PR_B",
            Self::Std => "I_PR_S",
        };

        format!("{stem}{j}")
    }

    /// Returns the comment of this field for the parameter called `name`.
    pub fn comment(self, name: &str) -> String {
        match self {
            Self::Name => "name".to_string(),
            Self::Unit => "unit".to_string(),
            Self::Lower => "lower bound".to_string(),
            Self::Upper => "higher bound".to_string(),
            Self::Step => "step for numerical derivation".to_string(),
            Self::Mean => format!("Mean of the {name}"),
            Self::Std => format!("Std of the {name}"),
        }
    }
}

/// Activation tag of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Logistic,
}

impl Activation {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Logistic => "logistic",
        }
    }

    /// The activation of the record at `position` in the file.
    pub fn of_record(position: usize) -> Self {
        if position == 0 {
            Self::Linear
        } else {
            Self::Logistic
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "logistic" => Ok(Self::Logistic),
            other => Err(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_keys_fit_a_keyword() {
        for field in ParamField::ALL {
            for j in 1..=N_PARAMS {
                assert!(field.key(j).len() <= 8, "{}", field.key(j));
            }
        }

        assert_eq!(ParamField::Mean.key(2), "I_PR_B2");
        assert!(ParamField::Mean.key(1).starts_with(NORM_PREFIX));
        assert!(ParamField::Step.key(3).starts_with(PARAM_PREFIX));
    }

    #[test]
    fn only_the_first_record_is_linear() {
        assert_eq!(Activation::of_record(0), Activation::Linear);
        assert_eq!(Activation::of_record(3), Activation::Logistic);
        assert_eq!("logistic".parse::<Activation>(), Ok(Activation::Logistic));
        assert!("relu".parse::<Activation>().is_err());
    }
}
