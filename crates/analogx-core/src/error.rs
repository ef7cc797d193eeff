//! Error types for analogx

use thiserror::Error;

use crate::signal_chain::ChainParam;

/// Log-curve domain that cannot be mapped (non-positive, non-finite, or empty)
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("Invalid curve domain [{min}, {max}]: bounds must be positive, finite and distinct")]
pub struct CurveDomainError {
    pub min: f64,
    pub max: f64,
}

/// Malformed or incomplete preset document
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Preset is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Invalid preset document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Preset that cannot be written as a decodable document
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Preset field `{0}` is not a finite number")]
    NonFinite(String),
    #[error("Preset encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected parameter write; the parameter keeps its previous value
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParamError {
    #[error("{param}: value {value} is not finite")]
    NonFinite { param: ChainParam, value: f64 },
    #[error("{param}: value {value} outside [{min}, {max}]")]
    OutOfRange {
        param: ChainParam,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Error)]
pub enum AnalogxError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("Curve error: {0}")]
    CurveDomain(#[from] CurveDomainError),
    #[error("Parameter error: {0}")]
    Param(#[from] ParamError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalogxError>;
