// Copyright © 2026 Rudis Laboratories LLC

use thiserror::Error;

/// Error type for capability lookups, conversions and platform access
#[derive(Debug, Error)]
pub enum Error {
    /// A logical name the profile does not define (input, output, LED colour, serial port)
    #[error("{kind} '{name}' not defined for {model}")]
    NotFound {
        kind: &'static str,
        name: String,
        model: String,
    },

    /// Argument outside the documented domain of a function
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Reference value that would make a conversion divide by zero or go non-finite
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Feature the hardware does not have
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Text that could not be parsed into the expected record
    #[error("parse error: {0}")]
    Parse(String),

    /// A GPIO line could not be exported, configured, read or driven
    #[error("GPIO {line}: {action} failed: {source}")]
    Gpio {
        line: String,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
