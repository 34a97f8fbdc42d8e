//! Error types for Lumen Core.

use lumen_abstraction::GatewayError;
use thiserror::Error;

/// Core error type for startup and serving.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Address parsing errors
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Gateway construction errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Result type alias for Lumen Core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_address_parsing() {
        let parse_err = "invalid:address:format".parse::<std::net::SocketAddr>().unwrap_err();
        let core_err: CoreError = parse_err.into();
        assert!(matches!(core_err, CoreError::InvalidAddress(_)));
    }

    #[test]
    fn test_core_error_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
    }

    #[test]
    fn test_core_error_gateway() {
        let core_err: CoreError = GatewayError::Configuration("no key".to_string()).into();
        assert_eq!(core_err.to_string(), "Gateway error: Configuration Error: no key");
    }

    #[test]
    fn test_core_error_config_display() {
        let err = CoreError::Config("bad toml".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad toml");
    }
}
