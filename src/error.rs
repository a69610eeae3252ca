//! Core error types and result handling
//!
//! Every fallible operation in this crate returns [`RtuResult`]. The error
//! taxonomy separates request-shape problems (never retried) from link and
//! protocol failures (offered to the recovery policy) and from slave
//! exceptions (a valid protocol answer, returned as-is).

use thiserror::Error;

use crate::protocol::ExceptionCode;

/// Result type used throughout the crate
pub type RtuResult<T> = Result<T, RtuError>;

/// Errors produced by the codec, transport and transaction engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RtuError {
    /// Serial parameters rejected before or by the driver
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The device path could not be opened
    #[error("Device unavailable: {message}")]
    DeviceUnavailable { message: String },

    /// The link is closed or degraded and cannot carry a transaction
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Read or write on the open device failed
    #[error("I/O error: {message}")]
    Io { message: String },

    /// No complete response within the configured timeouts.
    ///
    /// `bytes_received == 0` means the slave never answered (link-class);
    /// a non-zero count means the response died mid-frame (protocol-class).
    #[error("Timeout after {elapsed_ms}ms ({bytes_received} bytes received)")]
    Timeout {
        elapsed_ms: u64,
        bytes_received: usize,
    },

    /// CRC16 of the received frame does not match its trailing checksum
    #[error("CRC mismatch: expected {expected:#06X}, got {actual:#06X}")]
    Checksum { expected: u16, actual: u16 },

    /// Fewer bytes than the minimum ADU (address + function + CRC)
    #[error("Short frame: {len} bytes (minimum 4)")]
    ShortFrame { len: usize },

    /// Response came from a different slave than the request addressed
    #[error("Slave address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: u8, actual: u8 },

    /// Request rejected by the pre-flight address space check
    #[error("Address range error: {message}")]
    AddressRange { message: String },

    /// The slave answered with a Modbus exception instead of data
    #[error("Slave exception for function {function:#04X}: {code}")]
    SlaveException { function: u8, code: ExceptionCode },

    /// The assembled frame would not fit on the wire
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// A structurally valid frame that does not answer the request
    /// (wrong function echo, inconsistent byte count, bad write echo)
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// Function code byte outside the supported set
    #[error("Invalid function code: {code:#04X}")]
    InvalidFunction { code: u8 },

    /// Request field outside its legal range
    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl RtuError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a device-unavailable error
    pub fn device_unavailable<S: Into<String>>(message: S) -> Self {
        Self::DeviceUnavailable {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(elapsed_ms: u64, bytes_received: usize) -> Self {
        Self::Timeout {
            elapsed_ms,
            bytes_received,
        }
    }

    /// Create an address-range error
    pub fn address_range<S: Into<String>>(message: S) -> Self {
        Self::AddressRange {
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding<S: Into<String>>(message: S) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create an unexpected-response error
    pub fn unexpected_response<S: Into<String>>(message: S) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    /// Create an invalid-function error
    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// Create an invalid-data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// True when the slave answered with a protocol exception
    pub fn is_slave_exception(&self) -> bool {
        matches!(self, Self::SlaveException { .. })
    }
}

impl From<std::io::Error> for RtuError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let err = RtuError::Checksum {
            expected: 0xCDC5,
            actual: 0x0000,
        };
        assert_eq!(
            err.to_string(),
            "CRC mismatch: expected 0xCDC5, got 0x0000"
        );

        let err = RtuError::timeout(500, 0);
        assert_eq!(err.to_string(), "Timeout after 500ms (0 bytes received)");

        let err = RtuError::ShortFrame { len: 3 };
        assert_eq!(err.to_string(), "Short frame: 3 bytes (minimum 4)");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
        let err: RtuError = io_err.into();
        assert!(matches!(err, RtuError::Io { .. }));
    }

    #[test]
    fn test_slave_exception_predicate() {
        let err = RtuError::SlaveException {
            function: 0x01,
            code: ExceptionCode::IllegalDataAddress,
        };
        assert!(err.is_slave_exception());
        assert!(!RtuError::timeout(100, 0).is_slave_exception());
    }
}
