//! Serial link configuration
//!
//! [`SerialConfig`] carries every knob the transport needs: device path,
//! line parameters, the two receive timeouts, and the RS-485 turnaround
//! toggle. The value is immutable once a transport is opened with it;
//! changing parameters means closing and reopening the device.

use std::time::Duration;

use crate::error::{RtuError, RtuResult};

pub use tokio_serial::{DataBits, Parity, StopBits};

/// Default baud rate (the classic 9600 8N1 line)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default wait for the first response byte
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Default inter-byte silence that ends a frame.
///
/// At 9600 baud a character lasts ~1.15ms and the protocol's inter-frame
/// gap is 3.5 characters (~4ms); 20ms gives slow slaves headroom without
/// stalling the read loop.
pub const DEFAULT_BYTE_TIMEOUT: Duration = Duration::from_millis(20);

/// Serial line configuration for an RTU master connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub path: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Parity bit mode
    pub parity: Parity,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Maximum wait for the first byte of a response
    pub response_timeout: Duration,
    /// Inter-byte silence that marks the end of a frame
    pub byte_timeout: Duration,
    /// Drive the RTS line for half-duplex RS-485 turnaround
    pub rs485: bool,
}

impl SerialConfig {
    /// Create a configuration with 8N1 framing and default timeouts
    pub fn new<S: Into<String>>(path: S, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            byte_timeout: DEFAULT_BYTE_TIMEOUT,
            rs485: false,
        }
    }

    /// Set the parity mode
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set the data bits
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Set the stop bits
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the response timeout (per-call deadline for the first byte)
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the inter-byte timeout
    pub fn with_byte_timeout(mut self, timeout: Duration) -> Self {
        self.byte_timeout = timeout;
        self
    }

    /// Enable or disable RS-485 transmit-enable turnaround
    pub fn with_rs485(mut self, enabled: bool) -> Self {
        self.rs485 = enabled;
        self
    }

    /// Check the parameters the driver cannot reject for us
    pub fn validate(&self) -> RtuResult<()> {
        if self.path.is_empty() {
            return Err(RtuError::configuration("device path is empty"));
        }
        if self.baud_rate == 0 {
            return Err(RtuError::configuration("baud rate must be non-zero"));
        }
        if self.response_timeout.is_zero() {
            return Err(RtuError::configuration("response timeout must be non-zero"));
        }
        if self.byte_timeout.is_zero() {
            return Err(RtuError::configuration("byte timeout must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_9600_8n1() {
        let config = SerialConfig::new("/dev/ttyUSB0", DEFAULT_BAUD_RATE);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert!(!config.rs485, "RS-485 turnaround must default to off");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = SerialConfig::new("/dev/ttyS1", 19_200)
            .with_parity(Parity::Even)
            .with_stop_bits(StopBits::Two)
            .with_response_timeout(Duration::from_secs(1))
            .with_byte_timeout(Duration::from_millis(5))
            .with_rs485(true);

        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.stop_bits, StopBits::Two);
        assert_eq!(config.response_timeout, Duration::from_secs(1));
        assert_eq!(config.byte_timeout, Duration::from_millis(5));
        assert!(config.rs485);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(SerialConfig::new("", 9600).validate().is_err());
        assert!(SerialConfig::new("/dev/ttyUSB0", 0).validate().is_err());
        assert!(SerialConfig::new("/dev/ttyUSB0", 9600)
            .with_response_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SerialConfig::new("/dev/ttyUSB0", 9600)
            .with_byte_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
