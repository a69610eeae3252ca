//! # Ampere RTU - Modbus RTU Master Transport & Transaction Engine
//!
//! A Modbus RTU **master** implementation in pure Rust: frame codec,
//! serial transport, transaction engine and link/protocol error recovery,
//! built on Tokio and `tokio-serial`. RTU over an asynchronous serial
//! line is the only transport; Modbus TCP is explicitly out of scope.
//!
//! ## Features
//!
//! - **Complete RTU framing**: CRC16/MODBUS validation, 256-byte ADU
//!   limit, silence-delimited frame reception with byte and response
//!   timeouts
//! - **Error recovery**: independently togglable link recovery (reopen
//!   the device) and protocol recovery (flush and retry), one retry per
//!   failure class per call
//! - **Pre-flight validation**: requests are checked against protocol
//!   limits and a caller-declared address map before any byte is sent
//! - **Typed results**: slave exceptions, link failures and malformed
//!   frames are distinct error variants, never strings
//! - **RS-485 aware**: optional RTS-driven transmit-enable turnaround for
//!   half-duplex lines
//! - **No global state**: configuration, connection and policy are plain
//!   values owned by the caller
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Master |
//! |------|----------|--------|
//! | 0x01 | Read Coils | ✅ |
//! | 0x02 | Read Discrete Inputs | ✅ |
//! | 0x03 | Read Holding Registers | ✅ |
//! | 0x04 | Read Input Registers | ✅ |
//! | 0x05 | Write Single Coil | ✅ |
//! | 0x06 | Write Single Register | ✅ |
//! | 0x08 | Diagnostics | ✅ |
//! | 0x0F | Write Multiple Coils | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ |
//!
//! Vendor-specific codes go through [`RtuMaster::execute_raw`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ampere_rtu::{RecoveryMode, RtuMaster, RtuResult, SerialConfig};
//!
//! #[tokio::main]
//! async fn main() -> RtuResult<()> {
//!     // 9600 8N1 with both recovery flags enabled
//!     let config = SerialConfig::new("/dev/ttyUSB0", 9600);
//!     let mut master = RtuMaster::open_with_recovery(config, RecoveryMode::all())?;
//!
//!     // Read 4 coils from slave 35
//!     let bits = master.read_coils(35, 0, 4).await?;
//!     println!("coils: {:?}", bits);
//!
//!     // Write a holding register
//!     master.write_single_register(35, 100, 0x1234).await?;
//!
//!     master.close().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus RTU protocol constants based on official specification
pub mod constants;

/// Modbus protocol definitions and message handling
pub mod protocol;

/// RTU frame codec (ADU assembly, CRC16, validation)
pub mod frame;

/// Register/coil address space model and pre-flight validation
pub mod address_space;

/// Serial link configuration
pub mod config;

/// Serial transport layer and link abstraction
pub mod transport;

/// Link and protocol error recovery policy
pub mod recovery;

/// Transaction engine and high-level RTU master
pub mod client;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use ampere_rtu::tokio) ===
pub use tokio;

// === Core master API ===
pub use client::RtuMaster;

// === Error handling ===
pub use error::{RtuError, RtuResult};

// === Core types ===
pub use protocol::{ExceptionCode, FunctionCode, Request, Response, SlaveAddress};

// === Configuration ===
pub use config::{DataBits, Parity, SerialConfig, StopBits};

// === Validation ===
pub use address_space::AddressSpace;

// === Recovery ===
pub use recovery::{FailureClass, RecoveryAction, RecoveryMode, RecoveryPolicy, RetryBudget};

// === Transport ===
pub use transport::{ConnectionState, RtuLink, SerialTransport, TransportStats};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    MAX_ADU_SIZE, MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_BITS, MAX_WRITE_REGISTERS,
};

/// Default baud rate re-exported beside the config type
pub use config::{DEFAULT_BAUD_RATE, DEFAULT_BYTE_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
