//! # Register/Coil Address Space Model
//!
//! Pure pre-flight validation of requests against the protocol-legal
//! quantity ranges and a caller-declared device map. A request that fails
//! here is rejected before a single byte is built or sent.
//!
//! ## Modbus Specification Limits
//!
//! - **Read Coils/Discrete Inputs (FC01/02)**: max 2000 bits per request
//! - **Read Holding/Input Registers (FC03/04)**: max 125 registers per request
//! - **Write Multiple Coils (FC15)**: max 1968 coils per request
//! - **Write Multiple Registers (FC16)**: max 123 registers per request
//!
//! Real devices usually expose far fewer addressable points than the
//! 16-bit address space allows; declaring the actual map sizes turns
//! off-by-one request bugs into immediate [`RtuError::AddressRange`]
//! failures instead of wire round-trips ending in slave exceptions.

use crate::constants::{MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_BITS, MAX_WRITE_REGISTERS};
use crate::error::{RtuError, RtuResult};
use crate::protocol::{FunctionCode, Request};

/// Full 16-bit address space, the default for every table
const FULL_TABLE: u32 = 65_536;

/// Caller-declared sizes of the four Modbus data tables.
///
/// # Example
///
/// ```rust
/// use ampere_rtu::AddressSpace;
///
/// // A device exposing 64 coils and 32 holding registers
/// let map = AddressSpace::new()
///     .with_coils(64)
///     .with_holding_registers(32);
///
/// assert_eq!(map.coils, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    /// Number of addressable coils (FC01/05/15)
    pub coils: u32,
    /// Number of addressable discrete inputs (FC02)
    pub discrete_inputs: u32,
    /// Number of addressable holding registers (FC03/06/16)
    pub holding_registers: u32,
    /// Number of addressable input registers (FC04)
    pub input_registers: u32,
}

impl AddressSpace {
    /// Create an address space spanning the full 16-bit range per table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coil table size
    pub fn with_coils(mut self, count: u32) -> Self {
        self.coils = count;
        self
    }

    /// Set the discrete input table size
    pub fn with_discrete_inputs(mut self, count: u32) -> Self {
        self.discrete_inputs = count;
        self
    }

    /// Set the holding register table size
    pub fn with_holding_registers(mut self, count: u32) -> Self {
        self.holding_registers = count;
        self
    }

    /// Set the input register table size
    pub fn with_input_registers(mut self, count: u32) -> Self {
        self.input_registers = count;
        self
    }

    /// Validate a request against protocol limits and the declared map.
    ///
    /// Checks, in order: the quantity lies in the protocol-legal range for
    /// the function code, then `address + quantity` stays inside the
    /// addressed table. Diagnostics requests carry a sub-function word
    /// instead of a table address and pass through.
    pub fn validate(&self, request: &Request) -> RtuResult<()> {
        let (cap, table, table_name) = match request.function {
            FunctionCode::ReadCoils => (MAX_READ_BITS, self.coils, "coil"),
            FunctionCode::ReadDiscreteInputs => {
                (MAX_READ_BITS, self.discrete_inputs, "discrete input")
            }
            FunctionCode::ReadHoldingRegisters => {
                (MAX_READ_REGISTERS, self.holding_registers, "holding register")
            }
            FunctionCode::ReadInputRegisters => {
                (MAX_READ_REGISTERS, self.input_registers, "input register")
            }
            FunctionCode::WriteSingleCoil => (1, self.coils, "coil"),
            FunctionCode::WriteSingleRegister => (1, self.holding_registers, "holding register"),
            FunctionCode::WriteMultipleCoils => (MAX_WRITE_BITS, self.coils, "coil"),
            FunctionCode::WriteMultipleRegisters => {
                (MAX_WRITE_REGISTERS, self.holding_registers, "holding register")
            }
            FunctionCode::Diagnostics => return Ok(()),
        };

        if request.quantity == 0 || request.quantity > cap {
            return Err(RtuError::address_range(format!(
                "{} quantity {} outside legal range 1-{} for {}",
                table_name, request.quantity, cap, request.function
            )));
        }

        let end = request.address as u32 + request.quantity as u32;
        if end > table {
            return Err(RtuError::address_range(format!(
                "{} range {}..{} exceeds declared table size {}",
                table_name, request.address, end, table
            )));
        }

        Ok(())
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self {
            coils: FULL_TABLE,
            discrete_inputs: FULL_TABLE,
            holding_registers: FULL_TABLE,
            input_registers: FULL_TABLE,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accepts_legal_reads() {
        let map = AddressSpace::default();
        assert!(map.validate(&Request::read_coils(1, 0, 2000)).is_ok());
        assert!(map
            .validate(&Request::read_holding_registers(1, 0, 125))
            .is_ok());
    }

    #[test]
    fn test_bit_read_quantity_cap() {
        let map = AddressSpace::default();
        let err = map
            .validate(&Request::read_coils(35, 0, 2001))
            .unwrap_err();
        assert!(matches!(err, RtuError::AddressRange { .. }));
    }

    #[test]
    fn test_register_read_quantity_cap() {
        let map = AddressSpace::default();
        assert!(map
            .validate(&Request::read_input_registers(1, 0, 126))
            .is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let map = AddressSpace::default();
        assert!(map.validate(&Request::read_coils(1, 0, 0)).is_err());
    }

    #[test]
    fn test_span_must_fit_declared_table() {
        let map = AddressSpace::new().with_coils(16);
        assert!(map.validate(&Request::read_coils(1, 0, 16)).is_ok());
        assert!(map.validate(&Request::read_coils(1, 8, 8)).is_ok());
        assert!(map.validate(&Request::read_coils(1, 8, 9)).is_err());
        assert!(map.validate(&Request::read_coils(1, 16, 1)).is_err());
    }

    #[test]
    fn test_span_at_top_of_full_table() {
        let map = AddressSpace::default();
        assert!(map.validate(&Request::read_coils(1, 65_535, 1)).is_ok());
        assert!(map.validate(&Request::read_coils(1, 65_535, 2)).is_err());
    }

    #[test]
    fn test_single_writes_use_table_size() {
        let map = AddressSpace::new().with_holding_registers(10);
        assert!(map
            .validate(&Request::write_single_register(1, 9, 0xBEEF))
            .is_ok());
        assert!(map
            .validate(&Request::write_single_register(1, 10, 0xBEEF))
            .is_err());
    }

    #[test]
    fn test_write_multiple_caps() {
        let map = AddressSpace::default();
        let coils = vec![false; 1969];
        assert!(map
            .validate(&Request::write_multiple_coils(1, 0, &coils))
            .is_err());
        let registers = vec![0u16; 124];
        assert!(map
            .validate(&Request::write_multiple_registers(1, 0, &registers))
            .is_err());
        let registers = vec![0u16; 123];
        assert!(map
            .validate(&Request::write_multiple_registers(1, 0, &registers))
            .is_ok());
    }

    #[test]
    fn test_diagnostics_bypasses_tables() {
        let map = AddressSpace::new().with_coils(0).with_holding_registers(0);
        assert!(map.validate(&Request::diagnostics(1, 0x0000, 0xBEEF)).is_ok());
    }
}
