//! Modbus RTU protocol constants based on official specification
//!
//! These constants are derived from the official Modbus specification:
//! - Maximum ADU size on a serial line: 256 bytes
//! - Register/coil limits are calculated to fit within the PDU size constraint

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Maximum ADU (Application Data Unit) size on an RTU serial line
/// Format: Slave Address (1) + PDU (max 253) + CRC (2) = 256 bytes
pub const MAX_ADU_SIZE: usize = 256;

/// Minimum ADU size
/// Format: Slave Address (1) + Function Code (1) + CRC (2) = 4 bytes
pub const MIN_ADU_SIZE: usize = 4;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

/// Length of the trailing CRC16 field
pub const CRC_LEN: usize = 2;

// ============================================================================
// Slave Addressing
// ============================================================================

/// Broadcast address (write requests only, no response expected)
pub const BROADCAST_ADDRESS: u8 = 0;

/// Lowest assignable unicast slave address
pub const MIN_SLAVE_ADDRESS: u8 = 1;

/// Highest assignable unicast slave address (248-255 are reserved)
pub const MAX_SLAVE_ADDRESS: u8 = 247;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers for FC03/FC04 (Read Holding/Input Registers)
///
/// The response PDU is function code (1) + byte count (1) + N × 2 data
/// bytes, so 1 + 1 + (N × 2) ≤ 253 gives N ≤ 125.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum number of registers for FC16 (Write Multiple Registers)
///
/// The request PDU is function code (1) + starting address (2) +
/// quantity (2) + byte count (1) + N × 2 value bytes, so
/// 1 + 2 + 2 + 1 + (N × 2) ≤ 253 gives N ≤ 123.
pub const MAX_WRITE_REGISTERS: u16 = 123;

// ============================================================================
// Coil Operation Limits
// ============================================================================

/// Maximum number of coils for FC01/FC02 (Read Coils/Discrete Inputs)
///
/// The response PDU is function code (1) + byte count (1) +
/// ceil(N / 8) data bytes; the protocol fixes the cap at 2000 bits,
/// comfortably inside the 253-byte PDU.
pub const MAX_READ_BITS: u16 = 2000;

/// Maximum number of coils for FC15 (Write Multiple Coils)
///
/// The request PDU is function code (1) + starting address (2) +
/// quantity (2) + byte count (1) + ceil(N / 8) value bytes; the
/// protocol fixes the cap at 1968 bits (0x7B0).
pub const MAX_WRITE_BITS: u16 = 1968;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Coils (FC01)
pub const FC_READ_COILS: u8 = 0x01;

/// Read Discrete Inputs (FC02)
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Coil (FC05)
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Diagnostics (FC08)
pub const FC_DIAGNOSTICS: u8 = 0x08;

/// Write Multiple Coils (FC15)
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// High bit marking an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Slave Device Failure
pub const EXCEPTION_SLAVE_DEVICE_FAILURE: u8 = 0x04;

/// Acknowledge
pub const EXCEPTION_ACKNOWLEDGE: u8 = 0x05;

/// Slave Device Busy
pub const EXCEPTION_SLAVE_DEVICE_BUSY: u8 = 0x06;

/// Memory Parity Error
pub const EXCEPTION_MEMORY_PARITY_ERROR: u8 = 0x08;

/// Gateway Path Unavailable
pub const EXCEPTION_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;

/// Gateway Target Device Failed to Respond
pub const EXCEPTION_GATEWAY_TARGET_FAILED: u8 = 0x0B;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MAX_ADU_SIZE, 1 + MAX_PDU_SIZE + CRC_LEN);
        assert_eq!(MIN_ADU_SIZE, 4);
    }

    #[test]
    fn test_register_limits_fit_the_pdu() {
        let read_pdu_size = 1 + 1 + (MAX_READ_REGISTERS as usize * 2);
        assert!(read_pdu_size <= MAX_PDU_SIZE);
        assert_eq!(MAX_READ_REGISTERS, 125);

        let write_pdu_size = 1 + 2 + 2 + 1 + (MAX_WRITE_REGISTERS as usize * 2);
        assert!(write_pdu_size <= MAX_PDU_SIZE);
        assert_eq!(MAX_WRITE_REGISTERS, 123);
    }

    #[test]
    fn test_coil_limits_fit_the_pdu() {
        let read_coil_bytes = (MAX_READ_BITS as usize).div_ceil(8);
        assert!(1 + 1 + read_coil_bytes <= MAX_PDU_SIZE);
        assert_eq!(MAX_READ_BITS, 2000);

        let write_coil_bytes = (MAX_WRITE_BITS as usize).div_ceil(8);
        assert!(1 + 2 + 2 + 1 + write_coil_bytes <= MAX_PDU_SIZE);
        assert_eq!(MAX_WRITE_BITS, 1968);
    }

    #[test]
    fn test_slave_address_ranges() {
        assert_eq!(BROADCAST_ADDRESS, 0);
        assert!(MIN_SLAVE_ADDRESS <= MAX_SLAVE_ADDRESS);
        assert_eq!(MAX_SLAVE_ADDRESS, 247);
    }
}
