//! Modbus protocol definitions and message handling
//!
//! Core protocol vocabulary: function codes, exception codes, and the
//! [`Request`]/[`Response`] pair the transaction engine exchanges. A
//! `Request` knows how to assemble its PDU payload; a `Response` knows how
//! to parse and cross-check the payload that came back.

use std::fmt;

use crate::constants::*;
use crate::error::{RtuError, RtuResult};

/// Modbus slave/unit address (1-247 unicast, 0 broadcast)
pub type SlaveAddress = u8;

/// Modbus function codes supported by the master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read Coils (0x01)
    ReadCoils = FC_READ_COILS,
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs = FC_READ_DISCRETE_INPUTS,
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = FC_READ_HOLDING_REGISTERS,
    /// Read Input Registers (0x04)
    ReadInputRegisters = FC_READ_INPUT_REGISTERS,
    /// Write Single Coil (0x05)
    WriteSingleCoil = FC_WRITE_SINGLE_COIL,
    /// Write Single Register (0x06)
    WriteSingleRegister = FC_WRITE_SINGLE_REGISTER,
    /// Diagnostics (0x08)
    Diagnostics = FC_DIAGNOSTICS,
    /// Write Multiple Coils (0x0F)
    WriteMultipleCoils = FC_WRITE_MULTIPLE_COILS,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = FC_WRITE_MULTIPLE_REGISTERS,
}

impl FunctionCode {
    /// Convert from the wire byte
    pub fn from_u8(value: u8) -> RtuResult<Self> {
        match value {
            FC_READ_COILS => Ok(FunctionCode::ReadCoils),
            FC_READ_DISCRETE_INPUTS => Ok(FunctionCode::ReadDiscreteInputs),
            FC_READ_HOLDING_REGISTERS => Ok(FunctionCode::ReadHoldingRegisters),
            FC_READ_INPUT_REGISTERS => Ok(FunctionCode::ReadInputRegisters),
            FC_WRITE_SINGLE_COIL => Ok(FunctionCode::WriteSingleCoil),
            FC_WRITE_SINGLE_REGISTER => Ok(FunctionCode::WriteSingleRegister),
            FC_DIAGNOSTICS => Ok(FunctionCode::Diagnostics),
            FC_WRITE_MULTIPLE_COILS => Ok(FunctionCode::WriteMultipleCoils),
            FC_WRITE_MULTIPLE_REGISTERS => Ok(FunctionCode::WriteMultipleRegisters),
            _ => Err(RtuError::invalid_function(value)),
        }
    }

    /// Convert to the wire byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if this is a bit-oriented read (FC01/FC02)
    pub fn is_bit_read(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs
        )
    }

    /// Check if this is a register-oriented read (FC03/FC04)
    pub fn is_register_read(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters
        )
    }

    /// Check if this is a read function
    pub fn is_read(self) -> bool {
        self.is_bit_read() || self.is_register_read()
    }

    /// Check if this is a write function
    pub fn is_write(self) -> bool {
        matches!(
            self,
            FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister
                | FunctionCode::WriteMultipleCoils
                | FunctionCode::WriteMultipleRegisters
        )
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FunctionCode::ReadCoils => "Read Coils",
            FunctionCode::ReadDiscreteInputs => "Read Discrete Inputs",
            FunctionCode::ReadHoldingRegisters => "Read Holding Registers",
            FunctionCode::ReadInputRegisters => "Read Input Registers",
            FunctionCode::WriteSingleCoil => "Write Single Coil",
            FunctionCode::WriteSingleRegister => "Write Single Register",
            FunctionCode::Diagnostics => "Diagnostics",
            FunctionCode::WriteMultipleCoils => "Write Multiple Coils",
            FunctionCode::WriteMultipleRegisters => "Write Multiple Registers",
        };
        write!(f, "{} (0x{:02X})", name, *self as u8)
    }
}

/// Modbus exception codes carried by a slave's rejection response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailed,
    /// Code outside the standard set, preserved verbatim
    Other(u8),
}

impl ExceptionCode {
    /// Convert from the wire byte
    pub fn from_u8(value: u8) -> Self {
        match value {
            EXCEPTION_ILLEGAL_FUNCTION => ExceptionCode::IllegalFunction,
            EXCEPTION_ILLEGAL_DATA_ADDRESS => ExceptionCode::IllegalDataAddress,
            EXCEPTION_ILLEGAL_DATA_VALUE => ExceptionCode::IllegalDataValue,
            EXCEPTION_SLAVE_DEVICE_FAILURE => ExceptionCode::SlaveDeviceFailure,
            EXCEPTION_ACKNOWLEDGE => ExceptionCode::Acknowledge,
            EXCEPTION_SLAVE_DEVICE_BUSY => ExceptionCode::SlaveDeviceBusy,
            EXCEPTION_MEMORY_PARITY_ERROR => ExceptionCode::MemoryParityError,
            EXCEPTION_GATEWAY_PATH_UNAVAILABLE => ExceptionCode::GatewayPathUnavailable,
            EXCEPTION_GATEWAY_TARGET_FAILED => ExceptionCode::GatewayTargetFailed,
            other => ExceptionCode::Other(other),
        }
    }

    /// Convert to the wire byte
    pub fn to_u8(self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => EXCEPTION_ILLEGAL_FUNCTION,
            ExceptionCode::IllegalDataAddress => EXCEPTION_ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => EXCEPTION_ILLEGAL_DATA_VALUE,
            ExceptionCode::SlaveDeviceFailure => EXCEPTION_SLAVE_DEVICE_FAILURE,
            ExceptionCode::Acknowledge => EXCEPTION_ACKNOWLEDGE,
            ExceptionCode::SlaveDeviceBusy => EXCEPTION_SLAVE_DEVICE_BUSY,
            ExceptionCode::MemoryParityError => EXCEPTION_MEMORY_PARITY_ERROR,
            ExceptionCode::GatewayPathUnavailable => EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
            ExceptionCode::GatewayTargetFailed => EXCEPTION_GATEWAY_TARGET_FAILED,
            ExceptionCode::Other(code) => code,
        }
    }

    /// Human-readable description per the specification
    pub fn description(self) -> &'static str {
        match self {
            ExceptionCode::IllegalFunction => "function code not allowed by the slave",
            ExceptionCode::IllegalDataAddress => "data address not allowed by the slave",
            ExceptionCode::IllegalDataValue => "value in the query is not allowed",
            ExceptionCode::SlaveDeviceFailure => "unrecoverable error in the slave",
            ExceptionCode::Acknowledge => "request accepted, long-running processing",
            ExceptionCode::SlaveDeviceBusy => "slave busy with a long-running command",
            ExceptionCode::MemoryParityError => "parity error in slave record memory",
            ExceptionCode::GatewayPathUnavailable => "gateway could not allocate a path",
            ExceptionCode::GatewayTargetFailed => "no response from the gateway target",
            ExceptionCode::Other(_) => "non-standard exception code",
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.to_u8(), self.description())
    }
}

/// A single Modbus request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Addressed slave (0 broadcasts write functions)
    pub slave: SlaveAddress,
    /// Operation selector
    pub function: FunctionCode,
    /// Starting address, or the sub-function word for Diagnostics
    pub address: u16,
    /// Quantity of bits/registers covered
    pub quantity: u16,
    /// Write values / diagnostic data, wire-encoded
    pub data: Vec<u8>,
}

impl Request {
    /// Read coils (FC01)
    pub fn read_coils(slave: SlaveAddress, address: u16, quantity: u16) -> Self {
        Self::new_read(slave, FunctionCode::ReadCoils, address, quantity)
    }

    /// Read discrete inputs (FC02)
    pub fn read_discrete_inputs(slave: SlaveAddress, address: u16, quantity: u16) -> Self {
        Self::new_read(slave, FunctionCode::ReadDiscreteInputs, address, quantity)
    }

    /// Read holding registers (FC03)
    pub fn read_holding_registers(slave: SlaveAddress, address: u16, quantity: u16) -> Self {
        Self::new_read(slave, FunctionCode::ReadHoldingRegisters, address, quantity)
    }

    /// Read input registers (FC04)
    pub fn read_input_registers(slave: SlaveAddress, address: u16, quantity: u16) -> Self {
        Self::new_read(slave, FunctionCode::ReadInputRegisters, address, quantity)
    }

    fn new_read(slave: SlaveAddress, function: FunctionCode, address: u16, quantity: u16) -> Self {
        Self {
            slave,
            function,
            address,
            quantity,
            data: Vec::new(),
        }
    }

    /// Write single coil (FC05)
    pub fn write_single_coil(slave: SlaveAddress, address: u16, value: bool) -> Self {
        let wire: u16 = if value { 0xFF00 } else { 0x0000 };
        Self {
            slave,
            function: FunctionCode::WriteSingleCoil,
            address,
            quantity: 1,
            data: wire.to_be_bytes().to_vec(),
        }
    }

    /// Write single register (FC06)
    pub fn write_single_register(slave: SlaveAddress, address: u16, value: u16) -> Self {
        Self {
            slave,
            function: FunctionCode::WriteSingleRegister,
            address,
            quantity: 1,
            data: value.to_be_bytes().to_vec(),
        }
    }

    /// Diagnostics (FC08); `address` carries the sub-function word
    pub fn diagnostics(slave: SlaveAddress, sub_function: u16, data: u16) -> Self {
        Self {
            slave,
            function: FunctionCode::Diagnostics,
            address: sub_function,
            quantity: 1,
            data: data.to_be_bytes().to_vec(),
        }
    }

    /// Write multiple coils (FC15)
    pub fn write_multiple_coils(slave: SlaveAddress, address: u16, values: &[bool]) -> Self {
        let byte_count = values.len().div_ceil(8);
        let mut data = vec![0u8; byte_count];
        for (i, &value) in values.iter().enumerate() {
            if value {
                data[i / 8] |= 1 << (i % 8);
            }
        }
        Self {
            slave,
            function: FunctionCode::WriteMultipleCoils,
            address,
            quantity: values.len() as u16,
            data,
        }
    }

    /// Write multiple registers (FC16)
    pub fn write_multiple_registers(slave: SlaveAddress, address: u16, values: &[u16]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 2);
        for &value in values {
            data.extend_from_slice(&value.to_be_bytes());
        }
        Self {
            slave,
            function: FunctionCode::WriteMultipleRegisters,
            address,
            quantity: values.len() as u16,
            data,
        }
    }

    /// True when addressed to the broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.slave == BROADCAST_ADDRESS
    }

    /// Assemble the PDU payload (bytes after the function code)
    pub fn pdu_payload(&self) -> RtuResult<Vec<u8>> {
        let mut payload = Vec::with_capacity(4 + self.data.len());
        match self.function {
            FunctionCode::ReadCoils
            | FunctionCode::ReadDiscreteInputs
            | FunctionCode::ReadHoldingRegisters
            | FunctionCode::ReadInputRegisters => {
                payload.extend_from_slice(&self.address.to_be_bytes());
                payload.extend_from_slice(&self.quantity.to_be_bytes());
            }
            FunctionCode::WriteSingleCoil
            | FunctionCode::WriteSingleRegister
            | FunctionCode::Diagnostics => {
                if self.data.len() != 2 {
                    return Err(RtuError::encoding(format!(
                        "{} requires a 2-byte value, got {}",
                        self.function,
                        self.data.len()
                    )));
                }
                payload.extend_from_slice(&self.address.to_be_bytes());
                payload.extend_from_slice(&self.data);
            }
            FunctionCode::WriteMultipleCoils => {
                let expected = (self.quantity as usize).div_ceil(8);
                if self.data.len() != expected {
                    return Err(RtuError::encoding(format!(
                        "coil data length {} does not cover quantity {}",
                        self.data.len(),
                        self.quantity
                    )));
                }
                payload.extend_from_slice(&self.address.to_be_bytes());
                payload.extend_from_slice(&self.quantity.to_be_bytes());
                payload.push(self.data.len() as u8);
                payload.extend_from_slice(&self.data);
            }
            FunctionCode::WriteMultipleRegisters => {
                if self.data.len() != self.quantity as usize * 2 {
                    return Err(RtuError::encoding(format!(
                        "register data length {} does not cover quantity {}",
                        self.data.len(),
                        self.quantity
                    )));
                }
                payload.extend_from_slice(&self.address.to_be_bytes());
                payload.extend_from_slice(&self.quantity.to_be_bytes());
                payload.push(self.data.len() as u8);
                payload.extend_from_slice(&self.data);
            }
        }
        Ok(payload)
    }
}

/// A decoded, non-exception Modbus response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Responding slave
    pub slave: SlaveAddress,
    /// Echoed function code
    pub function: FunctionCode,
    data: Vec<u8>,
}

impl Response {
    /// Create a response from a decoded frame payload
    pub fn new(slave: SlaveAddress, function: FunctionCode, data: Vec<u8>) -> Self {
        Self {
            slave,
            function,
            data,
        }
    }

    /// Raw payload bytes (after the function code, before the CRC)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Parse a bit-read payload (byte count + packed bits, LSB first)
    pub fn parse_bits(&self) -> RtuResult<Vec<bool>> {
        if self.data.is_empty() {
            return Err(RtuError::unexpected_response("empty bit payload"));
        }
        let byte_count = self.data[0] as usize;
        if self.data.len() < 1 + byte_count {
            return Err(RtuError::unexpected_response(format!(
                "bit payload truncated: byte count {} but {} data bytes",
                byte_count,
                self.data.len() - 1
            )));
        }

        let mut bits = Vec::with_capacity(byte_count * 8);
        for &byte in &self.data[1..1 + byte_count] {
            for bit in 0..8 {
                bits.push(byte & (1 << bit) != 0);
            }
        }
        Ok(bits)
    }

    /// Parse a register-read payload (byte count + big-endian registers)
    pub fn parse_registers(&self) -> RtuResult<Vec<u16>> {
        if self.data.is_empty() {
            return Err(RtuError::unexpected_response("empty register payload"));
        }
        let byte_count = self.data[0] as usize;
        if self.data.len() < 1 + byte_count {
            return Err(RtuError::unexpected_response(format!(
                "register payload truncated: byte count {} but {} data bytes",
                byte_count,
                self.data.len() - 1
            )));
        }
        if byte_count % 2 != 0 {
            return Err(RtuError::unexpected_response(format!(
                "odd register byte count {byte_count}"
            )));
        }

        let registers = self.data[1..1 + byte_count]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(registers)
    }

    /// Cross-check the payload against the request it answers.
    ///
    /// Reads must carry a byte count consistent with the requested quantity;
    /// writes and diagnostics must echo the request header.
    pub fn validate_against(&self, request: &Request) -> RtuResult<()> {
        if self.function != request.function {
            return Err(RtuError::unexpected_response(format!(
                "function echo mismatch: sent {}, got {}",
                request.function, self.function
            )));
        }

        match request.function {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                let expected = (request.quantity as usize).div_ceil(8);
                self.check_byte_count(expected)
            }
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
                self.check_byte_count(request.quantity as usize * 2)
            }
            FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister => {
                let mut echo = Vec::with_capacity(4);
                echo.extend_from_slice(&request.address.to_be_bytes());
                echo.extend_from_slice(&request.data);
                if self.data != echo {
                    return Err(RtuError::unexpected_response(format!(
                        "{} echo mismatch",
                        request.function
                    )));
                }
                Ok(())
            }
            FunctionCode::Diagnostics => {
                // The sub-function word echoes; the data word may be a
                // counter or status value, so only its presence is checked
                if self.data.len() != 4 || self.data[..2] != request.address.to_be_bytes() {
                    return Err(RtuError::unexpected_response(
                        "diagnostics sub-function echo mismatch",
                    ));
                }
                Ok(())
            }
            FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => {
                let mut echo = Vec::with_capacity(4);
                echo.extend_from_slice(&request.address.to_be_bytes());
                echo.extend_from_slice(&request.quantity.to_be_bytes());
                if self.data != echo {
                    return Err(RtuError::unexpected_response(format!(
                        "{} echo mismatch",
                        request.function
                    )));
                }
                Ok(())
            }
        }
    }

    fn check_byte_count(&self, expected: usize) -> RtuResult<()> {
        if self.data.is_empty() {
            return Err(RtuError::unexpected_response("missing byte count"));
        }
        let byte_count = self.data[0] as usize;
        if byte_count != expected {
            return Err(RtuError::unexpected_response(format!(
                "byte count {byte_count} inconsistent with requested quantity (expected {expected})"
            )));
        }
        if self.data.len() != 1 + byte_count {
            return Err(RtuError::unexpected_response(format!(
                "payload length {} does not match byte count {}",
                self.data.len() - 1,
                byte_count
            )));
        }
        Ok(())
    }
}
