//! RTU frame codec
//!
//! Serializes and deserializes Modbus RTU ADUs:
//! `[slave address][function code][payload...][CRC16 lo][CRC16 hi]`.
//!
//! The codec is pure; it never touches the wire. A [`Frame`] keeps its bytes
//! in a fixed stack buffer so encode/decode stay allocation-free on the hot
//! path.

use crc::{Crc, CRC_16_MODBUS};

use crate::constants::{CRC_LEN, EXCEPTION_FLAG, MAX_ADU_SIZE, MIN_ADU_SIZE};
use crate::error::{RtuError, RtuResult};
use crate::protocol::SlaveAddress;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// CRC16/MODBUS over the given bytes (0xA001 reflected polynomial)
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// A complete RTU ADU held in a fixed stack buffer
#[derive(Debug, Clone)]
pub struct Frame {
    data: [u8; MAX_ADU_SIZE],
    len: usize,
}

impl Frame {
    /// Slave address (first byte)
    #[inline]
    pub fn slave(&self) -> SlaveAddress {
        self.data[0]
    }

    /// Function code byte, exception flag included
    #[inline]
    pub fn function_byte(&self) -> u8 {
        self.data[1]
    }

    /// Payload bytes between the function code and the CRC
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[2..self.len - CRC_LEN]
    }

    /// The full wire image, CRC included
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Total frame length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Frames are never empty; kept for clippy's len/is_empty pairing
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if the function byte carries the exception flag
    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_byte() & EXCEPTION_FLAG != 0
    }

    /// Exception code byte for exception frames
    #[inline]
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() && self.len >= MIN_ADU_SIZE + 1 {
            Some(self.data[2])
        } else {
            None
        }
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Frame {}

/// Encode an ADU from its parts, appending the CRC.
///
/// Fails with [`RtuError::Encoding`] when the assembled frame would exceed
/// the 256-byte wire limit.
pub fn encode(slave: SlaveAddress, function: u8, payload: &[u8]) -> RtuResult<Frame> {
    let len = 1 + 1 + payload.len() + CRC_LEN;
    if len > MAX_ADU_SIZE {
        return Err(RtuError::encoding(format!(
            "frame of {len} bytes exceeds the {MAX_ADU_SIZE}-byte wire limit"
        )));
    }

    let mut data = [0u8; MAX_ADU_SIZE];
    data[0] = slave;
    data[1] = function;
    data[2..2 + payload.len()].copy_from_slice(payload);

    let crc = crc16(&data[..len - CRC_LEN]);
    // CRC travels low byte first
    data[len - 2..len].copy_from_slice(&crc.to_le_bytes());

    Ok(Frame { data, len })
}

/// Decode and validate a received ADU.
///
/// `expected_slave` is the address the outstanding request was sent to;
/// `None` (broadcast mode) skips the address check. Checks run in order:
/// length, CRC, address.
pub fn decode(bytes: &[u8], expected_slave: Option<SlaveAddress>) -> RtuResult<Frame> {
    if bytes.len() < MIN_ADU_SIZE {
        return Err(RtuError::ShortFrame { len: bytes.len() });
    }
    if bytes.len() > MAX_ADU_SIZE {
        return Err(RtuError::encoding(format!(
            "frame of {} bytes exceeds the {MAX_ADU_SIZE}-byte wire limit",
            bytes.len()
        )));
    }

    let crc_offset = bytes.len() - CRC_LEN;
    let expected = crc16(&bytes[..crc_offset]);
    let actual = u16::from_le_bytes([bytes[crc_offset], bytes[crc_offset + 1]]);
    if expected != actual {
        return Err(RtuError::Checksum { expected, actual });
    }

    if let Some(slave) = expected_slave {
        if bytes[0] != slave {
            return Err(RtuError::AddressMismatch {
                expected: slave,
                actual: bytes[0],
            });
        }
    }

    let mut data = [0u8; MAX_ADU_SIZE];
    data[..bytes.len()].copy_from_slice(bytes);
    Ok(Frame {
        data,
        len: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::sample::Index;

    #[test]
    fn test_crc16_known_vector() {
        // FC03 read of 10 registers from slave 1
        let frame_wo_crc = [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x0A];
        assert_eq!(crc16(&frame_wo_crc), 0xCDC5);
    }

    #[test]
    fn test_encode_wire_layout() {
        let frame = encode(0x11, 0x03, &[0x00, 0x6B, 0x00, 0x03]).unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(bytes[0], 0x11);
        assert_eq!(bytes[1], 0x03);
        assert_eq!(&bytes[2..6], &[0x00, 0x6B, 0x00, 0x03]);
        // CRC low byte first
        let crc = crc16(&bytes[..6]);
        assert_eq!(bytes[6], (crc & 0xFF) as u8);
        assert_eq!(bytes[7], (crc >> 8) as u8);
    }

    #[test]
    fn test_roundtrip() {
        let frame = encode(0x11, 0x03, &[0x00, 0x6B, 0x00, 0x03]).unwrap();
        let decoded = decode(frame.as_bytes(), Some(0x11)).unwrap();
        assert_eq!(decoded.slave(), 0x11);
        assert_eq!(decoded.function_byte(), 0x03);
        assert_eq!(decoded.payload(), &[0x00, 0x6B, 0x00, 0x03]);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_encode_rejects_oversize() {
        let payload = vec![0u8; 253];
        let err = encode(1, 0x10, &payload).unwrap_err();
        assert!(matches!(err, RtuError::Encoding { .. }));

        // 252 payload bytes is exactly the 256-byte limit
        let payload = vec![0u8; 252];
        assert!(encode(1, 0x10, &payload).is_ok());
    }

    #[test]
    fn test_decode_short_frame() {
        let err = decode(&[0x01, 0x03, 0xFF], Some(1)).unwrap_err();
        assert_eq!(err, RtuError::ShortFrame { len: 3 });
    }

    #[test]
    fn test_decode_bad_crc() {
        let mut bytes = encode(0x11, 0x03, &[0x02, 0x00, 0x2A]).unwrap().as_bytes().to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = decode(&bytes, Some(0x11)).unwrap_err();
        assert!(matches!(err, RtuError::Checksum { .. }));
    }

    #[test]
    fn test_decode_address_mismatch() {
        let frame = encode(0x12, 0x03, &[0x02, 0x00, 0x2A]).unwrap();
        let err = decode(frame.as_bytes(), Some(0x11)).unwrap_err();
        assert_eq!(
            err,
            RtuError::AddressMismatch {
                expected: 0x11,
                actual: 0x12
            }
        );

        // Broadcast mode skips the address check
        assert!(decode(frame.as_bytes(), None).is_ok());
    }

    #[test]
    fn test_exception_accessors() {
        let frame = encode(0x23, 0x81, &[0x02]).unwrap();
        let decoded = decode(frame.as_bytes(), Some(0x23)).unwrap();
        assert!(decoded.is_exception());
        assert_eq!(decoded.exception_code(), Some(0x02));

        let normal = encode(0x23, 0x01, &[0x01, 0x0D]).unwrap();
        assert!(!normal.is_exception());
        assert_eq!(normal.exception_code(), None);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            slave in 0u8..=255,
            function in 0u8..=0x7F,
            payload in proptest::collection::vec(any::<u8>(), 0..=252),
        ) {
            let frame = encode(slave, function, &payload).unwrap();
            let decoded = decode(frame.as_bytes(), Some(slave)).unwrap();
            prop_assert_eq!(decoded.slave(), slave);
            prop_assert_eq!(decoded.function_byte(), function);
            prop_assert_eq!(decoded.payload(), &payload[..]);
        }

        #[test]
        fn prop_single_byte_corruption_fails_crc(
            slave in 0u8..=255,
            function in 0u8..=0x7F,
            payload in proptest::collection::vec(any::<u8>(), 0..=64),
            corrupt_index in any::<Index>(),
            corrupt_mask in 1u8..=255,
        ) {
            // CRC16 detects every single-byte error, so any one-byte flip
            // anywhere in the frame must surface as a checksum failure.
            let frame = encode(slave, function, &payload).unwrap();
            let mut bytes = frame.as_bytes().to_vec();
            let index = corrupt_index.index(bytes.len());
            bytes[index] ^= corrupt_mask;
            let err = decode(&bytes, None).unwrap_err();
            prop_assert!(matches!(err, RtuError::Checksum { .. }));
        }
    }
}
