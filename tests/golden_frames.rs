//! Golden wire-image tests against the canonical Modbus RTU examples.
//!
//! Each case builds a request through the public API and compares the
//! encoded ADU byte-for-byte, CRC included, with the frame documented in
//! the protocol literature.

use ampere_rtu::frame;
use ampere_rtu::{FunctionCode, Request, Response, RtuError};

fn encode_request(request: &Request) -> Vec<u8> {
    let payload = request.pdu_payload().unwrap();
    frame::encode(request.slave, request.function.to_u8(), &payload)
        .unwrap()
        .as_bytes()
        .to_vec()
}

#[test]
fn golden_read_coils_request() {
    // Slave 0x11, 37 coils from 0x0013
    let request = Request::read_coils(0x11, 0x0013, 0x0025);
    assert_eq!(
        encode_request(&request),
        vec![0x11, 0x01, 0x00, 0x13, 0x00, 0x25, 0x0E, 0x84]
    );
}

#[test]
fn golden_read_holding_registers_request() {
    // Slave 0x11, 3 registers from 0x006B
    let request = Request::read_holding_registers(0x11, 0x006B, 0x0003);
    assert_eq!(
        encode_request(&request),
        vec![0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87]
    );
}

#[test]
fn golden_write_single_coil_request() {
    // Slave 0x11, force coil 0x00AC on
    let request = Request::write_single_coil(0x11, 0x00AC, true);
    assert_eq!(
        encode_request(&request),
        vec![0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00, 0x4E, 0x8B]
    );
}

#[test]
fn golden_write_single_register_request() {
    // Slave 0x11, register 0x0001 = 0x0003
    let request = Request::write_single_register(0x11, 0x0001, 0x0003);
    assert_eq!(
        encode_request(&request),
        vec![0x11, 0x06, 0x00, 0x01, 0x00, 0x03, 0x9A, 0x9B]
    );
}

#[test]
fn golden_write_multiple_coils_request() {
    // Slave 0x11, 10 coils from 0x0013: CD 01 packed LSB-first
    let values = [
        true, false, true, true, false, false, true, true, true, false,
    ];
    let request = Request::write_multiple_coils(0x11, 0x0013, &values);
    assert_eq!(
        encode_request(&request),
        vec![0x11, 0x0F, 0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01, 0xBF, 0x0B]
    );
}

#[test]
fn golden_write_multiple_registers_request() {
    // Slave 0x11, registers 0x0001..=0x0002 = [0x000A, 0x0102]
    let request = Request::write_multiple_registers(0x11, 0x0001, &[0x000A, 0x0102]);
    assert_eq!(
        encode_request(&request),
        vec![0x11, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02, 0xC6, 0xF0]
    );
}

#[test]
fn golden_read_holding_registers_response_decodes() {
    // Response to the FC03 request above: registers AE41 5652 4340
    let wire = [
        0x11, 0x03, 0x06, 0xAE, 0x41, 0x56, 0x52, 0x43, 0x40, 0x49, 0xAD,
    ];
    let decoded = frame::decode(&wire, Some(0x11)).unwrap();
    assert_eq!(decoded.slave(), 0x11);
    assert_eq!(decoded.function_byte(), 0x03);

    let response = Response::new(
        decoded.slave(),
        FunctionCode::from_u8(decoded.function_byte()).unwrap(),
        decoded.payload().to_vec(),
    );
    let request = Request::read_holding_registers(0x11, 0x006B, 0x0003);
    response.validate_against(&request).unwrap();
    assert_eq!(
        response.parse_registers().unwrap(),
        vec![0xAE41, 0x5652, 0x4340]
    );
}

#[test]
fn golden_response_with_flipped_bit_fails_checksum() {
    let mut wire = [
        0x11, 0x03, 0x06, 0xAE, 0x41, 0x56, 0x52, 0x43, 0x40, 0x49, 0xAD,
    ];
    wire[4] ^= 0x01;
    let err = frame::decode(&wire, Some(0x11)).unwrap_err();
    assert!(matches!(err, RtuError::Checksum { .. }));
}
