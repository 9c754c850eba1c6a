use natpunch_codec::{
    attribute::{decode_address, encode_address, AttributeType},
    generate_transaction_id,
    message::{decode, encode_binding_request, MessageType},
};

use bytes::{BufMut, BytesMut};

fn build_binding_success(transaction_id: &[u8; 12], addr: std::net::SocketAddr) -> BytesMut {
    let mut value = Vec::new();
    encode_address(&addr, transaction_id, true, &mut value);

    let mut buf = BytesMut::new();
    buf.put_u16(0x0101);
    buf.put_u16((4 + value.len()) as u16);
    buf.put_u32(0x2112_A442);
    buf.put_slice(transaction_id);
    buf.put_u16(u16::from(AttributeType::XorMappedAddress));
    buf.put_u16(value.len() as u16);
    buf.put_slice(&value);
    buf
}

#[test]
fn binding_request_round_trips_through_a_mock_server() {
    let transaction_id = generate_transaction_id();
    let request = encode_binding_request(&transaction_id);

    let decoded_request = decode(&request).unwrap();
    assert_eq!(decoded_request.message_type, MessageType::BindingRequest);
    assert_eq!(decoded_request.transaction_id, transaction_id);

    let observed: std::net::SocketAddr = "127.0.0.1:54400".parse().unwrap();
    let response = build_binding_success(&transaction_id, observed);

    let decoded_response = decode(&response).unwrap();
    assert_eq!(decoded_response.message_type, MessageType::BindingSuccess);
    assert_eq!(decoded_response.transaction_id, transaction_id);

    let value = decoded_response
        .get(AttributeType::XorMappedAddress)
        .unwrap();
    let public = decode_address(value, &transaction_id, true).unwrap();
    assert_eq!(public, observed);
}

#[test]
fn xor_mapped_address_is_preferred_over_plain_mapped_address() {
    let transaction_id = generate_transaction_id();
    let xor_addr: std::net::SocketAddr = "198.51.100.2:9000".parse().unwrap();
    let plain_addr: std::net::SocketAddr = "198.51.100.2:1".parse().unwrap();

    let mut xor_value = Vec::new();
    encode_address(&xor_addr, &transaction_id, true, &mut xor_value);

    let mut plain_value = Vec::new();
    encode_address(&plain_addr, &transaction_id, false, &mut plain_value);

    let mut buf = BytesMut::new();
    buf.put_u16(0x0101);
    buf.put_u16((8 + xor_value.len() + plain_value.len()) as u16);
    buf.put_u32(0x2112_A442);
    buf.put_slice(&transaction_id);

    buf.put_u16(u16::from(AttributeType::MappedAddress));
    buf.put_u16(plain_value.len() as u16);
    buf.put_slice(&plain_value);

    buf.put_u16(u16::from(AttributeType::XorMappedAddress));
    buf.put_u16(xor_value.len() as u16);
    buf.put_slice(&xor_value);

    let decoded = decode(&buf).unwrap();
    assert!(decoded.get(AttributeType::MappedAddress).is_some());
    assert!(decoded.get(AttributeType::XorMappedAddress).is_some());

    // A client extracting the address must prefer XOR-MAPPED-ADDRESS.
    let chosen = decoded.get(AttributeType::XorMappedAddress).unwrap();
    let resolved = decode_address(chosen, &transaction_id, true).unwrap();
    assert_eq!(resolved, xor_addr);
}
