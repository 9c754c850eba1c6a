use natpunch_nat::StunClient;
use std::{
    net::UdpSocket,
    sync::atomic::{AtomicUsize, Ordering},
    sync::Arc,
};

/// A mock server that silently drops the first two requests and answers
/// the third, used to exercise `discover_with_retry`.
fn spawn_flaky_server() -> (std::net::SocketAddr, std::thread::JoinHandle<()>, Arc<AtomicUsize>) {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();

    let handle = std::thread::spawn(move || {
        let mut buf = [0u8; 512];
        loop {
            let (size, from) = match server.recv_from(&mut buf) {
                Ok(v) => v,
                Err(_) => return,
            };

            let count = attempts_clone.fetch_add(1, Ordering::SeqCst) + 1;
            let msg = match codec::message::decode(&buf[..size]) {
                Ok(m) => m,
                Err(_) => continue,
            };

            if count < 3 {
                // Drop the first two requests entirely.
                continue;
            }

            let mut value = Vec::new();
            codec::attribute::encode_address(&from, &msg.transaction_id, true, &mut value);

            let mut response = bytes::BytesMut::new();
            use bytes::BufMut;
            response.put_u16(0x0101);
            response.put_u16((4 + value.len()) as u16);
            response.put_u32(codec::MAGIC_COOKIE);
            response.put_slice(&msg.transaction_id);
            response.put_u16(u16::from(codec::attribute::AttributeType::XorMappedAddress));
            response.put_u16(value.len() as u16);
            response.put_slice(&value);

            let _ = server.send_to(&response, from);
            return;
        }
    });

    (addr, handle, attempts)
}

#[test]
fn retry_succeeds_after_three_attempts() {
    let (server_addr, handle, attempts) = spawn_flaky_server();

    let client = StunClient::new()
        .unwrap()
        .with_timeout(std::time::Duration::from_millis(300));

    let record = client
        .discover_with_retry(&server_addr.to_string(), 3)
        .expect("discovery should succeed on the third attempt");

    assert_eq!(record.server_endpoint.addr(), server_addr);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    handle.join().unwrap();
}
