use tls_psk::{
    CipherSuite, MaxFragmentLength, PskStream, TlsClientBuilder, TlsError, TlsServerBuilder,
    TlsVersion,
};

use std::{
    io::{Read as _, Write as _},
    net::{Ipv4Addr, SocketAddrV4, TcpListener, TcpStream},
};

const IDENTITY: &[u8] = b"reader-7";
const KEY: [u8; 32] = [0x5A; 32];

fn init_log() {
    stderrlog::new()
        .verbosity(4)
        .timestamp(stderrlog::Timestamp::Microsecond)
        .init()
        .ok();
}

fn bind() -> (TcpListener, SocketAddrV4) {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port: u16 = listener
        .local_addr()
        .expect("Failed to get listener local address")
        .port();
    (listener, SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), port))
}

fn loopback(client: TlsClientBuilder, server: TlsServerBuilder) {
    init_log();

    let (listener, addr) = bind();

    let server_thread = std::thread::Builder::new()
        .name("TLS server".to_string())
        .spawn(move || {
            log::info!("Accepting connections");
            let (client, addr) = listener.accept().expect("Unable to accept connections");
            log::info!("Accepted connection from {addr}");
            let mut tls_stream: PskStream<TcpStream> =
                server.handshake(client).expect("TLS handshake failed");
            assert_eq!(tls_stream.connection().identity(), IDENTITY);

            let mut data: [u8; 4] = [0; 4];
            tls_stream.read_exact(&mut data).unwrap();
            tls_stream.write_all(b"pong").unwrap();

            // close_notify reads as end of stream
            let mut rest: Vec<u8> = Vec::new();
            tls_stream.read_to_end(&mut rest).unwrap();
            assert!(rest.is_empty());
            assert!(tls_stream.connection().peer_closed());

            data
        })
        .expect("Failed to spawn TLS server thread");

    log::info!("Connecting");
    let tcp_stream: TcpStream = TcpStream::connect(addr).unwrap();

    log::info!("Handshaking");
    let mut tls_stream: PskStream<TcpStream> =
        client.handshake(tcp_stream).expect("TLS handshake failed");

    tls_stream.write_all(b"ping").unwrap();
    let mut client_rx_data: [u8; 4] = [0; 4];
    tls_stream.read_exact(&mut client_rx_data).unwrap();
    tls_stream.close().expect("close_notify failed");

    let server_rx_data: [u8; 4] = server_thread.join().expect("Failed to join server thread");

    assert_eq!(&server_rx_data, b"ping");
    assert_eq!(&client_rx_data, b"pong");
}

fn loopback_with_cipher_suite(cipher_suite: CipherSuite) {
    loopback(
        TlsClientBuilder::new()
            .set_psk(IDENTITY, &KEY)
            .set_cipher_suites(vec![cipher_suite]),
        TlsServerBuilder::new().add_psk(IDENTITY, &KEY),
    );
}

#[test]
fn loopback_aes_128_gcm_sha256() {
    loopback_with_cipher_suite(CipherSuite::TLS_PSK_WITH_AES_128_GCM_SHA256);
}

#[test]
fn loopback_aes_256_gcm_sha384() {
    loopback_with_cipher_suite(CipherSuite::TLS_PSK_WITH_AES_256_GCM_SHA384);
}

#[test]
fn loopback_null_sha256() {
    loopback_with_cipher_suite(CipherSuite::TLS_PSK_WITH_NULL_SHA256);
}

#[test]
fn loopback_null_sha384() {
    loopback_with_cipher_suite(CipherSuite::TLS_PSK_WITH_NULL_SHA384);
}

#[test]
fn loopback_aes_128_cbc_sha() {
    loopback_with_cipher_suite(CipherSuite::TLS_PSK_WITH_AES_128_CBC_SHA);
}

#[test]
fn loopback_aes_256_cbc_sha384() {
    loopback_with_cipher_suite(CipherSuite::TLS_PSK_WITH_AES_256_CBC_SHA384);
}

#[test]
fn loopback_tls_1_0_encrypt_then_mac() {
    loopback(
        TlsClientBuilder::new()
            .set_psk(IDENTITY, &KEY)
            .set_version(TlsVersion::V1_0)
            .set_encrypt_then_mac(true),
        TlsServerBuilder::new().add_psk(IDENTITY, &KEY),
    );
}

#[test]
fn loopback_max_fragment_length() {
    loopback(
        TlsClientBuilder::new()
            .set_psk(IDENTITY, &KEY)
            .set_max_fragment_length(MaxFragmentLength::new(1).unwrap())
            .set_truncated_hmac(true),
        TlsServerBuilder::new()
            .add_psk(IDENTITY, &KEY)
            .set_identity_hint(&[b'x'; 600]),
    );
}

#[test]
fn loopback_wrong_key() {
    init_log();

    let (listener, addr) = bind();

    let server_thread = std::thread::Builder::new()
        .name("TLS server".to_string())
        .spawn(move || {
            let (client, _) = listener.accept().expect("Unable to accept connections");
            TlsServerBuilder::new()
                .add_psk(IDENTITY, &KEY)
                .handshake(client)
                .err()
                .and_then(|e| e.alert())
        })
        .expect("Failed to spawn TLS server thread");

    let tcp_stream: TcpStream = TcpStream::connect(addr).unwrap();
    let result: Result<PskStream<TcpStream>, TlsError> = TlsClientBuilder::new()
        .set_psk(IDENTITY, &[0xA5; 32])
        .handshake(tcp_stream);

    let server_alert = server_thread.join().expect("Failed to join server thread");
    assert_eq!(server_alert, Some(tls_psk::AlertDescription::BadRecordMac));
    assert_eq!(
        result.err().and_then(|e| e.alert()),
        Some(tls_psk::AlertDescription::BadRecordMac)
    );
}

#[test]
fn loopback_bulk_transfer() {
    init_log();

    const LEN: usize = 40_000;
    let payload: Vec<u8> = (0..LEN).map(|n| (n % 251) as u8).collect();
    let expected: Vec<u8> = payload.clone();

    let (listener, addr) = bind();

    let server_thread = std::thread::Builder::new()
        .name("TLS server".to_string())
        .spawn(move || {
            let (client, _) = listener.accept().expect("Unable to accept connections");
            let mut tls_stream: PskStream<TcpStream> = TlsServerBuilder::new()
                .add_psk(IDENTITY, &KEY)
                .handshake(client)
                .expect("TLS handshake failed");

            let mut data: Vec<u8> = Vec::new();
            tls_stream.read_to_end(&mut data).unwrap();
            data
        })
        .expect("Failed to spawn TLS server thread");

    let tcp_stream: TcpStream = TcpStream::connect(addr).unwrap();
    let mut tls_stream: PskStream<TcpStream> = TlsClientBuilder::new()
        .set_psk(IDENTITY, &KEY)
        .handshake(tcp_stream)
        .expect("TLS handshake failed");

    // records span several transport reads
    for chunk in payload.chunks(16_000) {
        tls_stream.write_all(chunk).unwrap();
    }
    tls_stream.close().expect("close_notify failed");

    let received: Vec<u8> = server_thread.join().expect("Failed to join server thread");
    assert_eq!(received.len(), LEN);
    assert_eq!(received, expected);
}
