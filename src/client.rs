use std::{
    io::{Read, Write},
    sync::Arc,
};

use subtle::ConstantTimeEq as _;
use zeroize::Zeroizing;

use crate::{
    AlertDescription, PskStream,
    base::{Role, RoleConfig, TlsConnection, TlsState},
    cipher_suite::CipherSuite,
    error::TlsError,
    handshake::{
        ClientHello, Extensions, Finished, HandshakeMessage, HandshakeType, PskIdentity,
        ServerHello,
        extension::{ExtensionType, MaxFragmentLength},
    },
    key_schedule::{CryptoProvider, PskCrypto},
    session::Session,
    tls_version::TlsVersion,
};

#[derive(Clone)]
pub struct TlsClientBuilder {
    identity: Vec<u8>,
    psk: Option<Zeroizing<Vec<u8>>>,
    cipher_suites: Vec<CipherSuite>,
    version: TlsVersion,
    max_fragment_length: Option<MaxFragmentLength>,
    encrypt_then_mac: bool,
    truncated_hmac: bool,
    crypt_limit: usize,
    provider: Arc<dyn CryptoProvider>,
}

impl std::fmt::Debug for TlsClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsClientBuilder")
            .field("identity", &String::from_utf8_lossy(&self.identity))
            .field("cipher_suites", &self.cipher_suites)
            .field("version", &self.version)
            .field("max_fragment_length", &self.max_fragment_length)
            .field("encrypt_then_mac", &self.encrypt_then_mac)
            .field("truncated_hmac", &self.truncated_hmac)
            .field("crypt_limit", &self.crypt_limit)
            .finish_non_exhaustive()
    }
}

impl Default for TlsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            identity: Vec::new(),
            psk: None,
            cipher_suites: CipherSuite::DEFAULT.to_vec(),
            version: TlsVersion::MAX,
            max_fragment_length: None,
            encrypt_then_mac: false,
            truncated_hmac: false,
            crypt_limit: Session::DEFAULT_CRYPT_LIMIT,
            provider: Arc::new(PskCrypto),
        }
    }

    /// Identity sent in ClientKeyExchange and the key it names.
    ///
    /// # Examples
    ///
    /// ```
    /// # const PRIVATE_PRE_SHARED_KEY: [u8; 16] = [0; 16];
    /// use tls_psk::TlsClientBuilder;
    ///
    /// let builder = TlsClientBuilder::new().set_psk(b"devicename", &PRIVATE_PRE_SHARED_KEY);
    /// ```
    #[must_use]
    pub fn set_psk(mut self, identity: &[u8], key: &[u8]) -> Self {
        self.identity = identity.to_vec();
        self.psk = Some(Zeroizing::new(key.to_vec()));
        self
    }

    /// Suites offered, in order of preference.
    #[must_use]
    pub fn set_cipher_suites(mut self, cipher_suites: Vec<CipherSuite>) -> Self {
        assert!(
            !cipher_suites.is_empty(),
            "At least one cipher suite must be offered"
        );
        self.cipher_suites = cipher_suites;
        self
    }

    /// Version offered in the ClientHello, the server must answer with it.
    #[must_use]
    pub fn set_version(mut self, version: TlsVersion) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn set_max_fragment_length(mut self, max_fragment_length: MaxFragmentLength) -> Self {
        self.max_fragment_length = Some(max_fragment_length);
        self
    }

    #[must_use]
    pub fn set_encrypt_then_mac(mut self, encrypt_then_mac: bool) -> Self {
        self.encrypt_then_mac = encrypt_then_mac;
        self
    }

    #[must_use]
    pub fn set_truncated_hmac(mut self, truncated_hmac: bool) -> Self {
        self.truncated_hmac = truncated_hmac;
        self
    }

    /// Largest record fragment accepted from the server.
    ///
    /// Defaults to 2^14 + 2048. Values below the 2^14 plaintext limit are
    /// raised to it.
    #[must_use]
    pub fn set_crypt_limit(mut self, crypt_limit: u16) -> Self {
        self.crypt_limit = Session::crypt_limit_at_least_plain(crypt_limit);
        self
    }

    #[must_use]
    pub fn set_crypto_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Create a sans-IO connection, start it with
    /// [`TlsConnection::start_handshake`].
    pub fn build(self) -> TlsConnection {
        let mut exts: Extensions = Extensions::new();
        if let Some(mfl) = self.max_fragment_length {
            exts.insert(ExtensionType::MaxFragmentLength.into(), vec![mfl.code()]);
        }
        if self.encrypt_then_mac {
            exts.insert(ExtensionType::EncryptThenMac.into(), Vec::new());
        }
        if self.truncated_hmac {
            exts.insert(ExtensionType::TruncatedHmac.into(), Vec::new());
        }

        let mut session: Session =
            Session::new(Role::Client, self.version, self.crypt_limit, self.provider);
        match self.psk {
            Some(psk) => session.set_psk(self.identity, psk),
            None => log::warn!("Client built without a PSK, the handshake will fail"),
        }

        TlsConnection::new(
            session,
            RoleConfig::Client(ClientConfig {
                version: self.version,
                cipher_suites: self.cipher_suites,
                exts,
            }),
        )
    }

    /// Run the handshake over a blocking transport.
    pub fn handshake<S: Read + Write>(self, stream: S) -> Result<PskStream<S>, TlsError> {
        PskStream::handshake(self.build(), stream)
    }
}

/// What the client offered, the ServerHello is checked against it.
pub(crate) struct ClientConfig {
    version: TlsVersion,
    cipher_suites: Vec<CipherSuite>,
    exts: Extensions,
}

impl ClientConfig {
    fn client_hello(&self) -> ClientHello {
        ClientHello::new(
            self.version.into(),
            self.cipher_suites.clone(),
            self.exts.clone(),
        )
    }

    fn check_server_hello(&self, server_hello: &ServerHello) -> Result<(), AlertDescription> {
        if server_hello.version != u16::from(self.version) {
            log::error!(
                "ServerHello server_version 0x{:04X} does not match offered {:?}",
                server_hello.version,
                self.version
            );
            return Err(AlertDescription::ProtocolVersion);
        }

        let offered: bool = CipherSuite::try_from(server_hello.cipher_suite)
            .is_ok_and(|cs| self.cipher_suites.contains(&cs));
        if !offered {
            log::error!(
                "ServerHello cipher_suite 0x{:04X} was not offered",
                server_hello.cipher_suite
            );
            return Err(AlertDescription::IllegalParameter);
        }

        for (extension_type, data) in server_hello.exts.iter() {
            match self.exts.get(extension_type) {
                Some(sent) if sent == data => (),
                Some(sent) => {
                    log::error!(
                        "ServerHello extension 0x{extension_type:04X} echoed {data:02X?}, sent {sent:02X?}"
                    );
                    return Err(AlertDescription::IllegalParameter);
                }
                None => {
                    log::error!("ServerHello extension 0x{extension_type:04X} was not offered");
                    return Err(AlertDescription::IllegalParameter);
                }
            }
        }

        Ok(())
    }
}

impl TlsConnection {
    fn client_config(&self) -> Result<&ClientConfig, TlsError> {
        match &self.config {
            RoleConfig::Client(config) => Ok(config),
            RoleConfig::Server(_) => {
                log::error!("Client handler invoked on a server connection");
                Err(AlertDescription::InternalError.into())
            }
        }
    }

    pub(crate) fn client_start(&mut self) -> Result<(), TlsError> {
        let client_hello: ClientHello = self.client_config()?.client_hello();
        let data: Vec<u8> = client_hello.ser()?;

        self.session.set_client_random(client_hello.random);
        self.send_handshake_msg(HandshakeType::ClientHello, &data)?;

        log::info!(
            "Offered {:?} with {} cipher suites",
            self.session.version(),
            client_hello.cipher_suites.len()
        );

        self.set_state(TlsState::WaitHello);

        Ok(())
    }

    pub(crate) fn client_handle(&mut self, msg: HandshakeMessage) -> Result<(), TlsError> {
        match msg.msg_type {
            HandshakeType::ServerHello => self.recv_server_hello(&msg),
            HandshakeType::ServerKeyExchange => self.recv_server_key_exchange(&msg),
            HandshakeType::ServerHelloDone => self.recv_server_hello_done(&msg),
            HandshakeType::Finished => self.recv_server_finished(&msg),
            msg_type => {
                log::error!("Client has no handler for {msg_type:?}");
                Err(AlertDescription::UnexpectedMessage.into())
            }
        }
    }

    fn recv_server_hello(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        let server_hello: ServerHello = ServerHello::deser(msg.body())?;
        self.session.add_handshake_message(&msg.raw);

        self.client_config()?.check_server_hello(&server_hello)?;
        self.session.apply_server_hello(&server_hello)?;

        self.set_state(TlsState::WaitKeyExchange);

        Ok(())
    }

    fn recv_server_key_exchange(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        let hint: PskIdentity =
            PskIdentity::deser("ServerKeyExchange psk_identity_hint", msg.body())?;
        log::info!("PSK identity hint {:?}", String::from_utf8_lossy(&hint.0));

        self.session.add_handshake_message(&msg.raw);
        self.set_state(TlsState::WaitHelloDone);

        Ok(())
    }

    fn recv_server_hello_done(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        if !msg.body().is_empty() {
            log::error!(
                "ServerHelloDone has a {} B body, expected empty",
                msg.body().len()
            );
            return Err(AlertDescription::DecodeError)?;
        }
        self.session.add_handshake_message(&msg.raw);

        let client_key_exchange: Vec<u8> =
            PskIdentity(self.session.identity().to_vec()).ser()?;
        self.send_handshake_msg(HandshakeType::ClientKeyExchange, &client_key_exchange)?;

        self.send_change_cipher_spec()?;
        self.session.init_encrypter(false)?;

        let verify_data: [u8; Finished::VERIFY_DATA_LEN] = self.session.calc_verify_data(false)?;
        self.send_handshake_msg(HandshakeType::Finished, &verify_data)?;

        self.set_state(TlsState::WaitChangeCipher);

        Ok(())
    }

    fn recv_server_finished(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        let finished: Finished = Finished::deser(msg.body())?;

        let expected: [u8; Finished::VERIFY_DATA_LEN] = self.session.calc_verify_data(true)?;
        if !bool::from(expected.as_slice().ct_eq(finished.verify_data.as_slice())) {
            log::error!("Server Finished contents incorrect");
            return Err(AlertDescription::DecryptError)?;
        }
        log::debug!("Server Finished contents correct");

        self.session.add_handshake_message(&msg.raw);
        self.session.set_handshake_done();
        self.set_state(TlsState::Connected);

        log::info!("Client handshake complete");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            version: TlsVersion::V1_2,
            cipher_suites: vec![CipherSuite::TLS_PSK_WITH_AES_128_GCM_SHA256],
            exts: [(ExtensionType::MaxFragmentLength.into(), vec![2])]
                .into_iter()
                .collect(),
        }
    }

    fn server_hello(version: u16, cipher_suite: u16, exts: Extensions) -> ServerHello {
        ServerHello::new(version, cipher_suite, exts)
    }

    #[test]
    fn server_hello_must_match_offer() {
        let c = config();
        let echo: Extensions = c.exts.clone();

        assert_eq!(
            c.check_server_hello(&server_hello(0x0303, 0x00A8, echo.clone())),
            Ok(())
        );
        assert_eq!(
            c.check_server_hello(&server_hello(0x0303, 0x00A8, Extensions::new())),
            Ok(())
        );
        assert_eq!(
            c.check_server_hello(&server_hello(0x0302, 0x00A8, echo.clone())),
            Err(AlertDescription::ProtocolVersion)
        );
        assert_eq!(
            c.check_server_hello(&server_hello(0x0303, 0x00B0, echo)),
            Err(AlertDescription::IllegalParameter)
        );
    }

    #[test]
    fn tampered_extension_echo() {
        let c = config();
        let changed: Extensions = [(ExtensionType::MaxFragmentLength.into(), vec![1])]
            .into_iter()
            .collect();
        assert_eq!(
            c.check_server_hello(&server_hello(0x0303, 0x00A8, changed)),
            Err(AlertDescription::IllegalParameter)
        );

        let unoffered: Extensions = [(ExtensionType::TruncatedHmac.into(), Vec::new())]
            .into_iter()
            .collect();
        assert_eq!(
            c.check_server_hello(&server_hello(0x0303, 0x00A8, unoffered)),
            Err(AlertDescription::IllegalParameter)
        );
    }

    #[test]
    fn start_twice() {
        let mut conn: TlsConnection = TlsClientBuilder::new().set_psk(b"id", &[1; 16]).build();
        conn.start_handshake().unwrap();
        assert_eq!(conn.state(), TlsState::WaitHello);
        assert!(matches!(
            conn.start_handshake(),
            Err(TlsError::AlreadyStarted)
        ));
        assert!(conn.has_outgoing());
    }

    #[test]
    fn not_started() {
        let mut conn: TlsConnection = TlsClientBuilder::new().set_psk(b"id", &[1; 16]).build();
        assert!(matches!(
            conn.append_incoming(&[22, 3, 3, 0, 0]),
            Err(TlsError::NotStarted)
        ));
        assert!(matches!(
            conn.send_app_data(b"x"),
            Err(TlsError::NotConnected)
        ));
    }
}
