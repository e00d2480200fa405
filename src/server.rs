use std::{
    collections::BTreeMap,
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
        ServerHello, extension::ExtensionType,
    },
    key_schedule::{CryptoProvider, PskCrypto},
    session::Session,
    tls_version::TlsVersion,
};

/// Looks up the pre-shared key for a client identity.
///
/// Implemented for [`PskTable`] and for closures.
///
/// # Examples
///
/// ```
/// use tls_psk::TlsServerBuilder;
///
/// let builder = TlsServerBuilder::new().set_psk_resolver(|identity: &[u8]| {
///     (identity == b"device-1").then(|| vec![0x42; 16])
/// });
/// ```
pub trait PskResolver: Send + Sync {
    fn resolve(&self, identity: &[u8]) -> Option<Vec<u8>>;
}

impl<F> PskResolver for F
where
    F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync,
{
    fn resolve(&self, identity: &[u8]) -> Option<Vec<u8>> {
        self(identity)
    }
}

/// Fixed identity to key table.
#[derive(Clone, Default)]
pub struct PskTable {
    keys: BTreeMap<Vec<u8>, Zeroizing<Vec<u8>>>,
}

impl PskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, replacing any previous key for `identity`.
    pub fn insert(&mut self, identity: &[u8], key: &[u8]) {
        if self
            .keys
            .insert(identity.to_vec(), Zeroizing::new(key.to_vec()))
            .is_some()
        {
            log::warn!(
                "Replaced PSK for identity {:?}",
                String::from_utf8_lossy(identity)
            );
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for PskTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.keys.keys().map(|k| String::from_utf8_lossy(k)))
            .finish()
    }
}

impl PskResolver for PskTable {
    fn resolve(&self, identity: &[u8]) -> Option<Vec<u8>> {
        self.keys.get(identity).map(|key| key.to_vec())
    }
}

#[derive(Clone)]
pub struct TlsServerBuilder {
    psks: PskTable,
    resolver: Option<Arc<dyn PskResolver>>,
    identity_hint: Vec<u8>,
    cipher_suites: Vec<CipherSuite>,
    min_version: TlsVersion,
    max_version: TlsVersion,
    supported_extensions: Vec<u16>,
    crypt_limit: usize,
    provider: Arc<dyn CryptoProvider>,
}

impl std::fmt::Debug for TlsServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsServerBuilder")
            .field("psks", &self.psks)
            .field("identity_hint", &String::from_utf8_lossy(&self.identity_hint))
            .field("cipher_suites", &self.cipher_suites)
            .field("min_version", &self.min_version)
            .field("max_version", &self.max_version)
            .field("supported_extensions", &self.supported_extensions)
            .field("crypt_limit", &self.crypt_limit)
            .finish_non_exhaustive()
    }
}

impl Default for TlsServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsServerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            psks: PskTable::new(),
            resolver: None,
            identity_hint: Vec::new(),
            cipher_suites: CipherSuite::DEFAULT.to_vec(),
            min_version: TlsVersion::MIN,
            max_version: TlsVersion::MAX,
            supported_extensions: vec![
                ExtensionType::MaxFragmentLength.into(),
                ExtensionType::TruncatedHmac.into(),
                ExtensionType::EncryptThenMac.into(),
            ],
            crypt_limit: Session::DEFAULT_CRYPT_LIMIT,
            provider: Arc::new(PskCrypto),
        }
    }

    /// Accept `identity` with `key`.
    ///
    /// Ignored once a resolver is set with [`set_psk_resolver`].
    ///
    /// [`set_psk_resolver`]: Self::set_psk_resolver
    #[must_use]
    pub fn add_psk(mut self, identity: &[u8], key: &[u8]) -> Self {
        self.psks.insert(identity, key);
        self
    }

    #[must_use]
    pub fn set_psk_resolver<R: PskResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Identity hint sent in ServerKeyExchange, empty by default.
    #[must_use]
    pub fn set_identity_hint(mut self, identity_hint: &[u8]) -> Self {
        self.identity_hint = identity_hint.to_vec();
        self
    }

    /// Suites accepted, the client's preference order decides.
    #[must_use]
    pub fn set_cipher_suites(mut self, cipher_suites: Vec<CipherSuite>) -> Self {
        assert!(
            !cipher_suites.is_empty(),
            "At least one cipher suite must be supported"
        );
        self.cipher_suites = cipher_suites;
        self
    }

    #[must_use]
    pub fn set_min_version(mut self, min_version: TlsVersion) -> Self {
        self.min_version = min_version;
        self
    }

    #[must_use]
    pub fn set_max_version(mut self, max_version: TlsVersion) -> Self {
        self.max_version = max_version;
        self
    }

    /// Extension types echoed back to the client when offered.
    #[must_use]
    pub fn set_supported_extensions(mut self, supported_extensions: Vec<ExtensionType>) -> Self {
        self.supported_extensions = supported_extensions.into_iter().map(u16::from).collect();
        self
    }

    /// Largest record fragment accepted from the client.
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
        assert!(
            self.min_version <= self.max_version,
            "Minimum version {:?} is above maximum {:?}",
            self.min_version,
            self.max_version
        );

        let resolver: Arc<dyn PskResolver> = match self.resolver {
            Some(resolver) => {
                if !self.psks.is_empty() {
                    log::warn!("PSK resolver set, ignoring {} added PSKs", self.psks.len());
                }
                resolver
            }
            None => Arc::new(self.psks),
        };

        let session: Session = Session::new(
            Role::Server,
            self.max_version,
            self.crypt_limit,
            self.provider,
        );

        TlsConnection::new(
            session,
            RoleConfig::Server(ServerConfig {
                resolver,
                identity_hint: self.identity_hint,
                cipher_suites: self.cipher_suites,
                min_version: self.min_version,
                max_version: self.max_version,
                supported_extensions: self.supported_extensions,
            }),
        )
    }

    /// Run the handshake over a blocking transport.
    pub fn handshake<S: Read + Write>(self, stream: S) -> Result<PskStream<S>, TlsError> {
        PskStream::handshake(self.build(), stream)
    }
}

pub(crate) struct ServerConfig {
    resolver: Arc<dyn PskResolver>,
    identity_hint: Vec<u8>,
    cipher_suites: Vec<CipherSuite>,
    min_version: TlsVersion,
    max_version: TlsVersion,
    supported_extensions: Vec<u16>,
}

impl ServerConfig {
    /// Pick version, suite and extensions for a ClientHello.
    fn server_hello(&self, client_hello: &ClientHello) -> Result<ServerHello, AlertDescription> {
        let Some(version) = TlsVersion::negotiate(client_hello.version, self.max_version) else {
            log::error!(
                "ClientHello client_version 0x{:04X} is older than {:?}",
                client_hello.version,
                TlsVersion::MIN
            );
            return Err(AlertDescription::ProtocolVersion);
        };

        if version < self.min_version {
            log::error!(
                "ClientHello client_version {version:?} is older than minimum {:?}",
                self.min_version
            );
            return Err(AlertDescription::ProtocolVersion);
        }

        let Some(cipher_suite) = client_hello
            .cipher_suites
            .iter()
            .copied()
            .find(|cs| self.cipher_suites.contains(cs) && cs.min_version() <= version)
        else {
            log::error!(
                "No supported cipher suite for {version:?} in {:?}",
                client_hello.cipher_suites
            );
            return Err(AlertDescription::IllegalParameter);
        };

        let mut exts: Extensions = client_hello.exts.clone();
        exts.retain(|extension_type| {
            let keep: bool = self.supported_extensions.contains(&extension_type);
            if !keep {
                log::warn!("Ignoring ClientHello extension 0x{extension_type:04X}");
            }
            keep
        });
        if !cipher_suite.has_bulk_cipher() && exts.remove(ExtensionType::EncryptThenMac).is_some() {
            log::info!("encrypt_then_mac dropped for {cipher_suite:?}");
        }

        Ok(ServerHello::new(version.into(), cipher_suite.into(), exts))
    }
}

impl TlsConnection {
    fn server_config(&self) -> Result<&ServerConfig, TlsError> {
        match &self.config {
            RoleConfig::Server(config) => Ok(config),
            RoleConfig::Client(_) => {
                log::error!("Server handler invoked on a client connection");
                Err(AlertDescription::InternalError.into())
            }
        }
    }

    pub(crate) fn server_handle(&mut self, msg: HandshakeMessage) -> Result<(), TlsError> {
        match msg.msg_type {
            HandshakeType::ClientHello => self.recv_client_hello(&msg),
            HandshakeType::ClientKeyExchange => self.recv_client_key_exchange(&msg),
            HandshakeType::Finished => self.recv_client_finished(&msg),
            msg_type => {
                log::error!("Server has no handler for {msg_type:?}");
                Err(AlertDescription::UnexpectedMessage.into())
            }
        }
    }

    fn recv_client_hello(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        let client_hello: ClientHello = ClientHello::deser(msg.body())?;
        self.session.add_handshake_message(&msg.raw);

        let server_hello: ServerHello = self.server_config()?.server_hello(&client_hello)?;
        let identity_hint: PskIdentity = PskIdentity(self.server_config()?.identity_hint.clone());

        self.session.set_client_random(client_hello.random);
        self.session.apply_server_hello(&server_hello)?;

        self.send_handshake_msg(HandshakeType::ServerHello, &server_hello.ser()?)?;
        self.send_handshake_msg(HandshakeType::ServerKeyExchange, &identity_hint.ser()?)?;
        self.send_handshake_msg(HandshakeType::ServerHelloDone, &[])?;

        self.set_state(TlsState::WaitKeyExchange);

        Ok(())
    }

    fn recv_client_key_exchange(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        let identity: PskIdentity =
            PskIdentity::deser("ClientKeyExchange psk_identity", msg.body())?;
        self.session.add_handshake_message(&msg.raw);

        let Some(psk) = self.server_config()?.resolver.resolve(&identity.0) else {
            log::error!(
                "Unknown PSK identity {:?}",
                String::from_utf8_lossy(&identity.0)
            );
            return Err(AlertDescription::IllegalParameter)?;
        };

        log::info!("PSK identity {:?}", String::from_utf8_lossy(&identity.0));
        self.session.set_psk(identity.0, Zeroizing::new(psk));

        self.set_state(TlsState::WaitChangeCipher);

        Ok(())
    }

    fn recv_client_finished(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        let finished: Finished = Finished::deser(msg.body())?;

        let expected: [u8; Finished::VERIFY_DATA_LEN] = self.session.calc_verify_data(false)?;
        if !bool::from(expected.as_slice().ct_eq(finished.verify_data.as_slice())) {
            log::error!("Client Finished contents incorrect");
            return Err(AlertDescription::DecryptError)?;
        }
        log::debug!("Client Finished contents correct");

        self.session.add_handshake_message(&msg.raw);

        self.send_change_cipher_spec()?;
        self.session.init_encrypter(true)?;

        let verify_data: [u8; Finished::VERIFY_DATA_LEN] = self.session.calc_verify_data(true)?;
        self.send_handshake_msg(HandshakeType::Finished, &verify_data)?;

        self.session.set_handshake_done();
        self.set_state(TlsState::Connected);

        log::info!("Server handshake complete");

        Ok(())
    }
}
