use std::sync::Arc;

use zeroize::Zeroizing;

use crate::{
    AlertDescription,
    base::Role,
    cipher_suite::CipherSuite,
    handshake::{
        Finished, ServerHello,
        extension::{ExtensionType, MaxFragmentLength},
    },
    key_schedule::{CryptoProvider, RecordProtection, SecurityParameters},
    tls_version::TlsVersion,
};

/// Negotiated parameters and secrets of one connection attempt.
///
/// Owns the handshake transcript and both cipher contexts; the record
/// layer and the role handlers only go through these methods.
pub(crate) struct Session {
    role: Role,
    version: TlsVersion,
    cipher_suite: Option<CipherSuite>,
    client_random: Option<[u8; 32]>,
    server_random: Option<[u8; 32]>,
    identity: Vec<u8>,
    psk: Option<Zeroizing<Vec<u8>>>,
    plain_limit: usize,
    crypt_limit: usize,
    encrypt_then_mac: bool,
    truncated_hmac: bool,
    transcript: Option<Vec<u8>>,
    encrypter: Option<Box<dyn RecordProtection>>,
    decrypter: Option<Box<dyn RecordProtection>>,
    handshake_done: bool,
    provider: Arc<dyn CryptoProvider>,
}

impl Session {
    /// TLSPlaintext.length upper bound, 2^14.
    pub const DEFAULT_PLAIN_LIMIT: usize = 1 << 14;

    /// TLSCiphertext.length upper bound, 2^14 + 2048.
    pub const DEFAULT_CRYPT_LIMIT: usize = Self::DEFAULT_PLAIN_LIMIT + 2048;

    /// A record carrying a full plaintext fragment must always be accepted.
    pub fn crypt_limit_at_least_plain(crypt_limit: u16) -> usize {
        let crypt_limit: usize = crypt_limit.into();
        if crypt_limit < Self::DEFAULT_PLAIN_LIMIT {
            log::warn!(
                "crypt_limit {crypt_limit} raised to the plaintext limit {}",
                Self::DEFAULT_PLAIN_LIMIT
            );
            Self::DEFAULT_PLAIN_LIMIT
        } else {
            crypt_limit
        }
    }

    pub fn new(
        role: Role,
        version: TlsVersion,
        crypt_limit: usize,
        provider: Arc<dyn CryptoProvider>,
    ) -> Self {
        Self {
            role,
            version,
            cipher_suite: None,
            client_random: None,
            server_random: None,
            identity: Vec::new(),
            psk: None,
            plain_limit: Self::DEFAULT_PLAIN_LIMIT,
            crypt_limit,
            encrypt_then_mac: false,
            truncated_hmac: false,
            transcript: Some(Vec::new()),
            encrypter: None,
            decrypter: None,
            handshake_done: false,
            provider,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn version(&self) -> TlsVersion {
        self.version
    }

    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.cipher_suite
    }

    pub fn set_client_random(&mut self, random: [u8; 32]) {
        self.client_random = Some(random);
    }

    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    pub fn set_psk(&mut self, identity: Vec<u8>, psk: Zeroizing<Vec<u8>>) {
        self.identity = identity;
        self.psk = Some(psk);
    }

    pub fn plain_limit(&self) -> usize {
        self.plain_limit
    }

    pub fn crypt_limit(&self) -> usize {
        self.crypt_limit
    }

    pub fn is_encrypt_then_mac(&self) -> bool {
        self.encrypt_then_mac
    }

    pub fn is_truncated_hmac(&self) -> bool {
        self.truncated_hmac
    }

    pub fn handshake_done(&self) -> bool {
        self.handshake_done
    }

    /// Mark the handshake complete and release the transcript.
    pub fn set_handshake_done(&mut self) {
        debug_assert!(!self.handshake_done);
        self.handshake_done = true;
        self.transcript = None;
    }

    pub fn add_handshake_message(&mut self, msg: &[u8]) {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.extend_from_slice(msg),
            None => log::warn!("Handshake message after handshake done left out of transcript"),
        }
    }

    /// Record the negotiated parameters of a ServerHello.
    ///
    /// Both roles call this, the server on the hello it is about to send.
    pub fn apply_server_hello(&mut self, hello: &ServerHello) -> Result<(), AlertDescription> {
        let version: TlsVersion = match TlsVersion::try_from(hello.version) {
            Ok(version) => version,
            Err(val) => {
                log::error!("ServerHello server_version 0x{val:04X} is not supported");
                return Err(AlertDescription::ProtocolVersion);
            }
        };

        let cipher_suite: CipherSuite = match CipherSuite::try_from(hello.cipher_suite) {
            Ok(cs) => cs,
            Err(val) => {
                log::error!("ServerHello cipher_suite 0x{val:04X} is not supported");
                return Err(AlertDescription::IllegalParameter);
            }
        };

        for (extension_type, data) in hello.exts.iter() {
            match ExtensionType::try_from(extension_type) {
                Ok(ExtensionType::MaxFragmentLength) => {
                    self.plain_limit = MaxFragmentLength::deser(data)?.limit();
                    log::info!("Plaintext fragment limit is {} B", self.plain_limit);
                }
                Ok(ExtensionType::EncryptThenMac) => {
                    empty_extension(ExtensionType::EncryptThenMac, data)?;
                    self.encrypt_then_mac = true;
                }
                Ok(ExtensionType::TruncatedHmac) => {
                    empty_extension(ExtensionType::TruncatedHmac, data)?;
                    self.truncated_hmac = true;
                }
                Err(val) => log::warn!("Ignoring ServerHello extension 0x{val:04X}"),
            }
        }

        self.version = version;
        self.cipher_suite = Some(cipher_suite);
        self.server_random = Some(hello.random);

        log::info!("Negotiated {cipher_suite:?} with {version:?}");

        Ok(())
    }

    fn security_parameters(&self) -> Result<SecurityParameters<'_>, AlertDescription> {
        match (
            self.cipher_suite,
            self.client_random.as_ref(),
            self.server_random.as_ref(),
            self.psk.as_ref(),
        ) {
            (Some(cipher_suite), Some(client_random), Some(server_random), Some(psk)) => {
                Ok(SecurityParameters {
                    version: self.version,
                    cipher_suite,
                    client_random,
                    server_random,
                    psk,
                    encrypt_then_mac: self.encrypt_then_mac,
                    truncated_hmac: self.truncated_hmac,
                })
            }
            _ => {
                log::error!("Cipher context requested before the session is keyed");
                Err(AlertDescription::InternalError)
            }
        }
    }

    pub fn init_encrypter(&mut self, is_server_keys: bool) -> Result<(), AlertDescription> {
        if self.encrypter.is_some() {
            log::error!("Encrypter already created");
            return Err(AlertDescription::InternalError);
        }
        let encrypter = self
            .provider
            .create_encoder(&self.security_parameters()?, is_server_keys)?;
        self.encrypter = Some(encrypter);
        log::debug!("{:?} encrypter ready", self.role);
        Ok(())
    }

    pub fn init_decrypter(&mut self, is_server_keys: bool) -> Result<(), AlertDescription> {
        if self.decrypter.is_some() {
            log::error!("Decrypter already created");
            return Err(AlertDescription::InternalError);
        }
        let decrypter = self
            .provider
            .create_decoder(&self.security_parameters()?, is_server_keys)?;
        self.decrypter = Some(decrypter);
        log::debug!("{:?} decrypter ready", self.role);
        Ok(())
    }

    /// Protect an outbound fragment, pass-through before ChangeCipherSpec.
    pub fn encrypt(
        &mut self,
        content_type: u8,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        let version: u16 = self.version.into();
        match self.encrypter.as_mut() {
            Some(encrypter) => encrypter.encode(content_type, version, plaintext),
            None => Ok(plaintext.to_vec()),
        }
    }

    /// Unprotect an inbound fragment, pass-through before ChangeCipherSpec.
    pub fn decrypt(
        &mut self,
        content_type: u8,
        version: u16,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, AlertDescription> {
        match self.decrypter.as_mut() {
            Some(decrypter) => decrypter.decode(content_type, version, ciphertext),
            None => Ok(ciphertext.to_vec()),
        }
    }

    pub fn calc_verify_data(
        &self,
        is_from_server: bool,
    ) -> Result<[u8; Finished::VERIFY_DATA_LEN], AlertDescription> {
        let Some(transcript) = self.transcript.as_deref() else {
            log::error!("verify_data requested after the transcript was freed");
            return Err(AlertDescription::InternalError);
        };

        match self.decrypter.as_ref().or(self.encrypter.as_ref()) {
            Some(ctx) => ctx.calc_verify_data(is_from_server, transcript),
            None => {
                log::error!("verify_data requested without a cipher context");
                Err(AlertDescription::InternalError)
            }
        }
    }
}

fn empty_extension(extension_type: ExtensionType, data: &[u8]) -> Result<(), AlertDescription> {
    if data.is_empty() {
        Ok(())
    } else {
        log::error!(
            "{extension_type:?} extension_data must be empty, got {} B",
            data.len()
        );
        Err(AlertDescription::IllegalParameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handshake::Extensions, key_schedule::PskCrypto};

    fn session(role: Role) -> Session {
        Session::new(
            role,
            TlsVersion::V1_2,
            Session::DEFAULT_CRYPT_LIMIT,
            Arc::new(PskCrypto),
        )
    }

    fn hello(exts: Extensions) -> ServerHello {
        ServerHello::new(
            TlsVersion::V1_2.into(),
            CipherSuite::TLS_PSK_WITH_NULL_SHA256.into(),
            exts,
        )
    }

    #[test]
    fn max_fragment_length_sets_plain_limit_only() {
        let mut s = session(Role::Client);
        let exts: Extensions = [(ExtensionType::MaxFragmentLength.into(), vec![1])]
            .into_iter()
            .collect();
        s.apply_server_hello(&hello(exts)).unwrap();
        assert_eq!(s.plain_limit(), 512);
        assert_eq!(s.crypt_limit(), Session::DEFAULT_CRYPT_LIMIT);
    }

    #[test]
    fn flag_extensions_must_be_empty() {
        let mut s = session(Role::Client);
        let exts: Extensions = [(ExtensionType::TruncatedHmac.into(), vec![0])]
            .into_iter()
            .collect();
        assert_eq!(
            s.apply_server_hello(&hello(exts)),
            Err(AlertDescription::IllegalParameter)
        );

        let exts: Extensions = [
            (ExtensionType::TruncatedHmac.into(), Vec::new()),
            (ExtensionType::EncryptThenMac.into(), Vec::new()),
        ]
        .into_iter()
        .collect();
        s.apply_server_hello(&hello(exts)).unwrap();
        assert!(s.is_truncated_hmac());
        assert!(s.is_encrypt_then_mac());
    }

    #[test]
    fn cipher_contexts_created_once() {
        let mut s = session(Role::Server);
        assert_eq!(
            s.init_encrypter(true),
            Err(AlertDescription::InternalError)
        );
        assert_eq!(
            s.calc_verify_data(false),
            Err(AlertDescription::InternalError)
        );

        s.set_client_random([1; 32]);
        s.set_psk(b"id".to_vec(), Zeroizing::new(vec![7; 16]));
        s.apply_server_hello(&hello(Extensions::new())).unwrap();

        s.init_encrypter(true).unwrap();
        assert_eq!(
            s.init_encrypter(true),
            Err(AlertDescription::InternalError)
        );
        s.init_decrypter(false).unwrap();
        assert_eq!(
            s.init_decrypter(false),
            Err(AlertDescription::InternalError)
        );
    }

    #[test]
    fn transcript_freed_at_done() {
        let mut s = session(Role::Client);
        s.set_client_random([1; 32]);
        s.set_psk(b"id".to_vec(), Zeroizing::new(vec![7; 16]));
        s.apply_server_hello(&hello(Extensions::new())).unwrap();
        s.init_encrypter(false).unwrap();
        s.add_handshake_message(b"msg");
        assert!(s.calc_verify_data(false).is_ok());

        s.set_handshake_done();
        assert!(s.handshake_done());
        assert_eq!(
            s.calc_verify_data(true),
            Err(AlertDescription::InternalError)
        );
    }
}
