use std::collections::VecDeque;

use crate::{
    Alert, AlertDescription, TlsError,
    alert::AlertLevel,
    cipher_suite::CipherSuite,
    client::ClientConfig,
    handshake::{HandshakeBuffer, HandshakeHeader, HandshakeMessage, HandshakeType},
    record::{self, ContentType, RecordHeader},
    server::ServerConfig,
    session::Session,
    tls_version::TlsVersion,
};

/// Which end of the connection this is.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    /// Handshake messages accepted in each state.
    const fn transitions(self) -> &'static [(TlsState, &'static [HandshakeType])] {
        match self {
            Role::Client => &[
                (TlsState::WaitHello, &[HandshakeType::ServerHello]),
                (
                    TlsState::WaitKeyExchange,
                    &[
                        HandshakeType::ServerKeyExchange,
                        HandshakeType::ServerHelloDone,
                    ],
                ),
                (TlsState::WaitHelloDone, &[HandshakeType::ServerHelloDone]),
                (TlsState::WaitFinished, &[HandshakeType::Finished]),
            ],
            Role::Server => &[
                (TlsState::WaitHello, &[HandshakeType::ClientHello]),
                (TlsState::WaitKeyExchange, &[HandshakeType::ClientKeyExchange]),
                (TlsState::WaitFinished, &[HandshakeType::Finished]),
            ],
        }
    }

    pub(crate) fn expects(self, state: TlsState, msg_type: HandshakeType) -> bool {
        self.transitions()
            .iter()
            .any(|(s, allowed)| *s == state && allowed.contains(&msg_type))
    }
}

/// Connection states.
///
/// ```text
/// Idle -> WaitHello -> WaitKeyExchange -> [WaitHelloDone]
///      -> WaitChangeCipher -> WaitFinished -> Connected
/// ```
///
/// `WaitHelloDone` is only visited by a client that received a
/// ServerKeyExchange.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TlsState {
    /// Handshake not started.
    Idle,
    /// Wait for the peer's hello.
    WaitHello,
    /// Wait for ServerKeyExchange / ServerHelloDone (client) or
    /// ClientKeyExchange (server).
    WaitKeyExchange,
    /// Wait for ServerHelloDone.
    ///
    /// Client only.
    WaitHelloDone,
    /// Wait for the peer's ChangeCipherSpec.
    WaitChangeCipher,
    /// Wait for the peer's Finished.
    WaitFinished,
    /// TLS handshake has completed.
    Connected,
    /// A fatal alert was sent or received.
    Error,
    /// Closed by the application.
    Closed,
}

/// Role specific configuration and handshake progress.
pub(crate) enum RoleConfig {
    Client(ClientConfig),
    Server(ServerConfig),
}

/// A sans-IO TLS-PSK connection.
///
/// Bytes from the transport go in through [`append_incoming`], bytes for
/// the transport come out of [`take_outgoing`]. Nothing here blocks.
///
/// [`append_incoming`]: TlsConnection::append_incoming
/// [`take_outgoing`]: TlsConnection::take_outgoing
pub struct TlsConnection {
    pub(crate) state: TlsState,
    pub(crate) session: Session,
    pub(crate) config: RoleConfig,
    incoming: Vec<u8>,
    handshake: HandshakeBuffer,
    outgoing: Vec<u8>,
    app_data: VecDeque<Vec<u8>>,
    peer_closed: bool,
}

impl TlsConnection {
    pub(crate) fn new(session: Session, config: RoleConfig) -> Self {
        Self {
            state: TlsState::Idle,
            session,
            config,
            incoming: Vec::new(),
            handshake: HandshakeBuffer::default(),
            outgoing: Vec::new(),
            app_data: VecDeque::new(),
            peer_closed: false,
        }
    }

    pub(crate) fn set_state(&mut self, state: TlsState) {
        debug_assert_ne!(self.state, state);
        log::debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub fn state(&self) -> TlsState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.session.role()
    }

    pub fn is_handshake_done(&self) -> bool {
        self.session.handshake_done()
    }

    /// Negotiated suite, once the ServerHello was processed.
    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.session.cipher_suite()
    }

    /// Negotiated version, or the configured one before negotiation.
    pub fn version(&self) -> TlsVersion {
        self.session.version()
    }

    /// PSK identity in use, on the server known after ClientKeyExchange.
    pub fn identity(&self) -> &[u8] {
        self.session.identity()
    }

    /// Largest plaintext fragment of a record.
    pub fn plain_limit(&self) -> usize {
        self.session.plain_limit()
    }

    /// Largest ciphertext fragment accepted from the peer.
    pub fn crypt_limit(&self) -> usize {
        self.session.crypt_limit()
    }

    pub fn is_encrypt_then_mac(&self) -> bool {
        self.session.is_encrypt_then_mac()
    }

    pub fn is_truncated_hmac(&self) -> bool {
        self.session.is_truncated_hmac()
    }

    /// Returns `true` once the peer sent close_notify.
    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    fn check_usable(&self) -> Result<(), TlsError> {
        match self.state {
            TlsState::Error | TlsState::Closed => Err(TlsError::Closed),
            _ => Ok(()),
        }
    }

    /// Begin the handshake.
    ///
    /// A client queues its ClientHello, a server starts accepting one.
    pub fn start_handshake(&mut self) -> Result<(), TlsError> {
        self.check_usable()?;
        if self.state != TlsState::Idle {
            log::error!("Handshake already started, state is {:?}", self.state);
            return Err(TlsError::AlreadyStarted);
        }

        let result: Result<(), TlsError> = match self.role() {
            Role::Client => self.client_start(),
            Role::Server => {
                self.set_state(TlsState::WaitHello);
                Ok(())
            }
        };
        self.fail_on_error(result)
    }

    /// Feed bytes received from the transport.
    ///
    /// Every complete record is processed before returning, partial
    /// records stay buffered for the next call.
    pub fn append_incoming(&mut self, data: &[u8]) -> Result<(), TlsError> {
        self.check_usable()?;
        if self.state == TlsState::Idle {
            log::error!("Received {} B before the handshake was started", data.len());
            return Err(TlsError::NotStarted);
        }

        log::trace!("< {} B", data.len());
        self.incoming.extend_from_slice(data);

        let result: Result<(), TlsError> = self.process_incoming();
        self.fail_on_error(result)
    }

    /// Drain the bytes queued for the transport.
    pub fn take_outgoing(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Pop the next received application data record.
    pub fn read_app_data(&mut self) -> Option<Vec<u8>> {
        self.app_data.pop_front()
    }

    /// Queue application data, split into records of at most
    /// [`plain_limit`](Self::plain_limit) bytes.
    pub fn send_app_data(&mut self, data: &[u8]) -> Result<(), TlsError> {
        self.check_usable()?;
        if !self.session.handshake_done() {
            log::error!("Application data in state {:?}", self.state);
            return Err(TlsError::NotConnected);
        }

        let limit: usize = self.session.plain_limit();
        let result: Result<(), TlsError> = data
            .chunks(limit)
            .try_for_each(|chunk| self.send_record(ContentType::ApplicationData, chunk));
        self.fail_on_error(result)
    }

    /// Send close_notify, once, and tear the connection down.
    pub fn close(&mut self) {
        match self.state {
            TlsState::Closed => return,
            TlsState::Idle | TlsState::Error => (),
            _ => {
                log::info!("> close_notify");
                let alert: Alert = Alert::new_warning(AlertDescription::CloseNotify);
                if let Err(e) = self.send_record(ContentType::Alert, &alert.to_be_bytes()) {
                    log::error!("Failed to send close_notify: {e}");
                }
            }
        }
        self.close_no_alert();
    }

    /// Tear the connection down without notifying the peer.
    pub fn close_no_alert(&mut self) {
        if self.state != TlsState::Closed {
            self.set_state(TlsState::Closed);
        }
        self.incoming.clear();
        self.handshake = HandshakeBuffer::default();
    }

    fn fail_on_error(&mut self, result: Result<(), TlsError>) -> Result<(), TlsError> {
        if let Err(e) = &result {
            if let TlsError::SendAlert(ad) = e {
                self.send_fatal(*ad);
            }
            if self.state != TlsState::Error {
                self.set_state(TlsState::Error);
            }
            self.incoming.clear();
        }
        result
    }

    /// Best effort fatal alert.
    fn send_fatal(&mut self, description: AlertDescription) {
        log::error!("> {description:?}");
        let alert: Alert = Alert::new_fatal(description);
        if let Err(e) = self.send_record(ContentType::Alert, &alert.to_be_bytes()) {
            log::error!("Failed to send alert: {e}");
        }
    }

    fn process_incoming(&mut self) -> Result<(), TlsError> {
        loop {
            let Some(hdr_buf) = self.incoming.first_chunk::<{ RecordHeader::LEN }>() else {
                return Ok(());
            };
            let hdr: RecordHeader = RecordHeader::deser(*hdr_buf);
            let len: usize = hdr.length().into();

            if len > self.session.crypt_limit() {
                log::error!(
                    "Record length={len} is greater than limit of {}",
                    self.session.crypt_limit()
                );
                return Err(AlertDescription::RecordOverflow)?;
            }

            if self.incoming.len() < RecordHeader::LEN + len {
                log::trace!(
                    "Record incomplete, have {} B of {} B",
                    self.incoming.len(),
                    RecordHeader::LEN + len
                );
                return Ok(());
            }

            log::debug!("< {hdr:?}");

            let fragment: Vec<u8> = self
                .incoming
                .drain(..RecordHeader::LEN + len)
                .skip(RecordHeader::LEN)
                .collect();

            let plaintext: Vec<u8> =
                self.session
                    .decrypt(hdr.content_type_byte(), hdr.version(), &fragment)?;

            if plaintext.len() > self.session.plain_limit() {
                log::error!(
                    "Plaintext length={} is greater than limit of {}",
                    plaintext.len(),
                    self.session.plain_limit()
                );
                return Err(AlertDescription::RecordOverflow)?;
            }

            match hdr.content_type() {
                Ok(ContentType::Handshake) => self.recv_handshake(&plaintext)?,
                Ok(ContentType::ChangeCipherSpec) => self.recv_change_cipher_spec(&plaintext)?,
                Ok(ContentType::ApplicationData) => self.recv_app_data(plaintext)?,
                Ok(ContentType::Alert) => return self.recv_alert(&plaintext),
                Err(val) => {
                    log::error!("Received invalid ContentType value 0x{val:02X}");
                    return Err(AlertDescription::UnexpectedMessage)?;
                }
            }
        }
    }

    fn recv_handshake(&mut self, fragment: &[u8]) -> Result<(), TlsError> {
        if fragment.is_empty() {
            log::error!("Received zero-length Handshake fragment");
            return Err(AlertDescription::UnexpectedMessage)?;
        }

        self.handshake.extend(fragment);

        while let Some(msg) = self.handshake.next_message()? {
            self.dispatch_handshake(msg)?;
        }

        Ok(())
    }

    fn dispatch_handshake(&mut self, msg: HandshakeMessage) -> Result<(), TlsError> {
        let role: Role = self.role();

        if !role.expects(self.state, msg.msg_type) {
            log::error!(
                "Unexpected msg_type {:?} in state {:?}",
                msg.msg_type,
                self.state
            );
            return Err(AlertDescription::UnexpectedMessage)?;
        }

        match role {
            Role::Client => self.client_handle(msg),
            Role::Server => self.server_handle(msg),
        }
    }

    fn recv_change_cipher_spec(&mut self, body: &[u8]) -> Result<(), TlsError> {
        if body != record::CHANGE_CIPHER_SPEC {
            log::error!("ChangeCipherSpec body {body:02X?} is not [01]");
            return Err(AlertDescription::DecodeError)?;
        }

        if !self.handshake.is_empty() {
            log::error!(
                "ChangeCipherSpec with {} B of handshake data pending",
                self.handshake.len()
            );
            return Err(AlertDescription::UnexpectedMessage)?;
        }

        if self.state != TlsState::WaitChangeCipher {
            log::error!("Unexpected ChangeCipherSpec in state {:?}", self.state);
            return Err(AlertDescription::UnexpectedMessage)?;
        }

        let is_server: bool = self.role() == Role::Server;
        self.session.init_decrypter(!is_server)?;
        self.set_state(TlsState::WaitFinished);

        Ok(())
    }

    fn recv_app_data(&mut self, data: Vec<u8>) -> Result<(), TlsError> {
        if !self.session.handshake_done() {
            log::error!("Application data in state {:?}", self.state);
            return Err(AlertDescription::UnexpectedMessage)?;
        }

        log::trace!("< ApplicationData {} B", data.len());
        self.app_data.push_back(data);
        Ok(())
    }

    fn recv_alert(&mut self, body: &[u8]) -> Result<(), TlsError> {
        // Alert messages MUST NOT be fragmented across records
        let buf: [u8; Alert::LEN] = match body.try_into() {
            Ok(buf) => buf,
            Err(_) => {
                log::error!(
                    "Received alert record with size {} expected {}",
                    body.len(),
                    Alert::LEN
                );
                return Err(AlertDescription::DecodeError)?;
            }
        };

        let alert: Alert = Alert::from_be_bytes(buf);

        if let AlertLevel::Unknown(level) = alert.level {
            log::warn!("Alert has unregistered AlertLevel value: {level}");
        }

        if alert.description == AlertDescription::CloseNotify {
            if alert.level != AlertLevel::Warning {
                log::warn!("close_notify sent with level {:?}", alert.level);
            }
            log::info!("< close_notify");
            self.peer_closed = true;
        } else {
            log::error!("< {alert:?}");
        }

        self.set_state(TlsState::Error);

        Err(TlsError::RecvAlert(alert.description))
    }

    pub(crate) fn send_record(
        &mut self,
        content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<(), TlsError> {
        if plaintext.len() > self.session.plain_limit() {
            log::error!(
                "Attempted to send {content_type:?} record of {} B over limit of {}",
                plaintext.len(),
                self.session.plain_limit()
            );
            return Err(AlertDescription::InternalError)?;
        }

        let fragment: Vec<u8> = self.session.encrypt(content_type.into(), plaintext)?;
        let hdr: RecordHeader =
            RecordHeader::ser(content_type, self.session.version().into(), fragment.len())?;

        log::debug!("> {hdr:?}");

        self.outgoing.extend_from_slice(hdr.as_bytes());
        self.outgoing.extend_from_slice(&fragment);

        Ok(())
    }

    /// Frame, record in the transcript and send a handshake message.
    pub(crate) fn send_handshake_msg(
        &mut self,
        msg_type: HandshakeType,
        body: &[u8],
    ) -> Result<(), TlsError> {
        let msg: Vec<u8> = HandshakeHeader::prepend_header(msg_type, body)?;
        self.session.add_handshake_message(&msg);

        let limit: usize = self.session.plain_limit();
        for fragment in msg.chunks(limit) {
            self.send_record(ContentType::Handshake, fragment)?;
        }

        Ok(())
    }

    pub(crate) fn send_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        self.send_record(ContentType::ChangeCipherSpec, &record::CHANGE_CIPHER_SPEC)
    }
}
