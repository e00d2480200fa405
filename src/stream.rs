use std::io::{self, Read, Write};

use crate::{AlertDescription, TlsError, base::TlsConnection};

const READ_CHUNK: usize = 4096;

/// A [`TlsConnection`] driven over a blocking transport.
///
/// Returned by [`TlsClientBuilder::handshake`] and
/// [`TlsServerBuilder::handshake`] once the handshake completed.
///
/// [`TlsClientBuilder::handshake`]: crate::TlsClientBuilder::handshake
/// [`TlsServerBuilder::handshake`]: crate::TlsServerBuilder::handshake
pub struct PskStream<S> {
    conn: TlsConnection,
    stream: S,
    pending: Vec<u8>,
    pending_pos: usize,
}

impl<S: Read + Write> PskStream<S> {
    /// Start `conn` and exchange records over `stream` until connected.
    pub fn handshake(conn: TlsConnection, stream: S) -> Result<Self, TlsError> {
        let mut ret: Self = Self {
            conn,
            stream,
            pending: Vec::new(),
            pending_pos: 0,
        };

        ret.conn.start_handshake()?;

        while !ret.conn.is_handshake_done() {
            ret.flush_outgoing()?;
            ret.read_records()?;
        }
        ret.flush_outgoing()?;

        log::info!(
            "Connected with {:?}",
            ret.conn.cipher_suite().map(u16::from)
        );

        Ok(ret)
    }

    pub fn connection(&self) -> &TlsConnection {
        &self.conn
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Send close_notify and return the transport.
    pub fn close(mut self) -> Result<S, TlsError> {
        self.conn.close();
        self.flush_outgoing()?;
        Ok(self.stream)
    }

    fn flush_outgoing(&mut self) -> Result<(), TlsError> {
        let out: Vec<u8> = self.conn.take_outgoing();
        if !out.is_empty() {
            log::trace!("> {} B", out.len());
            self.stream.write_all(&out)?;
            self.stream.flush()?;
        }
        Ok(())
    }

    /// Read once from the transport and process what arrived.
    ///
    /// Alerts queued by a failure are written before the error is returned.
    fn read_records(&mut self) -> Result<(), TlsError> {
        let mut buf: [u8; READ_CHUNK] = [0; READ_CHUNK];
        let n: usize = self.stream.read(&mut buf)?;
        if n == 0 {
            log::error!("Transport closed in state {:?}", self.conn.state());
            return Err(TlsError::Io(io::ErrorKind::UnexpectedEof.into()));
        }

        let result: Result<(), TlsError> = self.conn.append_incoming(&buf[..n]);
        let flushed: Result<(), TlsError> = self.flush_outgoing();
        result?;
        flushed
    }
}

fn to_io_error(e: TlsError) -> io::Error {
    match e {
        TlsError::Io(e) => e,
        e => io::Error::other(e),
    }
}

impl<S: Read + Write> io::Read for PskStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pending_pos < self.pending.len() {
                let avail: &[u8] = &self.pending[self.pending_pos..];
                let len: usize = avail.len().min(buf.len());
                buf[..len].copy_from_slice(&avail[..len]);
                self.pending_pos += len;
                return Ok(len);
            }

            if let Some(data) = self.conn.read_app_data() {
                self.pending = data;
                self.pending_pos = 0;
                continue;
            }

            if self.conn.peer_closed() {
                return Ok(0);
            }

            match self.read_records() {
                Ok(()) | Err(TlsError::RecvAlert(AlertDescription::CloseNotify)) => (),
                Err(e) => return Err(to_io_error(e)),
            }
        }
    }
}

impl<S: Read + Write> io::Write for PskStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.conn.send_app_data(buf).map_err(to_io_error)?;
        self.flush_outgoing().map_err(to_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_outgoing().map_err(to_io_error)?;
        self.stream.flush()
    }
}
