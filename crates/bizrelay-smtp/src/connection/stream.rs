//! Line-oriented transport over TCP or TLS.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf,
};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

/// Longest reply line accepted from a server (RFC 5321 allows 512 octets).
const MAX_LINE_LENGTH: usize = 4096;

#[derive(Debug)]
enum Channel {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Channel {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Channel {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Buffered connection to a relay, plaintext or TLS.
///
/// Dropping the stream closes the socket.
#[derive(Debug)]
pub struct SmtpStream {
    inner: BufReader<Channel>,
}

impl SmtpStream {
    fn new(channel: Channel) -> Self {
        Self {
            inner: BufReader::new(channel),
        }
    }

    /// Reads one reply line without its terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails, the peer closed the connection,
    /// or the line exceeds the protocol limit.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = (&mut self.inner)
            .take(MAX_LINE_LENGTH as u64 + 1)
            .read_line(&mut line)
            .await?;
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        if read > MAX_LINE_LENGTH {
            return Err(Error::Protocol(format!(
                "Reply line exceeds {MAX_LINE_LENGTH} bytes"
            )));
        }

        line.truncate(line.trim_end_matches(['\r', '\n']).len());
        Ok(line)
    }

    /// Writes `data` and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let channel = self.inner.get_mut();
        channel.write_all(data).await?;
        channel.flush().await?;
        Ok(())
    }

    /// Returns true once the channel is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        matches!(self.inner.get_ref(), Channel::Tls(_))
    }

    /// Performs the TLS handshake on a plaintext stream after STARTTLS was
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted, the server sent
    /// data past its STARTTLS reply, or the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        // Bytes read before the handshake would be trusted as if encrypted.
        if !self.inner.buffer().is_empty() {
            return Err(Error::Protocol(
                "Unexpected data after STARTTLS reply".into(),
            ));
        }

        match self.inner.into_inner() {
            Channel::Plain(tcp) => {
                let tls = tls_handshake(hostname, tcp).await?;
                Ok(Self::new(Channel::Tls(Box::new(tls))))
            }
            Channel::Tls(_) => Err(Error::Protocol("Already using TLS".into())),
        }
    }
}

/// Opens a plaintext connection.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((hostname, port)).await?;
    Ok(SmtpStream::new(Channel::Plain(tcp)))
}

/// Opens a connection that is TLS from the first byte (port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16) -> Result<SmtpStream> {
    let tcp = TcpStream::connect((hostname, port)).await?;
    let tls = tls_handshake(hostname, tcp).await?;
    Ok(SmtpStream::new(Channel::Tls(Box::new(tls))))
}

async fn tls_handshake(hostname: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

    Ok(TlsConnector::from(client_config()?)
        .connect(server_name, tcp)
        .await?)
}

/// Process-wide TLS client configuration trusting the Mozilla root set.
///
/// The ring provider is named explicitly; the process-level default is
/// ambiguous when several providers are compiled in.
fn client_config() -> Result<Arc<ClientConfig>> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

    if let Some(config) = CONFIG.get() {
        return Ok(Arc::clone(config));
    }

    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::clone(CONFIG.get_or_init(|| Arc::new(config))))
}
