//! Socket setup and framed line I/O.
//!
//! [`Transport::connect`] resolves the server, optionally binds a local
//! address, enables TCP keepalive and performs the TLS handshake when
//! `secure` is set. The result is a line-framed stream over either a plain
//! or a TLS socket.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::line::LineCodec;
use crate::options::Options;

/// A line-framed connection to the server.
pub enum Transport {
    Tcp {
        framed: Framed<TcpStream, LineCodec>,
    },
    Tls {
        framed: Box<Framed<TlsStream<TcpStream>, LineCodec>>,
    },
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Tcp { .. } => f.write_str("Transport::Tcp"),
            Transport::Tls { .. } => f.write_str("Transport::Tls"),
        }
    }
}

impl Transport {
    /// Open a connection as described by `options`.
    pub async fn connect(options: &Options) -> Result<Self> {
        let stream = open_tcp(options).await?;
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        if !options.secure {
            return Ok(Self::tcp(stream));
        }

        let connector = tls_connector(options)?;
        let server_name = ServerName::try_from(options.server.clone())
            .map_err(|_| ClientError::InvalidServerName(options.server.clone()))?;
        let stream = connector
            .connect(server_name, stream)
            .await
            .map_err(handshake_error)?;
        debug!(server = %options.server, "TLS handshake complete");
        Ok(Self::tls(stream))
    }

    pub fn tcp(stream: TcpStream) -> Self {
        Self::Tcp {
            framed: Framed::new(stream, LineCodec::new()),
        }
    }

    pub fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self::Tls {
            framed: Box::new(Framed::new(stream, LineCodec::new())),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls { .. })
    }

    /// Next inbound line, or `None` once the peer has closed the stream.
    pub async fn read_line(&mut self) -> Option<std::io::Result<String>> {
        match self {
            Transport::Tcp { framed } => framed.next().await,
            Transport::Tls { framed } => framed.next().await,
        }
    }

    /// Write one already-terminated line.
    pub async fn write_line(&mut self, line: String) -> std::io::Result<()> {
        match self {
            Transport::Tcp { framed } => framed.send(line).await,
            Transport::Tls { framed } => framed.send(line).await,
        }
    }

    /// Flush and shut down the write half.
    pub async fn close(&mut self) -> std::io::Result<()> {
        match self {
            Transport::Tcp { framed } => framed.close().await,
            Transport::Tls { framed } => framed.close().await,
        }
    }
}

async fn open_tcp(options: &Options) -> Result<TcpStream> {
    let unresolved = || ClientError::Resolve {
        host: options.server.clone(),
        port: options.port,
    };
    let remote = lookup_host((options.server.as_str(), options.port))
        .await
        .map_err(|_| unresolved())?
        .next()
        .ok_or_else(unresolved)?;

    if options.local_address.is_none() && options.local_port.is_none() {
        return Ok(TcpStream::connect(remote).await?);
    }

    let socket = if remote.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.bind(local_addr(options, &remote)?)?;
    Ok(socket.connect(remote).await?)
}

fn local_addr(options: &Options, remote: &SocketAddr) -> Result<SocketAddr> {
    let ip = match options.local_address.as_deref() {
        Some(addr) => addr.parse::<IpAddr>().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid local address: {}", addr),
            )
        })?,
        None if remote.is_ipv4() => IpAddr::from([0u8; 4]),
        None => IpAddr::from([0u16; 8]),
    };
    Ok(SocketAddr::new(ip, options.local_port.unwrap_or(0)))
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

fn tls_connector(options: &Options) -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        warn!("error loading native certs: {}", e);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(added, ignored, "loaded root certificates");

    let inner = WebPkiServerVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| ClientError::TlsConfig(e.to_string()))?;
    let verifier = LenientVerifier {
        inner,
        leniency: Leniency {
            unknown_issuer: options.self_signed,
            expired: options.cert_expired,
        },
    };

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// tokio-rustls reports handshake failures as I/O errors wrapping the
/// rustls error; unwrap those so a rejected certificate reads as one.
fn handshake_error(e: std::io::Error) -> ClientError {
    let tls = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<tokio_rustls::rustls::Error>())
        .cloned();
    match tls {
        Some(tls) => ClientError::Tls(tls),
        None => ClientError::Io(e),
    }
}

/// Certificate failures the user opted to accept.
#[derive(Clone, Copy, Debug, Default)]
struct Leniency {
    /// Self-signed or otherwise unverifiable chains.
    unknown_issuer: bool,
    expired: bool,
}

impl Leniency {
    fn tolerates(&self, error: &CertificateError) -> bool {
        match error {
            CertificateError::UnknownIssuer => self.unknown_issuer,
            CertificateError::Expired | CertificateError::ExpiredContext { .. } => self.expired,
            _ => false,
        }
    }
}

/// WebPKI verification that can tolerate self-signed or expired certificates.
#[derive(Debug)]
struct LenientVerifier {
    inner: Arc<WebPkiServerVerifier>,
    leniency: Leniency,
}

impl ServerCertVerifier for LenientVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(tokio_rustls::rustls::Error::InvalidCertificate(ref e)) if self.leniency.tolerates(e) => {
                warn!(error = ?e, "accepting server certificate despite verification failure");
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
