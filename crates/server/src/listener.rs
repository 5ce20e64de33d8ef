//! TLS listener and per-connection request handling.
//!
//! Each accepted connection gets its own task: TLS handshake, read one
//! request line, route it, write the response, close.

use std::fs::File;
use std::future::Future;
use std::io::BufReader as StdBufReader;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rustls::ServerConfig;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};
use tokio_rustls::TlsAcceptor;

use crate::error::ServerError;
use crate::gemini::{self, MAX_REQUEST_LEN, Request, Status};
use crate::handler::FeedRouter;

/// Time allowed for the TLS handshake and for the request line.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed accept. Errors such as EMFILE persist until
/// descriptors are released.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(250);

/// Load a PEM certificate chain and private key into a rustls server config.
///
/// # Errors
///
/// Returns `ServerError::Tls` if either file is unreadable, holds no usable
/// PEM entry, or the key does not match the certificate.
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>, ServerError> {
    let open = |path: &Path| {
        File::open(path)
            .map(StdBufReader::new)
            .map_err(|e| ServerError::Tls(format!("cannot open {}: {e}", path.display())))
    };

    let certs = rustls_pemfile::certs(&mut open(cert_path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Tls(format!("invalid certificate PEM: {e}")))?;
    if certs.is_empty() {
        return Err(ServerError::Tls(format!("no certificates in {}", cert_path.display())));
    }

    let key = rustls_pemfile::private_key(&mut open(key_path)?)
        .map_err(|e| ServerError::Tls(format!("invalid key PEM: {e}")))?
        .ok_or_else(|| ServerError::Tls(format!("no private key in {}", key_path.display())))?;

    let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| ServerError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(e.to_string()))?;

    Ok(Arc::new(config))
}

/// Accept connections until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener, acceptor: TlsAcceptor, router: Arc<FeedRouter>, shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => accepted,
        };

        let (tcp, peer) = match accepted {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, backoff_ms = ACCEPT_BACKOFF.as_millis() as u64, "accept failed");
                if accept_backoff(&mut shutdown).await {
                    continue;
                }
                tracing::info!("listener shutting down");
                return Ok(());
            }
        };

        let acceptor = acceptor.clone();
        let router = Arc::clone(&router);

        tokio::spawn(async move {
            let tls = match timeout(REQUEST_TIMEOUT, acceptor.accept(tcp)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(err)) => {
                    tracing::debug!(%peer, error = %err, "TLS handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(%peer, "TLS handshake timed out");
                    return;
                }
            };

            if let Err(err) = handle_connection(tls, &router).await {
                tracing::debug!(%peer, error = %err, "connection ended with error");
            }
        });
    }
}

/// Sleep for [`ACCEPT_BACKOFF`]; `false` when `shutdown` resolved first.
async fn accept_backoff<F>(shutdown: &mut Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = shutdown.as_mut() => false,
        _ = sleep(ACCEPT_BACKOFF) => true,
    }
}

/// Serve a single request on an established stream.
///
/// Malformed requests are answered with status 59 before the error is
/// returned to the caller for logging.
pub async fn handle_connection<S>(stream: S, router: &FeedRouter) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);

    let request = match timeout(REQUEST_TIMEOUT, read_request_line(&mut stream)).await {
        Ok(line) => line.and_then(|line| Request::parse(&line)),
        Err(_) => Err(ServerError::Timeout),
    };

    let result = match request {
        Ok(request) => {
            router.handle(&request).write_to(&mut stream).await?;
            Ok(())
        }
        Err(ServerError::BadRequest(reason)) => {
            gemini::write_header(&mut stream, Status::BadRequest, &reason).await?;
            Err(ServerError::BadRequest(reason))
        }
        Err(err) => return Err(err),
    };

    stream.shutdown().await?;
    result
}

/// Read up to the first LF, refusing lines longer than a Gemini request.
async fn read_request_line<R>(reader: &mut R) -> Result<Vec<u8>, ServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(256);
    let limit = (MAX_REQUEST_LEN + 2) as u64;
    let read = reader.take(limit).read_until(b'\n', &mut line).await?;

    if read == 0 {
        return Err(ServerError::BadRequest("empty request".into()));
    }
    if !line.ends_with(b"\n") {
        return Err(ServerError::BadRequest("request line too long or not terminated".into()));
    }

    Ok(line)
}
