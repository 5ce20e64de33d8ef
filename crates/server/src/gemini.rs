//! Gemini request and response framing.
//!
//! A request is a single absolute URL terminated by CRLF (at most 1024
//! bytes). A response is `<status> <meta>\r\n`, followed by the body for
//! success responses only.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::error::ServerError;

/// Longest URL a client may send, excluding CRLF.
pub const MAX_REQUEST_LEN: usize = 1024;

/// MIME type of every page we serve.
pub const GEMTEXT_MIME: &str = "text/gemini";

/// Status codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Input = 10,
    Success = 20,
    CgiError = 42,
    NotFound = 51,
    BadRequest = 59,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A parsed inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    url: Url,
    path: String,
}

impl Request {
    /// Parse a raw request line (terminator included or not).
    pub fn parse(line: &[u8]) -> Result<Self, ServerError> {
        let line = line
            .strip_suffix(b"\r\n")
            .or_else(|| line.strip_suffix(b"\n"))
            .unwrap_or(line);

        if line.is_empty() {
            return Err(ServerError::BadRequest("empty request".into()));
        }
        if line.len() > MAX_REQUEST_LEN {
            return Err(ServerError::BadRequest(format!("request exceeds {MAX_REQUEST_LEN} bytes")));
        }

        let text = std::str::from_utf8(line).map_err(|_| ServerError::BadRequest("request is not UTF-8".into()))?;
        let url = Url::parse(text).map_err(|e| ServerError::BadRequest(format!("invalid URL: {e}")))?;

        if url.scheme() != "gemini" {
            return Err(ServerError::BadRequest(format!("unsupported scheme: {}", url.scheme())));
        }

        let path = match url.path() {
            "" => "/".to_string(),
            raw => urlencoding::decode(raw)
                .map_err(|_| ServerError::BadRequest("path is not valid UTF-8".into()))?
                .into_owned(),
        };

        Ok(Self { url, path })
    }

    /// Percent-decoded request path; a bare host (`gemini://example.org`) is `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// First query key in query-string order, percent-decoded.
    ///
    /// Gemini input arrives as the raw query (`/select_tweet?5`), so the
    /// key carries the value. Any further keys are ignored.
    pub fn first_query_key(&self) -> Option<String> {
        self.url.query_pairs().next().map(|(key, _)| key.into_owned())
    }
}

/// The four response shapes the router produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Status 20; body follows the header.
    Success { mime: &'static str, body: Bytes },
    /// Status 10; meta is the prompt shown to the user.
    Input { prompt: String },
    /// Status 42; meta is the error text.
    ClientError { message: String },
    /// Status 51; meta is the location error text.
    NotFound { message: String },
}

impl Response {
    /// A gemtext page.
    pub fn page(body: impl Into<Bytes>) -> Self {
        Response::Success { mime: GEMTEXT_MIME, body: body.into() }
    }

    pub fn status(&self) -> Status {
        match self {
            Response::Success { .. } => Status::Success,
            Response::Input { .. } => Status::Input,
            Response::ClientError { .. } => Status::CgiError,
            Response::NotFound { .. } => Status::NotFound,
        }
    }

    pub fn meta(&self) -> &str {
        match self {
            Response::Success { mime, .. } => *mime,
            Response::Input { prompt } => prompt.as_str(),
            Response::ClientError { message } | Response::NotFound { message } => message.as_str(),
        }
    }

    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Response::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Write header and body; the caller closes the stream.
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_header(writer, self.status(), self.meta()).await?;
        if let Some(body) = self.body() {
            writer.write_all(body).await?;
        }
        writer.flush().await
    }
}

/// Encode a response header line.
pub fn header_line(status: Status, meta: &str) -> String {
    format!("{} {}\r\n", status.code(), meta)
}

pub async fn write_header<W>(writer: &mut W, status: Status, meta: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(header_line(status, meta).as_bytes()).await
}
