use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

/// A byte stream passed through to the client unchanged.
pub type BodyStream = Pin<Box<dyn AsyncRead + Send>>;

/// Response payload.
#[derive(Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Full(Bytes),
    Stream(BodyStream),
}

impl ResponseBody {
    /// Drain the body into memory.
    pub async fn collect(self) -> std::io::Result<Bytes> {
        match self {
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Full(bytes) => Ok(bytes),
            ResponseBody::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Buffered bytes, if the body is not a stream.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseBody::Full(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Outgoing response state owned by a [`Context`](super::Context).
///
/// Once a body has been written the response is *sent*: headers are frozen and any further
/// body write fails with [`Error::ResponseAlreadySent`].
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
    sent: bool,
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Whether a body has been written.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub(crate) fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub(crate) fn insert_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_unsent()?;
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub(crate) fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_unsent()?;
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Write the body, setting `content_type` unless a content type was already chosen.
    pub(crate) fn write(&mut self, content_type: &str, body: ResponseBody) -> Result<()> {
        self.ensure_unsent()?;
        if !self.headers.contains_key(CONTENT_TYPE) {
            let value = HeaderValue::from_str(content_type)
                .map_err(|e| Error::InvalidHeader(e.to_string()))?;
            self.headers.insert(CONTENT_TYPE, value);
        }
        self.body = body;
        self.sent = true;
        Ok(())
    }

    /// Write a body with a fixed content type, overriding any chosen earlier.
    pub(crate) fn write_as(&mut self, content_type: &str, body: ResponseBody) -> Result<()> {
        self.ensure_unsent()?;
        self.headers.remove(CONTENT_TYPE);
        self.write(content_type, body)
    }

    fn ensure_unsent(&self) -> Result<()> {
        if self.sent {
            Err(Error::ResponseAlreadySent)
        } else {
            Ok(())
        }
    }

    /// Convert into an `http::Response`.
    #[must_use]
    pub fn into_http(self) -> http::Response<ResponseBody> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    /// Split into status, headers and body.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
    let value =
        HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader(format!("{name}: {e}")))?;
    Ok((name, value))
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes for [`Context::set_cookie`](super::Context::set_cookie).
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub max_age: Option<Duration>,
    /// Defaults to `/`.
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            path: Some("/".to_string()),
            domain: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

impl CookieOptions {
    /// Render a `Set-Cookie` header value. The value is percent-encoded.
    #[must_use]
    pub fn serialize(&self, name: &str, value: &str) -> String {
        let mut out = format!("{}={}", name, urlencoding::encode(value));
        if let Some(max_age) = self.max_age {
            out.push_str("; Max-Age=");
            out.push_str(&max_age.as_secs().to_string());
        }
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(path) = &self.path {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(same_site) = self.same_site {
            out.push_str("; SameSite=");
            out.push_str(same_site.as_str());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_serialization() {
        let opts = CookieOptions {
            max_age: Some(Duration::from_secs(60)),
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
            ..CookieOptions::default()
        };
        assert_eq!(
            opts.serialize("session", "a b;c"),
            "session=a%20b%3Bc; Max-Age=60; Path=/; Secure; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_second_write_is_rejected() {
        let mut res = Response::new();
        res.write("text/plain", ResponseBody::Full(Bytes::from_static(b"one")))
            .unwrap();
        assert!(res.is_sent());
        let err = res
            .write("text/plain", ResponseBody::Full(Bytes::from_static(b"two")))
            .unwrap_err();
        assert!(matches!(err, Error::ResponseAlreadySent));
        assert_eq!(res.body().as_bytes().unwrap().as_ref(), b"one");
    }

    #[test]
    fn test_headers_frozen_after_send() {
        let mut res = Response::new();
        res.insert_header("x-before", "1").unwrap();
        res.write("text/plain", ResponseBody::Empty).unwrap();
        assert!(matches!(
            res.insert_header("x-after", "1"),
            Err(Error::ResponseAlreadySent)
        ));
        assert_eq!(res.header("x-before"), Some("1"));
    }

    #[tokio::test]
    async fn test_collect_stream_body() {
        let reader: BodyStream = Box::pin(std::io::Cursor::new(b"streamed".to_vec()));
        let bytes = ResponseBody::Stream(reader).collect().await.unwrap();
        assert_eq!(bytes.as_ref(), b"streamed");
    }
}
