//! # Context Module
//!
//! Per-request state threaded by `&mut` through every middleware and the handler.
//!
//! A [`Context`] owns the inbound request head and body, the outgoing [`Response`], the
//! route parameters filled in after matching, the parsed [`Query`], and the optional
//! per-request fields that collaborator middleware populate (`body`, `auth`,
//! `request_id`). Anything else a collaborator needs to attach goes in
//! [`Context::extensions`], a type-keyed side table.
//!
//! Request accessors (`header`, `cookies`, `protocol`, `hostname`, `subdomains`, ...) read
//! the live header map on every call; nothing is cached, so a middleware that rewrites a
//! header is seen by everything downstream.

mod query;
mod response;

pub use query::{Query, QueryValue};
pub use response::{BodyStream, CookieOptions, Response, ResponseBody, SameSite};

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, HOST, LOCATION, SET_COOKIE};
use http::{request, Extensions, HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncRead;
use tracing::warn;

use crate::error::{Error, Result};
use crate::ids::RequestId;
use crate::static_files::StaticFiles;

/// Transport facts about the connection a request arrived on.
///
/// Server adapters insert this into the request's extensions; when absent the request is
/// treated as plain HTTP from an unknown peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub remote_addr: Option<SocketAddr>,
    /// The connection was TLS-terminated by the server itself.
    pub secure: bool,
}

/// Settings shared by every [`Context`] created by one dispatcher.
#[derive(Debug, Clone)]
pub struct ContextSettings {
    /// Honour `X-Forwarded-Proto`, `X-Forwarded-Host` and `X-Forwarded-For`.
    pub trust_proxy: bool,
    /// Number of trailing host labels dropped by [`Context::subdomains`].
    pub subdomain_offset: usize,
    /// Base directory for [`Context::send_file`] and [`Context::download`].
    pub static_files: Option<StaticFiles>,
    /// Base directory for [`Context::render`].
    pub views: Option<StaticFiles>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            trust_proxy: false,
            subdomain_offset: 2,
            static_files: None,
            views: None,
        }
    }
}

/// Body parsed by a body-parsing collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Query),
    Text(String),
    Bytes(Bytes),
}

/// Authentication outcome recorded by an auth collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub authenticated: bool,
    pub principal: Option<String>,
    pub scopes: Vec<String>,
    /// Decoded token claims, when the credential carried any.
    pub claims: Option<Value>,
}

/// Per-request state.
pub struct Context {
    head: request::Parts,
    raw_body: Bytes,
    connection: ConnectionInfo,
    settings: Arc<ContextSettings>,
    response: Response,
    route_pattern: Option<String>,

    /// Route parameters, populated after a successful match.
    pub params: HashMap<String, String>,
    /// Query string, with repeated keys accumulated.
    pub query: Query,
    /// Parsed body; left `None` by the core.
    pub body: Option<RequestBody>,
    pub request_id: RequestId,
    pub auth: AuthState,
    /// Type-keyed side table for collaborator-specific state.
    pub extensions: Extensions,
}

impl Context {
    /// Build a context for `request` with default settings.
    #[must_use]
    pub fn new(request: http::Request<Bytes>) -> Self {
        Self::with_settings(request, Arc::new(ContextSettings::default()))
    }

    #[must_use]
    pub fn with_settings(request: http::Request<Bytes>, settings: Arc<ContextSettings>) -> Self {
        let (mut head, raw_body) = request.into_parts();
        let connection = head
            .extensions
            .remove::<ConnectionInfo>()
            .unwrap_or_default();
        let query = head.uri.query().map(Query::parse).unwrap_or_default();
        Self {
            head,
            raw_body,
            connection,
            settings,
            response: Response::new(),
            route_pattern: None,
            params: HashMap::new(),
            query,
            body: None,
            request_id: RequestId::new(),
            auth: AuthState::default(),
            extensions: Extensions::new(),
        }
    }

    // ----- request accessors -------------------------------------------------

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Path component of the request target, without query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Request target as received, query string included.
    #[must_use]
    pub fn original_url(&self) -> &str {
        self.head
            .uri
            .path_and_query()
            .map_or_else(|| self.head.uri.path(), |pq| pq.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Mutable request headers, for collaborators that rewrite the request.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.head.headers
    }

    /// First value of a request header. Lookup is case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a request header, in order. Values that are not visible ASCII are skipped.
    #[must_use]
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.head
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Cookies from every `Cookie` header. Values are percent-decoded; the first
    /// occurrence of a name wins.
    #[must_use]
    pub fn cookies(&self) -> HashMap<String, String> {
        let mut cookies = HashMap::new();
        for header in self.header_all(COOKIE.as_str()) {
            for pair in header.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let name = parts.next().unwrap_or("").trim();
                if name.is_empty() {
                    continue;
                }
                let raw = parts.next().unwrap_or("").trim().trim_matches('"');
                let value = urlencoding::decode(raw)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                cookies.entry(name.to_string()).or_insert(value);
            }
        }
        cookies
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().remove(name)
    }

    /// `"https"` or `"http"`.
    #[must_use]
    pub fn protocol(&self) -> &'static str {
        if self.settings.trust_proxy {
            if let Some(proto) = self.header("x-forwarded-proto") {
                let first = proto.split(',').next().unwrap_or("").trim();
                return if first.eq_ignore_ascii_case("https") {
                    "https"
                } else {
                    "http"
                };
            }
        }
        if self.connection.secure {
            "https"
        } else {
            "http"
        }
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.protocol() == "https"
    }

    /// Host name without port. IPv6 literals keep their brackets.
    #[must_use]
    pub fn hostname(&self) -> Option<String> {
        let forwarded = if self.settings.trust_proxy {
            self.header("x-forwarded-host")
                .and_then(|h| h.split(',').next())
                .map(str::trim)
                .filter(|h| !h.is_empty())
        } else {
            None
        };
        let host = forwarded
            .or_else(|| self.header(HOST.as_str()))
            .or_else(|| self.head.uri.authority().map(|a| a.as_str()))?;
        Some(strip_port(host).to_string())
    }

    /// Subdomain labels, most significant first, after dropping
    /// `subdomain_offset` trailing labels. Empty for IP hosts.
    ///
    /// `tobi.ferrets.example.com` yields `["ferrets", "tobi"]`.
    #[must_use]
    pub fn subdomains(&self) -> Vec<String> {
        let Some(host) = self.hostname() else {
            return Vec::new();
        };
        if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
            return Vec::new();
        }
        host.split('.')
            .rev()
            .skip(self.settings.subdomain_offset)
            .map(str::to_string)
            .collect()
    }

    /// Client address: first `X-Forwarded-For` entry when proxies are trusted, else the peer.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        if self.settings.trust_proxy {
            let forwarded = self
                .header("x-forwarded-for")
                .and_then(|h| h.split(',').next())
                .and_then(|ip| ip.trim().parse().ok());
            if forwarded.is_some() {
                return forwarded;
            }
        }
        self.connection.remote_addr.map(|a| a.ip())
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    /// Route parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Pattern of the matched route, once routing has happened.
    #[must_use]
    pub fn route_pattern(&self) -> Option<&str> {
        self.route_pattern.as_deref()
    }

    pub(crate) fn set_route_pattern(&mut self, pattern: &str) {
        self.route_pattern = Some(pattern.to_string());
    }

    /// Unparsed request body bytes.
    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Whether the request declares a JSON body.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .map(|ct| {
                let mime = ct.split(';').next().unwrap_or("").trim();
                mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
            })
            .unwrap_or(false)
    }

    #[must_use]
    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    // ----- response helpers --------------------------------------------------

    /// Set the response status. Ignored (with a warning) once the response is sent.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        if self.response.is_sent() {
            warn!(status = status.as_u16(), "Status change after response was sent ignored");
        } else {
            self.response.set_status(status);
        }
        self
    }

    /// Replace a response header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.response.insert_header(name, value)?;
        Ok(self)
    }

    /// Add a response header value alongside existing ones.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        self.response.append_header(name, value)?;
        Ok(self)
    }

    /// Serialize `value` as JSON.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.response
            .write("application/json", ResponseBody::Full(Bytes::from(bytes)))
    }

    pub fn text(&mut self, body: impl Into<String>) -> Result<()> {
        self.response.write(
            "text/plain; charset=utf-8",
            ResponseBody::Full(Bytes::from(body.into())),
        )
    }

    pub fn html(&mut self, body: impl Into<String>) -> Result<()> {
        self.response.write(
            "text/html; charset=utf-8",
            ResponseBody::Full(Bytes::from(body.into())),
        )
    }

    /// Raw bytes; `application/octet-stream` unless a content type was already set.
    pub fn send_bytes(&mut self, body: impl Into<Bytes>) -> Result<()> {
        self.response
            .write("application/octet-stream", ResponseBody::Full(body.into()))
    }

    /// Redirect with `302 Found`.
    pub fn redirect(&mut self, location: &str) -> Result<()> {
        self.redirect_with_status(StatusCode::FOUND, location)
    }

    pub fn redirect_with_status(&mut self, status: StatusCode, location: &str) -> Result<()> {
        self.response.insert_header(LOCATION.as_str(), location)?;
        self.response.set_status(status);
        self.response.write_as(
            "text/plain; charset=utf-8",
            ResponseBody::Full(Bytes::from(format!("Redirecting to {location}"))),
        )
    }

    /// Append a `Set-Cookie` header; earlier cookies are kept.
    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<&mut Self> {
        let header = options.serialize(name, value);
        self.response.append_header(SET_COOKIE.as_str(), &header)?;
        Ok(self)
    }

    /// Expire a cookie on the client.
    pub fn clear_cookie(&mut self, name: &str, options: &CookieOptions) -> Result<&mut Self> {
        let expired = CookieOptions {
            max_age: Some(std::time::Duration::ZERO),
            ..options.clone()
        };
        self.set_cookie(name, "", &expired)
    }

    /// Serve a file from the static root. The path is confined to that root.
    pub async fn send_file(&mut self, path: &str) -> Result<()> {
        let files = self
            .settings
            .static_files
            .as_ref()
            .ok_or(Error::RootNotConfigured("static"))?;
        let (file, content_type) = files.open(path).await?;
        self.response
            .write(content_type, ResponseBody::Stream(Box::pin(file)))
    }

    /// Serve a file from the static root as an attachment named `filename`
    /// (defaults to the file's own name).
    pub async fn download(&mut self, path: &str, filename: Option<&str>) -> Result<()> {
        let files = self
            .settings
            .static_files
            .clone()
            .ok_or(Error::RootNotConfigured("static"))?;
        let resolved = files.resolve(path)?;
        let name = filename
            .map(str::to_string)
            .or_else(|| {
                resolved
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "download".to_string());
        let (file, content_type) = files.open(path).await?;
        let disposition = format!(
            "attachment; filename=\"{}\"",
            name.replace(['"', '\\', '\r', '\n'], "_")
        );
        self.response
            .insert_header(CONTENT_DISPOSITION.as_str(), &disposition)?;
        self.response
            .write(content_type, ResponseBody::Stream(Box::pin(file)))
    }

    /// Pass a byte stream through to the client.
    pub fn stream<R>(&mut self, reader: R, content_type: &str) -> Result<()>
    where
        R: AsyncRead + Send + 'static,
    {
        self.response
            .write(content_type, ResponseBody::Stream(Box::pin(reader)))
    }

    /// Render a template from the views root with `data` and send it as HTML.
    pub async fn render<S: Serialize>(&mut self, template: &str, data: &S) -> Result<()> {
        let views = self
            .settings
            .views
            .as_ref()
            .ok_or(Error::RootNotConfigured("views"))?;
        let html = views.render(template, data).await?;
        self.html(html)
    }

    /// Whether a body has been written.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.response.is_sent()
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub(crate) fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Take the response out of the context.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.head.method)
            .field("uri", &self.head.uri)
            .field("request_id", &self.request_id)
            .field("params", &self.params)
            .field("query", &self.query)
            .field("status", &self.response.status())
            .field("sent", &self.response.is_sent())
            .finish_non_exhaustive()
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}
