// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/response shapes exchanged with the transport engine.
//!
//! The transport parses wire messages into `Request` and serializes
//! `Response`; nothing in here knows about framing or retransmission.

use std::fmt;

use serde::Serialize;

use crate::chunked::BlockOption;
use crate::path::ResourcePath;

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
}

impl Method {
    /// Parse a method name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "PUT" => Some(Self::Put),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
        })
    }
}

// ---------------------------------------------------------------------------
// Content format
// ---------------------------------------------------------------------------

/// Numeric content-format identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContentFormat(pub u16);

impl ContentFormat {
    pub const TEXT: Self = Self(0);
    pub const LINK_FORMAT: Self = Self(40);
    pub const OCTET_STREAM: Self = Self(42);
    pub const JSON: Self = Self(50);
    /// Experimental-range id used for `application/xhtml+xml;charset=utf-8`.
    pub const XHTML: Self = Self(65000);

    /// Media type name for the well-known identifiers.
    pub fn media_type(&self) -> Option<&'static str> {
        match self.0 {
            0 => Some("text/plain;charset=utf-8"),
            40 => Some("application/link-format"),
            42 => Some("application/octet-stream"),
            50 => Some("application/json"),
            65000 => Some("application/xhtml+xml;charset=utf-8"),
            _ => None,
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.media_type() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Response code
// ---------------------------------------------------------------------------

/// Response status. Encodes on the wire as `class * 32 + detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Created,
    Changed,
    Content,
    Continue,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    RequestEntityIncomplete,
    UnsupportedContentFormat,
    InternalServerError,
}

impl ResponseCode {
    pub fn class(&self) -> u8 {
        match self {
            Self::Created | Self::Changed | Self::Content | Self::Continue => 2,
            Self::BadRequest
            | Self::NotFound
            | Self::MethodNotAllowed
            | Self::RequestEntityIncomplete
            | Self::UnsupportedContentFormat => 4,
            Self::InternalServerError => 5,
        }
    }

    pub fn detail(&self) -> u8 {
        match self {
            Self::Created => 1,
            Self::Changed => 4,
            Self::Content => 5,
            Self::Continue => 31,
            Self::BadRequest => 0,
            Self::NotFound => 4,
            Self::MethodNotAllowed => 5,
            Self::RequestEntityIncomplete => 8,
            Self::UnsupportedContentFormat => 15,
            Self::InternalServerError => 0,
        }
    }

    /// Single-byte wire encoding.
    pub fn as_u8(&self) -> u8 {
        (self.class() << 5) | self.detail()
    }

    pub fn is_success(&self) -> bool {
        self.class() == 2
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Changed => "Changed",
            Self::Content => "Content",
            Self::Continue => "Continue",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::RequestEntityIncomplete => "Request Entity Incomplete",
            Self::UnsupportedContentFormat => "Unsupported Content-Format",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} {}", self.class(), self.detail(), self.reason())
    }
}

// ---------------------------------------------------------------------------
// Requester metadata
// ---------------------------------------------------------------------------

/// Opaque identity of an observing client, assigned by the transport
/// (typically endpoint address plus token).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the transport knows about the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    /// Protocol scheme (`coap`, `coaps`, `coap+tcp`, ...).
    pub scheme: String,
    /// Peer address as host:port.
    pub hostinfo: String,
    /// Local address the request arrived on.
    pub hostinfo_local: String,
    /// Identity claims established by the security layer.
    pub claims: Vec<String>,
}

impl Default for RemoteInfo {
    fn default() -> Self {
        Self {
            scheme: "coap".to_string(),
            hostinfo: "local".to_string(),
            hostinfo_local: "local".to_string(),
            claims: Vec::new(),
        }
    }
}

/// Observe option carried on a GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observe {
    Register,
    Deregister,
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A parsed request delivered by the transport engine.
#[derive(Debug, Clone)]
pub struct Request {
    pub path: ResourcePath,
    pub method: Method,
    pub accept: Option<ContentFormat>,
    pub payload: Vec<u8>,
    pub remote: RemoteInfo,
    pub observe: Option<Observe>,
    /// Identity used for observation; required when `observe` is set.
    pub subscriber: Option<SubscriberId>,
    /// Block-wise upload position (request body).
    pub block1: Option<BlockOption>,
    /// Block-wise download position (response body).
    pub block2: Option<BlockOption>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<ResourcePath>) -> Self {
        Self {
            path: path.into(),
            method,
            accept: None,
            payload: Vec::new(),
            remote: RemoteInfo::default(),
            observe: None,
            subscriber: None,
            block1: None,
            block2: None,
        }
    }

    pub fn get(path: impl Into<ResourcePath>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn put(path: impl Into<ResourcePath>, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Put, path).with_payload(payload)
    }

    pub fn post(path: impl Into<ResourcePath>, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Post, path).with_payload(payload)
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_accept(mut self, accept: ContentFormat) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn with_remote(mut self, remote: RemoteInfo) -> Self {
        self.remote = remote;
        self
    }

    /// Mark this GET as an observe registration for `subscriber`.
    pub fn observe(mut self, subscriber: SubscriberId) -> Self {
        self.observe = Some(Observe::Register);
        self.subscriber = Some(subscriber);
        self
    }

    /// Mark this GET as an observe deregistration for `subscriber`.
    pub fn deregister(mut self, subscriber: SubscriberId) -> Self {
        self.observe = Some(Observe::Deregister);
        self.subscriber = Some(subscriber);
        self
    }

    pub fn with_block1(mut self, block: BlockOption) -> Self {
        self.block1 = Some(block);
        self
    }

    pub fn with_block2(mut self, block: BlockOption) -> Self {
        self.block2 = Some(block);
        self
    }
}

/// A response handed back to the transport engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: ResponseCode,
    pub payload: Vec<u8>,
    pub content_format: Option<ContentFormat>,
    /// Observe sequence (state-version) for registrations and notifications.
    pub observe: Option<u64>,
    /// Acknowledged upload block.
    pub block1: Option<BlockOption>,
    /// Served download block.
    pub block2: Option<BlockOption>,
    /// Content version for windowed reads.
    pub etag: Option<u64>,
}

impl Response {
    pub fn new(code: ResponseCode) -> Self {
        Self {
            code,
            payload: Vec::new(),
            content_format: None,
            observe: None,
            block1: None,
            block2: None,
            etag: None,
        }
    }

    /// 2.05 with a typed payload.
    pub fn content(payload: impl Into<Vec<u8>>, format: ContentFormat) -> Self {
        Self::new(ResponseCode::Content)
            .with_payload(payload)
            .with_format(format)
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_format(mut self, format: ContentFormat) -> Self {
        self.content_format = Some(format);
        self
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_encoding() {
        assert_eq!(ResponseCode::Content.as_u8(), 69);
        assert_eq!(ResponseCode::Created.as_u8(), 65);
        assert_eq!(ResponseCode::Changed.as_u8(), 68);
        assert_eq!(ResponseCode::NotFound.as_u8(), 132);
        assert_eq!(ResponseCode::UnsupportedContentFormat.as_u8(), 143);
    }

    #[test]
    fn test_response_code_display() {
        assert_eq!(ResponseCode::Content.to_string(), "2.05 Content");
        assert_eq!(ResponseCode::MethodNotAllowed.to_string(), "4.05 Method Not Allowed");
        assert!(ResponseCode::Changed.is_success());
        assert!(!ResponseCode::NotFound.is_success());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("get"), Some(Method::Get));
        assert_eq!(Method::parse("POST"), Some(Method::Post));
        assert_eq!(Method::parse("DELETE"), None);
    }

    #[test]
    fn test_request_builders() {
        let req = Request::put("/basic", b"x".to_vec()).with_accept(ContentFormat::TEXT);
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.path.to_string(), "/basic");
        assert_eq!(req.payload, b"x");
        assert_eq!(req.accept, Some(ContentFormat::TEXT));

        let obs = Request::get("/time").observe(SubscriberId::new("peer-1"));
        assert_eq!(obs.observe, Some(Observe::Register));
        assert_eq!(obs.subscriber.as_ref().map(SubscriberId::as_str), Some("peer-1"));
    }
}
