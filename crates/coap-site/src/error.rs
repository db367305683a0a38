// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Site errors and their mapping onto response codes.

use thiserror::Error;

use crate::config::ConfigError;
use crate::message::{ContentFormat, Method, Response, ResponseCode, SubscriberId};
use crate::path::ResourcePath;

/// Errors raised while building or serving the resource tree.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("No resource at {0}")]
    NotFound(ResourcePath),

    #[error("{method} not allowed on {path}")]
    MethodNotAllowed { path: ResourcePath, method: Method },

    #[error("Content format {0} not available")]
    UnsupportedContentFormat(ContentFormat),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Block {received} received while block {expected} was expected")]
    RequestEntityIncomplete { expected: u32, received: u32 },

    #[error("Path {0} already registered")]
    DuplicatePath(ResourcePath),

    #[error("Subscriber {0} unreachable")]
    SubscriberUnreachable(SubscriberId),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl SiteError {
    /// Response code a request-time error is reported with.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::NotFound(_) => ResponseCode::NotFound,
            Self::MethodNotAllowed { .. } => ResponseCode::MethodNotAllowed,
            Self::UnsupportedContentFormat(_) => ResponseCode::UnsupportedContentFormat,
            Self::BadRequest(_) => ResponseCode::BadRequest,
            Self::RequestEntityIncomplete { .. } => ResponseCode::RequestEntityIncomplete,
            Self::DuplicatePath(_)
            | Self::SubscriberUnreachable(_)
            | Self::Config(_)
            | Self::Runtime(_) => ResponseCode::InternalServerError,
        }
    }

    /// Final error response; the diagnostic text goes in the payload.
    pub fn to_response(&self) -> Response {
        Response::new(self.response_code())
            .with_payload(self.to_string())
            .with_format(ContentFormat::TEXT)
    }
}
