// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Diagnostics collaborator.
//!
//! Components that log receive a `Diagnostics` value instead of reaching for
//! process-wide state. The subscriber itself is installed once by the binary;
//! this type only scopes events under the site's span.

use tracing::Span;

use crate::message::{Method, Request, ResponseCode, SubscriberId};
use crate::path::ResourcePath;

#[derive(Debug, Clone)]
pub struct Diagnostics {
    span: Span,
}

impl Diagnostics {
    pub fn new(site_name: &str) -> Self {
        Self {
            span: tracing::info_span!("site", name = %site_name),
        }
    }

    /// Events still reach the global subscriber, just without a site scope.
    pub fn disabled() -> Self {
        Self { span: Span::none() }
    }

    pub fn request(&self, request: &Request) {
        self.span.in_scope(|| {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                peer = %request.remote.hostinfo,
                bytes = request.payload.len(),
                "Request"
            );
        });
    }

    pub fn response(&self, path: &ResourcePath, code: ResponseCode) {
        self.span.in_scope(|| {
            if code.is_success() {
                tracing::debug!(path = %path, code = %code, "Response");
            } else {
                tracing::info!(path = %path, code = %code, "Request failed");
            }
        });
    }

    /// Payload accepted by a mutating handler.
    pub fn payload(&self, path: &ResourcePath, method: Method, payload: &[u8]) {
        self.span.in_scope(|| {
            tracing::info!(
                "{} {} payload: {}",
                method,
                path,
                String::from_utf8_lossy(payload)
            );
        });
    }

    pub fn record_stored(&self, path: &ResourcePath, index: usize, record: &[u8]) {
        self.span.in_scope(|| {
            tracing::info!(path = %path, index, "Received sensor data: {}", hex::encode(record));
        });
    }

    pub fn registered(&self, path: &ResourcePath) {
        self.span.in_scope(|| tracing::debug!(path = %path, "Resource registered"));
    }

    pub fn observation_started(&self, path: &ResourcePath) {
        self.span.in_scope(|| {
            tracing::info!(path = %path, "First observer, starting notification timer");
        });
    }

    pub fn observation_stopped(&self, path: &ResourcePath) {
        self.span.in_scope(|| {
            tracing::info!(path = %path, "Last observer gone, stopping notification timer");
        });
    }

    pub fn subscriber_added(&self, path: &ResourcePath, subscriber: &SubscriberId, count: usize) {
        self.span.in_scope(|| {
            tracing::debug!(path = %path, subscriber = %subscriber, count, "Observer registered");
        });
    }

    pub fn subscriber_removed(&self, path: &ResourcePath, subscriber: &SubscriberId, count: usize) {
        self.span.in_scope(|| {
            tracing::debug!(path = %path, subscriber = %subscriber, count, "Observer removed");
        });
    }

    pub fn notification_failed(&self, path: &ResourcePath, subscriber: &SubscriberId, reason: &str) {
        self.span.in_scope(|| {
            tracing::warn!(
                path = %path,
                subscriber = %subscriber,
                "Notification delivery failed, dropping observer: {}",
                reason
            );
        });
    }

    pub fn notified(&self, path: &ResourcePath, version: u64, delivered: usize) {
        self.span.in_scope(|| {
            tracing::debug!(path = %path, version, delivered, "Notifications sent");
        });
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::disabled()
    }
}
