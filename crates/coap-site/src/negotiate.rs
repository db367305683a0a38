// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Content-format negotiation.
//!
//! Selection is exact-match only: an `accept` value that is not among the
//! available formats is rejected, never mapped to a "closest" format.

use std::collections::BTreeMap;

use crate::config::ConfigError;
use crate::error::SiteError;
use crate::message::ContentFormat;

/// Pick the representation for `accept`, falling back to `default` when the
/// requester expressed no preference.
pub fn select<'a>(
    available: &'a BTreeMap<ContentFormat, Vec<u8>>,
    accept: Option<ContentFormat>,
    default: ContentFormat,
) -> Result<(ContentFormat, &'a [u8]), SiteError> {
    let format = accept.unwrap_or(default);
    available
        .get(&format)
        .map(|bytes| (format, bytes.as_slice()))
        .ok_or(SiteError::UnsupportedContentFormat(format))
}

/// A resource's set of representations with a validated default.
#[derive(Debug, Clone)]
pub struct Representations {
    default: ContentFormat,
    available: BTreeMap<ContentFormat, Vec<u8>>,
}

impl Representations {
    /// Build a representation set. A default that is not available is a
    /// configuration error and is reported here, at construction time.
    pub fn new<I>(default: ContentFormat, available: I) -> Result<Self, SiteError>
    where
        I: IntoIterator<Item = (ContentFormat, Vec<u8>)>,
    {
        let available: BTreeMap<_, _> = available.into_iter().collect();
        if !available.contains_key(&default) {
            return Err(ConfigError::Invalid(format!(
                "default representation {} is not among the available formats",
                default
            ))
            .into());
        }
        Ok(Self { default, available })
    }

    pub fn select(&self, accept: Option<ContentFormat>) -> Result<(ContentFormat, &[u8]), SiteError> {
        select(&self.available, accept, self.default)
    }

    pub fn default_format(&self) -> ContentFormat {
        self.default
    }

    /// Available formats in ascending id order.
    pub fn formats(&self) -> Vec<ContentFormat> {
        self.available.keys().copied().collect()
    }
}
