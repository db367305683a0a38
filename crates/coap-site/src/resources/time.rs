// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observable clock.

use crate::message::{ContentFormat, Response};

/// Local wall-clock time at minute resolution.
#[derive(Debug, Default)]
pub struct TimeResource;

impl TimeResource {
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M";

    pub fn new() -> Self {
        Self
    }

    pub fn now_text() -> String {
        chrono::Local::now().format(Self::FORMAT).to_string()
    }

    pub(crate) fn get(&self) -> Response {
        Response::content(Self::now_text(), ContentFormat::TEXT)
    }
}
