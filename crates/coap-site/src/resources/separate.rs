// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slow resource: GET suspends before answering so the transport has to
//! acknowledge early and send the response separately.

use std::time::Duration;

use crate::message::{ContentFormat, Response};

const RINGS: &str = "Three rings for the elven kings under the sky, seven rings \
for dwarven lords in their halls of stone, nine rings for mortal men doomed to \
die, one ring for the dark lord on his dark throne.";

#[derive(Debug)]
pub struct SeparateLargeResource {
    delay: Duration,
}

impl SeparateLargeResource {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn title(&self) -> &str {
        "A large resource"
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleeps on the runtime timer; other requests keep being served.
    pub(crate) async fn get(&self) -> Response {
        tokio::time::sleep(self.delay).await;
        Response::content(RINGS.as_bytes(), ContentFormat::TEXT)
    }
}
