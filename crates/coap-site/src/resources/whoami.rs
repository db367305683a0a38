// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reports what the transport knows about the requester. Stateless.

use crate::message::{ContentFormat, Request, Response};

#[derive(Debug, Default)]
pub struct WhoAmI;

impl WhoAmI {
    pub(crate) fn get(&self, request: &Request) -> Response {
        let remote = &request.remote;
        let mut lines = vec![
            format!("Used protocol: {}.", remote.scheme),
            format!("Request came from {}.", remote.hostinfo),
            format!("The server address used {}.", remote.hostinfo_local),
        ];
        if remote.claims.is_empty() {
            lines.push("No claims authenticated.".to_string());
        } else {
            let claims: Vec<String> = remote.claims.iter().map(|c| format!("{:?}", c)).collect();
            lines.push(format!(
                "Authenticated claims of the client: {}.",
                claims.join(", ")
            ));
        }
        Response::content(lines.join("\n"), ContentFormat::TEXT)
    }
}
