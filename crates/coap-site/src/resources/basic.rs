// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mutable scalar resource.
//!
//! PUT replaces the content while POST appends a space and the payload.
//! Both answer 2.04 Changed with the resulting content.

use parking_lot::Mutex;

use crate::diagnostics::Diagnostics;
use crate::message::{ContentFormat, Method, Request, Response, ResponseCode};

#[derive(Debug)]
pub struct BasicResource {
    content: Mutex<Vec<u8>>,
    diagnostics: Diagnostics,
}

impl BasicResource {
    pub fn new(initial: impl Into<Vec<u8>>, diagnostics: Diagnostics) -> Self {
        Self {
            content: Mutex::new(initial.into()),
            diagnostics,
        }
    }

    pub fn content(&self) -> Vec<u8> {
        self.content.lock().clone()
    }

    pub(crate) fn get(&self) -> Response {
        Response::content(self.content(), ContentFormat::TEXT)
    }

    pub(crate) fn put(&self, request: &Request) -> Response {
        self.diagnostics.payload(&request.path, Method::Put, &request.payload);
        let mut content = self.content.lock();
        *content = request.payload.clone();
        changed(&content)
    }

    pub(crate) fn post(&self, request: &Request) -> Response {
        self.diagnostics.payload(&request.path, Method::Post, &request.payload);
        let mut content = self.content.lock();
        content.push(b' ');
        content.extend_from_slice(&request.payload);
        changed(&content)
    }
}

fn changed(content: &[u8]) -> Response {
    Response::new(ResponseCode::Changed)
        .with_payload(content)
        .with_format(ContentFormat::TEXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> BasicResource {
        BasicResource::new(b" ".to_vec(), Diagnostics::disabled())
    }

    #[test]
    fn test_initial_content() {
        assert_eq!(resource().get().payload, b" ");
    }

    #[test]
    fn test_put_then_post_appends() {
        let res = resource();
        let put = res.put(&Request::put("/basic", b"x".to_vec()));
        assert_eq!(put.code, ResponseCode::Changed);
        assert_eq!(put.payload, b"x");

        let post = res.post(&Request::post("/basic", b"y".to_vec()));
        assert_eq!(post.code, ResponseCode::Changed);
        assert_eq!(res.get().payload, b"x y");
    }

    #[test]
    fn test_post_on_initial_content() {
        let res = resource();
        res.post(&Request::post("/basic", b"status ok".to_vec()));
        assert_eq!(res.content(), b"  status ok");
    }
}
