// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Root resource with several representations of the same greeting.

use crate::error::SiteError;
use crate::message::{ContentFormat, Request, Response};
use crate::negotiate::Representations;

const WELCOME_TEXT: &[u8] = b"Welcome to the demo server";
const WELCOME_LINKS: &[u8] = b"</.well-known/core>,ct=40";
const WELCOME_XHTML: &[u8] = b"<html xmlns=\"http://www.w3.org/1999/xhtml\">\
<head><title>coap-site demo</title></head>\
<body><h1>Welcome to the coap-site demo server!</h1>\
<ul><li><a href=\"time\">Current time</a></li>\
<li><a href=\"whoami\">Report my network address</a></li>\
</ul></body></html>";

#[derive(Debug)]
pub struct Welcome {
    representations: Representations,
}

impl Welcome {
    /// Text (default), link-format and xhtml representations.
    pub fn new() -> Result<Self, SiteError> {
        let representations = Representations::new(
            ContentFormat::TEXT,
            [
                (ContentFormat::TEXT, WELCOME_TEXT.to_vec()),
                (ContentFormat::LINK_FORMAT, WELCOME_LINKS.to_vec()),
                (ContentFormat::XHTML, WELCOME_XHTML.to_vec()),
            ],
        )?;
        Ok(Self::with_representations(representations))
    }

    pub fn with_representations(representations: Representations) -> Self {
        Self { representations }
    }

    pub fn formats(&self) -> Vec<ContentFormat> {
        self.representations.formats()
    }

    pub(crate) fn get(&self, request: &Request) -> Result<Response, SiteError> {
        let (format, bytes) = self.representations.select(request.accept)?;
        Ok(Response::content(bytes.to_vec(), format))
    }
}
