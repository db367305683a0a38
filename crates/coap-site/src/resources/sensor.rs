// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Append-only log of binary sensor records.

use parking_lot::Mutex;
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::SiteError;
use crate::message::{ContentFormat, Request, Response, ResponseCode};

/// Ordered byte records; indices are 1-based.
#[derive(Debug, Default, Clone)]
pub struct RecordLog {
    records: Vec<Vec<u8>>,
}

impl RecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its 1-based index.
    pub fn append(&mut self, record: Vec<u8>) -> usize {
        self.records.push(record);
        self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Vec<u8>] {
        &self.records
    }

    /// Records as lowercase hex strings.
    pub fn to_hex(&self) -> Vec<String> {
        self.records.iter().map(hex::encode).collect()
    }
}

#[derive(Serialize)]
struct SensorRecords {
    sensor_records: Vec<String>,
}

/// POST stores the raw payload as a record; GET lists all records.
#[derive(Debug)]
pub struct SensorDataResource {
    log: Mutex<RecordLog>,
    diagnostics: Diagnostics,
}

impl SensorDataResource {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            log: Mutex::new(RecordLog::new()),
            diagnostics,
        }
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    pub(crate) fn get(&self) -> Result<Response, SiteError> {
        let body = SensorRecords {
            sensor_records: self.log.lock().to_hex(),
        };
        let payload = serde_json::to_vec(&body).map_err(|e| SiteError::Runtime(e.to_string()))?;
        Ok(Response::content(payload, ContentFormat::JSON))
    }

    pub(crate) fn post(&self, request: &Request) -> Response {
        let index = self.log.lock().append(request.payload.clone());
        self.diagnostics
            .record_stored(&request.path, index, &request.payload);
        Response::new(ResponseCode::Created)
            .with_payload(format!("Data record #{} stored successfully.", index))
            .with_format(ContentFormat::TEXT)
    }
}
