// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::Pos;
use serde::Serialize;
use serde_json::Value as JsonValue;

use directive_resolver::PathSegment;

use crate::error::ExecutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for Location {
    fn from(pos: Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

/// An entry of the `errors` list of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    /// Response path of the failed field; absent for request errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
}

impl ResponseError {
    pub fn field(message: impl Into<String>, pos: Pos, path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            locations: vec![pos.into()],
            path: Some(path),
        }
    }
}

impl From<ExecutionError> for ResponseError {
    fn from(error: ExecutionError) -> Self {
        Self {
            message: error.to_string(),
            locations: error.positions().into_iter().map(Location::from).collect(),
            path: None,
        }
    }
}

/// Result of executing a request.
///
/// `data` is `null` when the request failed before execution started, or when a non-null
/// failure propagated all the way to the root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub data: JsonValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
}

impl Response {
    pub fn new(data: JsonValue, errors: Vec<ResponseError>) -> Self {
        Self { data, errors }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn to_json(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl From<ExecutionError> for Response {
    fn from(error: ExecutionError) -> Self {
        Self {
            data: JsonValue::Null,
            errors: vec![error.into()],
        }
    }
}
