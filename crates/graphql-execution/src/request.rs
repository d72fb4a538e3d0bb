// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::Deserialize;
use serde_json::{Map, Value};

use common::value::Val;

/// A GraphQL request: the query document, the operation to run and its variables.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Option<Map<String, Value>>,
    /// Source value handed to the resolvers of root fields.
    pub root_value: Val,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn root_value(mut self, root_value: impl Into<Val>) -> Self {
        self.root_value = root_value.into();
        self
    }

    /// Parse the standard `{ "query", "operationName", "variables" }` payload.
    pub fn from_json(json: Value) -> Result<Self, serde_json::Error> {
        #[derive(Debug, Deserialize)]
        struct RawRequest {
            query: String,
            #[serde(rename = "operationName")]
            operation_name: Option<String>,
            variables: Option<Map<String, Value>>,
        }

        let raw = serde_json::from_value::<RawRequest>(json)?;

        Ok(Self {
            query: raw.query,
            operation_name: raw.operation_name,
            variables: raw.variables,
            root_value: Val::Null,
        })
    }
}
