// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

use crate::coercion::CoercionError;

/// Failure of a single field resolution.
///
/// Failures raised by resolvers and hooks pass through the interception chain untouched, so the
/// `Display` of a `FieldError` is always the message it was created with.
#[derive(Error, Debug)]
pub enum FieldError {
    #[error("{0}")]
    Resolution(String),

    #[error("{message}")]
    Source {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("Unknown directive '@{0}'")]
    UnknownDirective(String),
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        FieldError::Resolution(message.into())
    }

    /// Wrap an arbitrary error, keeping it reachable through `source()`.
    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FieldError::Source {
            message: error.to_string(),
            source: Box::new(error),
        }
    }
}
