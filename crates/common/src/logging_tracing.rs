// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! # Tracing configuration setup.
//!
//! Directive resolution is instrumented with Rust's `tracing` framework.
//!
//! Calling the `init` function will initialize a global tracing subscriber based on the value of
//! the `DIRECTIVE_LOG` environment variable which follows the same conventions as `RUST_LOG`.
//! For example, `DIRECTIVE_LOG=directive_resolver=trace` shows every chain step as it runs.

use thiserror::Error;

use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*, util::TryInitError};

use crate::env_const::DIRECTIVE_LOG;

/// Initialize the tracing subscriber.
///
/// Creates a compact `tracing_subscriber::fmt` layer filtered by `DIRECTIVE_LOG` (defaulting to
/// `warn`).
pub fn init() -> Result<(), TracingInitError> {
    let fmt_layer = tracing_subscriber::fmt::layer().compact();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(DIRECTIVE_LOG)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[derive(Error, Debug)]
pub enum TracingInitError {
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized(#[from] TryInitError),
}
