// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// Tracing filter, same syntax as `RUST_LOG`.
pub const DIRECTIVE_LOG: &str = "DIRECTIVE_LOG";

/// Comma-separated directive names that never take part in resolution chaining.
pub const DIRECTIVE_RESERVED_NAMES: &str = "DIRECTIVE_RESERVED_NAMES";
