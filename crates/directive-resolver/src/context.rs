// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use common::value::Val;

/// Shared, read-only state of a single request, visible to every resolver and hook.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: HashMap<String, Val>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Val>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Val> {
        self.values.get(key)
    }
}
