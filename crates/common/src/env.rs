// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

/// Source of configuration values.
///
/// Production code reads the process environment through [`SystemEnvironment`]; tests supply a
/// [`MapEnvironment`] so that they never depend on (or mutate) the process environment.
pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Comma-separated list; blank entries are dropped.
    fn get_list(&self, key: &str, default_value: Vec<String>) -> Vec<String> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(default_value)
    }
}

pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    values: HashMap<String, String>,
}

impl Environment for MapEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MapEnvironment {
    fn from(values: [(&str, &str); N]) -> Self {
        let mut env = Self::new();
        for (key, value) in values {
            env.set(key, value);
        }
        env
    }
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiplatform_test::multiplatform_test;

    #[multiplatform_test]
    fn list_values() {
        let env = MapEnvironment::from([("NAMES", " skip, include ,,deprecated ")]);

        assert_eq!(
            env.get_list("NAMES", vec![]),
            vec!["skip", "include", "deprecated"]
        );
        assert_eq!(
            env.get_list("MISSING", vec!["x".to_string()]),
            vec!["x".to_string()]
        );
    }

    #[multiplatform_test]
    fn later_values_win() {
        let mut env = MapEnvironment::from([("NAMES", "skip")]);
        env.set("NAMES", "include");

        assert_eq!(env.get("NAMES").as_deref(), Some("include"));
        assert_eq!(env.get("MISSING"), None);
    }
}
