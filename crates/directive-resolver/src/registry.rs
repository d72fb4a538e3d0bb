// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashSet;
use std::sync::Arc;

use async_graphql_parser::types::{BaseType, Type};
use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;
use thiserror::Error;

use common::env::Environment;
use common::env_const::DIRECTIVE_RESERVED_NAMES;

use crate::directive::{ArgumentDefinition, DirectiveDescriptor, DirectiveLocation};

/// Directive names reserved by the language. Usages of these never join an interception chain.
pub const BUILT_IN_DIRECTIVES: [&str; 3] = ["deprecated", "skip", "include"];

#[derive(Debug, Clone, PartialEq)]
pub struct InterceptionConfig {
    pub reserved_directives: Vec<String>,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            reserved_directives: BUILT_IN_DIRECTIVES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl InterceptionConfig {
    /// Reads the deny-list from `DIRECTIVE_RESERVED_NAMES` (comma-separated), falling back to
    /// [`BUILT_IN_DIRECTIVES`].
    pub fn from_env(env: &dyn Environment) -> Self {
        let default = Self::default();
        Self {
            reserved_directives: env
                .get_list(DIRECTIVE_RESERVED_NAMES, default.reserved_directives),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum SchemaDirectiveError {
    #[error("Directive '@{0}' is defined more than once")]
    DuplicateDirective(String),

    #[error("Directive name '@{0}' is reserved")]
    ReservedName(String),
}

/// The directives known to a schema, keyed by name.
///
/// Built once with the schema and only read afterwards, so it is shared by every field
/// interceptor without locking.
#[derive(Debug)]
pub struct DirectiveSet {
    directives: IndexMap<String, Arc<DirectiveDescriptor>>,
    reserved: HashSet<String>,
}

impl DirectiveSet {
    /// Collect the built-in directives followed by `custom` (in the given order).
    pub fn new(
        custom: impl IntoIterator<Item = DirectiveDescriptor>,
        config: &InterceptionConfig,
    ) -> Result<Self, SchemaDirectiveError> {
        let reserved: HashSet<String> = config.reserved_directives.iter().cloned().collect();

        let mut directives = IndexMap::new();
        for directive in built_in_directives() {
            directives.insert(directive.name().to_string(), Arc::new(directive));
        }

        for directive in custom {
            let name = directive.name().to_string();
            if reserved.contains(&name) {
                return Err(SchemaDirectiveError::ReservedName(name));
            }
            if directives.contains_key(&name) {
                return Err(SchemaDirectiveError::DuplicateDirective(name));
            }
            directives.insert(name, Arc::new(directive));
        }

        Ok(Self {
            directives,
            reserved,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<DirectiveDescriptor>> {
        self.directives.get(name)
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DirectiveDescriptor>> {
        self.directives.values()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

fn built_in_directives() -> Vec<DirectiveDescriptor> {
    let conditional_locations = vec![
        DirectiveLocation::Field,
        DirectiveLocation::FragmentSpread,
        DirectiveLocation::InlineFragment,
    ];
    let condition = ArgumentDefinition::typed("if", named_type("Boolean", false));

    vec![
        DirectiveDescriptor::declarative(
            "skip",
            conditional_locations.clone(),
            vec![condition.clone()],
        ),
        DirectiveDescriptor::declarative("include", conditional_locations, vec![condition]),
        DirectiveDescriptor::declarative(
            "deprecated",
            vec![
                DirectiveLocation::FieldDefinition,
                DirectiveLocation::ArgumentDefinition,
                DirectiveLocation::InputFieldDefinition,
                DirectiveLocation::EnumValue,
            ],
            vec![
                ArgumentDefinition::typed("reason", named_type("String", true)).with_default(
                    ConstValue::String("No longer supported".to_string()),
                ),
            ],
        ),
    ]
}

fn named_type(name: &str, nullable: bool) -> Type {
    Type {
        base: BaseType::Named(Name::new(name)),
        nullable,
    }
}
