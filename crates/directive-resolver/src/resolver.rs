// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use async_graphql_parser::{
    Positioned,
    types::{Directive, Field, Type},
};
use async_graphql_value::{ConstValue, Name};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

use common::value::Val;

use crate::{context::RequestContext, error::FieldError};

/// Variable bindings of the request being executed.
pub type Variables = HashMap<Name, ConstValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{name}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Execution metadata of one field occurrence.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo<'a> {
    /// The object type the field belongs to.
    pub parent_type: &'a str,
    pub return_type: &'a Type,
    /// Response path of this occurrence (ending with its response key).
    pub path: &'a [PathSegment],
    /// The field as it appears in the parsed query.
    pub field: &'a Positioned<Field>,
    pub variables: &'a Variables,
}

impl<'a> FieldInfo<'a> {
    pub fn field_name(&self) -> &'a str {
        self.field.node.name.node.as_str()
    }

    pub fn response_key(&self) -> &'a str {
        self.field
            .node
            .alias
            .as_ref()
            .unwrap_or(&self.field.node.name)
            .node
            .as_str()
    }

    /// Directives applied to this occurrence (not to the field definition), in declaration order.
    pub fn directives(&self) -> &'a [Positioned<Directive>] {
        &self.field.node.directives
    }
}

/// Computes the value of a field.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(
        &self,
        source: &Val,
        arguments: &IndexMap<String, Val>,
        context: &RequestContext,
        info: &FieldInfo<'_>,
    ) -> Result<Val, FieldError>;
}

/// Resolver of fields without an explicit one: reads the property named after the field from
/// the source value (`null` if absent).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFieldResolver;

#[async_trait]
impl FieldResolver for DefaultFieldResolver {
    async fn resolve(
        &self,
        source: &Val,
        _arguments: &IndexMap<String, Val>,
        _context: &RequestContext,
        info: &FieldInfo<'_>,
    ) -> Result<Val, FieldError> {
        Ok(source.get(info.field_name()).cloned().unwrap_or(Val::Null))
    }
}

/// Adapts a plain (non-async) function into a [`FieldResolver`].
pub struct SyncResolver<F>(F);

impl<F> SyncResolver<F>
where
    F: Fn(&Val, &IndexMap<String, Val>, &RequestContext, &FieldInfo<'_>) -> Result<Val, FieldError>
        + Send
        + Sync,
{
    pub fn new(resolve: F) -> Self {
        Self(resolve)
    }
}

#[async_trait]
impl<F> FieldResolver for SyncResolver<F>
where
    F: Fn(&Val, &IndexMap<String, Val>, &RequestContext, &FieldInfo<'_>) -> Result<Val, FieldError>
        + Send
        + Sync,
{
    async fn resolve(
        &self,
        source: &Val,
        arguments: &IndexMap<String, Val>,
        context: &RequestContext,
        info: &FieldInfo<'_>,
    ) -> Result<Val, FieldError> {
        (self.0)(source, arguments, context, info)
    }
}

/// A schema field whose resolver can be replaced at schema-construction time.
pub trait ResolvableField {
    fn name(&self) -> &str;

    fn resolver(&self) -> Option<&Arc<dyn FieldResolver>>;

    fn set_resolver(&mut self, resolver: Arc<dyn FieldResolver>);
}
