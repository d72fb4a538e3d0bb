// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_graphql_parser::{
    Pos, Positioned,
    types::{
        BaseType, Directive, ExecutableDocument, Field, FragmentDefinition, OperationType,
        Selection, SelectionSet, Type,
    },
};
use async_graphql_value::Name;
use async_recursion::async_recursion;
use futures::future::join_all;
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error, instrument};

use common::value::Val;
use directive_resolver::{
    ArgumentCoercer, CoercionError, DefaultFieldResolver, FieldError, FieldInfo, FieldResolver,
    PathSegment, RequestContext, ResolvableField, Variables,
};

use crate::{
    error::ExecutionError,
    request::Request,
    response::{Response, ResponseError},
    schema::{ObjectType, Schema},
    validation::{DocumentValidator, ValidatedOperation},
};

/// Field nodes grouped by response key, in selection order.
type GroupedFields<'a> = IndexMap<&'a str, Vec<&'a Positioned<Field>>>;

impl Schema {
    /// Execute a request against this schema.
    ///
    /// Request errors (unparsable query, no matching operation, invalid variables or directives)
    /// produce a response with `null` data. Failures of individual fields produce `null` for
    /// that field (or its nearest nullable ancestor) and an error entry; the rest of the data is
    /// still returned.
    #[instrument(
        name = "Schema::execute",
        skip_all,
        fields(operation_name = ?request.operation_name)
        )]
    pub async fn execute(&self, request: &Request, context: &RequestContext) -> Response {
        let document = match parse_query(&request.query) {
            Ok(document) => document,
            Err(error) => return error.into(),
        };

        let validator = DocumentValidator::new(
            self,
            request.operation_name.as_deref(),
            request.variables.as_ref(),
        );
        let operation = match validator.validate(&document) {
            Ok(operation) => operation,
            Err(error) => {
                debug!(%error, "Request validation failed");
                return error.into();
            }
        };

        let executor = Executor::new(self, &document.fragments, &operation.variables, context);
        executor.execute(&operation, &request.root_value).await
    }
}

fn parse_query(query: &str) -> Result<ExecutableDocument, ExecutionError> {
    async_graphql_parser::parse_query(query).map_err(|error| {
        error!(%error, "Failed to parse query");
        ExecutionError::QueryParsingFailed(error.to_string(), error.positions().collect())
    })
}

/// Execution state of one operation.
struct Executor<'a> {
    schema: &'a Schema,
    fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &'a Variables,
    context: &'a RequestContext,
    errors: Mutex<Vec<ResponseError>>,
}

impl<'a> Executor<'a> {
    fn new(
        schema: &'a Schema,
        fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
        variables: &'a Variables,
        context: &'a RequestContext,
    ) -> Self {
        Self {
            schema,
            fragment_definitions,
            variables,
            context,
            errors: Mutex::new(vec![]),
        }
    }

    #[instrument(
        name = "Executor::execute",
        skip_all,
        fields(operation_name = operation.name.as_deref(), operation_type = ?operation.ty)
    )]
    async fn execute(self, operation: &ValidatedOperation<'a>, root_value: &Val) -> Response {
        let root_type = operation.root_type;

        let root_selection_set = &operation.definition.node.selection_set;

        let fields = match self.collect_fields(root_type, [root_selection_set]) {
            Ok(fields) => fields,
            Err(error) => return ExecutionError::from(error).into(),
        };

        let data = match operation.ty {
            // Top-level mutation fields run one after the other
            OperationType::Mutation => {
                self.execute_fields_serially(root_type, root_value, &fields)
                    .await
            }
            _ => self.execute_fields(root_type, root_value, &fields, &[]).await,
        };

        let errors = self
            .errors
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        Response::new(data.map(JsonValue::Object).unwrap_or(JsonValue::Null), errors)
    }

    /// Resolve sibling fields concurrently.
    ///
    /// `None` if a non-null field failed, which makes the object itself null.
    async fn execute_fields(
        &self,
        object_type: &ObjectType,
        source: &Val,
        fields: &GroupedFields<'a>,
        path: &[PathSegment],
    ) -> Option<Map<String, JsonValue>> {
        let values = join_all(fields.iter().map(|(response_key, field_nodes)| {
            self.execute_field(object_type, source, response_key, field_nodes, path)
        }))
        .await;

        fields
            .keys()
            .zip(values)
            .map(|(response_key, value)| value.map(|value| (response_key.to_string(), value)))
            .collect()
    }

    async fn execute_fields_serially(
        &self,
        object_type: &ObjectType,
        source: &Val,
        fields: &GroupedFields<'a>,
    ) -> Option<Map<String, JsonValue>> {
        let mut values = Map::new();
        for (response_key, field_nodes) in fields {
            let value = self
                .execute_field(object_type, source, response_key, field_nodes, &[])
                .await?;
            values.insert(response_key.to_string(), value);
        }
        Some(values)
    }

    async fn execute_field(
        &self,
        object_type: &ObjectType,
        source: &Val,
        response_key: &str,
        field_nodes: &[&'a Positioned<Field>],
        path: &[PathSegment],
    ) -> Option<JsonValue> {
        let field = *field_nodes.first()?;
        let field_name = field.node.name.node.as_str();

        let mut path = path.to_vec();
        path.push(PathSegment::Field(response_key.to_string()));

        if field_name == "__typename" {
            return Some(JsonValue::String(object_type.name().to_string()));
        }

        let Some(field_definition) = object_type.get_field(field_name) else {
            self.report(ResponseError::field(
                format!(
                    "Field '{field_name}' is not valid for type '{}'",
                    object_type.name()
                ),
                field.pos,
                path,
            ));
            return Some(JsonValue::Null);
        };

        let info = FieldInfo {
            parent_type: object_type.name(),
            return_type: field_definition.ty(),
            path: &path,
            field,
            variables: self.variables,
        };

        let arguments = ArgumentCoercer::new(field_name, self.variables, field.pos)
            .coerce(field_definition.arguments(), &field.node.arguments);

        let resolved = match arguments {
            Ok(arguments) => match ResolvableField::resolver(field_definition) {
                Some(resolver) => {
                    resolver
                        .resolve(source, &arguments, self.context, &info)
                        .await
                }
                None => {
                    DefaultFieldResolver
                        .resolve(source, &arguments, self.context, &info)
                        .await
                }
            },
            Err(error) => Err(FieldError::from(error)),
        };

        match resolved {
            Ok(value) => {
                self.complete_value(
                    field_definition.ty(),
                    value,
                    object_type.name(),
                    field_nodes,
                    &path,
                )
                .await
            }
            Err(error) => {
                debug!(%error, field = field_name, "Field resolution failed");
                self.report(ResponseError::field(error.to_string(), field.pos, path));
                null_unless_non_null(field_definition.ty())
            }
        }
    }

    /// Turn a resolved value into its response form according to the field type.
    ///
    /// A null (or failed) value in a non-null position yields `None`, which the caller propagates
    /// to the nearest nullable ancestor.
    #[async_recursion]
    async fn complete_value(
        &self,
        ty: &Type,
        value: Val,
        parent_type: &str,
        field_nodes: &[&'a Positioned<Field>],
        path: &[PathSegment],
    ) -> Option<JsonValue> {
        let completed = if value.is_null() {
            Some(JsonValue::Null)
        } else {
            match &ty.base {
                BaseType::List(element_type) => {
                    self.complete_list(element_type, value, parent_type, field_nodes, path)
                        .await
                }
                BaseType::Named(type_name) => match self.schema.get_type(type_name) {
                    Some(object_type) => {
                        self.complete_object(object_type, value, field_nodes, path)
                            .await
                    }
                    None => self.complete_scalar(type_name, value, field_nodes, path),
                },
            }
        };

        match completed {
            Some(JsonValue::Null) if !ty.nullable => {
                let field_name = field_nodes
                    .first()
                    .map(|field| field.node.name.node.as_str())
                    .unwrap_or_default();
                self.report_at(
                    format!(
                        "Cannot return null for non-nullable field '{parent_type}.{field_name}'"
                    ),
                    field_nodes,
                    path,
                );
                None
            }
            None if ty.nullable => Some(JsonValue::Null),
            completed => completed,
        }
    }

    async fn complete_list(
        &self,
        element_type: &Type,
        value: Val,
        parent_type: &str,
        field_nodes: &[&'a Positioned<Field>],
        path: &[PathSegment],
    ) -> Option<JsonValue> {
        let Val::List(elements) = value else {
            self.report_at(
                format!("Expected a list value, got '{value}'"),
                field_nodes,
                path,
            );
            return None;
        };

        let completed = join_all(elements.into_iter().enumerate().map(|(index, element)| {
            let mut element_path = path.to_vec();
            element_path.push(PathSegment::Index(index));

            async move {
                self.complete_value(element_type, element, parent_type, field_nodes, &element_path)
                    .await
            }
        }))
        .await;

        completed
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(JsonValue::Array)
    }

    async fn complete_object(
        &self,
        object_type: &ObjectType,
        value: Val,
        field_nodes: &[&'a Positioned<Field>],
        path: &[PathSegment],
    ) -> Option<JsonValue> {
        let selection_sets = field_nodes
            .iter()
            .copied()
            .map(|field| &field.node.selection_set);

        match self.collect_fields(object_type, selection_sets) {
            Ok(fields) => self
                .execute_fields(object_type, &value, &fields, path)
                .await
                .map(JsonValue::Object),
            Err(error) => {
                self.report_at(error.to_string(), field_nodes, path);
                None
            }
        }
    }

    fn complete_scalar(
        &self,
        type_name: &str,
        value: Val,
        field_nodes: &[&'a Positioned<Field>],
        path: &[PathSegment],
    ) -> Option<JsonValue> {
        match serialize_scalar(type_name, value) {
            Ok(value) => Some(value),
            Err(message) => {
                self.report_at(message, field_nodes, path);
                None
            }
        }
    }

    /// Merge the selection sets into fields grouped by response key, flattening fragments and
    /// leaving out selections excluded by `@skip` or `@include`.
    fn collect_fields(
        &self,
        object_type: &ObjectType,
        selection_sets: impl IntoIterator<Item = &'a Positioned<SelectionSet>>,
    ) -> Result<GroupedFields<'a>, CoercionError> {
        let mut fields = IndexMap::new();
        let mut visited_fragments = HashSet::new();

        for selection_set in selection_sets {
            self.collect_selection_set(
                object_type,
                selection_set,
                &mut fields,
                &mut visited_fragments,
            )?;
        }

        Ok(fields)
    }

    fn collect_selection_set(
        &self,
        object_type: &ObjectType,
        selection_set: &'a Positioned<SelectionSet>,
        fields: &mut GroupedFields<'a>,
        visited_fragments: &mut HashSet<&'a str>,
    ) -> Result<(), CoercionError> {
        for selection in &selection_set.node.items {
            match &selection.node {
                Selection::Field(field) => {
                    if self.should_include(&field.node.directives)? {
                        let response_key = field.node.response_key().node.as_str();
                        fields.entry(response_key).or_default().push(field);
                    }
                }
                Selection::FragmentSpread(fragment_spread) => {
                    let fragment_name = fragment_spread.node.fragment_name.node.as_str();

                    if !self.should_include(&fragment_spread.node.directives)?
                        || !visited_fragments.insert(fragment_name)
                    {
                        continue;
                    }

                    let Some(fragment_definition) = self
                        .fragment_definitions
                        .get(&fragment_spread.node.fragment_name.node)
                    else {
                        continue;
                    };

                    let type_condition = &fragment_definition.node.type_condition.node.on.node;
                    if type_condition.as_str() == object_type.name() {
                        self.collect_selection_set(
                            object_type,
                            &fragment_definition.node.selection_set,
                            fields,
                            visited_fragments,
                        )?;
                    }
                }
                Selection::InlineFragment(inline_fragment) => {
                    let applies = inline_fragment
                        .node
                        .type_condition
                        .as_ref()
                        .is_none_or(|condition| {
                            condition.node.on.node.as_str() == object_type.name()
                        });

                    if applies && self.should_include(&inline_fragment.node.directives)? {
                        self.collect_selection_set(
                            object_type,
                            &inline_fragment.node.selection_set,
                            fields,
                            visited_fragments,
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Evaluate `@skip(if:)` and `@include(if:)`.
    fn should_include(&self, directives: &[Positioned<Directive>]) -> Result<bool, CoercionError> {
        for directive in directives {
            let name = directive.node.name.node.as_str();

            // Included when `@skip`'s condition is false or `@include`'s condition is true
            let included_when = match name {
                "skip" => false,
                "include" => true,
                _ => continue,
            };

            let Some(descriptor) = self.schema.directives().get(name) else {
                continue;
            };

            let arguments = ArgumentCoercer::new(name, self.variables, directive.pos)
                .coerce(descriptor.arguments(), &directive.node.arguments)?;
            let condition = arguments.get("if").and_then(Val::as_bool).unwrap_or(false);

            if condition != included_when {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn report_at(
        &self,
        message: impl Into<String>,
        field_nodes: &[&'a Positioned<Field>],
        path: &[PathSegment],
    ) {
        let pos = field_nodes
            .first()
            .map(|field| field.pos)
            .unwrap_or_else(Pos::default);
        self.report(ResponseError::field(message, pos, path.to_vec()));
    }

    fn report(&self, error: ResponseError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }
}

fn null_unless_non_null(ty: &Type) -> Option<JsonValue> {
    ty.nullable.then_some(JsonValue::Null)
}

fn serialize_scalar(type_name: &str, value: Val) -> Result<JsonValue, String> {
    let serialized = match (type_name, &value) {
        ("Int", Val::Number(number)) => number
            .as_i64()
            .filter(|n| i32::try_from(*n).is_ok())
            .map(JsonValue::from),
        ("Float", Val::Number(number)) => serde_json::Number::try_from(number.clone())
            .ok()
            .map(JsonValue::Number),
        ("String", Val::String(s) | Val::Enum(s)) => Some(JsonValue::String(s.clone())),
        ("String", Val::Bool(_) | Val::Number(_)) => Some(JsonValue::String(value.to_string())),
        ("Boolean", Val::Bool(b)) => Some(JsonValue::Bool(*b)),
        ("ID", Val::String(s)) => Some(JsonValue::String(s.clone())),
        ("ID", Val::Number(number)) if number.is_integer() => {
            Some(JsonValue::String(number.to_string()))
        }
        _ => None,
    };

    serialized.ok_or_else(|| format!("{type_name} cannot represent value: {value}"))
}
