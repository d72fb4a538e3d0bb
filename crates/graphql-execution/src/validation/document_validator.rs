// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashSet;

use async_graphql_parser::{
    Positioned,
    types::{
        DocumentOperations, ExecutableDocument, OperationDefinition, OperationType,
        VariableDefinition,
    },
};
use async_graphql_value::{ConstValue, Name};
use serde_json::{Map, Value};
use tracing::instrument;

use directive_resolver::{DirectiveLocation, Variables};

use crate::{error::ExecutionError, schema::ObjectType, schema::Schema};

use super::selection_set_validator::SelectionSetValidator;

/// The operation selected for execution, with its variables bound.
pub(crate) struct ValidatedOperation<'a> {
    pub name: Option<String>,
    pub ty: OperationType,
    pub root_type: &'a ObjectType,
    pub definition: &'a Positioned<OperationDefinition>,
    pub variables: Variables,
}

/// Context for validating a document.
pub(crate) struct DocumentValidator<'a> {
    schema: &'a Schema,
    operation_name: Option<&'a str>,
    variables: Option<&'a Map<String, Value>>,
}

impl<'a> DocumentValidator<'a> {
    pub fn new(
        schema: &'a Schema,
        operation_name: Option<&'a str>,
        variables: Option<&'a Map<String, Value>>,
    ) -> Self {
        Self {
            schema,
            operation_name,
            variables,
        }
    }

    /// Validate the query payload.
    ///
    /// Validations performed:
    /// - Either there is only one operation or the operation name specified matches one of the
    ///   operations in the document
    /// - There is at least one operation
    /// - The schema has a root type for the kind of operation
    /// - Every declared variable is bound (see [`Self::validate_variables`])
    /// - Every directive usage is valid (see [`SelectionSetValidator`])
    #[instrument(
        name = "DocumentValidator::validate",
        skip(self, document)
        )]
    pub fn validate(
        &self,
        document: &'a ExecutableDocument,
    ) -> Result<ValidatedOperation<'a>, ExecutionError> {
        let (operation_name, operation) = match &document.operations {
            DocumentOperations::Single(operation) => {
                Ok((self.operation_name.map(str::to_string), operation))
            }
            DocumentOperations::Multiple(operations) => {
                match self.operation_name {
                    None if operations.len() == 1 => {
                        // A named operation is parsed to `Multiple` even when it is the only one
                        operations
                            .iter()
                            .next()
                            .map(|(name, operation)| (Some(name.to_string()), operation))
                            .ok_or(ExecutionError::NoOperationFound)
                    }
                    None if operations.is_empty() => Err(ExecutionError::NoOperationFound),
                    None => Err(ExecutionError::MultipleOperationsNoOperationName),
                    Some(operation_name) => operations
                        .get(&Name::new(operation_name))
                        .map(|operation| (Some(operation_name.to_string()), operation))
                        .ok_or_else(|| {
                            ExecutionError::MultipleOperationsUnmatchedOperationName(
                                operation_name.to_string(),
                            )
                        }),
                }
            }
        }?;

        let (root_type, location) = match operation.node.ty {
            OperationType::Query => (self.schema.query_type(), DirectiveLocation::Query),
            OperationType::Mutation => (self.schema.mutation_type(), DirectiveLocation::Mutation),
            OperationType::Subscription => (None, DirectiveLocation::Subscription),
        };

        let root_type = root_type.ok_or_else(|| {
            ExecutionError::OperationNotSupported(
                operation_kind(operation.node.ty).to_string(),
                operation.pos,
            )
        })?;

        let variables = self.validate_variables(&operation.node.variable_definitions)?;
        let declared_variables = operation
            .node
            .variable_definitions
            .iter()
            .map(|variable_definition| variable_definition.node.name.node.as_str())
            .collect::<HashSet<_>>();

        let selection_set_validator = SelectionSetValidator::new(
            self.schema,
            &variables,
            &declared_variables,
            &document.fragments,
        );

        selection_set_validator.validate_directives(&operation.node.directives, location)?;
        for variable_definition in &operation.node.variable_definitions {
            selection_set_validator.validate_directives(
                &variable_definition.node.directives,
                DirectiveLocation::VariableDefinition,
            )?;
        }
        for fragment in document.fragments.values() {
            selection_set_validator.validate_directives(
                &fragment.node.directives,
                DirectiveLocation::FragmentDefinition,
            )?;
        }

        selection_set_validator.validate(root_type, &operation.node.selection_set)?;

        Ok(ValidatedOperation {
            name: operation_name,
            ty: operation.node.ty,
            root_type,
            definition: operation,
            variables,
        })
    }

    /// Validate variables.
    ///
    /// Validations performed:
    /// - Supplied values deserialize into GraphQL values
    /// - A variable of a non-null type is supplied (or has a default) and is not null
    ///
    /// Variables of a nullable type with neither a value nor a default stay unbound, so that
    /// arguments referring to them fall back to their own defaults.
    fn validate_variables(
        &self,
        variable_definitions: &[Positioned<VariableDefinition>],
    ) -> Result<Variables, ExecutionError> {
        variable_definitions
            .iter()
            .filter_map(|variable_definition| {
                let variable_name = &variable_definition.node.name;
                self.var_value(variable_definition)
                    .transpose()
                    .map(|value| value.map(|value| (variable_name.node.clone(), value)))
            })
            .collect()
    }

    fn var_value(
        &self,
        variable_definition: &Positioned<VariableDefinition>,
    ) -> Result<Option<ConstValue>, ExecutionError> {
        let name = &variable_definition.node.name;
        let nullable = variable_definition.node.var_type.node.nullable;

        let supplied = self
            .variables
            .and_then(|variables| variables.get(name.node.as_str()));

        let value = match supplied {
            Some(supplied) => ConstValue::from_json(supplied.to_owned()).map_err(|e| {
                ExecutionError::MalformedVariable(name.node.to_string(), name.pos, e)
            })?,
            None => match &variable_definition.node.default_value {
                Some(default_value) => default_value.node.clone(),
                None if nullable => return Ok(None),
                None => {
                    return Err(ExecutionError::VariableNotFound(
                        name.node.to_string(),
                        name.pos,
                    ));
                }
            },
        };

        if value == ConstValue::Null && !nullable {
            Err(ExecutionError::NullVariable(
                name.node.to_string(),
                name.pos,
            ))
        } else {
            Ok(Some(value))
        }
    }
}

fn operation_kind(ty: OperationType) -> &'static str {
    match ty {
        OperationType::Query => "query",
        OperationType::Mutation => "mutation",
        OperationType::Subscription => "subscription",
    }
}
