// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::Pos;
use thiserror::Error;

use directive_resolver::{CoercionError, DirectiveLocation, SchemaDirectiveError};

/// Failure to assemble a [`crate::Schema`].
#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error(transparent)]
    Directive(#[from] SchemaDirectiveError),

    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),

    #[error("Field '{0}' is defined more than once in type '{1}'")]
    DuplicateField(String, String),

    #[error("Field type '{0}' is not valid")]
    InvalidFieldType(String),

    #[error("Field '{1}.{2}' refers to an unknown type '{0}'")]
    UnknownType(String, String, String),

    #[error("Root type '{0}' is not defined")]
    MissingRootType(String),
}

/// Request-level failure: the operation is not executed at all.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{0}")]
    QueryParsingFailed(String, Vec<Pos>),

    #[error("No operation found")]
    NoOperationFound,

    #[error("Must provide operation name if query contains multiple operations")]
    MultipleOperationsNoOperationName,

    #[error("operationName '{0}' doesn't match any operation")]
    MultipleOperationsUnmatchedOperationName(String),

    #[error("Schema is not configured for {0} operations")]
    OperationNotSupported(String, Pos),

    #[error("Variable '{0}' not found")]
    VariableNotFound(String, Pos),

    #[error("Variable '${0}' is not defined by the operation")]
    UndeclaredVariable(String, Pos),

    #[error("Variable '{0}' of a non-null type must not be null")]
    NullVariable(String, Pos),

    #[error("Variable '{0}' could not be deserialized: {2}")]
    MalformedVariable(String, Pos, serde_json::Error),

    #[error("Fragment definition '{0}' not found")]
    FragmentDefinitionNotFound(String, Pos),

    #[error("Fragment '{0}' spreads itself")]
    FragmentCycle(String, Pos),

    #[error("Unknown type '{0}' in type condition")]
    UnknownTypeCondition(String, Pos),

    #[error("Field '{0}' is not valid for type '{1}'")]
    InvalidField(String, String, Pos),

    #[error("Field '{0}' is of a scalar type, which should not specify fields")]
    ScalarWithField(String, Pos),

    #[error("Field '{0}' of type '{1}' must have a selection of subfields")]
    MissingSubfields(String, String, Pos),

    #[error("Unknown directive '@{0}'")]
    UnknownDirective(String, Pos),

    #[error("Directive '@{0}' may not be used on {1}")]
    MisplacedDirective(String, DirectiveLocation, Pos),

    #[error(transparent)]
    Argument(#[from] CoercionError),
}

impl ExecutionError {
    pub fn positions(&self) -> Vec<Pos> {
        match self {
            ExecutionError::QueryParsingFailed(_, positions) => positions.clone(),
            ExecutionError::NoOperationFound
            | ExecutionError::MultipleOperationsNoOperationName
            | ExecutionError::MultipleOperationsUnmatchedOperationName(_) => vec![],
            ExecutionError::OperationNotSupported(_, pos)
            | ExecutionError::VariableNotFound(_, pos)
            | ExecutionError::UndeclaredVariable(_, pos)
            | ExecutionError::NullVariable(_, pos)
            | ExecutionError::MalformedVariable(_, pos, _)
            | ExecutionError::FragmentDefinitionNotFound(_, pos)
            | ExecutionError::FragmentCycle(_, pos)
            | ExecutionError::UnknownTypeCondition(_, pos)
            | ExecutionError::InvalidField(_, _, pos)
            | ExecutionError::ScalarWithField(_, pos)
            | ExecutionError::MissingSubfields(_, _, pos)
            | ExecutionError::UnknownDirective(_, pos)
            | ExecutionError::MisplacedDirective(_, _, pos) => vec![*pos],
            ExecutionError::Argument(error) => vec![error.position()],
        }
    }
}
