// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::{
    Pos, Positioned,
    types::{BaseType, Type},
};
use async_graphql_value::{ConstValue, Name, Value};
use indexmap::IndexMap;
use thiserror::Error;

use common::value::Val;

use crate::{directive::ArgumentDefinition, resolver::Variables};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("Variable '{0}' not found")]
    VariableNotFound(String, Pos),

    #[error("Required argument '{0}' not found")]
    RequiredArgumentNotFound(String, Pos),

    #[error("Argument(s) '{0:?}' invalid for '{1}'")]
    StrayArguments(Vec<String>, String, Pos),

    #[error(
        "Argument '{argument_name}' is not of a valid type. Expected '{expected_type}', got '{actual_type}'"
    )]
    InvalidArgumentType {
        argument_name: String,
        expected_type: String,
        actual_type: String,
        pos: Pos,
    },
}

impl CoercionError {
    pub fn position(&self) -> Pos {
        match self {
            CoercionError::VariableNotFound(_, pos) => *pos,
            CoercionError::RequiredArgumentNotFound(_, pos) => *pos,
            CoercionError::StrayArguments(_, _, pos) => *pos,
            CoercionError::InvalidArgumentType { pos, .. } => *pos,
        }
    }
}

/// Coerces the raw arguments of a usage site (a directive or a field in a query) against their
/// definitions and the request's variable bindings.
pub struct ArgumentCoercer<'a> {
    /// Name of the directive or field the arguments belong to (for error messages).
    owner: &'a str,
    variables: &'a Variables,
    pos: Pos,
}

impl<'a> ArgumentCoercer<'a> {
    #[must_use]
    pub fn new(owner: &'a str, variables: &'a Variables, pos: Pos) -> Self {
        Self {
            owner,
            variables,
            pos,
        }
    }

    /// Coercions performed:
    /// - Variables are substituted (anywhere in the value, including inside lists and objects)
    /// - Default values are supplied for missing arguments
    /// - Required arguments must be provided and must not be null
    /// - Built-in scalars must match the expected type
    /// - A single value is promoted to a list where a list is expected
    /// - Arguments that are not defined are rejected
    pub fn coerce(
        &self,
        definitions: &[ArgumentDefinition],
        arguments: &[(Positioned<Name>, Positioned<Value>)],
    ) -> Result<IndexMap<String, Val>, CoercionError> {
        // Stray arguments tracking: 1. Maintain a map of all the arguments supplied
        let mut supplied: IndexMap<&Name, &Positioned<Value>> = arguments
            .iter()
            .map(|(name, value)| (&name.node, value))
            .collect();

        let coerced = definitions
            .iter()
            .filter_map(|definition| {
                // Stray arguments tracking: 2. Remove the argument being processed
                let value = supplied.shift_remove(&Name::new(&definition.name));

                self.coerce_argument(definition, value)
                    .map(|value| value.map(|value| (definition.name.clone(), value)))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;

        // Stray arguments tracking: 3. Anything left over was not defined
        if !supplied.is_empty() {
            let stray_arguments = supplied.keys().map(|name| name.to_string()).collect();

            Err(CoercionError::StrayArguments(
                stray_arguments,
                self.owner.to_string(),
                self.pos,
            ))
        } else {
            Ok(coerced)
        }
    }

    /// Coerce a single argument. `None` means the argument is omitted from the result (not
    /// supplied, no default, and nullable). An argument given as a variable without a binding
    /// counts as not supplied.
    fn coerce_argument(
        &self,
        definition: &ArgumentDefinition,
        value: Option<&Positioned<Value>>,
    ) -> Option<Result<Val, CoercionError>> {
        // A variable without a value leaves the argument unsupplied
        let value = value.filter(|value| match &value.node {
            Value::Variable(name) => self.variables.contains_key(name),
            _ => true,
        });

        match value {
            Some(value) => {
                let pos = value.pos;
                let value = value.node.clone().into_const_with(|name| {
                    self.variables
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| CoercionError::VariableNotFound(name.to_string(), pos))
                });

                Some(value.and_then(|value| {
                    self.coerce_value(&definition.name, &definition.ty, value, pos)
                }))
            }
            None => match &definition.default_value {
                Some(default_value) => Some(self.coerce_value(
                    &definition.name,
                    &definition.ty,
                    default_value.clone(),
                    self.pos,
                )),
                None if definition.ty.nullable => None,
                None => Some(Err(CoercionError::RequiredArgumentNotFound(
                    definition.name.clone(),
                    self.pos,
                ))),
            },
        }
    }

    fn coerce_value(
        &self,
        argument_name: &str,
        ty: &Type,
        value: ConstValue,
        pos: Pos,
    ) -> Result<Val, CoercionError> {
        if value == ConstValue::Null {
            return if ty.nullable {
                Ok(Val::Null)
            } else {
                Err(invalid_argument_type(argument_name, ty, &value, pos))
            };
        }

        match &ty.base {
            BaseType::List(element_type) => match value {
                ConstValue::List(elements) => elements
                    .into_iter()
                    .map(|element| self.coerce_value(argument_name, element_type, element, pos))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Val::List),
                // A single value is accepted where a list is expected
                other => Ok(Val::List(vec![self.coerce_value(
                    argument_name,
                    element_type,
                    other,
                    pos,
                )?])),
            },
            BaseType::Named(type_name) => coerce_named(argument_name, ty, type_name, value, pos),
        }
    }
}

/// Scalars every schema provides.
pub const BUILT_IN_SCALARS: [&str; 5] = ["Boolean", "Int", "Float", "String", "ID"];

fn coerce_named(
    argument_name: &str,
    ty: &Type,
    type_name: &Name,
    value: ConstValue,
    pos: Pos,
) -> Result<Val, CoercionError> {
    if !BUILT_IN_SCALARS.contains(&type_name.as_str()) {
        // Enums, input objects and custom scalars are passed through as is
        return Ok(value.into());
    }

    let coerced = match (type_name.as_str(), &value) {
        ("Boolean", ConstValue::Boolean(b)) => Some(Val::Bool(*b)),
        ("Int", ConstValue::Number(n)) => n
            .as_i64()
            .filter(|n| i32::try_from(*n).is_ok())
            .map(Val::from),
        ("Float", ConstValue::Number(n)) => n.as_f64().map(Val::from),
        ("String", ConstValue::String(s)) | ("ID", ConstValue::String(s)) => {
            Some(Val::String(s.clone()))
        }
        ("ID", ConstValue::Number(n)) => n.as_i64().map(|n| Val::String(n.to_string())),
        _ => None,
    };

    coerced.ok_or_else(|| invalid_argument_type(argument_name, ty, &value, pos))
}

fn invalid_argument_type(
    argument_name: &str,
    ty: &Type,
    value: &ConstValue,
    pos: Pos,
) -> CoercionError {
    CoercionError::InvalidArgumentType {
        argument_name: argument_name.to_string(),
        expected_type: ty.to_string(),
        actual_type: value_kind(value).to_string(),
        pos,
    }
}

fn value_kind(value: &ConstValue) -> &'static str {
    match value {
        ConstValue::Null => "null",
        ConstValue::Number(n) if n.is_f64() => "Float",
        ConstValue::Number(_) => "Int",
        ConstValue::String(_) => "String",
        ConstValue::Boolean(_) => "Boolean",
        ConstValue::Binary(_) => "Binary",
        ConstValue::Enum(_) => "Enum",
        ConstValue::List(_) => "List",
        ConstValue::Object(_) => "Object",
    }
}
