// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    Pos, Positioned,
    types::{Directive, Field, FragmentDefinition, Selection, SelectionSet},
};
use async_graphql_value::{Name, Value};

use directive_resolver::{ArgumentCoercer, DirectiveLocation, Variables};

use crate::{
    error::ExecutionError,
    schema::{ObjectType, Schema, underlying_type_name},
};

/// Context for validating a selection set.
pub(super) struct SelectionSetValidator<'a> {
    schema: &'a Schema,
    variables: &'a Variables,
    declared_variables: &'a HashSet<&'a str>,
    fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
}

impl<'a> SelectionSetValidator<'a> {
    #[must_use]
    pub fn new(
        schema: &'a Schema,
        variables: &'a Variables,
        declared_variables: &'a HashSet<&'a str>,
        fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    ) -> Self {
        Self {
            schema,
            variables,
            declared_variables,
            fragment_definitions,
        }
    }

    /// Validate selection set.
    ///
    /// Validations performed:
    /// - Each field is defined in the `container_type`
    /// - Fields of an object type select subfields, fields of a scalar type do not
    /// - Variables used in field arguments are defined by the operation
    /// - Each fragment referred is defined, applies to a known type and does not spread itself
    /// - Directives used are valid (see [`Self::validate_directives`])
    pub fn validate(
        &self,
        container_type: &ObjectType,
        selection_set: &'a Positioned<SelectionSet>,
    ) -> Result<(), ExecutionError> {
        self.validate_selection_set(container_type, selection_set, &mut vec![])
    }

    fn validate_selection_set(
        &self,
        container_type: &ObjectType,
        selection_set: &'a Positioned<SelectionSet>,
        fragment_path: &mut Vec<&'a str>,
    ) -> Result<(), ExecutionError> {
        selection_set
            .node
            .items
            .iter()
            .try_for_each(|selection| {
                self.validate_selection(container_type, selection, fragment_path)
            })
    }

    fn validate_selection(
        &self,
        container_type: &ObjectType,
        selection: &'a Positioned<Selection>,
        fragment_path: &mut Vec<&'a str>,
    ) -> Result<(), ExecutionError> {
        match &selection.node {
            Selection::Field(field) => {
                self.validate_directives(&field.node.directives, DirectiveLocation::Field)?;
                self.validate_field(container_type, field, fragment_path)
            }
            Selection::FragmentSpread(fragment_spread) => {
                self.validate_directives(
                    &fragment_spread.node.directives,
                    DirectiveLocation::FragmentSpread,
                )?;

                let fragment_name = &fragment_spread.node.fragment_name.node;
                let fragment_definition = self
                    .fragment_definitions
                    .get(fragment_name)
                    .ok_or_else(|| {
                        ExecutionError::FragmentDefinitionNotFound(
                            fragment_name.to_string(),
                            fragment_spread.pos,
                        )
                    })?;

                if fragment_path.contains(&fragment_name.as_str()) {
                    return Err(ExecutionError::FragmentCycle(
                        fragment_name.to_string(),
                        fragment_spread.pos,
                    ));
                }

                let type_condition = &fragment_definition.node.type_condition;
                let fragment_type = self.type_condition(&type_condition.node.on)?;

                fragment_path.push(fragment_name.as_str());
                self.validate_selection_set(
                    fragment_type,
                    &fragment_definition.node.selection_set,
                    fragment_path,
                )?;
                fragment_path.pop();
                Ok(())
            }
            Selection::InlineFragment(inline_fragment) => {
                self.validate_directives(
                    &inline_fragment.node.directives,
                    DirectiveLocation::InlineFragment,
                )?;

                let fragment_type = match &inline_fragment.node.type_condition {
                    Some(type_condition) => self.type_condition(&type_condition.node.on)?,
                    None => container_type,
                };

                self.validate_selection_set(
                    fragment_type,
                    &inline_fragment.node.selection_set,
                    fragment_path,
                )
            }
        }
    }

    fn validate_field(
        &self,
        container_type: &ObjectType,
        field: &'a Positioned<Field>,
        fragment_path: &mut Vec<&'a str>,
    ) -> Result<(), ExecutionError> {
        let field_name = field.node.name.node.as_str();
        let has_subfields = !field.node.selection_set.node.items.is_empty();

        // Always available, on every object type
        if field_name == "__typename" {
            return if has_subfields {
                Err(ExecutionError::ScalarWithField(
                    field_name.to_string(),
                    field.pos,
                ))
            } else {
                Ok(())
            };
        }

        self.validate_argument_variables(&field.node.arguments)?;

        let field_definition = container_type.get_field(field_name).ok_or_else(|| {
            ExecutionError::InvalidField(
                field_name.to_string(),
                container_type.name().to_string(),
                field.pos,
            )
        })?;

        let type_name = underlying_type_name(field_definition.ty());

        match self.schema.get_type(type_name) {
            Some(field_type) if has_subfields => {
                self.validate_selection_set(field_type, &field.node.selection_set, fragment_path)
            }
            Some(_) => Err(ExecutionError::MissingSubfields(
                field_name.to_string(),
                type_name.to_string(),
                field.pos,
            )),
            None if has_subfields => Err(ExecutionError::ScalarWithField(
                field_name.to_string(),
                field.pos,
            )),
            None => Ok(()),
        }
    }

    fn type_condition(
        &self,
        type_name: &Positioned<Name>,
    ) -> Result<&'a ObjectType, ExecutionError> {
        self.schema.get_type(type_name.node.as_str()).ok_or_else(|| {
            ExecutionError::UnknownTypeCondition(type_name.node.to_string(), type_name.pos)
        })
    }

    /// Validate the directives used at a location.
    ///
    /// Validations performed:
    /// - The directive is known to the schema
    /// - The directive may be used at this location
    /// - The arguments are valid, using only variables the operation defines (directives with a
    ///   resolution hook have their arguments coerced again every time they are resolved)
    pub fn validate_directives(
        &self,
        directives: &[Positioned<Directive>],
        location: DirectiveLocation,
    ) -> Result<(), ExecutionError> {
        directives
            .iter()
            .try_for_each(|directive| self.validate_directive(directive, location))
    }

    fn validate_directive(
        &self,
        directive: &Positioned<Directive>,
        location: DirectiveLocation,
    ) -> Result<(), ExecutionError> {
        let name = directive.node.name.node.as_str();
        let pos: Pos = directive.pos;

        let descriptor = self
            .schema
            .directives()
            .get(name)
            .ok_or_else(|| ExecutionError::UnknownDirective(name.to_string(), pos))?;

        if !descriptor.allows(location) {
            return Err(ExecutionError::MisplacedDirective(
                name.to_string(),
                location,
                pos,
            ));
        }

        self.validate_argument_variables(&directive.node.arguments)?;
        ArgumentCoercer::new(name, self.variables, pos)
            .coerce(descriptor.arguments(), &directive.node.arguments)?;

        Ok(())
    }

    fn validate_argument_variables(
        &self,
        arguments: &[(Positioned<Name>, Positioned<Value>)],
    ) -> Result<(), ExecutionError> {
        arguments.iter().try_for_each(|(_, value)| {
            match self.undeclared_variable(&value.node) {
                Some(name) => Err(ExecutionError::UndeclaredVariable(
                    name.to_string(),
                    value.pos,
                )),
                None => Ok(()),
            }
        })
    }

    fn undeclared_variable<'v>(&self, value: &'v Value) -> Option<&'v Name> {
        match value {
            Value::Variable(name) if !self.declared_variables.contains(name.as_str()) => Some(name),
            Value::List(values) => values
                .iter()
                .find_map(|value| self.undeclared_variable(value)),
            Value::Object(fields) => fields
                .values()
                .find_map(|value| self.undeclared_variable(value)),
            _ => None,
        }
    }
}
