// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_graphql_parser::types::{BaseType, Type};
use async_graphql_value::ConstValue;
use thiserror::Error;

use crate::hook::DirectiveHook;

/// Positions in a document where a directive may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveLocation {
    // Executable locations
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
    // Type system locations
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

impl Display for DirectiveLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DirectiveLocation::Query => "QUERY",
            DirectiveLocation::Mutation => "MUTATION",
            DirectiveLocation::Subscription => "SUBSCRIPTION",
            DirectiveLocation::Field => "FIELD",
            DirectiveLocation::FragmentDefinition => "FRAGMENT_DEFINITION",
            DirectiveLocation::FragmentSpread => "FRAGMENT_SPREAD",
            DirectiveLocation::InlineFragment => "INLINE_FRAGMENT",
            DirectiveLocation::VariableDefinition => "VARIABLE_DEFINITION",
            DirectiveLocation::Schema => "SCHEMA",
            DirectiveLocation::Scalar => "SCALAR",
            DirectiveLocation::Object => "OBJECT",
            DirectiveLocation::FieldDefinition => "FIELD_DEFINITION",
            DirectiveLocation::ArgumentDefinition => "ARGUMENT_DEFINITION",
            DirectiveLocation::Interface => "INTERFACE",
            DirectiveLocation::Union => "UNION",
            DirectiveLocation::Enum => "ENUM",
            DirectiveLocation::EnumValue => "ENUM_VALUE",
            DirectiveLocation::InputObject => "INPUT_OBJECT",
            DirectiveLocation::InputFieldDefinition => "INPUT_FIELD_DEFINITION",
        };
        write!(f, "{name}")
    }
}

/// An argument accepted by a directive (or a field).
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: Type,
    pub default_value: Option<ConstValue>,
    pub description: Option<String>,
}

impl ArgumentDefinition {
    /// `ty` uses the GraphQL type syntax, for example `Boolean`, `Int!` or `[String!]`.
    pub fn new(name: impl Into<String>, ty: &str) -> Result<Self, DirectiveDefinitionError> {
        let name = name.into();
        let parsed = Type::new(ty).filter(is_valid_type);
        let ty = parsed.ok_or_else(|| DirectiveDefinitionError::InvalidArgumentType {
            argument_name: name.clone(),
            ty: ty.to_string(),
        })?;

        Ok(Self::typed(name, ty))
    }

    pub fn typed(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default_value: ConstValue) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Display for ArgumentDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)?;
        if let Some(default_value) = &self.default_value {
            write!(f, " = {default_value}")?;
        }
        Ok(())
    }
}

/// Input to [`create_directive`].
#[derive(Clone, Default)]
pub struct DirectiveConfig {
    pub name: String,
    pub description: Option<String>,
    pub locations: Vec<DirectiveLocation>,
    pub arguments: Vec<ArgumentDefinition>,
    pub resolve: Option<Arc<dyn DirectiveHook>>,
}

impl DirectiveConfig {
    pub fn new(
        name: impl Into<String>,
        locations: impl IntoIterator<Item = DirectiveLocation>,
    ) -> Self {
        Self {
            name: name.into(),
            locations: locations.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn resolve(mut self, hook: impl DirectiveHook + 'static) -> Self {
        self.resolve = Some(Arc::new(hook));
        self
    }
}

/// Schema-level definition of a directive.
///
/// Immutable once created and shared (through the schema's [`crate::DirectiveSet`]) by every
/// usage site in every query. A descriptor without a resolution hook is purely declarative and
/// never takes part in an interception chain.
pub struct DirectiveDescriptor {
    name: String,
    description: Option<String>,
    locations: Vec<DirectiveLocation>,
    arguments: Vec<ArgumentDefinition>,
    resolve: Option<Arc<dyn DirectiveHook>>,
}

impl DirectiveDescriptor {
    pub(crate) fn declarative(
        name: &str,
        locations: Vec<DirectiveLocation>,
        arguments: Vec<ArgumentDefinition>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            locations,
            arguments,
            resolve: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn locations(&self) -> &[DirectiveLocation] {
        &self.locations
    }

    pub fn arguments(&self) -> &[ArgumentDefinition] {
        &self.arguments
    }

    /// The resolution hook, if any.
    pub fn resolve(&self) -> Option<&Arc<dyn DirectiveHook>> {
        self.resolve.as_ref()
    }

    pub fn is_resolvable(&self) -> bool {
        self.resolve.is_some()
    }

    pub fn allows(&self, location: DirectiveLocation) -> bool {
        self.locations.contains(&location)
    }
}

impl Debug for DirectiveDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectiveDescriptor")
            .field("name", &self.name)
            .field("locations", &self.locations)
            .field("arguments", &self.arguments)
            .field("resolvable", &self.is_resolvable())
            .finish()
    }
}

/// Renders the SDL definition, e.g. `directive @set(value: Boolean) on FIELD | FIELD_DEFINITION`.
impl Display for DirectiveDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "directive @{}", self.name)?;
        if !self.arguments.is_empty() {
            let arguments = self
                .arguments
                .iter()
                .map(|argument| argument.to_string())
                .collect::<Vec<_>>();
            write!(f, "({})", arguments.join(", "))?;
        }
        let locations = self
            .locations
            .iter()
            .map(|location| location.to_string())
            .collect::<Vec<_>>();
        write!(f, " on {}", locations.join(" | "))
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum DirectiveDefinitionError {
    #[error("'{0}' is not a valid directive name")]
    InvalidName(String),

    #[error("Directive '@{0}' must declare at least one location")]
    NoLocations(String),

    #[error(
        "Argument '{argument_name}' of directive '@{directive_name}' is declared more than once"
    )]
    DuplicateArgument {
        directive_name: String,
        argument_name: String,
    },

    #[error("Argument '{argument_name}' has an invalid type '{ty}'")]
    InvalidArgumentType { argument_name: String, ty: String },
}

/// Create a directive descriptor.
///
/// Validations performed:
/// - The name is a valid GraphQL name (and does not start with the reserved `__` prefix)
/// - At least one location is declared
/// - Argument names are unique
pub fn create_directive(
    config: DirectiveConfig,
) -> Result<DirectiveDescriptor, DirectiveDefinitionError> {
    let DirectiveConfig {
        name,
        description,
        locations,
        arguments,
        resolve,
    } = config;

    if !is_valid_name(&name) || name.starts_with("__") {
        return Err(DirectiveDefinitionError::InvalidName(name));
    }

    if locations.is_empty() {
        return Err(DirectiveDefinitionError::NoLocations(name));
    }

    for (index, argument) in arguments.iter().enumerate() {
        if arguments[..index].iter().any(|other| other.name == argument.name) {
            return Err(DirectiveDefinitionError::DuplicateArgument {
                directive_name: name,
                argument_name: argument.name.clone(),
            });
        }
    }

    Ok(DirectiveDescriptor {
        name,
        description,
        locations,
        arguments,
        resolve,
    })
}

fn is_valid_type(ty: &Type) -> bool {
    match &ty.base {
        BaseType::Named(name) => is_valid_name(name),
        BaseType::List(element) => is_valid_type(element),
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use common::value::Val;
    use indexmap::IndexMap;
    use multiplatform_test::multiplatform_test;

    use crate::{FieldError, FieldInfo, Next, RequestContext};

    struct Passthrough;

    #[async_trait]
    impl DirectiveHook for Passthrough {
        async fn resolve(
            &self,
            next: Next<'_>,
            _source: &Val,
            _arguments: &IndexMap<String, Val>,
            _context: &RequestContext,
            _info: &FieldInfo<'_>,
        ) -> Result<Val, FieldError> {
            next.run().await
        }
    }

    #[multiplatform_test]
    fn declarative_directive() {
        let directive = create_directive(DirectiveConfig::new(
            "important",
            [DirectiveLocation::Field],
        ))
        .unwrap();

        assert_eq!(directive.name(), "important");
        assert!(!directive.is_resolvable());
        assert!(directive.resolve().is_none());
        assert!(directive.allows(DirectiveLocation::Field));
        assert!(!directive.allows(DirectiveLocation::FieldDefinition));
    }

    #[multiplatform_test]
    fn resolvable_directive_with_arguments() {
        let directive = create_directive(
            DirectiveConfig::new(
                "set",
                [DirectiveLocation::Field, DirectiveLocation::FieldDefinition],
            )
            .argument(ArgumentDefinition::new("value", "Boolean").unwrap())
            .resolve(Passthrough),
        )
        .unwrap();

        assert!(directive.is_resolvable());
        assert_eq!(directive.arguments().len(), 1);
        assert_eq!(
            directive.to_string(),
            "directive @set(value: Boolean) on FIELD | FIELD_DEFINITION"
        );
    }

    #[multiplatform_test]
    fn sdl_with_default_value() {
        let directive = create_directive(
            DirectiveConfig::new("limit", [DirectiveLocation::Field]).argument(
                ArgumentDefinition::new("count", "Int!")
                    .unwrap()
                    .with_default(ConstValue::Number(10.into())),
            ),
        )
        .unwrap();

        assert_eq!(
            directive.to_string(),
            "directive @limit(count: Int! = 10) on FIELD"
        );
    }

    #[multiplatform_test]
    fn invalid_names() {
        for name in ["", "1abc", "with-dash", "__reserved"] {
            let result = create_directive(DirectiveConfig::new(name, [DirectiveLocation::Field]));
            assert_eq!(
                result.unwrap_err(),
                DirectiveDefinitionError::InvalidName(name.to_string())
            );
        }
    }

    #[multiplatform_test]
    fn missing_locations() {
        let result = create_directive(DirectiveConfig::new("nowhere", []));
        assert_eq!(
            result.unwrap_err(),
            DirectiveDefinitionError::NoLocations("nowhere".to_string())
        );
    }

    #[multiplatform_test]
    fn duplicate_arguments() {
        let result = create_directive(
            DirectiveConfig::new("twice", [DirectiveLocation::Field])
                .argument(ArgumentDefinition::new("value", "Int").unwrap())
                .argument(ArgumentDefinition::new("value", "String").unwrap()),
        );
        assert_eq!(
            result.unwrap_err(),
            DirectiveDefinitionError::DuplicateArgument {
                directive_name: "twice".to_string(),
                argument_name: "value".to_string()
            }
        );
    }

    #[multiplatform_test]
    fn invalid_argument_type() {
        for ty in ["[Int", "Int Float", ""] {
            assert!(matches!(
                ArgumentDefinition::new("value", ty),
                Err(DirectiveDefinitionError::InvalidArgumentType { .. })
            ));
        }
    }
}
