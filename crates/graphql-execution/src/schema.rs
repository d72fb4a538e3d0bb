// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_graphql_parser::types::{BaseType, Type};
use indexmap::IndexMap;
use tracing::debug;

use common::env::SystemEnvironment;

use directive_resolver::{
    ArgumentDefinition, BUILT_IN_DIRECTIVES, BUILT_IN_SCALARS, DirectiveDescriptor, DirectiveSet,
    FieldResolver, InterceptionConfig, ResolvableField, install_interceptor,
};

use crate::error::SchemaError;

pub const QUERY_ROOT_TYPENAME: &str = "Query";

pub struct FieldDefinition {
    name: String,
    ty: Type,
    description: Option<String>,
    arguments: Vec<ArgumentDefinition>,
    resolver: Option<Arc<dyn FieldResolver>>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: &str) -> Result<Self, SchemaError> {
        let parsed = Type::new(ty).ok_or_else(|| SchemaError::InvalidFieldType(ty.to_string()))?;

        Ok(Self {
            name: name.into(),
            ty: parsed,
            description: None,
            arguments: vec![],
            resolver: None,
        })
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Without a resolver, the field reads the property of the same name from its parent value.
    pub fn resolver(mut self, resolver: impl FieldResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn arguments(&self) -> &[ArgumentDefinition] {
        &self.arguments
    }
}

impl ResolvableField for FieldDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolver(&self) -> Option<&Arc<dyn FieldResolver>> {
        self.resolver.as_ref()
    }

    fn set_resolver(&mut self, resolver: Arc<dyn FieldResolver>) {
        self.resolver = Some(resolver);
    }
}

impl Debug for FieldDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Display for FieldDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            let arguments = self
                .arguments
                .iter()
                .map(|argument| argument.to_string())
                .collect::<Vec<_>>();
            write!(f, "({})", arguments.join(", "))?;
        }
        write!(f, ": {}", self.ty)
    }
}

#[derive(Debug)]
pub struct ObjectType {
    name: String,
    description: Option<String>,
    fields: Vec<FieldDefinition>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: vec![],
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(description) = &self.description {
            writeln!(f, "\"\"\"{description}\"\"\"")?;
        }
        writeln!(f, "type {} {{", self.name)?;
        for field in &self.fields {
            if let Some(description) = &field.description {
                writeln!(f, "  \"\"\"{description}\"\"\"")?;
            }
            writeln!(f, "  {field}")?;
        }
        write!(f, "}}")
    }
}

/// An executable schema: object types, root operation types and the directives it supports.
pub struct Schema {
    types: IndexMap<String, ObjectType>,
    query_type: String,
    mutation_type: Option<String>,
    directives: Arc<DirectiveSet>,
}

impl Schema {
    /// A builder whose interception config is read from the process environment.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn directives(&self) -> &Arc<DirectiveSet> {
        &self.directives
    }

    pub fn get_type(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    pub fn query_type(&self) -> Option<&ObjectType> {
        self.types.get(&self.query_type)
    }

    pub fn mutation_type(&self) -> Option<&ObjectType> {
        self.mutation_type
            .as_ref()
            .and_then(|name| self.types.get(name))
    }

    pub fn types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }

    /// Call `visitor` with every field of every object type, along with the name of its type.
    pub fn visit_fields_mut(&mut self, mut visitor: impl FnMut(&str, &mut FieldDefinition)) {
        for object_type in self.types.values_mut() {
            for field in object_type.fields.iter_mut() {
                visitor(&object_type.name, field);
            }
        }
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("types", &self.types)
            .field("query_type", &self.query_type)
            .field("mutation_type", &self.mutation_type)
            .finish_non_exhaustive()
    }
}

/// SDL of the schema (built-in directives and scalars are implied).
impl Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let custom_directives = self
            .directives
            .iter()
            .filter(|directive| !BUILT_IN_DIRECTIVES.contains(&directive.name()));

        let mut first = true;
        for directive in custom_directives {
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "{directive}")?;
        }

        for object_type in self.types.values() {
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "{object_type}")?;
        }

        Ok(())
    }
}

/// Route the resolution of every field of `schema` through its resolvable directives.
///
/// Must be called once per schema, after it is built and before it executes any request.
pub fn support_resolvable_directives(schema: &mut Schema) {
    let directives = schema.directives().clone();

    schema.visit_fields_mut(|type_name, field| {
        debug!(
            r#type = type_name,
            field = field.name(),
            "supporting resolvable directives"
        );
        install_interceptor(field, directives.clone());
    });
}

pub struct SchemaBuilder {
    directives: Vec<DirectiveDescriptor>,
    objects: Vec<ObjectType>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    config: InterceptionConfig,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            directives: vec![],
            objects: vec![],
            query_type: None,
            mutation_type: None,
            config: InterceptionConfig::from_env(&SystemEnvironment),
        }
    }
}

impl SchemaBuilder {
    pub fn directive(mut self, directive: DirectiveDescriptor) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn object(mut self, object: ObjectType) -> Self {
        self.objects.push(object);
        self
    }

    /// Name of the query root type (`Query` unless set).
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = Some(name.into());
        self
    }

    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    /// Replaces the config read from `DIRECTIVE_RESERVED_NAMES`.
    pub fn config(mut self, config: InterceptionConfig) -> Self {
        self.config = config;
        self
    }

    /// Validations performed:
    /// - Type names and field names (within a type) are unique
    /// - Every field's type is a built-in scalar or one of the object types
    /// - The root types exist
    /// - Directive names are unique and not reserved
    pub fn build(self) -> Result<Schema, SchemaError> {
        let directives = DirectiveSet::new(self.directives, &self.config)?;

        let mut types = IndexMap::new();
        for object in self.objects {
            if types.contains_key(&object.name) {
                return Err(SchemaError::DuplicateType(object.name));
            }
            types.insert(object.name.clone(), object);
        }

        for object in types.values() {
            let mut field_names = HashSet::new();
            for field in &object.fields {
                if !field_names.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField(
                        field.name.clone(),
                        object.name.clone(),
                    ));
                }

                let type_name = underlying_type_name(&field.ty);
                if !BUILT_IN_SCALARS.contains(&type_name) && !types.contains_key(type_name) {
                    return Err(SchemaError::UnknownType(
                        type_name.to_string(),
                        object.name.clone(),
                        field.name.clone(),
                    ));
                }
            }
        }

        let query_type = self
            .query_type
            .unwrap_or_else(|| QUERY_ROOT_TYPENAME.to_string());

        for root_type in std::iter::once(&query_type).chain(self.mutation_type.as_ref()) {
            if !types.contains_key(root_type) {
                return Err(SchemaError::MissingRootType(root_type.clone()));
            }
        }

        Ok(Schema {
            types,
            query_type,
            mutation_type: self.mutation_type,
            directives: Arc::new(directives),
        })
    }
}

/// The named type at the bottom of any list and non-null wrapping.
pub(crate) fn underlying_type_name(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(element) => underlying_type_name(element),
    }
}

#[cfg(test)]
mod tests {
    use multiplatform_test::multiplatform_test;

    use common::env::MapEnvironment;
    use common::env_const::DIRECTIVE_RESERVED_NAMES;
    use directive_resolver::{
        DirectiveConfig, DirectiveLocation, SchemaDirectiveError, SyncResolver, create_directive,
    };

    use super::*;

    fn concert_types() -> Vec<ObjectType> {
        vec![
            ObjectType::new("Query")
                .field(FieldDefinition::new("concerts", "[Concert!]!").unwrap()),
            ObjectType::new("Concert")
                .field(FieldDefinition::new("id", "Int!").unwrap())
                .field(FieldDefinition::new("title", "String").unwrap()),
        ]
    }

    fn builder_with(types: Vec<ObjectType>) -> SchemaBuilder {
        types
            .into_iter()
            .fold(Schema::builder(), |builder, object| builder.object(object))
    }

    #[multiplatform_test]
    fn valid_schema() {
        let schema = builder_with(concert_types()).build().unwrap();

        assert_eq!(schema.query_type().map(ObjectType::name), Some("Query"));
        assert!(schema.mutation_type().is_none());
        assert_eq!(schema.types().count(), 2);
        // Built-in directives are always available
        assert!(schema.directives().get("skip").is_some());
    }

    #[multiplatform_test]
    fn unknown_field_type() {
        let types = vec![
            ObjectType::new("Query").field(FieldDefinition::new("venue", "Venue").unwrap()),
        ];

        assert_eq!(
            builder_with(types).build().unwrap_err(),
            SchemaError::UnknownType("Venue".to_string(), "Query".to_string(), "venue".to_string())
        );
    }

    #[multiplatform_test]
    fn invalid_field_type() {
        assert_eq!(
            FieldDefinition::new("title", "[String").unwrap_err(),
            SchemaError::InvalidFieldType("[String".to_string())
        );
    }

    #[multiplatform_test]
    fn duplicates() {
        let mut types = concert_types();
        types.push(ObjectType::new("Concert"));
        assert_eq!(
            builder_with(types).build().unwrap_err(),
            SchemaError::DuplicateType("Concert".to_string())
        );

        let types = vec![
            ObjectType::new("Query")
                .field(FieldDefinition::new("id", "Int").unwrap())
                .field(FieldDefinition::new("id", "String").unwrap()),
        ];
        assert_eq!(
            builder_with(types).build().unwrap_err(),
            SchemaError::DuplicateField("id".to_string(), "Query".to_string())
        );
    }

    #[multiplatform_test]
    fn missing_root_types() {
        let types = vec![ObjectType::new("Concert")];
        assert_eq!(
            builder_with(types).build().unwrap_err(),
            SchemaError::MissingRootType("Query".to_string())
        );

        assert_eq!(
            builder_with(concert_types())
                .mutation_type("Mutation")
                .build()
                .unwrap_err(),
            SchemaError::MissingRootType("Mutation".to_string())
        );
    }

    #[multiplatform_test]
    fn directive_with_reserved_name() {
        let skip = create_directive(DirectiveConfig::new("skip", [DirectiveLocation::Field]))
            .unwrap();

        assert_eq!(
            builder_with(concert_types())
                .directive(skip)
                .build()
                .unwrap_err(),
            SchemaError::Directive(SchemaDirectiveError::ReservedName("skip".to_string()))
        );
    }

    #[multiplatform_test]
    fn builder_reads_reserved_names_from_env() {
        assert_eq!(
            Schema::builder().config,
            InterceptionConfig::from_env(&SystemEnvironment)
        );

        let env = MapEnvironment::from([(DIRECTIVE_RESERVED_NAMES, "skip, include, internal")]);
        let internal =
            create_directive(DirectiveConfig::new("internal", [DirectiveLocation::Field]))
                .unwrap();

        assert_eq!(
            builder_with(concert_types())
                .config(InterceptionConfig::from_env(&env))
                .directive(internal)
                .build()
                .unwrap_err(),
            SchemaError::Directive(SchemaDirectiveError::ReservedName("internal".to_string()))
        );
    }

    #[multiplatform_test]
    fn install_on_every_field() {
        let mut schema = builder_with(concert_types()).build().unwrap();
        assert!(schema.types().flat_map(|object| object.fields()).all(|f| f.resolver.is_none()));

        support_resolvable_directives(&mut schema);

        assert!(schema.types().flat_map(|object| object.fields()).all(|f| f.resolver.is_some()));
    }

    #[multiplatform_test]
    fn visit_fields_reports_parent_type() {
        let mut schema = builder_with(concert_types()).build().unwrap();

        let mut visited = vec![];
        schema.visit_fields_mut(|type_name, field| {
            visited.push(format!("{type_name}.{}", field.name()));
        });

        assert_eq!(visited, vec!["Query.concerts", "Concert.id", "Concert.title"]);
    }

    #[multiplatform_test]
    fn schema_sdl() {
        let important = create_directive(DirectiveConfig::new(
            "important",
            [DirectiveLocation::Field],
        ))
        .unwrap();
        let types = vec![
            ObjectType::new("Query").field(
                FieldDefinition::new("truthy", "Boolean")
                    .unwrap()
                    .argument(ArgumentDefinition::new("id", "Int!").unwrap())
                    .resolver(SyncResolver::new(|_, _, _, _| Ok(true.into()))),
            ),
        ];

        let schema = builder_with(types).directive(important).build().unwrap();

        assert_eq!(
            schema.to_string(),
            "directive @important on FIELD\n\ntype Query {\n  truthy(id: Int!): Boolean\n}\n"
        );
    }
}
