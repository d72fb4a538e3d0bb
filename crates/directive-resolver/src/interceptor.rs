// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, trace};

use common::value::Val;

use crate::{
    chain::{ChainStep, ResolutionChain},
    coercion::ArgumentCoercer,
    context::RequestContext,
    error::FieldError,
    registry::DirectiveSet,
    resolver::{DefaultFieldResolver, FieldInfo, FieldResolver, ResolvableField},
};

/// Resolver installed in place of a field's own resolver.
///
/// For every invocation, builds a [`ResolutionChain`] out of the resolvable directives applied
/// to the field occurrence being resolved. Without any, it is a plain pass-through to the
/// original resolver.
pub struct DirectiveInterceptor {
    original: Arc<dyn FieldResolver>,
    directives: Arc<DirectiveSet>,
}

impl DirectiveInterceptor {
    pub fn new(original: Arc<dyn FieldResolver>, directives: Arc<DirectiveSet>) -> Self {
        Self {
            original,
            directives,
        }
    }

    /// Chain steps for this occurrence, innermost first.
    fn chain_steps(&self, info: &FieldInfo<'_>) -> Result<Vec<ChainStep>, FieldError> {
        let mut steps = vec![];

        for usage in info.directives() {
            let name = usage.node.name.node.as_str();
            if self.directives.is_reserved(name) {
                continue;
            }

            let descriptor = self
                .directives
                .get(name)
                .ok_or_else(|| FieldError::UnknownDirective(name.to_string()))?;

            let Some(hook) = descriptor.resolve() else {
                debug!(
                    directive = name,
                    field = info.field_name(),
                    "directive has no resolution hook"
                );
                continue;
            };

            let arguments = ArgumentCoercer::new(name, info.variables, usage.pos)
                .coerce(descriptor.arguments(), &usage.node.arguments)?;

            steps.push(ChainStep::new(descriptor.clone(), hook.clone(), arguments));
        }

        Ok(steps)
    }

    fn has_candidates(&self, info: &FieldInfo<'_>) -> bool {
        info.directives()
            .iter()
            .any(|usage| !self.directives.is_reserved(usage.node.name.node.as_str()))
    }
}

#[async_trait]
impl FieldResolver for DirectiveInterceptor {
    async fn resolve(
        &self,
        source: &Val,
        arguments: &IndexMap<String, Val>,
        context: &RequestContext,
        info: &FieldInfo<'_>,
    ) -> Result<Val, FieldError> {
        if !self.has_candidates(info) {
            return self.original.resolve(source, arguments, context, info).await;
        }

        let steps = self.chain_steps(info)?;

        if steps.is_empty() {
            return self.original.resolve(source, arguments, context, info).await;
        }

        trace!(
            field = info.field_name(),
            steps = steps.len(),
            "resolving through directive chain"
        );

        let chain = ResolutionChain::new(
            self.original.as_ref(),
            steps,
            source,
            arguments,
            context,
            info,
        );

        chain.resolve().await
    }
}

/// Route every future resolution of `field` through a [`DirectiveInterceptor`].
///
/// Wraps whatever resolver the field currently has (or [`DefaultFieldResolver`] if none), so it
/// must be called exactly once per field: installing twice nests two interceptors and runs each
/// chain twice.
pub fn install_interceptor<F>(field: &mut F, directives: Arc<DirectiveSet>)
where
    F: ResolvableField + ?Sized,
{
    let original = field
        .resolver()
        .cloned()
        .unwrap_or_else(|| Arc::new(DefaultFieldResolver) as Arc<dyn FieldResolver>);

    trace!(field = field.name(), "installing directive interceptor");

    field.set_resolver(Arc::new(DirectiveInterceptor::new(original, directives)));
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_graphql_parser::{
        Positioned, parse_query,
        types::{DocumentOperations, Field, Selection, Type},
    };
    use async_graphql_value::{ConstValue, Name};

    use super::*;
    use crate::{
        chain::Next,
        directive::{
            ArgumentDefinition, DirectiveConfig, DirectiveDescriptor, DirectiveLocation,
            create_directive,
        },
        hook::DirectiveHook,
        registry::InterceptionConfig,
        resolver::{SyncResolver, Variables},
    };

    struct Not;

    #[async_trait]
    impl DirectiveHook for Not {
        async fn resolve(
            &self,
            next: Next<'_>,
            _source: &Val,
            _arguments: &IndexMap<String, Val>,
            _context: &RequestContext,
            _info: &FieldInfo<'_>,
        ) -> Result<Val, FieldError> {
            let value = next.run().await?;
            Ok(Val::Bool(!value.is_truthy()))
        }
    }

    struct Set;

    #[async_trait]
    impl DirectiveHook for Set {
        async fn resolve(
            &self,
            _next: Next<'_>,
            _source: &Val,
            arguments: &IndexMap<String, Val>,
            _context: &RequestContext,
            _info: &FieldInfo<'_>,
        ) -> Result<Val, FieldError> {
            Ok(arguments.get("value").cloned().unwrap_or_default())
        }
    }

    struct Fail;

    #[async_trait]
    impl DirectiveHook for Fail {
        async fn resolve(
            &self,
            _next: Next<'_>,
            _source: &Val,
            _arguments: &IndexMap<String, Val>,
            _context: &RequestContext,
            _info: &FieldInfo<'_>,
        ) -> Result<Val, FieldError> {
            Err(FieldError::new("failure"))
        }
    }

    /// Calls `next` twice and returns both results.
    struct Twice;

    #[async_trait]
    impl DirectiveHook for Twice {
        async fn resolve(
            &self,
            next: Next<'_>,
            _source: &Val,
            _arguments: &IndexMap<String, Val>,
            _context: &RequestContext,
            _info: &FieldInfo<'_>,
        ) -> Result<Val, FieldError> {
            let first = next.run().await?;
            let second = next.run().await?;
            Ok(Val::List(vec![first, second]))
        }
    }

    /// Turns a failure of the inner chain into its message.
    struct Recover;

    #[async_trait]
    impl DirectiveHook for Recover {
        async fn resolve(
            &self,
            next: Next<'_>,
            _source: &Val,
            _arguments: &IndexMap<String, Val>,
            _context: &RequestContext,
            _info: &FieldInfo<'_>,
        ) -> Result<Val, FieldError> {
            match next.run().await {
                Ok(value) => Ok(value),
                Err(error) => Ok(Val::String(error.to_string())),
            }
        }
    }

    /// Records entry and exit around the inner chain.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DirectiveHook for Trace {
        async fn resolve(
            &self,
            next: Next<'_>,
            _source: &Val,
            _arguments: &IndexMap<String, Val>,
            _context: &RequestContext,
            _info: &FieldInfo<'_>,
        ) -> Result<Val, FieldError> {
            self.log.lock().unwrap().push(format!("enter {}", self.name));
            let value = next.run().await;
            self.log.lock().unwrap().push(format!("exit {}", self.name));
            value
        }
    }

    fn directive(name: &str, hook: impl DirectiveHook + 'static) -> DirectiveDescriptor {
        create_directive(DirectiveConfig::new(name, [DirectiveLocation::Field]).resolve(hook))
            .unwrap()
    }

    fn directive_set(custom: Vec<DirectiveDescriptor>) -> Arc<DirectiveSet> {
        Arc::new(DirectiveSet::new(custom, &InterceptionConfig::default()).unwrap())
    }

    fn standard_directives() -> Arc<DirectiveSet> {
        directive_set(vec![
            directive("not", Not),
            create_directive(
                DirectiveConfig::new("set", [DirectiveLocation::Field])
                    .argument(ArgumentDefinition::new("value", "Boolean").unwrap())
                    .resolve(Set),
            )
            .unwrap(),
            directive("fail", Fail),
            directive("twice", Twice),
            directive("recover", Recover),
            create_directive(DirectiveConfig::new("important", [DirectiveLocation::Field]))
                .unwrap(),
        ])
    }

    fn parse_field(query: &str) -> Positioned<Field> {
        let document = parse_query(query).unwrap();
        let operation = match document.operations {
            DocumentOperations::Single(operation) => operation,
            DocumentOperations::Multiple(_) => panic!("expected a single operation"),
        };

        match operation.node.selection_set.node.items.into_iter().next() {
            Some(Positioned {
                node: Selection::Field(field),
                ..
            }) => field,
            _ => panic!("expected a field selection"),
        }
    }

    /// Invoke `resolver` for the single field selected by `query`.
    async fn invoke(
        resolver: &dyn FieldResolver,
        query: &str,
        source: Val,
        variables: Variables,
    ) -> Result<Val, FieldError> {
        let field = parse_field(query);
        let return_type = Type::new("Boolean").unwrap();
        let info = FieldInfo {
            parent_type: "Query",
            return_type: &return_type,
            path: &[],
            field: &field,
            variables: &variables,
        };

        resolver
            .resolve(&source, &IndexMap::new(), &RequestContext::new(), &info)
            .await
    }

    async fn resolve_with(
        resolver: Arc<dyn FieldResolver>,
        directives: Arc<DirectiveSet>,
        query: &str,
        source: Val,
        variables: Variables,
    ) -> Result<Val, FieldError> {
        let interceptor = DirectiveInterceptor::new(resolver, directives);
        invoke(&interceptor, query, source, variables).await
    }

    async fn resolve(resolver: Arc<dyn FieldResolver>, query: &str) -> Result<Val, FieldError> {
        resolve_with(
            resolver,
            standard_directives(),
            query,
            Val::Null,
            Variables::new(),
        )
        .await
    }

    fn truthy() -> Arc<dyn FieldResolver> {
        Arc::new(SyncResolver::new(|_, _, _, _| Ok(Val::Bool(true))))
    }

    fn failing() -> Arc<dyn FieldResolver> {
        Arc::new(SyncResolver::new(|_, _, _, _| {
            Err(FieldError::new("resolver must not run"))
        }))
    }

    #[tokio::test]
    async fn undecorated_field_is_transparent() {
        assert_eq!(resolve(truthy(), "{ truthy }").await.unwrap(), Val::Bool(true));

        let error = resolve(failing(), "{ truthy }").await.unwrap_err();
        assert_eq!(error.to_string(), "resolver must not run");
    }

    #[tokio::test]
    async fn declarative_and_built_in_directives_are_transparent() {
        assert_eq!(
            resolve(truthy(), "{ truthy @important }").await.unwrap(),
            Val::Bool(true)
        );
        assert_eq!(
            resolve(truthy(), "{ truthy @include(if: true) @deprecated }")
                .await
                .unwrap(),
            Val::Bool(true)
        );
    }

    #[tokio::test]
    async fn hook_transforms_resolver_value() {
        assert_eq!(
            resolve(truthy(), "{ truthy @not }").await.unwrap(),
            Val::Bool(false)
        );
    }

    #[tokio::test]
    async fn last_declared_directive_runs_outermost() {
        assert_eq!(
            resolve(truthy(), "{ truthy @set(value: false) @not }")
                .await
                .unwrap(),
            Val::Bool(true)
        );
        assert_eq!(
            resolve(truthy(), "{ truthy @not @set(value: false) }")
                .await
                .unwrap(),
            Val::Bool(false)
        );
    }

    #[tokio::test]
    async fn hooks_nest_in_declaration_order() {
        let log = Arc::new(Mutex::new(vec![]));
        let directives = directive_set(vec![
            directive(
                "a",
                Trace {
                    name: "a",
                    log: log.clone(),
                },
            ),
            directive(
                "b",
                Trace {
                    name: "b",
                    log: log.clone(),
                },
            ),
        ]);

        let value = resolve_with(
            truthy(),
            directives,
            "{ truthy @a @b }",
            Val::Null,
            Variables::new(),
        )
        .await
        .unwrap();

        assert_eq!(value, Val::Bool(true));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enter b", "enter a", "exit a", "exit b"]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_resolver() {
        assert_eq!(
            resolve(failing(), "{ truthy @set(value: true) }")
                .await
                .unwrap(),
            Val::Bool(true)
        );
        // An inner hook is skipped as well
        assert_eq!(
            resolve(failing(), "{ truthy @fail @set(value: false) }")
                .await
                .unwrap(),
            Val::Bool(false)
        );
    }

    #[tokio::test]
    async fn hook_failure_propagates_unchanged() {
        let error = resolve(truthy(), "{ truthy @fail }").await.unwrap_err();
        assert_eq!(error.to_string(), "failure");

        let error = resolve(truthy(), "{ truthy @fail @not }").await.unwrap_err();
        assert_eq!(error.to_string(), "failure");
    }

    #[tokio::test]
    async fn resolver_failure_propagates_through_hooks() {
        let error = resolve(failing(), "{ truthy @not }").await.unwrap_err();
        assert_eq!(error.to_string(), "resolver must not run");
    }

    #[tokio::test]
    async fn hook_may_recover_from_inner_failure() {
        assert_eq!(
            resolve(truthy(), "{ truthy @fail @recover }").await.unwrap(),
            Val::String("failure".to_string())
        );
    }

    #[tokio::test]
    async fn next_may_be_invoked_more_than_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = {
            let calls = calls.clone();
            Arc::new(SyncResolver::new(move |_, _, _, _| {
                Ok(Val::from(calls.fetch_add(1, Ordering::SeqCst) as i64))
            }))
        };

        let value = resolve(resolver, "{ counter @twice }").await.unwrap();

        assert_eq!(value, Val::List(vec![Val::from(0), Val::from(1)]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn default_resolver_reads_source_property() {
        let mut field = TestField { resolver: None };
        install_interceptor(&mut field, standard_directives());

        let resolver = field.resolver.unwrap();
        let source = Val::Object(IndexMap::from([("falsy".to_string(), Val::Bool(false))]));

        let value = invoke(resolver.as_ref(), "{ falsy }", source.clone(), Variables::new()).await;
        assert_eq!(value.unwrap(), Val::Bool(false));

        let value = invoke(resolver.as_ref(), "{ falsy @not }", source, Variables::new()).await;
        assert_eq!(value.unwrap(), Val::Bool(true));
    }

    #[tokio::test]
    async fn directive_arguments_use_variables() {
        let variables = Variables::from([(Name::new("flag"), ConstValue::Boolean(false))]);

        let value = resolve_with(
            truthy(),
            standard_directives(),
            "query($flag: Boolean) { truthy @set(value: $flag) }",
            Val::Null,
            variables,
        )
        .await
        .unwrap();

        assert_eq!(value, Val::Bool(false));

        // Without a binding the argument is left out
        let value = resolve(truthy(), "query($flag: Boolean) { truthy @set(value: $flag) }")
            .await
            .unwrap();
        assert_eq!(value, Val::Null);
    }

    #[tokio::test]
    async fn directive_argument_errors_fail_the_field() {
        let error = resolve(truthy(), "{ truthy @set(value: \"yes\") }")
            .await
            .unwrap_err();
        assert!(matches!(error, FieldError::Coercion(_)));
        assert_eq!(
            error.to_string(),
            "Argument 'value' is not of a valid type. Expected 'Boolean', got 'String'"
        );
    }

    #[tokio::test]
    async fn unknown_directive_fails_the_field() {
        let error = resolve(truthy(), "{ truthy @missing }").await.unwrap_err();
        assert_eq!(error.to_string(), "Unknown directive '@missing'");
    }

    #[tokio::test]
    async fn reserved_names_never_join_the_chain() {
        let config = InterceptionConfig {
            reserved_directives: ["skip", "include", "internal"]
                .map(String::from)
                .to_vec(),
        };
        let directives = Arc::new(DirectiveSet::new(vec![directive("not", Not)], &config).unwrap());

        // A reserved name is dropped before lookup, even when the schema does not define it
        let value = resolve_with(
            truthy(),
            directives,
            "{ truthy @internal @not }",
            Val::Null,
            Variables::new(),
        )
        .await
        .unwrap();

        assert_eq!(value, Val::Bool(false));
    }

    #[tokio::test]
    async fn installing_twice_runs_the_chain_twice() {
        let mut field = TestField {
            resolver: Some(truthy()),
        };
        install_interceptor(&mut field, standard_directives());

        let once = field.resolver.clone().unwrap();
        let value = invoke(once.as_ref(), "{ truthy @not }", Val::Null, Variables::new()).await;
        assert_eq!(value.unwrap(), Val::Bool(false));

        install_interceptor(&mut field, standard_directives());

        let twice = field.resolver.unwrap();
        let value = invoke(twice.as_ref(), "{ truthy @not }", Val::Null, Variables::new()).await;
        assert_eq!(value.unwrap(), Val::Bool(true));
    }

    struct TestField {
        resolver: Option<Arc<dyn FieldResolver>>,
    }

    impl ResolvableField for TestField {
        fn name(&self) -> &str {
            "test"
        }

        fn resolver(&self) -> Option<&Arc<dyn FieldResolver>> {
            self.resolver.as_ref()
        }

        fn set_resolver(&mut self, resolver: Arc<dyn FieldResolver>) {
            self.resolver = Some(resolver);
        }
    }
}
