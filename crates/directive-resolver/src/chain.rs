// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use indexmap::IndexMap;
use tracing::trace;

use common::value::Val;

use crate::{
    context::RequestContext, directive::DirectiveDescriptor, error::FieldError, hook::DirectiveHook,
    resolver::FieldInfo, resolver::FieldResolver,
};

/// A directive usage bound into a chain: its hook and its coerced arguments.
pub(crate) struct ChainStep {
    descriptor: Arc<DirectiveDescriptor>,
    hook: Arc<dyn DirectiveHook>,
    arguments: IndexMap<String, Val>,
}

impl ChainStep {
    pub(crate) fn new(
        descriptor: Arc<DirectiveDescriptor>,
        hook: Arc<dyn DirectiveHook>,
        arguments: IndexMap<String, Val>,
    ) -> Self {
        Self {
            descriptor,
            hook,
            arguments,
        }
    }
}

/// The interception chain of one field invocation.
///
/// `steps[0]` is the directive declared first and sits closest to the resolver; the last step
/// is the outermost and runs first. Each step reaches the one below it through [`Next`], and
/// the bottom of the chain is the field's original resolver.
///
/// ```text
/// { field @a @b }   =>   b( a( resolver ) )
/// ```
pub struct ResolutionChain<'a> {
    resolver: &'a dyn FieldResolver,
    steps: Vec<ChainStep>,
    source: &'a Val,
    arguments: &'a IndexMap<String, Val>,
    context: &'a RequestContext,
    info: &'a FieldInfo<'a>,
}

impl<'a> ResolutionChain<'a> {
    pub(crate) fn new(
        resolver: &'a dyn FieldResolver,
        steps: Vec<ChainStep>,
        source: &'a Val,
        arguments: &'a IndexMap<String, Val>,
        context: &'a RequestContext,
        info: &'a FieldInfo<'a>,
    ) -> Self {
        Self {
            resolver,
            steps,
            source,
            arguments,
            context,
            info,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the outermost step and return the settled result of the whole chain.
    pub async fn resolve(&'a self) -> Result<Val, FieldError> {
        self.invoke(self.steps.len()).await
    }

    /// Invoke the chain starting `depth` steps above the resolver.
    fn invoke(&'a self, depth: usize) -> BoxFuture<'a, Result<Val, FieldError>> {
        match depth.checked_sub(1) {
            None => async move {
                self.resolver
                    .resolve(self.source, self.arguments, self.context, self.info)
                    .await
            }
            .boxed(),
            Some(index) => {
                let step = &self.steps[index];
                let next = Next {
                    chain: self,
                    depth: index,
                };

                async move {
                    trace!(
                        directive = step.descriptor.name(),
                        field = self.info.field_name(),
                        depth,
                        "invoking directive hook"
                    );
                    step.hook
                        .resolve(next, self.source, &step.arguments, self.context, self.info)
                        .await
                }
                .boxed()
            }
        }
    }
}

/// Handle to the inner part of a chain, handed to a [`DirectiveHook`].
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a ResolutionChain<'a>,
    depth: usize,
}

impl<'a> Next<'a> {
    /// Resolve the inner chain. Every call runs the inner steps (and the resolver) afresh.
    pub async fn run(self) -> Result<Val, FieldError> {
        self.chain.invoke(self.depth).await
    }

    /// Number of directive hooks below this point.
    pub fn remaining(&self) -> usize {
        self.depth
    }
}
