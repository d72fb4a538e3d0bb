// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;
use indexmap::IndexMap;

use common::value::Val;

use crate::{chain::Next, context::RequestContext, error::FieldError, resolver::FieldInfo};

/// Resolution hook of a directive.
///
/// Invoked in place of the annotated field's resolver. `next` resolves the rest of the chain
/// (inner directives, then the field's own resolver); a hook may call it any number of times,
/// transform or replace its result, recover from its failure, or not call it at all.
/// `arguments` are the directive's arguments at this usage site, coerced against its definition.
#[async_trait]
pub trait DirectiveHook: Send + Sync {
    async fn resolve(
        &self,
        next: Next<'_>,
        source: &Val,
        arguments: &IndexMap<String, Val>,
        context: &RequestContext,
        info: &FieldInfo<'_>,
    ) -> Result<Val, FieldError>;
}
