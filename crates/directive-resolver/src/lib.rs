// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Resolvable directives: schema directives that intercept the resolution of the fields they
//! annotate.
//!
//! A directive created with a resolution hook ([`DirectiveHook`]) takes part in an interception
//! chain built around a field's original resolver every time the field is resolved with that
//! directive applied in the query. Directives are declared through [`create_directive`],
//! collected into a [`DirectiveSet`], and activated per field with [`install_interceptor`].

pub mod coercion;
pub mod context;
pub mod directive;
pub mod error;
pub mod registry;
pub mod resolver;

mod chain;
mod hook;
mod interceptor;

pub use chain::{Next, ResolutionChain};
pub use coercion::{ArgumentCoercer, BUILT_IN_SCALARS, CoercionError};
pub use context::RequestContext;
pub use directive::{
    ArgumentDefinition, DirectiveConfig, DirectiveDefinitionError, DirectiveDescriptor,
    DirectiveLocation, create_directive,
};
pub use error::FieldError;
pub use hook::DirectiveHook;
pub use interceptor::{DirectiveInterceptor, install_interceptor};
pub use registry::{BUILT_IN_DIRECTIVES, DirectiveSet, InterceptionConfig, SchemaDirectiveError};
pub use resolver::{
    DefaultFieldResolver, FieldInfo, FieldResolver, PathSegment, ResolvableField, SyncResolver,
    Variables,
};
