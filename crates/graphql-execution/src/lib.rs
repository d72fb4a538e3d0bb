// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A small GraphQL execution engine over object types, hosting resolvable directives.
//!
//! Build a [`Schema`] with [`SchemaBuilder`], call [`support_resolvable_directives`] once, then
//! [`Schema::execute`] requests against it.

mod error;
mod executor;
mod request;
mod response;
mod schema;
mod validation;

pub use error::{ExecutionError, SchemaError};
pub use request::Request;
pub use response::{Location, Response, ResponseError};
pub use schema::{
    FieldDefinition, ObjectType, QUERY_ROOT_TYPENAME, Schema, SchemaBuilder,
    support_resolvable_directives,
};
