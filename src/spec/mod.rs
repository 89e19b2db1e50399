//! # API description model
//!
//! The resolved operation model the dispatch core works from: operations,
//! their parameters, content types and security alternatives. Everything
//! here is built once at startup and read-only while serving.
//!
//! Operations can be assembled in code with the builder methods on
//! [`Operation`] and [`ParameterSpec`], or read from a resolved description
//! file with [`load_operations`].

mod load;
mod schema;
mod types;

pub use load::{load_operations, operations_from_json, operations_from_yaml};
pub use schema::{BodySchema, StringFormat};
pub use types::{
    CollectionFormat, Constraints, Operation, ParamType, ParameterLocation, ParameterSpec,
    PathTemplate, Pattern, ScalarType, SecurityAlternative, SecurityRequirement, Segment,
};
