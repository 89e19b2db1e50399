//! # Parameter binding
//!
//! Reads each declared parameter from its location, coerces the raw string
//! into the declared type and applies required/default/constraint rules.
//!
//! Binding is type-indexed: every [`ScalarType`](crate::spec::ScalarType)
//! has exactly one coercion path, and sequence types split the raw value by
//! their collection format before coercing each element. Parameters are
//! processed in declaration order and the first failure is reported.

mod binder;
mod coerce;
mod constraints;
mod value;
mod values;

pub use binder::{bind_all, bind_param, coerce_param, BoundParams, ParamSources};
pub use coerce::{coerce_scalar, split_collection};
pub use value::{FromTypedValue, TypedValue};
pub use values::{Gettable, Values};
