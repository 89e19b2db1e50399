//! # Errors
//!
//! The closed error taxonomy shared by every dispatch stage and its pure
//! mapping to an HTTP response.
//!
//! Each [`ApiError`] variant carries a fixed status code. [`render`] turns
//! an error into `(status, headers, body)` where the body is always a JSON
//! object with `code` and `message`, plus `name`/`in`/`value` for parameter
//! failures and `values` for media-type failures. A `405` also sets
//! `Allow: M1,M2`.

mod api;
mod render;

pub use api::{allow_header_value, ApiError};
pub use render::{render, write_error, RenderedError};
