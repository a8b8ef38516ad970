//! Graph execution engine and operator library for the quiver inference
//! runtime.
//!
//! The crate consumes an already-parsed model description (a list of
//! [`record::OpRecord`] plus a weight table), resolves each record through an
//! [`registry::OpRegistry`] into a boxed [`ops::Op`], wires the named edges
//! into a DAG and drives forward passes over it.

pub mod error;
pub mod internal;
pub mod model;
pub mod ops;
pub mod record;
pub mod registry;

pub use error::{InferError, InferResult};
pub use model::Graph;
pub use registry::OpRegistry;
