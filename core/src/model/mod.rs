//! Graph construction and the forward execution engine.

mod graph;
mod order;

pub use graph::{Graph, Node};
pub use order::eval_order;
