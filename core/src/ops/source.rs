//! Graph boundary markers.
//!
//! `Source` nodes carry the externally supplied input batches; `Sink` nodes
//! mark which edges are exposed to the caller. Neither computes anything:
//! the engine binds and reads their edges directly and skips them during the
//! walk.

use crate::internal::*;

#[derive(Debug, Clone, Default)]
pub struct Source;

#[derive(Debug, Clone, Default)]
pub struct Sink;

impl Op for Source {
    fn name(&self) -> Cow<'_, str> {
        "Source".into()
    }

    fn forward(&self, _inputs: &[&Tensor], _outputs: &mut [Option<Tensor>]) -> InferResult<()> {
        Err(InferError::Graph("source nodes are fed by the engine, not evaluated".to_string()))
    }
}

impl Op for Sink {
    fn name(&self) -> Cow<'_, str> {
        "Sink".into()
    }

    fn forward(&self, _inputs: &[&Tensor], _outputs: &mut [Option<Tensor>]) -> InferResult<()> {
        Err(InferError::Graph("sink nodes are read by the engine, not evaluated".to_string()))
    }
}

pub fn register(reg: &mut OpRegistry) {
    reg.register_aliases(&["pnnx.Input", "Input"], |_| Ok(Box::new(Source)));
    reg.register_aliases(&["pnnx.Output", "Output"], |_| Ok(Box::new(Sink)));
}
