//! Status taxonomy shared by builders, operators and the engine.

use thiserror::Error;

pub type InferResult<T> = Result<T, InferError>;

/// All failure kinds the runtime can report.
///
/// Construction-time kinds (`NullOperator`, `Param`, `UnknownOperatorType`,
/// `Graph`) are fatal to the graph being built. Forward-time kinds abort the
/// current pass; none of them is transient, so there is no retry anywhere.
#[derive(Debug, Error)]
pub enum InferError {
    /// Operator record missing or unconstructible.
    #[error("null operator: {0}")]
    NullOperator(String),

    /// Required parameter absent, of the wrong type or arity, or out of its
    /// valid range.
    #[error("parameter error: {0}")]
    Param(String),

    /// Required input tensor sequence empty, or an input tensor absent.
    #[error("inputs empty: {0}")]
    InputsEmpty(String),

    /// Required output slot sequence empty.
    #[error("outputs empty: {0}")]
    OutputsEmpty(String),

    /// Shape or count incompatibility between an operator's inputs and
    /// outputs.
    #[error("dimension mismatch: {0}")]
    DimMismatch(String),

    /// Registry lookup miss for a record's type tag.
    #[error("unknown operator type: {0}")]
    UnknownOperatorType(String),

    /// Graph wiring error: duplicate producer, producerless edge, cycle, or
    /// an unknown edge name at bind/read time.
    #[error("graph error: {0}")]
    Graph(String),
}

impl InferError {
    /// Prefixes the message with the identity of the failing node, keeping
    /// the kind. The engine uses this to surface which operator aborted the
    /// forward pass.
    pub fn in_node(self, node: &str) -> InferError {
        use InferError::*;
        match self {
            NullOperator(m) => NullOperator(format!("{node}: {m}")),
            Param(m) => Param(format!("{node}: {m}")),
            InputsEmpty(m) => InputsEmpty(format!("{node}: {m}")),
            OutputsEmpty(m) => OutputsEmpty(format!("{node}: {m}")),
            DimMismatch(m) => DimMismatch(format!("{node}: {m}")),
            UnknownOperatorType(m) => UnknownOperatorType(format!("{node}: {m}")),
            Graph(m) => Graph(format!("{node}: {m}")),
        }
    }
}
