//! In-memory model description: one record per operator, as produced by an
//! external parser.

use crate::error::{InferError, InferResult};
use quiver_data::tensor::Tensor;
use std::collections::HashMap;

/// A typed operator parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f32),
    IntArray(Vec<i64>),
    FloatArray(Vec<f32>),
    Str(String),
}

/// One operator record: type tag, named parameters, named input/output edges
/// and an optional weight attachment.
///
/// Records are created once at graph-build time and are immutable afterwards,
/// except for the resolved weight tensor the engine attaches before handing
/// the record to a builder.
#[derive(Debug, Clone, Default)]
pub struct OpRecord {
    pub ty: String,
    pub name: String,
    pub params: HashMap<String, ParamValue>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub weight_key: Option<String>,
    pub weights: Option<Tensor>,
}

impl OpRecord {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> OpRecord {
        OpRecord { ty: ty.into(), name: name.into(), ..OpRecord::default() }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: ParamValue) -> OpRecord {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_inputs(mut self, inputs: &[&str]) -> OpRecord {
        self.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_outputs(mut self, outputs: &[&str]) -> OpRecord {
        self.outputs = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn param_int(&self, key: &str) -> InferResult<i64> {
        match self.params.get(key) {
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(other) => Err(InferError::Param(format!(
                "{}: parameter {key} should be an int, got {other:?}",
                self.name
            ))),
            None => {
                Err(InferError::Param(format!("{}: can not find the {key} parameter", self.name)))
            }
        }
    }

    pub fn param_float(&self, key: &str) -> InferResult<f32> {
        match self.params.get(key) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(other) => Err(InferError::Param(format!(
                "{}: parameter {key} should be a float, got {other:?}",
                self.name
            ))),
            None => {
                Err(InferError::Param(format!("{}: can not find the {key} parameter", self.name)))
            }
        }
    }

    pub fn param_floats(&self, key: &str) -> InferResult<&[f32]> {
        match self.params.get(key) {
            Some(ParamValue::FloatArray(v)) => Ok(v),
            Some(other) => Err(InferError::Param(format!(
                "{}: parameter {key} should be a float array, got {other:?}",
                self.name
            ))),
            None => {
                Err(InferError::Param(format!("{}: can not find the {key} parameter", self.name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let rec = OpRecord::new("torch.cat", "cat_0")
            .with_param("dim", ParamValue::Int(1))
            .with_param("scale_factor", ParamValue::FloatArray(vec![2.0, 2.0]));
        assert_eq!(rec.param_int("dim").unwrap(), 1);
        assert_eq!(rec.param_floats("scale_factor").unwrap(), &[2.0, 2.0]);
        assert!(matches!(rec.param_float("dim"), Err(InferError::Param(_))));
        assert!(matches!(rec.param_int("missing"), Err(InferError::Param(_))));
    }
}
