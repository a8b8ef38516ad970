//! The shape-preserving per-element operator family.

use crate::internal::*;
use crate::ops::{check_io, non_empty_input, realize_slot};
use rayon::prelude::*;
use std::fmt;

/// A scalar transform expressed over contiguous runs of values.
///
/// Implementations are free to evaluate the run in bulk (vectorized) as long
/// as the result matches per-element evaluation up to rounding.
pub trait ElementWiseMiniOp: fmt::Debug + Send + Sync + 'static {
    fn name(&self) -> String;

    /// Maps `input` into `output`, element for element. Both slices have the
    /// same length.
    fn run(&self, input: &[f32], output: &mut [f32]);
}

/// Wraps a mini-op with the batch loop and the forward contract: one output
/// per input, every output shaped like its input.
#[derive(Debug)]
pub struct ElementWiseOp(pub Box<dyn ElementWiseMiniOp>);

impl Op for ElementWiseOp {
    fn name(&self) -> Cow<'_, str> {
        self.0.name().into()
    }

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Option<Tensor>]) -> InferResult<()> {
        let name = self.0.name();
        check_io(&name, inputs, outputs)?;
        if inputs.len() != outputs.len() {
            return Err(InferError::DimMismatch(format!(
                "the input and output batch sizes of the {} operator do not match ({} vs {})",
                name,
                inputs.len(),
                outputs.len()
            )));
        }
        // Validate and allocate sequentially, then map the independent batch
        // items in parallel. Each pair touches disjoint buffers.
        let mut jobs: Vec<(&Tensor, &mut Tensor)> = Vec::with_capacity(inputs.len());
        for (i, (input, slot)) in inputs.iter().copied().zip(outputs.iter_mut()).enumerate() {
            let input = non_empty_input(&name, input, i)?;
            let output = realize_slot(&name, slot, input.shape())?;
            jobs.push((input, output));
        }
        jobs.into_par_iter().for_each(|(input, output)| {
            self.0.run(input.as_slice(), output.as_mut_slice());
        });
        Ok(())
    }
}

/// Declares a mini-op struct and a snake_case constructor returning it
/// wrapped in an [`ElementWiseOp`].
#[macro_export]
macro_rules! element_wise {
    ($func:ident, $Op:ident $({ $($var:ident : $var_typ:ty),* })?, $f:expr) => {
        #[derive(Debug, Clone, new)]
        pub struct $Op { $($(pub $var: $var_typ),*)? }

        impl $crate::ops::element_wise::ElementWiseMiniOp for $Op {
            fn name(&self) -> String {
                stringify!($Op).to_string()
            }

            fn run(&self, input: &[f32], output: &mut [f32]) {
                let f: fn(&Self, &[f32], &mut [f32]) = $f;
                f(self, input, output)
            }
        }

        pub fn $func($($($var: $var_typ),*)?) -> $crate::ops::element_wise::ElementWiseOp {
            $crate::ops::element_wise::ElementWiseOp(Box::new($Op::new($($($var),*)?)))
        }
    };
}
