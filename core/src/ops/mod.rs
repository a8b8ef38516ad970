//! The operator abstraction and the built-in operator library.

pub mod array;
pub mod element_wise;
pub mod nn;
pub mod source;

use crate::internal::*;

/// A polymorphic unit of computation.
///
/// `forward` consumes a batch of borrowed input tensors and fills a batch of
/// output slots. An empty slot is allocated by the operator according to its
/// own shape-inference rule (ownership moves into the slot); a populated slot
/// is validated against that rule instead, so the engine can hand the same
/// buffers back on every call. Side effects are confined to the output slots.
pub trait Op: std::fmt::Debug + Send + Sync {
    fn name(&self) -> Cow<'_, str>;

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Option<Tensor>]) -> InferResult<()>;
}

pub(crate) fn register_builtins(reg: &mut OpRegistry) {
    array::register(reg);
    nn::register(reg);
    source::register(reg);
}

/// Contract prologue shared by every operator: both sequences non-empty.
pub fn check_io(op: &str, inputs: &[&Tensor], outputs: &[Option<Tensor>]) -> InferResult<()> {
    if inputs.is_empty() {
        return Err(InferError::InputsEmpty(format!(
            "the input tensor array in the {op} operator is empty"
        )));
    }
    if outputs.is_empty() {
        return Err(InferError::OutputsEmpty(format!(
            "the output slot array in the {op} operator is empty"
        )));
    }
    Ok(())
}

/// Fan rule for the 1:1 operator families: one output slot per input.
pub fn check_one_to_one(
    op: &str,
    inputs: &[&Tensor],
    outputs: &[Option<Tensor>],
) -> InferResult<()> {
    if inputs.len() != outputs.len() {
        return Err(InferError::DimMismatch(format!(
            "the input and output batch sizes of the {op} operator do not match ({} vs {})",
            inputs.len(),
            outputs.len()
        )));
    }
    Ok(())
}

/// Fails if the `i`-th paired input is structurally empty.
pub fn non_empty_input<'a>(op: &str, input: &'a Tensor, i: usize) -> InferResult<&'a Tensor> {
    if input.is_empty() {
        return Err(InferError::InputsEmpty(format!(
            "the input tensor array in the {op} operator has an empty tensor at index {i}"
        )));
    }
    Ok(input)
}

fn padded(shape: &[usize]) -> (usize, usize, usize) {
    match *shape {
        [c, r, w] => (c, r, w),
        [r, w] => (1, r, w),
        [n] => (1, 1, n),
        _ => (0, 0, 0),
    }
}

/// Realizes one output slot against an inferred shape.
///
/// Empty slot: a fresh zero-filled tensor is moved in. Populated slot: its
/// storage extents must match the inferred shape exactly, so buffers
/// pre-allocated by an earlier call survive and are overwritten in place.
pub fn realize_slot<'a>(
    op: &str,
    slot: &'a mut Option<Tensor>,
    shape: &[usize],
) -> InferResult<&'a mut Tensor> {
    match slot.take() {
        Some(t) if !t.is_empty() => {
            if t.chw() != padded(shape) {
                return Err(InferError::DimMismatch(format!(
                    "the {op} operator got an incorrectly sized output slot: \
                     inferred shape {:?}, existing {:?}",
                    shape,
                    t.shape()
                )));
            }
            Ok(slot.insert(t))
        }
        _ => Ok(slot.insert(Tensor::zeros(shape))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_is_allocated() {
        let mut slot = None;
        let t = realize_slot("test", &mut slot, &[2, 3]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert!(slot.is_some());
    }

    #[test]
    fn populated_slot_is_validated_not_replaced() {
        let mut existing = Tensor::zeros(&[2, 3]);
        existing.fill(7.0);
        let ptr = existing.as_slice().as_ptr();
        let mut slot = Some(existing);
        let t = realize_slot("test", &mut slot, &[2, 3]).unwrap();
        assert_eq!(t.as_slice().as_ptr(), ptr);
        assert!(matches!(
            realize_slot("test", &mut slot, &[3, 3]),
            Err(InferError::DimMismatch(_))
        ));
    }

    #[test]
    fn io_prologue() {
        let t = Tensor::zeros(&[1]);
        let outs = vec![None];
        assert!(matches!(check_io("test", &[], &outs), Err(InferError::InputsEmpty(_))));
        assert!(matches!(check_io("test", &[&t], &[]), Err(InferError::OutputsEmpty(_))));
        assert!(check_io("test", &[&t], &outs).is_ok());
    }
}
