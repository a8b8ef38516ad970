//! Axis concatenation.
//!
//! Joins groups of tensors along the channel, row or column axis. The three
//! joins need structurally different copies: channel planes are whole
//! contiguous blocks, column joins append whole planes inside each channel,
//! and row joins interleave mid-plane and must copy column by column.

use crate::internal::*;
use crate::ops::{check_io, non_empty_input, realize_slot};
use derive_new::new;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinAxis {
    Channel,
    Row,
    Col,
}

/// `torch.cat`-style concatenation of N inputs into M outputs, N a multiple
/// of M, inputs distributed round-robin: output `i` receives inputs
/// `i, i+M, i+2M, …`.
#[derive(Debug, Clone, new)]
pub struct Concat {
    dim: i64,
}

impl Concat {
    pub fn from_record(record: &OpRecord) -> InferResult<Box<dyn Op>> {
        if record.params.is_empty() {
            return Err(InferError::Param(format!(
                "{}: the operator parameter map is empty",
                record.name
            )));
        }
        Ok(Box::new(Concat::new(record.param_int("dim")?)))
    }

    /// Resolves the configured signed axis against the inputs' logical rank
    /// plus the implicit leading batch axis, then re-bases it onto the fixed
    /// 3-axis storage. The batch axis itself is never concatenable: the
    /// storage cannot hold several batch slices in one tensor.
    fn resolve_axis(&self, rank: usize) -> InferResult<JoinAxis> {
        let full = rank as i64 + 1;
        let positive = if self.dim < 0 { self.dim + full } else { self.dim };
        if !(1..full).contains(&positive) {
            return Err(InferError::Param(format!(
                "concat axis {} out of range for logical rank {full} \
                 (the batch axis can not be concatenated)",
                self.dim
            )));
        }
        match positive + (3 - rank as i64) {
            1 => Ok(JoinAxis::Channel),
            2 => Ok(JoinAxis::Row),
            _ => Ok(JoinAxis::Col),
        }
    }

    fn join_group(
        &self,
        axis: JoinAxis,
        inputs: &[&Tensor],
        group: usize,
        stride: usize,
        slot: &mut Option<Tensor>,
    ) -> InferResult<()> {
        let first = inputs[group];
        let (channels, rows, cols) = first.chw();

        // The combined extent is only known once every member has been
        // inspected: the whole group validates before the slot is touched.
        let mut total = 0;
        let mut j = group;
        while j < inputs.len() {
            let input = inputs[j];
            match axis {
                JoinAxis::Channel => {
                    check_extent(axis, "rows", j, input.rows(), rows)?;
                    check_extent(axis, "cols", j, input.cols(), cols)?;
                    total += input.channels();
                }
                JoinAxis::Row => {
                    check_extent(axis, "channels", j, input.channels(), channels)?;
                    check_extent(axis, "cols", j, input.cols(), cols)?;
                    total += input.rows();
                }
                JoinAxis::Col => {
                    check_extent(axis, "channels", j, input.channels(), channels)?;
                    check_extent(axis, "rows", j, input.rows(), rows)?;
                    total += input.cols();
                }
            }
            j += stride;
        }

        let shape = joined_shape(axis, first.shape(), total);
        let output = realize_slot("cat", slot, &shape)?;

        match axis {
            JoinAxis::Channel => {
                // channel planes are whole contiguous blocks: straight append
                let mut offset = 0;
                let mut j = group;
                while j < inputs.len() {
                    let input = inputs[j];
                    output.as_mut_slice()[offset..offset + input.len()]
                        .copy_from_slice(input.as_slice());
                    offset += input.len();
                    j += stride;
                }
            }
            JoinAxis::Row => {
                // the destination interleaves members mid-plane: copy each
                // member's columns into the output column at a running row
                // offset
                let out_rows = output.rows();
                let out_plane = output.plane_len();
                for c in 0..channels {
                    let mut row_offset = 0;
                    let mut j = group;
                    while j < inputs.len() {
                        let input = inputs[j];
                        let in_rows = input.rows();
                        let in_plane = input.plane_len();
                        for col in 0..cols {
                            let src = c * in_plane + col * in_rows;
                            let dst = c * out_plane + col * out_rows + row_offset;
                            output.as_mut_slice()[dst..dst + in_rows]
                                .copy_from_slice(&input.as_slice()[src..src + in_rows]);
                        }
                        row_offset += in_rows;
                        j += stride;
                    }
                }
            }
            JoinAxis::Col => {
                // planes are column-major, so appending whole columns is one
                // contiguous plane copy per member
                let out_plane = output.plane_len();
                for c in 0..channels {
                    let mut offset = c * out_plane;
                    let mut j = group;
                    while j < inputs.len() {
                        let input = inputs[j];
                        let in_plane = input.plane_len();
                        output.as_mut_slice()[offset..offset + in_plane]
                            .copy_from_slice(&input.as_slice()[c * in_plane..(c + 1) * in_plane]);
                        offset += in_plane;
                        j += stride;
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_extent(
    axis: JoinAxis,
    what: &str,
    index: usize,
    got: usize,
    want: usize,
) -> InferResult<()> {
    if got != want {
        return Err(InferError::DimMismatch(format!(
            "sizes of tensors must match except along the {axis:?} axis: \
             expected {want} {what} but got {got} for tensor {index} in the group"
        )));
    }
    Ok(())
}

fn joined_shape(axis: JoinAxis, first: &[usize], total: usize) -> TVec<usize> {
    let mut shape: TVec<usize> = first.iter().copied().collect();
    let idx = match axis {
        JoinAxis::Channel => 0,
        JoinAxis::Row => shape.len() - 2,
        JoinAxis::Col => shape.len() - 1,
    };
    shape[idx] = total;
    shape
}

impl Op for Concat {
    fn name(&self) -> Cow<'_, str> {
        "Concat".into()
    }

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Option<Tensor>]) -> InferResult<()> {
        check_io("cat", inputs, outputs)?;
        let (n, m) = (inputs.len(), outputs.len());
        if n % m != 0 {
            return Err(InferError::DimMismatch(format!(
                "the input and output batch sizes of the cat operator do not match \
                 ({n} inputs for {m} outputs)"
            )));
        }
        for (i, &input) in inputs.iter().enumerate() {
            non_empty_input("cat", input, i)?;
        }
        let axis = self.resolve_axis(inputs[0].rank())?;
        for (i, slot) in outputs.iter_mut().enumerate() {
            self.join_group(axis, inputs, i, m, slot)?;
        }
        Ok(())
    }
}
