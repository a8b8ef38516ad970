//! Spatial resize by a positive float scale pair.

use crate::internal::*;
use crate::ops::{check_io, check_one_to_one, non_empty_input, realize_slot};
use derive_new::new;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsampleMode {
    Nearest,
    Bilinear,
}

#[derive(Debug, Clone, new)]
pub struct Upsample {
    scale_h: f32,
    scale_w: f32,
    mode: UpsampleMode,
    align_corners: bool,
}

impl Upsample {
    fn scales_from_record(record: &OpRecord) -> InferResult<(f32, f32)> {
        if record.params.is_empty() {
            return Err(InferError::Param(format!(
                "{}: the operator parameter map is empty",
                record.name
            )));
        }
        let scales = record.param_floats("scale_factor")?;
        if scales.len() != 2 {
            return Err(InferError::Param(format!(
                "{}: the scale factor parameter needs two dimensions, got {}",
                record.name,
                scales.len()
            )));
        }
        let (scale_h, scale_w) = (scales[0], scales[1]);
        if scale_h <= 0.0 || scale_w <= 0.0 {
            return Err(InferError::Param(format!(
                "{}: the scale height and scale width should be greater than zero",
                record.name
            )));
        }
        Ok((scale_h, scale_w))
    }

    pub fn nearest_from_record(record: &OpRecord) -> InferResult<Box<dyn Op>> {
        let (scale_h, scale_w) = Self::scales_from_record(record)?;
        Ok(Box::new(Upsample::new(scale_h, scale_w, UpsampleMode::Nearest, false)))
    }

    pub fn bilinear_from_record(record: &OpRecord) -> InferResult<Box<dyn Op>> {
        let (scale_h, scale_w) = Self::scales_from_record(record)?;
        Ok(Box::new(Upsample::new(scale_h, scale_w, UpsampleMode::Bilinear, false)))
    }
}

fn scaled_shape(shape: &[usize], out_r: usize, out_w: usize) -> TVec<usize> {
    match *shape {
        [c, _, _] => tvec!(c, out_r, out_w),
        _ => tvec!(out_r, out_w),
    }
}

impl Op for Upsample {
    fn name(&self) -> Cow<'_, str> {
        match self.mode {
            UpsampleMode::Nearest => "UpsampleNearest".into(),
            UpsampleMode::Bilinear => "UpsampleBilinear".into(),
        }
    }

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Option<Tensor>]) -> InferResult<()> {
        let name = self.name().into_owned();
        check_io(&name, inputs, outputs)?;
        check_one_to_one(&name, inputs, outputs)?;
        for (i, (input, slot)) in inputs.iter().copied().zip(outputs.iter_mut()).enumerate() {
            let input = non_empty_input(&name, input, i)?;
            if input.rank() < 2 {
                return Err(InferError::DimMismatch(format!(
                    "the {name} operator needs a spatial plane, got a rank-{} tensor",
                    input.rank()
                )));
            }
            let (channels, rows, cols) = input.chw();
            let out_r = (rows as f32 * self.scale_h) as usize;
            let out_w = (cols as f32 * self.scale_w) as usize;
            if out_r == 0 || out_w == 0 {
                return Err(InferError::Param(format!(
                    "the scale factor ({}, {}) collapses a ({rows}, {cols}) plane to nothing",
                    self.scale_h, self.scale_w
                )));
            }
            let output = realize_slot(&name, slot, &scaled_shape(input.shape(), out_r, out_w))?;
            let src = input.as_slice();
            let dst = output.as_mut_slice();
            match self.mode {
                UpsampleMode::Nearest => {
                    for c in 0..channels {
                        for ow in 0..out_w {
                            let iw = ((ow as f32 / self.scale_w) as usize).min(cols - 1);
                            for oh in 0..out_r {
                                let ih = ((oh as f32 / self.scale_h) as usize).min(rows - 1);
                                dst[c * out_r * out_w + ow * out_r + oh] =
                                    src[c * rows * cols + iw * rows + ih];
                            }
                        }
                    }
                }
                UpsampleMode::Bilinear => {
                    for c in 0..channels {
                        let plane = &src[c * rows * cols..(c + 1) * rows * cols];
                        for ow in 0..out_w {
                            let (w0, w1, fw) =
                                sample_axis(ow, cols, out_w, self.scale_w, self.align_corners);
                            for oh in 0..out_r {
                                let (h0, h1, fh) =
                                    sample_axis(oh, rows, out_r, self.scale_h, self.align_corners);
                                let v00 = plane[w0 * rows + h0];
                                let v01 = plane[w1 * rows + h0];
                                let v10 = plane[w0 * rows + h1];
                                let v11 = plane[w1 * rows + h1];
                                let top = v00 + (v01 - v00) * fw;
                                let bottom = v10 + (v11 - v10) * fw;
                                dst[c * out_r * out_w + ow * out_r + oh] =
                                    top + (bottom - top) * fh;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Maps one output coordinate back to a pair of source samples and the
/// fractional weight of the second one.
fn sample_axis(
    dst: usize,
    src_len: usize,
    dst_len: usize,
    scale: f32,
    align_corners: bool,
) -> (usize, usize, f32) {
    let pos = if align_corners {
        if dst_len > 1 {
            dst as f32 * (src_len - 1) as f32 / (dst_len - 1) as f32
        } else {
            0.0
        }
    } else {
        ((dst as f32 + 0.5) / scale - 0.5).max(0.0)
    };
    let pos = pos.min((src_len - 1) as f32);
    let lo = pos as usize;
    let hi = (lo + 1).min(src_len - 1);
    (lo, hi, pos - lo as f32)
}

pub fn register(reg: &mut OpRegistry) {
    reg.register_aliases(
        &["F.upsample_nearest", "nn.upsample_nearest"],
        Upsample::nearest_from_record,
    );
    reg.register_aliases(
        &["F.upsample_bilinear", "nn.upsample_bilinear"],
        Upsample::bilinear_from_record,
    );
}
