//! Depth↔space index permutations.
//!
//! `PixelShuffle` redistributes channel data into the spatial dimensions by
//! an integer factor; `PixelUnshuffle` is the inverse. Both are pure index
//! permutations, no arithmetic on values.

use crate::internal::*;
use crate::ops::{check_io, check_one_to_one, non_empty_input, realize_slot};
use derive_new::new;

#[derive(Debug, Clone, new)]
pub struct PixelShuffle {
    upscale_factor: usize,
}

impl PixelShuffle {
    pub fn from_record(record: &OpRecord) -> InferResult<Box<dyn Op>> {
        if record.params.is_empty() {
            return Err(InferError::Param(format!(
                "{}: the operator parameter map is empty",
                record.name
            )));
        }
        let factor = record.param_int("upscale_factor")?;
        if factor <= 0 {
            return Err(InferError::Param(format!(
                "{}: the upscale factor should be greater than zero, got {factor}",
                record.name
            )));
        }
        Ok(Box::new(PixelShuffle::new(factor as usize)))
    }
}

impl Op for PixelShuffle {
    fn name(&self) -> Cow<'_, str> {
        "PixelShuffle".into()
    }

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Option<Tensor>]) -> InferResult<()> {
        check_io("pixel_shuffle", inputs, outputs)?;
        check_one_to_one("pixel_shuffle", inputs, outputs)?;
        let f = self.upscale_factor;
        let f2 = f * f;
        for (i, (input, slot)) in inputs.iter().copied().zip(outputs.iter_mut()).enumerate() {
            let input = non_empty_input("pixel_shuffle", input, i)?;
            let (channels, rows, cols) = input.chw();
            if channels % f2 != 0 {
                return Err(InferError::Param(format!(
                    "pixel_shuffle expects its input channel dimension to be divisible by \
                     the square of the upscale factor, but {channels} is not divisible by {f2}"
                )));
            }
            let (out_c, out_r, out_w) = (channels / f2, rows * f, cols * f);
            let output = realize_slot("pixel_shuffle", slot, &[out_c, out_r, out_w])?;
            let src = input.as_slice();
            let dst = output.as_mut_slice();
            for oc in 0..out_c {
                for sh in 0..f {
                    for sw in 0..f {
                        let ic = oc * f2 + sh * f + sw;
                        // walk the source plane in storage order
                        for col in 0..cols {
                            let src_base = ic * rows * cols + col * rows;
                            let dst_base = oc * out_r * out_w + (col * f + sw) * out_r + sh;
                            for row in 0..rows {
                                dst[dst_base + row * f] = src[src_base + row];
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Inverse permutation: folds spatial blocks back into channels.
#[derive(Debug, Clone, new)]
pub struct PixelUnshuffle {
    downscale_factor: usize,
}

impl PixelUnshuffle {
    pub fn from_record(record: &OpRecord) -> InferResult<Box<dyn Op>> {
        if record.params.is_empty() {
            return Err(InferError::Param(format!(
                "{}: the operator parameter map is empty",
                record.name
            )));
        }
        let factor = record.param_int("downscale_factor")?;
        if factor <= 0 {
            return Err(InferError::Param(format!(
                "{}: the downscale factor should be greater than zero, got {factor}",
                record.name
            )));
        }
        Ok(Box::new(PixelUnshuffle::new(factor as usize)))
    }
}

impl Op for PixelUnshuffle {
    fn name(&self) -> Cow<'_, str> {
        "PixelUnshuffle".into()
    }

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Option<Tensor>]) -> InferResult<()> {
        check_io("pixel_unshuffle", inputs, outputs)?;
        check_one_to_one("pixel_unshuffle", inputs, outputs)?;
        let f = self.downscale_factor;
        let f2 = f * f;
        for (i, (input, slot)) in inputs.iter().copied().zip(outputs.iter_mut()).enumerate() {
            let input = non_empty_input("pixel_unshuffle", input, i)?;
            let (channels, rows, cols) = input.chw();
            if rows % f != 0 || cols % f != 0 {
                return Err(InferError::Param(format!(
                    "pixel_unshuffle expects its input spatial dimensions to be divisible by \
                     the downscale factor, but ({rows}, {cols}) is not divisible by {f}"
                )));
            }
            let (out_c, out_r, out_w) = (channels * f2, rows / f, cols / f);
            let output = realize_slot("pixel_unshuffle", slot, &[out_c, out_r, out_w])?;
            let src = input.as_slice();
            let dst = output.as_mut_slice();
            for ic in 0..channels {
                for sh in 0..f {
                    for sw in 0..f {
                        let oc = ic * f2 + sh * f + sw;
                        for col in 0..out_w {
                            let dst_base = oc * out_r * out_w + col * out_r;
                            let src_base = ic * rows * cols + (col * f + sw) * rows + sh;
                            for row in 0..out_r {
                                dst[dst_base + row] = src[src_base + row * f];
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn shuffle_shape_law() {
        let input = Tensor::zeros(&[8, 3, 5]);
        let mut outputs = vec![None];
        PixelShuffle::new(2).forward(&[&input], &mut outputs).unwrap();
        assert_eq!(outputs[0].as_ref().unwrap().chw(), (2, 6, 10));
    }

    #[test]
    fn shuffle_is_the_documented_permutation() {
        // one output channel, r = 2: four input channels interleave
        let mut input = Tensor::zeros(&[4, 2, 2]);
        for c in 0..4 {
            for r in 0..2 {
                for w in 0..2 {
                    *input.at_mut(c, r, w) = (c * 100 + r * 10 + w) as f32;
                }
            }
        }
        let mut outputs = vec![None];
        PixelShuffle::new(2).forward(&[&input], &mut outputs).unwrap();
        let out = outputs[0].as_ref().unwrap();
        assert_eq!(out.chw(), (1, 4, 4));
        for r in 0..2 {
            for w in 0..2 {
                for sh in 0..2 {
                    for sw in 0..2 {
                        let ic = sh * 2 + sw;
                        assert_eq!(out.at(0, r * 2 + sh, w * 2 + sw), input.at(ic, r, w));
                    }
                }
            }
        }
    }

    #[test]
    fn factor_must_divide_the_channels() {
        let input = Tensor::zeros(&[6, 4, 4]);
        let mut outputs = vec![None];
        assert!(matches!(
            PixelShuffle::new(2).forward(&[&input], &mut outputs),
            Err(InferError::Param(_))
        ));
    }

    #[test]
    fn unshuffle_spatial_divisibility() {
        let input = Tensor::zeros(&[1, 5, 4]);
        let mut outputs = vec![None];
        assert!(matches!(
            PixelUnshuffle::new(2).forward(&[&input], &mut outputs),
            Err(InferError::Param(_))
        ));
    }

    #[test]
    fn builder_validates_the_factor() {
        let reg = OpRegistry::with_builtins();
        let rec = OpRecord::new("nn.PixelShuffle", "shuffle_0");
        assert!(matches!(reg.build(&rec), Err(InferError::Param(_))));
        let rec = rec.with_param("upscale_factor", ParamValue::Int(0));
        assert!(matches!(reg.build(&rec), Err(InferError::Param(_))));
        let rec = rec.with_param("upscale_factor", ParamValue::Int(3));
        assert_eq!(reg.build(&rec).unwrap().name(), "PixelShuffle");
    }

    proptest! {
        #[test]
        fn unshuffle_round_trips_shuffle(
            factor in 1usize..4,
            base_c in 1usize..3,
            rows in 1usize..4,
            cols in 1usize..4,
            seed in vec(-10f32..10., 1usize..200),
        ) {
            let shape = [base_c * factor * factor, rows, cols];
            let len = shape.iter().product::<usize>();
            let data: Vec<f32> = (0..len).map(|i| seed[i % seed.len()]).collect();
            let original = Tensor::from_vec(&shape, data);

            let mut shuffled = vec![None];
            PixelShuffle::new(factor).forward(&[&original], &mut shuffled).unwrap();
            let shuffled = shuffled[0].take().unwrap();
            prop_assert_eq!(shuffled.chw(), (base_c, rows * factor, cols * factor));

            let mut restored = vec![None];
            PixelUnshuffle::new(factor).forward(&[&shuffled], &mut restored).unwrap();
            prop_assert!(restored[0].as_ref().unwrap().approx_eq(&original, 0.0));
        }
    }
}
