//! `Tensor`, the unit of data exchanged between operators.
//!
//! A tensor is a dense `f32` buffer addressed by (channel, row, col). Inside
//! each channel plane values are stored column-major; planes are contiguous
//! and outermost, so the flat linearization is
//! `c * rows * cols + col * rows + row`.

use crate::TVec;
use itertools::Itertools;
use ndarray::prelude::*;
use ndarray::ShapeBuilder;
use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;

/// Dense 3-D tensor with an explicit logical rank.
///
/// The logical shape keeps the rank the caller meant: `[n]` for a vector,
/// `[rows, cols]` for a matrix, `[channels, rows, cols]` for a cube. The
/// storage extents pad missing leading axes with 1, so a vector is stored as
/// a (1, 1, n) cube. Axis-sensitive operators read `rank()` instead of
/// guessing it back from which extents happen to be 1.
#[derive(Clone, Default)]
pub struct Tensor {
    shape: TVec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// A zero-filled tensor. `shape` is the logical shape, 1 to 3 axes, all
    /// extents positive.
    pub fn zeros(shape: &[usize]) -> Tensor {
        assert!(
            (1..=3).contains(&shape.len()),
            "tensor rank must be 1, 2 or 3, got {:?}",
            shape
        );
        assert!(shape.iter().all(|&d| d > 0), "tensor extents must be positive, got {:?}", shape);
        Tensor { shape: shape.iter().copied().collect(), data: vec![0.0; shape.iter().product()] }
    }

    /// Builds a tensor over an explicit flat value sequence, column-major
    /// within each channel plane.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Tensor {
        let mut t = Tensor::zeros(shape);
        assert!(
            data.len() == t.len(),
            "buffer length {} does not match shape {:?}",
            data.len(),
            shape
        );
        t.data = data;
        t
    }

    /// The logical shape as declared at construction.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of logical axes (1, 2 or 3). Zero for the empty tensor.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Storage extents (channels, rows, cols), missing leading axes padded
    /// with 1.
    pub fn chw(&self) -> (usize, usize, usize) {
        match *self.shape {
            [c, r, w] => (c, r, w),
            [r, w] => (1, r, w),
            [n] => (1, 1, n),
            _ => (0, 0, 0),
        }
    }

    pub fn channels(&self) -> usize {
        self.chw().0
    }

    pub fn rows(&self) -> usize {
        self.chw().1
    }

    pub fn cols(&self) -> usize {
        self.chw().2
    }

    /// Elements in one channel plane.
    pub fn plane_len(&self) -> usize {
        let (_, r, w) = self.chw();
        r * w
    }

    /// Shape equality over the padded storage extents: two tensors compare
    /// shape-equal iff channel, row and column extents all match.
    pub fn same_shape(&self, other: &Tensor) -> bool {
        self.chw() == other.chw()
    }

    /// Element at flat index `i` in storage order.
    pub fn index(&self, i: usize) -> f32 {
        self.data[i]
    }

    pub fn index_mut(&mut self, i: usize) -> &mut f32 {
        &mut self.data[i]
    }

    /// Element at (channel, row, col).
    pub fn at(&self, c: usize, r: usize, w: usize) -> f32 {
        self.data[self.offset_of(c, r, w)]
    }

    pub fn at_mut(&mut self, c: usize, r: usize, w: usize) -> &mut f32 {
        let i = self.offset_of(c, r, w);
        &mut self.data[i]
    }

    fn offset_of(&self, c: usize, r: usize, w: usize) -> usize {
        let (_, rows, cols) = self.chw();
        debug_assert!(r < rows && w < cols);
        c * rows * cols + w * rows + r
    }

    /// The whole buffer in storage order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Read-only view of one channel plane, no copy.
    pub fn slice(&self, c: usize) -> ArrayView2<'_, f32> {
        let (rows, cols) = (self.rows(), self.cols());
        let plane = rows * cols;
        ArrayView2::from_shape((rows, cols).f(), &self.data[c * plane..(c + 1) * plane]).unwrap()
    }

    /// Mutable view of one channel plane, no copy.
    pub fn slice_mut(&mut self, c: usize) -> ArrayViewMut2<'_, f32> {
        let (rows, cols) = (self.rows(), self.cols());
        let plane = rows * cols;
        ArrayViewMut2::from_shape((rows, cols).f(), &mut self.data[c * plane..(c + 1) * plane])
            .unwrap()
    }

    /// 3-D view over the padded extents.
    pub fn view(&self) -> ArrayView3<'_, f32> {
        let (c, r, w) = self.chw();
        ArrayView3::from_shape((c, r, w).strides((r * w, 1, r)), &self.data).unwrap()
    }

    pub fn fill(&mut self, value: f32) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Overwrites the buffer with `values`, which must have exactly the
    /// tensor's length, in storage order.
    pub fn fill_slice(&mut self, values: &[f32]) {
        assert!(
            values.len() == self.data.len(),
            "fill of {} values into a tensor of {}",
            values.len(),
            self.data.len()
        );
        self.data.copy_from_slice(values);
    }

    /// Standard-normal fill, for tests and benchmarks.
    pub fn rand_normal(&mut self) {
        let mut rng = rand::thread_rng();
        for v in &mut self.data {
            *v = rng.sample(StandardNormal);
        }
    }

    /// Approximate content equality: same storage extents and every pair of
    /// elements within `tol` absolute difference.
    pub fn approx_eq(&self, other: &Tensor, tol: f32) -> bool {
        self.same_shape(other)
            && self.data.iter().zip_eq(other.data.iter()).all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: Vec<f32> = self.data.iter().take(8).copied().collect();
        write!(f, "Tensor{:?} {:?}", &*self.shape, preview)?;
        if self.data.len() > 8 {
            write!(f, "…")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linearization_is_column_major_within_planes() {
        let mut t = Tensor::zeros(&[2, 3, 4]);
        *t.at_mut(1, 2, 3) = 7.0;
        // c * rows * cols + col * rows + row
        assert_eq!(t.index(1 * 12 + 3 * 3 + 2), 7.0);
        *t.index_mut(0) = 1.5;
        assert_eq!(t.at(0, 0, 0), 1.5);
    }

    #[test]
    fn rank_degrades_leading_extents_to_one() {
        let v = Tensor::zeros(&[5]);
        assert_eq!(v.rank(), 1);
        assert_eq!(v.chw(), (1, 1, 5));
        let m = Tensor::zeros(&[2, 3]);
        assert_eq!(m.rank(), 2);
        assert_eq!(m.chw(), (1, 2, 3));
        let c = Tensor::zeros(&[1, 2, 3]);
        assert_eq!(c.rank(), 3);
        assert_eq!(c.chw(), (1, 2, 3));
        // the rank-2 matrix and the single-channel cube share extents but
        // keep their declared ranks
        assert!(m.same_shape(&c));
        assert_ne!(m.rank(), c.rank());
    }

    #[test]
    fn plane_views_are_column_major() {
        let t = Tensor::from_vec(&[1, 2, 3], vec![1., 2., 3., 4., 5., 6.]);
        let s = t.slice(0);
        // columns are contiguous: (row, col) -> data[col * rows + row]
        assert_eq!(s[(0, 0)], 1.);
        assert_eq!(s[(1, 0)], 2.);
        assert_eq!(s[(0, 1)], 3.);
        assert_eq!(s[(1, 2)], 6.);
    }

    #[test]
    fn view3_matches_component_indexing() {
        let mut t = Tensor::zeros(&[2, 2, 2]);
        t.rand_normal();
        let v = t.view();
        for c in 0..2 {
            for r in 0..2 {
                for w in 0..2 {
                    assert_abs_diff_eq!(v[(c, r, w)], t.at(c, r, w));
                }
            }
        }
    }

    #[test]
    fn fill_and_approx_eq() {
        let mut a = Tensor::zeros(&[2, 2]);
        let mut b = Tensor::zeros(&[2, 2]);
        a.fill(1.0);
        b.fill_slice(&[1.0, 1.0 + 1e-4, 1.0, 1.0]);
        assert!(a.approx_eq(&b, 1e-3));
        assert!(!a.approx_eq(&b, 1e-5));
        assert!(!a.approx_eq(&Tensor::zeros(&[4]), 1.0));
    }

    #[test]
    fn default_tensor_is_empty() {
        let t = Tensor::default();
        assert!(t.is_empty());
        assert_eq!(t.rank(), 0);
    }

    #[test]
    #[should_panic]
    fn zero_extent_rejected() {
        Tensor::zeros(&[0, 2]);
    }
}
