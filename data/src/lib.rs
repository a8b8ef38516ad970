//! Tensor container and small-vector plumbing shared by the quiver runtime
//! crates.

#[macro_use]
mod macros;

/// A SmallVec instantiation with 4 embeddable values.
///
/// Used for node inputs and outputs, and for tensor shapes, which never
/// exceed three axes.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub mod tensor;

pub mod prelude {
    pub use crate::TVec;
    pub use crate::tensor::Tensor;
    pub use crate::tvec;
}
