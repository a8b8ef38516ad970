//! Prelude for the crate's own modules and for operator implementors.

pub use crate::error::{InferError, InferResult};
pub use crate::ops::Op;
pub use crate::record::{OpRecord, ParamValue};
pub use crate::registry::OpRegistry;
pub use quiver_data::prelude::*;
pub use std::borrow::Cow;
pub use std::collections::HashMap;
