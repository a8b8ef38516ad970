//! Operator registry: type tag → constructor.
//!
//! Registration is an explicit setup step: build a registry once with
//! [`OpRegistry::with_builtins`] (optionally extend it), then share it
//! read-only across graph builds. Nothing registers itself at load time.

use crate::internal::*;

/// Builds a configured operator instance from its record.
pub type OpBuilder = fn(&OpRecord) -> InferResult<Box<dyn Op>>;

#[derive(Default)]
pub struct OpRegistry {
    builders: HashMap<&'static str, OpBuilder>,
}

impl OpRegistry {
    pub fn new() -> OpRegistry {
        OpRegistry::default()
    }

    /// A registry holding every built-in operator.
    pub fn with_builtins() -> OpRegistry {
        let mut reg = OpRegistry::new();
        crate::ops::register_builtins(&mut reg);
        reg
    }

    pub fn register(&mut self, tag: &'static str, builder: OpBuilder) {
        if self.builders.insert(tag, builder).is_some() {
            log::warn!("operator type {tag} registered twice, keeping the last builder");
        }
    }

    /// Registers one builder under several naming variants. Different model
    /// export paths tag the same operator differently.
    pub fn register_aliases(&mut self, tags: &[&'static str], builder: OpBuilder) {
        for tag in tags {
            self.register(tag, builder);
        }
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.builders.contains_key(tag)
    }

    /// Resolves a record's type tag and runs the builder. An unknown tag is a
    /// hard error, never a fallback.
    pub fn build(&self, record: &OpRecord) -> InferResult<Box<dyn Op>> {
        match self.builders.get(record.ty.as_str()) {
            Some(builder) => builder(record),
            None => Err(InferError::UnknownOperatorType(format!(
                "{} (operator {})",
                record.ty, record.name
            ))),
        }
    }
}
