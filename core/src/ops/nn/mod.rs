//! Activation operators and spatial resize.

pub mod upsample;
pub use upsample::{Upsample, UpsampleMode};

use crate::element_wise;
use crate::internal::*;
use derive_new::new;

element_wise!(relu, Relu, |_, xs, ys| {
    for (x, y) in xs.iter().zip(ys.iter_mut()) {
        *y = x.max(0.0);
    }
});

element_wise!(sigmoid, Sigmoid, |_, xs, ys| {
    for (x, y) in xs.iter().zip(ys.iter_mut()) {
        *y = 1.0 / (1.0 + (-x).exp());
    }
});

element_wise!(leaky_relu, LeakyRelu { slope: f32 }, |op, xs, ys| {
    for (x, y) in xs.iter().zip(ys.iter_mut()) {
        *y = if *x >= 0.0 { *x } else { *x * op.slope };
    }
});

pub fn register(reg: &mut OpRegistry) {
    reg.register("nn.ReLU", |_| Ok(Box::new(relu())));
    reg.register("nn.Sigmoid", |_| Ok(Box::new(sigmoid())));
    reg.register("nn.LeakyRelu", |record| {
        let slope = record.param_float("negative_slope")?;
        Ok(Box::new(leaky_relu(slope)))
    });
    upsample::register(reg);
}
