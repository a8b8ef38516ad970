pub mod concat;
pub mod pixel_shuffle;

pub use concat::Concat;
pub use pixel_shuffle::{PixelShuffle, PixelUnshuffle};

use crate::registry::OpRegistry;

pub fn register(reg: &mut OpRegistry) {
    reg.register("torch.cat", Concat::from_record);
    reg.register_aliases(&["nn.PixelShuffle", "torch.PixelShuffle"], PixelShuffle::from_record);
    reg.register_aliases(
        &["nn.PixelUnshuffle", "torch.PixelUnshuffle"],
        PixelUnshuffle::from_record,
    );
}
