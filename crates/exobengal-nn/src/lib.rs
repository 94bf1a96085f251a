pub mod layers;
pub mod sequential;
pub mod mlp;

pub use layers::*;
pub use sequential::*;
pub use mlp::{EpochStats, Mlp, MlpConfig};
