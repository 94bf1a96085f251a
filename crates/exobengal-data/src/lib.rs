pub mod dataset;
pub mod dataloader;

pub use dataset::*;
pub use dataloader::*;
