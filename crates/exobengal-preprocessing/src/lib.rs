pub mod scaler;
pub mod preprocessor;
pub mod split;

pub use scaler::*;
pub use preprocessor::*;
pub use split::*;
