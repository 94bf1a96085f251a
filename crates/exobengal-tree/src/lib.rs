pub mod decision_tree;
pub mod random_forest;
pub mod grid_search;

pub use decision_tree::*;
pub use random_forest::*;
pub use grid_search::*;
