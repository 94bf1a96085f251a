pub mod error;
pub mod table;
pub mod artifact;

pub use error::{IoError, IoResult};
pub use table::{read_table, read_table_from, Table};
pub use artifact::{load_json, save_json};
