//! Report module - binning table and JSON export

pub mod export;
pub mod table;

pub use export::*;
pub use table::*;
