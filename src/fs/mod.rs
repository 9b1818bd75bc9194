pub mod local;
pub mod path_utils;
pub mod types;

pub use local::LocalFs;
pub use types::*;
