pub mod common;
pub mod generation;
pub mod result;
pub mod storage;

pub use common::*;
pub use generation::*;
pub use result::*;
pub use storage::*;
