//! Data models

pub mod analysis;
pub mod assessment;
pub mod vote;

pub use analysis::*;
pub use assessment::*;
pub use vote::*;
