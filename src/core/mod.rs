pub mod constraints;
pub mod types;

pub use constraints::{EPSILON, validate};
pub use types::*;
