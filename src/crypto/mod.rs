//! Cipher parameter validation and the symmetric cipher engine.

pub mod engine;
pub mod validate;

pub use engine::{process, Direction};
pub use validate::validate;
