//! Value-level text transformations used by the cleaning rules.

pub mod sanitize;
pub mod string_ops;

pub use sanitize::sanitize;
