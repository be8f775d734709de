pub mod common;
pub mod refs;
pub mod rewrite;
