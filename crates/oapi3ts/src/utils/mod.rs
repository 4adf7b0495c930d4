pub mod refs;
pub mod spec;
pub mod text;
