pub use pass::*;

pub mod pass;
