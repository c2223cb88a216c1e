pub use ring_buffer::*;
pub use safe_error::*;

pub mod ring_buffer;
pub mod safe_error;
