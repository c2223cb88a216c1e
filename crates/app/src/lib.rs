pub use driver::*;

mod driver;
