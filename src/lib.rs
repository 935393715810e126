#[macro_use]
extern crate lazy_static;

pub mod array;
pub mod background;
pub mod binding;
pub mod constants;
pub mod convert;
pub mod error;
pub mod format;
pub mod harness;

pub use crate::array::{Element, NdArray};
pub use crate::error::{Error, Result};
