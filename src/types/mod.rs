//! Data types for the sheet editor.

mod cell;
mod document;
mod range;
mod style;

pub use cell::*;
pub use document::*;
pub use range::*;
pub use style::*;
