mod error;
pub mod property;
mod rlreplay;
pub mod stats;
pub mod text;
pub mod types;

#[cfg(test)]
mod test_util;

pub use error::*;
pub use property::{
    MAX_NESTING_DEPTH, Property, PropertyType, PropertyValue, PropertyValueKind, find_property,
};
pub use rlreplay::*;
pub use strum;
