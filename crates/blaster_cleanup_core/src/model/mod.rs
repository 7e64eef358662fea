//! Value types shared by the migration, repair and run layers.

mod kind;
mod mode;

pub use kind::DatabaseKind;
pub use mode::{Mode, ParseModeError};
