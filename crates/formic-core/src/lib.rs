//! formic-core - Form data model
//!
//! Path-addressed value trees for the formic form-state engine:
//! field paths, dynamically shaped values, and immutable snapshots.

mod path;
mod snapshot;
mod value;

pub use path::{Path, PathError, Segment};
pub use snapshot::FormSnapshot;
pub use value::FormValue;
