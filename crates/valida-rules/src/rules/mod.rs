pub mod activities;
pub mod dates;
pub mod forums;
pub mod gradebook;
pub mod labels;
pub mod syllabus;

#[cfg(test)]
pub(crate) mod fixtures;

pub use activities::*;
pub use dates::*;
pub use forums::*;
pub use gradebook::*;
pub use labels::*;
pub use syllabus::*;
