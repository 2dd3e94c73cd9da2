mod planner;
mod recorder;

pub use planner::*;
pub use recorder::*;
