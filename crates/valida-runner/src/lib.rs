pub mod batch;
pub mod config;
pub mod report;
pub mod runner;
pub mod util;

pub use batch::*;
pub use config::*;
pub use runner::*;
pub use util::*;
