pub mod config;
pub mod engine;
pub mod error;
pub mod facts;
pub mod rule;
pub mod rules;
pub mod text;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use facts::*;
pub use rule::*;
