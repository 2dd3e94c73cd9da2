pub mod changes;
pub mod check;
pub mod ids;
pub mod model;
pub mod types;

pub use changes::*;
pub use check::*;
pub use ids::*;
pub use model::*;
pub use types::*;
