//! Repository layer — entity-scoped database operations.
//!
//! Entity sub-modules; all public functions are re-exported here.

mod action;
mod approval;
mod audit;
mod incident;
mod indicator;
mod risk;
mod staff;

pub use action::*;
pub use approval::*;
pub use audit::*;
pub use incident::*;
pub use indicator::*;
pub use risk::*;
pub use staff::*;
