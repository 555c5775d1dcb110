//! Repository layer — entity-scoped database operations.
//!
//! Plain CRUD and count queries over `&Connection`. View-shaped queries
//! (joins, derivations) live with their domain modules.

mod appointment;
mod identity;
mod patient;
mod record;
mod visit;

pub use appointment::*;
pub use identity::*;
pub use patient::*;
pub use record::*;
pub use visit::*;
