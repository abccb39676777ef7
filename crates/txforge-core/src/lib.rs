//! Core pipeline: turns contract templates and DeFi intents into ordered,
//! encoded transaction steps stored as signing sessions.
//!
//! ```text
//! validate ─┬─> template ──> compiler ──> abi ─┐
//!           └─> planner ───> steps ───────────┴─> session ──> store
//! ```

pub mod abi;
pub mod compiler;
pub mod error;
pub mod forge;
pub mod planner;
pub mod session;
pub mod store;
pub mod template;
pub mod validate;

pub use error::{Error, ErrorKind, Result};
pub use forge::{Forge, SessionTicket};
