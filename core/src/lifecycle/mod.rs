//! Ticket lifecycle: the status state machine and everything it implies.
//!
//! # Architecture
//!
//! ```text
//! (actor, ticket_id, change) → TicketRegistry
//!                 ↓
//!                 loads Ticket, builds TicketAction
//!                 ↓
//! TicketLifecycleReducer validates (table, role, access) and mutates Ticket
//!                 ↓
//!                 returns effects: AppendMessage / AttachFile / Notify
//!                 ↓
//! Registry persists ticket + transactional effects atomically,
//! then hands Notify effects to the dispatcher
//! ```
//!
//! The reducer never touches state on a rejected action, so the registry can
//! run it directly against the row it holds locked.

pub mod actions;
pub mod environment;
pub mod policy;
pub mod reducer;

pub use actions::TicketAction;
pub use environment::{LifecycleEnvironment, ProductionLifecycleEnvironment};
pub use reducer::TicketLifecycleReducer;
