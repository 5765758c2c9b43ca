//! # Helpdesk Core
//!
//! The ticket lifecycle engine: everything that decides whether a change to a
//! support ticket is allowed and what that change implies.
//!
//! This crate is the functional core of the helpdesk. It performs no I/O:
//! persistence, notification delivery, blob storage and identity are
//! collaborators owned by the runtime and web crates.
//!
//! ## Core Concepts
//!
//! - **Role**: closed set of actor roles (`author`, `support`, `admin`) derived
//!   from configuration, never from client input
//! - **Ticket**: the state the lifecycle reducer operates on
//! - **Action**: every requested change to a ticket (status change, assignment,
//!   urgency toggle, edit, message, attachment)
//! - **Reducer**: `(Ticket, Action, Environment) → Result<Effects, TicketError>`
//! - **Effect**: descriptions of what must happen as a consequence (append a
//!   message, persist an attachment, notify someone). The runtime executes them.
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_core::lifecycle::{TicketAction, TicketLifecycleReducer, LifecycleEnvironment};
//! use helpdesk_core::reducer::Reducer;
//!
//! let reducer = TicketLifecycleReducer::new();
//! let effects = reducer.reduce(
//!     &mut ticket,
//!     TicketAction::ChangeStatus { actor, target: TicketStatus::OnPause },
//!     &env,
//! )?;
//! ```

pub mod access;
pub mod attachment;
pub mod conversation;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod numbering;
pub mod role;
pub mod status;
pub mod ticket;
pub mod types;
pub mod user;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

pub use error::{ErrorKind, TicketError};
pub use role::{Role, RoleDirectory, SenderRole};
pub use status::TicketStatus;
pub use ticket::{Ticket, TicketDraft, TicketPatch};
pub use types::{AttachmentId, ExternalId, MessageId, TicketId, UserId};
pub use user::{Actor, User};

/// Reducer module - the trait every state machine in the helpdesk implements
///
/// Reducers validate an action against the current state, mutate the state in
/// place when the action is accepted, and describe the consequences as effects.
/// A rejected action leaves the state untouched and yields an error instead.
pub mod reducer {
    use crate::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Error`: Why an action was rejected
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// The rejection type
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations must not mutate `state` when they return `Err`.
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is not allowed for the
        /// current state.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Effect; 4]>, Self::Error>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are NOT executed by the reducer. The registry in the runtime crate
/// splits them in two groups: effects that belong to the same atomic unit as
/// the ticket change (`AppendMessage`, `AttachFile`) and effects that run only
/// after commit (`Notify`).
pub mod effect {
    use crate::attachment::NewAttachment;
    use crate::conversation::NewMessage;
    use crate::events::TicketEvent;

    /// Effect type - describes a side effect to be executed
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Effect {
        /// No-op effect
        None,

        /// Append an entry to the ticket's conversation log
        AppendMessage(NewMessage),

        /// Persist a ticket-level attachment record
        AttachFile(NewAttachment),

        /// Hand an event to the notification dispatcher once committed
        Notify(TicketEvent),
    }
}

/// Environment module - dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock used in production
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
