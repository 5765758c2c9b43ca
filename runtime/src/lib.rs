//! # Helpdesk Runtime
//!
//! The imperative shell around the ticket lifecycle engine.
//!
//! ## Core Components
//!
//! - **`TicketRegistry`**: the externally visible ticket operations. It loads
//!   a ticket under lock, runs the lifecycle reducer, persists the result in
//!   one unit and hands events to the dispatcher after commit
//! - **`HelpdeskStore`**: persistence seam, with [`InMemoryStore`] for tests
//!   and local runs (`helpdesk-postgres` provides the durable one)
//! - **`BlobStore`**: attachment bytes, with [`FsBlobStore`] on local disk
//! - **`NotificationDispatcher`**: fire-and-forget delivery through a
//!   [`NotificationSink`]
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_runtime::{InMemoryStore, FsBlobStore, NotificationDispatcher, TicketRegistry};
//!
//! let registry = TicketRegistry::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(FsBlobStore::new("uploads")),
//!     NotificationDispatcher::disabled(),
//!     Arc::new(SystemClock),
//!     AttachmentPolicy::default(),
//! );
//!
//! let ticket = registry.create(&actor, draft).await?;
//! let ticket = registry.assign(&support, ticket.id).await?;
//! ```

pub mod blob;
pub mod memory;
pub mod metrics;
pub mod notify;
pub mod registry;
pub mod store;
pub mod views;

pub use blob::{BlobError, BlobStore, FsBlobStore};
pub use memory::InMemoryStore;
pub use notify::{
    DispatchError, LogSink, Notification, NotificationDispatcher, NotificationSink, SinkError,
    TelegramSink,
};
pub use registry::{TicketRegistry, Upload, load_actor};
pub use store::{Changes, Committed, HelpdeskStore, StoreError, TicketMutation, UserUpsert};
pub use views::{MessageView, TicketView};
