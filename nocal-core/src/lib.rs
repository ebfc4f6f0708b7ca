//! Recurrence and invitation engine for nocal.
//!
//! Events are stored once and expanded into occurrences on demand. A single
//! occurrence of a series can be detached into its own event; invitations
//! track which members still have to confirm.
//!
//! - `calendar` is the operation surface used by the CLI
//! - `store` holds the document store trait and its adapters
//! - `maintenance` has the batch jobs that advance and clean up events

pub mod calendar;
pub mod config;
pub mod constants;
pub mod date_range;
pub mod error;
pub mod event;
pub mod invite;
pub mod maintenance;
pub mod occurrence;
pub mod repository;
pub mod store;

pub use calendar::Calendar;
pub use config::NocalConfig;
pub use date_range::parse_timestamp;
pub use error::{NocalError, NocalResult};
pub use event::{Event, EventEdit, EventKind, NewEvent, RegularEvent, SingleEvent, StoredEvent};
pub use invite::{Invite, InviteScope};
pub use maintenance::{BatchFailure, BatchReport, advance_due_recurrences, prune_orphaned_members};
pub use occurrence::{OccurrenceId, Window};
pub use repository::EventsRepository;
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError};
