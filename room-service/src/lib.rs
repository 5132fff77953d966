//! Room Service
//!
//! Ties the ledger store, settlement engine and fan-out together behind the
//! operations clients call: recording and deleting entries, joining rooms,
//! reading room state and subscribing to live updates.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{EntryKind, NewEntry, ParticipantId};
//! use room_service::{RoomService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> room_service::Result<()> {
//!     let service = RoomService::from_config(&ServiceConfig::from_env()?)?;
//!     let (alice, bob) = (ParticipantId::generate(), ParticipantId::generate());
//!
//!     let room = service.create_room("flat-share", alice).await?;
//!     service.join_room(room.room_id, bob).await?;
//!
//!     let outcome = service
//!         .create_entry(room.room_id, alice, EntryKind::Expense, NewEntry::new(bob, alice, 4200))
//!         .await?;
//!     println!("{} transfers settle the room", outcome.snapshot.len());
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod service;

// Re-exports
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use service::{CommittedChange, MutationOutcome, RoomService, RoomState};
