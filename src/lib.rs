//! forum-sync - Realtime client synchronization for the Q&A forum
//!
//! This crate keeps a client-local view of forum questions and answers
//! consistent across sessions by reconciling two independent sources:
//!
//! - **Pull**: the forum REST API, fetched on demand and authoritative
//!   for whatever it returns.
//! - **Push**: one WebSocket connection over which the server broadcasts
//!   `new_question` / `new_answer` events to every client.
//!
//! Both sources write into a shared [`snapshot`](crate::snapshot), whose
//! operations are idempotent and commute, so pull and push never need to
//! coordinate. The display order is recomputed from the snapshot on every
//! read. Mutations go out through the [`dispatch`](crate::dispatch)
//! module and come back in through the push echo, with a bounded-window
//! pull fallback when the echo goes missing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forum_sync::{ForumClient, SyncConfig};
//!
//! # async fn run() -> Result<(), forum_sync::SyncError> {
//! let config = SyncConfig::new("http://localhost:8000")?;
//! let (client, mut notifications) = ForumClient::connect(config).await?;
//!
//! client.submit_question("Is the cafeteria open today?").await?;
//! while let Some(event) = notifications.recv().await {
//!     println!("{event:?}");
//!     for question in client.questions() {
//!         println!("[{}] {}", question.status, question.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Wire-faithful data types
pub mod models;

// Configuration
pub mod config;

// The shared client-local snapshot
pub mod snapshot;

// Deterministic display ordering
pub mod ordering;

// REST client (pull + mutations + auth)
pub mod rest;

// Pull synchronization
pub mod sync;

// Push listener (WebSocket)
pub mod push;

// Mutation dispatch with echo confirmation
pub mod dispatch;

// Transient notifications
pub mod notify;

// The owning facade
pub mod client;

// Public re-exports for the common path
pub use client::ForumClient;
pub use config::SyncConfig;
pub use error::SyncError;
pub use models::{Answer, AnswerId, PushEvent, Question, QuestionId, QuestionStatus, Token};
pub use notify::Notification;
pub use push::ConnectionState;
pub use rest::{ForumApi, ForumBackend};
pub use snapshot::{SnapshotCache, SnapshotView};
