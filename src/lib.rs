//! Touchline - video license tracking for a training-drill library
//!
//! Each video carries exactly one license. A license is classified as
//! `active`, `expiring-soon` or `expired` against an injected clock, and a
//! sweep turns licenses that are about to lapse into admin notifications.
//!
//! # Features
//!
//! - `server` - HTTP API and sqlx-backed store. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `background-jobs` - In-process cron scheduler for the sweep.
//!
//! # Example
//!
//! ```toml
//! # Domain types and the in-memory store only
//! touchline = { path = "../touchline", default-features = false }
//!
//! # Server with PostgreSQL
//! touchline = { path = "../touchline", features = ["server", "postgres"] }
//! ```

pub mod clock;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod license;
pub mod notification;
pub mod presentation;
pub mod store;
pub mod video;

#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{TouchlineError, TouchlineResult};
pub use license::{classify, is_available, LicenseStatus, LicenseType, VideoLicense};
pub use notification::{Notification, NotificationStatus, NotificationType};
pub use store::{MemoryStore, NotificationStore, Store, VideoStore};
pub use video::{VideoContent, VideoFilter};
