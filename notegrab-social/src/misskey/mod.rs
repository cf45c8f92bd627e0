//! Misskey API integration surface.
//!
//! `client` wraps the two endpoints the collector needs
//! (`users/search-by-username-and-host` and `users/notes`), and `types` holds
//! the request bodies plus pass-through response models.
pub mod client;
pub mod types;

pub use client::{MisskeyApi, TokenPlacement};
pub use types::{Note, NoteId, UserId, UserSummary};
