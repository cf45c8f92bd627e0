//! Cursor-paginated collection of one user's notes.
//!
//! The flow is strictly sequential: resolve the user, request pages of notes
//! older than the last one seen until a page comes back empty, then write the
//! accumulated list out once.
//!
//! - [`NoteSource`]: the two API calls the collector needs
//! - [`Collector`]: page stream plus the drain-everything helper
//! - [`persist`]: JSON array output
pub mod collector;
pub mod persist;
pub mod source;

pub use collector::{CollectOptions, Collector};
pub use persist::write_notes;
pub use source::{NoteSource, PageQuery};
