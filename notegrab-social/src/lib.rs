//! Social network clients used by notegrab.
//!
//! Only the Misskey API is implemented. Pagination lives one layer up in
//! `notegrab-collect`; this crate issues single requests and decodes them.
pub mod misskey;
