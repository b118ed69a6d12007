//! Bibliographic records shared by every layer
//!
//! Papers and authors are plain values keyed by id. Citation edges are never
//! stored on the records themselves; they live as id pairs in the crawl
//! registry (see [`crate::state`]).

mod author;
mod paper;

pub use author::{normalize_name, Author};
pub use paper::{normalize_title, title_hash, Paper};
