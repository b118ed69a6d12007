//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PaperState`: where each paper id stands in the breadth-first walk
//! - `Registry`: the paper arena and the pending citation index

mod paper_state;
mod registry;

// Re-export main types
pub use paper_state::PaperState;
pub use registry::{PaperEntry, Registry};
