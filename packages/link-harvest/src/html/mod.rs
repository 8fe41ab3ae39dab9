//! HTML handling: link discovery and content normalization.

pub mod links;
pub mod normalize;

pub use links::{extract_links, extract_links_from};
pub use normalize::{normalize, strip_tags, truncate_chars};
