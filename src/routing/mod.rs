//! Request routing: slug extraction and mapping lookup.

pub mod resolver;

pub use resolver::{split_slug_path, ResolvedRoute, SlugPath, SlugResolver};
