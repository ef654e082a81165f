//! Core of the Glint shading-language compiler.
//!
//! This crate holds the typed, arena-backed IR and the passes that rewrite
//! it. The parser, type checker, and code generators live with the host
//! driver; what ships here is the part between them — most prominently the
//! function-call inliner, which rewrites call expressions nested anywhere
//! inside a statement into straight-line statement sequences without
//! relying on expression-level sequencing or `goto`.

pub mod analysis;
pub mod context;
pub mod display;
pub mod inliner;
pub mod intern;
pub mod ir;

pub use context::{Caps, Context, Settings};
pub use inliner::Inliner;
