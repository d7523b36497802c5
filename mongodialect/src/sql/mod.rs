//! The relational statement model handed to us by the upstream ORM engine.
//!
//! This is a closed set of node kinds: the engine only ever produces these
//! shapes, so the translators dispatch over them with plain pattern matching.
//! Joins are resolved upstream into nested field paths before translation,
//! which is why there is no join node here.

mod definitions;

pub use definitions::*;
