//! The target MQL model: an immutable node hierarchy for the commands we
//! emit (aggregate pipelines and insert/update/delete specifications).
//!
//! Every node renders itself to BSON deterministically; commands also render
//! to the relaxed-extended-JSON text consumed by the JDBC facade. Rendering
//! never fails for a well-formed node, so the render methods are infallible.

mod definitions;
mod render;

#[cfg(test)]
mod test;

pub use definitions::*;
pub use render::placeholder_count;
