//! The contribution this dialect makes to the upstream engine's query-plan
//! cache: a key under which a finished translation can be reused.
//!
//! Two translations are cache-equivalent exactly when they render identical
//! pipeline stages modulo bound parameter values. Runtime limit/offset
//! render as placeholders, so changing only a bound value leaves the key
//! unchanged, while adding or removing a limit/offset changes it.

use crate::{options::QueryOptions, Translation};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    text: String,
    limit_set: bool,
    offset_set: bool,
}

impl PlanKey {
    pub fn new(translation: &Translation, options: &QueryOptions) -> Self {
        Self {
            text: translation.text.clone(),
            limit_set: options.limit.is_some(),
            offset_set: options.offset.is_some(),
        }
    }
}
