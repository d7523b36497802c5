pub mod unique_field_map;

pub use unique_field_map::{DuplicateFieldError, UniqueFieldMap};
