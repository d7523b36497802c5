use crate::{jdbc, translator};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("translation error: {0}")]
    Translate(#[from] translator::Error),
    #[error("jdbc error: {0}")]
    Jdbc(#[from] jdbc::Error),
}
