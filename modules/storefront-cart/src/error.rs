use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("cart snapshot missing required field: {0}")]
    MissingField(&'static str),
}
