use thiserror::Error;

/// Convenience result alias for fallible color-space conversions.
pub type ColorResult<T> = Result<T, ColorError>;

#[derive(Debug, Error)]
pub enum ColorError {
    #[error("color conversion requires 3 components, picture has {0}")]
    ComponentCountMismatch(usize),
}
