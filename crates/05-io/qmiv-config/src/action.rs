use crate::error::ConfigError;

/// Tri-modal recovery policy shared by `InvalidPelActn` and
/// `NameMismatchActn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PelAction {
    Conceal,
    Warn,
    Abort,
}

impl PelAction {
    pub(crate) fn parse(field: &'static str, raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_uppercase().as_str() {
            "CONCEAL" => Ok(Self::Conceal),
            "WARN" => Ok(Self::Warn),
            "ABORT" => Ok(Self::Abort),
            other => Err(ConfigError::InvalidField {
                field,
                reason: format!("expected CONCEAL/WARN/ABORT, got '{other}'"),
            }),
        }
    }
}
