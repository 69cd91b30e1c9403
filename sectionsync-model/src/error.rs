use std::fmt::{self, Display};

/// Errors produced by model constructors and parsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A section key did not match any compiled-in section.
    UnknownSection(String),
    /// A section family name was not recognised.
    UnknownFamily(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownSection(key) => {
                write!(f, "unknown section: {key}")
            }
            ModelError::UnknownFamily(name) => {
                write!(f, "unknown section family: {name}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
