//! Error types for report generation and configuration.

use thiserror::Error;

use crate::validation::ValidationError;

/// Failure while turning a payload into PDF bytes.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The payload failed structural validation; nothing was rendered.
    #[error("invalid service record: {0}")]
    Validation(#[from] ValidationError),

    /// No usable font family could be loaded.
    #[error("failed to load fonts: {0}")]
    FontLoad(#[source] genpdf::error::Error),

    /// genpdf failed while laying out or writing the document.
    #[error("failed to render report: {0}")]
    Render(#[source] genpdf::error::Error),

    /// The outline could not be embedded into the rendered document.
    #[cfg(feature = "bookmarks")]
    #[error("failed to embed bookmarks: {0}")]
    Bookmarks(#[from] crate::bookmarks::BookmarkError),
}

impl ReportError {
    /// Returns the validation error when the input itself was at fault.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed or a value had the wrong type.
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    /// Values parsed but are out of range.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}
