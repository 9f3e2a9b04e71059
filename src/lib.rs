//! Medical-transport service records and their PDF reports.
//!
//! A record is collected through [`form::FormInput`] or received as a JSON
//! payload, validated into a [`record::ServiceRecord`], laid out as a
//! [`report::Report`] and rendered to PDF bytes by [`render::render_record`].

pub mod builder;
pub mod config;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod form;
pub mod record;
pub mod render;
pub mod report;
pub mod validation;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use config::Config;
pub use error::{ConfigError, ReportError};
pub use form::{FormField, FormInput, FormSection};
pub use record::ServiceRecord;
pub use render::{
    render_payload, render_record, RenderOptions, RenderedReport, ReportRenderer, PDF_MIME_TYPE,
};
pub use report::{Locale, Report};
pub use validation::{ValidationError, ValidationErrorKind};

#[cfg(feature = "bookmarks")]
pub use render::render_record_with_bookmarks;
