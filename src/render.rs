//! Turns service records into PDF bytes.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use genpdf::elements::Paragraph;
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Margins};
use log::debug;

use crate::builder::{DocumentBuilder, PageTracker};
use crate::config::{Paper, ReportConfig};
use crate::elements::{mm_from_pt, section_block, title_block, SectionAnchor, SectionPages};
use crate::error::ReportError;
use crate::fonts;
use crate::record::ServiceRecord;
use crate::report::{Locale, Report};

/// MIME type of the rendered document.
pub const PDF_MIME_TYPE: &str = "application/pdf";

const BODY_FONT_SIZE: u8 = 10;
const FOOTER_FONT_SIZE: u8 = 8;
const FOOTER_HEIGHT_PT: f64 = 18.0;

/// Knobs for a single render.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// Language of titles and labels.
    pub locale: Locale,
    /// Font directory searched before the defaults.
    pub fonts_dir: Option<PathBuf>,
    /// Paper format.
    pub paper: Paper,
    /// Margin on every side, in points.
    pub margin_pt: f64,
    /// Print "Page N" in a footer.
    pub page_numbers: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for RenderOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            locale: config.locale,
            fonts_dir: config.fonts_dir.clone(),
            paper: config.paper,
            margin_pt: config.margin_pt,
            page_numbers: config.page_numbers,
        }
    }
}

impl RenderOptions {
    /// Same options with another locale.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

/// Output of a successful render.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    /// Complete PDF document.
    pub bytes: Vec<u8>,
    /// Suggested download name.
    pub filename: &'static str,
    /// First page of each section in report order, `None` if never placed.
    pub section_pages: Vec<Option<usize>>,
}

impl RenderedReport {
    /// MIME type of [`RenderedReport::bytes`].
    pub fn mime_type(&self) -> &'static str {
        PDF_MIME_TYPE
    }
}

/// Renders reports with fixed options, reading the font files only once.
///
/// The first render (or [`ReportRenderer::preload`]) loads the family; later
/// renders clone it. Safe to share between threads.
pub struct ReportRenderer {
    options: RenderOptions,
    fonts: Mutex<Option<FontFamily<FontData>>>,
}

impl ReportRenderer {
    /// Creates a renderer; no font is read yet.
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            fonts: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Loads the font family now instead of on the first render.
    pub fn preload(&self) -> Result<(), ReportError> {
        self.font_family().map(drop)
    }

    /// Whether the font family has been loaded.
    pub fn fonts_loaded(&self) -> bool {
        self.fonts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Lays out `record` and writes it as a PDF.
    pub fn render_record(&self, record: &ServiceRecord) -> Result<RenderedReport, ReportError> {
        let report = Report::from_record(record, self.options.locale);
        render_report(&report, &self.options, self.font_family()?)
    }

    /// Validates a JSON payload and renders it.
    ///
    /// Nothing is laid out when validation fails.
    pub fn render_payload(&self, json: &[u8]) -> Result<RenderedReport, ReportError> {
        let record = ServiceRecord::from_json(json)?;
        self.render_record(&record)
    }

    /// Renders `record` and adds an outline entry for every section.
    #[cfg(feature = "bookmarks")]
    pub fn render_record_with_bookmarks(
        &self,
        record: &ServiceRecord,
    ) -> Result<RenderedReport, ReportError> {
        let report = Report::from_record(record, self.options.locale);
        let mut rendered = render_report(&report, &self.options, self.font_family()?)?;
        rendered.bytes = crate::bookmarks::apply_section_bookmarks(
            &rendered.bytes,
            report.sections(),
            &rendered.section_pages,
        )?;
        debug!("embedded outline for {} sections", report.sections().len());
        Ok(rendered)
    }

    fn font_family(&self) -> Result<FontFamily<FontData>, ReportError> {
        let mut cached = self.fonts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(family) = cached.as_ref() {
            return Ok(family.clone());
        }

        let family =
            fonts::font_family(self.options.fonts_dir.as_deref()).map_err(ReportError::FontLoad)?;
        debug!("loaded report fonts");
        *cached = Some(family.clone());
        Ok(family)
    }
}

/// Lays out `record` and writes it as a PDF.
///
/// Loads the fonts for this call only; use [`ReportRenderer`] to render many
/// records.
pub fn render_record(
    record: &ServiceRecord,
    options: &RenderOptions,
) -> Result<RenderedReport, ReportError> {
    ReportRenderer::new(options.clone()).render_record(record)
}

/// Validates a JSON payload and renders it.
///
/// Nothing is laid out when validation fails.
pub fn render_payload(json: &[u8], options: &RenderOptions) -> Result<RenderedReport, ReportError> {
    ReportRenderer::new(options.clone()).render_payload(json)
}

/// Renders `record` and adds an outline entry for every section.
#[cfg(feature = "bookmarks")]
pub fn render_record_with_bookmarks(
    record: &ServiceRecord,
    options: &RenderOptions,
) -> Result<RenderedReport, ReportError> {
    ReportRenderer::new(options.clone()).render_record_with_bookmarks(record)
}

fn render_report(
    report: &Report,
    options: &RenderOptions,
    font_family: FontFamily<FontData>,
) -> Result<RenderedReport, ReportError> {
    let tracker = PageTracker::new();
    let margin = mm_from_pt(options.margin_pt);
    let mut builder = DocumentBuilder::new()
        .with_title(report.title())
        .with_paper_size(genpdf::PaperSize::from(options.paper))
        .with_margins(Margins::trbl(margin, margin, margin, margin))
        .with_font_size(BODY_FONT_SIZE)
        .with_page_tracker(tracker.clone());

    if options.page_numbers {
        let label = report.locale().page_label();
        builder = builder.with_footer(mm_from_pt(FOOTER_HEIGHT_PT), move |page| {
            let style = Style::new().with_font_size(FOOTER_FONT_SIZE);
            Paragraph::new(StyledString::new(format!("{label} {page}"), style))
                .aligned(Alignment::Center)
        });
    }

    let mut document = builder.build(font_family);
    document.push(title_block(report.title()));

    let pages = SectionPages::with_sections(report.sections().len());
    for (index, section) in report.sections().iter().enumerate() {
        let block = section_block(section).map_err(ReportError::Render)?;
        document.push(SectionAnchor::new(block, index, tracker.clone(), pages.clone()));
    }

    let mut bytes = Vec::new();
    document.render(&mut bytes).map_err(ReportError::Render)?;

    debug!(
        "rendered {} report: {} bytes on {} page(s)",
        report.locale().code(),
        bytes.len(),
        tracker.current()
    );

    Ok(RenderedReport {
        bytes,
        filename: report.locale().report_filename(),
        section_pages: pages.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn options_follow_the_report_config() {
        let config = ReportConfig {
            locale: Locale::Portuguese,
            page_numbers: true,
            ..ReportConfig::default()
        };
        let options = RenderOptions::from(&config);
        assert_eq!(options.locale, Locale::Portuguese);
        assert!(options.page_numbers);
        assert_eq!(options.margin_pt, 36.0);
    }

    #[test]
    fn invalid_payload_is_rejected_before_rendering() {
        let options = RenderOptions {
            fonts_dir: Some(PathBuf::from("/__medreport_no_fonts__")),
            ..RenderOptions::default()
        };
        let err = render_payload(br#"{"date": "2024-01-01"}"#, &options).unwrap_err();
        let validation = err.as_validation().expect("validation error");
        assert_eq!(validation.field(), "time");
        assert!(matches!(validation.kind(), ValidationErrorKind::Missing));
    }

    #[test]
    fn invalid_payload_loads_no_fonts() {
        let renderer = ReportRenderer::new(RenderOptions::default());
        assert!(renderer.render_payload(b"{not json").is_err());
        assert!(!renderer.fonts_loaded());
    }

    #[test]
    fn fonts_are_loaded_once_and_reused() {
        if !fonts::fonts_available(None) {
            eprintln!("skipping fonts_are_loaded_once_and_reused: no usable fonts found");
            return;
        }

        let renderer = ReportRenderer::new(RenderOptions::default());
        renderer.preload().unwrap();
        assert!(renderer.fonts_loaded());

        let record = crate::record::sample_record();
        let first = renderer.render_record(&record).unwrap();
        let second = renderer.render_record(&record).unwrap();
        assert!(first.bytes.starts_with(b"%PDF"));
        assert_eq!(first.bytes.len(), second.bytes.len());
    }
}
