//! Report building blocks composed from `genpdf` primitives.
//!
//! The report is a title block followed by sections; every section is a
//! framed title bar on top of a two-column key/value table. genpdf wraps
//! paragraph text at the cell width, so long values never run past the
//! value column.

use std::cell::RefCell;
use std::rc::Rc;

use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, PaddedElement, Paragraph, TableLayout};
use genpdf::error::Error;
use genpdf::style::{Color, Style, StyledString};
use genpdf::{render, Alignment, Element, Margins, Mm, RenderResult};

use crate::builder::PageTracker;
use crate::report::{ReportRow, ReportSection};

/// Relative width of the label column (150 of 500 points).
const LABEL_COLUMN_WEIGHT: usize = 3;
/// Relative width of the value column (350 of 500 points).
const VALUE_COLUMN_WEIGHT: usize = 7;

const TITLE_FONT_SIZE: u8 = 16;
const SECTION_TITLE_FONT_SIZE: u8 = 11;
const WRAPPED_FONT_SIZE: u8 = 10;
/// 14 pt leading on 10 pt text.
const WRAPPED_LINE_SPACING: f64 = 1.4;

const CELL_PADDING_PT: f64 = 6.0;
const SECTION_TITLE_PADDING_PT: f64 = 8.0;

const SECTION_TITLE_COLOR: Color = Color::Rgb(64, 64, 64);

/// Converts typographic points to genpdf millimetres.
pub fn mm_from_pt(pt: f64) -> Mm {
    let mm: printpdf::Mm = printpdf::Pt(pt).into();
    Mm::from(mm)
}

fn padding(pt: f64) -> Margins {
    let mm = mm_from_pt(pt);
    Margins::trbl(mm, mm, mm, mm)
}

/// Centered bold report title followed by a blank line.
pub fn title_block(title: &str) -> LinearLayout {
    let style = Style::new().bold().with_font_size(TITLE_FONT_SIZE);
    LinearLayout::vertical()
        .element(Paragraph::new(StyledString::new(title.to_string(), style)).aligned(Alignment::Center))
        .element(Break::new(1.0))
}

/// Framed bar carrying a section heading.
pub fn section_title_bar(title: &str) -> Result<TableLayout, Error> {
    let style = Style::new()
        .bold()
        .with_font_size(SECTION_TITLE_FONT_SIZE)
        .with_color(SECTION_TITLE_COLOR);

    let mut bar = TableLayout::new(vec![1]);
    bar.set_cell_decorator(FrameCellDecorator::new(false, true, false));
    bar.row()
        .element(PaddedElement::new(
            Paragraph::new(StyledString::new(title.to_string(), style)),
            padding(SECTION_TITLE_PADDING_PT),
        ))
        .push()?;
    Ok(bar)
}

/// Two-column label/value table with grid borders.
#[derive(Default)]
pub struct KeyValueTable {
    rows: Vec<(String, Cell)>,
}

enum Cell {
    Text(String),
    Wrapped(String),
}

impl KeyValueTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table for every row of `section`.
    pub fn from_section(section: &ReportSection) -> Self {
        section
            .rows()
            .iter()
            .fold(Self::new(), |table, row| table.with_row(row))
    }

    /// Appends a report row, keeping its wrap flag.
    pub fn with_row(self, row: &ReportRow) -> Self {
        if row.is_wrapped() {
            self.with_wrapped(row.label(), row.value())
        } else {
            self.with_text(row.label(), row.value())
        }
    }

    /// Appends a single-paragraph value.
    pub fn with_text(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.rows.push((label.into(), Cell::Text(value.into())));
        self
    }

    /// Appends free text that keeps its own line breaks.
    pub fn with_wrapped(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.rows.push((label.into(), Cell::Wrapped(value.into())));
        self
    }

    /// Number of rows added so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were added.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lays the rows out as a genpdf table.
    pub fn into_layout(self) -> Result<TableLayout, Error> {
        let mut table = TableLayout::new(vec![LABEL_COLUMN_WEIGHT, VALUE_COLUMN_WEIGHT]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

        for (label, cell) in self.rows {
            let label = FittedParagraph::new(label, Style::new().bold());
            let value = match cell {
                Cell::Text(text) => {
                    LinearLayout::vertical().element(FittedParagraph::new(text, Style::new()))
                }
                Cell::Wrapped(text) => wrapped_text(&text),
            };

            table
                .row()
                .element(PaddedElement::new(label, padding(CELL_PADDING_PT)))
                .element(PaddedElement::new(value, padding(CELL_PADDING_PT)))
                .push()?;
        }

        Ok(table)
    }
}

/// One paragraph per input line; blank lines become vertical space.
fn wrapped_text(text: &str) -> LinearLayout {
    let style = Style::new()
        .with_font_size(WRAPPED_FONT_SIZE)
        .with_line_spacing(WRAPPED_LINE_SPACING);

    let mut layout = LinearLayout::vertical();
    if text.is_empty() {
        layout.push(Paragraph::new(""));
        return layout;
    }

    for line in text.lines() {
        if line.trim().is_empty() {
            layout.push(Break::new(1.0));
        } else {
            layout.push(FittedParagraph::new(line, style));
        }
    }
    layout
}

/// Paragraph whose words never exceed the width it is laid out in.
///
/// genpdf drops a word wider than the line when no hyphenator is set, so
/// overlong words are cut into pieces that fit once the available width is
/// known.
pub struct FittedParagraph {
    text: String,
    style: Style,
    paragraph: Option<Paragraph>,
}

impl FittedParagraph {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
            paragraph: None,
        }
    }
}

impl Element for FittedParagraph {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let text = &self.text;
        let own_style = self.style;
        let width = area.size().width;
        let paragraph = self.paragraph.get_or_insert_with(|| {
            let mut effective = style;
            effective.merge(own_style);
            let fitted = break_long_words(text, width, |piece| {
                effective.str_width(&context.font_cache, piece)
            });
            Paragraph::new(StyledString::new(fitted, own_style))
        });
        paragraph.render(context, area, style)
    }
}

/// Splits every space-separated word wider than `max` into pieces no wider
/// than `max`, as measured by `measure`. A single character wider than
/// `max` stays on its own.
pub fn break_long_words(text: &str, max: Mm, measure: impl Fn(&str) -> Mm) -> String {
    text.split(' ')
        .map(|word| {
            if word.is_empty() || measure(word) <= max {
                return word.to_string();
            }

            let mut pieces: Vec<String> = Vec::new();
            let mut current = String::new();
            for ch in word.chars() {
                current.push(ch);
                if current.chars().count() > 1 && measure(&current) > max {
                    current.pop();
                    pieces.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
            if !current.is_empty() {
                pieces.push(current);
            }
            pieces.join(" ")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title bar plus table for one section.
pub fn section_block(section: &ReportSection) -> Result<LinearLayout, Error> {
    let mut layout = LinearLayout::vertical();
    layout.push(section_title_bar(section.title())?);
    layout.push(KeyValueTable::from_section(section).into_layout()?);
    layout.push(Break::new(1.0));
    Ok(layout)
}

/// First page each section appeared on, filled in while rendering.
#[derive(Clone, Debug, Default)]
pub struct SectionPages(Rc<RefCell<Vec<Option<usize>>>>);

impl SectionPages {
    /// Creates slots for `count` sections.
    pub fn with_sections(count: usize) -> Self {
        Self(Rc::new(RefCell::new(vec![None; count])))
    }

    fn record(&self, index: usize, page: usize) {
        if let Some(slot) = self.0.borrow_mut().get_mut(index) {
            slot.get_or_insert(page);
        }
    }

    /// Copies the recorded pages out.
    pub fn snapshot(&self) -> Vec<Option<usize>> {
        self.0.borrow().clone()
    }
}

/// Wraps an element and notes the page on which it first puts anything on paper.
pub struct SectionAnchor<E> {
    element: E,
    index: usize,
    tracker: PageTracker,
    pages: SectionPages,
}

impl<E: Element> SectionAnchor<E> {
    /// Anchors `element` as section number `index`.
    pub fn new(element: E, index: usize, tracker: PageTracker, pages: SectionPages) -> Self {
        Self {
            element,
            index,
            tracker,
            pages,
        }
    }
}

impl<E: Element> Element for SectionAnchor<E> {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let page = self.tracker.current();
        let result = self.element.render(context, area, style)?;
        if result.size.height > Mm::default() {
            self.pages.record(self.index, page);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample_record;
    use crate::report::{Locale, Report, SectionKind};

    #[test]
    fn points_convert_to_millimetres() {
        let inch = mm_from_pt(72.0);
        assert!(inch > Mm::from(printpdf::Mm(25.39)));
        assert!(inch < Mm::from(printpdf::Mm(25.41)));
    }

    #[test]
    fn table_keeps_every_row() {
        let report = Report::from_record(&sample_record(), Locale::English);
        let patient = report.section(SectionKind::PatientInformation).unwrap();
        let table = KeyValueTable::from_section(patient);
        assert_eq!(table.len(), 5);
        assert!(table.into_layout().is_ok());
    }

    fn one_mm_per_char(text: &str) -> Mm {
        Mm::from(printpdf::Mm(text.chars().count() as f64))
    }

    #[test]
    fn overlong_words_are_cut_to_the_column() {
        let width = Mm::from(printpdf::Mm(4.0));
        let token = "ABCDEFGHIJ";
        let fitted = break_long_words(&format!("ok {token} end"), width, one_mm_per_char);
        assert_eq!(fitted, "ok ABCD EFGH IJ end");
        assert_eq!(fitted.replace(' ', ""), format!("ok{token}end"));
        assert!(fitted.split(' ').all(|piece| one_mm_per_char(piece) <= width));
    }

    #[test]
    fn short_words_and_spacing_are_untouched() {
        let width = Mm::from(printpdf::Mm(20.0));
        let text = "Rua  das Flores, 12";
        assert_eq!(break_long_words(text, width, one_mm_per_char), text);
        assert_eq!(break_long_words("", width, one_mm_per_char), "");
    }

    #[test]
    fn characters_wider_than_the_column_still_print() {
        let width = Mm::from(printpdf::Mm(0.5));
        assert_eq!(break_long_words("abc", width, one_mm_per_char), "a b c");
    }

    #[test]
    fn section_pages_keep_the_first_page() {
        let pages = SectionPages::with_sections(2);
        pages.record(0, 1);
        pages.record(0, 2);
        pages.record(5, 1);
        assert_eq!(pages.snapshot(), vec![Some(1), None]);
    }
}
