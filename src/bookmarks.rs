//! Document outline for rendered reports, built on top of `lopdf`.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use thiserror::Error;

use crate::report::ReportSection;

/// Errors that can occur while embedding the outline into a rendered report.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// The PDF bytes could not be parsed by `lopdf`.
    #[error("failed to parse PDF bytes: {0}")]
    Parse(#[from] lopdf::Error),
    /// The rewritten document could not be serialized.
    #[error("failed to write PDF bytes: {0}")]
    Write(#[from] std::io::Error),
    /// The trailer has no `/Root` catalog reference.
    #[error("PDF catalog entry is missing")]
    MissingCatalog,
    /// The catalog object is not a dictionary.
    #[error("PDF catalog entry is not a dictionary")]
    InvalidCatalog,
    /// A section points at a page the document does not have.
    #[error("section {section_index} refers to missing page {page_number}")]
    MissingPage {
        /// Index of the section in report order.
        section_index: usize,
        /// 1-based page number that could not be resolved.
        page_number: usize,
    },
}

/// Adds a flat `/Outlines` tree with one entry per section that was placed on
/// a page. Each entry jumps to the section's first page and carries the
/// section identifier as `/NM`.
pub fn apply_section_bookmarks(
    pdf_bytes: &[u8],
    sections: &[ReportSection],
    section_pages: &[Option<usize>],
) -> Result<Vec<u8>, BookmarkError> {
    let mut document = Document::load_mem(pdf_bytes)?;

    let pages = document.get_pages();
    let entries = collect_outline_entries(&mut document, sections, section_pages, &pages)?;
    if entries.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let outlines_id = document.new_object_id();
    link_outline_entries(outlines_id, &mut document, &entries);
    insert_outlines_root(outlines_id, &mut document, &entries)?;

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

struct OutlineEntry {
    object_id: ObjectId,
    page_ref: ObjectId,
    title: String,
    name: &'static str,
}

fn collect_outline_entries(
    document: &mut Document,
    sections: &[ReportSection],
    section_pages: &[Option<usize>],
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<Vec<OutlineEntry>, BookmarkError> {
    let mut entries = Vec::new();

    for (index, (section, page)) in sections.iter().zip(section_pages).enumerate() {
        let Some(page_number) = *page else {
            continue;
        };
        let page_ref = u32::try_from(page_number)
            .ok()
            .and_then(|number| pages.get(&number).copied())
            .ok_or(BookmarkError::MissingPage {
                section_index: index,
                page_number,
            })?;

        entries.push(OutlineEntry {
            object_id: document.new_object_id(),
            page_ref,
            title: section.title().to_string(),
            name: section.kind().identifier(),
        });
    }

    Ok(entries)
}

/// PDF text string: literal for ASCII, UTF-16BE with a byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn link_outline_entries(outlines_id: ObjectId, document: &mut Document, entries: &[OutlineEntry]) {
    for (index, entry) in entries.iter().enumerate() {
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", text_string(&entry.title));
        dictionary.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(entry.page_ref),
                Object::Name("Fit".into()),
            ]),
        );
        dictionary.set("Parent", Object::Reference(outlines_id));
        dictionary.set("NM", Object::string_literal(entry.name));

        if let Some(previous) = index.checked_sub(1).and_then(|i| entries.get(i)) {
            dictionary.set("Prev", Object::Reference(previous.object_id));
        }
        if let Some(next) = entries.get(index + 1) {
            dictionary.set("Next", Object::Reference(next.object_id));
        }

        document
            .objects
            .insert(entry.object_id, Object::Dictionary(dictionary));
    }
}

fn insert_outlines_root(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &[OutlineEntry],
) -> Result<(), BookmarkError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name("Outlines".into()));
    outlines.set("Count", Object::Integer(entries.len() as i64));
    if let Some(first) = entries.first() {
        outlines.set("First", Object::Reference(first.object_id));
    }
    if let Some(last) = entries.last() {
        outlines.set("Last", Object::Reference(last.object_id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(outlines));

    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(outlines_id));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_titles_stay_literal() {
        assert!(matches!(
            text_string("Patient Information"),
            Object::String(ref bytes, StringFormat::Literal) if bytes.as_slice() == b"Patient Information"
        ));
    }

    #[test]
    fn accented_titles_use_utf16() {
        let Object::String(bytes, _) = text_string("Informações") else {
            panic!("expected a string object");
        };
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(bytes.len(), 2 + 2 * "Informações".encode_utf16().count());
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = apply_section_bookmarks(b"not a pdf", &[], &[]).unwrap_err();
        assert!(matches!(err, BookmarkError::Parse(_)));
    }
}
