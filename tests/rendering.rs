use medreport::fonts;
use medreport::record::{sample_record, ServiceRecord};
use medreport::{render_payload, render_record, Locale, RenderOptions, RenderedReport};
use sha2::{Digest, Sha256};

const SKIP_HINT: &str =
    "no usable fonts found. Set MEDREPORT_FONTS_DIR or copy assets/fonts next to the binary.";

fn fonts_ready(test: &str) -> bool {
    if fonts::fonts_available(None) {
        true
    } else {
        eprintln!("Skipping {test}: {SKIP_HINT}");
        false
    }
}

fn render_sample(options: &RenderOptions) -> RenderedReport {
    render_record(&sample_record(), options).expect("render sample report")
}

fn long_history_record() -> ServiceRecord {
    let mut draft = sample_record().to_draft();
    draft.patient.medical_history = (1..=120)
        .map(|line| format!("{line}. Consulta de acompanhamento sem intercorrências."))
        .collect::<Vec<_>>()
        .join("\n");
    ServiceRecord::try_from(draft).expect("valid record")
}

/// Zeroes the bytes between `tag` and `terminator` in every occurrence.
fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
    let mut index = 0;
    while index + tag.len() < data.len() {
        if !data[index..].starts_with(tag) {
            index += 1;
            continue;
        }

        let mut cursor = index + tag.len();
        while cursor < data.len() && data[cursor] != terminator {
            let byte = data[cursor];
            if terminator == b')' || !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                data[cursor] = b'0';
            }
            cursor += 1;
        }
        index = cursor;
    }
}

/// Zeroes the text content of every `<element>…</element>` pair.
fn scrub_xml(data: &mut [u8], element: &str) {
    let start = format!("<{element}>").into_bytes();
    let end = format!("</{element}>").into_bytes();

    let mut offset = 0;
    while let Some(start_pos) = data[offset..]
        .windows(start.len())
        .position(|window| window == start.as_slice())
    {
        let content = offset + start_pos + start.len();
        let Some(end_pos) = data[content..]
            .windows(end.len())
            .position(|window| window == end.as_slice())
        else {
            break;
        };
        for byte in &mut data[content..content + end_pos] {
            if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                *byte = b'0';
            }
        }
        offset = content + end_pos + end.len();
    }
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    for element in [
        "xmp:CreateDate",
        "xmp:ModifyDate",
        "xmp:MetadataDate",
        "xmpMM:DocumentID",
        "xmpMM:InstanceID",
        "xmpMM:VersionID",
    ] {
        scrub_xml(&mut normalized, element);
    }
    Sha256::digest(&normalized).into()
}

#[test]
fn renders_a_pdf_document() {
    if !fonts_ready("renders_a_pdf_document") {
        return;
    }

    let report = render_sample(&RenderOptions::default());
    assert!(report.bytes.starts_with(b"%PDF"));
    assert_eq!(report.filename, "medical_service_report.pdf");
    assert_eq!(report.mime_type(), "application/pdf");
    assert_eq!(report.section_pages, vec![Some(1); 5]);
}

#[test]
fn rendering_is_deterministic() {
    if !fonts_ready("rendering_is_deterministic") {
        return;
    }

    let options = RenderOptions::default();
    let first = render_sample(&options);
    let second = render_sample(&options);

    assert_eq!(first.bytes.len(), second.bytes.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&first.bytes),
        normalized_hash(&second.bytes),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn portuguese_report_uses_its_filename() {
    if !fonts_ready("portuguese_report_uses_its_filename") {
        return;
    }

    let options = RenderOptions::default().with_locale(Locale::Portuguese);
    let report = render_sample(&options);
    assert!(report.bytes.starts_with(b"%PDF"));
    assert_eq!(report.filename, "relatorio_servico_medico.pdf");
}

#[test]
fn long_text_flows_onto_later_pages() {
    if !fonts_ready("long_text_flows_onto_later_pages") {
        return;
    }

    let options = RenderOptions {
        page_numbers: true,
        ..RenderOptions::default()
    };
    let report = render_record(&long_history_record(), &options).expect("render long report");
    assert!(report.bytes.starts_with(b"%PDF"));

    let pages: Vec<usize> = report.section_pages.iter().map(|page| page.expect("section placed")).collect();
    assert_eq!(pages[0], 1);
    assert!(pages.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn payload_errors_never_reach_the_renderer() {
    let mut payload = serde_json::to_value(sample_record()).unwrap();
    payload["service_type"] = "Passeio".into();

    let err = render_payload(payload.to_string().as_bytes(), &RenderOptions::default()).unwrap_err();
    let validation = err.as_validation().expect("validation error");
    assert_eq!(validation.field(), "service_type");
}

#[cfg(feature = "bookmarks")]
fn record_with_history(history: &str) -> ServiceRecord {
    let mut draft = sample_record().to_draft();
    draft.patient.medical_history = history.to_string();
    ServiceRecord::try_from(draft).expect("valid record")
}

/// Bytes of text shown by `Tj`/`TJ` operators across all pages.
#[cfg(feature = "bookmarks")]
fn shown_text_bytes(pdf: &[u8]) -> usize {
    use lopdf::content::Content;
    use lopdf::Object;

    fn string_len(object: &Object) -> usize {
        match object {
            Object::String(bytes, _) => bytes.len(),
            Object::Array(items) => items.iter().map(string_len).sum(),
            _ => 0,
        }
    }

    let document = lopdf::Document::load_mem(pdf).expect("parse rendered PDF");
    document
        .get_pages()
        .values()
        .map(|&page| {
            let content = document.get_page_content(page).expect("page content");
            Content::decode(&content)
                .expect("decode page content")
                .operations
                .iter()
                .filter(|operation| matches!(operation.operator.as_str(), "Tj" | "TJ"))
                .map(|operation| operation.operands.iter().map(string_len).sum::<usize>())
                .sum::<usize>()
        })
        .sum()
}

#[cfg(feature = "bookmarks")]
#[test]
fn words_wider_than_the_column_are_kept() {
    if !fonts_ready("words_wider_than_the_column_are_kept") {
        return;
    }

    let token = "EXAME-".repeat(20);
    let options = RenderOptions::default();
    let render_text = |history: &str| {
        let report = render_record(&record_with_history(history), &options).expect("render report");
        shown_text_bytes(&report.bytes)
    };

    let baseline = render_text("");
    let with_token = render_text(&token);
    let with_token_and_tail = render_text(&format!("{token} fim"));

    assert!(
        with_token >= baseline + token.len(),
        "overlong word lost: {baseline} -> {with_token}"
    );
    assert!(with_token_and_tail > with_token);
}

#[cfg(feature = "bookmarks")]
#[test]
fn bookmarked_report_has_an_outline() {
    if !fonts_ready("bookmarked_report_has_an_outline") {
        return;
    }

    let report = medreport::render_record_with_bookmarks(&sample_record(), &RenderOptions::default())
        .expect("render bookmarked report");
    assert!(report.bytes.starts_with(b"%PDF"));
    assert!(report
        .bytes
        .windows(b"/Outlines".len())
        .any(|window| window == b"/Outlines"));
    assert!(report
        .bytes
        .windows(b"patient-information".len())
        .any(|window| window == b"patient-information"));
}
