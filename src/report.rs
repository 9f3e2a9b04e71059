//! Layout model of a service report.
//!
//! [`Report::from_record`] turns a [`ServiceRecord`] into the title and the
//! ordered list of sections that the renderer draws. Keeping this step free
//! of any `genpdf` types lets callers inspect exactly what ends up on paper
//! without loading fonts.

use serde::{Deserialize, Serialize};

use crate::record::ServiceRecord;

/// Language used for titles, labels and the suggested filename.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    /// English labels.
    #[default]
    #[serde(rename = "en")]
    English,
    /// Portuguese labels, as on the paper form.
    #[serde(rename = "pt")]
    Portuguese,
}

impl Locale {
    /// Parses `en` / `pt` (case-insensitive).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Locale::English),
            "pt" | "portuguese" => Some(Locale::Portuguese),
            _ => None,
        }
    }

    /// Short language code.
    pub fn code(self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Portuguese => "pt",
        }
    }

    /// Suggested download filename for a rendered report.
    pub fn report_filename(self) -> &'static str {
        match self {
            Locale::English => "medical_service_report.pdf",
            Locale::Portuguese => "relatorio_servico_medico.pdf",
        }
    }

    /// Title printed at the top of the report.
    pub fn report_title(self) -> &'static str {
        match self {
            Locale::English => "MEDICAL SERVICE REPORT",
            Locale::Portuguese => "RELATÓRIO DE SERVIÇO MÉDICO",
        }
    }

    /// Word printed before the page number in the footer.
    pub fn page_label(self) -> &'static str {
        match self {
            Locale::English => "Page",
            Locale::Portuguese => "Página",
        }
    }
}

/// Identifies the report sections; the declaration order is the print order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    /// Service date and time.
    DateTime,
    /// Entry, exit and arrival times.
    Timestamps,
    /// Odometer readings at the same three checkpoints.
    Kilometers,
    /// Type of service and diagnostic.
    ServiceDetails,
    /// Name, age, sex, address and medical history.
    PatientInformation,
}

impl SectionKind {
    /// Sections in print order.
    pub const ORDER: [SectionKind; 5] = [
        SectionKind::DateTime,
        SectionKind::Timestamps,
        SectionKind::Kilometers,
        SectionKind::ServiceDetails,
        SectionKind::PatientInformation,
    ];

    /// Section heading in the given locale.
    pub fn title(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (SectionKind::DateTime, Locale::English) => "Date & Time",
            (SectionKind::DateTime, Locale::Portuguese) => "Data & Hora",
            (SectionKind::Timestamps, Locale::English) => "Timestamps",
            (SectionKind::Timestamps, Locale::Portuguese) => "Horários",
            (SectionKind::Kilometers, Locale::English) => "Kilometers",
            (SectionKind::Kilometers, Locale::Portuguese) => "Quilómetros",
            (SectionKind::ServiceDetails, Locale::English) => "Service Details",
            (SectionKind::ServiceDetails, Locale::Portuguese) => "Detalhes do Serviço",
            (SectionKind::PatientInformation, Locale::English) => "Patient Information",
            (SectionKind::PatientInformation, Locale::Portuguese) => "Informações do Paciente",
        }
    }

    /// Stable identifier, used as the bookmark name.
    pub fn identifier(self) -> &'static str {
        match self {
            SectionKind::DateTime => "date-time",
            SectionKind::Timestamps => "timestamps",
            SectionKind::Kilometers => "kilometers",
            SectionKind::ServiceDetails => "service-details",
            SectionKind::PatientInformation => "patient-information",
        }
    }
}

/// One label/value line of a section table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    label: &'static str,
    value: String,
    wrap: bool,
}

impl ReportRow {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            wrap: false,
        }
    }

    fn wrapped(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            wrap: true,
            ..Self::new(label, value)
        }
    }

    /// Text of the label column.
    pub fn label(&self) -> &str {
        self.label
    }

    /// Text of the value column.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the value is free text laid out as wrapped paragraphs.
    pub fn is_wrapped(&self) -> bool {
        self.wrap
    }
}

/// A titled group of rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportSection {
    kind: SectionKind,
    title: &'static str,
    rows: Vec<ReportRow>,
}

impl ReportSection {
    /// Which section this is.
    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Localized heading.
    pub fn title(&self) -> &str {
        self.title
    }

    /// Rows in print order.
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Finds the value printed next to `label`.
    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.label == label)
            .map(ReportRow::value)
    }
}

/// Everything printed on a service report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    locale: Locale,
    sections: Vec<ReportSection>,
}

impl Report {
    /// Lays out `record` in the fixed section order.
    pub fn from_record(record: &ServiceRecord, locale: Locale) -> Self {
        let sections = SectionKind::ORDER
            .into_iter()
            .map(|kind| ReportSection {
                kind,
                title: kind.title(locale),
                rows: section_rows(kind, record, locale),
            })
            .collect();

        Self { locale, sections }
    }

    /// Locale the labels were taken from.
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Title block text.
    pub fn title(&self) -> &'static str {
        self.locale.report_title()
    }

    /// Sections in print order.
    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    /// Looks a section up by kind.
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }
}

fn section_rows(kind: SectionKind, record: &ServiceRecord, locale: Locale) -> Vec<ReportRow> {
    let pt = locale == Locale::Portuguese;
    let label = |en: &'static str, pt_label: &'static str| if pt { pt_label } else { en };

    match kind {
        SectionKind::DateTime => vec![
            ReportRow::new(label("Date", "Data"), record.date()),
            ReportRow::new(label("Time", "Hora"), record.time()),
        ],
        SectionKind::Timestamps => {
            let timestamps = record.timestamps();
            vec![
                ReportRow::new(label("Entry", "Entrada"), timestamps.entry()),
                ReportRow::new(label("Exit", "Saída"), timestamps.exit()),
                ReportRow::new(
                    label("Arrival at Destination", "Chegada no destino"),
                    timestamps.arrival(),
                ),
            ]
        }
        SectionKind::Kilometers => {
            let km = record.kilometers();
            vec![
                ReportRow::new(label("KM at Entry", "KM Entrada"), format_kilometers(km.entry())),
                ReportRow::new(label("KM at Exit", "KM Saída"), format_kilometers(km.exit())),
                ReportRow::new(
                    label("KM at Arrival", "KM Destino"),
                    format_kilometers(km.arrival()),
                ),
            ]
        }
        SectionKind::ServiceDetails => vec![
            ReportRow::new(
                label("Type of Service", "Tipo de Serviço"),
                record.service_type().label(),
            ),
            ReportRow::wrapped(label("Diagnostic", "Diagnóstico"), record.diagnostic()),
        ],
        SectionKind::PatientInformation => {
            let patient = record.patient();
            vec![
                ReportRow::new(label("Name", "Nome"), patient.name()),
                ReportRow::new(label("Age", "Idade"), patient.age().to_string()),
                ReportRow::new(label("Sex", "Sexo"), patient.sex().label()),
                ReportRow::wrapped(label("Address", "Endereço"), patient.address()),
                ReportRow::wrapped(
                    label("Medical History", "Histórico Médico"),
                    patient.medical_history(),
                ),
            ]
        }
    }
}

/// Formats an odometer reading with its unit.
///
/// Values print as entered: `12.5` stays `12.5`, and integral readings keep
/// one decimal place so `10.0` does not collapse to `10`.
pub fn format_kilometers(value: f64) -> String {
    format!("{} km", format_decimal(value))
}

fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample_record;

    #[test]
    fn sections_follow_fixed_order() {
        let report = Report::from_record(&sample_record(), Locale::English);
        let titles: Vec<_> = report.sections().iter().map(ReportSection::title).collect();
        assert_eq!(
            titles,
            [
                "Date & Time",
                "Timestamps",
                "Kilometers",
                "Service Details",
                "Patient Information"
            ]
        );
    }

    #[test]
    fn kilometers_keep_their_digits() {
        assert_eq!(format_kilometers(12.5), "12.5 km");
        assert_eq!(format_kilometers(10.0), "10.0 km");
        assert_eq!(format_kilometers(0.0), "0.0 km");
        assert_eq!(format_kilometers(123456.75), "123456.75 km");
        assert_eq!(format_kilometers(0.1), "0.1 km");
    }

    #[test]
    fn sample_values_land_in_their_sections() {
        let report = Report::from_record(&sample_record(), Locale::English);

        let date_time = report.section(SectionKind::DateTime).unwrap();
        assert_eq!(date_time.value_of("Date"), Some("2024-01-01"));
        assert_eq!(date_time.value_of("Time"), Some("08:00"));

        let km = report.section(SectionKind::Kilometers).unwrap();
        assert_eq!(km.value_of("KM at Entry"), Some("10.0 km"));
        assert_eq!(km.value_of("KM at Arrival"), Some("40.0 km"));

        let patient = report.section(SectionKind::PatientInformation).unwrap();
        assert_eq!(patient.value_of("Age"), Some("34"));
        assert_eq!(patient.value_of("Sex"), Some("Masculino"));
    }

    #[test]
    fn free_text_rows_wrap() {
        let report = Report::from_record(&sample_record(), Locale::English);
        let wrapped: Vec<_> = report
            .sections()
            .iter()
            .flat_map(ReportSection::rows)
            .filter(|row| row.is_wrapped())
            .map(ReportRow::label)
            .collect();
        assert_eq!(wrapped, ["Diagnostic", "Address", "Medical History"]);
    }

    #[test]
    fn address_keeps_its_lines() {
        let mut draft = sample_record().to_draft();
        draft.patient.address = "Rua X, 12\nApto 3\nLisboa".to_string();
        let record = ServiceRecord::try_from(draft).unwrap();

        let report = Report::from_record(&record, Locale::English);
        let patient = report.section(SectionKind::PatientInformation).unwrap();
        let address = patient
            .rows()
            .iter()
            .find(|row| row.label() == "Address")
            .unwrap();
        assert!(address.is_wrapped());
        assert_eq!(address.value().lines().collect::<Vec<_>>(), ["Rua X, 12", "Apto 3", "Lisboa"]);
    }

    #[test]
    fn portuguese_labels() {
        let report = Report::from_record(&sample_record(), Locale::Portuguese);
        assert_eq!(report.title(), "RELATÓRIO DE SERVIÇO MÉDICO");
        let timestamps = report.section(SectionKind::Timestamps).unwrap();
        assert_eq!(timestamps.value_of("Chegada no destino"), Some("09:00"));
        assert_eq!(Locale::Portuguese.report_filename(), "relatorio_servico_medico.pdf");
    }

    #[test]
    fn locale_codes() {
        assert_eq!(Locale::from_code("PT"), Some(Locale::Portuguese));
        assert_eq!(Locale::from_code("en"), Some(Locale::English));
        assert_eq!(Locale::from_code("fr"), None);
        assert_eq!(Locale::default().code(), "en");
    }
}
