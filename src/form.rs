//! Form model for collecting a service record field by field.
//!
//! [`FormInput`] holds the raw text of the fifteen fields, starting from the
//! defaults of the paper form. Submitting converts the text into a
//! [`ServiceRecordDraft`] and runs the same structural validation as a JSON
//! payload, so every front end ends up with an identical [`ServiceRecord`].

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::record::{
    KilometersDraft, PatientDraft, ServiceRecord, ServiceRecordDraft, ServiceType, Sex,
    TimestampsDraft,
};
use crate::report::Locale;
use crate::validation::{ValidationError, ValidationErrorKind, MAX_AGE, MIN_AGE};

/// Default service time.
pub const DEFAULT_TIME: &str = "08:00";

/// The five groups of the form, in the order they are filled in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormSection {
    /// Date and time of the service.
    DateTime,
    /// Entry, exit and arrival times.
    Timestamps,
    /// Odometer readings.
    Kilometers,
    /// Type of service and diagnostic.
    ServiceInformation,
    /// Who was transported.
    PatientInformation,
}

impl FormSection {
    /// Sections in order.
    pub const ALL: [FormSection; 5] = [
        FormSection::DateTime,
        FormSection::Timestamps,
        FormSection::Kilometers,
        FormSection::ServiceInformation,
        FormSection::PatientInformation,
    ];

    /// Numbered heading shown above the section.
    pub fn heading(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (FormSection::DateTime, Locale::English) => "1. Date & Time",
            (FormSection::DateTime, Locale::Portuguese) => "1. Data e Hora",
            (FormSection::Timestamps, Locale::English) => "2. Timestamps",
            (FormSection::Timestamps, Locale::Portuguese) => "2. Hora",
            (FormSection::Kilometers, Locale::English) => "3. Kilometers",
            (FormSection::Kilometers, Locale::Portuguese) => "3. Quilómetros",
            (FormSection::ServiceInformation, Locale::English) => "4. Service Information",
            (FormSection::ServiceInformation, Locale::Portuguese) => "4. Informação de Serviço",
            (FormSection::PatientInformation, Locale::English) => "5. Patient Information",
            (FormSection::PatientInformation, Locale::Portuguese) => "5. Informações do Paciente",
        }
    }

    /// Fields of this section in input order.
    pub fn fields(self) -> impl Iterator<Item = FormField> {
        FormField::ALL
            .into_iter()
            .filter(move |field| field.section() == self)
    }
}

/// How a field is entered and parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// `YYYY-MM-DD`.
    Date,
    /// `HH:MM` or `HH:MM:SS`.
    Time,
    /// Non-negative decimal; `,` is accepted as the separator.
    Decimal,
    /// Whole number within an inclusive range.
    Integer {
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
    /// One label out of a closed set.
    Choice(&'static [&'static str]),
    /// Single line of free text.
    Text,
    /// Free text that may span several lines.
    LongText,
}

/// Every input of the form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormField {
    /// Service date, `date`.
    Date,
    /// Service time, `time`.
    Time,
    /// `timestamps.entry`.
    EntryTime,
    /// `timestamps.exit`.
    ExitTime,
    /// `timestamps.arrival`.
    ArrivalTime,
    /// `kilometers.entry`.
    KmEntry,
    /// `kilometers.exit`.
    KmExit,
    /// `kilometers.arrival`.
    KmArrival,
    /// One of the [`ServiceType`] labels.
    ServiceType,
    /// Free-text diagnostic.
    Diagnostic,
    /// `patient.name`.
    PatientName,
    /// `patient.age`, between [`MIN_AGE`] and [`MAX_AGE`].
    PatientAge,
    /// One of the [`Sex`] labels.
    PatientSex,
    /// Postal address; may span several lines.
    PatientAddress,
    /// Free-text medical history.
    MedicalHistory,
}

impl FormField {
    /// Fields in input order.
    pub const ALL: [FormField; 15] = [
        FormField::Date,
        FormField::Time,
        FormField::EntryTime,
        FormField::ExitTime,
        FormField::ArrivalTime,
        FormField::KmEntry,
        FormField::KmExit,
        FormField::KmArrival,
        FormField::ServiceType,
        FormField::Diagnostic,
        FormField::PatientName,
        FormField::PatientAge,
        FormField::PatientSex,
        FormField::PatientAddress,
        FormField::MedicalHistory,
    ];

    /// Section the field is shown in.
    pub fn section(self) -> FormSection {
        match self {
            FormField::Date | FormField::Time => FormSection::DateTime,
            FormField::EntryTime | FormField::ExitTime | FormField::ArrivalTime => {
                FormSection::Timestamps
            }
            FormField::KmEntry | FormField::KmExit | FormField::KmArrival => {
                FormSection::Kilometers
            }
            FormField::ServiceType | FormField::Diagnostic => FormSection::ServiceInformation,
            FormField::PatientName
            | FormField::PatientAge
            | FormField::PatientSex
            | FormField::PatientAddress
            | FormField::MedicalHistory => FormSection::PatientInformation,
        }
    }

    /// Dotted payload path, as reported by validation errors.
    pub fn key(self) -> &'static str {
        match self {
            FormField::Date => "date",
            FormField::Time => "time",
            FormField::EntryTime => "timestamps.entry",
            FormField::ExitTime => "timestamps.exit",
            FormField::ArrivalTime => "timestamps.arrival",
            FormField::KmEntry => "kilometers.entry",
            FormField::KmExit => "kilometers.exit",
            FormField::KmArrival => "kilometers.arrival",
            FormField::ServiceType => "service_type",
            FormField::Diagnostic => "diagnostic",
            FormField::PatientName => "patient.name",
            FormField::PatientAge => "patient.age",
            FormField::PatientSex => "patient.sex",
            FormField::PatientAddress => "patient.address",
            FormField::MedicalHistory => "patient.medical_history",
        }
    }

    /// Looks a field up by its dotted payload path.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Prompt label in the given locale.
    pub fn label(self, locale: Locale) -> &'static str {
        let (en, pt) = match self {
            FormField::Date => ("Date", "Data"),
            FormField::Time => ("Time", "Hora"),
            FormField::EntryTime => ("Entry", "H. Entrada"),
            FormField::ExitTime => ("Exit", "H. Saída"),
            FormField::ArrivalTime => ("Arrival at Destination", "H. Destino"),
            FormField::KmEntry => ("KM at Entry", "KM Entrada"),
            FormField::KmExit => ("KM at Exit", "KM Saída"),
            FormField::KmArrival => ("KM at Arrival", "KM Destino"),
            FormField::ServiceType => ("Type of Service", "Tipo de Serviço"),
            FormField::Diagnostic => ("Diagnostic", "Diagnósticos"),
            FormField::PatientName => ("Name", "Nome"),
            FormField::PatientAge => ("Age", "Idade"),
            FormField::PatientSex => ("Sex", "Sexo"),
            FormField::PatientAddress => ("Address", "Endereço"),
            FormField::MedicalHistory => ("Medical History", "Histórico médico"),
        };
        match locale {
            Locale::English => en,
            Locale::Portuguese => pt,
        }
    }

    /// How the field is entered; also picks the parser used on submit.
    pub fn kind(self) -> FieldKind {
        match self {
            FormField::Date => FieldKind::Date,
            FormField::Time | FormField::EntryTime | FormField::ExitTime | FormField::ArrivalTime => {
                FieldKind::Time
            }
            FormField::KmEntry | FormField::KmExit | FormField::KmArrival => FieldKind::Decimal,
            FormField::ServiceType => FieldKind::Choice(ServiceType::LABELS),
            FormField::PatientSex => FieldKind::Choice(Sex::LABELS),
            FormField::PatientAge => FieldKind::Integer {
                min: MIN_AGE,
                max: MAX_AGE,
            },
            FormField::PatientName => FieldKind::Text,
            FormField::PatientAddress | FormField::Diagnostic | FormField::MedicalHistory => {
                FieldKind::LongText
            }
        }
    }

    /// Initial text of the field on a blank form.
    pub fn default_value(self, today: NaiveDate) -> String {
        match self.kind() {
            FieldKind::Date => today.format("%Y-%m-%d").to_string(),
            FieldKind::Time => DEFAULT_TIME.to_string(),
            FieldKind::Decimal => "0.0".to_string(),
            FieldKind::Integer { min, .. } => min.to_string(),
            FieldKind::Choice(labels) => labels.first().copied().unwrap_or_default().to_string(),
            FieldKind::Text | FieldKind::LongText => String::new(),
        }
    }
}

/// Raw text of a form being filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormInput {
    values: BTreeMap<FormField, String>,
}

impl FormInput {
    /// Blank form with every field at its default.
    pub fn new(today: NaiveDate) -> Self {
        let values = FormField::ALL
            .into_iter()
            .map(|field| (field, field.default_value(today)))
            .collect();
        Self { values }
    }

    /// Form pre-filled from an existing record.
    pub fn from_record(record: &ServiceRecord) -> Self {
        let draft = record.to_draft();
        let values = FormField::ALL
            .into_iter()
            .map(|field| {
                let value = match field {
                    FormField::Date => draft.date.clone(),
                    FormField::Time => draft.time.clone(),
                    FormField::EntryTime => draft.timestamps.entry.clone(),
                    FormField::ExitTime => draft.timestamps.exit.clone(),
                    FormField::ArrivalTime => draft.timestamps.arrival.clone(),
                    FormField::KmEntry => draft.kilometers.entry.to_string(),
                    FormField::KmExit => draft.kilometers.exit.to_string(),
                    FormField::KmArrival => draft.kilometers.arrival.to_string(),
                    FormField::ServiceType => draft.service_type.clone(),
                    FormField::Diagnostic => draft.diagnostic.clone(),
                    FormField::PatientName => draft.patient.name.clone(),
                    FormField::PatientAge => draft.patient.age.to_string(),
                    FormField::PatientSex => draft.patient.sex.clone(),
                    FormField::PatientAddress => draft.patient.address.clone(),
                    FormField::MedicalHistory => draft.patient.medical_history.clone(),
                };
                (field, value)
            })
            .collect();
        Self { values }
    }

    /// Replaces the text of `field`.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    /// Current text of `field`.
    pub fn get(&self, field: FormField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or_default()
    }

    /// Parses every field and validates the result.
    ///
    /// The first rejected field is reported with its dotted payload path.
    pub fn submit(&self) -> Result<ServiceRecord, ValidationError> {
        let draft = ServiceRecordDraft {
            date: self.text(FormField::Date),
            time: self.text(FormField::Time),
            timestamps: TimestampsDraft {
                entry: self.text(FormField::EntryTime),
                exit: self.text(FormField::ExitTime),
                arrival: self.text(FormField::ArrivalTime),
            },
            kilometers: KilometersDraft {
                entry: self.decimal(FormField::KmEntry)?,
                exit: self.decimal(FormField::KmExit)?,
                arrival: self.decimal(FormField::KmArrival)?,
            },
            service_type: self.choice(FormField::ServiceType),
            diagnostic: self.get(FormField::Diagnostic).to_string(),
            patient: PatientDraft {
                name: self.get(FormField::PatientName).trim().to_string(),
                age: self.integer(FormField::PatientAge)?,
                sex: self.choice(FormField::PatientSex),
                address: self.get(FormField::PatientAddress).to_string(),
                medical_history: self.get(FormField::MedicalHistory).to_string(),
            },
        };

        ServiceRecord::try_from(draft)
    }

    fn text(&self, field: FormField) -> String {
        self.get(field).trim().to_string()
    }

    fn decimal(&self, field: FormField) -> Result<f64, ValidationError> {
        let raw = self.get(field).trim();
        raw.replace(',', ".").parse::<f64>().map_err(|_| {
            ValidationError::new(
                field.key(),
                ValidationErrorKind::InvalidType(format!("expected a number, got `{raw}`")),
            )
        })
    }

    fn integer(&self, field: FormField) -> Result<i64, ValidationError> {
        let raw = self.get(field).trim();
        raw.parse::<i64>().map_err(|_| {
            ValidationError::new(
                field.key(),
                ValidationErrorKind::InvalidType(format!("expected a whole number, got `{raw}`")),
            )
        })
    }

    /// Canonical label when the text matches one ignoring case, the text itself otherwise.
    fn choice(&self, field: FormField) -> String {
        let raw = self.get(field).trim();
        let FieldKind::Choice(labels) = field.kind() else {
            return raw.to_string();
        };
        labels
            .iter()
            .find(|label| label.to_lowercase() == raw.to_lowercase())
            .map_or_else(|| raw.to_string(), |label| label.to_string())
    }
}
