//! The service record passed from the form collector to the renderer.
//!
//! A [`ServiceRecord`] can only be obtained through validation: from a JSON
//! payload ([`ServiceRecord::from_json`]), from a loosely typed
//! [`ServiceRecordDraft`], or from a submitted form. Its fields are read-only
//! afterwards, so one record maps to exactly one rendered report.
//!
//! The serialized form of a record is the wire payload accepted by the
//! `/submit` endpoint:
//!
//! ```json
//! {
//!   "date": "2024-01-01",
//!   "time": "08:00",
//!   "timestamps": { "entry": "08:05", "exit": "08:30", "arrival": "09:00" },
//!   "kilometers": { "entry": 10.0, "exit": 15.0, "arrival": 40.0 },
//!   "service_type": "Emergência",
//!   "diagnostic": "Fratura",
//!   "patient": {
//!     "name": "J. Silva", "age": 34, "sex": "Masculino",
//!     "address": "Rua X", "medical_history": "Nenhum"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::validation::{self, ValidationError, ValidationErrorKind};

/// Classification of a transport service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// Emergency call-out.
    #[serde(rename = "Emergência")]
    Emergency,
    /// Scheduled patient transport.
    #[serde(rename = "Transporte agendado")]
    ScheduledTransport,
    /// Transport to a medical appointment.
    #[serde(rename = "Consulta médica")]
    MedicalAppointment,
    /// Transfer between hospitals.
    #[serde(rename = "Transferência hospitalar")]
    HospitalTransfer,
    /// Anything else.
    #[serde(rename = "Outros")]
    Other,
}

impl ServiceType {
    /// All service types in the order they are offered on the form.
    pub const ALL: [ServiceType; 5] = [
        ServiceType::Emergency,
        ServiceType::ScheduledTransport,
        ServiceType::MedicalAppointment,
        ServiceType::HospitalTransfer,
        ServiceType::Other,
    ];

    /// Accepted wire labels, in form order.
    pub const LABELS: &'static [&'static str] = &[
        "Emergência",
        "Transporte agendado",
        "Consulta médica",
        "Transferência hospitalar",
        "Outros",
    ];

    /// The wire label of this service type.
    pub fn label(self) -> &'static str {
        match self {
            ServiceType::Emergency => Self::LABELS[0],
            ServiceType::ScheduledTransport => Self::LABELS[1],
            ServiceType::MedicalAppointment => Self::LABELS[2],
            ServiceType::HospitalTransfer => Self::LABELS[3],
            ServiceType::Other => Self::LABELS[4],
        }
    }

    /// Looks up a service type by its exact wire label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }
}

/// Sex of the patient as recorded on the form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// `Masculino`.
    #[serde(rename = "Masculino")]
    Male,
    /// `Feminino`.
    #[serde(rename = "Feminino")]
    Female,
}

impl Sex {
    /// Both values in form order.
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    /// Accepted wire labels, in form order.
    pub const LABELS: &'static [&'static str] = &["Masculino", "Feminino"];

    /// The wire label.
    pub fn label(self) -> &'static str {
        match self {
            Sex::Male => Self::LABELS[0],
            Sex::Female => Self::LABELS[1],
        }
    }

    /// Looks up a value by its exact wire label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sex| sex.label() == label)
    }
}

/// Trip checkpoints as time-of-day strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    entry: String,
    exit: String,
    arrival: String,
}

impl Timestamps {
    /// Time the crew entered service.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Time the crew left with the patient.
    pub fn exit(&self) -> &str {
        &self.exit
    }

    /// Time of arrival at the destination.
    pub fn arrival(&self) -> &str {
        &self.arrival
    }
}

/// Odometer readings at the trip checkpoints.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Kilometers {
    entry: f64,
    exit: f64,
    arrival: f64,
}

impl Kilometers {
    /// Reading when entering service.
    pub fn entry(&self) -> f64 {
        self.entry
    }

    /// Reading when leaving with the patient.
    pub fn exit(&self) -> f64 {
        self.exit
    }

    /// Reading on arrival.
    pub fn arrival(&self) -> f64 {
        self.arrival
    }
}

/// Patient demographics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Patient {
    name: String,
    age: u8,
    sex: Sex,
    address: String,
    medical_history: String,
}

impl Patient {
    /// Full name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Age in years, always within `0..=120`.
    pub fn age(&self) -> u8 {
        self.age
    }

    /// Recorded sex.
    pub fn sex(&self) -> Sex {
        self.sex
    }

    /// Home address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Free-text medical history, possibly empty.
    pub fn medical_history(&self) -> &str {
        &self.medical_history
    }
}

/// One validated medical-transport event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ServiceRecordDraft")]
pub struct ServiceRecord {
    date: String,
    time: String,
    timestamps: Timestamps,
    kilometers: Kilometers,
    service_type: ServiceType,
    diagnostic: String,
    patient: Patient,
}

impl ServiceRecord {
    /// Validates a raw JSON payload.
    ///
    /// Required keys are checked before anything is converted, so an absent
    /// field is always reported as missing with its dotted path instead of
    /// surfacing as a type error.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ValidationError> {
        let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|err| {
            ValidationError::new("payload", ValidationErrorKind::Malformed(err.to_string()))
        })?;
        Self::from_value(value)
    }

    /// Validates an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        if let Some(field) = validation::first_missing_field(&value) {
            return Err(ValidationError::missing(field));
        }

        let draft: ServiceRecordDraft = serde_path_to_error::deserialize(value).map_err(|err| {
            let path = err.path().to_string();
            let field = if path == "." { "payload".to_string() } else { path };
            ValidationError::new(
                field,
                ValidationErrorKind::InvalidType(err.into_inner().to_string()),
            )
        })?;

        Self::try_from(draft)
    }

    /// Service date, `YYYY-MM-DD`.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Service start time.
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Trip checkpoints.
    pub fn timestamps(&self) -> &Timestamps {
        &self.timestamps
    }

    /// Odometer readings.
    pub fn kilometers(&self) -> &Kilometers {
        &self.kilometers
    }

    /// Service classification.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Diagnostic notes, possibly empty.
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    /// Patient demographics.
    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    /// Converts the record back into its editable draft form.
    pub fn to_draft(&self) -> ServiceRecordDraft {
        ServiceRecordDraft {
            date: self.date.clone(),
            time: self.time.clone(),
            timestamps: TimestampsDraft {
                entry: self.timestamps.entry.clone(),
                exit: self.timestamps.exit.clone(),
                arrival: self.timestamps.arrival.clone(),
            },
            kilometers: KilometersDraft {
                entry: self.kilometers.entry,
                exit: self.kilometers.exit,
                arrival: self.kilometers.arrival,
            },
            service_type: self.service_type.label().to_string(),
            diagnostic: self.diagnostic.clone(),
            patient: PatientDraft {
                name: self.patient.name.clone(),
                age: i64::from(self.patient.age),
                sex: self.patient.sex.label().to_string(),
                address: self.patient.address.clone(),
                medical_history: self.patient.medical_history.clone(),
            },
        }
    }
}

/// Loosely typed wire form of a [`ServiceRecord`].
///
/// Every field is public and unchecked; [`ServiceRecord::try_from`] performs
/// the structural validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecordDraft {
    pub date: String,
    pub time: String,
    pub timestamps: TimestampsDraft,
    pub kilometers: KilometersDraft,
    pub service_type: String,
    pub diagnostic: String,
    pub patient: PatientDraft,
}

/// Unchecked trip checkpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampsDraft {
    pub entry: String,
    pub exit: String,
    pub arrival: String,
}

/// Unchecked odometer readings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KilometersDraft {
    pub entry: f64,
    pub exit: f64,
    pub arrival: f64,
}

/// Unchecked patient demographics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub name: String,
    pub age: i64,
    pub sex: String,
    pub address: String,
    pub medical_history: String,
}

impl TryFrom<ServiceRecordDraft> for ServiceRecord {
    type Error = ValidationError;

    fn try_from(draft: ServiceRecordDraft) -> Result<Self, Self::Error> {
        validation::check_date("date", &draft.date)?;
        validation::check_time("time", &draft.time)?;
        validation::check_time("timestamps.entry", &draft.timestamps.entry)?;
        validation::check_time("timestamps.exit", &draft.timestamps.exit)?;
        validation::check_time("timestamps.arrival", &draft.timestamps.arrival)?;
        validation::check_distance("kilometers.entry", draft.kilometers.entry)?;
        validation::check_distance("kilometers.exit", draft.kilometers.exit)?;
        validation::check_distance("kilometers.arrival", draft.kilometers.arrival)?;

        let service_type = ServiceType::from_label(&draft.service_type).ok_or_else(|| {
            ValidationError::new(
                "service_type",
                ValidationErrorKind::UnknownLabel {
                    value: draft.service_type.clone(),
                    allowed: ServiceType::LABELS,
                },
            )
        })?;

        let age = validation::check_age("patient.age", draft.patient.age)?;
        let sex = Sex::from_label(&draft.patient.sex).ok_or_else(|| {
            ValidationError::new(
                "patient.sex",
                ValidationErrorKind::UnknownLabel {
                    value: draft.patient.sex.clone(),
                    allowed: Sex::LABELS,
                },
            )
        })?;

        Ok(Self {
            date: draft.date,
            time: draft.time,
            timestamps: Timestamps {
                entry: draft.timestamps.entry,
                exit: draft.timestamps.exit,
                arrival: draft.timestamps.arrival,
            },
            kilometers: Kilometers {
                entry: draft.kilometers.entry,
                exit: draft.kilometers.exit,
                arrival: draft.kilometers.arrival,
            },
            service_type,
            diagnostic: draft.diagnostic,
            patient: Patient {
                name: draft.patient.name,
                age,
                sex,
                address: draft.patient.address,
                medical_history: draft.patient.medical_history,
            },
        })
    }
}

/// A complete example record, used by the `sample` command and the tests.
pub fn sample_record() -> ServiceRecord {
    ServiceRecord {
        date: "2024-01-01".into(),
        time: "08:00".into(),
        timestamps: Timestamps {
            entry: "08:05".into(),
            exit: "08:30".into(),
            arrival: "09:00".into(),
        },
        kilometers: Kilometers {
            entry: 10.0,
            exit: 15.0,
            arrival: 40.0,
        },
        service_type: ServiceType::Emergency,
        diagnostic: "Fratura".into(),
        patient: Patient {
            name: "J. Silva".into(),
            age: 34,
            sex: Sex::Male,
            address: "Rua X".into(),
            medical_history: "Nenhum".into(),
        },
    }
}
