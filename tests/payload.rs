use medreport::record::{sample_record, ServiceType, Sex};
use medreport::report::{SectionKind, Report};
use medreport::{Locale, ServiceRecord, ValidationErrorKind};
use serde_json::{json, Value};

fn payload() -> Value {
    json!({
        "date": "2024-01-01",
        "time": "08:00",
        "timestamps": { "entry": "08:05", "exit": "08:30", "arrival": "09:00" },
        "kilometers": { "entry": 10.0, "exit": 15.0, "arrival": 40.0 },
        "service_type": "Emergência",
        "diagnostic": "Fratura",
        "patient": {
            "name": "J. Silva",
            "age": 34,
            "sex": "Masculino",
            "address": "Rua X",
            "medical_history": "Nenhum"
        }
    })
}

fn parse(value: Value) -> Result<ServiceRecord, medreport::ValidationError> {
    ServiceRecord::from_json(value.to_string().as_bytes())
}

#[test]
fn end_to_end_layout() {
    let record = parse(payload()).expect("valid payload");
    assert_eq!(record, sample_record());

    let report = Report::from_record(&record, Locale::English);
    assert_eq!(report.title(), "MEDICAL SERVICE REPORT");

    let titles: Vec<&str> = report.sections().iter().map(|section| section.title()).collect();
    assert_eq!(
        titles,
        ["Date & Time", "Timestamps", "Kilometers", "Service Details", "Patient Information"]
    );

    let section = |kind| report.section(kind).expect("section present");
    assert_eq!(section(SectionKind::DateTime).value_of("Date"), Some("2024-01-01"));
    assert_eq!(section(SectionKind::Timestamps).value_of("Arrival at Destination"), Some("09:00"));
    assert_eq!(section(SectionKind::Kilometers).value_of("KM at Entry"), Some("10.0 km"));
    assert_eq!(section(SectionKind::Kilometers).value_of("KM at Arrival"), Some("40.0 km"));
    assert_eq!(section(SectionKind::ServiceDetails).value_of("Type of Service"), Some("Emergência"));
    assert_eq!(section(SectionKind::ServiceDetails).value_of("Diagnostic"), Some("Fratura"));
    assert_eq!(section(SectionKind::PatientInformation).value_of("Age"), Some("34"));
    assert_eq!(section(SectionKind::PatientInformation).value_of("Sex"), Some("Masculino"));
}

#[test]
fn fractional_kilometers_print_verbatim() {
    let mut value = payload();
    value["kilometers"]["arrival"] = json!(12.5);
    let record = parse(value).unwrap();
    let report = Report::from_record(&record, Locale::English);
    assert_eq!(
        report.section(SectionKind::Kilometers).unwrap().value_of("KM at Arrival"),
        Some("12.5 km")
    );
}

#[test]
fn missing_age_names_the_field() {
    let mut value = payload();
    value["patient"].as_object_mut().unwrap().remove("age");
    let err = parse(value).unwrap_err();
    assert_eq!(err.field(), "patient.age");
    assert!(err.is_missing());
}

#[test]
fn null_counts_as_missing() {
    let mut value = payload();
    value["diagnostic"] = Value::Null;
    let err = parse(value).unwrap_err();
    assert_eq!(err.field(), "diagnostic");
    assert!(err.is_missing());
}

#[test]
fn wrong_types_report_their_path() {
    let mut value = payload();
    value["kilometers"]["exit"] = json!("fifteen");
    let err = parse(value).unwrap_err();
    assert_eq!(err.field(), "kilometers.exit");
    assert!(matches!(err.kind(), ValidationErrorKind::InvalidType(_)));
}

#[test]
fn ages_outside_the_range_are_rejected() {
    for age in [-1, 121] {
        let mut value = payload();
        value["patient"]["age"] = json!(age);
        let err = parse(value).unwrap_err();
        assert_eq!(err.field(), "patient.age");
        assert!(matches!(err.kind(), ValidationErrorKind::OutOfRange { .. }));
    }

    for age in [0, 120] {
        let mut value = payload();
        value["patient"]["age"] = json!(age);
        assert!(parse(value).is_ok());
    }
}

#[test]
fn negative_kilometers_are_rejected() {
    let mut value = payload();
    value["kilometers"]["entry"] = json!(-0.5);
    let err = parse(value).unwrap_err();
    assert_eq!(err.field(), "kilometers.entry");
}

#[test]
fn closed_sets_are_enforced() {
    let mut value = payload();
    value["patient"]["sex"] = json!("M");
    assert_eq!(parse(value).unwrap_err().field(), "patient.sex");

    let mut value = payload();
    value["service_type"] = json!("Emergency");
    let err = parse(value).unwrap_err();
    assert_eq!(err.field(), "service_type");
    assert!(err.to_string().contains("Transferência hospitalar"));
}

#[test]
fn every_label_in_the_closed_sets_is_accepted() {
    for service_type in ServiceType::ALL {
        let mut value = payload();
        value["service_type"] = json!(service_type.label());
        assert_eq!(parse(value).unwrap().service_type(), service_type);
    }
    for sex in Sex::ALL {
        let mut value = payload();
        value["patient"]["sex"] = json!(sex.label());
        assert_eq!(parse(value).unwrap().patient().sex(), sex);
    }
}

#[test]
fn bad_date_and_time_formats() {
    let mut value = payload();
    value["date"] = json!("01/01/2024");
    assert_eq!(parse(value).unwrap_err().field(), "date");

    let mut value = payload();
    value["timestamps"]["exit"] = json!("8h30");
    assert_eq!(parse(value).unwrap_err().field(), "timestamps.exit");

    let mut value = payload();
    value["time"] = json!("08:00:00");
    assert!(parse(value).is_ok());
}

#[test]
fn records_serialize_to_the_wire_shape() {
    let serialized = serde_json::to_value(sample_record()).unwrap();
    assert_eq!(serialized, payload());
}

#[test]
fn unrelated_checkpoints_are_not_cross_checked() {
    let mut value = payload();
    value["timestamps"]["exit"] = json!("07:00");
    value["kilometers"]["arrival"] = json!(1.0);
    assert!(parse(value).is_ok());
}
