use chrono::NaiveDate;
use tempfile::TempDir;

use screening_tool_data::repository::{read_rows, CsvStorage, PatientRepository, PatientRepositoryTrait};
use screening_tool_domain::entities::{
    BloodPressure, BloodPressureEntry, FastingStatus, RegisterPatientRequest, Sex, VisualAcuity,
    VisualAcuityEntry,
};
use screening_tool_domain::services::{ScreeningService, ScreeningServiceTrait};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

fn request(first: &str, last: &str, department: &str) -> RegisterPatientRequest {
    RegisterPatientRequest {
        first_name: first.to_string(),
        middle_name: Some("".to_string()),
        last_name: last.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1988, 11, 3).unwrap(),
        sex: Sex::Male,
        department: department.to_string(),
        job_title: None,
        email: None,
        phone_number: Some("0112345678".to_string()),
    }
}

fn open(path: &std::path::Path) -> ScreeningService<PatientRepository> {
    ScreeningService::with_clock(PatientRepository::new(CsvStorage::new(path)), today)
}

#[tokio::test]
async fn test_register_measure_assess_export_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("medical_records.csv");

    let service = open(&path);
    let report = service.load().await;
    assert_eq!(report.records, 0);
    assert!(report.warning.is_none());

    let kamal = service
        .register_patient(request("Kamal", "Perera", "Reference Lab"))
        .await
        .unwrap();
    let nimal = service
        .register_patient(request("Nimal", "Silva", "Office of RDHS"))
        .await
        .unwrap();
    assert_eq!(kamal.unique_code, "KPRL0001");
    assert_eq!(nimal.unique_code, "NSRD0002");
    assert_eq!(kamal.age, 35);

    service
        .record_blood_pressure(
            &kamal.unique_code,
            BloodPressureEntry {
                reading: "150/95".parse::<BloodPressure>().unwrap(),
                notes: Some("repeat in 10 min".to_string()),
            },
        )
        .await
        .unwrap();
    service.record_bmi(&kamal.unique_code, 98.0, 1.78).await.unwrap();
    service
        .record_glucose(&kamal.unique_code, 12.4, FastingStatus::Random)
        .await
        .unwrap();
    service
        .record_visual_acuity(
            &nimal.unique_code,
            VisualAcuityEntry {
                acuity: VisualAcuity {
                    right: Some("6/9".to_string()),
                    left: Some("6/9".to_string()),
                    right_corrected: Some("6/6".to_string()),
                    left_corrected: Some("6/6".to_string()),
                },
                notes: None,
            },
        )
        .await
        .unwrap();
    service
        .refer_patient(&kamal.unique_code, Some("Medical clinic".to_string()))
        .await
        .unwrap();

    let assessment = service.assess(&kamal.unique_code).await.unwrap();
    assert_eq!(
        assessment.labels(),
        vec!["Hypertension", "Obesity", "Diabetes (Random)"]
    );
    assert!(!service.assess(&nimal.unique_code).await.unwrap().has_risk());

    // Export is the same flat format as the data file
    let exported = service.export_csv().await.unwrap();
    let exported_rows = read_rows(exported.as_slice()).unwrap();
    assert_eq!(exported_rows.len(), 2);

    let before = service.list_records().await.unwrap();
    let reloaded = open(&path);
    assert_eq!(reloaded.load().await.records, 2);
    let after = reloaded.list_records().await.unwrap();
    assert_eq!(before, after);
    assert!(after.unreadable.is_empty());

    // Numbering continues from the stored codes
    let third = reloaded
        .register_patient(request("Sunil", "Bandara", "Human Resource"))
        .await
        .unwrap();
    assert_eq!(third.unique_code, "SBHR0003");
}

#[tokio::test]
async fn test_corrupt_file_starts_empty_with_warning() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("medical_records.csv");
    std::fs::write(&path, "Unique Code,First Name\nASPH0001\n").unwrap();

    let service = open(&path);
    let report = service.load().await;

    assert_eq!(report.records, 0);
    assert!(report.warning.is_some());
    assert!(service.list_records().await.unwrap().records.is_empty());
}

#[tokio::test]
async fn test_unreadable_file_survives_next_registration() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("medical_records.csv");

    let service = open(&path);
    service.register_patient(request("Kamal", "Perera", "Reference Lab")).await.unwrap();
    service.register_patient(request("Nimal", "Silva", "Office of RDHS")).await.unwrap();

    // Spreadsheet-style capitalised boolean in the Referred column
    let original = std::fs::read_to_string(&path).unwrap().replace(",false,", ",True,");
    std::fs::write(&path, &original).unwrap();

    let reopened = open(&path);
    assert!(reopened.load().await.warning.is_some());
    let third = reopened
        .register_patient(request("Sunil", "Bandara", "Human Resource"))
        .await
        .unwrap();
    assert_eq!(third.unique_code, "SBHR0001");

    let backups: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.to_string_lossy().contains("medical_records.csv.unreadable-"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), original);
    assert_eq!(read_rows(std::fs::read(&path).unwrap().as_slice()).unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_change_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("medical_records.csv");

    let service = open(&path);
    let kamal = service
        .register_patient(request("Kamal", "Perera", "Public Health"))
        .await
        .unwrap();
    service
        .record_blood_pressure(
            &kamal.unique_code,
            BloodPressureEntry {
                reading: "150/85".parse::<BloodPressure>().unwrap(),
                notes: None,
            },
        )
        .await
        .unwrap();

    let edited = std::fs::read_to_string(&path).unwrap().replace("150/85", "150-85");
    std::fs::write(&path, &edited).unwrap();

    let reopened = open(&path);
    assert_eq!(reopened.load().await.records, 1);
    let err = reopened.record_bmi(&kamal.unique_code, 80.0, 1.8).await.unwrap_err();
    assert!(err.is_recoverable());

    assert_eq!(std::fs::read_to_string(&path).unwrap(), edited);
    let row = reopened.repository().get_by_code(&kamal.unique_code).await.unwrap().unwrap();
    assert_eq!(row.bmi, None);
}
