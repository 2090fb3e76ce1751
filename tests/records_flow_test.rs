//! 记录服务集成测试
//!
//! 患者 CRUD、归属校验、处方、警报、设置，以及 SQLite 引擎的全流程验证

use std::sync::Arc;

use neuro_glove::auth::RequestContext;
use neuro_glove::config::DatabaseConfig;
use neuro_glove::records::{
    AlertService, AlertSeverity, DoctorSettings, Measurement, MeasurementService, Medication,
    NewAlert, NewPatient, NewPrescription, PatientService, PatientUpdate, PrescriptionService,
    ProfileService, RecordError, SettingsService,
};
use neuro_glove::store::{MemoryStore, SharedStore, SqliteStore};
use tempfile::TempDir;

fn test_context() -> RequestContext {
    RequestContext {
        doctor_id: "doctor-1".to_string(),
        name: "Dr. Test".to_string(),
        specialty: "Endocrinology".to_string(),
        email: "test@clinic.local".to_string(),
    }
}

fn demo_patient() -> NewPatient {
    NewPatient {
        first_name: "Marie".to_string(),
        last_name: "Dubois".to_string(),
        date_of_birth: "1962-04-17".to_string(),
        phone: "+33 6 12 34 56 78".to_string(),
        email: "marie.dubois@example.com".to_string(),
        medical_history: "Type 2 diabetes".to_string(),
        diagnosis: "Neuropathy risk monitoring".to_string(),
    }
}

fn memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

#[tokio::test]
async fn test_patient_crud_roundtrip() {
    let store = memory_store();
    let ctx = test_context();
    let patients = PatientService::new(store.clone());

    let created = patients.create(&ctx, demo_patient()).await.unwrap();
    assert_eq!(created.doctor_id, ctx.doctor_id);
    assert_eq!(created.full_name(), "Marie Dubois");

    let listed = patients.list(&ctx).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    // 部分更新：仅覆盖给出的字段，并刷新 updated_at
    let updated = patients
        .update(
            &ctx,
            &created.id,
            PatientUpdate {
                diagnosis: Some("Confirmed neuropathy".to_string()),
                ..PatientUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.diagnosis, "Confirmed neuropathy");
    assert_eq!(updated.first_name, "Marie");
    assert!(updated.updated_at >= created.updated_at);

    patients.delete(&ctx, &created.id).await.unwrap();
    assert!(patients.list(&ctx).await.unwrap().is_empty());

    // 再次删除应报告不存在
    assert!(matches!(
        patients.delete(&ctx, &created.id).await,
        Err(RecordError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_patients_are_scoped_to_their_doctor() {
    let store = memory_store();
    let ctx = test_context();
    let other_ctx = RequestContext {
        doctor_id: "doctor-2".to_string(),
        ..test_context()
    };

    let patients = PatientService::new(store.clone());
    let patient = patients.create(&ctx, demo_patient()).await.unwrap();

    // 其他医生看不到该患者
    assert!(patients.list(&other_ctx).await.unwrap().is_empty());
    assert!(matches!(
        patients.get(&other_ctx, &patient.id).await,
        Err(RecordError::NotFound { .. })
    ));

    // 从属记录操作同样被拒
    let measurements = MeasurementService::new(store.clone());
    let result = measurements
        .record(&other_ctx, &patient.id, Measurement::new(80.0, 34.0, 60.0))
        .await;
    assert!(matches!(result, Err(RecordError::NotFound { .. })));
}

#[tokio::test]
async fn test_non_finite_measurement_is_rejected() {
    let store = memory_store();
    let ctx = test_context();
    let patient = PatientService::new(store.clone())
        .create(&ctx, demo_patient())
        .await
        .unwrap();

    let measurements = MeasurementService::new(store.clone());

    let result = measurements
        .record(&ctx, &patient.id, Measurement::new(f64::NAN, 34.0, 60.0))
        .await;
    assert!(matches!(result, Err(RecordError::InvalidInput(_))));

    // 无效读数不应落盘
    assert!(measurements.list(&ctx, &patient.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_prescription_requires_named_medication() {
    let store = memory_store();
    let ctx = test_context();
    let patient = PatientService::new(store.clone())
        .create(&ctx, demo_patient())
        .await
        .unwrap();

    let prescriptions = PrescriptionService::new(store.clone());

    // 全部为空行：拒绝
    let result = prescriptions
        .create(
            &ctx,
            &patient.id,
            NewPrescription {
                medications: vec![Medication {
                    name: "  ".to_string(),
                    dosage: String::new(),
                    frequency: String::new(),
                    duration: String::new(),
                }],
                notes: String::new(),
            },
        )
        .await;
    assert!(matches!(result, Err(RecordError::InvalidInput(_))));

    // 未命名行被过滤，其余保留
    let prescription = prescriptions
        .create(
            &ctx,
            &patient.id,
            NewPrescription {
                medications: vec![
                    Medication {
                        name: "Pregabalin".to_string(),
                        dosage: "75 mg".to_string(),
                        frequency: "2x/day".to_string(),
                        duration: "1 month".to_string(),
                    },
                    Medication {
                        name: String::new(),
                        dosage: String::new(),
                        frequency: String::new(),
                        duration: String::new(),
                    },
                ],
                notes: "Follow-up in 4 weeks".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(prescription.medications.len(), 1);
    assert_eq!(prescription.medications[0].name, "Pregabalin");

    let listed = prescriptions.list(&ctx, &patient.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_alert_mark_read_is_idempotent() {
    let store = memory_store();
    let ctx = test_context();
    let alerts = AlertService::new(store.clone());

    let alert = alerts
        .create(
            &ctx,
            NewAlert {
                severity: AlertSeverity::Info,
                title: "Glove battery low".to_string(),
                message: "Battery below 20%".to_string(),
                patient_id: None,
                patient_name: None,
            },
        )
        .await
        .unwrap();
    assert!(!alert.read);

    let marked = alerts.mark_read(&ctx, &alert.id).await.unwrap();
    assert!(marked.read);

    // 重复标记保持已读
    let marked_again = alerts.mark_read(&ctx, &alert.id).await.unwrap();
    assert!(marked_again.read);

    // 不存在的警报
    assert!(matches!(
        alerts.mark_read(&ctx, "missing").await,
        Err(RecordError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_settings_served_with_defaults() {
    let store = memory_store();
    let ctx = test_context();
    let settings = SettingsService::new(store.clone());

    // 未保存过：返回默认值
    let current = settings.get(&ctx).await.unwrap();
    assert_eq!(current.theme, "light");
    assert_eq!(current.alert_thresholds.pressure, 50.0);
    assert_eq!(current.alert_thresholds.temperature, 30.0);
    assert_eq!(current.alert_thresholds.emg, 20.0);

    let mut updated = DoctorSettings::default();
    updated.theme = "dark".to_string();
    updated.measurement_frequency_ms = 500;
    settings.put(&ctx, updated).await.unwrap();

    let current = settings.get(&ctx).await.unwrap();
    assert_eq!(current.theme, "dark");
    assert_eq!(current.measurement_frequency_ms, 500);
}

#[tokio::test]
async fn test_profile_register_and_get() {
    let store = memory_store();
    let ctx = test_context();
    let profiles = ProfileService::new(store.clone());

    assert!(profiles.get(&ctx.doctor_id).await.unwrap().is_none());

    let profile = profiles.register(&ctx).await.unwrap();
    assert_eq!(profile.id, ctx.doctor_id);
    assert_eq!(profile.specialty, "Endocrinology");

    let loaded = profiles.get(&ctx.doctor_id).await.unwrap().unwrap();
    assert_eq!(loaded.email, ctx.email);
}

#[tokio::test]
async fn test_full_flow_over_sqlite_engine() {
    // 在CI环境中，使用更明确的临时目录路径
    let temp_dir = if std::env::var("CI").is_ok() {
        TempDir::new_in(".").unwrap_or_else(|_| TempDir::new().unwrap())
    } else {
        TempDir::new().unwrap()
    };
    let db_path = temp_dir.path().join("records.db");
    let config = DatabaseConfig {
        url: format!("sqlite:{}", db_path.display()),
        ..DatabaseConfig::default()
    };

    let store: SharedStore = Arc::new(SqliteStore::new(&config).await.unwrap());
    let ctx = test_context();

    let patient = PatientService::new(store.clone())
        .create(&ctx, demo_patient())
        .await
        .unwrap();

    let measurements = MeasurementService::new(store.clone());
    measurements
        .record_batch(
            &ctx,
            &patient.id,
            vec![
                Measurement::new(80.0, 34.0, 60.0),
                Measurement::new(75.0, 33.5, 55.0),
            ],
        )
        .await
        .unwrap();

    let listed = measurements.list(&ctx, &patient.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    for record in &listed {
        assert_eq!(record.patient_id, patient.id);
        assert_eq!(record.doctor_id, ctx.doctor_id);
    }
}
