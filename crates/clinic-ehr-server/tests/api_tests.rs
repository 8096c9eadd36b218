//! Router-level tests: every request goes through `build_router` the way
//! the binary serves it.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use clinic_ehr_core::models::{Medication, MedicationInput, Patient, PatientInput, User, UserInput};
use clinic_ehr_core::{Database, FsBackupStore, RetentionPolicy, Role};
use clinic_ehr_server::{build_router, AppState, GoogleConfig, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

fn config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_path: PathBuf::from(":memory:"),
        backup_dir: dir.path().join("backups"),
        log_level: "debug".into(),
        log_json: false,
        retention: RetentionPolicy::default(),
        google: GoogleConfig {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            api_base_url: "https://www.googleapis.com/calendar/v3".into(),
        },
    }
}

fn app() -> TestApp {
    app_with(|_| {})
}

fn app_with(customize: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    customize(&mut config);
    let store = FsBackupStore::new(&config.backup_dir).unwrap();
    let state = AppState::with_parts(Database::open_in_memory().unwrap(), Arc::new(store), config);
    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

impl TestApp {
    fn user(&self, role: Role) -> User {
        let user = User::new(UserInput {
            email: format!("{}@clinic.org", role.as_str()),
            full_name: format!("Test {role}"),
            role,
            department_id: None,
            phone: None,
        });
        self.state.db.lock().unwrap().insert_user(&user).unwrap();
        user
    }

    fn patient(&self, first: &str, last: &str) -> Patient {
        let patient = Patient::new(PatientInput {
            first_name: first.into(),
            last_name: last.into(),
            ..Default::default()
        });
        self.state.db.lock().unwrap().insert_patient(&patient).unwrap();
        patient
    }

    async fn send(&self, method: Method, uri: &str, user: Option<&User>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, text) = self.send_raw(method, uri, user, body).await;
        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, value)
    }

    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, header::HeaderMap, String) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header("X-User-Id", user.id.as_str());
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }
}

#[tokio::test]
async fn test_health_needs_no_identity() {
    let app = app();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_and_unknown_identity() {
    let app = app();

    let (status, body) = app.send(Method::GET, "/api/patients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("X-User-Id"));

    let ghost = User::new(UserInput {
        email: "ghost@clinic.org".into(),
        full_name: "Nobody".into(),
        role: Role::Admin,
        department_id: None,
        phone: None,
    });
    let (status, _) = app.send(Method::GET, "/api/patients", Some(&ghost), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deactivated_user_is_rejected() {
    let app = app();
    let admin = app.user(Role::Admin);
    let nurse = app.user(Role::Nurse);

    let (status, body) = app
        .send(Method::POST, &format!("/api/users/{}/deactivate", nurse.id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (status, _) = app.send(Method::GET, "/api/patients", Some(&nurse), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_permissions() {
    let app = app();
    let receptionist = app.user(Role::Receptionist);
    let accountant = app.user(Role::Accountant);

    let (status, body) = app.send(Method::GET, "/api/lab-tests", Some(&receptionist), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = app.send(Method::GET, "/api/backups", Some(&receptionist), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::GET, "/api/reports/summary", Some(&accountant), None).await;
    assert_eq!(status, StatusCode::OK);

    // Everyone can read clinic settings
    let (status, body) = app.send(Method::GET, "/api/settings", Some(&accountant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currency"], "USD");
}

#[tokio::test]
async fn test_patient_crud() {
    let app = app();
    let receptionist = app.user(Role::Receptionist);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/patients",
            Some(&receptionist),
            Some(json!({
                "first_name": "  Kwame ",
                "last_name": "Mensah",
                "phone": "+233 20 555 0199",
                "date_of_birth": "1988-04-12"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let patient = &body["data"];
    let id = patient["id"].as_str().unwrap().to_string();
    assert_eq!(patient["first_name"], "Kwame");
    assert!(patient["mrn"].as_str().unwrap().starts_with("MRN-"));

    let (status, body) = app
        .send(Method::GET, "/api/patients?q=kwa", Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/patients/{id}"),
            Some(&receptionist),
            Some(json!({ "first_name": "Kwame", "last_name": "Mensah-Owusu" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["last_name"], "Mensah-Owusu");
    assert_eq!(body["data"]["mrn"], patient["mrn"]);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/patients/{id}"), Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::GET, &format!("/api/patients/{id}"), Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_patient_validation() {
    let app = app();
    let nurse = app.user(Role::Nurse);
    let next_week = (Utc::now() + Duration::days(7)).date_naive();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/patients",
            Some(&nurse),
            Some(json!({ "first_name": "", "last_name": "Mensah" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("first_name"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/patients",
            Some(&nurse),
            Some(json!({ "first_name": "Baby", "last_name": "Mensah", "date_of_birth": next_week })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_double_booking_conflict() {
    let app = app();
    let receptionist = app.user(Role::Receptionist);
    let doctor = app.user(Role::Doctor);
    let first = app.patient("Amina", "Okafor");
    let second = app.patient("Chidi", "Nwosu");
    let at = (Utc::now() + Duration::days(1)).to_rfc3339();

    let book = |patient: &Patient| {
        json!({
            "patient_id": patient.id,
            "doctor_id": doctor.id,
            "scheduled_at": at,
            "duration_minutes": 30
        })
    };

    let (status, body) = app
        .send(Method::POST, "/api/appointments", Some(&receptionist), Some(book(&first)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "scheduled");

    let (status, body) = app
        .send(Method::POST, "/api/appointments", Some(&receptionist), Some(book(&second)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already booked"));
}

#[tokio::test]
async fn test_appointment_status_and_edit_window() {
    let app = app();
    let receptionist = app.user(Role::Receptionist);
    let doctor = app.user(Role::Doctor);
    let patient = app.patient("Amina", "Okafor");

    let (_, body) = app
        .send(
            Method::POST,
            "/api/appointments",
            Some(&receptionist),
            Some(json!({
                "patient_id": patient.id,
                "doctor_id": doctor.id,
                "scheduled_at": (Utc::now() + Duration::hours(3)).to_rfc3339()
            })),
        )
        .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::GET, &format!("/api/appointments/{id}"), Some(&receptionist), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["edit_window"], "open");
    assert_eq!(body["data"]["patient_name"], "Amina Okafor");
    assert!(!body["data"]["date_label"].as_str().unwrap().is_empty());

    // scheduled -> completed skips check-in
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/appointments/{id}/status"),
            Some(&receptionist),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/appointments/{id}/status"),
            Some(&receptionist),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/appointments/{id}"),
            Some(&receptionist),
            Some(json!({
                "patient_id": patient.id,
                "doctor_id": doctor.id,
                "scheduled_at": (Utc::now() + Duration::hours(5)).to_rfc3339()
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no longer change"));
}

#[tokio::test]
async fn test_dispense_draws_down_stock() {
    let app = app();
    let doctor = app.user(Role::Doctor);
    let pharmacist = app.user(Role::Pharmacist);
    let patient = app.patient("Amina", "Okafor");
    let medication = Medication::new(MedicationInput {
        name: "Amoxicillin".into(),
        generic_name: None,
        category: None,
        form: Some("capsule".into()),
        strength: Some("500mg".into()),
        unit: "capsule".into(),
        stock_quantity: 30,
        reorder_level: 10,
        unit_price_cents: 25,
        expiry_date: None,
        supplier: None,
    });
    app.state.db.lock().unwrap().insert_medication(&medication).unwrap();

    let prescribe = |quantity: i64| {
        json!({
            "patient_id": patient.id,
            "doctor_id": doctor.id,
            "medication_id": medication.id,
            "dosage": "500mg",
            "frequency": "three times daily",
            "quantity": quantity
        })
    };

    let (status, body) = app
        .send(Method::POST, "/api/prescriptions", Some(&doctor), Some(prescribe(21)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let first = body["data"]["id"].as_str().unwrap().to_string();

    // Doctors prescribe but do not dispense
    let (status, _) = app
        .send(Method::POST, &format!("/api/prescriptions/{first}/dispense"), Some(&doctor), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::POST, &format!("/api/prescriptions/{first}/dispense"), Some(&pharmacist), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "dispensed");
    assert_eq!(body["data"]["dispensed_by"], pharmacist.id.as_str());

    let (_, body) = app
        .send(Method::POST, "/api/prescriptions", Some(&doctor), Some(prescribe(21)))
        .await;
    let second = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body) = app
        .send(Method::POST, &format!("/api/prescriptions/{second}/dispense"), Some(&pharmacist), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("insufficient stock"));

    let (_, body) = app
        .send(Method::GET, "/api/medications/low-stock", Some(&pharmacist), None)
        .await;
    let low = body["data"].as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["stock_quantity"], 9);
}

#[tokio::test]
async fn test_payment_export_csv() {
    let app = app();
    let accountant = app.user(Role::Accountant);
    let patient = app.patient("Amina", "Okafor");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/payments",
            Some(&accountant),
            Some(json!({
                "patient_id": patient.id,
                "amount_cents": 15000,
                "method": "mobile_money",
                "description": "Consultation, follow-up"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::POST, &format!("/api/payments/{id}/pay"), Some(&accountant), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");

    let from = (Utc::now() - Duration::days(1)).format("%Y-%m-%dT%H:%M:%SZ");
    let to = (Utc::now() + Duration::days(1)).format("%Y-%m-%dT%H:%M:%SZ");
    let (status, headers, text) = app
        .send_raw(
            Method::GET,
            &format!("/api/payments/export?from={from}&to={to}&format=csv"),
            Some(&accountant),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("payment_id,created_at,patient_mrn"));
    let row = lines.next().unwrap();
    assert!(row.contains("150.00"));
    assert!(row.contains("\"Consultation, follow-up\""));

    let (status, _, _) = app
        .send_raw(
            Method::GET,
            &format!("/api/payments/export?from={to}&to={from}"),
            Some(&accountant),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backup_and_restore() {
    let app = app();
    let admin = app.user(Role::Admin);
    app.patient("Amina", "Okafor");

    let (status, body) = app.send(Method::POST, "/api/backups", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "success");
    assert_eq!(body["data"]["kind"], "manual");
    let backup_id = body["data"]["id"].as_str().unwrap().to_string();

    app.patient("Chidi", "Nwosu");
    let (_, body) = app.send(Method::GET, "/api/patients", Some(&admin), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .send(Method::POST, &format!("/api/backups/{backup_id}/restore"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.send(Method::GET, "/api/patients", Some(&admin), None).await;
    let patients = body["data"].as_array().unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0]["first_name"], "Amina");

    let (_, body) = app.send(Method::GET, "/api/backups", Some(&admin), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::POST, "/api/backups/missing/restore", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backup_schedule_validation() {
    let app = app();
    let admin = app.user(Role::Admin);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/backup-schedules",
            Some(&admin),
            Some(json!({
                "name": "Month end",
                "frequency": "monthly",
                "time_of_day": "23:00:00",
                "day_of_month": 31,
                "enabled": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/backup-schedules",
            Some(&admin),
            Some(json!({
                "name": "Nightly",
                "frequency": "daily",
                "time_of_day": "02:00:00",
                "enabled": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Nightly");
    assert!(body["data"]["next_run_at"].is_string());
}

#[tokio::test]
async fn test_deployment_lifecycle() {
    let app = app();
    let admin = app.user(Role::Admin);

    let stage = |version: &str| json!({ "version": version, "notes": "release notes" });
    let (_, body) = app.send(Method::POST, "/api/deployments", Some(&admin), Some(stage("1.0.0"))).await;
    let v1 = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = app.send(Method::POST, "/api/deployments", Some(&admin), Some(stage("1.1.0"))).await;
    let v2 = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::POST, &format!("/api/deployments/{v1}/promote"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .send(Method::POST, &format!("/api/deployments/{v2}/promote"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "live");

    let (status, body) = app
        .send(Method::POST, &format!("/api/deployments/{v2}/rollback"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["live"]["version"], "1.0.0");

    let (_, body) = app.send(Method::GET, "/api/deployments/live", Some(&admin), None).await;
    assert_eq!(body["data"]["id"], v1.as_str());
}

#[tokio::test]
async fn test_calendar_without_oauth_client() {
    let app = app();
    let admin = app.user(Role::Admin);

    let (status, body) = app.send(Method::GET, "/api/calendar/status", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["configured"], false);
    assert_eq!(body["data"]["connected"], false);
    assert!(body["data"].get("access_token").is_none());

    let (status, body) = app.send(Method::GET, "/api/calendar/auth-url", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not configured"));

    let patient = app.patient("Amina", "Okafor");
    let (status, _) = app
        .send(Method::POST, &format!("/api/calendar/sync/{}", patient.id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn app_with_google(google: &MockServer) -> TestApp {
    let base = google.uri();
    app_with(|config| {
        config.google.client_id = "client-123".into();
        config.google.client_secret = "secret".into();
        config.google.redirect_uri = "https://clinic.example/api/calendar/callback".into();
        config.google.auth_url = format!("{base}/auth");
        config.google.token_url = format!("{base}/token");
        config.google.api_base_url = format!("{base}/calendar/v3");
    })
}

#[tokio::test]
async fn test_calendar_callback_requires_issued_state() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&google)
        .await;
    let app = app_with_google(&google);
    let admin = app.user(Role::Admin);

    let (status, body) = app.send(Method::GET, "/api/calendar/auth-url", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let state = body["data"]["state"].as_str().unwrap().to_string();
    assert!(body["data"]["url"].as_str().unwrap().contains(&state));

    for uri in [
        "/api/calendar/callback?code=code-1".to_string(),
        "/api/calendar/callback?code=code-1&state=forged".to_string(),
    ] {
        let (status, body) = app.send(Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("OAuth state"));
    }

    let callback = format!("/api/calendar/callback?code=code-1&state={state}");
    let (status, body) = app.send(Method::GET, &callback, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], true);

    // Each state is good for one callback
    let (status, _) = app.send(Method::GET, &callback, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calendar_callback_rejects_unusable_token_lifetime() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": i64::MAX
        })))
        .mount(&google)
        .await;
    let app = app_with_google(&google);
    let admin = app.user(Role::Admin);

    let (_, body) = app.send(Method::GET, "/api/calendar/auth-url", Some(&admin), None).await;
    let state = body["data"]["state"].as_str().unwrap().to_string();
    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/calendar/callback?code=code-1&state={state}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("expires_in"));

    let (_, body) = app.send(Method::GET, "/api/calendar/status", Some(&admin), None).await;
    assert_eq!(body["data"]["connected"], false);
}

#[tokio::test]
async fn test_stock_adjustment_out_of_range() {
    let app = app();
    let pharmacist = app.user(Role::Pharmacist);
    let medication = Medication::new(MedicationInput {
        name: "Paracetamol".into(),
        generic_name: None,
        category: None,
        form: None,
        strength: None,
        unit: "tablet".into(),
        stock_quantity: 10,
        reorder_level: 2,
        unit_price_cents: 50,
        expiry_date: None,
        supplier: None,
    });
    app.state.db.lock().unwrap().insert_medication(&medication).unwrap();
    let uri = format!("/api/medications/{}/stock", medication.id);

    for delta in [i64::MAX, i64::MIN] {
        let (status, _) = app
            .send(Method::POST, &uri, Some(&pharmacist), Some(json!({ "delta": delta })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{delta}");
    }

    let (status, body) = app.send(Method::GET, "/api/medications", Some(&pharmacist), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["stock_quantity"], 10);
}
