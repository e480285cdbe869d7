use assert_matches::assert_matches;
use chrono::{Duration, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::SchedulingError;
use appointment_cell::services::slots::SlotCalculatorService;
use shared_config::AppConfig;
use shared_utils::test_utils::{MockStoreResponses, TestConfig};

fn config_for(server: &MockServer) -> AppConfig {
    TestConfig {
        supabase_url: server.uri(),
        ..TestConfig::default()
    }
    .to_app_config()
}

async fn mount_doctor_mocks(server: &MockServer, doctor_id: &str, department_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::user_response(doctor_id, "Dr. Jane Smith", "doctor@example.com", "doctor")
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::doctor_profile_response(doctor_id, department_id, None)
        ])))
        .mount(server)
        .await;
}

async fn mount_room_mock(server: &MockServer, department_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::room_response(&Uuid::new_v4().to_string(), "P101", Some(department_id))
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn clean_day_reports_all_18_slots_available() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let department_id = Uuid::new_v4();

    mount_doctor_mocks(&server, &doctor_id.to_string(), &department_id.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_room_mock(&server, &department_id.to_string()).await;

    let service = SlotCalculatorService::new(&config_for(&server));
    let date = (Utc::now() + Duration::days(3)).date_naive();

    let response = service
        .get_available_slots(doctor_id, date, None, None)
        .await
        .expect("availability should succeed");

    assert_eq!(response.date, date);
    assert_eq!(response.doctor.full_name, "Dr. Jane Smith");
    assert_eq!(response.slots.len(), 18);
    assert!(response.slots.iter().all(|s| s.available));
    assert!(response
        .slots
        .iter()
        .all(|s| s.room.as_deref() == Some("P101")));

    // Ascending from 08:00 to 16:30.
    assert_eq!(response.slots[0].time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    assert_eq!(
        response.slots[17].time,
        NaiveTime::from_hms_opt(16, 30, 0).unwrap()
    );
    for pair in response.slots.windows(2) {
        assert!(pair[0].time < pair[1].time);
    }
}

#[tokio::test]
async fn booked_times_are_marked_unavailable_without_a_room() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let department_id = Uuid::new_v4();
    let date = (Utc::now() + Duration::days(3)).date_naive();

    mount_doctor_mocks(&server, &doctor_id.to_string(), &department_id.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                &department_id.to_string(),
                &date.to_string(),
                "09:00:00",
                "booked",
                500_000.0,
            ),
            MockStoreResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                &department_id.to_string(),
                &date.to_string(),
                "14:30:00",
                "confirmed",
                500_000.0,
            )
        ])))
        .mount(&server)
        .await;
    mount_room_mock(&server, &department_id.to_string()).await;

    let service = SlotCalculatorService::new(&config_for(&server));
    let response = service
        .get_available_slots(doctor_id, date, None, None)
        .await
        .expect("availability should succeed");

    assert_eq!(response.slots.len(), 18);

    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let half_three = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
    for slot in &response.slots {
        if slot.time == nine || slot.time == half_three {
            assert!(!slot.available, "occupied slot {} should be blocked", slot.time);
            assert_eq!(slot.room, None);
        } else {
            assert!(slot.available, "free slot {} should be bookable", slot.time);
        }
    }
}

#[tokio::test]
async fn availability_read_is_idempotent() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let department_id = Uuid::new_v4();
    let date = (Utc::now() + Duration::days(5)).date_naive();

    mount_doctor_mocks(&server, &doctor_id.to_string(), &department_id.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &Uuid::new_v4().to_string(),
                &doctor_id.to_string(),
                &department_id.to_string(),
                &date.to_string(),
                "10:00:00",
                "booked",
                500_000.0,
            )
        ])))
        .mount(&server)
        .await;
    mount_room_mock(&server, &department_id.to_string()).await;

    let service = SlotCalculatorService::new(&config_for(&server));

    let first = service
        .get_available_slots(doctor_id, date, None, None)
        .await
        .expect("first read should succeed");
    let second = service
        .get_available_slots(doctor_id, date, None, None)
        .await
        .expect("second read should succeed");

    assert_eq!(json!(first), json!(second));
}

#[tokio::test]
async fn unknown_doctor_fails_before_slot_generation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = SlotCalculatorService::new(&config_for(&server));
    let date = (Utc::now() + Duration::days(3)).date_naive();

    let result = service
        .get_available_slots(Uuid::new_v4(), date, None, None)
        .await;
    assert_matches!(result, Err(SchedulingError::DoctorNotFound));
}

#[tokio::test]
async fn dates_beyond_the_window_are_rejected() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let department_id = Uuid::new_v4();

    mount_doctor_mocks(&server, &doctor_id.to_string(), &department_id.to_string()).await;

    let service = SlotCalculatorService::new(&config_for(&server));
    let too_far = (Utc::now() + Duration::days(40)).date_naive();

    let result = service
        .get_available_slots(doctor_id, too_far, None, None)
        .await;
    assert_matches!(result, Err(SchedulingError::InvalidDate(_)));
}

#[tokio::test]
async fn missing_rooms_do_not_block_availability() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let department_id = Uuid::new_v4();

    mount_doctor_mocks(&server, &doctor_id.to_string(), &department_id.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = SlotCalculatorService::new(&config_for(&server));
    let date = (Utc::now() + Duration::days(3)).date_naive();

    let response = service
        .get_available_slots(doctor_id, date, None, None)
        .await
        .expect("availability should succeed");

    assert_eq!(response.slots.len(), 18);
    assert!(response.slots.iter().all(|s| s.available));
    assert!(response.slots.iter().all(|s| s.room.is_none()));
}
