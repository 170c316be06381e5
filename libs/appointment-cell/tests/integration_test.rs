use std::sync::Arc;
use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, header_exists, query_param, query_param_is_missing, body_json};

use appointment_cell::{
    AppointmentFilter, AppointmentService, AppointmentStatus, AvailabilityQuery,
    MutationError, TimeOfDay,
};
use shared_api::{PortalClient, SessionContext};
use shared_models::error::{ApiError, QueryError};
use shared_utils::test_utils::{TestConfig, TestUser, MockPortalResponses};

async fn create_service(mock_server: &MockServer) -> AppointmentService {
    let test_config = TestConfig::for_server(&mock_server.uri());
    let session = SessionContext::shared();
    session.begin(TestUser::doctor("doc@example.com").to_session(&test_config.jwt_secret)).await;

    let client = Arc::new(PortalClient::new(&test_config.to_app_config(), session));
    AppointmentService::new(client)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_list_appointments_sends_filters() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(header_exists("authorization"))
        .and(query_param("doctor_id", "3"))
        .and(query_param("status", "scheduled"))
        .and(query_param("from_date", "2024-12-01"))
        .and(query_param("to_date", "2024-12-31"))
        .and(query_param_is_missing("patient_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPortalResponses::appointment_response(1, 9, 3, "scheduled"),
            MockPortalResponses::appointment_response(2, 10, 3, "scheduled"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let filter = AppointmentFilter::for_doctor(3)
        .with_status(AppointmentStatus::Scheduled)
        .between(Some(day(2024, 12, 1)), Some(day(2024, 12, 31)));

    let appointments = service.list_appointments(&filter).await.unwrap();

    assert_eq!(appointments.len(), 2);
    assert!(appointments.iter().all(|a| a.doctor_id == 3 && a.is_scheduled()));
}

#[tokio::test]
async fn test_inverted_range_rejected_before_request() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let filter = AppointmentFilter::default()
        .between(Some(day(2024, 12, 31)), Some(day(2024, 12, 1)));

    assert_matches!(service.list_appointments(&filter).await, Err(QueryError::InvalidInput(_)));
}

#[tokio::test]
async fn test_todays_appointments_uses_single_day_range() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "3"))
        .and(query_param("from_date", "2024-12-25"))
        .and(query_param("to_date", "2024-12-25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPortalResponses::appointment_response(5, 9, 3, "completed"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let appointments = service.todays_appointments(3, day(2024, 12, 25)).await.unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn test_get_missing_appointment_is_not_found() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments/404"))
        .respond_with(ResponseTemplate::new(404)
            .set_body_json(MockPortalResponses::error_response("Appointment not found")))
        .mount(&mock_server)
        .await;

    assert_matches!(
        service.get_appointment(404).await,
        Err(QueryError::Api(ApiError::NotFound(msg))) if msg == "Appointment not found"
    );
}

#[tokio::test]
async fn test_cancel_then_refetch_shows_cancelled() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPortalResponses::appointment_response(42, 9, 3, "scheduled"),
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/appointments/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let filter = AppointmentFilter::for_doctor(3);
    let before = service.list_appointments(&filter).await.unwrap();
    assert!(before[0].is_scheduled());

    service.cancel(42).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("doctor_id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPortalResponses::appointment_response(42, 9, 3, "cancelled"),
        ])))
        .mount(&mock_server)
        .await;

    let after = service.list_appointments(&filter).await.unwrap();
    assert_eq!(after[0].id, 42);
    assert_eq!(after[0].status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_twice_succeeds() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path("/appointments/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&mock_server)
        .await;

    assert!(service.cancel(7).await.is_ok());
    assert!(service.cancel(7).await.is_ok());
}

#[tokio::test]
async fn test_cancel_missing_appointment() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path("/appointments/999"))
        .respond_with(ResponseTemplate::new(404)
            .set_body_json(MockPortalResponses::error_response("Appointment not found")))
        .mount(&mock_server)
        .await;

    assert_eq!(service.cancel(999).await, Err(MutationError::NotFound(999)));
}

#[tokio::test]
async fn test_complete_sends_status_and_diagnosis() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments/12"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(MockPortalResponses::appointment_response(12, 9, 3, "scheduled")))
        .mount(&mock_server)
        .await;

    let mut completed = MockPortalResponses::appointment_response(12, 9, 3, "completed");
    completed["diagnosis"] = json!("Seasonal allergy");

    Mock::given(method("PUT"))
        .and(path("/appointments/12"))
        .and(body_json(json!({ "status": "completed", "diagnosis": "Seasonal allergy" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completed))
        .expect(1)
        .mount(&mock_server)
        .await;

    assert!(service.complete(12, "Seasonal allergy").await.is_ok());
}

#[tokio::test]
async fn test_complete_terminal_appointment_never_writes() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments/20"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(MockPortalResponses::appointment_response(20, 9, 3, "cancelled")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments/21"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(MockPortalResponses::appointment_response(21, 9, 3, "completed")))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    assert_eq!(
        service.complete(20, "n/a").await,
        Err(MutationError::InvalidTransition {
            from: AppointmentStatus::Cancelled,
            to: AppointmentStatus::Completed,
        })
    );
    assert_matches!(
        service.complete(21, "n/a").await,
        Err(MutationError::InvalidTransition { from: AppointmentStatus::Completed, .. })
    );
}

#[tokio::test]
async fn test_complete_missing_appointment() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments/31"))
        .respond_with(ResponseTemplate::new(404)
            .set_body_json(MockPortalResponses::error_response("Appointment not found")))
        .mount(&mock_server)
        .await;

    assert_eq!(service.complete(31, "n/a").await, Err(MutationError::NotFound(31)));
}

#[tokio::test]
async fn test_expired_session_surfaces_as_auth_error() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("DELETE"))
        .and(path("/appointments/8"))
        .respond_with(ResponseTemplate::new(401)
            .set_body_json(MockPortalResponses::error_response("Could not validate credentials")))
        .mount(&mock_server)
        .await;

    let err = service.cancel(8).await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_availability_encodes_doctor_and_params() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments/availability/Jane%20Smith"))
        .and(query_param("date", "2024-12-26"))
        .and(query_param("time_of_day", "14:30"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(MockPortalResponses::availability_response(3, "Jane Smith")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = AvailabilityQuery::new("Jane Smith")
        .on(day(2024, 12, 26))
        .at(TimeOfDay::At(NaiveTime::from_hms_opt(14, 30, 0).unwrap()));

    let result = service.check_availability(&query).await.unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].doctor_name, "Jane Smith");
    assert_eq!(result[0].available_slots.len(), 2);
}

#[tokio::test]
async fn test_availability_without_optional_params() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/appointments/availability/House"))
        .and(query_param_is_missing("date"))
        .and(query_param_is_missing("time_of_day"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = service.check_availability(&AvailabilityQuery::new("House")).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_availability_requires_doctor() {
    let mock_server = MockServer::start().await;
    let service = create_service(&mock_server).await;

    assert_matches!(
        service.check_availability(&AvailabilityQuery::new("  ")).await,
        Err(QueryError::InvalidInput(_))
    );
}
