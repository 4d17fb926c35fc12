// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use common::{
    Appointment, BookAppointmentPayload, Client, CommentPayload, Document, EditAppointmentPayload,
    ExportPayload, FinancialReport, PaymentPayload, PaymentStatusPayload, RegisterClientPayload,
    SessionFeePayload, Settings, SlotAvailability, TimeSlotsPayload, UpdateClientPayload,
    UploadDocumentPayload,
};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::store::ScheduleStore;

/// The one store instance, shared by every request. The mutex keeps store
/// calls strictly one at a time.
pub type SharedStore = Arc<Mutex<ScheduleStore>>;

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize, Debug)]
pub struct ReportQuery {
    pub start: String,
    pub end: String,
}

// --- Slots & settings ---

pub async fn get_slots(
    State(store): State<SharedStore>,
    Path(date): Path<NaiveDate>,
) -> Json<SlotAvailability> {
    Json(store.lock().slot_availability(date))
}

pub async fn get_settings(State(store): State<SharedStore>) -> Json<Settings> {
    Json(store.lock().settings().clone())
}

pub async fn set_time_slots(
    State(store): State<SharedStore>,
    Json(payload): Json<TimeSlotsPayload>,
) -> Result<Json<Vec<String>>, AppError> {
    let mut store = store.lock();
    let slots = store.set_time_slots(payload.time_slots)?.to_vec();
    Ok(Json(slots))
}

pub async fn update_session_fee(
    State(store): State<SharedStore>,
    Json(payload): Json<SessionFeePayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let fee = store.lock().update_session_fee(&payload.session_fee)?;
    Ok(Json(serde_json::json!({
        "message": format!("Session fee updated to ${:.2}.", fee),
        "session_fee": fee
    })))
}

// --- Appointments ---

pub async fn list_appointments(
    State(store): State<SharedStore>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Appointment>> {
    let appointments = store.lock().search_appointments(&query.q);
    info!("Returning {} appointments.", appointments.len());
    Json(appointments)
}

pub async fn book_appointment(
    State(store): State<SharedStore>,
    Json(payload): Json<BookAppointmentPayload>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    debug!(
        "Received request to book {} on {} for client {}",
        payload.slot_number, payload.date, payload.client_id
    );
    if payload.client_id.is_empty() {
        error!("Validation failed: no client selected.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Please select a client.",
        ));
    }

    let appointment = store.lock().book_appointment(
        payload.date,
        &payload.client_id,
        &payload.client_name,
        &payload.slot_number,
        &payload.comment,
    )?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn edit_appointment(
    State(store): State<SharedStore>,
    Path(appointment_id): Path<String>,
    Json(payload): Json<EditAppointmentPayload>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = store.lock().edit_appointment(
        &appointment_id,
        payload.date,
        &payload.slot_number,
        &payload.comment,
    )?;
    Ok(Json(appointment))
}

/// Deleting an unknown appointment still answers 204.
pub async fn delete_appointment(
    State(store): State<SharedStore>,
    Path(appointment_id): Path<String>,
) -> Result<StatusCode, AppError> {
    store.lock().delete_appointment(&appointment_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_appointment(
    State(store): State<SharedStore>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(store.lock().cancel_appointment(&appointment_id)?))
}

pub async fn update_payment_status(
    State(store): State<SharedStore>,
    Path(appointment_id): Path<String>,
    Json(payload): Json<PaymentStatusPayload>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = store
        .lock()
        .update_payment_status(&appointment_id, payload.payment_status)?;
    Ok(Json(appointment))
}

pub async fn check_in(
    State(store): State<SharedStore>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    Ok(Json(store.lock().check_in(&appointment_id)?))
}

// --- Clients ---

pub async fn list_clients(
    State(store): State<SharedStore>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Client>> {
    Json(store.lock().search_clients(&query.q))
}

pub async fn get_client(
    State(store): State<SharedStore>,
    Path(client_id): Path<String>,
) -> Result<Json<Client>, AppError> {
    store
        .lock()
        .client(&client_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| StoreError::ClientNotFound.into())
}

pub async fn register_client(
    State(store): State<SharedStore>,
    Json(payload): Json<RegisterClientPayload>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    debug!("Received request to register client: {}", payload.name);
    if payload.name.is_empty()
        || payload.dob.is_empty()
        || payload.email.is_empty()
        || payload.cellphone.is_empty()
    {
        error!("Validation failed: a registration field is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "All fields are required.",
        ));
    }

    let client = store.lock().register_client(payload)?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(store): State<SharedStore>,
    Path(client_id): Path<String>,
    Json(payload): Json<UpdateClientPayload>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(store.lock().update_client(&client_id, payload)?))
}

pub async fn delete_client(
    State(store): State<SharedStore>,
    Path(client_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if store.lock().delete_client(&client_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StoreError::ClientNotFound.into())
    }
}

pub async fn add_comment(
    State(store): State<SharedStore>,
    Path(client_id): Path<String>,
    Json(payload): Json<CommentPayload>,
) -> Result<Json<Client>, AppError> {
    if payload.text.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Comment cannot be empty.",
        ));
    }
    let mut store = store.lock();
    store.add_comment(&client_id, &payload.text)?;
    client_response(&store, &client_id)
}

pub async fn record_payment(
    State(store): State<SharedStore>,
    Path(client_id): Path<String>,
    Json(payload): Json<PaymentPayload>,
) -> Result<Json<Client>, AppError> {
    let mut store = store.lock();
    store.record_payment(&client_id, payload.amount)?;
    client_response(&store, &client_id)
}

pub async fn upload_document(
    State(store): State<SharedStore>,
    Path(client_id): Path<String>,
    Json(payload): Json<UploadDocumentPayload>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let document = store
        .lock()
        .upload_document(&client_id, &payload.source_path)?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn pending_appointment(
    State(store): State<SharedStore>,
    Path(client_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let store = store.lock();
    if store.client(&client_id).is_none() {
        return Err(StoreError::ClientNotFound.into());
    }
    store
        .pending_appointment_for(&client_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "No pending appointments found."))
}

// --- Reports & exports ---

pub async fn financial_report(
    State(store): State<SharedStore>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<FinancialReport>, AppError> {
    let report = store.lock().financial_report(&query.start, &query.end)?;
    info!(
        "Report {}..{}: {} bookings, revenue {:.2}",
        query.start, query.end, report.total_bookings, report.total_revenue
    );
    Ok(Json(report))
}

/// Writes a CSV export to a path chosen by the caller.
pub async fn export_csv(
    State(store): State<SharedStore>,
    Path(kind): Path<String>,
    Json(payload): Json<ExportPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = store.lock();
    match kind.as_str() {
        "appointments" => store.export_appointments_csv(&payload.path)?,
        "clients" => store.export_clients_csv(&payload.path)?,
        "daily-report" => store.export_daily_report_csv(&payload.path)?,
        other => {
            return Err(AppError::new(
                StatusCode::NOT_FOUND,
                &format!("Unknown export kind '{}'.", other),
            ));
        }
    }
    Ok(Json(serde_json::json!({
        "message": "Export completed successfully.",
        "path": payload.path
    })))
}

fn client_response(store: &ScheduleStore, client_id: &str) -> Result<Json<Client>, AppError> {
    store
        .client(client_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| StoreError::ClientNotFound.into())
}

// --- Custom Error Handling ---

/// Error returned to HTTP callers as `{"error": message}`.
#[derive(Debug)]
pub struct AppError {
    code: StatusCode,
    message: String,
}

impl AppError {
    fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::InvalidDate(_)
            | StoreError::InvalidFee(_)
            | StoreError::InvalidTimeSlots(_)
            | StoreError::NotPending
            | StoreError::NoReportData => StatusCode::BAD_REQUEST,
            StoreError::AppointmentNotFound | StoreError::ClientNotFound => StatusCode::NOT_FOUND,
            StoreError::SlotUnavailable { .. } | StoreError::SlotTaken { .. } => {
                StatusCode::CONFLICT
            }
            StoreError::Io { .. } | StoreError::Csv(_) | StoreError::Persist(_) => {
                tracing::error!("Store I/O failure: {:?}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(
            "Responding with error: status_code={}, message={}",
            self.code.as_u16(),
            self.message
        );
        (
            self.code,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::{TempDir, tempdir};

    fn shared_store() -> (TempDir, SharedStore) {
        let dir = tempdir().unwrap();
        let store = ScheduleStore::open(Config::for_data_dir(dir.path())).unwrap();
        (dir, Arc::new(Mutex::new(store)))
    }

    fn registration(name: &str) -> Json<RegisterClientPayload> {
        Json(RegisterClientPayload {
            name: name.to_string(),
            dob: "1990-01-01".to_string(),
            email: "someone@example.com".to_string(),
            cellphone: "555-0100".to_string(),
        })
    }

    #[tokio::test]
    async fn test_register_client_validation_empty_name() {
        let (_dir, store) = shared_store();

        let result = register_client(State(store.clone()), registration("")).await;

        let err = result.unwrap_err();
        assert_eq!(err.code, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "All fields are required.");
        assert!(store.lock().clients().is_empty());
    }

    #[tokio::test]
    async fn test_book_taken_slot_is_conflict() {
        let (_dir, store) = shared_store();
        let payload = BookAppointmentPayload {
            date: NaiveDate::from_ymd_opt(2031, 5, 6).unwrap(),
            client_id: "c1".to_string(),
            client_name: "Ana".to_string(),
            slot_number: "09:00".to_string(),
            comment: String::new(),
        };

        let (status, _) = book_appointment(State(store.clone()), Json(payload.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = book_appointment(State(store), Json(payload))
            .await
            .unwrap_err();
        assert_eq!(err.code, StatusCode::CONFLICT);
        assert_eq!(err.message, "Slot 09:00 is not available for this date.");
    }

    #[tokio::test]
    async fn test_report_with_bad_date_is_bad_request() {
        let (_dir, store) = shared_store();
        let query = ReportQuery {
            start: "01/02/2031".to_string(),
            end: "2031-02-01".to_string(),
        };

        let err = financial_report(State(store), Query(query))
            .await
            .unwrap_err();
        assert_eq!(err.code, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_status_mapping() {
        let not_found: AppError = StoreError::ClientNotFound.into();
        assert_eq!(not_found.code, StatusCode::NOT_FOUND);
        assert_eq!(not_found.message, "Client not found.");

        let io: AppError = StoreError::io(
            "Error uploading file",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        )
        .into();
        assert_eq!(io.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.message, "Error uploading file: denied");

        let persist: AppError =
            StoreError::from(anyhow::anyhow!("disk full").context("Failed to write x.tmp")).into();
        assert_eq!(persist.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(persist.message, "Failed to save data: Failed to write x.tmp: disk full");
    }
}
