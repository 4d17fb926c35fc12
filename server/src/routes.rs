// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::Arc;

use crate::handlers::{self, SharedStore};
use crate::store::ScheduleStore;
use axum::{
    Router,
    routing::{get, patch, post, put},
};
use parking_lot::Mutex;

/// Creates and configures the application router around an opened store.
pub fn create_router(store: ScheduleStore) -> Router {
    let state: SharedStore = Arc::new(Mutex::new(store));

    Router::new()
        // Slots and settings
        .route("/api/slots/{date}", get(handlers::get_slots))
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/settings/time-slots", put(handlers::set_time_slots))
        .route(
            "/api/settings/session-fee",
            put(handlers::update_session_fee),
        )
        // Appointments
        .route(
            "/api/appointments",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .route(
            "/api/appointments/{id}",
            put(handlers::edit_appointment).delete(handlers::delete_appointment),
        )
        .route(
            "/api/appointments/{id}/cancel",
            patch(handlers::cancel_appointment),
        )
        .route(
            "/api/appointments/{id}/payment",
            patch(handlers::update_payment_status),
        )
        .route("/api/appointments/{id}/check-in", post(handlers::check_in))
        // Clients
        .route(
            "/api/clients",
            get(handlers::list_clients).post(handlers::register_client),
        )
        .route(
            "/api/clients/{id}",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route("/api/clients/{id}/comments", post(handlers::add_comment))
        .route("/api/clients/{id}/payments", post(handlers::record_payment))
        .route(
            "/api/clients/{id}/documents",
            post(handlers::upload_document),
        )
        .route(
            "/api/clients/{id}/pending",
            get(handlers::pending_appointment),
        )
        // Reports and CSV exports
        .route("/api/reports", get(handlers::financial_report))
        .route("/api/exports/{kind}", post(handlers::export_csv))
        .with_state(state)
}
