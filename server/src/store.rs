// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate, NaiveTime, SubsecRound};
use common::{
    Appointment, AppointmentStatus, Client, Comment, Document, FeeInput, FinancialReport,
    PaymentStatus, RegisterClientPayload, Settings, SlotAvailability, Timestamp,
    UpdateClientPayload,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::export;
use crate::persistence::{self, Loaded, Records};

const DATE_FORMAT: &str = "%Y-%m-%d";
const SLOT_FORMAT: &str = "%H:%M";

/// Owns the clients, appointments and settings collections and the
/// documents folder.
///
/// Every mutation rewrites the whole affected file before returning. There
/// is no locking here; callers that share a store must serialise access.
///
/// Entries that could not be decoded are not served but are written back
/// after the readable records on every save.
pub struct ScheduleStore {
    config: Config,
    clients: Vec<Client>,
    unreadable_clients: Vec<Value>,
    appointments: Vec<Appointment>,
    unreadable_appointments: Vec<Value>,
    settings: Settings,
}

impl ScheduleStore {
    /// Loads the three data files and runs the daily status pass once.
    ///
    /// Unreadable files fall back to empty collections or default settings.
    pub fn open(config: Config) -> StoreResult<Self> {
        let documents_dir = config.documents_dir();
        fs::create_dir_all(&documents_dir).map_err(|e| {
            StoreError::io(
                format!("Failed to create {}", documents_dir.display()),
                e,
            )
        })?;

        let clients_path = config.clients_path();
        let (clients, clients_missing) = match persistence::load_records::<Client>(&clients_path) {
            Loaded::Missing => {
                info!(
                    "Client database file {} not found. Creating a new one.",
                    clients_path.display()
                );
                (Records::default(), true)
            }
            loaded => (loaded.into_value(), false),
        };
        let settings = persistence::load_json::<Settings>(&config.settings_path()).into_value();
        let appointments_loaded = persistence::load_records::<Appointment>(&config.appointments_path());
        let appointments_corrupt = matches!(appointments_loaded, Loaded::Corrupt);
        let appointments = appointments_loaded.into_value();

        info!(
            "Store opened: {} clients, {} appointments, {} time slots.",
            clients.records.len(),
            appointments.records.len(),
            settings.time_slots.len()
        );

        let mut store = Self {
            config,
            clients: clients.records,
            unreadable_clients: clients.unreadable,
            appointments: appointments.records,
            unreadable_appointments: appointments.unreadable,
            settings,
        };

        let clients_backfilled = assign_missing_ids(&mut store.clients, |c| &mut c.id, "client");
        if clients_missing || clients_backfilled > 0 {
            store.save_clients()?;
        }

        assign_missing_ids(&mut store.appointments, |a| &mut a.id, "appointment");
        let advanced = store.advance_statuses(today());
        info!("Daily status pass advanced {} appointments.", advanced);
        // A file that failed to decode stays on disk until the next booking.
        if appointments_corrupt {
            warn!("Appointments file is unreadable; it is not rewritten at start-up.");
        } else {
            store.save_appointments()?;
        }

        Ok(store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // --- Slots & settings ---

    /// Configured slots not held by a non-cancelled appointment on `date`,
    /// in configured order.
    pub fn available_slots(&self, date: NaiveDate) -> Vec<String> {
        let booked = self.booked_slots(date);
        self.settings
            .time_slots
            .iter()
            .filter(|slot| !booked.contains(slot))
            .cloned()
            .collect()
    }

    /// Slot labels held by non-cancelled appointments on `date`.
    pub fn booked_slots(&self, date: NaiveDate) -> Vec<String> {
        self.appointments
            .iter()
            .filter(|app| app.date == date && app.occupies_slot())
            .map(|app| app.slot_number.clone())
            .collect()
    }

    pub fn booked_slot_count(&self, date: NaiveDate) -> usize {
        self.booked_slots(date).len()
    }

    pub fn total_slots(&self) -> usize {
        self.settings.time_slots.len()
    }

    pub fn slot_availability(&self, date: NaiveDate) -> SlotAvailability {
        SlotAvailability {
            date,
            available: self.available_slots(date),
            booked: self.booked_slots(date),
            total: self.total_slots(),
        }
    }

    /// Replaces the slot list. Labels are trimmed, blanks dropped, and every
    /// remaining label must be a valid `HH:MM` time.
    pub fn set_time_slots(&mut self, labels: Vec<String>) -> StoreResult<&[String]> {
        let slots: Vec<String> = labels
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if slots.is_empty() {
            return Err(StoreError::InvalidTimeSlots(
                "Please enter at least one time slot.".to_string(),
            ));
        }
        if let Some(bad) = slots
            .iter()
            .find(|s| NaiveTime::parse_from_str(s, SLOT_FORMAT).is_err())
        {
            return Err(StoreError::InvalidTimeSlots(format!(
                "'{}' is not in HH:MM format (e.g., 09:00, 14:30).",
                bad
            )));
        }

        self.settings.time_slots = slots;
        self.save_settings()?;
        info!("Time slots updated: {:?}", self.settings.time_slots);
        Ok(&self.settings.time_slots)
    }

    pub fn session_fee(&self) -> f64 {
        self.settings.session_fee
    }

    /// Sets the fee charged for new bookings. Existing appointments keep the
    /// fee they were booked with.
    pub fn update_session_fee(&mut self, input: &FeeInput) -> StoreResult<f64> {
        let fee = match input {
            FeeInput::Amount(amount) => *amount,
            FeeInput::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| StoreError::InvalidFee(raw.clone()))?,
        };
        // JSON cannot represent these, they would be saved as null.
        if !fee.is_finite() {
            return Err(StoreError::InvalidFee(fee.to_string()));
        }

        self.settings.session_fee = fee;
        self.save_settings()?;
        info!("Session fee updated to {:.2}", fee);
        Ok(fee)
    }

    // --- Appointments ---

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn appointment(&self, appointment_id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == appointment_id)
    }

    /// Case-insensitive match on the client name copied into each
    /// appointment. An empty query returns everything.
    pub fn search_appointments(&self, query: &str) -> Vec<Appointment> {
        let query = query.to_lowercase();
        self.appointments
            .iter()
            .filter(|app| query.is_empty() || app.display_name().to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn appointments_for_client(&self, client_id: &str) -> Vec<Appointment> {
        self.appointments
            .iter()
            .filter(|app| app.client_id == client_id)
            .cloned()
            .collect()
    }

    /// The client's first appointment waiting for check-in.
    pub fn pending_appointment_for(&self, client_id: &str) -> Option<&Appointment> {
        self.appointments
            .iter()
            .find(|app| app.client_id == client_id && app.status == AppointmentStatus::Pending)
    }

    /// Books `slot` on `date`. The slot must be free at call time.
    ///
    /// `client_name` is stored as given and is not kept in sync with the
    /// client record.
    pub fn book_appointment(
        &mut self,
        date: NaiveDate,
        client_id: &str,
        client_name: &str,
        slot: &str,
        comment: &str,
    ) -> StoreResult<Appointment> {
        debug!(
            "Booking slot {} on {} for client {} ({})",
            slot, date, client_name, client_id
        );
        if !self.available_slots(date).iter().any(|s| s == slot) {
            return Err(StoreError::SlotUnavailable {
                slot: slot.to_string(),
            });
        }

        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            client_name: Some(client_name.to_string()),
            date,
            slot_number: slot.to_string(),
            payment_status: PaymentStatus::Unpaid,
            total_fee: self.session_fee(),
            status: AppointmentStatus::Booked,
            comment: Some(comment.to_string()),
            timestamp: Some(now()),
        };
        self.appointments.push(appointment.clone());
        self.save_appointments()?;

        info!("Appointment {} booked for {} at {}", appointment.id, date, slot);
        Ok(appointment)
    }

    /// Moves an appointment and replaces its comment.
    ///
    /// The move is refused when `new_slot` is taken on `new_date`, except
    /// when `new_slot` has the same label as the current slot. Only the
    /// labels are compared, not the dates, so keeping the same label while
    /// changing the date skips the availability check entirely.
    pub fn edit_appointment(
        &mut self,
        appointment_id: &str,
        new_date: NaiveDate,
        new_slot: &str,
        new_comment: &str,
    ) -> StoreResult<Appointment> {
        let index = self
            .appointments
            .iter()
            .position(|a| a.id == appointment_id)
            .ok_or(StoreError::AppointmentNotFound)?;

        let current_slot = &self.appointments[index].slot_number;
        let slot_free = self.available_slots(new_date).iter().any(|s| s == new_slot);
        if !slot_free && new_slot != current_slot {
            return Err(StoreError::SlotTaken {
                slot: new_slot.to_string(),
                date: new_date,
            });
        }

        let app = &mut self.appointments[index];
        app.date = new_date;
        app.slot_number = new_slot.to_string();
        app.comment = Some(new_comment.to_string());
        let updated = app.clone();
        self.save_appointments()?;

        info!(
            "Appointment {} moved to {} at {}",
            appointment_id, new_date, new_slot
        );
        Ok(updated)
    }

    /// Removes an appointment. Returns whether one was removed; an unknown id
    /// is not an error.
    pub fn delete_appointment(&mut self, appointment_id: &str) -> StoreResult<bool> {
        let before = self.appointments.len();
        self.appointments.retain(|a| a.id != appointment_id);
        let removed = self.appointments.len() < before;
        self.save_appointments()?;

        if removed {
            info!("Appointment {} deleted.", appointment_id);
        } else {
            debug!("Appointment {} not found, nothing deleted.", appointment_id);
        }
        Ok(removed)
    }

    /// Marks an appointment cancelled, which frees its slot.
    pub fn cancel_appointment(&mut self, appointment_id: &str) -> StoreResult<Appointment> {
        let app = self
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or(StoreError::AppointmentNotFound)?;
        app.status = AppointmentStatus::Cancelled;
        let updated = app.clone();
        self.save_appointments()?;

        info!("Appointment {} cancelled.", appointment_id);
        Ok(updated)
    }

    pub fn update_payment_status(
        &mut self,
        appointment_id: &str,
        status: PaymentStatus,
    ) -> StoreResult<Appointment> {
        let app = self
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or(StoreError::AppointmentNotFound)?;
        app.payment_status = status;
        let updated = app.clone();
        self.save_appointments()?;

        info!("Appointment {} payment status set to {}", appointment_id, status);
        Ok(updated)
    }

    /// Check-in desk: marks a pending appointment paid and notes the payment
    /// on the client's record.
    pub fn check_in(&mut self, appointment_id: &str) -> StoreResult<Appointment> {
        let app = self
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id && a.status == AppointmentStatus::Pending)
            .ok_or(StoreError::NotPending)?;
        app.payment_status = PaymentStatus::Paid;
        let updated = app.clone();
        self.save_appointments()?;

        let note = format!(
            "Payment of ${:.2} received for appointment on {}.",
            updated.total_fee, updated.date
        );
        match self.add_comment(&updated.client_id, &note) {
            Ok(()) => {}
            // The appointment may outlive its client.
            Err(StoreError::ClientNotFound) => warn!(
                "Client {} of appointment {} no longer exists, payment note skipped.",
                updated.client_id, appointment_id
            ),
            Err(e) => return Err(e),
        }

        info!("Appointment {} checked in and paid.", appointment_id);
        Ok(updated)
    }

    /// Advances `Booked` appointments relative to `today`: past ones become
    /// `Completed`, today's become `Pending`. Returns how many changed.
    ///
    /// Does not persist; `open` saves after running it.
    pub fn advance_statuses(&mut self, today: NaiveDate) -> usize {
        let mut changed = 0;
        for app in self
            .appointments
            .iter_mut()
            .filter(|a| a.status == AppointmentStatus::Booked)
        {
            if app.date < today {
                app.status = AppointmentStatus::Completed;
                changed += 1;
            } else if app.date == today {
                app.status = AppointmentStatus::Pending;
                changed += 1;
            }
        }
        changed
    }

    // --- Reports ---

    /// Financial summary for `start..=end`, both given as `YYYY-MM-DD`.
    pub fn financial_report(&self, start: &str, end: &str) -> StoreResult<FinancialReport> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        Ok(self.report_between(start, end))
    }

    pub fn daily_report(&self) -> FinancialReport {
        let today = today();
        self.report_between(today, today)
    }

    fn report_between(&self, start: NaiveDate, end: NaiveDate) -> FinancialReport {
        let appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|app| app.occupies_slot() && start <= app.date && app.date <= end)
            .cloned()
            .collect();

        let mut report = FinancialReport {
            total_revenue: 0.0,
            total_paid: 0.0,
            total_unpaid: 0.0,
            total_bookings: appointments.len(),
            appointments: Vec::new(),
        };
        for app in &appointments {
            report.total_revenue += app.total_fee;
            if app.payment_status == PaymentStatus::Paid {
                report.total_paid += app.total_fee;
            } else {
                report.total_unpaid += app.total_fee;
            }
        }
        report.appointments = appointments;
        report
    }

    // --- Clients ---

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    /// Case-insensitive match on name or email. An empty query returns
    /// everything.
    pub fn search_clients(&self, query: &str) -> Vec<Client> {
        let query = query.to_lowercase();
        self.clients
            .iter()
            .filter(|c| {
                query.is_empty()
                    || c.display_name().to_lowercase().contains(&query)
                    || c.email.as_deref().unwrap_or_default().to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    pub fn register_client(&mut self, payload: RegisterClientPayload) -> StoreResult<Client> {
        let client = Client {
            id: Uuid::new_v4().to_string(),
            registration_date: Some(now()),
            name: Some(payload.name),
            dob: Some(payload.dob),
            email: Some(payload.email),
            cellphone: Some(payload.cellphone),
            comments: Vec::new(),
            documents: Vec::new(),
        };
        self.clients.push(client.clone());
        self.save_clients()?;

        info!("Client {} registered with ID {}", client.display_name(), client.id);
        Ok(client)
    }

    pub fn add_comment(&mut self, client_id: &str, text: &str) -> StoreResult<()> {
        let client = self.client_mut(client_id)?;
        client.comments.push(Comment {
            timestamp: Some(now()),
            text: text.to_string(),
        });
        self.save_clients()?;
        debug!("Comment added to client {}", client_id);
        Ok(())
    }

    /// Overwrites the fields present in `patch`. Appointments keep the name
    /// they were booked with.
    pub fn update_client(
        &mut self,
        client_id: &str,
        patch: UpdateClientPayload,
    ) -> StoreResult<Client> {
        let client = self.client_mut(client_id)?;
        if patch.name.is_some() {
            client.name = patch.name;
        }
        if patch.dob.is_some() {
            client.dob = patch.dob;
        }
        if patch.email.is_some() {
            client.email = patch.email;
        }
        if patch.cellphone.is_some() {
            client.cellphone = patch.cellphone;
        }
        let updated = client.clone();
        self.save_clients()?;

        info!("Client {} updated.", client_id);
        Ok(updated)
    }

    /// Removes the client record only. Appointments and the document folder
    /// are left as they are. Returns whether a client was removed.
    pub fn delete_client(&mut self, client_id: &str) -> StoreResult<bool> {
        let before = self.clients.len();
        self.clients.retain(|c| c.id != client_id);
        if self.clients.len() == before {
            return Ok(false);
        }
        self.save_clients()?;
        info!("Client {} deleted.", client_id);
        Ok(true)
    }

    /// Notes a payment received from the client in their comment log.
    pub fn record_payment(&mut self, client_id: &str, amount: f64) -> StoreResult<()> {
        self.add_comment(client_id, &format!("Received payment of ${:.2}.", amount))
    }

    /// Copies `source` into the client's document folder under its file
    /// name, replacing any earlier upload with the same name.
    pub fn upload_document(&mut self, client_id: &str, source: &Path) -> StoreResult<Document> {
        if self.client(client_id).is_none() {
            return Err(StoreError::ClientNotFound);
        }

        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StoreError::io(
                    "Error uploading file",
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("{} has no file name", source.display()),
                    ),
                )
            })?;

        let dest_folder = self.config.documents_dir().join(client_id);
        fs::create_dir_all(&dest_folder)
            .map_err(|e| StoreError::io("Error uploading file", e))?;
        let dest_path = dest_folder.join(&filename);
        fs::copy(source, &dest_path).map_err(|e| {
            StoreError::io(format!("Error uploading file '{}'", filename), e)
        })?;

        let document = Document {
            filename,
            path: dest_path,
            timestamp: Some(now()),
        };
        self.client_mut(client_id)?.documents.push(document.clone());
        self.save_clients()?;

        info!(
            "File '{}' uploaded for client {}",
            document.filename, client_id
        );
        Ok(document)
    }

    // --- CSV exports ---

    pub fn export_appointments_csv(&self, path: &Path) -> StoreResult<()> {
        export::write_appointments_csv(path, &self.appointments)
    }

    pub fn export_clients_csv(&self, path: &Path) -> StoreResult<()> {
        export::write_clients_csv(path, &self.clients)
    }

    /// Exports today's report. Refused when there is nothing booked today.
    pub fn export_daily_report_csv(&self, path: &Path) -> StoreResult<()> {
        let report = self.daily_report();
        if report.appointments.is_empty() {
            return Err(StoreError::NoReportData);
        }
        export::write_daily_report_csv(path, &report.appointments)
    }

    // --- Persistence ---

    fn client_mut(&mut self, client_id: &str) -> StoreResult<&mut Client> {
        self.clients
            .iter_mut()
            .find(|c| c.id == client_id)
            .ok_or(StoreError::ClientNotFound)
    }

    fn save_clients(&self) -> StoreResult<()> {
        persistence::save_records(
            &self.config.clients_path(),
            &self.clients,
            &self.unreadable_clients,
        )?;
        Ok(())
    }

    fn save_appointments(&self) -> StoreResult<()> {
        persistence::save_records(
            &self.config.appointments_path(),
            &self.appointments,
            &self.unreadable_appointments,
        )?;
        Ok(())
    }

    fn save_settings(&self) -> StoreResult<()> {
        persistence::save_json(&self.config.settings_path(), &self.settings)?;
        Ok(())
    }
}

fn parse_date(raw: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| StoreError::InvalidDate(raw.to_string()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// Stored timestamps have second precision.
fn now() -> Timestamp {
    Timestamp::Parsed(Local::now().naive_local().trunc_subsecs(0))
}

/// Gives a fresh id to every record loaded without one. Returns how many
/// were assigned.
fn assign_missing_ids<T>(
    records: &mut [T],
    id_of: impl Fn(&mut T) -> &mut String,
    kind: &str,
) -> usize {
    let mut assigned = 0;
    for record in records.iter_mut() {
        let id = id_of(record);
        if id.trim().is_empty() {
            *id = Uuid::new_v4().to_string();
            warn!("Loaded a {} without an id; assigned {}.", kind, id);
            assigned += 1;
        }
    }
    assigned
}
