// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::NaiveDate;
use thiserror::Error;

/// Every way a store operation can be refused or fail.
///
/// The `Display` text is the message shown to the user.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Slot {slot} is not available for this date.")]
    SlotUnavailable { slot: String },

    #[error("Slot {slot} is not available on {date}.")]
    SlotTaken { slot: String, date: NaiveDate },

    #[error("Appointment not found.")]
    AppointmentNotFound,

    #[error("Client not found.")]
    ClientNotFound,

    #[error("This appointment is not pending or does not exist.")]
    NotPending,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid fee '{0}'. Please enter a numerical value.")]
    InvalidFee(String),

    #[error("Invalid time slots: {0}")]
    InvalidTimeSlots(String),

    #[error("No data to export for today.")]
    NoReportData,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to save data: {0:#}")]
    Persist(#[from] anyhow::Error),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
