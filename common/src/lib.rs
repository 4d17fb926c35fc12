// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Format used for every timestamp written to the data files and CSV exports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Session fee applied when the settings file does not provide one.
pub const DEFAULT_SESSION_FEE: f64 = 50.00;

/// Slot labels applied when the settings file does not provide any:
/// 09:00 to 16:00 in 30-minute steps.
pub const DEFAULT_TIME_SLOTS: [&str; 15] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "12:30", "13:00", "13:30",
    "14:00", "14:30", "15:00", "15:30", "16:00",
];

/// Lifecycle of an appointment.
///
/// `Booked` is the only state set at creation. The startup pass moves it to
/// `Pending` (today) or `Completed` (past); `Cancelled` is set by hand.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppointmentStatus {
    #[default]
    Booked,
    Pending,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booked => "Booked",
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "Unpaid",
            Self::Paid => "Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored timestamp.
///
/// Values written by this application use `YYYY-MM-DD HH:MM:SS`. Text in any
/// other format is kept verbatim so that saving never rewrites it.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Parsed(NaiveDateTime),
    Raw(String),
}

impl Timestamp {
    pub fn parsed(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Parsed(ts) => Some(*ts),
            Self::Raw(_) => None,
        }
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(ts: NaiveDateTime) -> Self {
        Self::Parsed(ts)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT) {
            Ok(ts) => Self::Parsed(ts),
            Err(_) => Self::Raw(raw),
        })
    }
}

/// A timestamped note appended to a client's log. Never edited.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

/// A file copied into the client's document folder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// A registered client.
///
/// Older data files may lack any field. A missing id loads empty and is
/// assigned by the store; missing contact fields stay `None` and are not
/// written back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Client {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cellphone: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<Document>,
}

impl Client {
    /// The name, or an empty string when the record has none.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// A booked slot on a given day.
///
/// `client_id` is a weak reference: the client may have been deleted since.
/// `client_name` is copied when the appointment is booked and is not updated
/// when the client record changes afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Appointment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub client_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    // Only the day matters; slots carry the time of day.
    pub date: NaiveDate,

    #[serde(default, deserialize_with = "null_as_default")]
    pub slot_number: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub payment_status: PaymentStatus,

    #[serde(default, deserialize_with = "null_as_default")]
    pub total_fee: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: AppointmentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl Appointment {
    /// Whether this appointment holds its slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    pub fn display_name(&self) -> &str {
        self.client_name.as_deref().unwrap_or_default()
    }
}

/// Global scheduling settings. Missing keys take their defaults on load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub session_fee: f64,
    pub time_slots: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session_fee: DEFAULT_SESSION_FEE,
            time_slots: DEFAULT_TIME_SLOTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Aggregated figures for a date range, cancelled appointments excluded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FinancialReport {
    pub total_revenue: f64,
    pub total_paid: f64,
    pub total_unpaid: f64,
    pub total_bookings: usize,
    pub appointments: Vec<Appointment>,
}

/// Slot occupancy for one day.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SlotAvailability {
    pub date: NaiveDate,
    pub available: Vec<String>,
    pub booked: Vec<String>,
    pub total: usize,
}

// --- Request payloads ---
// Kept apart from the stored records because they carry only what the
// caller decides; ids, timestamps and fees are assigned by the store.

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterClientPayload {
    pub name: String,
    pub dob: String,
    pub email: String,
    pub cellphone: String,
}

/// Partial client update. Only the fields that are present are overwritten.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateClientPayload {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub email: Option<String>,
    pub cellphone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BookAppointmentPayload {
    pub date: NaiveDate,
    pub client_id: String,
    pub client_name: String,
    pub slot_number: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EditAppointmentPayload {
    pub date: NaiveDate,
    pub slot_number: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentStatusPayload {
    pub payment_status: PaymentStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CommentPayload {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentPayload {
    pub amount: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadDocumentPayload {
    pub source_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TimeSlotsPayload {
    pub time_slots: Vec<String>,
}

/// A fee as typed by the user: either a JSON number or free text that still
/// has to be parsed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FeeInput {
    Amount(f64),
    Text(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionFeePayload {
    pub session_fee: FeeInput,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExportPayload {
    pub path: PathBuf,
}

/// Treats an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
