// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::path::Path;

use common::{Appointment, Client, Timestamp};
use tracing::info;

use crate::error::StoreResult;

const MISSING: &str = "N/A";

pub const APPOINTMENT_COLUMNS: [&str; 9] = [
    "id",
    "client_name",
    "date",
    "slot_number",
    "payment_status",
    "total_fee",
    "status",
    "comment",
    "timestamp",
];

pub const CLIENT_COLUMNS: [&str; 8] = [
    "id",
    "registration_date",
    "name",
    "dob",
    "email",
    "cellphone",
    "comments",
    "documents",
];

pub const DAILY_REPORT_COLUMNS: [&str; 8] = [
    "id",
    "client_name",
    "date",
    "slot_number",
    "payment_status",
    "total_fee",
    "status",
    "comment",
];

/// Writes every appointment, one row each.
pub fn write_appointments_csv(path: &Path, appointments: &[Appointment]) -> StoreResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(APPOINTMENT_COLUMNS)?;
    for app in appointments {
        let mut row = appointment_row(app, MISSING);
        row.push(format_timestamp(app.timestamp.as_ref()));
        wtr.write_record(&row)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    info!(
        "Exported {} appointments to {}",
        appointments.len(),
        path.display()
    );
    Ok(())
}

/// Writes every client. Comments and documents are flattened into one cell
/// each, one `[timestamp] text` line per entry.
pub fn write_clients_csv(path: &Path, clients: &[Client]) -> StoreResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(CLIENT_COLUMNS)?;
    for client in clients {
        let comments = client
            .comments
            .iter()
            .map(|c| format!("[{}] {}", format_timestamp(c.timestamp.as_ref()), c.text))
            .collect::<Vec<_>>()
            .join("\n");
        let documents = client
            .documents
            .iter()
            .map(|d| format!("[{}] {}", format_timestamp(d.timestamp.as_ref()), d.filename))
            .collect::<Vec<_>>()
            .join("\n");

        wtr.write_record([
            client.id.clone(),
            format_timestamp(client.registration_date.as_ref()),
            or_missing(&client.name, MISSING),
            or_missing(&client.dob, MISSING),
            or_missing(&client.email, MISSING),
            or_missing(&client.cellphone, MISSING),
            comments,
            documents,
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    info!("Exported {} clients to {}", clients.len(), path.display());
    Ok(())
}

/// Writes the appointments of a daily report. No timestamp column, and absent
/// values are left empty rather than `N/A`.
pub fn write_daily_report_csv(path: &Path, appointments: &[Appointment]) -> StoreResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(DAILY_REPORT_COLUMNS)?;
    for app in appointments {
        wtr.write_record(appointment_row(app, ""))?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    info!(
        "Exported daily report with {} appointments to {}",
        appointments.len(),
        path.display()
    );
    Ok(())
}

fn appointment_row(app: &Appointment, missing: &str) -> Vec<String> {
    vec![
        app.id.clone(),
        or_missing(&app.client_name, missing),
        app.date.to_string(),
        app.slot_number.clone(),
        app.payment_status.to_string(),
        format_fee(app.total_fee),
        app.status.to_string(),
        or_missing(&app.comment, missing),
    ]
}

fn or_missing(value: &Option<String>, missing: &str) -> String {
    value.as_deref().unwrap_or(missing).to_string()
}

// Debug keeps the decimal point on whole amounts ("50.0", not "50").
fn format_fee(fee: f64) -> String {
    format!("{:?}", fee)
}

fn format_timestamp(ts: Option<&Timestamp>) -> String {
    ts.map(Timestamp::to_string)
        .unwrap_or_else(|| MISSING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use common::{AppointmentStatus, Comment, Document, PaymentStatus, TIMESTAMP_FORMAT};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn ts(raw: &str) -> Option<Timestamp> {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .ok()
            .map(Timestamp::from)
    }

    fn sample_appointment() -> Appointment {
        Appointment {
            id: "a1".to_string(),
            client_id: "c1".to_string(),
            client_name: Some("Ana Silva".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            slot_number: "10:30".to_string(),
            payment_status: PaymentStatus::Paid,
            total_fee: 50.0,
            status: AppointmentStatus::Completed,
            comment: Some(String::new()),
            timestamp: None,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        rdr.records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_appointments_csv_columns_and_missing_timestamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("appointments.csv");

        write_appointments_csv(&path, &[sample_appointment()]).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0], APPOINTMENT_COLUMNS);
        assert_eq!(
            rows[1],
            vec![
                "a1",
                "Ana Silva",
                "2025-06-02",
                "10:30",
                "Paid",
                "50.0",
                "Completed",
                "",
                "N/A"
            ]
        );
    }

    #[test]
    fn test_clients_csv_flattens_comments_and_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clients.csv");
        let client = Client {
            id: "c1".to_string(),
            registration_date: ts("2025-01-01 09:00:00"),
            name: Some("Ana Silva".to_string()),
            dob: Some("1990-04-12".to_string()),
            email: Some("ana@example.com".to_string()),
            cellphone: Some("555-0100".to_string()),
            comments: vec![
                Comment {
                    timestamp: ts("2025-01-02 10:00:00"),
                    text: "First visit".to_string(),
                },
                Comment {
                    timestamp: ts("2025-01-03 11:00:00"),
                    text: "Follow-up".to_string(),
                },
            ],
            documents: vec![Document {
                filename: "intake.pdf".to_string(),
                path: PathBuf::from("client_documents/c1/intake.pdf"),
                timestamp: ts("2025-01-02 10:05:00"),
            }],
        };

        write_clients_csv(&path, &[client]).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0], CLIENT_COLUMNS);
        assert_eq!(rows[1][1], "2025-01-01 09:00:00");
        assert_eq!(
            rows[1][6],
            "[2025-01-02 10:00:00] First visit\n[2025-01-03 11:00:00] Follow-up"
        );
        assert_eq!(rows[1][7], "[2025-01-02 10:05:00] intake.pdf");
    }

    #[test]
    fn test_daily_report_csv_has_no_timestamp_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daily.csv");

        write_daily_report_csv(&path, &[sample_appointment()]).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0], DAILY_REPORT_COLUMNS);
        assert_eq!(rows[1].len(), 8);
        assert_eq!(rows[1][7], "");
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.csv");

        let result = write_appointments_csv(&path, &[]);
        assert!(result.is_err());
        assert!(!path.exists());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_absent_values_from_old_records_export_as_na() {
        let dir = tempdir().unwrap();
        let app: Appointment = serde_json::from_str(
            r#"{"id": "a9", "date": "2025-06-02", "slot_number": "11:00", "timestamp": "2025-06-01T08:00:00"}"#,
        )
        .unwrap();
        let client: Client = serde_json::from_str(r#"{"id": "c9", "name": "Ana"}"#).unwrap();

        let path = dir.path().join("appointments.csv");
        write_appointments_csv(&path, &[app.clone()]).unwrap();
        let rows = read_rows(&path);
        assert_eq!(rows[1][1], "N/A");
        assert_eq!(rows[1][7], "N/A");
        assert_eq!(rows[1][8], "2025-06-01T08:00:00");

        let path = dir.path().join("clients.csv");
        write_clients_csv(&path, &[client]).unwrap();
        let rows = read_rows(&path);
        assert_eq!(rows[1][1], "N/A");
        assert_eq!(rows[1][2], "Ana");
        assert_eq!(rows[1][3..6], ["N/A", "N/A", "N/A"]);

        let path = dir.path().join("daily.csv");
        write_daily_report_csv(&path, &[app]).unwrap();
        let rows = read_rows(&path);
        assert_eq!(rows[1][1], "");
        assert_eq!(rows[1][7], "");
    }
}
