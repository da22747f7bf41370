use crate::ledger::{self, Status};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info, warn};

// Parent notification dispatch. Jobs are queued by the scan handler after
// the response is written and delivered by a single worker thread with its
// own database connection, so a slow gateway never holds up a scan.

#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub twilio: Option<TwilioConfig>,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug)]
pub struct Job {
    pub record_id: i64,
    pub student_name: String,
    pub grade: String,
    pub section: String,
    pub parent_contact: String,
    pub parent_email: Option<String>,
    pub time_in: String,
    pub status: Status,
}

#[derive(Clone)]
pub struct NotifyHandle {
    tx: mpsc::Sender<Job>,
}

impl NotifyHandle {
    /// Fire-and-forget: a full or dead queue is logged, never surfaced.
    pub fn enqueue(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("notification worker gone; dropping job");
        }
    }
}

/// Start the dispatcher thread for one workspace database.
pub fn spawn(db_path: PathBuf, config: NotifyConfig) -> NotifyHandle {
    let (tx, rx) = mpsc::channel::<Job>();
    thread::spawn(move || worker(db_path, config, rx));
    NotifyHandle { tx }
}

fn worker(db_path: PathBuf, config: NotifyConfig, rx: mpsc::Receiver<Job>) {
    let conn = match Connection::open(&db_path) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "notification worker could not open database; exiting");
            return;
        }
    };
    for job in rx {
        deliver(&conn, &config, &job);
    }
}

fn deliver(conn: &Connection, config: &NotifyConfig, job: &Job) {
    let message = sms_message(&job.student_name, &job.time_in, &job.grade, &job.section);
    if send_sms(config.twilio.as_ref(), &job.parent_contact, &message) {
        if let Err(e) = ledger::set_sms_notified(conn, job.record_id, true) {
            error!(record_id = job.record_id, error = %e, "sms flag update failed");
        }
    }

    if let Some(to) = job.parent_email.as_deref().filter(|e| !e.is_empty()) {
        let subject = format!(
            "KNHS Attendance: {} - {}",
            job.student_name,
            if job.status == Status::Present { "On Time" } else { "Late" }
        );
        let html = attendance_email(
            &job.student_name,
            &job.time_in,
            &job.grade,
            &job.section,
            job.status,
        );
        if send_email(config.email.as_ref(), to, &subject, &html) {
            if let Err(e) = ledger::set_email_notified(conn, job.record_id, true) {
                error!(record_id = job.record_id, error = %e, "email flag update failed");
            }
        }
    }
}

pub fn sms_message(name: &str, time_in: &str, grade: &str, section: &str) -> String {
    format!(
        "{} is arrived at {}. Grade {} - {}. - KNHS Guidance",
        name, time_in, grade, section
    )
}

/// Philippine mobile formats: strip separators, then 0XXXXXXXXXX and bare
/// numbers both become +63XXXXXXXXXX.
pub fn normalize_phone(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if let Some(rest) = cleaned.strip_prefix('0') {
        format!("+63{}", rest)
    } else if cleaned.starts_with('+') {
        cleaned
    } else {
        format!("+63{}", cleaned)
    }
}

/// One delivery attempt over the Twilio REST API. Unconfigured or failing
/// gateways log and report false; nothing here may panic or propagate.
pub fn send_sms(config: Option<&TwilioConfig>, phone: &str, message: &str) -> bool {
    let Some(cfg) = config else {
        debug!(to = phone, "sms gateway not configured; sms not sent");
        return false;
    };
    let to = normalize_phone(phone);
    let url = format!(
        "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
        cfg.account_sid
    );
    let result = reqwest::blocking::Client::new()
        .post(&url)
        .basic_auth(&cfg.account_sid, Some(&cfg.auth_token))
        .form(&[("To", to.as_str()), ("From", &cfg.from_number), ("Body", message)])
        .send();
    match result {
        Ok(resp) if resp.status().is_success() => {
            info!(to = %to, "sms sent");
            true
        }
        Ok(resp) => {
            warn!(to = %to, status = %resp.status(), "sms gateway rejected message");
            false
        }
        Err(e) => {
            warn!(to = %to, error = %e, "sms send failed");
            false
        }
    }
}

/// One delivery attempt against a SendGrid-style JSON mail API.
pub fn send_email(config: Option<&EmailConfig>, to: &str, subject: &str, html: &str) -> bool {
    let Some(cfg) = config else {
        debug!(to, "email gateway not configured; email not sent");
        return false;
    };
    let body = serde_json::json!({
        "personalizations": [{ "to": [{ "email": to }] }],
        "from": { "email": cfg.from },
        "subject": subject,
        "content": [{ "type": "text/html", "value": html }],
    });
    let result = reqwest::blocking::Client::new()
        .post(&cfg.api_url)
        .bearer_auth(&cfg.api_key)
        .json(&body)
        .send();
    match result {
        Ok(resp) if resp.status().is_success() => {
            info!(to, "email sent");
            true
        }
        Ok(resp) => {
            warn!(to, status = %resp.status(), "email gateway rejected message");
            false
        }
        Err(e) => {
            warn!(to, error = %e, "email send failed");
            false
        }
    }
}

pub fn attendance_email(
    name: &str,
    time_in: &str,
    grade: &str,
    section: &str,
    status: Status,
) -> String {
    let (status_color, status_text) = match status {
        Status::Present => ("#22c55e", "On Time"),
        Status::Late => ("#f59e0b", "Late"),
        _ => ("#ef4444", "Absent"),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: sans-serif; background-color: #f5f5f5; margin: 0; padding: 20px;">
  <div style="max-width: 600px; margin: 0 auto; background: white; border-radius: 10px; padding: 30px;">
    <h1 style="color: #1e3a5f;">Kaysuyo National High School</h1>
    <p style="color: #666;">Guidance &amp; Attendance System</p>
    <p><strong>{name}</strong> has been marked:</p>
    <div style="display: inline-block; background: {status_color}; color: white; padding: 8px 16px; border-radius: 20px; font-weight: bold;">{status_text}</div>
    <table style="width: 100%; margin: 20px 0;">
      <tr><td style="color: #666;">Time of Arrival:</td><td style="text-align: right; font-weight: bold;">{time_in}</td></tr>
      <tr><td style="color: #666;">Grade Level:</td><td style="text-align: right; font-weight: bold;">Grade {grade}</td></tr>
      <tr><td style="color: #666;">Section:</td><td style="text-align: right; font-weight: bold;">{section}</td></tr>
    </table>
    <p style="color: #1e3a5f; font-size: 14px;"><strong>Reminder:</strong> Classes start at 7:00 AM. Students should arrive by 6:45 AM.</p>
    <p style="color: #888; font-size: 12px;">This is an automated message from KNHS Guidance &amp; Attendance System. Please do not reply to this email.</p>
  </div>
</body>
</html>
"#
    )
}
