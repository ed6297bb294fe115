//! Dashboards, CSV import/export and the calendar
//!
//! CSV files are uploaded as `multipart/form-data` with a single `file`
//! field. The bytes are buffered so the form can be rebuilt if the upload
//! has to be replayed after a token refresh.

use super::{ClientError, DevTrackClient};
use crate::types::{
    CalendarEvent, CsvExport, EnrollmentImport, ResultImport, StudentDashboard, SubjectDashboard,
};
use reqwest::Method;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use tracing::info;

impl DevTrackClient {
    /// Per-student stats and subject aggregates (subject teacher or admin)
    pub async fn subject_dashboard(&self, subject_id: u64) -> Result<SubjectDashboard, ClientError> {
        let request = self.request(
            Method::GET,
            &format!("/api/courses/subjects/{subject_id}/dashboard/"),
        );
        self.execute(request).await
    }

    pub async fn student_dashboard(&self) -> Result<StudentDashboard, ClientError> {
        let request = self.request(Method::GET, "/api/courses/student-dashboard/");
        self.execute(request).await
    }

    /// Calendar events, optionally restricted to one subject
    pub async fn calendar_events(
        &self,
        subject_id: Option<u64>,
    ) -> Result<Vec<CalendarEvent>, ClientError> {
        let mut request = self.request(Method::GET, "/api/courses/calendar/all_events/");
        if let Some(id) = subject_id {
            request = request.query(&[("subject", id)]);
        }
        self.execute(request).await
    }

    /// Download the consolidated per-student report of a subject
    pub async fn export_subject_csv(&self, subject_id: u64) -> Result<CsvExport, ClientError> {
        let request = self.request(
            Method::GET,
            &format!("/api/courses/subjects/{subject_id}/export-csv/"),
        );
        let response = Self::check(self.send(request).await?).await?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_filename);
        let content = response.text().await?;
        Ok(CsvExport { filename, content })
    }

    /// Enroll students listed in a CSV with an `email` column and optional
    /// `first_name`/`last_name`. Unknown students are created.
    pub async fn upload_enrollments_csv(
        &self,
        subject_id: u64,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<EnrollmentImport, ClientError> {
        let path = format!("/api/courses/subjects/{subject_id}/enrollments/upload-csv/");
        let report: EnrollmentImport = self.upload_csv(&path, filename, content).await?;
        info!(
            subject_id,
            created = report.created,
            existed = report.existed,
            errors = report.errors.len(),
            "Enrollment CSV imported"
        );
        Ok(report)
    }

    /// Record results from a CSV with `student_email`, `exercise_name` and
    /// `status` columns. Exercises missing from the subject are created.
    pub async fn upload_results_csv(
        &self,
        subject_id: u64,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<ResultImport, ClientError> {
        let path = format!("/api/courses/subjects/{subject_id}/results/upload-csv/");
        let report: ResultImport = self.upload_csv(&path, filename, content).await?;
        info!(
            subject_id,
            created = report.created,
            updated = report.updated,
            errors = report.errors.len(),
            "Result CSV imported"
        );
        Ok(report)
    }

    async fn upload_csv<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<T, ClientError> {
        let filename = filename.to_string();
        self.execute_with(|| {
            let part = Part::bytes(content.clone()).file_name(filename.clone());
            self.request(Method::POST, path)
                .multipart(Form::new().part("file", part))
        })
        .await
    }
}

/// `filename` parameter of a `Content-Disposition` header
fn attachment_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .find(|name| !name.is_empty())
}
