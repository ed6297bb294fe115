//! Request and response bodies of the DevTrack REST API

use chrono::{DateTime, Utc};
use devtrack_core::{CredentialPair, Role, User, UserId};
use serde::{Deserialize, Serialize};

/// Token refresh request
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenRefreshRequest {
    pub refresh: String,
}

/// Token refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenRefreshResponse {
    pub access: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: both tokens plus the profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

impl LoginResponse {
    pub fn into_parts(self) -> (User, CredentialPair) {
        (
            self.user,
            CredentialPair {
                access: self.access,
                refresh: self.refresh,
            },
        )
    }
}

/// Self-service registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Partial profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_timeout: Option<u32>,
}

/// Generic `{message}` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default, alias = "detail", alias = "status")]
    pub message: String,
}

/// Lightweight user reference embedded in other resources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: u64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub teacher: Option<UserSummary>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub enrollments_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: u64,
    pub subject: u64,
    #[serde(default)]
    pub student: Option<UserSummary>,
    #[serde(default)]
    pub student_email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrollStudentRequest {
    pub student_email: String,
}

/// Traffic-light status of an exercise or an enrollment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Semaphore {
    Green,
    Yellow,
    Red,
}

impl std::fmt::Display for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        })
    }
}

/// Result counts and grade of one enrollment, computed by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentStats {
    pub total: u32,
    pub green: u32,
    pub yellow: u32,
    pub red: u32,
    pub grade: f64,
    pub semaphore: Semaphore,
}

/// One row of `my-enrollments/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentEnrollment {
    pub enrollment_id: u64,
    pub subject_id: u64,
    pub subject_code: String,
    pub subject_name: String,
    pub stats: EnrollmentStats,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentEnrollments {
    pub enrollments: Vec<StudentEnrollment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseResult {
    pub exercise_id: u64,
    pub exercise_name: String,
    pub status: Semaphore,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-exercise results of one enrollment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResults {
    pub enrollment_id: u64,
    pub student_email: String,
    #[serde(default)]
    pub results: Vec<ExerciseResult>,
    pub stats: EnrollmentStats,
}

/// One student row of a subject dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardRow {
    pub enrollment_id: u64,
    pub student_email: String,
    #[serde(flatten)]
    pub stats: EnrollmentStats,
}

/// Subject-wide averages; percentages are over all recorded results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardAggregates {
    pub avg_grade: f64,
    pub pct_green: f64,
    pub pct_yellow: f64,
    pub pct_red: f64,
}

/// Teacher view of a subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectDashboard {
    pub subject_id: u64,
    pub subject_code: String,
    pub subject_name: String,
    pub total_exercises: u32,
    #[serde(default)]
    pub enrollments: Vec<DashboardRow>,
    #[serde(default)]
    pub aggregates: DashboardAggregates,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StudentSummary {
    pub total_results: u32,
    pub green_count: u32,
    pub yellow_count: u32,
    pub red_count: u32,
    pub success_rate: f64,
    pub total_pending: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectProgress {
    pub subject_id: u64,
    pub subject_code: String,
    pub subject_name: String,
    #[serde(default)]
    pub total_exercises: u32,
    #[serde(default)]
    pub completed_exercises: u32,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub grade: Option<f64>,
}

/// Exercise the student has no result for yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingExercise {
    pub id: u64,
    pub name: String,
    pub subject_id: u64,
    #[serde(default)]
    pub subject_code: String,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentResult {
    pub id: u64,
    pub exercise_name: String,
    #[serde(default)]
    pub subject_name: String,
    pub status: Semaphore,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Everything the student home page shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDashboard {
    #[serde(default)]
    pub summary: StudentSummary,
    #[serde(default)]
    pub subjects_progress: Vec<SubjectProgress>,
    #[serde(default)]
    pub pending_exercises: Vec<PendingExercise>,
    #[serde(default)]
    pub recent_results: Vec<RecentResult>,
}

/// Calendar entry. `start` and `end` are kept as sent; all-day events
/// carry a bare date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub title: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A CSV row the backend refused, numbered as in a spreadsheet (header is row 1)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsvRowError {
    pub row: u32,
    pub error: String,
}

/// Outcome of `enrollments/upload-csv/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentImport {
    pub created: u32,
    pub existed: u32,
    #[serde(default)]
    pub errors: Vec<CsvRowError>,
}

/// Outcome of `results/upload-csv/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultImport {
    pub created: u32,
    pub updated: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub errors: Vec<CsvRowError>,
}

/// Downloaded subject report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// From `Content-Disposition`, when the backend sends one
    pub filename: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationReadUpdate {
    pub is_read: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadCount {
    pub unread: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkAllReadResponse {
    pub updated: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub conversation: u64,
    pub sender: UserSummary,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    #[serde(default)]
    pub participants: Vec<UserSummary>,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartConversationRequest {
    pub recipient_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: u64,
    pub content: String,
}

/// Public contact form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    /// Token produced by the captcha widget, verified server-side
    #[serde(rename = "turnstile_token", skip_serializing_if = "Option::is_none")]
    pub captcha_token: Option<String>,
}
