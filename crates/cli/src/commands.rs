//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use devtrack_core::{ClientConfig, Role};
use devtrack_http::DevTrackClient;
use devtrack_http::types::{ContactMessage, ProfileUpdate, RegisterRequest, ResetPasswordRequest};
use devtrack_session::ActivityMonitor;
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::watch;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        email: String,

        /// Password; read from stdin when omitted
        #[arg(long, env = "DEVTRACK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Ask the server instead of reading the stored profile
        #[arg(long)]
        remote: bool,
    },

    /// Show or update the profile
    Profile {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Idle timeout in minutes (5-120)
        #[arg(long)]
        session_timeout: Option<u32>,
    },

    /// Registration, verification and password management
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Subjects and enrollments
    Subjects {
        #[command(subcommand)]
        command: SubjectCommands,
    },

    /// Progress summary of the signed-in student
    Dashboard,

    /// Calendar events
    Calendar {
        /// Only events of this subject
        #[arg(long)]
        subject: Option<u64>,
    },

    /// Notification inbox
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },

    /// Direct messages
    Inbox {
        #[command(subcommand)]
        command: InboxCommands,
    },

    /// Send the public contact form
    Contact {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        subject: String,

        message: String,

        /// Token obtained from the captcha widget
        #[arg(long)]
        captcha_token: Option<String>,
    },

    /// Keep the session open, signing out after the idle timeout.
    /// Each line typed on stdin counts as activity.
    Watch {
        /// Seconds between unread-notification polls
        #[arg(long, default_value = "30")]
        poll_secs: u64,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create an account
    Register {
        email: String,

        #[arg(long, env = "DEVTRACK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// Register as a teacher
        #[arg(long)]
        teacher: bool,
    },

    /// Confirm an email address with the emailed code
    Verify { email: String, code: String },

    /// Send a new verification code
    ResendCode { email: String },

    /// Request a password reset code
    ForgotPassword { email: String },

    /// Set a new password with a reset code
    ResetPassword {
        email: String,
        code: String,

        #[arg(long, env = "DEVTRACK_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,
    },

    /// Change the password of the signed-in user
    ChangePassword {
        #[arg(long)]
        current_password: String,

        #[arg(long)]
        new_password: String,
    },
}

#[derive(Subcommand)]
pub enum SubjectCommands {
    /// List subjects visible to the current user
    List,
    /// Show one subject
    Show { id: u64 },
    /// Create a subject (teachers)
    Create { name: String, code: String },
    /// List the students enrolled in a subject
    Enrollments { subject: u64 },
    /// Enroll a student by email (teachers)
    Enroll { subject: u64, email: String },
    /// Subjects the current student is enrolled in
    Mine,
    /// Exercise results of an enrollment
    Results { enrollment: u64 },
    /// Per-student grades and subject averages (teachers)
    Dashboard { subject: u64 },
    /// Download the consolidated grade report as CSV
    Export {
        subject: u64,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Enroll students from a CSV with an `email` column (teachers)
    ImportEnrollments { subject: u64, file: PathBuf },
    /// Record results from a CSV with `student_email`, `exercise_name`
    /// and `status` columns (teachers)
    ImportResults { subject: u64, file: PathBuf },
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    List,
    /// Print the unread count
    Unread,
    /// Mark one notification as read
    Read { id: u64 },
    /// Mark one notification as unread
    MarkUnread { id: u64 },
    /// Mark every notification as read
    ReadAll,
}

#[derive(Subcommand)]
pub enum InboxCommands {
    /// List conversations
    List,
    /// Show the messages of a conversation
    Show { conversation: u64 },
    /// Start a conversation with a user
    Start { recipient: u64 },
    /// Send a message
    Send { conversation: u64, message: String },
    /// Find users to message
    Search { query: String },
}

impl Commands {
    pub async fn execute(self, client: DevTrackClient, config: &ClientConfig, json: bool) -> Result<()> {
        let out = Output { json };
        match self {
            Commands::Login { email, password } => {
                let password = password_or_stdin(password, "Password")?;
                let user = client.login(&email, &password).await?;
                out.line(&user, || {
                    format!(
                        "Signed in as {} ({}), idle timeout {} min",
                        user.display_name(),
                        user.role,
                        user.session_timeout().minutes()
                    )
                })
            }
            Commands::Logout => {
                client.logout()?;
                println!("Signed out");
                Ok(())
            }
            Commands::Whoami { remote } => {
                let user = if remote {
                    client.me().await?
                } else {
                    client.vault().user().context("Not signed in")?
                };
                out.line(&user, || {
                    format!("{} <{}> [{}]", user.display_name(), user.email, user.role)
                })
            }
            Commands::Profile {
                first_name,
                last_name,
                session_timeout,
            } => {
                let update = ProfileUpdate {
                    first_name,
                    last_name,
                    session_timeout,
                };
                let user = if update.first_name.is_none()
                    && update.last_name.is_none()
                    && update.session_timeout.is_none()
                {
                    client.profile().await?
                } else {
                    client.update_profile(&update).await?
                };
                out.line(&user, || {
                    format!(
                        "{} <{}>\nrole: {}\nidle timeout: {} min",
                        user.display_name(),
                        user.email,
                        user.role,
                        user.session_timeout().minutes()
                    )
                })
            }
            Commands::Account { command } => command.execute(&client, &out).await,
            Commands::Subjects { command } => command.execute(&client, &out).await,
            Commands::Dashboard => {
                let dashboard = client.student_dashboard().await?;
                out.line(&dashboard, || {
                    let summary = &dashboard.summary;
                    let mut text = format!(
                        "{} results: {} green, {} yellow, {} red ({:.0}% success), {} pending",
                        summary.total_results,
                        summary.green_count,
                        summary.yellow_count,
                        summary.red_count,
                        summary.success_rate,
                        summary.total_pending
                    );
                    for p in &dashboard.subjects_progress {
                        text.push_str(&format!(
                            "\n{:<12} {}/{} exercises ({:.0}%)",
                            p.subject_code, p.completed_exercises, p.total_exercises, p.completion_rate
                        ));
                    }
                    text
                })
            }
            Commands::Calendar { subject } => {
                let events = client.calendar_events(subject).await?;
                out.lines(&events, |e| format!("{} - {}  {}", e.start, e.end, e.title))
            }
            Commands::Notifications { command } => command.execute(&client, &out).await,
            Commands::Inbox { command } => command.execute(&client, &out).await,
            Commands::Contact {
                name,
                email,
                subject,
                message,
                captcha_token,
            } => {
                let response = client
                    .send_contact_message(&ContactMessage {
                        name,
                        email,
                        subject,
                        message,
                        captcha_token,
                    })
                    .await?;
                out.line(&response, || response.message.clone())
            }
            Commands::Watch { poll_secs } => {
                if client.vault().user().is_none() {
                    bail!("Not signed in, run `devtrack login` first");
                }
                let monitor = ActivityMonitor::with_clock(
                    client.vault().clone(),
                    std::sync::Arc::new(devtrack_session::SystemClock),
                    config.idle_check_interval(),
                );
                watch::run(client, monitor, Duration::from_secs(poll_secs.max(1))).await
            }
        }
    }
}

impl AccountCommands {
    async fn execute(self, client: &DevTrackClient, out: &Output) -> Result<()> {
        let response = match self {
            AccountCommands::Register {
                email,
                password,
                first_name,
                last_name,
                teacher,
            } => {
                let request = RegisterRequest {
                    email,
                    password: password_or_stdin(password, "Password")?,
                    first_name,
                    last_name,
                    role: teacher.then_some(Role::Teacher),
                };
                if teacher {
                    client.register_teacher(&request).await?
                } else {
                    client.register(&request).await?
                }
            }
            AccountCommands::Verify { email, code } => client.verify_code(&email, &code).await?,
            AccountCommands::ResendCode { email } => client.resend_code(&email).await?,
            AccountCommands::ForgotPassword { email } => client.forgot_password(&email).await?,
            AccountCommands::ResetPassword {
                email,
                code,
                new_password,
            } => {
                let request = ResetPasswordRequest {
                    email,
                    code,
                    new_password: password_or_stdin(new_password, "New password")?,
                };
                client.reset_password(&request).await?
            }
            AccountCommands::ChangePassword {
                current_password,
                new_password,
            } => {
                client
                    .change_password(&current_password, &new_password)
                    .await?
            }
        };
        out.line(&response, || response.message.clone())
    }
}

impl SubjectCommands {
    async fn execute(self, client: &DevTrackClient, out: &Output) -> Result<()> {
        match self {
            SubjectCommands::List => {
                let subjects = client.list_subjects().await?;
                out.lines(&subjects, |s| {
                    format!("{:>5}  {:<12} {} ({} students)", s.id, s.code, s.name, s.enrollments_count)
                })
            }
            SubjectCommands::Show { id } => {
                let subject = client.get_subject(id).await?;
                out.line(&subject, || {
                    let teacher = subject
                        .teacher
                        .as_ref()
                        .map(|t| t.email.as_str())
                        .unwrap_or("-");
                    format!("{} {}\nteacher: {teacher}", subject.code, subject.name)
                })
            }
            SubjectCommands::Create { name, code } => {
                let subject = client.create_subject(&name, &code).await?;
                info!(subject_id = subject.id, "Subject created");
                out.line(&subject, || format!("Created subject {} ({})", subject.code, subject.id))
            }
            SubjectCommands::Enrollments { subject } => {
                let enrollments = client.list_enrollments(subject).await?;
                out.lines(&enrollments, |e| {
                    let email = e
                        .student
                        .as_ref()
                        .map(|s| s.email.as_str())
                        .or(e.student_email.as_deref())
                        .unwrap_or("-");
                    format!("{:>5}  {email}", e.id)
                })
            }
            SubjectCommands::Enroll { subject, email } => {
                let enrollment = client.enroll_student(subject, &email).await?;
                out.line(&enrollment, || format!("Enrolled {email} ({})", enrollment.id))
            }
            SubjectCommands::Mine => {
                let enrollments = client.my_enrollments().await?;
                out.lines(&enrollments, |e| {
                    format!(
                        "{:>5}  {:<12} {}  grade {:.2} [{}]",
                        e.enrollment_id, e.subject_code, e.subject_name, e.stats.grade, e.stats.semaphore
                    )
                })
            }
            SubjectCommands::Results { enrollment } => {
                let report = client.enrollment_results(enrollment).await?;
                out.line(&report, || {
                    let mut text = format!(
                        "{}  grade {:.2} [{}]",
                        report.student_email, report.stats.grade, report.stats.semaphore
                    );
                    for r in &report.results {
                        text.push_str(&format!("\n{:<6} {}", r.status, r.exercise_name));
                    }
                    text
                })
            }
            SubjectCommands::Dashboard { subject } => {
                let dashboard = client.subject_dashboard(subject).await?;
                out.line(&dashboard, || {
                    let a = &dashboard.aggregates;
                    let mut text = format!(
                        "{} {} ({} exercises)\naverage grade {:.2}, {:.1}% green, {:.1}% yellow, {:.1}% red",
                        dashboard.subject_code,
                        dashboard.subject_name,
                        dashboard.total_exercises,
                        a.avg_grade,
                        a.pct_green,
                        a.pct_yellow,
                        a.pct_red
                    );
                    for row in &dashboard.enrollments {
                        text.push_str(&format!(
                            "\n{:<32} {:.2} [{}]",
                            row.student_email, row.stats.grade, row.stats.semaphore
                        ));
                    }
                    text
                })
            }
            SubjectCommands::Export { subject, output } => {
                let export = client.export_subject_csv(subject).await?;
                match output {
                    Some(path) => {
                        tokio::fs::write(&path, export.content.as_bytes())
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Saved report to {}", path.display());
                    }
                    None => print!("{}", export.content),
                }
                Ok(())
            }
            SubjectCommands::ImportEnrollments { subject, file } => {
                let (name, content) = read_csv(&file).await?;
                let report = client.upload_enrollments_csv(subject, &name, content).await?;
                out.line(&report, || {
                    let mut text = format!("{} enrolled, {} already enrolled", report.created, report.existed);
                    for e in &report.errors {
                        text.push_str(&format!("\nrow {}: {}", e.row, e.error));
                    }
                    text
                })
            }
            SubjectCommands::ImportResults { subject, file } => {
                let (name, content) = read_csv(&file).await?;
                let report = client.upload_results_csv(subject, &name, content).await?;
                out.line(&report, || {
                    let mut text = format!("{} created, {} updated", report.created, report.updated);
                    for e in &report.errors {
                        text.push_str(&format!("\nrow {}: {}", e.row, e.error));
                    }
                    text
                })
            }
        }
    }
}

impl NotificationCommands {
    async fn execute(self, client: &DevTrackClient, out: &Output) -> Result<()> {
        match self {
            NotificationCommands::List => {
                let notifications = client.list_notifications().await?;
                out.lines(&notifications, |n| {
                    let marker = if n.is_read { ' ' } else { '*' };
                    format!(
                        "{marker} {:>5}  {}  {}",
                        n.id,
                        n.created_at.format("%Y-%m-%d %H:%M"),
                        n.title
                    )
                })
            }
            NotificationCommands::Unread => {
                let unread = client.unread_notifications().await?;
                out.line(&unread, || unread.to_string())
            }
            NotificationCommands::Read { id } => {
                client.mark_notification_read(id).await?;
                println!("Marked {id} as read");
                Ok(())
            }
            NotificationCommands::MarkUnread { id } => {
                let notification = client.set_notification_read(id, false).await?;
                out.line(&notification, || format!("Marked {id} as unread"))
            }
            NotificationCommands::ReadAll => {
                let updated = client.mark_all_notifications_read().await?;
                out.line(&updated, || format!("Marked {updated} notifications as read"))
            }
        }
    }
}

impl InboxCommands {
    async fn execute(self, client: &DevTrackClient, out: &Output) -> Result<()> {
        match self {
            InboxCommands::List => {
                let conversations = client.list_conversations().await?;
                out.lines(&conversations, |c| {
                    let with = c
                        .participants
                        .iter()
                        .map(|p| p.email.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{:>5}  [{} unread]  {with}", c.id, c.unread_count)
                })
            }
            InboxCommands::Show { conversation } => {
                let messages = client.list_messages(conversation).await?;
                client.mark_conversation_read(conversation).await?;
                out.lines(&messages, |m| {
                    format!(
                        "{}  {}: {}",
                        m.created_at.format("%Y-%m-%d %H:%M"),
                        m.sender.email,
                        m.content
                    )
                })
            }
            InboxCommands::Start { recipient } => {
                let conversation = client.start_conversation(recipient).await?;
                out.line(&conversation, || format!("Conversation {}", conversation.id))
            }
            InboxCommands::Send {
                conversation,
                message,
            } => {
                let sent = client.send_message(conversation, &message).await?;
                out.line(&sent, || format!("Sent message {}", sent.id))
            }
            InboxCommands::Search { query } => {
                let users = client.search_users(&query).await?;
                out.lines(&users, |u| format!("{:>5}  {} [{}]", u.id, u.email, u.role))
            }
        }
    }
}

/// Prints either JSON or a human-readable rendering
struct Output {
    json: bool,
}

impl Output {
    fn line<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human());
        }
        Ok(())
    }

    fn lines<T: Serialize>(&self, values: &[T], human: impl Fn(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(values)?);
        } else if values.is_empty() {
            println!("(none)");
        } else {
            for value in values {
                println!("{}", human(value));
            }
        }
        Ok(())
    }
}

/// File name as sent in the upload, plus the file's bytes
async fn read_csv(path: &std::path::Path) -> Result<(String, Vec<u8>)> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.csv".to_string());
    Ok((name, content))
}

fn password_or_stdin(password: Option<String>, prompt: &str) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("{prompt}: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}
