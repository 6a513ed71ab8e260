use axum::extract::Path;
use axum::handler::Handler;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;

use crate::catalog::{self, Catalog};
use crate::feedback::{self, FeedbackReview};
use crate::io::RecordStore;
use crate::ledger::{self, CourseRef, ProgressRow, ProgressUpdate, ReminderSent};
use crate::models::{CourseId, Enrollment, Feedback};
use crate::notify::{self, Notifications};
use crate::{breaks, err, proceeds, settles, Error, Payload};

pub fn app(store: RecordStore) -> Router {
    Router::new()
        .route("/courses", get(browse_courses))
        .route("/enrollments", post(enroll).get(progress_report))
        .route("/enrollments/:student/:course_id", get(find_enrollment))
        .route("/enrollments/:student/:course_id/progress", post(advance_progress))
        .route("/enrollments/:student/:course_id/grade", post(assign_grade))
        .route("/enrollments/:student/:course_id/certificate", get(certificate))
        .route("/students/:student/reminders", get(reminder_candidates))
        .route("/students/:student/notifications", get(notifications))
        .route("/reminders", post(send_reminder))
        .route("/feedback", post(submit_feedback).get(review_feedback))
        .fallback(err::handler404.into_service())
        .layer(ServiceBuilder::new().layer(Extension(store)))
}

async fn browse_courses(Extension(store): Extension<RecordStore>) -> Payload<Catalog> {
    settles(catalog::browse(&store, Local::now().naive_local()).await)
}

async fn enroll(
    Extension(store): Extension<RecordStore>,
    Json(body): Json<EnrollRequest>,
) -> Payload<Enrollment> {
    settles(ledger::enroll(&store, &body.student_name, body.course_id).await)
}

async fn progress_report(Extension(store): Extension<RecordStore>) -> Payload<ProgressReport> {
    settles(
        ledger::progress_report(&store)
            .await
            .map(|enrollments| ProgressReport { enrollments }),
    )
}

async fn find_enrollment(
    Path((student, course_id)): Path<(String, CourseId)>,
    Extension(store): Extension<RecordStore>,
) -> Payload<Enrollment> {
    match ledger::find_enrollment(&store, &student, course_id).await? {
        Some(enrollment) => proceeds(enrollment),
        None => breaks(Error::not_found("Enrollment not found.")),
    }
}

async fn advance_progress(
    Path((student, course_id)): Path<(String, CourseId)>,
    Extension(store): Extension<RecordStore>,
    body: Option<Json<AdvanceRequest>>,
) -> Payload<ProgressUpdate> {
    let step = body
        .and_then(|Json(body)| body.step)
        .unwrap_or(ledger::PROGRESS_STEP);
    settles(ledger::advance_progress(&store, &student, course_id, step).await)
}

async fn assign_grade(
    Path((student, course_id)): Path<(String, CourseId)>,
    Extension(store): Extension<RecordStore>,
    Json(body): Json<GradeRequest>,
) -> Payload<Enrollment> {
    settles(ledger::assign_grade(&store, &student, course_id, &body.grade).await)
}

async fn certificate(
    Path((student, course_id)): Path<(String, CourseId)>,
    Extension(store): Extension<RecordStore>,
) -> Payload<Certificate> {
    let enrollment = ledger::find_enrollment(&store, &student, course_id).await?;
    let eligible = enrollment.as_ref().map_or(false, Enrollment::is_completed);
    let message = match enrollment {
        None => "Enrollment not found.".to_string(),
        Some(_) if eligible => {
            format!("Certificate: {} has successfully completed the course!", student)
        }
        Some(_) => "Course not completed or progress is less than 100%.".to_string(),
    };
    proceeds(Certificate {
        student_name: student,
        course_id,
        eligible,
        message,
    })
}

async fn reminder_candidates(
    Path(student): Path<String>,
    Extension(store): Extension<RecordStore>,
) -> Payload<Enrollments> {
    settles(
        ledger::reminder_candidates(&store, &student)
            .await
            .map(|enrollments| Enrollments { enrollments }),
    )
}

async fn notifications(
    Path(student): Path<String>,
    Extension(store): Extension<RecordStore>,
) -> Payload<Notifications> {
    settles(notify::notifications_for(&store, &student).await)
}

async fn send_reminder(
    Extension(store): Extension<RecordStore>,
    Json(body): Json<ReminderRequest>,
) -> Payload<ReminderSent> {
    settles(ledger::send_reminder(&store, &body.student_name, &body.course).await)
}

async fn submit_feedback(
    Extension(store): Extension<RecordStore>,
    Json(body): Json<Feedback>,
) -> Payload<Feedback> {
    settles(feedback::submit(&store, &body.student_name, body.course_id, &body.feedback).await)
}

async fn review_feedback(Extension(store): Extension<RecordStore>) -> Payload<FeedbackLog> {
    settles(
        feedback::list_all(&store)
            .await
            .map(|feedback| FeedbackLog { feedback }),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollRequest {
    pub student_name: String,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvanceRequest {
    #[serde(default)]
    pub step: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradeRequest {
    pub grade: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderRequest {
    pub student_name: String,
    pub course: CourseRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    pub student_name: String,
    pub course_id: CourseId,
    pub eligible: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Enrollments {
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub enrollments: Vec<ProgressRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackLog {
    pub feedback: Vec<FeedbackReview>,
}
