//! Enrollment state machine.
//!
//! Every operation reads the enrollment resource afresh, so nothing is cached
//! between calls. Progress only moves up, in steps, and stops at [`COMPLETE`].
//! A grade can be set once progress reaches [`GRADE_THRESHOLD`] and may be
//! replaced freely afterwards.

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::io::{RecordStore, Resource};
use crate::models::{Course, CourseId, Enrollment};
use crate::notify;
use crate::Error;

pub const PROGRESS_STEP: u32 = 20;
pub const GRADE_THRESHOLD: u32 = 60;
pub const COMPLETE: u32 = 100;

struct Roster {
    enrollments: Vec<Enrollment>,
}

impl Roster {
    async fn load(store: &RecordStore) -> Result<Self, Error> {
        Ok(Self {
            enrollments: store.load(Resource::Enrollments).await?,
        })
    }

    fn position(&self, student_name: &str, course_id: CourseId) -> Option<usize> {
        self.enrollments
            .iter()
            .position(|e| e.is_for(student_name, course_id))
    }

    fn get_mut(&mut self, student_name: &str, course_id: CourseId) -> Result<&mut Enrollment, Error> {
        match self.position(student_name, course_id) {
            Some(idx) => Ok(&mut self.enrollments[idx]),
            None => Err(missing_enrollment(student_name, course_id)),
        }
    }

    async fn save(&self, store: &RecordStore) -> Result<(), Error> {
        store.save(Resource::Enrollments, &self.enrollments).await
    }
}

fn missing_enrollment(student_name: &str, course_id: CourseId) -> Error {
    Error::not_found(format!(
        "Enrollment of `{}` in course `{}` not found.",
        student_name, course_id
    ))
}

pub async fn enroll(store: &RecordStore, student_name: &str, course_id: CourseId) -> Result<Enrollment, Error> {
    if student_name.trim().is_empty() {
        return Err(Error::invalid("Name cannot be empty!"));
    }
    let course = catalog::find_course(store, course_id).await?;

    let _guard = store.lock().await;
    let mut roster = Roster::load(store).await?;
    if roster.position(student_name, course_id).is_some() {
        log::warn!("`{}` is already enrolled in {}", student_name, course.title);
        return Err(Error::conflict(format!(
            "`{}` is already enrolled in {}!",
            student_name, course.title
        )));
    }

    let enrollment = Enrollment::new(student_name, course_id);
    roster.enrollments.push(enrollment.clone());
    roster.save(store).await?;
    log::info!("Enrolled `{}` in {}", student_name, course.title);
    Ok(enrollment)
}

pub async fn find_enrollment(
    store: &RecordStore,
    student_name: &str,
    course_id: CourseId,
) -> Result<Option<Enrollment>, Error> {
    let roster = Roster::load(store).await?;
    Ok(roster
        .enrollments
        .into_iter()
        .find(|e| e.is_for(student_name, course_id)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    /// Set only by the call that moved progress to [`COMPLETE`].
    pub completed_now: bool,
}

pub async fn advance_progress(
    store: &RecordStore,
    student_name: &str,
    course_id: CourseId,
    step: u32,
) -> Result<ProgressUpdate, Error> {
    if step == 0 {
        return Err(Error::invalid("Progress step must be positive"));
    }

    let _guard = store.lock().await;
    let mut roster = Roster::load(store).await?;
    let enrollment = roster.get_mut(student_name, course_id)?;
    if enrollment.is_completed() {
        log::debug!("`{}` already completed course {}", student_name, course_id);
        return Ok(ProgressUpdate {
            enrollment: enrollment.clone(),
            completed_now: false,
        });
    }

    enrollment.progress = enrollment.progress.saturating_add(step).min(COMPLETE);
    let update = ProgressUpdate {
        completed_now: enrollment.progress == COMPLETE,
        enrollment: enrollment.clone(),
    };
    roster.save(store).await?;

    log::info!(
        "Progress of `{}` in course {} is now {}%",
        student_name,
        course_id,
        update.enrollment.progress
    );
    if update.completed_now {
        log::info!("`{}` completed course {}", student_name, course_id);
    }
    Ok(update)
}

pub async fn assign_grade(
    store: &RecordStore,
    student_name: &str,
    course_id: CourseId,
    grade: &str,
) -> Result<Enrollment, Error> {
    if grade.trim().is_empty() {
        return Err(Error::invalid("Grade cannot be empty!"));
    }

    let _guard = store.lock().await;
    let mut roster = Roster::load(store).await?;
    let enrollment = roster.get_mut(student_name, course_id)?;
    if enrollment.progress < GRADE_THRESHOLD {
        return Err(Error::precondition(format!(
            "Cannot assign a grade. The student must complete at least {}% of the course!",
            GRADE_THRESHOLD
        )));
    }

    enrollment.grade = Some(grade.to_string());
    let graded = enrollment.clone();
    roster.save(store).await?;
    log::info!("Grade {} assigned to `{}` for course {}", grade, student_name, course_id);
    Ok(graded)
}

/// A course named either by id or by title.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CourseRef {
    Id(CourseId),
    Title(String),
}

impl CourseRef {
    async fn resolve(&self, store: &RecordStore) -> Result<Course, Error> {
        match self {
            CourseRef::Id(course_id) => catalog::find_course(store, *course_id).await,
            CourseRef::Title(title) => catalog::find_course_by_title(store, title).await,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderSent {
    pub student_name: String,
    pub course_id: CourseId,
    pub reminder: String,
    pub message: String,
}

/// Appends a reminder to the matching enrollment.
///
/// Completed enrollments are not rejected here; callers pick targets from
/// [`reminder_candidates`].
pub async fn send_reminder(
    store: &RecordStore,
    student_name: &str,
    course: &CourseRef,
) -> Result<ReminderSent, Error> {
    let course = course.resolve(store).await?;

    let _guard = store.lock().await;
    let mut roster = Roster::load(store).await?;
    let enrollment = roster.get_mut(student_name, course.course_id)?;
    let reminder = notify::append_reminder(enrollment, &course.title);
    roster.save(store).await?;

    log::info!("Reminder sent to `{}` for {}", student_name, course.title);
    Ok(ReminderSent {
        student_name: student_name.to_string(),
        course_id: course.course_id,
        message: format!(
            "Reminder sent to {} to complete the course: {}!",
            student_name, course.title
        ),
        reminder,
    })
}

/// The student's enrollments that are still in progress.
pub async fn reminder_candidates(store: &RecordStore, student_name: &str) -> Result<Vec<Enrollment>, Error> {
    let roster = Roster::load(store).await?;
    Ok(roster
        .enrollments
        .into_iter()
        .filter(|e| e.student_name == student_name && !e.is_completed())
        .collect())
}

pub async fn certificate_eligibility(
    store: &RecordStore,
    student_name: &str,
    course_id: CourseId,
) -> Result<bool, Error> {
    Ok(find_enrollment(store, student_name, course_id)
        .await?
        .map_or(false, |e| e.is_completed()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRow {
    pub student_name: String,
    pub course_id: CourseId,
    pub course_title: String,
    pub progress: u32,
    pub grade: Option<String>,
}

/// Every enrollment joined to its course. Enrollments of unknown courses are left out.
pub async fn progress_report(store: &RecordStore) -> Result<Vec<ProgressRow>, Error> {
    let courses = catalog::list_courses(store).await?;
    let roster = Roster::load(store).await?;
    Ok(roster
        .enrollments
        .into_iter()
        .filter_map(|e| {
            let course = courses.iter().find(|c| c.course_id == e.course_id)?;
            Some(ProgressRow {
                course_title: course.title.clone(),
                student_name: e.student_name,
                course_id: e.course_id,
                progress: e.progress,
                grade: e.grade,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        catalog::seed_if_absent(&store).await.unwrap();
        (dir, store)
    }

    async fn stored(store: &RecordStore) -> Vec<Enrollment> {
        store.load(Resource::Enrollments).await.unwrap()
    }

    async fn advance_to(store: &RecordStore, student: &str, course_id: CourseId, times: usize) {
        for _ in 0..times {
            advance_progress(store, student, course_id, PROGRESS_STEP)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn enroll_creates_fresh_enrollment() {
        let (_dir, store) = seeded().await;
        let enrollment = enroll(&store, "Alice", 1).await.unwrap();
        assert_eq!(enrollment, Enrollment::new("Alice", 1));
        assert_eq!(stored(&store).await, vec![Enrollment::new("Alice", 1)]);
    }

    #[tokio::test]
    async fn duplicate_enrollment_conflicts() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();
        assert!(matches!(
            enroll(&store, "Alice", 1).await,
            Err(Error::ConflictError { .. })
        ));

        let matching = stored(&store)
            .await
            .into_iter()
            .filter(|e| e.is_for("Alice", 1))
            .count();
        assert_eq!(matching, 1);

        // same name in another course is a separate enrollment
        enroll(&store, "Alice", 2).await.unwrap();
        assert_eq!(stored(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn enroll_rejects_blank_name_and_unknown_course() {
        let (_dir, store) = seeded().await;
        assert!(matches!(
            enroll(&store, "   ", 1).await,
            Err(Error::ValidationError { .. })
        ));
        assert!(matches!(
            enroll(&store, "Alice", 42).await,
            Err(Error::NotFoundError { .. })
        ));
        assert!(stored(&store).await.is_empty());
    }

    #[tokio::test]
    async fn progress_climbs_in_steps_and_stops_at_completion() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();

        let mut seen = Vec::new();
        let mut completions = 0;
        for _ in 0..6 {
            let update = advance_progress(&store, "Alice", 1, PROGRESS_STEP)
                .await
                .unwrap();
            seen.push(update.enrollment.progress);
            if update.completed_now {
                completions += 1;
            }
        }
        assert_eq!(seen, vec![20, 40, 60, 80, 100, 100]);
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn oversized_step_is_capped() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();
        advance_progress(&store, "Alice", 1, 50).await.unwrap();
        let update = advance_progress(&store, "Alice", 1, 70).await.unwrap();
        assert_eq!(update.enrollment.progress, 100);
        assert!(update.completed_now);
    }

    #[tokio::test]
    async fn advance_requires_enrollment_and_positive_step() {
        let (_dir, store) = seeded().await;
        assert!(matches!(
            advance_progress(&store, "Ghost", 1, PROGRESS_STEP).await,
            Err(Error::NotFoundError { .. })
        ));
        enroll(&store, "Alice", 1).await.unwrap();
        assert!(matches!(
            advance_progress(&store, "Alice", 1, 0).await,
            Err(Error::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn advancing_one_enrollment_leaves_others_untouched() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();
        enroll(&store, "Bob", 1).await.unwrap();
        advance_to(&store, "Bob", 1, 2).await;

        let alice = find_enrollment(&store, "Alice", 1).await.unwrap().unwrap();
        let bob = find_enrollment(&store, "Bob", 1).await.unwrap().unwrap();
        assert_eq!(alice.progress, 0);
        assert_eq!(bob.progress, 40);
    }

    #[tokio::test]
    async fn grade_needs_sixty_percent() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();
        advance_to(&store, "Alice", 1, 2).await;
        assert!(matches!(
            assign_grade(&store, "Alice", 1, "A").await,
            Err(Error::PreconditionError { .. })
        ));

        advance_to(&store, "Alice", 1, 1).await;
        assign_grade(&store, "Alice", 1, "A").await.unwrap();
        let reread = find_enrollment(&store, "Alice", 1).await.unwrap().unwrap();
        assert_eq!(reread.grade.as_deref(), Some("A"));
        let reread = find_enrollment(&store, "Alice", 1).await.unwrap().unwrap();
        assert_eq!(reread.grade.as_deref(), Some("A"));

        advance_to(&store, "Alice", 1, 2).await;
        let regraded = assign_grade(&store, "Alice", 1, "A+").await.unwrap();
        assert_eq!(regraded.grade.as_deref(), Some("A+"));
    }

    #[tokio::test]
    async fn grade_rejects_missing_enrollment_and_blank_grade() {
        let (_dir, store) = seeded().await;
        assert!(matches!(
            assign_grade(&store, "Alice", 1, "B").await,
            Err(Error::NotFoundError { .. })
        ));
        assert!(matches!(
            assign_grade(&store, "Alice", 1, " ").await,
            Err(Error::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn reminders_target_the_named_course() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();
        enroll(&store, "Alice", 3).await.unwrap();

        let sent = send_reminder(&store, "Alice", &CourseRef::Title("Java".to_string()))
            .await
            .unwrap();
        assert_eq!(sent.course_id, 3);
        assert_eq!(sent.message, "Reminder sent to Alice to complete the course: Java!");
        send_reminder(&store, "Alice", &CourseRef::Id(3)).await.unwrap();

        let java = find_enrollment(&store, "Alice", 3).await.unwrap().unwrap();
        assert_eq!(
            java.reminders,
            vec!["Reminder to complete Java!", "Reminder to complete Java!"]
        );
        let python = find_enrollment(&store, "Alice", 1).await.unwrap().unwrap();
        assert!(python.reminders.is_empty());
    }

    #[tokio::test]
    async fn reminder_without_enrollment_is_not_found() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();
        assert!(matches!(
            send_reminder(&store, "Alice", &CourseRef::Id(2)).await,
            Err(Error::NotFoundError { .. })
        ));
        assert!(matches!(
            send_reminder(&store, "Alice", &CourseRef::Title("Cooking".to_string())).await,
            Err(Error::NotFoundError { .. })
        ));
        assert!(matches!(
            send_reminder(&store, "Bob", &CourseRef::Id(1)).await,
            Err(Error::NotFoundError { .. })
        ));
    }

    #[tokio::test]
    async fn candidates_exclude_completed_courses() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();
        enroll(&store, "Alice", 2).await.unwrap();
        enroll(&store, "Bob", 3).await.unwrap();
        advance_to(&store, "Alice", 1, 5).await;

        let candidates = reminder_candidates(&store, "Alice").await.unwrap();
        assert_eq!(candidates, vec![Enrollment::new("Alice", 2)]);
        assert!(reminder_candidates(&store, "Nobody").await.unwrap().is_empty());
    }

    #[test]
    fn course_ref_accepts_id_or_title() {
        let id: CourseRef = serde_json::from_str("2").unwrap();
        let title: CourseRef = serde_json::from_str("\"Java\"").unwrap();
        assert_eq!(id, CourseRef::Id(2));
        assert_eq!(title, CourseRef::Title("Java".to_string()));
    }

    #[tokio::test]
    async fn report_joins_course_titles() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 4).await.unwrap();
        let mut orphan = stored(&store).await;
        orphan.push(Enrollment::new("Zed", 99));
        store.save(Resource::Enrollments, &orphan).await.unwrap();

        let report = progress_report(&store).await.unwrap();
        assert_eq!(
            report,
            vec![ProgressRow {
                student_name: "Alice".to_string(),
                course_id: 4,
                course_title: "Full Stack Development".to_string(),
                progress: 0,
                grade: None,
            }]
        );
    }

    #[tokio::test]
    async fn legacy_progress_past_ceiling_counts_as_complete() {
        let (_dir, store) = seeded().await;
        let mut legacy = Enrollment::new("Dana", 2);
        legacy.progress = 120;
        store.save(Resource::Enrollments, &[legacy]).await.unwrap();

        assert!(certificate_eligibility(&store, "Dana", 2).await.unwrap());
        assert!(reminder_candidates(&store, "Dana").await.unwrap().is_empty());
        let update = advance_progress(&store, "Dana", 2, PROGRESS_STEP).await.unwrap();
        assert_eq!(update.enrollment.progress, 120);
        assert!(!update.completed_now);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_do_not_lose_updates() {
        let (_dir, store) = seeded().await;

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let student = format!("student-{}", i);
                    let course_id = (i % 4 + 1) as CourseId;
                    enroll(&store, &student, course_id).await.unwrap();
                    advance_progress(&store, &student, course_id, PROGRESS_STEP)
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let enrollments = stored(&store).await;
        assert_eq!(enrollments.len(), 40);
        assert!(enrollments.iter().all(|e| e.progress == PROGRESS_STEP));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_steps_on_one_enrollment_all_land() {
        let (_dir, store) = seeded().await;
        enroll(&store, "Alice", 1).await.unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    advance_progress(&store, "Alice", 1, PROGRESS_STEP)
                        .await
                        .unwrap();
                    send_reminder(&store, "Alice", &CourseRef::Id(1)).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let alice = find_enrollment(&store, "Alice", 1).await.unwrap().unwrap();
        assert_eq!(alice.progress, 80);
        assert_eq!(alice.reminders.len(), 4);
    }

    #[tokio::test]
    async fn enroll_grade_and_complete() {
        let (_dir, store) = seeded().await;
        let enrollment = enroll(&store, "Alice", 1).await.unwrap();
        assert_eq!(enrollment.progress, 0);

        advance_to(&store, "Alice", 1, 3).await;
        let enrollment = find_enrollment(&store, "Alice", 1).await.unwrap().unwrap();
        assert_eq!(enrollment.progress, 60);

        assign_grade(&store, "Alice", 1, "B").await.unwrap();
        assert!(!certificate_eligibility(&store, "Alice", 1).await.unwrap());

        advance_to(&store, "Alice", 1, 2).await;
        let enrollment = find_enrollment(&store, "Alice", 1).await.unwrap().unwrap();
        assert_eq!(enrollment.progress, 100);
        assert_eq!(enrollment.grade.as_deref(), Some("B"));
        assert!(certificate_eligibility(&store, "Alice", 1).await.unwrap());
        assert!(!certificate_eligibility(&store, "Bob", 1).await.unwrap());
    }
}
