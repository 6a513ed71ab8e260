use serde::Serialize;

use crate::catalog;
use crate::io::{RecordStore, Resource};
use crate::models::{CourseId, Enrollment, Feedback};
use crate::Error;

const UNKNOWN_COURSE: &str = "Unknown Course";

/// Records feedback once per enrolled `(student, course)` pair.
pub async fn submit(
    store: &RecordStore,
    student_name: &str,
    course_id: CourseId,
    text: &str,
) -> Result<Feedback, Error> {
    let enrollments: Vec<Enrollment> = store.load(Resource::Enrollments).await?;
    if !enrollments.iter().any(|e| e.is_for(student_name, course_id)) {
        return Err(Error::precondition(format!(
            "`{}` is not enrolled in course `{}`.",
            student_name, course_id
        )));
    }

    let _guard = store.lock().await;
    let mut entries: Vec<Feedback> = store.load(Resource::Feedback).await?;
    if entries.iter().any(|f| f.is_for(student_name, course_id)) {
        log::warn!("Duplicate feedback from `{}` for course {}", student_name, course_id);
        return Err(Error::conflict(
            "You have already submitted feedback for this course.",
        ));
    }

    let entry = Feedback {
        student_name: student_name.to_string(),
        course_id,
        feedback: text.to_string(),
    };
    entries.push(entry.clone());
    store.save(Resource::Feedback, &entries).await?;
    log::info!("Feedback received from `{}` for course {}", student_name, course_id);
    Ok(entry)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackReview {
    #[serde(flatten)]
    pub entry: Feedback,
    pub course_title: String,
}

pub async fn list_all(store: &RecordStore) -> Result<Vec<FeedbackReview>, Error> {
    let courses = catalog::list_courses(store).await?;
    let entries: Vec<Feedback> = store.load(Resource::Feedback).await?;
    Ok(entries
        .into_iter()
        .map(|entry| FeedbackReview {
            course_title: courses
                .iter()
                .find(|c| c.course_id == entry.course_id)
                .map_or_else(|| UNKNOWN_COURSE.to_string(), |c| c.title.clone()),
            entry,
        })
        .collect())
}
