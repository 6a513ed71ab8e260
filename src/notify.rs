use serde::Serialize;

use crate::io::{RecordStore, Resource};
use crate::models::Enrollment;
use crate::Error;

pub fn reminder_text(course_title: &str) -> String {
    format!("Reminder to complete {}!", course_title)
}

pub fn append_reminder(enrollment: &mut Enrollment, course_title: &str) -> String {
    let reminder = reminder_text(course_title);
    enrollment.reminders.push(reminder.clone());
    reminder
}

#[derive(Debug, Clone, Serialize)]
pub struct Notifications {
    pub student_name: String,
    pub reminders: Vec<String>,
}

/// Every reminder across the student's enrollments, in storage order.
pub async fn notifications_for(store: &RecordStore, student_name: &str) -> Result<Notifications, Error> {
    let enrollments: Vec<Enrollment> = store.load(Resource::Enrollments).await?;
    let mut enrolled = false;
    let mut reminders = Vec::new();
    for enrollment in enrollments.into_iter().filter(|e| e.student_name == student_name) {
        enrolled = true;
        reminders.extend(enrollment.reminders);
    }
    if !enrolled {
        return Err(Error::not_found(format!("Student `{}` not found.", student_name)));
    }
    Ok(Notifications {
        student_name: student_name.to_string(),
        reminders,
    })
}
