use serde::{Deserialize, Serialize};

pub type CourseId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: CourseId,
    pub title: String,
    pub description: String,
    pub instructor: String,
    #[serde(alias = "photo_url")]
    pub photo_reference: String,
}

/// Links one student to one course. The pair `(student_name, course_id)` is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub student_name: String,
    pub course_id: CourseId,
    pub progress: u32,
    pub grade: Option<String>,
    #[serde(default)]
    pub reminders: Vec<String>,
}

impl Enrollment {
    pub fn new<S: Into<String>>(student_name: S, course_id: CourseId) -> Self {
        Self {
            student_name: student_name.into(),
            course_id,
            progress: 0,
            grade: None,
            reminders: Vec::new(),
        }
    }

    pub fn is_for(&self, student_name: &str, course_id: CourseId) -> bool {
        self.student_name == student_name && self.course_id == course_id
    }

    pub fn is_completed(&self) -> bool {
        self.progress >= 100
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub student_name: String,
    pub course_id: CourseId,
    pub feedback: String,
}

impl Feedback {
    pub fn is_for(&self, student_name: &str, course_id: CourseId) -> bool {
        self.student_name == student_name && self.course_id == course_id
    }
}
