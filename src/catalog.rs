use std::collections::HashMap;

use chrono::{Local, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use serde::Serialize;

use crate::io::{RecordStore, Resource};
use crate::models::{Course, CourseId};
use crate::Error;

lazy_static! {
    static ref COURSE_DEADLINES: HashMap<CourseId, (i32, u32, u32)> = HashMap::from([
        (1, (2025, 3, 5)),
        (2, (2025, 3, 6)),
        (3, (2025, 3, 7)),
        (4, (2025, 3, 8)),
    ]);
}

fn reference_courses() -> Vec<Course> {
    let course = |course_id, title: &str, description: &str, instructor: &str, photo: &str| Course {
        course_id,
        title: title.to_string(),
        description: description.to_string(),
        instructor: instructor.to_string(),
        photo_reference: photo.to_string(),
    };
    vec![
        course(1, "Python Programming", "Learn Python from scratch.", "John Doe", "python.jpg"),
        course(2, "Data Science", "Learn data analysis and visualization.", "Jane Smith", "data_science.jpg"),
        course(3, "Java", "Learn Java programming.", "Alice Brown", "java.jpg"),
        course(
            4,
            "Full Stack Development",
            "Master front-end and back-end development.",
            "Bob Green",
            "fullstack.jpg",
        ),
    ]
}

/// Populates the course resource with the reference set when it is empty.
/// Returns whether anything was written.
pub async fn seed_if_absent(store: &RecordStore) -> Result<bool, Error> {
    let _guard = store.lock().await;
    let existing: Vec<Course> = store.load(Resource::Courses).await?;
    if !existing.is_empty() {
        return Ok(false);
    }
    let courses = reference_courses();
    store.save(Resource::Courses, &courses).await?;
    log::info!("Seeded course catalog with {} courses", courses.len());
    Ok(true)
}

pub fn deadline_for(course_id: CourseId) -> Option<NaiveDate> {
    COURSE_DEADLINES
        .get(&course_id)
        .and_then(|&(year, month, day)| NaiveDate::from_ymd_opt(year, month, day))
}

pub fn remaining_days(course_id: CourseId) -> Option<i64> {
    remaining_days_at(course_id, Local::now().naive_local())
}

/// Whole days left until the deadline starts, never negative.
pub fn remaining_days_at(course_id: CourseId, now: NaiveDateTime) -> Option<i64> {
    let deadline = deadline_for(course_id)?.and_hms_opt(0, 0, 0)?;
    Some((deadline - now).num_days().max(0))
}

pub async fn list_courses(store: &RecordStore) -> Result<Vec<Course>, Error> {
    store.load(Resource::Courses).await
}

pub async fn find_course(store: &RecordStore, course_id: CourseId) -> Result<Course, Error> {
    list_courses(store)
        .await?
        .into_iter()
        .find(|course| course.course_id == course_id)
        .ok_or_else(|| Error::not_found(format!("Course with id `{}` does not exist!", course_id)))
}

pub async fn find_course_by_title(store: &RecordStore, title: &str) -> Result<Course, Error> {
    list_courses(store)
        .await?
        .into_iter()
        .find(|course| course.title == title)
        .ok_or_else(|| Error::not_found(format!("Course titled `{}` does not exist!", title)))
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseListing {
    #[serde(flatten)]
    pub course: Course,
    pub deadline: Option<NaiveDate>,
    pub remaining_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub courses: Vec<CourseListing>,
}

pub async fn browse(store: &RecordStore, now: NaiveDateTime) -> Result<Catalog, Error> {
    let courses = list_courses(store)
        .await?
        .into_iter()
        .map(|course| CourseListing {
            deadline: deadline_for(course.course_id),
            remaining_days: remaining_days_at(course.course_id, now),
            course,
        })
        .collect();
    Ok(Catalog { courses })
}
