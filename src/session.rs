//! Prediction wizard state as plain data.
//!
//! The client owns an [`AppState`] and every interaction is an [`Event`];
//! [`apply`] returns the next state without touching anything else.

use serde::{Deserialize, Serialize};

use crate::features::{
    RawStudentInput, SessionContext, ASSIGNMENTS_COMPLETED, ATTENDANCE_PERCENT, CURRENT_GPA,
    LECTURE_ENGAGEMENT, MIDTERM, STUDY_HOURS_PER_WEEK,
};
use crate::model::{CGPA_MAX, CGPA_MIN};
use crate::recommendation::{CourseSummary, StudentSummary};

// The wizard does not ask for these yet.
const DEFAULT_ASSIGNMENTS_COMPLETED: f64 = 85.0;
const DEFAULT_MIDTERM_SCORE: f64 = 75.0;
const DEFAULT_LECTURE_ENGAGEMENT: f64 = 80.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPage {
    #[default]
    PreviousSemester,
    CurrentSemester,
    Results,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    #[default]
    Visual,
    Auditory,
    Kinesthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousCourse {
    pub course_id: String,
    pub grade: Option<f64>,
    pub study_hours: Option<f64>,
    pub attendance: Option<f64>,
    #[serde(default)]
    pub learning_style: LearningStyle,
    pub course_units: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentCourse {
    pub course_id: String,
    pub course_units: u8,
    #[serde(default)]
    pub learning_style: LearningStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub id: String,
    pub current_cgpa: f64,
    pub last_semester_gpa: Option<f64>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Tolu John".to_string(),
            id: "1".to_string(),
            current_cgpa: 3.4,
            last_semester_gpa: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub page: WizardPage,
    #[serde(default)]
    pub previous_courses: Vec<PreviousCourse>,
    #[serde(default)]
    pub current_courses: Vec<CurrentCourse>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SubmitPreviousSemester {
        courses: Vec<PreviousCourse>,
        semester_gpa: Option<f64>,
        current_cgpa: Option<f64>,
    },
    SubmitCurrentSemester {
        courses: Vec<CurrentCourse>,
    },
    Back,
    StartOver,
    UpdateCgpa {
        cgpa: f64,
    },
}

pub fn apply(state: AppState, event: Event) -> AppState {
    let mut next = AppState {
        errors: Vec::new(),
        ..state
    };

    match event {
        Event::SubmitPreviousSemester { .. } if next.page != WizardPage::PreviousSemester => {
            next.errors
                .push("Go back to the previous semester page to change it".to_string());
        }
        Event::SubmitPreviousSemester {
            courses,
            semester_gpa,
            current_cgpa,
        } => {
            let mut errors = validate_previous(&courses);
            let semester_gpa = require_gpa(semester_gpa, "Last semester GPA", &mut errors);
            let current_cgpa = require_gpa(current_cgpa, "Current CGPA", &mut errors);

            match (semester_gpa, current_cgpa) {
                (Some(semester_gpa), Some(current_cgpa)) if errors.is_empty() => {
                    next.profile.last_semester_gpa = Some(semester_gpa);
                    next.profile.current_cgpa = current_cgpa;
                    next.previous_courses = courses;
                    next.page = WizardPage::CurrentSemester;
                }
                _ => next.errors = errors,
            }
        }
        Event::SubmitCurrentSemester { courses } => {
            if next.page != WizardPage::CurrentSemester {
                next.errors.push("Previous semester details must be submitted first".to_string());
            } else if courses.is_empty() || courses.iter().any(|c| c.course_id.trim().is_empty()) {
                next.errors.push("Please fill in all fields before proceeding".to_string());
            } else {
                next.current_courses = courses;
                next.page = WizardPage::Results;
            }
        }
        Event::Back => {
            next.page = match next.page {
                WizardPage::Results => WizardPage::CurrentSemester,
                _ => WizardPage::PreviousSemester,
            };
        }
        Event::StartOver => {
            next.page = WizardPage::PreviousSemester;
            next.previous_courses.clear();
            next.current_courses.clear();
        }
        Event::UpdateCgpa { cgpa } => {
            if (CGPA_MIN..=CGPA_MAX).contains(&cgpa) {
                next.profile.current_cgpa = cgpa;
            } else {
                next.errors.push(format!("CGPA must be between {:.2} and {:.2}", CGPA_MIN, CGPA_MAX));
            }
        }
    }

    next
}

fn validate_previous(courses: &[PreviousCourse]) -> Vec<String> {
    let mut errors = Vec::new();
    if courses.is_empty() {
        errors.push("At least one previous course is required".to_string());
    }
    for course in courses {
        if course.course_id.trim().is_empty() {
            errors.push("Course code cannot be empty".to_string());
        }
        if course.grade.is_none() || course.study_hours.is_none() || course.attendance.is_none() {
            errors.push("Please fill in all fields before proceeding".to_string());
        }
        if course.grade.map_or(false, |g| !(0.0..=100.0).contains(&g)) {
            errors.push(format!("{}: grade must be between 0 and 100", course.course_id));
        }
    }
    errors.dedup();
    errors
}

fn require_gpa(value: Option<f64>, label: &str, errors: &mut Vec<String>) -> Option<f64> {
    match value {
        Some(gpa) if (CGPA_MIN..=CGPA_MAX).contains(&gpa) => Some(gpa),
        Some(_) => {
            errors.push(format!("{} must be between {:.2} and {:.2}", label, CGPA_MIN, CGPA_MAX));
            None
        }
        None => {
            errors.push(format!("{} is required", label));
            None
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl AppState {
    /// Form values for the results page. Attendance and study hours are
    /// averaged over previous-semester courses.
    pub fn raw_input(&self) -> RawStudentInput {
        let attendance = mean(self.previous_courses.iter().map(|c| c.attendance.unwrap_or(0.0)));
        let study_hours = mean(self.previous_courses.iter().map(|c| c.study_hours.unwrap_or(0.0)));

        RawStudentInput::new()
            .with(CURRENT_GPA, self.profile.current_cgpa)
            .with(ASSIGNMENTS_COMPLETED, DEFAULT_ASSIGNMENTS_COMPLETED)
            .with(MIDTERM, DEFAULT_MIDTERM_SCORE)
            .with(LECTURE_ENGAGEMENT, DEFAULT_LECTURE_ENGAGEMENT)
            .with(ATTENDANCE_PERCENT, attendance)
            .with(STUDY_HOURS_PER_WEEK, study_hours)
    }

    pub fn context(&self) -> SessionContext {
        SessionContext {
            last_semester_gpa: self.profile.last_semester_gpa,
            current_cgpa: Some(self.profile.current_cgpa),
        }
    }

    pub fn summary(&self) -> StudentSummary {
        StudentSummary {
            name: self.profile.name.clone(),
            id: self.profile.id.clone(),
            current_cgpa: self.profile.current_cgpa,
            courses: self
                .current_courses
                .iter()
                .map(|c| CourseSummary {
                    course_id: c.course_id.clone(),
                    course_units: c.course_units,
                })
                .collect(),
        }
    }
}
