//! Personalised study advice behind a swappable provider.
//!
//! A generative backend plugs in through [`RecommendationProvider`]. The
//! crate ships only [`CannedRecommendations`], and [`recommend`] guarantees a
//! caller always gets text back.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const APOLOGY: &str =
    "Sorry, personalised recommendations could not be generated right now. Please try again later.";

#[derive(Error, Debug)]
pub enum RecommendationError {
    #[error("recommendation provider failed: {0}")]
    Provider(String),
}

pub trait RecommendationProvider: Send + Sync {
    fn generate(&self, profile_summary: &str) -> Result<String, RecommendationError>;
}

/// Static advice that does not depend on the profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedRecommendations;

impl RecommendationProvider for CannedRecommendations {
    fn generate(&self, _profile_summary: &str) -> Result<String, RecommendationError> {
        Ok([
            "## Study Habits",
            "- Block 15-20 focused hours per week and review notes within 24 hours of each lecture.",
            "## Attendance",
            "- Aim for at least 85% attendance; prepare materials the night before.",
            "## Course Load",
            "- Tackle high-unit courses first and spread revision across the week.",
            "## Resources",
            "- Work through past papers and join a study group for difficult subjects.",
        ]
        .join("\n"))
    }
}

/// Never fails: provider errors become [`APOLOGY`].
pub fn recommend(provider: &dyn RecommendationProvider, summary: &StudentSummary) -> String {
    match provider.generate(&summary.prompt()) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("Recommendation provider returned an empty response");
            APOLOGY.to_string()
        }
        Err(e) => {
            warn!("Could not generate recommendations: {}", e);
            APOLOGY.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub course_id: String,
    pub course_units: u8,
}

/// Profile text handed to a recommendation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub name: String,
    pub id: String,
    pub current_cgpa: f64,
    #[serde(default)]
    pub courses: Vec<CourseSummary>,
}

impl StudentSummary {
    pub fn prompt(&self) -> String {
        format!(
            "Here's the student's academic profile:\n\n{}\n\n\
             Generate specific, actionable academic recommendations to help this student improve their CGPA and academic performance.\n\
             Focus on:\n\
             - Study habits optimization\n\
             - Attendance improvement strategies\n\
             - Learning style adaptation\n\
             - Course difficulty management\n\
             - Time allocation suggestions\n\
             - Resource recommendations (books, online resources)\n\n\
             Structure your response with clear headings and bullet points. Be practical and encouraging.",
            self
        )
    }
}

impl fmt::Display for StudentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Student Name: {}", self.name)?;
        writeln!(f, "Student ID: {}", self.id)?;
        writeln!(f, "Current CGPA: {}", self.current_cgpa)?;
        writeln!(f, "Current Courses:")?;
        if self.courses.is_empty() {
            writeln!(f, "No current courses.")
        } else {
            for course in &self.courses {
                writeln!(f, "{} ({} units)", course.course_id, course.course_units)?;
            }
            Ok(())
        }
    }
}
