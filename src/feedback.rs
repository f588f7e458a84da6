//! Canned interpretation of a forecast.

use serde::{Deserialize, Serialize};

use crate::features::{
    AliasTable, RawStudentInput, ATTENDANCE, CREDIT_LOAD, ENGAGEMENT, MIDTERM_SCORE, STUDY_HOURS,
};
use crate::model::PredictionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    FirstClass,
    GoodStanding,
    NeedsImprovement,
}

impl Standing {
    pub fn from_cgpa(cgpa: f64) -> Self {
        if cgpa >= 4.0 {
            Standing::FirstClass
        } else if cgpa >= 3.0 {
            Standing::GoodStanding
        } else {
            Standing::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Standing::FirstClass => "First Class Performance!",
            Standing::GoodStanding => "Good Standing - Keep Improving!",
            Standing::NeedsImprovement => "Needs Improvement - Review Recommendations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub headline: String,
    pub tips: Vec<String>,
}

pub fn headline_for(predicted_cgpa: f64) -> &'static str {
    if predicted_cgpa >= 3.7 {
        "Excellent progress! You're on track for top honours."
    } else if predicted_cgpa >= 3.0 {
        "Solid performance, keep up the consistency!"
    } else if predicted_cgpa >= 2.5 {
        "Moderate zone: consider boosting study hours and engagement."
    } else {
        "At-risk range. Let's build a stronger study plan."
    }
}

/// Tips are keyed on what the student entered, not on the mapped vector,
/// so features the model was not trained on still get advice. Each field is
/// read under any name `aliases` knows for it; a field left out counts as 0.
pub fn generate_feedback(prediction: &PredictionResult, input: &RawStudentInput, aliases: &AliasTable) -> Feedback {
    let value = |canonical: &str| aliases.number(input, canonical).unwrap_or(0.0);
    let mut tips = Vec::new();

    if value(ATTENDANCE) < 70.0 {
        tips.push("Attendance Boost: Try to attend at least 85% of classes. Regular attendance correlates with better grades.".to_string());
    }
    if value(STUDY_HOURS) < 15.0 {
        tips.push("Study Time: Aim for 15-20 hours/week of focused study. Quality matters more than quantity!".to_string());
    }
    if value(CREDIT_LOAD) < 80.0 {
        tips.push("Assignments: Complete all assignments on time. They're crucial for reinforcing concepts.".to_string());
    }
    if value(MIDTERM_SCORE) < 60.0 {
        tips.push("Midterm Prep: Review midterm mistakes. Focus on weak areas before finals.".to_string());
    }
    if value(ENGAGEMENT) < 70.0 {
        tips.push("Engagement: Actively participate in lectures. Ask questions and join discussions.".to_string());
    }
    if tips.is_empty() {
        tips.push("Maintain Momentum: Your current habits are working well. Keep refining your approach!".to_string());
    }

    Feedback {
        headline: headline_for(prediction.predicted_cgpa).to_string(),
        tips,
    }
}

/// Letter grade for a percentage course mark.
pub fn grade_to_letter(grade: f64) -> char {
    match grade {
        g if g >= 70.0 => 'A',
        g if g >= 60.0 => 'B',
        g if g >= 50.0 => 'C',
        g if g >= 45.0 => 'D',
        g if g >= 40.0 => 'E',
        _ => 'F',
    }
}

pub fn grade_points(letter: char) -> u8 {
    match letter {
        'A' => 5,
        'B' => 4,
        'C' => 3,
        'D' => 2,
        'E' => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{
        ASSIGNMENTS_COMPLETED, ATTENDANCE_PERCENT, CURRENT_CGPA, LECTURE_ENGAGEMENT, MIDTERM,
        STUDY_HOURS_PER_WEEK,
    };
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn feedback_for(cgpa: f64, input: &RawStudentInput) -> Feedback {
        generate_feedback(&PredictionResult { predicted_cgpa: cgpa }, input, &AliasTable::standard())
    }

    #[test_case(4.3, Standing::FirstClass)]
    #[test_case(4.0, Standing::FirstClass)]
    #[test_case(3.0, Standing::GoodStanding)]
    #[test_case(2.99, Standing::NeedsImprovement)]
    fn standing_thresholds(cgpa: f64, expected: Standing) {
        assert_eq!(Standing::from_cgpa(cgpa), expected);
    }

    #[test_case(70.0, 'A')]
    #[test_case(69.9, 'B')]
    #[test_case(50.0, 'C')]
    #[test_case(45.0, 'D')]
    #[test_case(40.0, 'E')]
    #[test_case(12.0, 'F')]
    fn letter_grades(mark: f64, letter: char) {
        assert_eq!(grade_to_letter(mark), letter);
    }

    #[test]
    fn strong_input_gets_the_momentum_tip() {
        let input = RawStudentInput::new()
            .with(ATTENDANCE_PERCENT, 90.0)
            .with(STUDY_HOURS_PER_WEEK, 18.0)
            .with(ASSIGNMENTS_COMPLETED, 95.0)
            .with(MIDTERM, 80.0)
            .with(LECTURE_ENGAGEMENT, 85.0);
        let feedback = feedback_for(3.8, &input);

        assert_eq!(feedback.headline, headline_for(3.8));
        assert_eq!(feedback.tips.len(), 1);
        assert!(feedback.tips[0].starts_with("Maintain Momentum"));
    }

    #[test]
    fn each_weak_area_adds_a_tip() {
        let input = RawStudentInput::new()
            .with(ATTENDANCE_PERCENT, 60.0)
            .with(STUDY_HOURS_PER_WEEK, 10.0)
            .with(ASSIGNMENTS_COMPLETED, 85.0)
            .with(MIDTERM, 75.0)
            .with(LECTURE_ENGAGEMENT, 80.0);
        let feedback = feedback_for(2.6, &input);

        assert_eq!(feedback.tips.len(), 2);
        assert!(feedback.tips[0].starts_with("Attendance"));
        assert!(feedback.tips[1].starts_with("Study Time"));
        assert!(feedback.headline.starts_with("Moderate"));
    }

    #[test]
    fn empty_input_flags_everything() {
        let feedback = feedback_for(1.0, &RawStudentInput::new());
        assert_eq!(feedback.tips.len(), 5);
        assert_eq!(grade_points(grade_to_letter(55.0)), 3);
    }

    #[test]
    fn canonical_names_count_like_form_labels() {
        let input = RawStudentInput::new()
            .with(CURRENT_CGPA, 3.4)
            .with(ATTENDANCE, 95.0)
            .with(STUDY_HOURS, 20.0)
            .with(CREDIT_LOAD, 90.0)
            .with(MIDTERM_SCORE, 85.0)
            .with(ENGAGEMENT, 90.0);
        let feedback = feedback_for(3.6, &input);

        assert_eq!(feedback.tips.len(), 1);
        assert!(feedback.tips[0].starts_with("Maintain Momentum"));
    }
}
