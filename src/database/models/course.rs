use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;
use crate::types::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Beginner,
    Intermediate,
    Advanced,
}

impl Skill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::Beginner => "beginner",
            Skill::Intermediate => "intermediate",
            Skill::Advanced => "advanced",
        }
    }
}

impl FromStr for Skill {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Skill::Beginner),
            "intermediate" => Ok(Skill::Intermediate),
            "advanced" => Ok(Skill::Advanced),
            other => Err(UnknownVariant::new("skill", other)),
        }
    }
}

impl TryFrom<String> for Skill {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A course belongs to a bootcamp; who may change it is decided by that
/// bootcamp's owner, `user_id` only records who created it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub weeks: i32,
    pub tuition: i32,
    #[sqlx(try_from = "String")]
    pub minimum_skill: Skill,
    pub scholarship_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weeks: i32,
    #[serde(default)]
    pub tuition: i32,
    pub minimum_skill: Option<Skill>,
    #[serde(default)]
    pub scholarship_available: bool,
}

impl NewCourse {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        check_title(&mut errors, &self.title);
        if self.description.trim().is_empty() {
            errors.add("description", "Please add a description");
        }
        check_weeks(&mut errors, self.weeks);
        check_tuition(&mut errors, self.tuition);
        if self.minimum_skill.is_none() {
            errors.add("minimum_skill", "Please add a minimum skill");
        }
        errors.into_result()
    }

    /// Requires a validated payload
    pub fn into_course(self, id: Uuid, bootcamp_id: Uuid, user_id: Uuid, created_at: DateTime<Utc>) -> Course {
        Course {
            id,
            bootcamp_id,
            user_id: Some(user_id),
            title: self.title.trim().to_string(),
            description: self.description,
            weeks: self.weeks,
            tuition: self.tuition,
            minimum_skill: self.minimum_skill.unwrap_or(Skill::Beginner),
            scholarship_available: self.scholarship_available,
            created_at,
        }
    }
}

/// Update payload; the parent bootcamp cannot be changed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<i32>,
    pub tuition: Option<i32>,
    pub minimum_skill: Option<Skill>,
    pub scholarship_available: Option<bool>,
}

impl CoursePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        if self.description.as_ref().is_some_and(|d| d.trim().is_empty()) {
            errors.add("description", "Please add a description");
        }
        if let Some(weeks) = self.weeks {
            check_weeks(&mut errors, weeks);
        }
        if let Some(tuition) = self.tuition {
            check_tuition(&mut errors, tuition);
        }
        errors.into_result()
    }

    pub fn apply(self, course: &mut Course) {
        if let Some(v) = self.title {
            course.title = v.trim().to_string();
        }
        if let Some(v) = self.description {
            course.description = v;
        }
        if let Some(v) = self.weeks {
            course.weeks = v;
        }
        if let Some(v) = self.tuition {
            course.tuition = v;
        }
        if let Some(v) = self.minimum_skill {
            course.minimum_skill = v;
        }
        if let Some(v) = self.scholarship_available {
            course.scholarship_available = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseFilter {
    pub bootcamp_id: Option<Uuid>,
    pub minimum_skill: Option<Skill>,
    pub scholarship_available: Option<bool>,
}

impl CourseFilter {
    pub fn matches(&self, course: &Course) -> bool {
        self.bootcamp_id.map_or(true, |v| course.bootcamp_id == v)
            && self.minimum_skill.map_or(true, |v| course.minimum_skill == v)
            && self.scholarship_available.map_or(true, |v| course.scholarship_available == v)
    }
}

/// Mean tuition rounded up to the next multiple of ten
pub fn average_cost(tuitions: &[i32]) -> Option<i32> {
    if tuitions.is_empty() {
        return None;
    }
    let total: i64 = tuitions.iter().map(|&t| i64::from(t)).sum();
    let mean = total as f64 / tuitions.len() as f64;
    Some(((mean / 10.0).ceil() * 10.0) as i32)
}

fn check_title(errors: &mut ValidationError, title: &str) {
    if title.trim().is_empty() {
        errors.add("title", "Please add a course title");
    }
}

fn check_weeks(errors: &mut ValidationError, weeks: i32) {
    if weeks <= 0 {
        errors.add("weeks", "Please add number of weeks");
    }
}

fn check_tuition(errors: &mut ValidationError, tuition: i32) {
    if tuition < 0 {
        errors.add("tuition", "Please add a tuition cost");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_cost_rounds_up_to_tens() {
        assert_eq!(average_cost(&[]), None);
        assert_eq!(average_cost(&[10000]), Some(10000));
        assert_eq!(average_cost(&[8000, 8001]), Some(8010));
        assert_eq!(average_cost(&[12000, 13000]), Some(12500));
    }

    #[test]
    fn new_course_requires_core_fields() {
        let err = serde_json::from_value::<NewCourse>(serde_json::json!({}))
            .unwrap()
            .validate()
            .unwrap_err();
        for field in ["title", "description", "weeks", "minimum_skill"] {
            assert!(err.field_errors.contains_key(field), "missing error for {}", field);
        }
    }

    #[test]
    fn skill_uses_lowercase_names() {
        let course: NewCourse = serde_json::from_value(serde_json::json!({
            "title": "Front End Web Development",
            "description": "HTML, CSS and JavaScript",
            "weeks": 8,
            "tuition": 8000,
            "minimum_skill": "beginner"
        }))
        .unwrap();
        assert!(course.validate().is_ok());
        assert_eq!(course.minimum_skill, Some(Skill::Beginner));
        assert!("expert".parse::<Skill>().is_err());
    }
}
