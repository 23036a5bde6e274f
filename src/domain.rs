//! Domain value objects exchanged with the service collaborator.
//!
//! Courses, exercises and reviews carry the fields the core reasons about;
//! test and submission results are opaque payloads passed through untouched.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type CourseId = u64;

/// A named collection of exercises
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub id: Option<CourseId>,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub details_url: Option<String>,
    #[serde(default)]
    pub unlockables: Vec<String>,
}

impl Course {
    pub fn new(id: CourseId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            exercises: Vec::new(),
            details_url: None,
            unlockables: Vec::new(),
        }
    }

    pub fn with_exercises(mut self, exercises: Vec<Exercise>) -> Self {
        self.exercises = exercises;
        self
    }

    /// Identifier of the course, or [`CoreError::Data`] if the service omitted it
    pub fn require_id(&self) -> CoreResult<CourseId> {
        self.id.ok_or_else(|| {
            CoreError::Data(format!("course '{}' has no identifier", self.name))
        })
    }

    /// Current checksum of every exercise, keyed by exercise name
    pub fn checksums(&self) -> BTreeMap<String, String> {
        self.exercises
            .iter()
            .map(|e| (e.name.clone(), e.checksum.clone()))
            .collect()
    }

    /// Exercises grouped by the name prefix before the first `-`, in order of
    /// first appearance
    pub fn themes(&self) -> Vec<Theme> {
        let mut themes: Vec<Theme> = Vec::new();
        for exercise in &self.exercises {
            let name = exercise.theme_name();
            match themes.iter_mut().find(|theme| theme.name == name) {
                Some(theme) => theme.exercises.push(exercise.clone()),
                None => themes.push(Theme {
                    name: name.to_string(),
                    exercises: vec![exercise.clone()],
                }),
            }
        }
        themes
    }
}

/// Exercises sharing a name prefix, e.g. one week of a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub exercises: Vec<Exercise>,
}

impl Theme {
    /// Whether `exercise` belongs to this theme
    pub fn should_contain(&self, exercise: &Exercise) -> bool {
        exercise.theme_name() == self.name
    }

    /// A theme is open once any of its exercises is
    pub fn is_unlocked(&self) -> bool {
        self.exercises.iter().any(|e| !e.locked)
    }
}

/// One programming assignment within a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub checksum: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub zip_url: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl Exercise {
    pub fn new(name: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checksum: checksum.into(),
            locked: false,
            course_name: None,
            deadline: None,
            zip_url: None,
            completed: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Name prefix before the first `-`, or the whole name
    pub fn theme_name(&self) -> &str {
        self.name.split('-').next().unwrap_or(&self.name)
    }
}

/// Code review left on a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub exercise_name: String,
    pub submission_id: u64,
    pub url: String,
    #[serde(default)]
    pub marked_as_read: bool,
}

/// Outcome of a local test run, as produced by the test-execution collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    TestsFailed,
    CompileFailed,
    GenericError,
}

/// Server-side evaluation of a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Raw response of a fire-and-forget request such as feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResult {
    pub status_code: u16,
    pub body: String,
}

impl HttpResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_without_id_is_data_error() {
        let course: Course = serde_json::from_value(serde_json::json!({
            "name": "2013_ohpeJaOhja",
            "exercises": [{"name": "viikko1-Tehtava1", "checksum": "abc"}]
        }))
        .unwrap();

        assert!(course.id.is_none());
        assert!(!course.exercises[0].locked);
        assert!(matches!(course.require_id(), Err(CoreError::Data(_))));
    }

    #[test]
    fn test_checksums_follow_exercises() {
        let course = Course::new(3, "demo").with_exercises(vec![
            Exercise::new("A", "h1"),
            Exercise::new("B", "h2"),
        ]);

        let checksums = course.checksums();
        assert_eq!(checksums.len(), 2);
        assert_eq!(checksums["A"], "h1");
        assert_eq!(checksums["B"], "h2");
    }

    #[test]
    fn test_themes_group_by_name_prefix() {
        let course = Course::new(3, "k2015-ohpe").with_exercises(vec![
            Exercise::new("viikko1-Tehtava1", "h1"),
            Exercise::new("viikko2-Tehtava1", "h2").locked(),
            Exercise::new("viikko1-Tehtava2", "h3"),
            Exercise::new("bonus", "h4"),
        ]);

        let themes = course.themes();
        let names: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["viikko1", "viikko2", "bonus"]);
        assert_eq!(themes[0].exercises.len(), 2);
        assert!(themes[0].is_unlocked());
        assert!(!themes[1].is_unlocked());
        assert!(themes[0].should_contain(&Exercise::new("viikko1-Tehtava9", "x")));
        assert!(!themes[0].should_contain(&Exercise::new("viikko10-Tehtava1", "x")));
    }

    #[test]
    fn test_run_status_serialization() {
        let result = RunResult {
            status: RunStatus::TestsFailed,
            details: serde_json::json!({"failed": 2}),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "tests_failed");
    }
}
