use super::cache::{Checksums, UpdateCache};
use crate::domain::{Course, Exercise};
use crate::error::CoreResult;
use tracing::{debug, info};

/// Exercises of `course` that are new or changed relative to `previous`, in
/// course order.
pub fn changed_exercises(previous: &Checksums, course: &Course) -> Vec<Exercise> {
    course
        .exercises
        .iter()
        .filter(|exercise| previous.get(&exercise.name) != Some(&exercise.checksum))
        .cloned()
        .collect()
}

/// Compares server checksums against the persisted cache
#[derive(Debug, Clone)]
pub struct ExerciseUpdateDetector {
    cache: UpdateCache,
}

impl ExerciseUpdateDetector {
    pub fn new(cache: UpdateCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &UpdateCache {
        &self.cache
    }

    /// Report new and updated exercises, then remember the current checksums.
    ///
    /// The cache is written only after the report is computed; if the write
    /// never happens the same exercises are reported again next time.
    pub async fn detect(&self, course: &Course) -> CoreResult<Vec<Exercise>> {
        let course_id = course.require_id()?;

        // Compare and remember under one cache lock
        let changed = self
            .cache
            .update_course(course_id, |stored| {
                let changed = changed_exercises(stored, course);
                for exercise in &changed {
                    let kind = if stored.contains_key(&exercise.name) {
                        "updated"
                    } else {
                        "new"
                    };
                    debug!("Exercise {} in course {} is {}", exercise.name, course_id, kind);
                }
                *stored = course.checksums();
                changed
            })
            .await?;

        info!(
            "Course {}: {} of {} exercises new or updated",
            course_id,
            changed.len(),
            course.exercises.len()
        );
        Ok(changed)
    }
}
