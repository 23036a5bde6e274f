use super::Command;
use crate::domain::{Course, Exercise, Review};
use crate::error::{CoreError, CoreResult};
use crate::service::ExerciseService;
use crate::updates::ExerciseUpdateDetector;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// New and changed exercises of a course since the last detection pass
pub struct GetExerciseUpdates {
    course: Course,
    detector: ExerciseUpdateDetector,
}

impl GetExerciseUpdates {
    pub fn new(course: Course, detector: ExerciseUpdateDetector) -> Self {
        Self { course, detector }
    }
}

#[async_trait]
impl Command for GetExerciseUpdates {
    type Output = Vec<Exercise>;

    fn name(&self) -> &'static str {
        "get_new_and_updated_exercises"
    }

    fn validate(&self) -> CoreResult<()> {
        self.course.require_id().map(|_| ())
    }

    async fn execute(self) -> CoreResult<Vec<Exercise>> {
        self.detector.detect(&self.course).await
    }
}

/// Reviews of a course the user has not read yet
pub struct GetUnreadReviews {
    course: Course,
    service: Arc<dyn ExerciseService>,
}

impl GetUnreadReviews {
    pub fn new(course: Course, service: Arc<dyn ExerciseService>) -> Self {
        Self { course, service }
    }
}

#[async_trait]
impl Command for GetUnreadReviews {
    type Output = Vec<Review>;

    fn name(&self) -> &'static str {
        "get_new_reviews"
    }

    fn validate(&self) -> CoreResult<()> {
        self.course.require_id().map(|_| ())
    }

    async fn execute(self) -> CoreResult<Vec<Review>> {
        let reviews = self
            .service
            .list_reviews(&self.course)
            .await
            .map_err(CoreError::Transport)?;
        let total = reviews.len();

        let unread: Vec<Review> = reviews.into_iter().filter(|r| !r.marked_as_read).collect();
        debug!(
            "Course {}: {} of {} reviews unread",
            self.course.name,
            unread.len(),
            total
        );
        Ok(unread)
    }
}
