use super::{Command, require_login};
use crate::domain::{Course, Exercise};
use crate::error::{CoreError, CoreResult, require_non_empty, require_path};
use crate::locator::find_course;
use crate::service::ExerciseService;
use crate::session::SharedSession;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Courses visible to the current user on the selected server
pub struct ListCourses {
    service: Arc<dyn ExerciseService>,
}

impl ListCourses {
    pub fn new(service: Arc<dyn ExerciseService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Command for ListCourses {
    type Output = Vec<Course>;

    fn name(&self) -> &'static str {
        "list_courses"
    }

    async fn execute(self) -> CoreResult<Vec<Course>> {
        let courses = self.service.list_courses().await.map_err(CoreError::Transport)?;
        debug!("Server returned {} courses", courses.len());
        Ok(courses)
    }
}

/// Exercises of the course a local path belongs to
pub struct ListExercises {
    path: PathBuf,
    service: Arc<dyn ExerciseService>,
}

impl ListExercises {
    pub fn new(path: impl Into<PathBuf>, service: Arc<dyn ExerciseService>) -> Self {
        Self {
            path: path.into(),
            service,
        }
    }
}

#[async_trait]
impl Command for ListExercises {
    type Output = Vec<Exercise>;

    fn name(&self) -> &'static str {
        "list_exercises"
    }

    fn validate(&self) -> CoreResult<()> {
        require_path("path", &self.path)
    }

    async fn execute(self) -> CoreResult<Vec<Exercise>> {
        let courses = self.service.list_courses().await.map_err(CoreError::Transport)?;
        let course = find_course(&self.path, &courses).ok_or_else(|| {
            CoreError::NotFound(format!("no course found at {}", self.path.display()))
        })?;
        let course_id = course.require_id()?;

        let course = self
            .service
            .get_course(course_id)
            .await
            .map_err(CoreError::Transport)?;
        Ok(course.exercises)
    }
}

/// Full course behind a details URL; needs a logged-in user
pub struct GetCourse {
    details_url: String,
    service: Arc<dyn ExerciseService>,
    session: SharedSession,
}

impl GetCourse {
    pub fn new(details_url: impl Into<String>, service: Arc<dyn ExerciseService>, session: SharedSession) -> Self {
        Self {
            details_url: details_url.into(),
            service,
            session,
        }
    }
}

#[async_trait]
impl Command for GetCourse {
    type Output = Course;

    fn name(&self) -> &'static str {
        "get_course"
    }

    fn validate(&self) -> CoreResult<()> {
        require_non_empty(&[("url", self.details_url.as_str())])?;
        parse_details_url(&self.details_url).map(|_| ())
    }

    async fn execute(self) -> CoreResult<Course> {
        require_login(&self.session).await?;
        let url = parse_details_url(&self.details_url)?;
        fetch_details(self.service.as_ref(), &url).await
    }
}

/// Full course with the given name; needs a logged-in user
pub struct GetCourseByName {
    name: String,
    service: Arc<dyn ExerciseService>,
    session: SharedSession,
}

impl GetCourseByName {
    pub fn new(name: impl Into<String>, service: Arc<dyn ExerciseService>, session: SharedSession) -> Self {
        Self {
            name: name.into(),
            service,
            session,
        }
    }
}

#[async_trait]
impl Command for GetCourseByName {
    type Output = Course;

    fn name(&self) -> &'static str {
        "get_course_by_name"
    }

    fn validate(&self) -> CoreResult<()> {
        require_non_empty(&[("name", self.name.as_str())])
    }

    async fn execute(self) -> CoreResult<Course> {
        require_login(&self.session).await?;
        let courses = self.service.list_courses().await.map_err(CoreError::Transport)?;
        let summary = courses
            .into_iter()
            .find(|course| course.name == self.name)
            .ok_or_else(|| CoreError::NotFound(format!("no course named '{}'", self.name)))?;

        match summary.details_url.as_deref() {
            Some(details_url) => fetch_details(self.service.as_ref(), &parse_details_url(details_url)?).await,
            None => {
                let course_id = summary.require_id()?;
                self.service
                    .get_course(course_id)
                    .await
                    .map_err(CoreError::Transport)
            }
        }
    }
}

fn parse_details_url(raw: &str) -> CoreResult<Url> {
    Url::parse(raw).map_err(|e| CoreError::Validation(format!("invalid course url '{}': {}", raw, e)))
}

async fn fetch_details(service: &dyn ExerciseService, url: &Url) -> CoreResult<Course> {
    let course = service
        .get_course_details(url)
        .await
        .map_err(CoreError::Transport)?;
    debug!(
        "Fetched course {} with {} exercises",
        course.name,
        course.exercises.len()
    );
    Ok(course)
}
