#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tmc_core::{
    Collaborators, CoreConfig, Course, CourseId, CrashReport, Exercise, ExerciseService,
    HttpResult, Review, RunResult, RunStatus, SubmissionResult, TestRunner, TmcCore, WorkerPool,
};
use url::Url;

/// In-memory service recording every call it receives
#[derive(Default)]
pub struct MockService {
    pub courses: Mutex<Vec<Course>>,
    pub archives: Mutex<HashMap<String, Vec<u8>>>,
    pub reviews: Mutex<Vec<Review>>,
    pub accept_credentials: bool,
    pub fail_with: Mutex<Option<String>>,
    pub calls: Mutex<Vec<String>>,
    pub crash_reports: Mutex<Vec<CrashReport>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            accept_credentials: true,
            ..Default::default()
        }
    }

    pub fn with_course(self, course: Course) -> Self {
        self.courses.lock().unwrap().push(course);
        self
    }

    pub fn with_archive(self, exercise: &str, archive: Vec<u8>) -> Self {
        self.archives
            .lock()
            .unwrap()
            .insert(exercise.to_string(), archive);
        self
    }

    pub fn failing(self, message: &str) -> Self {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.fail_with.lock().unwrap().as_ref() {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExerciseService for MockService {
    async fn authenticate(&self, _username: &str, _password: &str) -> Result<bool> {
        self.record("authenticate")?;
        Ok(self.accept_credentials)
    }

    async fn logout(&self) -> Result<()> {
        self.record("logout")
    }

    async fn select_server(&self, _address: &str) -> Result<bool> {
        self.record("select_server")?;
        Ok(true)
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        self.record("list_courses")?;
        Ok(self.courses.lock().unwrap().clone())
    }

    async fn get_course(&self, course_id: CourseId) -> Result<Course> {
        self.record("get_course")?;
        self.courses
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == Some(course_id))
            .cloned()
            .ok_or_else(|| anyhow!("course {} not found", course_id))
    }

    async fn get_course_details(&self, details_url: &Url) -> Result<Course> {
        self.record("get_course_details")?;
        self.courses
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.details_url.as_deref() == Some(details_url.as_str()))
            .cloned()
            .ok_or_else(|| anyhow!("no course at {}", details_url))
    }

    async fn download_exercise(&self, exercise: &Exercise) -> Result<Vec<u8>> {
        self.record("download_exercise")?;
        self.archives
            .lock()
            .unwrap()
            .get(&exercise.name)
            .cloned()
            .ok_or_else(|| anyhow!("no archive for {}", exercise.name))
    }

    async fn submit(&self, exercise_root: &Path) -> Result<SubmissionResult> {
        self.record("submit")?;
        Ok(SubmissionResult {
            details: serde_json::json!({ "root": exercise_root.display().to_string() }),
        })
    }

    async fn paste(&self, _exercise_root: &Path) -> Result<Url> {
        self.record("paste")?;
        Ok(Url::parse("https://tmc.example.org/paste/abc123")?)
    }

    async fn send_feedback(&self, answers: &HashMap<String, String>, _url: &str) -> Result<HttpResult> {
        self.record("send_feedback")?;
        Ok(HttpResult {
            status_code: 200,
            body: format!("{} answers", answers.len()),
        })
    }

    async fn list_reviews(&self, _course: &Course) -> Result<Vec<Review>> {
        self.record("list_reviews")?;
        Ok(self.reviews.lock().unwrap().clone())
    }

    async fn send_crash_report(&self, report: &CrashReport) -> Result<()> {
        self.crash_reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Test runner that passes every exercise containing `marker`
pub struct MarkerRunner {
    pub marker: &'static str,
}

#[async_trait]
impl TestRunner for MarkerRunner {
    fn supports(&self, root: &Path) -> bool {
        root.join(self.marker).is_file()
    }

    async fn run_tests(&self, root: &Path) -> Result<RunResult> {
        Ok(RunResult {
            status: RunStatus::Passed,
            details: serde_json::json!({ "root": root.display().to_string() }),
        })
    }

    fn runner_name(&self) -> &'static str {
        "marker"
    }
}

/// Gzip-compressed tar archive holding `files`
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Core running on the test's own runtime
pub fn core_with(service: Arc<MockService>, config: CoreConfig) -> TmcCore {
    let collaborators = Collaborators::new(service as Arc<dyn ExerciseService>)
        .with_test_runner(Arc::new(MarkerRunner { marker: "pom.xml" }));
    TmcCore::with_pool(config, collaborators, WorkerPool::current()).unwrap()
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Every file under `root` with its content, sorted by relative path
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

pub fn demo_course() -> Course {
    Course::new(3, "k2015-ohpe").with_exercises(vec![
        Exercise::new("viikko1-Tehtava1", "h1"),
        Exercise::new("viikko1-Tehtava2", "h2"),
    ])
}
