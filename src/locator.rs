//! Project root location.
//!
//! Resolves an arbitrary path inside a checked-out course to the exercise root
//! that encloses it. What counts as a root is decided by a [`RootDetector`],
//! so new build systems plug in without touching the walk itself.

use crate::domain::Course;
use crate::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decides whether a directory is the root of an exercise
pub trait RootDetector: Send + Sync {
    fn recognizes(&self, directory: &Path) -> bool;
}

impl<F> RootDetector for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn recognizes(&self, directory: &Path) -> bool {
        self(directory)
    }
}

/// Recognizes directories containing one of a set of build descriptors
#[derive(Debug, Clone)]
pub struct BuildFileDetector {
    markers: Vec<String>,
}

impl BuildFileDetector {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for BuildFileDetector {
    fn default() -> Self {
        Self::new(env::exercise::DEFAULT_ROOT_MARKERS.iter().copied())
    }
}

impl RootDetector for BuildFileDetector {
    fn recognizes(&self, directory: &Path) -> bool {
        directory.is_dir()
            && self
                .markers
                .iter()
                .any(|marker| directory.join(marker).is_file())
    }
}

/// Recognizes a directory if any of the wrapped detectors does
pub struct AnyOf {
    detectors: Vec<Box<dyn RootDetector>>,
}

impl AnyOf {
    pub fn new(detectors: Vec<Box<dyn RootDetector>>) -> Self {
        Self { detectors }
    }
}

impl RootDetector for AnyOf {
    fn recognizes(&self, directory: &Path) -> bool {
        self.detectors.iter().any(|d| d.recognizes(directory))
    }
}

/// Walks a path upwards until its detector recognizes an exercise root
#[derive(Clone)]
pub struct ProjectRootFinder {
    detector: Arc<dyn RootDetector>,
}

impl ProjectRootFinder {
    pub fn new(detector: impl RootDetector + 'static) -> Self {
        Self {
            detector: Arc::new(detector),
        }
    }

    /// First of `path` and its ancestors recognized as a root, if any.
    ///
    /// Touches the filesystem only through the detector and checks at most
    /// `depth + 1` directories. A relative path ends at the current
    /// directory, checked as `.`.
    pub fn find_root(&self, path: &Path) -> Option<PathBuf> {
        path.ancestors()
            .map(|candidate| {
                if candidate.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    candidate
                }
            })
            .find(|candidate| self.detector.recognizes(candidate))
            .map(Path::to_path_buf)
    }
}

impl Default for ProjectRootFinder {
    fn default() -> Self {
        Self::new(BuildFileDetector::default())
    }
}

/// Course whose name matches the closest component of `path`.
///
/// Students check a course out into a directory named after it, so the
/// deepest matching component wins.
pub fn find_course<'a>(path: &Path, courses: &'a [Course]) -> Option<&'a Course> {
    path.ancestors()
        .filter_map(|ancestor| ancestor.file_name().and_then(|name| name.to_str()))
        .find_map(|component| courses.iter().find(|course| course.name == component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::fs;

    fn exercise_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let exercise = dir.path().join("k2015-demo").join("viikko1-Tehtava1");
        fs::create_dir_all(exercise.join("src").join("main")).unwrap();
        fs::write(exercise.join("pom.xml"), "<project/>").unwrap();
        dir
    }

    #[test]
    fn test_finds_root_from_nested_path() {
        let dir = exercise_tree();
        let nested = dir
            .path()
            .join("k2015-demo")
            .join("viikko1-Tehtava1")
            .join("src")
            .join("main");

        let finder = ProjectRootFinder::new(BuildFileDetector::default());
        let root = finder.find_root(&nested).unwrap();

        assert_eq!(root, dir.path().join("k2015-demo").join("viikko1-Tehtava1"));
    }

    #[test]
    fn test_root_itself_is_recognized() {
        let dir = exercise_tree();
        let exercise = dir.path().join("k2015-demo").join("viikko1-Tehtava1");

        let finder = ProjectRootFinder::new(BuildFileDetector::default());
        assert_eq!(finder.find_root(&exercise), Some(exercise));
    }

    #[test]
    fn test_outside_exercise_is_not_found() {
        let dir = exercise_tree();
        let finder = ProjectRootFinder::new(BuildFileDetector::default());

        assert_eq!(finder.find_root(&dir.path().join("k2015-demo")), None);
    }

    #[test]
    fn test_walk_is_bounded_by_depth() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let finder = ProjectRootFinder::new(move |_: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        });

        assert!(finder.find_root(Path::new("/a/b/c/d")).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_relative_path_walk_ends_at_current_directory() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let finder = ProjectRootFinder::new(move |dir: &Path| {
            recorder.lock().unwrap().push(dir.to_path_buf());
            dir == Path::new(".")
        });

        assert_eq!(finder.find_root(Path::new("src/main")), Some(PathBuf::from(".")));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![PathBuf::from("src/main"), PathBuf::from("src"), PathBuf::from(".")]
        );
    }

    #[test]
    fn test_closure_and_any_of_detectors() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("py-exercise");
        fs::create_dir_all(project.join("test")).unwrap();
        fs::write(project.join("tmc.marker"), "").unwrap();

        let detectors: Vec<Box<dyn RootDetector>> = vec![
            Box::new(BuildFileDetector::new(["build.xml"])),
            Box::new(|dir: &Path| dir.join("tmc.marker").exists()),
        ];
        let finder = ProjectRootFinder::new(AnyOf::new(detectors));

        assert_eq!(finder.find_root(&project.join("test")), Some(project));
    }

    #[test]
    fn test_find_course_prefers_closest_component() {
        let courses = vec![Course::new(1, "ohpe"), Course::new(2, "ohja")];
        let path = Path::new("/home/student/ohpe/ohja/viikko1");

        assert_eq!(find_course(path, &courses).and_then(|c| c.id), Some(2));
        assert!(find_course(Path::new("/tmp/other"), &courses).is_none());
    }
}
