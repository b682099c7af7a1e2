use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

//
// ─── IDS ───────────────────────────────────────────────────────────────────────
//

/// Stable identifier for a lesson within a course catalog.
///
/// Progress is recorded against these ids, never against catalog positions,
/// so reordering the catalog cannot desync a learner's record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonId(u64);

impl LessonId {
    /// Creates a new `LessonId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for parsing a `LessonId` from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLessonIdError;

impl fmt::Display for ParseLessonIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse LessonId from string")
    }
}

impl std::error::Error for ParseLessonIdError {}

impl FromStr for LessonId {
    type Err = ParseLessonIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(LessonId::new).map_err(|_| ParseLessonIdError)
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog title cannot be empty")]
    EmptyTitle,

    #[error("catalog must contain at least one lesson")]
    NoLessons,

    #[error("duplicate lesson id: {id}")]
    DuplicateLessonId { id: LessonId },

    #[error("lesson {id} has an empty title")]
    EmptyLessonTitle { id: LessonId },

    #[error("lesson {id} has an invalid video reference")]
    InvalidVideoRef { id: LessonId },
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// One entry of the course catalog. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    video_ref: String,
    video_url: Url,
    description: String,
}

impl Lesson {
    /// Build a lesson from static configuration.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyLessonTitle` if the title is blank and
    /// `CatalogError::InvalidVideoRef` if the video reference does not form
    /// a well-formed embed URL.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        video_ref: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CatalogError::EmptyLessonTitle { id });
        }

        let video_ref = video_ref.into();
        if video_ref.trim().is_empty() || video_ref.contains(char::is_whitespace) {
            return Err(CatalogError::InvalidVideoRef { id });
        }
        let video_url = Url::parse(&format!("https://www.youtube.com/embed/{video_ref}"))
            .map_err(|_| CatalogError::InvalidVideoRef { id })?;

        Ok(Self {
            id,
            title,
            video_ref,
            video_url,
            description: description.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn video_ref(&self) -> &str {
        &self.video_ref
    }

    /// Embeddable URL for the lesson video, derived from the video reference.
    #[must_use]
    pub fn video_url(&self) -> &Url {
        &self.video_url
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Ordered, immutable sequence of lessons making up one course.
///
/// The ordering is part of the course definition: "next lesson" and
/// "first incomplete lesson" are both defined against it. Changing the
/// catalog requires redeploying configuration; there is no mutation API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    title: String,
    lessons: Vec<Lesson>,
}

impl Catalog {
    /// Validate and assemble a catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the title is blank, the lesson list is
    /// empty, or two lessons share an id.
    pub fn new(title: impl Into<String>, lessons: Vec<Lesson>) -> Result<Self, CatalogError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle);
        }
        if lessons.is_empty() {
            return Err(CatalogError::NoLessons);
        }
        for (idx, lesson) in lessons.iter().enumerate() {
            if lessons[..idx].iter().any(|other| other.id() == lesson.id()) {
                return Err(CatalogError::DuplicateLessonId { id: lesson.id() });
            }
        }

        Ok(Self { title, lessons })
    }

    /// The built-in five-lesson web development course.
    ///
    /// # Panics
    ///
    /// Panics if the static course configuration fails validation, which
    /// would be a programming error in the configuration itself.
    #[must_use]
    pub fn builtin() -> Self {
        let lessons = vec![
            Lesson::new(
                LessonId::new(1),
                "Introduction to Web Development",
                "dQw4w9WgXcQ",
                "Learn the fundamentals of web development, including HTML, CSS, and \
                 JavaScript basics, and the core technologies that power the modern web.",
            ),
            Lesson::new(
                LessonId::new(2),
                "HTML Essentials",
                "UB1O30fR-EE",
                "Master HTML5 tags, semantic elements, and best practices for structuring \
                 web pages, from document structure to accessibility.",
            ),
            Lesson::new(
                LessonId::new(3),
                "CSS Styling & Layout",
                "1Rs2ND1ryYc",
                "Dive into CSS styling, flexbox, grid, and responsive design techniques \
                 for layouts that work on any device.",
            ),
            Lesson::new(
                LessonId::new(4),
                "JavaScript Fundamentals",
                "W6NZfCO5SIk",
                "Understand JavaScript variables, functions, loops, and DOM manipulation, \
                 and build your first interactive features.",
            ),
            Lesson::new(
                LessonId::new(5),
                "Building Your First Project",
                "G3e-cpL7ofc",
                "Apply everything you've learned to build a complete interactive website \
                 bringing HTML, CSS, and JavaScript together.",
            ),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("built-in course configuration should be valid");

        Self::new("Web Development Foundations", lessons)
            .expect("built-in course configuration should be valid")
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    /// Look up a lesson by its stable id.
    #[must_use]
    pub fn get(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id() == id)
    }

    /// Zero-based position of a lesson within the catalog ordering.
    #[must_use]
    pub fn position(&self, id: LessonId) -> Option<usize> {
        self.lessons.iter().position(|lesson| lesson.id() == id)
    }

    /// Lesson at the given zero-based position.
    #[must_use]
    pub fn lesson_at(&self, position: usize) -> Option<&Lesson> {
        self.lessons.get(position)
    }

    /// First lesson of the course.
    #[must_use]
    pub fn first(&self) -> &Lesson {
        // `new` rejects empty lesson lists.
        &self.lessons[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_course_has_five_ordered_lessons() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.first().id(), LessonId::new(1));
        assert_eq!(catalog.position(LessonId::new(3)), Some(2));
    }

    #[test]
    fn lesson_video_url_derives_from_ref() {
        let lesson = Lesson::new(LessonId::new(1), "Intro", "abc123", "").unwrap();
        assert_eq!(
            lesson.video_url().as_str(),
            "https://www.youtube.com/embed/abc123"
        );
    }

    #[test]
    fn lesson_rejects_blank_title_and_bad_ref() {
        let err = Lesson::new(LessonId::new(7), "  ", "abc", "").unwrap_err();
        assert!(matches!(err, CatalogError::EmptyLessonTitle { id } if id == LessonId::new(7)));

        let err = Lesson::new(LessonId::new(7), "Ok", "has space", "").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidVideoRef { id } if id == LessonId::new(7)));
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let a = Lesson::new(LessonId::new(1), "A", "aaa", "").unwrap();
        let b = Lesson::new(LessonId::new(1), "B", "bbb", "").unwrap();
        let err = Catalog::new("Course", vec![a, b]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateLessonId { id } if id == LessonId::new(1)));
    }

    #[test]
    fn catalog_rejects_empty_inputs() {
        let lesson = Lesson::new(LessonId::new(1), "A", "aaa", "").unwrap();
        assert!(matches!(
            Catalog::new(" ", vec![lesson]),
            Err(CatalogError::EmptyTitle)
        ));
        assert!(matches!(
            Catalog::new("Course", vec![]),
            Err(CatalogError::NoLessons)
        ));
    }

    #[test]
    fn lesson_id_parses_from_string() {
        let id: LessonId = "42".parse().unwrap();
        assert_eq!(id, LessonId::new(42));
        assert!("not-a-number".parse::<LessonId>().is_err());
    }

    #[test]
    fn lookup_by_id_is_position_independent() {
        let catalog = Catalog::builtin();
        let lesson = catalog.get(LessonId::new(5)).unwrap();
        assert_eq!(lesson.title(), "Building Your First Project");
        assert!(catalog.get(LessonId::new(99)).is_none());
    }
}
