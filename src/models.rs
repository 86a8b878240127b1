use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GenerationError;

/// Upper bound for `quizCount` / `examCount`.
pub const MAX_QUESTION_COUNT: u32 = 50;
pub const DEFAULT_QUESTION_COUNT: u32 = 5;

const DEFAULT_IMAGE_SIDE: u32 = 1024;
const MAX_IMAGE_SIDE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Course,
    Problem,
    QuizExam,
}

impl ContentKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Problem => "problem",
            Self::QuizExam => "quiz_exam",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(GenerationError::invalid("Difficulty must be one of: easy, medium, hard")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for CourseLevel {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(GenerationError::invalid(
                "Level must be one of: beginner, intermediate, advanced",
            )),
        }
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, GenerationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(GenerationError::invalid(message)),
    }
}

fn difficulty(value: Option<String>) -> Result<Difficulty, GenerationError> {
    value.as_deref().unwrap_or_default().parse()
}

// --- Requests -------------------------------------------------------------
//
// Every field is optional at the serde level so a missing field produces our
// own 400 message rather than a framework rejection.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCourseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSubject {
    pub name: String,
    pub description: String,
    pub category: String,
    pub level: CourseLevel,
}

impl GenerateCourseRequest {
    pub fn validate(self) -> Result<CourseSubject, GenerationError> {
        let name = required(self.name, "Course name is required and must be a non-empty string")?;
        let category = required(self.category, "Category is required and must be a non-empty string")?;
        let level = self.level.as_deref().unwrap_or_default().parse()?;
        Ok(CourseSubject {
            name,
            description: self.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            category,
            level,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProblemRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemSubject {
    pub topic: String,
    pub difficulty: Difficulty,
}

impl GenerateProblemRequest {
    pub fn validate(self) -> Result<ProblemSubject, GenerationError> {
        Ok(ProblemSubject {
            topic: required(self.topic, "Topic is required and must be a non-empty string")?,
            difficulty: difficulty(self.difficulty)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizExamRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub quiz_count: Option<u32>,
    #[serde(default)]
    pub exam_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizExamSubject {
    pub topic: String,
    pub difficulty: Difficulty,
    pub quiz_count: usize,
    pub exam_count: usize,
}

impl GenerateQuizExamRequest {
    pub fn validate(self) -> Result<QuizExamSubject, GenerationError> {
        let topic = required(self.topic, "Topic is required and must be a non-empty string")?;
        let difficulty = difficulty(self.difficulty)?;
        let count = |value: Option<u32>, field: &str| {
            let n = value.unwrap_or(DEFAULT_QUESTION_COUNT);
            if n > MAX_QUESTION_COUNT {
                Err(GenerationError::invalid(format!(
                    "{field} must be between 0 and {MAX_QUESTION_COUNT}"
                )))
            } else {
                Ok(n as usize)
            }
        };
        Ok(QuizExamSubject {
            topic,
            difficulty,
            quiz_count: count(self.quiz_count, "quizCount")?,
            exam_count: count(self.exam_count, "examCount")?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskAiRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Banner image request, usually carrying a course's `bannerImagePrompt` as `input`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

/// What is forwarded to the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrompt {
    pub input: String,
    pub width: u32,
    pub height: u32,
    pub model: String,
    pub aspect_ratio: String,
}

impl GenerateImageRequest {
    pub fn validate(self) -> Result<ImagePrompt, GenerationError> {
        let input = required(self.input, "Image prompt (input) is required and must be a non-empty string")?;
        let side = |value: Option<u32>, field: &str| match value.unwrap_or(DEFAULT_IMAGE_SIDE) {
            n @ 1..=MAX_IMAGE_SIDE => Ok(n),
            _ => Err(GenerationError::invalid(format!("{field} must be between 1 and {MAX_IMAGE_SIDE}"))),
        };
        Ok(ImagePrompt {
            input,
            width: side(self.width, "width")?,
            height: side(self.height, "height")?,
            model: self.model.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| "flux".into()),
            aspect_ratio: self
                .aspect_ratio
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "16:9".into()),
        })
    }
}

// --- Validated payloads ---------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub banner_image_prompt: String,
    /// Set by the gateway, whatever the model wrote.
    #[serde(default, skip_deserializing)]
    pub created_at: String,
    #[serde(default, skip_deserializing)]
    pub total_duration: u32,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub chapter_title: String,
    #[serde(default)]
    pub video_search_keyword: Option<String>,
    pub lessons: Vec<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub problem_id: String,
    pub title: String,
    pub description: String,
    /// language -> starter source
    pub starter_code: BTreeMap<String, String>,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizExam {
    pub quiz: Vec<McqQuestion>,
    pub exam: Vec<McqQuestion>,
    pub difficulty: Difficulty,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub request_id: Uuid,
    pub model: String,
    pub generation_time: String,
    pub elapsed_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// A validated payload together with how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub data: T,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskAiReply {
    pub text: String,
    pub model: String,
}
