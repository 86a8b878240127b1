//! Prompt templates. The system prompts pin the JSON shape each content kind
//! is validated against in `schema`.

use crate::models::{ContentKind, CourseSubject, ProblemSubject, QuizExamSubject};

const PROBLEM_SYSTEM: &str = r##"
You are an expert coding problem generator. Return ONLY valid JSON with NO markdown formatting, NO code blocks, NO additional text.

EXACT JSON STRUCTURE REQUIRED:
{
  "problemId": "unique-slug-identifier",
  "title": "Clear, Concise Problem Title",
  "description": "Detailed problem description with examples and constraints. Use \n for line breaks.",
  "starterCode": {
    "javascript": "function solve() {\n  // Your code here\n}",
    "python": "def solve():\n    # Your code here\n    pass",
    "java": "public class Solution {\n    public void solve() {\n        // Your code here\n    }\n}",
    "cpp": "#include <iostream>\nusing namespace std;\n\nvoid solve() {\n    // Your code here\n}"
  },
  "testCases": [
    {
      "input": "test input as string",
      "output": "expected output as string"
    }
  ]
}

Provide at least three test cases. Every input and output is a string.
CRITICAL: Return ONLY the JSON object. No explanations, no markdown.
"##;

const COURSE_SYSTEM: &str = r#"
Return ONLY JSON. Follow this EXACT structure:

{
  "courseId": "string",
  "courseName": "string",
  "description": "string",
  "category": "string",
  "level": "string",
  "bannerImagePrompt": "string",
  "chapters": [
    {
      "chapterTitle": "string",
      "videoSearchKeyword": "string",
      "lessons": ["string"],
      "videoUrls": []
    }
  ]
}

Example:
{
  "courseId": "python-intermediate-001",
  "courseName": "Full Python Course for Intermediate Students",
  "description": "python",
  "category": "python",
  "level": "intermediate",
  "bannerImagePrompt": "Vibrant banner for an intermediate Python course featuring glowing code snippets, a stylized python snake, abstract data structures and programming icons on a dark gradient background",
  "chapters": [
    {
      "chapterTitle": "Object-Oriented Programming",
      "videoSearchKeyword": "intermediate python oop classes inheritance",
      "lessons": ["Classes and Objects", "Inheritance and Polymorphism", "Encapsulation and Abstraction"],
      "videoUrls": []
    },
    {
      "chapterTitle": "Advanced Data Structures",
      "videoSearchKeyword": "python intermediate data structures lists dicts sets",
      "lessons": ["Advanced Lists and Dictionaries", "Sets and Tuples", "Comprehensions"],
      "videoUrls": []
    }
  ]
}
"#;

const QUIZ_EXAM_SYSTEM: &str = r#"
You are an expert programming instructor who writes multiple-choice questions. Return ONLY valid JSON with NO markdown formatting and NO additional text.

EXACT JSON STRUCTURE REQUIRED:
{
  "quiz": [
    {
      "question": "What does a stack's pop operation return?",
      "options": ["The most recently pushed item", "The oldest item", "The smallest item", "Nothing"],
      "answer": "The most recently pushed item",
      "explanation": "A stack is last-in, first-out."
    }
  ],
  "exam": []
}

Rules:
- Every question has at least two distinct, non-empty options.
- "answer" MUST be copied exactly from one of the "options".
- Quiz questions are short practice checks; exam questions are harder and test deeper understanding.
- When a count of 0 is requested, return an empty array for that field.
"#;

impl ContentKind {
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Course => COURSE_SYSTEM.trim(),
            Self::Problem => PROBLEM_SYSTEM.trim(),
            Self::QuizExam => QUIZ_EXAM_SYSTEM.trim(),
        }
    }

    pub fn temperature(self) -> Option<f32> {
        match self {
            Self::Course => None,
            Self::Problem | Self::QuizExam => Some(0.7),
        }
    }

    pub fn max_tokens(self) -> Option<u32> {
        match self {
            Self::Course => None,
            Self::Problem => Some(2000),
            Self::QuizExam => Some(4000),
        }
    }
}

pub fn course_prompt(subject: &CourseSubject) -> String {
    format!(
        "Course Name: {}\nDescription: {}\nCategory: {}\nLevel: {}\nReturn ONLY JSON.",
        subject.name,
        subject.description,
        subject.category,
        subject.level.as_str()
    )
}

pub fn problem_prompt(subject: &ProblemSubject) -> String {
    format!(
        "Generate a {} level coding problem about \"{}\". Return ONLY the JSON object with no additional text or formatting.",
        subject.difficulty.as_str(),
        subject.topic
    )
}

pub fn quiz_exam_prompt(subject: &QuizExamSubject) -> String {
    format!(
        "Generate {} quiz question(s) and {} exam question(s) at {} difficulty about \"{}\". Return ONLY the JSON object with no additional text or formatting.",
        subject.quiz_count,
        subject.exam_count,
        subject.difficulty.as_str(),
        subject.topic
    )
}

pub fn ask_ai_prompt(message: &str, language: Option<&str>) -> String {
    let language = match language {
        Some("bn") => "Bangla (বাংলা)",
        _ => "English",
    };
    format!("{message} Please answer concisely in 1–2 sentences in {language}.")
}

/// Search string for a chapter that came back without a usable keyword.
pub fn chapter_search_query(category: &str, chapter_title: &str, level: &str) -> String {
    format!("{category} {chapter_title} {level} tutorial")
}
