//! Declarative shape rules for model output.
//!
//! Each content kind has one static [`Rule`] tree. [`validate`] walks a parsed
//! JSON value against it and reports the first offending field by path, so a
//! payload is only ever deserialized into its typed form after it is known to
//! be well formed.

use serde_json::Value;

use crate::{error::SchemaViolation, models::ContentKind};

pub enum Rule {
    /// Any string, empty included.
    Text,
    NonEmptyText,
    /// Object whose values are all strings, with at least `min` entries.
    TextMap { min: usize },
    List { min: usize, items: &'static Rule },
    Object(&'static [Field]),
    /// `base` first, then a cross-field check that may name a sub-field.
    Refined { base: &'static Rule, check: fn(&Value) -> Result<(), (&'static str, String)> },
}

pub struct Field {
    pub name: &'static str,
    pub rule: &'static Rule,
    pub optional: bool,
}

macro_rules! req {
    ($name:literal => $rule:expr) => {
        Field { name: $name, rule: &$rule, optional: false }
    };
}

macro_rules! opt {
    ($name:literal => $rule:expr) => {
        Field { name: $name, rule: &$rule, optional: true }
    };
}

const TEST_CASE: Rule = Rule::Object(&[req!("input" => Rule::Text), req!("output" => Rule::Text)]);

pub const PROBLEM: Rule = Rule::Object(&[
    req!("problemId" => Rule::NonEmptyText),
    req!("title" => Rule::NonEmptyText),
    req!("description" => Rule::NonEmptyText),
    req!("starterCode" => Rule::TextMap { min: 1 }),
    req!("testCases" => Rule::List { min: 1, items: &TEST_CASE }),
]);

const CHAPTER: Rule = Rule::Object(&[
    req!("chapterTitle" => Rule::NonEmptyText),
    opt!("videoSearchKeyword" => Rule::Text),
    req!("lessons" => Rule::List { min: 0, items: &Rule::NonEmptyText }),
    opt!("videoUrls" => Rule::List { min: 0, items: &Rule::Text }),
]);

// createdAt and totalDuration are overwritten by the gateway and not checked.
pub const COURSE: Rule = Rule::Object(&[
    req!("courseId" => Rule::NonEmptyText),
    req!("courseName" => Rule::NonEmptyText),
    req!("description" => Rule::Text),
    req!("category" => Rule::Text),
    req!("level" => Rule::Text),
    req!("bannerImagePrompt" => Rule::Text),
    req!("chapters" => Rule::List { min: 0, items: &CHAPTER }),
]);

pub const MCQ_QUESTION: Rule = Rule::Refined {
    base: &Rule::Object(&[
        req!("question" => Rule::NonEmptyText),
        req!("options" => Rule::List { min: 2, items: &Rule::NonEmptyText }),
        req!("answer" => Rule::NonEmptyText),
        req!("explanation" => Rule::Text),
    ]),
    check: answer_in_options,
};

// Presence of quiz/exam depends on the requested counts; the gateway fills in
// or rejects missing arrays before this runs.
pub const QUIZ_EXAM: Rule = Rule::Object(&[
    req!("quiz" => Rule::List { min: 0, items: &MCQ_QUESTION }),
    req!("exam" => Rule::List { min: 0, items: &MCQ_QUESTION }),
]);

pub fn schema_for(kind: ContentKind) -> &'static Rule {
    match kind {
        ContentKind::Course => &COURSE,
        ContentKind::Problem => &PROBLEM,
        ContentKind::QuizExam => &QUIZ_EXAM,
    }
}

fn answer_in_options(value: &Value) -> Result<(), (&'static str, String)> {
    let answer = value.get("answer").and_then(Value::as_str).unwrap_or_default();
    let listed = value
        .get("options")
        .and_then(Value::as_array)
        .map(|options| options.iter().any(|o| o.as_str() == Some(answer)))
        .unwrap_or(false);
    if listed {
        Ok(())
    } else {
        Err(("answer", format!("{answer:?} is not one of the options")))
    }
}

pub fn validate(value: &Value, rule: &Rule) -> Result<(), SchemaViolation> {
    check(value, rule, "$")
}

fn child(path: &str, name: &str) -> String {
    if path == "$" {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn check(value: &Value, rule: &Rule, path: &str) -> Result<(), SchemaViolation> {
    match rule {
        Rule::Text => match value {
            Value::String(_) => Ok(()),
            _ => Err(SchemaViolation::new(path, "must be a string")),
        },
        Rule::NonEmptyText => match value {
            Value::String(s) if !s.trim().is_empty() => Ok(()),
            Value::String(_) => Err(SchemaViolation::new(path, "must not be empty")),
            _ => Err(SchemaViolation::new(path, "must be a string")),
        },
        Rule::TextMap { min } => {
            let map = value
                .as_object()
                .ok_or_else(|| SchemaViolation::new(path, "must be an object"))?;
            if map.len() < *min {
                return Err(SchemaViolation::new(path, format!("must have at least {min} entries")));
            }
            for (key, v) in map {
                if !v.is_string() {
                    return Err(SchemaViolation::new(child(path, key), "must be a string"));
                }
            }
            Ok(())
        }
        Rule::List { min, items } => {
            let list = value
                .as_array()
                .ok_or_else(|| SchemaViolation::new(path, "must be an array"))?;
            if list.len() < *min {
                return Err(SchemaViolation::new(
                    path,
                    format!("must contain at least {min} item(s), got {}", list.len()),
                ));
            }
            list.iter()
                .enumerate()
                .try_for_each(|(i, item)| check(item, items, &format!("{path}[{i}]")))
        }
        Rule::Object(fields) => {
            let map = value
                .as_object()
                .ok_or_else(|| SchemaViolation::new(path, "must be an object"))?;
            for field in fields.iter() {
                match map.get(field.name) {
                    None | Some(Value::Null) if field.optional => {}
                    None => return Err(SchemaViolation::new(child(path, field.name), "is required")),
                    Some(v) => check(v, field.rule, &child(path, field.name))?,
                }
            }
            Ok(())
        }
        Rule::Refined { base, check: refine } => {
            check(value, base, path)?;
            refine(value).map_err(|(field, reason)| SchemaViolation::new(child(path, field), reason))
        }
    }
}
