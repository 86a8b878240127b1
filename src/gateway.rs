//! The AI generation gateway.
//!
//! Every operation follows the same linear pipeline: validate the request,
//! build the prompts, make one chat-completion call under a bounded wait,
//! strip a wrapping code fence, parse JSON, check it against the kind's
//! schema, then deserialize into the typed payload. Nothing is retried and no
//! partial payload is ever returned.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use futures::{stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{GenerationError, SchemaViolation},
    images::ImageGenerator,
    llm::{ChatMessage, ChatRequest, ChatTransport},
    models::{
        AskAiReply, AskAiRequest, ContentKind, Course, GenerateCourseRequest, GenerateProblemRequest,
        GenerateImageRequest, GenerateQuizExamRequest, Generated, GenerationMetadata, McqQuestion, Problem, QuizExam,
    },
    prompts,
    sanitize::{parse_model_json, preview},
    schema,
    youtube::VideoSearch,
};

const NO_ANSWER: &str = "No response from AI";

pub struct Gateway {
    chat: Arc<dyn ChatTransport>,
    videos: Arc<dyn VideoSearch>,
    images: Arc<dyn ImageGenerator>,
    models: Vec<String>,
    model: String,
    timeout: Duration,
    video_concurrency: usize,
}

impl Gateway {
    pub fn new(
        config: &Config,
        chat: Arc<dyn ChatTransport>,
        videos: Arc<dyn VideoSearch>,
        images: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            chat,
            videos,
            images,
            models: config.models.clone(),
            model: config.primary_model().to_string(),
            timeout: config.request_timeout,
            video_concurrency: config.video_search_concurrency.max(1),
        }
    }

    /// The configured model list; only the first entry is used.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(level = "info", skip(self, request), fields(topic = ?request.topic, difficulty = ?request.difficulty))]
    pub async fn generate_problem(
        &self,
        request: GenerateProblemRequest,
    ) -> Result<Generated<Problem>, GenerationError> {
        let subject = request.validate()?;
        let started = Instant::now();

        let value = self
            .fetch_json(ContentKind::Problem, prompts::problem_prompt(&subject))
            .await?;
        schema::validate(&value, schema::schema_for(ContentKind::Problem))?;
        let problem: Problem = decode(value)?;

        info!(
            problem_id = %problem.problem_id,
            test_cases = problem.test_cases.len(),
            "Problem generated"
        );
        Ok(Generated {
            data: problem,
            metadata: self.metadata(
                started,
                Some(subject.topic),
                Some(subject.difficulty.as_str().to_string()),
            ),
        })
    }

    #[instrument(level = "info", skip(self, request), fields(topic = ?request.topic, difficulty = ?request.difficulty))]
    pub async fn generate_quiz_exam(
        &self,
        request: GenerateQuizExamRequest,
    ) -> Result<Generated<QuizExam>, GenerationError> {
        let subject = request.validate()?;
        let started = Instant::now();

        let mut value = self
            .fetch_json(ContentKind::QuizExam, prompts::quiz_exam_prompt(&subject))
            .await?;
        fit_question_list(&mut value, "quiz", subject.quiz_count)?;
        fit_question_list(&mut value, "exam", subject.exam_count)?;
        schema::validate(&value, schema::schema_for(ContentKind::QuizExam))?;

        let quiz: Vec<McqQuestion> = decode(value["quiz"].take())?;
        let exam: Vec<McqQuestion> = decode(value["exam"].take())?;

        info!(quiz = quiz.len(), exam = exam.len(), "Quiz and exam generated");
        Ok(Generated {
            metadata: self.metadata(
                started,
                Some(subject.topic.clone()),
                Some(subject.difficulty.as_str().to_string()),
            ),
            data: QuizExam { quiz, exam, difficulty: subject.difficulty, topic: subject.topic },
        })
    }

    #[instrument(level = "info", skip(self, request), fields(name = ?request.name, level = ?request.level))]
    pub async fn generate_course(
        &self,
        request: GenerateCourseRequest,
    ) -> Result<Generated<Course>, GenerationError> {
        let subject = request.validate()?;
        let started = Instant::now();

        let value = self
            .fetch_json(ContentKind::Course, prompts::course_prompt(&subject))
            .await?;
        schema::validate(&value, schema::schema_for(ContentKind::Course))?;
        let mut course: Course = decode(value)?;

        self.attach_videos(&mut course, &subject.category, subject.level.as_str())
            .await;
        course.created_at = Utc::now().to_rfc3339();
        course.total_duration = 0;

        info!(course_id = %course.course_id, chapters = course.chapters.len(), "Course generated");
        Ok(Generated {
            data: course,
            metadata: self.metadata(started, None, Some(subject.level.as_str().to_string())),
        })
    }

    #[instrument(level = "info", skip(self, request), fields(language = ?request.language))]
    pub async fn ask_ai(&self, request: AskAiRequest) -> Result<AskAiReply, GenerationError> {
        let message = match request.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m,
            _ => return Err(GenerationError::invalid("No message provided")),
        };
        let chat = ChatRequest {
            model: self.model().to_string(),
            messages: vec![ChatMessage::user(prompts::ask_ai_prompt(
                message,
                request.language.as_deref(),
            ))],
            temperature: None,
            max_tokens: None,
            stream: false,
        };
        let text = match self.complete_text(&chat).await {
            Ok(text) => text,
            Err(GenerationError::EmptyUpstreamResponse) => {
                warn!("Model returned no content for ask-ai, answering with placeholder");
                NO_ANSWER.to_string()
            }
            Err(e) => return Err(e),
        };
        Ok(AskAiReply { text, model: self.model().to_string() })
    }

    /// Forward a banner prompt to the image service under the same bounded wait.
    #[instrument(level = "info", skip(self, request), fields(model = ?request.model))]
    pub async fn generate_image(&self, request: GenerateImageRequest) -> Result<String, GenerationError> {
        let prompt = request.validate()?;
        let started = Instant::now();
        let image = tokio::time::timeout(self.timeout, self.images.generate(&prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Banner image generated");
        Ok(image)
    }

    /// Steps shared by every content kind, up to and including JSON parsing.
    async fn fetch_json(&self, kind: ContentKind, user_prompt: String) -> Result<Value, GenerationError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![ChatMessage::system(kind.system_prompt()), ChatMessage::user(user_prompt)],
            temperature: kind.temperature(),
            max_tokens: kind.max_tokens(),
            stream: false,
        };
        let raw = self.complete_text(&request).await?;
        debug!(%kind, raw = %preview(&raw, 400), "Model output received");
        parse_model_json(&raw)
    }

    async fn complete_text(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        let started = Instant::now();
        let response = tokio::time::timeout(self.timeout, self.chat.complete(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;
        info!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model call finished"
        );
        response
            .first_content()
            .map(str::to_string)
            .ok_or(GenerationError::EmptyUpstreamResponse)
    }

    /// Replace every chapter's `videoUrls` with search results. Results keep
    /// chapter order; a failed search only empties its own chapter.
    async fn attach_videos(&self, course: &mut Course, category: &str, level: &str) {
        let queries: Vec<String> = course
            .chapters
            .iter()
            .map(|chapter| match chapter.video_search_keyword.as_deref().map(str::trim) {
                Some(keyword) if !keyword.is_empty() => keyword.to_string(),
                _ => prompts::chapter_search_query(category, &chapter.chapter_title, level),
            })
            .collect();

        let searches: Vec<_> = queries.iter().map(|query| self.videos.search(query)).collect();
        let results: Vec<Vec<String>> = stream::iter(searches)
            .buffered(self.video_concurrency)
            .collect()
            .await;

        for (index, (chapter, urls)) in course.chapters.iter_mut().zip(results).enumerate() {
            debug!(chapter = index, videos = urls.len(), "Chapter videos attached");
            chapter.video_urls = urls;
        }
    }

    fn metadata(&self, started: Instant, topic: Option<String>, difficulty: Option<String>) -> GenerationMetadata {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        GenerationMetadata {
            request_id: Uuid::new_v4(),
            model: self.model().to_string(),
            generation_time: format!("{elapsed_ms}ms"),
            elapsed_ms,
            timestamp: Utc::now(),
            topic,
            difficulty,
        }
    }
}

/// Truncate an over-long question list to `count`. A list may be missing only
/// when none were asked for.
fn fit_question_list(value: &mut Value, field: &str, count: usize) -> Result<(), SchemaViolation> {
    let doc = value
        .as_object_mut()
        .ok_or_else(|| SchemaViolation::new("$", "must be an object"))?;
    if matches!(doc.get(field), None | Some(Value::Null)) {
        if count > 0 {
            return Err(SchemaViolation::new(field, "is required"));
        }
        doc.insert(field.to_string(), Value::Array(Vec::new()));
    }
    // Wrong types are reported by the schema pass.
    if let Some(Value::Array(items)) = doc.get_mut(field) {
        items.truncate(count);
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, GenerationError> {
    serde_json::from_value(value)
        .map_err(|e| SchemaViolation::new("$", format!("does not match the payload type: {e}")).into())
}
