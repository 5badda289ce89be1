//! Learning Session Controller
//!
//! This module drives a single learner through a generated roadmap. It owns
//! all session state (phase, roadmap, active topic, displayed content, chat
//! transcript) together with the topic content cache, and coordinates the
//! generation service:
//!
//! - Selecting a topic serves it from the cache when possible, otherwise
//!   fetches its content and quiz together and writes the pair through to
//!   the cache.
//! - After every successful load the following topic is prefetched in a
//!   background task. A single prefetch slot bounds speculative work to one
//!   outstanding fetch at a time.
//! - Completion is tracked on the roadmap's own topics, so the course is
//!   complete as soon as the last topic is marked.
//!
//! Every command that sets a loading flag runs its generation call and the
//! write-back in a spawned task. Dropping a command's future detaches that
//! task, so the flag is still cleared when the call resolves.

use crate::cache::{CacheEntry, TopicContentCache};
use crate::certificate::Certificate;
use crate::content::{self, ChatMessage, LearningContent, Mcq, QuizError, QuizResult};
use crate::generation::{ContentGenerator, GenerationError};
use crate::material::{self, KnowledgeLevel, LearningMaterial};
use crate::roadmap::{Roadmap, Topic};
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{Instrument, debug, info, instrument, warn};

/// Topic label sent with a doubt when no topic is selected.
pub const GENERAL_TOPIC_LABEL: &str = "general concepts";

/// Assistant reply appended when a doubt cannot be answered.
pub const DOUBT_FAILURE_REPLY: &str =
    "Sorry, I encountered an error trying to answer your question.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Waiting for learning materials.
    #[default]
    Input,
    /// The roadmap is being generated.
    Generating,
    Learning,
    /// Roadmap generation failed; only a reset leaves this phase.
    Error,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {command} while the session is in the {phase:?} phase")]
    InvalidPhase {
        command: &'static str,
        phase: SessionPhase,
    },
    #[error("Topic '{0}' is not part of the roadmap")]
    UnknownTopic(String),
    #[error("No topic is currently selected")]
    NoActiveTopic,
    #[error("The topic is still loading")]
    ContentLoading,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error("The question is empty")]
    EmptyQuestion,
    #[error("The assistant is still answering the previous question")]
    ChatBusy,
    #[error("The task behind '{0}' stopped before finishing")]
    Interrupted(&'static str),
}

/// How a topic selection was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicLoad {
    /// The topic was already active; nothing changed.
    AlreadyActive,
    /// Served from the cache without a fetch.
    Cached,
    /// Fetched from the generation service and cached.
    Fetched,
    /// The fetch failed and the failure placeholder is displayed.
    Failed,
    /// Another topic was selected, or the session reset, before the fetch
    /// resolved. The displayed state belongs to the newer selection.
    Superseded,
}

/// A point-in-time view of the session for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub error_message: Option<String>,
    pub course_name: String,
    pub knowledge_level: KnowledgeLevel,
    pub materials: Vec<LearningMaterial>,
    pub roadmap: Roadmap,
    pub active_topic: Option<Topic>,
    pub content: Option<LearningContent>,
    pub quiz: Vec<Mcq>,
    pub content_loading: bool,
    pub prefetching_topic: Option<String>,
    pub cached_topics: Vec<String>,
    pub chat: Vec<ChatMessage>,
    pub chat_loading: bool,
    pub completed_topics: usize,
    pub total_topics: usize,
    pub is_complete: bool,
    pub certificate: Option<Certificate>,
}

#[derive(Default)]
struct SessionState {
    phase: SessionPhase,
    error_message: Option<String>,
    materials: Vec<LearningMaterial>,
    knowledge_level: KnowledgeLevel,
    roadmap: Roadmap,
    /// Title of the selected topic; the topic itself lives in `roadmap`.
    active_topic: Option<String>,
    content: Option<LearningContent>,
    quiz: Vec<Mcq>,
    content_loading: bool,
    chat: Vec<ChatMessage>,
    chat_loading: bool,
    cache: TopicContentCache,
    /// The single prefetch slot.
    prefetching: Option<String>,
    prefetch_task: Option<JoinHandle<()>>,
    /// Bumped on reset; results of work issued under an older epoch are dropped.
    epoch: u64,
}

impl SessionState {
    fn expect_phase(&self, expected: SessionPhase, command: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase {
                command,
                phase: self.phase,
            })
        }
    }
}

/// The controller for one learner's session.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct LearningSession {
    generator: Arc<dyn ContentGenerator>,
    state: Arc<Mutex<SessionState>>,
}

impl LearningSession {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            generator,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Generates the roadmap for `materials` and enters the learning phase.
    ///
    /// A generation failure is not returned as an error: it moves the session
    /// into [`SessionPhase::Error`] with a user-facing message. The returned
    /// phase is the one the session ended up in.
    #[instrument(skip(self, materials), fields(materials = materials.len()))]
    pub async fn start_learning(
        &self,
        materials: Vec<LearningMaterial>,
        knowledge_level: KnowledgeLevel,
    ) -> Result<SessionPhase, SessionError> {
        let epoch = {
            let mut state = self.state.lock().await;
            state.expect_phase(SessionPhase::Input, "start learning")?;
            state.materials = materials.clone();
            state.knowledge_level = knowledge_level;
            state.error_message = None;
            state.phase = SessionPhase::Generating;
            state.epoch
        };
        info!("Generating roadmap");

        let session = self.clone();
        let task = tokio::spawn(
            async move {
                session
                    .finish_start(materials, knowledge_level, epoch)
                    .await
            }
            .in_current_span(),
        );
        join_command(task, "start learning").await
    }

    /// Makes `title` the active topic and loads its content and quiz.
    ///
    /// Reselecting the active topic is a no-op. A failed fetch displays the
    /// failure placeholder with an empty quiz; selecting the topic again
    /// retries.
    #[instrument(skip(self))]
    pub async fn select_topic(&self, title: &str) -> Result<TopicLoad, SessionError> {
        let (epoch, materials) = {
            let mut state = self.state.lock().await;
            state.expect_phase(SessionPhase::Learning, "select a topic")?;
            if state.roadmap.topic(title).is_none() {
                return Err(SessionError::UnknownTopic(title.to_string()));
            }
            if state.active_topic.as_deref() == Some(title) {
                return Ok(TopicLoad::AlreadyActive);
            }

            state.active_topic = Some(title.to_string());
            state.content = None;
            state.quiz.clear();
            state.content_loading = true;

            if let Some(entry) = state.cache.get(title).cloned() {
                debug!("Serving topic from cache");
                state.content = Some(entry.content);
                state.quiz = entry.quiz;
                state.content_loading = false;
                self.schedule_prefetch(&mut state, title);
                return Ok(TopicLoad::Cached);
            }
            (state.epoch, state.materials.clone())
        };
        info!("Cache miss; fetching topic content and quiz");

        let session = self.clone();
        let title = title.to_string();
        let task = tokio::spawn(
            async move { session.finish_topic_load(title, materials, epoch).await }
                .in_current_span(),
        );
        join_command(task, "select a topic").await
    }

    /// Starts prefetching the topic after `current_title`.
    ///
    /// Returns `false` without fetching when there is no following topic, it
    /// is already cached, or another prefetch is still in flight.
    pub async fn prefetch_next(&self, current_title: &str) -> bool {
        let mut state = self.state.lock().await;
        self.schedule_prefetch(&mut state, current_title)
    }

    /// Waits for the in-flight prefetch, if any, to finish.
    pub async fn wait_for_prefetch(&self) {
        let task = self.state.lock().await.prefetch_task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Prefetch task did not finish cleanly");
            }
        }
    }

    /// Marks the topic with `title` as completed.
    ///
    /// Returns `false` when the roadmap has no such topic.
    #[instrument(skip(self))]
    pub async fn mark_topic_complete(&self, title: &str) -> bool {
        let mut state = self.state.lock().await;
        if !state.roadmap.mark_complete(title) {
            warn!("Cannot complete a topic that is not in the roadmap");
            return false;
        }
        let (done, total) = state.roadmap.progress();
        info!(done, total, "Topic completed");
        true
    }

    /// Marks the active topic as completed.
    pub async fn complete_active_topic(&self) -> Result<(), SessionError> {
        let title = self
            .state
            .lock()
            .await
            .active_topic
            .clone()
            .ok_or(SessionError::NoActiveTopic)?;
        self.mark_topic_complete(&title).await;
        Ok(())
    }

    /// Scores the displayed quiz. A passing score completes the active topic.
    #[instrument(skip(self, answers))]
    pub async fn submit_quiz(&self, answers: &[Option<usize>]) -> Result<QuizResult, SessionError> {
        let mut state = self.state.lock().await;
        state.expect_phase(SessionPhase::Learning, "submit a quiz")?;
        let title = state.active_topic.clone().ok_or(SessionError::NoActiveTopic)?;
        if state.content_loading {
            return Err(SessionError::ContentLoading);
        }

        let result = content::score_quiz(&state.quiz, answers)?;
        info!(
            topic = %title,
            score = result.score,
            total = result.total,
            passed = result.passed,
            "Quiz submitted"
        );
        if result.passed {
            state.roadmap.mark_complete(&title);
        }
        Ok(result)
    }

    /// Asks the assistant a follow-up question and appends the exchange to
    /// the transcript. Returns the assistant's message.
    #[instrument(skip(self))]
    pub async fn ask_doubt(&self, question: &str) -> Result<ChatMessage, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let (epoch, transcript, materials, topic) = {
            let mut state = self.state.lock().await;
            state.expect_phase(SessionPhase::Learning, "ask a question")?;
            if state.chat_loading {
                return Err(SessionError::ChatBusy);
            }
            state.chat.push(ChatMessage::user(question));
            state.chat_loading = true;
            let topic = state
                .active_topic
                .clone()
                .unwrap_or_else(|| GENERAL_TOPIC_LABEL.to_string());
            (state.epoch, state.chat.clone(), state.materials.clone(), topic)
        };

        let session = self.clone();
        let question = question.to_string();
        let task = tokio::spawn(
            async move {
                session
                    .finish_doubt(question, transcript, materials, topic, epoch)
                    .await
            }
            .in_current_span(),
        );
        join_command(task, "ask a question").await
    }

    /// Clears every piece of session state and returns to the input phase.
    ///
    /// In-flight fetches are not cancelled; their results are discarded when
    /// they resolve. A prefetch issued before the reset can still be awaited
    /// with [`LearningSession::wait_for_prefetch`].
    #[instrument(skip(self))]
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        let epoch = state.epoch + 1;
        let prefetch_task = state.prefetch_task.take();
        *state = SessionState {
            epoch,
            prefetch_task,
            ..SessionState::default()
        };
        info!("Session reset");
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        let course_name = material::course_name(&state.materials).to_string();
        let (completed_topics, total_topics) = state.roadmap.progress();
        let certificate = Certificate::issue(
            &course_name,
            &state.roadmap,
            chrono::Local::now().date_naive(),
        );
        SessionSnapshot {
            phase: state.phase,
            error_message: state.error_message.clone(),
            course_name,
            knowledge_level: state.knowledge_level,
            materials: state.materials.clone(),
            roadmap: state.roadmap.clone(),
            active_topic: state
                .active_topic
                .as_deref()
                .and_then(|title| state.roadmap.topic(title))
                .cloned(),
            content: state.content.clone(),
            quiz: state.quiz.clone(),
            content_loading: state.content_loading,
            prefetching_topic: state.prefetching.clone(),
            cached_topics: state.cache.titles(),
            chat: state.chat.clone(),
            chat_loading: state.chat_loading,
            completed_topics,
            total_topics,
            is_complete: state.roadmap.is_complete(),
            certificate,
        }
    }

    async fn finish_start(
        &self,
        materials: Vec<LearningMaterial>,
        knowledge_level: KnowledgeLevel,
        epoch: u64,
    ) -> SessionPhase {
        let result = self
            .generator
            .generate_roadmap(&materials, knowledge_level)
            .await
            .and_then(|roadmap| match roadmap.validate() {
                Ok(()) => Ok(roadmap),
                Err(e) => Err(GenerationError::Roadmap(e.into())),
            });

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            info!("Session was reset during roadmap generation; discarding the result");
            return state.phase;
        }
        match result {
            Ok(roadmap) => {
                info!(
                    modules = roadmap.modules().len(),
                    topics = roadmap.topics().count(),
                    "Roadmap ready"
                );
                state.roadmap = roadmap;
                state.phase = SessionPhase::Learning;
            }
            Err(e) => {
                warn!(error = ?e, "Roadmap generation failed");
                state.error_message = Some(e.to_string());
                state.phase = SessionPhase::Error;
            }
        }
        state.phase
    }

    async fn finish_topic_load(
        &self,
        title: String,
        materials: Vec<LearningMaterial>,
        epoch: u64,
    ) -> TopicLoad {
        let result = self.fetch_topic(&title, &materials).await;

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            return TopicLoad::Superseded;
        }
        let still_active = state.active_topic.as_deref() == Some(title.as_str());
        let outcome = match result {
            Ok(entry) => {
                if still_active {
                    state.content = Some(entry.content.clone());
                    state.quiz = entry.quiz.clone();
                }
                state.cache.put(title.as_str(), entry);
                self.schedule_prefetch(&mut state, &title);
                TopicLoad::Fetched
            }
            Err(e) => {
                warn!(error = ?e, "Failed to load topic");
                if still_active {
                    state.content = Some(LearningContent::load_failed(&title));
                    state.quiz.clear();
                }
                TopicLoad::Failed
            }
        };
        if !still_active {
            return TopicLoad::Superseded;
        }
        state.content_loading = false;
        outcome
    }

    async fn finish_doubt(
        &self,
        question: String,
        transcript: Vec<ChatMessage>,
        materials: Vec<LearningMaterial>,
        topic: String,
        epoch: u64,
    ) -> ChatMessage {
        let reply = match self
            .generator
            .answer_doubt(&question, &transcript, &materials, &topic)
            .await
        {
            Ok(answer) => ChatMessage::assistant(answer),
            Err(e) => {
                warn!(error = ?e, "Failed to answer doubt");
                ChatMessage::assistant(DOUBT_FAILURE_REPLY)
            }
        };

        let mut state = self.state.lock().await;
        if state.epoch == epoch {
            state.chat.push(reply.clone());
            state.chat_loading = false;
        }
        reply
    }

    /// Claims the prefetch slot for the successor of `current` and spawns the
    /// fetch. Must be called with the state lock held.
    fn schedule_prefetch(&self, state: &mut SessionState, current: &str) -> bool {
        let Some(next) = state.roadmap.successor_of(current) else {
            return false;
        };
        if state.cache.has(&next.title) {
            return false;
        }
        if let Some(in_flight) = &state.prefetching {
            debug!(in_flight = %in_flight, next = %next.title, "Prefetch slot busy");
            return false;
        }

        let next = next.title.clone();
        info!(topic = %next, "Prefetching next topic");
        state.prefetching = Some(next.clone());

        let session = self.clone();
        let materials = state.materials.clone();
        let epoch = state.epoch;
        let span = tracing::info_span!("prefetch", topic = %next);
        state.prefetch_task = Some(tokio::spawn(
            async move { session.run_prefetch(next, materials, epoch).await }.instrument(span),
        ));
        true
    }

    async fn run_prefetch(&self, title: String, materials: Vec<LearningMaterial>, epoch: u64) {
        let result = self.fetch_topic(&title, &materials).await;

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            return;
        }
        match result {
            Ok(entry) => {
                state.cache.put(title, entry);
                info!("Prefetch complete");
            }
            Err(e) => warn!(error = ?e, "Prefetch failed; the topic will load on demand"),
        }
        state.prefetching = None;
        state.prefetch_task = None;
    }

    /// Fetches content and quiz together. Both run to completion; the pair
    /// fails if either half fails.
    async fn fetch_topic(
        &self,
        title: &str,
        materials: &[LearningMaterial],
    ) -> Result<CacheEntry, GenerationError> {
        let (content, quiz) = tokio::join!(
            self.generator.generate_learning_content(title, materials),
            self.generator.generate_mcqs(title, materials),
        );
        Ok(CacheEntry {
            content: content?,
            quiz: quiz?,
        })
    }
}

/// Awaits a command's spawned task. The task only fails to finish if it
/// panicked or the runtime shut down.
async fn join_command<T>(task: JoinHandle<T>, command: &'static str) -> Result<T, SessionError> {
    task.await.map_err(|e| {
        warn!(error = %e, command, "Session task did not finish");
        SessionError::Interrupted(command)
    })
}
