//! Reply composer state machine.
//!
//! `Idle -> Composing -> Submitting -> (Idle | Error)`, where `Error` keeps
//! the draft so the user can retry or cancel.

use async_trait::async_trait;
use ctzn_types::{CommunityRef, Post, RecordRef};
use thiserror::Error;

use crate::api::{ApiError, ApiResult};
use crate::logging::LogConfig;

/// Default maximum reply length, in characters
pub const DEFAULT_MAX_REPLY_CHARS: usize = 256;

/// Backend method that publishes replies
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    /// Publish `body` as a reply to `parent` inside the thread rooted at `subject`
    async fn submit_reply(
        &self,
        subject: &RecordRef,
        parent: &RecordRef,
        body: &ReplyBody,
    ) -> ApiResult<Post>;
}

/// What a reply is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Thread root
    pub subject: RecordRef,
    /// Post being answered (may be the root itself)
    pub parent: RecordRef,
    /// Community the thread lives in, if any
    pub community: Option<CommunityRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyBody {
    pub text: String,
    pub community: Option<CommunityRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerState {
    Idle,
    Composing {
        target: ReplyTarget,
        draft: String,
    },
    Submitting {
        target: ReplyTarget,
        draft: String,
    },
    Error {
        target: ReplyTarget,
        draft: String,
        message: String,
    },
}

impl ComposerState {
    pub fn name(&self) -> &'static str {
        match self {
            ComposerState::Idle => "Idle",
            ComposerState::Composing { .. } => "Composing",
            ComposerState::Submitting { .. } => "Submitting",
            ComposerState::Error { .. } => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerEvent {
    Open(ReplyTarget),
    Edit(String),
    Submit,
    Succeeded,
    Failed(String),
    Cancel,
}

impl ComposerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ComposerEvent::Open(_) => "Open",
            ComposerEvent::Edit(_) => "Edit",
            ComposerEvent::Submit => "Submit",
            ComposerEvent::Succeeded => "Succeeded",
            ComposerEvent::Failed(_) => "Failed",
            ComposerEvent::Cancel => "Cancel",
        }
    }
}

#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("Cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("A reply is already being composed")]
    AlreadyOpen,

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Failed to publish reply: {0}")]
    Submit(#[source] ApiError),
}

/// Check a draft before it is sent
pub fn validate_draft(draft: &str, max_chars: usize) -> Result<String, ComposerError> {
    let text = draft.trim();
    if text.is_empty() {
        return Err(ComposerError::Validation(
            "Cannot post empty reply. Type something first!".to_string(),
        ));
    }
    let char_count = text.chars().count();
    if char_count > max_chars {
        return Err(ComposerError::Validation(format!(
            "Reply exceeds {} characters (current: {})",
            max_chars, char_count
        )));
    }
    Ok(text.to_string())
}

/// Compute the state following `state` on `event`.
///
/// Pure: invalid events are reported as errors and the caller keeps its
/// current state.
pub fn transition(
    state: &ComposerState,
    event: ComposerEvent,
    max_chars: usize,
) -> Result<ComposerState, ComposerError> {
    use ComposerEvent as E;
    use ComposerState as S;

    match (state, event) {
        (S::Idle, E::Open(target)) => Ok(S::Composing {
            target,
            draft: String::new(),
        }),
        (S::Composing { .. } | S::Error { .. } | S::Submitting { .. }, E::Open(_)) => {
            Err(ComposerError::AlreadyOpen)
        }
        (S::Composing { target, .. } | S::Error { target, .. }, E::Edit(draft)) => {
            Ok(S::Composing {
                target: target.clone(),
                draft,
            })
        }
        (S::Composing { target, draft } | S::Error { target, draft, .. }, E::Submit) => {
            validate_draft(draft, max_chars)?;
            Ok(S::Submitting {
                target: target.clone(),
                draft: draft.clone(),
            })
        }
        (S::Submitting { .. }, E::Succeeded) => Ok(S::Idle),
        (S::Submitting { target, draft }, E::Failed(message)) => Ok(S::Error {
            target: target.clone(),
            draft: draft.clone(),
            message,
        }),
        (S::Composing { .. } | S::Error { .. }, E::Cancel) => Ok(S::Idle),
        (state, event) => Err(ComposerError::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

/// Composer owned by a single thread view
#[derive(Debug, Clone)]
pub struct ReplyComposer {
    state: ComposerState,
    max_chars: usize,
    log_config: LogConfig,
}

impl ReplyComposer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            state: ComposerState::Idle,
            max_chars,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn state(&self) -> &ComposerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ComposerState::Idle)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            ComposerState::Idle => None,
            ComposerState::Composing { draft, .. }
            | ComposerState::Submitting { draft, .. }
            | ComposerState::Error { draft, .. } => Some(draft),
        }
    }

    pub fn char_count(&self) -> usize {
        self.draft().map(|d| d.chars().count()).unwrap_or(0)
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ComposerState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Apply `event`; on error the state is left untouched
    pub fn apply(&mut self, event: ComposerEvent) -> Result<(), ComposerError> {
        let from = self.state.name();
        let next = transition(&self.state, event, self.max_chars)?;
        log_composer!(self.log_config, "composer {} -> {}", from, next.name());
        self.state = next;
        Ok(())
    }

    pub fn open(&mut self, target: ReplyTarget) -> Result<(), ComposerError> {
        self.apply(ComposerEvent::Open(target))
    }

    pub fn edit(&mut self, draft: impl Into<String>) -> Result<(), ComposerError> {
        self.apply(ComposerEvent::Edit(draft.into()))
    }

    pub fn cancel(&mut self) -> Result<(), ComposerError> {
        self.apply(ComposerEvent::Cancel)
    }

    /// Drop whatever is in progress and go back to `Idle`, from any state.
    ///
    /// Used when the owning view moves on. A submission whose future was
    /// dropped mid-flight leaves the composer in `Submitting`, which no event
    /// can leave.
    pub fn reset(&mut self) {
        log_composer!(self.log_config, "composer {} reset", self.state.name());
        self.state = ComposerState::Idle;
    }

    /// Validate and publish the draft.
    ///
    /// On success the composer closes and the new reply is returned. On
    /// failure the composer moves to `Error` with the draft intact.
    pub async fn submit(&mut self, backend: &dyn ReplyBackend) -> Result<Post, ComposerError> {
        self.apply(ComposerEvent::Submit)?;
        let (target, text) = match &self.state {
            ComposerState::Submitting { target, draft } => (target.clone(), draft.trim().to_string()),
            other => {
                return Err(ComposerError::InvalidTransition {
                    state: other.name(),
                    event: "Submit",
                })
            }
        };
        let body = ReplyBody {
            text,
            community: target.community.clone(),
        };

        match backend.submit_reply(&target.subject, &target.parent, &body).await {
            Ok(post) => {
                self.apply(ComposerEvent::Succeeded)?;
                Ok(post)
            }
            Err(e) => {
                self.apply(ComposerEvent::Failed(e.to_string()))?;
                Err(ComposerError::Submit(e))
            }
        }
    }
}

impl Default for ReplyComposer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REPLY_CHARS)
    }
}
