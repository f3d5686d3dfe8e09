//! Thread view state: the focused subject, the loaded thread and the reply
//! composer, with loads tagged by generation so stale results are dropped.

use ctzn_types::{Post, RecordRef};

use crate::api::ApiResult;
use crate::composer::{ComposerError, ReplyBackend, ReplyComposer, ReplyTarget};
use crate::logging::LogConfig;
use crate::permissions::{check_interaction, CapabilityChecker, Interaction};
use crate::thread::{load_thread, PostSource, Projection, Thread, ThreadLoadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Issued by [`ThreadView::begin_load`]; a result is only applied while its
/// ticket is current
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    subject: RecordRef,
}

impl LoadTicket {
    pub fn subject(&self) -> &RecordRef {
        &self.subject
    }
}

#[derive(Debug)]
pub struct ThreadView {
    subject: RecordRef,
    generation: u64,
    status: LoadStatus,
    thread: Option<Thread>,
    interaction: Option<Interaction>,
    composer: ReplyComposer,
    log_config: LogConfig,
}

impl ThreadView {
    pub fn new(subject: RecordRef, max_reply_chars: usize, log_config: LogConfig) -> Self {
        Self {
            subject,
            generation: 0,
            status: LoadStatus::Idle,
            thread: None,
            interaction: None,
            composer: ReplyComposer::new(max_reply_chars).with_log_config(log_config.clone()),
            log_config,
        }
    }

    pub fn subject(&self) -> &RecordRef {
        &self.subject
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    pub fn composer(&self) -> &ReplyComposer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ReplyComposer {
        &mut self.composer
    }

    pub fn interaction(&self) -> Option<&Interaction> {
        self.interaction.as_ref()
    }

    /// Display groups for the loaded thread, highlighting the subject
    pub fn groups(&self) -> Option<Projection<'_>> {
        self.thread.as_ref().map(|t| t.project(&self.subject))
    }

    /// Focus another post. The old tree and any in-flight load are discarded.
    pub fn set_subject(&mut self, subject: RecordRef) {
        if subject.db_url == self.subject.db_url {
            return;
        }
        log_thread_load!(self.log_config, "subject changed to {}", subject.db_url);
        self.subject = subject;
        self.generation += 1;
        self.thread = None;
        self.interaction = None;
        self.status = LoadStatus::Idle;
        if self.composer.is_open() {
            self.composer.reset();
        }
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        LoadTicket {
            generation: self.generation,
            subject: self.subject.clone(),
        }
    }

    /// Apply a load result. Returns false, leaving the view untouched, when
    /// the ticket has been superseded.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Thread, ThreadLoadError>) -> bool {
        if ticket.generation != self.generation || ticket.subject.db_url != self.subject.db_url {
            log_thread_load!(
                self.log_config,
                "discarding stale load {} for {}",
                ticket.generation,
                ticket.subject.db_url
            );
            return false;
        }
        match result {
            Ok(thread) => {
                log_thread_load!(self.log_config, "thread ready: {} posts", thread.len());
                self.thread = Some(thread);
                self.status = LoadStatus::Loaded;
            }
            Err(e) => {
                log::error!("{}", e);
                self.status = LoadStatus::Failed(e.to_string());
            }
        }
        true
    }

    /// Load the thread for the current subject
    pub async fn load(&mut self, source: &dyn PostSource) -> bool {
        let ticket = self.begin_load();
        let result = load_thread(source, ticket.subject(), &self.log_config).await;
        self.finish_load(ticket, result)
    }

    /// Post the subject resolves to in the loaded thread
    fn subject_post(&self) -> Option<&Post> {
        let thread = self.thread.as_ref()?;
        thread.find(&self.subject.db_url).map(|n| &n.post)
    }

    /// Re-check whether the viewer may reply to the subject
    pub async fn refresh_capability(&mut self, checker: &dyn CapabilityChecker) -> ApiResult<()> {
        self.interaction = match self.subject_post() {
            Some(post) => Some(check_interaction(checker, post).await?),
            None => None,
        };
        log_debug!(self.log_config, "interaction: {:?}", self.interaction);
        Ok(())
    }

    /// Open the composer for a reply to the subject
    pub fn start_reply(&mut self) -> Result<(), ComposerError> {
        match &self.interaction {
            Some(interaction) if interaction.allowed => {}
            Some(interaction) => {
                return Err(ComposerError::NotPermitted(
                    interaction.tooltip.clone().unwrap_or_default(),
                ))
            }
            None => {
                return Err(ComposerError::NotPermitted(
                    "interaction has not been checked".to_string(),
                ))
            }
        }
        let (root, parent) = match (self.thread.as_ref(), self.subject_post()) {
            (Some(thread), Some(parent)) => (thread.root_post(), parent),
            _ => {
                return Err(ComposerError::NotPermitted(
                    "thread is not loaded".to_string(),
                ))
            }
        };
        let target = ReplyTarget {
            subject: root.reference(),
            parent: parent.reference(),
            community: root.value.community.clone(),
        };
        self.composer.open(target)
    }

    pub fn cancel_reply(&mut self) -> Result<(), ComposerError> {
        self.composer.cancel()
    }

    /// Publish the draft, then reload the thread so the reply shows up
    pub async fn submit_reply(
        &mut self,
        backend: &dyn ReplyBackend,
        source: &dyn PostSource,
    ) -> Result<Post, ComposerError> {
        let post = self.composer.submit(backend).await?;
        log_composer!(self.log_config, "published {}", post.url);
        self.load(source).await;
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::ComposerState;
    use crate::permissions::testing::StaticCapabilities;
    use crate::thread::testing::{sample_thread, url};

    fn subject(key: &str) -> RecordRef {
        RecordRef::new("alice", url("alice", key))
    }

    fn view(key: &str) -> ThreadView {
        ThreadView::new(subject(key), 256, LogConfig::disabled())
    }

    #[test]
    fn test_stale_ticket_after_subject_change_is_discarded() {
        let mut view = view("a");
        let ticket = view.begin_load();
        assert_eq!(view.status(), &LoadStatus::Loading);

        view.set_subject(subject("b"));
        assert!(!view.finish_load(ticket, Ok(sample_thread())));
        assert!(view.thread().is_none());
        assert_eq!(view.status(), &LoadStatus::Idle);
    }

    #[test]
    fn test_only_latest_of_overlapping_loads_applies() {
        let mut view = view("a");
        let first = view.begin_load();
        let second = view.begin_load();
        assert!(view.finish_load(second, Ok(sample_thread())));
        assert!(!view.finish_load(first, Ok(sample_thread())));
        assert_eq!(view.status(), &LoadStatus::Loaded);
    }

    #[test]
    fn test_groups_highlight_subject() {
        let mut view = view("c");
        let ticket = view.begin_load();
        view.finish_load(ticket, Ok(sample_thread()));
        let groups = view.groups().unwrap();
        let highlighted: Vec<_> = groups
            .walk()
            .filter(|g| g.is_highlighted)
            .map(|g| g.post.key.clone())
            .collect();
        assert_eq!(highlighted, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_start_reply_is_gated() {
        let mut view = view("a");
        assert!(matches!(view.start_reply(), Err(ComposerError::NotPermitted(_))));

        let ticket = view.begin_load();
        view.finish_load(ticket, Ok(sample_thread()));

        let caps = StaticCapabilities::signed_in("carol");
        view.refresh_capability(&caps).await.unwrap();
        assert!(!view.interaction().unwrap().allowed);
        assert!(matches!(view.start_reply(), Err(ComposerError::NotPermitted(_))));

        let mut caps = StaticCapabilities::signed_in("carol");
        caps.followers.insert("alice".to_string());
        view.refresh_capability(&caps).await.unwrap();
        view.start_reply().unwrap();
        assert!(view.composer().is_open());

        view.set_subject(subject("b"));
        assert!(!view.composer().is_open());
        assert!(view.interaction().is_none());
    }

    /// Backend that never answers
    struct Unresponsive;

    #[async_trait::async_trait]
    impl ReplyBackend for Unresponsive {
        async fn submit_reply(
            &self,
            _subject: &RecordRef,
            _parent: &RecordRef,
            _body: &crate::composer::ReplyBody,
        ) -> ApiResult<Post> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_abandoned_submit_does_not_outlive_subject_change() {
        let mut view = view("a");
        let ticket = view.begin_load();
        view.finish_load(ticket, Ok(sample_thread()));
        let mut caps = StaticCapabilities::signed_in("carol");
        caps.followers.insert("alice".to_string());
        view.refresh_capability(&caps).await.unwrap();
        view.start_reply().unwrap();
        view.composer_mut().edit("never arrives").unwrap();

        let submit = view.composer_mut().submit(&Unresponsive);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), submit).await;
        assert!(timed_out.is_err());
        assert_eq!(view.composer().state().name(), "Submitting");

        view.set_subject(subject("b"));
        assert!(!view.composer().is_open());

        let ticket = view.begin_load();
        view.finish_load(ticket, Ok(sample_thread()));
        view.refresh_capability(&caps).await.unwrap();
        view.start_reply().unwrap();
        match view.composer().state() {
            ComposerState::Composing { target, .. } => {
                assert_eq!(target.parent.db_url, url("alice", "b"))
            }
            other => panic!("unexpected state {:?}", other),
        }
    }
}
