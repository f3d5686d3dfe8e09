//! Thread assembly: resolve a subject post to its thread root and fetch the
//! full reply tree beneath it.

mod projection;

pub use projection::{project, DisplayGroup, Projection, Walk};

use async_trait::async_trait;
use ctzn_types::{Post, RecordRef};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

use crate::api::{ApiError, ApiResult};
use crate::logging::LogConfig;

/// Remote source of posts and their direct replies
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch a single post
    async fn fetch_post(&self, author_id: &str, url: &str) -> ApiResult<Post>;

    /// Fetch the direct replies of a post, in the source's natural order
    async fn fetch_replies(&self, author_id: &str, url: &str) -> ApiResult<Vec<Post>>;
}

/// A thread could not be assembled. No partial tree is ever returned.
#[derive(Error, Debug)]
#[error("Failed to load thread at {}: {source}", .reference.db_url)]
pub struct ThreadLoadError {
    /// The record being fetched when the failure happened
    pub reference: RecordRef,
    #[source]
    pub source: ApiError,
}

impl ThreadLoadError {
    fn new(reference: &RecordRef, source: ApiError) -> Self {
        Self {
            reference: reference.clone(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.source, ApiError::NotFound(_))
    }
}

/// A post and its direct replies, each a subtree of its own
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadNode {
    pub post: Post,
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    pub fn new(post: Post) -> Self {
        Self {
            post,
            replies: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.post.url
    }

    /// Number of posts in this subtree, including this one
    pub fn len(&self) -> usize {
        1 + self.replies.iter().map(ThreadNode::len).sum::<usize>()
    }

    pub fn find(&self, url: &str) -> Option<&ThreadNode> {
        if self.post.url == url {
            return Some(self);
        }
        self.replies.iter().find_map(|r| r.find(url))
    }

    fn find_mut(&mut self, url: &str) -> Option<&mut ThreadNode> {
        if self.post.url == url {
            return Some(self);
        }
        self.replies.iter_mut().find_map(|r| r.find_mut(url))
    }
}

/// A root post plus its full reply tree
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    root: ThreadNode,
}

impl Thread {
    pub fn new(root: ThreadNode) -> Self {
        Self { root }
    }

    pub fn root_post(&self) -> &Post {
        &self.root.post
    }

    /// The tree, rooted at the thread's first post
    pub fn tree(&self) -> &ThreadNode {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn find(&self, url: &str) -> Option<&ThreadNode> {
        self.root.find(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.find(url).is_some()
    }

    /// Attach a freshly published reply as a leaf under its parent.
    ///
    /// Returns false when the reply does not belong to this thread or its
    /// parent is not in the tree.
    pub fn append_reply(&mut self, reply: Post) -> bool {
        let Some(reply_ref) = reply.value.reply.as_ref() else {
            return false;
        };
        if reply_ref.root.db_url != self.root.post.url || self.contains(&reply.url) {
            return false;
        }
        let parent_url = reply_ref.effective_parent().db_url.clone();
        match self.root.find_mut(&parent_url) {
            Some(parent) => {
                parent.replies.push(ThreadNode::new(reply));
                true
            }
            None => false,
        }
    }

    /// Project the whole thread, starting with the root group
    pub fn project<'a>(&'a self, subject: &'a RecordRef) -> Projection<'a> {
        project(std::slice::from_ref(&self.root), subject, 0)
    }
}

/// Load the thread containing `subject`.
///
/// When the subject is a reply, its declared root is fetched and the tree is
/// built from there; otherwise the subject is the root.
pub async fn load_thread(
    source: &dyn PostSource,
    subject: &RecordRef,
    log_config: &LogConfig,
) -> Result<Thread, ThreadLoadError> {
    log_thread_load!(log_config, "loading thread for {}", subject.db_url);

    let post = source
        .fetch_post(&subject.author_id, &subject.db_url)
        .await
        .map_err(|e| ThreadLoadError::new(subject, e))?;

    let root_post = match post.value.reply.as_ref() {
        Some(reply) => {
            let root_ref = reply.root.clone();
            source
                .fetch_post(&root_ref.author_id, &root_ref.db_url)
                .await
                .map_err(|e| ThreadLoadError::new(&root_ref, e))?
        }
        None => post,
    };

    let thread = Thread::new(fetch_reply_tree(source, root_post).await?);
    log_thread_load!(
        log_config,
        "loaded thread {} with {} posts",
        thread.root_post().url,
        thread.len()
    );
    Ok(thread)
}

struct Slot {
    post: Post,
    children: Vec<usize>,
}

fn is_reply_to(post: &Post, parent: &RecordRef) -> bool {
    post.value
        .reply
        .as_ref()
        .map(|r| r.effective_parent().db_url == parent.db_url)
        .unwrap_or(false)
}

/// Fetch the reply tree below `root` one level at a time.
///
/// Children keep the order the source returned them in. Replies claiming a
/// different parent, or already placed elsewhere in the tree, are dropped.
async fn fetch_reply_tree(
    source: &dyn PostSource,
    root: Post,
) -> Result<ThreadNode, ThreadLoadError> {
    let mut slots: Vec<Slot> = Vec::new();
    let mut root_children: Vec<usize> = Vec::new();
    let mut seen: HashSet<String> = HashSet::from([root.url.clone()]);
    // None stands for the root
    let mut queue: VecDeque<Option<usize>> = VecDeque::from([None]);

    while let Some(parent) = queue.pop_front() {
        let parent_ref = match parent {
            Some(idx) => slots[idx].post.reference(),
            None => root.reference(),
        };
        let replies = source
            .fetch_replies(&parent_ref.author_id, &parent_ref.db_url)
            .await
            .map_err(|e| ThreadLoadError::new(&parent_ref, e))?;

        for reply in replies {
            if !is_reply_to(&reply, &parent_ref) {
                log::warn!(
                    "dropping {} listed under {}: parent mismatch",
                    reply.url,
                    parent_ref.db_url
                );
                continue;
            }
            if !seen.insert(reply.url.clone()) {
                log::warn!("dropping {}: already in thread", reply.url);
                continue;
            }
            let idx = slots.len();
            slots.push(Slot {
                post: reply,
                children: Vec::new(),
            });
            match parent {
                Some(p) => slots[p].children.push(idx),
                None => root_children.push(idx),
            }
            queue.push_back(Some(idx));
        }
    }

    // Children always sit after their parent, so building from the back
    // finishes every subtree before it is needed.
    let mut built: HashMap<usize, ThreadNode> = HashMap::with_capacity(slots.len());
    while let Some(slot) = slots.pop() {
        let idx = slots.len();
        let replies = slot
            .children
            .iter()
            .filter_map(|c| built.remove(c))
            .collect();
        built.insert(
            idx,
            ThreadNode {
                post: slot.post,
                replies,
            },
        );
    }

    Ok(ThreadNode {
        replies: root_children
            .iter()
            .filter_map(|c| built.remove(c))
            .collect(),
        post: root,
    })
}
