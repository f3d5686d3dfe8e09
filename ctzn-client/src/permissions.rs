//! Who may interact with a post, and community role permissions.

use async_trait::async_trait;
use ctzn_types::{Permission, Post};

use crate::api::ApiResult;

/// Capabilities the current user can hold within a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Member of the community identified by the scope
    CommunityMember,
    /// The user identified by the scope follows the current user
    FollowedBy,
    /// A role permission granted within the community identified by the scope
    Role(Permission),
}

/// Authorization collaborator for the signed-in user
#[async_trait]
pub trait CapabilityChecker: Send + Sync {
    /// Whether the current user holds `capability` within `scope_id`
    async fn current_user_capability(&self, scope_id: &str, capability: Capability)
        -> ApiResult<bool>;

    /// User id of the signed-in user, if any
    fn current_user_id(&self) -> Option<&str>;
}

/// The scope that governs interaction with a post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionScope<'a> {
    Community { user_id: &'a str },
    Author { user_id: &'a str, display_name: &'a str },
}

impl<'a> InteractionScope<'a> {
    pub fn of(post: &'a Post) -> Self {
        match &post.value.community {
            Some(community) => InteractionScope::Community {
                user_id: &community.user_id,
            },
            None => InteractionScope::Author {
                user_id: &post.author.user_id,
                display_name: &post.author.display_name,
            },
        }
    }

    fn requirement(&self) -> (&'a str, Capability) {
        match *self {
            InteractionScope::Community { user_id } => (user_id, Capability::CommunityMember),
            InteractionScope::Author { user_id, .. } => (user_id, Capability::FollowedBy),
        }
    }

    /// Explanation shown when the current user may not interact
    pub fn denied_tooltip(&self) -> String {
        match self {
            InteractionScope::Community { user_id } => {
                format!("Only members of {} can interact with this post", user_id)
            }
            InteractionScope::Author { display_name, .. } => format!(
                "Only people followed by {} can interact with this post",
                display_name
            ),
        }
    }
}

/// Outcome of an interaction check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub allowed: bool,
    /// Set when `allowed` is false
    pub tooltip: Option<String>,
}

/// Decide whether the current user may reply to or otherwise interact with `post`
pub async fn check_interaction(
    checker: &dyn CapabilityChecker,
    post: &Post,
) -> ApiResult<Interaction> {
    let scope = InteractionScope::of(post);
    let (scope_id, capability) = scope.requirement();
    let allowed = checker.current_user_id().is_some()
        && checker.current_user_capability(scope_id, capability).await?;
    Ok(Interaction {
        allowed,
        tooltip: (!allowed).then(|| scope.denied_tooltip()),
    })
}

pub async fn can_interact(checker: &dyn CapabilityChecker, post: &Post) -> ApiResult<bool> {
    Ok(check_interaction(checker, post).await?.allowed)
}

/// Whether the current user holds `permission` in `community_id`
pub async fn has_permission(
    checker: &dyn CapabilityChecker,
    community_id: &str,
    permission: Permission,
) -> ApiResult<bool> {
    if checker.current_user_id().is_none() {
        return Ok(false);
    }
    checker
        .current_user_capability(community_id, Capability::Role(permission))
        .await
}
