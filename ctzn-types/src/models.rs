use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

mod optional_datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_some(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.is_empty() => s
                .parse::<DateTime<Utc>>()
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Pointer to a record: the author who owns it and its database URL.
///
/// Records are compared by URL alone when deciding which post is the
/// subject of a thread view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub author_id: String,
    pub db_url: String,
}

impl RecordRef {
    pub fn new(author_id: impl Into<String>, db_url: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            db_url: db_url.into(),
        }
    }

    /// Schema id of the record, taken from path segments 3..len-1 of the URL.
    ///
    /// `hyper://abc/db/table/ctzn.network/post/key` yields `ctzn.network/post`.
    pub fn schema_id(&self) -> Option<String> {
        let (_, rest) = self.db_url.split_once("://")?;
        let path = match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => return None,
        };
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() < 5 {
            return None;
        }
        Some(parts[3..parts.len() - 1].join("/"))
    }
}

/// A user reference as stored inside records (owners, members, recipients)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: String,
    pub db_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityRef {
    pub user_id: String,
    pub db_url: String,
}

/// Links a reply to its thread root and, when nested, its immediate parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub root: RecordRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RecordRef>,
}

impl ReplyRef {
    /// The post this reply answers. Direct replies to the root omit `parent`.
    pub fn effective_parent(&self) -> &RecordRef {
        self.parent.as_ref().unwrap_or(&self.root)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostValue {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text: Option<String>,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub key: String,
    pub url: String,
    pub author: Author,
    pub value: PostValue,
    /// Reply count computed by the server (if provided)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u32>,
    /// Replies inlined by the server (if provided)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Post>>,
}

impl Post {
    /// Record pointer for this post
    pub fn reference(&self) -> RecordRef {
        RecordRef::new(self.author.user_id.clone(), self.url.clone())
    }

    pub fn is_reply(&self) -> bool {
        self.value.reply.is_some()
    }

    /// Server count when present, else the inlined replies, else zero
    pub fn reply_count(&self) -> usize {
        if let Some(count) = self.reply_count {
            return count as usize;
        }
        self.replies.as_ref().map(|r| r.len()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemValue {
    pub class_id: String,
    pub qty: u64,
    pub owner: UserRef,
}

/// A community-issued item held by one of its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub key: String,
    pub value: ItemValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberValue {
    pub user: UserRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityMember {
    pub key: String,
    pub value: MemberValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub key: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub author: Author,
    pub subject_url: String,
}

/// Result of resolving a user id; either field may be missing when the
/// remote lookup is incomplete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLookup {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub db_url: Option<String>,
}

impl UserLookup {
    pub fn into_user_ref(self) -> Option<UserRef> {
        Some(UserRef {
            user_id: self.user_id?,
            db_url: self.db_url?,
        })
    }
}

/// Information about the signed-in user and their social graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user_id: String,
    pub db_url: String,
    /// Communities the user is a member of
    #[serde(default)]
    pub communities: Vec<String>,
    /// Users who follow the signed-in user
    #[serde(default)]
    pub followers: Vec<String>,
}

// Request/Response types for API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    pub text: String,
    pub reply: ReplyRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<CommunityRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferItemRequest {
    pub item_key: String,
    pub qty: u64,
    pub recp: UserRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub granted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedAtResponse {
    #[serde(default, with = "optional_datetime_format")]
    pub cleared_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
