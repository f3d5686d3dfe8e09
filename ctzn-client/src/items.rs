//! Community items: who may transfer them, transfer form validation, and
//! community member listing for the recipient picker.

use async_trait::async_trait;
use ctzn_types::{CommunityMember, Item, Permission, TransferItemRequest, UserLookup, UserRef};
use thiserror::Error;

use crate::api::{ApiError, ApiResult};
use crate::permissions::{has_permission, CapabilityChecker};

/// Page size used when listing community members
pub const MEMBER_PAGE_SIZE: usize = 100;

/// Upper bound on member pages fetched by [`list_all_members`]
pub const MAX_MEMBER_PAGES: usize = 1000;

/// Backend calls needed to view and transfer items
#[async_trait]
pub trait ItemBackend: Send + Sync {
    /// One page of members, keys strictly greater than `gt`
    async fn list_members(
        &self,
        community_id: &str,
        gt: Option<&str>,
        limit: usize,
    ) -> ApiResult<Vec<CommunityMember>>;

    async fn lookup_user(&self, user_id: &str) -> ApiResult<UserLookup>;

    async fn transfer_item(&self, community_id: &str, request: &TransferItemRequest) -> ApiResult<()>;
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Quantity must be a number greater than zero")]
    InvalidQuantity,

    #[error("{0} is already the owner")]
    AlreadyOwner(String),

    #[error("Failed to lookup recp details: {0}")]
    Lookup(String),

    #[error("{0}")]
    Backend(#[from] ApiError),
}

/// Raw transfer form input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferForm {
    pub recipient: String,
    pub qty: String,
}

impl TransferForm {
    /// Form prefilled the way it first opens: the community as recipient, one unit
    pub fn new(community_id: &str) -> Self {
        Self {
            recipient: community_id.to_string(),
            qty: "1".to_string(),
        }
    }
}

/// Check form fields that need no network access, returning the quantity
pub fn validate_transfer(form: &TransferForm, item: &Item) -> Result<u64, TransferError> {
    let qty = match form.qty.trim().parse::<u64>() {
        Ok(qty) if qty >= 1 => qty,
        _ => return Err(TransferError::InvalidQuantity),
    };
    if form.recipient == item.value.owner.user_id {
        return Err(TransferError::AlreadyOwner(form.recipient.clone()));
    }
    Ok(qty)
}

/// Whether the current user may transfer `item`: owners always can, others
/// need the transfer-unowned-item permission in the community.
pub async fn can_transfer_item(
    checker: &dyn CapabilityChecker,
    community_id: &str,
    item: &Item,
) -> ApiResult<bool> {
    if checker.current_user_id() == Some(item.value.owner.user_id.as_str()) {
        return Ok(true);
    }
    has_permission(checker, community_id, Permission::TransferUnownedItem).await
}

/// Validate the form, resolve the recipient and run the transfer
pub async fn transfer_item(
    backend: &dyn ItemBackend,
    community_id: &str,
    item: &Item,
    form: &TransferForm,
) -> Result<(), TransferError> {
    let qty = validate_transfer(form, item)?;

    let recp: UserRef = match backend.lookup_user(&form.recipient).await {
        Ok(lookup) => lookup
            .into_user_ref()
            .ok_or_else(|| TransferError::Lookup("webfinger lookup failed".to_string()))?,
        Err(e) => return Err(TransferError::Lookup(e.to_string())),
    };

    let request = TransferItemRequest {
        item_key: item.key.clone(),
        qty,
        recp,
    };
    backend.transfer_item(community_id, &request).await?;
    log::info!(
        "transferred {} x{} in {} to {}",
        item.key,
        qty,
        community_id,
        request.recp.user_id
    );
    Ok(())
}

/// Fetch every member of a community, page by page.
///
/// Stops at the first short page, or after [`MAX_MEMBER_PAGES`] pages.
pub async fn list_all_members(
    backend: &dyn ItemBackend,
    community_id: &str,
) -> ApiResult<Vec<CommunityMember>> {
    let mut members: Vec<CommunityMember> = Vec::new();
    let mut gt: Option<String> = None;
    for _ in 0..MAX_MEMBER_PAGES {
        let page = backend
            .list_members(community_id, gt.as_deref(), MEMBER_PAGE_SIZE)
            .await?;
        let is_last = page.len() < MEMBER_PAGE_SIZE;
        gt = page.last().map(|m| m.key.clone());
        members.extend(page);
        if is_last {
            break;
        }
    }
    Ok(members)
}

/// View state of an item popup
#[derive(Debug, Clone, Default)]
pub struct ItemView {
    pub can_transfer: bool,
    pub is_transfer_form_open: bool,
    pub is_data_open: bool,
    pub is_processing: bool,
    pub current_error: Option<String>,
    /// Recipient choices for the transfer form
    pub members: Vec<CommunityMember>,
}

impl ItemView {
    pub async fn load(
        checker: &dyn CapabilityChecker,
        backend: &dyn ItemBackend,
        community_id: &str,
        item: &Item,
    ) -> ApiResult<Self> {
        let can_transfer = can_transfer_item(checker, community_id, item).await?;
        let members = list_all_members(backend, community_id).await?;
        log::debug!("item {} loaded with {} members", item.key, members.len());
        Ok(Self {
            can_transfer,
            members,
            ..Default::default()
        })
    }

    /// Toggling the form closes the raw data panel
    pub fn toggle_transfer_form(&mut self) {
        self.is_transfer_form_open = !self.is_transfer_form_open;
        self.is_data_open = false;
    }

    /// Toggling the raw data panel closes the form
    pub fn toggle_data(&mut self) {
        self.is_data_open = !self.is_data_open;
        self.is_transfer_form_open = false;
    }

    pub fn is_doing_something(&self) -> bool {
        self.is_processing || self.is_transfer_form_open
    }

    pub fn should_close_on_escape(&self) -> bool {
        !self.is_doing_something()
    }

    /// Submit the transfer form. Returns true once the transfer went through.
    pub async fn submit(
        &mut self,
        backend: &dyn ItemBackend,
        community_id: &str,
        item: &Item,
        form: &TransferForm,
    ) -> bool {
        self.is_processing = true;
        self.current_error = None;
        let result = transfer_item(backend, community_id, item, form).await;
        self.is_processing = false;
        match result {
            Ok(()) => {
                self.is_transfer_form_open = false;
                true
            }
            Err(e) => {
                self.current_error = Some(e.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::testing::StaticCapabilities;
    use ctzn_types::{ItemValue, MemberValue};
    use std::sync::Mutex;

    fn item() -> Item {
        Item {
            key: "item1".to_string(),
            value: ItemValue {
                class_id: "gold".to_string(),
                qty: 10,
                owner: UserRef {
                    user_id: "alice@example.com".to_string(),
                    db_url: "hyper://alice".to_string(),
                },
            },
        }
    }

    fn member(n: usize) -> CommunityMember {
        CommunityMember {
            key: format!("m{:05}", n),
            value: MemberValue {
                user: UserRef {
                    user_id: format!("user{}@example.com", n),
                    db_url: format!("hyper://user{}", n),
                },
            },
        }
    }

    #[derive(Default)]
    struct FakeItems {
        total_members: usize,
        page_requests: Mutex<Vec<Option<String>>>,
        lookup: Option<UserLookup>,
        transfers: Mutex<Vec<TransferItemRequest>>,
    }

    #[async_trait]
    impl ItemBackend for FakeItems {
        async fn list_members(
            &self,
            _community_id: &str,
            gt: Option<&str>,
            limit: usize,
        ) -> ApiResult<Vec<CommunityMember>> {
            self.page_requests.lock().unwrap().push(gt.map(String::from));
            let all: Vec<CommunityMember> = (0..self.total_members).map(member).collect();
            Ok(all
                .into_iter()
                .filter(|m| gt.map(|g| m.key.as_str() > g).unwrap_or(true))
                .take(limit)
                .collect())
        }

        async fn lookup_user(&self, user_id: &str) -> ApiResult<UserLookup> {
            self.lookup
                .clone()
                .ok_or_else(|| ApiError::NotFound(user_id.to_string()))
        }

        async fn transfer_item(&self, _community_id: &str, request: &TransferItemRequest) -> ApiResult<()> {
            self.transfers.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    fn form(recipient: &str, qty: &str) -> TransferForm {
        TransferForm {
            recipient: recipient.to_string(),
            qty: qty.to_string(),
        }
    }

    #[test]
    fn test_quantity_validation() {
        for bad in ["0", "-1", "abc", "", "1.5"] {
            let err = validate_transfer(&form("bob", bad), &item()).unwrap_err();
            assert_eq!(err.to_string(), "Quantity must be a number greater than zero");
        }
        assert_eq!(validate_transfer(&form("bob", " 3 "), &item()).unwrap(), 3);
    }

    #[test]
    fn test_cannot_transfer_to_owner() {
        let err = validate_transfer(&form("alice@example.com", "1"), &item()).unwrap_err();
        assert_eq!(err.to_string(), "alice@example.com is already the owner");
    }

    #[test]
    fn test_form_defaults() {
        let f = TransferForm::new("community@example.com");
        assert_eq!(f.recipient, "community@example.com");
        assert_eq!(f.qty, "1");
    }

    #[tokio::test]
    async fn test_list_all_members_paginates_until_short_page() {
        let backend = FakeItems {
            total_members: 250,
            ..Default::default()
        };
        let members = list_all_members(&backend, "c").await.unwrap();
        assert_eq!(members.len(), 250);
        assert_eq!(members[249].key, "m00249");

        let requests = backend.page_requests.lock().unwrap();
        assert_eq!(
            *requests,
            vec![None, Some("m00099".to_string()), Some("m00199".to_string())]
        );
    }

    #[tokio::test]
    async fn test_list_all_members_exact_multiple_fetches_empty_page() {
        let backend = FakeItems {
            total_members: 200,
            ..Default::default()
        };
        let members = list_all_members(&backend, "c").await.unwrap();
        assert_eq!(members.len(), 200);
        assert_eq!(backend.page_requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_owner_can_transfer_without_permission() {
        let caps = StaticCapabilities::signed_in("alice@example.com");
        assert!(can_transfer_item(&caps, "c", &item()).await.unwrap());

        let mut other = StaticCapabilities::signed_in("bob@example.com");
        assert!(!can_transfer_item(&other, "c", &item()).await.unwrap());
        other
            .roles
            .insert(("c".to_string(), Permission::TransferUnownedItem));
        assert!(can_transfer_item(&other, "c", &item()).await.unwrap());
    }

    #[tokio::test]
    async fn test_transfer_requires_complete_lookup() {
        let backend = FakeItems {
            lookup: Some(UserLookup {
                user_id: Some("bob@example.com".to_string()),
                db_url: None,
            }),
            ..Default::default()
        };
        let err = transfer_item(&backend, "c", &item(), &form("bob@example.com", "2"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to lookup recp details: webfinger lookup failed");
        assert!(backend.transfers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_item_view_submit_flow() {
        let backend = FakeItems {
            lookup: Some(UserLookup {
                user_id: Some("bob@example.com".to_string()),
                db_url: Some("hyper://bob".to_string()),
            }),
            total_members: 120,
            ..Default::default()
        };
        let caps = StaticCapabilities::signed_in("alice@example.com");
        let mut view = ItemView::load(&caps, &backend, "c", &item()).await.unwrap();
        assert!(view.can_transfer);
        assert_eq!(view.members.len(), 120);
        assert_eq!(view.members[0].value.user.user_id, "user0@example.com");
        assert_eq!(backend.page_requests.lock().unwrap().len(), 2);
        assert!(view.should_close_on_escape());

        view.toggle_data();
        assert!(view.is_data_open);
        view.toggle_transfer_form();
        assert!(view.is_transfer_form_open);
        assert!(!view.is_data_open);
        assert!(!view.should_close_on_escape());

        assert!(!view.submit(&backend, "c", &item(), &form("bob@example.com", "0")).await);
        assert_eq!(
            view.current_error.as_deref(),
            Some("Quantity must be a number greater than zero")
        );

        assert!(view.submit(&backend, "c", &item(), &form("bob@example.com", "4")).await);
        assert!(view.current_error.is_none());
        assert!(!view.is_processing);
        let transfers = backend.transfers.lock().unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].qty, 4);
        assert_eq!(transfers[0].recp.db_url, "hyper://bob");
    }
}
