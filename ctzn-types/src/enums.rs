use serde::{Deserialize, Serialize};

/// Community role permissions checked through the capability collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "ctzn.network/perm-community-ban")]
    CommunityBan,
    #[serde(rename = "ctzn.network/perm-community-remove-post")]
    CommunityRemovePost,
    #[serde(rename = "ctzn.network/perm-community-edit-profile")]
    CommunityEditProfile,
    #[serde(rename = "ctzn.network/perm-community-manage-roles")]
    CommunityManageRoles,
    #[serde(rename = "ctzn.network/perm-community-assign-roles")]
    CommunityAssignRoles,
    #[serde(rename = "ctzn.network/perm-transfer-unowned-item")]
    TransferUnownedItem,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::CommunityBan,
        Permission::CommunityRemovePost,
        Permission::CommunityEditProfile,
        Permission::CommunityManageRoles,
        Permission::CommunityAssignRoles,
        Permission::TransferUnownedItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CommunityBan => "ctzn.network/perm-community-ban",
            Permission::CommunityRemovePost => "ctzn.network/perm-community-remove-post",
            Permission::CommunityEditProfile => "ctzn.network/perm-community-edit-profile",
            Permission::CommunityManageRoles => "ctzn.network/perm-community-manage-roles",
            Permission::CommunityAssignRoles => "ctzn.network/perm-community-assign-roles",
            Permission::TransferUnownedItem => "ctzn.network/perm-transfer-unowned-item",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    /// Human-readable summary shown next to role assignments
    pub fn description(&self) -> &'static str {
        match self {
            Permission::CommunityBan => "Can remove, ban, and unban members from a community.",
            Permission::CommunityRemovePost => "Can remove posts from the community's feed index.",
            Permission::CommunityEditProfile => "Can edit the profile of the community.",
            Permission::CommunityManageRoles => "Can create, edit, and delete roles.",
            Permission::CommunityAssignRoles => "Can assign roles to community members.",
            Permission::TransferUnownedItem => "Can transfer items owned by other members.",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
