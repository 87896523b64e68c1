//! Commands Module
//!
//! Closed set of ledger commands. Each variant of [`CommandKind`] carries a
//! strongly typed message; the wire tags follow the engine's `Command` oneof.

use serde::{Deserialize, Serialize};

/// Wrapper message around a single command variant
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Command {
    #[prost(
        oneof = "CommandKind",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16"
    )]
    pub command: Option<CommandKind>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Oneof)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    #[prost(message, tag = "1")]
    AddAssetQuantity(AddAssetQuantity),
    #[prost(message, tag = "2")]
    AddPeer(AddPeer),
    #[prost(message, tag = "3")]
    AddSignatory(AddSignatory),
    #[prost(message, tag = "4")]
    AppendRole(AppendRole),
    #[prost(message, tag = "5")]
    CreateAccount(CreateAccount),
    #[prost(message, tag = "6")]
    CreateAsset(CreateAsset),
    #[prost(message, tag = "7")]
    CreateDomain(CreateDomain),
    #[prost(message, tag = "8")]
    CreateRole(CreateRole),
    #[prost(message, tag = "9")]
    DetachRole(DetachRole),
    #[prost(message, tag = "10")]
    GrantPermission(GrantPermission),
    #[prost(message, tag = "11")]
    RemoveSignatory(RemoveSignatory),
    #[prost(message, tag = "12")]
    RevokePermission(RevokePermission),
    #[prost(message, tag = "13")]
    SetAccountDetail(SetAccountDetail),
    #[prost(message, tag = "14")]
    SetAccountQuorum(SetAccountQuorum),
    #[prost(message, tag = "15")]
    SubtractAssetQuantity(SubtractAssetQuantity),
    #[prost(message, tag = "16")]
    TransferAsset(TransferAsset),
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::AddAssetQuantity(_) => "AddAssetQuantity",
            CommandKind::AddPeer(_) => "AddPeer",
            CommandKind::AddSignatory(_) => "AddSignatory",
            CommandKind::AppendRole(_) => "AppendRole",
            CommandKind::CreateAccount(_) => "CreateAccount",
            CommandKind::CreateAsset(_) => "CreateAsset",
            CommandKind::CreateDomain(_) => "CreateDomain",
            CommandKind::CreateRole(_) => "CreateRole",
            CommandKind::DetachRole(_) => "DetachRole",
            CommandKind::GrantPermission(_) => "GrantPermission",
            CommandKind::RemoveSignatory(_) => "RemoveSignatory",
            CommandKind::RevokePermission(_) => "RevokePermission",
            CommandKind::SetAccountDetail(_) => "SetAccountDetail",
            CommandKind::SetAccountQuorum(_) => "SetAccountQuorum",
            CommandKind::SubtractAssetQuantity(_) => "SubtractAssetQuantity",
            CommandKind::TransferAsset(_) => "TransferAsset",
        }
    }
}

impl Command {
    pub fn kind(&self) -> Option<&CommandKind> {
        self.command.as_ref()
    }

    pub fn name(&self) -> &'static str {
        self.kind().map(CommandKind::name).unwrap_or("Empty")
    }

    pub fn add_asset_quantity(asset_id: impl Into<String>, amount: impl Into<String>) -> Self {
        AddAssetQuantity {
            asset_id: asset_id.into(),
            amount: amount.into(),
        }
        .into()
    }

    pub fn subtract_asset_quantity(asset_id: impl Into<String>, amount: impl Into<String>) -> Self {
        SubtractAssetQuantity {
            asset_id: asset_id.into(),
            amount: amount.into(),
        }
        .into()
    }

    pub fn create_domain(domain_id: impl Into<String>, default_role: impl Into<String>) -> Self {
        CreateDomain {
            domain_id: domain_id.into(),
            default_role: default_role.into(),
        }
        .into()
    }

    pub fn create_asset(asset_name: impl Into<String>, domain_id: impl Into<String>, precision: u32) -> Self {
        CreateAsset {
            asset_name: asset_name.into(),
            domain_id: domain_id.into(),
            precision,
        }
        .into()
    }

    pub fn create_account(
        account_name: impl Into<String>,
        domain_id: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        CreateAccount {
            account_name: account_name.into(),
            domain_id: domain_id.into(),
            public_key: public_key.into(),
        }
        .into()
    }

    pub fn add_signatory(account_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        AddSignatory {
            account_id: account_id.into(),
            public_key: public_key.into(),
        }
        .into()
    }

    pub fn remove_signatory(account_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        RemoveSignatory {
            account_id: account_id.into(),
            public_key: public_key.into(),
        }
        .into()
    }

    pub fn set_account_quorum(account_id: impl Into<String>, quorum: u32) -> Self {
        SetAccountQuorum {
            account_id: account_id.into(),
            quorum,
        }
        .into()
    }

    pub fn set_account_detail(
        account_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        SetAccountDetail {
            account_id: account_id.into(),
            key: key.into(),
            value: value.into(),
        }
        .into()
    }

    pub fn transfer_asset(
        src_account_id: impl Into<String>,
        dest_account_id: impl Into<String>,
        asset_id: impl Into<String>,
        description: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        TransferAsset {
            src_account_id: src_account_id.into(),
            dest_account_id: dest_account_id.into(),
            asset_id: asset_id.into(),
            description: description.into(),
            amount: amount.into(),
        }
        .into()
    }

    pub fn append_role(account_id: impl Into<String>, role_name: impl Into<String>) -> Self {
        AppendRole {
            account_id: account_id.into(),
            role_name: role_name.into(),
        }
        .into()
    }

    pub fn detach_role(account_id: impl Into<String>, role_name: impl Into<String>) -> Self {
        DetachRole {
            account_id: account_id.into(),
            role_name: role_name.into(),
        }
        .into()
    }

    pub fn create_role(role_name: impl Into<String>, permissions: &[RolePermission]) -> Self {
        CreateRole {
            role_name: role_name.into(),
            permissions: permissions.iter().map(|p| *p as i32).collect(),
        }
        .into()
    }

    pub fn grant_permission(account_id: impl Into<String>, permission: GrantablePermission) -> Self {
        GrantPermission {
            account_id: account_id.into(),
            permission: permission as i32,
        }
        .into()
    }

    pub fn revoke_permission(account_id: impl Into<String>, permission: GrantablePermission) -> Self {
        RevokePermission {
            account_id: account_id.into(),
            permission: permission as i32,
        }
        .into()
    }

    pub fn add_peer(address: impl Into<String>, peer_key: impl Into<String>) -> Self {
        AddPeer {
            peer: Some(Peer {
                address: address.into(),
                peer_key: peer_key.into(),
            }),
        }
        .into()
    }
}

macro_rules! impl_into_command {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Command {
                fn from(value: $variant) -> Self {
                    Command {
                        command: Some(CommandKind::$variant(value)),
                    }
                }
            }
        )*
    };
}

impl_into_command!(
    AddAssetQuantity,
    AddPeer,
    AddSignatory,
    AppendRole,
    CreateAccount,
    CreateAsset,
    CreateDomain,
    CreateRole,
    DetachRole,
    GrantPermission,
    RemoveSignatory,
    RevokePermission,
    SetAccountDetail,
    SetAccountQuorum,
    SubtractAssetQuantity,
    TransferAsset,
);

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AddAssetQuantity {
    #[prost(string, tag = "1")]
    pub asset_id: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Peer {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(string, tag = "2")]
    pub peer_key: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AddPeer {
    #[prost(message, optional, tag = "1")]
    pub peer: Option<Peer>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AddSignatory {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub public_key: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AppendRole {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub role_name: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct CreateAccount {
    #[prost(string, tag = "1")]
    pub account_name: String,
    #[prost(string, tag = "2")]
    pub domain_id: String,
    #[prost(string, tag = "3")]
    pub public_key: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct CreateAsset {
    #[prost(string, tag = "1")]
    pub asset_name: String,
    #[prost(string, tag = "2")]
    pub domain_id: String,
    #[prost(uint32, tag = "3")]
    pub precision: u32,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct CreateDomain {
    #[prost(string, tag = "1")]
    pub domain_id: String,
    #[prost(string, tag = "2")]
    pub default_role: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct CreateRole {
    #[prost(string, tag = "1")]
    pub role_name: String,
    #[prost(enumeration = "RolePermission", repeated, tag = "2")]
    pub permissions: Vec<i32>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct DetachRole {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub role_name: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GrantPermission {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(enumeration = "GrantablePermission", tag = "2")]
    pub permission: i32,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct RemoveSignatory {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub public_key: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct RevokePermission {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(enumeration = "GrantablePermission", tag = "2")]
    pub permission: i32,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct SetAccountDetail {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub key: String,
    #[prost(string, tag = "3")]
    pub value: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct SetAccountQuorum {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(uint32, tag = "2")]
    pub quorum: u32,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct SubtractAssetQuantity {
    #[prost(string, tag = "1")]
    pub asset_id: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct TransferAsset {
    #[prost(string, tag = "1")]
    pub src_account_id: String,
    #[prost(string, tag = "2")]
    pub dest_account_id: String,
    #[prost(string, tag = "3")]
    pub asset_id: String,
    #[prost(string, tag = "4")]
    pub description: String,
    #[prost(string, tag = "5")]
    pub amount: String,
}

/// Role permissions, in schema declaration order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ::prost::Enumeration)]
#[repr(i32)]
pub enum RolePermission {
    CanAppendRole = 0,
    CanCreateRole = 1,
    CanDetachRole = 2,
    CanAddAssetQty = 3,
    CanSubtractAssetQty = 4,
    CanAddPeer = 5,
    CanAddSignatory = 6,
    CanRemoveSignatory = 7,
    CanSetQuorum = 8,
    CanCreateAccount = 9,
    CanSetDetail = 10,
    CanCreateAsset = 11,
    CanTransfer = 12,
    CanReceive = 13,
    CanCreateDomain = 14,
    CanReadAssets = 15,
    CanGetRoles = 16,
    CanGetMyAccount = 17,
    CanGetAllAccounts = 18,
    CanGetDomainAccounts = 19,
    CanGetMySignatories = 20,
    CanGetAllSignatories = 21,
    CanGetDomainSignatories = 22,
    CanGetMyAccAst = 23,
    CanGetAllAccAst = 24,
    CanGetDomainAccAst = 25,
    CanGetMyAccDetail = 26,
    CanGetAllAccDetail = 27,
    CanGetDomainAccDetail = 28,
    CanGetMyAccTxs = 29,
    CanGetAllAccTxs = 30,
    CanGetDomainAccTxs = 31,
    CanGetMyAccAstTxs = 32,
    CanGetAllAccAstTxs = 33,
    CanGetDomainAccAstTxs = 34,
    CanGetMyTxs = 35,
    CanGetAllTxs = 36,
    CanGetBlocks = 37,
    CanGrantCanSetMyQuorum = 38,
    CanGrantCanAddMySignatory = 39,
    CanGrantCanRemoveMySignatory = 40,
    CanGrantCanTransferMyAssets = 41,
    CanGrantCanSetMyAccountDetail = 42,
}

/// Permissions one account can grant to another over its own resources
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ::prost::Enumeration)]
#[repr(i32)]
pub enum GrantablePermission {
    CanAddMySignatory = 0,
    CanRemoveMySignatory = 1,
    CanSetMyQuorum = 2,
    CanSetMyAccountDetail = 3,
    CanTransferMyAssets = 4,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_constructors_pick_matching_variant() {
        let cmd = Command::transfer_asset("alice@test", "bob@test", "coin#test", "", "1.00");
        match cmd.kind() {
            Some(CommandKind::TransferAsset(t)) => {
                assert_eq!(t.src_account_id, "alice@test");
                assert_eq!(t.amount, "1.00");
            }
            _ => panic!("Expected TransferAsset"),
        }
        assert_eq!(cmd.name(), "TransferAsset");
        assert_eq!(Command::default().name(), "Empty");
    }

    #[test]
    fn test_wire_tag_of_variant() {
        // Field 14 (set_account_quorum), length-delimited: key byte is 14 << 3 | 2
        let bytes = Command::set_account_quorum("alice@test", 2).encode_to_vec();
        assert_eq!(bytes[0], (14 << 3) | 2);
    }

    #[test]
    fn test_create_role_keeps_permission_order() {
        let cmd = Command::create_role(
            "exchanger",
            &[RolePermission::CanTransfer, RolePermission::CanReceive],
        );
        match cmd.kind() {
            Some(CommandKind::CreateRole(r)) => assert_eq!(r.permissions, vec![12, 13]),
            _ => panic!("Expected CreateRole"),
        }
    }
}
