//! Genesis transaction
//!
//! The first block of the sandbox engine: roles, the default domain, the
//! admin account, and any extra accounts a scenario needs.

use crate::commands::{Command, RolePermission};
use crate::config::GenesisConfig;
use crate::crypto::PublicKey;
use crate::types::{now_millis, ReducedPayload, Transaction};

pub const ADMIN_ROLE: &str = "admin";

/// Permissions of the default role given to ordinary accounts
pub const USER_PERMISSIONS: &[RolePermission] = &[
    RolePermission::CanAddSignatory,
    RolePermission::CanRemoveSignatory,
    RolePermission::CanSetQuorum,
    RolePermission::CanTransfer,
    RolePermission::CanReceive,
    RolePermission::CanGetMyAccount,
    RolePermission::CanGetMySignatories,
    RolePermission::CanGetMyAccAst,
    RolePermission::CanGetMyAccDetail,
    RolePermission::CanGetMyAccTxs,
    RolePermission::CanGetMyAccAstTxs,
    RolePermission::CanGetMyTxs,
    RolePermission::CanGetBlocks,
    RolePermission::CanReadAssets,
    RolePermission::CanGrantCanSetMyQuorum,
    RolePermission::CanGrantCanAddMySignatory,
    RolePermission::CanGrantCanRemoveMySignatory,
    RolePermission::CanGrantCanTransferMyAssets,
    RolePermission::CanGrantCanSetMyAccountDetail,
];

/// Every role permission
pub fn all_permissions() -> Vec<RolePermission> {
    (0i32..)
        .map_while(|value| RolePermission::try_from(value).ok())
        .collect()
}

/// Builder for the genesis transaction
#[derive(Debug, Clone)]
pub struct GenesisBuilder {
    domain_id: String,
    default_role: String,
    admin_account_name: String,
    commands: Vec<Command>,
}

impl GenesisBuilder {
    pub fn new(config: &GenesisConfig) -> Self {
        Self {
            domain_id: config.domain_id.clone(),
            default_role: config.default_role.clone(),
            admin_account_name: config.admin_account_name.clone(),
            commands: Vec::new(),
        }
    }

    pub fn admin_account_id(&self) -> String {
        format!("{}@{}", self.admin_account_name, self.domain_id)
    }

    pub fn domain_id(&self) -> &str {
        &self.domain_id
    }

    /// Add an account with the given signatories and quorum
    pub fn account(mut self, name: &str, keys: &[PublicKey], quorum: u32) -> Self {
        let account_id = format!("{}@{}", name, self.domain_id);
        let Some((first, rest)) = keys.split_first() else {
            return self;
        };
        self.commands
            .push(Command::create_account(name, self.domain_id.clone(), first.to_hex()));
        for key in rest {
            self.commands
                .push(Command::add_signatory(account_id.clone(), key.to_hex()));
        }
        if quorum > 1 {
            self.commands
                .push(Command::set_account_quorum(account_id, quorum));
        }
        self
    }

    /// Create an asset and credit it to the admin account
    pub fn asset(mut self, name: &str, precision: u32, admin_balance: Option<&str>) -> Self {
        self.commands
            .push(Command::create_asset(name, self.domain_id.clone(), precision));
        if let Some(amount) = admin_balance {
            self.commands.push(Command::add_asset_quantity(
                format!("{}#{}", name, self.domain_id),
                amount,
            ));
        }
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Assemble the genesis transaction, created by the admin account
    pub fn build(self, admin_key: &PublicKey) -> Transaction {
        let admin_id = self.admin_account_id();
        let mut commands = vec![
            Command::create_role(ADMIN_ROLE, &all_permissions()),
            Command::create_role(self.default_role.clone(), USER_PERMISSIONS),
            Command::create_domain(self.domain_id.clone(), self.default_role.clone()),
            Command::create_account(
                self.admin_account_name.clone(),
                self.domain_id.clone(),
                admin_key.to_hex(),
            ),
            Command::append_role(admin_id.clone(), ADMIN_ROLE),
        ];
        commands.extend(self.commands);

        Transaction::from_reduced(ReducedPayload {
            commands,
            creator_account_id: admin_id,
            created_time: now_millis(),
            quorum: 1,
        })
    }
}
