//! Stateful validation and command execution
//!
//! Every command checks the creator's permissions and the current world
//! state, then mutates it. Transactions are applied to a copy of the world
//! and the copy is kept only when every command succeeds.

use super::amount::parse_amount;
use super::world::{AccountState, AssetDefinition, Domain, WorldState};
use crate::commands::{Command, CommandKind, GrantablePermission, RolePermission};
use crate::types::Transaction;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::debug;

/// Command error codes reported in `ToriiResponse::error_code`
pub mod codes {
    pub const NO_PERMISSION: u32 = 2;
    pub const NOT_FOUND: u32 = 3;
    pub const INVALID_STATE: u32 = 4;
    pub const INSUFFICIENT_BALANCE: u32 = 5;
    pub const SIGNATURES: u32 = 6;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{command} failed with code {code}: {reason}")]
pub struct CommandError {
    pub command: &'static str,
    pub code: u32,
    pub reason: String,
}

/// Stateful validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatefulError {
    #[error("Creator account {0} does not exist")]
    NoCreator(String),

    #[error("Key {key} is not a signatory of {account}")]
    UnknownSignatory { key: String, account: String },

    #[error("Not enough signatures for {account}: {got} of {required}")]
    NotEnoughSignatures {
        account: String,
        got: usize,
        required: u32,
    },

    #[error("Command #{index} failed: {error}")]
    Command { index: usize, error: CommandError },
}

impl StatefulError {
    pub fn failed_cmd_index(&self) -> u32 {
        match self {
            StatefulError::Command { index, .. } => *index as u32,
            _ => 0,
        }
    }

    pub fn error_code(&self) -> u32 {
        match self {
            StatefulError::Command { error, .. } => error.code,
            _ => codes::SIGNATURES,
        }
    }
}

/// Check that the signatures satisfy the creator account
///
/// Every signing key must be a signatory of the creator, and the number of
/// distinct signing keys must reach the account quorum.
pub fn check_signatories(world: &WorldState, tx: &Transaction) -> Result<(), StatefulError> {
    let creator = tx.creator_account_id();
    let account = world
        .account(creator)
        .ok_or_else(|| StatefulError::NoCreator(creator.to_string()))?;

    let mut keys = HashSet::new();
    for signature in &tx.signatures {
        if !account.has_signatory(&signature.public_key) {
            return Err(StatefulError::UnknownSignatory {
                key: signature.public_key.clone(),
                account: creator.to_string(),
            });
        }
        keys.insert(signature.public_key.to_lowercase());
    }

    if keys.len() < account.quorum as usize {
        return Err(StatefulError::NotEnoughSignatures {
            account: creator.to_string(),
            got: keys.len(),
            required: account.quorum,
        });
    }
    Ok(())
}

/// Validate and apply one transaction
///
/// On error `world` is left untouched.
pub fn apply_transaction(world: &mut WorldState, tx: &Transaction) -> Result<(), StatefulError> {
    check_signatories(world, tx)?;
    execute_commands(world, tx, true)
}

/// Apply a genesis transaction: no signature or permission checks
pub fn apply_genesis(world: &mut WorldState, tx: &Transaction) -> Result<(), StatefulError> {
    execute_commands(world, tx, false)
}

fn execute_commands(
    world: &mut WorldState,
    tx: &Transaction,
    check_permissions: bool,
) -> Result<(), StatefulError> {
    let mut scratch = world.clone();
    let mut executor = CommandExecutor {
        world: &mut scratch,
        creator: tx.creator_account_id(),
        check_permissions,
    };
    for (index, command) in tx.commands().iter().enumerate() {
        executor
            .execute(command)
            .map_err(|error| StatefulError::Command { index, error })?;
    }
    *world = scratch;
    Ok(())
}

/// Executes commands on behalf of one creator
pub struct CommandExecutor<'a> {
    world: &'a mut WorldState,
    creator: &'a str,
    check_permissions: bool,
}

fn fail(command: &'static str, code: u32, reason: impl Into<String>) -> CommandError {
    CommandError {
        command,
        code,
        reason: reason.into(),
    }
}

impl<'a> CommandExecutor<'a> {
    pub fn new(world: &'a mut WorldState, creator: &'a str) -> Self {
        Self {
            world,
            creator,
            check_permissions: true,
        }
    }

    pub fn execute(&mut self, command: &Command) -> Result<(), CommandError> {
        let kind = command
            .kind()
            .ok_or_else(|| fail("Empty", codes::INVALID_STATE, "command is not set"))?;
        let name = kind.name();
        debug!("Executing {} for {}", name, self.creator);

        match kind {
            CommandKind::AddAssetQuantity(cmd) => {
                self.require(name, RolePermission::CanAddAssetQty)?;
                let amount = self.amount(name, &cmd.asset_id, &cmd.amount)?;
                let creator = self.creator.to_string();
                let account = self.account_mut(name, &creator)?;
                let balance = account.balances.entry(cmd.asset_id.clone()).or_insert(0);
                *balance = balance
                    .checked_add(amount)
                    .ok_or_else(|| fail(name, codes::INVALID_STATE, "balance overflow"))?;
                Ok(())
            }
            CommandKind::SubtractAssetQuantity(cmd) => {
                self.require(name, RolePermission::CanSubtractAssetQty)?;
                let amount = self.amount(name, &cmd.asset_id, &cmd.amount)?;
                let creator = self.creator.to_string();
                let account = self.account_mut(name, &creator)?;
                let balance = account.balances.entry(cmd.asset_id.clone()).or_insert(0);
                *balance = balance
                    .checked_sub(amount)
                    .ok_or_else(|| fail(name, codes::INSUFFICIENT_BALANCE, "not enough balance"))?;
                Ok(())
            }
            CommandKind::AddPeer(cmd) => {
                self.require(name, RolePermission::CanAddPeer)?;
                let peer = cmd
                    .peer
                    .clone()
                    .ok_or_else(|| fail(name, codes::INVALID_STATE, "peer is not set"))?;
                if self.world.peers.iter().any(|p| p.peer_key == peer.peer_key) {
                    return Err(fail(name, codes::INVALID_STATE, "peer already exists"));
                }
                self.world.peers.push(peer);
                Ok(())
            }
            CommandKind::AddSignatory(cmd) => {
                self.require_own_or_granted(
                    name,
                    &cmd.account_id,
                    RolePermission::CanAddSignatory,
                    GrantablePermission::CanAddMySignatory,
                )?;
                let account = self.account_mut(name, &cmd.account_id)?;
                if account.has_signatory(&cmd.public_key) {
                    return Err(fail(name, codes::INVALID_STATE, "signatory already exists"));
                }
                account.signatories.push(cmd.public_key.to_lowercase());
                Ok(())
            }
            CommandKind::RemoveSignatory(cmd) => {
                self.require_own_or_granted(
                    name,
                    &cmd.account_id,
                    RolePermission::CanRemoveSignatory,
                    GrantablePermission::CanRemoveMySignatory,
                )?;
                let account = self.account_mut(name, &cmd.account_id)?;
                let key = cmd.public_key.to_lowercase();
                let position = account
                    .signatories
                    .iter()
                    .position(|s| *s == key)
                    .ok_or_else(|| fail(name, codes::NOT_FOUND, "no such signatory"))?;
                if account.signatories.len() as u32 <= account.quorum {
                    return Err(fail(
                        name,
                        codes::INVALID_STATE,
                        "signatory count would drop below quorum",
                    ));
                }
                account.signatories.remove(position);
                Ok(())
            }
            CommandKind::SetAccountQuorum(cmd) => {
                self.require_own_or_granted(
                    name,
                    &cmd.account_id,
                    RolePermission::CanSetQuorum,
                    GrantablePermission::CanSetMyQuorum,
                )?;
                let account = self.account_mut(name, &cmd.account_id)?;
                if cmd.quorum == 0 || cmd.quorum as usize > account.signatories.len() {
                    return Err(fail(
                        name,
                        codes::INVALID_STATE,
                        format!(
                            "quorum {} exceeds signatory count {}",
                            cmd.quorum,
                            account.signatories.len()
                        ),
                    ));
                }
                account.quorum = cmd.quorum;
                Ok(())
            }
            CommandKind::AppendRole(cmd) => {
                self.require(name, RolePermission::CanAppendRole)?;
                let role = self
                    .world
                    .roles
                    .get(&cmd.role_name)
                    .cloned()
                    .ok_or_else(|| fail(name, codes::NOT_FOUND, "no such role"))?;
                self.require_all(name, &role)?;
                let account = self.account_mut(name, &cmd.account_id)?;
                if account.roles.contains(&cmd.role_name) {
                    return Err(fail(name, codes::INVALID_STATE, "role already appended"));
                }
                account.roles.push(cmd.role_name.clone());
                Ok(())
            }
            CommandKind::DetachRole(cmd) => {
                self.require(name, RolePermission::CanDetachRole)?;
                let account = self.account_mut(name, &cmd.account_id)?;
                let position = account
                    .roles
                    .iter()
                    .position(|r| *r == cmd.role_name)
                    .ok_or_else(|| fail(name, codes::NOT_FOUND, "account has no such role"))?;
                account.roles.remove(position);
                Ok(())
            }
            CommandKind::CreateRole(cmd) => {
                self.require(name, RolePermission::CanCreateRole)?;
                let permissions = cmd
                    .permissions
                    .iter()
                    .map(|p| RolePermission::try_from(*p).ok())
                    .collect::<Option<BTreeSet<_>>>()
                    .ok_or_else(|| fail(name, codes::INVALID_STATE, "unknown permission"))?;
                self.require_all(name, &permissions)?;
                if self.world.roles.contains_key(&cmd.role_name) {
                    return Err(fail(name, codes::INVALID_STATE, "role already exists"));
                }
                self.world.roles.insert(cmd.role_name.clone(), permissions);
                Ok(())
            }
            CommandKind::CreateAccount(cmd) => {
                self.require(name, RolePermission::CanCreateAccount)?;
                let domain = self
                    .world
                    .domains
                    .get(&cmd.domain_id)
                    .ok_or_else(|| fail(name, codes::NOT_FOUND, "no such domain"))?;
                let account_id = format!("{}@{}", cmd.account_name, cmd.domain_id);
                if self.world.accounts.contains_key(&account_id) {
                    return Err(fail(name, codes::INVALID_STATE, "account already exists"));
                }
                let account = AccountState::new(
                    account_id.clone(),
                    cmd.domain_id.clone(),
                    cmd.public_key.clone(),
                    domain.default_role.clone(),
                );
                self.world.accounts.insert(account_id, account);
                Ok(())
            }
            CommandKind::CreateAsset(cmd) => {
                self.require(name, RolePermission::CanCreateAsset)?;
                if !self.world.domains.contains_key(&cmd.domain_id) {
                    return Err(fail(name, codes::NOT_FOUND, "no such domain"));
                }
                let asset_id = format!("{}#{}", cmd.asset_name, cmd.domain_id);
                if self.world.assets.contains_key(&asset_id) {
                    return Err(fail(name, codes::INVALID_STATE, "asset already exists"));
                }
                self.world.assets.insert(
                    asset_id.clone(),
                    AssetDefinition {
                        asset_id,
                        domain_id: cmd.domain_id.clone(),
                        precision: cmd.precision,
                    },
                );
                Ok(())
            }
            CommandKind::CreateDomain(cmd) => {
                self.require(name, RolePermission::CanCreateDomain)?;
                if !self.world.roles.contains_key(&cmd.default_role) {
                    return Err(fail(name, codes::NOT_FOUND, "no such default role"));
                }
                if self.world.domains.contains_key(&cmd.domain_id) {
                    return Err(fail(name, codes::INVALID_STATE, "domain already exists"));
                }
                self.world.domains.insert(
                    cmd.domain_id.clone(),
                    Domain {
                        domain_id: cmd.domain_id.clone(),
                        default_role: cmd.default_role.clone(),
                    },
                );
                Ok(())
            }
            CommandKind::GrantPermission(cmd) => {
                let permission = GrantablePermission::try_from(cmd.permission)
                    .map_err(|_| fail(name, codes::INVALID_STATE, "unknown permission"))?;
                self.require(name, grant_role_for(permission))?;
                self.account_mut(name, &cmd.account_id)?;
                let grant = (self.creator.to_string(), cmd.account_id.clone(), permission);
                if !self.world.grants.insert(grant) {
                    return Err(fail(name, codes::INVALID_STATE, "permission already granted"));
                }
                Ok(())
            }
            CommandKind::RevokePermission(cmd) => {
                let permission = GrantablePermission::try_from(cmd.permission)
                    .map_err(|_| fail(name, codes::INVALID_STATE, "unknown permission"))?;
                let grant = (self.creator.to_string(), cmd.account_id.clone(), permission);
                if !self.world.grants.remove(&grant) {
                    return Err(fail(name, codes::NOT_FOUND, "permission was not granted"));
                }
                Ok(())
            }
            CommandKind::SetAccountDetail(cmd) => {
                if cmd.account_id != self.creator {
                    self.require_own_or_granted(
                        name,
                        &cmd.account_id,
                        RolePermission::CanSetDetail,
                        GrantablePermission::CanSetMyAccountDetail,
                    )?;
                }
                let writer = self.creator.to_string();
                let account = self.account_mut(name, &cmd.account_id)?;
                account
                    .details
                    .entry(writer)
                    .or_default()
                    .insert(cmd.key.clone(), cmd.value.clone());
                Ok(())
            }
            CommandKind::TransferAsset(cmd) => {
                if cmd.src_account_id == self.creator {
                    self.require(name, RolePermission::CanTransfer)?;
                } else if self.check_permissions
                    && !self.world.is_granted(
                        &cmd.src_account_id,
                        self.creator,
                        GrantablePermission::CanTransferMyAssets,
                    )
                {
                    return Err(fail(name, codes::NO_PERMISSION, "no permission to transfer"));
                }
                if self.world.account(&cmd.dest_account_id).is_none() {
                    return Err(fail(name, codes::NOT_FOUND, "no such destination account"));
                }
                if self.check_permissions
                    && !self
                        .world
                        .has_permission(&cmd.dest_account_id, RolePermission::CanReceive)
                {
                    return Err(fail(name, codes::NO_PERMISSION, "destination cannot receive"));
                }
                let amount = self.amount(name, &cmd.asset_id, &cmd.amount)?;

                let source = self.account_mut(name, &cmd.src_account_id)?;
                let balance = source.balances.entry(cmd.asset_id.clone()).or_insert(0);
                *balance = balance
                    .checked_sub(amount)
                    .ok_or_else(|| fail(name, codes::INSUFFICIENT_BALANCE, "not enough balance"))?;

                let dest = self.account_mut(name, &cmd.dest_account_id)?;
                let balance = dest.balances.entry(cmd.asset_id.clone()).or_insert(0);
                *balance = balance
                    .checked_add(amount)
                    .ok_or_else(|| fail(name, codes::INVALID_STATE, "balance overflow"))?;
                Ok(())
            }
        }
    }

    fn require(&self, name: &'static str, permission: RolePermission) -> Result<(), CommandError> {
        if self.check_permissions && !self.world.has_permission(self.creator, permission) {
            return Err(fail(
                name,
                codes::NO_PERMISSION,
                format!("{} lacks {:?}", self.creator, permission),
            ));
        }
        Ok(())
    }

    /// The creator must already hold every permission it hands out
    fn require_all(
        &self,
        name: &'static str,
        permissions: &BTreeSet<RolePermission>,
    ) -> Result<(), CommandError> {
        if !self.check_permissions {
            return Ok(());
        }
        let held = self.world.permissions_of(self.creator);
        match permissions.iter().find(|p| !held.contains(p)) {
            Some(missing) => Err(fail(
                name,
                codes::NO_PERMISSION,
                format!("{} lacks {:?}", self.creator, missing),
            )),
            None => Ok(()),
        }
    }

    /// Own account needs the role permission; another account needs a grant
    fn require_own_or_granted(
        &self,
        name: &'static str,
        account_id: &str,
        own: RolePermission,
        granted: GrantablePermission,
    ) -> Result<(), CommandError> {
        if account_id == self.creator {
            return self.require(name, own);
        }
        if self.check_permissions && !self.world.is_granted(account_id, self.creator, granted) {
            return Err(fail(
                name,
                codes::NO_PERMISSION,
                format!("{} was not granted {:?} by {}", self.creator, granted, account_id),
            ));
        }
        Ok(())
    }

    fn account_mut(
        &mut self,
        name: &'static str,
        account_id: &str,
    ) -> Result<&mut AccountState, CommandError> {
        self.world
            .account_mut(account_id)
            .ok_or_else(|| fail(name, codes::NOT_FOUND, format!("no such account {}", account_id)))
    }

    fn amount(&self, name: &'static str, asset_id: &str, amount: &str) -> Result<u128, CommandError> {
        let asset = self
            .world
            .asset(asset_id)
            .ok_or_else(|| fail(name, codes::NOT_FOUND, format!("no such asset {}", asset_id)))?;
        parse_amount(amount, asset.precision).map_err(|e| fail(name, codes::INVALID_STATE, e))
    }
}

/// Role permission required to grant a grantable permission
fn grant_role_for(permission: GrantablePermission) -> RolePermission {
    match permission {
        GrantablePermission::CanAddMySignatory => RolePermission::CanGrantCanAddMySignatory,
        GrantablePermission::CanRemoveMySignatory => RolePermission::CanGrantCanRemoveMySignatory,
        GrantablePermission::CanSetMyQuorum => RolePermission::CanGrantCanSetMyQuorum,
        GrantablePermission::CanSetMyAccountDetail => RolePermission::CanGrantCanSetMyAccountDetail,
        GrantablePermission::CanTransferMyAssets => RolePermission::CanGrantCanTransferMyAssets,
    }
}
