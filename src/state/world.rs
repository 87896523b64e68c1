use crate::commands::{GrantablePermission, Peer, RolePermission};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub domain_id: String,
    pub default_role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDefinition {
    pub asset_id: String,
    pub domain_id: String,
    pub precision: u32,
}

/// Account record
///
/// Details are stored per writer: `writer -> key -> value`, which is also
/// the shape of the JSON returned by detail queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: String,
    pub domain_id: String,
    pub quorum: u32,
    /// Lowercase hex public keys, in the order they were added
    pub signatories: Vec<String>,
    pub roles: Vec<String>,
    pub details: BTreeMap<String, BTreeMap<String, String>>,
    /// Asset id -> balance scaled by the asset precision
    pub balances: BTreeMap<String, u128>,
}

impl AccountState {
    pub fn new(account_id: String, domain_id: String, public_key: String, role: String) -> Self {
        Self {
            account_id,
            domain_id,
            quorum: 1,
            signatories: vec![public_key.to_lowercase()],
            roles: vec![role],
            details: BTreeMap::new(),
            balances: BTreeMap::new(),
        }
    }

    pub fn has_signatory(&self, public_key: &str) -> bool {
        let key = public_key.to_lowercase();
        self.signatories.iter().any(|s| *s == key)
    }

    /// Details as JSON, optionally narrowed to one writer and/or one key
    pub fn details_json(&self, writer: Option<&str>, key: Option<&str>) -> Value {
        let mut root = Map::new();
        for (author, entries) in &self.details {
            if writer.is_some_and(|w| w != author.as_str()) {
                continue;
            }
            let mut values = Map::new();
            for (k, v) in entries {
                if key.is_some_and(|wanted| wanted != k.as_str()) {
                    continue;
                }
                values.insert(k.clone(), Value::String(v.clone()));
            }
            if !values.is_empty() {
                root.insert(author.clone(), Value::Object(values));
            }
        }
        Value::Object(root)
    }
}

/// In-memory world state of the sandbox engine
///
/// Plain data so that a transaction or batch can be applied to a clone and
/// discarded on failure.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub domains: HashMap<String, Domain>,
    pub assets: HashMap<String, AssetDefinition>,
    pub accounts: HashMap<String, AccountState>,
    pub roles: HashMap<String, BTreeSet<RolePermission>>,
    pub peers: Vec<Peer>,
    /// (grantor, grantee, permission)
    pub grants: HashSet<(String, String, GrantablePermission)>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, account_id: &str) -> Option<&AccountState> {
        self.accounts.get(account_id)
    }

    pub fn account_mut(&mut self, account_id: &str) -> Option<&mut AccountState> {
        self.accounts.get_mut(account_id)
    }

    pub fn asset(&self, asset_id: &str) -> Option<&AssetDefinition> {
        self.assets.get(asset_id)
    }

    /// Union of the permissions of every role the account holds
    pub fn permissions_of(&self, account_id: &str) -> BTreeSet<RolePermission> {
        self.account(account_id)
            .map(|account| {
                account
                    .roles
                    .iter()
                    .filter_map(|role| self.roles.get(role))
                    .flat_map(|perms| perms.iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_permission(&self, account_id: &str, permission: RolePermission) -> bool {
        self.permissions_of(account_id).contains(&permission)
    }

    pub fn is_granted(&self, grantor: &str, grantee: &str, permission: GrantablePermission) -> bool {
        self.grants
            .contains(&(grantor.to_string(), grantee.to_string(), permission))
    }

    pub fn balance(&self, account_id: &str, asset_id: &str) -> u128 {
        self.account(account_id)
            .and_then(|a| a.balances.get(asset_id).copied())
            .unwrap_or(0)
    }
}

/// Domain part of `name@domain` or `name#domain`
pub fn domain_of(id: &str) -> &str {
    id.rsplit_once(|c| c == '@' || c == '#').map(|(_, d)| d).unwrap_or("")
}
