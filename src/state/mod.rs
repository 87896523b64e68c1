//! World State Module
//!
//! In-memory world state of the sandbox engine and the command executor
//! that validates and applies transactions against it.
//! - WorldState: domains, assets, accounts, roles, peers, grants
//! - executor: signatory and quorum checks, per-command semantics
//! - GenesisBuilder: the initial transaction that seeds the world

mod amount;
mod executor;
mod genesis;
mod world;

pub use amount::{format_amount, parse_amount};
pub use executor::{
    apply_genesis, apply_transaction, check_signatories, codes, CommandError, CommandExecutor,
    StatefulError,
};
pub use genesis::{all_permissions, GenesisBuilder, ADMIN_ROLE, USER_PERMISSIONS};
pub use world::{domain_of, AccountState, AssetDefinition, Domain, WorldState};
