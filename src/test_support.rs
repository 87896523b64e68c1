//! Sandbox network shared by the end-to-end tests
//!
//! Genesis: admin@test (holds 1000 coin#test, precision 2),
//! alice@test (two keys, quorum 2) and bob@test (one key).

use crate::client::Client;
use crate::commands::Command;
use crate::config::{GenesisConfig, MstConfig, ValidationConfig};
use crate::crypto::PrivateKey;
use crate::ledger::{Ledger, SandboxTransport};
use crate::state::GenesisBuilder;
use std::sync::Arc;

pub struct Network {
    pub ledger: Arc<Ledger>,
    pub transport: SandboxTransport,
    pub admin_key: PrivateKey,
    pub alice_keys: [PrivateKey; 2],
    pub bob_key: PrivateKey,
}

impl Network {
    pub async fn start() -> Self {
        Self::with_mst(MstConfig::default()).await
    }

    pub async fn with_mst(mst: MstConfig) -> Self {
        let admin_key = PrivateKey::generate();
        let alice_keys = [PrivateKey::generate(), PrivateKey::generate()];
        let bob_key = PrivateKey::generate();

        let genesis = GenesisBuilder::new(&GenesisConfig::default())
            .asset("coin", 2, Some("1000"))
            .account(
                "alice",
                &[alice_keys[0].public_key(), alice_keys[1].public_key()],
                2,
            )
            .account("bob", &[bob_key.public_key()], 1)
            .build(&admin_key.public_key());

        let ledger = Arc::new(Ledger::new(ValidationConfig::default(), mst));
        ledger.apply_genesis(genesis).await.unwrap();

        Self {
            transport: SandboxTransport::new(ledger.clone()),
            ledger,
            admin_key,
            alice_keys,
            bob_key,
        }
    }

    pub fn client(&self, account_id: &str, keys: &[PrivateKey]) -> Client<SandboxTransport> {
        Client::new(self.transport.clone(), account_id, keys.to_vec())
    }

    pub fn admin(&self) -> Client<SandboxTransport> {
        self.client("admin@test", std::slice::from_ref(&self.admin_key))
    }

    pub fn alice(&self) -> Client<SandboxTransport> {
        self.client("alice@test", &self.alice_keys)
    }

    pub fn bob(&self) -> Client<SandboxTransport> {
        self.client("bob@test", std::slice::from_ref(&self.bob_key))
    }
}

/// Harmless command an account may always run on itself
pub fn note(account_id: &str, value: &str) -> Command {
    Command::set_account_detail(account_id, "note", value)
}
