//! Sandbox Ledger Module
//!
//! In-process engine implementing the same contract as a remote peer:
//! - Ledger: validation, MST pool, stateful commit, queries, expiry loop
//! - StatusBus: latest status per transaction plus live updates
//! - SandboxTransport: the `Transport` implementation over a shared `Ledger`

mod engine;
mod query;
mod sandbox;
mod status_bus;

pub use engine::Ledger;
pub use sandbox::SandboxTransport;
pub use status_bus::StatusBus;

#[cfg(test)]
mod tests;
