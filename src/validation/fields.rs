//! Field-level checks
//!
//! Naming grammar, numeric ranges and the freshness window. Every check is
//! pure and returns the first violation it finds.

use crate::commands::{Command, CommandKind};
use crate::config::ValidationConfig;
use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

const DOMAIN_PATTERN: &str =
    r"([a-zA-Z]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?";

static NAME: Lazy<Regex> = Lazy::new(|| compile(r"^[a-z_0-9]{1,32}$"));
static DOMAIN: Lazy<Regex> = Lazy::new(|| compile(&format!("^{}$", DOMAIN_PATTERN)));
static ACCOUNT_ID: Lazy<Regex> =
    Lazy::new(|| compile(&format!("^[a-z_0-9]{{1,32}}@{}$", DOMAIN_PATTERN)));
static ASSET_ID: Lazy<Regex> =
    Lazy::new(|| compile(&format!("^[a-z_0-9]{{1,32}}#{}$", DOMAIN_PATTERN)));
static DETAIL_KEY: Lazy<Regex> = Lazy::new(|| compile(r"^[A-Za-z0-9_]{1,64}$"));
static AMOUNT: Lazy<Regex> = Lazy::new(|| compile(r"^[0-9]+(\.[0-9]+)?$"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {}: {}", pattern, e))
}

pub const MAX_DESCRIPTION_SIZE: usize = 64;
pub const MAX_DETAIL_VALUE_SIZE: usize = 4096;
pub const MAX_PRECISION: u32 = 255;
const PUBLIC_KEY_HEX_LEN: usize = 64;

/// Stateless validator for individual fields and commands
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    config: ValidationConfig,
}

impl FieldValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn validate_account_id(&self, account_id: &str) -> Result<(), ValidationError> {
        if ACCOUNT_ID.is_match(account_id) {
            Ok(())
        } else {
            Err(ValidationError::InvalidAccountId(account_id.to_string()))
        }
    }

    pub fn validate_asset_id(&self, asset_id: &str) -> Result<(), ValidationError> {
        if ASSET_ID.is_match(asset_id) {
            Ok(())
        } else {
            Err(ValidationError::InvalidAssetId(asset_id.to_string()))
        }
    }

    /// Account, asset and role names share one grammar
    pub fn validate_name(&self, field: &'static str, value: &str) -> Result<(), ValidationError> {
        if NAME.is_match(value) {
            Ok(())
        } else {
            Err(ValidationError::InvalidName {
                field,
                value: value.to_string(),
            })
        }
    }

    pub fn validate_domain_id(&self, domain_id: &str) -> Result<(), ValidationError> {
        if DOMAIN.is_match(domain_id) {
            Ok(())
        } else {
            Err(ValidationError::InvalidName {
                field: "domain_id",
                value: domain_id.to_string(),
            })
        }
    }

    /// Positive decimal such as `10` or `0.05`
    pub fn validate_amount(&self, amount: &str) -> Result<(), ValidationError> {
        let positive = amount.bytes().any(|b| (b'1'..=b'9').contains(&b));
        if AMOUNT.is_match(amount) && positive {
            Ok(())
        } else {
            Err(ValidationError::InvalidAmount(amount.to_string()))
        }
    }

    /// 32-byte key, hex encoded
    pub fn validate_public_key(&self, public_key: &str) -> Result<(), ValidationError> {
        let well_formed = public_key.len() == PUBLIC_KEY_HEX_LEN
            && public_key.bytes().all(|b| b.is_ascii_hexdigit());
        if well_formed {
            Ok(())
        } else {
            Err(ValidationError::InvalidPublicKey(public_key.to_string()))
        }
    }

    pub fn validate_quorum(&self, quorum: u32) -> Result<(), ValidationError> {
        if quorum == 0 || quorum > self.config.max_quorum {
            return Err(ValidationError::QuorumOutOfRange {
                got: quorum,
                max: self.config.max_quorum,
            });
        }
        Ok(())
    }

    /// Accept `created_time` within `[now - max_delay, now + future_gap]`
    pub fn validate_created_time(&self, timestamp: u64, now: u64) -> Result<(), ValidationError> {
        if timestamp == 0 {
            return Err(ValidationError::MissingCreatedTime);
        }
        if now.saturating_sub(self.config.max_delay_ms) > timestamp {
            return Err(ValidationError::TooOld { timestamp, now });
        }
        if timestamp > now.saturating_add(self.config.future_gap_ms) {
            return Err(ValidationError::FromFuture { timestamp, now });
        }
        Ok(())
    }

    pub fn validate_counter(&self, counter: u64) -> Result<(), ValidationError> {
        if counter == 0 {
            return Err(ValidationError::ZeroCounter);
        }
        Ok(())
    }

    pub fn validate_detail_key(&self, key: &str) -> Result<(), ValidationError> {
        if DETAIL_KEY.is_match(key) {
            Ok(())
        } else {
            Err(ValidationError::InvalidName {
                field: "account_detail_key",
                value: key.to_string(),
            })
        }
    }

    pub fn validate_peer_address(&self, address: &str) -> Result<(), ValidationError> {
        let invalid = || ValidationError::InvalidPeerAddress(address.to_string());
        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        port.parse::<u16>().map_err(|_| invalid())?;
        let ipv4 = host.split('.').count() == 4 && host.split('.').all(|o| o.parse::<u8>().is_ok());
        if ipv4 || DOMAIN.is_match(host) {
            Ok(())
        } else {
            Err(invalid())
        }
    }

    /// Check the fields of one command
    ///
    /// # Arguments
    /// * `index` - Position of the command in its transaction (reported for empty commands)
    /// * `command` - The command to check
    pub fn validate_command(&self, index: usize, command: &Command) -> Result<(), ValidationError> {
        let kind = command.kind().ok_or(ValidationError::EmptyCommand(index))?;
        match kind {
            CommandKind::AddAssetQuantity(cmd) => {
                self.validate_asset_id(&cmd.asset_id)?;
                self.validate_amount(&cmd.amount)
            }
            CommandKind::SubtractAssetQuantity(cmd) => {
                self.validate_asset_id(&cmd.asset_id)?;
                self.validate_amount(&cmd.amount)
            }
            CommandKind::AddPeer(cmd) => {
                let peer = cmd.peer.as_ref().ok_or(ValidationError::EmptyCommand(index))?;
                self.validate_peer_address(&peer.address)?;
                self.validate_public_key(&peer.peer_key)
            }
            CommandKind::AddSignatory(cmd) => {
                self.validate_account_id(&cmd.account_id)?;
                self.validate_public_key(&cmd.public_key)
            }
            CommandKind::RemoveSignatory(cmd) => {
                self.validate_account_id(&cmd.account_id)?;
                self.validate_public_key(&cmd.public_key)
            }
            CommandKind::AppendRole(cmd) => {
                self.validate_account_id(&cmd.account_id)?;
                self.validate_name("role_name", &cmd.role_name)
            }
            CommandKind::DetachRole(cmd) => {
                self.validate_account_id(&cmd.account_id)?;
                self.validate_name("role_name", &cmd.role_name)
            }
            CommandKind::CreateAccount(cmd) => {
                self.validate_name("account_name", &cmd.account_name)?;
                self.validate_domain_id(&cmd.domain_id)?;
                self.validate_public_key(&cmd.public_key)
            }
            CommandKind::CreateAsset(cmd) => {
                self.validate_name("asset_name", &cmd.asset_name)?;
                self.validate_domain_id(&cmd.domain_id)?;
                if cmd.precision > MAX_PRECISION {
                    return Err(ValidationError::InvalidName {
                        field: "precision",
                        value: cmd.precision.to_string(),
                    });
                }
                Ok(())
            }
            CommandKind::CreateDomain(cmd) => {
                self.validate_domain_id(&cmd.domain_id)?;
                self.validate_name("default_role", &cmd.default_role)
            }
            CommandKind::CreateRole(cmd) => {
                self.validate_name("role_name", &cmd.role_name)?;
                if cmd.permissions.is_empty() {
                    return Err(ValidationError::EmptyPermissions);
                }
                Ok(())
            }
            CommandKind::GrantPermission(cmd) => self.validate_account_id(&cmd.account_id),
            CommandKind::RevokePermission(cmd) => self.validate_account_id(&cmd.account_id),
            CommandKind::SetAccountDetail(cmd) => {
                self.validate_account_id(&cmd.account_id)?;
                self.validate_detail_key(&cmd.key)?;
                if cmd.value.len() > MAX_DETAIL_VALUE_SIZE {
                    return Err(ValidationError::DetailTooLong {
                        got: cmd.value.len(),
                        max: MAX_DETAIL_VALUE_SIZE,
                    });
                }
                Ok(())
            }
            CommandKind::SetAccountQuorum(cmd) => {
                self.validate_account_id(&cmd.account_id)?;
                self.validate_quorum(cmd.quorum)
            }
            CommandKind::TransferAsset(cmd) => {
                self.validate_account_id(&cmd.src_account_id)?;
                self.validate_account_id(&cmd.dest_account_id)?;
                self.validate_asset_id(&cmd.asset_id)?;
                if cmd.description.len() > MAX_DESCRIPTION_SIZE {
                    return Err(ValidationError::DescriptionTooLong {
                        got: cmd.description.len(),
                        max: MAX_DESCRIPTION_SIZE,
                    });
                }
                self.validate_amount(&cmd.amount)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> FieldValidator {
        FieldValidator::default()
    }

    #[test]
    fn test_account_id_grammar() {
        let v = validator();
        assert!(v.validate_account_id("alice@test").is_ok());
        assert!(v.validate_account_id("bob_2@sub.domain-1.com").is_ok());
        assert!(v.validate_account_id("Alice@test").is_err());
        assert!(v.validate_account_id("alice").is_err());
        assert!(v.validate_account_id("alice@-bad").is_err());
        assert!(v.validate_account_id(&format!("{}@test", "a".repeat(33))).is_err());
    }

    #[test]
    fn test_asset_id_grammar() {
        let v = validator();
        assert!(v.validate_asset_id("coin#test").is_ok());
        assert!(v.validate_asset_id("coin@test").is_err());
    }

    #[test]
    fn test_quorum_range() {
        let v = validator();
        assert!(v.validate_quorum(1).is_ok());
        assert!(v.validate_quorum(128).is_ok());
        assert_eq!(
            v.validate_quorum(0),
            Err(ValidationError::QuorumOutOfRange { got: 0, max: 128 })
        );
        assert!(v.validate_quorum(129).is_err());
    }

    #[test]
    fn test_freshness_window() {
        let v = validator();
        let now = 10 * 86_400_000;
        assert!(v.validate_created_time(now, now).is_ok());
        assert!(v.validate_created_time(now - 86_400_000, now).is_ok());
        assert_eq!(
            v.validate_created_time(now - 86_400_001, now),
            Err(ValidationError::TooOld {
                timestamp: now - 86_400_001,
                now
            })
        );
        assert!(v.validate_created_time(now + 300_000, now).is_ok());
        assert!(matches!(
            v.validate_created_time(now + 300_001, now),
            Err(ValidationError::FromFuture { .. })
        ));
        assert_eq!(
            v.validate_created_time(0, now),
            Err(ValidationError::MissingCreatedTime)
        );
    }

    #[test]
    fn test_amounts() {
        let v = validator();
        assert!(v.validate_amount("10").is_ok());
        assert!(v.validate_amount("0.05").is_ok());
        assert!(v.validate_amount("0").is_err());
        assert!(v.validate_amount("0.00").is_err());
        assert!(v.validate_amount("-1").is_err());
        assert!(v.validate_amount("1.").is_err());
    }

    #[test]
    fn test_peer_address() {
        let v = validator();
        assert!(v.validate_peer_address("127.0.0.1:10001").is_ok());
        assert!(v.validate_peer_address("node-1.example:50541").is_ok());
        assert!(v.validate_peer_address("127.0.0.1").is_err());
        assert!(v.validate_peer_address("host:99999").is_err());
    }

    #[test]
    fn test_command_fields() {
        let v = validator();
        let key = "a".repeat(64);
        assert!(v
            .validate_command(0, &Command::create_account("bob", "test", key.clone()))
            .is_ok());
        assert!(v
            .validate_command(0, &Command::create_account("bob", "test", "abc"))
            .is_err());
        assert!(v
            .validate_command(0, &Command::transfer_asset("alice@test", "bob@test", "coin#test", "x".repeat(65), "1"))
            .is_err());
        assert!(v
            .validate_command(0, &Command::set_account_detail("alice@test", "bad key", "v"))
            .is_err());
        assert_eq!(
            v.validate_command(3, &Command::default()),
            Err(ValidationError::EmptyCommand(3))
        );
        assert_eq!(
            v.validate_command(0, &Command::create_role("auditor", &[])),
            Err(ValidationError::EmptyPermissions)
        );
    }
}
