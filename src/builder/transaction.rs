use crate::commands::Command;
use crate::error::ValidationError;
use crate::types::{now_millis, ReducedPayload, Transaction};
use crate::validation::Validator;
use tracing::debug;

/// Builder for unsigned transactions
///
/// # Example
/// ```
/// use batch_coordinator::builder::TransactionBuilder;
/// use batch_coordinator::commands::Command;
///
/// let tx = TransactionBuilder::new("alice@test")
///     .command(Command::set_account_detail("alice@test", "age", "18"))
///     .quorum(2)
///     .build()
///     .unwrap();
/// assert!(tx.signatures.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    creator_account_id: String,
    commands: Vec<Command>,
    quorum: u32,
    created_time: Option<u64>,
    validator: Validator,
}

impl TransactionBuilder {
    pub fn new(creator_account_id: impl Into<String>) -> Self {
        Self {
            creator_account_id: creator_account_id.into(),
            commands: Vec::new(),
            quorum: 1,
            created_time: None,
            validator: Validator::default(),
        }
    }

    /// Use custom validation limits instead of the defaults
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }

    pub fn quorum(mut self, quorum: u32) -> Self {
        self.quorum = quorum;
        self
    }

    /// Creation time in milliseconds; defaults to the current time
    pub fn created_time(mut self, created_time: u64) -> Self {
        self.created_time = Some(created_time);
        self
    }

    /// Validate and assemble the transaction
    ///
    /// # Returns
    /// * `Ok(Transaction)` with no signatures and no batch meta
    /// * `Err(ValidationError)` describing the first malformed field
    pub fn build(self) -> Result<Transaction, ValidationError> {
        let now = now_millis();
        let payload = ReducedPayload {
            commands: self.commands,
            creator_account_id: self.creator_account_id,
            created_time: self.created_time.unwrap_or(now),
            quorum: self.quorum,
        };

        self.validator.validate_reduced(&payload, now)?;

        let tx = Transaction::from_reduced(payload);
        debug!(
            "Built transaction {} for {} ({} commands)",
            tx.hash(),
            tx.creator_account_id(),
            tx.commands().len()
        );
        Ok(tx)
    }
}

/// Build an unsigned transaction created now
pub fn build(
    creator_account_id: impl Into<String>,
    commands: Vec<Command>,
    quorum: u32,
) -> Result<Transaction, ValidationError> {
    TransactionBuilder::new(creator_account_id)
        .commands(commands)
        .quorum(quorum)
        .build()
}
