use super::fields::FieldValidator;
use crate::config::ValidationConfig;
use crate::crypto::{self, Signable};
use crate::error::ValidationError;
use crate::queries::{BlocksQuery, Query, QueryPayloadMeta};
use crate::types::{ReducedPayload, Transaction};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Stateless validator for transactions, batches and queries
///
/// The same checks run in the builder (before anything is signed) and in the
/// sandbox engine (on every submission).
#[derive(Debug, Clone, Default)]
pub struct Validator {
    fields: FieldValidator,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            fields: FieldValidator::new(config),
        }
    }

    pub fn fields(&self) -> &FieldValidator {
        &self.fields
    }

    /// Validate the reduced payload of a transaction
    ///
    /// # Arguments
    /// * `payload` - Creator, commands, quorum and creation time
    /// * `now` - Current time in milliseconds
    pub fn validate_reduced(&self, payload: &ReducedPayload, now: u64) -> Result<(), ValidationError> {
        // 1. Creator
        self.fields.validate_account_id(&payload.creator_account_id)?;

        // 2. Commands
        if payload.commands.is_empty() {
            return Err(ValidationError::EmptyCommands);
        }
        for (index, command) in payload.commands.iter().enumerate() {
            self.fields.validate_command(index, command)?;
        }

        // 3. Quorum
        self.fields.validate_quorum(payload.quorum)?;

        // 4. Freshness
        self.fields.validate_created_time(payload.created_time, now)
    }

    /// Validate a transaction including every signature it carries
    pub fn validate_transaction(&self, tx: &Transaction, now: u64) -> Result<(), ValidationError> {
        self.validate_reduced(tx.reduced_payload(), now)?;

        for signature in &tx.signatures {
            if !crypto::verify(Signable::Transaction(tx), signature) {
                warn!(
                    "Signature check failed for {} (key {})",
                    tx.hash(),
                    signature.public_key
                );
                return Err(ValidationError::BadSignature(signature.public_key.clone()));
            }
        }

        Ok(())
    }

    /// Validate a list of transactions submitted together
    ///
    /// Rules:
    /// - the list is non-empty and within the configured maximum size
    /// - every member passes [`Validator::validate_transaction`]
    /// - more than one member requires batch meta on every member
    /// - batch meta lists exactly the members' reduced hashes, in order
    /// - the batch carries at least one signature
    pub fn validate_batch(&self, txs: &[Transaction], now: u64) -> Result<(), ValidationError> {
        if txs.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        let max = self.fields.config().max_batch_size;
        if txs.len() > max {
            return Err(ValidationError::BatchTooLarge { got: txs.len(), max });
        }

        for tx in txs {
            self.validate_transaction(tx, now)?;
        }

        let reduced: Vec<String> = txs.iter().map(|tx| tx.reduced_hash().to_hex()).collect();
        let mut seen = HashSet::new();
        for hash in &reduced {
            if !seen.insert(hash.as_str()) {
                return Err(ValidationError::DuplicateReducedHash(hash.clone()));
            }
        }

        let metas: Vec<_> = txs.iter().map(|tx| tx.batch_meta()).collect();
        if txs.len() > 1 && metas.iter().any(|m| m.is_none()) {
            return Err(ValidationError::MissingBatchMeta);
        }
        for meta in metas.into_iter().flatten() {
            if meta.reduced_hashes != reduced {
                return Err(ValidationError::BatchHashMismatch);
            }
        }

        if txs.iter().all(|tx| !tx.is_signed()) {
            return Err(ValidationError::UnsignedBatch);
        }

        debug!("Batch of {} transactions is well formed", txs.len());
        Ok(())
    }

    /// Validate query meta without looking at the signature
    pub fn validate_query_meta(
        &self,
        meta: Option<&QueryPayloadMeta>,
        now: u64,
    ) -> Result<(), ValidationError> {
        let meta = meta.ok_or(ValidationError::MissingCreatedTime)?;
        self.fields.validate_account_id(&meta.creator_account_id)?;
        self.fields.validate_created_time(meta.created_time, now)?;
        self.fields.validate_counter(meta.query_counter)
    }

    /// Validate a signed query
    pub fn validate_query(&self, query: &Query, now: u64) -> Result<(), ValidationError> {
        self.validate_query_meta(query.meta(), now)?;
        check_single_signature(Signable::Query(query), query.signature.as_ref())
    }

    /// Validate a signed blocks query
    pub fn validate_blocks_query(&self, query: &BlocksQuery, now: u64) -> Result<(), ValidationError> {
        self.validate_query_meta(query.meta.as_ref(), now)?;
        check_single_signature(Signable::BlocksQuery(query), query.signature.as_ref())
    }
}

fn check_single_signature(
    target: Signable<'_>,
    signature: Option<&crate::types::Signature>,
) -> Result<(), ValidationError> {
    let signature = signature.ok_or_else(|| ValidationError::BadSignature(String::new()))?;
    if crypto::verify(target, signature) {
        Ok(())
    } else {
        Err(ValidationError::BadSignature(signature.public_key.clone()))
    }
}
