//! Tests for transaction, batch and query validation

#[cfg(test)]
mod tests {
    use crate::{
        commands::Command,
        crypto::{self, PrivateKey, Signable},
        error::ValidationError,
        queries::{Query, QueryKind, QueryPayload, QueryPayloadMeta},
        types::{BatchMeta, BatchType, ReducedPayload, Transaction},
        validation::Validator,
    };

    const NOW: u64 = 1_700_000_000_000;

    fn create_tx(creator: &str, quorum: u32) -> Transaction {
        Transaction::from_reduced(ReducedPayload {
            commands: vec![Command::set_account_detail(creator, "key", "value")],
            creator_account_id: creator.to_string(),
            created_time: NOW,
            quorum,
        })
    }

    fn tie(txs: &mut [Transaction], batch_type: BatchType) {
        let hashes: Vec<String> = txs.iter().map(|tx| tx.reduced_hash().to_hex()).collect();
        for tx in txs.iter_mut() {
            tx.set_batch_meta(BatchMeta::new(batch_type, hashes.clone()));
        }
    }

    fn sign(tx: &mut Transaction, key: &PrivateKey) {
        let signature = crypto::sign(Signable::Transaction(tx), key);
        tx.signatures.push(signature);
    }

    #[test]
    fn test_empty_commands_rejected() {
        let mut tx = create_tx("alice@test", 1);
        tx.payload.as_mut().unwrap().reduced_payload.as_mut().unwrap().commands.clear();
        assert_eq!(
            Validator::default().validate_transaction(&tx, NOW),
            Err(ValidationError::EmptyCommands)
        );
    }

    #[test]
    fn test_signed_batch_is_valid() {
        let key = PrivateKey::generate();
        let mut txs = vec![create_tx("alice@test", 1), create_tx("bob@test", 1)];
        tie(&mut txs, BatchType::Atomic);
        sign(&mut txs[0], &key);

        assert!(Validator::default().validate_batch(&txs, NOW).is_ok());
    }

    #[test]
    fn test_batch_without_meta_rejected() {
        let key = PrivateKey::generate();
        let mut txs = vec![create_tx("alice@test", 1), create_tx("bob@test", 1)];
        sign(&mut txs[0], &key);

        assert_eq!(
            Validator::default().validate_batch(&txs, NOW),
            Err(ValidationError::MissingBatchMeta)
        );
    }

    #[test]
    fn test_batch_hash_mismatch_rejected() {
        let key = PrivateKey::generate();
        let mut txs = vec![create_tx("alice@test", 1), create_tx("bob@test", 1)];
        tie(&mut txs, BatchType::Atomic);
        // Drop a member after tying
        txs.pop();
        sign(&mut txs[0], &key);

        assert_eq!(
            Validator::default().validate_batch(&txs, NOW),
            Err(ValidationError::BatchHashMismatch)
        );
    }

    #[test]
    fn test_unsigned_batch_rejected() {
        let mut txs = vec![create_tx("alice@test", 1), create_tx("bob@test", 1)];
        tie(&mut txs, BatchType::Ordered);

        assert_eq!(
            Validator::default().validate_batch(&txs, NOW),
            Err(ValidationError::UnsignedBatch)
        );
    }

    #[test]
    fn test_signature_over_stale_payload_rejected() {
        let key = PrivateKey::generate();
        let mut txs = vec![create_tx("alice@test", 1), create_tx("bob@test", 1)];
        // Signed before tying: the signature no longer covers the payload
        sign(&mut txs[0], &key);
        tie(&mut txs, BatchType::Atomic);

        assert!(matches!(
            Validator::default().validate_batch(&txs, NOW),
            Err(ValidationError::BadSignature(_))
        ));
    }

    #[test]
    fn test_duplicate_members_rejected() {
        let key = PrivateKey::generate();
        let mut txs = vec![create_tx("alice@test", 1), create_tx("alice@test", 1)];
        tie(&mut txs, BatchType::Atomic);
        sign(&mut txs[0], &key);

        assert!(matches!(
            Validator::default().validate_batch(&txs, NOW),
            Err(ValidationError::DuplicateReducedHash(_))
        ));
    }

    #[test]
    fn test_stale_transaction_rejected() {
        let tx = create_tx("alice@test", 1);
        let later = NOW + 86_400_001;
        assert!(matches!(
            Validator::default().validate_transaction(&tx, later),
            Err(ValidationError::TooOld { .. })
        ));
    }

    #[test]
    fn test_query_signature_required() {
        let key = PrivateKey::generate();
        let mut query = Query {
            payload: Some(QueryPayload {
                meta: Some(QueryPayloadMeta {
                    created_time: NOW,
                    creator_account_id: "alice@test".to_string(),
                    query_counter: 1,
                }),
                query: Some(QueryKind::get_pending_transactions()),
            }),
            signature: None,
        };
        let validator = Validator::default();
        assert!(validator.validate_query(&query, NOW).is_err());

        query.signature = Some(crypto::sign(Signable::Query(&query), &key));
        assert!(validator.validate_query(&query, NOW).is_ok());

        query.payload.as_mut().unwrap().meta.as_mut().unwrap().query_counter = 0;
        assert_eq!(
            validator.validate_query(&query, NOW),
            Err(ValidationError::ZeroCounter)
        );
    }
}
