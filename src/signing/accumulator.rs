use crate::crypto::{self, PrivateKey, Signable};
use crate::error::{Result, ValidationError};
use crate::queries::{BlocksQuery, Query};
use crate::types::Transaction;
use tracing::debug;

/// Append one signature over the current payload
///
/// The signature covers batch meta, so transactions must be tied first.
/// Signatures are never deduplicated; signing twice with the same key adds
/// two entries.
pub fn sign<'a>(tx: &'a mut Transaction, key: &PrivateKey) -> &'a mut Transaction {
    let signature = crypto::sign(Signable::Transaction(tx), key);
    debug!(
        "Signed {} with {} ({} signatures)",
        tx.hash(),
        signature.public_key,
        tx.signatures.len() + 1
    );
    tx.signatures.push(signature);
    tx
}

/// Sign with every key in order
pub fn sign_with_all<'a>(tx: &'a mut Transaction, keys: &[PrivateKey]) -> &'a mut Transaction {
    for key in keys {
        sign(tx, key);
    }
    tx
}

/// Sign with a hex-encoded private key
///
/// # Returns
/// * `Err(Error::InvalidKey)` if the key does not decode to 32 bytes
pub fn sign_hex<'a>(tx: &'a mut Transaction, private_key_hex: &str) -> Result<&'a mut Transaction> {
    let key = PrivateKey::from_hex(private_key_hex)?;
    Ok(sign(tx, &key))
}

/// Set the single signature of a query
pub fn sign_query<'a>(query: &'a mut Query, key: &PrivateKey) -> &'a mut Query {
    query.signature = Some(crypto::sign(Signable::Query(query), key));
    query
}

/// Set the single signature of a blocks query
pub fn sign_blocks_query<'a>(query: &'a mut BlocksQuery, key: &PrivateKey) -> &'a mut BlocksQuery {
    query.signature = Some(crypto::sign(Signable::BlocksQuery(query), key));
    query
}

/// Check every signature against the current payload
pub fn verify_transaction(tx: &Transaction) -> std::result::Result<(), ValidationError> {
    match tx
        .signatures
        .iter()
        .find(|s| !crypto::verify(Signable::Transaction(tx), s))
    {
        Some(bad) => Err(ValidationError::BadSignature(bad.public_key.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::tie;
    use crate::commands::Command;
    use crate::error::Error;
    use crate::types::{BatchType, ReducedPayload};
    use std::collections::HashSet;

    fn create_tx(creator: &str) -> Transaction {
        Transaction::from_reduced(ReducedPayload {
            commands: vec![Command::set_account_quorum(creator, 2)],
            creator_account_id: creator.to_string(),
            created_time: 1_700_000_000_000,
            quorum: 2,
        })
    }

    #[test]
    fn test_distinct_keys_accumulate() {
        let keys: Vec<PrivateKey> = (0..3).map(|_| PrivateKey::generate()).collect();
        let mut tx = create_tx("alice@test");
        let reduced = tx.reduced_hash();

        sign_with_all(&mut tx, &keys);

        assert_eq!(tx.signatures.len(), 3);
        let signers: HashSet<_> = tx.signatures.iter().map(|s| s.public_key.clone()).collect();
        assert_eq!(signers.len(), 3);
        assert_eq!(tx.reduced_hash(), reduced);
        assert!(verify_transaction(&tx).is_ok());
    }

    #[test]
    fn test_same_key_twice_is_not_deduplicated() {
        let key = PrivateKey::generate();
        let mut tx = create_tx("alice@test");
        sign(&mut tx, &key);
        sign(&mut tx, &key);
        assert_eq!(tx.signatures.len(), 2);
    }

    #[test]
    fn test_signatures_follow_batch_meta() {
        let key = PrivateKey::generate();
        let mut txs = vec![create_tx("alice@test"), create_tx("bob@test")];
        tie(&mut txs, BatchType::Atomic).unwrap();
        sign(&mut txs[0], &key);
        assert!(verify_transaction(&txs[0]).is_ok());

        // Tampering with the meta invalidates the signature
        let mut tampered = txs[0].clone();
        let mut meta = tampered.batch_meta().unwrap().clone();
        meta.reduced_hashes.reverse();
        tampered.set_batch_meta(meta);
        assert!(matches!(
            verify_transaction(&tampered),
            Err(ValidationError::BadSignature(_))
        ));
    }

    #[test]
    fn test_sign_hex_rejects_bad_key() {
        let mut tx = create_tx("alice@test");
        let err = sign_hex(&mut tx, "0badc0de").unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
        assert!(tx.signatures.is_empty());
    }

    #[test]
    fn test_query_signature_replaced() {
        let mut query = crate::builder::QueryBuilder::new("alice@test")
            .build(crate::queries::QueryKind::get_pending_transactions())
            .unwrap();
        let first = PrivateKey::generate();
        let second = PrivateKey::generate();

        sign_query(&mut query, &first);
        sign_query(&mut query, &second);

        let signature = query.signature.clone().unwrap();
        assert_eq!(signature.public_key, second.public_key().to_hex());
        assert!(crypto::verify(Signable::Query(&query), &signature));
    }
}
