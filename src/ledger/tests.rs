//! Tests for the sandbox ledger: submission pipeline, queries, block stream

#[cfg(test)]
mod tests {
    use crate::{
        batch::tie,
        builder::QueryBuilder,
        commands::Command,
        error::{Error, ValidationError},
        queries::{ErrorReason, QueryKind, QueryResponseKind, TxPaginationMeta},
        signing,
        status::BatchOutcome,
        test_support::{note, Network},
        transport::Transport,
        types::{now_millis, BatchType, Transaction, TxHash, TxStatus},
    };
    use futures::StreamExt;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_genesis_is_first_block() {
        let net = Network::start().await;
        assert_eq!(net.ledger.blocks().height().await, 1);

        let genesis = net.ledger.blocks().block(1).await.unwrap();
        let payload = genesis.payload().unwrap();
        assert_eq!(payload.height, 1);
        let hash = payload.transactions[0].hash();
        assert_eq!(net.ledger.status(&hash).await.status(), TxStatus::Committed);
        assert_eq!(net.ledger.world().await.balance("admin@test", "coin#test"), 100_000);
    }

    #[tokio::test]
    async fn test_unsigned_submission_fails_statelessly() {
        let net = Network::start().await;
        let bob = net.bob();
        let tx = bob.transaction(vec![note("bob@test", "x")]).build().unwrap();
        let hash = tx.hash();

        assert_eq!(
            net.ledger.submit(vec![tx.clone()]).await,
            Err(ValidationError::UnsignedBatch)
        );
        let status = net.ledger.status(&hash).await;
        assert_eq!(status.status(), TxStatus::StatelessValidationFailed);
        assert!(!status.error_message.is_empty());

        // Through the transport the call itself succeeds
        net.transport.submit(tx).await.unwrap();
        assert_eq!(net.ledger.pool().len().await, 0);
    }

    #[tokio::test]
    async fn test_forged_signature_fails_statelessly() {
        let net = Network::start().await;
        let bob = net.bob();
        let mut tx = bob.transaction(vec![note("bob@test", "x")]).build().unwrap();
        bob.sign(&mut tx);
        tx.signatures[0].signature = "00".repeat(64);

        assert!(matches!(
            net.ledger.submit(vec![tx]).await,
            Err(ValidationError::BadSignature(_))
        ));
    }

    #[tokio::test]
    async fn test_garbled_resubmission_keeps_pending_batch() {
        let net = Network::start().await;
        let (alice, bob) = (net.alice(), net.bob());
        let mut txs = vec![
            alice
                .transaction(vec![note("alice@test", "from alice")])
                .quorum(2)
                .build()
                .unwrap(),
            bob.transaction(vec![note("bob@test", "from bob")])
                .build()
                .unwrap(),
        ];
        tie(&mut txs, BatchType::Atomic).unwrap();
        let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();

        let mut first = txs.clone();
        alice.sign(&mut first[0]);
        alice.send_batch(first).await.unwrap();

        let mut garbled = txs.clone();
        bob.sign(&mut garbled[1]);
        garbled[1].signatures[0].signature = "00".repeat(64);
        assert!(matches!(
            net.ledger.submit(garbled).await,
            Err(ValidationError::BadSignature(_))
        ));
        for hash in &hashes {
            assert_eq!(net.ledger.status(hash).await.status(), TxStatus::MstPending);
        }
        assert_eq!(bob.pending_transactions().await.unwrap().len(), 2);

        let mut valid = txs;
        bob.sign(&mut valid[1]);
        assert_eq!(
            bob.send_batch_and_wait(valid).await.unwrap(),
            BatchOutcome::AllCommitted
        );
        assert!(bob.pending_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replay_of_committed_transaction_is_ignored() {
        let net = Network::start().await;
        let bob = net.bob();
        let mut tx = bob.transaction(vec![note("bob@test", "once")]).build().unwrap();
        bob.sign(&mut tx);

        let response = bob.send_and_wait(tx.clone()).await.unwrap();
        assert_eq!(response.status(), TxStatus::Committed);
        assert_eq!(net.ledger.blocks().height().await, 2);

        bob.send(tx.clone()).await.unwrap();
        assert_eq!(net.ledger.blocks().height().await, 2);
        assert_eq!(net.ledger.status(&tx.hash()).await.status(), TxStatus::Committed);
    }

    #[tokio::test]
    async fn test_rejection_carries_command_details() {
        let net = Network::start().await;
        let bob = net.bob();
        let mut tx = bob
            .transaction(vec![
                note("bob@test", "first"),
                Command::set_account_quorum("bob@test", 3),
            ])
            .build()
            .unwrap();
        bob.sign(&mut tx);

        match bob.send_and_wait(tx.clone()).await {
            Err(Error::Rejected { status, .. }) => assert_eq!(status, TxStatus::Rejected),
            other => panic!("expected rejection, got {:?}", other),
        }
        let status = net.ledger.status(&tx.hash()).await;
        assert_eq!(status.failed_cmd_index, 1);
        assert_eq!(status.error_code, crate::state::codes::INVALID_STATE);
    }

    #[tokio::test]
    async fn test_account_queries() {
        let net = Network::start().await;
        let (admin, bob) = (net.admin(), net.bob());

        let mut transfer = admin
            .transaction(vec![Command::transfer_asset(
                "admin@test",
                "bob@test",
                "coin#test",
                "payday",
                "2.50",
            )])
            .build()
            .unwrap();
        admin.sign(&mut transfer);
        admin.send_and_wait(transfer.clone()).await.unwrap();

        let account = admin.query(QueryKind::get_account("alice@test")).await.unwrap();
        match account.response {
            Some(QueryResponseKind::AccountResponse(r)) => {
                assert_eq!(r.account.unwrap().quorum, 2);
                assert_eq!(r.account_roles, vec!["user".to_string()]);
            }
            other => panic!("unexpected response {:?}", other),
        }

        let assets = bob.query(QueryKind::get_account_assets("bob@test")).await.unwrap();
        match assets.response {
            Some(QueryResponseKind::AccountAssetsResponse(r)) => {
                assert_eq!(r.account_assets.len(), 1);
                assert_eq!(r.account_assets[0].balance, "2.50");
            }
            other => panic!("unexpected response {:?}", other),
        }

        let signatories = bob.query(QueryKind::get_signatories("bob@test")).await.unwrap();
        match signatories.response {
            Some(QueryResponseKind::SignatoriesResponse(r)) => {
                assert_eq!(r.keys, vec![net.bob_key.public_key().to_hex()]);
            }
            other => panic!("unexpected response {:?}", other),
        }

        let info = bob.query(QueryKind::get_asset_info("coin#test")).await.unwrap();
        match info.response {
            Some(QueryResponseKind::AssetResponse(r)) => assert_eq!(r.asset.unwrap().precision, 2),
            other => panic!("unexpected response {:?}", other),
        }

        // Users only read their own accounts
        assert!(matches!(
            bob.query(QueryKind::get_account("alice@test")).await,
            Err(Error::QueryRejected(_))
        ));

        let txs = admin
            .query(QueryKind::get_transactions(vec![transfer.hash().to_hex()]))
            .await
            .unwrap()
            .into_transactions()
            .unwrap();
        assert_eq!(txs, vec![transfer]);
    }

    #[tokio::test]
    async fn test_account_detail_and_paged_transactions() {
        let net = Network::start().await;
        let bob = net.bob();

        let mut hashes = Vec::new();
        for value in ["one", "two", "three"] {
            let mut tx = bob.transaction(vec![note("bob@test", value)]).build().unwrap();
            bob.sign(&mut tx);
            hashes.push(tx.hash());
            bob.send_and_wait(tx).await.unwrap();
        }

        let detail = bob
            .query(QueryKind::get_account_detail("bob@test"))
            .await
            .unwrap();
        match detail.response {
            Some(QueryResponseKind::AccountDetailResponse(r)) => {
                let json: serde_json::Value = serde_json::from_str(&r.detail).unwrap();
                assert_eq!(json["bob@test"]["note"], "three");
            }
            other => panic!("unexpected response {:?}", other),
        }

        let mut paged = QueryKind::get_account_transactions("bob@test");
        if let QueryKind::GetAccountTransactions(q) = &mut paged {
            q.pagination_meta = Some(TxPaginationMeta {
                page_size: 2,
                first_tx_hash: hashes[1].to_hex(),
            });
        }
        let page = bob.query(paged).await.unwrap().into_transactions().unwrap();
        let page_hashes: Vec<_> = page.iter().map(|tx| tx.hash()).collect();
        assert_eq!(page_hashes, vec![hashes[1], hashes[2]]);
    }

    #[tokio::test]
    async fn test_query_signed_by_stranger_is_rejected() {
        let net = Network::start().await;
        let mut query = QueryBuilder::new("bob@test")
            .build(QueryKind::get_account("bob@test"))
            .unwrap();
        signing::sign_query(&mut query, &net.alice_keys[0]);

        let response = net.transport.query(query).await.unwrap();
        assert_eq!(
            response.as_error().unwrap().reason(),
            ErrorReason::StatefulInvalid
        );
    }

    #[tokio::test]
    async fn test_query_with_zero_counter_is_stateless_invalid() {
        let net = Network::start().await;
        let mut query = QueryBuilder::new("bob@test")
            .build(QueryKind::get_account("bob@test"))
            .unwrap();
        if let Some(meta) = query.payload.as_mut().and_then(|p| p.meta.as_mut()) {
            meta.query_counter = 0;
        }
        signing::sign_query(&mut query, &net.bob_key);

        let response = net.transport.query(query).await.unwrap();
        assert_eq!(
            response.as_error().unwrap().reason(),
            ErrorReason::StatelessInvalid
        );
    }

    #[tokio::test]
    async fn test_block_stream_delivers_new_blocks() {
        let net = Network::start().await;
        let bob = net.bob();
        let mut blocks = bob.blocks().await.unwrap();

        let mut tx = bob.transaction(vec![note("bob@test", "block")]).build().unwrap();
        bob.sign(&mut tx);
        bob.send(tx.clone()).await.unwrap();

        let block = timeout(Duration::from_secs(5), blocks.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(block.height(), 2);
        assert_eq!(block.payload().unwrap().transactions, vec![tx]);
    }

    #[tokio::test]
    async fn test_expire_reports_each_member() {
        let net = Network::start().await;
        let alice = net.alice();
        let mut tx = alice
            .transaction(vec![note("alice@test", "half signed")])
            .quorum(2)
            .build()
            .unwrap();
        signing::sign(&mut tx, &net.alice_keys[0]);
        alice.send(tx.clone()).await.unwrap();

        assert_eq!(net.ledger.expire(now_millis()).await, 0);
        assert_eq!(net.ledger.expire(now_millis() + 10 * 60 * 1000).await, 1);
        assert_eq!(
            net.ledger.status(&tx.hash()).await.status(),
            TxStatus::MstExpired
        );
    }
}
