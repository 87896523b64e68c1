//! End-to-end tests for pending-batch reconciliation
//!
//! Every test runs two or more parties against the in-process ledger.

#[cfg(test)]
mod tests {
    use crate::{
        batch::tie,
        config::MstConfig,
        error::{Error, Result, ValidationError},
        queries::{BlocksQuery, Query, QueryResponse},
        reconciler::{ForeignSignatures, PendingReconciler, ReconcileState},
        signing,
        state::codes,
        status::{BatchOutcome, StatusStream},
        test_support::{note, Network},
        transport::{BlockStream, Transport},
        types::{BatchType, ToriiResponse, Transaction, TxHash, TxStatus},
        Client, SandboxTransport,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{timeout, Duration};

    /// Alice's quorum-2 transaction and Bob's transaction, tied atomically
    fn alice_and_bob_batch(
        alice: &Client<SandboxTransport>,
        bob: &Client<SandboxTransport>,
    ) -> Vec<Transaction> {
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
        txs
    }

    #[tokio::test]
    async fn test_counterparty_accepts_batch() {
        let net = Network::start().await;
        let (alice, bob) = (net.alice(), net.bob());

        let mut txs = alice_and_bob_batch(&alice, &bob);
        let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();
        alice.sign(&mut txs[0]);
        alice.send_batch(txs).await.unwrap();
        assert_eq!(net.ledger.status(&hashes[0]).await.status(), TxStatus::MstPending);
        assert_eq!(net.ledger.status(&hashes[1]).await.status(), TxStatus::MstPending);

        let mut reconciler = PendingReconciler::new(&bob);
        let mut view = reconciler.observe().await.unwrap();
        assert_eq!(view.hashes(), hashes);
        assert_eq!(reconciler.state(&hashes[0]), ReconcileState::Observed);

        reconciler
            .accept(&mut view, ForeignSignatures::Strip)
            .unwrap();
        assert!(view.batches[0].transactions[0].signatures.is_empty());
        assert_eq!(view.batches[0].transactions[1].signatures.len(), 1);

        let sent = reconciler.resubmit(view).await.unwrap();
        assert_eq!(sent, hashes);
        let outcome = reconciler.await_outcome(&sent).await.unwrap();

        assert_eq!(outcome, BatchOutcome::AllCommitted);
        assert_eq!(reconciler.state(&hashes[0]), ReconcileState::Committed);
        assert_eq!(reconciler.state(&hashes[1]), ReconcileState::Committed);
        assert!(bob.pending_transactions().await.unwrap().is_empty());
        assert!(alice.pending_transactions().await.unwrap().is_empty());

        // Alice's signatures were kept by the engine, not resent by Bob
        let block = net.ledger.blocks().block(2).await.unwrap();
        let committed = &block.payload().unwrap().transactions;
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[0].signatures.len(), 2);
    }

    #[tokio::test]
    async fn test_counterparty_signing_with_foreign_keys_rejects_batch() {
        let net = Network::start().await;
        let (alice, bob) = (net.alice(), net.bob());

        let mut txs = alice_and_bob_batch(&alice, &bob);
        alice.sign(&mut txs[0]);
        alice.send_batch(txs).await.unwrap();

        let mut reconciler = PendingReconciler::new(&bob);
        let mut view = reconciler.observe().await.unwrap();
        reconciler.decline(&mut view, &net.alice_keys).unwrap();
        assert_eq!(view.batches[0].transactions[1].signatures.len(), 2);

        let sent = reconciler.resubmit(view).await.unwrap();
        match reconciler.await_outcome(&sent).await.unwrap() {
            BatchOutcome::AnyRejected { committed, rejected } => {
                assert!(committed.is_empty());
                assert_eq!(rejected.len(), 2);
                assert!(rejected.iter().all(|r| r.status == TxStatus::Rejected));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(reconciler.state(&sent[0]), ReconcileState::Rejected);
        assert_eq!(reconciler.state(&sent[1]), ReconcileState::Rejected);
        assert!(bob.pending_transactions().await.unwrap().is_empty());
        assert_eq!(net.ledger.blocks().height().await, 1);
    }

    #[tokio::test]
    async fn test_replaced_foreign_signatures_are_checked_by_engine() {
        let net = Network::start().await;
        let (alice, bob) = (net.alice(), net.bob());

        // Alice signs her member with one of her two keys
        let mut txs = alice_and_bob_batch(&alice, &bob);
        let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();
        signing::sign(&mut txs[0], &net.alice_keys[0]);
        alice.send_batch(txs).await.unwrap();

        let mut reconciler = PendingReconciler::new(&bob);
        let mut view = reconciler.observe().await.unwrap();
        reconciler
            .accept(&mut view, ForeignSignatures::Replace)
            .unwrap();

        let bob_public = net.bob_key.public_key().to_hex();
        for tx in view.transactions() {
            let keys: Vec<&str> = tx.signatures.iter().map(|s| s.public_key.as_str()).collect();
            assert_eq!(keys, vec![bob_public.as_str()]);
        }

        // Bob's key completes the quorum count but is not Alice's signatory
        let sent = reconciler.resubmit(view).await.unwrap();
        match reconciler.await_outcome(&sent).await.unwrap() {
            BatchOutcome::AnyRejected { committed, rejected } => {
                assert!(committed.is_empty());
                assert_eq!(rejected.len(), 2);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        let status = net.ledger.status(&hashes[0]).await;
        assert_eq!(status.status(), TxStatus::Rejected);
        assert_eq!(status.error_code, codes::SIGNATURES);
        assert_eq!(net.ledger.blocks().height().await, 1);
    }

    /// Transport that counts calls before delegating to the sandbox
    struct CountingTransport {
        inner: SandboxTransport,
        calls: AtomicUsize,
    }

    impl CountingTransport {
        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn submit(&self, tx: Transaction) -> Result<()> {
            self.hit();
            self.inner.submit(tx).await
        }

        async fn submit_batch(&self, txs: Vec<Transaction>) -> Result<()> {
            self.hit();
            self.inner.submit_batch(txs).await
        }

        async fn query(&self, query: Query) -> Result<QueryResponse> {
            self.hit();
            self.inner.query(query).await
        }

        async fn status(&self, hash: &TxHash) -> Result<ToriiResponse> {
            self.hit();
            self.inner.status(hash).await
        }

        async fn stream_status(&self, hash: &TxHash) -> Result<StatusStream> {
            self.hit();
            self.inner.stream_status(hash).await
        }

        async fn stream_blocks(&self, query: BlocksQuery) -> Result<BlockStream> {
            self.hit();
            self.inner.stream_blocks(query).await
        }
    }

    async fn build_and_send(
        client: &Client<CountingTransport>,
        commands: Vec<crate::commands::Command>,
    ) -> Result<ToriiResponse> {
        let mut tx = client.transaction(commands).build()?;
        client.sign(&mut tx);
        client.send_and_wait(tx).await
    }

    #[tokio::test]
    async fn test_empty_transaction_never_reaches_transport() {
        let net = Network::start().await;
        let counting = CountingTransport {
            inner: net.transport.clone(),
            calls: AtomicUsize::new(0),
        };
        let bob = Client::new(counting, "bob@test", vec![net.bob_key.clone()]);

        let result = build_and_send(&bob, Vec::new()).await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::EmptyCommands))
        ));
        assert_eq!(bob.transport().calls.load(Ordering::SeqCst), 0);

        let response = build_and_send(&bob, vec![note("bob@test", "hi")]).await.unwrap();
        assert_eq!(response.status(), TxStatus::Committed);
        assert!(bob.transport().calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_observed_batch_cannot_be_retied() {
        let net = Network::start().await;
        let (alice, bob) = (net.alice(), net.bob());

        let mut txs = alice_and_bob_batch(&alice, &bob);
        let meta = txs[0].batch_meta().cloned().unwrap();
        // Unsigned: tying again changes nothing
        assert_eq!(tie(&mut txs, BatchType::Atomic).unwrap(), meta);

        alice.sign(&mut txs[0]);
        alice.send_batch(txs).await.unwrap();

        let mut reconciler = PendingReconciler::new(&bob);
        let mut view = reconciler.observe().await.unwrap();
        assert!(matches!(
            tie(&mut view.batches[0].transactions, BatchType::Ordered),
            Err(ValidationError::AlreadySigned(_))
        ));
    }

    #[tokio::test]
    async fn test_quorum_gates_commit() {
        let net = Network::start().await;
        let alice = net.alice();

        let tx = alice
            .transaction(vec![note("alice@test", "two keys")])
            .quorum(2)
            .build()
            .unwrap();
        let hash = tx.hash();

        let mut first = tx.clone();
        signing::sign(&mut first, &net.alice_keys[0]);
        alice.send(first).await.unwrap();
        assert_eq!(net.ledger.status(&hash).await.status(), TxStatus::MstPending);
        assert_eq!(alice.pending_transactions().await.unwrap().len(), 1);

        // The same key again does not count twice
        let mut again = tx.clone();
        signing::sign(&mut again, &net.alice_keys[0]);
        alice.send(again).await.unwrap();
        assert_eq!(net.ledger.status(&hash).await.status(), TxStatus::MstPending);

        let mut second = tx;
        signing::sign(&mut second, &net.alice_keys[1]);
        alice.send(second).await.unwrap();
        assert_eq!(net.ledger.status(&hash).await.status(), TxStatus::Committed);
        assert!(alice.pending_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ordered_batch_commits_valid_members() {
        let net = Network::start().await;
        let bob = net.bob();

        let mut txs = vec![
            bob.transaction(vec![note("bob@test", "fine")]).build().unwrap(),
            bob.transaction(vec![crate::commands::Command::transfer_asset(
                "bob@test",
                "alice@test",
                "coin#test",
                "",
                "1",
            )])
            .build()
            .unwrap(),
        ];
        tie(&mut txs, BatchType::Ordered).unwrap();
        for tx in txs.iter_mut() {
            bob.sign(tx);
        }
        let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();

        match bob.send_batch_and_wait(txs).await.unwrap() {
            BatchOutcome::AnyRejected { committed, rejected } => {
                assert_eq!(committed, vec![hashes[0]]);
                assert_eq!(rejected.len(), 1);
                assert_eq!(rejected[0].hash, hashes[1]);
            }
            other => panic!("expected partial rejection, got {:?}", other),
        }

        let block = net.ledger.blocks().block(2).await.unwrap();
        let payload = block.payload().unwrap();
        assert_eq!(payload.tx_number, 1);
        assert_eq!(payload.rejected_transactions_hashes, vec![hashes[1].to_hex()]);
    }

    #[tokio::test]
    async fn test_abandoned_batch_expires() {
        let net = Network::with_mst(MstConfig {
            expiration_ms: 50,
            sweep_interval_ms: 10,
        })
        .await;
        let (alice, bob) = (net.alice(), net.bob());
        let _sweeper = net.ledger.clone().spawn_expiry();

        let mut txs = alice_and_bob_batch(&alice, &bob);
        alice.sign(&mut txs[0]);
        let hash = txs[0].hash();
        let stream = net.transport.stream_status(&hash).await.unwrap();
        alice.send_batch(txs).await.unwrap();

        let terminal = timeout(Duration::from_secs(5), stream.wait_terminal())
            .await
            .expect("expiry loop did not run")
            .unwrap();
        assert_eq!(terminal.status(), TxStatus::MstExpired);
        assert!(bob.pending_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_illegal_transitions() {
        let net = Network::start().await;
        let (alice, bob) = (net.alice(), net.bob());

        let mut txs = alice_and_bob_batch(&alice, &bob);
        alice.sign(&mut txs[0]);
        alice.send_batch(txs).await.unwrap();

        let mut reconciler = PendingReconciler::new(&bob);
        let mut view = reconciler.observe().await.unwrap();
        let hashes = view.hashes();

        // Resubmitting without a decision
        assert!(matches!(
            reconciler.resubmit(view.clone()).await,
            Err(Error::IllegalTransition { from: "Observed", .. })
        ));
        // Waiting on something never resubmitted
        assert!(matches!(
            reconciler.await_outcome(&hashes).await,
            Err(Error::IllegalTransition { from: "Observed", .. })
        ));

        reconciler
            .accept(&mut view, ForeignSignatures::default())
            .unwrap();
        assert!(matches!(
            reconciler.decline(&mut view, &[]),
            Err(Error::IllegalTransition { from: "Accepted", .. })
        ));
        assert_eq!(reconciler.state(&hashes[1]), ReconcileState::Accepted);
    }
}
