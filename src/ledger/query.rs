//! Query execution against the sandbox world state
//!
//! Each query is answered on behalf of its creator. Reads of other accounts
//! need the matching `CanGetAll*` permission, or `CanGetDomain*` when both
//! accounts share a domain; reads of the creator's own data need `CanGetMy*`.

use crate::commands::RolePermission;
use crate::pool::MstPool;
use crate::queries::{
    Account, AccountAsset, AccountAssetResponse, AccountDetailResponse, AccountResponse, Asset,
    AssetResponse, ErrorReason, ErrorResponse, GetAccountDetail, GetAccountTransactions,
    QueryKind, QueryResponse, QueryResponseKind, SignatoriesResponse, TransactionsResponse,
};
use crate::registry::BlockStore;
use crate::state::{codes, domain_of, format_amount, WorldState};
use crate::types::{Transaction, TxHash};
use tracing::debug;

/// Permission triple guarding one kind of read
struct ReadPermissions {
    my: RolePermission,
    all: RolePermission,
    domain: RolePermission,
}

const ACCOUNT: ReadPermissions = ReadPermissions {
    my: RolePermission::CanGetMyAccount,
    all: RolePermission::CanGetAllAccounts,
    domain: RolePermission::CanGetDomainAccounts,
};

const SIGNATORIES: ReadPermissions = ReadPermissions {
    my: RolePermission::CanGetMySignatories,
    all: RolePermission::CanGetAllSignatories,
    domain: RolePermission::CanGetDomainSignatories,
};

const ACCOUNT_ASSETS: ReadPermissions = ReadPermissions {
    my: RolePermission::CanGetMyAccAst,
    all: RolePermission::CanGetAllAccAst,
    domain: RolePermission::CanGetDomainAccAst,
};

const ACCOUNT_DETAIL: ReadPermissions = ReadPermissions {
    my: RolePermission::CanGetMyAccDetail,
    all: RolePermission::CanGetAllAccDetail,
    domain: RolePermission::CanGetDomainAccDetail,
};

const ACCOUNT_TXS: ReadPermissions = ReadPermissions {
    my: RolePermission::CanGetMyAccTxs,
    all: RolePermission::CanGetAllAccTxs,
    domain: RolePermission::CanGetDomainAccTxs,
};

pub(super) struct QueryExecutor<'a> {
    pub world: &'a WorldState,
    pub blocks: &'a BlockStore,
    pub pool: &'a MstPool,
    pub creator: &'a str,
    pub query_hash: String,
}

impl QueryExecutor<'_> {
    pub async fn execute(self, kind: &QueryKind) -> QueryResponse {
        debug!("Executing {} for {}", kind.name(), self.creator);
        match kind {
            QueryKind::GetAccount(q) => self.account(&q.account_id),
            QueryKind::GetSignatories(q) => self.signatories(&q.account_id),
            QueryKind::GetAccountTransactions(q) => self.account_transactions(q).await,
            QueryKind::GetTransactions(q) => self.transactions(&q.tx_hashes).await,
            QueryKind::GetAccountAssets(q) => self.account_assets(&q.account_id),
            QueryKind::GetAccountDetail(q) => self.account_detail(q),
            QueryKind::GetAssetInfo(q) => self.asset_info(&q.asset_id),
            QueryKind::GetPendingTransactions(_) => self.pending_transactions().await,
        }
    }

    fn can_read(&self, target: &str, permissions: &ReadPermissions) -> bool {
        let world = self.world;
        world.has_permission(self.creator, permissions.all)
            || (target == self.creator && world.has_permission(self.creator, permissions.my))
            || (domain_of(target) == domain_of(self.creator)
                && world.has_permission(self.creator, permissions.domain))
    }

    fn respond(self, response: QueryResponseKind) -> QueryResponse {
        QueryResponse::new(self.query_hash, response)
    }

    fn error(self, reason: ErrorReason, message: impl Into<String>) -> QueryResponse {
        QueryResponse::error(self.query_hash, reason, message)
    }

    fn denied(self, what: &str) -> QueryResponse {
        let message = format!("{} has no permission to read {}", self.creator, what);
        self.respond(QueryResponseKind::ErrorResponse(ErrorResponse {
            reason: ErrorReason::StatefulInvalid as i32,
            message,
            error_code: codes::NO_PERMISSION,
        }))
    }

    fn account(self, account_id: &str) -> QueryResponse {
        let world = self.world;
        if !self.can_read(account_id, &ACCOUNT) {
            return self.denied(account_id);
        }
        let Some(account) = world.account(account_id) else {
            return self.error(ErrorReason::NoAccount, format!("No account {}", account_id));
        };
        let response = AccountResponse {
            account: Some(Account {
                account_id: account.account_id.clone(),
                domain_id: account.domain_id.clone(),
                quorum: account.quorum,
                json_data: account.details_json(None, None).to_string(),
            }),
            account_roles: account.roles.clone(),
        };
        self.respond(QueryResponseKind::AccountResponse(response))
    }

    fn signatories(self, account_id: &str) -> QueryResponse {
        let world = self.world;
        if !self.can_read(account_id, &SIGNATORIES) {
            return self.denied(account_id);
        }
        match world.account(account_id) {
            Some(account) => {
                let keys = account.signatories.clone();
                self.respond(QueryResponseKind::SignatoriesResponse(SignatoriesResponse { keys }))
            }
            None => self.error(
                ErrorReason::NoSignatories,
                format!("No signatories for {}", account_id),
            ),
        }
    }

    async fn account_transactions(self, query: &GetAccountTransactions) -> QueryResponse {
        let world = self.world;
        if !self.can_read(&query.account_id, &ACCOUNT_TXS) {
            return self.denied(&query.account_id);
        }
        if world.account(&query.account_id).is_none() {
            return self.error(
                ErrorReason::NoAccount,
                format!("No account {}", query.account_id),
            );
        }

        let mut transactions = self.blocks.account_transactions(&query.account_id).await;
        if let Some(page) = &query.pagination_meta {
            if !page.first_tx_hash.is_empty() {
                let start = transactions
                    .iter()
                    .position(|tx| tx.hash().to_hex() == page.first_tx_hash.to_lowercase());
                match start {
                    Some(start) => {
                        transactions.drain(..start);
                    }
                    None => {
                        return self.error(
                            ErrorReason::StatefulInvalid,
                            format!("Unknown first_tx_hash {}", page.first_tx_hash),
                        )
                    }
                }
            }
            if page.page_size > 0 {
                transactions.truncate(page.page_size as usize);
            }
        }
        self.respond(QueryResponseKind::TransactionsResponse(TransactionsResponse {
            transactions,
        }))
    }

    async fn transactions(self, hashes: &[String]) -> QueryResponse {
        let mut transactions = Vec::with_capacity(hashes.len());
        for value in hashes {
            let Some(hash) = TxHash::from_hex(value) else {
                return self.error(
                    ErrorReason::StatelessInvalid,
                    format!("Malformed transaction hash '{}'", value),
                );
            };
            let Some(tx) = self.blocks.transaction(&hash).await else {
                return self.error(
                    ErrorReason::StatefulInvalid,
                    format!("Transaction {} is not committed", hash),
                );
            };
            let own = tx.creator_account_id() == self.creator;
            let allowed = self.world.has_permission(self.creator, RolePermission::CanGetAllTxs)
                || (own && self.world.has_permission(self.creator, RolePermission::CanGetMyTxs));
            if !allowed {
                return self.denied(&format!("transaction {}", hash));
            }
            transactions.push(tx);
        }
        self.respond(QueryResponseKind::TransactionsResponse(TransactionsResponse {
            transactions,
        }))
    }

    fn account_assets(self, account_id: &str) -> QueryResponse {
        let world = self.world;
        if !self.can_read(account_id, &ACCOUNT_ASSETS) {
            return self.denied(account_id);
        }
        let Some(account) = world.account(account_id) else {
            return self.error(
                ErrorReason::NoAccountAssets,
                format!("No assets for {}", account_id),
            );
        };
        let account_assets = account
            .balances
            .iter()
            .map(|(asset_id, balance)| {
                let precision = world.asset(asset_id).map(|a| a.precision).unwrap_or(0);
                AccountAsset {
                    asset_id: asset_id.clone(),
                    account_id: account_id.to_string(),
                    balance: format_amount(*balance, precision),
                }
            })
            .collect();
        self.respond(QueryResponseKind::AccountAssetsResponse(AccountAssetResponse {
            account_assets,
        }))
    }

    fn account_detail(self, query: &GetAccountDetail) -> QueryResponse {
        let world = self.world;
        if !self.can_read(&query.account_id, &ACCOUNT_DETAIL) {
            return self.denied(&query.account_id);
        }
        let Some(account) = world.account(&query.account_id) else {
            return self.error(
                ErrorReason::NoAccountDetail,
                format!("No details for {}", query.account_id),
            );
        };
        let writer = Some(query.writer.as_str()).filter(|w| !w.is_empty());
        let key = Some(query.key.as_str()).filter(|k| !k.is_empty());
        let detail = account.details_json(writer, key).to_string();
        self.respond(QueryResponseKind::AccountDetailResponse(AccountDetailResponse {
            detail,
        }))
    }

    fn asset_info(self, asset_id: &str) -> QueryResponse {
        let world = self.world;
        if !self.world.has_permission(self.creator, RolePermission::CanReadAssets) {
            return self.denied(asset_id);
        }
        match world.asset(asset_id) {
            Some(asset) => {
                let asset = Asset {
                    asset_id: asset.asset_id.clone(),
                    domain_id: asset.domain_id.clone(),
                    precision: asset.precision,
                };
                self.respond(QueryResponseKind::AssetResponse(AssetResponse {
                    asset: Some(asset),
                }))
            }
            None => self.error(ErrorReason::NoAsset, format!("No asset {}", asset_id)),
        }
    }

    /// Every pending batch with a transaction created by the querying account,
    /// flattened in batch order
    async fn pending_transactions(self) -> QueryResponse {
        let transactions: Vec<Transaction> = self
            .pool
            .pending_for(self.creator)
            .await
            .into_iter()
            .flat_map(|batch| batch.into_transactions())
            .collect();
        self.respond(QueryResponseKind::TransactionsResponse(TransactionsResponse {
            transactions,
        }))
    }
}
