use crate::error::ValidationError;
use crate::queries::{BlocksQuery, Query, QueryKind, QueryPayload, QueryPayloadMeta};
use crate::types::now_millis;
use crate::validation::Validator;

/// Builder for unsigned queries
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    creator_account_id: String,
    counter: u64,
    created_time: Option<u64>,
    validator: Validator,
}

impl QueryBuilder {
    pub fn new(creator_account_id: impl Into<String>) -> Self {
        Self {
            creator_account_id: creator_account_id.into(),
            counter: 1,
            created_time: None,
            validator: Validator::default(),
        }
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Per-creator query counter; must be greater than zero
    pub fn counter(mut self, counter: u64) -> Self {
        self.counter = counter;
        self
    }

    pub fn created_time(mut self, created_time: u64) -> Self {
        self.created_time = Some(created_time);
        self
    }

    fn meta(&self) -> Result<QueryPayloadMeta, ValidationError> {
        let now = now_millis();
        let meta = QueryPayloadMeta {
            created_time: self.created_time.unwrap_or(now),
            creator_account_id: self.creator_account_id.clone(),
            query_counter: self.counter,
        };
        self.validator.validate_query_meta(Some(&meta), now)?;
        Ok(meta)
    }

    pub fn build(&self, kind: QueryKind) -> Result<Query, ValidationError> {
        Ok(Query {
            payload: Some(QueryPayload {
                meta: Some(self.meta()?),
                query: Some(kind),
            }),
            signature: None,
        })
    }

    /// Blocks subscription query with the same meta
    pub fn build_blocks(&self) -> Result<BlocksQuery, ValidationError> {
        Ok(BlocksQuery {
            meta: Some(self.meta()?),
            signature: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_meta_populated() {
        let query = QueryBuilder::new("alice@test")
            .counter(7)
            .build(QueryKind::get_account("bob@test"))
            .unwrap();
        let meta = query.meta().unwrap();
        assert_eq!(meta.creator_account_id, "alice@test");
        assert_eq!(meta.query_counter, 7);
        assert!(query.signature.is_none());
        assert_eq!(query.kind().unwrap().name(), "GetAccount");
    }

    #[test]
    fn test_zero_counter_rejected() {
        let result = QueryBuilder::new("alice@test")
            .counter(0)
            .build(QueryKind::get_pending_transactions());
        assert_eq!(result, Err(ValidationError::ZeroCounter));
    }

    #[test]
    fn test_blocks_query() {
        let query = QueryBuilder::new("alice@test").build_blocks().unwrap();
        assert_eq!(query.creator_account_id(), "alice@test");
        assert!(QueryBuilder::new("nobody").build_blocks().is_err());
    }
}
