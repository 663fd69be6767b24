//! The backend-agnostic CRUD surface.
//!
//! `Crud` is the seam the rest of the application programs against. One
//! implementation sits over the relational engine, one over the key-value
//! engine; `select_backend` builds whichever the deployment configuration
//! names. The two facades agree on the contract (error taxonomy, response
//! shape, tenant isolation), not on observable internals like page
//! arithmetic under filtering.

use async_trait::async_trait;
use log::info;
use rolodex_commons::{
    generate_external_id, ExternalId, Record, RolodexError, RolodexResult, SearchOptions,
    SearchResponse, TableName, TypeEntry, UserId,
};
use rolodex_pg::{create_pool, RelationalEngine};
use rolodex_store::{KvEngine, RocksDbBackend, StorageBackend};
use std::sync::Arc;

use crate::config::{BackendKind, DeploymentConfig, SecretProvider};

/// What a successful create hands back: the generated external identifier
/// and nothing else.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreatedEntity {
    pub uid: String,
}

/// Tenant-scoped CRUD over one of the storage engines.
#[async_trait]
pub trait Crud: Send + Sync {
    async fn create(
        &self,
        table: TableName,
        caller: UserId,
        body: &Record,
    ) -> RolodexResult<CreatedEntity>;

    async fn read(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<Record>;

    async fn update(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
        body: &Record,
    ) -> RolodexResult<CreatedEntity>;

    async fn delete(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<()>;

    async fn search(
        &self,
        table: TableName,
        caller: UserId,
        options: &SearchOptions,
    ) -> RolodexResult<SearchResponse>;

    async fn types(&self) -> RolodexResult<Vec<TypeEntry>>;
}

/// `Crud` over Postgres.
pub struct RelationalFacade {
    engine: Arc<RelationalEngine>,
}

impl RelationalFacade {
    pub fn new(engine: Arc<RelationalEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> Arc<RelationalEngine> {
        Arc::clone(&self.engine)
    }
}

#[async_trait]
impl Crud for RelationalFacade {
    async fn create(
        &self,
        table: TableName,
        caller: UserId,
        body: &Record,
    ) -> RolodexResult<CreatedEntity> {
        let uid = self.engine.create(table, caller, body).await?;
        Ok(CreatedEntity {
            uid: uid.to_string(),
        })
    }

    async fn read(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<Record> {
        self.engine.get(table, caller, uid).await
    }

    async fn update(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
        body: &Record,
    ) -> RolodexResult<CreatedEntity> {
        let uid = self.engine.update(table, caller, uid, body).await?;
        Ok(CreatedEntity {
            uid: uid.to_string(),
        })
    }

    /// Delete is soft here: rows are marked and disappear from the
    /// liveness predicate rather than being removed.
    async fn delete(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<()> {
        self.engine.soft_delete(table, caller, uid).await
    }

    async fn search(
        &self,
        table: TableName,
        caller: UserId,
        options: &SearchOptions,
    ) -> RolodexResult<SearchResponse> {
        let page = self.engine.list(table, caller, options).await?;
        Ok(SearchResponse::from(page))
    }

    async fn types(&self) -> RolodexResult<Vec<TypeEntry>> {
        self.engine.get_types().await
    }
}

/// `Crud` over the embedded key-value store.
pub struct KvFacade {
    engine: KvEngine,
}

impl KvFacade {
    pub fn new(engine: KvEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Crud for KvFacade {
    /// Generates the external identifier here; the stored document never
    /// carries an internal key at all.
    async fn create(
        &self,
        table: TableName,
        caller: UserId,
        body: &Record,
    ) -> RolodexResult<CreatedEntity> {
        if body.is_empty() {
            return Err(RolodexError::invalid_input(format!(
                "No data to insert for {table}"
            )));
        }
        let uid = ExternalId::new(generate_external_id(""));
        self.engine.create(table, caller, &uid, body, None)?;
        Ok(CreatedEntity {
            uid: uid.to_string(),
        })
    }

    async fn read(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<Record> {
        self.engine
            .read(table, caller, uid)?
            .ok_or_else(|| RolodexError::not_found(format!("No entity with id: {uid}")))
    }

    async fn update(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
        body: &Record,
    ) -> RolodexResult<CreatedEntity> {
        if body.is_empty() {
            return Err(RolodexError::invalid_input(format!(
                "No data to update for {table}"
            )));
        }
        self.engine.update(table, caller, uid, body, None)?;
        Ok(CreatedEntity {
            uid: uid.to_string(),
        })
    }

    /// Delete is physical here; there is no liveness predicate to honor.
    async fn delete(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<()> {
        self.engine.delete(table, caller, uid)
    }

    /// The scan is unpaginated, so every search is page zero and the page
    /// count is one whenever anything was scanned.
    async fn search(
        &self,
        table: TableName,
        caller: UserId,
        options: &SearchOptions,
    ) -> RolodexResult<SearchResponse> {
        let found = self.engine.search(table, caller, options)?;
        Ok(SearchResponse {
            total: found.total,
            count: found.count,
            page: 0,
            page_size: options.page_size,
            pages: if found.total > 0 { 1 } else { 0 },
            results: found.results,
        })
    }

    /// No type catalog exists in the key-value store.
    async fn types(&self) -> RolodexResult<Vec<TypeEntry>> {
        Ok(Vec::new())
    }
}

/// Builds the facade named by the deployment configuration. Exactly one
/// backend is authoritative per deployment; nothing here keeps the two in
/// sync.
pub async fn select_backend(
    config: &DeploymentConfig,
    secrets: &dyn SecretProvider,
) -> RolodexResult<Arc<dyn Crud>> {
    match config.backend {
        BackendKind::Relational => {
            info!("selecting relational backend");
            let secret = secrets.get_secret(&config.relational.secret_name).await?;
            let pool = create_pool(&secret, &config.relational.pool)?;
            let engine = Arc::new(RelationalEngine::new(pool));
            Ok(Arc::new(RelationalFacade::new(engine)))
        }
        BackendKind::KeyValue => {
            info!("selecting key-value backend at {}", config.keyvalue.path);
            let partitions: Vec<&str> = TableName::ALL.iter().map(|t| t.as_str()).collect();
            let backend = RocksDbBackend::open(&config.keyvalue.path, &partitions)?;
            let backend: Arc<dyn StorageBackend> = Arc::new(backend);
            let engine = KvEngine::new(backend)?;
            Ok(Arc::new(KvFacade::new(engine)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolodex_store::InMemoryBackend;
    use serde_json::json;

    fn kv_facade() -> KvFacade {
        let backend: Arc<dyn StorageBackend> = Arc::new(InMemoryBackend::new());
        KvFacade::new(KvEngine::new(backend).unwrap())
    }

    fn body(value: serde_json::Value) -> Record {
        Record::from_json(value).unwrap()
    }

    #[tokio::test]
    async fn test_kv_create_then_read() {
        let facade = kv_facade();
        let caller = UserId::new(7);
        let created = facade
            .create(
                TableName::Contact,
                caller,
                &body(json!({"name": "Ada", "search": "ada lovelace"})),
            )
            .await
            .unwrap();
        assert_eq!(created.uid.len(), 32);

        let uid = ExternalId::new(created.uid.clone());
        let record = facade.read(TableName::Contact, caller, &uid).await.unwrap();
        assert_eq!(record.get_str("name"), Some("Ada"));
    }

    #[tokio::test]
    async fn test_kv_create_forwards_body_search_value() {
        let facade = kv_facade();
        let caller = UserId::new(7);
        let created = facade
            .create(
                TableName::Contact,
                caller,
                &body(json!({"name": "Alice", "search": "alice smith melbourne"})),
            )
            .await
            .unwrap();

        let uid = ExternalId::new(created.uid);
        let record = facade.read(TableName::Contact, caller, &uid).await.unwrap();
        assert_eq!(record.get_str("search"), Some("alice smith melbourne"));

        // exact search must find the document through the stored value
        let mut options = SearchOptions::all();
        options.search_term = Some("alice smith melbourne".to_string());
        options.exact_match = true;
        let response = facade.search(TableName::Contact, caller, &options).await.unwrap();
        assert_eq!(response.count, 1);
    }

    #[tokio::test]
    async fn test_kv_read_missing_is_not_found() {
        let facade = kv_facade();
        let err = facade
            .read(TableName::Contact, UserId::new(7), &ExternalId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, RolodexError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_kv_create_rejects_empty_body() {
        let facade = kv_facade();
        let err = facade
            .create(TableName::Contact, UserId::new(7), &Record::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RolodexError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_kv_delete_then_read_is_not_found() {
        let facade = kv_facade();
        let caller = UserId::new(7);
        let created = facade
            .create(TableName::Tag, caller, &body(json!({"name": "work"})))
            .await
            .unwrap();
        let uid = ExternalId::new(created.uid);
        facade.delete(TableName::Tag, caller, &uid).await.unwrap();
        assert!(facade.read(TableName::Tag, caller, &uid).await.is_err());
        // Idempotent: a second delete still succeeds.
        facade.delete(TableName::Tag, caller, &uid).await.unwrap();
    }

    #[tokio::test]
    async fn test_kv_search_shape() {
        let facade = kv_facade();
        let caller = UserId::new(7);
        for name in ["alpha", "beta", "gamma"] {
            facade
                .create(TableName::Tag, caller, &body(json!({"name": name})))
                .await
                .unwrap();
        }

        let mut options = SearchOptions::all();
        options.search_term = Some("a".to_string());
        let response = facade.search(TableName::Tag, caller, &options).await.unwrap();
        assert_eq!(response.total, 3);
        assert_eq!(response.count, 3); // alpha, beta, gamma all contain "a"
        assert_eq!(response.page, 0);
        assert_eq!(response.pages, 1);

        options.search_term = Some("alph".to_string());
        let response = facade.search(TableName::Tag, caller, &options).await.unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.total, 3);
    }

    #[tokio::test]
    async fn test_kv_types_is_empty() {
        let facade = kv_facade();
        assert!(facade.types().await.unwrap().is_empty());
    }
}
