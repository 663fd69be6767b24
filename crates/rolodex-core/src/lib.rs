//! Backend selection, the unified CRUD facade and entity composition.
//!
//! One deployment configuration switch chooses the relational or the
//! key-value engine at process start; route handlers talk to the `Crud`
//! trait and stay backend-agnostic. Parity between the two engines is
//! enforced at the contract level only — the backends are never kept in
//! sync, and exactly one is authoritative per deployment.

pub mod config;
pub mod facade;
pub mod logging;
pub mod mapper;

pub use config::{BackendKind, DeploymentConfig, EnvSecretProvider, SecretProvider};
pub use facade::{select_backend, CreatedEntity, Crud, KvFacade, RelationalFacade};
pub use logging::init_logging;
pub use mapper::CompositionMapper;
