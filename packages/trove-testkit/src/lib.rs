//! Test support: throwaway databases for storage tests and in-memory doubles of every
//! collaborator the discovery pipeline talks to.

pub mod doubles;

mod config;
mod database;
mod error;

pub use config::{TEST_VECTOR_DIM, test_config};
pub use database::{TestDatabase, env_dsn, env_qdrant_url};
pub use doubles::{MemoryCatalog, MemoryCategoryIndex, MemoryUserStore, ScriptedChat, StubEmbedding};
pub use error::{Error, Result};
