//! A metadata tracking store for ML pipelines.
//!
//! The store records artifacts (data), executions (runs of a step) and
//! contexts (groupings such as experiments), each with a typed schema, plus
//! the graph of events, attributions, associations and parent links among
//! them. Everything persists in SQLite or MySQL behind one typed API.
//!
//! ```no_run
//! use mlmeta::metadata::{Artifact, ArtifactType, PropertyType, TypeId};
//! use mlmeta::metadata_source::ConnectionConfig;
//! use mlmeta::metadata_store::options::{MigrationOptions, PutTypeOptions};
//! use mlmeta::MetadataStore;
//!
//! # async fn example() -> Result<(), mlmeta::MetadataError> {
//! let config = ConnectionConfig::sqlite("metadata.db");
//! let mut store = MetadataStore::connect(&config, &MigrationOptions::default()).await?;
//!
//! let mut data_set = ArtifactType {
//!     id: TypeId::new(0),
//!     name: "DataSet".to_owned(),
//!     version: None,
//!     description: None,
//!     properties: [("day".to_owned(), PropertyType::Int)].into_iter().collect(),
//! };
//! data_set.id = store
//!     .put_artifact_type(&data_set, &PutTypeOptions::default())
//!     .await?;
//!
//! let mut artifact = Artifact::new(data_set.id);
//! artifact.uri = Some("path/to/data".to_owned());
//! artifact.properties.insert("day".to_owned(), 1.into());
//! let ids = store.put_artifacts(&[artifact]).await?;
//! # let _ = ids;
//! # Ok(())
//! # }
//! ```
pub mod errors;
pub mod list_options;
pub mod metadata;
pub mod metadata_access;
pub mod metadata_source;
pub mod metadata_store;
pub mod query_config;
pub mod query_executor;

pub use self::errors::MetadataError;
pub use self::metadata_store::MetadataStore;
