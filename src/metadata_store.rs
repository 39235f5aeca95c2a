//! Store façade: the outward API. Every public call runs in exactly one
//! database transaction; transient conflicts roll back and retry with
//! exponential backoff, everything else propagates verbatim.
use crate::errors::MetadataError;
use crate::list_options::ListOperationOptions;
use crate::metadata::{
    Artifact, ArtifactType, Association, Attribution, Context, ContextType, Event, Execution,
    ExecutionType, Id, ParentContext, PropertySchema, TypeId, TypeKind,
};
use crate::metadata_access::MetadataAccessObject;
use crate::metadata_source::{ConnectionConfig, MetadataSource};
use crate::query_executor::QueryExecutor;
use std::time::Duration;

pub mod options;
#[cfg(test)]
mod tests;

use self::options::{MigrationOptions, PutTypeOptions};

const MAX_TRANSACTION_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Runs `$body` inside a transaction on `$store.access`, retrying transient
/// aborts. `$body` must evaluate to a `Result` and must not early-return
/// (the rollback below has to run on every failure).
macro_rules! run_in_transaction {
    ($store:expr, $body:expr) => {{
        let mut attempt: u32 = 0;
        loop {
            $store.access.begin().await?;
            let err = match $body {
                Ok(value) => match $store.access.commit().await {
                    Ok(()) => break Ok(value),
                    Err(err) => err,
                },
                Err(err) => err,
            };
            let _ = $store.access.rollback().await;
            attempt += 1;
            if err.is_transient() && attempt < MAX_TRANSACTION_ATTEMPTS {
                tracing::warn!(attempt, error = %err, "transaction aborted, retrying");
                async_std::task::sleep(RETRY_BASE_DELAY * (1u32 << attempt)).await;
                continue;
            }
            break Err(err);
        }
    }};
}

fn none_if_not_found<T>(
    result: Result<T, MetadataError>,
) -> Result<Option<T>, MetadataError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

fn empty_if_not_found<T>(
    result: Result<Vec<T>, MetadataError>,
) -> Result<Vec<T>, MetadataError> {
    match result {
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}

fn ok_if_already_exists<T>(result: Result<T, MetadataError>) -> Result<(), MetadataError> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.is_already_exists() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Reconciles the stored property schema with a given one under the put
/// options. Returns the merged schema, or the reason they are inconsistent.
fn check_fields_consistent(
    stored: &PropertySchema,
    given: &PropertySchema,
    options: &PutTypeOptions,
) -> Result<PropertySchema, String> {
    let mut omitted_fields_count = 0;
    for (name, stored_type) in stored {
        match given.get(name) {
            None => omitted_fields_count += 1,
            Some(given_type) if given_type != stored_type => {
                return Err(format!(
                    "conflicting property value type found in stored and given types: {}",
                    name
                ));
            }
            Some(_) => {}
        }
        if omitted_fields_count > 0 && !options.can_omit_fields {
            return Err(format!(
                "can_omit_fields is false while the stored type declares more properties \
                 than the given type (e.g. {})",
                name
            ));
        }
    }
    if stored.len() - omitted_fields_count == given.len() {
        return Ok(stored.clone());
    }
    if !options.can_add_fields {
        return Err(
            "can_add_fields is false while the given type declares more properties than \
             the stored type"
                .to_owned(),
        );
    }
    let mut merged = stored.clone();
    for (name, given_type) in given {
        merged.entry(name.clone()).or_insert(*given_type);
    }
    Ok(merged)
}

// Upsert bodies live as free functions so the transaction wrapper can
// re-evaluate them on retry.

async fn upsert_artifact_type(
    access: &mut MetadataAccessObject,
    given: &ArtifactType,
    options: &PutTypeOptions,
) -> Result<TypeId, MetadataError> {
    let stored = match access
        .find_artifact_type(&given.name, given.version.as_deref())
        .await
    {
        Err(err) if err.is_not_found() => return access.create_artifact_type(given).await,
        other => other?,
    };
    let merged = check_fields_consistent(&stored.properties, &given.properties, options)
        .map_err(|reason| {
            MetadataError::already_exists(format!(
                "type already exists with different properties: {}",
                reason
            ))
        })?;
    let mut updated = stored.clone();
    updated.properties = merged;
    access.update_artifact_type(&updated).await?;
    Ok(stored.id)
}

async fn upsert_execution_type(
    access: &mut MetadataAccessObject,
    given: &ExecutionType,
    options: &PutTypeOptions,
) -> Result<TypeId, MetadataError> {
    let stored = match access
        .find_execution_type(&given.name, given.version.as_deref())
        .await
    {
        Err(err) if err.is_not_found() => return access.create_execution_type(given).await,
        other => other?,
    };
    let merged = check_fields_consistent(&stored.properties, &given.properties, options)
        .map_err(|reason| {
            MetadataError::already_exists(format!(
                "type already exists with different properties: {}",
                reason
            ))
        })?;
    let mut updated = stored.clone();
    updated.properties = merged;
    access.update_execution_type(&updated).await?;
    Ok(stored.id)
}

async fn upsert_context_type(
    access: &mut MetadataAccessObject,
    given: &ContextType,
    options: &PutTypeOptions,
) -> Result<TypeId, MetadataError> {
    let stored = match access
        .find_context_type(&given.name, given.version.as_deref())
        .await
    {
        Err(err) if err.is_not_found() => return access.create_context_type(given).await,
        other => other?,
    };
    let merged = check_fields_consistent(&stored.properties, &given.properties, options)
        .map_err(|reason| {
            MetadataError::already_exists(format!(
                "type already exists with different properties: {}",
                reason
            ))
        })?;
    let mut updated = stored.clone();
    updated.properties = merged;
    access.update_context_type(&updated).await?;
    Ok(stored.id)
}

async fn upsert_artifacts(
    access: &mut MetadataAccessObject,
    artifacts: &[Artifact],
) -> Result<Vec<Id>, MetadataError> {
    let mut ids = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if artifact.id.get() > 0 {
            access.update_artifact(artifact).await?;
            ids.push(artifact.id);
        } else {
            ids.push(access.create_artifact(artifact).await?);
        }
    }
    Ok(ids)
}

async fn upsert_executions(
    access: &mut MetadataAccessObject,
    executions: &[Execution],
) -> Result<Vec<Id>, MetadataError> {
    let mut ids = Vec::with_capacity(executions.len());
    for execution in executions {
        if execution.id.get() > 0 {
            access.update_execution(execution).await?;
            ids.push(execution.id);
        } else {
            ids.push(access.create_execution(execution).await?);
        }
    }
    Ok(ids)
}

async fn upsert_contexts(
    access: &mut MetadataAccessObject,
    contexts: &[Context],
) -> Result<Vec<Id>, MetadataError> {
    let mut ids = Vec::with_capacity(contexts.len());
    for context in contexts {
        if context.id.get() > 0 {
            access.update_context(context).await?;
            ids.push(context.id);
        } else {
            ids.push(access.create_context(context).await?);
        }
    }
    Ok(ids)
}

async fn create_events(
    access: &mut MetadataAccessObject,
    events: &[Event],
) -> Result<Vec<i64>, MetadataError> {
    let mut event_ids = Vec::with_capacity(events.len());
    for event in events {
        event_ids.push(access.create_event(event).await?);
    }
    Ok(event_ids)
}

async fn insert_edges_if_not_exist(
    access: &mut MetadataAccessObject,
    attributions: &[Attribution],
    associations: &[Association],
) -> Result<(), MetadataError> {
    for attribution in attributions {
        ok_if_already_exists(access.create_attribution(attribution).await)?;
    }
    for association in associations {
        ok_if_already_exists(access.create_association(association).await)?;
    }
    Ok(())
}

async fn insert_parent_contexts_if_not_exist(
    access: &mut MetadataAccessObject,
    parent_contexts: &[ParentContext],
) -> Result<(), MetadataError> {
    for parent_context in parent_contexts {
        ok_if_already_exists(access.create_parent_context(parent_context).await)?;
    }
    Ok(())
}

async fn find_artifacts_of_type(
    access: &mut MetadataAccessObject,
    type_name: &str,
    type_version: Option<&str>,
) -> Result<Vec<Artifact>, MetadataError> {
    match access.find_artifact_type(type_name, type_version).await {
        Ok(artifact_type) => {
            empty_if_not_found(access.find_artifacts_by_type_id(artifact_type.id).await)
        }
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

async fn find_executions_of_type(
    access: &mut MetadataAccessObject,
    type_name: &str,
    type_version: Option<&str>,
) -> Result<Vec<Execution>, MetadataError> {
    match access.find_execution_type(type_name, type_version).await {
        Ok(execution_type) => {
            empty_if_not_found(access.find_executions_by_type_id(execution_type.id).await)
        }
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

async fn find_contexts_of_type(
    access: &mut MetadataAccessObject,
    type_name: &str,
    type_version: Option<&str>,
) -> Result<Vec<Context>, MetadataError> {
    match access.find_context_type(type_name, type_version).await {
        Ok(context_type) => {
            empty_if_not_found(access.find_contexts_by_type_id(context_type.id).await)
        }
        Err(err) if err.is_not_found() => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

async fn find_artifact_of_type_and_name(
    access: &mut MetadataAccessObject,
    type_name: &str,
    type_version: Option<&str>,
    artifact_name: &str,
) -> Result<Option<Artifact>, MetadataError> {
    match access.find_artifact_type(type_name, type_version).await {
        Ok(artifact_type) => none_if_not_found(
            access
                .find_artifact_by_type_id_and_name(artifact_type.id, artifact_name)
                .await,
        ),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

async fn find_execution_of_type_and_name(
    access: &mut MetadataAccessObject,
    type_name: &str,
    type_version: Option<&str>,
    execution_name: &str,
) -> Result<Option<Execution>, MetadataError> {
    match access.find_execution_type(type_name, type_version).await {
        Ok(execution_type) => none_if_not_found(
            access
                .find_execution_by_type_id_and_name(execution_type.id, execution_name)
                .await,
        ),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

async fn find_context_of_type_and_name(
    access: &mut MetadataAccessObject,
    type_name: &str,
    type_version: Option<&str>,
    context_name: &str,
) -> Result<Option<Context>, MetadataError> {
    match access.find_context_type(type_name, type_version).await {
        Ok(context_type) => none_if_not_found(
            access
                .find_context_by_type_id_and_name(context_type.id, context_name)
                .await,
        ),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Metadata tracking store over SQLite or MySQL.
///
/// One instance wraps one connection; open one instance per concurrent
/// caller.
#[derive(Debug)]
pub struct MetadataStore {
    access: MetadataAccessObject,
}

impl MetadataStore {
    /// Opens the database and brings the schema up. With
    /// `enable_upgrade_migration`, an older database is migrated forward to
    /// the library version first; without it, version skew fails with
    /// `FailedPrecondition`.
    pub async fn connect(
        config: &ConnectionConfig,
        options: &MigrationOptions,
    ) -> Result<Self, MetadataError> {
        let source = MetadataSource::connect(config).await?;
        let executor = QueryExecutor::new(source);
        let access = MetadataAccessObject::new(executor);
        let mut store = Self { access };
        let enable_upgrade_migration = options.enable_upgrade_migration;
        run_in_transaction!(
            store,
            store
                .access
                .init_metadata_source_if_not_exists(enable_upgrade_migration)
                .await
        )?;
        Ok(store)
    }

    /// Walks the database schema down to `to_schema_version` and closes the
    /// connection. Reopen with a library that matches the downgraded
    /// version.
    pub async fn downgrade(
        config: &ConnectionConfig,
        to_schema_version: i64,
    ) -> Result<(), MetadataError> {
        let source = MetadataSource::connect(config).await?;
        let mut access = MetadataAccessObject::new(QueryExecutor::new(source));
        access.begin().await?;
        match access.downgrade_metadata_source(to_schema_version).await {
            Ok(()) => {
                access.commit().await?;
                access.close().await
            }
            Err(err) => {
                let _ = access.rollback().await;
                Err(err)
            }
        }
    }

    pub fn library_version(&self) -> i64 {
        self.access.library_version()
    }

    pub async fn get_schema_version(&mut self) -> Result<i64, MetadataError> {
        run_in_transaction!(self, self.access.get_schema_version().await)
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    /// Registers or extends an artifact type; see [`PutTypeOptions`] for how
    /// differences against a stored type of the same `(name, version)` are
    /// resolved.
    pub async fn put_artifact_type(
        &mut self,
        artifact_type: &ArtifactType,
        options: &PutTypeOptions,
    ) -> Result<TypeId, MetadataError> {
        run_in_transaction!(
            self,
            upsert_artifact_type(&mut self.access, artifact_type, options).await
        )
    }

    pub async fn put_execution_type(
        &mut self,
        execution_type: &ExecutionType,
        options: &PutTypeOptions,
    ) -> Result<TypeId, MetadataError> {
        run_in_transaction!(
            self,
            upsert_execution_type(&mut self.access, execution_type, options).await
        )
    }

    pub async fn put_context_type(
        &mut self,
        context_type: &ContextType,
        options: &PutTypeOptions,
    ) -> Result<TypeId, MetadataError> {
        run_in_transaction!(
            self,
            upsert_context_type(&mut self.access, context_type, options).await
        )
    }

    pub async fn get_artifact_type(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
    ) -> Result<Option<ArtifactType>, MetadataError> {
        run_in_transaction!(
            self,
            none_if_not_found(self.access.find_artifact_type(type_name, type_version).await)
        )
    }

    pub async fn get_execution_type(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
    ) -> Result<Option<ExecutionType>, MetadataError> {
        run_in_transaction!(
            self,
            none_if_not_found(
                self.access
                    .find_execution_type(type_name, type_version)
                    .await
            )
        )
    }

    pub async fn get_context_type(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
    ) -> Result<Option<ContextType>, MetadataError> {
        run_in_transaction!(
            self,
            none_if_not_found(self.access.find_context_type(type_name, type_version).await)
        )
    }

    pub async fn get_artifact_types(&mut self) -> Result<Vec<ArtifactType>, MetadataError> {
        run_in_transaction!(self, self.access.find_artifact_types().await)
    }

    pub async fn get_execution_types(&mut self) -> Result<Vec<ExecutionType>, MetadataError> {
        run_in_transaction!(self, self.access.find_execution_types().await)
    }

    pub async fn get_context_types(&mut self) -> Result<Vec<ContextType>, MetadataError> {
        run_in_transaction!(self, self.access.find_context_types().await)
    }

    /// Records a parent link between two types of the same kind. Duplicate
    /// links resolve to OK.
    pub async fn put_parent_type(
        &mut self,
        kind: TypeKind,
        type_id: TypeId,
        parent_type_id: TypeId,
    ) -> Result<(), MetadataError> {
        run_in_transaction!(
            self,
            ok_if_already_exists(
                self.access
                    .create_parent_type(kind, type_id, parent_type_id)
                    .await
            )
        )
    }

    pub async fn get_parent_artifact_types(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<ArtifactType>, MetadataError> {
        run_in_transaction!(self, self.access.find_parent_artifact_types(type_id).await)
    }

    pub async fn get_parent_execution_types(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<ExecutionType>, MetadataError> {
        run_in_transaction!(self, self.access.find_parent_execution_types(type_id).await)
    }

    pub async fn get_parent_context_types(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<ContextType>, MetadataError> {
        run_in_transaction!(self, self.access.find_parent_context_types(type_id).await)
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    /// Creates or updates each artifact: an artifact with an id updates the
    /// stored row, one without is inserted. Returns the ids in order.
    pub async fn put_artifacts(
        &mut self,
        artifacts: &[Artifact],
    ) -> Result<Vec<Id>, MetadataError> {
        run_in_transaction!(self, upsert_artifacts(&mut self.access, artifacts).await)
    }

    pub async fn put_executions(
        &mut self,
        executions: &[Execution],
    ) -> Result<Vec<Id>, MetadataError> {
        run_in_transaction!(self, upsert_executions(&mut self.access, executions).await)
    }

    pub async fn put_contexts(&mut self, contexts: &[Context]) -> Result<Vec<Id>, MetadataError> {
        run_in_transaction!(self, upsert_contexts(&mut self.access, contexts).await)
    }

    pub async fn get_artifacts_by_id(
        &mut self,
        artifact_ids: &[Id],
    ) -> Result<Vec<Artifact>, MetadataError> {
        run_in_transaction!(self, self.access.find_artifacts_by_id(artifact_ids).await)
    }

    pub async fn get_executions_by_id(
        &mut self,
        execution_ids: &[Id],
    ) -> Result<Vec<Execution>, MetadataError> {
        run_in_transaction!(self, self.access.find_executions_by_id(execution_ids).await)
    }

    pub async fn get_contexts_by_id(
        &mut self,
        context_ids: &[Id],
    ) -> Result<Vec<Context>, MetadataError> {
        run_in_transaction!(self, self.access.find_contexts_by_id(context_ids).await)
    }

    pub async fn get_artifacts(&mut self) -> Result<Vec<Artifact>, MetadataError> {
        run_in_transaction!(self, self.access.find_artifacts().await)
    }

    pub async fn get_executions(&mut self) -> Result<Vec<Execution>, MetadataError> {
        run_in_transaction!(self, self.access.find_executions().await)
    }

    pub async fn get_contexts(&mut self) -> Result<Vec<Context>, MetadataError> {
        run_in_transaction!(self, self.access.find_contexts().await)
    }

    pub async fn get_artifacts_by_type(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
    ) -> Result<Vec<Artifact>, MetadataError> {
        run_in_transaction!(
            self,
            find_artifacts_of_type(&mut self.access, type_name, type_version).await
        )
    }

    pub async fn get_executions_by_type(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
    ) -> Result<Vec<Execution>, MetadataError> {
        run_in_transaction!(
            self,
            find_executions_of_type(&mut self.access, type_name, type_version).await
        )
    }

    pub async fn get_contexts_by_type(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
    ) -> Result<Vec<Context>, MetadataError> {
        run_in_transaction!(
            self,
            find_contexts_of_type(&mut self.access, type_name, type_version).await
        )
    }

    pub async fn get_artifact_by_type_and_name(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
        artifact_name: &str,
    ) -> Result<Option<Artifact>, MetadataError> {
        run_in_transaction!(
            self,
            find_artifact_of_type_and_name(
                &mut self.access,
                type_name,
                type_version,
                artifact_name
            )
            .await
        )
    }

    pub async fn get_execution_by_type_and_name(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
        execution_name: &str,
    ) -> Result<Option<Execution>, MetadataError> {
        run_in_transaction!(
            self,
            find_execution_of_type_and_name(
                &mut self.access,
                type_name,
                type_version,
                execution_name
            )
            .await
        )
    }

    pub async fn get_context_by_type_and_name(
        &mut self,
        type_name: &str,
        type_version: Option<&str>,
        context_name: &str,
    ) -> Result<Option<Context>, MetadataError> {
        run_in_transaction!(
            self,
            find_context_of_type_and_name(&mut self.access, type_name, type_version, context_name)
                .await
        )
    }

    pub async fn get_artifacts_by_uri(
        &mut self,
        uri: &str,
    ) -> Result<Vec<Artifact>, MetadataError> {
        run_in_transaction!(
            self,
            empty_if_not_found(self.access.find_artifacts_by_uri(uri).await)
        )
    }

    /// Paginated scan over all artifacts; see [`ListOperationOptions`].
    /// Returns the page and, when more data remains, the token for the next
    /// one.
    pub async fn list_artifacts(
        &mut self,
        options: &ListOperationOptions,
    ) -> Result<(Vec<Artifact>, Option<String>), MetadataError> {
        run_in_transaction!(self, self.access.list_artifacts(options, None).await)
    }

    pub async fn list_executions(
        &mut self,
        options: &ListOperationOptions,
    ) -> Result<(Vec<Execution>, Option<String>), MetadataError> {
        run_in_transaction!(self, self.access.list_executions(options, None).await)
    }

    pub async fn list_contexts(
        &mut self,
        options: &ListOperationOptions,
    ) -> Result<(Vec<Context>, Option<String>), MetadataError> {
        run_in_transaction!(self, self.access.list_contexts(options, None).await)
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Records input/output events. Each event's artifact and execution must
    /// already exist; a duplicate `(artifact, execution, type)` triple fails
    /// with `AlreadyExists`.
    pub async fn put_events(&mut self, events: &[Event]) -> Result<Vec<i64>, MetadataError> {
        run_in_transaction!(self, create_events(&mut self.access, events).await)
    }

    pub async fn get_events_by_artifact_ids(
        &mut self,
        artifact_ids: &[Id],
    ) -> Result<Vec<Event>, MetadataError> {
        run_in_transaction!(
            self,
            empty_if_not_found(self.access.find_events_by_artifacts(artifact_ids).await)
        )
    }

    pub async fn get_events_by_execution_ids(
        &mut self,
        execution_ids: &[Id],
    ) -> Result<Vec<Event>, MetadataError> {
        run_in_transaction!(
            self,
            empty_if_not_found(self.access.find_events_by_executions(execution_ids).await)
        )
    }

    // ---------------------------------------------------------------------
    // Context edges
    // ---------------------------------------------------------------------

    /// Records context edges. Existing edges resolve to OK, making the call
    /// safe to repeat.
    pub async fn put_attributions_and_associations(
        &mut self,
        attributions: &[Attribution],
        associations: &[Association],
    ) -> Result<(), MetadataError> {
        run_in_transaction!(
            self,
            insert_edges_if_not_exist(&mut self.access, attributions, associations).await
        )
    }

    pub async fn put_parent_contexts(
        &mut self,
        parent_contexts: &[ParentContext],
    ) -> Result<(), MetadataError> {
        run_in_transaction!(
            self,
            insert_parent_contexts_if_not_exist(&mut self.access, parent_contexts).await
        )
    }

    pub async fn get_contexts_by_artifact(
        &mut self,
        artifact_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        run_in_transaction!(
            self,
            empty_if_not_found(self.access.find_contexts_by_artifact(artifact_id).await)
        )
    }

    pub async fn get_contexts_by_execution(
        &mut self,
        execution_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        run_in_transaction!(
            self,
            empty_if_not_found(self.access.find_contexts_by_execution(execution_id).await)
        )
    }

    pub async fn get_artifacts_by_context(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Artifact>, MetadataError> {
        run_in_transaction!(self, self.access.find_artifacts_by_context(context_id).await)
    }

    pub async fn get_executions_by_context(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Execution>, MetadataError> {
        run_in_transaction!(
            self,
            self.access.find_executions_by_context(context_id).await
        )
    }

    /// Paginated variant of [`Self::get_artifacts_by_context`].
    pub async fn list_artifacts_by_context(
        &mut self,
        context_id: Id,
        options: &ListOperationOptions,
    ) -> Result<(Vec<Artifact>, Option<String>), MetadataError> {
        run_in_transaction!(
            self,
            self.access
                .list_artifacts_by_context(context_id, options)
                .await
        )
    }

    /// Paginated variant of [`Self::get_executions_by_context`].
    pub async fn list_executions_by_context(
        &mut self,
        context_id: Id,
        options: &ListOperationOptions,
    ) -> Result<(Vec<Execution>, Option<String>), MetadataError> {
        run_in_transaction!(
            self,
            self.access
                .list_executions_by_context(context_id, options)
                .await
        )
    }

    pub async fn get_parent_contexts(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        run_in_transaction!(
            self,
            self.access
                .find_parent_contexts_by_context_id(context_id)
                .await
        )
    }

    pub async fn get_children_contexts(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        run_in_transaction!(
            self,
            self.access
                .find_child_contexts_by_context_id(context_id)
                .await
        )
    }
}
