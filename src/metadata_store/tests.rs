use super::options::{MigrationOptions, PutTypeOptions};
use super::MetadataStore;
use crate::errors::MetadataError;
use crate::list_options::{ListOperationOptions, OrderByField};
use crate::metadata::{
    Artifact, ArtifactState, ArtifactType, Association, Attribution, Context, ContextType, Event,
    EventStep, EventType, Execution, ExecutionState, ExecutionType, Id, ParentContext,
    PropertySchema, PropertyType, PropertyValue, TypeId, TypeKind,
};
use crate::metadata_source::ConnectionConfig;
use tempfile::NamedTempFile;

async fn fake_store() -> MetadataStore {
    MetadataStore::connect(&ConnectionConfig::FakeDatabase, &MigrationOptions::default())
        .await
        .unwrap()
}

fn artifact_type(name: &str, properties: &[(&str, PropertyType)]) -> ArtifactType {
    ArtifactType {
        id: TypeId::new(0),
        name: name.to_owned(),
        version: None,
        description: None,
        properties: schema(properties),
    }
}

fn execution_type(name: &str, properties: &[(&str, PropertyType)]) -> ExecutionType {
    ExecutionType {
        id: TypeId::new(0),
        name: name.to_owned(),
        version: None,
        description: None,
        properties: schema(properties),
        input_type: None,
        output_type: None,
    }
}

fn context_type(name: &str, properties: &[(&str, PropertyType)]) -> ContextType {
    ContextType {
        id: TypeId::new(0),
        name: name.to_owned(),
        version: None,
        description: None,
        properties: schema(properties),
    }
}

fn schema(properties: &[(&str, PropertyType)]) -> PropertySchema {
    properties
        .iter()
        .map(|(name, property_type)| ((*name).to_owned(), *property_type))
        .collect()
}

#[async_std::test]
async fn initialization_works() -> anyhow::Result<()> {
    // A new on-disk database.
    let file = NamedTempFile::new()?;
    let path = file
        .path()
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("invalid path"))?;
    MetadataStore::connect(
        &ConnectionConfig::sqlite(path),
        &MigrationOptions::default(),
    )
    .await?;

    // Reopening the same database succeeds and keeps the schema version.
    let mut store = MetadataStore::connect(
        &ConnectionConfig::sqlite(path),
        &MigrationOptions::default(),
    )
    .await?;
    assert_eq!(store.get_schema_version().await?, store.library_version());
    Ok(())
}

#[async_std::test]
async fn put_artifact_type_enforces_consistency() -> anyhow::Result<()> {
    let mut store = fake_store().await;

    let t0 = artifact_type("t0", &[("p0", PropertyType::Int)]);
    let t0_id = store.put_artifact_type(&t0, &PutTypeOptions::default()).await?;

    // Conflicting property type.
    let conflicting = artifact_type("t0", &[("p0", PropertyType::Double)]);
    assert!(matches!(
        store
            .put_artifact_type(&conflicting, &PutTypeOptions::default())
            .await,
        Err(MetadataError::AlreadyExists(_))
    ));

    // New property without can_add_fields.
    let extended = artifact_type("t0", &[("p0", PropertyType::Int), ("p1", PropertyType::String)]);
    assert!(matches!(
        store
            .put_artifact_type(&extended, &PutTypeOptions::default())
            .await,
        Err(MetadataError::AlreadyExists(_))
    ));
    let same_id = store
        .put_artifact_type(&extended, &PutTypeOptions::default().can_add_fields())
        .await?;
    assert_eq!(same_id, t0_id);

    // Omitting properties without can_omit_fields.
    let empty = artifact_type("t0", &[]);
    assert!(matches!(
        store.put_artifact_type(&empty, &PutTypeOptions::default()).await,
        Err(MetadataError::AlreadyExists(_))
    ));
    store
        .put_artifact_type(&empty, &PutTypeOptions::default().can_omit_fields())
        .await?;

    let stored = store.get_artifact_type("t0", None).await?.unwrap();
    assert_eq!(stored.id, t0_id);
    assert_eq!(
        stored.properties,
        schema(&[("p0", PropertyType::Int), ("p1", PropertyType::String)])
    );
    Ok(())
}

#[async_std::test]
async fn type_versions_are_distinct() -> anyhow::Result<()> {
    let mut store = fake_store().await;

    let unversioned = artifact_type("Model", &[]);
    let mut versioned = artifact_type("Model", &[("rev", PropertyType::Int)]);
    versioned.version = Some("v2".to_owned());

    let unversioned_id = store
        .put_artifact_type(&unversioned, &PutTypeOptions::default())
        .await?;
    let versioned_id = store
        .put_artifact_type(&versioned, &PutTypeOptions::default())
        .await?;
    assert_ne!(unversioned_id, versioned_id);

    let fetched = store.get_artifact_type("Model", Some("v2")).await?.unwrap();
    assert_eq!(fetched.id, versioned_id);
    assert_eq!(fetched.version.as_deref(), Some("v2"));
    assert!(store.get_artifact_type("Model", Some("v3")).await?.is_none());
    Ok(())
}

#[async_std::test]
async fn execution_type_keeps_its_signature() -> anyhow::Result<()> {
    use crate::metadata::ArtifactStructType;

    let mut store = fake_store().await;
    let mut trainer = execution_type("Trainer", &[("steps", PropertyType::Int)]);
    trainer.input_type = Some(ArtifactStructType::Simple("DataSet".to_owned()));
    trainer.output_type = Some(ArtifactStructType::List(Box::new(
        ArtifactStructType::Simple("SavedModel".to_owned()),
    )));

    store
        .put_execution_type(&trainer, &PutTypeOptions::default())
        .await?;
    let stored = store.get_execution_type("Trainer", None).await?.unwrap();
    assert_eq!(stored.input_type, trainer.input_type);
    assert_eq!(stored.output_type, trainer.output_type);
    Ok(())
}

#[async_std::test]
async fn put_and_get_artifacts_work() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let type_id = store
        .put_artifact_type(
            &artifact_type(
                "DataSet",
                &[("day", PropertyType::Int), ("split", PropertyType::String)],
            ),
            &PutTypeOptions::default(),
        )
        .await?;

    let mut artifact = Artifact::new(type_id);
    artifact.uri = Some("path/to/data".to_owned());
    artifact.state = Some(ArtifactState::Live);
    artifact.properties.insert("day".to_owned(), 1.into());
    artifact
        .properties
        .insert("split".to_owned(), "train".into());
    artifact
        .custom_properties
        .insert("owner".to_owned(), "team-a".into());

    let ids = store.put_artifacts(&[artifact.clone()]).await?;
    assert_eq!(ids.len(), 1);

    let stored = store.get_artifacts_by_id(&ids).await?;
    assert_eq!(stored.len(), 1);
    let stored = &stored[0];
    assert_eq!(stored.id, ids[0]);
    assert_eq!(stored.uri.as_deref(), Some("path/to/data"));
    assert_eq!(stored.state, Some(ArtifactState::Live));
    assert_eq!(stored.properties, artifact.properties);
    assert_eq!(stored.custom_properties, artifact.custom_properties);
    assert!(stored.create_time_since_epoch > 0);
    assert!(stored.last_update_time_since_epoch >= stored.create_time_since_epoch);

    // By URI and by type.
    assert_eq!(store.get_artifacts_by_uri("path/to/data").await?.len(), 1);
    assert!(store.get_artifacts_by_uri("no/such/uri").await?.is_empty());
    assert_eq!(store.get_artifacts_by_type("DataSet", None).await?.len(), 1);
    assert!(store.get_artifacts_by_type("Missing", None).await?.is_empty());

    // Unknown ids are skipped.
    let with_unknown = store
        .get_artifacts_by_id(&[ids[0], Id::new(9999)])
        .await?;
    assert_eq!(with_unknown.len(), 1);
    Ok(())
}

#[async_std::test]
async fn artifact_with_undeclared_property_is_rejected() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let type_id = store
        .put_artifact_type(
            &artifact_type("DataSet", &[("day", PropertyType::Int)]),
            &PutTypeOptions::default(),
        )
        .await?;

    let mut undeclared = Artifact::new(type_id);
    undeclared.properties.insert("split".to_owned(), "x".into());
    assert!(matches!(
        store.put_artifacts(&[undeclared]).await,
        Err(MetadataError::InvalidArgument(_))
    ));

    let mut mistyped = Artifact::new(type_id);
    mistyped.properties.insert("day".to_owned(), "one".into());
    assert!(matches!(
        store.put_artifacts(&[mistyped]).await,
        Err(MetadataError::InvalidArgument(_))
    ));

    // Custom properties are free-form.
    let mut custom = Artifact::new(type_id);
    custom.custom_properties.insert("day".to_owned(), "one".into());
    store.put_artifacts(&[custom]).await?;
    Ok(())
}

#[async_std::test]
async fn node_names_are_unique_per_type() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let type_id = store
        .put_artifact_type(&artifact_type("DataSet", &[]), &PutTypeOptions::default())
        .await?;
    let other_type_id = store
        .put_artifact_type(&artifact_type("Model", &[]), &PutTypeOptions::default())
        .await?;

    let mut named = Artifact::new(type_id);
    named.name = Some("snapshot".to_owned());
    store.put_artifacts(&[named.clone()]).await?;

    assert!(matches!(
        store.put_artifacts(&[named.clone()]).await,
        Err(MetadataError::AlreadyExists(_))
    ));

    // Same name under a different type is fine.
    let mut other = Artifact::new(other_type_id);
    other.name = Some("snapshot".to_owned());
    store.put_artifacts(&[other]).await?;

    let found = store
        .get_artifact_by_type_and_name("DataSet", None, "snapshot")
        .await?;
    assert!(found.is_some());
    assert!(store
        .get_artifact_by_type_and_name("DataSet", None, "missing")
        .await?
        .is_none());
    Ok(())
}

#[async_std::test]
async fn update_artifact_diffs_properties() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let type_id = store
        .put_artifact_type(
            &artifact_type(
                "DataSet",
                &[("day", PropertyType::Int), ("split", PropertyType::String)],
            ),
            &PutTypeOptions::default(),
        )
        .await?;

    let mut artifact = Artifact::new(type_id);
    artifact.properties.insert("day".to_owned(), 1.into());
    artifact
        .properties
        .insert("split".to_owned(), "train".into());
    let ids = store.put_artifacts(&[artifact]).await?;

    let mut stored = store.get_artifacts_by_id(&ids).await?.remove(0);
    let created_at = stored.create_time_since_epoch;

    // Update one property, drop another, add a custom one.
    stored.properties.insert("day".to_owned(), 2.into());
    stored.properties.remove("split");
    stored
        .custom_properties
        .insert("note".to_owned(), PropertyValue::Double(0.5));
    stored.state = Some(ArtifactState::MarkedForDeletion);
    let updated_ids = store.put_artifacts(&[stored.clone()]).await?;
    assert_eq!(updated_ids, ids);

    let reread = store.get_artifacts_by_id(&ids).await?.remove(0);
    assert_eq!(reread.properties.get("day"), Some(&PropertyValue::Int(2)));
    assert!(reread.properties.get("split").is_none());
    assert_eq!(
        reread.custom_properties.get("note"),
        Some(&PropertyValue::Double(0.5))
    );
    assert_eq!(reread.state, Some(ArtifactState::MarkedForDeletion));
    assert_eq!(reread.create_time_since_epoch, created_at);
    assert!(reread.last_update_time_since_epoch >= created_at);

    // Updating a node that does not exist is an input error.
    let mut missing = reread.clone();
    missing.id = Id::new(4242);
    assert!(matches!(
        store.put_artifacts(&[missing]).await,
        Err(MetadataError::InvalidArgument(_))
    ));
    Ok(())
}

#[async_std::test]
async fn struct_properties_round_trip() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let type_id = store
        .put_artifact_type(
            &artifact_type("Report", &[("summary", PropertyType::Struct)]),
            &PutTypeOptions::default(),
        )
        .await?;

    let summary = serde_json::json!({"rows": 10, "tags": ["a", "b"]});
    let mut artifact = Artifact::new(type_id);
    artifact
        .properties
        .insert("summary".to_owned(), PropertyValue::Struct(summary.clone()));
    let ids = store.put_artifacts(&[artifact]).await?;

    let stored = store.get_artifacts_by_id(&ids).await?.remove(0);
    assert_eq!(
        stored.properties.get("summary"),
        Some(&PropertyValue::Struct(summary))
    );
    Ok(())
}

#[async_std::test]
async fn executions_and_contexts_round_trip() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let execution_type_id = store
        .put_execution_type(
            &execution_type("Trainer", &[("steps", PropertyType::Int)]),
            &PutTypeOptions::default(),
        )
        .await?;
    let context_type_id = store
        .put_context_type(
            &context_type("Experiment", &[("note", PropertyType::String)]),
            &PutTypeOptions::default(),
        )
        .await?;

    let mut execution = Execution::new(execution_type_id);
    execution.last_known_state = Some(ExecutionState::Running);
    execution.properties.insert("steps".to_owned(), 100.into());
    let execution_ids = store.put_executions(&[execution]).await?;

    let mut stored_execution = store.get_executions_by_id(&execution_ids).await?.remove(0);
    assert_eq!(
        stored_execution.last_known_state,
        Some(ExecutionState::Running)
    );
    stored_execution.last_known_state = Some(ExecutionState::Complete);
    store.put_executions(&[stored_execution]).await?;
    let reread = store.get_executions_by_id(&execution_ids).await?.remove(0);
    assert_eq!(reread.last_known_state, Some(ExecutionState::Complete));

    // Context requires a name.
    let unnamed = Context::new(context_type_id, "");
    assert!(matches!(
        store.put_contexts(&[unnamed]).await,
        Err(MetadataError::InvalidArgument(_))
    ));

    let mut context = Context::new(context_type_id, "exp.1");
    context
        .properties
        .insert("note".to_owned(), "first experiment".into());
    let context_ids = store.put_contexts(&[context.clone()]).await?;

    // Duplicate context name within the type.
    assert!(matches!(
        store.put_contexts(&[context]).await,
        Err(MetadataError::AlreadyExists(_))
    ));

    let stored_context = store
        .get_context_by_type_and_name("Experiment", None, "exp.1")
        .await?
        .unwrap();
    assert_eq!(stored_context.id, context_ids[0]);
    assert_eq!(
        store.get_contexts_by_type("Experiment", None).await?.len(),
        1
    );
    Ok(())
}

#[async_std::test]
async fn events_record_paths_and_reject_duplicates() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let artifact_type_id = store
        .put_artifact_type(&artifact_type("DataSet", &[]), &PutTypeOptions::default())
        .await?;
    let execution_type_id = store
        .put_execution_type(&execution_type("Trainer", &[]), &PutTypeOptions::default())
        .await?;

    let artifact_ids = store
        .put_artifacts(&[Artifact::new(artifact_type_id)])
        .await?;
    let execution_ids = store
        .put_executions(&[Execution::new(execution_type_id)])
        .await?;

    let mut event = Event::new(EventType::Input, artifact_ids[0], execution_ids[0]);
    event.path = vec![EventStep::Index(3), EventStep::Key("features".to_owned())];
    store.put_events(&[event.clone()]).await?;

    // The (artifact, execution, type) triple is unique.
    assert!(matches!(
        store.put_events(&[event.clone()]).await,
        Err(MetadataError::AlreadyExists(_))
    ));
    // A different event type on the same pair is a new edge.
    let output = Event::new(EventType::Output, artifact_ids[0], execution_ids[0]);
    store.put_events(&[output]).await?;

    let events = store.get_events_by_artifact_ids(&artifact_ids).await?;
    assert_eq!(events.len(), 2);
    let input = events
        .iter()
        .find(|e| e.event_type == EventType::Input)
        .unwrap();
    assert_eq!(
        input.path,
        vec![EventStep::Index(3), EventStep::Key("features".to_owned())]
    );
    assert!(input.milliseconds_since_epoch.is_some());

    let by_execution = store.get_events_by_execution_ids(&execution_ids).await?;
    assert_eq!(by_execution.len(), 2);

    // Events against unknown endpoints are rejected.
    let dangling = Event::new(EventType::Input, Id::new(999), execution_ids[0]);
    assert!(matches!(
        store.put_events(&[dangling]).await,
        Err(MetadataError::InvalidArgument(_))
    ));
    Ok(())
}

#[async_std::test]
async fn attributions_and_associations_are_idempotent() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let artifact_type_id = store
        .put_artifact_type(&artifact_type("DataSet", &[]), &PutTypeOptions::default())
        .await?;
    let execution_type_id = store
        .put_execution_type(&execution_type("Trainer", &[]), &PutTypeOptions::default())
        .await?;
    let context_type_id = store
        .put_context_type(&context_type("Experiment", &[]), &PutTypeOptions::default())
        .await?;

    let artifact_ids = store
        .put_artifacts(&[Artifact::new(artifact_type_id)])
        .await?;
    let execution_ids = store
        .put_executions(&[Execution::new(execution_type_id)])
        .await?;
    let context_ids = store
        .put_contexts(&[Context::new(context_type_id, "exp.1")])
        .await?;

    let attribution = Attribution {
        context_id: context_ids[0],
        artifact_id: artifact_ids[0],
    };
    let association = Association {
        context_id: context_ids[0],
        execution_id: execution_ids[0],
    };
    store
        .put_attributions_and_associations(&[attribution], &[association])
        .await?;
    // Repeating the exact same request is a no-op.
    store
        .put_attributions_and_associations(&[attribution], &[association])
        .await?;

    assert_eq!(store.get_artifacts_by_context(context_ids[0]).await?.len(), 1);
    assert_eq!(
        store.get_executions_by_context(context_ids[0]).await?.len(),
        1
    );
    assert_eq!(
        store.get_contexts_by_artifact(artifact_ids[0]).await?[0].id,
        context_ids[0]
    );
    assert_eq!(
        store.get_contexts_by_execution(execution_ids[0]).await?[0].id,
        context_ids[0]
    );

    // Edges against unknown endpoints are rejected.
    let dangling = Attribution {
        context_id: context_ids[0],
        artifact_id: Id::new(999),
    };
    assert!(matches!(
        store.put_attributions_and_associations(&[dangling], &[]).await,
        Err(MetadataError::InvalidArgument(_))
    ));
    Ok(())
}

#[async_std::test]
async fn parent_contexts_form_an_acyclic_graph() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let context_type_id = store
        .put_context_type(&context_type("Pipeline", &[]), &PutTypeOptions::default())
        .await?;

    let ids = store
        .put_contexts(&[
            Context::new(context_type_id, "root"),
            Context::new(context_type_id, "run-1"),
            Context::new(context_type_id, "step-a"),
        ])
        .await?;

    store
        .put_parent_contexts(&[
            ParentContext {
                child_id: ids[1],
                parent_id: ids[0],
            },
            ParentContext {
                child_id: ids[2],
                parent_id: ids[1],
            },
        ])
        .await?;
    // Idempotent on replay.
    store
        .put_parent_contexts(&[ParentContext {
            child_id: ids[1],
            parent_id: ids[0],
        }])
        .await?;

    let parents = store.get_parent_contexts(ids[2]).await?;
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id, ids[1]);
    let children = store.get_children_contexts(ids[0]).await?;
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, ids[1]);

    // Closing the loop root -> step-a is a cycle; so is a self-link.
    assert!(matches!(
        store
            .put_parent_contexts(&[ParentContext {
                child_id: ids[0],
                parent_id: ids[2],
            }])
            .await,
        Err(MetadataError::InvalidArgument(_))
    ));
    assert!(matches!(
        store
            .put_parent_contexts(&[ParentContext {
                child_id: ids[0],
                parent_id: ids[0],
            }])
            .await,
        Err(MetadataError::InvalidArgument(_))
    ));
    Ok(())
}

#[async_std::test]
async fn parent_types_form_an_acyclic_graph() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let base_id = store
        .put_artifact_type(&artifact_type("Base", &[]), &PutTypeOptions::default())
        .await?;
    let derived_id = store
        .put_artifact_type(&artifact_type("Derived", &[]), &PutTypeOptions::default())
        .await?;

    store
        .put_parent_type(TypeKind::Artifact, derived_id, base_id)
        .await?;
    // Idempotent on replay.
    store
        .put_parent_type(TypeKind::Artifact, derived_id, base_id)
        .await?;

    let parents = store.get_parent_artifact_types(derived_id).await?;
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id, base_id);

    assert!(matches!(
        store
            .put_parent_type(TypeKind::Artifact, base_id, derived_id)
            .await,
        Err(MetadataError::InvalidArgument(_))
    ));
    Ok(())
}

#[async_std::test]
async fn list_artifacts_pages_through_every_row() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let type_id = store
        .put_artifact_type(&artifact_type("DataSet", &[]), &PutTypeOptions::default())
        .await?;

    let artifacts: Vec<Artifact> = (0..7).map(|_| Artifact::new(type_id)).collect();
    let ids = store.put_artifacts(&artifacts).await?;
    assert_eq!(ids.len(), 7);

    // Walk by id descending, two per page.
    let mut seen = Vec::new();
    let mut options = ListOperationOptions::ordered_by(OrderByField::Id, false).max_result_size(2);
    loop {
        let (page, next_page_token) = store.list_artifacts(&options).await?;
        assert!(page.len() <= 2);
        seen.extend(page.iter().map(|artifact| artifact.id));
        match next_page_token {
            Some(token) => {
                options = ListOperationOptions::ordered_by(OrderByField::Id, false)
                    .max_result_size(2)
                    .page_token(&token);
            }
            None => break,
        }
    }
    let mut expected = ids.clone();
    expected.sort();
    expected.reverse();
    assert_eq!(seen, expected);

    // Ascending by create time visits the same set in insertion order.
    let (first_page, token) = store
        .list_artifacts(
            &ListOperationOptions::ordered_by(OrderByField::CreateTime, true).max_result_size(5),
        )
        .await?;
    assert_eq!(first_page.len(), 5);
    assert_eq!(first_page[0].id, ids[0]);
    let (second_page, token) = store
        .list_artifacts(
            &ListOperationOptions::ordered_by(OrderByField::CreateTime, true)
                .max_result_size(5)
                .page_token(&token.unwrap()),
        )
        .await?;
    assert_eq!(second_page.len(), 2);
    assert!(token.is_none());
    Ok(())
}

#[async_std::test]
async fn list_by_last_update_handles_ties() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let type_id = store
        .put_artifact_type(&artifact_type("DataSet", &[]), &PutTypeOptions::default())
        .await?;
    let artifacts: Vec<Artifact> = (0..5).map(|_| Artifact::new(type_id)).collect();
    let ids = store.put_artifacts(&artifacts).await?;

    // All five may share one update timestamp; the listed-ids cursor must
    // still visit each exactly once.
    let mut seen = Vec::new();
    let mut options =
        ListOperationOptions::ordered_by(OrderByField::LastUpdateTime, false).max_result_size(2);
    loop {
        let (page, next_page_token) = store.list_artifacts(&options).await?;
        seen.extend(page.iter().map(|artifact| artifact.id));
        match next_page_token {
            Some(token) => {
                options = ListOperationOptions::ordered_by(OrderByField::LastUpdateTime, false)
                    .max_result_size(2)
                    .page_token(&token);
            }
            None => break,
        }
    }
    seen.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(seen, expected);
    Ok(())
}

#[async_std::test]
async fn list_rejects_bad_options() -> anyhow::Result<()> {
    let mut store = fake_store().await;

    let zero = ListOperationOptions::ordered_by(OrderByField::Id, false).max_result_size(0);
    assert!(matches!(
        store.list_artifacts(&zero).await,
        Err(MetadataError::InvalidArgument(_))
    ));

    // A token replayed with different options is rejected.
    let type_id = store
        .put_artifact_type(&artifact_type("DataSet", &[]), &PutTypeOptions::default())
        .await?;
    let artifacts: Vec<Artifact> = (0..3).map(|_| Artifact::new(type_id)).collect();
    store.put_artifacts(&artifacts).await?;
    let (_, token) = store
        .list_artifacts(
            &ListOperationOptions::ordered_by(OrderByField::Id, false).max_result_size(1),
        )
        .await?;
    let drifted = ListOperationOptions::ordered_by(OrderByField::Id, true)
        .max_result_size(1)
        .page_token(&token.unwrap());
    assert!(matches!(
        store.list_artifacts(&drifted).await,
        Err(MetadataError::InvalidArgument(_))
    ));
    Ok(())
}

#[async_std::test]
async fn list_executions_by_context_respects_candidates() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    let execution_type_id = store
        .put_execution_type(&execution_type("Trainer", &[]), &PutTypeOptions::default())
        .await?;
    let context_type_id = store
        .put_context_type(&context_type("Experiment", &[]), &PutTypeOptions::default())
        .await?;

    let executions: Vec<Execution> = (0..4).map(|_| Execution::new(execution_type_id)).collect();
    let execution_ids = store.put_executions(&executions).await?;
    let context_ids = store
        .put_contexts(&[Context::new(context_type_id, "exp.1")])
        .await?;

    // Associate only the first two executions.
    let associations: Vec<Association> = execution_ids[..2]
        .iter()
        .map(|execution_id| Association {
            context_id: context_ids[0],
            execution_id: *execution_id,
        })
        .collect();
    store
        .put_attributions_and_associations(&[], &associations)
        .await?;

    let (page, token) = store
        .list_executions_by_context(
            context_ids[0],
            &ListOperationOptions::ordered_by(OrderByField::Id, true).max_result_size(10),
        )
        .await?;
    assert!(token.is_none());
    assert_eq!(
        page.iter().map(|execution| execution.id).collect::<Vec<_>>(),
        execution_ids[..2].to_vec()
    );

    // A context with no associations lists nothing.
    let empty_context_ids = store
        .put_contexts(&[Context::new(context_type_id, "exp.2")])
        .await?;
    let (page, token) = store
        .list_executions_by_context(
            empty_context_ids[0],
            &ListOperationOptions::ordered_by(OrderByField::Id, true).max_result_size(10),
        )
        .await?;
    assert!(page.is_empty());
    assert!(token.is_none());
    Ok(())
}

#[async_std::test]
async fn schema_version_matches_library_after_connect() -> anyhow::Result<()> {
    let mut store = fake_store().await;
    assert_eq!(store.get_schema_version().await?, store.library_version());
    assert_eq!(store.library_version(), crate::query_config::SCHEMA_VERSION);
    Ok(())
}

#[async_std::test]
async fn downgrade_requires_matching_library() -> anyhow::Result<()> {
    let file = NamedTempFile::new()?;
    let path = file
        .path()
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("invalid path"))?
        .to_owned();
    let config = ConnectionConfig::sqlite(&path);

    MetadataStore::connect(&config, &MigrationOptions::default()).await?;
    MetadataStore::downgrade(&config, 5).await?;

    // The library is now newer than the database: plain connect refuses,
    // connect with migration enabled upgrades back to head.
    assert!(matches!(
        MetadataStore::connect(&config, &MigrationOptions::default()).await,
        Err(MetadataError::FailedPrecondition(_))
    ));
    let mut store = MetadataStore::connect(
        &config,
        &MigrationOptions::default().enable_upgrade_migration(),
    )
    .await?;
    assert_eq!(store.get_schema_version().await?, store.library_version());
    Ok(())
}
