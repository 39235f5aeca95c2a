//! Metadata access object: the typed CRUD/query surface over the query
//! executor. Cross-row invariants (type conformance, uniqueness, acyclic
//! parent graphs, event endpoints) are enforced here; the executor below
//! only runs statements.
use crate::errors::MetadataError;
use crate::list_options::{
    build_next_page_token, validate_list_options, ListOperationOptions, ListableNode,
};
use crate::metadata::{
    current_millis, decode_struct_value, is_struct_serialized_string, Artifact, ArtifactState,
    ArtifactStructType, ArtifactType, Association, Attribution, Context, ContextType, Event,
    EventStep, EventType, Execution, ExecutionState, ExecutionType, Id, ParentContext,
    PropertyMap, PropertySchema, PropertyType, PropertyValue, TypeId, TypeKind,
};
use crate::metadata_source::RecordSet;
use crate::query_executor::{cell_to_bool, cell_to_f64, cell_to_i64, cell_to_string, QueryExecutor};
use std::collections::{HashMap, HashSet};

/// Shared row shape of the `Type` table selects.
#[derive(Debug, Clone)]
struct TypeRecord {
    id: i64,
    name: String,
    version: Option<String>,
    description: Option<String>,
    input_type: Option<String>,
    output_type: Option<String>,
}

fn record_to_type_record(record: &[Option<String>]) -> Result<TypeRecord, MetadataError> {
    if record.len() < 6 {
        return Err(MetadataError::internal("malformed Type record"));
    }
    Ok(TypeRecord {
        id: cell_to_i64(&record[0])?,
        name: cell_to_string(&record[1])?,
        version: record[2].clone(),
        description: record[3].clone(),
        input_type: record[4].clone(),
        output_type: record[5].clone(),
    })
}

fn parse_struct_type(
    column: Option<&String>,
) -> Result<Option<ArtifactStructType>, MetadataError> {
    match column {
        Some(json) if !json.is_empty() => serde_json::from_str(json)
            .map(Some)
            .map_err(|e| MetadataError::internal(format!("cannot parse artifact struct type: {}", e))),
        _ => Ok(None),
    }
}

/// Node kinds the storage layer treats uniformly: each knows its tables,
/// parses its header row, and receives its property rows.
trait StoredNode: ListableNode + Sized {
    const KIND: TypeKind;

    fn from_record(record: &[Option<String>]) -> Result<Self, MetadataError>;
    fn attach_property(&mut self, name: String, is_custom: bool, value: PropertyValue);
}

impl StoredNode for Artifact {
    const KIND: TypeKind = TypeKind::Artifact;

    // Columns: id, type_id, uri, state, name, create, last_update.
    fn from_record(record: &[Option<String>]) -> Result<Self, MetadataError> {
        if record.len() < 7 {
            return Err(MetadataError::internal("malformed Artifact record"));
        }
        Ok(Self {
            id: Id::new(cell_to_i64(&record[0])?),
            type_id: TypeId::new(cell_to_i64(&record[1])?),
            uri: record[2].clone(),
            state: match &record[3] {
                Some(_) => Some(ArtifactState::from_i64(cell_to_i64(&record[3])?)?),
                None => None,
            },
            name: record[4].clone(),
            properties: PropertyMap::new(),
            custom_properties: PropertyMap::new(),
            create_time_since_epoch: cell_to_i64(&record[5])?,
            last_update_time_since_epoch: cell_to_i64(&record[6])?,
        })
    }

    fn attach_property(&mut self, name: String, is_custom: bool, value: PropertyValue) {
        if is_custom {
            self.custom_properties.insert(name, value);
        } else {
            self.properties.insert(name, value);
        }
    }
}

impl StoredNode for Execution {
    const KIND: TypeKind = TypeKind::Execution;

    // Columns: id, type_id, last_known_state, name, create, last_update.
    fn from_record(record: &[Option<String>]) -> Result<Self, MetadataError> {
        if record.len() < 6 {
            return Err(MetadataError::internal("malformed Execution record"));
        }
        Ok(Self {
            id: Id::new(cell_to_i64(&record[0])?),
            type_id: TypeId::new(cell_to_i64(&record[1])?),
            last_known_state: match &record[2] {
                Some(_) => Some(ExecutionState::from_i64(cell_to_i64(&record[2])?)?),
                None => None,
            },
            name: record[3].clone(),
            properties: PropertyMap::new(),
            custom_properties: PropertyMap::new(),
            create_time_since_epoch: cell_to_i64(&record[4])?,
            last_update_time_since_epoch: cell_to_i64(&record[5])?,
        })
    }

    fn attach_property(&mut self, name: String, is_custom: bool, value: PropertyValue) {
        if is_custom {
            self.custom_properties.insert(name, value);
        } else {
            self.properties.insert(name, value);
        }
    }
}

impl StoredNode for Context {
    const KIND: TypeKind = TypeKind::Context;

    // Columns: id, type_id, name, create, last_update.
    fn from_record(record: &[Option<String>]) -> Result<Self, MetadataError> {
        if record.len() < 5 {
            return Err(MetadataError::internal("malformed Context record"));
        }
        Ok(Self {
            id: Id::new(cell_to_i64(&record[0])?),
            type_id: TypeId::new(cell_to_i64(&record[1])?),
            name: cell_to_string(&record[2])?,
            properties: PropertyMap::new(),
            custom_properties: PropertyMap::new(),
            create_time_since_epoch: cell_to_i64(&record[3])?,
            last_update_time_since_epoch: cell_to_i64(&record[4])?,
        })
    }

    fn attach_property(&mut self, name: String, is_custom: bool, value: PropertyValue) {
        if is_custom {
            self.custom_properties.insert(name, value);
        } else {
            self.properties.insert(name, value);
        }
    }
}

// Property rows come back as (id, key, is_custom, int, double, string); the
// populated column decides the value variant.
fn record_to_property(
    record: &[Option<String>],
) -> Result<(i64, String, bool, PropertyValue), MetadataError> {
    if record.len() < 6 {
        return Err(MetadataError::internal("malformed property record"));
    }
    let node_id = cell_to_i64(&record[0])?;
    let name = cell_to_string(&record[1])?;
    let is_custom = cell_to_bool(&record[2])?;
    let value = if record[3].is_some() {
        PropertyValue::Int(cell_to_i64(&record[3])?)
    } else if record[4].is_some() {
        PropertyValue::Double(cell_to_f64(&record[4])?)
    } else {
        let text = cell_to_string(&record[5]).map_err(|_| {
            MetadataError::internal(format!(
                "property {:?} of node {} has no value set",
                name, node_id
            ))
        })?;
        if is_struct_serialized_string(&text) {
            PropertyValue::Struct(decode_struct_value(&text)?)
        } else {
            PropertyValue::String(text)
        }
    };
    Ok((node_id, name, is_custom, value))
}

fn ids_at_column(record_set: &RecordSet, position: usize) -> Result<Vec<i64>, MetadataError> {
    record_set
        .records
        .iter()
        .map(|record| {
            record
                .get(position)
                .ok_or_else(|| MetadataError::internal("missing id column"))
                .and_then(cell_to_i64)
        })
        .collect()
}

/// Declared properties must be declared on the node's type with a matching
/// data type. Custom properties are not checked.
fn validate_properties_with_schema(
    properties: &PropertyMap,
    schema: &PropertySchema,
) -> Result<(), MetadataError> {
    for (name, value) in properties {
        let Some(declared) = schema.get(name) else {
            return Err(MetadataError::invalid_argument(format!(
                "found unknown property: {}",
                name
            )));
        };
        if *declared != value.property_type() {
            return Err(MetadataError::invalid_argument(format!(
                "found unmatched property type: {}",
                name
            )));
        }
    }
    Ok(())
}

fn promote_unique_violation(error: MetadataError, what: impl std::fmt::Display) -> MetadataError {
    if error.is_unique_constraint_violation() {
        MetadataError::already_exists(what)
    } else {
        error
    }
}

/// Typed API over one metadata source. All methods assume the caller scoped
/// a transaction (the store façade does this).
#[derive(Debug)]
pub struct MetadataAccessObject {
    executor: QueryExecutor,
}

impl MetadataAccessObject {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub fn library_version(&self) -> i64 {
        self.executor.library_version()
    }

    pub(crate) async fn begin(&mut self) -> Result<(), MetadataError> {
        self.executor.begin().await
    }

    pub(crate) async fn commit(&mut self) -> Result<(), MetadataError> {
        self.executor.commit().await
    }

    pub(crate) async fn rollback(&mut self) -> Result<(), MetadataError> {
        self.executor.rollback().await
    }

    pub(crate) async fn close(self) -> Result<(), MetadataError> {
        self.executor.close().await
    }

    // ---------------------------------------------------------------------
    // Schema lifecycle
    // ---------------------------------------------------------------------

    pub async fn get_schema_version(&mut self) -> Result<i64, MetadataError> {
        self.executor.get_schema_version().await
    }

    pub async fn init_metadata_source(&mut self) -> Result<(), MetadataError> {
        self.executor.init_metadata_source().await
    }

    pub async fn init_metadata_source_if_not_exists(
        &mut self,
        enable_upgrade_migration: bool,
    ) -> Result<(), MetadataError> {
        self.executor
            .init_metadata_source_if_not_exists(enable_upgrade_migration)
            .await
    }

    pub async fn downgrade_metadata_source(
        &mut self,
        to_schema_version: i64,
    ) -> Result<(), MetadataError> {
        self.executor
            .downgrade_metadata_source(to_schema_version)
            .await
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    async fn load_types(
        &mut self,
        record_set: RecordSet,
    ) -> Result<Vec<(TypeRecord, PropertySchema)>, MetadataError> {
        let mut types = Vec::with_capacity(record_set.len());
        for record in &record_set.records {
            let type_record = record_to_type_record(record)?;
            let property_rows = self
                .executor
                .select_property_by_type_id(type_record.id)
                .await?;
            let mut schema = PropertySchema::new();
            for row in &property_rows.records {
                if row.len() < 2 {
                    return Err(MetadataError::internal("malformed TypeProperty record"));
                }
                let name = cell_to_string(&row[0])?;
                let data_type = PropertyType::from_i64(cell_to_i64(&row[1])?)?;
                schema.insert(name, data_type);
            }
            types.push((type_record, schema));
        }
        Ok(types)
    }

    fn validate_new_type(
        name: &str,
        properties: &PropertySchema,
    ) -> Result<(), MetadataError> {
        if name.is_empty() {
            return Err(MetadataError::invalid_argument("no type name is specified"));
        }
        for (property_name, property_type) in properties {
            if *property_type == PropertyType::Unknown {
                return Err(MetadataError::invalid_argument(format!(
                    "property {} is UNKNOWN",
                    property_name
                )));
            }
        }
        Ok(())
    }

    async fn check_no_type_with_name_and_version(
        &mut self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
    ) -> Result<(), MetadataError> {
        let record_set = self
            .executor
            .select_type_by_name_and_version(name, version, kind)
            .await?;
        if record_set.is_empty() {
            Ok(())
        } else {
            Err(MetadataError::already_exists(format!(
                "{} type with name {:?} and version {:?} already exists",
                kind, name, version
            )))
        }
    }

    async fn insert_type_properties(
        &mut self,
        type_id: i64,
        properties: &PropertySchema,
    ) -> Result<(), MetadataError> {
        for (name, data_type) in properties {
            self.executor
                .insert_type_property(type_id, name, *data_type)
                .await?;
        }
        Ok(())
    }

    pub async fn create_artifact_type(
        &mut self,
        artifact_type: &ArtifactType,
    ) -> Result<TypeId, MetadataError> {
        Self::validate_new_type(&artifact_type.name, &artifact_type.properties)?;
        self.check_no_type_with_name_and_version(
            TypeKind::Artifact,
            &artifact_type.name,
            artifact_type.version.as_deref(),
        )
        .await?;
        let type_id = self
            .executor
            .insert_artifact_type(
                &artifact_type.name,
                artifact_type.version.as_deref(),
                artifact_type.description.as_deref(),
            )
            .await?;
        self.insert_type_properties(type_id, &artifact_type.properties)
            .await?;
        Ok(TypeId::new(type_id))
    }

    pub async fn create_execution_type(
        &mut self,
        execution_type: &ExecutionType,
    ) -> Result<TypeId, MetadataError> {
        Self::validate_new_type(&execution_type.name, &execution_type.properties)?;
        self.check_no_type_with_name_and_version(
            TypeKind::Execution,
            &execution_type.name,
            execution_type.version.as_deref(),
        )
        .await?;
        let type_id = self
            .executor
            .insert_execution_type(
                &execution_type.name,
                execution_type.version.as_deref(),
                execution_type.description.as_deref(),
                execution_type.input_type.as_ref(),
                execution_type.output_type.as_ref(),
            )
            .await?;
        self.insert_type_properties(type_id, &execution_type.properties)
            .await?;
        Ok(TypeId::new(type_id))
    }

    pub async fn create_context_type(
        &mut self,
        context_type: &ContextType,
    ) -> Result<TypeId, MetadataError> {
        Self::validate_new_type(&context_type.name, &context_type.properties)?;
        self.check_no_type_with_name_and_version(
            TypeKind::Context,
            &context_type.name,
            context_type.version.as_deref(),
        )
        .await?;
        let type_id = self
            .executor
            .insert_context_type(
                &context_type.name,
                context_type.version.as_deref(),
                context_type.description.as_deref(),
            )
            .await?;
        self.insert_type_properties(type_id, &context_type.properties)
            .await?;
        Ok(TypeId::new(type_id))
    }

    /// Extends an existing type with new property declarations. Existing
    /// declarations are immutable: redeclaring one with a different data
    /// type fails with `AlreadyExists`.
    async fn update_type_properties(
        &mut self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
        given_id: TypeId,
        properties: &PropertySchema,
    ) -> Result<(), MetadataError> {
        if name.is_empty() {
            return Err(MetadataError::invalid_argument("no type name is specified"));
        }
        let record_set = self
            .executor
            .select_type_by_name_and_version(name, version, kind)
            .await?;
        let stored = self.load_types(record_set).await?;
        let Some((stored_record, stored_schema)) = stored.into_iter().next() else {
            return Err(MetadataError::not_found(format!(
                "no {} type found with name {:?}",
                kind, name
            )));
        };
        if given_id.get() > 0 && given_id.get() != stored_record.id {
            return Err(MetadataError::invalid_argument(format!(
                "given type id {} is different from the existing type {}",
                given_id, stored_record.id
            )));
        }
        for (property_name, property_type) in properties {
            if *property_type == PropertyType::Unknown {
                return Err(MetadataError::invalid_argument(format!(
                    "property {} type should not be UNKNOWN",
                    property_name
                )));
            }
            match stored_schema.get(property_name) {
                Some(stored_type) if stored_type != property_type => {
                    return Err(MetadataError::already_exists(format!(
                        "property {} type is different from the existing declaration",
                        property_name
                    )));
                }
                Some(_) => {}
                None => {
                    self.executor
                        .insert_type_property(stored_record.id, property_name, *property_type)
                        .await?;
                }
            }
        }
        Ok(())
    }

    pub async fn update_artifact_type(
        &mut self,
        artifact_type: &ArtifactType,
    ) -> Result<(), MetadataError> {
        self.update_type_properties(
            TypeKind::Artifact,
            &artifact_type.name,
            artifact_type.version.as_deref(),
            artifact_type.id,
            &artifact_type.properties,
        )
        .await
    }

    pub async fn update_execution_type(
        &mut self,
        execution_type: &ExecutionType,
    ) -> Result<(), MetadataError> {
        self.update_type_properties(
            TypeKind::Execution,
            &execution_type.name,
            execution_type.version.as_deref(),
            execution_type.id,
            &execution_type.properties,
        )
        .await
    }

    pub async fn update_context_type(
        &mut self,
        context_type: &ContextType,
    ) -> Result<(), MetadataError> {
        self.update_type_properties(
            TypeKind::Context,
            &context_type.name,
            context_type.version.as_deref(),
            context_type.id,
            &context_type.properties,
        )
        .await
    }

    fn artifact_type_from(record: TypeRecord, schema: PropertySchema) -> ArtifactType {
        ArtifactType {
            id: TypeId::new(record.id),
            name: record.name,
            version: record.version,
            description: record.description,
            properties: schema,
        }
    }

    fn execution_type_from(
        record: TypeRecord,
        schema: PropertySchema,
    ) -> Result<ExecutionType, MetadataError> {
        let input_type = parse_struct_type(record.input_type.as_ref())?;
        let output_type = parse_struct_type(record.output_type.as_ref())?;
        Ok(ExecutionType {
            id: TypeId::new(record.id),
            name: record.name,
            version: record.version,
            description: record.description,
            properties: schema,
            input_type,
            output_type,
        })
    }

    fn context_type_from(record: TypeRecord, schema: PropertySchema) -> ContextType {
        ContextType {
            id: TypeId::new(record.id),
            name: record.name,
            version: record.version,
            description: record.description,
            properties: schema,
        }
    }

    pub async fn find_artifact_type_by_id(
        &mut self,
        type_id: TypeId,
    ) -> Result<ArtifactType, MetadataError> {
        let record_set = self
            .executor
            .select_type_by_id(type_id.get(), TypeKind::Artifact)
            .await?;
        let mut types = self.load_types(record_set).await?;
        if types.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no type found for type_id: {}",
                type_id
            )));
        }
        let (record, schema) = types.remove(0);
        Ok(Self::artifact_type_from(record, schema))
    }

    pub async fn find_execution_type_by_id(
        &mut self,
        type_id: TypeId,
    ) -> Result<ExecutionType, MetadataError> {
        let record_set = self
            .executor
            .select_type_by_id(type_id.get(), TypeKind::Execution)
            .await?;
        let mut types = self.load_types(record_set).await?;
        if types.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no type found for type_id: {}",
                type_id
            )));
        }
        let (record, schema) = types.remove(0);
        Self::execution_type_from(record, schema)
    }

    pub async fn find_context_type_by_id(
        &mut self,
        type_id: TypeId,
    ) -> Result<ContextType, MetadataError> {
        let record_set = self
            .executor
            .select_type_by_id(type_id.get(), TypeKind::Context)
            .await?;
        let mut types = self.load_types(record_set).await?;
        if types.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no type found for type_id: {}",
                type_id
            )));
        }
        let (record, schema) = types.remove(0);
        Ok(Self::context_type_from(record, schema))
    }

    pub async fn find_artifact_type(
        &mut self,
        name: &str,
        version: Option<&str>,
    ) -> Result<ArtifactType, MetadataError> {
        let record_set = self
            .executor
            .select_type_by_name_and_version(name, version, TypeKind::Artifact)
            .await?;
        let mut types = self.load_types(record_set).await?;
        if types.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no artifact type found with name {:?}",
                name
            )));
        }
        let (record, schema) = types.remove(0);
        Ok(Self::artifact_type_from(record, schema))
    }

    pub async fn find_execution_type(
        &mut self,
        name: &str,
        version: Option<&str>,
    ) -> Result<ExecutionType, MetadataError> {
        let record_set = self
            .executor
            .select_type_by_name_and_version(name, version, TypeKind::Execution)
            .await?;
        let mut types = self.load_types(record_set).await?;
        if types.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no execution type found with name {:?}",
                name
            )));
        }
        let (record, schema) = types.remove(0);
        Self::execution_type_from(record, schema)
    }

    pub async fn find_context_type(
        &mut self,
        name: &str,
        version: Option<&str>,
    ) -> Result<ContextType, MetadataError> {
        let record_set = self
            .executor
            .select_type_by_name_and_version(name, version, TypeKind::Context)
            .await?;
        let mut types = self.load_types(record_set).await?;
        if types.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no context type found with name {:?}",
                name
            )));
        }
        let (record, schema) = types.remove(0);
        Ok(Self::context_type_from(record, schema))
    }

    pub async fn find_artifact_types(&mut self) -> Result<Vec<ArtifactType>, MetadataError> {
        let record_set = self.executor.select_all_types(TypeKind::Artifact).await?;
        let types = self.load_types(record_set).await?;
        Ok(types
            .into_iter()
            .map(|(record, schema)| Self::artifact_type_from(record, schema))
            .collect())
    }

    pub async fn find_execution_types(&mut self) -> Result<Vec<ExecutionType>, MetadataError> {
        let record_set = self.executor.select_all_types(TypeKind::Execution).await?;
        let types = self.load_types(record_set).await?;
        types
            .into_iter()
            .map(|(record, schema)| Self::execution_type_from(record, schema))
            .collect()
    }

    pub async fn find_context_types(&mut self) -> Result<Vec<ContextType>, MetadataError> {
        let record_set = self.executor.select_all_types(TypeKind::Context).await?;
        let types = self.load_types(record_set).await?;
        Ok(types
            .into_iter()
            .map(|(record, schema)| Self::context_type_from(record, schema))
            .collect())
    }

    /// Links `type_id` to a parent type of the same kind. A link that would
    /// make any ancestor of the parent reach back to `type_id` (self-links
    /// included) is rejected.
    pub async fn create_parent_type(
        &mut self,
        kind: TypeKind,
        type_id: TypeId,
        parent_type_id: TypeId,
    ) -> Result<(), MetadataError> {
        for id in [type_id, parent_type_id] {
            let record_set = self.executor.select_type_by_id(id.get(), kind).await?;
            if record_set.is_empty() {
                return Err(MetadataError::invalid_argument(format!(
                    "no {} type matches the id {}",
                    kind, id
                )));
            }
        }

        let mut pending = vec![parent_type_id.get()];
        let mut visited = HashSet::new();
        while let Some(ancestor_id) = pending.pop() {
            if ancestor_id == type_id.get() {
                return Err(MetadataError::invalid_argument(
                    "there is a cycle detected of the given parent type",
                ));
            }
            if !visited.insert(ancestor_id) {
                continue;
            }
            let record_set = self
                .executor
                .select_parent_types_by_type_id(ancestor_id)
                .await?;
            pending.extend(ids_at_column(&record_set, 1)?);
        }

        self.executor
            .insert_parent_type(type_id.get(), parent_type_id.get())
            .await
            .map_err(|e| promote_unique_violation(e, "the parent type link already exists"))
    }

    pub async fn find_parent_type_ids(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<TypeId>, MetadataError> {
        let record_set = self
            .executor
            .select_parent_types_by_type_id(type_id.get())
            .await?;
        Ok(ids_at_column(&record_set, 1)?
            .into_iter()
            .map(TypeId::new)
            .collect())
    }

    pub async fn find_parent_artifact_types(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<ArtifactType>, MetadataError> {
        self.find_artifact_type_by_id(type_id).await?;
        let parent_ids = self.find_parent_type_ids(type_id).await?;
        let mut parents = Vec::with_capacity(parent_ids.len());
        for parent_id in parent_ids {
            parents.push(self.find_artifact_type_by_id(parent_id).await?);
        }
        Ok(parents)
    }

    pub async fn find_parent_execution_types(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<ExecutionType>, MetadataError> {
        self.find_execution_type_by_id(type_id).await?;
        let parent_ids = self.find_parent_type_ids(type_id).await?;
        let mut parents = Vec::with_capacity(parent_ids.len());
        for parent_id in parent_ids {
            parents.push(self.find_execution_type_by_id(parent_id).await?);
        }
        Ok(parents)
    }

    pub async fn find_parent_context_types(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<ContextType>, MetadataError> {
        self.find_context_type_by_id(type_id).await?;
        let parent_ids = self.find_parent_type_ids(type_id).await?;
        let mut parents = Vec::with_capacity(parent_ids.len());
        for parent_id in parent_ids {
            parents.push(self.find_context_type_by_id(parent_id).await?);
        }
        Ok(parents)
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    /// Fetches nodes and joins their property rows back on. With
    /// `skipped_ids_ok`, ids with no row yield `NotFound`; otherwise a
    /// missing row inside one transaction is an internal inconsistency.
    async fn find_nodes<N: StoredNode>(
        &mut self,
        node_ids: &[i64],
        skipped_ids_ok: bool,
    ) -> Result<Vec<N>, MetadataError> {
        if node_ids.is_empty() {
            return Err(MetadataError::invalid_argument("ids cannot be empty"));
        }
        let header = self.executor.select_nodes_by_id(N::KIND, node_ids).await?;
        let mut nodes = Vec::with_capacity(header.len());
        for record in &header.records {
            nodes.push(N::from_record(record)?);
        }

        if !nodes.is_empty() {
            let properties = self
                .executor
                .select_node_properties(N::KIND, node_ids)
                .await?;
            let mut node_by_id: HashMap<i64, usize> = HashMap::new();
            for (position, node) in nodes.iter().enumerate() {
                node_by_id.insert(node.node_id(), position);
            }
            for record in &properties.records {
                let (node_id, name, is_custom, value) = record_to_property(record)?;
                let position = node_by_id.get(&node_id).ok_or_else(|| {
                    MetadataError::internal(format!(
                        "property row references unknown node {}",
                        node_id
                    ))
                })?;
                nodes[*position].attach_property(name, is_custom, value);
            }
        }

        if nodes.len() != node_ids.len() {
            let found: Vec<i64> = nodes.iter().map(|node| node.node_id()).collect();
            let message = format!(
                "results missing for ids {:?}; found results for {:?}",
                node_ids, found
            );
            if skipped_ids_ok {
                return Err(MetadataError::not_found(message));
            }
            return Err(MetadataError::internal(message));
        }
        Ok(nodes)
    }

    /// §list protocol: resolves a page of node ids and loads the nodes in
    /// cursor order, returning the token for the next page when one exists.
    async fn list_nodes<N: StoredNode>(
        &mut self,
        options: &ListOperationOptions,
        candidate_ids: Option<&[i64]>,
    ) -> Result<(Vec<N>, Option<String>), MetadataError> {
        if options.max_result_size <= 0 {
            return Err(MetadataError::invalid_argument(format!(
                "max_result_size field value is required to be greater than 0 and less \
                 than or equal to 100. Set value: {}",
                options.max_result_size
            )));
        }
        validate_list_options(options)?;

        // One extra row to detect whether this is the last page.
        let mut fetch_options = options.clone();
        fetch_options.max_result_size = options.max_result_size + 1;
        let record_set = self
            .executor
            .list_node_ids_using_options(N::KIND, &fetch_options, candidate_ids)
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Ok((Vec::new(), None));
        }

        let mut nodes: Vec<N> = self.find_nodes(&ids, false).await?;
        let position_by_id: HashMap<i64, usize> = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position))
            .collect();
        nodes.sort_by_key(|node| {
            position_by_id
                .get(&node.node_id())
                .copied()
                .unwrap_or(usize::MAX)
        });

        if nodes.len() > options.max_result_size as usize {
            nodes.pop();
            let token = build_next_page_token(&nodes, options)?;
            Ok((nodes, Some(token)))
        } else {
            Ok((nodes, None))
        }
    }

    async fn create_artifact_unchecked(
        &mut self,
        artifact: &Artifact,
    ) -> Result<Id, MetadataError> {
        let artifact_type = self.find_artifact_type_by_id(artifact.type_id).await?;
        validate_properties_with_schema(&artifact.properties, &artifact_type.properties)?;
        let now = current_millis();
        let node_id = self
            .executor
            .insert_artifact(
                artifact.type_id.get(),
                artifact.uri.as_deref(),
                artifact.state,
                artifact.name.as_deref(),
                now,
                now,
            )
            .await?;
        self.write_properties(TypeKind::Artifact, node_id, &artifact.properties, false)
            .await?;
        self.write_properties(
            TypeKind::Artifact,
            node_id,
            &artifact.custom_properties,
            true,
        )
        .await?;
        Ok(Id::new(node_id))
    }

    pub async fn create_artifact(&mut self, artifact: &Artifact) -> Result<Id, MetadataError> {
        self.create_artifact_unchecked(artifact).await.map_err(|e| {
            promote_unique_violation(
                e,
                format!("given artifact already exists: {:?}", artifact.name),
            )
        })
    }

    async fn create_execution_unchecked(
        &mut self,
        execution: &Execution,
    ) -> Result<Id, MetadataError> {
        let execution_type = self.find_execution_type_by_id(execution.type_id).await?;
        validate_properties_with_schema(&execution.properties, &execution_type.properties)?;
        let now = current_millis();
        let node_id = self
            .executor
            .insert_execution(
                execution.type_id.get(),
                execution.last_known_state,
                execution.name.as_deref(),
                now,
                now,
            )
            .await?;
        self.write_properties(TypeKind::Execution, node_id, &execution.properties, false)
            .await?;
        self.write_properties(
            TypeKind::Execution,
            node_id,
            &execution.custom_properties,
            true,
        )
        .await?;
        Ok(Id::new(node_id))
    }

    pub async fn create_execution(
        &mut self,
        execution: &Execution,
    ) -> Result<Id, MetadataError> {
        self.create_execution_unchecked(execution).await.map_err(|e| {
            promote_unique_violation(
                e,
                format!("given execution already exists: {:?}", execution.name),
            )
        })
    }

    async fn create_context_unchecked(&mut self, context: &Context) -> Result<Id, MetadataError> {
        if context.name.is_empty() {
            return Err(MetadataError::invalid_argument(
                "context name should not be empty",
            ));
        }
        let context_type = self.find_context_type_by_id(context.type_id).await?;
        validate_properties_with_schema(&context.properties, &context_type.properties)?;
        let now = current_millis();
        let node_id = self
            .executor
            .insert_context(context.type_id.get(), &context.name, now, now)
            .await?;
        self.write_properties(TypeKind::Context, node_id, &context.properties, false)
            .await?;
        self.write_properties(TypeKind::Context, node_id, &context.custom_properties, true)
            .await?;
        Ok(Id::new(node_id))
    }

    pub async fn create_context(&mut self, context: &Context) -> Result<Id, MetadataError> {
        self.create_context_unchecked(context).await.map_err(|e| {
            promote_unique_violation(
                e,
                format!("given context already exists: {:?}", context.name),
            )
        })
    }

    async fn write_properties(
        &mut self,
        kind: TypeKind,
        node_id: i64,
        properties: &PropertyMap,
        is_custom: bool,
    ) -> Result<(), MetadataError> {
        for (name, value) in properties {
            self.executor
                .insert_node_property(kind, node_id, name, is_custom, value)
                .await?;
        }
        Ok(())
    }

    /// Diffs the current property map against the stored one and issues the
    /// minimal insert/update/delete statements. Returns how many rows
    /// changed.
    async fn modify_properties(
        &mut self,
        kind: TypeKind,
        node_id: i64,
        current: &PropertyMap,
        previous: &PropertyMap,
        is_custom: bool,
    ) -> Result<usize, MetadataError> {
        let mut changed = 0;
        for (name, value) in previous {
            let keeps_variant = current
                .get(name)
                .map(|v| v.property_type() == value.property_type())
                .unwrap_or(false);
            if keeps_variant {
                continue;
            }
            self.executor.delete_node_property(kind, node_id, name).await?;
            changed += 1;
        }
        for (name, value) in current {
            match previous.get(name) {
                Some(prev) if prev.property_type() == value.property_type() => {
                    if prev != value {
                        self.executor
                            .update_node_property(kind, node_id, name, value)
                            .await?;
                        changed += 1;
                    }
                }
                _ => {
                    self.executor
                        .insert_node_property(kind, node_id, name, is_custom, value)
                        .await?;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    pub async fn update_artifact(&mut self, artifact: &Artifact) -> Result<(), MetadataError> {
        if artifact.id.get() <= 0 {
            return Err(MetadataError::invalid_argument("no artifact id is given"));
        }
        let stored: Artifact = match self.find_nodes(&[artifact.id.get()], true).await {
            Ok(mut nodes) => nodes.remove(0),
            Err(err) if err.is_not_found() => {
                return Err(MetadataError::invalid_argument(format!(
                    "cannot find the given id {}",
                    artifact.id
                )));
            }
            Err(err) => return Err(err),
        };
        if artifact.type_id != stored.type_id {
            return Err(MetadataError::invalid_argument(format!(
                "given type_id {} is different from the one known before: {}",
                artifact.type_id, stored.type_id
            )));
        }
        let artifact_type = self.find_artifact_type_by_id(stored.type_id).await?;
        validate_properties_with_schema(&artifact.properties, &artifact_type.properties)?;

        let changed_properties = self
            .modify_properties(
                TypeKind::Artifact,
                artifact.id.get(),
                &artifact.properties,
                &stored.properties,
                false,
            )
            .await?
            + self
                .modify_properties(
                    TypeKind::Artifact,
                    artifact.id.get(),
                    &artifact.custom_properties,
                    &stored.custom_properties,
                    true,
                )
                .await?;

        let attributes_changed = artifact.uri != stored.uri
            || artifact.state != stored.state
            || artifact.name != stored.name;
        if attributes_changed || changed_properties > 0 {
            self.executor
                .update_artifact(
                    artifact.id.get(),
                    stored.type_id.get(),
                    artifact.uri.as_deref(),
                    artifact.state,
                    current_millis(),
                )
                .await?;
        }
        Ok(())
    }

    pub async fn update_execution(&mut self, execution: &Execution) -> Result<(), MetadataError> {
        if execution.id.get() <= 0 {
            return Err(MetadataError::invalid_argument("no execution id is given"));
        }
        let stored: Execution = match self.find_nodes(&[execution.id.get()], true).await {
            Ok(mut nodes) => nodes.remove(0),
            Err(err) if err.is_not_found() => {
                return Err(MetadataError::invalid_argument(format!(
                    "cannot find the given id {}",
                    execution.id
                )));
            }
            Err(err) => return Err(err),
        };
        if execution.type_id != stored.type_id {
            return Err(MetadataError::invalid_argument(format!(
                "given type_id {} is different from the one known before: {}",
                execution.type_id, stored.type_id
            )));
        }
        let execution_type = self.find_execution_type_by_id(stored.type_id).await?;
        validate_properties_with_schema(&execution.properties, &execution_type.properties)?;

        let changed_properties = self
            .modify_properties(
                TypeKind::Execution,
                execution.id.get(),
                &execution.properties,
                &stored.properties,
                false,
            )
            .await?
            + self
                .modify_properties(
                    TypeKind::Execution,
                    execution.id.get(),
                    &execution.custom_properties,
                    &stored.custom_properties,
                    true,
                )
                .await?;

        let attributes_changed = execution.last_known_state != stored.last_known_state
            || execution.name != stored.name;
        if attributes_changed || changed_properties > 0 {
            self.executor
                .update_execution(
                    execution.id.get(),
                    stored.type_id.get(),
                    execution.last_known_state,
                    current_millis(),
                )
                .await?;
        }
        Ok(())
    }

    pub async fn update_context(&mut self, context: &Context) -> Result<(), MetadataError> {
        if context.id.get() <= 0 {
            return Err(MetadataError::invalid_argument("no context id is given"));
        }
        if context.name.is_empty() {
            return Err(MetadataError::invalid_argument(
                "context name should not be empty",
            ));
        }
        let stored: Context = match self.find_nodes(&[context.id.get()], true).await {
            Ok(mut nodes) => nodes.remove(0),
            Err(err) if err.is_not_found() => {
                return Err(MetadataError::invalid_argument(format!(
                    "cannot find the given id {}",
                    context.id
                )));
            }
            Err(err) => return Err(err),
        };
        if context.type_id != stored.type_id {
            return Err(MetadataError::invalid_argument(format!(
                "given type_id {} is different from the one known before: {}",
                context.type_id, stored.type_id
            )));
        }
        let context_type = self.find_context_type_by_id(stored.type_id).await?;
        validate_properties_with_schema(&context.properties, &context_type.properties)?;

        let changed_properties = self
            .modify_properties(
                TypeKind::Context,
                context.id.get(),
                &context.properties,
                &stored.properties,
                false,
            )
            .await?
            + self
                .modify_properties(
                    TypeKind::Context,
                    context.id.get(),
                    &context.custom_properties,
                    &stored.custom_properties,
                    true,
                )
                .await?;

        let attributes_changed = context.name != stored.name;
        if attributes_changed || changed_properties > 0 {
            self.executor
                .update_context(
                    context.id.get(),
                    stored.type_id.get(),
                    &context.name,
                    current_millis(),
                )
                .await?;
        }
        Ok(())
    }

    pub async fn find_artifacts_by_id(
        &mut self,
        ids: &[Id],
    ) -> Result<Vec<Artifact>, MetadataError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        match self.find_nodes(&raw, true).await {
            // Missing ids are skipped; the found subset is still useful.
            Err(err) if err.is_not_found() => {
                let header = self
                    .executor
                    .select_nodes_by_id(TypeKind::Artifact, &raw)
                    .await?;
                let found = ids_at_column(&header, 0)?;
                if found.is_empty() {
                    return Ok(Vec::new());
                }
                self.find_nodes(&found, false).await
            }
            other => other,
        }
    }

    pub async fn find_executions_by_id(
        &mut self,
        ids: &[Id],
    ) -> Result<Vec<Execution>, MetadataError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        match self.find_nodes(&raw, true).await {
            Err(err) if err.is_not_found() => {
                let header = self
                    .executor
                    .select_nodes_by_id(TypeKind::Execution, &raw)
                    .await?;
                let found = ids_at_column(&header, 0)?;
                if found.is_empty() {
                    return Ok(Vec::new());
                }
                self.find_nodes(&found, false).await
            }
            other => other,
        }
    }

    pub async fn find_contexts_by_id(
        &mut self,
        ids: &[Id],
    ) -> Result<Vec<Context>, MetadataError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        match self.find_nodes(&raw, true).await {
            Err(err) if err.is_not_found() => {
                let header = self
                    .executor
                    .select_nodes_by_id(TypeKind::Context, &raw)
                    .await?;
                let found = ids_at_column(&header, 0)?;
                if found.is_empty() {
                    return Ok(Vec::new());
                }
                self.find_nodes(&found, false).await
            }
            other => other,
        }
    }

    pub async fn find_artifacts(&mut self) -> Result<Vec<Artifact>, MetadataError> {
        let record_set = self.executor.select_all_node_ids(TypeKind::Artifact).await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_nodes(&ids, false).await
    }

    pub async fn find_executions(&mut self) -> Result<Vec<Execution>, MetadataError> {
        let record_set = self
            .executor
            .select_all_node_ids(TypeKind::Execution)
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_nodes(&ids, false).await
    }

    pub async fn find_contexts(&mut self) -> Result<Vec<Context>, MetadataError> {
        let record_set = self.executor.select_all_node_ids(TypeKind::Context).await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_nodes(&ids, false).await
    }

    pub async fn find_artifacts_by_type_id(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<Artifact>, MetadataError> {
        let record_set = self
            .executor
            .select_node_ids_by_type_id(TypeKind::Artifact, type_id.get())
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no artifacts found for type_id: {}",
                type_id
            )));
        }
        self.find_nodes(&ids, false).await
    }

    pub async fn find_executions_by_type_id(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<Execution>, MetadataError> {
        let record_set = self
            .executor
            .select_node_ids_by_type_id(TypeKind::Execution, type_id.get())
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no executions found for type_id: {}",
                type_id
            )));
        }
        self.find_nodes(&ids, false).await
    }

    pub async fn find_contexts_by_type_id(
        &mut self,
        type_id: TypeId,
    ) -> Result<Vec<Context>, MetadataError> {
        let record_set = self
            .executor
            .select_node_ids_by_type_id(TypeKind::Context, type_id.get())
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no contexts found with type_id: {}",
                type_id
            )));
        }
        self.find_nodes(&ids, false).await
    }

    pub async fn find_artifact_by_type_id_and_name(
        &mut self,
        type_id: TypeId,
        name: &str,
    ) -> Result<Artifact, MetadataError> {
        let record_set = self
            .executor
            .select_node_id_by_type_id_and_name(TypeKind::Artifact, type_id.get(), name)
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no artifacts found for type_id: {}, name: {:?}",
                type_id, name
            )));
        }
        let mut nodes = self.find_nodes(&ids, false).await?;
        Ok(nodes.remove(0))
    }

    pub async fn find_execution_by_type_id_and_name(
        &mut self,
        type_id: TypeId,
        name: &str,
    ) -> Result<Execution, MetadataError> {
        let record_set = self
            .executor
            .select_node_id_by_type_id_and_name(TypeKind::Execution, type_id.get(), name)
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no executions found for type_id: {}, name: {:?}",
                type_id, name
            )));
        }
        let mut nodes = self.find_nodes(&ids, false).await?;
        Ok(nodes.remove(0))
    }

    pub async fn find_context_by_type_id_and_name(
        &mut self,
        type_id: TypeId,
        name: &str,
    ) -> Result<Context, MetadataError> {
        let record_set = self
            .executor
            .select_node_id_by_type_id_and_name(TypeKind::Context, type_id.get(), name)
            .await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no contexts found with type_id: {}, name: {:?}",
                type_id, name
            )));
        }
        let mut nodes = self.find_nodes(&ids, false).await?;
        Ok(nodes.remove(0))
    }

    pub async fn find_artifacts_by_uri(
        &mut self,
        uri: &str,
    ) -> Result<Vec<Artifact>, MetadataError> {
        let record_set = self.executor.select_artifacts_by_uri(uri).await?;
        let ids = ids_at_column(&record_set, 0)?;
        if ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no artifacts found for uri: {:?}",
                uri
            )));
        }
        self.find_nodes(&ids, false).await
    }

    pub async fn list_artifacts(
        &mut self,
        options: &ListOperationOptions,
        candidate_ids: Option<&[i64]>,
    ) -> Result<(Vec<Artifact>, Option<String>), MetadataError> {
        self.list_nodes(options, candidate_ids).await
    }

    pub async fn list_executions(
        &mut self,
        options: &ListOperationOptions,
        candidate_ids: Option<&[i64]>,
    ) -> Result<(Vec<Execution>, Option<String>), MetadataError> {
        self.list_nodes(options, candidate_ids).await
    }

    pub async fn list_contexts(
        &mut self,
        options: &ListOperationOptions,
        candidate_ids: Option<&[i64]>,
    ) -> Result<(Vec<Context>, Option<String>), MetadataError> {
        self.list_nodes(options, candidate_ids).await
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    /// Inserts the event and its path steps, returning the event id. The
    /// `(artifact, execution, type)` triple is unique.
    pub async fn create_event(&mut self, event: &Event) -> Result<i64, MetadataError> {
        if event.event_type == EventType::Unknown {
            return Err(MetadataError::invalid_argument("no event type is specified"));
        }
        let artifacts = self
            .executor
            .select_nodes_by_id(TypeKind::Artifact, &[event.artifact_id.get()])
            .await?;
        if artifacts.is_empty() {
            return Err(MetadataError::invalid_argument(format!(
                "no artifact with the given id {}",
                event.artifact_id
            )));
        }
        let executions = self
            .executor
            .select_nodes_by_id(TypeKind::Execution, &[event.execution_id.get()])
            .await?;
        if executions.is_empty() {
            return Err(MetadataError::invalid_argument(format!(
                "no execution with the given id {}",
                event.execution_id
            )));
        }

        // The schema carries no unique index on Event, so the triple is
        // checked here, inside the caller's transaction.
        let existing = self
            .executor
            .select_events_by_artifact_ids(&[event.artifact_id.get()])
            .await?;
        for record in &existing.records {
            if record.len() < 4 {
                return Err(MetadataError::internal("malformed Event record"));
            }
            let execution_id = cell_to_i64(&record[2])?;
            let event_type = EventType::from_i64(cell_to_i64(&record[3])?)?;
            if execution_id == event.execution_id.get() && event_type == event.event_type {
                return Err(MetadataError::already_exists(format!(
                    "event ({}, {}, {:?}) already exists",
                    event.artifact_id, event.execution_id, event.event_type
                )));
            }
        }

        let event_time = event
            .milliseconds_since_epoch
            .unwrap_or_else(current_millis);
        let event_id = self
            .executor
            .insert_event(
                event.artifact_id.get(),
                event.execution_id.get(),
                event.event_type,
                event_time,
            )
            .await?;
        for step in &event.path {
            self.executor.insert_event_path(event_id, step).await?;
        }
        Ok(event_id)
    }

    async fn events_from_record_set(
        &mut self,
        record_set: RecordSet,
    ) -> Result<Vec<Event>, MetadataError> {
        let mut events = Vec::with_capacity(record_set.len());
        let mut event_ids = Vec::with_capacity(record_set.len());
        for record in &record_set.records {
            if record.len() < 5 {
                return Err(MetadataError::internal("malformed Event record"));
            }
            event_ids.push(cell_to_i64(&record[0])?);
            events.push(Event {
                artifact_id: Id::new(cell_to_i64(&record[1])?),
                execution_id: Id::new(cell_to_i64(&record[2])?),
                event_type: EventType::from_i64(cell_to_i64(&record[3])?)?,
                path: Vec::new(),
                milliseconds_since_epoch: match &record[4] {
                    Some(_) => Some(cell_to_i64(&record[4])?),
                    None => None,
                },
            });
        }
        if events.is_empty() {
            return Ok(events);
        }

        let mut position_by_event_id: HashMap<i64, usize> = HashMap::new();
        for (position, event_id) in event_ids.iter().enumerate() {
            position_by_event_id.insert(*event_id, position);
        }
        let paths = self
            .executor
            .select_event_paths_by_event_ids(&event_ids)
            .await?;
        for record in &paths.records {
            if record.len() < 4 {
                return Err(MetadataError::internal("malformed EventPath record"));
            }
            let event_id = cell_to_i64(&record[0])?;
            let position = position_by_event_id.get(&event_id).ok_or_else(|| {
                MetadataError::internal(format!("path row references unknown event {}", event_id))
            })?;
            let step = if cell_to_bool(&record[1])? {
                EventStep::Index(cell_to_i64(&record[2])?)
            } else {
                EventStep::Key(cell_to_string(&record[3])?)
            };
            events[*position].path.push(step);
        }
        Ok(events)
    }

    pub async fn find_events_by_artifacts(
        &mut self,
        artifact_ids: &[Id],
    ) -> Result<Vec<Event>, MetadataError> {
        let record_set = if artifact_ids.is_empty() {
            RecordSet::default()
        } else {
            let raw: Vec<i64> = artifact_ids.iter().map(|id| id.get()).collect();
            self.executor.select_events_by_artifact_ids(&raw).await?
        };
        if record_set.is_empty() {
            return Err(MetadataError::not_found(
                "cannot find events by given artifact ids",
            ));
        }
        self.events_from_record_set(record_set).await
    }

    pub async fn find_events_by_executions(
        &mut self,
        execution_ids: &[Id],
    ) -> Result<Vec<Event>, MetadataError> {
        let record_set = if execution_ids.is_empty() {
            RecordSet::default()
        } else {
            let raw: Vec<i64> = execution_ids.iter().map(|id| id.get()).collect();
            self.executor.select_events_by_execution_ids(&raw).await?
        };
        if record_set.is_empty() {
            return Err(MetadataError::not_found(
                "cannot find events by given execution ids",
            ));
        }
        self.events_from_record_set(record_set).await
    }

    // ---------------------------------------------------------------------
    // Context edges
    // ---------------------------------------------------------------------

    pub async fn create_association(
        &mut self,
        association: &Association,
    ) -> Result<i64, MetadataError> {
        let contexts = self
            .executor
            .select_nodes_by_id(TypeKind::Context, &[association.context_id.get()])
            .await?;
        if contexts.is_empty() {
            return Err(MetadataError::invalid_argument("context id not found"));
        }
        let executions = self
            .executor
            .select_nodes_by_id(TypeKind::Execution, &[association.execution_id.get()])
            .await?;
        if executions.is_empty() {
            return Err(MetadataError::invalid_argument("execution id not found"));
        }
        self.executor
            .insert_association(association.context_id.get(), association.execution_id.get())
            .await
            .map_err(|e| {
                promote_unique_violation(
                    e,
                    format!(
                        "given association ({}, {}) already exists",
                        association.context_id, association.execution_id
                    ),
                )
            })
    }

    pub async fn create_attribution(
        &mut self,
        attribution: &Attribution,
    ) -> Result<i64, MetadataError> {
        let contexts = self
            .executor
            .select_nodes_by_id(TypeKind::Context, &[attribution.context_id.get()])
            .await?;
        if contexts.is_empty() {
            return Err(MetadataError::invalid_argument("context id not found"));
        }
        let artifacts = self
            .executor
            .select_nodes_by_id(TypeKind::Artifact, &[attribution.artifact_id.get()])
            .await?;
        if artifacts.is_empty() {
            return Err(MetadataError::invalid_argument("artifact id not found"));
        }
        self.executor
            .insert_attribution(attribution.context_id.get(), attribution.artifact_id.get())
            .await
            .map_err(|e| {
                promote_unique_violation(
                    e,
                    format!(
                        "given attribution ({}, {}) already exists",
                        attribution.context_id, attribution.artifact_id
                    ),
                )
            })
    }

    pub async fn find_contexts_by_execution(
        &mut self,
        execution_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        let record_set = self
            .executor
            .select_associations_by_execution_id(execution_id.get())
            .await?;
        let context_ids = ids_at_column(&record_set, 1)?;
        if context_ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no contexts found for execution_id: {}",
                execution_id
            )));
        }
        self.find_nodes(&context_ids, false).await
    }

    pub async fn find_contexts_by_artifact(
        &mut self,
        artifact_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        let record_set = self
            .executor
            .select_attributions_by_artifact_id(artifact_id.get())
            .await?;
        let context_ids = ids_at_column(&record_set, 1)?;
        if context_ids.is_empty() {
            return Err(MetadataError::not_found(format!(
                "no contexts found for artifact_id: {}",
                artifact_id
            )));
        }
        self.find_nodes(&context_ids, false).await
    }

    pub async fn find_executions_by_context(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Execution>, MetadataError> {
        let record_set = self
            .executor
            .select_associations_by_context_id(context_id.get())
            .await?;
        let execution_ids = ids_at_column(&record_set, 2)?;
        if execution_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_nodes(&execution_ids, false).await
    }

    pub async fn list_executions_by_context(
        &mut self,
        context_id: Id,
        options: &ListOperationOptions,
    ) -> Result<(Vec<Execution>, Option<String>), MetadataError> {
        let record_set = self
            .executor
            .select_associations_by_context_id(context_id.get())
            .await?;
        let execution_ids = ids_at_column(&record_set, 2)?;
        if execution_ids.is_empty() {
            return Ok((Vec::new(), None));
        }
        self.list_nodes(options, Some(&execution_ids)).await
    }

    pub async fn find_artifacts_by_context(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Artifact>, MetadataError> {
        let record_set = self
            .executor
            .select_attributions_by_context_id(context_id.get())
            .await?;
        let artifact_ids = ids_at_column(&record_set, 2)?;
        if artifact_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_nodes(&artifact_ids, false).await
    }

    pub async fn list_artifacts_by_context(
        &mut self,
        context_id: Id,
        options: &ListOperationOptions,
    ) -> Result<(Vec<Artifact>, Option<String>), MetadataError> {
        let record_set = self
            .executor
            .select_attributions_by_context_id(context_id.get())
            .await?;
        let artifact_ids = ids_at_column(&record_set, 2)?;
        if artifact_ids.is_empty() {
            return Ok((Vec::new(), None));
        }
        self.list_nodes(options, Some(&artifact_ids)).await
    }

    /// Links a child context to a parent. Both contexts must exist; a link
    /// that would close a cycle through the parent's ancestry (self-links
    /// included) is rejected.
    pub async fn create_parent_context(
        &mut self,
        parent_context: &ParentContext,
    ) -> Result<(), MetadataError> {
        let contexts = self
            .executor
            .select_nodes_by_id(
                TypeKind::Context,
                &[
                    parent_context.parent_id.get(),
                    parent_context.child_id.get(),
                ],
            )
            .await?;
        if contexts.len() < 2 {
            return Err(MetadataError::invalid_argument(format!(
                "given parent / child id in the parent context cannot be found: ({}, {})",
                parent_context.parent_id, parent_context.child_id
            )));
        }

        let mut pending = vec![parent_context.parent_id.get()];
        let mut visited = HashSet::new();
        while let Some(ancestor_id) = pending.pop() {
            if ancestor_id == parent_context.child_id.get() {
                return Err(MetadataError::invalid_argument(
                    "there is a cycle detected of the given parent context",
                ));
            }
            if !visited.insert(ancestor_id) {
                continue;
            }
            let record_set = self
                .executor
                .select_parent_contexts_by_context_id(ancestor_id)
                .await?;
            pending.extend(ids_at_column(&record_set, 1)?);
        }

        self.executor
            .insert_parent_context(parent_context.parent_id.get(), parent_context.child_id.get())
            .await
            .map_err(|e| promote_unique_violation(e, "the parent context link already exists"))
    }

    pub async fn find_parent_contexts_by_context_id(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        let record_set = self
            .executor
            .select_parent_contexts_by_context_id(context_id.get())
            .await?;
        let parent_ids = ids_at_column(&record_set, 1)?;
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_nodes(&parent_ids, false).await
    }

    pub async fn find_child_contexts_by_context_id(
        &mut self,
        context_id: Id,
    ) -> Result<Vec<Context>, MetadataError> {
        let record_set = self
            .executor
            .select_child_contexts_by_context_id(context_id.get())
            .await?;
        let child_ids = ids_at_column(&record_set, 0)?;
        if child_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_nodes(&child_ids, false).await
    }
}
