//! Query executor: binds typed values to catalog templates, runs them
//! against the metadata source, and owns schema creation and migration.
use crate::errors::MetadataError;
use crate::list_options::{
    append_limit_clause, append_order_by_clause, append_ordering_threshold_clause,
    ListOperationOptions,
};
use crate::metadata::{
    encode_struct_value, ArtifactState, ArtifactStructType, EventStep, EventType, ExecutionState,
    PropertyType, PropertyValue, TypeKind,
};
use crate::metadata_source::{Dialect, MetadataSource, RecordSet};
use crate::query_config::{QueryConfig, Template, MAX_TEMPLATE_PARAMETERS};

/// A typed value bound into a template placeholder.
#[derive(Debug, Clone)]
pub(crate) enum Parameter {
    Int(i64),
    Double(f64),
    Str(String),
    Bool(bool),
    Null,
    IntList(Vec<i64>),
    /// A bare column name substituted without quoting. Only catalog-known
    /// identifiers are ever passed here.
    Field(&'static str),
}

impl Parameter {
    fn opt_str(value: Option<&str>) -> Self {
        match value {
            Some(v) => Self::Str(v.to_owned()),
            None => Self::Null,
        }
    }

    fn opt_int(value: Option<i64>) -> Self {
        match value {
            Some(v) => Self::Int(v),
            None => Self::Null,
        }
    }

    fn struct_type(value: Option<&ArtifactStructType>) -> Result<Self, MetadataError> {
        match value {
            Some(v) => {
                let json = serde_json::to_string(v).map_err(|e| {
                    MetadataError::internal(format!("cannot serialize struct type: {}", e))
                })?;
                Ok(Self::Str(json))
            }
            None => Ok(Self::Null),
        }
    }

    fn render(&self, source: &MetadataSource) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Str(v) => format!("'{}'", source.escape_string(v)),
            Self::Bool(v) => (if *v { "1" } else { "0" }).to_owned(),
            Self::Null => "null".to_owned(),
            Self::IntList(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Self::Field(name) => (*name).to_owned(),
        }
    }
}

/// The `ArtifactProperty`/`ExecutionProperty`/`ContextProperty` column a
/// value lands in. STRUCT values share `string_value` with strings.
fn value_column(value: &PropertyValue) -> &'static str {
    match value {
        PropertyValue::Int(_) => "int_value",
        PropertyValue::Double(_) => "double_value",
        PropertyValue::String(_) | PropertyValue::Struct(_) => "string_value",
    }
}

fn value_parameter(value: &PropertyValue) -> Result<Parameter, MetadataError> {
    Ok(match value {
        PropertyValue::Int(v) => Parameter::Int(*v),
        PropertyValue::Double(v) => Parameter::Double(*v),
        PropertyValue::String(v) => Parameter::Str(v.clone()),
        PropertyValue::Struct(v) => Parameter::Str(encode_struct_value(v)?),
    })
}

// Cell parsers shared with the access object. Typed interpretation of the
// stringly RecordSet happens through these.

pub(crate) fn cell_to_i64(cell: &Option<String>) -> Result<i64, MetadataError> {
    let text = cell
        .as_deref()
        .ok_or_else(|| MetadataError::internal("expected an integer cell, found NULL"))?;
    text.parse::<i64>()
        .map_err(|_| MetadataError::internal(format!("cannot parse {:?} as an integer", text)))
}

pub(crate) fn cell_to_f64(cell: &Option<String>) -> Result<f64, MetadataError> {
    let text = cell
        .as_deref()
        .ok_or_else(|| MetadataError::internal("expected a double cell, found NULL"))?;
    text.parse::<f64>()
        .map_err(|_| MetadataError::internal(format!("cannot parse {:?} as a double", text)))
}

pub(crate) fn cell_to_bool(cell: &Option<String>) -> Result<bool, MetadataError> {
    Ok(cell_to_i64(cell)? != 0)
}

pub(crate) fn cell_to_string(cell: &Option<String>) -> Result<String, MetadataError> {
    cell.clone()
        .ok_or_else(|| MetadataError::internal("expected a string cell, found NULL"))
}

/// Substitutes `$0..$9` in a single left-to-right pass, so rendered values
/// are never rescanned for placeholders.
fn substitute_placeholders(
    template: &str,
    rendered: &[String],
) -> Result<String, MetadataError> {
    let bytes = template.as_bytes();
    let mut out = Vec::with_capacity(template.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1].is_ascii_digit() {
            let index = (bytes[i + 1] - b'0') as usize;
            let value = rendered.get(index).ok_or_else(|| {
                MetadataError::invalid_argument(format!(
                    "template references ${} but only {} parameters were bound",
                    index,
                    rendered.len()
                ))
            })?;
            out.extend_from_slice(value.as_bytes());
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| MetadataError::internal("substituted query is not valid UTF-8"))
}

/// Dispatches catalog templates against one metadata source.
#[derive(Debug)]
pub struct QueryExecutor {
    source: MetadataSource,
    config: QueryConfig,
    /// When set, this executor serves an existing database pinned at an
    /// earlier schema version and refuses to initialize or migrate.
    query_schema_version: Option<i64>,
}

impl QueryExecutor {
    pub fn new(source: MetadataSource) -> Self {
        Self::with_query_schema_version(source, None)
    }

    pub fn with_query_schema_version(
        source: MetadataSource,
        query_schema_version: Option<i64>,
    ) -> Self {
        let config = match source.dialect() {
            Dialect::Sqlite => QueryConfig::sqlite(),
            Dialect::Mysql => QueryConfig::mysql(),
        };
        Self {
            source,
            config,
            query_schema_version,
        }
    }

    pub fn library_version(&self) -> i64 {
        self.query_schema_version
            .unwrap_or(self.config.schema_version)
    }

    pub(crate) async fn begin(&mut self) -> Result<(), MetadataError> {
        self.source.begin().await
    }

    pub(crate) async fn commit(&mut self) -> Result<(), MetadataError> {
        self.source.commit().await
    }

    pub(crate) async fn rollback(&mut self) -> Result<(), MetadataError> {
        self.source.rollback().await
    }

    pub(crate) async fn close(self) -> Result<(), MetadataError> {
        self.source.close().await
    }

    async fn execute_template(
        &mut self,
        template: Template,
        parameters: &[Parameter],
    ) -> Result<RecordSet, MetadataError> {
        if parameters.len() > MAX_TEMPLATE_PARAMETERS {
            return Err(MetadataError::invalid_argument(
                "template query has too many parameters (at most 10 is supported)",
            ));
        }
        if parameters.len() != template.parameter_num {
            return Err(MetadataError::invalid_argument(format!(
                "template {:?} declares {} parameters but {} were bound",
                template.query,
                template.parameter_num,
                parameters.len()
            )));
        }
        let rendered: Vec<String> = parameters
            .iter()
            .map(|parameter| parameter.render(&self.source))
            .collect();
        let sql = substitute_placeholders(template.query, &rendered)?;
        tracing::debug!(sql = %sql.trim(), "executing template query");
        self.source.execute_query(&sql).await
    }

    /// Runs an insert template and reads back the generated row id.
    async fn execute_insert(
        &mut self,
        template: Template,
        parameters: &[Parameter],
    ) -> Result<i64, MetadataError> {
        self.execute_template(template, parameters).await?;
        self.select_last_insert_id().await
    }

    pub(crate) async fn select_last_insert_id(&mut self) -> Result<i64, MetadataError> {
        let record_set = self
            .execute_template(self.config.select_last_insert_id, &[])
            .await?;
        let record = record_set
            .records
            .first()
            .ok_or_else(|| MetadataError::internal("could not find last insert ID: no record"))?;
        let cell = record
            .first()
            .ok_or_else(|| MetadataError::internal("could not find last insert ID: missing value"))?;
        cell_to_i64(cell)
            .map_err(|_| MetadataError::internal("could not parse last insert ID"))
    }

    // ---------------------------------------------------------------------
    // Schema lifecycle
    // ---------------------------------------------------------------------

    /// Probes which schema generation the database is at.
    ///
    /// `MLMDEnv` answers directly when present; otherwise the legacy v0
    /// table set is probed, and failing both means the database is empty.
    pub async fn get_schema_version(&mut self) -> Result<i64, MetadataError> {
        let check_env = self.config.check_mlmd_env_table;
        match self.execute_template(check_env, &[]).await {
            Ok(record_set) => match record_set.len() {
                0 => Err(MetadataError::aborted(
                    "MLMDEnv table exists but no schema_version can be found. This may be \
                     due to a concurrent connection to the empty database. Please retry \
                     the connection.",
                )),
                1 => cell_to_i64(&record_set.records[0][0]),
                count => Err(MetadataError::data_loss(format!(
                    "MLMDEnv table exists but the schema version cannot be resolved: \
                     expected a single row, found {}",
                    count
                ))),
            },
            Err(_) => {
                let check_v0 = self.config.check_tables_in_v0_13_2;
                if self.execute_template(check_v0, &[]).await.is_ok() {
                    Ok(0)
                } else {
                    Err(MetadataError::not_found("it looks an empty db is given"))
                }
            }
        }
    }

    pub(crate) async fn insert_schema_version(&mut self, version: i64) -> Result<(), MetadataError> {
        self.execute_template(self.config.insert_schema_version, &[Parameter::Int(version)])
            .await
            .map(|_| ())
    }

    pub(crate) async fn update_schema_version(&mut self, version: i64) -> Result<(), MetadataError> {
        self.execute_template(self.config.update_schema_version, &[Parameter::Int(version)])
            .await
            .map(|_| ())
    }

    fn is_compatible(db_version: i64, library_version: i64) -> bool {
        // Version skew in either direction requires an explicit migration.
        db_version == library_version
    }

    /// Advances the database one schema version at a time until it matches
    /// the library version.
    pub async fn upgrade_metadata_source_if_out_of_date(
        &mut self,
        enable_migration: bool,
    ) -> Result<(), MetadataError> {
        let library_version = self.library_version();
        let mut db_version = match self.get_schema_version().await {
            // An empty database is created directly at head.
            Err(err) if err.is_not_found() => library_version,
            other => other?,
        };

        if Self::is_compatible(db_version, library_version) {
            return Ok(());
        }
        if db_version > library_version {
            return Err(MetadataError::failed_precondition(format!(
                "the database version {} is greater than the library version {}. Please \
                 upgrade the library to use the given database in order to prevent \
                 potential data loss; if data loss is acceptable, downgrade the database \
                 using a newer library version.",
                db_version, library_version
            )));
        }
        if !enable_migration {
            return Err(MetadataError::failed_precondition(format!(
                "the database version {} is older than the library version {} and schema \
                 migration is disabled. Please upgrade the database before using this \
                 library version, or switch to an older library version.",
                db_version, library_version
            )));
        }

        while db_version < library_version {
            let to_version = db_version + 1;
            let scheme = self
                .config
                .migration_schemes
                .get(&to_version)
                .cloned()
                .ok_or_else(|| {
                    MetadataError::internal(format!(
                        "cannot find migration_schemes to version {}",
                        to_version
                    ))
                })?;
            for upgrade_query in scheme.upgrade_queries {
                self.execute_template(upgrade_query, &[])
                    .await
                    .map_err(|e| {
                        e.with_context(format!("Upgrade query failed: {}", upgrade_query.query))
                    })?;
            }
            self.update_schema_version(to_version)
                .await
                .map_err(|e| e.with_context("Failed to update schema"))?;
            tracing::info!(version = to_version, "upgraded metadata schema");
            db_version = to_version;
        }
        Ok(())
    }

    /// Walks the database down to `to_schema_version`, one version at a
    /// time. Version 0 predates `MLMDEnv`, so no version row is written for
    /// it.
    pub async fn downgrade_metadata_source(
        &mut self,
        to_schema_version: i64,
    ) -> Result<(), MetadataError> {
        let library_version = self.config.schema_version;
        if to_schema_version < 0 || to_schema_version > library_version {
            return Err(MetadataError::invalid_argument(format!(
                "cannot downgrade to schema_version {}: the target must be between 0 and \
                 the library version {}",
                to_schema_version, library_version
            )));
        }
        let mut db_version = match self.get_schema_version().await {
            Err(err) if err.is_not_found() => {
                return Err(MetadataError::invalid_argument(
                    "empty database is given; downgrade operation is not needed",
                ));
            }
            other => other?,
        };
        if db_version > library_version {
            return Err(MetadataError::failed_precondition(format!(
                "the database version {} is greater than the library version {}; the \
                 current library does not know how to downgrade it",
                db_version, library_version
            )));
        }

        while db_version > to_schema_version {
            let to_version = db_version - 1;
            let scheme = self
                .config
                .migration_schemes
                .get(&to_version)
                .cloned()
                .ok_or_else(|| {
                    MetadataError::internal(format!(
                        "cannot find migration_schemes to version {}",
                        to_version
                    ))
                })?;
            for downgrade_query in scheme.downgrade_queries {
                self.execute_template(downgrade_query, &[]).await.map_err(|e| {
                    e.with_context(
                        "Failed to migrate existing db; the migration transaction rolls back",
                    )
                })?;
            }
            if to_version > 0 {
                self.update_schema_version(to_version).await.map_err(|e| {
                    e.with_context(
                        "Failed to migrate existing db; the migration transaction rolls back",
                    )
                })?;
            }
            tracing::info!(version = to_version, "downgraded metadata schema");
            db_version = to_version;
        }
        Ok(())
    }

    /// Creates every table and secondary index, then records the library
    /// version. Losing the version-insert race to an identical value is
    /// fine; any other disagreement is data loss.
    pub async fn init_metadata_source(&mut self) -> Result<(), MetadataError> {
        let creates = [
            self.config.create_type_table,
            self.config.create_type_property_table,
            self.config.create_parent_type_table,
            self.config.create_artifact_table,
            self.config.create_artifact_property_table,
            self.config.create_execution_table,
            self.config.create_execution_property_table,
            self.config.create_event_table,
            self.config.create_event_path_table,
            self.config.create_mlmd_env_table,
            self.config.create_context_table,
            self.config.create_context_property_table,
            self.config.create_parent_context_table,
            self.config.create_association_table,
            self.config.create_attribution_table,
        ];
        for create in creates {
            self.execute_template(create, &[]).await?;
        }
        let indices = self.config.secondary_indices.clone();
        for index_query in indices {
            if let Err(err) = self.execute_template(index_query, &[]).await {
                // MySQL does not support idempotent index creation.
                if err.to_string().contains("Duplicate key name") {
                    continue;
                }
                return Err(err);
            }
        }

        let library_version = self.library_version();
        if self.insert_schema_version(library_version).await.is_err() {
            let db_version = self.get_schema_version().await?;
            if db_version != library_version {
                return Err(MetadataError::data_loss(format!(
                    "the database cannot be initialized with the schema_version of the \
                     current library ({}); the version on record is {}. This may result \
                     from a race with another concurrent migration procedure.",
                    library_version, db_version
                )));
            }
        }
        tracing::info!(version = library_version, "initialized metadata schema");
        Ok(())
    }

    async fn check_schema_version_aligns_with_query_version(
        &mut self,
        query_version: i64,
    ) -> Result<(), MetadataError> {
        let db_version = self.get_schema_version().await?;
        if db_version != query_version {
            return Err(MetadataError::failed_precondition(format!(
                "the executor is pinned at schema version {} but the database reports {}",
                query_version, db_version
            )));
        }
        Ok(())
    }

    /// Brings up the schema if it is absent. Three outcomes on a version-
    /// aligned database: every table present (no-op), none present (create
    /// everything), a strict subset present (a concurrent initializer raced
    /// us; abort and let the caller retry).
    pub async fn init_metadata_source_if_not_exists(
        &mut self,
        enable_upgrade_migration: bool,
    ) -> Result<(), MetadataError> {
        if let Some(query_version) = self.query_schema_version {
            return self
                .check_schema_version_aligns_with_query_version(query_version)
                .await;
        }
        self.upgrade_metadata_source_if_out_of_date(enable_upgrade_migration)
            .await?;

        let checks = [
            (self.config.check_type_table, "type_table"),
            (self.config.check_parent_type_table, "parent_type_table"),
            (self.config.check_type_property_table, "type_property_table"),
            (self.config.check_artifact_table, "artifact_table"),
            (
                self.config.check_artifact_property_table,
                "artifact_property_table",
            ),
            (self.config.check_execution_table, "execution_table"),
            (
                self.config.check_execution_property_table,
                "execution_property_table",
            ),
            (self.config.check_event_table, "event_table"),
            (self.config.check_event_path_table, "event_path_table"),
            (self.config.check_mlmd_env_table, "mlmd_env_table"),
            (self.config.check_context_table, "context_table"),
            (
                self.config.check_parent_context_table,
                "parent_context_table",
            ),
            (
                self.config.check_context_property_table,
                "context_property_table",
            ),
            (self.config.check_association_table, "association_table"),
            (self.config.check_attribution_table, "attribution_table"),
        ];
        let total = checks.len();
        let mut present = Vec::new();
        let mut missing = Vec::new();
        for (check, name) in checks {
            if self.execute_template(check, &[]).await.is_ok() {
                present.push(name);
            } else {
                missing.push(name);
            }
        }

        if missing.is_empty() {
            return Ok(());
        }
        if missing.len() != total {
            return Err(MetadataError::aborted(format!(
                "there is a subset of tables in the database; this may be due to a \
                 concurrent connection initializing the same empty database. Please retry \
                 the connection. Present tables: {}; missing tables: {}",
                present.join(", "),
                missing.join(", ")
            )));
        }
        self.init_metadata_source().await
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    pub(crate) async fn insert_artifact_type(
        &mut self,
        name: &str,
        version: Option<&str>,
        description: Option<&str>,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_artifact_type;
        self.execute_insert(
            template,
            &[
                Parameter::Str(name.to_owned()),
                Parameter::opt_str(version),
                Parameter::opt_str(description),
            ],
        )
        .await
    }

    pub(crate) async fn insert_execution_type(
        &mut self,
        name: &str,
        version: Option<&str>,
        description: Option<&str>,
        input_type: Option<&ArtifactStructType>,
        output_type: Option<&ArtifactStructType>,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_execution_type;
        let parameters = [
            Parameter::Str(name.to_owned()),
            Parameter::opt_str(version),
            Parameter::opt_str(description),
            Parameter::struct_type(input_type)?,
            Parameter::struct_type(output_type)?,
        ];
        self.execute_insert(template, &parameters).await
    }

    pub(crate) async fn insert_context_type(
        &mut self,
        name: &str,
        version: Option<&str>,
        description: Option<&str>,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_context_type;
        self.execute_insert(
            template,
            &[
                Parameter::Str(name.to_owned()),
                Parameter::opt_str(version),
                Parameter::opt_str(description),
            ],
        )
        .await
    }

    pub(crate) async fn select_type_by_id(
        &mut self,
        type_id: i64,
        type_kind: TypeKind,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_type_by_id;
        self.execute_template(
            template,
            &[Parameter::Int(type_id), Parameter::Int(type_kind as i64)],
        )
        .await
    }

    pub(crate) async fn select_type_by_name_and_version(
        &mut self,
        name: &str,
        version: Option<&str>,
        type_kind: TypeKind,
    ) -> Result<RecordSet, MetadataError> {
        match version.filter(|v| !v.is_empty()) {
            Some(version) => {
                let template = self.config.select_type_by_name_and_version;
                self.execute_template(
                    template,
                    &[
                        Parameter::Str(name.to_owned()),
                        Parameter::Str(version.to_owned()),
                        Parameter::Int(type_kind as i64),
                    ],
                )
                .await
            }
            None => {
                let template = self.config.select_type_by_name;
                self.execute_template(
                    template,
                    &[
                        Parameter::Str(name.to_owned()),
                        Parameter::Int(type_kind as i64),
                    ],
                )
                .await
            }
        }
    }

    pub(crate) async fn select_all_types(
        &mut self,
        type_kind: TypeKind,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_all_types;
        self.execute_template(template, &[Parameter::Int(type_kind as i64)])
            .await
    }

    pub(crate) async fn insert_type_property(
        &mut self,
        type_id: i64,
        name: &str,
        data_type: PropertyType,
    ) -> Result<(), MetadataError> {
        let template = self.config.insert_type_property;
        self.execute_template(
            template,
            &[
                Parameter::Int(type_id),
                Parameter::Str(name.to_owned()),
                Parameter::Int(data_type as i64),
            ],
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn select_property_by_type_id(
        &mut self,
        type_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_property_by_type_id;
        self.execute_template(template, &[Parameter::Int(type_id)])
            .await
    }

    pub(crate) async fn insert_parent_type(
        &mut self,
        type_id: i64,
        parent_type_id: i64,
    ) -> Result<(), MetadataError> {
        let template = self.config.insert_parent_type;
        self.execute_template(
            template,
            &[Parameter::Int(type_id), Parameter::Int(parent_type_id)],
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn select_parent_types_by_type_id(
        &mut self,
        type_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_parent_type_by_type_id;
        self.execute_template(template, &[Parameter::Int(type_id)])
            .await
    }

    // ---------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------

    pub(crate) async fn insert_artifact(
        &mut self,
        type_id: i64,
        uri: Option<&str>,
        state: Option<ArtifactState>,
        name: Option<&str>,
        create_time_millis: i64,
        update_time_millis: i64,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_artifact;
        let parameters = [
            Parameter::Int(type_id),
            Parameter::opt_str(uri),
            Parameter::opt_int(state.map(|s| s as i64)),
            Parameter::opt_str(name),
            Parameter::Int(create_time_millis),
            Parameter::Int(update_time_millis),
        ];
        self.execute_insert(template, &parameters).await
    }

    pub(crate) async fn update_artifact(
        &mut self,
        artifact_id: i64,
        type_id: i64,
        uri: Option<&str>,
        state: Option<ArtifactState>,
        update_time_millis: i64,
    ) -> Result<(), MetadataError> {
        let template = self.config.update_artifact;
        self.execute_template(
            template,
            &[
                Parameter::Int(artifact_id),
                Parameter::Int(type_id),
                Parameter::opt_str(uri),
                Parameter::opt_int(state.map(|s| s as i64)),
                Parameter::Int(update_time_millis),
            ],
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn insert_execution(
        &mut self,
        type_id: i64,
        last_known_state: Option<ExecutionState>,
        name: Option<&str>,
        create_time_millis: i64,
        update_time_millis: i64,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_execution;
        let parameters = [
            Parameter::Int(type_id),
            Parameter::opt_int(last_known_state.map(|s| s as i64)),
            Parameter::opt_str(name),
            Parameter::Int(create_time_millis),
            Parameter::Int(update_time_millis),
        ];
        self.execute_insert(template, &parameters).await
    }

    pub(crate) async fn update_execution(
        &mut self,
        execution_id: i64,
        type_id: i64,
        last_known_state: Option<ExecutionState>,
        update_time_millis: i64,
    ) -> Result<(), MetadataError> {
        let template = self.config.update_execution;
        self.execute_template(
            template,
            &[
                Parameter::Int(execution_id),
                Parameter::Int(type_id),
                Parameter::opt_int(last_known_state.map(|s| s as i64)),
                Parameter::Int(update_time_millis),
            ],
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn insert_context(
        &mut self,
        type_id: i64,
        name: &str,
        create_time_millis: i64,
        update_time_millis: i64,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_context;
        let parameters = [
            Parameter::Int(type_id),
            Parameter::Str(name.to_owned()),
            Parameter::Int(create_time_millis),
            Parameter::Int(update_time_millis),
        ];
        self.execute_insert(template, &parameters).await
    }

    pub(crate) async fn update_context(
        &mut self,
        context_id: i64,
        type_id: i64,
        name: &str,
        update_time_millis: i64,
    ) -> Result<(), MetadataError> {
        let template = self.config.update_context;
        self.execute_template(
            template,
            &[
                Parameter::Int(context_id),
                Parameter::Int(type_id),
                Parameter::Str(name.to_owned()),
                Parameter::Int(update_time_millis),
            ],
        )
        .await
        .map(|_| ())
    }

    /// Header rows (non-property columns) for the given node ids.
    pub(crate) async fn select_nodes_by_id(
        &mut self,
        kind: TypeKind,
        ids: &[i64],
    ) -> Result<RecordSet, MetadataError> {
        let template = match kind {
            TypeKind::Artifact => self.config.select_artifact_by_id,
            TypeKind::Execution => self.config.select_execution_by_id,
            TypeKind::Context => self.config.select_context_by_id,
        };
        self.execute_template(template, &[Parameter::IntList(ids.to_vec())])
            .await
    }

    pub(crate) async fn select_node_ids_by_type_id(
        &mut self,
        kind: TypeKind,
        type_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = match kind {
            TypeKind::Artifact => self.config.select_artifacts_by_type_id,
            TypeKind::Execution => self.config.select_executions_by_type_id,
            TypeKind::Context => self.config.select_contexts_by_type_id,
        };
        self.execute_template(template, &[Parameter::Int(type_id)])
            .await
    }

    pub(crate) async fn select_node_id_by_type_id_and_name(
        &mut self,
        kind: TypeKind,
        type_id: i64,
        name: &str,
    ) -> Result<RecordSet, MetadataError> {
        let template = match kind {
            TypeKind::Artifact => self.config.select_artifact_by_type_id_and_name,
            TypeKind::Execution => self.config.select_execution_by_type_id_and_name,
            TypeKind::Context => self.config.select_context_by_type_id_and_name,
        };
        self.execute_template(
            template,
            &[Parameter::Int(type_id), Parameter::Str(name.to_owned())],
        )
        .await
    }

    pub(crate) async fn select_artifacts_by_uri(
        &mut self,
        uri: &str,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_artifacts_by_uri;
        self.execute_template(template, &[Parameter::Str(uri.to_owned())])
            .await
    }

    pub(crate) async fn select_all_node_ids(
        &mut self,
        kind: TypeKind,
    ) -> Result<RecordSet, MetadataError> {
        let sql = format!("SELECT `id` FROM `{}`;", kind.node_table_name());
        self.source.execute_query(&sql).await
    }

    /// The id phase of a paginated list: `SELECT id FROM <Kind> WHERE
    /// [candidates AND] threshold ORDER BY ... LIMIT ...`. An empty
    /// candidate set short-circuits without touching the database.
    pub(crate) async fn list_node_ids_using_options(
        &mut self,
        kind: TypeKind,
        options: &ListOperationOptions,
        candidate_ids: Option<&[i64]>,
    ) -> Result<RecordSet, MetadataError> {
        if let Some(ids) = candidate_ids {
            if ids.is_empty() {
                return Ok(RecordSet::default());
            }
        }
        let mut sql = format!("SELECT `id` FROM `{}` WHERE", kind.node_table_name());
        if let Some(ids) = candidate_ids {
            let joined = ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" `id` IN ({}) AND ", joined));
        }
        append_ordering_threshold_clause(options, &mut sql)?;
        append_order_by_clause(options, &mut sql)?;
        append_limit_clause(options, &mut sql)?;
        self.source.execute_query(&sql).await
    }

    // ---------------------------------------------------------------------
    // Node properties
    // ---------------------------------------------------------------------

    fn property_templates(&self, kind: TypeKind) -> (Template, Template, Template, Template) {
        match kind {
            TypeKind::Artifact => (
                self.config.insert_artifact_property,
                self.config.update_artifact_property,
                self.config.delete_artifact_property,
                self.config.select_artifact_property_by_artifact_id,
            ),
            TypeKind::Execution => (
                self.config.insert_execution_property,
                self.config.update_execution_property,
                self.config.delete_execution_property,
                self.config.select_execution_property_by_execution_id,
            ),
            TypeKind::Context => (
                self.config.insert_context_property,
                self.config.update_context_property,
                self.config.delete_context_property,
                self.config.select_context_property_by_context_id,
            ),
        }
    }

    pub(crate) async fn insert_node_property(
        &mut self,
        kind: TypeKind,
        node_id: i64,
        name: &str,
        is_custom_property: bool,
        value: &PropertyValue,
    ) -> Result<(), MetadataError> {
        let (insert, _, _, _) = self.property_templates(kind);
        let parameters = [
            Parameter::Field(value_column(value)),
            Parameter::Int(node_id),
            Parameter::Str(name.to_owned()),
            Parameter::Bool(is_custom_property),
            value_parameter(value)?,
        ];
        self.execute_template(insert, &parameters).await.map(|_| ())
    }

    pub(crate) async fn update_node_property(
        &mut self,
        kind: TypeKind,
        node_id: i64,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), MetadataError> {
        let (_, update, _, _) = self.property_templates(kind);
        let parameters = [
            Parameter::Field(value_column(value)),
            value_parameter(value)?,
            Parameter::Int(node_id),
            Parameter::Str(name.to_owned()),
        ];
        self.execute_template(update, &parameters).await.map(|_| ())
    }

    pub(crate) async fn delete_node_property(
        &mut self,
        kind: TypeKind,
        node_id: i64,
        name: &str,
    ) -> Result<(), MetadataError> {
        let (_, _, delete, _) = self.property_templates(kind);
        self.execute_template(
            delete,
            &[Parameter::Int(node_id), Parameter::Str(name.to_owned())],
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn select_node_properties(
        &mut self,
        kind: TypeKind,
        ids: &[i64],
    ) -> Result<RecordSet, MetadataError> {
        let (_, _, _, select) = self.property_templates(kind);
        self.execute_template(select, &[Parameter::IntList(ids.to_vec())])
            .await
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub(crate) async fn insert_event(
        &mut self,
        artifact_id: i64,
        execution_id: i64,
        event_type: EventType,
        milliseconds_since_epoch: i64,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_event;
        let parameters = [
            Parameter::Int(artifact_id),
            Parameter::Int(execution_id),
            Parameter::Int(event_type as i64),
            Parameter::Int(milliseconds_since_epoch),
        ];
        self.execute_insert(template, &parameters).await
    }

    /// Inserts one path step. The step value lands in `step_index` or
    /// `step_key` depending on the variant, with `is_index_step` tagging
    /// which one was taken.
    pub(crate) async fn insert_event_path(
        &mut self,
        event_id: i64,
        step: &EventStep,
    ) -> Result<(), MetadataError> {
        let template = self.config.insert_event_path;
        let parameters = match step {
            EventStep::Index(index) => [
                Parameter::Int(event_id),
                Parameter::Field("step_index"),
                Parameter::Bool(true),
                Parameter::Int(*index),
            ],
            EventStep::Key(key) => [
                Parameter::Int(event_id),
                Parameter::Field("step_key"),
                Parameter::Bool(false),
                Parameter::Str(key.clone()),
            ],
        };
        self.execute_template(template, &parameters).await.map(|_| ())
    }

    pub(crate) async fn select_events_by_artifact_ids(
        &mut self,
        artifact_ids: &[i64],
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_event_by_artifact_ids;
        self.execute_template(template, &[Parameter::IntList(artifact_ids.to_vec())])
            .await
    }

    pub(crate) async fn select_events_by_execution_ids(
        &mut self,
        execution_ids: &[i64],
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_event_by_execution_ids;
        self.execute_template(template, &[Parameter::IntList(execution_ids.to_vec())])
            .await
    }

    pub(crate) async fn select_event_paths_by_event_ids(
        &mut self,
        event_ids: &[i64],
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_event_path_by_event_ids;
        self.execute_template(template, &[Parameter::IntList(event_ids.to_vec())])
            .await
    }

    // ---------------------------------------------------------------------
    // Context edges
    // ---------------------------------------------------------------------

    pub(crate) async fn insert_association(
        &mut self,
        context_id: i64,
        execution_id: i64,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_association;
        let parameters = [Parameter::Int(context_id), Parameter::Int(execution_id)];
        self.execute_insert(template, &parameters).await
    }

    pub(crate) async fn select_associations_by_context_id(
        &mut self,
        context_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_association_by_context_id;
        self.execute_template(template, &[Parameter::Int(context_id)])
            .await
    }

    pub(crate) async fn select_associations_by_execution_id(
        &mut self,
        execution_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_association_by_execution_id;
        self.execute_template(template, &[Parameter::Int(execution_id)])
            .await
    }

    pub(crate) async fn insert_attribution(
        &mut self,
        context_id: i64,
        artifact_id: i64,
    ) -> Result<i64, MetadataError> {
        let template = self.config.insert_attribution;
        let parameters = [Parameter::Int(context_id), Parameter::Int(artifact_id)];
        self.execute_insert(template, &parameters).await
    }

    pub(crate) async fn select_attributions_by_context_id(
        &mut self,
        context_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_attribution_by_context_id;
        self.execute_template(template, &[Parameter::Int(context_id)])
            .await
    }

    pub(crate) async fn select_attributions_by_artifact_id(
        &mut self,
        artifact_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_attribution_by_artifact_id;
        self.execute_template(template, &[Parameter::Int(artifact_id)])
            .await
    }

    pub(crate) async fn insert_parent_context(
        &mut self,
        parent_id: i64,
        child_id: i64,
    ) -> Result<(), MetadataError> {
        let template = self.config.insert_parent_context;
        self.execute_template(
            template,
            &[Parameter::Int(child_id), Parameter::Int(parent_id)],
        )
        .await
        .map(|_| ())
    }

    pub(crate) async fn select_parent_contexts_by_context_id(
        &mut self,
        context_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_parent_context_by_context_id;
        self.execute_template(template, &[Parameter::Int(context_id)])
            .await
    }

    pub(crate) async fn select_child_contexts_by_context_id(
        &mut self,
        context_id: i64,
    ) -> Result<RecordSet, MetadataError> {
        let template = self.config.select_parent_context_by_parent_context_id;
        self.execute_template(template, &[Parameter::Int(context_id)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_source::ConnectionConfig;

    async fn fresh_executor() -> QueryExecutor {
        let source = MetadataSource::connect(&ConnectionConfig::FakeDatabase)
            .await
            .unwrap();
        QueryExecutor::new(source)
    }

    // The v0 ("0.13.2") table layout, used as the migration starting point.
    async fn create_v0_schema(executor: &mut QueryExecutor) {
        let statements = [
            concat!(
                "CREATE TABLE IF NOT EXISTS `Type` ( ",
                " `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                " `name` VARCHAR(255) NOT NULL, ",
                " `is_artifact_type` TINYINT(1) NOT NULL, ",
                " `input_type` TEXT, ",
                " `output_type` TEXT );"
            ),
            concat!(
                "CREATE TABLE IF NOT EXISTS `TypeProperty` ( ",
                " `type_id` INT NOT NULL, ",
                " `name` VARCHAR(255) NOT NULL, ",
                " `data_type` INT NULL, ",
                " PRIMARY KEY (`type_id`, `name`));"
            ),
            concat!(
                "CREATE TABLE IF NOT EXISTS `Artifact` ( ",
                " `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                " `type_id` INT NOT NULL, ",
                " `uri` TEXT );"
            ),
            concat!(
                "CREATE TABLE IF NOT EXISTS `ArtifactProperty` ( ",
                " `artifact_id` INT NOT NULL, ",
                " `name` VARCHAR(255) NOT NULL, ",
                " `is_custom_property` TINYINT(1) NOT NULL, ",
                " `int_value` INT, ",
                " `double_value` DOUBLE, ",
                " `string_value` TEXT, ",
                " PRIMARY KEY (`artifact_id`, `name`, `is_custom_property`));"
            ),
            concat!(
                "CREATE TABLE IF NOT EXISTS `Execution` ( ",
                " `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                " `type_id` INT NOT NULL );"
            ),
            concat!(
                "CREATE TABLE IF NOT EXISTS `ExecutionProperty` ( ",
                " `execution_id` INT NOT NULL, ",
                " `name` VARCHAR(255) NOT NULL, ",
                " `is_custom_property` TINYINT(1) NOT NULL, ",
                " `int_value` INT, ",
                " `double_value` DOUBLE, ",
                " `string_value` TEXT, ",
                " PRIMARY KEY (`execution_id`, `name`, `is_custom_property`));"
            ),
            concat!(
                "CREATE TABLE IF NOT EXISTS `Event` ( ",
                " `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                " `artifact_id` INT NOT NULL, ",
                " `execution_id` INT NOT NULL, ",
                " `type` INT NOT NULL, ",
                " `milliseconds_since_epoch` INT );"
            ),
            concat!(
                "CREATE TABLE IF NOT EXISTS `EventPath` ( ",
                " `event_id` INT NOT NULL, ",
                " `is_index_step` TINYINT(1) NOT NULL, ",
                " `step_index` INT, ",
                " `step_key` TEXT );"
            ),
        ];
        for statement in statements {
            executor.source.execute_query(statement).await.unwrap();
        }
    }

    #[async_std::test]
    async fn empty_database_reports_not_found() {
        let mut executor = fresh_executor().await;
        assert!(matches!(
            executor.get_schema_version().await,
            Err(MetadataError::NotFound(_))
        ));
    }

    #[async_std::test]
    async fn init_is_idempotent_and_records_the_library_version() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        executor.init_metadata_source_if_not_exists(false).await?;
        assert_eq!(executor.get_schema_version().await?, executor.library_version());

        // A second initialization is a no-op.
        executor.init_metadata_source_if_not_exists(false).await?;
        assert_eq!(executor.get_schema_version().await?, executor.library_version());
        Ok(())
    }

    #[async_std::test]
    async fn partial_schema_is_a_concurrent_init_race() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        let create_type_table = executor.config.create_type_table;
        executor.execute_template(create_type_table, &[]).await?;

        assert!(matches!(
            executor.init_metadata_source_if_not_exists(false).await,
            Err(MetadataError::Aborted(_))
        ));
        Ok(())
    }

    #[async_std::test]
    async fn v0_database_is_detected_and_upgraded() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        create_v0_schema(&mut executor).await;
        assert_eq!(executor.get_schema_version().await?, 0);

        // Upgrade disabled: the database stays behind and the call fails.
        assert!(matches!(
            executor.upgrade_metadata_source_if_out_of_date(false).await,
            Err(MetadataError::FailedPrecondition(_))
        ));

        executor.upgrade_metadata_source_if_out_of_date(true).await?;
        assert_eq!(executor.get_schema_version().await?, executor.library_version());
        executor.init_metadata_source_if_not_exists(true).await?;
        Ok(())
    }

    #[async_std::test]
    async fn upgrade_then_downgrade_round_trips() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        create_v0_schema(&mut executor).await;
        executor.upgrade_metadata_source_if_out_of_date(true).await?;
        assert_eq!(executor.get_schema_version().await?, 6);

        executor.downgrade_metadata_source(5).await?;
        assert_eq!(executor.get_schema_version().await?, 5);

        executor.upgrade_metadata_source_if_out_of_date(true).await?;
        assert_eq!(executor.get_schema_version().await?, 6);

        // All the way down to the pre-MLMDEnv layout.
        executor.downgrade_metadata_source(0).await?;
        assert_eq!(executor.get_schema_version().await?, 0);
        Ok(())
    }

    #[async_std::test]
    async fn downgrade_target_must_be_in_range() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        executor.init_metadata_source_if_not_exists(false).await?;

        assert!(matches!(
            executor.downgrade_metadata_source(-1).await,
            Err(MetadataError::InvalidArgument(_))
        ));
        assert!(matches!(
            executor.downgrade_metadata_source(7).await,
            Err(MetadataError::InvalidArgument(_))
        ));
        Ok(())
    }

    #[async_std::test]
    async fn newer_database_is_a_failed_precondition() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        executor.init_metadata_source_if_not_exists(false).await?;
        executor.update_schema_version(7).await?;

        assert!(matches!(
            executor.upgrade_metadata_source_if_out_of_date(true).await,
            Err(MetadataError::FailedPrecondition(_))
        ));
        assert!(matches!(
            executor.downgrade_metadata_source(6).await,
            Err(MetadataError::FailedPrecondition(_))
        ));
        Ok(())
    }

    #[async_std::test]
    async fn duplicated_mlmd_env_rows_are_data_loss() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        executor.init_metadata_source_if_not_exists(false).await?;
        executor
            .source
            .execute_query("INSERT INTO `MLMDEnv`(`schema_version`) VALUES(99);")
            .await?;

        assert!(matches!(
            executor.get_schema_version().await,
            Err(MetadataError::DataLoss(_))
        ));
        Ok(())
    }

    #[async_std::test]
    async fn pinned_executor_verifies_the_stored_version() -> anyhow::Result<()> {
        // A pinned executor refuses an empty database outright.
        let source = MetadataSource::connect(&ConnectionConfig::FakeDatabase)
            .await
            .unwrap();
        let mut executor = QueryExecutor::with_query_schema_version(source, Some(5));
        assert!(matches!(
            executor.init_metadata_source_if_not_exists(false).await,
            Err(MetadataError::NotFound(_))
        ));

        // Initialize a database at head, then reopen it pinned at an older
        // version: the stored version does not match the pin.
        let file = tempfile::NamedTempFile::new()?;
        let path = file
            .path()
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("invalid path"))?;
        let config = ConnectionConfig::sqlite(path);
        let mut head = QueryExecutor::new(MetadataSource::connect(&config).await.unwrap());
        head.init_metadata_source_if_not_exists(false).await?;

        let source = MetadataSource::connect(&config).await.unwrap();
        let mut pinned = QueryExecutor::with_query_schema_version(source, Some(5));
        assert!(matches!(
            pinned.init_metadata_source_if_not_exists(false).await,
            Err(MetadataError::FailedPrecondition(_))
        ));
        Ok(())
    }

    #[async_std::test]
    async fn binding_arity_is_checked() {
        let mut executor = fresh_executor().await;
        let template = executor.config.insert_schema_version;
        assert!(matches!(
            executor.execute_template(template, &[]).await,
            Err(MetadataError::InvalidArgument(_))
        ));
    }

    #[async_std::test]
    async fn string_parameters_are_escaped() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        executor.init_metadata_source_if_not_exists(false).await?;
        let type_id = executor
            .insert_artifact_type("quo'ted", None, Some("it's fine"))
            .await?;
        let record_set = executor
            .select_type_by_id(type_id, TypeKind::Artifact)
            .await?;
        assert_eq!(record_set.len(), 1);
        assert_eq!(record_set.records[0][1].as_deref(), Some("quo'ted"));
        Ok(())
    }

    #[async_std::test]
    async fn empty_candidate_set_short_circuits() -> anyhow::Result<()> {
        let mut executor = fresh_executor().await;
        executor.init_metadata_source_if_not_exists(false).await?;
        let record_set = executor
            .list_node_ids_using_options(
                TypeKind::Artifact,
                &ListOperationOptions::default().max_result_size(10),
                Some(&[]),
            )
            .await?;
        assert!(record_set.is_empty());
        Ok(())
    }
}
