//! Declarative catalog of SQL templates, keyed by dialect.
//!
//! Templates use the positional placeholders `$0..$9`; substitution is
//! textual and happens in the query executor after dialect escaping. The
//! catalog also carries the per-version migration schemes that move a
//! database between numbered schema layouts.
use std::collections::BTreeMap;

/// Schema generation the templates below correspond to.
pub const SCHEMA_VERSION: i64 = 6;

/// Most placeholders a template may declare.
pub const MAX_TEMPLATE_PARAMETERS: usize = 10;

/// One parameterized query.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub query: &'static str,
    pub parameter_num: usize,
}

const fn template(query: &'static str, parameter_num: usize) -> Template {
    Template {
        query,
        parameter_num,
    }
}

const fn statement(query: &'static str) -> Template {
    template(query, 0)
}

/// Queries that migrate a database to (`upgrade_queries`) or away from
/// (`downgrade_queries`) the scheme's version.
#[derive(Debug, Clone, Default)]
pub struct MigrationScheme {
    pub upgrade_queries: Vec<Template>,
    pub downgrade_queries: Vec<Template>,
}

/// Read-only template catalog for one dialect. Load once, share by
/// reference, never mutate.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub schema_version: i64,

    // Type + TypeProperty + ParentType
    pub create_type_table: Template,
    pub check_type_table: Template,
    pub insert_artifact_type: Template,
    pub insert_execution_type: Template,
    pub insert_context_type: Template,
    pub select_type_by_id: Template,
    pub select_type_by_name: Template,
    pub select_type_by_name_and_version: Template,
    pub select_all_types: Template,
    pub create_type_property_table: Template,
    pub check_type_property_table: Template,
    pub insert_type_property: Template,
    pub select_property_by_type_id: Template,
    pub create_parent_type_table: Template,
    pub check_parent_type_table: Template,
    pub insert_parent_type: Template,
    pub select_parent_type_by_type_id: Template,

    // Artifact + ArtifactProperty
    pub create_artifact_table: Template,
    pub check_artifact_table: Template,
    pub insert_artifact: Template,
    pub select_artifact_by_id: Template,
    pub select_artifact_by_type_id_and_name: Template,
    pub select_artifacts_by_type_id: Template,
    pub select_artifacts_by_uri: Template,
    pub update_artifact: Template,
    pub create_artifact_property_table: Template,
    pub check_artifact_property_table: Template,
    pub insert_artifact_property: Template,
    pub select_artifact_property_by_artifact_id: Template,
    pub update_artifact_property: Template,
    pub delete_artifact_property: Template,

    // Execution + ExecutionProperty
    pub create_execution_table: Template,
    pub check_execution_table: Template,
    pub insert_execution: Template,
    pub select_execution_by_id: Template,
    pub select_execution_by_type_id_and_name: Template,
    pub select_executions_by_type_id: Template,
    pub update_execution: Template,
    pub create_execution_property_table: Template,
    pub check_execution_property_table: Template,
    pub insert_execution_property: Template,
    pub select_execution_property_by_execution_id: Template,
    pub update_execution_property: Template,
    pub delete_execution_property: Template,

    // Context + ContextProperty + ParentContext
    pub create_context_table: Template,
    pub check_context_table: Template,
    pub insert_context: Template,
    pub select_context_by_id: Template,
    pub select_contexts_by_type_id: Template,
    pub select_context_by_type_id_and_name: Template,
    pub update_context: Template,
    pub create_context_property_table: Template,
    pub check_context_property_table: Template,
    pub insert_context_property: Template,
    pub select_context_property_by_context_id: Template,
    pub update_context_property: Template,
    pub delete_context_property: Template,
    pub create_parent_context_table: Template,
    pub check_parent_context_table: Template,
    pub insert_parent_context: Template,
    pub select_parent_context_by_context_id: Template,
    pub select_parent_context_by_parent_context_id: Template,

    // Event + EventPath
    pub create_event_table: Template,
    pub check_event_table: Template,
    pub insert_event: Template,
    pub select_event_by_artifact_ids: Template,
    pub select_event_by_execution_ids: Template,
    pub create_event_path_table: Template,
    pub check_event_path_table: Template,
    pub insert_event_path: Template,
    pub select_event_path_by_event_ids: Template,

    // Association + Attribution
    pub create_association_table: Template,
    pub check_association_table: Template,
    pub insert_association: Template,
    pub select_association_by_context_id: Template,
    pub select_association_by_execution_id: Template,
    pub create_attribution_table: Template,
    pub check_attribution_table: Template,
    pub insert_attribution: Template,
    pub select_attribution_by_context_id: Template,
    pub select_attribution_by_artifact_id: Template,

    // MLMDEnv + lifecycle
    pub create_mlmd_env_table: Template,
    pub check_mlmd_env_table: Template,
    pub insert_schema_version: Template,
    pub update_schema_version: Template,
    pub check_tables_in_v0_13_2: Template,
    pub select_last_insert_id: Template,

    pub secondary_indices: Vec<Template>,
    /// Keyed by the *destination* schema version.
    pub migration_schemes: BTreeMap<i64, MigrationScheme>,
}

impl QueryConfig {
    /// Templates shared by both dialects, with SQLite DDL as the base (the
    /// MySQL constructor overrides the statements that differ).
    fn base() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,

            create_type_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `Type` ( ",
                "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                "   `name` VARCHAR(255) NOT NULL, ",
                "   `version` VARCHAR(255), ",
                "   `type_kind` TINYINT(1) NOT NULL, ",
                "   `description` TEXT, ",
                "   `input_type` TEXT, ",
                "   `output_type` TEXT",
                " ); "
            )),
            check_type_table: statement(concat!(
                " SELECT `id`, `name`, `version`, `type_kind`, `description`, ",
                "        `input_type`, `output_type` ",
                " FROM `Type` LIMIT 1; "
            )),
            insert_artifact_type: template(
                concat!(
                    " INSERT INTO `Type`( ",
                    "   `name`, `type_kind`, `version`, `description` ",
                    ") VALUES($0, 1, $1, $2);"
                ),
                3,
            ),
            insert_execution_type: template(
                concat!(
                    " INSERT INTO `Type`( ",
                    "   `name`, `type_kind`, `version`, `description`, ",
                    "   `input_type`, `output_type` ",
                    ") VALUES($0, 0, $1, $2, $3, $4);"
                ),
                5,
            ),
            insert_context_type: template(
                concat!(
                    " INSERT INTO `Type`( ",
                    "   `name`, `type_kind`, `version`, `description` ",
                    ") VALUES($0, 2, $1, $2);"
                ),
                3,
            ),
            select_type_by_id: template(
                concat!(
                    " SELECT `id`, `name`, `version`, `description`, ",
                    "        `input_type`, `output_type` FROM `Type` ",
                    " WHERE id = $0 and type_kind = $1; "
                ),
                2,
            ),
            select_type_by_name: template(
                concat!(
                    " SELECT `id`, `name`, `version`, `description`, ",
                    "        `input_type`, `output_type` FROM `Type` ",
                    " WHERE name = $0 AND version IS NULL AND type_kind = $1; "
                ),
                2,
            ),
            select_type_by_name_and_version: template(
                concat!(
                    " SELECT `id`, `name`, `version`, `description`, ",
                    "        `input_type`, `output_type` FROM `Type` ",
                    " WHERE name = $0 AND version = $1 AND type_kind = $2; "
                ),
                3,
            ),
            select_all_types: template(
                concat!(
                    " SELECT `id`, `name`, `version`, `description`, ",
                    "        `input_type`, `output_type` FROM `Type` ",
                    " WHERE type_kind = $0; "
                ),
                1,
            ),
            create_type_property_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `TypeProperty` ( ",
                "   `type_id` INT NOT NULL, ",
                "   `name` VARCHAR(255) NOT NULL, ",
                "   `data_type` INT NULL, ",
                " PRIMARY KEY (`type_id`, `name`)); "
            )),
            check_type_property_table: statement(concat!(
                " SELECT `type_id`, `name`, `data_type` ",
                " FROM `TypeProperty` LIMIT 1; "
            )),
            insert_type_property: template(
                concat!(
                    " INSERT INTO `TypeProperty`( ",
                    "   `type_id`, `name`, `data_type` ",
                    ") VALUES($0, $1, $2);"
                ),
                3,
            ),
            select_property_by_type_id: template(
                concat!(
                    " SELECT `name` as `key`, `data_type` as `value` ",
                    " from `TypeProperty` ",
                    " WHERE `type_id` = $0; "
                ),
                1,
            ),
            create_parent_type_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `ParentType` ( ",
                "   `type_id` INT NOT NULL, ",
                "   `parent_type_id` INT NOT NULL, ",
                " PRIMARY KEY (`type_id`, `parent_type_id`)); "
            )),
            check_parent_type_table: statement(concat!(
                " SELECT `type_id`, `parent_type_id` ",
                " FROM `ParentType` LIMIT 1; "
            )),
            insert_parent_type: template(
                concat!(
                    " INSERT INTO `ParentType`(`type_id`, `parent_type_id`) ",
                    " VALUES($0, $1);"
                ),
                2,
            ),
            select_parent_type_by_type_id: template(
                concat!(
                    " SELECT `type_id`, `parent_type_id` ",
                    " FROM `ParentType` WHERE `type_id` = $0; "
                ),
                1,
            ),

            create_artifact_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `Artifact` ( ",
                "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                "   `type_id` INT NOT NULL, ",
                "   `uri` TEXT, ",
                "   `state` INT, ",
                "   `name` VARCHAR(255), ",
                "   `create_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                "   `last_update_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                "   UNIQUE(`type_id`, `name`) ",
                " ); "
            )),
            check_artifact_table: statement(concat!(
                " SELECT `id`, `type_id`, `uri`, `state`, `name`, ",
                "        `create_time_since_epoch`, `last_update_time_since_epoch` ",
                " FROM `Artifact` LIMIT 1; "
            )),
            insert_artifact: template(
                concat!(
                    " INSERT INTO `Artifact`( ",
                    "   `type_id`, `uri`, `state`, `name`, `create_time_since_epoch`, ",
                    "   `last_update_time_since_epoch` ",
                    ") VALUES($0, $1, $2, $3, $4, $5);"
                ),
                6,
            ),
            select_artifact_by_id: template(
                concat!(
                    " SELECT `id`, `type_id`, `uri`, `state`, `name`, ",
                    "        `create_time_since_epoch`, `last_update_time_since_epoch` ",
                    " from `Artifact` ",
                    " WHERE id IN ($0); "
                ),
                1,
            ),
            select_artifact_by_type_id_and_name: template(
                " SELECT `id` from `Artifact` WHERE `type_id` = $0 and `name` = $1; ",
                2,
            ),
            select_artifacts_by_type_id: template(
                " SELECT `id` from `Artifact` WHERE `type_id` = $0; ",
                1,
            ),
            select_artifacts_by_uri: template(
                " SELECT `id` from `Artifact` WHERE `uri` = $0; ",
                1,
            ),
            update_artifact: template(
                concat!(
                    " UPDATE `Artifact` ",
                    " SET `type_id` = $1, `uri` = $2, `state` = $3, ",
                    "     `last_update_time_since_epoch` = $4 ",
                    " WHERE id = $0;"
                ),
                5,
            ),
            create_artifact_property_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `ArtifactProperty` ( ",
                "   `artifact_id` INT NOT NULL, ",
                "   `name` VARCHAR(255) NOT NULL, ",
                "   `is_custom_property` TINYINT(1) NOT NULL, ",
                "   `int_value` INT, ",
                "   `double_value` DOUBLE, ",
                "   `string_value` TEXT, ",
                " PRIMARY KEY (`artifact_id`, `name`, `is_custom_property`)); "
            )),
            check_artifact_property_table: statement(concat!(
                " SELECT `artifact_id`, `name`, `is_custom_property`, ",
                "        `int_value`, `double_value`, `string_value` ",
                " FROM `ArtifactProperty` LIMIT 1; "
            )),
            insert_artifact_property: template(
                concat!(
                    " INSERT INTO `ArtifactProperty`( ",
                    "   `artifact_id`, `name`, `is_custom_property`, `$0` ",
                    ") VALUES($1, $2, $3, $4);"
                ),
                5,
            ),
            select_artifact_property_by_artifact_id: template(
                concat!(
                    " SELECT `artifact_id` as `id`, `name` as `key`, ",
                    "        `is_custom_property`, ",
                    "        `int_value`, `double_value`, `string_value` ",
                    " from `ArtifactProperty` ",
                    " WHERE `artifact_id` IN ($0); "
                ),
                1,
            ),
            update_artifact_property: template(
                concat!(
                    " UPDATE `ArtifactProperty` ",
                    " SET `$0` = $1 ",
                    " WHERE `artifact_id` = $2 and `name` = $3;"
                ),
                4,
            ),
            delete_artifact_property: template(
                concat!(
                    " DELETE FROM `ArtifactProperty` ",
                    " WHERE `artifact_id` = $0 and `name` = $1;"
                ),
                2,
            ),

            create_execution_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `Execution` ( ",
                "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                "   `type_id` INT NOT NULL, ",
                "   `last_known_state` INT, ",
                "   `name` VARCHAR(255), ",
                "   `create_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                "   `last_update_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                "   UNIQUE(`type_id`, `name`) ",
                " ); "
            )),
            check_execution_table: statement(concat!(
                " SELECT `id`, `type_id`, `last_known_state`, `name`, ",
                "        `create_time_since_epoch`, `last_update_time_since_epoch` ",
                " FROM `Execution` LIMIT 1; "
            )),
            insert_execution: template(
                concat!(
                    " INSERT INTO `Execution`( ",
                    "   `type_id`, `last_known_state`, `name`, ",
                    "   `create_time_since_epoch`, `last_update_time_since_epoch` ",
                    ") VALUES($0, $1, $2, $3, $4);"
                ),
                5,
            ),
            select_execution_by_id: template(
                concat!(
                    " SELECT `id`, `type_id`, `last_known_state`, `name`, ",
                    "        `create_time_since_epoch`, `last_update_time_since_epoch` ",
                    " from `Execution` ",
                    " WHERE id IN ($0); "
                ),
                1,
            ),
            select_execution_by_type_id_and_name: template(
                " SELECT `id` from `Execution` WHERE `type_id` = $0 and `name` = $1;",
                2,
            ),
            select_executions_by_type_id: template(
                " SELECT `id` from `Execution` WHERE `type_id` = $0; ",
                1,
            ),
            update_execution: template(
                concat!(
                    " UPDATE `Execution` ",
                    " SET `type_id` = $1, `last_known_state` = $2, ",
                    "     `last_update_time_since_epoch` = $3 ",
                    " WHERE id = $0;"
                ),
                4,
            ),
            create_execution_property_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `ExecutionProperty` ( ",
                "   `execution_id` INT NOT NULL, ",
                "   `name` VARCHAR(255) NOT NULL, ",
                "   `is_custom_property` TINYINT(1) NOT NULL, ",
                "   `int_value` INT, ",
                "   `double_value` DOUBLE, ",
                "   `string_value` TEXT, ",
                " PRIMARY KEY (`execution_id`, `name`, `is_custom_property`)); "
            )),
            check_execution_property_table: statement(concat!(
                " SELECT `execution_id`, `name`, `is_custom_property`, ",
                "        `int_value`, `double_value`, `string_value` ",
                " FROM `ExecutionProperty` LIMIT 1; "
            )),
            insert_execution_property: template(
                concat!(
                    " INSERT INTO `ExecutionProperty`( ",
                    "   `execution_id`, `name`, `is_custom_property`, `$0` ",
                    ") VALUES($1, $2, $3, $4);"
                ),
                5,
            ),
            select_execution_property_by_execution_id: template(
                concat!(
                    " SELECT `execution_id` as `id`, `name` as `key`, ",
                    "        `is_custom_property`, ",
                    "        `int_value`, `double_value`, `string_value` ",
                    " from `ExecutionProperty` ",
                    " WHERE `execution_id` IN ($0); "
                ),
                1,
            ),
            update_execution_property: template(
                concat!(
                    " UPDATE `ExecutionProperty` ",
                    " SET `$0` = $1 ",
                    " WHERE `execution_id` = $2 and `name` = $3;"
                ),
                4,
            ),
            delete_execution_property: template(
                concat!(
                    " DELETE FROM `ExecutionProperty` ",
                    " WHERE `execution_id` = $0 and `name` = $1;"
                ),
                2,
            ),

            create_context_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `Context` ( ",
                "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                "   `type_id` INT NOT NULL, ",
                "   `name` VARCHAR(255) NOT NULL, ",
                "   `create_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                "   `last_update_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                "   UNIQUE(`type_id`, `name`) ",
                " ); "
            )),
            check_context_table: statement(concat!(
                " SELECT `id`, `type_id`, `name`, ",
                "        `create_time_since_epoch`, `last_update_time_since_epoch` ",
                " FROM `Context` LIMIT 1; "
            )),
            insert_context: template(
                concat!(
                    " INSERT INTO `Context`( ",
                    "   `type_id`, `name`, ",
                    "   `create_time_since_epoch`, `last_update_time_since_epoch` ",
                    ") VALUES($0, $1, $2, $3);"
                ),
                4,
            ),
            select_context_by_id: template(
                concat!(
                    " SELECT `id`, `type_id`, `name`, `create_time_since_epoch`, ",
                    "        `last_update_time_since_epoch`",
                    " from `Context` WHERE id IN ($0); "
                ),
                1,
            ),
            select_contexts_by_type_id: template(
                " SELECT `id` from `Context` WHERE `type_id` = $0; ",
                1,
            ),
            select_context_by_type_id_and_name: template(
                " SELECT `id` from `Context` WHERE `type_id` = $0 and `name` = $1; ",
                2,
            ),
            update_context: template(
                concat!(
                    " UPDATE `Context` ",
                    " SET `type_id` = $1, `name` = $2, ",
                    "     `last_update_time_since_epoch` = $3 ",
                    " WHERE id = $0;"
                ),
                4,
            ),
            create_context_property_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `ContextProperty` ( ",
                "   `context_id` INT NOT NULL, ",
                "   `name` VARCHAR(255) NOT NULL, ",
                "   `is_custom_property` TINYINT(1) NOT NULL, ",
                "   `int_value` INT, ",
                "   `double_value` DOUBLE, ",
                "   `string_value` TEXT, ",
                " PRIMARY KEY (`context_id`, `name`, `is_custom_property`)); "
            )),
            check_context_property_table: statement(concat!(
                " SELECT `context_id`, `name`, `is_custom_property`, ",
                "        `int_value`, `double_value`, `string_value` ",
                " FROM `ContextProperty` LIMIT 1; "
            )),
            insert_context_property: template(
                concat!(
                    " INSERT INTO `ContextProperty`( ",
                    "   `context_id`, `name`, `is_custom_property`, `$0` ",
                    ") VALUES($1, $2, $3, $4);"
                ),
                5,
            ),
            select_context_property_by_context_id: template(
                concat!(
                    " SELECT `context_id` as `id`, `name` as `key`, ",
                    "        `is_custom_property`, ",
                    "        `int_value`, `double_value`, `string_value` ",
                    " from `ContextProperty` ",
                    " WHERE `context_id` IN ($0); "
                ),
                1,
            ),
            update_context_property: template(
                concat!(
                    " UPDATE `ContextProperty` ",
                    " SET `$0` = $1 ",
                    " WHERE `context_id` = $2 and `name` = $3;"
                ),
                4,
            ),
            delete_context_property: template(
                concat!(
                    " DELETE FROM `ContextProperty` ",
                    " WHERE `context_id` = $0 and `name` = $1;"
                ),
                2,
            ),
            create_parent_context_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `ParentContext` ( ",
                "   `context_id` INT NOT NULL, ",
                "   `parent_context_id` INT NOT NULL, ",
                " PRIMARY KEY (`context_id`, `parent_context_id`)); "
            )),
            check_parent_context_table: statement(concat!(
                " SELECT `context_id`, `parent_context_id` ",
                " FROM `ParentContext` LIMIT 1; "
            )),
            insert_parent_context: template(
                concat!(
                    " INSERT INTO `ParentContext`( ",
                    "   `context_id`, `parent_context_id` ",
                    ") VALUES($0, $1);"
                ),
                2,
            ),
            select_parent_context_by_context_id: template(
                concat!(
                    " SELECT `context_id`, `parent_context_id` From `ParentContext` ",
                    " WHERE `context_id` = $0; "
                ),
                1,
            ),
            select_parent_context_by_parent_context_id: template(
                concat!(
                    " SELECT `context_id`, `parent_context_id` From `ParentContext` ",
                    " WHERE `parent_context_id` = $0; "
                ),
                1,
            ),

            create_event_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `Event` ( ",
                "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                "   `artifact_id` INT NOT NULL, ",
                "   `execution_id` INT NOT NULL, ",
                "   `type` INT NOT NULL, ",
                "   `milliseconds_since_epoch` INT ",
                " ); "
            )),
            check_event_table: statement(concat!(
                " SELECT `id`, `artifact_id`, `execution_id`, ",
                "        `type`, `milliseconds_since_epoch` ",
                " FROM `Event` LIMIT 1; "
            )),
            insert_event: template(
                concat!(
                    " INSERT INTO `Event`( ",
                    "   `artifact_id`, `execution_id`, `type`, ",
                    "   `milliseconds_since_epoch` ",
                    ") VALUES($0, $1, $2, $3);"
                ),
                4,
            ),
            select_event_by_artifact_ids: template(
                concat!(
                    " SELECT `id`, `artifact_id`, `execution_id`, ",
                    "        `type`, `milliseconds_since_epoch` ",
                    " from `Event` ",
                    " WHERE `artifact_id` IN ($0); "
                ),
                1,
            ),
            select_event_by_execution_ids: template(
                concat!(
                    " SELECT `id`, `artifact_id`, `execution_id`, ",
                    "        `type`, `milliseconds_since_epoch` ",
                    " from `Event` ",
                    " WHERE `execution_id` IN ($0); "
                ),
                1,
            ),
            create_event_path_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `EventPath` ( ",
                "   `event_id` INT NOT NULL, ",
                "   `is_index_step` TINYINT(1) NOT NULL, ",
                "   `step_index` INT, ",
                "   `step_key` TEXT ",
                " ); "
            )),
            check_event_path_table: statement(concat!(
                " SELECT `event_id`, `is_index_step`, `step_index`, `step_key` ",
                " FROM `EventPath` LIMIT 1; "
            )),
            insert_event_path: template(
                concat!(
                    " INSERT INTO `EventPath`( ",
                    "   `event_id`, `is_index_step`, `$1` ",
                    ") VALUES($0, $2, $3);"
                ),
                4,
            ),
            select_event_path_by_event_ids: template(
                concat!(
                    " SELECT `event_id`, `is_index_step`, `step_index`, `step_key` ",
                    " from `EventPath` ",
                    " WHERE `event_id` IN ($0); "
                ),
                1,
            ),

            create_association_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `Association` ( ",
                "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                "   `context_id` INT NOT NULL, ",
                "   `execution_id` INT NOT NULL, ",
                "   UNIQUE(`context_id`, `execution_id`) ",
                " ); "
            )),
            check_association_table: statement(concat!(
                " SELECT `id`, `context_id`, `execution_id` ",
                " FROM `Association` LIMIT 1; "
            )),
            insert_association: template(
                concat!(
                    " INSERT INTO `Association`( ",
                    "   `context_id`, `execution_id` ",
                    ") VALUES($0, $1);"
                ),
                2,
            ),
            select_association_by_context_id: template(
                concat!(
                    " SELECT `id`, `context_id`, `execution_id` ",
                    " from `Association` ",
                    " WHERE `context_id` = $0; "
                ),
                1,
            ),
            select_association_by_execution_id: template(
                concat!(
                    " SELECT `id`, `context_id`, `execution_id` ",
                    " from `Association` ",
                    " WHERE `execution_id` = $0; "
                ),
                1,
            ),
            create_attribution_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `Attribution` ( ",
                "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                "   `context_id` INT NOT NULL, ",
                "   `artifact_id` INT NOT NULL, ",
                "   UNIQUE(`context_id`, `artifact_id`) ",
                " ); "
            )),
            check_attribution_table: statement(concat!(
                " SELECT `id`, `context_id`, `artifact_id` ",
                " FROM `Attribution` LIMIT 1; "
            )),
            insert_attribution: template(
                concat!(
                    " INSERT INTO `Attribution`( ",
                    "   `context_id`, `artifact_id` ",
                    ") VALUES($0, $1);"
                ),
                2,
            ),
            select_attribution_by_context_id: template(
                concat!(
                    " SELECT `id`, `context_id`, `artifact_id` ",
                    " from `Attribution` ",
                    " WHERE `context_id` = $0; "
                ),
                1,
            ),
            select_attribution_by_artifact_id: template(
                concat!(
                    " SELECT `id`, `context_id`, `artifact_id` ",
                    " from `Attribution` ",
                    " WHERE `artifact_id` = $0; "
                ),
                1,
            ),

            create_mlmd_env_table: statement(concat!(
                " CREATE TABLE IF NOT EXISTS `MLMDEnv` ( ",
                "   `schema_version` INTEGER PRIMARY KEY ",
                " ); "
            )),
            check_mlmd_env_table: statement(" SELECT `schema_version` FROM `MLMDEnv`; "),
            insert_schema_version: template(
                " INSERT INTO `MLMDEnv`(`schema_version`) VALUES($0); ",
                1,
            ),
            update_schema_version: template(
                " UPDATE `MLMDEnv` SET `schema_version` = $0; ",
                1,
            ),
            check_tables_in_v0_13_2: statement(concat!(
                " SELECT `Type`.`is_artifact_type` from ",
                " `Artifact`, `Event`, `Execution`, `Type`, `ArtifactProperty`, ",
                " `EventPath`, `ExecutionProperty`, `TypeProperty` LIMIT 1; "
            )),
            select_last_insert_id: statement(" SELECT last_insert_rowid(); "),

            secondary_indices: Vec::new(),
            migration_schemes: BTreeMap::new(),
        }
    }

    pub fn sqlite() -> Self {
        let mut config = Self::base();
        config.secondary_indices = sqlite_secondary_indices();
        config.migration_schemes = sqlite_migration_schemes();
        config
    }

    pub fn mysql() -> Self {
        let mut config = Self::base();
        config.select_last_insert_id = statement(" SELECT last_insert_id(); ");
        config.create_type_table = statement(concat!(
            " CREATE TABLE IF NOT EXISTS `Type` ( ",
            "   `id` INT PRIMARY KEY AUTO_INCREMENT, ",
            "   `name` VARCHAR(255) NOT NULL, ",
            "   `version` VARCHAR(255), ",
            "   `type_kind` TINYINT(1) NOT NULL, ",
            "   `description` TEXT, ",
            "   `input_type` TEXT, ",
            "   `output_type` TEXT",
            " ); "
        ));
        config.create_artifact_table = statement(concat!(
            " CREATE TABLE IF NOT EXISTS `Artifact` ( ",
            "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
            "   `type_id` INT NOT NULL, ",
            "   `uri` TEXT, ",
            "   `state` INT, ",
            "   `name` VARCHAR(255), ",
            "   `create_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
            "   `last_update_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
            "   CONSTRAINT UniqueArtifactTypeName UNIQUE(`type_id`, `name`) ",
            " ); "
        ));
        config.create_execution_table = statement(concat!(
            " CREATE TABLE IF NOT EXISTS `Execution` ( ",
            "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
            "   `type_id` INT NOT NULL, ",
            "   `last_known_state` INT, ",
            "   `name` VARCHAR(255), ",
            "   `create_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
            "   `last_update_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
            "   CONSTRAINT UniqueExecutionTypeName UNIQUE(`type_id`, `name`) ",
            " ); "
        ));
        config.create_context_table = statement(concat!(
            " CREATE TABLE IF NOT EXISTS `Context` ( ",
            "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
            "   `type_id` INT NOT NULL, ",
            "   `name` VARCHAR(255) NOT NULL, ",
            "   `create_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
            "   `last_update_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
            "   UNIQUE(`type_id`, `name`) ",
            " ); "
        ));
        config.create_event_table = statement(concat!(
            " CREATE TABLE IF NOT EXISTS `Event` ( ",
            "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
            "   `artifact_id` INT NOT NULL, ",
            "   `execution_id` INT NOT NULL, ",
            "   `type` INT NOT NULL, ",
            "   `milliseconds_since_epoch` BIGINT ",
            " ); "
        ));
        config.create_association_table = statement(concat!(
            " CREATE TABLE IF NOT EXISTS `Association` ( ",
            "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
            "   `context_id` INT NOT NULL, ",
            "   `execution_id` INT NOT NULL, ",
            "   UNIQUE(`context_id`, `execution_id`) ",
            " ); "
        ));
        config.create_attribution_table = statement(concat!(
            " CREATE TABLE IF NOT EXISTS `Attribution` ( ",
            "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
            "   `context_id` INT NOT NULL, ",
            "   `artifact_id` INT NOT NULL, ",
            "   UNIQUE(`context_id`, `artifact_id`) ",
            " ); "
        ));
        config.secondary_indices = mysql_secondary_indices();
        config.migration_schemes = mysql_migration_schemes();
        config
    }
}

fn sqlite_secondary_indices() -> Vec<Template> {
    vec![
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS `idx_artifact_uri` ",
            " ON `Artifact`(`uri`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS ",
            "   `idx_artifact_create_time_since_epoch` ",
            " ON `Artifact`(`create_time_since_epoch`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS ",
            "   `idx_artifact_last_update_time_since_epoch` ",
            " ON `Artifact`(`last_update_time_since_epoch`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS `idx_event_artifact_id` ",
            " ON `Event`(`artifact_id`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS `idx_event_execution_id` ",
            " ON `Event`(`execution_id`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS `idx_parentcontext_parent_context_id` ",
            " ON `ParentContext`(`parent_context_id`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS `idx_type_name` ",
            " ON `Type`(`name`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS ",
            "   `idx_execution_create_time_since_epoch` ",
            " ON `Execution`(`create_time_since_epoch`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS ",
            "   `idx_execution_last_update_time_since_epoch` ",
            " ON `Execution`(`last_update_time_since_epoch`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS ",
            "   `idx_context_create_time_since_epoch` ",
            " ON `Context`(`create_time_since_epoch`); "
        )),
        statement(concat!(
            " CREATE INDEX IF NOT EXISTS ",
            "   `idx_context_last_update_time_since_epoch` ",
            " ON `Context`(`last_update_time_since_epoch`); "
        )),
    ]
}

fn mysql_secondary_indices() -> Vec<Template> {
    vec![
        // MySQL only supports prefix indices on TEXT; 255 chars covers the
        // utf8 limit for 5.6/5.7.
        statement(concat!(
            " ALTER TABLE `Artifact` ",
            "  ADD INDEX `idx_artifact_uri`(`uri`(255)), ",
            "  ADD INDEX `idx_artifact_create_time_since_epoch` ",
            "             (`create_time_since_epoch`), ",
            "  ADD INDEX `idx_artifact_last_update_time_since_epoch` ",
            "             (`last_update_time_since_epoch`); "
        )),
        statement(concat!(
            " ALTER TABLE `Event` ",
            " ADD INDEX `idx_event_artifact_id` (`artifact_id`), ",
            " ADD INDEX `idx_event_execution_id` (`execution_id`); "
        )),
        statement(concat!(
            " ALTER TABLE `ParentContext` ",
            " ADD INDEX ",
            "   `idx_parentcontext_parent_context_id` (`parent_context_id`); "
        )),
        statement(concat!(
            " ALTER TABLE `Type` ",
            " ADD INDEX `idx_type_name` (`name`); "
        )),
        statement(concat!(
            " ALTER TABLE `Execution` ",
            "  ADD INDEX `idx_execution_create_time_since_epoch` ",
            "             (`create_time_since_epoch`), ",
            "  ADD INDEX `idx_execution_last_update_time_since_epoch` ",
            "             (`last_update_time_since_epoch`); "
        )),
        statement(concat!(
            " ALTER TABLE `Context` ",
            "  ADD INDEX `idx_context_create_time_since_epoch` ",
            "             (`create_time_since_epoch`), ",
            "  ADD INDEX `idx_context_last_update_time_since_epoch` ",
            "             (`last_update_time_since_epoch`); "
        )),
    ]
}

fn sqlite_migration_schemes() -> BTreeMap<i64, MigrationScheme> {
    let mut schemes = BTreeMap::new();

    // v0 is the pre-MLMDEnv layout; downgrading to it drops the version row.
    schemes.insert(
        0,
        MigrationScheme {
            upgrade_queries: Vec::new(),
            downgrade_queries: vec![statement(" DROP TABLE IF EXISTS `MLMDEnv`; ")],
        },
    );

    // v1 introduces MLMDEnv to track the schema version.
    schemes.insert(
        1,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `MLMDEnv` ( ",
                    "   `schema_version` INTEGER PRIMARY KEY ",
                    " ); "
                )),
                statement(" INSERT INTO `MLMDEnv`(`schema_version`) VALUES(0); "),
            ],
            // From v2: drop all context types and rename `type_kind` back to
            // `is_artifact_type`.
            downgrade_queries: vec![
                statement(" DELETE FROM `Type` WHERE `type_kind` = 2; "),
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `TypeTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   `is_artifact_type` TINYINT(1) NOT NULL, ",
                    "   `input_type` TEXT, ",
                    "   `output_type` TEXT",
                    " ); "
                )),
                statement(" INSERT INTO `TypeTemp` SELECT * FROM `Type`; "),
                statement(" DROP TABLE `Type`; "),
                statement(" ALTER TABLE `TypeTemp` rename to `Type`; "),
            ],
        },
    );

    // v2 renames `is_artifact_type` to `type_kind` to make room for context
    // types.
    schemes.insert(
        2,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `TypeTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   `type_kind` TINYINT(1) NOT NULL, ",
                    "   `input_type` TEXT, ",
                    "   `output_type` TEXT",
                    " ); "
                )),
                statement(" INSERT INTO `TypeTemp` SELECT * FROM `Type`; "),
                statement(" DROP TABLE `Type`; "),
                statement(" ALTER TABLE `TypeTemp` rename to `Type`; "),
            ],
            downgrade_queries: vec![
                statement(" DROP TABLE IF EXISTS `Context`; "),
                statement(" DROP TABLE IF EXISTS `ContextProperty`; "),
            ],
        },
    );

    // v3 adds the Context and ContextProperty tables.
    schemes.insert(
        3,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `Context` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `type_id` INT NOT NULL, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   UNIQUE(`type_id`, `name`) ",
                    " ); "
                )),
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `ContextProperty` ( ",
                    "   `context_id` INT NOT NULL, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   `is_custom_property` TINYINT(1) NOT NULL, ",
                    "   `int_value` INT, ",
                    "   `double_value` DOUBLE, ",
                    "   `string_value` TEXT, ",
                    " PRIMARY KEY (`context_id`, `name`, `is_custom_property`)); "
                )),
            ],
            downgrade_queries: vec![
                statement(" DROP TABLE IF EXISTS `Association`; "),
                statement(" DROP TABLE IF EXISTS `Attribution`; "),
            ],
        },
    );

    // v4 adds the Association and Attribution edge tables.
    schemes.insert(
        4,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `Association` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `context_id` INT NOT NULL, ",
                    "   `execution_id` INT NOT NULL, ",
                    "   UNIQUE(`context_id`, `execution_id`) ",
                    " ); "
                )),
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `Attribution` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `context_id` INT NOT NULL, ",
                    "   `artifact_id` INT NOT NULL, ",
                    "   UNIQUE(`context_id`, `artifact_id`) ",
                    " ); "
                )),
            ],
            // From v5: strip state/name/timestamps off the node tables.
            downgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE `ArtifactTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `type_id` INT NOT NULL, ",
                    "   `uri` TEXT ",
                    " ); "
                )),
                statement(concat!(
                    " INSERT INTO `ArtifactTemp` ",
                    " SELECT `id`, `type_id`, `uri` FROM `Artifact`; "
                )),
                statement(" DROP TABLE `Artifact`; "),
                statement(" ALTER TABLE `ArtifactTemp` RENAME TO `Artifact`; "),
                statement(concat!(
                    " CREATE TABLE `ExecutionTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `type_id` INT NOT NULL ",
                    " ); "
                )),
                statement(concat!(
                    " INSERT INTO `ExecutionTemp` ",
                    " SELECT `id`, `type_id` FROM `Execution`; "
                )),
                statement(" DROP TABLE `Execution`; "),
                statement(" ALTER TABLE `ExecutionTemp` RENAME TO `Execution`; "),
                statement(concat!(
                    " CREATE TABLE `ContextTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `type_id` INT NOT NULL, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   UNIQUE(`type_id`, `name`) ",
                    " ); "
                )),
                statement(concat!(
                    " INSERT INTO `ContextTemp` ",
                    " SELECT `id`, `type_id`, `name` FROM `Context`; "
                )),
                statement(" DROP TABLE `Context`; "),
                statement(" ALTER TABLE `ContextTemp` RENAME TO `Context`; "),
            ],
        },
    );

    // v5 adds state, timestamps and per-type unique names to the node
    // tables.
    schemes.insert(
        5,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE `ArtifactTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `type_id` INT NOT NULL, ",
                    "   `uri` TEXT, ",
                    "   `state` INT, ",
                    "   `name` VARCHAR(255), ",
                    "   `create_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                    "   `last_update_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                    "   UNIQUE(`type_id`, `name`) ",
                    " ); "
                )),
                statement(concat!(
                    " INSERT INTO `ArtifactTemp` (`id`, `type_id`, `uri`) ",
                    " SELECT * FROM `Artifact`; "
                )),
                statement(" DROP TABLE `Artifact`; "),
                statement(" ALTER TABLE `ArtifactTemp` RENAME TO `Artifact`; "),
                statement(concat!(
                    " CREATE TABLE `ExecutionTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `type_id` INT NOT NULL, ",
                    "   `last_known_state` INT, ",
                    "   `name` VARCHAR(255), ",
                    "   `create_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                    "   `last_update_time_since_epoch` INT NOT NULL DEFAULT 0, ",
                    "   UNIQUE(`type_id`, `name`) ",
                    " ); "
                )),
                statement(concat!(
                    " INSERT INTO `ExecutionTemp` (`id`, `type_id`) ",
                    " SELECT * FROM `Execution`; "
                )),
                statement(" DROP TABLE `Execution`; "),
                statement(" ALTER TABLE `ExecutionTemp` RENAME TO `Execution`; "),
                statement(concat!(
                    " ALTER TABLE `Context` ",
                    " ADD COLUMN `create_time_since_epoch` INT NOT NULL DEFAULT 0; "
                )),
                statement(concat!(
                    " ALTER TABLE `Context` ",
                    " ADD COLUMN ",
                    "     `last_update_time_since_epoch` INT NOT NULL DEFAULT 0; "
                )),
            ],
            // From v6: drop parent tables, the Type version/description
            // columns, and the secondary indices.
            downgrade_queries: vec![
                statement(" DROP TABLE `ParentType`; "),
                statement(" DROP TABLE `ParentContext`; "),
                statement(concat!(
                    " CREATE TABLE `TypeTemp` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   `type_kind` TINYINT(1) NOT NULL, ",
                    "   `input_type` TEXT, ",
                    "   `output_type` TEXT",
                    " ); "
                )),
                statement(concat!(
                    " INSERT INTO `TypeTemp` ",
                    " SELECT `id`, `name`, `type_kind`, `input_type`, `output_type`",
                    " FROM `Type`; "
                )),
                statement(" DROP TABLE `Type`; "),
                statement(" ALTER TABLE `TypeTemp` RENAME TO `Type`; "),
                statement(" DROP INDEX `idx_artifact_uri`; "),
                statement(" DROP INDEX `idx_artifact_create_time_since_epoch`; "),
                statement(" DROP INDEX `idx_artifact_last_update_time_since_epoch`; "),
                statement(" DROP INDEX `idx_event_artifact_id`; "),
                statement(" DROP INDEX `idx_event_execution_id`; "),
                statement(" DROP INDEX `idx_execution_create_time_since_epoch`; "),
                statement(" DROP INDEX `idx_execution_last_update_time_since_epoch`; "),
                statement(" DROP INDEX `idx_context_create_time_since_epoch`; "),
                statement(" DROP INDEX `idx_context_last_update_time_since_epoch`; "),
            ],
        },
    );

    // v6 adds ParentType/ParentContext, the Type version and description
    // columns, and the secondary indices.
    let mut v6_upgrade = vec![
        statement(concat!(
            " CREATE TABLE IF NOT EXISTS `ParentType` ( ",
            "   `type_id` INT NOT NULL, ",
            "   `parent_type_id` INT NOT NULL, ",
            " PRIMARY KEY (`type_id`, `parent_type_id`)); "
        )),
        statement(concat!(
            " CREATE TABLE IF NOT EXISTS `ParentContext` ( ",
            "   `context_id` INT NOT NULL, ",
            "   `parent_context_id` INT NOT NULL, ",
            " PRIMARY KEY (`context_id`, `parent_context_id`)); "
        )),
        statement(concat!(
            " CREATE TABLE `TypeTemp` ( ",
            "   `id` INTEGER PRIMARY KEY AUTOINCREMENT, ",
            "   `name` VARCHAR(255) NOT NULL, ",
            "   `version` VARCHAR(255), ",
            "   `type_kind` TINYINT(1) NOT NULL, ",
            "   `description` TEXT, ",
            "   `input_type` TEXT, ",
            "   `output_type` TEXT",
            " ); "
        )),
        statement(concat!(
            " INSERT INTO `TypeTemp` ",
            " (`id`, `name`, `type_kind`, `input_type`, `output_type`) ",
            " SELECT * FROM `Type`; "
        )),
        statement(" DROP TABLE `Type`; "),
        statement(" ALTER TABLE `TypeTemp` rename to `Type`; "),
    ];
    v6_upgrade.extend(sqlite_secondary_indices());
    schemes.insert(
        6,
        MigrationScheme {
            upgrade_queries: v6_upgrade,
            downgrade_queries: Vec::new(),
        },
    );

    schemes
}

fn mysql_migration_schemes() -> BTreeMap<i64, MigrationScheme> {
    let mut schemes = BTreeMap::new();

    schemes.insert(
        0,
        MigrationScheme {
            upgrade_queries: Vec::new(),
            downgrade_queries: vec![statement(" DROP TABLE IF EXISTS `MLMDEnv`; ")],
        },
    );

    schemes.insert(
        1,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `MLMDEnv` ( ",
                    "   `schema_version` INTEGER PRIMARY KEY ",
                    " ); "
                )),
                statement(" INSERT INTO `MLMDEnv`(`schema_version`) VALUES(0); "),
            ],
            downgrade_queries: vec![
                statement(" DELETE FROM `Type` WHERE `type_kind` = 2; "),
                statement(concat!(
                    " ALTER TABLE `Type` CHANGE COLUMN ",
                    " `type_kind` `is_artifact_type` TINYINT(1) NOT NULL; "
                )),
            ],
        },
    );

    schemes.insert(
        2,
        MigrationScheme {
            upgrade_queries: vec![statement(concat!(
                " ALTER TABLE `Type` CHANGE COLUMN ",
                " `is_artifact_type` `type_kind` TINYINT(1) NOT NULL; "
            ))],
            downgrade_queries: vec![
                statement(" DROP TABLE IF EXISTS `Context`; "),
                statement(" DROP TABLE IF EXISTS `ContextProperty`; "),
            ],
        },
    );

    schemes.insert(
        3,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `Context` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
                    "   `type_id` INT NOT NULL, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   UNIQUE(`type_id`, `name`) ",
                    " ); "
                )),
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `ContextProperty` ( ",
                    "   `context_id` INT NOT NULL, ",
                    "   `name` VARCHAR(255) NOT NULL, ",
                    "   `is_custom_property` TINYINT(1) NOT NULL, ",
                    "   `int_value` INT, ",
                    "   `double_value` DOUBLE, ",
                    "   `string_value` TEXT, ",
                    " PRIMARY KEY (`context_id`, `name`, `is_custom_property`)); "
                )),
            ],
            downgrade_queries: vec![
                statement(" DROP TABLE IF EXISTS `Association`; "),
                statement(" DROP TABLE IF EXISTS `Attribution`; "),
            ],
        },
    );

    schemes.insert(
        4,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `Association` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
                    "   `context_id` INT NOT NULL, ",
                    "   `execution_id` INT NOT NULL, ",
                    "   UNIQUE(`context_id`, `execution_id`) ",
                    " ); "
                )),
                statement(concat!(
                    " CREATE TABLE IF NOT EXISTS `Attribution` ( ",
                    "   `id` INTEGER PRIMARY KEY AUTO_INCREMENT, ",
                    "   `context_id` INT NOT NULL, ",
                    "   `artifact_id` INT NOT NULL, ",
                    "   UNIQUE(`context_id`, `artifact_id`) ",
                    " ); "
                )),
            ],
            downgrade_queries: vec![
                statement(concat!(
                    " ALTER TABLE `Artifact` ",
                    " DROP INDEX UniqueArtifactTypeName; "
                )),
                statement(concat!(
                    " ALTER TABLE `Artifact` ",
                    " DROP COLUMN `state`, ",
                    " DROP COLUMN `name`, ",
                    " DROP COLUMN `create_time_since_epoch`, ",
                    " DROP COLUMN `last_update_time_since_epoch`; "
                )),
                statement(concat!(
                    " ALTER TABLE `Execution` ",
                    " DROP INDEX UniqueExecutionTypeName; "
                )),
                statement(concat!(
                    " ALTER TABLE `Execution` ",
                    " DROP COLUMN `last_known_state`, ",
                    " DROP COLUMN `name`, ",
                    " DROP COLUMN `create_time_since_epoch`, ",
                    " DROP COLUMN `last_update_time_since_epoch`; "
                )),
                statement(concat!(
                    " ALTER TABLE `Context` ",
                    " DROP COLUMN `create_time_since_epoch`, ",
                    " DROP COLUMN `last_update_time_since_epoch`; "
                )),
            ],
        },
    );

    schemes.insert(
        5,
        MigrationScheme {
            upgrade_queries: vec![
                statement(concat!(
                    " ALTER TABLE `Artifact` ADD ( ",
                    "   `state` INT, ",
                    "   `name` VARCHAR(255), ",
                    "   `create_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
                    "   `last_update_time_since_epoch` BIGINT NOT NULL DEFAULT 0 ",
                    " ), ",
                    " ADD CONSTRAINT UniqueArtifactTypeName ",
                    " UNIQUE(`type_id`, `name`); "
                )),
                statement(concat!(
                    " ALTER TABLE `Execution` ADD ( ",
                    "   `last_known_state` INT, ",
                    "   `name` VARCHAR(255), ",
                    "   `create_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
                    "   `last_update_time_since_epoch` BIGINT NOT NULL DEFAULT 0 ",
                    " ), ",
                    " ADD CONSTRAINT UniqueExecutionTypeName ",
                    " UNIQUE(`type_id`, `name`); "
                )),
                statement(concat!(
                    " ALTER TABLE `Context` ADD ( ",
                    "   `create_time_since_epoch` BIGINT NOT NULL DEFAULT 0, ",
                    "   `last_update_time_since_epoch` BIGINT NOT NULL DEFAULT 0 ",
                    " ) "
                )),
            ],
            downgrade_queries: vec![
                statement(" DROP TABLE `ParentType`; "),
                statement(" DROP TABLE `ParentContext`; "),
                statement(concat!(
                    " ALTER TABLE `Type` ",
                    " DROP COLUMN `version`, ",
                    " DROP COLUMN `description`; "
                )),
                statement(concat!(
                    " ALTER TABLE `Artifact` ",
                    " DROP INDEX `idx_artifact_uri`, ",
                    " DROP INDEX `idx_artifact_create_time_since_epoch`, ",
                    " DROP INDEX `idx_artifact_last_update_time_since_epoch`; "
                )),
                statement(concat!(
                    " ALTER TABLE `Event` ",
                    " DROP INDEX `idx_event_artifact_id`, ",
                    " DROP INDEX `idx_event_execution_id`; "
                )),
                statement(concat!(
                    " ALTER TABLE `Type` ",
                    " DROP INDEX `idx_type_name`; "
                )),
                statement(concat!(
                    " ALTER TABLE `Execution` ",
                    " DROP INDEX `idx_execution_create_time_since_epoch`, ",
                    " DROP INDEX `idx_execution_last_update_time_since_epoch`; "
                )),
                statement(concat!(
                    " ALTER TABLE `Context` ",
                    " DROP INDEX `idx_context_create_time_since_epoch`, ",
                    " DROP INDEX `idx_context_last_update_time_since_epoch`; "
                )),
            ],
        },
    );

    let mut v6_upgrade = vec![
        statement(concat!(
            " CREATE TABLE IF NOT EXISTS `ParentType` ( ",
            "   `type_id` INT NOT NULL, ",
            "   `parent_type_id` INT NOT NULL, ",
            " PRIMARY KEY (`type_id`, `parent_type_id`)); "
        )),
        statement(concat!(
            " CREATE TABLE IF NOT EXISTS `ParentContext` ( ",
            "   `context_id` INT NOT NULL, ",
            "   `parent_context_id` INT NOT NULL, ",
            " PRIMARY KEY (`context_id`, `parent_context_id`)); "
        )),
        statement(concat!(
            " ALTER TABLE `Type` ADD ( ",
            "   `version` VARCHAR(255), ",
            "   `description` TEXT ",
            " ); "
        )),
    ];
    v6_upgrade.extend(mysql_secondary_indices());
    schemes.insert(
        6,
        MigrationScheme {
            upgrade_queries: v6_upgrade,
            downgrade_queries: Vec::new(),
        },
    );

    schemes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_dialects_declare_the_same_arities() {
        let sqlite = QueryConfig::sqlite();
        let mysql = QueryConfig::mysql();
        assert_eq!(sqlite.schema_version, SCHEMA_VERSION);
        assert_eq!(mysql.schema_version, SCHEMA_VERSION);
        assert_eq!(
            sqlite.insert_artifact_type.parameter_num,
            mysql.insert_artifact_type.parameter_num
        );
        assert_eq!(sqlite.insert_execution_type.parameter_num, 5);
        assert_eq!(sqlite.insert_artifact.parameter_num, 6);
        assert_eq!(sqlite.insert_event_path.parameter_num, 4);
    }

    #[test]
    fn migration_schemes_cover_every_version() {
        for config in [QueryConfig::sqlite(), QueryConfig::mysql()] {
            for version in 0..=SCHEMA_VERSION {
                assert!(
                    config.migration_schemes.contains_key(&version),
                    "missing migration scheme for version {}",
                    version
                );
            }
            // Every version above 0 must know how to get there.
            for version in 1..=SCHEMA_VERSION {
                assert!(!config.migration_schemes[&version].upgrade_queries.is_empty());
            }
        }
    }

    #[test]
    fn placeholders_stay_within_the_template_limit() {
        let config = QueryConfig::sqlite();
        for template in [
            config.insert_artifact,
            config.insert_execution,
            config.insert_context,
            config.insert_artifact_property,
            config.insert_event,
            config.insert_event_path,
        ] {
            assert!(template.parameter_num <= MAX_TEMPLATE_PARAMETERS);
            for index in 0..template.parameter_num {
                assert!(
                    template.query.contains(&format!("${}", index)),
                    "template {:?} is missing placeholder ${}",
                    template.query,
                    index
                );
            }
        }
    }
}
