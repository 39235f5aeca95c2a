//! Domain model: typed nodes, their schemas, and the edges among them.
use crate::errors::MetadataError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::UNIX_EPOCH;

/// Identifier of an artifact, execution or context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(i64);

impl Id {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an artifact, execution or context type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(i64);

impl TypeId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("artifact state {value} is undefined")]
    UndefinedArtifactState { value: i64 },

    #[error("execution state {value} is undefined")]
    UndefinedExecutionState { value: i64 },

    #[error("event type {value} is undefined")]
    UndefinedEventType { value: i64 },

    #[error("property data type {value} is undefined")]
    UndefinedPropertyType { value: i64 },

    #[error("type kind {value} is undefined")]
    UndefinedTypeKind { value: i64 },
}

/// The three kinds of nodes. The discriminants are the values stored in the
/// `Type.type_kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Execution = 0,
    Artifact = 1,
    Context = 2,
}

impl TypeKind {
    pub fn from_i64(v: i64) -> Result<Self, ConvertError> {
        match v {
            0 => Ok(Self::Execution),
            1 => Ok(Self::Artifact),
            2 => Ok(Self::Context),
            _ => Err(ConvertError::UndefinedTypeKind { value: v }),
        }
    }

    /// Name of the table holding nodes of this kind.
    pub fn node_table_name(self) -> &'static str {
        match self {
            Self::Execution => "Execution",
            Self::Artifact => "Artifact",
            Self::Context => "Context",
        }
    }

    /// Name of the table holding property rows of this kind.
    pub fn property_table_name(self) -> &'static str {
        match self {
            Self::Execution => "ExecutionProperty",
            Self::Artifact => "ArtifactProperty",
            Self::Context => "ContextProperty",
        }
    }

    /// Name of the property table's foreign-key column.
    pub fn node_id_column(self) -> &'static str {
        match self {
            Self::Execution => "execution_id",
            Self::Artifact => "artifact_id",
            Self::Context => "context_id",
        }
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execution => write!(f, "execution"),
            Self::Artifact => write!(f, "artifact"),
            Self::Context => write!(f, "context"),
        }
    }
}

/// Data type a declared property may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Unknown = 0,
    Int = 1,
    Double = 2,
    String = 3,
    Struct = 4,
}

impl PropertyType {
    pub fn from_i64(v: i64) -> Result<Self, ConvertError> {
        match v {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Int),
            2 => Ok(Self::Double),
            3 => Ok(Self::String),
            4 => Ok(Self::Struct),
            _ => Err(ConvertError::UndefinedPropertyType { value: v }),
        }
    }
}

/// A property value attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    String(String),
    Struct(serde_json::Value),
}

impl PropertyValue {
    pub fn as_int(&self) -> Option<i64> {
        if let Self::Int(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        if let Self::Double(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        if let Self::String(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_struct(&self) -> Option<&serde_json::Value> {
        if let Self::Struct(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// The declared type this value satisfies.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Int(_) => PropertyType::Int,
            Self::Double(_) => PropertyType::Double,
            Self::String(_) => PropertyType::String,
            Self::Struct(_) => PropertyType::Struct,
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<'a> From<&'a str> for PropertyValue {
    fn from(v: &'a str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Struct(v)
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;
pub type PropertySchema = BTreeMap<String, PropertyType>;

/// Schema of the artifacts an execution type consumes or produces. Stored as
/// JSON in the `Type.input_type` / `Type.output_type` columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArtifactStructType {
    Simple(String),
    Union(Vec<Self>),
    Intersection(Vec<Self>),
    List(Box<Self>),
    None,
    Any,
    Tuple(Vec<Self>),
    Dict(BTreeMap<String, Self>),
}

/// A named, versioned schema for artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactType {
    pub id: TypeId,
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub properties: PropertySchema,
}

/// A named, versioned schema for executions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionType {
    pub id: TypeId,
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub properties: PropertySchema,
    pub input_type: Option<ArtifactStructType>,
    pub output_type: Option<ArtifactStructType>,
}

/// A named, versioned schema for contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextType {
    pub id: TypeId,
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub properties: PropertySchema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactState {
    Unknown = 0,
    Pending = 1,
    Live = 2,
    MarkedForDeletion = 3,
    Deleted = 4,
}

impl ArtifactState {
    pub fn from_i64(v: i64) -> Result<Self, ConvertError> {
        match v {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Pending),
            2 => Ok(Self::Live),
            3 => Ok(Self::MarkedForDeletion),
            4 => Ok(Self::Deleted),
            _ => Err(ConvertError::UndefinedArtifactState { value: v }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    Unknown = 0,
    New = 1,
    Running = 2,
    Complete = 3,
    Failed = 4,
    Cached = 5,
    Canceled = 6,
}

impl ExecutionState {
    pub fn from_i64(v: i64) -> Result<Self, ConvertError> {
        match v {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::New),
            2 => Ok(Self::Running),
            3 => Ok(Self::Complete),
            4 => Ok(Self::Failed),
            5 => Ok(Self::Cached),
            6 => Ok(Self::Canceled),
            _ => Err(ConvertError::UndefinedExecutionState { value: v }),
        }
    }
}

/// A produced or consumed piece of data.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub id: Id,
    pub type_id: TypeId,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub state: Option<ArtifactState>,
    pub properties: PropertyMap,
    pub custom_properties: PropertyMap,
    pub create_time_since_epoch: i64,
    pub last_update_time_since_epoch: i64,
}

impl Artifact {
    /// An artifact yet to be stored. `id` is ignored by the store on create.
    pub fn new(type_id: TypeId) -> Self {
        Self {
            id: Id::new(0),
            type_id,
            name: None,
            uri: None,
            state: None,
            properties: PropertyMap::new(),
            custom_properties: PropertyMap::new(),
            create_time_since_epoch: 0,
            last_update_time_since_epoch: 0,
        }
    }
}

/// A run of a pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub id: Id,
    pub type_id: TypeId,
    pub name: Option<String>,
    pub last_known_state: Option<ExecutionState>,
    pub properties: PropertyMap,
    pub custom_properties: PropertyMap,
    pub create_time_since_epoch: i64,
    pub last_update_time_since_epoch: i64,
}

impl Execution {
    pub fn new(type_id: TypeId) -> Self {
        Self {
            id: Id::new(0),
            type_id,
            name: None,
            last_known_state: None,
            properties: PropertyMap::new(),
            custom_properties: PropertyMap::new(),
            create_time_since_epoch: 0,
            last_update_time_since_epoch: 0,
        }
    }
}

/// A grouping of artifacts and executions, e.g., an experiment or a pipeline
/// run. Unlike the other two node kinds, a context must be named.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub id: Id,
    pub type_id: TypeId,
    pub name: String,
    pub properties: PropertyMap,
    pub custom_properties: PropertyMap,
    pub create_time_since_epoch: i64,
    pub last_update_time_since_epoch: i64,
}

impl Context {
    pub fn new(type_id: TypeId, name: &str) -> Self {
        Self {
            id: Id::new(0),
            type_id,
            name: name.to_owned(),
            properties: PropertyMap::new(),
            custom_properties: PropertyMap::new(),
            create_time_since_epoch: 0,
            last_update_time_since_epoch: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Unknown = 0,
    DeclaredOutput = 1,
    DeclaredInput = 2,
    Input = 3,
    Output = 4,
    InternalInput = 5,
    InternalOutput = 6,
}

impl EventType {
    pub fn from_i64(v: i64) -> Result<Self, ConvertError> {
        match v {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::DeclaredOutput),
            2 => Ok(Self::DeclaredInput),
            3 => Ok(Self::Input),
            4 => Ok(Self::Output),
            5 => Ok(Self::InternalInput),
            6 => Ok(Self::InternalOutput),
            _ => Err(ConvertError::UndefinedEventType { value: v }),
        }
    }
}

/// One step of the path into an artifact's internal structure.
#[derive(Debug, Clone, PartialEq)]
pub enum EventStep {
    Index(i64),
    Key(String),
}

/// A typed edge from an execution to an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub artifact_id: Id,
    pub execution_id: Id,
    pub event_type: EventType,
    pub path: Vec<EventStep>,
    pub milliseconds_since_epoch: Option<i64>,
}

impl Event {
    pub fn new(event_type: EventType, artifact_id: Id, execution_id: Id) -> Self {
        Self {
            artifact_id,
            execution_id,
            event_type,
            path: Vec::new(),
            milliseconds_since_epoch: None,
        }
    }
}

/// Edge linking a context to an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    pub context_id: Id,
    pub artifact_id: Id,
}

/// Edge linking a context to an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub context_id: Id,
    pub execution_id: Id,
}

/// Directed edge from a child context to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentContext {
    pub child_id: Id,
    pub parent_id: Id,
}

/// Wall-clock milliseconds since the epoch, used for all write timestamps.
pub(crate) fn current_millis() -> i64 {
    UNIX_EPOCH.elapsed().unwrap_or_default().as_millis() as i64
}

// STRUCT property values share the `string_value` column with plain
// strings; the prefix tells them apart on the way back out.
const STRUCT_VALUE_PREFIX: &str = "mlmd-struct::";

pub(crate) fn encode_struct_value(value: &serde_json::Value) -> Result<String, MetadataError> {
    let json = serde_json::to_string(value)
        .map_err(|e| MetadataError::internal(format!("cannot serialize struct value: {}", e)))?;
    Ok(format!("{}{}", STRUCT_VALUE_PREFIX, json))
}

pub(crate) fn is_struct_serialized_string(value: &str) -> bool {
    value.starts_with(STRUCT_VALUE_PREFIX)
}

pub(crate) fn decode_struct_value(value: &str) -> Result<serde_json::Value, MetadataError> {
    let json = &value[STRUCT_VALUE_PREFIX.len()..];
    serde_json::from_str(json)
        .map_err(|e| MetadataError::internal(format!("cannot parse struct value: {}", e)))
}
