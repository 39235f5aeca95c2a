//! Option builders for store operations.

/// Controls how a `put_*_type` call reconciles the given type with a stored
/// one of the same name and version.
#[derive(Debug, Default, Clone, Copy)]
pub struct PutTypeOptions {
    /// Accept properties the stored type does not declare yet and add them.
    pub can_add_fields: bool,
    /// Accept a type that omits properties the stored type declares.
    pub can_omit_fields: bool,
}

impl PutTypeOptions {
    pub fn can_add_fields(mut self) -> Self {
        self.can_add_fields = true;
        self
    }

    pub fn can_omit_fields(mut self) -> Self {
        self.can_omit_fields = true;
        self
    }
}

/// Connect-time schema handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct MigrationOptions {
    /// Migrate an older database forward to the library version on connect.
    /// Off by default: version skew then fails instead of mutating the
    /// schema.
    pub enable_upgrade_migration: bool,
}

impl MigrationOptions {
    pub fn enable_upgrade_migration(mut self) -> Self {
        self.enable_upgrade_migration = true;
        self
    }
}
