//! Schema versioning.
//!
//! Migrations are forward-only and registered in code. On open, every
//! registered migration with `stored < version <= target` runs in order,
//! then the manifest records the new schema version.

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;

/// Version number for schemas and migrations.
pub type SchemaVersion = u32;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = 2;

/// Information about a registered migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    /// Version the migration upgrades to.
    pub version: SchemaVersion,
    /// Human-readable name.
    pub name: String,
}

/// Context passed to [`Migration::up`].
#[derive(Debug)]
pub struct MigrationContext {
    /// Schema version before this migration.
    pub from_version: SchemaVersion,
    /// Notes recorded by the migration, logged after it runs.
    pub notes: Vec<String>,
}

impl MigrationContext {
    /// Creates a context starting at `from_version`.
    #[must_use]
    pub fn new(from_version: SchemaVersion) -> Self {
        Self {
            from_version,
            notes: Vec::new(),
        }
    }

    /// Records a note about what the migration did.
    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// A forward-only schema migration.
pub trait Migration: Send + Sync {
    /// Version this migration upgrades to.
    fn version(&self) -> SchemaVersion;

    /// Name for logs.
    fn name(&self) -> &str;

    /// Runs the migration.
    fn up(&self, ctx: &mut MigrationContext) -> CoreResult<()>;
}

/// Version 2 introduced the optional property link on records.
///
/// Version 1 rows decode with `property_id: None`, so nothing is rewritten.
#[derive(Debug, Default)]
pub struct PropertyLinkMigration;

impl Migration for PropertyLinkMigration {
    fn version(&self) -> SchemaVersion {
        2
    }

    fn name(&self) -> &str {
        "record_property_link"
    }

    fn up(&self, ctx: &mut MigrationContext) -> CoreResult<()> {
        ctx.note("records without a property stay unlinked");
        Ok(())
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRun {
    /// Migrations applied, in order.
    pub applied: Vec<MigrationInfo>,
    /// Schema version after the run.
    pub final_version: SchemaVersion,
}

/// Registered migrations keyed by version.
pub struct MigrationManager {
    migrations: BTreeMap<SchemaVersion, Box<dyn Migration>>,
}

impl MigrationManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            migrations: BTreeMap::new(),
        }
    }

    /// A manager with every built-in migration registered.
    #[must_use]
    pub fn builtin() -> Self {
        let mut migrations: BTreeMap<SchemaVersion, Box<dyn Migration>> = BTreeMap::new();
        migrations.insert(2, Box::new(PropertyLinkMigration));
        Self { migrations }
    }

    /// Registers a migration; versions must be unique.
    pub fn register(&mut self, migration: Box<dyn Migration>) -> CoreResult<()> {
        let version = migration.version();
        if self.migrations.contains_key(&version) {
            return Err(CoreError::migration_failed(format!(
                "migration version {version} already registered"
            )));
        }
        self.migrations.insert(version, migration);
        Ok(())
    }

    /// Registered migrations in version order.
    #[must_use]
    pub fn list(&self) -> Vec<MigrationInfo> {
        self.migrations
            .values()
            .map(|m| MigrationInfo {
                version: m.version(),
                name: m.name().to_string(),
            })
            .collect()
    }

    /// Migrations that would run to go from `stored` to `target`.
    #[must_use]
    pub fn pending(&self, stored: SchemaVersion, target: SchemaVersion) -> Vec<MigrationInfo> {
        self.list()
            .into_iter()
            .filter(|m| m.version > stored && m.version <= target)
            .collect()
    }

    /// Runs pending migrations, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if `stored` is newer than `target`
    /// - `MigrationFailed` if a migration fails
    pub fn run(&self, stored: SchemaVersion, target: SchemaVersion) -> CoreResult<MigrationRun> {
        if stored > target {
            return Err(CoreError::invalid_format(format!(
                "store schema version {stored} is newer than supported version {target}"
            )));
        }

        let mut current = stored;
        let mut applied = Vec::new();
        for migration in self.migrations.range(stored + 1..=target).map(|(_, m)| m) {
            let mut ctx = MigrationContext::new(current);
            migration.up(&mut ctx).map_err(|e| {
                CoreError::migration_failed(format!(
                    "{} (v{}): {e}",
                    migration.name(),
                    migration.version()
                ))
            })?;
            for note in &ctx.notes {
                tracing::info!(version = migration.version(), name = migration.name(), "{note}");
            }
            current = migration.version();
            applied.push(MigrationInfo {
                version: current,
                name: migration.name().to_string(),
            });
        }

        Ok(MigrationRun {
            applied,
            final_version: target,
        })
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for MigrationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationManager")
            .field("versions", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Migration for Failing {
        fn version(&self) -> SchemaVersion {
            3
        }
        fn name(&self) -> &str {
            "failing"
        }
        fn up(&self, _ctx: &mut MigrationContext) -> CoreResult<()> {
            Err(CoreError::invalid_data("boom"))
        }
    }

    #[test]
    fn v1_upgrades_to_current() {
        let run = MigrationManager::builtin().run(1, CURRENT_SCHEMA_VERSION).unwrap();
        assert_eq!(run.final_version, 2);
        assert_eq!(run.applied.len(), 1);
        assert_eq!(run.applied[0].name, "record_property_link");
    }

    #[test]
    fn current_is_noop() {
        let run = MigrationManager::builtin()
            .run(CURRENT_SCHEMA_VERSION, CURRENT_SCHEMA_VERSION)
            .unwrap();
        assert!(run.applied.is_empty());
    }

    #[test]
    fn newer_store_is_rejected() {
        let err = MigrationManager::builtin().run(7, CURRENT_SCHEMA_VERSION).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut manager = MigrationManager::builtin();
        assert!(manager.register(Box::new(PropertyLinkMigration)).is_err());
    }

    #[test]
    fn failure_is_reported() {
        let mut manager = MigrationManager::builtin();
        manager.register(Box::new(Failing)).unwrap();
        assert_eq!(manager.pending(1, 3).len(), 2);
        let err = manager.run(1, 3).unwrap_err();
        assert!(matches!(err, CoreError::MigrationFailed { .. }));
    }
}
