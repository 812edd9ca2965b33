//! CLI command implementations.

pub mod checkpoint;
pub mod inspect;
pub mod properties;
pub mod records;
pub mod verify;

use std::path::Path;
use tenancy_core::{Config, CoreResult, Store};

/// Opens an existing store; never creates one.
pub fn open_existing(path: &Path) -> CoreResult<Store> {
    Store::open_with_config(path, Config::default().create_if_missing(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_existing_never_creates() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("absent");
        assert!(open_existing(&missing).is_err());
        assert!(!missing.exists());
    }

    #[test]
    fn open_existing_reads_store() {
        let tmp = tempdir().unwrap();
        {
            let store = Store::open(tmp.path()).unwrap();
            store.create_property("Sunrise Apt", "1 Main St").unwrap();
        }
        let store = open_existing(tmp.path()).unwrap();
        assert_eq!(store.stats().properties, 1);
    }
}
