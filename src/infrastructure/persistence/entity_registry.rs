use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Entity name of the physical file registry table
pub const PHYSICAL_FILE: &str = "physical_file";
/// Entity name of the logical attachment table
pub const LOGICAL_ATTACHMENT: &str = "logical_attachment";

/// Table and column layout of one persisted entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

impl EntityDescriptor {
    /// Comma-separated column list for SELECT and RETURNING clauses
    pub fn select_list(&self) -> String {
        self.columns.join(", ")
    }

    pub fn select_from(&self) -> String {
        format!("SELECT {} FROM {}", self.select_list(), self.table)
    }
}

static GLOBAL: Lazy<EntityRegistry> = Lazy::new(EntityRegistry::new);

/// Process-wide map from entity name to its descriptor
///
/// Initialisation of each entry runs at most once, even under concurrent first use.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: DashMap<&'static str, Arc<EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static EntityRegistry {
        &GLOBAL
    }

    /// Return the descriptor registered under `name`, running `init` only if none is
    pub fn get_or_register<F>(&self, name: &'static str, init: F) -> Arc<EntityDescriptor>
    where
        F: FnOnce() -> EntityDescriptor,
    {
        if let Some(existing) = self.entries.get(name) {
            return Arc::clone(existing.value());
        }
        let entry = self.entries.entry(name).or_insert_with(|| Arc::new(init()));
        Arc::clone(entry.value())
    }

    pub fn get(&self, name: &str) -> Option<Arc<EntityDescriptor>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn physical_file_descriptor() -> Arc<EntityDescriptor> {
    EntityRegistry::global().get_or_register(PHYSICAL_FILE, || EntityDescriptor {
        name: PHYSICAL_FILE,
        table: "physical_files",
        columns: &[
            "id",
            "storage_provider",
            "object_key",
            "public_url",
            "content_type",
            "file_size",
            "checksum",
            "ref_count",
            "created_at",
            "updated_at",
        ],
    })
}

pub fn logical_attachment_descriptor() -> Arc<EntityDescriptor> {
    EntityRegistry::global().get_or_register(LOGICAL_ATTACHMENT, || EntityDescriptor {
        name: LOGICAL_ATTACHMENT,
        table: "logical_attachments",
        columns: &[
            "id",
            "file_id",
            "asset_type",
            "title",
            "description",
            "tags",
            "visibility",
            "deleted_at",
            "created_at",
            "updated_at",
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor {
            name: "widget",
            table: "widgets",
            columns: &["id", "name"],
        }
    }

    #[test]
    fn test_get_or_register_runs_init_once() {
        let registry = EntityRegistry::new();
        let calls = AtomicUsize::new(0);

        let first = registry.get_or_register("widget", || {
            calls.fetch_add(1, Ordering::SeqCst);
            descriptor()
        });
        let second = registry.get_or_register("widget", || {
            calls.fetch_add(1, Ordering::SeqCst);
            descriptor()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_registration_shares_one_instance() {
        let registry = Arc::new(EntityRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    registry.get_or_register("widget", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        descriptor()
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_builtin_descriptors() {
        let files = physical_file_descriptor();
        assert_eq!(files.table, "physical_files");
        assert!(Arc::ptr_eq(&files, &physical_file_descriptor()));
        assert!(EntityRegistry::global().get(PHYSICAL_FILE).is_some());

        let attachments = logical_attachment_descriptor();
        assert_eq!(
            attachments.select_from(),
            "SELECT id, file_id, asset_type, title, description, tags, visibility, \
             deleted_at, created_at, updated_at FROM logical_attachments"
        );
    }
}
