//! Change-log serializers, looked up by file extension.

use std::collections::HashMap;
use std::sync::Arc;

use crate::change::InsertDataChange;
use crate::{Error, Result};

pub const PRIORITY_DEFAULT: i32 = 1;
pub const PRIORITY_DATABASE: i32 = 5;

/// Writes changes in one change-log file format.
pub trait ChangeLogSerializer: Send + Sync {
    /// Extensions (without the leading dot) this serializer handles.
    fn valid_file_extensions(&self) -> &[&str];

    /// Higher priorities win when several serializers handle the same extension.
    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }

    fn serialize(&self, change: &InsertDataChange) -> Result<String>;
}

/// Serializes changes as pretty-printed JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonChangeLogSerializer;

impl ChangeLogSerializer for JsonChangeLogSerializer {
    fn valid_file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn serialize(&self, change: &InsertDataChange) -> Result<String> {
        Ok(serde_json::to_string_pretty(change)?)
    }
}

/// Serializers registered per extension, each list ordered by descending priority.
#[derive(Default, Clone)]
pub struct SerializerRegistry {
    serializers: HashMap<String, Vec<Arc<dyn ChangeLogSerializer>>>,
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&String> = self.serializers.keys().collect();
        extensions.sort();
        f.debug_struct("SerializerRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in serializers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonChangeLogSerializer));
        registry
    }

    pub fn register(&mut self, serializer: Arc<dyn ChangeLogSerializer>) {
        for extension in serializer.valid_file_extensions() {
            let list = self.serializers.entry(extension.to_string()).or_default();
            list.push(serializer.clone());
            // stable: equal priorities keep registration order
            list.sort_by_key(|s| std::cmp::Reverse(s.priority()));
        }
    }

    /// Remove `serializer` from every extension, dropping extensions left empty.
    pub fn unregister(&mut self, serializer: &Arc<dyn ChangeLogSerializer>) {
        self.serializers.retain(|_, list| {
            list.retain(|s| !Arc::ptr_eq(s, serializer));
            !list.is_empty()
        });
    }

    /// Serializers for a file name or bare extension, highest priority first.
    pub fn serializers_for(
        &self,
        file_name_or_extension: &str,
    ) -> &[Arc<dyn ChangeLogSerializer>] {
        let extension = file_name_or_extension
            .rsplit_once('.')
            .map_or(file_name_or_extension, |(_, ext)| ext);
        self.serializers
            .get(extension)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn serializer_for(
        &self,
        file_name_or_extension: &str,
    ) -> Result<Arc<dyn ChangeLogSerializer>> {
        self.serializers_for(file_name_or_extension)
            .first()
            .cloned()
            .ok_or_else(|| Error::NoSerializer(file_name_or_extension.to_string()))
    }
}
