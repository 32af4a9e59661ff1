//! Name-keyed tool registry
//!
//! Built once at startup and shared read-only afterwards. Insertion order is
//! preserved so the classifier prompt is identical across calls.

use std::sync::Arc;

use indexmap::IndexMap;

use super::{Tool, ToolDescriptor};
use crate::{Error, Result};

struct Entry {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
}

/// Registry mapping tool names to descriptors and capabilities
#[derive(Default)]
pub struct ToolRegistry {
    entries: IndexMap<String, Entry>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its descriptor's name
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTool`] if the name is already registered
    pub fn register(&mut self, descriptor: ToolDescriptor, tool: Arc<dyn Tool>) -> Result<()> {
        if self.entries.contains_key(&descriptor.name) {
            return Err(Error::DuplicateTool(descriptor.name));
        }

        tracing::debug!(tool = %descriptor.name, task = %descriptor.task_label, "registered tool");
        self.entries
            .insert(descriptor.name.clone(), Entry { descriptor, tool });
        Ok(())
    }

    /// Look up a tool by exact, case-sensitive name
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entries.get(name).map(|e| Arc::clone(&e.tool))
    }

    /// Look up a tool's descriptor by exact name
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.entries.get(name).map(|e| &e.descriptor)
    }

    /// Full catalog in registration order
    #[must_use]
    pub fn snapshot(&self) -> Vec<ToolDescriptor> {
        self.entries.values().map(|e| e.descriptor.clone()).collect()
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
