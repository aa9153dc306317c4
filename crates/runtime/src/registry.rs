use std::sync::Arc;

use indexmap::IndexMap;

use crate::capability::{Capability, CapabilityDescriptor, Category};
use crate::template::{TemplateError, UriTemplate};

/// A registered capability: its descriptor, snapshotted at registration, plus its handler.
#[derive(Clone)]
pub struct CapabilityEntry {
    descriptor: CapabilityDescriptor,
    template: Option<UriTemplate>,
    handler: Arc<dyn Capability>,
}

impl CapabilityEntry {
    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn category(&self) -> Category {
        self.descriptor.category
    }

    /// Parsed URI template (resources only).
    pub fn template(&self) -> Option<&UriTemplate> {
        self.template.as_ref()
    }

    pub fn handler(&self) -> &Arc<dyn Capability> {
        &self.handler
    }
}

impl std::fmt::Debug for CapabilityEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Holds every tool, resource and prompt, one namespace per category.
///
/// Built once at startup; the dispatcher only ever reads it.
pub struct CapabilityRegistry {
    tools: IndexMap<String, CapabilityEntry>,
    resources: IndexMap<String, CapabilityEntry>,
    prompts: IndexMap<String, CapabilityEntry>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
            resources: IndexMap::new(),
            prompts: IndexMap::new(),
        }
    }

    fn entries(&self, category: Category) -> &IndexMap<String, CapabilityEntry> {
        match category {
            Category::Tool => &self.tools,
            Category::Resource => &self.resources,
            Category::Prompt => &self.prompts,
        }
    }

    fn entries_mut(&mut self, category: Category) -> &mut IndexMap<String, CapabilityEntry> {
        match category {
            Category::Tool => &mut self.tools,
            Category::Resource => &mut self.resources,
            Category::Prompt => &mut self.prompts,
        }
    }

    /// Register a capability under the category and name its descriptor declares.
    pub fn register(&mut self, capability: impl Capability + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(capability))
    }

    pub fn register_arc(&mut self, handler: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let descriptor = handler.descriptor();
        let category = descriptor.category;

        if self.entries(category).contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateName {
                category,
                name: descriptor.name,
            });
        }

        let template = match (category, &descriptor.uri_template) {
            (Category::Resource, Some(raw)) => Some(Self::checked_template(&descriptor, raw)?),
            (Category::Resource, None) => {
                return Err(RegistryError::MissingTemplate(descriptor.name));
            }
            _ => None,
        };

        tracing::debug!(%category, name = %descriptor.name, "Registered capability");
        self.entries_mut(category).insert(
            descriptor.name.clone(),
            CapabilityEntry {
                descriptor,
                template,
                handler,
            },
        );
        Ok(())
    }

    /// Every template variable must be a declared parameter.
    fn checked_template(
        descriptor: &CapabilityDescriptor,
        raw: &str,
    ) -> Result<UriTemplate, RegistryError> {
        let template = UriTemplate::parse(raw).map_err(|source| RegistryError::InvalidTemplate {
            name: descriptor.name.clone(),
            source,
        })?;
        if let Some(unknown) = template
            .variables()
            .find(|var| !descriptor.params.iter().any(|p| p.name == *var))
        {
            return Err(RegistryError::UndeclaredVariable {
                name: descriptor.name.clone(),
                variable: unknown.to_string(),
            });
        }
        Ok(template)
    }

    /// Look up an entry by category and name.
    pub fn lookup(&self, category: Category, name: &str) -> Result<&CapabilityEntry, RegistryError> {
        self.entries(category)
            .get(name)
            .ok_or_else(|| RegistryError::NotFound {
                category,
                name: name.to_string(),
            })
    }

    /// Descriptors in registration order. Calling again restarts from the first entry.
    pub fn list(&self, category: Category) -> impl Iterator<Item = &CapabilityDescriptor> + '_ {
        self.entries(category).values().map(|e| &e.descriptor)
    }

    /// Resource entries, for URI matching.
    pub fn resources(&self) -> impl Iterator<Item = &CapabilityEntry> + '_ {
        self.resources.values()
    }

    pub fn count(&self, category: Category) -> usize {
        self.entries(category).len()
    }

    /// Total number of registered entries across all categories.
    pub fn len(&self) -> usize {
        self.tools.len() + self.resources.len() + self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{category} with name '{name}' is already registered")]
    DuplicateName { category: Category, name: String },
    #[error("{category} '{name}' not found")]
    NotFound { category: Category, name: String },
    #[error("resource '{0}' has no URI template")]
    MissingTemplate(String),
    #[error("resource '{name}': {source}")]
    InvalidTemplate {
        name: String,
        #[source]
        source: TemplateError,
    },
    #[error("resource '{name}': template variable '{variable}' is not a declared parameter")]
    UndeclaredVariable { name: String, variable: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ParamSpec, ParamType};
    use crate::testing::{EchoCapability, StaticCapability};

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CapabilityRegistry::new();
        registry.register(EchoCapability::tool("echo")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(Category::Tool, "echo").is_ok());
        assert!(matches!(
            registry.lookup(Category::Tool, "nonexistent"),
            Err(RegistryError::NotFound { .. })
        ));
        // Same name, other namespace
        assert!(registry.lookup(Category::Prompt, "echo").is_err());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = CapabilityRegistry::new();
        registry.register(EchoCapability::tool("echo")).unwrap();
        let err = registry.register(EchoCapability::tool("echo")).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateName { category: Category::Tool, ref name } if name == "echo"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_name_in_distinct_categories() {
        let mut registry = CapabilityRegistry::new();
        registry.register(EchoCapability::tool("echo")).unwrap();
        registry.register(EchoCapability::prompt("echo")).unwrap();
        assert_eq!(registry.count(Category::Tool), 1);
        assert_eq!(registry.count(Category::Prompt), 1);
    }

    #[test]
    fn test_list_is_ordered_and_restartable() {
        let mut registry = CapabilityRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(EchoCapability::tool(name)).unwrap();
        }

        let first: Vec<_> = registry.list(Category::Tool).map(|d| d.name.clone()).collect();
        let second: Vec<_> = registry.list(Category::Tool).map(|d| d.name.clone()).collect();
        assert_eq!(first, vec!["c", "a", "b"]);
        assert_eq!(first, second);
        assert_eq!(registry.list(Category::Resource).count(), 0);
    }

    #[test]
    fn test_resource_requires_valid_template() {
        let mut registry = CapabilityRegistry::new();

        let missing = StaticCapability::new(
            CapabilityDescriptor::tool("r", "no template"),
            "x",
        )
        .with_category(Category::Resource);
        assert!(matches!(
            registry.register(missing),
            Err(RegistryError::MissingTemplate(_))
        ));

        let undeclared = StaticCapability::new(
            CapabilityDescriptor::resource("r", "item://{id}", "undeclared var"),
            "x",
        );
        assert!(matches!(
            registry.register(undeclared),
            Err(RegistryError::UndeclaredVariable { .. })
        ));

        let ok = StaticCapability::new(
            CapabilityDescriptor::resource("r", "item://{id}", "ok")
                .param(ParamSpec::required("id", ParamType::Integer)),
            "x",
        );
        registry.register(ok).unwrap();
        let entry = registry.lookup(Category::Resource, "r").unwrap();
        assert_eq!(entry.template().unwrap().as_str(), "item://{id}");
    }
}
