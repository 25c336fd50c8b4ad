//! Lookup from qualified table name to binding.
//!
//! Populated while the session is set up; the dispatcher only reads it.

use std::collections::HashMap;

use crate::binding::TableBinding;
use crate::error::CdcError;

#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: HashMap<String, TableBinding>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding under its qualified `schema.table` name.
    pub fn register(&mut self, binding: TableBinding) -> Result<(), CdcError> {
        let name = binding.name().to_string();
        if !name.contains('.') {
            return Err(CdcError::InvalidOptions(format!(
                "table '{name}' must be registered as 'schema.table'"
            )));
        }
        if self.tables.contains_key(&name) {
            return Err(CdcError::DuplicateTable(name));
        }
        self.tables.insert(name, binding);
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, schema: &str, table: &str) -> Option<&TableBinding> {
        self.tables.get(&format!("{schema}.{table}"))
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.tables.contains_key(qualified_name)
    }

    /// Registered qualified names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> TableBinding {
        TableBinding::new(name, |_, _, _| {})
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = TableRegistry::new();
        registry.register(noop("shop.orders")).unwrap();
        registry.register(noop("shop.customers")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve("shop", "orders").map(TableBinding::name),
            Some("shop.orders")
        );
        assert!(registry.resolve("shop", "Orders").is_none());
        assert!(registry.resolve("Shop", "orders").is_none());
        assert!(registry.resolve("shop", "invoices").is_none());
        assert_eq!(registry.names(), vec!["shop.customers", "shop.orders"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = TableRegistry::new();
        registry.register(noop("shop.orders")).unwrap();
        assert!(matches!(
            registry.register(noop("shop.orders")),
            Err(CdcError::DuplicateTable(name)) if name == "shop.orders"
        ));
    }

    #[test]
    fn test_unqualified_registration_rejected() {
        let mut registry = TableRegistry::new();
        assert!(matches!(
            registry.register(noop("orders")),
            Err(CdcError::InvalidOptions(_))
        ));
        assert!(registry.is_empty());
    }
}
