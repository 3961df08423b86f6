//! The schema registry.

use std::collections::BTreeMap;

use orb_rs_core::{OrbError, OrbResult};

use super::column::Column;
use super::table::Schema;

/// Owns every schema the compiler can resolve by name.
///
/// References, pipes, reverse lookups, aggregators, and joiners all name
/// their target schema; the registry turns those names into descriptors.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a schema, replacing any previous schema with the same name.
    pub fn register(&mut self, schema: Schema) -> &mut Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, schema: Schema) -> Self {
        self.register(schema);
        self
    }

    /// Resolves a schema by name.
    pub fn get(&self, name: &str) -> OrbResult<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| OrbError::TableNotFound(name.to_string()))
    }

    /// Resolves the target of a reference column.
    pub fn reference_model(&self, column: &Column) -> OrbResult<&Schema> {
        match column.reference.as_deref() {
            Some(target) => self.get(target),
            None => Err(OrbError::QueryInvalid(format!(
                "column '{}' is not a reference",
                column.name
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_register_and_get() {
        let registry = SchemaRegistry::new()
            .with(Schema::new("Role").column(Column::id()))
            .with(Schema::new("User").column(Column::reference("role", "Role")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Role").unwrap().table_name(), "role");
        assert!(matches!(registry.get("Nope"), Err(OrbError::TableNotFound(_))));
    }

    #[test]
    fn test_reference_model() {
        let registry = SchemaRegistry::new()
            .with(Schema::new("Role").column(Column::id()))
            .with(Schema::new("User").column(Column::reference("role", "Role")));
        let user = registry.get("User").unwrap();
        let role_col = user.column_named("role").unwrap();
        assert_eq!(registry.reference_model(role_col).unwrap().name, "Role");

        let plain = Column::new("name", ColumnType::String);
        assert!(matches!(
            registry.reference_model(&plain),
            Err(OrbError::QueryInvalid(_))
        ));
    }
}
