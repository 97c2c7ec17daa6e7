// column_resolver.rs
use log::debug;
use std::collections::HashMap;

use crate::error::{ConvertError, ConvertResult};
use crate::models::{Field, FieldMapping};
use crate::table_merge::Table;

/// Resolves logical fields to columns of a merged table.
///
/// A mapped column wins when it exists; otherwise the field's default header
/// is matched case-insensitively. Unresolved optional fields read as a column
/// of empty strings so callers never branch on absence.
pub struct ColumnResolver<'a> {
    table: &'a Table,
    mapping: &'a FieldMapping,
    lowered: HashMap<String, usize>,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(table: &'a Table, mapping: &'a FieldMapping) -> Self {
        // later duplicates overwrite earlier ones
        let lowered = table
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_lowercase(), idx))
            .collect();
        ColumnResolver {
            table,
            mapping,
            lowered,
        }
    }

    pub fn mapping(&self) -> &'a FieldMapping {
        self.mapping
    }

    /// Column index for a logical field, if any.
    pub fn resolve(&self, field: Field) -> Option<usize> {
        if let Some(mapped) = self.mapping.column_for(field) {
            if let Some(idx) = self.table.column_index(mapped) {
                debug!("Field '{}' mapped to column '{}'", field.logical_name(), mapped);
                return Some(idx);
            }
            debug!(
                "Mapped column '{}' for field '{}' is not present, falling back",
                mapped,
                field.logical_name()
            );
        }
        self.resolve_name(field.logical_name())
    }

    /// Case-insensitive exact match on a raw column name.
    pub fn resolve_name(&self, name: &str) -> Option<usize> {
        self.lowered.get(&name.to_lowercase()).copied()
    }

    /// Values of a logical field, one per row.
    pub fn column(&self, field: Field, required: bool) -> ConvertResult<Vec<String>> {
        match self.resolve(field) {
            Some(idx) => Ok(self.table.column_values(idx)),
            None => self.absent(field.logical_name(), required),
        }
    }

    /// Values of a raw column name, one per row.
    pub fn column_by_name(&self, name: &str, required: bool) -> ConvertResult<Vec<String>> {
        match self.resolve_name(name) {
            Some(idx) => Ok(self.table.column_values(idx)),
            None => self.absent(name, required),
        }
    }

    fn absent(&self, name: &str, required: bool) -> ConvertResult<Vec<String>> {
        if required {
            return Err(ConvertError::MissingRequiredField {
                field: name.to_string(),
                available: self.table.columns.clone(),
            });
        }
        Ok(vec![String::new(); self.table.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table {
            columns: vec![
                "ORGNAME".to_string(),
                "Organization".to_string(),
                "eventid".to_string(),
            ],
            rows: vec![
                vec!["Acme".into(), "Acme Inc".into(), "E1".into()],
                vec!["Beta".into(), "Beta Org".into(), "E2".into()],
            ],
        }
    }

    #[test]
    fn falls_back_to_case_insensitive_match() {
        let table = table();
        let mapping = FieldMapping::default();
        let resolver = ColumnResolver::new(&table, &mapping);
        assert_eq!(resolver.column(Field::OrgName, true).unwrap(), vec!["Acme", "Beta"]);
        assert_eq!(resolver.column(Field::EventId, true).unwrap(), vec!["E1", "E2"]);
    }

    #[test]
    fn mapping_takes_precedence_when_column_exists() {
        let table = table();
        let mapping = FieldMapping {
            org_name: Some("Organization".to_string()),
            ..Default::default()
        };
        let resolver = ColumnResolver::new(&table, &mapping);
        assert_eq!(
            resolver.column(Field::OrgName, true).unwrap(),
            vec!["Acme Inc", "Beta Org"]
        );
    }

    #[test]
    fn stale_mapping_falls_back_to_default_header() {
        let table = table();
        let mapping = FieldMapping {
            org_name: Some("Company".to_string()),
            ..Default::default()
        };
        let resolver = ColumnResolver::new(&table, &mapping);
        assert_eq!(resolver.column(Field::OrgName, true).unwrap(), vec!["Acme", "Beta"]);
    }

    #[test]
    fn optional_missing_field_yields_empty_column() {
        let table = table();
        let mapping = FieldMapping::default();
        let resolver = ColumnResolver::new(&table, &mapping);
        assert_eq!(resolver.column(Field::Sector, false).unwrap(), vec!["", ""]);
    }

    #[test]
    fn required_missing_field_lists_available_columns() {
        let table = table();
        let mapping = FieldMapping::default();
        let resolver = ColumnResolver::new(&table, &mapping);
        match resolver.column(Field::EventDate, true) {
            Err(ConvertError::MissingRequiredField { field, available }) => {
                assert_eq!(field, "eventDate");
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
