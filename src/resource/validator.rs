//! Startup consistency checks over the catalog: every referenced column and table must exist.

use super::catalog::Catalog;
use super::types::{Derivation, FieldSource, Presentation, ResourceDef, ResourceKind};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Tables that exist outside the catalog.
const BUILTIN_TABLES: &[&str] = &["users"];

pub fn validate(catalog: &Catalog) -> Result<(), ConfigError> {
    for kind in ResourceKind::ALL {
        if catalog.get(kind).is_none() {
            return Err(ConfigError::MissingResource(format!("{:?}", kind)));
        }
    }

    let mut segments = HashSet::new();
    let mut tables: HashSet<&str> = BUILTIN_TABLES.iter().copied().collect();
    for def in catalog.iter() {
        if !segments.insert(def.path_segment) {
            return Err(ConfigError::DuplicatePathSegment(def.path_segment.to_string()));
        }
        tables.insert(def.table);
    }

    for def in catalog.iter() {
        validate_resource(def, &tables, catalog)?;
    }
    Ok(())
}

fn validate_resource(
    def: &ResourceDef,
    tables: &HashSet<&str>,
    catalog: &Catalog,
) -> Result<(), ConfigError> {
    let unknown = |column: &str, context: &'static str| ConfigError::UnknownColumn {
        resource: def.path_segment,
        column: column.to_string(),
        context,
    };

    let mut names = HashSet::new();
    for f in &def.fields {
        if !names.insert(f.name) {
            return Err(ConfigError::InvalidResource {
                resource: def.path_segment,
                message: format!("duplicate field '{}'", f.name),
            });
        }
        if let FieldSource::Derived(Derivation::Slug { from } | Derivation::Hijri { from }) = f.source {
            if def.field(from).is_none() {
                return Err(unknown(from, "derivation"));
            }
        }
        if f.source == FieldSource::Upload && f.rule.file.is_none() {
            return Err(ConfigError::InvalidResource {
                resource: def.path_segment,
                message: format!("upload field '{}' has no file rule", f.name),
            });
        }
        if let Presentation::Relation(rel) = f.presentation {
            if !tables.contains(rel.table) {
                return Err(ConfigError::InvalidResource {
                    resource: def.path_segment,
                    message: format!("relation '{}' targets unknown table '{}'", rel.key, rel.table),
                });
            }
            if let Some(target) = catalog.iter().find(|r| r.table == rel.table) {
                for c in rel.columns {
                    if !target.has_column(c) {
                        return Err(unknown(c, "relation columns"));
                    }
                }
            }
        }
    }

    for c in def.list.search {
        if !def.has_column(c) {
            return Err(unknown(c, "search"));
        }
    }
    for filter in &def.list.filters {
        if !def.has_column(filter.column) {
            return Err(unknown(filter.column, "filters"));
        }
    }
    if let Some(c) = def.list.date_field {
        if !def.has_column(c) {
            return Err(unknown(c, "date field"));
        }
    }
    let (sort, _) = def.list.default_sort;
    if def.sort_column(sort).is_none() {
        return Err(unknown(sort, "default sort"));
    }
    for (_, column) in def.list.sort_aliases {
        if !def.has_column(column) {
            return Err(unknown(column, "sort aliases"));
        }
    }
    if let Some(guard) = def.delete_guard {
        let dependent = catalog
            .iter()
            .find(|r| r.table == guard.table)
            .ok_or_else(|| ConfigError::InvalidResource {
                resource: def.path_segment,
                message: format!("delete guard targets unknown table '{}'", guard.table),
            })?;
        if !dependent.has_column(guard.column) {
            return Err(unknown(guard.column, "delete guard"));
        }
    }
    Ok(())
}
