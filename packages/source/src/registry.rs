//! Dataset registry: the built-in dataset definitions.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the binary
//! at compile time via [`include_str!`]. A definition can also be read from
//! disk with [`parse_definition_toml`] to point a loader at a differently
//! shaped export.

use decay_map_source_models::{DatasetDefinition, DatasetKind};

use crate::SourceError;

/// TOML definitions embedded at compile time.
const DATASET_TOMLS: &[(&str, &str)] = &[
    ("crime", include_str!("../datasets/crime.toml")),
    ("unfit", include_str!("../datasets/unfit.toml")),
    ("vacant", include_str!("../datasets/vacant.toml")),
    (
        "code_violations",
        include_str!("../datasets/code_violations.toml"),
    ),
];

/// Parses and validates a dataset definition.
///
/// # Errors
///
/// Returns [`SourceError::Schema`] if the TOML is malformed or the field
/// mapping is incomplete.
pub fn parse_definition_toml(toml_str: &str) -> Result<DatasetDefinition, SourceError> {
    let definition: DatasetDefinition =
        toml::de::from_str(toml_str).map_err(|e| SourceError::Schema {
            message: e.to_string(),
        })?;
    definition
        .validate()
        .map_err(|message| SourceError::Schema { message })?;
    Ok(definition)
}

/// Returns every built-in dataset definition.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_definitions() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            parse_definition_toml(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse dataset definition '{name}': {e}"))
        })
        .collect()
}

/// Returns the built-in definition for a dataset kind.
#[must_use]
pub fn definition_for(kind: DatasetKind) -> Option<DatasetDefinition> {
    all_definitions().into_iter().find(|d| d.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_definitions() {
        let definitions = all_definitions();
        assert_eq!(definitions.len(), DATASET_TOMLS.len());
    }

    #[test]
    fn one_definition_per_kind() {
        let kinds: BTreeSet<DatasetKind> = all_definitions().iter().map(|d| d.kind).collect();
        assert_eq!(kinds.len(), DatasetKind::all().len());
        for kind in DatasetKind::all() {
            assert!(definition_for(*kind).is_some(), "no definition for {kind}");
        }
    }

    #[test]
    fn ids_are_unique() {
        let mut seen = BTreeSet::new();
        for definition in all_definitions() {
            assert!(
                seen.insert(definition.id.clone()),
                "Duplicate dataset ID: {}",
                definition.id
            );
        }
    }

    #[test]
    fn rejects_incomplete_toml() {
        let toml_str = r#"
            id = "broken"
            name = "Broken"
            kind = "unfit"
            file_name = "x.csv"

            [fields]
            latitude = "Latitude"
        "#;
        assert!(matches!(
            parse_definition_toml(toml_str),
            Err(SourceError::Schema { .. })
        ));
    }
}
