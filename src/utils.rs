use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueMap, ValueSet, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use crate::client::Error;

/// Cloud providers hosting Confluent Cloud resources
pub const CLOUDS: &[&str] = &["AWS", "GCP", "AZURE"];

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

pub(crate) trait WithNormalize {
    fn normalize(&mut self, diags: &mut Diagnostics);
}

/// Reference to another Confluent object, e.g. `environment { id = "env-123" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IdRef<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
}

impl<'a> IdRef<'a> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: string(id.into()),
        }
    }
}

/// Block holding the single `id` attribute of a referenced object
pub fn id_block(object: &str) -> Block {
    Block {
        attributes: map! {
            "id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(format!("The ID of the {object}")),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
        },
        description: Description::plain(format!("The {object} the object belongs to")),
        ..Default::default()
    }
}

/// Id of a referenced object when it is known
pub fn ref_id<'b>(value: &'b Value<IdRef<'_>>) -> Option<&'b str> {
    value.as_ref_option()?.id.as_deref_option()
}

pub fn string<'a>(value: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(value.into()))
}

pub fn opt_string<'a>(value: Option<String>) -> ValueString<'a> {
    value.map(Cow::Owned).into()
}

/// Like [`opt_string`], but an empty string keeps a null attribute null
///
/// Confluent answers `""` for optional fields that were never set.
pub fn opt_nonempty_string<'a>(current: &ValueString<'_>, value: Option<String>) -> ValueString<'a> {
    match value {
        Some(value) if value.is_empty() && current.is_null() => Value::Null,
        value => opt_string(value),
    }
}

pub fn string_set<'a>(values: impl IntoIterator<Item = String>) -> ValueSet<ValueString<'a>> {
    Value::Value(values.into_iter().map(string).collect())
}

pub fn string_list<'a>(values: impl IntoIterator<Item = String>) -> Value<Vec<ValueString<'a>>> {
    Value::Value(values.into_iter().map(string).collect())
}

pub fn string_map<'a>(values: BTreeMap<String, String>) -> ValueMap<'a, ValueString<'a>> {
    Value::Value(
        values
            .into_iter()
            .map(|(k, v)| (Cow::Owned(k), string(v)))
            .collect(),
    )
}

/// Known elements of a collection of strings
pub fn known_strings<'b, 'c: 'b, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'b ValueString<'c>>,
{
    values
        .into_iter()
        .filter_map(|value| value.as_deref_option().map(str::to_owned))
        .collect()
}

/// Known entries of a map of strings
pub fn known_string_map(values: &ValueMap<'_, ValueString<'_>>) -> BTreeMap<String, String> {
    values
        .iter()
        .flatten()
        .filter_map(|(k, v)| Some((k.to_string(), v.as_deref_option()?.to_owned())))
        .collect()
}

/// Whether an attribute needs to be applied
pub fn changed<T: PartialEq>(prior: &Value<T>, proposed: &Value<T>) -> bool {
    proposed.is_unknown() || prior != proposed
}

/// Paths of the attributes whose change forces a replacement
pub fn replace_triggers<const N: usize>(checks: [(bool, &'static str); N]) -> Vec<AttributePath> {
    checks
        .into_iter()
        .filter(|(changed, _)| *changed)
        .map(|(_, name)| AttributePath::new(name))
        .collect()
}

pub fn report(diags: &mut Diagnostics, summary: impl Into<Cow<'static, str>>, err: Error) {
    diags.root_error(summary, err.to_string());
}

pub fn validate_one_of(
    diags: &mut Diagnostics,
    value: &ValueString<'_>,
    allowed: &[&str],
    attr_path: AttributePath,
) {
    if let Value::Value(value) = value {
        if !allowed.contains(&value.as_ref()) {
            diags.error(
                format!("Invalid `{attr_path}`"),
                format!(
                    "Expected one of {}, but got {:?}.",
                    allowed.join(", "),
                    value
                ),
                attr_path,
            );
        }
    }
}

pub fn validate_prefix(
    diags: &mut Diagnostics,
    value: &ValueString<'_>,
    prefix: &str,
    attr_path: AttributePath,
) {
    if let Value::Value(value) = value {
        if !value.starts_with(prefix) {
            diags.error(
                format!("Invalid `{attr_path}`"),
                format!("Expected a value starting with {prefix:?}, but got {value:?}."),
                attr_path,
            );
        }
    }
}

pub fn validate_not_empty(diags: &mut Diagnostics, value: &ValueString<'_>, attr_path: AttributePath) {
    if let Value::Value(value) = value {
        if value.trim().is_empty() {
            diags.error_short(format!("`{attr_path}` cannot be empty"), attr_path);
        }
    }
}

/// Check that a data source is looked up by exactly one of `id` and `display_name`
pub fn validate_id_or_name(
    diags: &mut Diagnostics,
    id: &ValueString<'_>,
    display_name: &ValueString<'_>,
) -> Option<()> {
    if id.is_value() == display_name.is_value() && !id.is_unknown() && !display_name.is_unknown() {
        diags.root_error_short("Exactly one of `id` and `display_name` must be set");
        return None;
    }
    Some(())
}

/// Pick the single item of a listing named `display_name`
pub fn find_by_display_name<T>(
    diags: &mut Diagnostics,
    object: &str,
    items: Vec<T>,
    display_name: &str,
    name_of: impl Fn(&T) -> Option<&str>,
) -> Option<T> {
    let mut matching: Vec<_> = items
        .into_iter()
        .filter(|item| name_of(item) == Some(display_name))
        .collect();
    match matching.len() {
        1 => matching.pop(),
        0 => {
            diags.root_error(
                format!("Error reading {object}"),
                format!("There is no {object} with display_name {display_name:?}"),
            );
            None
        }
        n => {
            diags.root_error(
                format!("Error reading {object}"),
                format!("There are {n} {object}s with display_name {display_name:?}, use `id` instead"),
            );
            None
        }
    }
}

/// Split an import id made of `/` separated parts
pub fn split_import_id(diags: &mut Diagnostics, id: &str, format: &str) -> Option<Vec<String>> {
    let expected = format.split('/').count();
    let parts: Vec<String> = id.split('/').map(str::to_owned).collect();
    if parts.len() != expected || parts.iter().any(String::is_empty) {
        diags.root_error(
            "Invalid import id",
            format!("Expected an id with the format `{format}`, but got {id:?}."),
        );
        return None;
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_triggers_keep_changed_attributes() {
        let triggers = replace_triggers([(true, "cloud"), (false, "region"), (true, "environment")]);
        assert_eq!(
            triggers,
            vec![AttributePath::new("cloud"), AttributePath::new("environment")]
        );
    }

    #[test]
    fn unknown_values_are_changes() {
        let prior: ValueString = string("a");
        assert!(!changed(&prior, &string("a")));
        assert!(changed(&prior, &string("b")));
        assert!(changed(&prior, &Value::Unknown));
        assert!(changed(&Value::Null, &prior));
    }

    #[test]
    fn one_of_reports_invalid_values() {
        let mut diags = Diagnostics::default();
        validate_one_of(
            &mut diags,
            &string("AWS"),
            &["AWS", "GCP", "AZURE"],
            AttributePath::new("cloud"),
        );
        validate_one_of(
            &mut diags,
            &Value::Unknown,
            &["AWS", "GCP", "AZURE"],
            AttributePath::new("cloud"),
        );
        assert!(diags.errors.is_empty());

        validate_one_of(
            &mut diags,
            &string("aws"),
            &["AWS", "GCP", "AZURE"],
            AttributePath::new("cloud"),
        );
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].attribute, AttributePath::new("cloud"));
    }

    #[test]
    fn prefix_and_emptiness() {
        let mut diags = Diagnostics::default();
        validate_prefix(
            &mut diags,
            &string("env-123"),
            "env-",
            AttributePath::new("environment").attribute("id"),
        );
        validate_not_empty(&mut diags, &string("orders"), AttributePath::new("topic_name"));
        assert!(diags.errors.is_empty());

        validate_prefix(
            &mut diags,
            &string("lkc-123"),
            "env-",
            AttributePath::new("environment").attribute("id"),
        );
        validate_not_empty(&mut diags, &string("  "), AttributePath::new("topic_name"));
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn import_ids_are_split() {
        let mut diags = Diagnostics::default();
        assert_eq!(
            split_import_id(&mut diags, "env-1/lkc-1", "<environment id>/<cluster id>"),
            Some(vec!["env-1".to_owned(), "lkc-1".to_owned()])
        );
        assert!(diags.errors.is_empty());

        assert_eq!(
            split_import_id(&mut diags, "lkc-1", "<environment id>/<cluster id>"),
            None
        );
        assert_eq!(
            split_import_id(&mut diags, "env-1/", "<environment id>/<cluster id>"),
            None
        );
        assert_eq!(diags.errors.len(), 2);
    }

    #[test]
    fn string_maps_keep_known_entries() {
        let mut map = BTreeMap::new();
        map.insert("retention.ms".to_owned(), "604800000".to_owned());
        let value = string_map(map.clone());
        assert_eq!(known_string_map(&value), map);

        let mut partial = value.clone();
        if let Value::Value(entries) = &mut partial {
            entries.insert(Cow::Borrowed("cleanup.policy"), Value::Unknown);
        }
        assert_eq!(known_string_map(&partial), map);
    }
}
