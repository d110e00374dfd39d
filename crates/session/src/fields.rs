//! Field values and the field list shown to the user

use pdf_core::{FieldType, FormField};
use serde::Serialize;
use std::collections::BTreeMap;

/// Field name to current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldValues {
    values: BTreeMap<String, String>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one value, returning the previous one
    pub fn upsert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose value differs from `baseline` (missing baseline counts as empty)
    pub fn changed_from<'a>(&'a self, baseline: &'a FieldValues) -> Vec<(&'a str, &'a str)> {
        self.iter()
            .filter(|(name, value)| baseline.get(name).unwrap_or("") != *value)
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Field kind as presented to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Checkbox,
    Radio,
    Choice,
    Signature,
    Unknown,
}

impl FieldKind {
    fn of(field: &FormField) -> Self {
        match field.field_type {
            FieldType::Text => FieldKind::Text,
            FieldType::Button if field.is_radio() => FieldKind::Radio,
            FieldType::Button => FieldKind::Checkbox,
            FieldType::Choice => FieldKind::Choice,
            FieldType::Signature => FieldKind::Signature,
            FieldType::Unknown => FieldKind::Unknown,
        }
    }
}

/// One input in the form UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    /// Fully qualified field name, the key for edits
    pub name: String,
    /// Short label (the field's own `/T`)
    pub label: String,
    pub kind: FieldKind,
    /// Current session value
    pub value: String,
    pub read_only: bool,
    pub required: bool,
    pub multiline: bool,
    /// Pages (1-indexed) the field appears on
    pub pages: Vec<usize>,
    /// Choices, or the "on" states of a checkbox/radio group
    pub options: Vec<String>,
}

impl FieldView {
    pub(crate) fn new(field: &FormField, values: &FieldValues) -> Self {
        let label = if field.partial_name.is_empty() {
            field.name.clone()
        } else {
            field.partial_name.clone()
        };
        let read_only = !field.is_fillable();
        // Locked fields, and fields the session holds no value for, show the document's own
        let value = values
            .get(&field.name)
            .filter(|_| !read_only)
            .map(str::to_string)
            .or_else(|| field.value.clone())
            .unwrap_or_default();
        Self {
            name: field.name.clone(),
            label,
            kind: FieldKind::of(field),
            value,
            read_only,
            required: field.is_required(),
            multiline: field.is_multiline(),
            pages: field.pages.clone(),
            options: field.options.clone(),
        }
    }
}
