//! Choice schemas: the request/response contract at decision boundaries.
//!
//! A decision exposes, per field, an ordered display-label-to-value mapping
//! plus a minimum and maximum selection count. The caller answers with a
//! mapping from field name to chosen labels. Out-of-range or unknown
//! selections are a contract violation, rejected before `execute` runs.

use std::collections::HashMap;

use crate::ids::{EntityId, PlayerId};

// ============================================================================
// Values & Fields
// ============================================================================

/// A selectable value behind a display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceValue {
    /// A player, or `None` for the bandit side.
    Player(Option<PlayerId>),
    /// A canonical entity.
    Entity(EntityId),
    /// A number (pool sizes, amounts).
    Number(u32),
    /// Yes/no.
    Bool(bool),
    /// An offered optional modifier, by index into the offered list.
    Modifier(usize),
}

/// One selectable field: labels, values, and how many must be chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectField {
    /// Ordered label -> value mapping.
    pub options: Vec<(String, ChoiceValue)>,
    /// Minimum selections.
    pub min: usize,
    /// Maximum selections.
    pub max: usize,
}

impl SelectField {
    /// A field requiring exactly one selection.
    pub fn one_of(options: Vec<(String, ChoiceValue)>) -> Self {
        Self {
            options,
            min: 1,
            max: 1,
        }
    }

    /// A field allowing any subset.
    pub fn any_of(options: Vec<(String, ChoiceValue)>) -> Self {
        let max = options.len();
        Self {
            options,
            min: 0,
            max,
        }
    }

    /// A field requiring between `min` and `max` selections.
    pub fn between(options: Vec<(String, ChoiceValue)>, min: usize, max: usize) -> Self {
        Self { options, min, max }
    }

    fn value_of(&self, label: &str) -> Option<ChoiceValue> {
        self.options
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    /// How many distinct legal selections this field admits.
    fn combination_count(&self) -> usize {
        let n = self.options.len();
        (self.min..=self.max.min(n)).map(|k| choose(n, k)).sum()
    }
}

fn choose(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let mut result = 1usize;
    for i in 0..k.min(n - k) {
        result = result * (n - i) / (i + 1);
    }
    result
}

// ============================================================================
// Schema & Response
// ============================================================================

/// An ordered set of named fields making up one decision's choices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceSchema {
    fields: Vec<(String, SelectField)>,
}

/// The caller's answer: field name -> chosen labels.
pub type ChoiceResponse = HashMap<String, Vec<String>>;

/// Contract violations in a submitted response. These are rejected before
/// any execution and carry no rollback semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// The response names a field the schema does not have.
    UnknownField(String),
    /// A required field is missing from the response.
    MissingField(String),
    /// A chosen label is not among the field's options.
    UnknownOption { field: String, label: String },
    /// The same label was chosen twice.
    DuplicateSelection { field: String, label: String },
    /// The number of selections is outside the field's bounds.
    SelectionCount {
        field: String,
        min: usize,
        max: usize,
        got: usize,
    },
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseError::UnknownField(field) => write!(f, "Unknown field '{}'", field),
            ResponseError::MissingField(field) => write!(f, "Missing field '{}'", field),
            ResponseError::UnknownOption { field, label } => {
                write!(f, "Unknown option '{}' for field '{}'", label, field)
            }
            ResponseError::DuplicateSelection { field, label } => {
                write!(f, "Option '{}' chosen twice for field '{}'", label, field)
            }
            ResponseError::SelectionCount {
                field,
                min,
                max,
                got,
            } => write!(
                f,
                "Field '{}' needs between {} and {} selections, got {}",
                field, min, max, got
            ),
        }
    }
}

impl std::error::Error for ResponseError {}

impl ChoiceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Field order is presentation order.
    pub fn add_field(&mut self, name: impl Into<String>, field: SelectField) {
        self.fields.push((name.into(), field));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[(String, SelectField)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SelectField> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// Mutable field access, for at-start modifier hooks that alter the
    /// available choices.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut SelectField> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    /// Remove a field (used by at-start modifier hooks that withdraw choices).
    pub fn remove_field(&mut self, name: &str) {
        self.fields.retain(|(n, _)| n != name);
    }

    /// Validate a response against this schema.
    pub fn validate(&self, response: &ChoiceResponse) -> Result<(), ResponseError> {
        for field_name in response.keys() {
            if self.field(field_name).is_none() {
                return Err(ResponseError::UnknownField(field_name.clone()));
            }
        }
        for (name, field) in &self.fields {
            let empty = Vec::new();
            let chosen = match response.get(name) {
                Some(labels) => labels,
                None if field.min == 0 => &empty,
                None => return Err(ResponseError::MissingField(name.clone())),
            };
            if chosen.len() < field.min || chosen.len() > field.max {
                return Err(ResponseError::SelectionCount {
                    field: name.clone(),
                    min: field.min,
                    max: field.max,
                    got: chosen.len(),
                });
            }
            for (i, label) in chosen.iter().enumerate() {
                if field.value_of(label).is_none() {
                    return Err(ResponseError::UnknownOption {
                        field: name.clone(),
                        label: label.clone(),
                    });
                }
                if chosen[..i].contains(label) {
                    return Err(ResponseError::DuplicateSelection {
                        field: name.clone(),
                        label: label.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The chosen values for a field, in the order the caller listed them.
    /// The response must already have been validated.
    pub fn selected(&self, response: &ChoiceResponse, name: &str) -> Vec<ChoiceValue> {
        let Some(field) = self.field(name) else {
            return Vec::new();
        };
        response
            .get(name)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|label| field.value_of(label))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// If the schema admits exactly one legal combination, build it.
    ///
    /// An empty schema trivially has one combination (the empty response).
    /// This is the basis of decision auto-complete.
    pub fn single_combination(&self) -> Option<ChoiceResponse> {
        let mut response = ChoiceResponse::new();
        for (name, field) in &self.fields {
            if field.combination_count() != 1 {
                return None;
            }
            // One combination means the forced selection is the first
            // min(=max) options; with min == 0 that is the empty selection.
            let forced: Vec<String> = field
                .options
                .iter()
                .take(field.min)
                .map(|(label, _)| label.clone())
                .collect();
            if !forced.is_empty() {
                response.insert(name.clone(), forced);
            }
        }
        Some(response)
    }
}
