//! Field list parsing: `?fields=Name, owner.Email` -> `["name", "owner.email"]`.
//!
//! Matching is case- and whitespace-insensitive. A token containing [`FIELD_DELIMITER`]
//! is an inner field: it is never dispatched itself; its prefix names the parent field
//! whose loader interprets the rest.

use std::collections::HashSet;

/// Separates a parent field from the sub-field hints handed to its loader.
pub const FIELD_DELIMITER: char = '.';

/// Normalize one field name: all whitespace removed, lowercased.
/// e.g. " Owner .Email " -> "owner.email"
pub fn normalize_field(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split a raw comma-separated fields string into normalized tokens. Empty tokens are dropped.
pub fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_field)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Normalize an already-split field list (e.g. one handed to a loader by a caller).
pub fn normalize_fields<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    fields
        .iter()
        .map(|f| normalize_field(f.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fields dispatched directly, in request order without repeats. An inner field dispatches
/// its parent: `owner.name` selects `owner`, whose loader reads `name` via [`sub_fields`].
pub fn top_level_fields(fields: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    fields
        .iter()
        .map(|f| f.split_once(FIELD_DELIMITER).map_or(f.as_str(), |(parent, _)| parent))
        .filter(|f| !f.is_empty())
        .filter(|f| seen.insert(*f))
        .collect()
}

/// Everything after the first delimiter for each token under `parent`, in input order.
/// `sub_fields("owner", ["name", "owner.email", "owner.id"])` -> `["email", "id"]`
pub fn sub_fields<S: AsRef<str>>(parent: &str, requested: &[S]) -> Vec<String> {
    let parent = normalize_field(parent);
    requested
        .iter()
        .filter_map(|token| {
            let token = normalize_field(token.as_ref());
            let (prefix, rest) = token.split_once(FIELD_DELIMITER)?;
            (prefix == parent && !rest.is_empty()).then(|| rest.to_string())
        })
        .collect()
}

/// What a field loader sees besides its target: every requested field and the shared payload.
pub struct FieldContext<'a, D> {
    fields: &'a [String],
    shared: &'a D,
}

impl<'a, D> FieldContext<'a, D> {
    pub fn new(fields: &'a [String], shared: &'a D) -> Self {
        Self { fields, shared }
    }

    /// Full normalized field list, inner fields included.
    pub fn fields(&self) -> &'a [String] {
        self.fields
    }

    pub fn shared(&self) -> &'a D {
        self.shared
    }

    /// Sub-field hints requested under `parent` (see [`sub_fields`]).
    pub fn sub_fields(&self, parent: &str) -> Vec<String> {
        sub_fields(parent, self.fields)
    }
}

impl<D> Clone for FieldContext<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for FieldContext<'_, D> {}
