//! Minimal builder for SoQL query-string parameters.
//!
//! Only covers what the dataset operations need. Text that reaches a literal
//! must already be escaped by the validator, or go through [`literal`].

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::validate::escape_soql_literal;
use crate::window::soql_timestamp;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoqlQuery {
    select: Option<String>,
    conditions: Vec<String>,
    group: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SoqlQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    /// Adds a condition; all conditions are joined with `AND`.
    #[must_use]
    pub fn and_where(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Adds a condition only when one is given.
    #[must_use]
    pub fn and_where_opt(self, condition: Option<String>) -> Self {
        match condition {
            Some(condition) => self.and_where(condition),
            None => self,
        }
    }

    #[must_use]
    pub fn group(mut self, columns: impl Into<String>) -> Self {
        self.group = Some(columns.into());
        self
    }

    #[must_use]
    pub fn order(mut self, columns: impl Into<String>) -> Self {
        self.order = Some(columns.into());
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Same query restricted to one page.
    #[must_use]
    pub fn page(&self, offset: usize, limit: usize) -> Self {
        self.clone().offset(offset).limit(limit)
    }

    #[must_use]
    pub fn where_clause(&self) -> Option<String> {
        (!self.conditions.is_empty()).then(|| {
            self.conditions
                .iter()
                .map(|condition| format!("({condition})"))
                .collect::<Vec<_>>()
                .join(" AND ")
        })
    }

    /// `$`-prefixed parameters in deterministic order.
    #[must_use]
    pub fn to_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        if let Some(select) = &self.select {
            params.insert("$select".to_string(), select.clone());
        }
        if let Some(clause) = self.where_clause() {
            params.insert("$where".to_string(), clause);
        }
        if let Some(group) = &self.group {
            params.insert("$group".to_string(), group.clone());
        }
        if let Some(order) = &self.order {
            params.insert("$order".to_string(), order.clone());
        }
        if let Some(limit) = self.limit {
            params.insert("$limit".to_string(), limit.to_string());
        }
        if let Some(offset) = self.offset {
            params.insert("$offset".to_string(), offset.to_string());
        }
        params
    }
}

/// Quotes and escapes arbitrary text as a SoQL string literal.
#[must_use]
pub fn literal(raw: &str) -> String {
    format!("'{}'", escape_soql_literal(raw))
}

/// `field = 'value'` for a value that is already escaped.
#[must_use]
pub fn eq_escaped(field: &str, escaped: &str) -> String {
    format!("{field} = '{escaped}'")
}

/// Case-insensitive substring match for an already escaped value.
#[must_use]
pub fn contains_escaped(field: &str, escaped: &str) -> String {
    format!("upper({field}) like upper('%{escaped}%')")
}

/// Inclusive timestamp range on a floating timestamp column.
#[must_use]
pub fn between(field: &str, start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!(
        "{field} between '{}' and '{}'",
        soql_timestamp(start),
        soql_timestamp(end)
    )
}

/// Rows whose `[start_field, end_field]` span overlaps the given range.
#[must_use]
pub fn overlaps(start_field: &str, end_field: &str, start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!(
        "{start_field} <= '{}' and ({end_field} >= '{}' or {end_field} is null)",
        soql_timestamp(end),
        soql_timestamp(start)
    )
}
