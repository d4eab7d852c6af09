//! Query assistance built from the inferred schema
//!
//! A completion host receives the table name, the schema and a fixed keyword
//! list, and turns them into suggestions. It never writes back.

use crate::schema::{ColumnDescriptor, Schema, TypeTag};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;

/// Keywords suggested alongside table and column names
pub const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP BY", "ORDER BY", "LIMIT", "COUNT", "SUM", "AVG", "LIKE",
    "IN", "IS NULL",
];

static BARE_IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    Table,
    Keyword,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub insert_text: String,
}

impl CompletionItem {
    fn table(name: &str) -> Self {
        CompletionItem {
            label: name.to_string(),
            kind: CompletionKind::Table,
            detail: None,
            documentation: None,
            insert_text: name.to_string(),
        }
    }

    fn keyword(keyword: &str) -> Self {
        CompletionItem {
            label: keyword.to_string(),
            kind: CompletionKind::Keyword,
            detail: None,
            documentation: None,
            insert_text: keyword.to_string(),
        }
    }

    fn field(column: &ColumnDescriptor) -> Self {
        let sample = serde_json::to_string(&column.sample).unwrap_or_default();
        CompletionItem {
            label: column.name.clone(),
            kind: CompletionKind::Field,
            detail: Some(column.type_tag.to_string()),
            documentation: Some(format!("Sample: {}", sample)),
            insert_text: quote_identifier(&column.name).into_owned(),
        }
    }
}

/// What a completion host receives on every schema change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaUpdate {
    pub table_name: String,
    pub schema: Arc<Schema>,
    pub keywords: &'static [&'static str],
}

impl SchemaUpdate {
    pub fn new(table_name: &str, schema: Arc<Schema>) -> Self {
        SchemaUpdate {
            table_name: table_name.to_string(),
            schema,
            keywords: SQL_KEYWORDS,
        }
    }

    /// Table, keywords, then one field per column
    pub fn items(&self) -> Vec<CompletionItem> {
        std::iter::once(CompletionItem::table(&self.table_name))
            .chain(self.keywords.iter().map(|kw| CompletionItem::keyword(kw)))
            .chain(self.schema.columns().iter().map(CompletionItem::field))
            .collect()
    }

    /// Items whose label starts with `prefix`, ignoring case
    pub fn suggest(&self, prefix: &str) -> Vec<CompletionItem> {
        let prefix = prefix.to_lowercase();
        self.items()
            .into_iter()
            .filter(|item| item.label.to_lowercase().starts_with(&prefix))
            .collect()
    }

    /// Column names with their type tags, as listed next to the query box
    pub fn column_list(&self) -> Vec<(&str, TypeTag)> {
        self.schema
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.type_tag))
            .collect()
    }
}

/// Bare names stay as they are; anything else is double-quoted
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    if BARE_IDENTIFIER_REGEX.is_match(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(double_quoted(name))
    }
}

fn double_quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Append a quoted column reference to a query, as clicking a column does
pub fn insert_column(query: &str, column: &str) -> String {
    format!("{} {} ", query, double_quoted(column))
}

/// The identifier characters immediately before `cursor` (a byte offset)
pub fn word_before(text: &str, cursor: usize) -> &str {
    let mut end = cursor.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let head = &text[..end];
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(end, |(idx, _)| idx);
    &head[start..]
}
