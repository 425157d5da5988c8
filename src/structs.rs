use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Binding Configuration ---

/// Declared shape of a resource's decoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    Single,
    Array,
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultShape::Single => write!(f, "single"),
            ResultShape::Array => write!(f, "array"),
        }
    }
}

/// Where placeholder values end up in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderTarget {
    /// Interpolated into the SQL text, which is then sent as `?query=`.
    QueryText,
    /// Substituted into path segments of the request path.
    PathSegment,
}

/// Placeholder values supplied at fetch time, keyed by placeholder name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.values.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

// --- Fetch Results ---

/// A decoded response, shaped per the resource descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Single(Value),
    Array(Vec<Value>),
}

impl FetchResult {
    pub fn shape(&self) -> ResultShape {
        match self {
            FetchResult::Single(_) => ResultShape::Single,
            FetchResult::Array(_) => ResultShape::Array,
        }
    }

    /// A single record is never empty; an array is empty when it has no rows.
    pub fn is_empty(&self) -> bool {
        match self {
            FetchResult::Single(_) => false,
            FetchResult::Array(rows) => rows.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FetchResult::Single(_) => 1,
            FetchResult::Array(rows) => rows.len(),
        }
    }

    pub fn rows(&self) -> &[Value] {
        match self {
            FetchResult::Single(value) => std::slice::from_ref(value),
            FetchResult::Array(rows) => rows,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            FetchResult::Single(value) => value,
            FetchResult::Array(rows) => Value::Array(rows),
        }
    }
}

// --- Catalog Rows ---

/// One row of `SYS.SYSSTATEMENTHISTORY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    #[serde(rename = "STATEMENTID")]
    pub statement_id: i64,
    #[serde(rename = "STARTTIMEMS")]
    pub start_time_ms: i64,
    #[serde(rename = "STATEMENTSQL", default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Remaining history columns, passed through untouched.
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

/// Row returned by the statement SQL-text lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementSqlRow {
    #[serde(rename = "STATEMENTSQL", default)]
    pub sql: Option<String>,
}

/// Row returned by the readiness sentinel query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConglomerateRow {
    #[serde(rename = "CONGLOMERATENUMBER")]
    pub conglomerate_number: i64,
}

/// One row of region-server statistics. Columns vary by server version,
/// so they are kept as an ordered JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatRow(pub Map<String, Value>);

impl StatRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// One step of a traced statement's execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainPlanNode {
    #[serde(default)]
    pub children: Vec<ExplainPlanNode>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ExplainPlanNode {
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ExplainPlanNode::node_count).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(ExplainPlanNode::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fetch_result_emptiness() {
        assert!(FetchResult::Array(vec![]).is_empty());
        assert!(!FetchResult::Array(vec![json!({"A": 1})]).is_empty());
        assert!(!FetchResult::Single(json!({})).is_empty());
        assert_eq!(FetchResult::Single(json!({"x": 1})).rows().len(), 1);
    }

    #[test]
    fn statement_record_keeps_unknown_columns() {
        let record: StatementRecord = serde_json::from_value(json!({
            "STATEMENTID": 42,
            "STARTTIMEMS": 1_400_000_000_000i64,
            "HOSTNAME": "rs-1",
            "ROWSMODIFIED": 0
        }))
        .unwrap();
        assert_eq!(record.statement_id, 42);
        assert_eq!(record.sql, None);
        assert_eq!(record.columns.get("HOSTNAME"), Some(&json!("rs-1")));
        assert!(!record.columns.contains_key("STATEMENTID"));
    }

    #[test]
    fn explain_plan_counts_nested_children() {
        let node: ExplainPlanNode = serde_json::from_value(json!({
            "operationType": "ProjectRestrict",
            "children": [
                {"operationType": "TableScan", "children": []},
                {"operationType": "IndexLookup", "children": [
                    {"operationType": "IndexScan"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1].children.len(), 1);
        assert_eq!(node.node_count(), 4);
        assert_eq!(node.depth(), 3);
        assert_eq!(node.attribute("operationType"), Some(&json!("ProjectRestrict")));
    }

    #[test]
    fn params_collect_from_pairs() {
        let params: Params = [("statementId", 7)].into_iter().collect();
        assert_eq!(params.get("statementId"), Some("7"));
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["statementId"]);
    }
}
