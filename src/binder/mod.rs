// src/binder/mod.rs

//! Resource binder: turns a [`ResourceDescriptor`] into a [`ResourceHandle`]
//! whose `fetch` renders the template, issues one GET and returns the decoded
//! body in the declared shape.

use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BindingError, FetchError, Result};
use crate::parser::QueryTemplate;
use crate::query::{query_request_path, render_path, render_sql};
use crate::structs::{FetchResult, Params, PlaceholderTarget, ResultShape};
use crate::transport::Transport;

/// Static configuration of one read-only resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    name: String,
    template: QueryTemplate,
    shape: ResultShape,
    target: PlaceholderTarget,
}

impl ResourceDescriptor {
    /// SQL resource executed through the `query2js` endpoint. Placeholders are
    /// interpolated into the SQL text.
    pub fn query(name: impl Into<String>, sql: &str, shape: ResultShape) -> Result<Self, BindingError> {
        Ok(Self {
            name: name.into(),
            template: QueryTemplate::parse(sql)?,
            shape,
            target: PlaceholderTarget::QueryText,
        })
    }

    /// Resource addressed by a path template such as
    /// `/sqlresource/tracedStatements/:statementId`.
    pub fn path(name: impl Into<String>, path: &str, shape: ResultShape) -> Result<Self, BindingError> {
        let template = QueryTemplate::parse(path)?;
        if template.row_limit().is_some() {
            return Err(BindingError::MalformedTemplate(
                "path templates cannot carry a {LIMIT n} marker".to_string(),
            ));
        }
        if !path.starts_with('/') {
            return Err(BindingError::MalformedTemplate(format!(
                "path template '{}' must start with '/'",
                path
            )));
        }
        Ok(Self {
            name: name.into(),
            template,
            shape,
            target: PlaceholderTarget::PathSegment,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &QueryTemplate {
        &self.template
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }

    pub fn target(&self) -> PlaceholderTarget {
        self.target
    }

    pub fn placeholders(&self) -> &[String] {
        self.template.placeholders()
    }

    /// Request path and query string relative to the endpoint base.
    pub fn request_path(&self, params: &Params) -> Result<String, BindingError> {
        match self.target {
            PlaceholderTarget::QueryText => Ok(query_request_path(&render_sql(&self.template, params)?)),
            PlaceholderTarget::PathSegment => render_path(&self.template, params),
        }
    }
}

/// Produces handles that share one endpoint base and transport.
#[derive(Clone)]
pub struct Binder {
    base: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl Binder {
    /// `base` is everything in front of `/sqlresource`, e.g.
    /// `http://localhost:8080/splice_web/webresources`.
    pub fn new(base: impl AsRef<str>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base: Arc::from(base.as_ref().trim_end_matches('/')),
            transport,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn bind(&self, descriptor: ResourceDescriptor) -> ResourceHandle {
        ResourceHandle {
            descriptor: Arc::new(descriptor),
            base: Arc::clone(&self.base),
            transport: Arc::clone(&self.transport),
        }
    }
}

/// Stateless, cloneable binding of a descriptor to a transport.
#[derive(Clone)]
pub struct ResourceHandle {
    descriptor: Arc<ResourceDescriptor>,
    base: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("name", &self.descriptor.name)
            .field("base", &self.base)
            .finish()
    }
}

impl ResourceHandle {
    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn request_url(&self, params: &Params) -> Result<String, BindingError> {
        Ok(format!("{}{}", self.base, self.descriptor.request_path(params)?))
    }

    pub async fn fetch(&self, params: &Params) -> Result<FetchResult> {
        let url = self.request_url(params)?;
        debug!("[RESOURCE] {} -> {}", self.descriptor.name, url);
        let body = self.transport.get_json(&url).await?;
        Ok(shape_body(&url, self.descriptor.shape, body)?)
    }

    /// Fetches and deserializes the shaped body into `T` (a record type for
    /// `Single` resources, a `Vec` of records for `Array` resources).
    pub async fn fetch_as<T: DeserializeOwned>(&self, params: &Params) -> Result<T> {
        let url = self.request_url(params)?;
        let result = self.fetch(params).await?;
        serde_json::from_value(result.into_value())
            .map_err(|source| FetchError::Decode { url, source }.into())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn shape_body(url: &str, shape: ResultShape, body: Value) -> Result<FetchResult, FetchError> {
    match (shape, body) {
        (ResultShape::Single, body @ Value::Object(_)) => Ok(FetchResult::Single(body)),
        (ResultShape::Array, Value::Array(rows)) => Ok(FetchResult::Array(rows)),
        (expected, other) => Err(FetchError::Shape {
            url: url.to_string(),
            expected,
            found: json_kind(&other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::mock::{Reply, ScriptedTransport};
    use serde_json::json;

    const BASE: &str = "http://db:8080/splice_web/webresources";

    fn bind(transport: &Arc<ScriptedTransport>, descriptor: ResourceDescriptor) -> ResourceHandle {
        Binder::new(BASE, transport.clone() as Arc<dyn Transport>).bind(descriptor)
    }

    fn sql_text_descriptor() -> ResourceDescriptor {
        ResourceDescriptor::query(
            "statement-sql",
            "select STATEMENTSQL from SYS.SYSSTATEMENTHISTORY where STATEMENTID=:statementId",
            ResultShape::Array,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_placeholder_issues_no_request() {
        let transport = Arc::new(ScriptedTransport::json(vec![json!([])]));
        let handle = bind(&transport, sql_text_descriptor());

        let err = handle.fetch(&Params::new()).await.unwrap_err();
        assert!(matches!(err, Error::Binding(BindingError::MissingPlaceholder(ref n)) if n == "statementId"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extraneous_placeholder_issues_no_request() {
        let transport = Arc::new(ScriptedTransport::json(vec![json!([])]));
        let handle = bind(&transport, sql_text_descriptor());

        let params = Params::new().with("statementId", 1).with("limit", 5);
        let err = handle.fetch(&params).await.unwrap_err();
        assert!(matches!(err, Error::Binding(BindingError::UnexpectedPlaceholder(ref n)) if n == "limit"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_params_fetch_array() {
        let transport = Arc::new(ScriptedTransport::json(vec![json!([{"STATEMENTSQL": "select 1"}])]));
        let handle = bind(&transport, sql_text_descriptor());

        let result = handle.fetch(&Params::new().with("statementId", 42)).await.unwrap();
        assert_eq!(result, FetchResult::Array(vec![json!({"STATEMENTSQL": "select 1"})]));
        assert_eq!(
            transport.requests(),
            vec![format!(
                "{}/sqlresource/query2js?query=select%20STATEMENTSQL%20from%20SYS.SYSSTATEMENTHISTORY%20where%20STATEMENTID%3D42",
                BASE
            )]
        );
    }

    #[tokio::test]
    async fn test_path_target_builds_segment_url() {
        let transport = Arc::new(ScriptedTransport::json(vec![json!({"children": []})]));
        let descriptor =
            ResourceDescriptor::path("statement-detail", "/sqlresource/tracedStatements/:statementId", ResultShape::Single)
                .unwrap();
        let handle = bind(&transport, descriptor);

        let result = handle.fetch(&Params::new().with("statementId", 42)).await.unwrap();
        assert_eq!(result.shape(), ResultShape::Single);
        assert_eq!(transport.requests(), vec![format!("{}/sqlresource/tracedStatements/42", BASE)]);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_fetch_error() {
        let transport = Arc::new(ScriptedTransport::json(vec![json!({"not": "an array"})]));
        let handle = bind(
            &transport,
            ResourceDescriptor::query("stats", "call syscs_util.SYSCS_GET_REGION_SERVER_STATS_INFO()", ResultShape::Array)
                .unwrap(),
        );

        let err = handle.fetch(&Params::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch(FetchError::Shape { expected: ResultShape::Array, found: "object", .. })
        ));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_status_error_is_surfaced_without_retry() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::Status(500)]));
        let handle = bind(&transport, sql_text_descriptor());

        let err = handle.fetch(&Params::new().with("statementId", 3)).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError::Status { status: 500, .. })));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_as_decode_error_carries_url() {
        let transport = Arc::new(ScriptedTransport::json(vec![json!([{"STATEMENTSQL": 12}])]));
        let handle = bind(&transport, sql_text_descriptor());

        let err = handle
            .fetch_as::<Vec<crate::structs::StatementSqlRow>>(&Params::new().with("statementId", 9))
            .await
            .unwrap_err();
        match err {
            Error::Fetch(FetchError::Decode { url, .. }) => assert!(url.ends_with("STATEMENTID%3D9")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_request_url_is_deterministic() {
        let transport = Arc::new(ScriptedTransport::json(vec![]));
        let handle = bind(&transport, sql_text_descriptor());
        let params = Params::new().with("statementId", 77);
        assert_eq!(handle.request_url(&params).unwrap(), handle.request_url(&params).unwrap());
    }

    #[test]
    fn test_path_descriptor_rejects_limit_and_relative_paths() {
        assert!(ResourceDescriptor::path("x", "/a/:id {LIMIT 1}", ResultShape::Single).is_err());
        assert!(ResourceDescriptor::path("x", "a/:id", ResultShape::Single).is_err());
    }

    #[test]
    fn test_binder_trims_trailing_slash() {
        let transport = Arc::new(ScriptedTransport::json(vec![]));
        let binder = Binder::new(format!("{}/", BASE), transport as Arc<dyn Transport>);
        assert_eq!(binder.base(), BASE);
    }
}
