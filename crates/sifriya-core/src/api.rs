//! Typed operations over the library API, one per endpoint.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};
use crate::fetch::{FetchClient, ReqwestTransport, RetryPolicy};
use crate::library::LibraryNode;
use crate::model::{
    Calendar, IndexMetadata, Link, NameCompletion, RawSearchResponse, SearchOptions,
    SearchResults, TextOptions, TextPayload, TextVersion,
};

pub const DEFAULT_BASE_URL: &str = "https://www.sefaria.org/api";

/// Top-level JSON kind an endpoint is expected to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Array,
    ObjectOrArray,
}

impl Shape {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Shape::Object => value.is_object(),
            Shape::Array => value.is_array(),
            Shape::ObjectOrArray => value.is_object() || value.is_array(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Shape::Object => "a JSON object",
            Shape::Array => "a JSON array",
            Shape::ObjectOrArray => "a JSON object or array",
        }
    }
}

#[derive(Clone)]
pub struct LibraryApi {
    fetch: FetchClient,
    base_url: String,
}

impl Default for LibraryApi {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryApi {
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_BASE_URL, RetryPolicy::default())
    }

    pub fn with_policy(base_url: &str, policy: RetryPolicy) -> Self {
        let fetch = FetchClient::new(Arc::new(ReqwestTransport::new()), policy);
        Self::with_client(fetch, base_url)
    }

    pub fn with_client(fetch: FetchClient, base_url: &str) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Text content of a reference, e.g. "Genesis 1" or "Berakhot 2a"
    pub async fn get_text(&self, reference: &str, options: &TextOptions) -> Result<TextPayload> {
        const OP: &str = "get_text";
        let reference = require(OP, "reference", reference)?;

        let mut params = Vec::new();
        if let Some(lang) = options.lang {
            params.push(("lang", lang.as_str().to_string()));
        }
        if let Some(context) = options.context.filter(|c| *c > 0) {
            params.push(("context", context.to_string()));
        }
        if let Some(pad) = options.pad {
            params.push(("pad", flag(pad)));
        }
        if let Some(wrap_links) = options.wrap_links {
            params.push(("wrapLinks", flag(wrap_links)));
        }

        let url = format!(
            "{}/texts/{}{}",
            self.base_url,
            urlencoding::encode(reference),
            query_string(&params)
        );
        let value = self
            .fetch(OP, reference, &url, Shape::Object, &["ref", "he", "text"])
            .await?;
        decode(OP, reference, value)
    }

    /// Index metadata for a work
    pub async fn get_index(&self, title: &str) -> Result<IndexMetadata> {
        const OP: &str = "get_index";
        let title = require(OP, "title", title)?;
        let url = format!("{}/index/{}", self.base_url, urlencoding::encode(title));
        let value = self.fetch(OP, title, &url, Shape::Object, &["title"]).await?;
        decode(OP, title, value)
    }

    /// The full library tree
    pub async fn get_library(&self) -> Result<Vec<LibraryNode>> {
        const OP: &str = "get_library";
        let url = format!("{}/index", self.base_url);
        let value = self.fetch(OP, "", &url, Shape::Array, &[]).await?;
        let library: Vec<LibraryNode> = decode(OP, "", value)?;
        info!(categories = library.len(), "library index loaded");
        Ok(library)
    }

    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        const OP: &str = "search";
        let query = require(OP, "query", query)?;

        let mut params = vec![("q", query.to_string())];
        if let Some(search_type) = options.search_type {
            params.push(("type", search_type.as_str().to_string()));
        }
        if let Some(field) = options.field {
            params.push(("field", field.as_str().to_string()));
        }
        if let Some(slop) = options.slop {
            params.push(("slop", slop.to_string()));
        }
        if let Some(size) = options.size {
            params.push(("size", size.to_string()));
        }
        if let Some(from) = options.from {
            params.push(("from", from.to_string()));
        }
        for filter in &options.filters {
            params.push(("filters[]", filter.clone()));
        }

        let url = format!("{}/search-wrapper{}", self.base_url, query_string(&params));
        let value = self.fetch(OP, query, &url, Shape::Object, &["hits"]).await?;
        let raw: RawSearchResponse = decode(OP, query, value)?;
        Ok(raw.into())
    }

    pub async fn get_links(&self, reference: &str) -> Result<Vec<Link>> {
        const OP: &str = "get_links";
        let reference = require(OP, "reference", reference)?;
        let url = format!("{}/links/{}", self.base_url, urlencoding::encode(reference));
        let value = self.fetch(OP, reference, &url, Shape::Array, &[]).await?;
        decode(OP, reference, value)
    }

    pub async fn get_related(&self, reference: &str) -> Result<Value> {
        const OP: &str = "get_related";
        let reference = require(OP, "reference", reference)?;
        let url = format!("{}/related/{}", self.base_url, urlencoding::encode(reference));
        self.fetch(OP, reference, &url, Shape::Object, &["links"])
            .await
    }

    /// Today's learning schedule (weekly portion, daily page, ...)
    pub async fn get_calendars(&self) -> Result<Calendar> {
        const OP: &str = "get_calendars";
        let url = format!("{}/calendars", self.base_url);
        let value = self
            .fetch(OP, "", &url, Shape::Object, &["calendar_items", "date"])
            .await?;
        decode(OP, "", value)
    }

    /// Autocomplete a partial title or reference
    pub async fn get_name(&self, name: &str) -> Result<NameCompletion> {
        const OP: &str = "get_name";
        let name = require(OP, "name", name)?;
        let url = format!("{}/name/{}", self.base_url, urlencoding::encode(name));
        let value = self
            .fetch(OP, name, &url, Shape::Object, &["is_ref", "completions"])
            .await?;
        decode(OP, name, value)
    }

    pub async fn get_counts(&self, title: &str) -> Result<Value> {
        const OP: &str = "get_counts";
        let title = require(OP, "title", title)?;
        let url = format!("{}/counts/{}", self.base_url, urlencoding::encode(title));
        self.fetch(OP, title, &url, Shape::Object, &["title"]).await
    }

    pub async fn get_shape(&self, title: &str) -> Result<Value> {
        const OP: &str = "get_shape";
        let title = require(OP, "title", title)?;
        let url = format!("{}/shape/{}", self.base_url, urlencoding::encode(title));
        self.fetch(OP, title, &url, Shape::ObjectOrArray, &[]).await
    }

    pub async fn get_versions(&self, title: &str) -> Result<Vec<TextVersion>> {
        const OP: &str = "get_versions";
        let title = require(OP, "title", title)?;
        let url = format!(
            "{}/texts/versions/{}",
            self.base_url,
            urlencoding::encode(title)
        );
        let value = self.fetch(OP, title, &url, Shape::Array, &[]).await?;
        decode(OP, title, value)
    }

    pub async fn get_terms(&self) -> Result<Value> {
        const OP: &str = "get_terms";
        let url = format!("{}/terms", self.base_url);
        self.fetch(OP, "", &url, Shape::ObjectOrArray, &[]).await
    }

    async fn fetch(
        &self,
        operation: &'static str,
        input: &str,
        url: &str,
        shape: Shape,
        expected_keys: &[&str],
    ) -> Result<Value> {
        debug!(operation, input, "calling library API");

        let value = self
            .fetch
            .fetch_json(url)
            .await
            .map_err(|source| ApiError::Request {
                operation,
                input: input.to_string(),
                source,
            })?;

        if !shape.accepts(&value) {
            return Err(ApiError::InvalidResponse {
                operation,
                input: input.to_string(),
                detail: format!("expected {}", shape.describe()),
            });
        }

        if let Some(object) = value.as_object() {
            // Unknown references come back as 200 with {"error": "..."}
            if let Some(message) = object.get("error").and_then(Value::as_str) {
                return Err(ApiError::InvalidResponse {
                    operation,
                    input: input.to_string(),
                    detail: message.to_string(),
                });
            }

            for key in expected_keys {
                if !object.contains_key(*key) {
                    warn!(operation, input, key = *key, "response is missing an expected key");
                }
            }
        }

        Ok(value)
    }
}

/// Reject blank required inputs before anything touches the network
fn require<'a>(operation: &'static str, argument: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidArgument {
            operation,
            argument,
        });
    }
    Ok(trimmed)
}

fn decode<T: DeserializeOwned>(operation: &'static str, input: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse {
        operation,
        input: input.to_string(),
        detail: e.to_string(),
    })
}

fn flag(value: bool) -> String {
    let flag = if value { "1" } else { "0" };
    flag.to_string()
}

fn query_string(params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();
    format!("?{}", pairs.join("&"))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::fetch::testing::{Scripted, ScriptedTransport};

    pub fn scripted_api(script: Vec<Scripted>) -> (LibraryApi, Arc<ScriptedTransport>) {
        let transport = ScriptedTransport::new(script);
        let fetch = FetchClient::new(transport.clone(), RetryPolicy::default());
        (
            LibraryApi::with_client(fetch, "https://example.org/api/"),
            transport,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::scripted_api;
    use super::*;
    use crate::error::{ErrorKind, FetchError};
    use crate::fetch::testing::{ok, Scripted};
    use crate::model::{SearchField, SearchType, TextLanguage, VerseText};
    use std::error::Error as _;

    #[tokio::test]
    async fn test_get_text_encodes_reference_and_options() {
        let (api, transport) = scripted_api(vec![ok(
            r#"{"ref": "Song of Songs 1", "he": ["א"], "text": ["a"], "indexTitle": "Song of Songs", "categories": []}"#,
        )]);
        let options = TextOptions {
            lang: Some(TextLanguage::Bi),
            context: Some(0),
            pad: Some(false),
            wrap_links: Some(true),
        };

        let payload = api.get_text("Song of Songs 1", &options).await.unwrap();

        assert_eq!(payload.reference, "Song of Songs 1");
        assert_eq!(payload.text, VerseText::Many(vec!["a".to_string()]));
        assert_eq!(
            transport.urls(),
            vec!["https://example.org/api/texts/Song%20of%20Songs%201?lang=bi&pad=0&wrapLinks=1"]
        );
    }

    #[tokio::test]
    async fn test_blank_input_fails_without_network() {
        let (api, transport) = scripted_api(vec![]);

        let err = api.get_index("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.operation(), "get_index");

        let err = api.get_text("", &TextOptions::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument { argument: "reference", .. }));

        assert!(api.search("", &SearchOptions::default()).await.is_err());
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_names_operation_and_input() {
        let (api, _) = scripted_api(vec![Scripted::Respond(404, String::new())]);

        let err = api.get_index("Nonexistent Book").await.unwrap_err();

        assert!(err.is_not_found());
        let message = err.to_string();
        assert!(message.contains("get_index"));
        assert!(message.contains("Nonexistent Book"));
        let source = err.source().unwrap();
        assert!(source.to_string().contains("/index/Nonexistent%20Book"));
    }

    #[tokio::test]
    async fn test_wrong_top_level_kind_is_invalid_response() {
        let (api, _) = scripted_api(vec![ok(r#"{"not": "a list"}"#)]);
        let err = api.get_library().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_error_body_is_invalid_response() {
        let (api, _) = scripted_api(vec![ok(r#"{"error": "Could not find title in reference: Foo 1"}"#)]);
        let err = api.get_text("Foo 1", &TextOptions::default()).await.unwrap_err();
        match err {
            ApiError::InvalidResponse { detail, input, .. } => {
                assert!(detail.contains("Could not find title"));
                assert_eq!(input, "Foo 1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_optional_keys_do_not_fail() {
        let (api, _) = scripted_api(vec![ok(r#"{"lengths": [4]}"#)]);
        let meta = api.get_index("Ruth").await.unwrap();
        assert_eq!(meta.title, "");
        assert_eq!(meta.section_lengths().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_library_decodes_nested_nodes() {
        let (api, transport) = scripted_api(vec![ok(
            r#"[{"category": "Tanakh", "contents": [{"title": "Genesis", "order": 1}]}]"#,
        )]);
        let library = api.get_library().await.unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library[0].children()[0].title.as_deref(), Some("Genesis"));
        assert_eq!(transport.urls(), vec!["https://example.org/api/index"]);
    }

    #[tokio::test]
    async fn test_search_builds_query_parameters() {
        let (api, transport) = scripted_api(vec![ok(r#"{"hits": {"total": 0, "hits": []}}"#)]);
        let options = SearchOptions {
            search_type: Some(SearchType::Text),
            field: Some(SearchField::NaiveLemmatizer),
            slop: Some(10),
            filters: vec!["Tanakh/Torah".to_string()],
            size: Some(20),
            from: Some(0),
        };

        let results = api.search("shema yisrael", &options).await.unwrap();

        assert_eq!(results.total, 0);
        assert_eq!(
            transport.urls(),
            vec![
                "https://example.org/api/search-wrapper?q=shema%20yisrael&type=text&field=naive_lemmatizer&slop=10&size=20&from=0&filters%5B%5D=Tanakh%2FTorah"
            ]
        );
    }

    #[tokio::test]
    async fn test_endpoint_paths() {
        let (api, transport) = scripted_api(vec![
            ok("[]"),
            ok(r#"{"links": []}"#),
            ok(r#"{"calendar_items": [], "date": "2026-10-18"}"#),
            ok(r#"{"lang": "en", "is_ref": true, "completions": ["Genesis"]}"#),
            ok(r#"{"title": "Genesis"}"#),
            ok("[[31, 25]]"),
            ok("[]"),
            ok("{}"),
        ]);

        api.get_links("Genesis 1:1").await.unwrap();
        api.get_related("Genesis 1:1").await.unwrap();
        let calendar = api.get_calendars().await.unwrap();
        let name = api.get_name("Gen").await.unwrap();
        api.get_counts("Genesis").await.unwrap();
        api.get_shape("Genesis").await.unwrap();
        api.get_versions("Genesis").await.unwrap();
        api.get_terms().await.unwrap();

        assert_eq!(calendar.date, "2026-10-18");
        assert!(name.is_ref);
        assert_eq!(
            transport.urls(),
            vec![
                "https://example.org/api/links/Genesis%201%3A1",
                "https://example.org/api/related/Genesis%201%3A1",
                "https://example.org/api/calendars",
                "https://example.org/api/name/Gen",
                "https://example.org/api/counts/Genesis",
                "https://example.org/api/shape/Genesis",
                "https://example.org/api/texts/versions/Genesis",
                "https://example.org/api/terms",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_is_wrapped() {
        let (api, _) = scripted_api(vec![
            Scripted::Respond(503, String::new()),
            Scripted::Respond(503, String::new()),
            Scripted::Respond(503, String::new()),
            Scripted::Respond(503, String::new()),
        ]);
        let err = api.get_calendars().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        match err {
            ApiError::Request {
                source: FetchError::Network { attempts, .. },
                ..
            } => assert_eq!(attempts, 4),
            other => panic!("unexpected {other:?}"),
        }
    }
}
