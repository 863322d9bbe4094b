//! Asynchronous HDAP directory client implementation.
//!
//! One public method per directory verb; the six RPC-style operations
//! (`authenticate`, `rename`, `resetPassword`, `modifyPassword`,
//! `accountUsability`, `schema`) share a single named-action primitive
//! executed as `POST /{id}?_action=<name>`.

use crate::models::{
    PasswordParams, PatchOperation, QueryOptions, QueryPage, ReadParams, RemoveParams,
    RenameParams, Resource, SchemaParams, TokenGrant, WriteParams,
};
use crate::Result;
use hdap_core::config::DirectoryConfig;
use hdap_core::credentials::{common_headers, Credentials};
use hdap_core::notify::MessageSink;
use hdap_core::Error;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, IF_MATCH, IF_NONE_MATCH,
};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("hdap-client/", env!("CARGO_PKG_VERSION"));

/// `Accept-API-Version` value required for count-only queries.
const COUNT_API_VERSION: &str = "protocol=2.2,resource=1.0";

/// Field selection for root-entry reads: all regular plus all
/// operational attributes.
const ROOT_ALL_FIELDS: &str = "*,+";

/// Builder for [`DirectoryClient`].
#[derive(Debug, Clone)]
pub struct DirectoryClientBuilder {
    config: DirectoryConfig,
    sink: MessageSink,
}

impl DirectoryClientBuilder {
    /// Create a builder from a [`DirectoryConfig`].
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            config,
            sink: MessageSink::new(),
        }
    }

    /// Use an existing notification sink instead of a fresh one.
    #[must_use]
    pub fn with_message_sink(mut self, sink: MessageSink) -> Self {
        self.sink = sink;
        self
    }

    /// Finalise the builder and create the [`DirectoryClient`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the base URL or TLS material is
    /// invalid.
    pub fn build(self) -> Result<DirectoryClient> {
        let mut api_base = self.config.parse_api_base()?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(self.config.timeout())
            .connect_timeout(Duration::from_secs(10));

        if !self.config.tls_verify {
            warn!("TLS verification disabled for directory client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &self.config.tls_ca_cert {
            debug!("loading directory CA certificate from {}", ca_cert.display());
            let bytes = std::fs::read(ca_cert).map_err(|err| {
                Error::Config(format!(
                    "Failed to read CA certificate {}: {err}",
                    ca_cert.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&bytes)
                .map_err(|err| Error::Config(format!("Invalid CA certificate: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(DirectoryClient {
            http,
            api_base,
            sink: self.sink,
        })
    }
}

/// Asynchronous client for an HDAP directory service.
///
/// The client is stateless across calls: credentials are supplied per
/// operation and used only for that single request. Non-2xx responses
/// are mapped onto the closed error taxonomy, published to the shared
/// [`MessageSink`], and raised to the caller.
#[derive(Clone)]
pub struct DirectoryClient {
    http: Client,
    api_base: Url,
    sink: MessageSink,
}

impl DirectoryClient {
    /// Construct a client directly from the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the URL is invalid.
    pub fn new(api_base: impl AsRef<str>) -> Result<Self> {
        let config = DirectoryConfig::new(api_base.as_ref())?;
        DirectoryClientBuilder::new(config).build()
    }

    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: DirectoryConfig) -> DirectoryClientBuilder {
        DirectoryClientBuilder::new(config)
    }

    /// Return the normalized API base URL.
    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Return the notification sink failures are published to.
    #[must_use]
    pub fn message_sink(&self) -> &MessageSink {
        &self.sink
    }

    /// Perform authentication and return an access-token grant.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier or password is empty;
    /// otherwise surfaces the server's response, typically
    /// [`Error::Unauthorized`] for bad credentials.
    pub async fn authenticate(&self, id: &str, password: &str) -> Result<TokenGrant> {
        if id.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier and the password".to_string(),
            ));
        }
        self.action(
            "authenticate",
            id,
            Vec::new(),
            &json!({ "password": password }),
            None,
        )
        .await
    }

    /// Create the resource at `id`.
    ///
    /// Sends `If-None-Match: *`, so the call fails with
    /// [`Error::PreconditionFailed`] if a resource already exists there.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier is empty.
    pub async fn create(
        &self,
        id: &str,
        resource: &Resource,
        params: Option<&WriteParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier and the resource".to_string(),
            ));
        }
        let headers = precondition_header(IF_NONE_MATCH, "*")?;
        let pairs = params.map(WriteParams::to_pairs).unwrap_or_default();
        self.request(Method::PUT, id, headers, Some(resource), pairs, credentials)
            .await
    }

    /// Return the resource at `id`.
    ///
    /// An empty identifier (or `/`) reads the root entry; root reads
    /// request all regular plus all operational attributes unless the
    /// caller supplied a field list, which is extended instead.
    ///
    /// # Errors
    ///
    /// Surfaces the server's response status on failure.
    pub async fn read(
        &self,
        id: &str,
        params: Option<&ReadParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        let mut pairs = params.map(ReadParams::to_pairs).unwrap_or_default();
        if is_root(id) {
            include_operational_fields(&mut pairs);
        }
        self.request::<(), Resource>(Method::GET, id, HeaderMap::new(), None, pairs, credentials)
            .await
    }

    /// Update the resource at `id`.
    ///
    /// With a revision the update is conditional (`If-Match: <rev>`);
    /// without one it matches any existing revision (`If-Match: *`).
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier is empty; a stale revision
    /// surfaces as [`Error::Conflict`] or [`Error::PreconditionFailed`]
    /// per server semantics.
    pub async fn update(
        &self,
        id: &str,
        resource: &Resource,
        rev: Option<&str>,
        params: Option<&WriteParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() {
            return Err(Error::Validation(
                "You must set the identifier and resource".to_string(),
            ));
        }
        let headers = precondition_header(IF_MATCH, rev.unwrap_or("*"))?;
        let pairs = params.map(WriteParams::to_pairs).unwrap_or_default();
        self.request(Method::PUT, id, headers, Some(resource), pairs, credentials)
            .await
    }

    /// Apply an ordered sequence of patch operations to the resource.
    ///
    /// The revision precondition is attached only when supplied;
    /// omitting it means unconditional.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier is empty or no patch
    /// operations are supplied.
    pub async fn patch(
        &self,
        id: &str,
        patches: &[PatchOperation],
        rev: Option<&str>,
        params: Option<&WriteParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() || patches.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier and patches".to_string(),
            ));
        }
        let headers = optional_precondition_header(rev)?;
        let pairs = params.map(WriteParams::to_pairs).unwrap_or_default();
        self.request(Method::PATCH, id, headers, Some(patches), pairs, credentials)
            .await
    }

    /// Delete the resource at `id`, returning its final representation.
    ///
    /// The revision precondition is attached only when supplied.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier is empty.
    pub async fn remove(
        &self,
        id: &str,
        rev: Option<&str>,
        params: Option<&RemoveParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier".to_string(),
            ));
        }
        let headers = optional_precondition_header(rev)?;
        let pairs = params.map(RemoveParams::to_pairs).unwrap_or_default();
        self.request(Method::DELETE, id, headers, Some(&json!({})), pairs, credentials)
            .await
    }

    /// Change the resource identifier from `id` to `new_id`.
    ///
    /// # Errors
    ///
    /// Fails validation unless both identifiers are set.
    pub async fn rename(
        &self,
        id: &str,
        new_id: &str,
        params: Option<&RenameParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() || new_id.is_empty() {
            return Err(Error::Validation(
                "Provide the current and new resource identifiers".to_string(),
            ));
        }
        let pairs = params.map(RenameParams::to_pairs).unwrap_or_default();
        self.action("rename", id, pairs, &json!({ "newId": new_id }), credentials)
            .await
    }

    /// Search the directory under the optional base identifier.
    ///
    /// An absent filter matches every resource in scope. Count-only
    /// queries carry the protocol-version header the server requires to
    /// honor count semantics.
    ///
    /// # Errors
    ///
    /// Surfaces the server's response status on failure.
    pub async fn query(
        &self,
        base: &str,
        filter: Option<&str>,
        options: Option<&QueryOptions>,
        credentials: Option<&Credentials>,
    ) -> Result<QueryPage> {
        let mut pairs = options.map(QueryOptions::to_pairs).unwrap_or_default();
        pairs.push(("_queryFilter", filter.unwrap_or("true").to_string()));

        let mut headers = HeaderMap::new();
        if options.is_some_and(|options| options.count_only) {
            headers.insert(
                HeaderName::from_static("accept-api-version"),
                HeaderValue::from_static(COUNT_API_VERSION),
            );
        }
        self.request::<(), QueryPage>(Method::GET, base, headers, None, pairs, credentials)
            .await
    }

    /// Return the JSON schema for the resource, or for a prospective
    /// child resource with the given object classes.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier is empty.
    pub async fn get_schema(
        &self,
        id: &str,
        object_classes: Option<&[String]>,
        params: Option<&SchemaParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier".to_string(),
            ));
        }
        let mut pairs = params.map(SchemaParams::to_pairs).unwrap_or_default();
        if let Some(classes) = object_classes.filter(|classes| !classes.is_empty()) {
            pairs.push(("objectClasses", classes.join(",")));
        }
        self.action("schema", id, pairs, &json!({}), credentials).await
    }

    /// Return details about a user's ability to authenticate.
    ///
    /// Requires credentials with access to the account-usability
    /// control.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier is empty.
    pub async fn get_account_usability(
        &self,
        id: &str,
        params: Option<&PasswordParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier".to_string(),
            ));
        }
        let pairs = params.map(PasswordParams::to_pairs).unwrap_or_default();
        self.action("accountUsability", id, pairs, &json!({}), credentials)
            .await
    }

    /// Change the password of the resource, authenticating as that
    /// resource.
    ///
    /// # Errors
    ///
    /// Fails validation unless the identifier and both passwords are
    /// set.
    pub async fn modify_password(
        &self,
        id: &str,
        current_password: &str,
        new_password: &str,
        params: Option<&PasswordParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier".to_string(),
            ));
        }
        if current_password.is_empty() || new_password.is_empty() {
            return Err(Error::Validation(
                "Provide both the current and new passwords".to_string(),
            ));
        }
        let pairs = params.map(PasswordParams::to_pairs).unwrap_or_default();
        let body = json!({
            "oldPassword": current_password,
            "newPassword": new_password
        });
        self.action("modifyPassword", id, pairs, &body, credentials).await
    }

    /// Reset the resource's password to a generated value.
    ///
    /// Requires credentials with the password-reset privilege; the
    /// returned resource carries the generated password.
    ///
    /// # Errors
    ///
    /// Fails validation when the identifier is empty.
    pub async fn reset_password(
        &self,
        id: &str,
        params: Option<&PasswordParams>,
        credentials: Option<&Credentials>,
    ) -> Result<Resource> {
        if id.is_empty() {
            return Err(Error::Validation(
                "You must set the resource identifier".to_string(),
            ));
        }
        let pairs = params.map(PasswordParams::to_pairs).unwrap_or_default();
        self.action("resetPassword", id, pairs, &json!({}), credentials)
            .await
    }

    /// Invoke a named action: `POST /{id}?_action=<name>`.
    async fn action<B, T>(
        &self,
        name: &'static str,
        id: &str,
        mut pairs: Vec<(&'static str, String)>,
        body: &B,
        credentials: Option<&Credentials>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        pairs.push(("_action", name.to_string()));
        self.request(Method::POST, id, HeaderMap::new(), Some(body), pairs, credentials)
            .await
    }

    /// Shape and execute one HTTP exchange against the directory.
    async fn request<B, T>(
        &self,
        method: Method,
        id: &str,
        extra_headers: HeaderMap,
        body: Option<&B>,
        params: Vec<(&'static str, String)>,
        credentials: Option<&Credentials>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.endpoint(id)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(&params);
        }

        let mut headers = common_headers(credentials)?;
        headers.extend(extra_headers);

        let mut request = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            // The protocol requires an explicit length rather than
            // chunked transfer.
            let payload = serde_json::to_vec(body)?;
            request = request.header(CONTENT_LENGTH, payload.len()).body(payload);
        }

        debug!(%method, id, "directory request");
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await.map_err(Error::from)?;
            // Absent and empty bodies deserialize as an empty resource.
            let payload: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
            return serde_json::from_slice(payload).map_err(|err| {
                Error::Parse(format!("Unexpected directory response for `{id}`: {err}"))
            });
        }

        let body = response.bytes().await.unwrap_or_default();
        let error = Error::from_status(status, extract_message(status, &body));
        self.sink.publish(error.notification());
        warn!(%status, id, "directory request failed");
        Err(error)
    }

    fn endpoint(&self, id: &str) -> Result<Url> {
        let id = id.trim_start_matches('/');
        self.api_base
            .join(id)
            .map_err(|err| Error::Config(format!("Invalid resource identifier `{id}`: {err}")))
    }
}

fn is_root(id: &str) -> bool {
    id.is_empty() || id == "/"
}

/// Root reads also surface operational attributes; a caller-supplied
/// field list is extended, never overridden.
fn include_operational_fields(pairs: &mut Vec<(&'static str, String)>) {
    match pairs.iter_mut().find(|(key, _)| *key == "_fields") {
        Some((_, fields)) => fields.push_str(",+"),
        None => pairs.push(("_fields", ROOT_ALL_FIELDS.to_string())),
    }
}

fn precondition_header(name: HeaderName, rev: &str) -> Result<HeaderMap> {
    let value = HeaderValue::from_str(rev)
        .map_err(|err| Error::Validation(format!("Invalid revision token `{rev}`: {err}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(name, value);
    Ok(headers)
}

fn optional_precondition_header(rev: Option<&str>) -> Result<HeaderMap> {
    match rev {
        Some(rev) => precondition_header(IF_MATCH, rev),
        None => Ok(HeaderMap::new()),
    }
}

fn extract_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PasswordParams, PatchOperation, QueryOptions, ReadParams};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> DirectoryClient {
        DirectoryClient::new(format!("{}/hdap", server.uri())).unwrap()
    }

    fn person(id: &str) -> Resource {
        serde_json::from_value(json!({
            "_id": id,
            "objectClass": ["inetOrgPerson", "organizationalPerson", "person", "top"],
            "cn": ["New User"],
            "sn": ["User"],
            "uid": ["newuser"]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_attaches_only_if_absent_precondition() {
        let server = MockServer::start().await;
        let id = "dc=com/dc=example/ou=People/uid=newuser";

        Mock::given(method("PUT"))
            .and(path(format!("/hdap/{id}")))
            .and(header("If-None-Match", "*"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "_id": id,
                "_rev": "0001",
                "sn": ["User"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let created = client.create(id, &person(id), None, None).await.unwrap();
        assert_eq!(created.rev(), Some("0001"));
    }

    #[tokio::test]
    async fn create_existing_resource_fails_precondition() {
        let server = MockServer::start().await;
        let id = "dc=com/dc=example/ou=People/uid=newuser";

        Mock::given(method("PUT"))
            .and(path(format!("/hdap/{id}")))
            .respond_with(ResponseTemplate::new(412).set_body_json(json!({
                "code": 412,
                "message": "The entry already exists"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.create(id, &person(id), None, None).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed(_)));
        assert_eq!(
            client.message_sink().last().as_deref(),
            Some("HTTP 412 Precondition Failed: The entry already exists.")
        );
    }

    #[tokio::test]
    async fn update_defaults_to_match_any_revision() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=bjensen";

        Mock::given(method("PUT"))
            .and(path(format!("/hdap/{id}")))
            .and(header("If-Match", "*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": id })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.update(id, &person(id), None, None, None).await.unwrap();
    }

    #[tokio::test]
    async fn update_with_revision_is_conditional() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=bjensen";

        Mock::given(method("PUT"))
            .and(path(format!("/hdap/{id}")))
            .and(header("If-Match", "00000000642e3c3b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": id })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .update(id, &person(id), Some("00000000642e3c3b"), None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_revision_surfaces_conflict() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=bjensen";

        Mock::given(method("PUT"))
            .and(path(format!("/hdap/{id}")))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": 409,
                "message": "Revision does not match"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .update(id, &person(id), Some("stale"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn read_root_requests_operational_attributes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/"))
            .and(query_param("_fields", "*,+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vendorName": ["Example Directory"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let root = client.read("", None, None).await.unwrap();
        assert_eq!(root.first_str("vendorName"), Some("Example Directory"));
    }

    #[tokio::test]
    async fn read_root_extends_caller_field_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/"))
            .and(query_param("_fields", "supportedControl,+"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let params = ReadParams {
            fields: Some(vec!["supportedControl".to_string()]),
            ..ReadParams::default()
        };
        client.read("/", Some(&params), None).await.unwrap();
    }

    #[tokio::test]
    async fn read_non_root_leaves_fields_alone() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=bjensen";

        Mock::given(method("GET"))
            .and(path(format!("/hdap/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": id })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.read(id, None, None).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].url.query().unwrap_or("").contains("_fields"));
    }

    #[tokio::test]
    async fn query_defaults_to_match_all_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/ou=People"))
            .and(query_param("_queryFilter", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [],
                "resultCount": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let page = client.query("ou=People", None, None, None).await.unwrap();
        assert!(page.result.is_empty());
    }

    #[tokio::test]
    async fn query_count_only_sets_versioned_accept_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/ou=People"))
            .and(query_param("_countOnly", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [],
                "resultCount": 150
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let options = QueryOptions {
            count_only: true,
            ..QueryOptions::default()
        };
        let page = client
            .query("ou=People", None, Some(&options), None)
            .await
            .unwrap();
        assert_eq!(page.result_count, Some(150));
    }

    #[tokio::test]
    async fn query_passes_filter_and_scope_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/ou=People"))
            .and(query_param("_queryFilter", "mail eq 'bjensen@example.com'"))
            .and(query_param("scope", "sub"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [{ "_id": "ou=People/uid=bjensen", "cn": ["Babs Jensen"] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let options = QueryOptions {
            scope: Some(crate::models::Scope::Sub),
            ..QueryOptions::default()
        };
        let page = client
            .query(
                "ou=People",
                Some("mail eq 'bjensen@example.com'"),
                Some(&options),
                None,
            )
            .await
            .unwrap();
        assert_eq!(page.result[0].first_str("cn"), Some("Babs Jensen"));
    }

    #[tokio::test]
    async fn authenticate_posts_the_action_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hdap/uid=admin"))
            .and(query_param("_action", "authenticate"))
            .and(body_json(json!({ "password": "password" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "eyJhbGciOi.example.token",
                "token_type": "Bearer",
                "expires_in": 300
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let grant = client.authenticate("uid=admin", "password").await.unwrap();
        assert_eq!(grant.expires_in, 300);
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hdap/uid=admin"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": 401,
                "message": "Invalid credentials"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.authenticate("uid=admin", "drowssap").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rename_posts_new_identifier() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=newuser";
        let new_id = "ou=People/uid=fake";

        Mock::given(method("POST"))
            .and(path(format!("/hdap/{id}")))
            .and(query_param("_action", "rename"))
            .and(body_json(json!({ "newId": new_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": new_id,
                "uid": ["fake"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let renamed = client.rename(id, new_id, None, None).await.unwrap();
        assert_eq!(renamed.first_str("uid"), Some("fake"));
    }

    #[tokio::test]
    async fn get_schema_joins_object_classes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hdap/ou=People"))
            .and(query_param("_action", "schema"))
            .and(query_param(
                "objectClasses",
                "inetOrgPerson,organizationalPerson,person,top",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": { "cn": { "type": "array" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let classes: Vec<String> = ["inetOrgPerson", "organizationalPerson", "person", "top"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let schema = client
            .get_schema("ou=People", Some(&classes), None, None)
            .await
            .unwrap();
        assert!(schema.get("properties").is_some());
    }

    #[tokio::test]
    async fn modify_password_posts_both_passwords() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=user.0";

        Mock::given(method("POST"))
            .and(path(format!("/hdap/{id}")))
            .and(query_param("_action", "modifyPassword"))
            .and(body_json(json!({
                "oldPassword": "password",
                "newPassword": "correct horse battery staple"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client
            .modify_password(id, "password", "correct horse battery staple", None, None)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn patch_without_revision_sends_no_precondition() {
        let server = MockServer::start().await;
        let id = "ou=Groups/cn=Admins";

        Mock::given(method("PATCH"))
            .and(path(format!("/hdap/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": id })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let patches = vec![PatchOperation::add("uniqueMember", "uid=user.0")];
        client.patch(id, &patches, None, None, None).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("If-Match").is_none());
        // The patch body is the bare operation list.
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body[0]["operation"], "add");
    }

    #[tokio::test]
    async fn patch_with_revision_attaches_precondition() {
        let server = MockServer::start().await;
        let id = "ou=Groups/cn=Admins";

        Mock::given(method("PATCH"))
            .and(path(format!("/hdap/{id}")))
            .and(header("If-Match", "0042"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": id })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let patches = vec![PatchOperation::replace("description", "updated")];
        client
            .patch(id, &patches, Some("0042"), None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn remove_sends_explicit_content_length() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=fake";

        Mock::given(method("DELETE"))
            .and(path(format!("/hdap/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": id,
                "givenName": ["New"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let removed = client.remove(id, None, None, None).await.unwrap();
        assert_eq!(removed.first_str("givenName"), Some("New"));

        let requests = server.received_requests().await.unwrap();
        let length = requests[0].headers.get("Content-Length").unwrap();
        assert_eq!(length.to_str().unwrap(), "2");
    }

    #[tokio::test]
    async fn dry_run_parameter_passes_through() {
        let server = MockServer::start().await;
        let id = "ou=People/uid=user.0";

        Mock::given(method("POST"))
            .and(path(format!("/hdap/{id}")))
            .and(query_param("_action", "accountUsability"))
            .and(query_param("dryRun", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "valid" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let params = PasswordParams {
            dry_run: true,
            ..PasswordParams::default()
        };
        let usability = client
            .get_account_usability(id, Some(&params), None)
            .await
            .unwrap();
        assert_eq!(usability.first_str("status"), Some("valid"));
    }

    #[tokio::test]
    async fn validation_failures_do_not_reach_the_network() {
        let server = MockServer::start().await;
        let client = test_client(&server);

        assert!(matches!(
            client.authenticate("", "password").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            client.create("", &person("x"), None, None).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            client.patch("ou=People", &[], None, None, None).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            client.rename("ou=People/uid=a", "", None, None).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            client.modify_password("uid=a", "", "new", None, None).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            client.modify_password("uid=a", "old", "", None, None).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            client.remove("", None, None, None).await,
            Err(Error::Validation(_))
        ));

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn not_found_raises_and_notifies() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/uid=missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": 404,
                "message": "No such entry"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.read("uid=missing", None, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(
            client.message_sink().last().as_deref(),
            Some("HTTP 404 Not Found: No such entry.")
        );
    }

    #[tokio::test]
    async fn payload_too_large_notification_carries_hint() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/"))
            .respond_with(ResponseTemplate::new(413).set_body_json(json!({
                "code": 413,
                "message": "Too many matching resources"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.query("", None, None, None).await.unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge(_)));
        let message = client.message_sink().last().unwrap();
        assert!(message.ends_with("Refine the search criteria to limit the number of results."));
    }

    #[tokio::test]
    async fn unrecognized_status_maps_to_generic_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/hdap/uid=teapot"))
            .respond_with(ResponseTemplate::new(418).set_body_string("I'm a teapot"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.read("uid=teapot", None, None).await.unwrap_err();
        assert_eq!(
            err,
            Error::Http {
                status: 418,
                message: "I'm a teapot".to_string()
            }
        );
    }

    #[tokio::test]
    async fn empty_success_body_becomes_empty_resource() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hdap/uid=user.0"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client
            .modify_password("uid=user.0", "old", "new", None, None)
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}

