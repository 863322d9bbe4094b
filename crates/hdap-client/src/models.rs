//! Data models for the HDAP directory protocol.
//!
//! Resources are JSON attribute maps with the reserved `_id` and `_rev`
//! attributes; the remaining types model the protocol's request and
//! response envelopes and the optional parameters each operation
//! accepts.

use hdap_core::query::QueryPairs;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One directory entry: a set of named attributes plus `_id`/`_rev`.
///
/// Attribute values are scalars, ordered sequences, or nested objects as
/// the server's schema dictates. Resources are never mutated locally;
/// every mutation round-trips through the server and returns the
/// authoritative new representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource {
    attributes: Map<String, Value>,
}

impl Resource {
    /// Create an empty resource.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resource identifier (`_id`), if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.first_str("_id")
    }

    /// Returns the revision token (`_rev`), if present.
    #[must_use]
    pub fn rev(&self) -> Option<&str> {
        self.first_str("_rev")
    }

    /// Returns the raw value of the attribute if present.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Returns the first string value of the attribute.
    ///
    /// Directory attributes are frequently multi-valued; this returns the
    /// string itself for scalar attributes and the first element for
    /// sequence attributes.
    #[must_use]
    pub fn first_str(&self, attribute: &str) -> Option<&str> {
        match self.attributes.get(attribute)? {
            Value::String(value) => Some(value),
            Value::Array(values) => values.first().and_then(Value::as_str),
            _ => None,
        }
    }

    /// Set an attribute, returning the previous value if any.
    pub fn insert(&mut self, attribute: impl Into<String>, value: Value) -> Option<Value> {
        self.attributes.insert(attribute.into(), value)
    }

    /// Returns true if the resource has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns the underlying attribute map.
    #[must_use]
    pub const fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

impl From<Map<String, Value>> for Resource {
    fn from(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }
}

/// The kind of change a patch operation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    /// Add a value to the target field.
    Add,
    /// Remove the target field, or one value from it.
    Remove,
    /// Replace the target field's value.
    Replace,
    /// Increment the target field's numeric value.
    Increment,
}

/// One patch operation; an ordered sequence of these is applied
/// atomically by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// The kind of change to apply.
    pub operation: PatchKind,
    /// JSON pointer to the target field in the resource.
    pub field: String,
    /// Value for `add` and `replace`; optional for `remove` (removes one
    /// element of a multi-valued attribute) and `increment` (the delta).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Add `value` to the target field.
    #[must_use]
    pub fn add(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            operation: PatchKind::Add,
            field: field.into(),
            value: Some(value.into()),
        }
    }

    /// Remove the target field entirely.
    #[must_use]
    pub fn remove(field: impl Into<String>) -> Self {
        Self {
            operation: PatchKind::Remove,
            field: field.into(),
            value: None,
        }
    }

    /// Remove one value from a multi-valued target field.
    #[must_use]
    pub fn remove_value(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            operation: PatchKind::Remove,
            field: field.into(),
            value: Some(value.into()),
        }
    }

    /// Replace the target field with `value`.
    #[must_use]
    pub fn replace(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            operation: PatchKind::Replace,
            field: field.into(),
            value: Some(value.into()),
        }
    }

    /// Increment the numeric target field by `delta`.
    #[must_use]
    pub fn increment(field: impl Into<String>, delta: i64) -> Self {
        Self {
            operation: PatchKind::Increment,
            field: field.into(),
            value: Some(Value::from(delta)),
        }
    }
}

/// Query breadth relative to the base resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The base entry itself.
    Base,
    /// Immediate children of the base entry.
    #[default]
    One,
    /// The entire subtree including the base entry.
    Sub,
    /// The subtree excluding the base entry.
    Subordinates,
}

impl Scope {
    /// Returns the protocol's wire form of the scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::One => "one",
            Self::Sub => "sub",
            Self::Subordinates => "subordinates",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for computing the total result count of a paged query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountPolicy {
    /// The server may estimate the total.
    Estimate,
    /// The server must count exactly.
    Exact,
    /// No total is computed.
    None,
}

impl CountPolicy {
    /// Returns the protocol's wire form of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Estimate => "ESTIMATE",
            Self::Exact => "EXACT",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for CountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access-token envelope returned by the `authenticate` action.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// The bearer token; redacted in `Debug` output.
    pub access_token: SecretString,
    /// Token type reported by the server (typically `Bearer`).
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// One page of query results plus paging metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    /// The matching resources.
    #[serde(default)]
    pub result: Vec<Resource>,
    /// Number of results in this page, or the total for count-only
    /// queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<i64>,
    /// Opaque cookie to request the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paged_results_cookie: Option<String>,
    /// Results remaining after this page, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_paged_results: Option<i64>,
    /// Total results across all pages, per the requested count policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_paged_results: Option<i64>,
}

/// Optional parameters for `read`.
#[derive(Debug, Default, Clone)]
pub struct ReadParams {
    /// Attributes to return, comma-joined on the wire.
    pub fields: Option<Vec<String>>,
    /// Manage referral and other DSA-internal entries directly.
    pub manage_dsa_it: bool,
    /// Ask the server to pretty-print the response.
    pub pretty_print: bool,
}

impl ReadParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryPairs::new();
        params.push_joined("_fields", self.fields.as_deref());
        params.push_flag("manageDsaIT", self.manage_dsa_it);
        params.push_flag("_prettyPrint", self.pretty_print);
        params.into_pairs()
    }
}

/// Optional parameters for `create`, `update`, and `patch`.
#[derive(Debug, Default, Clone)]
pub struct WriteParams {
    /// Validate the operation without applying it.
    pub dry_run: bool,
    /// Attributes to return, comma-joined on the wire.
    pub fields: Option<Vec<String>>,
    /// Manage referral and other DSA-internal entries directly.
    pub manage_dsa_it: bool,
    /// Return password-quality advice with the result.
    pub password_quality_advice: bool,
    /// Ask the server to pretty-print the response.
    pub pretty_print: bool,
    /// Relax DIT structure rules for this operation.
    pub relax: bool,
}

impl WriteParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryPairs::new();
        params.push_flag("dryRun", self.dry_run);
        params.push_joined("_fields", self.fields.as_deref());
        params.push_flag("manageDsaIT", self.manage_dsa_it);
        params.push_flag("passwordQualityAdvice", self.password_quality_advice);
        params.push_flag("_prettyPrint", self.pretty_print);
        params.push_flag("relax", self.relax);
        params.into_pairs()
    }
}

/// Optional parameters for `remove`.
#[derive(Debug, Default, Clone)]
pub struct RemoveParams {
    /// Validate the operation without applying it.
    pub dry_run: bool,
    /// Attributes to return, comma-joined on the wire.
    pub fields: Option<Vec<String>>,
    /// Manage referral and other DSA-internal entries directly.
    pub manage_dsa_it: bool,
    /// Ask the server to pretty-print the response.
    pub pretty_print: bool,
    /// Delete the entire subtree under the resource.
    pub subtree_delete: bool,
}

impl RemoveParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryPairs::new();
        params.push_flag("dryRun", self.dry_run);
        params.push_joined("_fields", self.fields.as_deref());
        params.push_flag("manageDsaIT", self.manage_dsa_it);
        params.push_flag("_prettyPrint", self.pretty_print);
        params.push_flag("subtreeDelete", self.subtree_delete);
        params.into_pairs()
    }
}

/// Optional parameters for `rename`.
#[derive(Debug, Default, Clone)]
pub struct RenameParams {
    /// Delete the old relative identifier attribute after the rename.
    pub delete_old_rdn: bool,
    /// Validate the operation without applying it.
    pub dry_run: bool,
    /// Attributes to return, comma-joined on the wire.
    pub fields: Option<Vec<String>>,
    /// Manage referral and other DSA-internal entries directly.
    pub manage_dsa_it: bool,
    /// Ask the server to pretty-print the response.
    pub pretty_print: bool,
    /// Relax DIT structure rules for this operation.
    pub relax: bool,
}

impl RenameParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryPairs::new();
        params.push_flag("deleteOldRdn", self.delete_old_rdn);
        params.push_flag("dryRun", self.dry_run);
        params.push_joined("_fields", self.fields.as_deref());
        params.push_flag("manageDsaIT", self.manage_dsa_it);
        params.push_flag("_prettyPrint", self.pretty_print);
        params.push_flag("relax", self.relax);
        params.into_pairs()
    }
}

/// Optional parameters for the password and account-usability actions.
#[derive(Debug, Default, Clone)]
pub struct PasswordParams {
    /// Validate the operation without applying it.
    pub dry_run: bool,
    /// Attributes to return, comma-joined on the wire.
    pub fields: Option<Vec<String>>,
    /// Return password-quality advice with the result.
    pub password_quality_advice: bool,
    /// Ask the server to pretty-print the response.
    pub pretty_print: bool,
}

impl PasswordParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryPairs::new();
        params.push_flag("dryRun", self.dry_run);
        params.push_joined("_fields", self.fields.as_deref());
        params.push_flag("passwordQualityAdvice", self.password_quality_advice);
        params.push_flag("_prettyPrint", self.pretty_print);
        params.into_pairs()
    }
}

/// Optional parameters for the `schema` action.
#[derive(Debug, Default, Clone)]
pub struct SchemaParams {
    /// Attributes to return, comma-joined on the wire.
    pub fields: Option<Vec<String>>,
    /// Ask the server to pretty-print the response.
    pub pretty_print: bool,
}

impl SchemaParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryPairs::new();
        params.push_joined("_fields", self.fields.as_deref());
        params.push_flag("_prettyPrint", self.pretty_print);
        params.into_pairs()
    }
}

/// Optional parameters for `query`.
///
/// The query filter itself is a separate argument; these options shape
/// scope, paging, sorting, and count behavior.
#[derive(Debug, Default, Clone)]
pub struct QueryOptions {
    /// Return only the count of matching resources.
    pub count_only: bool,
    /// Attributes to return, comma-joined on the wire.
    pub fields: Option<Vec<String>>,
    /// Cookie from the previous page's response.
    pub paged_results_cookie: Option<String>,
    /// Maximum number of resources per page.
    pub page_size: Option<u32>,
    /// Ask the server to pretty-print the response.
    pub pretty_print: bool,
    /// Query breadth; the server defaults to [`Scope::One`].
    pub scope: Option<Scope>,
    /// Sort keys, comma-joined on the wire.
    pub sort_keys: Option<Vec<String>>,
    /// Include LDAP subentries in the results.
    pub subentries: bool,
    /// Policy for computing the total result count.
    pub total_policy: Option<CountPolicy>,
}

impl QueryOptions {
    /// Convert the options into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryPairs::new();
        params.push_flag("_countOnly", self.count_only);
        params.push_joined("_fields", self.fields.as_deref());
        params.push_opt("_pagedResultsCookie", self.paged_results_cookie.as_deref());
        params.push_opt("_pageSize", self.page_size);
        params.push_flag("_prettyPrint", self.pretty_print);
        params.push_opt("scope", self.scope);
        params.push_joined("_sortKeys", self.sort_keys.as_deref());
        params.push_flag("subentries", self.subentries);
        params.push_opt("_totalPagedResultsPolicy", self.total_policy);
        params.into_pairs()
    }
}
