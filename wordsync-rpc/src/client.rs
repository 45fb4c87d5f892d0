//! Blocking XML-RPC client for a WordPress site with the wordsync extension.
//!
//! One client is built per run from a resolved [`SiteConfig`]; nothing is
//! cached process-wide.

use std::collections::BTreeMap;
use std::error::Error as _;
use std::io::ErrorKind;

use wordsync_core::{
    ContentStore, RemoteError, RemoteTaxonomy, RemoteTerm, ResourceManifest, SiteConfig, TermId,
    TermPayload,
};

use crate::codec::{decode_response, encode_call};
use crate::value::Value;

/// XML-RPC endpoint path appended to the site url.
pub const XMLRPC_PATH: &str = "xmlrpc.php";

/// XML-RPC implementation of [`ContentStore`].
pub struct XmlRpcClient {
    agent: ureq::Agent,
    endpoint: String,
    blog_id: u32,
    username: String,
    password: String,
}

impl XmlRpcClient {
    pub fn new(site: &SiteConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(site.timeout).build();
        Self {
            agent,
            endpoint: endpoint_for(&site.url),
            blog_id: site.blog_id,
            username: site.username.clone(),
            password: site.password.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Unauthenticated call.
    pub fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RemoteError> {
        let body = encode_call(method, &params);
        tracing::debug!(method, endpoint = %self.endpoint, "xml-rpc call");

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "text/xml")
            .send_string(&body)
            .map_err(|err| self.classify(err))?;
        let text = response
            .into_string()
            .map_err(|e| RemoteError::Transport(format!("reading {method} response: {e}")))?;

        decode_response(&text)?.into_result()
    }

    /// Call with `blog_id, username, password` prepended to `params`.
    pub fn authenticated_call(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RemoteError> {
        let mut full = Vec::with_capacity(params.len() + 3);
        full.push(Value::from(self.blog_id));
        full.push(Value::from(self.username.as_str()));
        full.push(Value::from(self.password.as_str()));
        full.extend(params);
        self.call(method, full)
    }

    fn classify(&self, err: ureq::Error) -> RemoteError {
        match err {
            ureq::Error::Status(status, _) => RemoteError::Http {
                status,
                endpoint: self.endpoint.clone(),
            },
            ureq::Error::Transport(transport) => {
                if transport.source().is_some_and(refused_in_chain) {
                    RemoteError::ConnectionRefused {
                        endpoint: self.endpoint.clone(),
                    }
                } else {
                    RemoteError::Transport(transport.to_string())
                }
            }
        }
    }
}

/// Whether an io `ConnectionRefused` appears anywhere in `err`'s source chain.
/// Timeouts and unreachable hosts do not count.
fn refused_in_chain(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == ErrorKind::ConnectionRefused)
        {
            return true;
        }
        current = err.source();
    }
    false
}

/// `http://example.com/` becomes `http://example.com/xmlrpc.php`; urls that
/// already name the endpoint are kept, bare hosts get `http://`.
pub fn endpoint_for(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    let url = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };
    if url.ends_with(XMLRPC_PATH) {
        url
    } else {
        format!("{url}/{XMLRPC_PATH}")
    }
}

// ---------------------------------------------------------------------------
// Payload mapping
// ---------------------------------------------------------------------------

fn term_struct(term: &TermPayload) -> Value {
    let mut members = BTreeMap::new();
    members.insert("taxonomy".to_string(), Value::from(term.taxonomy.as_str()));
    members.insert("name".to_string(), Value::from(term.name.as_str()));
    members.insert("slug".to_string(), Value::from(term.slug.as_str()));
    let parent = term.parent.clone().unwrap_or_else(TermId::root);
    members.insert("parent".to_string(), id_value(&parent));
    if let Some(description) = &term.description {
        members.insert("description".to_string(), Value::from(description.as_str()));
    }
    Value::Struct(members)
}

fn id_value(id: &TermId) -> Value {
    match id.0.parse::<i64>() {
        Ok(numeric) => Value::Int(numeric),
        Err(_) => Value::from(id.0.as_str()),
    }
}

fn expect_string(value: Value, method: &str) -> Result<String, RemoteError> {
    match value {
        Value::String(s) => Ok(s),
        other => other.to_id_string().ok_or_else(|| {
            RemoteError::Protocol(format!("{method} returned {}, expected string", other.kind()))
        }),
    }
}

fn expect_array(value: Value, method: &str) -> Result<Vec<Value>, RemoteError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(RemoteError::Protocol(format!(
            "{method} returned {}, expected array",
            other.kind()
        ))),
    }
}

fn string_member(value: &Value, name: &str) -> Option<String> {
    value.member(name).and_then(Value::to_id_string)
}

fn parse_remote_term(value: &Value, taxonomy: &str) -> Result<RemoteTerm, RemoteError> {
    let required = |name: &str| {
        string_member(value, name).ok_or_else(|| {
            RemoteError::Protocol(format!("{taxonomy} term is missing `{name}`"))
        })
    };
    Ok(RemoteTerm {
        term_id: TermId::from(required("term_id")?),
        taxonomy: string_member(value, "taxonomy").unwrap_or_else(|| taxonomy.to_string()),
        name: required("name")?,
        slug: required("slug")?,
        parent: string_member(value, "parent")
            .map(TermId::from)
            .unwrap_or_else(TermId::root),
        description: string_member(value, "description"),
    })
}

// ---------------------------------------------------------------------------
// ContentStore
// ---------------------------------------------------------------------------

impl ContentStore for XmlRpcClient {
    fn get_version(&self) -> Result<String, RemoteError> {
        let value = self.authenticated_call("gw.getVersion", vec![])?;
        expect_string(value, "gw.getVersion")
    }

    fn get_taxonomies(&self) -> Result<Vec<RemoteTaxonomy>, RemoteError> {
        let value = self.authenticated_call("wp.getTaxonomies", vec![])?;
        expect_array(value, "wp.getTaxonomies")?
            .iter()
            .map(|item| {
                string_member(item, "name")
                    .map(|name| RemoteTaxonomy { name })
                    .ok_or_else(|| RemoteError::Protocol("taxonomy is missing `name`".to_string()))
            })
            .collect()
    }

    fn get_terms(&self, taxonomy: &str) -> Result<Vec<RemoteTerm>, RemoteError> {
        let value = self.authenticated_call("wp.getTerms", vec![Value::from(taxonomy)])?;
        expect_array(value, "wp.getTerms")?
            .iter()
            .map(|item| parse_remote_term(item, taxonomy))
            .collect()
    }

    fn new_term(&self, term: &TermPayload) -> Result<TermId, RemoteError> {
        let value = self.authenticated_call("wp.newTerm", vec![term_struct(term)])?;
        expect_string(value, "wp.newTerm").map(TermId::from)
    }

    fn edit_term(&self, term_id: &TermId, term: &TermPayload) -> Result<(), RemoteError> {
        self.authenticated_call("wp.editTerm", vec![id_value(term_id), term_struct(term)])?;
        Ok(())
    }

    fn delete_term(&self, taxonomy: &str, term_id: &TermId) -> Result<(), RemoteError> {
        self.authenticated_call(
            "wp.deleteTerm",
            vec![Value::from(taxonomy), id_value(term_id)],
        )?;
        Ok(())
    }

    fn get_resources(&self) -> Result<ResourceManifest, RemoteError> {
        match self.call("gw.getResources", vec![])? {
            Value::Struct(members) => members
                .into_iter()
                .map(|(path, hash)| {
                    let hash = expect_string(hash, "gw.getResources")?;
                    Ok((path, hash))
                })
                .collect(),
            // PHP serializes an empty associative array as an empty list.
            Value::Array(items) if items.is_empty() => Ok(ResourceManifest::new()),
            other => Err(RemoteError::Protocol(format!(
                "gw.getResources returned {}, expected struct",
                other.kind()
            ))),
        }
    }

    fn add_resource(&self, path: &str, content_base64: &str) -> Result<String, RemoteError> {
        let value = self.authenticated_call(
            "gw.addResource",
            vec![Value::from(path), Value::from(content_base64)],
        )?;
        expect_string(value, "gw.addResource")
    }

    fn delete_resource(&self, path: &str) -> Result<(), RemoteError> {
        self.authenticated_call("gw.deleteResource", vec![Value::from(path)])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
