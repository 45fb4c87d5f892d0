//! In-memory `ContentStore` that records every call.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use wordsync_core::{
    ContentStore, RemoteError, RemoteTaxonomy, RemoteTerm, ResourceManifest, SiteConfig,
    TaxonomyDefinitions, TermId, TermPayload,
};
use wordsync_sync::fingerprint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetVersion,
    GetTaxonomies,
    GetTerms(String),
    NewTerm { taxonomy: String, slug: String, parent: Option<String> },
    EditTerm { id: String, slug: String },
    DeleteTerm { taxonomy: String, id: String },
    GetResources,
    AddResource(String),
    DeleteResource(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::NewTerm { .. }
                | Call::EditTerm { .. }
                | Call::DeleteTerm { .. }
                | Call::AddResource(_)
                | Call::DeleteResource(_)
        )
    }

    fn method(&self) -> &'static str {
        match self {
            Call::GetVersion => "gw.getVersion",
            Call::GetTaxonomies => "wp.getTaxonomies",
            Call::GetTerms(_) => "wp.getTerms",
            Call::NewTerm { .. } => "wp.newTerm",
            Call::EditTerm { .. } => "wp.editTerm",
            Call::DeleteTerm { .. } => "wp.deleteTerm",
            Call::GetResources => "gw.getResources",
            Call::AddResource(_) => "gw.addResource",
            Call::DeleteResource(_) => "gw.deleteResource",
        }
    }
}

#[derive(Default)]
struct State {
    version: Option<Result<String, i64>>,
    taxonomies: Vec<String>,
    terms: BTreeMap<String, Vec<RemoteTerm>>,
    resources: ResourceManifest,
    next_id: u64,
    calls: Vec<Call>,
    fail_on: Option<&'static str>,
    refused: bool,
}

pub struct MemoryStore {
    state: RefCell<State>,
}

impl MemoryStore {
    pub fn new(taxonomies: &[&str]) -> Self {
        let state = State {
            version: Some(Ok(wordsync_sync::ENGINE_VERSION.to_string())),
            taxonomies: taxonomies.iter().map(|t| t.to_string()).collect(),
            terms: taxonomies.iter().map(|t| (t.to_string(), Vec::new())).collect(),
            next_id: 100,
            ..State::default()
        };
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn with_term(self, taxonomy: &str, id: &str, name: &str, slug: &str, parent: &str) -> Self {
        self.state
            .borrow_mut()
            .terms
            .entry(taxonomy.to_string())
            .or_default()
            .push(RemoteTerm {
                term_id: TermId::from(id),
                taxonomy: taxonomy.to_string(),
                name: name.to_string(),
                slug: slug.to_string(),
                parent: TermId::from(parent),
                description: None,
            });
        self
    }

    /// Remote resource whose manifest entry matches `bytes`.
    pub fn with_resource(self, path: &str, bytes: &[u8]) -> Self {
        self.state
            .borrow_mut()
            .resources
            .insert(path.to_string(), fingerprint::fingerprint(bytes));
        self
    }

    pub fn with_version(self, version: &str) -> Self {
        self.state.borrow_mut().version = Some(Ok(version.to_string()));
        self
    }

    /// `gw.getVersion` answers with a fault carrying `code`.
    pub fn with_version_fault(self, code: i64) -> Self {
        self.state.borrow_mut().version = Some(Err(code));
        self
    }

    /// Every call to `method` fails with a permission fault.
    pub fn failing_on(self, method: &'static str) -> Self {
        self.state.borrow_mut().fail_on = Some(method);
        self
    }

    /// Every call fails as if nothing listened at the endpoint.
    pub fn refusing(self) -> Self {
        self.state.borrow_mut().refused = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn terms(&self, taxonomy: &str) -> Vec<RemoteTerm> {
        self.state
            .borrow()
            .terms
            .get(taxonomy)
            .cloned()
            .unwrap_or_default()
    }

    pub fn resources(&self) -> ResourceManifest {
        self.state.borrow().resources.clone()
    }

    fn record(&self, call: Call) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        let method = call.method();
        state.calls.push(call);
        if state.refused {
            return Err(RemoteError::ConnectionRefused {
                endpoint: "http://127.0.0.1:9/xmlrpc.php".to_string(),
            });
        }
        if state.fail_on == Some(method) {
            return Err(RemoteError::Fault {
                code: 403,
                message: "Sorry, you are not allowed to do that.".to_string(),
            });
        }
        Ok(())
    }
}

fn fault(message: &str) -> RemoteError {
    RemoteError::Fault {
        code: 500,
        message: message.to_string(),
    }
}

impl ContentStore for MemoryStore {
    fn get_version(&self) -> Result<String, RemoteError> {
        self.record(Call::GetVersion)?;
        match self.state.borrow().version.clone() {
            Some(Ok(version)) => Ok(version),
            Some(Err(code)) => Err(RemoteError::Fault {
                code,
                message: "version lookup failed".to_string(),
            }),
            None => Err(fault("no version")),
        }
    }

    fn get_taxonomies(&self) -> Result<Vec<RemoteTaxonomy>, RemoteError> {
        self.record(Call::GetTaxonomies)?;
        Ok(self
            .state
            .borrow()
            .taxonomies
            .iter()
            .map(|name| RemoteTaxonomy { name: name.clone() })
            .collect())
    }

    fn get_terms(&self, taxonomy: &str) -> Result<Vec<RemoteTerm>, RemoteError> {
        self.record(Call::GetTerms(taxonomy.to_string()))?;
        Ok(self.terms(taxonomy))
    }

    fn new_term(&self, term: &TermPayload) -> Result<TermId, RemoteError> {
        self.record(Call::NewTerm {
            taxonomy: term.taxonomy.clone(),
            slug: term.slug.clone(),
            parent: term.parent.as_ref().map(|p| p.0.clone()),
        })?;

        let mut state = self.state.borrow_mut();
        let parent = term.parent.clone().unwrap_or_else(TermId::root);
        let terms = state
            .terms
            .get(&term.taxonomy)
            .ok_or_else(|| fault("Invalid taxonomy."))?;
        if !parent.is_root() && !terms.iter().any(|t| t.term_id == parent) {
            return Err(fault("Parent term does not exist."));
        }

        state.next_id += 1;
        let id = TermId(state.next_id.to_string());
        state
            .terms
            .entry(term.taxonomy.clone())
            .or_default()
            .push(RemoteTerm {
                term_id: id.clone(),
                taxonomy: term.taxonomy.clone(),
                name: term.name.clone(),
                slug: term.slug.clone(),
                parent,
                description: term.description.clone(),
            });
        Ok(id)
    }

    fn edit_term(&self, term_id: &TermId, term: &TermPayload) -> Result<(), RemoteError> {
        self.record(Call::EditTerm {
            id: term_id.0.clone(),
            slug: term.slug.clone(),
        })?;

        let mut state = self.state.borrow_mut();
        let existing = state
            .terms
            .get_mut(&term.taxonomy)
            .and_then(|terms| terms.iter_mut().find(|t| &t.term_id == term_id))
            .ok_or_else(|| fault("Invalid term ID."))?;
        existing.name = term.name.clone();
        existing.slug = term.slug.clone();
        existing.parent = term.parent.clone().unwrap_or_else(TermId::root);
        if term.description.is_some() {
            existing.description = term.description.clone();
        }
        Ok(())
    }

    fn delete_term(&self, taxonomy: &str, term_id: &TermId) -> Result<(), RemoteError> {
        self.record(Call::DeleteTerm {
            taxonomy: taxonomy.to_string(),
            id: term_id.0.clone(),
        })?;

        let mut state = self.state.borrow_mut();
        let terms = state
            .terms
            .get_mut(taxonomy)
            .ok_or_else(|| fault("Invalid taxonomy."))?;
        if terms.iter().any(|t| &t.parent == term_id) {
            return Err(fault("Term still has children."));
        }
        terms.retain(|t| &t.term_id != term_id);
        Ok(())
    }

    fn get_resources(&self) -> Result<ResourceManifest, RemoteError> {
        self.record(Call::GetResources)?;
        Ok(self.resources())
    }

    fn add_resource(&self, path: &str, content_base64: &str) -> Result<String, RemoteError> {
        self.record(Call::AddResource(path.to_string()))?;
        let checksum = fingerprint::checksum(content_base64);
        self.state
            .borrow_mut()
            .resources
            .insert(path.to_string(), checksum.clone());
        Ok(checksum)
    }

    fn delete_resource(&self, path: &str) -> Result<(), RemoteError> {
        self.record(Call::DeleteResource(path.to_string()))?;
        self.state.borrow_mut().resources.remove(path);
        Ok(())
    }
}

pub fn definitions(json: &str) -> TaxonomyDefinitions {
    serde_json::from_str(json).expect("parse definitions")
}

pub fn site(dir: &Path) -> SiteConfig {
    SiteConfig {
        target: Some("test".to_string()),
        url: "http://localhost".to_string(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        blog_id: 0,
        timeout: Duration::from_secs(5),
        dir: dir.to_path_buf(),
    }
}
