//! Blocking REST client for the BMM API.
//!
//! Paths are rendered from `leon` templates against the client's base URL.
//! The organization and bearer token can change during a session (`org set`,
//! `login`), so both sit behind `RefCell`s and the client is shared by
//! reference.

use std::cell::RefCell;
use std::collections::HashMap;

use leon::Template;
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::projection::project;
use crate::resource::{NamedItem, ResourceKind, Scope};

const COLLECTION_PATH: &str = "/v2/org/{org}/{api}/{resource}";
const ITEM_PATH: &str = "/v2/org/{org}/{api}/{resource}/{id}";

/// Items requested per list page
pub const PAGE_SIZE: usize = 100;
/// Upper bound on pages fetched for one list
pub const MAX_PAGES: usize = 1000;

#[derive(Deserialize)]
struct PaginationHeader {
    #[serde(default)]
    total: usize,
}

/// Whether a list fetch is complete after a page of `page_len` items.
///
/// `pagination` is the raw `X-Pagination` header, whose `total` ends the
/// fetch once `collected` reaches it.
pub fn is_last_page(collected: usize, page_len: usize, pagination: Option<&str>) -> bool {
    let total = pagination
        .and_then(|raw| serde_json::from_str::<PaginationHeader>(raw).ok())
        .map_or(0, |p| p.total);

    (total > 0 && collected >= total) || page_len < PAGE_SIZE
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    api_name: String,
    org: RefCell<String>,
    token: RefCell<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str, org: &str, api_name: &str, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_name: api_name.to_string(),
            org: RefCell::new(org.to_string()),
            token: RefCell::new(token.filter(|t| !t.is_empty())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn org(&self) -> String {
        self.org.borrow().clone()
    }

    pub fn set_org(&self, org: &str) {
        info!("Switching organization to `{org}`");
        *self.org.borrow_mut() = org.to_string();
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn set_token(&self, token: &str) {
        *self.token.borrow_mut() = Some(token.to_string()).filter(|t| !t.is_empty());
    }

    fn render_path(&self, template: &str, resource: &str, id: Option<&str>) -> Result<String> {
        let org = self.org();
        if org.is_empty() {
            return Err(Error::MissingOrg);
        }

        let mut context: HashMap<String, String> = HashMap::new();
        context.insert("org".to_string(), org);
        context.insert("api".to_string(), self.api_name.clone());
        context.insert("resource".to_string(), resource.to_string());
        if let Some(id) = id {
            context.insert("id".to_string(), id.to_string());
        }

        let template = Template::parse(template)?;
        Ok(template.render(&context)?)
    }

    /// `/v2/org/{org}/{api}/{resource}` for the current organization.
    pub fn collection_path(&self, resource: &str) -> Result<String> {
        self.render_path(COLLECTION_PATH, resource, None)
    }

    pub fn item_path(&self, resource: &str, id: &str) -> Result<String> {
        self.render_path(ITEM_PATH, resource, Some(id))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    fn get_json(&self, path: &str) -> Result<Value> {
        debug!("GET {path}");
        let response = self.send(self.http.get(format!("{}{path}", self.base_url)))?;
        Ok(response.json()?)
    }

    /// Every object of a list endpoint, following pagination.
    ///
    /// A page that is not a JSON array ends the fetch with what was
    /// collected so far.
    pub fn fetch_all(&self, resource: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, self.collection_path(resource)?);
        let mut all = Vec::new();

        for page in 1..=MAX_PAGES {
            debug!("GET {url} page {page}");
            let request = self
                .http
                .get(&url)
                .query(query)
                .query(&[("pageSize", PAGE_SIZE.to_string()), ("pageNumber", page.to_string())]);
            let response = self.send(request)?;

            let pagination = response
                .headers()
                .get("X-Pagination")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string);

            let Ok(Value::Array(items)) = response.json::<Value>() else {
                debug!("Non-array page from {url}, stopping");
                break;
            };

            let page_len = items.len();
            all.extend(items);
            if is_last_page(all.len(), page_len, pagination.as_deref()) {
                break;
            }
        }

        debug!("Fetched {} {resource} object(s)", all.len());
        Ok(all)
    }

    /// Lists `kind` under `scope` and projects the results.
    pub fn list(&self, kind: ResourceKind, scope: &Scope) -> Result<Vec<NamedItem>> {
        let query = scope.query_params(kind);
        Ok(self
            .fetch_all(kind.as_str(), &query)?
            .into_iter()
            .map(|value| project(kind, value))
            .collect())
    }

    pub fn get(&self, kind: ResourceKind, id: &str) -> Result<Value> {
        self.get_json(&self.item_path(kind.as_str(), id)?)
    }

    /// GET on a singleton path under the organization, e.g. `tenant/current`.
    pub fn get_path(&self, resource: &str) -> Result<Value> {
        self.get_json(&self.collection_path(resource)?)
    }

    pub fn create(&self, kind: ResourceKind, body: &Value) -> Result<Value> {
        let path = self.collection_path(kind.as_str())?;
        debug!("POST {path}");
        let response = self.send(
            self.http
                .post(format!("{}{path}", self.base_url))
                .json(body),
        )?;
        Ok(response.json().unwrap_or(Value::Null))
    }

    pub fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let path = self.item_path(kind.as_str(), id)?;
        debug!("DELETE {path}");
        self.send(self.http.delete(format!("{}{path}", self.base_url)))?;
        Ok(())
    }
}
