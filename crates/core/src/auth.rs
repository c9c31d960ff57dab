//! Token acquisition and inspection.
//!
//! Supports the OIDC password grant and the API-key exchange, plus reading
//! the organizations a token grants access to. Signatures are not verified.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{ApiKeyConfig, ConfigFile, LoginMethod, OidcConfig};
use crate::error::{Error, Result};

/// Credentials for an OIDC password grant.
pub struct PasswordGrant<'a> {
    pub token_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

impl<'a> PasswordGrant<'a> {
    /// Grant parameters from `config`, with the user's credentials supplied.
    pub fn from_config(config: &'a OidcConfig, username: &'a str, password: &'a str) -> Self {
        Self {
            token_url: config.token_url.as_deref().unwrap_or_default(),
            client_id: config.client_id.as_deref().unwrap_or_default(),
            client_secret: config.client_secret.as_deref().unwrap_or_default(),
            username,
            password,
        }
    }
}

fn read_body(response: reqwest::blocking::Response) -> Result<String> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(Error::Login(format!(
            "authentication failed (HTTP {}): {}",
            status.as_u16(),
            body.trim()
        )));
    }
    Ok(body)
}

/// Performs an OIDC password grant and returns the access token.
///
/// # Errors
///
/// Returns an error if the request fails, the provider rejects the
/// credentials, or the response carries no token.
pub fn oidc_login(http: &Client, grant: &PasswordGrant<'_>) -> Result<String> {
    info!("Requesting OIDC token from {}", grant.token_url);
    let form = [
        ("grant_type", "password"),
        ("client_id", grant.client_id),
        ("client_secret", grant.client_secret),
        ("username", grant.username),
        ("password", grant.password),
    ];
    let body = read_body(http.post(grant.token_url).form(&form).send()?)?;
    extract_token(&body).ok_or_else(|| Error::Login("no access token in response".to_string()))
}

/// Exchanges an API key for a bearer token.
///
/// # Errors
///
/// Returns an error if the key is missing, the request fails or is rejected,
/// or the response carries no token.
pub fn api_key_login(http: &Client, config: &ApiKeyConfig) -> Result<String> {
    let authn_url = config.authn_url.as_deref().unwrap_or_default();
    let key = config
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(Error::LoginUnavailable)?;

    info!("Exchanging API key at {authn_url}");
    let response = http
        .get(authn_url)
        .header("Authorization", format!("ApiKey {key}"))
        .header("Accept", "application/json")
        .send()?;
    let body = read_body(response)?;
    extract_token(&body).ok_or_else(|| Error::Login("no token in response".to_string()))
}

/// Logs in with the method `config` provides, preferring OIDC.
///
/// OIDC credentials missing from the config are asked for through
/// `ask(label, secret)`.
///
/// # Errors
///
/// Returns [`Error::LoginUnavailable`] when no method is configured, or the
/// error of the chosen flow.
pub fn login<F>(config: &ConfigFile, mut ask: F) -> Result<(LoginMethod, String)>
where
    F: FnMut(&str, bool) -> Result<String>,
{
    let method = config.login_method().ok_or(Error::LoginUnavailable)?;
    let http = Client::new();

    let token = match method {
        LoginMethod::Oidc => {
            let oidc = config.auth.oidc.as_ref().ok_or(Error::LoginUnavailable)?;
            let username = match oidc.username.as_deref().filter(|u| !u.is_empty()) {
                Some(username) => username.to_string(),
                None => ask("Username", false)?,
            };
            let password = match oidc.password.as_deref().filter(|p| !p.is_empty()) {
                Some(password) => password.to_string(),
                None => ask("Password", true)?,
            };
            oidc_login(&http, &PasswordGrant::from_config(oidc, &username, &password))?
        }
        LoginMethod::ApiKey => {
            let api_key = config.auth.api_key.as_ref().ok_or(Error::LoginUnavailable)?;
            api_key_login(&http, api_key)?
        }
    };

    info!("Obtained token via {method:?}");
    Ok((method, token))
}

/// Token from a JSON body, trying `token` before `access_token`.
pub fn extract_token(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["token", "access_token"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
struct AccessClaim {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    access: Vec<AccessClaim>,
}

/// Organization names granted by a JWT's `access` claims.
///
/// Only claims whose type starts with `group/ngc` count; duplicates are
/// dropped and order is kept. Anything undecodable yields an empty list.
pub fn orgs_from_jwt(token: &str) -> Vec<String> {
    let parts: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = parts.as_slice() else {
        debug!("Token is not a JWT");
        return Vec::new();
    };

    let decoded = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Could not decode token payload: {e}");
            return Vec::new();
        }
    };

    let Ok(claims) = serde_json::from_slice::<Claims>(&decoded) else {
        warn!("Token payload is not valid claims JSON");
        return Vec::new();
    };

    let mut orgs: Vec<String> = Vec::new();
    for claim in claims.access {
        if claim.kind.starts_with("group/ngc") && !claim.name.is_empty() && !orgs.contains(&claim.name)
        {
            orgs.push(claim.name);
        }
    }
    orgs
}
