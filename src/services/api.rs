//! Back-office REST API client
//!
//! Blocking `reqwest` client with bearer-token auth. List responses go
//! through the same boundary validation as snapshot files. A 401 drops the
//! session token so later calls fail fast until the user logs in again.

use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::services::store::Snapshot;
use crate::services::validator::{parse_clients, parse_policies};
use crate::types::{
    BrokerstatError, Client, ClientStatus, Policy, PolicyStatus, RecordId, Result,
};

const CLIENTS: &str = "clients";
const POLICIES: &str = "policies";

/// Bearer token for the current login
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.token.is_some()
    }

    pub fn invalidate(&mut self) {
        self.token = None;
    }
}

/// Client fields as the API expects them on writes (snake_case keys)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_status: Option<ClientStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_reporting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_currency: Option<String>,
}

impl From<&Client> for ClientDraft {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            legal_name: client.legal_name.clone(),
            inn: client.inn.clone(),
            industry: client.industry.clone(),
            region: client.region.clone(),
            country: client.country.clone(),
            city: client.city.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            client_status: client.client_status.clone(),
            revenue: client.revenue,
            revenue_currency: client.revenue_currency.clone(),
            credit_limit: client.credit_limit,
            limit_currency: client.limit_currency.clone(),
            ..Default::default()
        }
    }
}

/// Policy fields for writes. The policy endpoint takes camelCase as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<chrono::NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_premium: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_amount_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PolicyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underwriter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&Policy> for PolicyDraft {
    fn from(policy: &Policy) -> Self {
        Self {
            client: policy.client,
            creation_date: policy.creation_date,
            premium: policy.premium,
            net_premium: policy.net_premium,
            premium_currency: policy.premium_currency.clone(),
            insurance_amount: policy.insurance_amount,
            insurance_amount_currency: policy.insurance_amount_currency.clone(),
            rate: policy.rate,
            status: policy.status.clone(),
            underwriter: policy.underwriter.clone(),
            coverage_type: policy.coverage_type.clone(),
            insurance_term: policy.insurance_term.clone(),
            notes: policy.notes.clone(),
        }
    }
}

pub struct ApiClient {
    base_url: String,
    http: HttpClient,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerstatError::Network(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session: Session::new(token),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url, config.token.clone(), config.timeout)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `{base}/clients/` or `{base}/clients/{id}/`
    fn endpoint(&self, collection: &str, id: Option<RecordId>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}/", self.base_url, collection, id),
            None => format!("{}/{}/", self.base_url, collection),
        }
    }

    // ========== clients ==========

    pub fn list_clients(&mut self) -> Result<Vec<Client>> {
        let url = self.endpoint(CLIENTS, None);
        let body: Value = self.send_json(self.http.get(&url))?;
        let clients = parse_clients(&body)?;
        debug!(count = clients.len(), "fetched clients");
        Ok(clients)
    }

    pub fn create_client(&mut self, draft: &ClientDraft) -> Result<Client> {
        let url = self.endpoint(CLIENTS, None);
        self.send_json(self.http.post(&url).json(draft))
    }

    pub fn update_client(&mut self, id: RecordId, draft: &ClientDraft) -> Result<Client> {
        let url = self.endpoint(CLIENTS, Some(id));
        self.send_json(self.http.put(&url).json(draft))
    }

    pub fn delete_client(&mut self, id: RecordId) -> Result<()> {
        let url = self.endpoint(CLIENTS, Some(id));
        self.send(self.http.delete(&url))?;
        Ok(())
    }

    // ========== policies ==========

    pub fn list_policies(&mut self) -> Result<Vec<Policy>> {
        let url = self.endpoint(POLICIES, None);
        let body: Value = self.send_json(self.http.get(&url))?;
        let policies = parse_policies(&body)?;
        debug!(count = policies.len(), "fetched policies");
        Ok(policies)
    }

    pub fn create_policy(&mut self, draft: &PolicyDraft) -> Result<Policy> {
        let url = self.endpoint(POLICIES, None);
        self.send_json(self.http.post(&url).json(draft))
    }

    pub fn update_policy(&mut self, id: RecordId, draft: &PolicyDraft) -> Result<Policy> {
        let url = self.endpoint(POLICIES, Some(id));
        self.send_json(self.http.put(&url).json(draft))
    }

    pub fn delete_policy(&mut self, id: RecordId) -> Result<()> {
        let url = self.endpoint(POLICIES, Some(id));
        self.send(self.http.delete(&url))?;
        Ok(())
    }

    /// Fetch both collections. Either failure fails the whole snapshot.
    pub fn fetch_snapshot(&mut self) -> Result<Snapshot> {
        let clients = self.list_clients()?;
        let policies = self.list_policies()?;
        Ok(Snapshot::new(clients, policies))
    }

    // ========== transport ==========

    fn send_json<T: DeserializeOwned>(&mut self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request)?;
        response
            .json::<T>()
            .map_err(|e| BrokerstatError::Parse(format!("Invalid API response: {}", e)))
    }

    fn send(&mut self, request: RequestBuilder) -> Result<Response> {
        let Some(token) = self.session.token() else {
            return Err(BrokerstatError::Unauthorized);
        };

        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|e| BrokerstatError::Network(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "api response");

        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!("session token rejected, invalidating session");
            self.session.invalidate();
            return Err(BrokerstatError::Unauthorized);
        }

        let path = response.url().path().to_string();
        let body = response.text().unwrap_or_default();
        Err(status_error(status.as_u16(), &path, &body))
    }
}

/// Map a non-success, non-401 status to an error.
fn status_error(status: u16, path: &str, body: &str) -> BrokerstatError {
    match status {
        401 => BrokerstatError::Unauthorized,
        403 => BrokerstatError::PermissionDenied,
        404 => BrokerstatError::NotFound(path.to_string()),
        s if s >= 500 => BrokerstatError::Server(s),
        s => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| format!("HTTP {}", s));
            BrokerstatError::Api(message)
        }
    }
}

/// Human-readable message from an API error body: `detail`, `message`,
/// the first `non_field_errors` entry, or the first field error.
fn error_message(body: &Value) -> Option<String> {
    let map = body.as_object()?;

    for key in ["detail", "message", "non_field_errors"] {
        if let Some(msg) = map.get(key).and_then(first_text) {
            return Some(msg);
        }
    }

    map.iter()
        .find_map(|(field, value)| first_text(value).map(|msg| format!("{}: {}", field, msg)))
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned HTTP response on a random local port.
    fn serve_once(status_line: &str, body: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
        });

        format!("http://{}/api", addr)
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Some("secret".into()), Duration::from_secs(5)).unwrap()
    }

    // ========== error mapping ==========

    #[test]
    fn test_error_message_detail() {
        let body = json!({"detail": "Недостаточно прав"});
        assert_eq!(error_message(&body).as_deref(), Some("Недостаточно прав"));
    }

    #[test]
    fn test_error_message_non_field_errors() {
        let body = json!({"non_field_errors": ["Дубликат полиса"]});
        assert_eq!(error_message(&body).as_deref(), Some("Дубликат полиса"));
    }

    #[test]
    fn test_error_message_field_error() {
        let body = json!({"inn": ["ИНН уже существует"]});
        assert_eq!(
            error_message(&body).as_deref(),
            Some("inn: ИНН уже существует")
        );
    }

    #[test]
    fn test_error_message_unusable_body() {
        assert_eq!(error_message(&json!([1, 2])), None);
        assert_eq!(error_message(&json!({"inn": []})), None);
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(403, "/", ""),
            BrokerstatError::PermissionDenied
        ));
        assert!(matches!(
            status_error(404, "/api/clients/9/", ""),
            BrokerstatError::NotFound(p) if p == "/api/clients/9/"
        ));
        assert!(matches!(status_error(502, "/", ""), BrokerstatError::Server(502)));
        assert!(matches!(
            status_error(400, "/", r#"{"message": "bad premium"}"#),
            BrokerstatError::Api(m) if m == "bad premium"
        ));
        assert!(matches!(
            status_error(409, "/", "<html>"),
            BrokerstatError::Api(m) if m == "HTTP 409"
        ));
    }

    // ========== drafts ==========

    #[test]
    fn test_client_draft_uses_snake_case() {
        let client = Client {
            id: 4,
            name: "Orient".into(),
            legal_name: Some("ООО Ориент".into()),
            client_status: Some(ClientStatus::Vip),
            credit_limit: Some(1000.0),
            limit_currency: Some("USD".into()),
            ..Default::default()
        };

        let value = serde_json::to_value(ClientDraft::from(&client)).unwrap();

        assert_eq!(value["legal_name"], "ООО Ориент");
        assert_eq!(value["client_status"], "vip");
        assert_eq!(value["credit_limit"], 1000.0);
        assert_eq!(value["limit_currency"], "USD");
        assert!(value.get("legalName").is_none());
        assert!(value.get("inn").is_none());
    }

    #[test]
    fn test_policy_draft_uses_camel_case() {
        let policy = Policy {
            id: 1,
            client: Some(3),
            creation_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1),
            net_premium: Some(90.0),
            status: Some(PolicyStatus::Pending),
            ..Default::default()
        };

        let value = serde_json::to_value(PolicyDraft::from(&policy)).unwrap();

        assert_eq!(value["client"], 3);
        assert_eq!(value["creationDate"], "2024-02-01");
        assert_eq!(value["netPremium"], 90.0);
        assert_eq!(value["status"], "pending");
    }

    // ========== transport ==========

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let api = client("http://localhost:8000/api/");
        assert_eq!(api.endpoint(CLIENTS, None), "http://localhost:8000/api/clients/");
        assert_eq!(
            api.endpoint(POLICIES, Some(12)),
            "http://localhost:8000/api/policies/12/"
        );
    }

    #[test]
    fn test_no_token_is_unauthorized_without_request() {
        let mut api = ApiClient::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        assert!(matches!(
            api.list_clients(),
            Err(BrokerstatError::Unauthorized)
        ));
    }

    #[test]
    fn test_list_clients_paginated() {
        let base = serve_once(
            "200 OK",
            r#"{"count": 1, "results": [{"id": 1, "name": "Orient"}]}"#,
        );
        let clients = client(&base).list_clients().unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name, "Orient");
    }

    #[test]
    fn test_list_policies_rejects_record_without_id() {
        let base = serve_once("200 OK", r#"[{"premium": 10}]"#);
        let err = client(&base).list_policies().unwrap_err();
        assert!(matches!(err, BrokerstatError::ContractViolation(_)));
    }

    #[test]
    fn test_unauthorized_invalidates_session() {
        let base = serve_once("401 Unauthorized", r#"{"detail": "expired"}"#);
        let mut api = client(&base);

        let err = api.list_clients().unwrap_err();

        assert!(matches!(err, BrokerstatError::Unauthorized));
        assert!(!api.session().is_active());
        // Next call fails locally; no server is listening for it
        assert!(matches!(
            api.list_policies(),
            Err(BrokerstatError::Unauthorized)
        ));
    }

    #[test]
    fn test_validation_error_surfaces_message() {
        let base = serve_once("400 Bad Request", r#"{"inn": ["ИНН уже существует"]}"#);
        let err = client(&base)
            .create_client(&ClientDraft {
                name: "Orient".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, BrokerstatError::Api(m) if m.contains("ИНН")));
    }

    #[test]
    fn test_delete_accepts_no_content() {
        let base = serve_once("204 No Content", "");
        assert!(client(&base).delete_policy(5).is_ok());
    }
}
