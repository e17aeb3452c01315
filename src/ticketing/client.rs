//! REST implementation of the ticketing gateway
//!
//! Speaks the backend's session-token protocol: every request carries the
//! application token, and all operations except `initSession` also carry the
//! session token obtained from it.

use super::{
    BackendToken, BackendUser, BackendUserId, Followup, GatewayError, GatewayResult, NewTicket,
    TicketDetail, TicketId, TicketSummary, TicketingGateway,
};
use crate::config::STATUS_SOLVED;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const APP_TOKEN_HEADER: &str = "App-Token";
const SESSION_TOKEN_HEADER: &str = "Session-Token";

// Search-engine field ids used by the backend's generic search endpoint.
const USER_FIELD_ID: &str = "2";
const USER_FIELD_FIRST_NAME: &str = "9";
const USER_FIELD_REAL_NAME: &str = "34";
const TICKET_FIELD_ID: &str = "2";
const TICKET_FIELD_TITLE: &str = "1";
const TICKET_FIELD_STATUS: &str = "12";

/// Gateway backed by the backend's REST API.
pub struct RestTicketing {
    client: Client,
    base_url: String,
    app_token: String,
    user_token: String,
}

impl RestTicketing {
    pub fn new(base_url: &str, app_token: &str, user_token: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_token: app_token.to_string(),
            user_token: user_token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn check(&self, response: Response) -> GatewayResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let message = format!("backend returned {status}: {}", truncate(body, 200));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::auth(message),
        _ => GatewayError::api(message),
    }
}

fn network_error(err: reqwest::Error) -> GatewayError {
    GatewayError::network(format!("backend request failed: {err}"))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Read a numeric value that the search endpoint may encode as a number or a
/// string.
fn field_as_u64(row: &Value, key: &str) -> Option<u64> {
    match row.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_as_i64(row: &Value, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_as_str<'a>(row: &'a Value, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

#[derive(Debug, Deserialize)]
struct InitSessionResponse {
    session_token: String,
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    totalcount: u64,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TicketRow {
    status: i64,
    #[serde(default)]
    content: String,
    date_creation: String,
    date_mod: String,
}

#[derive(Debug, Deserialize)]
struct FollowupRow {
    #[serde(default)]
    content: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: TicketId,
}

#[async_trait]
impl TicketingGateway for RestTicketing {
    async fn open_session(&self) -> GatewayResult<BackendToken> {
        let response = self
            .client
            .get(self.url("initSession"))
            .header("Authorization", format!("user_token {}", self.user_token))
            .header(APP_TOKEN_HEADER, &self.app_token)
            .send()
            .await
            .map_err(network_error)?;

        let body: InitSessionResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::api(format!("unreadable session response: {e}")))?;

        Ok(BackendToken(body.session_token))
    }

    async fn close_session(&self, token: &BackendToken) {
        let result = self
            .client
            .get(self.url("killSession"))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .send()
            .await;

        if let Err(e) = result {
            tracing::debug!(error = %e, "Ignoring failure to close backend session");
        }
    }

    async fn search_user_by_address(
        &self,
        token: &BackendToken,
        address: &str,
    ) -> GatewayResult<Option<BackendUser>> {
        let response = self
            .client
            .get(self.url("search/User"))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .query(&[
                ("criteria[0][field]", "5"),
                ("criteria[0][searchtype]", "contains"),
                ("criteria[0][value]", address),
                ("forcedisplay[0]", USER_FIELD_ID),
                ("forcedisplay[1]", USER_FIELD_FIRST_NAME),
                ("forcedisplay[2]", USER_FIELD_REAL_NAME),
            ])
            .send()
            .await
            .map_err(network_error)?;

        let body: SearchResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::api(format!("unreadable user search response: {e}")))?;

        if body.totalcount == 0 {
            return Ok(None);
        }

        let row = body
            .data
            .first()
            .ok_or_else(|| GatewayError::api("user search reported matches but sent no rows"))?;
        let id = field_as_u64(row, USER_FIELD_ID)
            .ok_or_else(|| GatewayError::api("user search row is missing the id field"))?;

        let display_name = [
            field_as_str(row, USER_FIELD_FIRST_NAME).unwrap_or(""),
            field_as_str(row, USER_FIELD_REAL_NAME).unwrap_or(""),
        ]
        .join(" ")
        .trim()
        .to_string();

        Ok(Some(BackendUser { id, display_name }))
    }

    async fn search_tickets_by_requester(
        &self,
        token: &BackendToken,
        user_id: BackendUserId,
    ) -> GatewayResult<Vec<TicketSummary>> {
        let user_id = user_id.to_string();
        let response = self
            .client
            .get(self.url("search/Ticket"))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .query(&[
                ("criteria[0][field]", "4"),
                ("criteria[0][searchtype]", "equals"),
                ("criteria[0][value]", user_id.as_str()),
                ("forcedisplay[0]", TICKET_FIELD_ID),
                ("forcedisplay[1]", TICKET_FIELD_TITLE),
                ("forcedisplay[2]", TICKET_FIELD_STATUS),
                ("range", "0-50"),
            ])
            .send()
            .await
            .map_err(network_error)?;

        let body: SearchResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::api(format!("unreadable ticket search response: {e}")))?;

        let tickets = body
            .data
            .iter()
            .filter(|row| field_as_i64(row, TICKET_FIELD_STATUS).is_some_and(|s| s < STATUS_SOLVED))
            .filter_map(|row| {
                Some(TicketSummary {
                    id: field_as_u64(row, TICKET_FIELD_ID)?,
                    title: field_as_str(row, TICKET_FIELD_TITLE)?.to_string(),
                })
            })
            .collect();

        Ok(tickets)
    }

    async fn get_ticket_detail(
        &self,
        token: &BackendToken,
        id: TicketId,
    ) -> GatewayResult<TicketDetail> {
        let response = self
            .client
            .get(self.url(&format!("Ticket/{id}")))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .send()
            .await
            .map_err(network_error)?;

        let row: TicketRow = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::api(format!("unreadable ticket detail: {e}")))?;

        Ok(TicketDetail {
            status: row.status,
            content: row.content,
            created_at: row.date_creation,
            updated_at: row.date_mod,
        })
    }

    async fn list_followups(
        &self,
        token: &BackendToken,
        id: TicketId,
    ) -> GatewayResult<Vec<Followup>> {
        let response = self
            .client
            .get(self.url(&format!("Ticket/{id}/TicketFollowup")))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .send()
            .await
            .map_err(network_error)?;

        let rows: Vec<FollowupRow> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::api(format!("unreadable followup list: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| Followup {
                content: row.content,
                created_at: row.date,
            })
            .collect())
    }

    async fn create_ticket(
        &self,
        token: &BackendToken,
        ticket: &NewTicket,
    ) -> GatewayResult<TicketId> {
        let mut input = json!({
            "name": ticket.name,
            "content": ticket.content,
            "requesttypes_id": 1,
            "urgency": 3,
            "itilcategories_id": ticket.category_id,
        });
        if let Some(requester) = ticket.requester {
            input["_users_id_requester"] = json!(requester);
        }

        let response = self
            .client
            .post(self.url("Ticket"))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(network_error)?;

        let created: CreatedResponse = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::api(format!("unreadable creation response: {e}")))?;

        Ok(created.id)
    }

    async fn close_ticket(&self, token: &BackendToken, id: TicketId) -> GatewayResult<()> {
        let response = self
            .client
            .put(self.url(&format!("Ticket/{id}")))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .json(&json!({ "input": { "status": crate::config::STATUS_CLOSED } }))
            .send()
            .await
            .map_err(network_error)?;

        self.check(response).await.map(|_| ())
    }

    async fn add_followup(
        &self,
        token: &BackendToken,
        id: TicketId,
        content: &str,
    ) -> GatewayResult<()> {
        let payload = json!({
            "input": {
                "items_id": id,
                "itemtype": "Ticket",
                "content": content,
                "is_private": 0,
            }
        });

        let response = self
            .client
            .post(self.url("TicketFollowup"))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .json(&payload)
            .send()
            .await
            .map_err(network_error)?;

        self.check(response).await.map(|_| ())
    }

    async fn upload_document(
        &self,
        token: &BackendToken,
        id: TicketId,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> GatewayResult<()> {
        let manifest = json!({
            "input": {
                "name": file_name,
                "_filename": [file_name],
                "itemtype": "Ticket",
                "items_id": id,
            }
        });

        let manifest_part = reqwest::multipart::Part::text(manifest.to_string())
            .mime_str("application/json")
            .map_err(|e| GatewayError::api(format!("bad manifest part: {e}")))?;
        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| GatewayError::api(format!("bad attachment mime {mime}: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("uploadManifest", manifest_part)
            .part(file_name.to_string(), file_part);

        let response = self
            .client
            .post(self.url("Document"))
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .header(APP_TOKEN_HEADER, &self.app_token)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        self.check(response).await.map(|_| ())
    }
}
