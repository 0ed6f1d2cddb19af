//! HTTP client for the MOPS material-information API (`t05st02`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use mopswatch_core::{Announcement, DateKey};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, COOKIE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::session::Credentials;
use crate::source::{DisclosureSource, TransientFetchError};

/// Path of the daily announcement query endpoint.
pub const QUERY_PATH: &str = "/mops/api/t05st02";

pub(crate) const USER_AGENT: &str = "Mozilla/5.0";

/// Payload `code` that marks a successful query.
const API_OK: i64 = 200;

/// HTTP client for the daily announcement endpoint.
pub struct MopsClient {
    client: reqwest::Client,
    endpoint: String,
}

/// Request body for one day.
#[derive(Debug, Serialize, PartialEq)]
struct QueryPayload {
    year: String,
    month: String,
    day: String,
    #[serde(rename = "TYPEK")]
    typek: &'static str,
    #[serde(rename = "encodeURIComponent")]
    encode_uri_component: u8,
}

impl QueryPayload {
    fn for_date(date: DateKey) -> Self {
        Self {
            year: date.era_year.to_string(),
            month: format!("{:02}", date.month),
            day: format!("{:02}", date.day),
            typek: "all",
            encode_uri_component: 1,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    code: Option<i64>,
    result: Option<EnvelopeResult>,
}

#[derive(Deserialize)]
struct EnvelopeResult {
    data: Option<Vec<Vec<Value>>>,
}

impl MopsClient {
    /// Create a client for the portal at `base_url` (e.g. `https://mops.twse.com.tw`).
    ///
    /// `timeout` bounds each request, connect included.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), QUERY_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DisclosureSource for MopsClient {
    async fn query(
        &self,
        date: DateKey,
        credentials: &Credentials,
    ) -> Result<Vec<Announcement>, TransientFetchError> {
        let payload = QueryPayload::for_date(date);

        let request_start = Instant::now();
        let mut req = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&payload);
        if !credentials.is_empty() {
            req = req.header(COOKIE, credentials.cookie_header());
        }
        let resp = req.send().await.map_err(classify)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(classify)?;
        let request_time = request_start.elapsed();

        if status != StatusCode::OK {
            if status == StatusCode::BAD_GATEWAY {
                warn!(date = %date, "502 Bad Gateway, upstream temporarily unavailable");
            }
            return Err(TransientFetchError::Http(status.as_u16()));
        }

        let decode_start = Instant::now();
        let envelope: Envelope = serde_json::from_slice(&body)
            .map_err(|e| TransientFetchError::Decode(e.to_string()))?;
        match envelope.code {
            Some(API_OK) => {}
            Some(code) => return Err(TransientFetchError::Api(code)),
            None => {
                return Err(TransientFetchError::Decode(
                    "response has no code field".into(),
                ));
            }
        }

        let rows = envelope.result.and_then(|r| r.data).unwrap_or_default();
        let total = rows.len();
        let announcements: Vec<Announcement> = rows
            .iter()
            .filter_map(|row| {
                let fields: Vec<String> = row.iter().map(field_text).collect();
                Announcement::from_fields(&fields)
            })
            .collect();

        debug!(
            date = %date,
            request_ms = request_time.as_millis() as u64,
            decode_ms = decode_start.elapsed().as_millis() as u64,
            rows = total,
            qualifying = announcements.len(),
            "query complete"
        );
        Ok(announcements)
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map a transport error onto the retry taxonomy.
fn classify(err: reqwest::Error) -> TransientFetchError {
    if err.is_timeout() {
        if err.is_connect() {
            TransientFetchError::ConnectTimeout
        } else {
            TransientFetchError::ReadTimeout
        }
    } else if err.is_connect() {
        TransientFetchError::Connection(err.to_string())
    } else if err.is_decode() || err.is_body() {
        TransientFetchError::Decode(err.to_string())
    } else {
        TransientFetchError::Other(err.to_string())
    }
}
