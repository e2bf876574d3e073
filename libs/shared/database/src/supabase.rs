use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DatabaseError;

/// Thin PostgREST client. Requests run with the service-role key; access
/// control happens in the cells before any call reaches the database.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );

        Ok(headers)
    }

    /// Headers asking PostgREST to echo the affected rows back.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            let (code, message) = match serde_json::from_str::<Value>(&error_text) {
                Ok(body) => (
                    body.get("code").and_then(Value::as_str).map(str::to_string),
                    body.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| error_text.clone()),
                ),
                Err(_) => (None, error_text),
            };

            return Err(DatabaseError::from_api(status.as_u16(), code, message));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Calls a Postgres function exposed under `/rest/v1/rpc`.
    pub async fn rpc<T>(&self, function: &str, args: Value) -> Result<T, DatabaseError>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, Some(args)).await
    }
}

/// Formats an instant for a PostgREST filter value.
pub fn encode_timestamp(value: &chrono::DateTime<chrono::Utc>) -> String {
    let formatted = value.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
    urlencoding::encode(&formatted).into_owned()
}
