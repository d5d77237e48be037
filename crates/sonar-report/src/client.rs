//! SonarQube API client
//!
//! Single authenticated GET requests mapped onto [`Error`], and page-number
//! pagination on top of them.

use crate::error::{Error, NetworkError};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sonar_report_core::pagination::{page_params, parse_page, PageCursor, PageStep};
use std::time::Duration;

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest body excerpt kept in [`Error::Server`]
const ERROR_BODY_LIMIT: usize = 200;

/// Thin wrapper around the SonarQube REST API
#[derive(Debug, Clone)]
pub struct SonarClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl SonarClient {
    /// Create a client authenticated with `token`
    ///
    /// SonarQube expects HTTP Basic auth with the token as the user name and an
    /// empty password.
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self, Error> {
        use base64::Engine;
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

        let auth_encoded = base64::engine::general_purpose::STANDARD.encode(format!("{token}:"));

        let mut auth_value = HeaderValue::from_str(&format!("Basic {auth_encoded}"))
            .map_err(|e| Error::Client(format!("Invalid header value: {e}")))?;
        auth_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Perform a single GET request and return the parsed JSON body
    ///
    /// # Errors
    /// * [`Error::Authentication`] on HTTP 401
    /// * [`Error::NotFound`] on HTTP 404
    /// * [`Error::Server`] on any other non-2xx status
    /// * [`Error::Network`] on timeout or connection failure
    /// * [`Error::Decode`] when a 2xx body is not JSON
    pub async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let url = self.url(endpoint);
        log::debug!("GET {} {:?}", url, params);

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(&e, &url))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Server {
                status: status.as_u16(),
                url,
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e, &url))?;

        serde_json::from_str(&body).map_err(|e| Error::Decode {
            url,
            message: e.to_string(),
        })
    }

    /// Perform a single GET request and decode the body into `T`
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let body = self.get(endpoint, params).await?;

        serde_json::from_value(body).map_err(|e| Error::Decode {
            url: self.url(endpoint),
            message: e.to_string(),
        })
    }

    /// Fetch every page of a list endpoint and return the items in backend order
    ///
    /// SonarQube paginates with `p` (page number) and `ps` (page size); the item
    /// count is in `paging.total`. `params` must not contain `p` or `ps`.
    ///
    /// Fetching stops once the accumulated count reaches the declared total or a
    /// page comes back empty. A declared total above 10 000 is logged once as a
    /// warning because SonarQube refuses to page that far. Any request failure
    /// aborts the whole fetch.
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        results_key: &str,
    ) -> Result<Vec<T>, Error> {
        let mut results = Vec::new();
        let mut cursor = PageCursor::new();

        loop {
            let body = self.get(endpoint, &page_params(params, cursor.page())).await?;
            let page = parse_page::<T>(body, results_key).map_err(|e| Error::Decode {
                url: self.url(endpoint),
                message: e.to_string(),
            })?;

            let count = page.items.len();
            let total = page.total;
            results.extend(page.items);

            let progress = cursor.record(count, total);
            if let Some(warning) = progress.warning {
                log::warn!("{}", warning);
            }

            match progress.step {
                PageStep::Next(next) => {
                    log::debug!(
                        "{} of {} {} fetched, requesting page {}",
                        cursor.fetched(),
                        total.unwrap_or_default(),
                        results_key,
                        next
                    );
                }
                PageStep::Done => break,
            }
        }

        Ok(results)
    }

    fn transport_error(&self, err: &reqwest::Error, url: &str) -> Error {
        if err.is_timeout() {
            NetworkError::Timeout {
                seconds: self.timeout.as_secs_f64(),
                url: url.to_string(),
            }
            .into()
        } else {
            NetworkError::Unreachable {
                base_url: self.base_url.clone(),
            }
            .into()
        }
    }
}
