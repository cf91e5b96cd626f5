//! HTTP access to the backend.
//!
//! Every call targets `<base_url>/api/<endpoint>` and attaches
//! `Authorization: Bearer <token>` when a token is supplied. There is no
//! retry and no timeout policy; callers decide how to fall back.

use super::error::ApiError;
use crate::config::ClientConfig;
use crate::models::{
    ApiResponse, AuthPayload, CreateReadingRequest, LoginRequest, NewReading, Profile,
    ProfileUpdateRequest, ReadingRecord, RegisterRequest, TokenClaims, User,
};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ApiError>;
    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError>;
    async fn logout(&self, token: &str) -> Result<(), ApiError>;
    async fn verify(&self, token: &str) -> Result<TokenClaims, ApiError>;
    async fn update_profile(&self, token: &str, profile: &Profile) -> Result<User, ApiError>;
    async fn list_readings(&self, token: Option<&str>, user_id: &str) -> Result<Vec<ReadingRecord>, ApiError>;
    async fn create_reading(
        &self,
        token: Option<&str>,
        request: &CreateReadingRequest,
    ) -> Result<ReadingRecord, ApiError>;
    async fn update_reading(
        &self,
        token: Option<&str>,
        reading_id: &str,
        updates: &NewReading,
    ) -> Result<ReadingRecord, ApiError>;
    async fn delete_reading(&self, token: Option<&str>, reading_id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}/api/{}", self.base_url, endpoint);
        debug!(%method, %url, "api call");

        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| ApiError::network(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::new(Some(status.as_u16()), err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&bytes)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or_else(|| {
                    format!(
                        "API call failed: {}",
                        status.canonical_reason().unwrap_or(status.as_str())
                    )
                });
            return Err(ApiError::new(Some(status.as_u16()), message));
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(Some(status.as_u16()), format!("API call failed: {err}")))?;
        if !envelope.success {
            let message = envelope
                .error
                .clone()
                .unwrap_or_else(|| "API call failed".to_string());
            return Err(ApiError::new(Some(status.as_u16()), message));
        }
        Ok(envelope)
    }

    async fn call_data<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + ?Sized + Sync,
    {
        self.call(method, endpoint, query, token, body)
            .await?
            .data
            .ok_or_else(|| ApiError::new(None, "API call failed: response carried no data"))
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        self.call_data(Method::POST, "auth/register", &[], None, Some(request)).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthPayload, ApiError> {
        self.call_data(Method::POST, "auth/login", &[], None, Some(request)).await
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.call::<serde_json::Value, ()>(Method::POST, "auth/logout", &[], Some(token), None)
            .await
            .map(|_| ())
    }

    async fn verify(&self, token: &str) -> Result<TokenClaims, ApiError> {
        self.call_data::<_, ()>(Method::GET, "auth/verify", &[], Some(token), None).await
    }

    async fn update_profile(&self, token: &str, profile: &Profile) -> Result<User, ApiError> {
        let body = ProfileUpdateRequest {
            profile: Some(profile.clone()),
        };
        self.call_data(Method::PUT, "auth/profile", &[], Some(token), Some(&body)).await
    }

    async fn list_readings(&self, token: Option<&str>, user_id: &str) -> Result<Vec<ReadingRecord>, ApiError> {
        let endpoint = format!("readings/{user_id}");
        self.call_data::<_, ()>(Method::GET, &endpoint, &[], token, None).await
    }

    async fn create_reading(
        &self,
        token: Option<&str>,
        request: &CreateReadingRequest,
    ) -> Result<ReadingRecord, ApiError> {
        self.call_data(Method::POST, "readings", &[], token, Some(request)).await
    }

    async fn update_reading(
        &self,
        token: Option<&str>,
        reading_id: &str,
        updates: &NewReading,
    ) -> Result<ReadingRecord, ApiError> {
        self.call_data(Method::PUT, "readings", &[("readingId", reading_id)], token, Some(updates))
            .await
    }

    async fn delete_reading(&self, token: Option<&str>, reading_id: &str) -> Result<(), ApiError> {
        self.call::<serde_json::Value, ()>(Method::DELETE, "readings", &[("readingId", reading_id)], token, None)
            .await
            .map(|_| ())
    }
}
