//! HTTP client for the backend.
//!
//! Every call is bounded by one overall timeout. A failed call is retried
//! once under `base_url + legacy_prefix`, since deployments have mounted the
//! API under both prefixes.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use cheheom_shared::types::{
    Application, ApplicationResponse, ApplicationStatus, ApplicationsResponse,
    CreateNotificationRequest, FavoriteAction, FavoriteRequest, FavoritesResponse, HealthResponse,
    Notification, NotificationResponse, NotificationsResponse, Product, ProductResponse,
    ProductsResponse, ProfileResponse, Review, ReviewResponse, ReviewsResponse, SigninRequest,
    SigninResponse, SignupRequest, SignupResponse, SuccessResponse, UpdateReviewRequest, UserInfo,
};

use crate::config::ClientConfig;
use crate::error::SyncError;

#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    legacy_prefix: String,
    anon_key: String,
    timeout: Duration,
}

impl RemoteClient {
    pub fn new(config: &ClientConfig) -> Result<Self, SyncError> {
        let http = Client::builder()
            .build()
            .map_err(|e| SyncError::Network(format!("http client setup failed: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            legacy_prefix: config.legacy_prefix.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            timeout: config.timeout(),
        })
    }

    /// Issue one request, falling back to the legacy prefix on failure.
    pub async fn call<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<T, SyncError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let primary_url = format!("{}{endpoint}", self.base_url);

        let work = async {
            let primary_err = match self.attempt(method.clone(), &primary_url, body, token).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let retryable = matches!(primary_err, SyncError::Server { .. } | SyncError::Network(_));
            if self.legacy_prefix.is_empty() || !retryable {
                return Err(primary_err);
            }

            let fallback_url = format!("{}{}{endpoint}", self.base_url, self.legacy_prefix);
            tracing::debug!(endpoint = %endpoint, error = %primary_err, "retrying under legacy prefix");

            match self.attempt(method, &fallback_url, body, token).await {
                // The legacy route does not exist here; the first answer is the real one.
                Err(SyncError::Server { status: 404, .. }) => Err(primary_err),
                other => other,
            }
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(endpoint = %endpoint, timeout = ?self.timeout, "request timed out");
                Err(SyncError::Timeout(self.timeout))
            }
        }
    }

    async fn attempt<B, T>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<T, SyncError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token.unwrap_or(&self.anon_key));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
            return Err(SyncError::Server { status: status.as_u16(), message });
        }

        serde_json::from_str(&text).map_err(|e| SyncError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, token: Option<&str>) -> Result<T, SyncError> {
        self.call::<(), T>(Method::GET, endpoint, None, token).await
    }

    // --- Auth ---

    pub async fn health(&self) -> Result<HealthResponse, SyncError> {
        self.get("/health", None).await
    }

    pub async fn signup(&self, req: &SignupRequest) -> Result<UserInfo, SyncError> {
        let resp: SignupResponse = self.call(Method::POST, "/signup", Some(req), None).await?;
        Ok(resp.user)
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<SigninResponse, SyncError> {
        let req = SigninRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.call(Method::POST, "/signin", Some(&req), None).await
    }

    pub async fn profile(&self, token: &str) -> Result<UserInfo, SyncError> {
        let resp: ProfileResponse = self.get("/profile", Some(token)).await?;
        Ok(resp.user)
    }

    // --- Products ---

    pub async fn create_product(&self, token: &str, product: &Product) -> Result<Product, SyncError> {
        let resp: ProductResponse = self.call(Method::POST, "/products", Some(product), Some(token)).await?;
        Ok(resp.product)
    }

    pub async fn list_products(&self, token: &str) -> Result<Vec<Product>, SyncError> {
        let resp: ProductsResponse = self.get("/products", Some(token)).await?;
        Ok(resp.products)
    }

    // --- Applications ---

    pub async fn create_application(&self, token: &str, application: &Application) -> Result<Application, SyncError> {
        let resp: ApplicationResponse = self
            .call(Method::POST, "/applications", Some(application), Some(token))
            .await?;
        Ok(resp.application)
    }

    pub async fn list_applications(&self, token: &str) -> Result<Vec<Application>, SyncError> {
        let resp: ApplicationsResponse = self.get("/applications", Some(token)).await?;
        Ok(resp.applications)
    }

    pub async fn list_business_applications(
        &self,
        token: &str,
        product_id: Option<&str>,
    ) -> Result<Vec<Application>, SyncError> {
        let endpoint = match product_id {
            Some(id) => format!("/business/applications?productId={id}"),
            None => "/business/applications".to_string(),
        };
        let resp: ApplicationsResponse = self.get(&endpoint, Some(token)).await?;
        Ok(resp.applications)
    }

    pub async fn update_application_status(
        &self,
        token: &str,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Application, SyncError> {
        let body = json!({ "status": status });
        let resp: ApplicationResponse = self
            .call(Method::PUT, &format!("/applications/{id}"), Some(&body), Some(token))
            .await?;
        Ok(resp.application)
    }

    pub async fn delete_application(&self, token: &str, id: &str) -> Result<(), SyncError> {
        let _: SuccessResponse = self
            .call::<(), _>(Method::DELETE, &format!("/applications/{id}"), None, Some(token))
            .await?;
        Ok(())
    }

    // --- Favorites ---

    pub async fn update_favorite(
        &self,
        token: &str,
        product_id: &str,
        action: FavoriteAction,
    ) -> Result<Vec<String>, SyncError> {
        let req = FavoriteRequest {
            product_id: product_id.to_string(),
            action,
        };
        let resp: FavoritesResponse = self.call(Method::POST, "/favorites", Some(&req), Some(token)).await?;
        Ok(resp.favorites)
    }

    pub async fn list_favorites(&self, token: &str) -> Result<Vec<String>, SyncError> {
        let resp: FavoritesResponse = self.get("/favorites", Some(token)).await?;
        Ok(resp.favorites)
    }

    // --- Reviews ---

    pub async fn create_review(&self, token: &str, review: &Review) -> Result<Review, SyncError> {
        let resp: ReviewResponse = self.call(Method::POST, "/reviews", Some(review), Some(token)).await?;
        Ok(resp.review)
    }

    pub async fn list_reviews(&self, token: &str) -> Result<Vec<Review>, SyncError> {
        let resp: ReviewsResponse = self.get("/reviews", Some(token)).await?;
        Ok(resp.reviews)
    }

    pub async fn update_review(&self, token: &str, id: &str, req: &UpdateReviewRequest) -> Result<Review, SyncError> {
        let resp: ReviewResponse = self
            .call(Method::PUT, &format!("/reviews/{id}"), Some(req), Some(token))
            .await?;
        Ok(resp.review)
    }

    // --- Notifications ---

    pub async fn create_notification(
        &self,
        token: &str,
        target_user_id: &str,
        notification: &Notification,
    ) -> Result<Notification, SyncError> {
        let req = CreateNotificationRequest {
            notification: notification.clone(),
            target_user_id: target_user_id.to_string(),
        };
        let resp: NotificationResponse = self
            .call(Method::POST, "/notifications", Some(&req), Some(token))
            .await?;
        Ok(resp.notification)
    }

    pub async fn list_notifications(&self, token: &str) -> Result<Vec<Notification>, SyncError> {
        let resp: NotificationsResponse = self.get("/notifications", Some(token)).await?;
        Ok(resp.notifications)
    }

    pub async fn mark_notification_read(&self, token: &str, id: &str) -> Result<Notification, SyncError> {
        let resp: NotificationResponse = self
            .call::<(), _>(Method::PUT, &format!("/notifications/{id}"), None, Some(token))
            .await?;
        Ok(resp.notification)
    }
}
