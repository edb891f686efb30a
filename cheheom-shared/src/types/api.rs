use serde::{Deserialize, Serialize};
use validator::Validate;

use super::models::{
    Application, ApplicationStatus, Notification, Product, Review, ReviewStatus, UserInfo, UserType,
};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            code: Some(code.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
}

impl HealthResponse {
    pub fn ok(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            service: service.into(),
            version: version.into(),
        }
    }
}

// --- Auth ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[validate(required(message = "userType is required"))]
    pub user_type: Option<UserType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub success: bool,
    pub user: UserInfo,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SigninRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub success: bool,
    pub user: UserInfo,
    pub access_token: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserInfo,
}

// --- Collections ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub success: bool,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub success: bool,
    pub application: Application,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApplicationsResponse {
    pub success: bool,
    #[serde(default)]
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateApplicationRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessApplicationsQuery {
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub product_id: String,
    pub action: FavoriteAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoritesResponse {
    pub success: bool,
    #[serde(default)]
    pub favorites: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub review: Review,
}

/// Moderation by the owner of the reviewed product. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReviewStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewsResponse {
    pub success: bool,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// A notification addressed to another user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[serde(flatten)]
    pub notification: Notification,
    pub target_user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub success: bool,
    pub notification: Notification,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub success: bool,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_without_required_fields_fails_validation() {
        let req: SignupRequest = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        let err = req.validate().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("user_type"));
    }

    #[test]
    fn signup_with_business_fields_is_valid() {
        let req: SignupRequest = serde_json::from_str(
            r#"{
                "email": "owner@example.com",
                "password": "secret1",
                "name": "사장님",
                "phone": "010-1111-2222",
                "userType": "business",
                "businessName": "동네식당"
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.user_type, Some(UserType::Business));
    }

    #[test]
    fn favorite_request_wire_shape() {
        let req = FavoriteRequest {
            product_id: "p1".into(),
            action: FavoriteAction::Remove,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, serde_json::json!({"productId": "p1", "action": "remove"}));
    }

    #[test]
    fn error_body_exposes_message_under_error() {
        let body = ApiErrorResponse::new("E1001", "invalid email or password");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], "invalid email or password");
        assert_eq!(value["success"], false);
    }
}
