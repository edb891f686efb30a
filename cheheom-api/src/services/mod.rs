pub mod keys;
pub mod auth_service;
pub mod user_service;
pub mod product_service;
pub mod application_service;
pub mod review_service;
pub mod favorite_service;
pub mod notification_service;
