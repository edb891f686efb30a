pub mod health;
pub mod auth;
pub mod products;
pub mod applications;
pub mod favorites;
pub mod reviews;
pub mod notifications;
