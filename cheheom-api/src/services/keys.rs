//! Key layout of the backing store.

pub const PRODUCT: &str = "product";
pub const APPLICATION: &str = "application";
pub const REVIEW: &str = "review";
pub const NOTIFICATION: &str = "notification";

pub fn user_by_email(email: &str) -> String {
    format!("user:{email}")
}

pub fn user_by_id(id: &str) -> String {
    format!("user:id:{id}")
}

pub fn product(id: &str) -> String {
    format!("{PRODUCT}:{id}")
}

pub fn application(id: &str) -> String {
    format!("{APPLICATION}:{id}")
}

pub fn review(id: &str) -> String {
    format!("{REVIEW}:{id}")
}

pub fn notification(id: &str) -> String {
    format!("{NOTIFICATION}:{id}")
}

pub fn user_products(user_id: &str) -> String {
    format!("user:{user_id}:products")
}

pub fn user_applications(user_id: &str) -> String {
    format!("user:{user_id}:applications")
}

pub fn product_applications(product_id: &str) -> String {
    format!("product:{product_id}:applications")
}

pub fn user_reviews(user_id: &str) -> String {
    format!("user:{user_id}:reviews")
}

pub fn product_reviews(product_id: &str) -> String {
    format!("product:{product_id}:reviews")
}

pub fn user_favorites(user_id: &str) -> String {
    format!("user:{user_id}:favorites")
}

pub fn user_notifications(user_id: &str) -> String {
    format!("user:{user_id}:notifications")
}
