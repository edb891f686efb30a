pub mod kv;
pub mod redis;
