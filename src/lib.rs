//! Gemini Key Pool Library
//!
//! 提供 API 密钥轮换池、配置加载和密钥验证功能

pub mod common;
pub mod http_client;
pub mod model;
pub mod pool;
pub mod validation;
