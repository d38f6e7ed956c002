//! 配置与密钥数据模型

pub mod config;
pub mod credentials;
