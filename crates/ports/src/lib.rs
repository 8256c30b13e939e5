//! ports - 抽象 trait 层
//!
//! 定义登录尝试存储的抽象接口

mod attempt_store;

pub use attempt_store::*;
