//! # suzu-core
//!
//! 告警通知领域的实体、端口 (Port) 与错误定义。
//! 具体实现 (Feishu 客户端、内存缓存等) 位于其它 crate，通过 `Arc<dyn Trait>` 注入。

pub mod common;
pub mod config;

pub mod alert {
    pub mod entity;
    pub mod template;
}

pub mod cache {
    pub mod error;
    pub mod port;
}

pub mod notify {
    pub mod entity;
    pub mod error;
    pub mod image;
    #[cfg(feature = "test-utils")]
    pub mod mock;
    pub mod port;
}
