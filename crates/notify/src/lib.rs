pub mod client;
pub mod feishu;
pub mod http;
pub mod image;
pub mod mention;
pub mod payload;
pub mod template;
pub mod token;
pub mod webhook;
