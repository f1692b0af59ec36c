//! 起卦码配额服务
//!
//! 签发和核销付费起卦服务的预付起卦码（LR-XXXX-XXXX）。
//! 核心是配额账本：防碰撞签发、密码鉴权、以及并发安全的原子扣减协议。

pub mod code;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod paypal;
pub mod routes;
pub mod service;
pub mod state;
