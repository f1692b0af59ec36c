//! Redis 存储适配模块
//!
//! 提供 Redis 连接管理和 JSON 值的常用操作封装。
//! 所有连接获取都带超时，避免存储故障时请求无限阻塞。

use crate::config::RedisConfig;
use crate::error::{Result, StoreError};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, instrument};

/// Redis 存储客户端
#[derive(Clone)]
pub struct Store {
    client: Client,
    connect_timeout: Duration,
}

impl Store {
    /// 创建 Redis 客户端
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self {
            client,
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
        })
    }

    /// 获取连接（带超时）
    pub async fn connection(&self) -> Result<MultiplexedConnection> {
        tokio::time::timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::Timeout("获取 Redis 连接超时".to_string()))?
        .map_err(StoreError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(StoreError::from)
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => {
                let parsed: T = serde_json::from_str(&v)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// 设置值并指定 TTL
    #[instrument(skip(self, value))]
    pub async fn set_ex<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let serialized = serialize(value)?;
        let _: () = conn.set_ex(key, serialized, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    /// 原子性地仅在 key 不存在时设置值，可选指定 TTL
    ///
    /// 基于 Redis SET NX [EX] 单命令实现，消除先查后写的竞态。
    /// 返回 true 表示设置成功（key 不存在），false 表示 key 已存在。
    pub async fn set_nx<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let mut conn = self.connection().await?;
        let serialized = serialize(value)?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(serialized).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }

        let result: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(result.is_some())
    }

    /// 按模式列出 key
    #[instrument(skip(self))]
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}
