use redis::AsyncCommands;
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Cross-process reserve lock for one room.
    ///
    /// SET NX EX: only the first caller gets it; the TTL bounds how long a
    /// crashed holder can keep the room locked.
    pub async fn acquire_room_lock(
        &self,
        room_id: &str,
        holder: &str,
        ttl_seconds: u64,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("room:{}:reserve", room_id);

        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(holder)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;

        if result.is_some() {
            info!("Reserve lock acquired: room {} by {}", room_id, holder);
        }
        Ok(result.is_some())
    }

    pub async fn release_room_lock(&self, room_id: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("room:{}:reserve", room_id);
        let _: () = conn.del(key).await?;
        Ok(())
    }

    /// Fixed-window rate limiter: at most `limit` hits per `window_seconds`
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: u64 = conn.incr(key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(key, window_seconds as i64).await?;
        }
        Ok(count <= limit)
    }
}
