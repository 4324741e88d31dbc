use async_trait::async_trait;
use qrshort_core::{CoreError, LinkStore, ListEntry, ListRange, Result, ShortCode};
use redis::AsyncCommands;
use tracing::{debug, error, info, trace, warn};
use typed_builder::TypedBuilder;

/// Raises the sequence key to `ARGV[1]` unless it is already at or above it.
///
/// Values are compared as decimal strings so the full `u64` range survives
/// Lua's double-precision numbers.
const ADVANCE_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then current = '1' end
local target = ARGV[1]
if #target > #current or (#target == #current and target > current) then
  redis.call('SET', KEYS[1], target)
  return target
end
return current
"#;

/// Largest sequence value the store accepts. Redis integers are signed, and
/// `INCR` must still succeed from this value.
const MAX_SEQUENCE: u64 = i64::MAX as u64 - 1;

/// Connection settings for a [`RedisStore`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisStoreConfig {
    #[builder(default = "127.0.0.1".to_string(), setter(into))]
    pub host: String,
    #[builder(default = 6379)]
    pub port: u16,
    #[builder(default, setter(strip_option, into))]
    pub password: Option<String>,
    /// Prefix shared by every key the store touches.
    #[builder(default = "qr".to_string(), setter(into))]
    pub prefix: String,
    #[builder(default = false)]
    pub count_hits: bool,
}

impl RedisStoreConfig {
    /// Connection URL, with the password percent-encoded.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => format!(
                "redis://:{}@{}:{}",
                urlencoding::encode(password),
                self.host,
                self.port
            ),
            _ => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

/// Redis implementation of [`LinkStore`].
///
/// Key layout, for prefix `qr`:
///
/// ```text
/// qr!seq      sequence (next identifier to issue)
/// qr:<code>   destination URL
/// qr^<code>   hit count
/// ```
///
/// Sequence allocation uses `INCR`, so several processes may share one
/// Redis server.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
    prefix: String,
    count_hits: bool,
    advance: redis::Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .field("count_hits", &self.count_hits)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CoreError {
    CoreError::BackendUnavailable(format!("{operation}: {err}"))
}

impl RedisStore {
    /// Connects to Redis and makes sure the sequence key exists.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self> {
        let client = redis::Client::open(config.url())
            .map_err(|e| map_redis_error("invalid Redis connection settings", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;

        info!(host = %config.host, port = config.port, prefix = %config.prefix, "connected to Redis");
        Self::with_connection(conn, config.prefix, config.count_hits).await
    }

    /// Wraps an existing connection.
    pub async fn with_connection(
        conn: redis::aio::MultiplexedConnection,
        prefix: impl Into<String>,
        count_hits: bool,
    ) -> Result<Self> {
        let store = Self {
            conn,
            prefix: prefix.into(),
            count_hits,
            advance: redis::Script::new(ADVANCE_SCRIPT),
        };
        store.init_sequence().await?;
        Ok(store)
    }

    async fn init_sequence(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let created: bool = conn
            .set_nx(self.sequence_key(), 1u64)
            .await
            .map_err(|e| map_redis_error("failed to initialise sequence", e))?;
        if created {
            info!(key = %self.sequence_key(), "initialised sequence");
        }
        Ok(())
    }

    fn sequence_key(&self) -> String {
        sequence_key(&self.prefix)
    }

    fn link_key(&self, code: ShortCode) -> String {
        link_key(&self.prefix, code)
    }

    fn hits_key(&self, code: ShortCode) -> String {
        hits_key(&self.prefix, code)
    }

    async fn fetch_counts(&self, codes: &[ShortCode]) -> Vec<u64> {
        let keys: Vec<String> = codes.iter().map(|code| self.hits_key(*code)).collect();
        let mut conn = self.conn.clone();
        match redis::cmd("MGET")
            .arg(&keys)
            .query_async::<Vec<Option<u64>>>(&mut conn)
            .await
        {
            Ok(counts) => counts.into_iter().map(|c| c.unwrap_or(0)).collect(),
            Err(e) => {
                warn!(error = %e, "failed to read hit counts, reporting 0");
                vec![0; codes.len()]
            }
        }
    }
}

fn check_sequence_target(to: u64) -> Result<u64> {
    if to > MAX_SEQUENCE {
        return Err(CoreError::InvalidCode(format!(
            "{} is beyond the Redis sequence range",
            ShortCode::from_id(to.saturating_sub(1))
        )));
    }
    Ok(to)
}

fn sequence_key(prefix: &str) -> String {
    format!("{prefix}!seq")
}

fn link_key(prefix: &str, code: ShortCode) -> String {
    format!("{prefix}:{code}")
}

fn hits_key(prefix: &str, code: ShortCode) -> String {
    format!("{prefix}^{code}")
}

#[async_trait]
impl LinkStore for RedisStore {
    fn counts_hits(&self) -> bool {
        self.count_hits
    }

    async fn next_code(&self) -> Result<ShortCode> {
        let mut conn = self.conn.clone();
        let next: u64 = conn.incr(self.sequence_key(), 1u64).await.map_err(|e| {
            error!(error = %e, "failed to allocate short code");
            map_redis_error("failed to increment sequence", e)
        })?;
        // INCR returns the post-increment value; the issued id is the one before it.
        let id = next
            .checked_sub(1)
            .ok_or_else(|| CoreError::InvalidData("sequence key holds 0".to_string()))?;
        Ok(ShortCode::from_id(id))
    }

    async fn current_sequence(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn
            .get(self.sequence_key())
            .await
            .map_err(|e| map_redis_error("failed to read sequence", e))?;
        Ok(value.unwrap_or(1))
    }

    async fn advance_sequence(&self, to: u64) -> Result<u64> {
        let to = check_sequence_target(to)?;
        let mut conn = self.conn.clone();
        let value: String = self
            .advance
            .key(self.sequence_key())
            .arg(to.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to advance sequence", e))?;
        value
            .parse()
            .map_err(|e| CoreError::InvalidData(format!("sequence value '{value}': {e}")))
    }

    async fn insert_at(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().set(self.link_key(code), url).ignore();
        if self.count_hits {
            pipe.set(self.hits_key(code), 0u64).ignore();
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to store link", e))?;
        debug!(code = %code, "stored link");
        Ok(code)
    }

    async fn update(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.link_key(code), url)
            .await
            .map_err(|e| map_redis_error("failed to update link", e))?;
        debug!(code = %code, "updated link");
        Ok(code)
    }

    async fn exists(&self, code: ShortCode) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(self.link_key(code))
            .await
            .map_err(|e| map_redis_error("failed to check link", e))
    }

    async fn fetch(&self, code: ShortCode) -> Result<String> {
        trace!(code = %code, "fetching link from Redis");
        let mut conn = self.conn.clone();
        let url: Option<String> = conn
            .get(self.link_key(code))
            .await
            .map_err(|e| map_redis_error("failed to fetch link", e))?;
        url.ok_or_else(|| CoreError::NotFound(code.to_string()))
    }

    async fn increment_hit(&self, code: ShortCode) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.incr(self.hits_key(code), 1u64)
            .await
            .map_err(|e| map_redis_error("failed to record hit", e))
    }

    async fn hit_count(&self, code: ShortCode) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: Option<u64> = conn
            .get(self.hits_key(code))
            .await
            .map_err(|e| map_redis_error("failed to read hit count", e))?;
        Ok(count.unwrap_or(0))
    }

    async fn list_range(&self, range: ListRange) -> Result<Vec<ListEntry>> {
        let codes: Vec<ShortCode> = range.codes().collect();
        let keys: Vec<String> = codes.iter().map(|code| self.link_key(*code)).collect();

        let mut conn = self.conn.clone();
        let urls: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to list links", e))?;

        let counts = if self.count_hits {
            self.fetch_counts(&codes).await
        } else {
            vec![0; codes.len()]
        };

        Ok(codes
            .into_iter()
            .zip(urls)
            .zip(counts)
            .filter_map(|((code, url), count)| Some(ListEntry { code, url: url?, count }))
            .collect())
    }
}
