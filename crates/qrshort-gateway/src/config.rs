use clap::{Parser, ValueEnum};
use qrshort_storage::{BackendConfig, FileStoreConfig, RedisStoreConfig};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "QRSHORT_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "QRSHORT_STORAGE_BACKEND";
pub const STORE_DIR_ENV: &str = "QRSHORT_STORE_DIR";
pub const REDIS_HOST_ENV: &str = "QRSHORT_REDIS_HOST";
pub const REDIS_PORT_ENV: &str = "QRSHORT_REDIS_PORT";
pub const REDIS_AUTH_ENV: &str = "QRSHORT_REDIS_AUTH";
pub const REDIS_PREFIX_ENV: &str = "QRSHORT_REDIS_PREFIX";
pub const COUNT_HITS_ENV: &str = "QRSHORT_COUNT_HITS";
pub const AUTH_TOKEN_ENV: &str = "QRSHORT_AUTH_TOKEN";
pub const WWW_DIR_ENV: &str = "QRSHORT_WWW_DIR";
pub const DATA_DIR_ENV: &str = "QRSHORT_DATA_DIR";
pub const LOG_FORMAT_ENV: &str = "QRSHORT_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:2004";
pub const DEFAULT_STORE_DIR: &str = "./qr-store";
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_REDIS_PREFIX: &str = "qr";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "file")]
    File,
    #[value(name = "redis", alias = "Redis")]
    Redis,
    #[value(name = "memory")]
    Memory,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Redis => write!(f, "redis"),
            StorageBackendArg::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    #[value(name = "fmt")]
    Fmt,
    /// One JSON object per line.
    #[value(name = "json")]
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "qrshort", version, about = "URL shortener behind QR codes")]
pub struct Config {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::File
    )]
    pub storage: StorageBackendArg,

    /// Directory of the file backend.
    #[arg(long, env = STORE_DIR_ENV, default_value = DEFAULT_STORE_DIR)]
    pub store_dir: PathBuf,

    #[arg(long, env = REDIS_HOST_ENV, default_value = DEFAULT_REDIS_HOST)]
    pub redis_host: String,

    #[arg(long, env = REDIS_PORT_ENV, default_value_t = DEFAULT_REDIS_PORT)]
    pub redis_port: u16,

    #[arg(long, env = REDIS_AUTH_ENV, hide_env_values = true)]
    pub redis_auth: Option<String>,

    #[arg(long, env = REDIS_PREFIX_ENV, default_value = DEFAULT_REDIS_PREFIX)]
    pub redis_prefix: String,

    /// Count redirects per short code.
    #[arg(long, env = COUNT_HITS_ENV)]
    pub count_hits: bool,

    /// Token required by mutating and listing routes; `-none-` disables auth.
    #[arg(long, env = AUTH_TOKEN_ENV, hide_env_values = true, allow_hyphen_values = true)]
    pub auth_token: String,

    /// Static files served for unmatched paths.
    #[arg(long, env = WWW_DIR_ENV)]
    pub www_dir: Option<PathBuf>,

    /// Where `data` side files from /enc and /upd are written.
    #[arg(long, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Fmt)]
    pub log_format: LogFormat,
}

impl Config {
    /// Storage settings for [`qrshort_storage::Backend::open`].
    pub fn backend_config(&self) -> BackendConfig {
        match self.storage {
            StorageBackendArg::File => BackendConfig::File(
                FileStoreConfig::builder()
                    .root(self.store_dir.clone())
                    .count_hits(self.count_hits)
                    .build(),
            ),
            StorageBackendArg::Redis => BackendConfig::Redis(RedisStoreConfig {
                host: self.redis_host.clone(),
                port: self.redis_port,
                password: self.redis_auth.clone(),
                prefix: self.redis_prefix.clone(),
                count_hits: self.count_hits,
            }),
            StorageBackendArg::Memory => BackendConfig::Memory {
                count_hits: self.count_hits,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["qrshort", "--auth-token", "secret"]).unwrap();
        assert_eq!(config.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
        assert_eq!(config.storage, StorageBackendArg::File);
        assert!(!config.count_hits);
        assert_eq!(config.log_format, LogFormat::Fmt);
        assert!(matches!(config.backend_config(), BackendConfig::File(_)));
    }

    #[test]
    fn redis_backend() {
        let config = Config::try_parse_from([
            "qrshort",
            "--auth-token",
            "-none-",
            "--storage",
            "redis",
            "--redis-port",
            "6380",
            "--redis-auth",
            "pw",
            "--count-hits",
        ])
        .unwrap();

        let BackendConfig::Redis(redis) = config.backend_config() else {
            panic!("expected redis backend");
        };
        assert_eq!(redis.port, 6380);
        assert_eq!(redis.password.as_deref(), Some("pw"));
        assert_eq!(redis.prefix, "qr");
        assert!(redis.count_hits);
    }

    #[test]
    fn auth_token_is_required() {
        assert!(Config::try_parse_from(["qrshort"]).is_err());
    }
}
