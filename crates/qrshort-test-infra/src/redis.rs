use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const REDIS_PORT: u16 = 6379;

/// A throwaway Redis server. The container stops when this is dropped.
pub struct RedisServer {
    container: ContainerAsync<GenericImage>,
}

impl RedisServer {
    pub async fn start() -> Result<Self> {
        let container = GenericImage::new("redis", "8.6.0")
            .with_exposed_port(REDIS_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await?;
        Ok(Self { container })
    }

    /// Host reachable from the test process, with `localhost` pinned to IPv4.
    pub async fn host(&self) -> Result<String> {
        let host = self.container.get_host().await?.to_string();
        Ok(match host.as_str() {
            "localhost" => String::from("127.0.0.1"),
            _ => host,
        })
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(REDIS_PORT).await?)
    }

    /// Opens a fresh multiplexed connection to the server.
    pub async fn connection(&self) -> Result<::redis::aio::MultiplexedConnection> {
        let url = format!("redis://{}:{}", self.host().await?, self.port().await?);
        let client = ::redis::Client::open(url)?;
        Ok(client.get_multiplexed_async_connection().await?)
    }
}
