//! Command-line and environment configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use onboard_rpc::DEFAULT_RPC_PORT;
use onboard_service::ServiceConfig;

use crate::auth::Credentials;

#[derive(Parser, Debug, Clone)]
#[command(name = "onboard-server")]
#[command(about = "Users and books over HTTP and RPC")]
pub struct Config {
    /// HTTP port.
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    #[arg(long, env = "RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// SQLite database file. Data is kept in memory when unset or empty.
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<String>,

    /// Seconds a cached list stays fresh. Must be at least 1; use
    /// `--no-cache` to turn list caching off.
    #[arg(
        long,
        env = "CACHE_TTL_SECS",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub cache_ttl_secs: u64,

    /// Seconds each store operation may take.
    #[arg(
        long,
        env = "STORE_TIMEOUT_SECS",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub store_timeout_secs: u64,

    /// Serve lists straight from the store.
    #[arg(long)]
    pub no_cache: bool,

    #[arg(long, env = "AUTH_USER", default_value = "admin")]
    pub auth_user: String,

    #[arg(long, env = "AUTH_PASSWORD", default_value = "12345678", hide_env_values = true)]
    pub auth_password: String,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn store_path(&self) -> Option<PathBuf> {
        self.database_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            op_timeout: Duration::from_secs(self.store_timeout_secs),
            list_cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.auth_user, &self.auth_password)
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.rpc_port))
    }
}
