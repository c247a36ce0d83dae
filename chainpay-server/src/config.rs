//! Server configuration.
//!
//! Loaded from a TOML file. String values may reference environment
//! variables as `$VAR` or `${VAR}`; a `.env` file in the working directory is
//! read first.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! store_path = "data/intents.json"
//!
//! [payment]
//! treasury_address = "$TREASURY_ADDRESS"
//! chain_id = 8453
//! usd_rate = "2500"
//! intent_ttl_minutes = 30
//! rpc_url = "${BASE_RPC_URL}"
//! required_confirmations = 2
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `config.toml`)
//! - `HOST` - Override server bind address
//! - `PORT` - Override server port

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use chainpay::config::PaymentConfig;
use chainpay_evm::apply_network_defaults;
use serde::{Deserialize, Serialize};

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `8080`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON file intents are persisted to. In-memory only when unset.
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Payment settings.
    #[serde(default)]
    pub payment: PaymentConfig,
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store_path: None,
            payment: PaymentConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the path in `CONFIG`, falling back to
    /// `config.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_owned());
        Self::load_from(Path::new(&path))
    }

    /// Loads configuration from `path`, resolving variables from the process
    /// environment. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        Ok(Self::parse(&content, |name| std::env::var(name).ok())?)
    }

    /// Parses TOML after expanding variables through `lookup`, then applies
    /// the `HOST`/`PORT` overrides and known-network defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the expanded text is not a valid configuration.
    pub fn parse(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(&expand_vars(content, &lookup))?;

        if let Some(host) = lookup("HOST").and_then(|h| h.parse().ok()) {
            config.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        apply_network_defaults(&mut config.payment);
        Ok(config)
    }
}

/// Replaces `$VAR` and `${VAR}` with values from `lookup`.
///
/// Unknown variables and a lone `$` are kept verbatim, so an unresolved
/// setting stays recognisable as unset.
fn expand_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(body) = after.strip_prefix('{') {
            match body.find('}') {
                Some(end) => (&body[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}
