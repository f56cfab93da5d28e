//! HTTP plumbing shared by the sources

use crate::config::{ProxyConfig, ProxyMode};
use crate::error::{Error, Result};
use std::time::Duration;

/// Everything a source needs to talk to its provider.
///
/// Each source gets its own context, so proxy settings apply to every
/// request that source issues and to nothing else.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub proxy: ProxyConfig,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for SourceContext {
    fn default() -> Self {
        Self {
            proxy: ProxyConfig::default(),
            timeout: Duration::from_secs(crate::config::defaults::SOURCE_TIMEOUT_SECS),
            user_agent: crate::config::defaults::USER_AGENT.to_string(),
        }
    }
}

impl SourceContext {
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout);

        builder = match self.proxy.mode {
            ProxyMode::None => builder.no_proxy(),
            ProxyMode::System => builder,
            ProxyMode::Manual => builder.proxy(manual_proxy(&self.proxy)?),
        };

        Ok(builder.build()?)
    }
}

fn manual_proxy(cfg: &ProxyConfig) -> Result<reqwest::Proxy> {
    if cfg.host.is_empty() {
        return Err(Error::Config("manual proxy requires a host".into()));
    }
    let protocol = if cfg.protocol.is_empty() {
        "http"
    } else {
        cfg.protocol.as_str()
    };
    let url = format!("{protocol}://{}:{}", cfg.host, cfg.port);
    let mut proxy = reqwest::Proxy::all(&url)?;
    if let Some(user) = cfg.username.as_deref().filter(|u| !u.is_empty()) {
        proxy = proxy.basic_auth(user, cfg.password.as_deref().unwrap_or(""));
    }
    Ok(proxy)
}

/// Turn a non-success response into a transport error.
pub fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::transport(status))
    }
}
