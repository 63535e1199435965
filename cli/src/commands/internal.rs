//! Internal commands (`_http-connect`).
//!
//! These are invoked by the SSH client via `ProxyCommand`, not by users.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::infra::proxy::{self, ProxySettings};

/// Arguments for `_http-connect`, filled in by the SSH client from `%h %p`.
#[derive(Args)]
pub struct HttpConnectArgs {
    pub host: String,
    pub port: u16,
}

/// SSH `ProxyCommand` helper: opens an HTTP CONNECT tunnel to `host:port`
/// through the environment's proxy and bridges stdio over it.
///
/// The proxy is read from the environment the SSH client passes down, so
/// credentials in the proxy URL never appear on a command line.
///
/// # Errors
///
/// Returns an error if no proxy is configured, the proxy refuses the tunnel,
/// or the bridge fails.
pub async fn http_connect(args: &HttpConnectArgs) -> Result<ExitCode> {
    let settings = ProxySettings::from_env()?
        .context("_http-connect needs HTTPS_PROXY or HTTP_PROXY to be set")?;
    let stream = proxy::open_tunnel(&settings.proxy, &args.host, args.port).await?;
    tracing::debug!(host = %args.host, port = args.port, "proxy tunnel established");
    proxy::bridge_stdio(stream).await?;
    Ok(ExitCode::SUCCESS)
}
