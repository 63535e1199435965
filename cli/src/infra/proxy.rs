//! HTTP CONNECT proxy support for the first SSH hop.
//!
//! The proxy is taken from the environment (`HTTPS_PROXY`, then
//! `HTTP_PROXY`, either case) and bypassed for loopback hosts and hosts
//! matched by `NO_PROXY`. When it applies, the SSH client is given a
//! `ProxyCommand` that re-invokes this binary as `_http-connect %h %p`,
//! which opens the tunnel and bridges its own stdio over it.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine as _;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::domain::SettingsError;

/// Variables consulted for the proxy URL, in priority order.
const PROXY_VARS: [&str; 4] = ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"];
const NO_PROXY_VARS: [&str; 2] = ["NO_PROXY", "no_proxy"];

/// Every variable that influences proxy selection.
pub const PROXY_ENV_VARS: [&str; 6] = [
    "HTTPS_PROXY",
    "https_proxy",
    "HTTP_PROXY",
    "http_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Upper bound on the proxy's response head.
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

// ── Proxy address ─────────────────────────────────────────────────────────────

/// An HTTP proxy that accepts `CONNECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProxy {
    pub host: String,
    pub port: u16,
    /// `user:password` from the URL, sent as basic proxy authorization.
    credentials: Option<String>,
}

impl HttpProxy {
    /// Parse `http://[user:pass@]host[:port][/]` or a bare `host[:port]`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidProxy`] for other schemes, a missing
    /// host, or a bad port.
    pub fn parse(var: &'static str, value: &str) -> Result<Self, SettingsError> {
        let invalid = |reason: &'static str| SettingsError::InvalidProxy {
            var,
            value: value.to_string(),
            reason,
        };
        let rest = match value.trim().split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => rest,
            Some(_) => return Err(invalid("only http:// proxies are supported")),
            None => value.trim(),
        };
        let authority = rest.split('/').next().unwrap_or_default();
        let (credentials, host_port) = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => (Some(userinfo.to_string()), host_port),
            None => (None, authority),
        };
        let (host, port) = split_host_port(host_port).ok_or_else(|| invalid("bad port"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        Ok(Self {
            host: host.to_string(),
            port: port.unwrap_or(80),
            credentials,
        })
    }

    /// The `CONNECT` request for `host:port`.
    #[must_use]
    pub fn connect_request(&self, host: &str, port: u16) -> String {
        let authority = format!("{}:{port}", bracket(host));
        let mut request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n");
        if let Some(credentials) = &self.credentials {
            let token = base64::engine::general_purpose::STANDARD.encode(credentials);
            request.push_str(&format!("Proxy-Authorization: Basic {token}\r\n"));
        }
        request.push_str("\r\n");
        request
    }
}

/// Split `host[:port]`, accepting `[v6]` and `[v6]:port`. Returns `None`
/// when a port is present but not a valid number.
fn split_host_port(value: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = value.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        return match tail.strip_prefix(':') {
            Some(port) => Some((host, Some(port.parse().ok()?))),
            None if tail.is_empty() => Some((host, None)),
            None => None,
        };
    }
    match value.split_once(':') {
        Some((host, port)) if !port.contains(':') => Some((host, Some(port.parse().ok()?))),
        // Bare IPv6 literal.
        Some(_) => Some((value, None)),
        None => Some((value, None)),
    }
}

fn bracket(host: &str) -> String {
    if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

// ── NO_PROXY ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bypass {
    All,
    Domain {
        name: String,
        subdomains_only: bool,
        port: Option<u16>,
    },
    Ip {
        addr: IpAddr,
        port: Option<u16>,
    },
    Cidr {
        net: IpAddr,
        prefix: u8,
    },
}

/// Parsed `NO_PROXY` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoProxy(Vec<Bypass>);

impl NoProxy {
    /// Parse a comma-separated list. Entries: `*`, `example.com` (the domain
    /// and its subdomains), `.example.com` (subdomains only), an IP, a CIDR
    /// block, each optionally with `:port`. Unparseable entries are ignored.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(|e| e.trim().to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .filter_map(|e| parse_bypass(&e))
                .collect(),
        )
    }

    /// Whether `host:port` is excluded from proxying.
    #[must_use]
    pub fn matches(&self, host: &str, port: u16) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
        let ip = host.parse::<IpAddr>().ok();
        self.0.iter().any(|entry| match entry {
            Bypass::All => true,
            Bypass::Ip { addr, port: p } => ip == Some(*addr) && p.is_none_or(|p| p == port),
            Bypass::Cidr { net, prefix } => ip.is_some_and(|ip| in_network(ip, *net, *prefix)),
            Bypass::Domain {
                name,
                subdomains_only,
                port: p,
            } => {
                let suffix = host.len() > name.len()
                    && host.ends_with(name.as_str())
                    && host.as_bytes()[host.len() - name.len() - 1] == b'.';
                let matched = suffix || (!subdomains_only && host == *name);
                matched && p.is_none_or(|p| p == port)
            }
        })
    }
}

fn parse_bypass(entry: &str) -> Option<Bypass> {
    if entry == "*" {
        return Some(Bypass::All);
    }
    if let Some((net, prefix)) = entry.split_once('/') {
        let net: IpAddr = net.parse().ok()?;
        let prefix: u8 = prefix.parse().ok()?;
        let max = if net.is_ipv4() { 32 } else { 128 };
        return (prefix <= max).then_some(Bypass::Cidr { net, prefix });
    }
    let (host, port) = split_host_port(entry)?;
    if let Ok(addr) = host.parse::<IpAddr>() {
        return Some(Bypass::Ip { addr, port });
    }
    let (name, subdomains_only) = match host.strip_prefix("*.").or_else(|| host.strip_prefix('.')) {
        Some(name) => (name, true),
        None => (host, false),
    };
    Some(Bypass::Domain {
        name: name.to_string(),
        subdomains_only,
        port,
    })
}

fn in_network(ip: IpAddr, net: IpAddr, prefix: u8) -> bool {
    match (ip, net) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            u32::from(ip) & mask == u32::from(net) & mask
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            u128::from(ip) & mask == u128::from(net) & mask
        }
        _ => false,
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Proxy selection taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub proxy: HttpProxy,
    pub no_proxy: NoProxy,
}

impl ProxySettings {
    /// Read the proxy variables through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidProxy`] if the proxy URL is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, SettingsError> {
        let first = |vars: &[&'static str]| {
            vars.iter().find_map(|&var| {
                lookup(var)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (var, v))
            })
        };
        let Some((var, value)) = first(&PROXY_VARS) else {
            return Ok(None);
        };
        let no_proxy = first(&NO_PROXY_VARS)
            .map(|(_, v)| NoProxy::parse(&v))
            .unwrap_or_default();
        Ok(Some(Self {
            proxy: HttpProxy::parse(var, &value)?,
            no_proxy,
        }))
    }

    /// Read the proxy variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidProxy`] if the proxy URL is malformed.
    pub fn from_env() -> Result<Option<Self>, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Whether a connection to `host:port` goes through the proxy. Loopback
    /// hosts never do.
    #[must_use]
    pub fn applies_to(&self, host: &str, port: u16) -> bool {
        let loopback = host.eq_ignore_ascii_case("localhost")
            || host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .is_ok_and(|ip| ip.is_loopback());
        !loopback && !self.no_proxy.matches(host, port)
    }
}

/// Proxy settings plus the program that opens the tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTunnel {
    pub helper: PathBuf,
    pub settings: ProxySettings,
}

impl HttpTunnel {
    /// Tunnel through the environment's proxy using this executable, or
    /// `None` when no proxy is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is malformed or the current
    /// executable cannot be located.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(settings) = ProxySettings::from_env()? else {
            return Ok(None);
        };
        let helper = std::env::current_exe().context("cannot locate hostexec executable")?;
        tracing::debug!(
            proxy = %format!("{}:{}", settings.proxy.host, settings.proxy.port),
            "using HTTP proxy for the first ssh hop"
        );
        Ok(Some(Self { helper, settings }))
    }
}

// ── Tunnel ────────────────────────────────────────────────────────────────────

/// Read the proxy's response head up to and including the blank line, one
/// byte at a time so no tunnelled bytes are consumed.
async fn read_response_head<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        anyhow::ensure!(head.len() < MAX_RESPONSE_HEAD, "proxy response too large");
        let byte = reader.read_u8().await.context("proxy closed the connection")?;
        head.push(byte);
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

/// Status code from the first line of a response head.
fn status_code(head: &str) -> Result<u16> {
    let line = head.lines().next().unwrap_or_default();
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => code
            .parse()
            .with_context(|| format!("malformed proxy status line: {line}")),
        _ => anyhow::bail!("malformed proxy status line: {line}"),
    }
}

/// Issue `CONNECT` over `stream` and check the proxy accepted it.
///
/// # Errors
///
/// Returns an error if the exchange fails or the proxy answers with a
/// non-2xx status.
pub async fn establish<S>(stream: &mut S, proxy: &HttpProxy, host: &str, port: u16) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(proxy.connect_request(host, port).as_bytes())
        .await
        .context("sending CONNECT to proxy")?;
    stream.flush().await.context("sending CONNECT to proxy")?;
    let head = read_response_head(stream).await?;
    let code = status_code(&head)?;
    anyhow::ensure!(
        (200..300).contains(&code),
        "proxy refused tunnel to {host}:{port}: {}",
        head.lines().next().unwrap_or_default()
    );
    Ok(())
}

/// Connect to the proxy and open a tunnel to `host:port`.
///
/// # Errors
///
/// Returns an error if the proxy is unreachable or refuses the tunnel.
pub async fn open_tunnel(proxy: &HttpProxy, host: &str, port: u16) -> Result<TcpStream> {
    let mut stream = TcpStream::connect((proxy.host.as_str(), proxy.port))
        .await
        .with_context(|| format!("cannot reach proxy {}:{}", proxy.host, proxy.port))?;
    establish(&mut stream, proxy, host, port).await?;
    Ok(stream)
}

/// Copies bytes from `reader` to `writer` until EOF.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub async fn bridge_io<R, W>(reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Bridge this process's stdin and stdout over `stream` until the remote
/// side closes.
///
/// # Errors
///
/// Returns an error if either direction fails.
pub async fn bridge_stdio(stream: TcpStream) -> Result<()> {
    let (mut from_remote, mut to_remote) = stream.into_split();
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    let upstream = async {
        bridge_io(&mut stdin, &mut to_remote).await?;
        to_remote.shutdown().await.context("closing tunnel")
    };
    let downstream = bridge_io(&mut from_remote, &mut stdout);
    tokio::pin!(upstream, downstream);

    tokio::select! {
        res = &mut downstream => res,
        res = &mut upstream => {
            res?;
            downstream.await
        }
    }
}
