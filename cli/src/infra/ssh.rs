//! OpenSSH transport: implements `Connector` by driving the `ssh` client
//! through the `CommandRunner` port.
//!
//! Every upload and command is one `ssh` invocation. A relay hop is expressed
//! as a `ProxyCommand` that runs the same client with `-W %h:%p`, so the
//! relay inherits the target's user, port and identity. When an HTTP proxy
//! applies to the first hop, that hop gets its own `ProxyCommand` running
//! `hostexec _http-connect`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempPath;

use crate::application::ports::{CommandRunner, Connector, FileTransfer, ShellExecutor};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::proxy::HttpTunnel;
use crate::domain::config::SshConfig;
use crate::domain::shell::{escape_tokens, quote};
use crate::domain::{Auth, ConnectionSpec, Endpoint, PrivateKey};

/// Exit status the OpenSSH client reserves for its own failures.
const SSH_ERROR_STATUS: i32 = 255;

/// Client options shared by the target and relay invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    pub program: String,
    pub connect_timeout_secs: u64,
    pub strict_host_key_checking: String,
    pub known_hosts_file: Option<PathBuf>,
    /// HTTP proxy for the first hop.
    pub http_tunnel: Option<HttpTunnel>,
}

impl SshOptions {
    #[must_use]
    pub fn with_http_tunnel(self, http_tunnel: Option<HttpTunnel>) -> Self {
        Self {
            http_tunnel,
            ..self
        }
    }
}

impl From<&SshConfig> for SshOptions {
    fn from(config: &SshConfig) -> Self {
        Self {
            program: config.program.clone(),
            connect_timeout_secs: config.connect_timeout_secs,
            strict_host_key_checking: config.strict_host_key_checking.clone(),
            known_hosts_file: config.known_hosts_file.as_ref().map(PathBuf::from),
            http_tunnel: None,
        }
    }
}

/// Options for one hop: port, batch mode, timeouts, host keys, identity.
fn hop_options(options: &SshOptions, port: u16, identity: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        port.to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", options.connect_timeout_secs),
        "-o".to_string(),
        format!("StrictHostKeyChecking={}", options.strict_host_key_checking),
    ];
    if let Some(known_hosts) = &options.known_hosts_file {
        args.push("-o".to_string());
        args.push(format!(
            "UserKnownHostsFile={}",
            escape_tokens(&known_hosts.display().to_string())
        ));
    }
    if let Some(path) = identity {
        args.push("-i".to_string());
        args.push(escape_tokens(&path.display().to_string()));
        args.push("-o".to_string());
        args.push("IdentitiesOnly=yes".to_string());
    }
    args
}

/// `ProxyCommand=...` option for the first hop, when the HTTP proxy applies
/// to it.
fn http_proxy_option(options: &SshOptions, hop: &Endpoint) -> Option<String> {
    let tunnel = options
        .http_tunnel
        .as_ref()
        .filter(|t| t.settings.applies_to(&hop.host, hop.port))?;
    let helper = escape_tokens(&tunnel.helper.display().to_string());
    Some(format!("ProxyCommand={} _http-connect %h %p", quote(&helper)))
}

/// `ProxyCommand` value that tunnels through `relay`. Every word is escaped
/// once more because the target's client expands `%` tokens in it before
/// the relay's client sees them.
fn proxy_command(options: &SshOptions, relay: &Endpoint, identity: Option<&Path>) -> String {
    let mut args = hop_options(options, relay.port, identity);
    if let Some(proxy) = http_proxy_option(options, relay) {
        args.push("-o".to_string());
        args.push(proxy);
    }
    let word = |value: &str| quote(&escape_tokens(value));
    let mut words = vec![word(&options.program)];
    words.extend(args.iter().map(|a| word(a)));
    words.push("-W".to_string());
    words.push("%h:%p".to_string());
    words.push(word(&relay.destination()));
    words.join(" ")
}

/// Full argument list up to and including the destination. The remote
/// command is appended as a single final argument.
#[must_use]
pub fn session_args(options: &SshOptions, spec: &ConnectionSpec, identity: Option<&Path>) -> Vec<String> {
    let mut args = hop_options(options, spec.target.port, identity);
    let first_hop_proxy = match &spec.relay {
        Some(relay) => Some(format!("ProxyCommand={}", proxy_command(options, relay, identity))),
        None => http_proxy_option(options, &spec.target),
    };
    if let Some(proxy) = first_hop_proxy {
        args.push("-o".to_string());
        args.push(proxy);
    }
    args.push("--".to_string());
    args.push(spec.target.destination());
    args
}

/// Write key material to a private temporary file, removed on drop.
fn write_identity(key: &PrivateKey) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("hostexec-id-")
        .tempfile()
        .context("cannot create identity file")?;
    let material = key.expose();
    file.write_all(material.as_bytes())
        .context("cannot write identity file")?;
    // OpenSSH rejects keys without a trailing newline.
    if !material.ends_with('\n') {
        file.write_all(b"\n").context("cannot write identity file")?;
    }
    file.flush().context("cannot write identity file")?;
    let path = file.into_temp_path();
    set_private(&path)?;
    Ok(path)
}

#[cfg(unix)]
fn set_private(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("cannot set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_private(_path: &Path) -> Result<()> {
    Ok(())
}

/// Production `Connector` backed by the OpenSSH client.
///
/// Uploads go through `transfer_runner`, whose default timeout bounds each
/// transfer; commands go through `exec_runner` with a per-call timeout.
pub struct OpenSshConnector<R> {
    options: SshOptions,
    transfer_runner: R,
    exec_runner: R,
}

impl<R: CommandRunner + Clone> OpenSshConnector<R> {
    #[must_use]
    pub fn new(options: SshOptions, transfer_runner: R, exec_runner: R) -> Self {
        Self {
            options,
            transfer_runner,
            exec_runner,
        }
    }
}

impl OpenSshConnector<TokioCommandRunner> {
    /// Production connector: uploads are bounded by `transfer_timeout`,
    /// commands by the timeout passed to each `exec`, defaulting to
    /// `command_timeout`.
    #[must_use]
    pub fn spawning(options: SshOptions, transfer_timeout: Duration, command_timeout: Duration) -> Self {
        Self::new(
            options,
            TokioCommandRunner::new(transfer_timeout),
            TokioCommandRunner::new(command_timeout),
        )
    }
}

impl<R: CommandRunner + Clone> Connector for OpenSshConnector<R> {
    type Host = OpenSshHost<R>;

    /// Prepare a session. Writes the identity file when key auth is used;
    /// no network traffic happens until the first upload or command.
    async fn connect(&self, spec: &ConnectionSpec) -> Result<OpenSshHost<R>> {
        let identity = match &spec.auth {
            Auth::PrivateKey(key) => Some(write_identity(key)?),
            Auth::Agent => None,
        };
        let args = session_args(&self.options, spec, identity.as_deref());
        tracing::debug!(
            destination = %spec.target,
            relay = ?spec.relay.as_ref().map(ToString::to_string),
            agent = identity.is_none(),
            "ssh session prepared"
        );
        Ok(OpenSshHost {
            program: self.options.program.clone(),
            destination: spec.target.destination(),
            args,
            transfer_runner: self.transfer_runner.clone(),
            exec_runner: self.exec_runner.clone(),
            _identity: identity,
        })
    }
}

/// One prepared SSH session. Dropping it removes the identity file.
pub struct OpenSshHost<R> {
    program: String,
    destination: String,
    args: Vec<String>,
    transfer_runner: R,
    exec_runner: R,
    _identity: Option<TempPath>,
}

impl<R> OpenSshHost<R> {
    fn argv<'a>(&'a self, remote_command: &'a str) -> Vec<&'a str> {
        let mut argv: Vec<&str> = self.args.iter().map(String::as_str).collect();
        argv.push(remote_command);
        argv
    }

    /// Separate client failures (status 255) from remote command results.
    fn check_transport(&self, output: Output) -> Result<Output> {
        if output.status.code() == Some(SSH_ERROR_STATUS) {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "ssh connection to {} failed: {}",
                self.destination,
                stderr.trim()
            );
        }
        Ok(output)
    }
}

impl<R: CommandRunner> FileTransfer for OpenSshHost<R> {
    async fn upload(&self, content: &[u8], destination: &str) -> Result<Output> {
        let remote = format!("cat > {}", quote(destination));
        let output = self
            .transfer_runner
            .run_with_stdin(&self.program, &self.argv(&remote), content)
            .await?;
        self.check_transport(output)
    }
}

impl<R: CommandRunner> ShellExecutor for OpenSshHost<R> {
    async fn exec(&self, command: &str, timeout: Duration) -> Result<Output> {
        let output = self
            .exec_runner
            .run_with_timeout(&self.program, &self.argv(command), timeout)
            .await?;
        self.check_transport(output)
    }
}
