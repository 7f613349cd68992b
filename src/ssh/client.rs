// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, key or password authentication, command execution, and upload.

use super::error::{Error, Result};
use super::state::SessionState;
use super::transfer;
use crate::events::{Event, SessionEvent, SharedSink};
use parking_lot::Mutex;
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, decode_secret_key, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Where a private key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Key file on the local disk.
    Path(PathBuf),
    /// Key material given directly (PEM or OpenSSH format).
    Inline(String),
}

/// Credentials used to authenticate a session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    PrivateKey {
        key: KeySource,
        passphrase: Option<String>,
    },
    Password(String),
}

impl Credentials {
    /// Key file credentials without a passphrase.
    pub fn key_file(path: impl Into<PathBuf>) -> Self {
        Credentials::PrivateKey {
            key: KeySource::Path(path.into()),
            passphrase: None,
        }
    }

    pub fn password(password: impl Into<String>) -> Self {
        Credentials::Password(password.into())
    }
}

// Secrets never reach logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::PrivateKey {
                key: KeySource::Path(path),
                passphrase,
            } => f
                .debug_struct("PrivateKey")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Credentials::PrivateKey {
                key: KeySource::Inline(_),
                passphrase,
            } => f
                .debug_struct("PrivateKey")
                .field("inline", &"<redacted>")
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Credentials::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
        }
    }
}

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Private key or password.
    pub credentials: Credentials,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Timeout for command execution (default: 5 minutes).
    pub command_timeout: Duration,
    /// Timeout for one artifact upload (default: 30 minutes).
    pub transfer_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            credentials,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(300), // 5 minutes
            transfer_timeout: Duration::from_secs(1800),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// `host:port` for messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) => {
                // Host not in known_hosts
                if self.trust_on_first_use {
                    tracing::warn!(
                        "Trust-On-First-Use: accepting unknown host key for {}:{}",
                        self.host,
                        self.port
                    );
                    let learn_result = match &self.known_hosts_path {
                        Some(path) => {
                            learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                        }
                        None => learn_known_hosts(&self.host, self.port, server_public_key),
                    };
                    if let Err(e) = learn_result {
                        tracing::warn!("Failed to save host key to known_hosts: {}", e);
                    }
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!("Host key for {}:{} has changed", self.host, self.port);
                Ok(false)
            }
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// Authentication method resolved from credentials.
enum AuthMethod {
    Key(Arc<ssh_key::PrivateKey>),
    Password(String),
}

/// An established SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<SshHandler>,
    state: Mutex<SessionState>,
    events: SharedSink,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Session {
    /// Connect to the remote host over TCP.
    pub async fn connect(config: SessionConfig, events: SharedSink) -> Result<Self> {
        // Keys are loaded before any network traffic
        let auth_method = Self::resolve_auth_method(&config)?;

        events.emit(Event::Session(SessionEvent::Connecting {
            host: config.host.clone(),
            port: config.port,
            via_proxy: false,
        }));

        let handle = client::connect(
            Self::russh_config(),
            (config.host.as_str(), config.port),
            SshHandler::new(&config),
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("Connection refused") {
                Error::Connection(format!("connection refused to {}", config.address()))
            } else {
                Error::Connection(format!("{}: {}", config.address(), e))
            }
        });

        Self::establish(config, handle, auth_method, events).await
    }

    /// Connect over an already-open byte stream, such as a proxy tunnel.
    pub(crate) async fn connect_stream<S>(
        config: SessionConfig,
        stream: S,
        events: SharedSink,
    ) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let auth_method = Self::resolve_auth_method(&config)?;

        events.emit(Event::Session(SessionEvent::Connecting {
            host: config.host.clone(),
            port: config.port,
            via_proxy: true,
        }));

        let handle = client::connect_stream(Self::russh_config(), stream, SshHandler::new(&config))
            .await
            .map_err(|e| Error::Connection(format!("{} (via proxy): {}", config.address(), e)));

        Self::establish(config, handle, auth_method, events).await
    }

    fn russh_config() -> Arc<Config> {
        Arc::new(Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            keepalive_interval: Some(Duration::from_secs(10)),
            ..Default::default()
        })
    }

    /// Authenticate a freshly connected handle and report the outcome.
    async fn establish(
        config: SessionConfig,
        handle: Result<Handle<SshHandler>>,
        auth_method: AuthMethod,
        events: SharedSink,
    ) -> Result<Self> {
        let result = match handle {
            Ok(mut handle) => match Self::authenticate(&mut handle, &config, auth_method).await {
                Ok(true) => Ok(handle),
                Ok(false) => Err(Error::AuthenticationFailed {
                    user: config.user.clone(),
                    host: config.host.clone(),
                }),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(handle) => {
                events.emit(Event::Session(SessionEvent::Ready {
                    host: config.host.clone(),
                }));
                Ok(Self {
                    config,
                    handle,
                    state: Mutex::new(SessionState::Ready),
                    events,
                })
            }
            Err(e) => {
                events.emit(Event::Session(SessionEvent::Error {
                    host: config.host.clone(),
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    /// Resolve which authentication method to use.
    fn resolve_auth_method(config: &SessionConfig) -> Result<AuthMethod> {
        match &config.credentials {
            Credentials::PrivateKey { key, passphrase } => {
                let passphrase = passphrase.as_deref();
                let loaded = match key {
                    KeySource::Path(path) => {
                        load_secret_key(path, passphrase).map_err(|e| Error::KeyLoadFailed {
                            path: path.clone(),
                            reason: e.to_string(),
                        })?
                    }
                    KeySource::Inline(material) => decode_secret_key(material, passphrase)
                        .map_err(|e| Error::KeyLoadFailed {
                            path: PathBuf::from("<inline>"),
                            reason: e.to_string(),
                        })?,
                };
                Ok(AuthMethod::Key(Arc::new(loaded)))
            }
            Credentials::Password(password) => Ok(AuthMethod::Password(password.clone())),
        }
    }

    /// Authenticate the session.
    async fn authenticate(
        session: &mut Handle<SshHandler>,
        config: &SessionConfig,
        auth_method: AuthMethod,
    ) -> Result<bool> {
        match auth_method {
            AuthMethod::Key(key) => {
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(Error::Protocol)?
                    .flatten();

                let result = session
                    .authenticate_publickey(&config.user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await
                    .map_err(Error::Protocol)?;

                Ok(result.success())
            }
            AuthMethod::Password(password) => {
                let result = session
                    .authenticate_password(&config.user, password)
                    .await
                    .map_err(Error::Protocol)?;

                Ok(result.success())
            }
        }
    }

    /// Host this session is connected to.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub(crate) fn handle(&self) -> &Handle<SshHandler> {
        &self.handle
    }

    /// Execute a command on the remote host.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.command_timeout)
            .await
    }

    /// Execute a command with a custom timeout.
    pub async fn exec_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        self.begin()?;
        let result = match tokio::time::timeout(timeout, self.exec_inner(command)).await {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout(timeout)),
        };
        self.end();
        result
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        // stderr
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => {
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        // If the channel closed without providing an exit status, this indicates
        // an abnormal termination (e.g., connection timeout, network issue)
        if !got_exit_status {
            return Err(Error::ChannelClosed);
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    /// Copy a local file or directory into `remote_dir`, which must exist.
    pub async fn upload(&self, local: &Path, remote_dir: &str) -> Result<()> {
        self.begin()?;
        let timeout = self.config.transfer_timeout;
        tracing::debug!(
            "Uploading {} to {}:{}",
            local.display(),
            self.config.host,
            remote_dir
        );
        let result = match tokio::time::timeout(
            timeout,
            transfer::send_archive(&self.handle, local, remote_dir),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout(timeout)),
        };
        self.end();
        result
    }

    fn begin(&self) -> Result<()> {
        self.state.lock().transition(SessionState::Executing)
    }

    fn end(&self) {
        let mut state = self.state.lock();
        if *state == SessionState::Executing {
            *state = SessionState::Ready;
        }
    }

    /// Disconnect the session. Closing an already closed session is a no-op.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state == SessionState::Closed {
                return Ok(());
            }
            *state = SessionState::Closed;
        }

        let result = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol);

        self.events.emit(Event::Session(SessionEvent::Closed {
            host: self.config.host.clone(),
        }));
        result
    }
}
