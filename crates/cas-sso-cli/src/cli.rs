//! Command line arguments.
//!
//! Every connection setting can also come from the environment
//! (`CAS_SSO_PROVIDER_URL`, `CAS_SSO_SERVICE_URL`, ...), so scripts only need
//! to pass the subcommand.

use cas_sso::{ClientConfig, HttpConfig, LoginOptions, ProtocolVersion};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// CAS single sign-on client
#[derive(Debug, Parser)]
#[command(name = "cas-sso", about = "Talk to a CAS server from the command line", version)]
pub struct Cli {
    /// CAS server URL, e.g. https://cas.example.com/cas
    #[arg(long, env = "CAS_SSO_PROVIDER_URL", global = true)]
    pub provider: Option<String>,

    /// URL of the protected application
    #[arg(long, env = "CAS_SSO_SERVICE_URL", global = true)]
    pub service: Option<String>,

    /// URL CAS sends the browser back to after login (defaults to the service URL)
    #[arg(long, env = "CAS_SSO_CALLBACK_URL", global = true)]
    pub callback: Option<String>,

    /// Protocol version: 1.0, 2.0, 3.0 or saml
    #[arg(long, env = "CAS_SSO_PROTOCOL_VERSION", default_value = "2.0", global = true)]
    pub protocol: ProtocolVersion,

    /// HTTP backend: reqwest or hyper (first available when unset)
    #[arg(long, env = "CAS_SSO_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the URL of the CAS login form
    LoginUrl {
        /// Do not prompt for credentials when there is no SSO session
        #[arg(long)]
        gateway: bool,
        /// Force a fresh login
        #[arg(long)]
        renew: bool,
        /// Ask CAS to return the ticket with a POST
        #[arg(long)]
        post: bool,
    },

    /// Print the URL ending the SSO session
    LogoutUrl,

    /// Print the ticket carried by a callback URL
    Ticket {
        /// URL the browser came back with
        url: String,
    },

    /// Validate a service or proxy ticket and print the result as JSON
    Validate {
        /// Ticket to validate (ST-... or PT-...)
        ticket: String,
        /// Accept only tickets from a fresh login
        #[arg(long)]
        renew: bool,
        /// Request a proxy-granting ticket delivered to this URL
        #[arg(long)]
        pgt_url: Option<String>,
        /// Use the proxyValidate endpoint and report the proxy chain
        #[arg(long)]
        proxy: bool,
    },

    /// Obtain a proxy ticket for another service
    Proxy {
        /// Proxy-granting ticket
        pgt: String,
        /// Service the proxy ticket is for
        target_service: String,
    },

    /// Post credentials to the CAS login form
    Login {
        /// Account name
        #[arg(long)]
        username: String,
        /// Account password
        #[arg(long, env = "CAS_SSO_PASSWORD", hide_env_values = true)]
        password: String,
        /// Ask for a long-term session
        #[arg(long)]
        remember: bool,
        /// Extra form fields as name=value
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Log out on the CAS server
    Logout,

    /// Decode a single-logout request posted by CAS (`-` reads stdin)
    ParseLogout {
        /// File holding the raw POST body
        input: PathBuf,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

impl Cli {
    /// Parse the process arguments
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Client configuration from the connection arguments
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let provider = self
            .provider
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--provider or CAS_SSO_PROVIDER_URL is required"))?;
        let service = self
            .service
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--service or CAS_SSO_SERVICE_URL is required"))?;
        let callback = self.callback.as_deref().unwrap_or(service);

        let mut http = HttpConfig::from_env()?;
        if let Some(seconds) = self.timeout {
            http = http.with_timeout(Duration::from_secs(seconds));
        }

        Ok(ClientConfig::new(provider, service, callback)?
            .with_version(self.protocol)
            .with_http(http))
    }
}

impl Command {
    /// Whether the command talks to the CAS server
    pub const fn needs_network(&self) -> bool {
        matches!(
            self,
            Self::Validate { .. } | Self::Proxy { .. } | Self::Login { .. } | Self::Logout
        )
    }

    /// Login form flags of `login-url`
    pub const fn login_options(&self) -> Option<LoginOptions> {
        match self {
            Self::LoginUrl {
                gateway,
                renew,
                post,
            } => Some(LoginOptions {
                gateway: *gateway,
                renew: *renew,
                use_post: *post,
            }),
            _ => None,
        }
    }
}
