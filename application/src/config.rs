//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::Debug;
use secrecy::SecretString;
use serde::Deserialize;
use service::infra::{in_memory, supabase};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Remote backend configuration.
    pub backend: Backend,

    /// Service configuration.
    pub service: Service,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Remote backend configuration.
///
/// The live backend is used only if both [`Backend::url`] and
/// [`Backend::anon_key`] are provided, otherwise the in-memory demo dataset
/// is served.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Backend {
    /// Base URL of the hosted project.
    pub url: Option<String>,

    /// Public anonymous key of the hosted project.
    #[debug(skip)]
    pub anon_key: Option<String>,

    /// Elevated service role key of the hosted project, enabling the
    /// administrative operations.
    #[debug(skip)]
    pub service_role_key: Option<String>,

    /// Timeout of a single request to the hosted project.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,

    /// Location the password recovery links should redirect to.
    pub password_reset_redirect: Option<String>,
}

impl Backend {
    /// Returns the [`supabase::Config`] of the live backend, if it's
    /// configured.
    ///
    /// Blank values are considered absent.
    ///
    /// # Errors
    ///
    /// If the configured [`Backend::url`] is not a valid URL.
    pub fn live(&self) -> Result<Option<supabase::Config>, url::ParseError> {
        fn present(value: Option<&String>) -> Option<&str> {
            value.map(|v| v.trim()).filter(|v| !v.is_empty())
        }

        let (Some(url), Some(anon_key)) =
            (present(self.url.as_ref()), present(self.anon_key.as_ref()))
        else {
            return Ok(None);
        };

        Ok(Some(supabase::Config {
            url: url.parse()?,
            anon_key: SecretString::from(anon_key),
            service_role_key: present(self.service_role_key.as_ref())
                .map(SecretString::from),
            timeout: self.timeout,
            password_reset_redirect: present(
                self.password_reset_redirect.as_ref(),
            )
            .map(ToOwned::to_owned),
        }))
    }
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Secret to sign the access tokens issued by the in-memory backend.
    #[debug(skip)]
    #[default("in-memory-backend-secret".to_owned())]
    pub jwt_secret: String,

    /// Lifetime of the sessions issued by the in-memory backend.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl Service {
    /// Returns the [`in_memory::Config`] of the in-memory backend.
    #[must_use]
    pub fn in_memory(&self) -> in_memory::Config {
        in_memory::Config {
            jwt_secret: SecretString::from(self.jwt_secret.as_str()),
            session_ttl: self.session_ttl,
        }
    }
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            tasks: Tasks {
                sweep_expired_sessions,
            },
            ..
        } = value;
        Self {
            sweep_expired_sessions:
                service::task::sweep_expired_sessions::Config {
                    interval: sweep_expired_sessions.interval,
                },
        }
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `SweepExpiredSessions` task configuration.
    pub sweep_expired_sessions: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
