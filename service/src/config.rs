use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default Gemini REST API base URL used when `GEMINI_BASE_URL` is not set.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

/// Value shipped in the sample `.env`; never a usable key.
pub const PLACEHOLDER_GEMINI_API_KEY: &str = "your_gemini_api_key_here";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Startup configuration problems. The server refuses to start while any are present.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfigError {
    pub missing: Vec<&'static str>,
    pub invalid: Vec<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut problems = Vec::new();
        if !self.missing.is_empty() {
            problems.push(format!(
                "Missing required environment variables: {}",
                self.missing.join(", ")
            ));
        }
        problems.extend(self.invalid.iter().cloned());
        write!(f, "{}", problems.join("; "))
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that are allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:5173"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3001)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// The Zalo OA application ID. Required at startup; the `app_id` of inbound
    /// webhooks is not compared against it.
    #[arg(long, env)]
    oa_app_id: Option<String>,

    /// The OA secret key shared with webhook signers.
    #[arg(long, env, hide_env_values = true)]
    oa_secret_key: Option<String>,

    /// The API key to use when calling the Gemini API.
    #[arg(long, env, hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// The Gemini model that generates replies.
    #[arg(long, env, default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// The base URL of the Gemini REST API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_base_url: String,

    /// Seconds to wait for an AI reply before abandoning the call
    #[arg(long, env, default_value_t = 30)]
    pub ai_request_timeout_secs: u64,

    /// Retries of transient AI provider failures (5xx, 429, connection errors)
    #[arg(long, env, default_value_t = 2)]
    pub ai_max_retries: u32,

    /// Reject signed webhooks whose timestamp is more than this many seconds from server
    /// time. Unset disables the check, which matches the Zalo platform behavior.
    #[arg(long, env)]
    webhook_max_age_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Check everything the server needs before it accepts traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        if is_blank(&self.oa_app_id) {
            missing.push("OA_APP_ID");
        }
        if is_blank(&self.oa_secret_key) {
            missing.push("OA_SECRET_KEY");
        }
        match self.gemini_api_key.as_deref().map(str::trim) {
            None | Some("") => missing.push("GEMINI_API_KEY"),
            Some(PLACEHOLDER_GEMINI_API_KEY) => invalid.push(
                "GEMINI_API_KEY is still the placeholder value; set a valid API key".to_string(),
            ),
            Some(_) => {}
        }
        if self.gemini_model.trim().is_empty() {
            missing.push("GEMINI_MODEL");
        }
        if self.allowed_origins.iter().all(|origin| origin.trim().is_empty()) {
            missing.push("ALLOWED_ORIGINS");
        }
        if self.ai_request_timeout_secs == 0 {
            invalid.push("AI_REQUEST_TIMEOUT_SECS must be greater than zero".to_string());
        }

        if missing.is_empty() && invalid.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { missing, invalid })
        }
    }

    pub fn oa_app_id(&self) -> Option<&str> {
        self.oa_app_id.as_deref()
    }

    /// Returns the OA secret key, if configured.
    pub fn oa_secret_key(&self) -> Option<SecretString> {
        self.oa_secret_key.clone().map(SecretString::new)
    }

    /// Returns the Gemini API key, if configured.
    pub fn gemini_api_key(&self) -> Option<SecretString> {
        self.gemini_api_key.clone().map(SecretString::new)
    }

    pub fn gemini_model(&self) -> &str {
        &self.gemini_model
    }

    pub fn gemini_base_url(&self) -> &str {
        &self.gemini_base_url
    }

    pub fn ai_request_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_request_timeout_secs)
    }

    pub fn webhook_max_age(&self) -> Option<Duration> {
        self.webhook_max_age_secs.map(Duration::from_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["chatbot_zalo_simulator"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    fn complete_args() -> Vec<&'static str> {
        vec![
            "--oa-app-id",
            "demo_app_id",
            "--oa-secret-key",
            "demo_secret",
            "--gemini-api-key",
            "AIza-test",
        ]
    }

    #[test]
    fn test_complete_config_validates() {
        let config = parse(&complete_args());
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.oa_app_id(), Some("demo_app_id"));
        assert_eq!(
            config.oa_secret_key().unwrap().expose_secret(),
            "demo_secret"
        );
    }

    #[test]
    fn test_placeholder_gemini_key_is_rejected() {
        let config = parse(&[
            "--oa-app-id",
            "demo_app_id",
            "--oa-secret-key",
            "demo_secret",
            "--gemini-api-key",
            "your_gemini_api_key_here",
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.missing.is_empty());
        assert_eq!(err.invalid.len(), 1);
    }

    #[test]
    fn test_missing_app_id_is_reported() {
        let config = parse(&[
            "--oa-secret-key",
            "demo_secret",
            "--gemini-api-key",
            "AIza-test",
        ]);
        let err = config.validate().unwrap_err();
        assert_eq!(err.missing, vec!["OA_APP_ID"]);
        assert_eq!(config.oa_app_id(), None);
    }

    #[test]
    fn test_config_error_lists_missing_variables() {
        let err = ConfigError {
            missing: vec!["OA_APP_ID", "GEMINI_API_KEY"],
            invalid: vec![],
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: OA_APP_ID, GEMINI_API_KEY"
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut args = complete_args();
        args.extend_from_slice(&["--ai-request-timeout-secs", "0"]);
        assert!(parse(&args).validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = parse(&complete_args());
        assert_eq!(config.ai_request_timeout(), Duration::from_secs(30));
        assert_eq!(config.gemini_base_url(), DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn test_webhook_max_age_flag() {
        let mut args = complete_args();
        args.extend_from_slice(&["--webhook-max-age-secs", "300"]);
        assert_eq!(
            parse(&args).webhook_max_age(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_cors_origins_split_on_comma() {
        let mut args = complete_args();
        args.extend_from_slice(&[
            "--allowed-origins",
            "http://localhost:5173,https://chat.example.com",
        ]);
        assert_eq!(
            parse(&args).allowed_origins,
            vec!["http://localhost:5173", "https://chat.example.com"]
        );
    }

    #[test]
    fn test_rust_env_parse() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("prod".parse::<RustEnv>(), Err(RustEnvParseError));
    }
}
