//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of the storefront (checkout redirect fallback)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//! - `IDENTITY_API_KEY` - Identity Toolkit web API key (token verification)
//! - `IDENTITY_PROJECT_ID` - Identity Toolkit project ID (identity listing)
//! - `IDENTITY_SERVICE_TOKEN` - Service bearer token for identity listing
//! - `ADMIN_IDENTITY_IDS` - Comma-separated identity IDs allowed to use admin endpoints
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_ALLOWED_ORIGINS` - Comma-separated CORS origins (default: base URL)
//! - `CHECKOUT_SUCCESS_PATH` - Path appended to the origin after payment
//! - `CHECKOUT_CANCEL_PATH` - Path appended to the origin when payment is abandoned
//! - `STRIPE_CURRENCY` - Store currency (default: INR)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` - Maximum webhook signature age (default: 300)
//! - `STRIPE_ACK_RECONCILE_FAILURES` - Acknowledge webhooks whose reconciliation failed (default: true)
//! - `IDENTITY_API_BASE` - Identity Toolkit base URL
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Outbound email
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use wovry_core::{CurrencyCode, IdentityId};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_SUCCESS_PATH: &str = "/payment-success.html?session_id={CHECKOUT_SESSION_ID}";
const DEFAULT_CANCEL_PATH: &str = "/payment-cancel.html";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without a trailing slash
    pub base_url: String,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
    /// Redirect targets for the hosted payment page
    pub checkout: CheckoutConfig,
    /// Payment processor configuration
    pub stripe: StripeConfig,
    /// Authentication provider configuration
    pub identity: IdentityConfig,
    /// Outbound email (notifications are skipped when absent)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Where the payment processor sends the shopper afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Appended to the origin on success. `{CHECKOUT_SESSION_ID}` is filled in by Stripe.
    pub success_path: String,
    /// Appended to the origin when the shopper abandons payment.
    pub cancel_path: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            success_path: DEFAULT_SUCCESS_PATH.to_string(),
            cancel_path: DEFAULT_CANCEL_PATH.to_string(),
        }
    }
}

impl CheckoutConfig {
    /// Success URL for a given storefront origin.
    #[must_use]
    pub fn success_url(&self, origin: &str) -> String {
        join_url(origin, &self.success_path)
    }

    /// Cancel URL for a given storefront origin.
    #[must_use]
    pub fn cancel_url(&self, origin: &str) -> String {
        join_url(origin, &self.cancel_path)
    }
}

/// Stripe configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// Currency every checkout is charged in
    pub currency: CurrencyCode,
    /// API base URL, overridable for a local mock
    pub api_base: String,
    /// Maximum age of a webhook signature timestamp
    pub webhook_tolerance: Duration,
    /// Acknowledge (200) authenticated events whose reconciliation failed
    pub ack_reconcile_failures: bool,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("api_base", &self.api_base)
            .field("webhook_tolerance", &self.webhook_tolerance)
            .field("ack_reconcile_failures", &self.ack_reconcile_failures)
            .finish()
    }
}

/// Authentication provider configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Identity Toolkit base URL
    pub api_base: String,
    /// Web API key used for token lookups
    pub api_key: SecretString,
    /// Project whose accounts are listed
    pub project_id: String,
    /// Service bearer token for the listing endpoint
    pub service_token: SecretString,
    /// Identities allowed to use the admin endpoints
    pub admin_ids: BTreeSet<IdentityId>,
}

impl IdentityConfig {
    /// Whether the identity is an administrator.
    #[must_use]
    pub fn is_admin(&self, id: &IdentityId) -> bool {
        self.admin_ids.contains(id)
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("service_token", &"[REDACTED]")
            .field("admin_ids", &self.admin_ids)
            .finish()
    }
}

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// `From` header, e.g. `Knit & Purl <hello@wovry.shop>`
    pub from_address: String,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = trim_origin(&get_required_env("STOREFRONT_BASE_URL")?);

        let mut allowed_origins: Vec<String> = get_optional_env("STOREFRONT_ALLOWED_ORIGINS")
            .map(|raw| parse_list(&raw).into_iter().map(|o| trim_origin(&o)).collect())
            .unwrap_or_default();
        if allowed_origins.is_empty() {
            allowed_origins.push(base_url.clone());
        }

        let checkout = CheckoutConfig {
            success_path: get_env_or_default("CHECKOUT_SUCCESS_PATH", DEFAULT_SUCCESS_PATH),
            cancel_path: get_env_or_default("CHECKOUT_CANCEL_PATH", DEFAULT_CANCEL_PATH),
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            allowed_origins,
            checkout,
            stripe: StripeConfig::from_env()?,
            identity: IdentityConfig::from_env()?,
            email: EmailConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The origin to build checkout redirects against.
    ///
    /// A request `Origin` is only trusted when it is one of the allowed
    /// origins; anything else falls back to the base URL.
    #[must_use]
    pub fn redirect_origin<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .map(|o| o.trim_end_matches('/'))
            .filter(|o| self.allowed_origins.iter().any(|allowed| allowed == o))
            .unwrap_or(&self.base_url)
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("STRIPE_CURRENCY", "INR");
        let currency = CurrencyCode::from_str(&currency)
            .map_err(|e| ConfigError::InvalidEnvVar("STRIPE_CURRENCY".to_string(), e))?;

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            currency,
            api_base: trim_origin(&get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE)),
            webhook_tolerance: Duration::from_secs(parse_env_or_default(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                "300",
            )?),
            ack_reconcile_failures: get_bool_env("STRIPE_ACK_RECONCILE_FAILURES", true)?,
        })
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let admin_ids: BTreeSet<IdentityId> = parse_list(&get_required_env("ADMIN_IDENTITY_IDS")?)
            .into_iter()
            .map(IdentityId::new)
            .collect();
        if admin_ids.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_IDENTITY_IDS".to_string(),
                "must name at least one identity".to_string(),
            ));
        }

        Ok(Self {
            api_base: trim_origin(&get_env_or_default(
                "IDENTITY_API_BASE",
                DEFAULT_IDENTITY_API_BASE,
            )),
            api_key: get_required_secret("IDENTITY_API_KEY")?,
            project_id: get_required_env("IDENTITY_PROJECT_ID")?,
            service_token: get_validated_secret("IDENTITY_SERVICE_TOKEN")?,
            admin_ids,
        })
    }
}

impl EmailConfig {
    /// SMTP is optional: without `SMTP_HOST` notifications are disabled.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env_or_default("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        parse_bool(&raw).ok_or_else(|| {
            ConfigError::InvalidEnvVar(key.to_string(), format!("expected a boolean, got '{raw}'"))
        })
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated variable into trimmed, non-empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn trim_origin(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn join_url(origin: &str, path: &str) -> String {
    let origin = origin.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{origin}{path}")
    } else {
        format!("{origin}/{path}")
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys and signing secrets are random strings
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/wovry"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://wovry.shop".to_string(),
            allowed_origins: vec![
                "https://wovry.shop".to_string(),
                "http://localhost:5500".to_string(),
            ],
            checkout: CheckoutConfig::default(),
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
                webhook_secret: SecretString::from("whsec_Qm9vZ2xlZ29vZ2xlZ29vZ2xl"),
                currency: CurrencyCode::INR,
                api_base: DEFAULT_STRIPE_API_BASE.to_string(),
                webhook_tolerance: Duration::from_secs(300),
                ack_reconcile_failures: true,
            },
            identity: IdentityConfig {
                api_base: DEFAULT_IDENTITY_API_BASE.to_string(),
                api_key: SecretString::from("AIzaSyD-key"),
                project_id: "wovry".to_string(),
                service_token: SecretString::from("ya29.service-token"),
                admin_ids: BTreeSet::from([IdentityId::new("admin-uid")]),
            },
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-stripe-key-here", "STRIPE_SECRET_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "STRIPE_SECRET_KEY").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_real_looking_keys() {
        assert!(validate_secret_strength("sk_test_4eC39HqLyjWDarjtT1zdp7dc", "K").is_ok());
        assert!(validate_secret_strength("whsec_Qm9vZ2xlZ29vZ2xlZ29vZ2xl", "K").is_ok());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_checkout_urls() {
        let checkout = CheckoutConfig::default();
        assert_eq!(
            checkout.success_url("https://wovry.shop/"),
            "https://wovry.shop/payment-success.html?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            checkout.cancel_url("https://wovry.shop"),
            "https://wovry.shop/payment-cancel.html"
        );
    }

    #[test]
    fn test_redirect_origin_only_trusts_allowed_origins() {
        let config = config();
        assert_eq!(
            config.redirect_origin(Some("http://localhost:5500/")),
            "http://localhost:5500"
        );
        assert_eq!(
            config.redirect_origin(Some("https://evil.example")),
            "https://wovry.shop"
        );
        assert_eq!(config.redirect_origin(None), "https://wovry.shop");
    }

    #[test]
    fn test_is_admin() {
        let config = config();
        assert!(config.identity.is_admin(&IdentityId::new("admin-uid")));
        assert!(!config.identity.is_admin(&IdentityId::new("shopper")));
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config();
        let debug_output = format!("{:?} {:?}", config.stripe, config.identity);

        assert!(debug_output.contains("INR"));
        assert!(debug_output.contains("admin-uid"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_4eC39HqLyjWDarjtT1zdp7dc"));
        assert!(!debug_output.contains("whsec_"));
        assert!(!debug_output.contains("ya29"));
    }
}
