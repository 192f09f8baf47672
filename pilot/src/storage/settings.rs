//! Typed view of the configuration document

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::logs::LogLevel;
use crate::models::deployment::Environment;
use crate::utils::join_url;

/// Deployment assistant settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Per-environment settings keyed by environment name
    #[serde(default = "default_environments")]
    pub environments: BTreeMap<String, EnvironmentSettings>,

    /// VPS provider settings keyed by provider name. Shapes differ per
    /// provider so entries are kept as raw JSON.
    #[serde(default = "default_vps_providers")]
    pub vps_providers: BTreeMap<String, Value>,

    /// PaaS (Coolify) API settings
    #[serde(default)]
    pub coolify: CoolifySettings,

    /// Deployment policy
    #[serde(default)]
    pub deployment: DeploymentSettings,

    #[serde(default)]
    pub monitoring: MonitoringSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ssl: SslSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environments: default_environments(),
            vps_providers: default_vps_providers(),
            coolify: CoolifySettings::default(),
            deployment: DeploymentSettings::default(),
            monitoring: MonitoringSettings::default(),
            database: DatabaseSettings::default(),
            ssl: SslSettings::default(),
            notifications: NotificationSettings::default(),
            log_level: LogLevel::Info,
        }
    }
}

impl Settings {
    pub fn environment(&self, env: Environment) -> Option<&EnvironmentSettings> {
        self.environments.get(env.as_str())
    }

    /// Provider settings; `None` for unknown or empty entries
    pub fn vps_provider(&self, provider: &str) -> Option<&Value> {
        self.vps_providers.get(provider).filter(|v| match v {
            Value::Object(map) => !map.is_empty(),
            Value::Null => false,
            _ => true,
        })
    }

    /// Absolute health check URL for `env`.
    ///
    /// Relative `monitoring.health_check_url` values are joined to the
    /// environment's `app_url`. Returns `None` when no usable URL can be
    /// built.
    pub fn health_check_url(&self, env: Environment) -> Option<String> {
        let configured = self.monitoring.health_check_url.trim();
        if configured.is_empty() {
            return None;
        }
        if let Ok(url) = url::Url::parse(configured) {
            return Some(url.to_string());
        }

        let base = self.environment(env)?.app_url.as_deref()?;
        join_url(base, configured).map(|u| u.to_string())
    }
}

fn default_environments() -> BTreeMap<String, EnvironmentSettings> {
    [
        (Environment::Development, "docker-compose.local.yml"),
        (Environment::Staging, "docker-compose.vps.yml"),
        (Environment::Production, "docker-compose.production.yml"),
    ]
    .into_iter()
    .map(|(env, file)| {
        (
            env.as_str().to_string(),
            EnvironmentSettings {
                docker_compose_file: file.to_string(),
                ..Default::default()
            },
        )
    })
    .collect()
}

fn default_vps_providers() -> BTreeMap<String, Value> {
    let mut providers = BTreeMap::new();
    providers.insert(
        "vultr".to_string(),
        json!({
            "api_endpoint": "https://api.vultr.com/v2",
            "default_region": "ewr",
            "instance_type": "vc2-1c-1gb",
            "os_id": 387,
            "ssh_key_name": "nutrition-platform-key"
        }),
    );
    providers.insert(
        "digitalocean".to_string(),
        json!({
            "api_endpoint": "https://api.digitalocean.com/v2",
            "default_region": "nyc1",
            "instance_size": "s-1vcpu-1gb",
            "image": "ubuntu-20-04-x64"
        }),
    );
    providers
}

fn default_true() -> bool {
    true
}

/// Settings of one deployment environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    /// Compose file used for this environment
    #[serde(default = "default_compose_file")]
    pub docker_compose_file: String,

    #[serde(default)]
    pub build_args: Map<String, Value>,

    #[serde(default)]
    pub environment_variables: Map<String, Value>,

    /// Public base URL of the deployed application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
}

fn default_compose_file() -> String {
    "docker-compose.yml".to_string()
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            docker_compose_file: default_compose_file(),
            build_args: Map::new(),
            environment_variables: Map::new(),
            app_url: None,
        }
    }
}

/// PaaS API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoolifySettings {
    #[serde(default = "default_coolify_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_token: String,

    #[serde(default = "default_project_name")]
    pub project_name: String,

    #[serde(default = "default_environment")]
    pub default_environment: String,
}

fn default_coolify_url() -> String {
    "https://your-coolify-instance.com".to_string()
}

fn default_project_name() -> String {
    "nutrition-platform".to_string()
}

fn default_environment() -> String {
    "production".to_string()
}

impl Default for CoolifySettings {
    fn default() -> Self {
        Self {
            base_url: default_coolify_url(),
            api_token: String::new(),
            project_name: default_project_name(),
            default_environment: default_environment(),
        }
    }
}

/// Deployment policy. The orchestrator keeps its own copy, so edits to
/// the configuration file do not reach a deployment already running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "retry_delay", default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Upper bound of the monitoring loop
    #[serde(rename = "timeout", default = "default_monitor_timeout")]
    pub monitor_timeout_secs: u64,

    /// Fixed cadence of status polls
    #[serde(rename = "health_check_interval", default = "default_poll_interval")]
    pub health_check_interval_secs: u64,

    #[serde(default = "default_true")]
    pub backup_before_deploy: bool,

    #[serde(default = "default_true")]
    pub rollback_on_failure: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    30
}

fn default_monitor_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    10
}

impl DeploymentSettings {
    pub fn monitor_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }
}

impl Default for DeploymentSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            monitor_timeout_secs: default_monitor_timeout(),
            health_check_interval_secs: default_poll_interval(),
            backup_before_deploy: true,
            rollback_on_failure: true,
        }
    }
}

/// Monitoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Absolute URL, or a path joined to the environment's `app_url`
    #[serde(default = "default_health_url")]
    pub health_check_url: String,

    #[serde(default = "default_log_retention")]
    pub log_retention_days: u32,

    #[serde(default)]
    pub alert_webhook: String,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_health_url() -> String {
    "/api/health".to_string()
}

fn default_log_retention() -> u32 {
    30
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            health_check_url: default_health_url(),
            log_retention_days: default_log_retention(),
            alert_webhook: String::new(),
            metrics_enabled: true,
        }
    }
}

/// Database and backup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Backup root, relative to the project directory unless absolute
    #[serde(default = "default_backup_path")]
    pub backup_path: String,

    #[serde(default = "default_backup_retention")]
    pub retention_days: u32,

    #[serde(default = "default_true")]
    pub auto_backup: bool,

    #[serde(default = "default_backup_schedule")]
    pub backup_schedule: String,
}

fn default_backup_path() -> String {
    "./backups".to_string()
}

fn default_backup_retention() -> u32 {
    7
}

fn default_backup_schedule() -> String {
    "0 2 * * *".to_string()
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backup_path: default_backup_path(),
            retention_days: default_backup_retention(),
            auto_backup: true,
            backup_schedule: default_backup_schedule(),
        }
    }
}

/// TLS certificate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslSettings {
    #[serde(default = "default_true")]
    pub auto_renew: bool,

    #[serde(default = "default_ssl_provider")]
    pub provider: String,

    #[serde(default = "default_admin_email")]
    pub email: String,

    #[serde(default)]
    pub staging: bool,
}

fn default_ssl_provider() -> String {
    "letsencrypt".to_string()
}

fn default_admin_email() -> String {
    "admin@your-domain.com".to_string()
}

impl Default for SslSettings {
    fn default() -> Self {
        Self {
            auto_renew: true,
            provider: default_ssl_provider(),
            email: default_admin_email(),
            staging: false,
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub deployment_success: bool,

    #[serde(default = "default_true")]
    pub deployment_failure: bool,

    #[serde(default = "default_recipients")]
    pub email_recipients: Vec<String>,

    #[serde(default)]
    pub slack_webhook: String,
}

fn default_recipients() -> Vec<String> {
    vec![default_admin_email()]
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            deployment_success: true,
            deployment_failure: true,
            email_recipients: default_recipients(),
            slack_webhook: String::new(),
        }
    }
}
