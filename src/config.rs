//! Configuration file: defaults, receivers and the template file.
//!
//! Each receiver inherits every setting it leaves unset from `defaults`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::template::{Template, TemplateError};

/// Environment variable consulted when no `password` is configured.
pub const PASSWORD_ENV: &str = "TICKETEER_JIRA_PASSWORD";

const DEFAULT_LABEL_KEY: &str = "alertname";

/// Failure loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid YAML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A required setting is missing after applying defaults.
    #[error("receiver {receiver:?}: missing required setting {field:?}")]
    Missing {
        /// Receiver name, or its position if unnamed.
        receiver: String,
        /// Setting name.
        field: &'static str,
    },
    /// Two receivers share a name.
    #[error("duplicate receiver name {0:?}")]
    Duplicate(String),
    /// The API URL does not parse.
    #[error("receiver {receiver:?}: invalid api_url {url:?}: {reason}")]
    InvalidUrl {
        /// Receiver name.
        receiver: String,
        /// Configured URL.
        url: String,
        /// Parse error.
        reason: String,
    },
    /// No receivers are configured.
    #[error("no receivers configured")]
    NoReceivers,
    /// `defaults` names a receiver; names must be given per receiver.
    #[error("`name` is not allowed under defaults, set it on each receiver")]
    NameInDefaults,
    /// The template file is broken.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Receiver settings as written in the file; every field may be inherited.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReceiverSettings {
    name: Option<String>,
    api_url: Option<String>,
    user: Option<String>,
    password: Option<String>,
    project: Option<String>,
    issue_type: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    priority: Option<String>,
    components: Option<Vec<String>>,
    reopen_state: Option<String>,
    #[serde(default, with = "humantime_serde")]
    reopen_duration: Option<Duration>,
    wont_fix_resolution: Option<String>,
    group_field_name: Option<String>,
    group_field_id: Option<String>,
    label_key: Option<String>,
    add_group_labels: Option<bool>,
    fields: Option<BTreeMap<String, String>>,
}

impl ReceiverSettings {
    /// Fills every unset field except `name` from `defaults`.
    fn inherit(self, defaults: &Self) -> Self {
        macro_rules! pick {
            ($($field:ident),* $(,)?) => {
                Self {
                    name: self.name,
                    $($field: self.$field.or_else(|| defaults.$field.clone()),)*
                }
            };
        }
        pick!(
            api_url,
            user,
            password,
            project,
            issue_type,
            summary,
            description,
            priority,
            components,
            reopen_state,
            reopen_duration,
            wont_fix_resolution,
            group_field_name,
            group_field_id,
            label_key,
            add_group_labels,
            fields,
        )
    }
}

/// Fully resolved configuration for one receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Receiver name, matched against the payload's `receiver`.
    pub name: String,
    /// JIRA base URL.
    pub api_url: String,
    /// JIRA user.
    pub user: String,
    /// JIRA password or API token.
    pub password: String,
    /// Project key template.
    pub project: String,
    /// Issue type template.
    pub issue_type: String,
    /// Summary template.
    pub summary: String,
    /// Description template.
    pub description: String,
    /// Priority template.
    pub priority: Option<String>,
    /// Component name templates.
    pub components: Vec<String>,
    /// Name of the transition used to reopen an issue.
    pub reopen_state: String,
    /// How long after resolution an issue is reopened rather than replaced.
    pub reopen_duration: Duration,
    /// Resolution that suppresses reopening and recreation.
    pub wont_fix_resolution: Option<String>,
    /// Name of the custom field holding the group id, as used in JQL.
    pub group_field_name: String,
    /// Id of that custom field, as used when creating issues.
    pub group_field_id: String,
    /// Group label copied onto the issue as its label.
    pub label_key: String,
    /// Whether to add every group label as an issue label.
    pub add_group_labels: bool,
    /// Extra custom fields: field id to value template. The group field
    /// takes precedence over an entry with the same id.
    pub fields: BTreeMap<String, String>,
}

impl ReceiverConfig {
    fn resolve(settings: ReceiverSettings, position: usize) -> Result<Self, ConfigError> {
        let receiver = settings.name.clone().unwrap_or_else(|| format!("#{position}"));
        let require = |value: Option<String>, field: &'static str| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::Missing { receiver: receiver.clone(), field })
        };

        let password = settings.password.or_else(|| std::env::var(PASSWORD_ENV).ok());

        let config = Self {
            name: require(settings.name, "name")?,
            api_url: require(settings.api_url, "api_url")?,
            user: require(settings.user, "user")?,
            password: require(password, "password")?,
            project: require(settings.project, "project")?,
            issue_type: require(settings.issue_type, "issue_type")?,
            summary: require(settings.summary, "summary")?,
            description: settings.description.unwrap_or_default(),
            priority: settings.priority.filter(|p| !p.is_empty()),
            components: settings.components.unwrap_or_default(),
            reopen_state: require(settings.reopen_state, "reopen_state")?,
            reopen_duration: settings.reopen_duration.ok_or_else(|| ConfigError::Missing {
                receiver: receiver.clone(),
                field: "reopen_duration",
            })?,
            wont_fix_resolution: settings.wont_fix_resolution.filter(|r| !r.is_empty()),
            group_field_name: require(settings.group_field_name, "group_field_name")?,
            group_field_id: require(settings.group_field_id, "group_field_id")?,
            label_key: settings.label_key.unwrap_or_else(|| DEFAULT_LABEL_KEY.to_string()),
            add_group_labels: settings.add_group_labels.unwrap_or(false),
            fields: settings.fields.unwrap_or_default(),
        };

        reqwest::Url::parse(&config.api_url).map_err(|e| ConfigError::InvalidUrl {
            receiver: config.name.clone(),
            url: config.api_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    defaults: ReceiverSettings,
    #[serde(default)]
    receivers: Vec<ReceiverSettings>,
    template: Option<PathBuf>,
}

/// The loaded configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resolved receivers, in file order.
    pub receivers: Vec<ReceiverConfig>,
    /// Template file, resolved against the config file's directory.
    pub template: Option<PathBuf>,
}

impl Config {
    /// Parses configuration text. Relative template paths resolve against
    /// `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a receiver is invalid.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        if raw.receivers.is_empty() {
            return Err(ConfigError::NoReceivers);
        }
        if raw.defaults.name.is_some() {
            return Err(ConfigError::NameInDefaults);
        }

        let mut seen = HashSet::new();
        let mut receivers = Vec::with_capacity(raw.receivers.len());
        for (position, settings) in raw.receivers.into_iter().enumerate() {
            let receiver = ReceiverConfig::resolve(settings.inherit(&raw.defaults), position)?;
            if !seen.insert(receiver.name.clone()) {
                return Err(ConfigError::Duplicate(receiver.name));
            }
            receivers.push(receiver);
        }

        let template = raw.template.map(|t| if t.is_absolute() { t } else { base_dir.join(t) });
        Ok(Self { receivers, template })
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base_dir)
    }

    /// Looks up a receiver by name.
    #[must_use]
    pub fn receiver(&self, name: &str) -> Option<&ReceiverConfig> {
        self.receivers.iter().find(|r| r.name == name)
    }

    /// Loads the configured template file, or an empty template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template file is broken.
    pub fn load_template(&self) -> Result<Template, ConfigError> {
        match &self.template {
            Some(path) => Ok(Template::from_file(path)?),
            None => Ok(Template::new()),
        }
    }
}
