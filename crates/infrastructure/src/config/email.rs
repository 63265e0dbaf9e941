//! Outbound email configuration: SMTP transport, subjects and templates.

use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::default_true;
use crate::{adapters::EmailSubjects, templates::TemplateConfig};

/// SMTP relay settings
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// Submission port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// Sender address
    #[serde(default = "default_from")]
    pub from: String,

    /// Optional display name for the sender
    #[serde(default)]
    pub from_name: Option<String>,

    /// Upgrade the connection with STARTTLS (default: true)
    #[serde(default = "default_true")]
    pub starttls: bool,

    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("from", &self.from)
            .field("from_name", &self.from_name)
            .field("starttls", &self.starttls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_from() -> String {
    "noreply@localhost".to_string()
}

const fn default_smtp_timeout() -> u64 {
    10
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from: default_from(),
            from_name: None,
            starttls: true,
            timeout_secs: default_smtp_timeout(),
        }
    }
}

/// Email content settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub subjects: EmailSubjects,

    /// Directory whose `*.html` files override the embedded templates
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

impl EmailConfig {
    #[must_use]
    pub fn template_config(&self) -> TemplateConfig {
        TemplateConfig {
            templates_dir: self.templates_dir.clone(),
        }
    }
}
