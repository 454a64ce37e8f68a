// Configuration structures for SSH Tunnel Launcher

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// One tunnel definition, decoded from a single file in the tunnels directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TunnelConfig {
    /// Display name, taken from the definition's file stem
    #[serde(skip)]
    pub name: String,
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    /// SSH private key passed with `-i`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    /// ProxyCommand used to reach the remote host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_command: Option<String>,
    /// Seconds between keepalive probes (0 = disabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_alive_interval: Option<i64>,
    /// Unanswered keepalives before the session is dropped (0 = ssh default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_alive_count_max: Option<i64>,
    /// StrictHostKeyChecking mode (yes, no, accept-new, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_host_key_checking: Option<String>,
    /// Loopback address every forwarded port is bound to
    #[serde(deserialize_with = "null_as_default")]
    pub local_bind_address: String,
    /// Accepted for compatibility with older definitions, not used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_user: Option<String>,
}

/// SSH connection fields of a tunnel definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConnectionConfig {
    /// SSH username
    #[serde(deserialize_with = "null_as_default")]
    pub remote_user: String,
    /// SSH server hostname or IP
    #[serde(deserialize_with = "null_as_default")]
    pub remote_host: String,
    /// SSH server port, passed with `-p` when set
    #[serde(
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_port: Option<String>,
    /// Forward specs appended to the bind address, e.g. `:5432:db.internal:5432`
    #[serde(deserialize_with = "null_as_default")]
    pub forward_ports: Vec<String>,
}

/// Older definitions store the port as a string, newer ones as a number
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Text(String),
        Number(u64),
    }

    Ok(
        match Option::<PortValue>::deserialize(deserializer)? {
            Some(PortValue::Text(text)) if !text.trim().is_empty() => {
                Some(text.trim().to_string())
            }
            Some(PortValue::Number(number)) => Some(number.to_string()),
            _ => None,
        },
    )
}

/// An explicit `null` decodes like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Treat a missing and an empty optional string the same way
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl TunnelConfig {
    /// Validate that the definition is complete enough to act on
    pub fn validate(&self) -> Result<()> {
        if self.local_bind_address.is_empty() {
            return Err(Error::Config(
                "Local bind address cannot be empty".to_string(),
            ));
        }
        if self.connection.remote_user.is_empty() {
            return Err(Error::Config("Remote user cannot be empty".to_string()));
        }
        if self.connection.remote_host.is_empty() {
            return Err(Error::Config("Remote host cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Whether the start/stop commands may be offered as executable
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Identity file with a leading `~` expanded
    pub fn identity_file_path(&self) -> Option<String> {
        non_empty(&self.identity_file).map(|path| shellexpand::tilde(path).into_owned())
    }
}

/// How the aggregated loopback alias command obtains root privileges
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AliasElevation {
    /// Ask through the macOS administrator dialog
    Osascript,
    /// Prefix every alias command with sudo
    Sudo,
    /// Run the alias commands as-is
    None,
}

impl Default for AliasElevation {
    fn default() -> Self {
        AliasElevation::Osascript
    }
}

/// Launcher settings shared by every invocation
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LauncherSettings {
    /// Directory holding one definition file per tunnel
    #[serde(default = "default_tunnels_dir")]
    pub tunnels_dir: PathBuf,

    /// autossh binary used in start commands
    #[serde(default = "default_autossh_path")]
    pub autossh_path: String,

    /// Interface the bind addresses are aliased on
    #[serde(default = "default_loopback_interface")]
    pub loopback_interface: String,

    #[serde(default)]
    pub alias_elevation: AliasElevation,

    /// Directories appended to PATH for the ifconfig/ps queries
    #[serde(default = "default_extra_path")]
    pub extra_path: Vec<PathBuf>,
}

fn default_tunnels_dir() -> PathBuf {
    PathBuf::from("conf")
}

fn default_autossh_path() -> String {
    "/usr/local/bin/autossh".to_string()
}

fn default_loopback_interface() -> String {
    "lo0".to_string()
}

fn default_extra_path() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/local/bin")]
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            tunnels_dir: default_tunnels_dir(),
            autossh_path: default_autossh_path(),
            loopback_interface: default_loopback_interface(),
            alias_elevation: AliasElevation::default(),
            extra_path: default_extra_path(),
        }
    }
}

impl LauncherSettings {
    /// Tunnels directory with a leading `~` expanded
    pub fn tunnels_dir_path(&self) -> PathBuf {
        let raw = self.tunnels_dir.to_string_lossy();
        PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
    }
}
