// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Manager Contributors

// SSH Tunnel Launcher - Common Library
// Tunnel reconciliation and action synthesis for launcher hosts

pub mod actions;
pub mod command;
pub mod config;
pub mod error;
pub mod network;
pub mod probe;
pub mod response;
pub mod tunnel_store;
pub mod types;

pub use actions::build_response;
pub use command::{
    aggregate_alias_command, alias_command, reboot_command, start_command, stop_command,
    CommandLine,
};
pub use config::{AliasElevation, ConnectionConfig, LauncherSettings, TunnelConfig};
pub use error::{Error, Result};
pub use network::{is_loopback_address, parse_loopback_aliases, AliasGap};
pub use probe::{tunnel_state, OsProbe, SystemProbe};
pub use response::{Item, Modifier, ModifierKey, Response};
pub use tunnel_store::{load_all_tunnels, load_tunnel};
pub use types::{Invocation, Mode, TunnelState};
