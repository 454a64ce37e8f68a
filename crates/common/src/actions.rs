// SSH Tunnel Launcher - Action List Builder
// Reconciles tunnel definitions with live OS state into the host's item list

use tracing::{debug, error, info};

use crate::command::{aggregate_alias_command, reboot_command, start_command, stop_command};
use crate::config::LauncherSettings;
use crate::error::Result;
use crate::network::AliasGap;
use crate::probe::{tunnel_state, SystemProbe};
use crate::response::{Item, ModifierKey, Response};
use crate::tunnel_store::load_all_tunnels;
use crate::types::{Invocation, Mode, TunnelState};
use crate::TunnelConfig;

const ICON_RUNNING: &str = "On.png";
const ICON_STOPPED: &str = "Off.png";
const ICON_ALIAS: &str = "icon.png";
const ICON_ADD: &str = "plus.png";

const ADD_TITLE: &str = "Add new config";

/// Build the document for one invocation.
///
/// Never fails: a fatal error becomes a single error item.
pub fn build_response(
    invocation: &Invocation,
    settings: &LauncherSettings,
    probe: &dyn SystemProbe,
) -> Response {
    match &invocation.mode {
        Mode::Create { name } => create_response(name),
        Mode::List => list_response(settings, probe).unwrap_or_else(|e| {
            error!("Failed to build tunnel list: {}", e);
            Response::error(e.to_string())
        }),
    }
}

/// Single prompt for a new definition; touches neither disk nor OS state
fn create_response(name: &str) -> Response {
    let mut response = Response::new();
    response.add_variable("filename", name);
    response.add_items([Item::new(ADD_TITLE, format!("write name ... \"{}\"", name), "")
        .icon(ICON_ADD)
        .executable("newConfig")]);
    response
}

fn list_response(settings: &LauncherSettings, probe: &dyn SystemProbe) -> Result<Response> {
    let tunnels = load_all_tunnels(&settings.tunnels_dir_path())?;
    let aliases = probe.loopback_aliases()?;

    let mut gap = AliasGap::new();
    for tunnel in &tunnels {
        if !aliases.contains(&tunnel.local_bind_address) {
            debug!(
                "Tunnel {} needs loopback alias {}",
                tunnel.name, tunnel.local_bind_address
            );
            gap.insert(&tunnel.local_bind_address);
        }
    }

    let mut response = Response::new();

    // Any missing alias replaces the whole list with the alias prompt. The
    // older script filter also appended the "Add new config" entry here.
    // Now the prompt is the only item.
    if let Some(alias) = aggregate_alias_command(gap.addresses(), settings) {
        info!(
            "{} bind address(es) not aliased on loopback",
            gap.addresses().len()
        );
        response.add_items([Item::new("Not Aliased on loopback list", "Run alias command", "")
            .icon(ICON_ALIAS)
            .executable(alias)]);
        return Ok(response);
    }

    let mut items = Vec::with_capacity(tunnels.len() + 1);
    for tunnel in &tunnels {
        let state = tunnel_state(probe, &tunnel.local_bind_address);
        items.push(tunnel_item(tunnel, state, settings));
    }
    items.push(Item::new(ADD_TITLE, "", "create ").icon(ICON_ADD));

    response.add_items(items);
    Ok(response)
}

fn tunnel_item(tunnel: &TunnelConfig, state: TunnelState, settings: &LauncherSettings) -> Item {
    let name = &tunnel.name;
    let valid = tunnel.is_valid();
    debug!("Tunnel {} is {} (valid: {})", name, state, valid);

    let (icon, command) = match state {
        TunnelState::Stopped => (ICON_STOPPED, start_command(tunnel, settings)),
        TunnelState::Running => (ICON_RUNNING, stop_command(tunnel)),
    };

    let mut item = Item::new(name, format!("{} {}", state.action_label(), name), "")
        .icon(icon)
        .with_arg(command.to_shell_string(), valid)
        .variable("tunnel", name)
        .variable("bind_address", &tunnel.local_bind_address)
        .modifier(
            ModifierKey::Cmd,
            "Modify config",
            format!("modify {}", name),
            true,
        )
        .modifier(
            ModifierKey::Alt,
            "Remove config",
            format!("remove {}", name),
            true,
        );

    if valid && state.is_running() {
        item = item.modifier(
            ModifierKey::Ctrl,
            format!("Reboot {}", name),
            reboot_command(tunnel, settings),
            true,
        );
    }

    item
}
