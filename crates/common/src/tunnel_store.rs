// SSH Tunnel Launcher - Tunnel Store Module
// Loads tunnel definitions from the tunnels directory

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::TunnelConfig;

/// Load every tunnel definition in `dir`, ordered by file name.
///
/// Fails on the first unreadable or malformed file; a partial list is never
/// returned.
pub fn load_all_tunnels(dir: &Path) -> Result<Vec<TunnelConfig>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;

        if file_type.is_dir() || is_hidden(&path) {
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    let mut tunnels = Vec::with_capacity(paths.len());
    for path in paths {
        let tunnel = load_tunnel(&path)?;
        debug!(
            "Loaded tunnel: {} ({})",
            tunnel.name, tunnel.local_bind_address
        );
        tunnels.push(tunnel);
    }

    Ok(tunnels)
}

/// Load a single tunnel definition from a path
///
/// `.toml` files are decoded as TOML, anything else as JSON.
pub fn load_tunnel(path: &Path) -> Result<TunnelConfig> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    let mut tunnel: TunnelConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&contents).map_err(|e| Error::parse(path, e))?,
        _ => serde_json::from_str(&contents).map_err(|e| Error::parse(path, e))?,
    };
    tunnel.name = tunnel_name(path);

    Ok(tunnel)
}

/// Display name of the tunnel stored at `path`
pub fn tunnel_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
