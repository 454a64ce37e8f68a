// SSH Tunnel Launcher - Command Synthesis
// Builds the start/stop/reboot/alias commands handed to the launcher host

use std::fmt;

use crate::config::{non_empty, AliasElevation, LauncherSettings};
use crate::TunnelConfig;

/// A program and its ordered arguments.
///
/// Commands stay structured until the host needs a single shell string, at
/// which point every argument is quoted as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Render as a single POSIX shell command
    pub fn to_shell_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(shell_quote(&self.program));
        parts.extend(self.args.iter().map(|arg| shell_quote(arg)));
        parts.join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_string())
    }
}

/// Quote `part` for a POSIX shell, leaving plain words untouched
pub fn shell_quote(part: &str) -> String {
    if part.is_empty() {
        return "''".to_string();
    }
    let plain = part.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | ',' | '+' | '%')
    });
    if plain {
        return part.to_string();
    }
    format!("'{}'", part.replace('\'', r"'\''"))
}

/// Escape `text` for use inside an extended regular expression
fn regex_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Whether a process-table command line belongs to the tunnel bound to
/// `bind_address`: its program name ends in `ssh` and the address appears
/// somewhere in it.
pub fn is_tunnel_process(command_line: &str, bind_address: &str) -> bool {
    let Some(program) = command_line.split_whitespace().next() else {
        return false;
    };
    program.ends_with("ssh") && command_line.contains(bind_address)
}

/// Pattern `pkill -f` uses for the same match as [`is_tunnel_process`].
/// Anchored on the program name so the shell running the stop command never
/// matches itself.
fn tunnel_process_pattern(bind_address: &str) -> String {
    format!("^[^ ]*ssh .*{}", regex_escape(bind_address))
}

/// autossh invocation that brings the tunnel up in the background
pub fn start_command(tunnel: &TunnelConfig, settings: &LauncherSettings) -> CommandLine {
    let connection = &tunnel.connection;
    let mut cmd = CommandLine::new(&settings.autossh_path).args(["-M", "0", "-f", "-q", "-N"]);

    if let Some(port) = non_empty(&connection.remote_port) {
        cmd = cmd.arg("-p").arg(port);
    }
    if let Some(identity) = tunnel.identity_file_path() {
        cmd = cmd.arg("-i").arg(identity);
    }
    if let Some(interval) = tunnel.server_alive_interval.filter(|n| *n > 0) {
        cmd = cmd
            .arg("-o")
            .arg(format!("ServerAliveInterval={}", interval));
    }
    if let Some(count) = tunnel.server_alive_count_max.filter(|n| *n > 0) {
        cmd = cmd.arg("-o").arg(format!("ServerAliveCountMax={}", count));
    }
    if let Some(mode) = non_empty(&tunnel.strict_host_key_checking) {
        cmd = cmd
            .arg("-o")
            .arg(format!("StrictHostKeyChecking={}", mode));
    }
    if let Some(proxy) = non_empty(&tunnel.proxy_command) {
        cmd = cmd.arg("-o").arg(format!("ProxyCommand={}", proxy));
    }
    for spec in &connection.forward_ports {
        cmd = cmd
            .arg("-L")
            .arg(format!("{}{}", tunnel.local_bind_address, spec));
    }

    cmd.arg(format!(
        "{}@{}",
        connection.remote_user, connection.remote_host
    ))
}

/// Kill every tunnel process bound to the tunnel's address
pub fn stop_command(tunnel: &TunnelConfig) -> CommandLine {
    CommandLine::new("pkill")
        .arg("-9")
        .arg("-f")
        .arg(tunnel_process_pattern(&tunnel.local_bind_address))
}

/// Stop followed by start; start runs whatever the stop's exit status
pub fn reboot_command(tunnel: &TunnelConfig, settings: &LauncherSettings) -> String {
    format!(
        "{}; {}",
        stop_command(tunnel),
        start_command(tunnel, settings)
    )
}

/// `ifconfig <interface> alias <address>`
pub fn alias_command(address: &str, settings: &LauncherSettings) -> CommandLine {
    CommandLine::new("ifconfig")
        .arg(&settings.loopback_interface)
        .arg("alias")
        .arg(address)
}

/// One compound command aliasing every address, needing a single privilege
/// prompt. Returns `None` when there is nothing to alias.
pub fn aggregate_alias_command(addresses: &[String], settings: &LauncherSettings) -> Option<String> {
    if addresses.is_empty() {
        return None;
    }

    let chain = |prefix: Option<&str>| {
        addresses
            .iter()
            .map(|address| {
                let cmd = alias_command(address, settings);
                match prefix {
                    Some(prefix) => format!("{} {}", prefix, cmd),
                    None => cmd.to_shell_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" && ")
    };

    Some(match settings.alias_elevation {
        AliasElevation::Osascript => {
            let script = format!(
                "do shell script \"{}\" with administrator privileges",
                applescript_escape(&chain(None))
            );
            CommandLine::new("osascript")
                .arg("-e")
                .arg(script)
                .to_shell_string()
        }
        AliasElevation::Sudo => chain(Some("sudo")),
        AliasElevation::None => chain(None),
    })
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionConfig;

    fn minimal_tunnel() -> TunnelConfig {
        TunnelConfig {
            name: "db".to_string(),
            connection: ConnectionConfig {
                remote_user: "u".to_string(),
                remote_host: "h".to_string(),
                ..Default::default()
            },
            local_bind_address: "127.0.0.2".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_start_command() {
        let cmd = start_command(&minimal_tunnel(), &LauncherSettings::default());
        assert_eq!(
            cmd.to_shell_string(),
            "/usr/local/bin/autossh -M 0 -f -q -N u@h"
        );
        assert!(!cmd.args.iter().any(|a| a == "-L"));
    }

    #[test]
    fn test_full_start_command_flag_order() {
        let mut tunnel = minimal_tunnel();
        tunnel.connection.remote_port = Some("2222".to_string());
        tunnel.identity_file = Some("/keys/id_ed25519".to_string());
        tunnel.server_alive_interval = Some(30);
        tunnel.server_alive_count_max = Some(3);
        tunnel.strict_host_key_checking = Some("no".to_string());
        tunnel.proxy_command = Some("ssh -W %h:%p jump".to_string());
        tunnel.connection.forward_ports = vec![
            ":5432:db.internal:5432".to_string(),
            ":6379:cache.internal:6379".to_string(),
        ];

        let cmd = start_command(&tunnel, &LauncherSettings::default());
        assert_eq!(
            cmd.args,
            vec![
                "-M",
                "0",
                "-f",
                "-q",
                "-N",
                "-p",
                "2222",
                "-i",
                "/keys/id_ed25519",
                "-o",
                "ServerAliveInterval=30",
                "-o",
                "ServerAliveCountMax=3",
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "ProxyCommand=ssh -W %h:%p jump",
                "-L",
                "127.0.0.2:5432:db.internal:5432",
                "-L",
                "127.0.0.2:6379:cache.internal:6379",
                "u@h",
            ]
        );
        assert_eq!(
            cmd.to_shell_string(),
            "/usr/local/bin/autossh -M 0 -f -q -N -p 2222 -i /keys/id_ed25519 \
             -o ServerAliveInterval=30 -o ServerAliveCountMax=3 -o StrictHostKeyChecking=no \
             -o 'ProxyCommand=ssh -W %h:%p jump' \
             -L 127.0.0.2:5432:db.internal:5432 -L 127.0.0.2:6379:cache.internal:6379 u@h"
        );
    }

    #[test]
    fn test_zero_and_empty_optionals_are_skipped() {
        let mut tunnel = minimal_tunnel();
        tunnel.connection.remote_port = Some(String::new());
        tunnel.identity_file = Some(String::new());
        tunnel.server_alive_interval = Some(0);
        tunnel.server_alive_count_max = Some(0);
        tunnel.strict_host_key_checking = Some(String::new());

        let cmd = start_command(&tunnel, &LauncherSettings::default());
        assert_eq!(cmd.args, vec!["-M", "0", "-f", "-q", "-N", "u@h"]);
    }

    #[test]
    fn test_negative_keepalive_is_skipped() {
        let mut tunnel = minimal_tunnel();
        tunnel.server_alive_interval = Some(-1);
        tunnel.server_alive_count_max = Some(-3);

        let cmd = start_command(&tunnel, &LauncherSettings::default());
        assert_eq!(cmd.args, vec!["-M", "0", "-f", "-q", "-N", "u@h"]);
    }

    #[test]
    fn test_start_command_is_deterministic() {
        let mut tunnel = minimal_tunnel();
        tunnel.connection.forward_ports = vec![":80:web:80".to_string()];
        let settings = LauncherSettings::default();
        assert_eq!(
            start_command(&tunnel, &settings).to_shell_string(),
            start_command(&tunnel, &settings).to_shell_string()
        );
    }

    #[test]
    fn test_hostile_fields_are_quoted() {
        let mut tunnel = minimal_tunnel();
        tunnel.connection.remote_host = "h; rm -rf ~".to_string();
        let rendered = start_command(&tunnel, &LauncherSettings::default()).to_shell_string();
        assert!(rendered.ends_with("'u@h; rm -rf ~'"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain-word_1.2"), "plain-word_1.2");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_stop_and_reboot_commands() {
        let tunnel = minimal_tunnel();
        let settings = LauncherSettings::default();

        let stop = stop_command(&tunnel).to_shell_string();
        assert_eq!(stop, r"pkill -9 -f '^[^ ]*ssh .*127\.0\.0\.2'");

        let reboot = reboot_command(&tunnel, &settings);
        assert_eq!(
            reboot,
            format!("{}; {}", stop, start_command(&tunnel, &settings))
        );
    }

    #[test]
    fn test_is_tunnel_process() {
        assert!(is_tunnel_process(
            "/usr/local/bin/autossh -M 0 -f -q -N -L 127.0.0.2:5432:db:5432 u@h",
            "127.0.0.2"
        ));
        assert!(is_tunnel_process(
            "/usr/bin/ssh -L 127.0.0.2:5432:db:5432 -N u@h",
            "127.0.0.2"
        ));
        assert!(!is_tunnel_process(
            "sh -c pkill -9 -f ssh 127.0.0.2",
            "127.0.0.2"
        ));
        assert!(!is_tunnel_process("/usr/bin/ssh u@h", "127.0.0.2"));
        assert!(!is_tunnel_process("", "127.0.0.2"));
    }

    #[test]
    fn test_aggregate_alias_command() {
        let addresses = vec!["127.0.0.2".to_string(), "127.0.0.3".to_string()];

        let mut settings = LauncherSettings::default();
        assert_eq!(
            aggregate_alias_command(&addresses, &settings).unwrap(),
            r#"osascript -e 'do shell script "ifconfig lo0 alias 127.0.0.2 && ifconfig lo0 alias 127.0.0.3" with administrator privileges'"#
        );

        settings.alias_elevation = AliasElevation::Sudo;
        assert_eq!(
            aggregate_alias_command(&addresses, &settings).unwrap(),
            "sudo ifconfig lo0 alias 127.0.0.2 && sudo ifconfig lo0 alias 127.0.0.3"
        );

        settings.alias_elevation = AliasElevation::None;
        settings.loopback_interface = "lo".to_string();
        assert_eq!(
            aggregate_alias_command(&addresses[..1], &settings).unwrap(),
            "ifconfig lo alias 127.0.0.2"
        );

        assert!(aggregate_alias_command(&[], &settings).is_none());
    }
}
