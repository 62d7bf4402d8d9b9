//! Launch command construction

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::option::is_truthy;
use crate::config::{ConfigMap, DefaultValue, OptionKind};

/// Executable plus arguments for one server launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ServerCommand {
    pub fn new(program: &Path, config: &ConfigMap) -> Self {
        Self {
            program: program.to_path_buf(),
            args: build_args(config),
        }
    }

    /// Command with piped output, ready to spawn
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());
        cmd
    }
}

/// Render every configured option as command-line arguments
///
/// Value options become `--name value`; switches become `--name` when
/// truthy. A false switch is left out unless it defaults to on, in which
/// case it is rendered as `--name=false`. nats-server parses flags the same way
/// on every platform.
pub fn build_args(config: &ConfigMap) -> Vec<String> {
    let mut args = Vec::new();
    for (option, value) in config.iter() {
        match option.kind() {
            OptionKind::Value => {
                args.push(option.flag());
                args.push(value.to_string());
            }
            OptionKind::Switch => {
                if is_truthy(value) {
                    args.push(option.flag());
                } else if option.default_value() == Some(DefaultValue::Switch(true)) {
                    // A bare flag can only turn a switch on
                    args.push(format!("{}=false", option.flag()));
                }
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOption;

    #[test]
    fn test_value_options_render_as_pairs() {
        let config = ConfigMap::from([(ConfigOption::Port, "4222"), (ConfigOption::User, "admin")]);
        assert_eq!(build_args(&config), vec!["--port", "4222", "--user", "admin"]);
    }

    #[test]
    fn test_switches_render_only_when_truthy() {
        let config = ConfigMap::from([
            (ConfigOption::Jetstream, "true"),
            (ConfigOption::Debug, "false"),
            (ConfigOption::Trace, "1"),
        ]);
        assert_eq!(build_args(&config), vec!["--trace", "--jetstream"]);
    }

    #[test]
    fn test_switch_defaulting_on_can_be_turned_off() {
        let config = ConfigMap::from([(ConfigOption::Logtime, "false")]);
        assert_eq!(build_args(&config), vec!["--logtime=false"]);

        let config = ConfigMap::from([(ConfigOption::Logtime, "true")]);
        assert_eq!(build_args(&config), vec!["--logtime"]);
    }

    #[test]
    fn test_empty_config_has_no_args() {
        assert!(build_args(&ConfigMap::new()).is_empty());
    }

    #[test]
    fn test_command_keeps_program_and_args() {
        let config = ConfigMap::from([(ConfigOption::Port, "4300")]);
        let command = ServerCommand::new(Path::new("/opt/nats/nats-server"), &config);

        assert_eq!(command.program, PathBuf::from("/opt/nats/nats-server"));
        assert_eq!(command.args, vec!["--port", "4300"]);

        let cmd = command.to_command();
        assert_eq!(cmd.get_program(), "/opt/nats/nats-server");
        assert_eq!(cmd.get_args().count(), 2);
    }
}
