use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::installer::{DEFAULT_TARGET_ROOT, InstallerSettings};

/// archsetup - btrfs + Hyprland Arch Linux installer
#[derive(Parser, Debug)]
#[command(name = "archsetup")]
#[command(about = "Interactive Arch Linux installer: GPT + btrfs subvolumes + Hyprland")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: print and record every command without executing it.
    ///
    /// Failed preconditions only warn. Nothing is written under the target
    /// root; generated files are only reported with their size.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the installer (default)
    Install(InstallArgs),
    /// Validate an answer file
    Validate {
        /// Path to the JSON answer file
        config: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// JSON answer file pre-filling some or all prompts
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Mountpoint of the new system
    #[arg(short, long, default_value = DEFAULT_TARGET_ROOT)]
    pub target: PathBuf,

    /// Answer yes to every confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Configure resume-from-swap (hibernation) in the new system
    #[arg(long)]
    pub hibernate: bool,

    /// Offer to reboot when the installation finishes
    #[arg(long)]
    pub reboot: bool,
}

impl Default for InstallArgs {
    fn default() -> Self {
        Self {
            config: None,
            target: PathBuf::from(DEFAULT_TARGET_ROOT),
            yes: false,
            hibernate: false,
            reboot: false,
        }
    }
}

impl InstallArgs {
    pub fn settings(&self, dry_run: bool) -> InstallerSettings {
        InstallerSettings {
            target_root: self.target.clone(),
            auto_confirm: self.yes,
            dry_run,
            hibernate: self.hibernate,
            offer_reboot: self.reboot,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_no_args() {
        // No subcommand means install with defaults
        let cli = Cli::try_parse_from(["archsetup"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(!cli.dry_run);
        let settings = InstallArgs::default().settings(cli.dry_run);
        assert_eq!(settings.target_root, PathBuf::from("/mnt"));
        assert!(!settings.auto_confirm);
    }

    #[test]
    fn test_cli_install_with_flags() {
        let cli = Cli::try_parse_from([
            "archsetup",
            "--dry-run",
            "install",
            "--config",
            "answers.json",
            "--target",
            "/tmp/root",
            "--yes",
            "--hibernate",
            "--reboot",
        ])
        .expect("parse");
        assert!(cli.dry_run);
        match cli.command {
            Some(Commands::Install(args)) => {
                assert_eq!(args.config, Some(PathBuf::from("answers.json")));
                let settings = args.settings(cli.dry_run);
                assert_eq!(settings.target_root, PathBuf::from("/tmp/root"));
                assert!(settings.auto_confirm);
                assert!(settings.dry_run);
                assert!(settings.hibernate);
                assert!(settings.offer_reboot);
            }
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_dry_run_is_global() {
        let cli = Cli::try_parse_from(["archsetup", "install", "--dry-run"]).expect("parse");
        assert!(cli.dry_run);
    }

    #[test]
    fn test_cli_validate_command() {
        let cli = Cli::try_parse_from(["archsetup", "validate", "answers.json"]).expect("parse");
        match cli.command {
            Some(Commands::Validate { config }) => assert_eq!(config, PathBuf::from("answers.json")),
            other => panic!("expected validate, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_validate_requires_path() {
        assert!(Cli::try_parse_from(["archsetup", "validate"]).is_err());
    }
}
