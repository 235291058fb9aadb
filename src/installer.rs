//! Installer module
//!
//! Drives one installation from precondition checks to a bootable target:
//! prompts, mirror and keyring setup, disk selection, partitioning, btrfs
//! layout, pacstrap, fstab, and the second-stage script inside the target.
//!
//! Failure policy per step:
//! - reflector: tolerated, the operator decides whether to continue
//! - `lsblk`, `fdisk -l`, `rm -f`, `reboot`: exit status ignored
//! - everything else: fatal, the run stops with no rollback

use std::fs;
use std::path::{Path, PathBuf};

use crate::chroot_script::{
    CHROOT_SCRIPT_NAME, RESUME_SCRIPT_NAME, render_chroot_script, render_resume_script,
    write_executable,
};
use crate::command_runner::{CommandLine, CommandRunner};
use crate::config::{InstallConfig, Secret};
use crate::config_file::AnswerFile;
use crate::engine::{DiskSelection, calculate_storage_plan};
use crate::error::{InstallError, Result};
use crate::install_state::{InstallStage, InstallerContext};
use crate::prompt::Prompter;
use crate::sanity::{HostProbe, verify_environment};
use crate::types::GpuDriver;
use crate::validation::{Country, DiskName, Hostname, Timezone, Username, ValidationError};

pub const DEFAULT_TARGET_ROOT: &str = "/mnt";

pub const MIRRORLIST_PATH: &str = "/etc/pacman.d/mirrorlist";

/// Bootstrapped into the target root by pacstrap.
pub const PACSTRAP_PACKAGES: &[&str] = &[
    "base",
    "linux",
    "linux-firmware",
    "nano",
    "neovim",
    "sof-firmware",
    "base-devel",
    "grub",
    "grub-btrfs",
    "efibootmgr",
    "networkmanager",
    "snapper",
];

const BANNER: &str = "btrfs + hyprland Arch install";
const DISK_PROMPT: &str = "Enter the installation drive (e.g., sda or nvme0n1): ";
const DISK_CONFIRMATION: &str =
    "Proceed to create GPT with 256MB EFI, 4G swap, and rest root on the selected disk?";

/// Explicit run parameters.
#[derive(Debug, Clone)]
pub struct InstallerSettings {
    /// Where the new system is mounted.
    pub target_root: PathBuf,
    /// Answer yes to every confirmation without reading stdin.
    pub auto_confirm: bool,
    /// Failed preconditions only warn; nothing is written under the target root.
    pub dry_run: bool,
    /// Configure resume-from-swap after the main script.
    pub hibernate: bool,
    /// Ask to reboot after a successful run.
    pub offer_reboot: bool,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            target_root: PathBuf::from(DEFAULT_TARGET_ROOT),
            auto_confirm: false,
            dry_run: false,
            hibernate: false,
            offer_reboot: false,
        }
    }
}

/// Result of a step that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// The operator declined a confirmation.
    AbortClean,
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Completed,
    Aborted { at: InstallStage },
}

pub struct Installer<'a> {
    settings: InstallerSettings,
    answers: AnswerFile,
    runner: &'a mut dyn CommandRunner,
    prompter: &'a mut dyn Prompter,
    host: &'a dyn HostProbe,
    ctx: InstallerContext,
}

impl<'a> Installer<'a> {
    pub fn new(
        settings: InstallerSettings,
        answers: AnswerFile,
        runner: &'a mut dyn CommandRunner,
        prompter: &'a mut dyn Prompter,
        host: &'a dyn HostProbe,
    ) -> Self {
        Self {
            settings,
            answers,
            runner,
            prompter,
            host,
            ctx: InstallerContext::new(),
        }
    }

    pub fn context(&self) -> &InstallerContext {
        &self.ctx
    }

    fn target(&self) -> &Path {
        &self.settings.target_root
    }

    /// Run every stage. Operator aborts are `Ok(Aborted)`, failures are `Err`.
    pub fn run(&mut self) -> Result<InstallOutcome> {
        match self.run_stages() {
            Ok(Step::Continue) => Ok(InstallOutcome::Completed),
            Ok(Step::AbortClean) => {
                let at = self.ctx.current_stage();
                println!("Aborted.");
                self.ctx.abort()?;
                Ok(InstallOutcome::Aborted { at })
            }
            Err(e) => {
                let _ = self.ctx.fail();
                Err(e)
            }
        }
    }

    fn run_stages(&mut self) -> Result<Step> {
        self.check_preconditions()?;

        self.ctx.transition_to(InstallStage::Prompting)?;
        println!("{}", BANNER);
        let config = self.collect_config()?;

        self.ctx.transition_to(InstallStage::MirrorSetup)?;
        if self.refresh_mirrors(config.country())? == Step::AbortClean {
            return Ok(Step::AbortClean);
        }

        self.ctx.transition_to(InstallStage::KeyringInit)?;
        self.run_fatal(CommandLine::new("pacman").arg("-Syy"))?;
        self.run_fatal(CommandLine::new("pacman-key").arg("--init"))?;
        self.run_fatal(CommandLine::new("pacman-key").arg("--populate"))?;

        self.ctx.transition_to(InstallStage::DiskInspection)?;
        self.run_unchecked(CommandLine::new("lsblk").args(["-o", "NAME,SIZE,TYPE,MOUNTPOINT"]));
        let disk = self.select_disk()?;

        self.ctx.transition_to(InstallStage::DiskConfirmation)?;
        self.run_unchecked(disk.list_command());
        if !self.confirm(DISK_CONFIRMATION)? {
            return Ok(Step::AbortClean);
        }
        self.ctx.confirm_destructive_operations();

        self.ctx.transition_to(InstallStage::Partitioning)?;
        self.run_fatal(disk.partition_command())?;
        self.run_unchecked(disk.list_command());
        println!("Using partitions: {}", disk);

        let plan = calculate_storage_plan(&disk, self.target());
        log::debug!("{}", plan.summary());

        self.ctx.transition_to(InstallStage::Filesystems)?;
        for op in &plan.filesystems {
            self.run_fatal(op.to_command())?;
        }

        self.ctx.transition_to(InstallStage::MountLayout)?;
        for op in &plan.layout {
            self.run_fatal(op.to_command())?;
        }

        self.ctx.transition_to(InstallStage::BaseInstall)?;
        let pacstrap = CommandLine::new("pacstrap")
            .arg(self.target().to_string_lossy())
            .args(PACSTRAP_PACKAGES.iter().copied());
        self.run_fatal(pacstrap)?;

        self.ctx.transition_to(InstallStage::FstabCapture)?;
        self.capture_fstab()?;

        self.ctx.transition_to(InstallStage::ScriptGeneration)?;
        let script = render_chroot_script(&config)?;
        self.emit_script(CHROOT_SCRIPT_NAME, &script)?;

        self.ctx.transition_to(InstallStage::ChrootExecution)?;
        self.run_fatal(self.in_target("sh", CHROOT_SCRIPT_NAME))?;
        if self.settings.hibernate {
            self.emit_script(RESUME_SCRIPT_NAME, &render_resume_script())?;
            self.run_fatal(self.in_target("bash", RESUME_SCRIPT_NAME))?;
        }

        self.ctx.transition_to(InstallStage::Cleanup)?;
        self.remove_from_target(CHROOT_SCRIPT_NAME);
        if self.settings.hibernate {
            self.remove_from_target(RESUME_SCRIPT_NAME);
        }

        self.ctx.transition_to(InstallStage::Done)?;
        println!("All steps completed. You may reboot now.");
        if self.settings.offer_reboot && self.confirm("Do you want to reboot?")? {
            self.run_unchecked(CommandLine::new("reboot"));
        }

        Ok(Step::Continue)
    }

    fn check_preconditions(&mut self) -> Result<()> {
        let result = verify_environment(self.host);
        match result.first_error() {
            None => Ok(()),
            Some(err) if self.settings.dry_run => {
                log::warn!("Precondition not met: {}", err);
                println!("[dry-run] ignoring failed precondition: {}", err);
                Ok(())
            }
            Some(err) => Err(err),
        }
    }

    // ------------------------------------------------------------------------
    // Prompting
    // ------------------------------------------------------------------------

    /// Pre-filled answer if present, otherwise ask.
    fn field(&mut self, prefilled: Option<String>, prompt: &str) -> Result<String> {
        match prefilled {
            Some(value) => {
                println!("{}{}", prompt, value);
                Ok(value)
            }
            None => self.prompter.ask(prompt),
        }
    }

    fn password(&mut self, prefilled: Option<String>, prompt: &str, again: &str) -> Result<Secret> {
        if let Some(value) = prefilled {
            return Ok(Secret::new(value)?);
        }
        let first = self.prompter.ask_secret(prompt)?;
        let second = self.prompter.ask_secret(again)?;
        if first != second {
            return Err(ValidationError::PasswordMismatch.into());
        }
        Ok(Secret::new(first)?)
    }

    fn collect_config(&mut self) -> Result<InstallConfig> {
        let raw = self.answers.country().map(str::to_string);
        let country = Country::parse(self.field(raw, "Enter your country (e.g., Iran): ")?)?;

        let raw = self.answers.username().map(str::to_string);
        let username = Username::parse(self.field(raw, "Enter username: ")?)?;

        let raw = self.answers.hostname().map(str::to_string);
        let hostname = Hostname::parse(self.field(raw, "Enter the hostname: ")?)?;

        let raw = self.answers.user_password().map(str::to_string);
        let user_password = self.password(
            raw,
            "Enter the user password: ",
            "Re-enter the user password: ",
        )?;

        let raw = self.answers.root_password().map(str::to_string);
        let root_password =
            self.password(raw, "Enter root password: ", "Re-enter root password: ")?;

        let raw = self.answers.timezone().map(str::to_string);
        let timezone = Timezone::parse(self.field(raw, "Enter your timezone (e.g., Asia/Tehran): ")?)?;

        let raw = self.answers.gpu();
        let gpu = GpuDriver::from_choice(&self.field(raw, &GpuDriver::menu())?)?;

        log::info!("Configuration collected for user {} on {}", username, hostname);
        Ok(InstallConfig::new(
            country,
            username,
            hostname,
            user_password,
            root_password,
            timezone,
            gpu,
        ))
    }

    /// Loop until a well-formed disk name is given. An invalid pre-filled name
    /// falls through to the interactive prompt.
    fn select_disk(&mut self) -> Result<DiskSelection> {
        let mut prefilled = self.answers.disk().map(str::to_string);
        loop {
            let raw = self.field(prefilled.take(), DISK_PROMPT)?;
            match DiskName::parse(raw) {
                Ok(name) => return Ok(DiskSelection::new(name)),
                Err(e) => println!("{}", e),
            }
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        if self.settings.auto_confirm {
            println!("{} [y/N]: y", question);
            return Ok(true);
        }
        self.prompter.confirm(question)
    }

    // ------------------------------------------------------------------------
    // External steps
    // ------------------------------------------------------------------------

    fn refresh_mirrors(&mut self, country: &Country) -> Result<Step> {
        let cmd = CommandLine::new("reflector")
            .arg("-c")
            .arg(country.as_str())
            .args(["--sort", "rate", "--save", MIRRORLIST_PATH]);

        let ok = match self.runner.run(&cmd) {
            Ok(result) => result.is_success(),
            Err(e) => {
                log::warn!("reflector could not run: {}", e);
                false
            }
        };
        if ok {
            return Ok(Step::Continue);
        }

        println!(" Warning: Failed to update mirrorlist with reflector. This may affect download speeds.");
        if !self.confirm("Do you want to continue with the installation?")? {
            return Ok(Step::AbortClean);
        }
        println!("Continuing with installation...");
        Ok(Step::Continue)
    }

    fn run_fatal(&mut self, cmd: CommandLine) -> Result<()> {
        self.runner.run(&cmd)?.ensure_success(&cmd)?;
        Ok(())
    }

    fn run_unchecked(&mut self, cmd: CommandLine) {
        if let Err(e) = self.runner.run(&cmd) {
            log::warn!("{}", e);
        }
    }

    /// `arch-chroot <target> <shell> /<script>`
    fn in_target(&self, shell: &str, script: &str) -> CommandLine {
        CommandLine::new("arch-chroot")
            .arg(self.target().to_string_lossy())
            .arg(shell)
            .arg(format!("/{}", script))
    }

    fn remove_from_target(&mut self, name: &str) {
        let path = self.target().join(name);
        self.run_unchecked(CommandLine::new("rm").arg("-f").arg(path.to_string_lossy()));
    }

    /// `genfstab -U <target>` written verbatim to `<target>/etc/fstab`.
    fn capture_fstab(&mut self) -> Result<()> {
        let cmd = CommandLine::new("genfstab").arg("-U").arg(self.target().to_string_lossy());
        let result = self.runner.capture(&cmd)?.ensure_success(&cmd)?;
        let table = result.captured_output.unwrap_or_default();

        let etc = self.target().join("etc");
        let fstab = etc.join("fstab");
        if self.skip_write(&fstab, table.len()) {
            return Ok(());
        }
        fs::create_dir_all(&etc).map_err(|e| InstallError::file_write(&etc, e))?;
        fs::write(&fstab, table).map_err(|e| InstallError::file_write(&fstab, e))?;
        log::info!("Wrote {}", fstab.display());
        Ok(())
    }

    fn emit_script(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.target().join(name);
        if self.skip_write(&path, contents.len()) {
            return Ok(());
        }
        write_executable(&path, contents)
    }

    /// Dry runs never write under the target root; the file is only reported.
    fn skip_write(&self, path: &Path, len: usize) -> bool {
        if self.settings.dry_run {
            println!("=> [dry-run] would write {} ({} bytes)", path.display(), len);
        }
        self.settings.dry_run
    }
}
