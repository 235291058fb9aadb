//! Process groups for external commands.
//!
//! Every command runs as the leader of its own process group, so one signal
//! reaches the whole tree behind it: the `bash -c` heredoc and the fdisk it
//! feeds, or `arch-chroot` and the script, pacman and mkinitcpio running
//! inside the target root.
//!
//! On SIGINT, SIGTERM or SIGHUP the installer restores the terminal, stops
//! every running group and exits with `128 + signal`.

use std::collections::HashSet;
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::prctl;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;

/// How long a group gets to exit after SIGTERM before it is killed.
pub const GRACE_PERIOD: Duration = Duration::from_secs(3);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

static RUNNING: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Process groups of the commands currently running.
#[derive(Debug, Default)]
pub struct ChildRegistry {
    groups: HashSet<i32>,
}

/// Outcome of [`ChildRegistry::terminate_all`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    /// Groups that were gone within the grace period.
    pub exited: usize,
    /// Groups that had to be sent SIGKILL.
    pub killed: usize,
}

impl ChildRegistry {
    /// Registry shared by the command runner and the signal handler.
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        RUNNING
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    /// Track the group led by `pid`. Leaders are spawned through
    /// [`CommandProcessGroup`], so the group id is the leader's pid.
    pub fn register(&mut self, pid: u32) {
        if let Ok(pgid) = i32::try_from(pid) {
            self.groups.insert(pgid);
            log::debug!("Tracking process group {}", pgid);
        }
    }

    pub fn unregister(&mut self, pid: u32) {
        if let Ok(pgid) = i32::try_from(pid) {
            self.groups.remove(&pgid);
        }
    }

    pub fn count(&self) -> usize {
        self.groups.len()
    }

    /// SIGTERM every tracked group, wait up to `grace` for the groups to
    /// empty, then SIGKILL whatever is left. The registry is empty afterwards.
    pub fn terminate_all(&mut self, grace: Duration) -> Termination {
        let groups: Vec<i32> = self.groups.drain().collect();
        if groups.is_empty() {
            return Termination::default();
        }

        log::info!("Stopping {} running command(s)", groups.len());
        for &pgid in &groups {
            signal_group(pgid, Signal::SIGTERM);
        }

        let deadline = Instant::now() + grace;
        let mut remaining = groups.clone();
        loop {
            remaining.retain(|&pgid| group_exists(pgid));
            if remaining.is_empty() || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        for &pgid in &remaining {
            log::warn!("Process group {} is still running, sending SIGKILL", pgid);
            signal_group(pgid, Signal::SIGKILL);
        }

        Termination {
            exited: groups.len() - remaining.len(),
            killed: remaining.len(),
        }
    }
}

fn signal_group(pgid: i32, signal: Signal) {
    match killpg(Pid::from_raw(pgid), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to send {:?} to process group {}: {}", signal, pgid, e),
    }
}

/// True while any member of the group, zombies included, remains.
fn group_exists(pgid: i32) -> bool {
    killpg(Pid::from_raw(pgid), None).is_ok()
}

/// Install the SIGINT/SIGTERM/SIGHUP handler thread.
pub fn init_signal_handlers() -> std::io::Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::Builder::new()
        .name("signal-guard".to_string())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                log::warn!("Received signal {}, stopping running commands", sig);
                crate::prompt::restore_terminal();
                if let Ok(mut registry) = ChildRegistry::global().lock() {
                    registry.terminate_all(GRACE_PERIOD);
                }
                std::process::exit(128 + sig);
            }
        })?;

    Ok(())
}

/// Spawn a command as the leader of a new process group.
pub trait CommandProcessGroup {
    /// New process group, plus SIGTERM to the leader if the installer dies.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        self.process_group(0);
        // SAFETY: prctl is async-signal-safe and touches no shared state
        unsafe {
            self.pre_exec(|| {
                prctl::set_pdeathsig(Signal::SIGTERM)?;
                Ok(())
            });
        }
        self
    }
}
