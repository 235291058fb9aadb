//! archsetup - Main entry point
//!
//! Parses the command line, wires the real terminal, host and command runner
//! into the installer, and maps the outcome to a process exit code.

use log::{debug, error, info};
use std::path::Path;

use archsetup::cli::{Cli, Commands, InstallArgs};
use archsetup::command_runner::{DryRunRunner, SystemRunner};
use archsetup::config_file::AnswerFile;
use archsetup::error::{EXIT_FAILURE, InstallError};
use archsetup::installer::{InstallOutcome, Installer};
use archsetup::process_guard;
use archsetup::prompt::TerminalPrompter;
use archsetup::sanity::{SystemHost, install_hint};

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

fn main() {
    init_logger();
    info!("archsetup starting up");

    // Child process groups are torn down if we receive SIGINT/SIGTERM/SIGHUP
    if let Err(e) = process_guard::init_signal_handlers() {
        log::warn!("Failed to initialize signal handlers: {}", e);
    }

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed: {:?}", cli);

    let code = match cli.command {
        Some(Commands::Validate { config }) => validate_answer_file(&config),
        Some(Commands::Install(args)) => run_install(&args, cli.dry_run),
        None => run_install(&InstallArgs::default(), cli.dry_run),
    };

    std::process::exit(code);
}

fn validate_answer_file(path: &Path) -> i32 {
    info!("Validating answer file: {:?}", path);
    let result = AnswerFile::load_from_file(path).and_then(|answers| {
        answers.validate()?;
        Ok(answers)
    });
    match result {
        Ok(answers) => {
            println!(
                "Answer file is valid: {} ({} of 8 prompts answered)",
                path.display(),
                answers.answered_count()
            );
            0
        }
        Err(e) => {
            error!("Answer file validation failed: {:#}", e);
            eprintln!("Answer file is invalid: {:#}", e);
            EXIT_FAILURE
        }
    }
}

fn run_install(args: &InstallArgs, dry_run: bool) -> i32 {
    let answers = match &args.config {
        Some(path) => match AnswerFile::load_from_file(path) {
            Ok(answers) => answers,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return EXIT_FAILURE;
            }
        },
        None => AnswerFile::default(),
    };

    let settings = args.settings(dry_run);
    let mut prompter = TerminalPrompter::new();
    let host = SystemHost;

    let result = if dry_run {
        let mut runner = DryRunRunner::new();
        let result = Installer::new(settings, answers, &mut runner, &mut prompter, &host).run();
        println!("\n{}", runner.summary());
        result
    } else {
        let mut runner = SystemRunner::new();
        Installer::new(settings, answers, &mut runner, &mut prompter, &host).run()
    };

    match result {
        Ok(InstallOutcome::Completed) => 0,
        Ok(InstallOutcome::Aborted { at }) => {
            info!("Installation aborted by operator during: {}", at);
            0
        }
        Err(e) => {
            report_error(&e);
            e.exit_code()
        }
    }
}

fn report_error(err: &InstallError) {
    error!("{}", err);
    match err {
        // The runner already printed the failing command line
        InstallError::CommandFailed { .. } => {}
        InstallError::Validation(_) | InstallError::NotElevated => eprintln!("{}", err),
        InstallError::MissingDependency(binary) => {
            eprintln!("Error: {}", err);
            eprintln!("   {}", install_hint(binary));
        }
        _ => eprintln!("Error: {}", err),
    }
}
