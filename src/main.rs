mod core;
#[cfg(target_os = "windows")]
mod platform_layer;

use clap::{ArgAction, Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::process::ExitCode;

/*
 * CLI front end. Each subcommand maps onto one core operation; the platform
 * layer is only constructed on Windows, so the binary still builds (and the
 * core test suite still runs) elsewhere, where every subcommand reports the
 * platform as unsupported.
 */

// Exit codes shared by all subcommands.
const EXIT_UNAVAILABLE: u8 = 2; // automation surface could not be reached
#[cfg(target_os = "windows")]
const EXIT_BAD_TARGET: u8 = 3; // invalid tab index, or no tab host control
#[cfg(target_os = "windows")]
const EXIT_OPERATION_FAILED: u8 = 4; // navigation or merge failure

/// Inspect and rearrange the tabs of open file manager windows.
#[derive(Parser)]
#[command(name = "explorer-tabs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every open tab with its window handle, process and location
    List,
    /// Navigate the tab at INDEX (from `list`) to DESTINATION
    Navigate {
        index: usize,
        destination: String,
    },
    /// Open a new tab in the first window
    NewTab,
    /// Move all tabs from secondary windows into the first window
    Merge,
    /// Open PATH as a tab of an existing window, or a new window as fallback
    OpenFolder { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

#[cfg(target_os = "windows")]
fn run(cli: Cli) -> ExitCode {
    use crate::platform_layer::{ComShellSession, Win32Desktop};

    let session = match ComShellSession::connect() {
        Ok(session) => session,
        Err(e) => {
            log::error!("Main: automation surface unavailable: {e}");
            return ExitCode::from(EXIT_UNAVAILABLE);
        }
    };
    let desktop = Win32Desktop::new();

    match cli.command {
        Command::List => cmd_list(&session, &desktop),
        Command::Navigate { index, destination } => cmd_navigate(&session, index, &destination),
        Command::NewTab => cmd_new_tab(&session, &desktop),
        Command::Merge => cmd_merge(&session, &desktop),
        Command::OpenFolder { path } => cmd_open_folder(&session, &desktop, &path),
    }
}

#[cfg(not(target_os = "windows"))]
fn run(_cli: Cli) -> ExitCode {
    eprintln!("explorer-tabs drives the Windows file manager and only runs on Windows.");
    ExitCode::from(EXIT_UNAVAILABLE)
}

#[cfg(target_os = "windows")]
fn cmd_list(
    session: &dyn core::WindowCollectionOperations,
    desktop: &dyn core::DesktopOperations,
) -> ExitCode {
    let snapshot = match core::collect_tabs(session) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::error!("Main: {e}");
            return ExitCode::from(EXIT_UNAVAILABLE);
        }
    };

    if snapshot.tabs.is_empty() {
        println!("No file manager tabs are open.");
        return ExitCode::SUCCESS;
    }

    for window in &snapshot.windows {
        let title = desktop.window_title(*window);
        let pid = desktop.window_process_id(*window);
        println!("Window {window} pid={pid} \"{title}\"");
        for (index, record) in snapshot
            .tabs
            .iter()
            .enumerate()
            .filter(|(_, t)| t.window == *window)
        {
            let location = if record.navigation_target.is_empty() {
                "(unresolved)"
            } else {
                record.navigation_target.as_str()
            };
            println!("  [{index}] {location}");
        }
    }
    ExitCode::SUCCESS
}

#[cfg(target_os = "windows")]
fn cmd_navigate(
    session: &dyn core::WindowCollectionOperations,
    index: usize,
    destination: &str,
) -> ExitCode {
    let snapshot = match core::collect_tabs(session) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::error!("Main: {e}");
            return ExitCode::from(EXIT_UNAVAILABLE);
        }
    };

    let Some(record) = snapshot.tabs.get(index) else {
        log::error!(
            "Main: tab index {index} is out of range ({} tab(s) open)",
            snapshot.tabs.len()
        );
        return ExitCode::from(EXIT_BAD_TARGET);
    };

    match record.tab.navigate(destination) {
        Ok(()) => {
            println!("Navigated tab {index} to {destination}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Main: {e}");
            ExitCode::from(EXIT_OPERATION_FAILED)
        }
    }
}

#[cfg(target_os = "windows")]
fn cmd_new_tab(
    session: &dyn core::WindowCollectionOperations,
    desktop: &dyn core::DesktopOperations,
) -> ExitCode {
    let snapshot = match core::collect_tabs(session) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::error!("Main: {e}");
            return ExitCode::from(EXIT_UNAVAILABLE);
        }
    };

    let Some(primary) = snapshot.primary_window() else {
        log::error!("Main: no file manager window is open");
        return ExitCode::from(EXIT_BAD_TARGET);
    };
    drop(snapshot);

    let Some(tab_host) = desktop.find_tab_host(primary) else {
        log::error!("Main: window {primary} has no tab host control");
        return ExitCode::from(EXIT_BAD_TARGET);
    };

    desktop.request_new_tab(tab_host);
    println!("Requested a new tab in window {primary}");
    ExitCode::SUCCESS
}

#[cfg(target_os = "windows")]
fn cmd_merge(
    session: &dyn core::WindowCollectionOperations,
    desktop: &dyn core::DesktopOperations,
) -> ExitCode {
    match core::merge_all(session, desktop) {
        Ok(summary) => {
            println!("Merged {} tab(s) into the primary window", summary.merged_count);
            for url in &summary.failed_urls {
                println!("Failed to merge: {url}");
            }
            // Partial failure still counts as completion.
            ExitCode::SUCCESS
        }
        Err(core::MergeError::TabHostUnavailable(window)) => {
            log::error!("Main: window {window} has no tab host control; nothing merged");
            ExitCode::from(EXIT_BAD_TARGET)
        }
        Err(core::MergeError::Automation(e)) => {
            log::error!("Main: {e}");
            ExitCode::from(EXIT_UNAVAILABLE)
        }
    }
}

#[cfg(target_os = "windows")]
fn cmd_open_folder(
    session: &dyn core::WindowCollectionOperations,
    desktop: &dyn core::DesktopOperations,
    path: &std::path::Path,
) -> ExitCode {
    // The host resolves relative paths against its own working directory,
    // not ours, so normalize before handing the string over.
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let destination = absolute.to_string_lossy();

    match core::open_in_tab(session, desktop, &destination) {
        Ok(core::OpenFolderOutcome::MergedIntoExisting) => {
            println!("Opened {destination} in a tab of the existing window");
            ExitCode::SUCCESS
        }
        Ok(core::OpenFolderOutcome::LaunchedNewWindow) => {
            println!("Opened {destination} in a new window");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Main: {e}");
            ExitCode::from(EXIT_UNAVAILABLE)
        }
    }
}
