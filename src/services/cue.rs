//! Audible cue playback

use std::io::Write;
use tokio::{process::Command, runtime::Handle};
use tracing::{debug, info, warn};

/// Plays the cue right away. Fire-and-forget: failures are logged, never returned.
pub trait CuePlayer: Send + Sync {
    fn play(&self);
}

/// Plays the cue through a shell command, or the terminal bell when none is configured
#[derive(Debug, Clone, Default)]
pub struct CommandCuePlayer {
    command: Option<String>,
}

impl CommandCuePlayer {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

impl CuePlayer for CommandCuePlayer {
    fn play(&self) {
        match &self.command {
            Some(command) => spawn_shell_command(command.clone(), Vec::new()),
            None => ring_terminal_bell(),
        }
    }
}

/// Write the ASCII bell to stdout
pub fn ring_terminal_bell() {
    let mut stdout = std::io::stdout();
    if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
        warn!("Failed to ring terminal bell: {}", e);
    }
}

/// Run `command` through `sh -c` with `args` as `$1..`, without waiting for it
pub fn spawn_shell_command(command: String, args: Vec<String>) {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = run_shell_command(&command, &args).await {
                    warn!("Cue command failed: {}", e);
                }
            });
        }
        Err(e) => warn!("No runtime to run cue command '{}': {}", command, e),
    }
}

/// Run `command` through `sh -c` and wait for it to finish
pub async fn run_shell_command(command: &str, args: &[String]) -> Result<(), String> {
    debug!("Running shell command: {}", command);

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .arg("focus-bell")
        .args(args)
        .output()
        .await
        .map_err(|e| format!("Failed to execute '{}': {}", command, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("'{}' exited with {}: {}", command, output.status, stderr.trim()));
    }

    info!("Shell command '{}' completed", command);
    Ok(())
}
