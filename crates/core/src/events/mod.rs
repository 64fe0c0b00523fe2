//! External event hooks.
//!
//! After a file lands in the library an optional external program gets
//! invoked with the placed path and a human-readable description. The
//! hook is best-effort: failures are logged and never affect the run.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{error, info};

/// Invoke the moved-file hook. Blocking from the run's point of view:
/// the call returns once the program exits.
pub async fn fire_moved_event(program: &Path, target: &Path, description: &str) {
    info!(
        "Running move event: {} {} {}",
        program.display(),
        target.display(),
        description
    );

    let output = Command::new(program)
        .arg(target)
        .arg(description)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            error!(
                "Move event returned error {}:\n{}{}",
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            );
        }
        Err(e) => {
            error!("Failed to execute move event {}: {}", program.display(), e);
        }
    }
}
