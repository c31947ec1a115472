use std::path::Path;
use warden_types::{WardenError, WardenResult};

pub async fn stop_daemon(pid_file: &Path, force: bool) -> WardenResult<()> {
    if !pid_file.exists() {
        println!("\x1b[38;5;245mNo PID file found at {:?}. Warden may not be running.\x1b[0m", pid_file);
        return Ok(());
    }

    let pid_str = std::fs::read_to_string(pid_file)
        .map_err(|e| WardenError::Internal(format!("Failed to read PID: {}", e)))?;
    let pid: i32 = pid_str
        .trim()
        .parse()
        .map_err(|e| WardenError::Internal(format!("Invalid PID: {}", e)))?;

    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
        match kill(Pid::from_raw(pid), signal) {
            Ok(_) => println!("\x1b[38;5;46m[+]\x1b[0m Sent {} to process {}", signal, pid),
            Err(e) => println!("\x1b[38;5;196m[-]\x1b[0m Failed to signal process {}: {}", pid, e),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = force;
        println!("Stop not supported on this platform. Kill process {} manually.", pid);
    }

    Ok(())
}
