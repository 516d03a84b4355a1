use anyhow::{Context, Result};
use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;
use walkdir::WalkDir;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

// -------- Robust file operations with backoff (network shares, Windows sharing violations) --------

/// Return true for transient/retriable I/O errors often seen on Windows when
/// filter drivers (AV/backup), USB/NAS volumes, or sharing violations occur.
fn is_retriable_io_error(e: &io::Error) -> bool {
    match e.raw_os_error() {
        //   5   = Access is denied (often AV/share)
        //   32  = Sharing violation
        //   33  = Lock violation
        //   21  = Device not ready
        //   1006= Volume externally altered; handle invalid
        Some(5) | Some(32) | Some(33) | Some(21) | Some(1006) => true,
        _ => matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock),
    }
}

/// Run `op` up to `tries` times, sleeping a linearly growing delay after each retriable failure.
fn with_backoff<T>(tries: usize, delay_ms: u64, what: &str, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, format!("{what} failed"))))
}

/// Open a file with retries/backoff for transient errors.
pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, "open", || File::open(path))
}

/// Create a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    with_backoff(tries, delay_ms, "create", || File::create(path))
}

/// Remove a file with retries/backoff for transient errors.
/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    match with_backoff(tries, delay_ms, "remove", || fs::remove_file(path)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// Atomically replace `dest` with `tmp`.
/// If rename fails (e.g., due to sharing or a cross-device move), fall back to copy+remove.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20usize;
    let delay_ms = 50u64;
    if dest.exists() {
        remove_with_backoff(dest, tries, delay_ms)?;
    }
    if with_backoff(tries, delay_ms, "rename", || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    with_backoff(tries, delay_ms, "copy", || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    remove_with_backoff(tmp, tries, delay_ms)
}

/// Remove every regular file directly inside `dir` (subdirectories are left alone).
/// Creates `dir` when it does not exist. Returns the number of files removed.
pub fn clear_dir_files(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        return Ok(0);
    }
    let mut removed = 0usize;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        if entry.file_type().is_file() {
            remove_with_backoff(entry.path(), 16, 50)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_dir_files_keeps_subdirectories() {
        let td = tempfile::tempdir().unwrap();
        fs::write(td.path().join("a.txt"), "x").unwrap();
        fs::write(td.path().join("b.txt"), "y").unwrap();
        fs::create_dir(td.path().join("keep")).unwrap();
        fs::write(td.path().join("keep").join("c.txt"), "z").unwrap();

        assert_eq!(clear_dir_files(td.path()).unwrap(), 2);
        assert!(!td.path().join("a.txt").exists());
        assert!(td.path().join("keep").join("c.txt").exists());
    }

    #[test]
    fn replace_overwrites_destination() {
        let td = tempfile::tempdir().unwrap();
        let tmp = td.path().join("out.tmp");
        let dest = td.path().join("out.txt");
        fs::write(&dest, "old").unwrap();
        fs::write(&tmp, "new").unwrap();
        replace_file_atomic_backoff(&tmp, &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        assert!(!tmp.exists());
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let td = tempfile::tempdir().unwrap();
        assert!(remove_with_backoff(&td.path().join("nope"), 2, 1).is_ok());
    }
}
