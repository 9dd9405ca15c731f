use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Serializes tests that repoint the llvm tool environment variables.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Fresh scratch directory under the system temp dir; cleared first if a
/// previous run left one behind.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("covplot_{}_{}", std::process::id(), tag));
    if dir.exists() {
        fs::remove_dir_all(&dir).expect("failed to clear scratch dir");
    }
    fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir
}

/// Write an executable /bin/sh script standing in for an external tool.
pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("failed to write fake tool script");
    let mut perms = fs::metadata(path)
        .expect("failed to stat fake tool script")
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("failed to make fake tool executable");
}
