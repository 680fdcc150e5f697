use shipyard_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the shipyard data root.
///
/// Priority:
/// 1. `--root` flag / `SHIPYARD_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `shipyard.yaml`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match explicit {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => cwd.join(p),
        None => find_config_dir(&cwd).unwrap_or(cwd),
    }
}

fn find_config_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| paths::config_path(dir).is_file())
        .map(Path::to_path_buf)
}
