use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;

pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(path).with_context(|| format!("failed to create dir: {}", path.display()))
}

/// Writes `bytes` next to `dst` first, then renames it over `dst`.
///
/// A reader never sees a half-written file; on failure the previous
/// contents of `dst` (if any) are kept.
pub fn write_atomic(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in: {}", parent.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("failed writing: {}", tmp.path().display()))?;
    tmp.as_file().sync_all().ok();

    tmp.persist(dst)
        .map_err(|e| anyhow::Error::new(e.error))
        .with_context(|| format!("failed to replace: {}", dst.display()))?;
    Ok(())
}
