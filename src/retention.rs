use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::Error;

/// Select backups exceeding the retention count: every sibling of
/// `prefix` named `<base>.<suffix>` whose suffix matches `pattern`,
/// sorted ascending, minus the `keep` most recent. The suffix layouts
/// sort lexicographically in time order, so the head of the sorted list
/// is the oldest.
///
/// `keep == 0` disables pruning. A directory-listing failure is reported
/// on the diagnostic side-channel and yields no candidates, so retention
/// simply skips that cycle.
pub(crate) fn stale_backups(prefix: &Path, pattern: &Regex, keep: usize) -> Vec<PathBuf> {
    if keep == 0 {
        return Vec::new();
    }

    let dir = match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(base) = prefix.file_name() else {
        return Vec::new();
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            let err = Error::ReadDir(err);
            tracing::warn!(dir = %dir.display(), %err, "skipping retention this cycle");
            return Vec::new();
        }
    };

    let wanted = format!("{}.", base.to_string_lossy());
    let mut backups = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(suffix) = name.strip_prefix(&wanted)
            && pattern.is_match(suffix)
        {
            backups.push(dir.join(name));
        }
    }
    backups.sort();

    if backups.len() <= keep {
        return Vec::new();
    }
    backups.truncate(backups.len() - keep);
    backups
}
