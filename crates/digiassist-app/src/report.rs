// Saving downloaded PDF reports to disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use digiassist_core::api::SessionId;
use tracing::info;

/// File name used for a session's report.
pub fn report_file_name(session: &SessionId) -> String {
    let safe: String = session
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("diagnostic_report_{safe}.pdf")
}

/// Write `bytes` as the report for `session` inside `dir`, creating the
/// directory if needed. Existing files are overwritten.
pub fn save_report(dir: &Path, session: &SessionId, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;
    let path = dir.join(report_file_name(session));
    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(path = %path.display(), size = bytes.len(), "report saved");
    Ok(path)
}
