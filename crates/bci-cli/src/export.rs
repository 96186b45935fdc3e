use anyhow::{Context, Result};
use bci_lib::BatchResult;
use std::path::Path;

/// Writes one CSV row per batch result: `id,true_label,pred_label,correct,time_ms`.
pub fn write_batch_csv(path: &Path, batch: &BatchResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in &batch.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
