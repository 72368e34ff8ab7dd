use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::{fs, path::Path};

/// Write `rows` as a headed CSV at `path`.
///
/// Column order follows the field order of `T`; `None` becomes an empty cell.
/// The file is written to a hidden tmp sibling and renamed into place.
pub fn write_rows<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{}.tmp", file_name));

    {
        let mut wtr = WriterBuilder::new()
            .has_headers(true)
            .from_path(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        for row in rows {
            wtr.serialize(row)
                .with_context(|| format!("serializing row into {}", tmp_path.display()))?;
        }
        wtr.flush()
            .with_context(|| format!("flushing {}", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!("renaming {} -> {}", tmp_path.display(), path.display())
    })?;
    Ok(())
}
