//! Tab-separated output consumed by the chart page.
//!
//! ```text
//! num<TAB>scheme1<TAB>scheme2
//! 0<TAB>123<TAB>120
//! ```
//!
//! Column headers are the scheme tags, in declared order; the chart uses
//! them as legend labels and assigns colours by position.

use crate::table::MeasurementTable;
use hdrcomp_codec::SchemeTag;
use hdrcomp_core::{BenchError, BenchResult, MessageKind};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Output path for one direction: `<prefix><req|res>.tsv`
#[must_use]
pub fn table_path(prefix: &str, kind: MessageKind) -> PathBuf {
    PathBuf::from(format!("{}{}.tsv", prefix, kind.as_str()))
}

/// Serialise `table` with columns in `columns` order
///
/// # Errors
///
/// Returns `InvalidInput` if a column is not in the table, or any error
/// from `out`.
pub fn write_table<W: Write>(table: &MeasurementTable, columns: &[SchemeTag], mut out: W) -> io::Result<()> {
    if let Some(missing) = columns.iter().find(|c| !table.schemes().contains(*c)) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("column {} not present in {} table", missing, table.kind()),
        ));
    }

    write!(out, "num")?;
    for column in columns {
        write!(out, "\t{}", column)?;
    }
    writeln!(out)?;

    for row in table.rows() {
        write!(out, "{}", row.index)?;
        for &column in columns {
            write!(out, "\t{}", row.total(column).unwrap_or(0))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Write every table next to its final path, then move them all into place
///
/// Nothing is renamed until every table has been written and every target
/// has been checked. If a rename still fails, targets already replaced are
/// restored to their previous contents, or removed if they did not exist,
/// so a failed call leaves the output files as they were.
///
/// # Errors
///
/// Returns `Io` naming the path that could not be written or replaced.
pub fn write_tables_atomic(prefix: &str, tables: &[&MeasurementTable]) -> BenchResult<Vec<PathBuf>> {
    let mut staged = Vec::with_capacity(tables.len());

    for table in tables {
        let path = table_path(prefix, table.kind());
        let dir = parent_dir(&path);
        let tmp = NamedTempFile::new_in(&dir).map_err(|e| BenchError::io(&dir, e))?;
        write_table(table, table.schemes(), BufWriter::new(tmp.as_file()))
            .map_err(|e| BenchError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| BenchError::io(tmp.path(), e))?;
        staged.push((tmp, path));
    }

    for (_, path) in &staged {
        check_target(path)?;
    }

    let mut placed: Vec<(PathBuf, Option<NamedTempFile>)> = Vec::with_capacity(staged.len());
    for (tmp, path) in staged {
        let backup = match backup_target(&path) {
            Ok(backup) => backup,
            Err(err) => {
                restore(placed);
                return Err(err);
            }
        };
        if let Err(e) = tmp.persist(&path) {
            restore(placed);
            return Err(BenchError::io(&path, e.error));
        }
        placed.push((path, backup));
    }

    let written: Vec<PathBuf> = placed.into_iter().map(|(path, _)| path).collect();
    for path in &written {
        tracing::info!(path = %path.display(), "wrote table");
    }
    Ok(written)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// A target must be absent or a regular file
fn check_target(path: &Path) -> BenchResult<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(BenchError::io(
            path,
            io::Error::new(io::ErrorKind::IsADirectory, "output path is a directory"),
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BenchError::io(path, e)),
    }
}

/// Copy an existing target aside so it can be put back
fn backup_target(path: &Path) -> BenchResult<Option<NamedTempFile>> {
    if !path.is_file() {
        return Ok(None);
    }
    let dir = parent_dir(path);
    let backup = NamedTempFile::new_in(&dir).map_err(|e| BenchError::io(&dir, e))?;
    fs::copy(path, backup.path()).map_err(|e| BenchError::io(path, e))?;
    Ok(Some(backup))
}

/// Undo replaced targets, newest first
fn restore(placed: Vec<(PathBuf, Option<NamedTempFile>)>) {
    for (path, backup) in placed.into_iter().rev() {
        let result = match backup {
            Some(backup) => backup.persist(&path).map(|_| ()).map_err(|e| e.error),
            None => fs::remove_file(&path),
        };
        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "could not roll back table");
        }
    }
}
