//! Ingestion Orchestrator.
//!
//! Walks an EHI tables export directory, resolves each file to a
//! table mapper, streams rows, and batches converted records into the
//! store. A malformed row or an unreadable file is recorded and
//! skipped; only setup problems (missing export directory, store
//! failure outside a flush) abort the run.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use csv::ReaderBuilder;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::mappers::{mapper_for_table, RowFields, TableMapper};
use super::{extract, writer, IngestError, SOURCE_FORMAT_EPIC_EHI};
use crate::models::{MappedRecord, RecordType};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Ownership context stamped on every record of a run.
#[derive(Debug, Clone)]
pub struct IngestContext {
    pub account_id: Uuid,
    pub patient_id: Uuid,
    pub source_file_id: Option<Uuid>,
}

/// Per-run tuning and hooks.
pub struct IngestOptions<'a> {
    pub batch_size: usize,
    /// Called after each processed file with
    /// (files done, files total, records inserted so far).
    pub progress: Option<&'a dyn Fn(usize, usize, usize)>,
    /// Checked at file and row boundaries; committed batches survive
    /// a cancelled run.
    pub cancel: Option<&'a AtomicBool>,
}

impl Default for IngestOptions<'_> {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress: None,
            cancel: None,
        }
    }
}

/// Aggregate result of one export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub total_files: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub records_inserted: usize,
    pub errors: Vec<IngestErrorEntry>,
    pub cancelled: bool,
}

/// One recorded row- or file-level failure. `row` is `None` for
/// file-level entries.
#[derive(Debug, Clone, Serialize)]
pub struct IngestErrorEntry {
    pub table: String,
    pub row: Option<usize>,
    pub message: String,
}

/// Process an EHI tables export directory.
///
/// Files are handled one at a time in name order, rows streamed
/// row-by-row, with commits every `batch_size` converted records.
pub fn import_export(
    conn: &mut Connection,
    export_dir: &Path,
    ctx: &IngestContext,
    options: &IngestOptions<'_>,
) -> Result<IngestStats, IngestError> {
    if !export_dir.is_dir() {
        return Err(IngestError::ExportDirMissing(export_dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(export_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"))
        })
        .collect();
    files.sort();

    let mut stats = IngestStats {
        total_files: files.len(),
        ..Default::default()
    };

    for (file_idx, path) in files.iter().enumerate() {
        if is_cancelled(options) {
            stats.cancelled = true;
            break;
        }

        let table_name = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("")
            .to_uppercase();
        let Some(mapper) = mapper_for_table(&table_name) else {
            stats.files_skipped += 1;
            continue;
        };

        tracing::info!(
            table = %table_name,
            file = file_idx + 1,
            total = stats.total_files,
            "Processing export table"
        );

        if let Err(message) = ingest_file(conn, path, &table_name, mapper, ctx, options, &mut stats)
        {
            tracing::error!(table = %table_name, error = %message, "Error processing table");
            stats.errors.push(IngestErrorEntry {
                table: table_name.clone(),
                row: None,
                message,
            });
        }

        if stats.cancelled {
            break;
        }

        stats.files_processed += 1;

        if let Some(progress) = options.progress {
            progress(file_idx + 1, stats.total_files, stats.records_inserted);
        }
    }

    tracing::info!(
        files = stats.files_processed,
        records = stats.records_inserted,
        errors = stats.errors.len(),
        "Export processing complete"
    );
    Ok(stats)
}

/// Stream one table file. Row-level failures are recorded in `stats`
/// and skipped; the returned error is file-level (unreadable file or
/// failed flush).
fn ingest_file(
    conn: &mut Connection,
    path: &Path,
    table_name: &str,
    mapper: &dyn TableMapper,
    ctx: &IngestContext,
    options: &IngestOptions<'_>,
    stats: &mut IngestStats,
) -> Result<(), String> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| e.to_string())?;

    let mut batch: Vec<MappedRecord> = Vec::new();
    let mut row_count = 0usize;

    for (row_idx, row) in reader.deserialize::<RowFields>().enumerate() {
        if is_cancelled(options) {
            stats.cancelled = true;
            return Ok(());
        }

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                stats.errors.push(IngestErrorEntry {
                    table: table_name.to_string(),
                    row: Some(row_idx),
                    message: e.to_string(),
                });
                continue;
            }
        };

        // A declined row is not an error — the table simply has
        // nothing identifiable there.
        let Some(resource) = mapper.to_fhir(&row) else {
            continue;
        };

        batch.push(build_mapped_record(resource, ctx));
        row_count += 1;

        if batch.len() >= options.batch_size {
            flush_batch(conn, &mut batch, stats).map_err(|e| e.to_string())?;
        }
    }

    if !batch.is_empty() {
        flush_batch(conn, &mut batch, stats).map_err(|e| e.to_string())?;
    }

    tracing::info!(table = %table_name, rows = row_count, "Processed export table");
    Ok(())
}

/// Commit the current batch and clear it.
fn flush_batch(
    conn: &mut Connection,
    batch: &mut Vec<MappedRecord>,
    stats: &mut IngestStats,
) -> Result<(), IngestError> {
    let tx = conn.transaction().map_err(crate::db::DatabaseError::from)?;
    let count = writer::insert_batch(&tx, batch)?;
    tx.commit().map_err(crate::db::DatabaseError::from)?;
    stats.records_inserted += count;
    batch.clear();
    Ok(())
}

/// Derive the canonical columns from a freshly-mapped resource.
fn build_mapped_record(resource: Value, ctx: &IngestContext) -> MappedRecord {
    let kind = resource
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let (code_system, code_value, code_display) = extract::coding(&resource);
    let display_text = extract::display_text(&resource).unwrap_or_else(|| kind.clone());

    MappedRecord {
        account_id: ctx.account_id,
        patient_id: ctx.patient_id,
        record_type: RecordType::from_fhir_kind(&kind),
        fhir_resource_type: kind,
        source_format: SOURCE_FORMAT_EPIC_EHI.to_string(),
        source_file_id: ctx.source_file_id,
        effective_date: extract::effective_date(&resource),
        effective_date_end: extract::effective_date_end(&resource),
        status: extract::status(&resource),
        category: extract::categories(&resource),
        code_system,
        code_value,
        code_display,
        display_text,
        confidence_score: None,
        ai_extracted: false,
        fhir_resource: resource,
    }
}

fn is_cancelled(options: &IngestOptions<'_>) -> bool {
    options
        .cancel
        .map(|flag| flag.load(Ordering::Relaxed))
        .unwrap_or(false)
}
