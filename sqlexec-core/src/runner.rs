//! Script execution and tab-separated rendering.
//!
//! The runner submits the whole script as one batch and streams every result
//! set it produces: a header line of column names, then one line per row.
//! Rows are written as they arrive and never buffered.
//!
//! Failures are handled at row granularity. A row that fails to decode is
//! reported on the output and skipped. An error from the stream itself ends
//! the run and becomes its result.

use crate::connector::Database;
use crate::error::{Result, SqlExecError};
use crate::value::{ColumnValue, decode_row};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::io::Write;
use std::path::Path;
use tiberius::{QueryItem, QueryStream};
use tracing::debug;

/// One step of a query's output.
#[derive(Debug)]
pub enum ResultEvent {
    /// A new result set starts with these column names
    Columns(Vec<String>),
    /// A row of the current result set, or the reason it could not be decoded
    Row(Result<Vec<ColumnValue>>),
}

/// An async cursor over the output of one submitted query.
#[async_trait(?Send)]
pub trait ResultSource {
    /// Returns the next event, `Ok(None)` at the end of the output.
    ///
    /// # Errors
    /// An error here is an iteration-level failure (for example a dropped
    /// connection) and ends the run.
    async fn next_event(&mut self) -> Result<Option<ResultEvent>>;
}

/// [`ResultSource`] backed by a tiberius query stream.
pub struct TdsResultSource<'a> {
    stream: QueryStream<'a>,
    seen_columns: bool,
}

impl<'a> TdsResultSource<'a> {
    /// Wraps a stream returned by `simple_query`.
    pub const fn new(stream: QueryStream<'a>) -> Self {
        Self {
            stream,
            seen_columns: false,
        }
    }
}

#[async_trait(?Send)]
impl ResultSource for TdsResultSource<'_> {
    async fn next_event(&mut self) -> Result<Option<ResultEvent>> {
        let stage = if self.seen_columns {
            "row iteration"
        } else {
            "column retrieval"
        };

        let item = self.stream.try_next().await.map_err(|e| {
            debug!("error from {stage}");
            SqlExecError::query_failed(stage, e)
        })?;

        Ok(item.map(|item| match item {
            QueryItem::Metadata(meta) => {
                self.seen_columns = true;
                ResultEvent::Columns(
                    meta.columns()
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect(),
                )
            }
            QueryItem::Row(row) => ResultEvent::Row(decode_row(&row)),
        }))
    }
}

/// Counters for one script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Result sets that printed a header
    pub result_sets: usize,
    /// Rows written to the output
    pub rows_printed: usize,
    /// Rows skipped because they failed to decode
    pub rows_skipped: usize,
}

/// Reads the whole script file into memory.
///
/// # Errors
/// Returns [`SqlExecError::Io`] if the file is missing, unreadable or not
/// valid UTF-8.
pub async fn load_script(path: &Path) -> Result<String> {
    debug!("Reading script {}", path.display());
    let script = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SqlExecError::io(format!("Failed to read {}", path.display()), e))?;
    debug!("Script contents:\n{script}");
    Ok(script)
}

/// Executes scripts and renders their results to `W`.
pub struct ScriptRunner<W: Write> {
    out: W,
}

impl<W: Write> ScriptRunner<W> {
    /// Creates a runner writing to `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the runner and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Submits `script` as a single batch on `database` and renders the
    /// output.
    ///
    /// # Errors
    /// Returns an error if the database is not connected, the submission
    /// fails, the stream fails mid-iteration, or the output cannot be
    /// written. Row decode failures are reported inline, not returned.
    pub async fn run(&mut self, database: &mut Database, script: &str) -> Result<RunSummary> {
        let client = database.client_mut()?;
        let stream = client.simple_query(script).await.map_err(|e| {
            debug!("error from query submission");
            SqlExecError::query_failed("query submission", e)
        })?;

        let mut source = TdsResultSource::new(stream);
        self.render(&mut source).await
    }

    /// Drains `source` into the output and flushes it, on every path.
    ///
    /// # Errors
    /// Returns the first iteration-level or output error.
    pub async fn render<S>(&mut self, source: &mut S) -> Result<RunSummary>
    where
        S: ResultSource + ?Sized,
    {
        let mut summary = RunSummary::default();
        let drained = self.drain(source, &mut summary).await;
        let flushed = self
            .out
            .flush()
            .map_err(|e| SqlExecError::io("Failed to flush output", e));

        drained.and(flushed).map(|()| summary)
    }

    async fn drain<S>(&mut self, source: &mut S, summary: &mut RunSummary) -> Result<()>
    where
        S: ResultSource + ?Sized,
    {
        while let Some(event) = source.next_event().await? {
            match event {
                ResultEvent::Columns(columns) => {
                    if columns.is_empty() {
                        continue;
                    }
                    self.write_line(&columns.join("\t"))?;
                    summary.result_sets = summary.result_sets.saturating_add(1);
                }
                ResultEvent::Row(Ok(values)) => {
                    self.write_row(&values)?;
                    summary.rows_printed = summary.rows_printed.saturating_add(1);
                }
                ResultEvent::Row(Err(e)) => {
                    debug!("error from row decode");
                    self.write_line(&e.to_string())?;
                    summary.rows_skipped = summary.rows_skipped.saturating_add(1);
                }
            }
        }
        Ok(())
    }

    fn write_row(&mut self, values: &[ColumnValue]) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            if i != 0 {
                self.out.write_all(b"\t").map_err(output_error)?;
            }
            write!(self.out, "{value}").map_err(output_error)?;
        }
        self.out.write_all(b"\n").map_err(output_error)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}").map_err(output_error)
    }
}

fn output_error(e: std::io::Error) -> SqlExecError {
    SqlExecError::io("Failed to write output", e)
}
