//! RotatingFileSink - newline-terminated records into a time-templated path
//!
//! The path template is a strftime pattern evaluated in local time on every
//! write. When the rendered path changes the current file is flushed and
//! closed, the new one is created (truncating) and the rotation hook, if
//! any, is started on the old path.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use contracts::{ContractError, RecordSink};
use tracing::{debug, info, instrument, warn};

use crate::hook::RotationHook;

/// Write buffer size per open file
pub const WRITE_BUFFER_SIZE: usize = 10_000 * 1500;

struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Sink that writes records to a rotating file
pub struct RotatingFileSink {
    name: String,
    template: String,
    hook: Option<RotationHook>,
    current: Option<OpenFile>,
    rotations: u64,
    closed: bool,
}

impl RotatingFileSink {
    /// Validate `template` and open the file for the current time
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        hook: Option<RotationHook>,
    ) -> Result<Self, ContractError> {
        Self::open_at(name, template, hook, Local::now())
    }

    /// Like [`RotatingFileSink::new`] with an explicit clock reading
    pub fn open_at(
        name: impl Into<String>,
        template: impl Into<String>,
        hook: Option<RotationHook>,
        now: DateTime<Local>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let template = template.into();
        validate_path_template(&name, &template)?;

        let mut sink = Self {
            name,
            template,
            hook,
            current: None,
            rotations: 0,
            closed: false,
        };
        sink.refresh(now)?;
        Ok(sink)
    }

    /// Path of the currently open file
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Number of rotations since construction
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Write one record as if the clock read `now`
    pub fn write_at(&mut self, payload: &[u8], now: DateTime<Local>) -> Result<usize, ContractError> {
        if self.closed {
            return Err(ContractError::sink_write(&self.name, "sink is closed"));
        }
        self.refresh(now)?;
        let Some(file) = self.current.as_mut() else {
            return Err(ContractError::sink_write(&self.name, "sink is closed"));
        };

        file.writer
            .write_all(payload)
            .and_then(|()| file.writer.write_all(b"\n"))
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        Ok(payload.len() + 1)
    }

    fn render_path(&self, now: DateTime<Local>) -> PathBuf {
        PathBuf::from(now.format(&self.template).to_string())
    }

    /// Rotate if the template renders a new path for `now`
    fn refresh(&mut self, now: DateTime<Local>) -> Result<(), ContractError> {
        let path = self.render_path(now);
        if self.current_path() == Some(path.as_path()) {
            return Ok(());
        }

        let writer = self.create(&path)?;
        let previous = self.current.replace(OpenFile {
            path: path.clone(),
            writer,
        });

        let Some(previous) = previous else {
            debug!(sink = %self.name, path = %path.display(), "output file opened");
            return Ok(());
        };

        let old_path = previous.path.clone();
        self.finish(previous);
        self.rotations += 1;
        info!(
            sink = %self.name,
            from = %old_path.display(),
            to = %path.display(),
            "output file rotated"
        );

        if let Some(hook) = &self.hook {
            hook.spawn(&old_path);
        }
        Ok(())
    }

    fn create(&self, path: &Path) -> Result<BufWriter<File>, ContractError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ContractError::sink_write(
                    &self.name,
                    format!("failed to create directory `{}`: {e}", parent.display()),
                )
            })?;
        }

        let file = File::create(path).map_err(|e| {
            ContractError::sink_write(
                &self.name,
                format!("failed to create file `{}`: {e}", path.display()),
            )
        })?;
        Ok(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file))
    }

    // Flush and close, logging instead of failing so rotation can proceed
    fn finish(&self, mut file: OpenFile) {
        if let Err(e) = file.writer.flush() {
            warn!(sink = %self.name, path = %file.path.display(), error = %e, "flush failed");
        }
        if let Err(e) = file.writer.get_ref().sync_all() {
            debug!(sink = %self.name, path = %file.path.display(), error = %e, "sync failed");
        }
    }
}

fn validate_path_template(name: &str, template: &str) -> Result<(), ContractError> {
    if template.is_empty() || StrftimeItems::new(template).any(|item| matches!(item, Item::Error)) {
        return Err(ContractError::SinkConnection {
            sink_name: name.to_string(),
            message: format!("invalid path template `{template}`"),
        });
    }
    Ok(())
}

impl RecordSink for RotatingFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, payload),
        fields(sink = %self.name, bytes = payload.len())
    )]
    async fn write(&mut self, payload: &[u8]) -> Result<usize, ContractError> {
        self.write_at(payload, Local::now())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(file) = self.current.as_mut() {
            file.writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.closed = true;
        if let Some(mut file) = self.current.take() {
            file.writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
            debug!(sink = %self.name, path = %file.path.display(), "RotatingFileSink closed");
        }
        Ok(())
    }
}
