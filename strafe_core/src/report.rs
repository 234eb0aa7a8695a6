use crate::buffer::CrashRecord;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Appends crash records to a log file, one block per detected crash:
///
/// ```text
/// Crash Time: <timestamp>
/// Most Likely Cause Packet:
/// <raw payload bytes | No matching packet found.>
/// <blank line>
/// ```
#[derive(Debug)]
pub struct CrashReportWriter {
    path: PathBuf,
}

impl CrashReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Appends one record. The payload digest is logged for dedup across
    /// runs; the on-disk format stays byte-exact.
    pub fn append(&self, record: &CrashRecord) -> Result<(), std::io::Error> {
        let mut file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        write!(
            file,
            "Crash Time: {}\nMost Likely Cause Packet:\n",
            record.crash_time.format("%Y-%m-%d %H:%M:%S")
        )?;
        match &record.cause {
            Some(packet) => {
                file.write_all(&packet.data)?;
                info!(
                    digest = %format!("{:x}", md5::compute(&packet.data)),
                    captured_at = %packet.captured_at,
                    "crash attributed to buffered packet"
                );
            }
            None => {
                file.write_all(b"No matching packet found.")?;
                info!("crash detected with empty correlation buffer");
            }
        }
        file.write_all(b"\n\n")?;
        Ok(())
    }
}
