//! Console status line sink

use std::io::{self, Stdout, Write};

use tracing::debug;

use crate::sample::Sample;
use crate::sink::OutputSink;

/// Rewrites a single status line on every sample.
pub struct ConsoleSink<W: Write + Send> {
    writer: W,
    closed: bool,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, closed: false }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_status(&mut self, sample: &Sample) -> io::Result<()> {
        write!(self.writer, "\r{}", format_status(sample))?;
        self.writer.flush()
    }

    fn write_footer(&mut self) -> io::Result<()> {
        writeln!(self.writer, "\nMonitoring finished.")?;
        self.writer.flush()
    }
}

/// Status line text for one sample, without the leading carriage return.
pub fn format_status(sample: &Sample) -> String {
    format!(
        "Memory: {:.2}MB | CPU: {:.2}% | I/O Read: {:.2}MB | I/O Write: {:.2}MB",
        sample.memory_mb, sample.cpu_percent, sample.io_read_mb, sample.io_write_mb
    )
}

impl<W: Write + Send> OutputSink for ConsoleSink<W> {
    fn emit(&mut self, sample: &Sample) {
        if let Err(e) = self.write_status(sample) {
            debug!("Console write failed: {}", e);
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.write_footer() {
            debug!("Console write failed: {}", e);
        }
    }

    fn name(&self) -> &str {
        "console"
    }
}
