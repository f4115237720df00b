//! Terminal progress display shared with the console log output.
//!
//! Bars are drawn on stderr, the same stream the console log layer writes to.
//! Log lines go through [`ConsoleWriter`], which clears the bars while the line
//! is written and redraws them afterwards.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;

const BATCH_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

fn bars() -> &'static MultiProgress {
    static BARS: OnceLock<MultiProgress> = OnceLock::new();
    BARS.get_or_init(MultiProgress::new)
}

/// Whether a bar on stderr would be seen by a person
pub fn stderr_is_interactive() -> bool {
    io::stderr().is_terminal()
}

/// Progress bar over `len` files.
///
/// Without an interactive terminal the bar is hidden but still counts, so
/// redirected stderr only receives log lines.
pub fn batch_bar(len: u64, interactive: bool) -> ProgressBar {
    if !interactive {
        let pb = ProgressBar::hidden();
        pb.set_length(len);
        return pb;
    }

    let pb = bars().add(ProgressBar::new(len));
    pb.set_style(
        ProgressStyle::default_bar()
            .template(BATCH_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Clear `pb` from the terminal and release it
pub fn finish(pb: &ProgressBar) {
    pb.finish_and_clear();
    bars().remove(pb);
}

/// stderr writer for the console log layer that keeps active bars intact
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        bars().suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        bars().suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        bars().suspend(|| io::stderr().flush())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_interactive_bar_is_hidden_but_counts() {
        let pb = batch_bar(3, false);
        assert!(pb.is_hidden());
        assert_eq!(pb.length(), Some(3));

        pb.inc(2);
        assert_eq!(pb.position(), 2);
        finish(&pb);
        assert!(pb.is_finished());
    }

    #[test]
    fn test_interactive_bar_tracks_length() {
        let pb = batch_bar(5, true);
        assert_eq!(pb.length(), Some(5));
        pb.inc(5);
        finish(&pb);
        assert!(pb.is_finished());
    }

    #[test]
    fn test_console_writer_writes_while_bar_is_active() {
        let pb = batch_bar(1, true);
        let mut writer = ConsoleWriter;
        assert_eq!(writer.write(b"").unwrap(), 0);
        writer.write_all(b"").unwrap();
        writer.flush().unwrap();
        finish(&pb);
    }
}
