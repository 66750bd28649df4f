use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Terminal output shared by the session and the reminder printer.
///
/// Every write goes through one lock, and the console remembers the
/// unfinished line (a prompt, usually) so an alert can be printed above it
/// and the line written out again.
pub struct Console<W> {
    inner: Arc<Mutex<ConsoleState<W>>>,
}

struct ConsoleState<W> {
    out: W,
    partial: String,
}

impl<W> Clone for Console<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConsoleState {
                out,
                partial: String::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleState<W>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Print `text` on its own line, then restore the unfinished line.
    pub fn alert(&self, text: &str) -> io::Result<()> {
        let mut state = self.lock();
        let ConsoleState { out, partial } = &mut *state;
        if !partial.is_empty() {
            writeln!(out)?;
        }
        writeln!(out, "{text}")?;
        write!(out, "{partial}")?;
        out.flush()
    }
}

impl<W: Write> Write for Console<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        let n = state.out.write(buf)?;
        let written = String::from_utf8_lossy(&buf[..n]);
        match written.rfind('\n') {
            Some(i) => state.partial = written[i + 1..].to_string(),
            None => state.partial.push_str(&written),
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().out.flush()
    }
}
