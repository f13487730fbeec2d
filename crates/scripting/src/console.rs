/// Maximum lines the run log retains per run.
pub const MAX_LOG_LINES: usize = 5_000;

/// The run log: everything a script surfaces to the user.
///
/// Lines are buffered here, forwarded to the shell's injected sink when
/// one is installed, and mirrored onto the `log` facade as the
/// diagnostic channel. The buffer is capped; past the cap a single
/// truncation notice is recorded and further lines are dropped.
pub struct RunLog {
    lines: Vec<String>,
    truncated: bool,
    sink: Option<Box<dyn FnMut(&str)>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            truncated: false,
            sink: None,
        }
    }

    /// Installs the shell's log-append callback. Every line appended
    /// from this point on is forwarded as it arrives.
    pub fn set_sink(&mut self, sink: Box<dyn FnMut(&str)>) {
        self.sink = Some(sink);
    }

    pub fn append(&mut self, line: &str) {
        log::debug!(target: "cardtable::script", "{line}");
        if self.lines.len() < MAX_LOG_LINES {
            self.push(line.to_string());
        } else if !self.truncated {
            self.truncated = true;
            self.push(format!("... log truncated ({MAX_LOG_LINES} line limit)"));
        }
    }

    fn push(&mut self, line: String) {
        if let Some(sink) = &mut self.sink {
            sink(&line);
        }
        self.lines.push(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.truncated = false;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}
