//! Indentation-aware text sink for generated scripts.

/// Line terminator of the host platform.
pub const LINE_ENDING: &str = if cfg!(windows) { "\r\n" } else { "\n" };

const INDENT_UNIT: &str = "    ";

/// Accumulates script lines at the current indentation depth.
///
/// Generators only hand over line content; indentation and line endings
/// are decided here.
#[derive(Debug, Default)]
pub struct FileWriter {
    buffer: String,
    depth: usize,
}

impl FileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_line(&mut self, line: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.buffer.push_str(INDENT_UNIT);
        }
        self.buffer.push_str(line.as_ref());
        self.buffer.push_str(LINE_ENDING);
    }

    pub fn increase_indent(&mut self) {
        self.depth += 1;
    }

    /// Step one level out. Already at the left margin, this does nothing.
    pub fn decrease_indent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_text(self) -> String {
        self.buffer
    }
}
