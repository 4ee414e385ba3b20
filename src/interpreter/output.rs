use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

use tracing::warn;

/// Where `puts` sends its lines
pub trait Output {
    fn write_line(&mut self, line: &str);
}

pub struct WriteOutput<W: Write> {
    writer: W,
}

impl<W: Write> WriteOutput<W> {
    pub fn new(writer: W) -> WriteOutput<W> {
        WriteOutput { writer }
    }
}

impl WriteOutput<io::Stdout> {
    pub fn stdout() -> WriteOutput<io::Stdout> {
        WriteOutput::new(io::stdout())
    }
}

impl<W: Write> Output for WriteOutput<W> {
    fn write_line(&mut self, line: &str) {
        if let Err(error) = writeln!(self.writer, "{}", line) {
            warn!(%error, "failed to write program output");
        }
    }
}

/// Collects lines in memory. Clones share the same buffer, so a test can keep one and hand the other away
#[derive(Clone, Default)]
pub struct CaptureOutput {
    lines: Rc<RefCell<Vec<String>>>,
}

impl CaptureOutput {
    pub fn new() -> CaptureOutput {
        CaptureOutput::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Output for CaptureOutput {
    fn write_line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}
