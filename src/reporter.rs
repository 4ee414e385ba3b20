use std::io::Write;

use crate::scanner::Pos;

pub trait Reporter {
    fn report(&mut self, pos: Pos, msg: &str);
}

// A reporter that renders error messages to the output
pub struct WriteReporter<'w, W>
where
    W: Write,
{
    // Store this as a mut reference so we can't accidentally lose something like stderr().lock() inside the reporter
    // that doesn't go out of scope and cause a deadlock
    writer: &'w mut W,
}

impl<'w, W> WriteReporter<'w, W>
where
    W: Write,
{
    pub fn new(writer: &'w mut W) -> WriteReporter<'w, W> {
        WriteReporter { writer }
    }
}

impl<'w, W> Reporter for WriteReporter<'w, W>
where
    W: Write,
{
    fn report(&mut self, pos: Pos, msg: &str) {
        // If the write fails, we don't care
        _ = writeln!(self.writer, "error at {}: {}", pos, msg);
    }
}
