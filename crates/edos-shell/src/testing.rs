//! Helpers for driving a shell without a terminal.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// In-memory writer whose contents stay readable after being boxed into a
/// session.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Boxed clone for handing to a session.
    pub fn writer(&self) -> Box<dyn Write> {
        Box::new(self.clone())
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
