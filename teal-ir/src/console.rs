//! Input and output streams used by `read` and `print`.

use std::cell::RefCell;
use std::io::{self, BufRead, Cursor, Write};
use std::rc::Rc;

enum Input {
    /// Read through the handle's own buffer.
    Stdin(io::Stdin),
    Reader(Box<dyn BufRead>),
}

/// The streams a running program reads lines from and prints lines to.
pub struct Console {
    input: Input,
    output: Box<dyn Write>,
}

impl Console {
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: Input::Reader(Box::new(input)),
            output: Box::new(output),
        }
    }

    /// Standard input and standard output.
    pub fn stdio() -> Self {
        Self {
            input: Input::Stdin(io::stdin()),
            output: Box::new(io::stdout()),
        }
    }

    /// In-memory console fed with `input`. The returned buffer collects
    /// everything printed.
    pub fn buffered(input: &str) -> (Self, SharedBuffer) {
        let output = SharedBuffer::default();
        let console = Self::new(Cursor::new(input.as_bytes().to_vec()), output.clone());
        (console, output)
    }

    /// Write `text` and a newline, then flush.
    pub fn print_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")?;
        self.output.flush()
    }

    /// Read one line without its terminator. `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let read = match &mut self.input {
            Input::Stdin(stdin) => stdin.read_line(&mut line)?,
            Input::Reader(reader) => reader.read_line(&mut line)?,
        };
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

/// Cloneable in-memory sink. All clones append to the same bytes.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
