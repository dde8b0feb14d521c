use std::io::{self, Cursor, Read, Write};

/// Scripted peer: reads come from `input`, writes are captured in `output`.
pub(crate) struct MockStream {
    input: Cursor<Vec<u8>>,
    pub(crate) output: Vec<u8>,
}

impl MockStream {
    pub(crate) fn new(input: &[u8]) -> Self {
        Self {
            input: Cursor::new(input.to_vec()),
            output: Vec::new(),
        }
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
