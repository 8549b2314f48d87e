//! In-memory stream standing in for a relay in tests
//!
//! Replies are loaded up front and read back in order; everything the client
//! writes is captured. Clones share the same buffers, so a test can keep one
//! handle while the session owns another.

use std::{
    io::{self, Cursor, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Buffer behind each direction of a [`MockStream`]
pub type MockCursor = Cursor<Vec<u8>>;

/// A fake connection to a relay
#[derive(Clone, Debug, Default)]
pub struct MockStream {
    reader: Arc<Mutex<MockCursor>>,
    writer: Arc<Mutex<MockCursor>>,
}

fn lock(cursor: &Mutex<MockCursor>) -> MutexGuard<'_, MockCursor> {
    cursor.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockStream {
    /// Creates a stream with nothing to read
    pub fn new() -> MockStream {
        MockStream::default()
    }

    /// Creates a stream whose reads return `replies`
    pub fn with_replies<R: AsRef<[u8]>>(replies: R) -> MockStream {
        MockStream {
            reader: Arc::new(Mutex::new(MockCursor::new(replies.as_ref().to_vec()))),
            writer: Arc::new(Mutex::new(MockCursor::new(Vec::new()))),
        }
    }

    /// Returns and clears everything written so far
    pub fn take_vec(&self) -> Vec<u8> {
        let mut cursor = lock(&self.writer);
        let vec = cursor.get_ref().clone();
        cursor.set_position(0);
        cursor.get_mut().clear();
        vec
    }

    /// Everything written so far, as text
    pub fn written(&self) -> String {
        String::from_utf8_lossy(lock(&self.writer).get_ref()).into_owned()
    }
}

impl Write for MockStream {
    fn write(&mut self, msg: &[u8]) -> io::Result<usize> {
        lock(&self.writer).write(msg)
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.writer).flush()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        lock(&self.reader).read(buf)
    }
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use super::MockStream;

    #[test]
    fn write_take_test() {
        let mut mock = MockStream::new();
        mock.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(mock.take_vec(), vec![1, 2, 3]);
        assert!(mock.take_vec().is_empty());
    }

    #[test]
    fn read_replies_test() {
        let mut mock = MockStream::with_replies("220 ready\r\n");
        let mut read = String::new();
        mock.read_to_string(&mut read).unwrap();
        assert_eq!(read, "220 ready\r\n");
    }

    #[test]
    fn clone_test() {
        let mut mock = MockStream::new();
        let cloned = mock.clone();
        mock.write_all(b"EHLO\r\n").unwrap();
        assert_eq!(cloned.written(), "EHLO\r\n");
    }
}
