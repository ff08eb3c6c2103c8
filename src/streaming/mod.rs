//! Streaming module - record transport and the receiver-side journal

mod export;

#[cfg(feature = "serial")]
mod serial;

pub use export::*;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

use std::io::Write;

use thiserror::Error;

/// Failure handing a record to the link
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("link write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("link unavailable: {0}")]
    Unavailable(String),
}

/// Byte sink the emitted records are handed to
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Transport over any `std::io::Write`, such as stdout or a file
pub struct WriterTransport<W> {
    writer: W,
}

impl<W: Write> WriterTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for WriterTransport<W> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).send(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_transport_passes_bytes_through() {
        let mut transport = WriterTransport::new(Vec::new());
        transport.send(b"1.0000,2.0000\n").unwrap();
        transport.send(b"0.0000,0.0000\n").unwrap();
        assert_eq!(transport.into_inner(), b"1.0000,2.0000\n0.0000,0.0000\n".to_vec());
    }

    #[test]
    fn test_boxed_transport() {
        let mut boxed: Box<dyn Transport> = Box::new(WriterTransport::new(Vec::new()));
        assert!(boxed.send(b"x\n").is_ok());
    }
}
