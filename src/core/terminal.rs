//! The device the engine drives.

use std::io;

use crate::core::event::{Inbound, Resize};
use crate::runtime::queue::Queue;

/// A terminal: an output byte sink plus a source of decoded input.
pub trait Terminal {
    /// Start delivering decoded input, replies and resizes into `queue`. The queue is closed when
    /// input reaches end-of-stream.
    fn start(&mut self, queue: Queue<Inbound>) -> io::Result<()>;

    /// Stop delivering input and restore the device state saved by [`Terminal::start`].
    fn stop(&mut self) -> io::Result<()>;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Current size. Pixel fields are zero when unknown.
    fn size(&self) -> Resize;
}

/// [`io::Write`] view of a terminal, so renderers can write to it directly.
pub(crate) struct TerminalWriter<'a, T: Terminal + ?Sized>(pub(crate) &'a mut T);

impl<T: Terminal + ?Sized> io::Write for TerminalWriter<'_, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Terminal::write(&mut *self.0, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
