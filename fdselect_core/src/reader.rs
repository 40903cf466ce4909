//! Blocking reads that another thread can cancel.
//!
//! The reader waits on its source and on the read end of a private pipe
//! in the same `select` call. [`Interrupter::interrupt`] writes one byte
//! into that pipe, which wakes the wait and makes the read return
//! [`Error::Cancelled`].
//!
//! Outcome of a single read, in inspection order:
//!
//! 1. source ready → the source's own `read` result, verbatim. This wins when
//!    a cancellation token is pending in the same wait cycle.
//! 2. pipe ready → one token is consumed, [`Error::Cancelled`].
//! 3. neither → the timeout expired, [`Error::TimedOut`].
//!
//! Tokens queue. An interrupt issued while no read is in flight is not lost:
//! it cancels the next read immediately, and `n` interrupts cancel the next
//! `n` reads. There is no way to withdraw a token once written.

use crate::config::ReaderConfig;
use crate::error::{Error, Result};
use crate::os::{retry_select, set_nonblocking, FdSet, Pipe, RetryPolicy, Timeout};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::net::TcpStream;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::process::{ChildStderr, ChildStdout};
use std::sync::Arc;

/// EOT. Any byte would do; nothing inspects it.
const CANCEL_TOKEN: u8 = 0x04;

/// A byte source that may be backed by a descriptor.
pub trait DescriptorSource: Read {
    /// `None` when there is nothing to wait on.
    fn descriptor(&self) -> Option<RawFd>;
}

macro_rules! impl_descriptor_source {
    ($($t:ty),* $(,)?) => {
        $(
            impl DescriptorSource for $t {
                fn descriptor(&self) -> Option<RawFd> {
                    Some(self.as_raw_fd())
                }
            }
        )*
    };
}

impl_descriptor_source!(
    File,
    &File,
    TcpStream,
    &TcpStream,
    UnixStream,
    &UnixStream,
    ChildStdout,
    ChildStderr,
    io::Stdin,
);

impl<T: AsRef<[u8]>> DescriptorSource for Cursor<T> {
    fn descriptor(&self) -> Option<RawFd> {
        None
    }
}

impl DescriptorSource for &[u8] {
    fn descriptor(&self) -> Option<RawFd> {
        None
    }
}

impl<R: DescriptorSource + ?Sized> DescriptorSource for Box<R> {
    fn descriptor(&self) -> Option<RawFd> {
        (**self).descriptor()
    }
}

fn check_range(fd: RawFd) -> Result<()> {
    if fd < 0 || fd as usize >= FdSet::CAPACITY {
        return Err(Error::DescriptorOutOfRange {
            fd,
            capacity: FdSet::CAPACITY,
        });
    }
    Ok(())
}

/// Cancels reads of the [`InterruptibleReader`] it came from.
///
/// Cheap to clone and safe to use from any thread.
#[derive(Clone, Debug)]
pub struct Interrupter {
    tx: Arc<File>,
}

impl Interrupter {
    /// Queues one cancellation token. Fire-and-forget: never blocks, and a
    /// failed write (a full pipe, or a reader that was dropped) is only logged.
    pub fn interrupt(&self) {
        match (&*self.tx).write(&[CANCEL_TOKEN]) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                warn!("cancellation pipe full, token dropped");
            }
            Err(e) => warn!("failed to queue cancellation token: {}", e),
        }
    }
}

/// Wraps a descriptor-backed source so its blocking reads can time out or be
/// cancelled from another thread.
///
/// Dropping the reader closes its pipe and drops the source. To keep the
/// source's lifecycle with the caller, wrap a borrow instead (`&File`,
/// `&TcpStream`, `&UnixStream`); then only the pipe is closed.
#[derive(Debug)]
pub struct InterruptibleReader<R> {
    source: R,
    fd: RawFd,
    timeout: Timeout,
    retry: RetryPolicy,
    cancel_rx: File,
    cancel_tx: Arc<File>,
}

impl<R: DescriptorSource> InterruptibleReader<R> {
    /// Fails with [`Error::NoDescriptor`] when `source` has no descriptor.
    pub fn new(source: R) -> Result<Self> {
        let fd = source.descriptor().ok_or(Error::NoDescriptor)?;
        check_range(fd)?;
        let pipe = Pipe::new().map_err(Error::Pipe)?;
        check_range(pipe.read.as_raw_fd())?;
        set_nonblocking(pipe.write.as_raw_fd()).map_err(Error::Pipe)?;
        debug!(
            "interruptible reader on fd {} (cancel pipe {}/{})",
            fd,
            pipe.read.as_raw_fd(),
            pipe.write.as_raw_fd()
        );
        Ok(InterruptibleReader {
            source,
            fd,
            timeout: Timeout::Infinite,
            retry: RetryPolicy::default(),
            cancel_rx: pipe.read,
            cancel_tx: Arc::new(pipe.write),
        })
    }

    /// Like [`InterruptibleReader::new`], taking timeout and retry policy
    /// from `config`.
    pub fn with_config(source: R, config: &ReaderConfig) -> Result<Self> {
        let mut reader = Self::new(source)?;
        reader.timeout = config.timeout;
        reader.retry = config.retry;
        Ok(reader)
    }

    /// Waits for the source or a cancellation token, then reads.
    pub fn read_interruptible(&mut self, buf: &mut [u8]) -> Result<usize> {
        let cancel_fd = self.cancel_rx.as_raw_fd();
        let mut readable = FdSet::new();
        readable.insert(self.fd);
        readable.insert(cancel_fd);

        retry_select(
            self.fd.max(cancel_fd) + 1,
            Some(&mut readable),
            None,
            None,
            self.timeout,
            &self.retry,
        )?;

        if readable.contains(self.fd) {
            return self.source.read(buf).map_err(Error::Io);
        }
        if readable.contains(cancel_fd) {
            let mut token = [0u8; 1];
            (&self.cancel_rx).read_exact(&mut token)?;
            debug!("read on fd {} cancelled", self.fd);
            return Err(Error::Cancelled);
        }
        Err(Error::TimedOut)
    }
}

impl<R> InterruptibleReader<R> {
    /// Queues one cancellation token; see [`Interrupter::interrupt`].
    pub fn interrupt(&self) {
        self.interrupter().interrupt();
    }

    /// A handle that can cancel this reader's reads from other threads.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Timeout) {
        self.timeout = timeout;
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry = policy;
    }

    /// Descriptor of the wrapped source.
    pub fn descriptor(&self) -> RawFd {
        self.fd
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Releases the pipe and hands the source back.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: DescriptorSource> Read for InterruptibleReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_interruptible(buf).map_err(io::Error::from)
    }
}
