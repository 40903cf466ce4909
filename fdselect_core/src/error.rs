//! Error taxonomy shared by the multiplexer and the interruptible reader.

use std::io;
use std::os::unix::io::RawFd;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("source exposes no underlying descriptor")]
    NoDescriptor,
    #[error("fd value {fd} too large to use with select(2) (capacity {capacity})")]
    DescriptorOutOfRange { fd: RawFd, capacity: usize },
    #[error("failed to create the cancellation pipe")]
    Pipe(#[source] io::Error),
    #[error("select was interrupted on {attempts} consecutive attempts")]
    Interrupted { attempts: u32 },
    #[error("select failed")]
    Select(#[source] io::Error),
    #[error("read was cancelled")]
    Cancelled,
    #[error("read timed out")]
    TimedOut,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Error::TimedOut)
    }
}

/// `Cancelled` deliberately does not map to `ErrorKind::Interrupted`: the
/// `std::io` helpers (`read_exact`, `read_to_end`, ...) silently retry that
/// kind, which would swallow the cancellation.
impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::TimedOut => io::Error::new(io::ErrorKind::TimedOut, err),
            Error::NoDescriptor | Error::DescriptorOutOfRange { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds() {
        let e: io::Error = Error::TimedOut.into();
        assert_eq!(e.kind(), io::ErrorKind::TimedOut);

        let e: io::Error = Error::Cancelled.into();
        assert_ne!(e.kind(), io::ErrorKind::Interrupted);
        let inner = e.get_ref().and_then(|i| i.downcast_ref::<Error>());
        assert!(inner.map_or(false, Error::is_cancelled));

        let e: io::Error = Error::Io(io::Error::from_raw_os_error(libc::EBADF)).into();
        assert_eq!(e.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn messages() {
        assert_eq!(
            Error::Interrupted { attempts: 11 }.to_string(),
            "select was interrupted on 11 consecutive attempts"
        );
        assert_eq!(
            Error::DescriptorOutOfRange { fd: 2048, capacity: 1024 }.to_string(),
            "fd value 2048 too large to use with select(2) (capacity 1024)"
        );
    }
}
