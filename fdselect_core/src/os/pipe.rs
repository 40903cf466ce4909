//! Anonymous pipe pair with close-on-exec set on both ends.

use std::fs::File;
use std::io::{Error, Result};
use std::os::unix::io::{FromRawFd, RawFd};

/// Both ends of a pipe. Dropping an end closes it.
#[derive(Debug)]
pub struct Pipe {
    pub read: File,
    pub write: File,
}

impl Pipe {
    pub fn new() -> Result<Self> {
        let mut fds: [RawFd; 2] = [-1, -1];
        sys::pipe_cloexec(&mut fds)?;
        // SAFETY: both descriptors were just created and are owned by nobody else.
        let (read, write) = unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) };
        Ok(Pipe { read, write })
    }
}

/// Sets `O_NONBLOCK` on `fd`.
pub fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "netbsd",
))]
mod sys {
    use super::*;

    pub fn pipe_cloexec(fds: &mut [RawFd; 2]) -> Result<()> {
        let res = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
        if res < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }
}

// Darwin has no pipe2; the flag is set right after creation.
#[cfg(any(target_os = "macos", target_os = "ios"))]
mod sys {
    use super::*;

    pub fn pipe_cloexec(fds: &mut [RawFd; 2]) -> Result<()> {
        let res = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if res < 0 {
            return Err(Error::last_os_error());
        }
        for &fd in fds.iter() {
            if let Err(e) = set_cloexec(fd) {
                unsafe {
                    libc::close(fds[0]);
                    libc::close(fds[1]);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn set_cloexec(fd: RawFd) -> Result<()> {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        if flags < 0 {
            return Err(Error::last_os_error());
        }
        if unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } < 0 {
            return Err(Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::io::AsRawFd;

    #[test]
    fn bytes_flow_from_write_to_read_end() {
        let mut pipe = Pipe::new().unwrap();
        pipe.write.write_all(b"hello").unwrap();
        drop(pipe.write);
        let mut s = String::new();
        pipe.read.read_to_string(&mut s).unwrap();
        assert_eq!(s, "hello");
    }

    #[test]
    fn nonblocking_write_end_reports_would_block_when_full() {
        let mut pipe = Pipe::new().unwrap();
        set_nonblocking(pipe.write.as_raw_fd()).unwrap();
        let chunk = [0u8; 4096];
        let err = loop {
            if let Err(e) = pipe.write.write(&chunk) {
                break e;
            }
        };
        assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    }

    #[test]
    fn both_ends_are_close_on_exec() {
        let pipe = Pipe::new().unwrap();
        for fd in [pipe.read.as_raw_fd(), pipe.write.as_raw_fd()] {
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
            assert!(flags >= 0);
            assert_ne!(flags & libc::FD_CLOEXEC, 0);
        }
    }
}
