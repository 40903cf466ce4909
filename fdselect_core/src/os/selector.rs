//! OS 毎の select 呼び出しが実装する共通トレイト
//!
//! * Linux/Android → `pselect(2)` (`timespec`, nanoseconds). aarch64 and other
//!   newer Linux ABIs have no legacy `select` syscall.
//! * macOS/BSD     → `select(2)` (`timeval`, microseconds)

use super::fdset::FdSet;
use super::timeout::Timeout;
use std::io::Result;
use std::ptr;

/// One blocking readiness wait, without any retry.
///
/// On success every supplied set holds only its ready descriptors and the
/// total ready count is returned. `EINTR` is reported as an error of kind
/// `Interrupted`; retrying is the caller's business.
pub trait Selector {
    fn select(
        &self,
        nfds: libc::c_int,
        read: Option<&mut FdSet>,
        write: Option<&mut FdSet>,
        except: Option<&mut FdSet>,
        timeout: Timeout,
    ) -> Result<usize>;
}

impl<S: Selector + ?Sized> Selector for &S {
    fn select(
        &self,
        nfds: libc::c_int,
        read: Option<&mut FdSet>,
        write: Option<&mut FdSet>,
        except: Option<&mut FdSet>,
        timeout: Timeout,
    ) -> Result<usize> {
        (**self).select(nfds, read, write, except, timeout)
    }
}

/// The native system call for the current target.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysSelector;

/// Rejects an `nfds` the sets cannot cover. Linux only bounds `nfds` by the
/// fd table size, so a larger value lets the kernel touch memory past the
/// end of each `FdSet`.
pub fn check_nfds(nfds: libc::c_int) -> Result<()> {
    if nfds < 0 || nfds as usize > FdSet::CAPACITY {
        return Err(std::io::Error::from_raw_os_error(libc::EINVAL));
    }
    Ok(())
}

fn raw(set: Option<&mut FdSet>) -> *mut libc::fd_set {
    set.map_or(ptr::null_mut(), FdSet::as_raw_mut)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod sys {
    use super::*;
    use std::io::Error;

    impl Selector for SysSelector {
        fn select(
            &self,
            nfds: libc::c_int,
            read: Option<&mut FdSet>,
            write: Option<&mut FdSet>,
            except: Option<&mut FdSet>,
            timeout: Timeout,
        ) -> Result<usize> {
            check_nfds(nfds)?;
            let ts = timeout.to_timespec();
            let ts_ptr = ts.as_ref().map_or(ptr::null(), |t| t as *const libc::timespec);
            // SAFETY: every non-null set points at an FdSet whose layout is
            // asserted equal to libc::fd_set; a null sigmask keeps the
            // caller's mask.
            let n = unsafe {
                libc::pselect(nfds, raw(read), raw(write), raw(except), ts_ptr, ptr::null())
            };
            if n < 0 {
                return Err(Error::last_os_error());
            }
            Ok(n as usize)
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod sys {
    use super::*;
    use std::io::Error;

    impl Selector for SysSelector {
        fn select(
            &self,
            nfds: libc::c_int,
            read: Option<&mut FdSet>,
            write: Option<&mut FdSet>,
            except: Option<&mut FdSet>,
            timeout: Timeout,
        ) -> Result<usize> {
            check_nfds(nfds)?;
            let mut tv = timeout.to_timeval();
            let tv_ptr = tv.as_mut().map_or(ptr::null_mut(), |t| t as *mut libc::timeval);
            // SAFETY: see the Linux implementation.
            let n = unsafe { libc::select(nfds, raw(read), raw(write), raw(except), tv_ptr) };
            if n < 0 {
                return Err(Error::last_os_error());
            }
            Ok(n as usize)
        }
    }
}
