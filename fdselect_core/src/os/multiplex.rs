//! Blocking readiness wait with bounded retry on `EINTR`.

use super::fdset::FdSet;
use super::selector::{check_nfds, Selector, SysSelector};
use super::timeout::Timeout;
use crate::error::{Error, Result};
use log::{trace, warn};
use std::io::ErrorKind;
use std::thread;
use std::time::Duration;

/// How often an interrupted wait is re-issued before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: u32 = 10;
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(10);

    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        RetryPolicy { max_retries, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_DELAY)
    }
}

/// Waits until a descriptor in one of the sets is ready or `timeout` expires.
///
/// `nfds` is the highest descriptor in any set plus one. On return each set
/// only holds its ready descriptors; after a timeout they are all empty and
/// the call still succeeds. `EINTR` is retried under the default
/// [`RetryPolicy`].
pub fn select(
    nfds: libc::c_int,
    read: Option<&mut FdSet>,
    write: Option<&mut FdSet>,
    except: Option<&mut FdSet>,
    timeout: Timeout,
) -> Result<()> {
    select_with(&SysSelector, nfds, read, write, except, timeout, &RetryPolicy::default())
}

/// [`select`] with a caller-chosen retry bound and delay.
pub fn retry_select(
    nfds: libc::c_int,
    read: Option<&mut FdSet>,
    write: Option<&mut FdSet>,
    except: Option<&mut FdSet>,
    timeout: Timeout,
    policy: &RetryPolicy,
) -> Result<()> {
    select_with(&SysSelector, nfds, read, write, except, timeout, policy)
}

/// [`retry_select`] against an explicit backend.
///
/// `nfds` outside `0..=FdSet::CAPACITY` fails with `EINVAL` before the
/// backend is called.
///
/// The input sets are snapshotted before the first attempt and restored
/// before every retry, since their contents after `EINTR` are unspecified.
pub fn select_with<S: Selector + ?Sized>(
    selector: &S,
    nfds: libc::c_int,
    mut read: Option<&mut FdSet>,
    mut write: Option<&mut FdSet>,
    mut except: Option<&mut FdSet>,
    timeout: Timeout,
    policy: &RetryPolicy,
) -> Result<()> {
    check_nfds(nfds).map_err(Error::Select)?;
    let saved = [
        read.as_deref().copied(),
        write.as_deref().copied(),
        except.as_deref().copied(),
    ];
    trace!("select: nfds={} timeout={:?}", nfds, timeout);

    let mut retries = 0;
    loop {
        let res = selector.select(
            nfds,
            read.as_deref_mut(),
            write.as_deref_mut(),
            except.as_deref_mut(),
            timeout,
        );
        match res {
            Ok(n) => {
                trace!("select: {} descriptor(s) ready", n);
                return Ok(());
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                if retries >= policy.max_retries {
                    return Err(Error::Interrupted { attempts: retries + 1 });
                }
                retries += 1;
                warn!(
                    "select interrupted, retrying in {:?} ({}/{})",
                    policy.delay, retries, policy.max_retries
                );
                thread::sleep(policy.delay);
                restore(&mut read, saved[0]);
                restore(&mut write, saved[1]);
                restore(&mut except, saved[2]);
            }
            Err(e) => return Err(Error::Select(e)),
        }
    }
}

fn restore(set: &mut Option<&mut FdSet>, saved: Option<FdSet>) {
    if let (Some(set), Some(saved)) = (set.as_deref_mut(), saved) {
        *set = saved;
    }
}
