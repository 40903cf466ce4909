//! 待機タイムアウトと固定小数点表現への変換

use std::mem;
use std::time::Duration;

/// How long a wait may block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Timeout {
    /// Block until a descriptor is ready.
    #[default]
    Infinite,
    /// Return immediately.
    Poll,
    /// Block up to the given duration.
    After(Duration),
}

impl Timeout {
    /// Signed milliseconds: negative blocks indefinitely, zero polls.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            m if m < 0 => Timeout::Infinite,
            0 => Timeout::Poll,
            m => Timeout::After(Duration::from_millis(m as u64)),
        }
    }

    /// `None` for an unbounded wait.
    pub fn as_duration(&self) -> Option<Duration> {
        match *self {
            Timeout::Infinite => None,
            Timeout::Poll => Some(Duration::ZERO),
            Timeout::After(d) => Some(d),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Timeout::Infinite)
    }

    /// Microsecond form used by `select(2)`. Sub-microsecond parts are truncated.
    pub fn to_timeval(&self) -> Option<libc::timeval> {
        self.as_duration().map(|d| {
            // SAFETY: timeval is plain old data; all-zero is a valid value.
            let mut tv: libc::timeval = unsafe { mem::zeroed() };
            tv.tv_sec = clamp_secs(d);
            tv.tv_usec = d.subsec_micros() as _;
            tv
        })
    }

    /// Nanosecond form used by `pselect(2)`.
    pub fn to_timespec(&self) -> Option<libc::timespec> {
        self.as_duration().map(|d| {
            // SAFETY: timespec is plain old data; all-zero is a valid value.
            let mut ts: libc::timespec = unsafe { mem::zeroed() };
            ts.tv_sec = clamp_secs(d);
            ts.tv_nsec = d.subsec_nanos() as _;
            ts
        })
    }
}

fn clamp_secs(d: Duration) -> libc::time_t {
    d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Timeout::Poll
        } else {
            Timeout::After(d)
        }
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Timeout::Infinite, Timeout::from)
    }
}
