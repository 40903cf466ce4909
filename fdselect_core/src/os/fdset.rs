//! `fd_set` とビット単位で互換なディスクリプタ集合。
//!
//! The word type and the number of words differ per platform; only the
//! layout table below is platform specific, the shift/mask logic is shared.

use std::fmt;
use std::mem;
use std::os::unix::io::RawFd;

// glibc / musl / bionic: `long fds_bits[FD_SETSIZE / (8 * sizeof(long))]`
#[cfg(any(target_os = "linux", target_os = "android"))]
mod layout {
    pub type Word = libc::c_long;
    pub const SETSIZE: usize = 1024;
}

// Darwin: `__int32_t fds_bits[__DARWIN_howmany(1024, 32)]`
#[cfg(any(target_os = "macos", target_os = "ios"))]
mod layout {
    pub type Word = i32;
    pub const SETSIZE: usize = 1024;
}

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
mod layout {
    pub type Word = libc::c_ulong;
    pub const SETSIZE: usize = 1024;
}

#[cfg(target_os = "openbsd")]
mod layout {
    pub type Word = u32;
    pub const SETSIZE: usize = 1024;
}

#[cfg(target_os = "netbsd")]
mod layout {
    pub type Word = u32;
    pub const SETSIZE: usize = 256;
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "netbsd",
)))]
compile_error!("no fd_set layout is known for this target");

use layout::{Word, SETSIZE};

const BITS_PER_WORD: usize = 8 * mem::size_of::<Word>();
const WORDS: usize = SETSIZE / BITS_PER_WORD;

/// Fixed-capacity descriptor bitmask laid out exactly like the native `fd_set`.
///
/// A set handed to [`select`](super::select) is an in/out parameter: on
/// return it only holds the descriptors that became ready. Clear and
/// repopulate it before every wait.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FdSet {
    bits: [Word; WORDS],
}

// A mismatch here would let the kernel write past the end of the set.
const _: () = assert!(mem::size_of::<FdSet>() == mem::size_of::<libc::fd_set>());
const _: () = assert!(mem::align_of::<FdSet>() >= mem::align_of::<libc::fd_set>());

const EMPTY: FdSet = FdSet { bits: [0; WORDS] };

impl FdSet {
    /// Largest descriptor number plus one that the set can hold.
    pub const CAPACITY: usize = SETSIZE;
    pub const BITS_PER_WORD: usize = BITS_PER_WORD;
    pub const WORDS: usize = WORDS;

    /// Returns an empty set.
    pub const fn new() -> Self {
        EMPTY
    }

    #[inline]
    fn locate(fd: RawFd) -> (usize, Word) {
        // A negative fd wraps to a huge index and panics on the array access.
        let fd = fd as usize;
        (fd / BITS_PER_WORD, (1 as Word) << (fd % BITS_PER_WORD))
    }

    /// Adds `fd` to the set.
    ///
    /// # Panics
    ///
    /// Panics if `fd` is negative or not below [`FdSet::CAPACITY`].
    #[inline]
    pub fn insert(&mut self, fd: RawFd) {
        let (word, mask) = Self::locate(fd);
        self.bits[word] |= mask;
    }

    /// Removes `fd` from the set. Same bounds as [`FdSet::insert`].
    #[inline]
    pub fn remove(&mut self, fd: RawFd) {
        let (word, mask) = Self::locate(fd);
        self.bits[word] &= !mask;
    }

    /// Same bounds as [`FdSet::insert`].
    #[inline]
    pub fn contains(&self, fd: RawFd) -> bool {
        let (word, mask) = Self::locate(fd);
        self.bits[word] & mask != 0
    }

    /// Clears every bit.
    #[inline]
    pub fn clear(&mut self) {
        *self = EMPTY;
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Highest descriptor in the set, if any. `highest() + 1` is the `nfds`
    /// argument for a wait on this set.
    pub fn highest(&self) -> Option<RawFd> {
        self.bits
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &w)| w != 0)
            .map(|(i, &w)| {
                let bit = BITS_PER_WORD - 1 - w.leading_zeros() as usize;
                (i * BITS_PER_WORD + bit) as RawFd
            })
    }

    /// Member descriptors in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = RawFd> + '_ {
        (0..SETSIZE as RawFd).filter(move |&fd| self.contains(fd))
    }

    /// Pointer suitable for the `select(2)` family.
    pub fn as_raw_mut(&mut self) -> *mut libc::fd_set {
        self as *mut FdSet as *mut libc::fd_set
    }
}

impl Default for FdSet {
    fn default() -> Self {
        EMPTY
    }
}

impl fmt::Debug for FdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Extend<RawFd> for FdSet {
    fn extend<I: IntoIterator<Item = RawFd>>(&mut self, iter: I) {
        for fd in iter {
            self.insert(fd);
        }
    }
}

impl FromIterator<RawFd> for FdSet {
    fn from_iter<I: IntoIterator<Item = RawFd>>(iter: I) -> Self {
        let mut set = FdSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_round_trip_for_every_descriptor() {
        let mut set = FdSet::new();
        for fd in 0..FdSet::CAPACITY as RawFd {
            set.insert(fd);
            assert!(set.contains(fd), "fd {} should be set", fd);
            set.remove(fd);
            assert!(!set.contains(fd), "fd {} should be cleared", fd);
        }
        assert!(set.is_empty());
    }

    #[test]
    fn clear_empties_a_full_set() {
        let mut set: FdSet = (0..FdSet::CAPACITY as RawFd).collect();
        assert!(set.contains(0));
        assert!(set.contains(FdSet::CAPACITY as RawFd - 1));
        set.clear();
        for fd in 0..FdSet::CAPACITY as RawFd {
            assert!(!set.contains(fd));
        }
        assert_eq!(set, FdSet::default());
    }

    #[test]
    fn bit_lands_in_native_word_and_position() {
        let mut set = FdSet::new();
        set.insert(33);
        let word = 33 / FdSet::BITS_PER_WORD;
        let bit = 33 % FdSet::BITS_PER_WORD;
        for (i, &w) in set.bits.iter().enumerate() {
            if i == word {
                assert_eq!(w, (1 as Word) << bit);
            } else {
                assert_eq!(w, 0);
            }
        }
    }

    #[test]
    fn top_bit_of_a_word_is_addressable() {
        let fd = (FdSet::BITS_PER_WORD - 1) as RawFd;
        let mut set = FdSet::new();
        set.insert(fd);
        assert!(set.contains(fd));
        assert!(!set.contains(fd - 1));
        assert!(!set.contains(fd + 1));
        assert_eq!(set.highest(), Some(fd));
    }

    #[test]
    fn insert_leaves_other_members_untouched() {
        let mut set = FdSet::new();
        set.insert(3);
        set.insert(4);
        set.remove(3);
        assert!(!set.contains(3));
        assert!(set.contains(4));
    }

    #[test]
    fn layout_matches_libc() {
        assert_eq!(mem::size_of::<FdSet>(), mem::size_of::<libc::fd_set>());
        assert_eq!(FdSet::WORDS * FdSet::BITS_PER_WORD, FdSet::CAPACITY);
    }

    #[test]
    fn agrees_with_libc_macros() {
        let mut ours = FdSet::new();
        ours.insert(5);
        ours.insert(70);
        let raw = ours.as_raw_mut();
        unsafe {
            assert!(libc::FD_ISSET(5, raw));
            assert!(libc::FD_ISSET(70, raw));
            assert!(!libc::FD_ISSET(6, raw));
            libc::FD_SET(9, raw);
            libc::FD_CLR(5, raw);
        }
        assert!(ours.contains(9));
        assert!(!ours.contains(5));
    }

    #[test]
    fn highest_and_iter() {
        let set: FdSet = [2, 40, 17].into_iter().collect();
        assert_eq!(set.highest(), Some(40));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 17, 40]);
        assert_eq!(FdSet::new().highest(), None);
        assert_eq!(format!("{:?}", set), "{2, 17, 40}");
    }
}
