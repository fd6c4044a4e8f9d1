//! Pointer tagging used to fit an exchanger slot, `(offer, stamp)`, into a
//! single `Atom<_, u64>`.

use std::marker::PhantomData;

/// A packed pointer type that steals the bottom three bits of an 8-byte
/// aligned pointer for a flag.
///
/// ```
/// # use elimination_stack::bits::{Align8, FlagPtr};
/// let mut offer = Box::new(Align8::from(42u8));
/// let mut slot: FlagPtr<Align8<u8>> = Default::default();
/// slot.set_ptr(&mut *offer);
/// slot.set_flag(2);
/// assert_eq!(slot.get_flag(), 2);
/// assert_eq!(unsafe { (*slot.get_ptr()).inner }, 42);
/// ```
pub struct FlagPtr<T> {
    val: usize,
    _phantom: PhantomData<T>,
}

impl<T> Default for FlagPtr<T> {
    fn default() -> Self {
        Self {
            val: 0,
            _phantom: Default::default(),
        }
    }
}

impl<T> FlagPtr<T> {
    const MASK: usize = 0b111;

    pub fn get_ptr(&self) -> *mut T {
        (self.val & !Self::MASK) as *mut T
    }

    /// Panics if `ptr` is not 8 byte aligned.
    pub fn set_ptr(&mut self, ptr: *mut T) {
        let ptr = ptr as usize;
        assert_eq!(ptr & Self::MASK, 0);
        self.val = (ptr & !Self::MASK) | (self.val & Self::MASK);
    }

    pub fn get_flag(&self) -> usize {
        self.val & Self::MASK
    }

    /// Panics if `flag` is greater than seven (0b111).
    pub fn set_flag(&mut self, flag: usize) {
        assert_eq!(flag & !Self::MASK, 0);
        self.val = (self.val & !Self::MASK) | (flag & Self::MASK);
    }
}

/// A `T` stored on an eight byte boundary, so that `FlagPtr` can tag
/// pointers to values whose own alignment is smaller (a `u8` offer, say).
#[repr(align(8))]
pub struct Align8<T> {
    pub inner: T,
}

impl<T> From<T> for Align8<T> {
    fn from(inner: T) -> Self {
        Align8 { inner }
    }
}

impl<T> Align8<T> {
    /// Moves an optional value onto the heap.  `None` becomes a null pointer.
    pub fn boxed(val: Option<T>) -> *mut Align8<T> {
        match val {
            Some(val) => Box::into_raw(Box::new(val.into())),
            None => std::ptr::null_mut(),
        }
    }

    /// Takes back ownership of a pointer produced by `boxed`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Align8::boxed`, and must not be
    /// reclaimed twice.
    pub unsafe fn unbox(ptr: *mut Align8<T>) -> Option<T> {
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { Box::from_raw(ptr) }.inner)
        }
    }
}
