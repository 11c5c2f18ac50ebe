use std::iter::FusedIterator;
use std::mem::ManuallyDrop;
use std::ptr;
use std::slice;

use super::Vector;
use super::buffer::Buffer;
use crate::mem::construct::destruct_n;
use crate::mem::{Bitwise, Global, MemoryService, Relocation};

impl<T, const N: usize, R: Relocation, M: MemoryService> IntoIterator for Vector<T, N, R, M> {
    type Item = T;

    type IntoIter = IntoIter<T, N, R, M>;

    fn into_iter(self) -> Self::IntoIter {
        let vec = ManuallyDrop::new(self);
        // SAFETY: vec is never dropped, so the buffer is moved out of it exactly once.
        let mut buf = unsafe { ptr::read(&vec.buf) };
        let end = buf.count();
        // SAFETY: The iterator takes over the values [0, end), the buffer only keeps the storage.
        unsafe { buf.set_count(0) };

        IntoIter { buf, start: 0, end }
    }
}

impl<'a, T, const N: usize, R: Relocation, M: MemoryService> IntoIterator
    for &'a Vector<T, N, R, M>
{
    type Item = &'a T;

    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize, R: Relocation, M: MemoryService> IntoIterator
    for &'a mut Vector<T, N, R, M>
{
    type Item = &'a mut T;

    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// An owned iterator over the values of a [`Vector`]. See [`Vector::into_iter`].
///
/// Values are read by position, so the iterator stays valid for inline storage even though it
/// moves the buffer.
pub struct IntoIter<T, const N: usize = 0, R: Relocation = Bitwise, M: MemoryService = Global> {
    buf: Buffer<T, N, R, M>,
    start: usize,
    end: usize,
}

impl<T, const N: usize, R: Relocation, M: MemoryService> IntoIter<T, N, R, M> {
    /// Returns the values which haven't been yielded yet.
    pub const fn as_slice(&self) -> &[T] {
        // SAFETY: Values in [start, end) are still live.
        unsafe {
            slice::from_raw_parts(self.buf.as_ptr().add(self.start).as_ptr(), self.end - self.start)
        }
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Drop for IntoIter<T, N, R, M> {
    fn drop(&mut self) {
        let remaining = self.end - self.start;
        self.end = self.start;
        // SAFETY: The values that haven't been yielded are still live. The buffer's count is 0, so
        // dropping it afterwards only releases the storage.
        unsafe { destruct_n(self.buf.as_mut_ptr().add(self.start), remaining) }
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> Iterator for IntoIter<T, N, R, M> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start < self.end {
            // SAFETY: The value at start is live. Incrementing start afterwards moves it out.
            let value = unsafe { self.buf.as_ptr().add(self.start).read() };
            self.start += 1;
            Some(value)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> DoubleEndedIterator
    for IntoIter<T, N, R, M>
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.start < self.end {
            self.end -= 1;
            // SAFETY: The value at the decremented end is live and is now out of the range.
            let value = unsafe { self.buf.as_ptr().add(self.end).read() };
            Some(value)
        } else {
            None
        }
    }
}

impl<T, const N: usize, R: Relocation, M: MemoryService> FusedIterator for IntoIter<T, N, R, M> {}

impl<T, const N: usize, R: Relocation, M: MemoryService> ExactSizeIterator
    for IntoIter<T, N, R, M>
{
    fn len(&self) -> usize {
        self.end - self.start
    }
}
