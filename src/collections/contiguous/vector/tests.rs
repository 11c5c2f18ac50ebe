#![cfg(test)]

use std::cell::Cell;
use std::rc::Rc;

use super::*;
use crate::error::{AllocFailure, CapacityOverflow, IndexOutOfBounds, InsertError, ReserveError};
use crate::mem::{Bitwise, Elementwise, Global, MemoryService, Relocation};
use crate::util::panic::assert_panics;
use crate::util::test_types::{CountedDrop, PanicOnClone, TestMemory, ZeroSizedType};

type Tracked<T, const N: usize = 0, R = Bitwise> = Vector<T, N, R, TestMemory>;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn fill_to_capacity<const N: usize, R: Relocation, M: MemoryService>(
    vec: &mut Vector<String, N, R, M>,
) {
    if vec.count() == vec.capacity() {
        vec.append("seed".to_owned());
    }
    while vec.count() < vec.capacity() {
        vec.append(vec.count().to_string());
    }
}

#[test]
fn test_append_and_growth() {
    let mut vec = Vector::<u32>::new();
    assert_eq!(vec.capacity(), 0);
    assert!(!vec.is_inline(), "A Vector without inline capacity is never inline.");

    let mut last_cap = 0;
    for i in 0..100 {
        vec.append(i);
        assert!(vec.count() <= vec.capacity());
        assert!(vec.capacity() >= last_cap, "Capacity should never shrink during growth.");
        last_cap = vec.capacity();
    }
    assert_eq!(*vec, (0..100).collect::<Vec<u32>>()[..]);

    let mut vec = Vector::<u32>::new();
    vec.append(0);
    assert_eq!(vec.capacity(), 4, "The first block should fill the 16 byte size class.");
    vec.extend([1, 2, 3, 4]);
    assert_eq!(vec.capacity(), 8, "Growth should be ~1.5x, rounded up to a size class.");
    assert_eq!(vec.byte_size(), 20);
}

#[test]
fn test_inline_promotion() {
    let memory = TestMemory::new();
    let mut vec = Tracked::<String, 4>::new_in(memory.clone());
    assert_eq!(Tracked::<String, 4>::default_capacity(), 4);

    for s in ["a", "b", "c", "d"] {
        vec.append(s.to_owned());
    }
    assert!(vec.is_inline());
    assert_eq!(vec.capacity(), 4);
    assert_eq!(memory.outstanding(), 0, "Inline storage shouldn't allocate.");

    vec.append("e".to_owned());
    assert!(!vec.is_inline(), "Exceeding the inline capacity should move to the heap.");
    assert!(vec.capacity() > 4);
    assert_eq!(memory.outstanding(), 1);
    assert_eq!(*vec, strings(&["a", "b", "c", "d", "e"])[..]);

    drop(vec);
    assert_eq!(memory.outstanding(), 0, "Dropping should release the heap block.");
}

#[test]
fn test_self_append_at_capacity() {
    let mut vec = Vector::<i32>::new();
    vec.extend([1, 2, 3, 4]);
    assert_eq!(vec.capacity(), 4);

    vec.append(*vec.last().expect("not empty"));
    assert_eq!(*vec, [1, 2, 3, 4, 4]);

    fn check<const N: usize, R: Relocation>() {
        let mut vec = Vector::<String, N, R>::new();
        fill_to_capacity(&mut vec);
        let before = vec.to_vec();

        vec.append_inplace(|values| values[values.len() - 1].clone());
        assert_eq!(vec[..before.len()], before[..]);
        assert_eq!(vec.last(), before.last(), "The new value should copy the old last value.");

        fill_to_capacity(&mut vec);
        vec.append_inplace(|values| values.concat());
        assert_eq!(
            vec.last().expect("not empty"),
            &vec[..vec.count() - 1].concat(),
            "The whole old contents should be readable while growing."
        );
    }

    check::<0, Bitwise>();
    check::<0, Elementwise>();
    check::<3, Bitwise>();
    check::<3, Elementwise>();
}

#[test]
fn test_append_inplace_rollback() {
    let memory = TestMemory::new();
    let mut vec = Tracked::<String>::new_in(memory.clone());
    fill_to_capacity(&mut vec);

    let before = vec.to_vec();
    let cap = vec.capacity();

    assert_panics!({
        vec.append_inplace(|_| panic!("constructor failed"));
    });
    assert_eq!(*vec, before[..], "A panicking constructor should leave the contents alone.");
    assert_eq!(vec.capacity(), cap);
    assert_eq!(memory.outstanding(), 1, "The fresh block should have been released.");

    let result = vec.try_append_inplace(|_| Err::<String, _>(ReserveError::from(CapacityOverflow)));
    assert_eq!(result, Err(CapacityOverflow.into()));
    assert_eq!(*vec, before[..]);
    assert_eq!(vec.capacity(), cap);
    assert_eq!(memory.outstanding(), 1);

    vec.append_inplace(|values| values[0].clone());
    assert_eq!(vec.count(), before.len() + 1);
}

#[test]
fn test_allocation_failure() {
    let memory = TestMemory::with_budget(0);
    let mut vec = Tracked::<u64, 2>::new_in(memory.clone());
    vec.append(1);
    vec.append(2);

    assert!(
        vec.try_append(3).is_err_and(|e| e.is_alloc_failure()),
        "Exhaustion should be reported rather than panicking."
    );
    assert_eq!(
        vec.try_reserve(10),
        Err(AllocFailure {
            layout: std::alloc::Layout::array::<u64>(10).expect("small layout")
        }
        .into())
    );
    assert!(matches!(
        vec.try_insert_at(0, 0),
        Err(InsertError::Reserve(ReserveError::AllocFailure(_)))
    ));
    assert_eq!(*vec, [1, 2], "Failed growth mustn't change the contents.");
    assert!(vec.is_inline());

    memory.set_budget(usize::MAX);
    vec.append(3);
    assert_eq!(*vec, [1, 2, 3]);
}

#[test]
fn test_reserve() {
    let mut vec = Vector::<u64>::from([1, 2, 3]);

    assert_eq!(
        vec.try_reserve(usize::MAX / 2),
        Err(CapacityOverflow.into()),
        "A block larger than isize::MAX bytes should be rejected."
    );
    assert_eq!(vec.try_reserve_append(usize::MAX), Err(CapacityOverflow.into()));
    assert_eq!(*vec, [1, 2, 3]);

    assert_panics!({
        vec.reserve(usize::MAX);
    });
    assert_eq!(*vec, [1, 2, 3]);

    vec.reserve(100);
    assert!(vec.capacity() >= 100);
    let cap = vec.capacity();
    vec.reserve(10);
    assert_eq!(vec.capacity(), cap, "Reserving less than the capacity should do nothing.");
    vec.reserve_append(cap - 3);
    assert_eq!(vec.capacity(), cap);

    let vec = Vector::<u8, 16>::with_capacity(10);
    assert!(vec.is_inline(), "Small reservations should be served inline.");
}

#[test]
fn test_insert_at() {
    let mut vec = Vector::<String, 2>::new();
    vec.insert_at(0, "b".to_owned());
    vec.insert_at(0, "a".to_owned());
    vec.insert_at(2, "d".to_owned());
    vec.insert_at(2, "c".to_owned());
    assert_eq!(*vec, strings(&["a", "b", "c", "d"])[..]);

    assert_eq!(
        vec.try_insert_at(5, "x".to_owned()),
        Err(IndexOutOfBounds { index: 5, len: 4 }.into()),
        "Inserting past the end should be rejected."
    );
    assert_eq!(*vec, strings(&["a", "b", "c", "d"])[..]);

    assert_panics!({
        vec.insert_at(10, "x".to_owned());
    });
    assert_eq!(vec.count(), 4);
}

#[test]
fn test_drop_at() {
    let counter = CountedDrop::new();
    let mut vec = Vector::<(usize, CountedDrop), 3>::new();
    for i in 0..8 {
        vec.append((i, counter.clone()));
    }
    let order = |vec: &Vector<(usize, CountedDrop), 3>| vec.iter().map(|v| v.0).collect::<Vec<_>>();

    vec.drop_at(2, 3);
    assert_eq!(order(&vec), [0, 1, 5, 6, 7]);
    assert_eq!(counter.drops(), 3);

    vec.drop_at(3, 100);
    assert_eq!(order(&vec), [0, 1, 5], "Dropping past the end should stop at the end.");
    assert_eq!(counter.drops(), 5);

    vec.drop_at(3, 1);
    vec.drop_at(0, 0);
    assert_eq!(order(&vec), [0, 1, 5], "Out of bounds or empty drops should do nothing.");

    vec.drop_back();
    assert_eq!(order(&vec), [0, 1]);
    vec.drop_back_n(5);
    assert!(vec.is_empty());
    assert_eq!(counter.drops(), 8);

    assert_panics!({
        vec.drop_back();
    });
}

#[test]
fn test_drop_at_inline() {
    let mut vec = Vector::<String, 8>::new();
    for i in 0..6 {
        vec.append(i.to_string());
    }
    assert!(vec.is_inline());

    vec.drop_at(1, 2);
    assert_eq!(*vec, strings(&["0", "3", "4", "5"])[..]);
    vec.drop_at(0, 1);
    vec.drop_at(2, 5);
    assert_eq!(*vec, strings(&["3", "4"])[..], "Inline storage should close gaps in place.");
    assert!(vec.is_inline());
}

#[test]
fn test_truncate_and_clear() {
    let counter = CountedDrop::new();
    let mut vec: Vector<CountedDrop> = std::iter::repeat_with(|| counter.clone()).take(10).collect();
    let cap = vec.capacity();

    vec.truncate(20);
    assert_eq!(vec.count(), 10);
    vec.truncate(4);
    assert_eq!(vec.count(), 4);
    assert_eq!(counter.drops(), 6);
    assert_eq!(vec.capacity(), cap, "Truncating shouldn't change the capacity.");

    vec.clear();
    assert_eq!(counter.drops(), 10);
    assert_eq!(vec.capacity(), cap);
}

#[test]
fn test_round_trip() {
    let values: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    let mut vec = Vector::<String, 4>::new();

    vec.extend(values.iter().cloned());
    let first = vec.to_vec();
    vec.truncate(0);
    vec.extend(values.iter().cloned());

    assert_eq!(*vec, first[..], "Refilling should produce the same contents.");
}

#[test]
fn test_swap() {
    let mut a = Vector::<String>::from(["a".to_owned(), "b".to_owned()]);
    let mut b = Vector::<String>::new();
    let (a_cap, a_ptr) = (a.capacity(), a.as_ptr());

    a.swap(&mut b);
    assert!(a.is_empty());
    assert_eq!(*b, strings(&["a", "b"])[..]);
    assert_eq!(b.capacity(), a_cap);
    assert_eq!(b.as_ptr(), a_ptr, "Swapping shouldn't move the values.");
}

#[test]
fn test_shrink_to_fit() {
    let memory = TestMemory::new();
    let mut vec = Tracked::<u32, 4>::new_in(memory.clone());
    vec.extend(0..100);
    vec.truncate(3);

    vec.shrink_to_fit();
    assert!(vec.is_inline(), "Contents that fit inline should move back inline.");
    assert_eq!(vec.capacity(), 4);
    assert_eq!(*vec, [0, 1, 2]);
    assert_eq!(memory.outstanding(), 0);

    let mut vec = Tracked::<u32>::new_in(memory.clone());
    vec.extend(0..100);
    vec.truncate(10);
    vec.shrink_to_fit();
    assert!(vec.capacity() >= 10 && vec.capacity() < 100);
    assert_eq!(*vec, (0..10).collect::<Vec<u32>>()[..]);

    vec.clear();
    vec.shrink_to_fit();
    assert_eq!(vec.capacity(), 0);
    assert_eq!(memory.outstanding(), 0, "An empty Vector shouldn't keep a block.");
}

#[test]
fn test_zst_support() {
    let mut vec = Vector::<ZeroSizedType>::new();
    assert_eq!(vec.capacity(), usize::MAX, "Zero sized types never need to grow.");

    for _ in 0..10 {
        vec.append(ZeroSizedType);
    }
    vec.insert_at(3, ZeroSizedType);
    vec.drop_at(0, 2);
    assert_eq!(vec.count(), 9);
    assert_eq!(vec[8], ZeroSizedType);
    assert_eq!(vec.into_iter().count(), 9);
}

#[test]
fn test_drop() {
    let counter = CountedDrop::new();
    let memory = TestMemory::new();
    let mut vec = Tracked::<CountedDrop, 2>::new_in(memory.clone());
    vec.extend(std::iter::repeat_with(|| counter.clone()).take(10));

    drop(vec);
    assert_eq!(counter.drops(), 10, "10 elements should have been dropped.");
    assert_eq!(memory.outstanding(), 0);
}

#[test]
fn test_iterators() {
    let mut vec = Vector::<usize, 2>::from([0, 1, 2, 3, 4]);
    for i in &mut vec {
        *i *= 2;
    }
    assert_eq!((&vec).into_iter().sum::<usize>(), 20);

    let mut iter = vec.clone().into_iter();
    assert_eq!(iter.len(), 5);
    assert_eq!(iter.next(), Some(0));
    assert_eq!(iter.next_back(), Some(8));
    assert_eq!(iter.as_slice(), &[2, 4, 6]);
    assert_eq!(iter.collect::<Vec<_>>(), [2, 4, 6]);

    let counter = CountedDrop::new();
    let memory = TestMemory::new();
    let mut vec = Tracked::<CountedDrop>::new_in(memory.clone());
    vec.extend(std::iter::repeat_with(|| counter.clone()).take(10));

    let mut iter = vec.into_iter();
    drop(iter.next());
    drop(iter.next_back());
    assert_eq!(counter.drops(), 2);
    drop(iter);
    assert_eq!(counter.drops(), 10, "Dropping an owned iterator should drop the rest.");
    assert_eq!(memory.outstanding(), 0);
}

#[test]
fn test_clone_rollback() {
    let budget = Rc::new(Cell::new(usize::MAX));
    let live = Rc::new(Cell::new(0));
    let mut vec = Vector::<PanicOnClone, 2>::new();
    for i in 0..4 {
        vec.append(PanicOnClone::new(i, &budget, &live));
    }

    let copy = vec.clone();
    assert_eq!(copy.iter().map(|v| v.value).collect::<Vec<_>>(), [0, 1, 2, 3]);
    assert_eq!(live.get(), 8);
    drop(copy);

    budget.set(2);
    assert_panics!({
        vec.append_from_within(..);
    });
    assert_eq!(vec.count(), 4, "A failed clone should leave the Vector as it was.");
    assert_eq!(live.get(), 4, "Partially cloned values should have been dropped.");

    budget.set(usize::MAX);
    vec.append_from_within(1..=2);
    assert_eq!(vec.iter().map(|v| v.value).collect::<Vec<_>>(), [0, 1, 2, 3, 1, 2]);
}

#[test]
fn test_append_self() {
    let mut vec = Vector::<String>::new();
    let x = "x".to_owned();

    for _ in 0..4 {
        vec.append(x.clone());
    }
    let other = vec.clone();
    let mut vec = Vector::<String>::new();
    vec.extend_from_slice(&other);
    vec.append(x.clone());
    vec.extend_from_slice(&other);
    assert_eq!(vec.count(), 9);

    vec.append_from_within(..);
    vec.append_from_within(..);
    vec.append_from_within(..);
    assert_eq!(vec.count(), 72);
    assert!(vec.iter().all(|v| *v == x));

    assert_panics!({
        vec.append_from_within(70..80);
    });
    assert_eq!(vec.count(), 72);
}

static EMPTY: Vector<u8, 4> = Vector::new_in(Global);

const fn visible_len<const N: usize>(vec: &Vector<u8, N>) -> usize {
    vec.as_slice().len()
}

#[test]
fn test_const_accessors() {
    assert_eq!(visible_len(&EMPTY), 0);
    assert!(EMPTY.is_inline());
    assert_eq!(EMPTY.capacity(), 4);

    let vec = Vector::<u8, 4>::from([1, 2, 3]);
    assert_eq!(visible_len(&vec), 3);
    assert_eq!(vec.clone().into_iter().as_slice(), &[1, 2, 3]);
}

fn run_sequence<const N: usize, R: Relocation>() -> Vec<String> {
    let memory = TestMemory::new();
    let mut vec = Tracked::<String, N, R>::new_in(memory.clone());

    for i in 0..20 {
        vec.append(format!("v{i}"));
    }
    vec.insert_at(0, "front".to_owned());
    vec.insert_at(10, "middle".to_owned());
    vec.drop_at(3, 4);
    vec.append_inplace(|values| values[1].clone());
    vec.reserve(200);
    vec.insert_at(vec.count(), "back".to_owned());
    vec.drop_at(0, 1);
    vec.truncate(12);
    vec.shrink_to_fit();
    vec.append_from_within(2..5);
    vec.drop_back();

    let result = vec.to_vec();
    drop(vec);
    assert_eq!(memory.outstanding(), 0);
    result
}

#[test]
fn test_bitwise_and_elementwise_agree() {
    let expected = run_sequence::<0, Bitwise>();
    assert_eq!(run_sequence::<0, Elementwise>(), expected);
    assert_eq!(run_sequence::<4, Bitwise>(), expected);
    assert_eq!(run_sequence::<4, Elementwise>(), expected);
    assert_eq!(run_sequence::<64, Elementwise>(), expected);
}

#[test]
fn test_equality_and_debug() {
    let a = Vector::<u8, 4>::from([1, 2, 3]);
    let b: Vector<u8, 4> = (1..=3).collect();
    assert_eq!(a, b);
    assert_ne!(a, Vector::from(&[1_u8, 2][..]));
    assert_eq!(
        format!("{a:?}"),
        "Vector { contents: [1, 2, 3], count: 3, capacity: 4, inline: true }"
    );
}

#[cfg(not(miri))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Append(u16),
        AppendInplace,
        Insert(usize, u16),
        DropAt(usize, usize),
        DropBackN(usize),
        Truncate(usize),
        Reserve(usize),
        AppendFromWithin(usize, usize),
        Shrink,
        Clear,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => any::<u16>().prop_map(Op::Append),
            2 => Just(Op::AppendInplace),
            3 => (0_usize..40, any::<u16>()).prop_map(|(pos, v)| Op::Insert(pos, v)),
            2 => (0_usize..40, 0_usize..8).prop_map(|(pos, n)| Op::DropAt(pos, n)),
            1 => (0_usize..6).prop_map(Op::DropBackN),
            1 => (0_usize..40).prop_map(Op::Truncate),
            1 => (0_usize..100).prop_map(Op::Reserve),
            1 => (0_usize..30, 0_usize..30).prop_map(|(a, b)| Op::AppendFromWithin(a, b)),
            1 => Just(Op::Shrink),
            1 => Just(Op::Clear),
        ]
    }

    fn next_value(values: &[String]) -> String {
        values.last().cloned().unwrap_or_default() + "+"
    }

    fn check_against_model<const N: usize, R: Relocation>(
        ops: &[Op],
    ) -> Result<(), TestCaseError> {
        let memory = TestMemory::new();
        let mut vec = Tracked::<String, N, R>::new_in(memory.clone());
        let mut model = Vec::<String>::new();
        let mut last_cap = vec.capacity();

        for op in ops {
            match *op {
                Op::Append(v) => {
                    vec.append(v.to_string());
                    model.push(v.to_string());
                }
                Op::AppendInplace => {
                    vec.append_inplace(next_value);
                    model.push(next_value(&model));
                }
                Op::Insert(pos, v) => {
                    let result = vec.try_insert_at(pos, v.to_string());
                    if pos <= model.len() {
                        prop_assert!(result.is_ok());
                        model.insert(pos, v.to_string());
                    } else {
                        prop_assert!(result.is_err_and(|e| e.is_index_out_of_bounds()));
                    }
                }
                Op::DropAt(pos, n) => {
                    vec.drop_at(pos, n);
                    if pos < model.len() {
                        let end = pos + n.min(model.len() - pos);
                        model.drain(pos..end);
                    }
                }
                Op::DropBackN(n) => {
                    vec.drop_back_n(n);
                    model.truncate(model.len() - n.min(model.len()));
                }
                Op::Truncate(n) => {
                    vec.truncate(n);
                    model.truncate(n);
                }
                Op::Reserve(n) => {
                    vec.reserve(n);
                    prop_assert!(vec.capacity() >= n);
                }
                Op::AppendFromWithin(a, b) => {
                    if a <= b && b <= model.len() {
                        vec.append_from_within(a..b);
                        model.extend_from_within(a..b);
                    }
                }
                Op::Shrink => {
                    vec.shrink_to_fit();
                    last_cap = vec.capacity();
                }
                Op::Clear => {
                    vec.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(vec.as_slice(), &model[..]);
            prop_assert!(vec.count() <= vec.capacity());
            prop_assert!(vec.capacity() >= last_cap, "capacity shrank outside of shrink_to_fit");
            prop_assert_eq!(vec.is_inline(), N > 0 && vec.capacity() == N);
            last_cap = vec.capacity();
        }

        drop(vec);
        prop_assert_eq!(memory.outstanding(), 0);
        Ok(())
    }

    proptest! {
        #[test]
        fn bitwise_matches_model(ops in proptest::collection::vec(arb_op(), 0..60)) {
            check_against_model::<0, Bitwise>(&ops)?;
        }

        #[test]
        fn elementwise_matches_model(ops in proptest::collection::vec(arb_op(), 0..60)) {
            check_against_model::<0, Elementwise>(&ops)?;
        }

        #[test]
        fn inline_matches_model(ops in proptest::collection::vec(arb_op(), 0..60)) {
            check_against_model::<3, Bitwise>(&ops)?;
            check_against_model::<3, Elementwise>(&ops)?;
        }

        #[test]
        fn refill_after_truncate_is_identical(
            values in proptest::collection::vec(any::<u32>(), 0..50),
        ) {
            let mut vec = Vector::<u32, 4>::new();
            vec.extend(values.iter().copied());
            let first = vec.to_vec();
            vec.truncate(0);
            vec.extend(values.iter().copied());
            prop_assert_eq!(vec.as_slice(), &first[..]);
            prop_assert_eq!(first, values);
        }
    }
}
