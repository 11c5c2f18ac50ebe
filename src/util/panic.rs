/// Asserts that the provided block panics. The block is run behind
/// [`AssertUnwindSafe`](std::panic::AssertUnwindSafe), so it may capture collections by mutable
/// reference and the caller can inspect them afterwards.
#[allow(unused_macros)]
macro_rules! assert_panics {
    ($run:block) => {
        assert_panics!($run, "assertion failed to panic")
    };
    ($run:block, $msg:literal) => {
        assert!(
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $run)).is_err(),
            $msg
        );
    };
}

#[allow(unused_imports)]
pub(crate) use assert_panics;
