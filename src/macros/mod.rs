/// Zips any number of slices into nested `(a, (b, c))` iterator pairs.
#[macro_export]
macro_rules! zip_iters {
    ($only:expr $(,)?) => {
        $only.iter()
    };
    ($head:expr, $($tail:expr),+ $(,)?) => {
        $head.iter().zip($crate::zip_iters!($($tail),+))
    };
}
