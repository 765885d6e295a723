//! Bounded per-page parallelism.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

/// Apply `f` to every item on at most `concurrency` threads.
///
/// Output order always matches input order. A concurrency of 1 runs on the
/// calling thread.
pub(crate) fn map_bounded<T, R, F>(items: &[T], concurrency: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if concurrency <= 1 || items.len() <= 1 {
        return items.iter().map(&f).collect();
    }

    let threads = concurrency.min(items.len());
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| items.par_iter().map(&f).collect()),
        Err(e) => {
            log::warn!("Failed to create thread pool, running sequentially: {}", e);
            items.iter().map(&f).collect()
        }
    }
}

/// Run `f`, turning a panic into an error message.
pub(crate) fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_bounded_preserves_order() {
        let items: Vec<usize> = (0..64).collect();
        let sequential = map_bounded(&items, 1, |i| i * 2);
        let parallel = map_bounded(&items, 8, |i| i * 2);
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[63], 126);
    }

    #[test]
    fn test_map_bounded_empty() {
        let items: Vec<u8> = Vec::new();
        assert!(map_bounded(&items, 4, |b| *b).is_empty());
    }

    #[test]
    fn test_catch_panic_message() {
        assert_eq!(catch_panic(|| 7), Ok(7));

        let err = catch_panic(|| -> u8 { panic!("engine exploded") }).unwrap_err();
        assert_eq!(err, "engine exploded");

        let code = 3;
        let err = catch_panic(|| -> u8 { panic!("code {}", code) }).unwrap_err();
        assert_eq!(err, "code 3");
    }
}
