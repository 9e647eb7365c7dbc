//! Shared callback holder and bounded parallel mapping.

use std::sync::Arc;

use rayon::prelude::*;

/// Optional shared callback. `Clone` only bumps the refcount, so the same
/// callback can be handed to worker closures freely.
pub enum SharedFn<F: ?Sized + Send + Sync + 'static> {
    None,
    Some(Arc<F>),
}

impl<F: ?Sized + Send + Sync + 'static> SharedFn<F> {
    pub fn new(f: Arc<F>) -> Self {
        SharedFn::Some(f)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SharedFn::None)
    }

    pub fn as_ref(&self) -> Option<&Arc<F>> {
        match self {
            SharedFn::None => None,
            SharedFn::Some(f) => Some(f),
        }
    }
}

impl<F: ?Sized + Send + Sync + 'static> Clone for SharedFn<F> {
    fn clone(&self) -> Self {
        match self {
            SharedFn::None => SharedFn::None,
            SharedFn::Some(f) => SharedFn::Some(Arc::clone(f)),
        }
    }
}

impl<F: ?Sized + Send + Sync + 'static> Default for SharedFn<F> {
    fn default() -> Self {
        SharedFn::None
    }
}

impl<F: ?Sized + Send + Sync + 'static> std::fmt::Debug for SharedFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SharedFn::None => write!(f, "SharedFn::None"),
            SharedFn::Some(_) => write!(f, "SharedFn::Some(...)"),
        }
    }
}

/// Maps `f` over `items` in parallel with at most `max_concurrent` items in
/// flight, preserving input order. Items are processed in chunks so that
/// each task's image loads stay bounded.
///
/// # Panics
///
/// Panics if `max_concurrent` is 0.
pub fn par_map_limited<T, R, F>(items: &[T], max_concurrent: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(max_concurrent) {
        results.extend(chunk.par_iter().map(&f).collect::<Vec<R>>());
    }
    results
}

/// Fallible variant of [`par_map_limited`]. The first chunk containing an
/// error ends the run; later chunks are never started.
pub fn try_par_map_limited<T, R, E, F>(
    items: &[T],
    max_concurrent: usize,
    f: F,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(max_concurrent) {
        let chunk_results: Result<Vec<R>, E> = chunk.par_iter().map(&f).collect();
        results.extend(chunk_results?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_par_map_limited_preserves_order() {
        let items: Vec<u32> = (0..50).collect();
        let doubled = par_map_limited(&items, 4, |&x| x * 2);
        assert_eq!(doubled, items.iter().map(|x| x * 2).collect::<Vec<u32>>());
    }

    #[test]
    fn test_par_map_limited_caps_in_flight() {
        let items: Vec<u32> = (0..24).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        par_map_limited(&items, 3, |&x| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(2));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            x
        });

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_par_map_limited_empty() {
        let items: Vec<u32> = Vec::new();
        assert!(par_map_limited(&items, 2, |&x| x).is_empty());
    }

    #[test]
    #[should_panic(expected = "max_concurrent must be > 0")]
    fn test_par_map_limited_zero_panics() {
        par_map_limited(&[1], 0, |&x: &u32| x);
    }

    #[test]
    fn test_try_par_map_limited_stops_after_failing_chunk() {
        let items: Vec<u32> = (0..20).collect();
        let attempts = AtomicUsize::new(0);

        let result: Result<Vec<u32>, String> = try_par_map_limited(&items, 4, |&x| {
            attempts.fetch_add(1, Ordering::SeqCst);
            if x == 5 {
                Err(format!("item {x} failed"))
            } else {
                Ok(x)
            }
        });

        assert!(result.is_err());
        // The failing chunk is the second one, so at most two chunks ran.
        assert!(attempts.load(Ordering::SeqCst) <= 8);
    }

    #[test]
    fn test_try_par_map_limited_ok() {
        let items: Vec<u32> = (0..7).collect();
        let result: Result<Vec<u32>, String> = try_par_map_limited(&items, 3, |&x| Ok(x + 1));
        assert_eq!(result.unwrap(), (1..8).collect::<Vec<u32>>());
    }

    #[test]
    fn test_shared_fn_clone_and_invoke() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let cb: SharedFn<dyn Fn() + Send + Sync> = SharedFn::new(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let cb2 = cb.clone();

        if let Some(f) = cb.as_ref() {
            f();
        }
        if let Some(f) = cb2.as_ref() {
            f();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let none: SharedFn<dyn Fn() + Send + Sync> = SharedFn::default();
        assert!(none.is_none());
    }
}
