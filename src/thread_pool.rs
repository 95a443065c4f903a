//! Shared thread pool for permutation and post-hoc parallelism.
//!
//! Post-hoc pairs run in parallel and each pair may run its own parallel
//! permutation loop, so every parallel region goes through one pool with
//! enlarged stacks instead of rayon's global default.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// Get or initialize the shared thread pool.
///
/// The pool uses 8 MB stacks (vs rayon's default 2 MB) and one thread per
/// logical CPU.
#[cfg(feature = "parallel")]
pub fn get_thread_pool() -> &'static ThreadPool {
    THREAD_POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("curve-spm-{i}"))
            .stack_size(8 * 1024 * 1024)
            .build()
            .expect("failed to build curve-spm thread pool")
    })
}

/// Run `op` inside the shared pool.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    get_thread_pool().install(op)
}

/// Run `op` on the calling thread (built without the `parallel` feature).
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}
