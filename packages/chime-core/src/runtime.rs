//! Task spawning abstraction for runtime independence.
//!
//! This module provides a [`TaskSpawner`] trait that lets the core library
//! spawn background work (toast lifecycles, hub session loops, click
//! handlers) without being tied to a specific async runtime. The desktop
//! shell hands the core its own runtime handle while the headless notifier
//! uses Tokio directly.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// Allows core services to spawn asynchronous work without knowing the
/// underlying runtime. Spawned tasks run to completion independently of the
/// caller; cancellation is handled separately via `CancellationToken`s.
///
/// # Example
///
/// ```ignore
/// struct MyChannel {
///     spawner: TokioSpawner,
/// }
///
/// impl MyChannel {
///     fn start_lifecycle(&self) {
///         self.spawner.spawn(async {
///             // Background work here
///         });
///     }
/// }
/// ```
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    ///
    /// The task runs independently of the caller and continues until
    /// completion. The spawner does not provide a way to join the task;
    /// anything that must be stoppable carries its own cancellation token.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner used by the headless notifier and tests.
///
/// Wraps a Tokio runtime handle so services constructed on one runtime can
/// keep spawning onto it regardless of the calling context.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a `TokioSpawner` around an explicit runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a `TokioSpawner` from the ambient runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
