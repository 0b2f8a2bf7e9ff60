//! Test-harness seam: lifecycle hooks and the current test's context.
//!
//! The harness collaborator owns scheduling; this crate only registers
//! callbacks into it. `LocalHarness` is the in-process implementation used
//! by this crate's own tests and by embedders driving tests directly from
//! `#[tokio::test]` functions.

use crate::error::Result;
use futures::future::BoxFuture;
use std::future::Future;

/// What the harness knows about the currently running test
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    /// Identifying path of the test file, if any
    pub path: Option<String>,
    /// Whether the test runs under simulated/virtual time
    pub fake_timers: bool,
}

impl TestContext {
    pub fn with_path(path: &str) -> Self {
        TestContext {
            path: Some(path.to_string()),
            fake_timers: false,
        }
    }
}

/// A lifecycle hook: an async closure invoked around each test
pub type Hook = Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Registration surface exposed by a test framework
pub trait TestHarness {
    /// Run the hook before each test starts
    fn on_before_each(&mut self, hook: Hook);

    /// Run the hook after each test ends (runs even when the test failed)
    fn on_after_each(&mut self, hook: Hook);

    /// Context of the currently running test
    fn context(&self) -> TestContext;
}

/// In-process harness driving hooks around an async test body
pub struct LocalHarness {
    before: Vec<Hook>,
    after: Vec<Hook>,
    ctx: TestContext,
}

impl LocalHarness {
    pub fn new() -> Self {
        Self::with_context(TestContext::default())
    }

    pub fn with_context(ctx: TestContext) -> Self {
        LocalHarness {
            before: Vec::new(),
            after: Vec::new(),
            ctx,
        }
    }

    /// Run one test: before-hooks, the body, then ALWAYS the after-hooks.
    /// The first error (body or hook) is returned.
    pub async fn run_test<F, Fut>(&self, body: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        for hook in &self.before {
            hook().await?;
        }
        let mut first_err = body().await.err();
        for hook in &self.after {
            if let Err(err) = hook().await {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

impl Default for LocalHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness for LocalHarness {
    fn on_before_each(&mut self, hook: Hook) {
        self.before.push(hook);
    }

    fn on_after_each(&mut self, hook: Hook) {
        self.after.push(hook);
    }

    fn context(&self) -> TestContext {
        self.ctx.clone()
    }
}
