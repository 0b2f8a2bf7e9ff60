//! a11yguard
//!
//! Automated accessibility assertions for DOM test fixtures. The crate
//! hooks a test harness's lifecycle, observes document mutations during a
//! test, runs a rule engine against added nodes, and fails the test when
//! violations are found.
//!
//! # Features
//!
//! - **Automatic pipeline**: `Auditor::register` arms a mutation watcher
//!   around each test; violating nodes added during the test surface as one
//!   consolidated failure at the test boundary
//! - **Manual sweep**: `Auditor::check` walks the whole body on demand with
//!   guaranteed body restoration, even on error paths
//! - **Pluggable engine**: bring your own `RuleEngine`; a baseline preset
//!   ships under the `builtin-rules` feature (default)
//!
//! # Example
//!
//! ```
//! use a11yguard::{Auditor, CheckOptions, Document, TestContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> a11yguard::Result<()> {
//! let document = Document::from_body_html("<img src=\"logo.png\" alt=\"logo\">");
//! let auditor = Auditor::with_default_engine(document, CheckOptions::default());
//! auditor.check(&TestContext::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod dom;
pub use dom::{Document, DomNode, Element};

pub mod observer;
pub use observer::{MutationBatch, MutationRecord, MutationStream, Subscription};

pub mod token;
pub use token::{SerialToken, DEFAULT_LOCK_TIMEOUT_MS};

pub mod report;
pub use report::{Impact, ReportEntry, Violation, ViolationReport};

// Rule surface: trait, preset assembly, baseline rules (feature-gated)
pub mod rules;
pub use rules::{Rule, RuleConfig};

pub mod engine;
pub use engine::{BuiltinEngine, NoopEngine, RuleEngine};

pub mod harness;
pub use harness::{Hook, LocalHarness, TestContext, TestHarness};

mod watcher;

pub mod audit;
pub use audit::{should_skip, Auditor};

/// Configuration for the check pipeline
///
/// Immutable once handed to an `Auditor`. The defaults arm the automatic
/// pipeline, consolidate duplicate findings, and leave the document in
/// place between tests.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Install lifecycle hooks so every test is checked automatically
    pub run_after_each: bool,
    /// Clear the document body after each test / manual check
    pub cleanup_after_each: bool,
    /// Merge duplicate violations (same rule + selector) before raising
    pub consolidate_results: bool,
    /// Skip checks for tests whose path contains any of these substrings
    /// (case-insensitive)
    pub files_filter: Vec<String>,
    /// Deadline for acquiring the serialization token, in milliseconds
    pub lock_timeout_ms: u64,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            run_after_each: true,
            cleanup_after_each: false,
            consolidate_results: true,
            files_filter: Vec::new(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}
