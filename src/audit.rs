//! The auditor: lifecycle registration and the manual check entry point.

use crate::dom::Document;
use crate::engine::RuleEngine;
use crate::error::{Error, Result};
use crate::harness::{TestContext, TestHarness};
use crate::observer::Subscription;
use crate::report::{self, Violation};
use crate::rules::{Rule, RuleConfig};
use crate::token::SerialToken;
use crate::watcher::{FailureSlot, Watcher};
use crate::CheckOptions;
use futures::FutureExt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Whether a check should be skipped for the given test path
///
/// True iff some filter entry is a case-insensitive substring of the path.
/// An empty filter list or an unknown path never skips.
pub fn should_skip(path: Option<&str>, filters: &[String]) -> bool {
    let Some(path) = path else {
        return false;
    };
    if filters.is_empty() {
        return false;
    }
    let path = path.to_lowercase();
    filters.iter().any(|f| path.contains(&f.to_lowercase()))
}

/// State of one armed registration, created before each test
struct ActiveWatch {
    subscription: Subscription,
    token: SerialToken,
    handle: JoinHandle<()>,
    failure: FailureSlot,
}

/// Owns the document handle, the rule engine, and the check configuration
///
/// One auditor covers both check paths: `register` arms the automatic
/// mutation-driven pipeline around each test, `check` runs an on-demand
/// sweep of the whole body. The saved-body snapshot is scoped to this value
/// and consumed within a single `check` call; it cannot leak across calls.
pub struct Auditor {
    document: Document,
    engine: Arc<dyn RuleEngine>,
    base_config: RuleConfig,
    options: CheckOptions,
    custom_rules: Mutex<Vec<Arc<dyn Rule>>>,
    saved_body: Mutex<Option<String>>,
}

impl Auditor {
    pub fn new(
        document: Document,
        engine: Arc<dyn RuleEngine>,
        config: RuleConfig,
        options: CheckOptions,
    ) -> Self {
        Auditor {
            document,
            engine,
            base_config: config,
            options,
            custom_rules: Mutex::new(Vec::new()),
            saved_body: Mutex::new(None),
        }
    }

    /// Auditor backed by the built-in engine and the baseline preset
    #[cfg(feature = "builtin-rules")]
    pub fn with_default_engine(document: Document, options: CheckOptions) -> Self {
        Self::new(
            document,
            Arc::new(crate::engine::BuiltinEngine::new()),
            crate::rules::default_config(),
            options,
        )
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Add a custom rule; the manual check path merges it into the preset
    pub fn register_rule(&self, rule: Arc<dyn Rule>) {
        self.custom_rules.lock().unwrap().push(rule);
    }

    /// Save body markup to be restored and checked by the next `check` call
    ///
    /// Use when a mutation during the test rewrote the body: the next check
    /// runs against this snapshot instead of the live content, then clears
    /// it. The snapshot never survives past that check.
    pub fn stash_body(&self, html: impl Into<String>) {
        *self.saved_body.lock().unwrap() = Some(html.into());
    }

    /// Install lifecycle hooks arming the mutation-driven pipeline
    ///
    /// Does nothing when `run_after_each` is off. Before each test a fresh
    /// serialization token is created and a watcher task starts consuming
    /// mutation batches; after each test the subscription is disconnected,
    /// the token cancelled (pending checks abort silently), and the first
    /// failure the watcher recorded is surfaced. Calling `register` more
    /// than once installs multiple independent observers; it is not
    /// idempotent.
    pub fn register(&self, harness: &mut dyn TestHarness) {
        if !self.options.run_after_each {
            return;
        }
        let active: Arc<Mutex<Option<ActiveWatch>>> = Arc::new(Mutex::new(None));

        let document = self.document.clone();
        let engine = Arc::clone(&self.engine);
        let config = self.base_config.clone();
        let options = self.options.clone();
        let slot = Arc::clone(&active);
        harness.on_before_each(Box::new(move || {
            let document = document.clone();
            let engine = Arc::clone(&engine);
            let config = config.clone();
            let options = options.clone();
            let slot = Arc::clone(&slot);
            async move {
                let token = SerialToken::new(options.lock_timeout_ms);
                let failure: FailureSlot = Arc::new(Mutex::new(None));
                let (subscription, stream) = document.observe();
                let watcher = Watcher::new(
                    engine,
                    config,
                    token.clone(),
                    options.consolidate_results,
                    Arc::clone(&failure),
                );
                let handle = tokio::spawn(watcher.run(stream));
                *slot.lock().unwrap() = Some(ActiveWatch {
                    subscription,
                    token,
                    handle,
                    failure,
                });
                Ok(())
            }
            .boxed()
        }));

        let document = self.document.clone();
        let options = self.options.clone();
        harness.on_after_each(Box::new(move || {
            let document = document.clone();
            let options = options.clone();
            let slot = Arc::clone(&active);
            async move {
                let watch = slot.lock().unwrap().take();
                let Some(watch) = watch else {
                    return Ok(());
                };
                document.disconnect(&watch.subscription);
                watch.token.cancel();
                watch
                    .handle
                    .await
                    .map_err(|e| Error::Harness(format!("watcher task lost: {}", e)))?;
                if options.cleanup_after_each {
                    document.clear_body();
                }
                let result = match watch.failure.lock().unwrap().take() {
                    Some(err) => Err(err),
                    None => Ok(()),
                };
                result
            }
            .boxed()
        }));
    }

    /// Run an on-demand check over every element in the body
    ///
    /// Skips entirely (no engine invocation) when the test path matches the
    /// configured files filter or the test runs under fake timers. The body
    /// is restored to its pre-check markup regardless of outcome; the
    /// violation raise, if any, happens after cleanup.
    pub async fn check(&self, ctx: &TestContext) -> Result<()> {
        if should_skip(ctx.path.as_deref(), &self.options.files_filter) {
            return Ok(());
        }
        if ctx.fake_timers {
            // The engine's internal timers would never fire under virtual
            // time, hanging the check
            return Ok(());
        }

        let captured = self.document.body_html();
        if let Some(saved) = self.saved_body.lock().unwrap().take() {
            self.document.set_body_html(&saved);
        }

        let config = self.check_config();
        let result = self.collect_violations(&config).await;

        // Cleanup runs whether or not the sweep failed
        *self.saved_body.lock().unwrap() = None;
        self.document.set_body_html(&captured);
        if self.options.cleanup_after_each {
            self.document.clear_body();
        }

        let violations = result?;
        let violations =
            report::apply_selector_filter(violations, &report::selector_filter_from_env());
        report::check_and_raise(violations, self.options.consolidate_results)
    }

    /// Whether a saved body snapshot is currently pending
    pub fn has_saved_body(&self) -> bool {
        self.saved_body.lock().unwrap().is_some()
    }

    fn check_config(&self) -> RuleConfig {
        let custom = self.custom_rules.lock().unwrap();
        if custom.is_empty() {
            self.base_config.clone()
        } else {
            self.base_config.clone().with_rules(custom.clone())
        }
    }

    async fn collect_violations(&self, config: &RuleConfig) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();
        // Every element descendant of body, in document order
        for el in self.document.body_elements() {
            violations.extend(self.engine.run_check(&el, config).await?);
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_matches_case_insensitive_substrings() {
        let filters = vec!["ignore.test".to_string()];
        assert!(should_skip(Some("/src/ignore.test.rs"), &filters));
        assert!(should_skip(Some("/src/IGNORE.TEST.rs"), &filters));
        assert!(!should_skip(Some("/src/other.test.rs"), &filters));
    }

    #[test]
    fn empty_filter_or_missing_path_never_skips() {
        assert!(!should_skip(Some("/src/a.rs"), &[]));
        assert!(!should_skip(None, &["a".to_string()]));
        assert!(!should_skip(None, &[]));
    }
}
