//! Watcher task: consumes mutation batches and runs serialized checks.
//!
//! One watcher runs per registration and per test. Checks for all nodes
//! added in a batch run concurrently but each engine invocation holds the
//! serialization token, so only one proceeds at a time. Failure policy per
//! node: a cancelled token (test ended) is swallowed silently; any other
//! engine failure is logged and degrades to zero violations; a token
//! timeout fails the whole batch. The first batch failure is kept for the
//! after-test hook to surface.

use crate::dom::Element;
use crate::engine::RuleEngine;
use crate::error::{Error, Result};
use crate::observer::{MutationBatch, MutationStream};
use crate::report::{self, Violation};
use crate::rules::RuleConfig;
use crate::token::SerialToken;
use futures::future::join_all;
use std::sync::{Arc, Mutex};

pub(crate) type FailureSlot = Arc<Mutex<Option<Error>>>;

pub(crate) struct Watcher {
    engine: Arc<dyn RuleEngine>,
    config: RuleConfig,
    token: SerialToken,
    consolidate: bool,
    failure: FailureSlot,
}

impl Watcher {
    pub(crate) fn new(
        engine: Arc<dyn RuleEngine>,
        config: RuleConfig,
        token: SerialToken,
        consolidate: bool,
        failure: FailureSlot,
    ) -> Self {
        Watcher {
            engine,
            config,
            token,
            consolidate,
            failure,
        }
    }

    /// Consume batches until the stream ends, recording the first failure
    pub(crate) async fn run(self, mut stream: MutationStream) {
        while let Some(batch) = stream.next_batch().await {
            if let Err(err) = self.process_batch(&batch).await {
                let mut slot = self.failure.lock().unwrap();
                if slot.is_none() {
                    *slot = Some(err);
                }
            }
        }
    }

    /// Check every node added in the batch and raise once for the batch
    pub(crate) async fn process_batch(&self, batch: &MutationBatch) -> Result<()> {
        let added = batch.added_elements();
        if added.is_empty() {
            return Ok(());
        }
        // Checks are submitted in delivery order but finish in completion
        // order; the token still admits only one engine call at a time.
        let results = join_all(added.into_iter().map(|el| self.check_node(el))).await;
        let mut violations = Vec::new();
        for res in results {
            violations.extend(res?);
        }
        report::check_and_raise(violations, self.consolidate)
    }

    async fn check_node(&self, el: &Element) -> Result<Vec<Violation>> {
        let _guard = match self.token.acquire().await {
            Ok(guard) => guard,
            // Test ended while we waited; drop this check silently
            Err(Error::LockCancelled) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        match self.engine.run_check(el, &self.config).await {
            Ok(violations) => Ok(violations),
            Err(err) => {
                // Best effort: a broken engine must not fail the batch
                log::warn!("rule engine failed on <{}>: {}", el.tag(), err);
                Ok(Vec::new())
            }
        }
    }
}
