//! Rule engine seam and shipped backends.
//!
//! External engines implement `RuleEngine`; the crate ships `BuiltinEngine`
//! (evaluates a `RuleConfig` over a node and its subtree) and `NoopEngine`
//! (reports nothing), the latter as a safe default for wiring tests.

use crate::dom::Element;
use crate::error::Result;
use crate::report::Violation;
use crate::rules::RuleConfig;
use futures::future::{self, BoxFuture, FutureExt};

/// Evaluates accessibility rules against one DOM node
///
/// `run_check` is asynchronous at the seam: real engines schedule work,
/// and invocations are serialized by the caller's token.
pub trait RuleEngine: Send + Sync {
    /// Check `node` (and its subtree) against the configured rules
    fn run_check<'a>(
        &'a self,
        node: &'a Element,
        config: &'a RuleConfig,
    ) -> BoxFuture<'a, Result<Vec<Violation>>>;
}

/// Engine that evaluates the config's rules over the node and every
/// element descendant
pub struct BuiltinEngine;

impl BuiltinEngine {
    pub fn new() -> Self {
        BuiltinEngine
    }
}

impl Default for BuiltinEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine for BuiltinEngine {
    fn run_check<'a>(
        &'a self,
        node: &'a Element,
        config: &'a RuleConfig,
    ) -> BoxFuture<'a, Result<Vec<Violation>>> {
        let mut violations = Vec::new();
        let mut targets = vec![node];
        targets.extend(node.descendants());
        for el in targets {
            for rule in config.rules() {
                if rule.violates(el) {
                    violations.push(Violation {
                        rule: rule.id().to_string(),
                        description: rule.description().to_string(),
                        impact: rule.impact(),
                        selector: el.selector(),
                    });
                }
            }
        }
        future::ready(Ok(violations)).boxed()
    }
}

/// Engine that never reports violations
pub struct NoopEngine;

impl NoopEngine {
    pub fn new() -> Self {
        NoopEngine
    }
}

impl Default for NoopEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine for NoopEngine {
    fn run_check<'a>(
        &'a self,
        _node: &'a Element,
        _config: &'a RuleConfig,
    ) -> BoxFuture<'a, Result<Vec<Violation>>> {
        future::ready(Ok(Vec::new())).boxed()
    }
}
