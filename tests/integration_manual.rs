//! End-to-end scenarios for the manual check entry point.

use a11yguard::{
    Auditor, BuiltinEngine, CheckOptions, Document, Element, Error, Impact, Rule, RuleConfig,
    RuleEngine, TestContext, Violation,
};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Engine wrapper counting invocations, delegating to the builtin engine
struct CountingEngine {
    calls: Arc<AtomicUsize>,
    inner: BuiltinEngine,
}

impl CountingEngine {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        CountingEngine {
            calls,
            inner: BuiltinEngine::new(),
        }
    }
}

impl RuleEngine for CountingEngine {
    fn run_check<'a>(
        &'a self,
        node: &'a Element,
        config: &'a RuleConfig,
    ) -> BoxFuture<'a, a11yguard::Result<Vec<Violation>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.run_check(node, config)
    }
}

fn default_auditor(html: &str, options: CheckOptions) -> Auditor {
    Auditor::with_default_engine(Document::from_body_html(html), options)
}

#[tokio::test]
async fn img_without_alt_raises_image_alt() {
    let auditor = default_auditor("<img src=\"logo.png\">", CheckOptions::default());
    let err = auditor.check(&TestContext::default()).await.unwrap_err();
    assert!(err.to_string().contains("image-alt"));
    assert!(err.to_string().contains("img"));
}

#[tokio::test]
async fn clean_body_passes() {
    let auditor = default_auditor(
        "<img src=\"logo.png\" alt=\"logo\"><button>Save</button>",
        CheckOptions::default(),
    );
    auditor.check(&TestContext::default()).await.expect("no violations");
}

#[tokio::test]
async fn files_filter_skips_without_invoking_the_engine() {
    let calls = Arc::new(AtomicUsize::new(0));
    let auditor = Auditor::new(
        Document::from_body_html("<img>"),
        Arc::new(CountingEngine::new(Arc::clone(&calls))),
        a11yguard::rules::default_config(),
        CheckOptions {
            files_filter: vec!["ignore.test".to_string()],
            ..CheckOptions::default()
        },
    );

    let ctx = TestContext::with_path("/src/ignore.test.rs");
    auditor.check(&ctx).await.expect("skipped");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fake_timers_skip_without_invoking_the_engine() {
    let calls = Arc::new(AtomicUsize::new(0));
    let auditor = Auditor::new(
        Document::from_body_html("<img>"),
        Arc::new(CountingEngine::new(Arc::clone(&calls))),
        a11yguard::rules::default_config(),
        CheckOptions::default(),
    );

    let ctx = TestContext {
        path: None,
        fake_timers: true,
    };
    auditor.check(&ctx).await.expect("skipped");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn body_is_restored_after_a_failing_check() {
    let auditor = default_auditor("<img src=\"x.png\">", CheckOptions::default());
    let before = auditor.document().body_html();

    let res = auditor.check(&TestContext::default()).await;
    assert!(res.is_err());
    assert_eq!(auditor.document().body_html(), before);
    assert!(!auditor.has_saved_body());
}

#[tokio::test]
async fn stashed_body_is_checked_once_and_cleared() {
    let auditor = default_auditor("<p>live content</p>", CheckOptions::default());
    let live = auditor.document().body_html();

    // The stashed markup violates; the live content does not
    auditor.stash_body("<img src=\"x.png\">");
    let err = auditor.check(&TestContext::default()).await.unwrap_err();
    assert!(err.to_string().contains("image-alt"));

    // Snapshot consumed, live body back in place
    assert!(!auditor.has_saved_body());
    assert_eq!(auditor.document().body_html(), live);

    // A second check runs against the live content and passes
    auditor.check(&TestContext::default()).await.expect("live body is clean");
}

#[tokio::test]
async fn cleanup_after_each_clears_the_body() {
    let auditor = default_auditor(
        "<p>content</p>",
        CheckOptions {
            cleanup_after_each: true,
            ..CheckOptions::default()
        },
    );
    auditor.check(&TestContext::default()).await.expect("clean");
    assert_eq!(auditor.document().body_html(), "");
}

#[tokio::test]
async fn engine_failure_propagates_after_cleanup() {
    struct BrokenEngine;
    impl RuleEngine for BrokenEngine {
        fn run_check<'a>(
            &'a self,
            _node: &'a Element,
            _config: &'a RuleConfig,
        ) -> BoxFuture<'a, a11yguard::Result<Vec<Violation>>> {
            Box::pin(async { Err(Error::Engine("engine exploded".to_string())) })
        }
    }

    let auditor = Auditor::new(
        Document::from_body_html("<p>content</p>"),
        Arc::new(BrokenEngine),
        RuleConfig::empty(),
        CheckOptions::default(),
    );
    let before = auditor.document().body_html();

    let err = auditor.check(&TestContext::default()).await.unwrap_err();
    assert!(matches!(err, Error::Engine(_)));
    // Cleanup ran before the error propagated
    assert_eq!(auditor.document().body_html(), before);
    assert!(!auditor.has_saved_body());
}

#[tokio::test]
async fn custom_rules_merge_into_the_manual_sweep() {
    struct NoMarquee;
    impl Rule for NoMarquee {
        fn id(&self) -> &'static str {
            "no-marquee"
        }
        fn description(&self) -> &'static str {
            "Marquee elements are not allowed"
        }
        fn impact(&self) -> Impact {
            Impact::Minor
        }
        fn violates(&self, el: &Element) -> bool {
            el.tag() == "marquee"
        }
    }

    let auditor = default_auditor("<marquee>hi</marquee>", CheckOptions::default());
    auditor.check(&TestContext::default()).await.expect("baseline preset passes");

    auditor.register_rule(Arc::new(NoMarquee));
    let err = auditor.check(&TestContext::default()).await.unwrap_err();
    assert!(err.to_string().contains("no-marquee"));
}

#[tokio::test]
async fn nested_duplicates_consolidate_into_one_entry() {
    // The engine checks each visited node's subtree, so a nested violator
    // is found from every ancestor; consolidation merges those findings.
    let auditor = default_auditor("<div><div><img src=\"x.png\"></div></div>", CheckOptions::default());
    let err = auditor.check(&TestContext::default()).await.unwrap_err();
    let report = err.report().expect("violations");
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].violation.rule, "image-alt");
    assert!(report.entries[0].occurrences >= 2);
}

#[tokio::test]
async fn selector_keywords_from_env_drop_matching_violations() {
    std::env::set_var("SELECTOR_FILTER_KEYWORDS", "zz-ad-frame");

    let auditor = default_auditor(
        "<img id=\"zz-ad-frame\" src=\"ad.png\">",
        CheckOptions::default(),
    );
    let res = auditor.check(&TestContext::default()).await;

    std::env::remove_var("SELECTOR_FILTER_KEYWORDS");
    res.expect("filtered selector is not reported");
}
