//! Rule evaluation benchmark suite.
//!
//! Benchmarks the interpreter and detection against in-memory pages of
//! different sizes:
//! - Page sizes: 100, 1000 elements
//! - Workloads: selector queries, full detection sweep over the registry
//!
//! Run with: cargo bench --bench rule_eval
//! Results saved to: target/criterion/

use std::sync::Arc;
use std::time::Duration;

use consent_engine::cmps::build_registry;
use consent_engine::{
    ActionStep, CmpContext, Config, DomActions, ElementSpec, EvalBridge, Interpreter, LogsConfig, MemoryDom,
    Messenger, RuleSet,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAGE_SIZES: &[usize] = &[100, 1000];

const RULES: &str = r##"{"autoconsent": [
    {"name": "bench-a", "detectCmp": [{"exists": "#cmp-a"}], "detectPopup": [{"visible": "#cmp-a"}],
     "optOut": [{"click": "#cmp-a .reject"}], "optIn": [{"click": "#cmp-a .accept"}]},
    {"name": "bench-b", "detectCmp": [{"exists": ".cmp-b-root"}], "detectPopup": [{"visible": ".cmp-b-root"}],
     "optOut": [{"click": ".cmp-b-root button"}], "optIn": [{"click": ".cmp-b-root button"}]}
]}"##;

// ============================================================================
// Benchmark: Step Evaluation
// ============================================================================

fn bench_steps(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut group = c.benchmark_group("rule_steps");
    group.measurement_time(Duration::from_secs(10));

    let steps = [
        ("exists_id", ActionStep::exists("#cmp-a")),
        ("visible_class", ActionStep::visible(".row.odd")),
        ("exists_xpath", ActionStep::exists("xpath///div[@id='cmp-a']//button")),
        (
            "any",
            ActionStep::any(vec![ActionStep::exists("#missing"), ActionStep::exists(".row")]),
        ),
    ];

    for &size in PAGE_SIZES {
        let dom = build_page(size);
        let (messenger, _rx) = Messenger::channel();
        let dom_actions = DomActions::new(Arc::new(dom), LogsConfig::default());
        let bridge = EvalBridge::new(messenger, Duration::from_secs(1));

        for (name, step) in &steps {
            group.bench_with_input(BenchmarkId::new(*name, size), step, |b, step| {
                let interpreter = Interpreter::new(&dom_actions, &bridge);
                b.to_async(&rt).iter(|| interpreter.evaluate_rule_step(step));
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark: Detection Sweep
// ============================================================================

fn bench_detection(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let rules = RuleSet::from_json(RULES).expect("rules");

    let mut group = c.benchmark_group("detection");
    group.sample_size(20);

    for &size in PAGE_SIZES {
        let dom = build_page(size);
        let (messenger, _rx) = Messenger::channel();
        let cx = CmpContext::new(
            DomActions::new(Arc::new(dom.clone()), LogsConfig::default()),
            EvalBridge::new(messenger, Duration::from_millis(1)),
        );
        let config = Config {
            disabled_cmps: builtin_names(),
            ..Config::new()
        };
        let cmps = build_registry(&rules, &config);

        group.bench_with_input(BenchmarkId::new("detect_cmp", size), &cmps, |b, cmps| {
            let cx = &cx;
            b.to_async(&rt).iter(|| async move {
                let mut found = 0;
                for cmp in cmps {
                    if cmp.detect_cmp(&cx).await {
                        found += 1;
                    }
                }
                found
            });
        });
    }

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

/// A page with `rows` filler rows and both benchmark CMPs near the end.
fn build_page(rows: usize) -> MemoryDom {
    let dom = MemoryDom::new().with_location("https://bench.test/");
    let main = dom.append(None, ElementSpec::new("main"));
    for i in 0..rows {
        let spec = ElementSpec::new("div").class("row").text(format!("row {i}"));
        dom.append(Some(main), if i % 2 == 1 { spec.class("odd") } else { spec });
    }
    let cmp_a = dom.append(None, ElementSpec::new("div").id("cmp-a"));
    dom.append(Some(cmp_a), ElementSpec::new("button").class("reject"));
    dom.append(Some(cmp_a), ElementSpec::new("button").class("accept"));
    let cmp_b = dom.append(None, ElementSpec::new("section").class("cmp-b-root"));
    dom.append(Some(cmp_b), ElementSpec::new("button"));
    dom
}

/// Built-in strategies are skipped so the sweep measures the DOM work only.
fn builtin_names() -> Vec<String> {
    consent_engine::cmps::vendors::builtin()
        .iter()
        .map(|cmp| cmp.name().to_string())
        .collect()
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_steps, bench_detection);
criterion_main!(benches);
