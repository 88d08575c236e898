// benches/benchmarks.rs — Performance benchmarks (criterion)
//
// Three hot paths worth watching:
//   1. Startup time — schema migration + store init
//   2. Scoring pipeline — judge reply parsing and scorecard normalization
//   3. Ledger fold — daily budget state over a populated ledger

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use scrimmage::core::types::{Role, SubScores, Turn};
use scrimmage::scoring::normalize::{composite_score, normalize_scorecard};
use scrimmage::scoring::parser::{parse_ranking, parse_scorecard};
use scrimmage::scoring::render_transcript;
use scrimmage::store::Store;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Build an alternating transcript of N turns.
fn build_turns(n: usize) -> Vec<Turn> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Turn::new(
                    Role::Scripted,
                    format!(
                        "Turn #{i}: the system pays for itself in year six, and the referral \
                         credit brings that forward. List price holds either way."
                    ),
                )
            } else {
                Turn::new(
                    Role::CounterAgent,
                    format!(
                        "Turn #{i}: I've heard that pitch before. Walk me through the payback \
                         math again, slower this time, and don't skip the degradation rate."
                    ),
                )
            }
        })
        .collect()
}

/// Populate a store's ledger with N same-day entries.
fn populate_ledger(store: &Store, n: usize) {
    for i in 0..n {
        store
            .insert_ledger_entry(&format!("entry-{i}"), 0.01, "bench-session", "2026-08-25")
            .expect("insert ledger entry");
    }
}

const CLEAN_REPLY: &str = r#"{
    "objection_handling": 8,
    "math_defense": 7.5,
    "closing_drive": 9,
    "humanity": 6,
    "contract_signed": true,
    "price_variance": -2.0,
    "rationale": "Held list price through three objections and closed on value.",
    "winning_excerpt": "The referral credit stays, the price stays."
}"#;

const WRAPPED_REPLY: &str = "Here is my evaluation of the transcript.\n\n```json\n{\n  \"objection_handling\": 6, \"math_defense\": 8, \"closing_drive\": 7,\n  \"humanity\": 7, \"contract_signed\": true, \"price_variance\": 4,\n  \"rationale\": \"Gave a point of discount but defended the payback math well.\"\n}\n```\nLet me know if you need a deeper breakdown.";

const RANKING_REPLY: &str = r#"[
    {"session_id": "a1", "rank": 1, "rationale": "Reframed the objection into the close."},
    {"session_id": "b2", "rank": 2, "rationale": "Held price without losing the room."},
    {"session_id": "c3", "rank": 3, "rationale": "Slow but airtight math defense."}
]"#;

// ─── Benchmark: Startup (schema init) ───────────────────────────────────────

fn bench_startup(c: &mut Criterion) {
    c.bench_function("startup_schema_init", |b| {
        b.iter(|| Store::in_memory().expect("open in-memory db"))
    });
}

// ─── Benchmark: Scoring pipeline ────────────────────────────────────────────

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");

    group.bench_function("parse_clean_reply", |b| {
        b.iter(|| parse_scorecard(black_box(CLEAN_REPLY)))
    });

    group.bench_function("parse_wrapped_reply", |b| {
        b.iter(|| parse_scorecard(black_box(WRAPPED_REPLY)))
    });

    group.bench_function("parse_and_normalize", |b| {
        b.iter(|| {
            let raw = parse_scorecard(black_box(WRAPPED_REPLY)).expect("parse");
            normalize_scorecard(raw)
        })
    });

    group.bench_function("parse_ranking_reply", |b| {
        b.iter(|| parse_ranking(black_box(RANKING_REPLY)))
    });

    group.bench_function("composite_score", |b| {
        let subs = SubScores {
            objection_handling: 8.0,
            math_defense: 7.5,
            closing_drive: 9.0,
            humanity: 6.0,
        };
        b.iter(|| composite_score(black_box(&subs), true, -2.0))
    });

    group.finish();
}

// ─── Benchmark: Transcript rendering ────────────────────────────────────────

fn bench_transcript(c: &mut Criterion) {
    let mut group = c.benchmark_group("transcript");

    // a full session at the default turn cap
    let session_length = build_turns(12);
    group.bench_function("render_12_turns", |b| {
        b.iter(|| render_transcript(black_box(&session_length)))
    });

    // a dozen candidates' worth, the ranking prompt's upper bound
    let ranking_load = build_turns(144);
    group.bench_function("render_144_turns", |b| {
        b.iter(|| render_transcript(black_box(&ranking_load)))
    });

    group.finish();
}

// ─── Benchmark: Ledger fold ─────────────────────────────────────────────────

fn bench_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger");

    group.bench_function("day_total_1000_entries", |b| {
        let store = Store::in_memory().expect("open in-memory db");
        populate_ledger(&store, 1000);
        b.iter(|| {
            let _total = store
                .ledger_day_total(black_box("2026-08-25"))
                .expect("fold");
        })
    });

    group.bench_function("insert_ledger_entry", |b| {
        let store = Store::in_memory().expect("open in-memory db");
        let mut i = 0u64;
        b.iter(|| {
            let id = format!("bench-{i}");
            i += 1;
            store
                .insert_ledger_entry(black_box(&id), 0.01, "bench-session", "2026-08-25")
                .expect("insert");
        })
    });

    group.finish();
}

// ─── Main ───────────────────────────────────────────────────────────────────

criterion_group!(
    benches,
    bench_startup,
    bench_scoring,
    bench_transcript,
    bench_ledger,
);
criterion_main!(benches);
