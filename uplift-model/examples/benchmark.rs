//! Performance benchmark for uplift-model batch scoring.
//!
//! Builds a synthetic 300-tree ensemble over the six promotion features and
//! times sequential against rayon-parallel prediction of 156K rows.
//!
//! Run with:
//!   cargo run --example benchmark --release -p uplift-model

use std::time::Instant;

use uplift_model::{DemandModel, Link, Node, Tree, TreeEnsemble};

const NUM_ROWS: usize = 156_000;
const NUM_TREES: usize = 300;
const DEPTH: usize = 5;

const FEATURES: [&str; 6] = [
    "category_group",
    "analogs_group",
    "brand_group",
    "big_percentage",
    "big_demand",
    "demand_daily_before",
];

fn main() {
    println!("=== Uplift-Model Scoring Benchmark ===");
    println!();

    // -----------------------------------------------------------------------
    // 1. Build model and rows
    // -----------------------------------------------------------------------
    let model = TreeEnsemble {
        feature_names: FEATURES.iter().map(|s| s.to_string()).collect(),
        base_score: 12.0,
        link: Link::Identity,
        trees: (0..NUM_TREES).map(complete_tree).collect(),
    };
    if let Err(e) = model.validate() {
        eprintln!("synthetic model is invalid: {}", e);
        std::process::exit(1);
    }
    let rows = synthetic_rows(NUM_ROWS);
    println!(
        "  {} trees of depth {} ({} nodes each), {} rows",
        NUM_TREES,
        DEPTH,
        (1 << (DEPTH + 1)) - 1,
        NUM_ROWS
    );
    println!();

    // -----------------------------------------------------------------------
    // 2. Sequential baseline
    // -----------------------------------------------------------------------
    let seq_start = Instant::now();
    let sequential: Vec<f64> = rows
        .iter()
        .map(|r| model.predict_one(r).unwrap_or(f64::NAN))
        .collect();
    let seq_elapsed = seq_start.elapsed();
    println!(
        "  Sequential: {:.3}s ({:.0} rows/s)",
        seq_elapsed.as_secs_f64(),
        NUM_ROWS as f64 / seq_elapsed.as_secs_f64()
    );

    // -----------------------------------------------------------------------
    // 3. Parallel batch (THE HOT PATH)
    // -----------------------------------------------------------------------
    let par_start = Instant::now();
    let parallel = match model.predict(&rows) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("batch prediction failed: {}", e);
            std::process::exit(1);
        }
    };
    let par_elapsed = par_start.elapsed();
    println!(
        "  Parallel:   {:.3}s ({:.0} rows/s, {:.1}x)",
        par_elapsed.as_secs_f64(),
        NUM_ROWS as f64 / par_elapsed.as_secs_f64(),
        seq_elapsed.as_secs_f64() / par_elapsed.as_secs_f64()
    );

    let mismatches = sequential
        .iter()
        .zip(&parallel)
        .filter(|(a, b)| a.to_bits() != b.to_bits())
        .count();
    println!();
    println!("  Mismatched predictions: {}", mismatches);
    let mean = parallel.iter().filter(|p| p.is_finite()).sum::<f64>() / NUM_ROWS as f64;
    println!("  Mean predicted daily demand: {:.3}", mean);
}

/// Complete binary tree in breadth-first layout: children of `i` are
/// `2i + 1` and `2i + 2`, which always point forward.
fn complete_tree(seed: usize) -> Tree {
    let internal = (1 << DEPTH) - 1;
    let total = (1 << (DEPTH + 1)) - 1;
    let nodes = (0..total)
        .map(|i| {
            if i < internal {
                let feature = (i + seed) % FEATURES.len();
                Node::Split {
                    feature,
                    threshold: threshold_for(feature, i + seed),
                    left: 2 * i + 1,
                    right: 2 * i + 2,
                    default_left: (i + seed) % 2 == 0,
                }
            } else {
                Node::Leaf(((i * 7 + seed * 13) % 23) as f64 / 100.0 - 0.1)
            }
        })
        .collect();
    Tree { nodes }
}

fn threshold_for(feature: usize, salt: usize) -> f64 {
    match feature {
        0..=2 => 1.5 + (salt % 3) as f64,
        3 | 4 => 0.5,
        _ => 5.0 + (salt % 17) as f64 * 6.0,
    }
}

/// Deterministic rows covering every group value and a spread of demand,
/// with every 50th row missing its demand history.
fn synthetic_rows(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            let demand = if i % 50 == 0 {
                f64::NAN
            } else {
                (i % 997) as f64 / 7.0
            };
            vec![
                (1 + i % 5) as f64,
                (1 + i % 3) as f64,
                (1 + i % 4) as f64,
                (i % 2) as f64,
                f64::from(u8::from(demand > 50.0)),
                demand,
            ]
        })
        .collect()
}
