//! # mdtx-sweep
//!
//! A standalone CLI demo for the mdtx incremental transaction pruner.
//! Seeds an in-memory document store with transaction traffic (completed,
//! pending, stash-only and orphaned), runs a prune pass, and reports the
//! statistics record.

use std::time::{Duration, Instant, SystemTime};

use clap::{Parser, Subcommand};
use colored::*;
use mdtx_core::{new_nonce, DocKey, ObjectId, StashKey, TxnDoc, TxnState};
use mdtx_prune::{IncrementalPruner, PruneArgs, PrunerStats};
use mdtx_store::MemoryStore;

const TXNS: &str = "txns";
const STASH: &str = "txns.stash";

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "mdtx-sweep")]
#[command(about = "Incremental transaction pruner demo (mdtx)")]
#[command(version)]
struct Cli {
    /// Print the statistics record as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mixed workload: completed, pending, stash-only and orphaned txns
    Demo,
    /// Many completed transactions hammering one hot document
    Stress {
        /// Number of transactions to seed.
        #[arg(default_value_t = 5000)]
        count: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo => run_demo(cli.json),
        Commands::Stress { count } => run_stress(count, cli.json),
    }
}

// ─── Workload seeding ──────────────────────────────────────────────────────

/// Record a transaction and leave its token in every touched document's
/// queue, the way the live transaction runtime would.
fn run_txn(store: &MemoryStore, state: TxnState, age: Duration, ops: &[DocKey]) -> TxnDoc {
    let doc = TxnDoc {
        id: ObjectId::generate(SystemTime::now() - age),
        state,
        nonce: new_nonce(),
        ops: ops.to_vec(),
    };
    store.insert_txn(TXNS, doc.clone());
    for key in ops {
        store.push_queue_token(&key.collection, &key.doc_id, &doc.token());
    }
    doc
}

// ─── Subcommands ───────────────────────────────────────────────────────────

fn run_demo(json: bool) {
    let store = MemoryStore::new();
    let hour = Duration::from_secs(3600);

    section("Seeding workload");
    let key0 = DocKey::new("accounts", 0);
    let key1 = DocKey::new("accounts", 1);
    run_txn(&store, TxnState::Applied, 2 * hour, &[key0.clone(), key1.clone()]);
    run_txn(&store, TxnState::Aborted, 2 * hour, &[key0.clone()]);
    step("2 aged completed transactions on accounts/0 and accounts/1");

    run_txn(&store, TxnState::Preparing, 2 * hour, &[key0.clone()]);
    step("1 pending transaction on accounts/0 (must survive)");

    run_txn(&store, TxnState::Applied, Duration::ZERO, &[key1.clone()]);
    step("1 fresh completed transaction (too young to prune)");

    let stashed = TxnDoc {
        id: ObjectId::generate(SystemTime::now() - 2 * hour),
        state: TxnState::Applied,
        nonce: new_nonce(),
        ops: vec![DocKey::new("accounts", 9)],
    };
    store.insert_txn(TXNS, stashed.clone());
    store.push_stash_token(STASH, &StashKey::new("accounts", 9), &stashed.token());
    step("1 completed transaction whose document only exists in the stash");

    let orphan = TxnDoc {
        id: ObjectId::generate(SystemTime::now() - 2 * hour),
        state: TxnState::Applied,
        nonce: new_nonce(),
        ops: vec![DocKey::new("accounts", 404)],
    };
    store.insert_txn(TXNS, orphan);
    step("1 completed transaction referencing a document that exists nowhere");

    let before = store.txn_count(TXNS);

    section("Running prune (max age: 30 minutes)");
    let mut pruner = IncrementalPruner::new();
    let args = PruneArgs::new(TXNS, Duration::from_secs(30 * 60));
    match pruner.prune(&store, &args) {
        Ok(stats) => {
            print_stats(&stats, json);
            section("Result");
            step(&format!(
                "transactions: {} before, {} after ({} removed, {} preserved)",
                before,
                store.txn_count(TXNS),
                stats.txns_removed.to_string().bright_green(),
                (before as u64 - stats.txns_removed).to_string().bright_yellow(),
            ));
            step(&format!(
                "accounts/0 queue after prune: {:?}",
                store.queue("accounts", &0.into()).unwrap_or_default()
            ));
        }
        Err(err) => {
            eprintln!("{} {}", "prune failed:".bright_red(), err);
            print_stats(pruner.stats(), json);
            std::process::exit(1);
        }
    }
}

fn run_stress(count: usize, json: bool) {
    let store = MemoryStore::new();
    let key = DocKey::new("accounts", 0);

    section(&format!("Seeding {} completed transactions on one document", count));
    for _ in 0..count {
        run_txn(&store, TxnState::Applied, Duration::from_secs(3600), &[key.clone()]);
    }

    section("Running prune");
    let mut pruner = IncrementalPruner::new();
    let args = PruneArgs::new(TXNS, Duration::from_secs(60));
    let started = Instant::now();
    match pruner.prune(&store, &args) {
        Ok(stats) => {
            let elapsed = started.elapsed();
            print_stats(&stats, json);
            section("Result");
            step(&format!(
                "{} transactions pruned in {:?} ({:.0} txns/s)",
                stats.txns_removed,
                elapsed,
                stats.txns_removed as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
            ));
        }
        Err(err) => {
            eprintln!("{} {}", "prune failed:".bright_red(), err);
            print_stats(pruner.stats(), json);
            std::process::exit(1);
        }
    }
}

// ─── Pretty printing ───────────────────────────────────────────────────────

fn section(text: &str) {
    println!("\n{} {}", "▸".bright_yellow(), text.bold());
}

fn step(text: &str) {
    println!("  {} {}", "•".bright_green(), text);
}

fn print_stats(stats: &PrunerStats, json: bool) {
    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(body) => println!("{}", body),
            Err(err) => eprintln!("failed to encode stats: {}", err),
        }
        return;
    }

    let rows = [
        ("doc cache hits", stats.doc_cache_hits),
        ("doc cache misses", stats.doc_cache_misses),
        ("collection queries", stats.collection_queries),
        ("doc reads", stats.doc_reads),
        ("docs still missing", stats.doc_still_missing),
        ("stash queries", stats.stash_queries),
        ("stash reads", stats.stash_reads),
        ("doc queues cleaned", stats.doc_queues_cleaned),
        ("doc tokens cleaned", stats.doc_tokens_cleaned),
        ("docs already clean", stats.docs_already_clean),
        ("txns removed", stats.txns_removed),
        ("txns not removed", stats.txns_not_removed),
    ];

    let border = "─".repeat(34);
    println!("  ┌{}┐", border);
    println!("  │ {:^32} │", "prune statistics".bold().to_string());
    println!("  ├{}┤", border);
    for (label, value) in rows {
        println!("  │ {:<22} {:>9} │", label, value);
    }
    println!("  └{}┘", border);
}
