//! Waves CLI: create and propagate acknowledgment tokens on a local ledger
//!
//! Commands:
//!   waves create       create a token type and hand out its first units
//!   waves propagate    pass a token on to new recipients
//!   waves relinquish   hand units over (types that opt in only)
//!   waves policy       change a type's propagation/relinquish flags
//!   waves show         metadata and holders of a type
//!   waves provenance   who got it from whom
//!   waves graph        propagation graph as JSON
//!   waves stats        ledger statistics
//!   waves verify       check ledger invariants
//!   waves backup       create/list/restore/verify snapshots
//!   waves demo         run a random propagation cascade

use rand::seq::SliceRandom;
use rand::Rng;
use std::env;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use waves_core::storage::BackupManager;
use waves_core::{
    EventRecord, Identity, Ledger, LedgerConfig, LedgerError, LedgerStore, NewTokenType,
    ReceiptKind, ReceiptNotice, TokenPolicy, TokenTypeId,
};

const STORE_FILE: &str = "waves-ledger.json";
const CONFIG_FILE: &str = "waves-config.json";
const BACKUP_DIR: &str = "waves-backups";
const EVENTS_FILE: &str = "waves-events.jsonl";

fn print_usage() {
    println!(
        r#"
Waves v0.1: propagating acknowledgment tokens

Usage: waves <command> [options]

Commands:
  create     <creator> <ceiling> <symbol> <narrative> [recipients...]
             [--no-propagate] [--relinquish]              Create a token type
  propagate  <type> <distributor> <recipients...>         Mint one unit to each recipient
  relinquish <type> <from> <to> <amount>                  Hand units over
  policy     <type> <caller> <propagate:on|off> <relinquish:on|off>
  show       <type>                                       Metadata and holders
  provenance <type>                                       Provenance edges
  graph      <type>                                       Propagation graph (JSON)
  created-by <identity>                                   Types created by an identity
  held-by    <identity>                                   Types ever held by an identity
  stats                                                   Ledger statistics
  verify                                                  Check ledger invariants
  events                                                  Committed event log
  backup     [create [desc]|list|restore <ver>|verify]    Snapshot management
  demo                                                    Random propagation cascade

Examples:
  waves create alice 100 "*" "fixed my bike" bob carol
  waves propagate 1 bob dave erin
  waves show 1
  waves backup restore 2
"#
    );
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "create" => cmd_create(&args[2..]),
        "propagate" => cmd_propagate(&args[2..]),
        "relinquish" => cmd_relinquish(&args[2..]),
        "policy" => cmd_policy(&args[2..]),
        "show" => cmd_show(&args[2..]),
        "provenance" => cmd_provenance(&args[2..]),
        "graph" => cmd_graph(&args[2..]),
        "created-by" => cmd_created_by(&args[2..]),
        "held-by" => cmd_held_by(&args[2..]),
        "stats" => cmd_stats(),
        "verify" => cmd_verify(),
        "events" => cmd_events(),
        "backup" => cmd_backup(&args[2..]),
        "demo" => cmd_demo(),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
        }
    }
}

fn load_store() -> Option<LedgerStore> {
    let config = LedgerConfig::load_or_default(CONFIG_FILE);
    match LedgerStore::open(STORE_FILE, config) {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("  Cannot open {}: {}", STORE_FILE, e);
            None
        }
    }
}

/// Flush committed events to the event log, then save the ledger
fn save_store(store: &mut LedgerStore) {
    if let Err(e) = append_events(store.ledger.pending_events()) {
        eprintln!("  Failed to write {}: {}", EVENTS_FILE, e);
        return;
    }
    store.ledger.drain_events();
    if let Err(e) = store.save() {
        eprintln!("  Failed to save: {}", e);
    } else {
        println!("  Saved to {}", STORE_FILE);
    }
}

fn append_events(events: &[EventRecord]) -> std::io::Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new().create(true).append(true).open(EVENTS_FILE)?;
    for record in events {
        writeln!(file, "{}", serde_json::to_string(record)?)?;
    }
    Ok(())
}

/// Accepts `3` or `#3`
fn parse_type(arg: &str) -> Option<TokenTypeId> {
    arg.trim_start_matches('#').parse().ok().map(TokenTypeId::new)
}

fn parse_flag(arg: &str) -> Option<bool> {
    match arg {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn identities(args: &[String]) -> Vec<Identity> {
    args.iter().map(|s| Identity::new(s.as_str())).collect()
}

fn type_arg(args: &[String], usage: &str) -> Option<TokenTypeId> {
    match args.first().and_then(|s| parse_type(s)) {
        Some(t) => Some(t),
        None => {
            eprintln!("Usage: {}", usage);
            None
        }
    }
}

fn cmd_create(args: &[String]) {
    if args.len() < 4 {
        eprintln!("Usage: waves create <creator> <ceiling> <symbol> <narrative> [recipients...] [--no-propagate] [--relinquish]");
        return;
    }
    let ceiling: u64 = match args[1].parse() {
        Ok(c) => c,
        Err(_) => {
            eprintln!("  ceiling must be a number");
            return;
        }
    };
    let Some(mut store) = load_store() else { return };

    let mut policy = TokenPolicy {
        allow_propagation: store.ledger.config().default_allow_propagation,
        allow_relinquish: false,
    };
    let mut recipients = Vec::new();
    for arg in &args[4..] {
        match arg.as_str() {
            "--no-propagate" => policy.allow_propagation = false,
            "--relinquish" => policy.allow_relinquish = true,
            name => recipients.push(Identity::new(name)),
        }
    }

    let creator = Identity::new(args[0].as_str());
    let draft = NewTokenType::new(args[3].as_str(), ceiling)
        .with_symbol(args[2].as_str())
        .with_recipients(recipients)
        .with_policy(policy);
    match store.ledger.create(&creator, draft) {
        Ok(t) => {
            if let Some(token) = store.ledger.registry().get(t) {
                println!("\n  Created {}", token.summary());
            }
            save_store(&mut store);
        }
        Err(e) => eprintln!("  Create failed: {}", e),
    }
}

fn cmd_propagate(args: &[String]) {
    let usage = "waves propagate <type> <distributor> <recipients...>";
    if args.len() < 3 {
        eprintln!("Usage: {}", usage);
        return;
    }
    let Some(t) = type_arg(args, usage) else { return };
    let Some(mut store) = load_store() else { return };

    let distributor = Identity::new(args[1].as_str());
    match store.ledger.propagate(t, &distributor, &identities(&args[2..])) {
        Ok(generation) => {
            println!(
                "\n  {} passed {} on to {} recipient(s) at {} | reach {} | {} left",
                distributor,
                t,
                args.len() - 2,
                generation,
                store.ledger.reach(t),
                store.ledger.remaining_supply(t)
            );
            save_store(&mut store);
        }
        Err(e) => eprintln!("  Propagate failed: {}", e),
    }
}

fn cmd_relinquish(args: &[String]) {
    let usage = "waves relinquish <type> <from> <to> <amount>";
    if args.len() < 4 {
        eprintln!("Usage: {}", usage);
        return;
    }
    let Some(t) = type_arg(args, usage) else { return };
    let amount: u64 = match args[3].parse() {
        Ok(a) => a,
        Err(_) => {
            eprintln!("  amount must be a number");
            return;
        }
    };
    let Some(mut store) = load_store() else { return };

    let from = Identity::new(args[1].as_str());
    let to = Identity::new(args[2].as_str());
    match store.ledger.relinquish(t, &from, &to, amount, &from) {
        Ok(()) => {
            println!("\n  {} handed {} x{} to {}", from, t, amount, to);
            save_store(&mut store);
        }
        Err(e) => eprintln!("  Relinquish failed: {}", e),
    }
}

fn cmd_policy(args: &[String]) {
    let usage = "waves policy <type> <caller> <propagate:on|off> <relinquish:on|off>";
    if args.len() < 4 {
        eprintln!("Usage: {}", usage);
        return;
    }
    let Some(t) = type_arg(args, usage) else { return };
    let (Some(allow_propagation), Some(allow_relinquish)) = (parse_flag(&args[2]), parse_flag(&args[3])) else {
        eprintln!("Usage: {}", usage);
        return;
    };
    let Some(mut store) = load_store() else { return };

    let policy = TokenPolicy {
        allow_propagation,
        allow_relinquish,
    };
    match store.ledger.update_policy(t, policy, &Identity::new(args[1].as_str())) {
        Ok(()) => {
            println!(
                "\n  {}: propagate={} relinquish={}",
                t, allow_propagation, allow_relinquish
            );
            save_store(&mut store);
        }
        Err(e) => eprintln!("  Policy update failed: {}", e),
    }
}

fn cmd_show(args: &[String]) {
    let Some(t) = type_arg(args, "waves show <type>") else { return };
    let Some(store) = load_store() else { return };
    let ledger = &store.ledger;

    let Some(token) = ledger.registry().get(t) else {
        eprintln!("  {}", LedgerError::UnknownTokenType(t));
        return;
    };
    println!("\n  {}", token.summary());
    println!("  Created:   {}", token.created_at().format("%Y-%m-%d %H:%M:%S"));
    println!("  Max depth: {}", ledger.max_depth(t));
    println!("\n  Holders:");
    println!("  {}", "-".repeat(50));
    for (holder, balance) in ledger.holders_of(t) {
        let generation = ledger
            .generation_of(t, &holder)
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".into());
        println!("  {:<24} {:>6} units  {}", holder.as_str(), balance, generation);
    }
}

fn cmd_provenance(args: &[String]) {
    let Some(t) = type_arg(args, "waves provenance <type>") else { return };
    let Some(store) = load_store() else { return };

    let edges = store.ledger.provenance_of(t);
    if edges.is_empty() {
        println!("\n  No provenance recorded for {}", t);
        return;
    }
    println!("\n  Provenance of {} ({} edges):", t, edges.len());
    println!("  {}", "-".repeat(70));
    for edge in edges {
        println!(
            "  {} | {} -> {} | {} | {}",
            edge.timestamp.format("%Y-%m-%d %H:%M:%S"),
            edge.from,
            edge.to,
            edge.generation,
            &edge.hash[..12]
        );
    }
}

fn cmd_graph(args: &[String]) {
    let Some(t) = type_arg(args, "waves graph <type>") else { return };
    let Some(store) = load_store() else { return };
    match serde_json::to_string_pretty(&store.ledger.graph_of(t)) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("  Failed to serialize graph: {}", e),
    }
}

fn cmd_created_by(args: &[String]) {
    let Some(who) = args.first() else {
        eprintln!("Usage: waves created-by <identity>");
        return;
    };
    let Some(store) = load_store() else { return };
    let types = store.ledger.types_created_by(&Identity::new(who.as_str()));
    println!("\n  {} created {} type(s)", who, types.len());
    for t in types {
        if let Some(token) = store.ledger.registry().get(*t) {
            println!("  {}", token.summary());
        }
    }
}

fn cmd_held_by(args: &[String]) {
    let Some(who) = args.first() else {
        eprintln!("Usage: waves held-by <identity>");
        return;
    };
    let Some(store) = load_store() else { return };
    let holder = Identity::new(who.as_str());
    let types = store.ledger.types_held_by(&holder);
    println!("\n  {} has held {} type(s)", who, types.len());
    for t in types {
        println!(
            "  {} | {} units now | {}",
            t,
            store.ledger.holding_of(*t, &holder),
            store
                .ledger
                .generation_of(*t, &holder)
                .map(|g| g.to_string())
                .unwrap_or_else(|| "-".into())
        );
    }
}

fn cmd_stats() {
    let Some(store) = load_store() else { return };
    let stats = store.ledger.stats();
    println!("\n  Waves Ledger Statistics");
    println!("  {}", "=".repeat(40));
    println!("  Token types:   {}", stats.token_types);
    println!("  Units:         {}", stats.total_units);
    println!("  Edges:         {}", stats.total_edges);
    println!("  Holders:       {}", stats.distinct_holders);
    println!("  Deepest:       {}", stats.deepest_generation);
}

fn cmd_verify() {
    let Some(store) = load_store() else { return };
    let violations = store.ledger.verify_invariants();
    if violations.is_empty() {
        println!("\n  All invariants hold ({} types)", store.ledger.token_count());
        return;
    }
    println!("\n  {} violation(s):", violations.len());
    for v in &violations {
        println!("  - {}", v);
    }
}

fn cmd_events() {
    let file = match std::fs::File::open(EVENTS_FILE) {
        Ok(f) => f,
        Err(_) => {
            println!("\n  No events yet.");
            return;
        }
    };
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        match EventRecord::from_bytes(line.as_bytes()) {
            Ok(record) => println!(
                "  {:>6} | {} | {:<18} | {}",
                record.sequence,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.event.kind(),
                record.event.token_type()
            ),
            Err(e) => eprintln!("  Skipping malformed event: {}", e),
        }
    }
}

fn cmd_backup(args: &[String]) {
    let subcmd = args.first().map(|s| s.as_str()).unwrap_or("create");

    match subcmd {
        "create" => {
            let Some(store) = load_store() else { return };
            let mut backup = BackupManager::new(BACKUP_DIR);
            let desc = args.get(1).map(|s| s.as_str()).unwrap_or("manual backup");
            match backup.create_snapshot(&store.ledger, desc) {
                Ok(meta) => {
                    println!(
                        "\n  Backup created: v{} ({} bytes, {} token types)",
                        meta.version, meta.size_bytes, meta.token_types
                    );
                    println!("  Checksum: {}", &meta.checksum[..16]);
                }
                Err(e) => eprintln!("  Backup failed: {}", e),
            }
        }
        "list" => {
            let backup = BackupManager::new(BACKUP_DIR);
            let snapshots = backup.list();
            if snapshots.is_empty() {
                println!("\n  No backups found. Run 'waves backup create' first.");
                return;
            }
            println!("\n  Backups ({}):", snapshots.len());
            println!("  {}", "-".repeat(70));
            for snap in snapshots {
                println!(
                    "  v{:>4} | {} | {} types | {} bytes | {}",
                    snap.version,
                    snap.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    snap.token_types,
                    snap.size_bytes,
                    snap.description
                );
            }
            println!("  Total size: {} bytes", backup.total_size());
        }
        "restore" => {
            let Some(version) = args.get(1).and_then(|s| s.parse::<u64>().ok()) else {
                eprintln!("Usage: waves backup restore <version>");
                return;
            };
            let backup = BackupManager::new(BACKUP_DIR);
            let ledger = match backup.restore(version) {
                Ok(ledger) => ledger,
                Err(e) => {
                    eprintln!("  Restore failed: {}", e);
                    return;
                }
            };
            let Some(mut store) = load_store() else { return };
            let config = store.ledger.config().clone();
            store.ledger = ledger;
            store.ledger.set_config(config);
            if let Err(e) = store.save() {
                eprintln!("  Restore failed: {}", e);
            } else {
                println!("  Restored v{} -> {}", version, STORE_FILE);
            }
        }
        "verify" => {
            let backup = BackupManager::new(BACKUP_DIR);
            let results = backup.verify_all();
            if results.is_empty() {
                println!("\n  No backups to verify.");
                return;
            }
            println!("\n  Verification results:");
            for (ver, ok) in &results {
                println!("  v{}: {}", ver, if *ok { "OK" } else { "CORRUPTED" });
            }
        }
        other => {
            eprintln!("Unknown backup subcommand: {}", other);
            eprintln!("Usage: waves backup [create|list|restore <ver>|verify]");
        }
    }
}

fn cmd_demo() {
    println!("\n  Waves demo: a random propagation cascade");
    println!("  {}", "=".repeat(60));

    let mut ledger = Ledger::new(LedgerConfig::load_or_default(CONFIG_FILE));
    let mut rng = rand::thread_rng();
    let people: Vec<Identity> = (0..40).map(|i| Identity::new(format!("p{:02}", i))).collect();
    let creator = Identity::new("origin");

    // Step 1: create
    let t = match ledger.create(
        &creator,
        NewTokenType::new("thank you for the help moving", 60)
            .with_symbol("~")
            .with_recipients(people[..3].to_vec()),
    ) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("  Create failed: {}", e);
            return;
        }
    };
    println!("\nStep 1: created {}", t);

    // Step 2: cascade until the ceiling stops it
    println!("\nStep 2: cascading...");
    println!("{}", "-".repeat(60));
    let mut rounds = 0;
    loop {
        let holders: Vec<Identity> = ledger.holders_of(t).into_iter().map(|(h, _)| h).collect();
        let Some(distributor) = holders.choose(&mut rng).cloned() else { break };
        let fan_out = rng.gen_range(1..=3);
        let recipients: Vec<Identity> = people
            .iter()
            .filter(|p| **p != distributor)
            .cloned()
            .collect::<Vec<_>>()
            .choose_multiple(&mut rng, fan_out)
            .cloned()
            .collect();

        match ledger.propagate(t, &distributor, &recipients) {
            Ok(generation) => {
                rounds += 1;
                println!(
                    "  {:<8} -> {} recipient(s) at {} | reach {}",
                    distributor.as_str(),
                    recipients.len(),
                    generation,
                    ledger.reach(t)
                );
            }
            Err(LedgerError::SupplyExceeded { .. }) if ledger.remaining_supply(t) > 0 => continue,
            Err(LedgerError::SupplyExceeded { .. }) => break,
            Err(e) => {
                eprintln!("  Unexpected rejection: {}", e);
                break;
            }
        }
    }

    // Step 3: guards
    println!("\nStep 3: guards");
    println!("{}", "-".repeat(60));
    let holder = &people[0];
    match ledger.relinquish(t, holder, &creator, 1, holder) {
        Err(e) => println!("  relinquish refused: {}", e),
        Ok(()) => println!("  relinquish unexpectedly allowed"),
    }
    ledger.register_hook(
        Identity::new("outsider"),
        Arc::new(|_: &Ledger, notice: &ReceiptNotice| notice.kind != ReceiptKind::Propagation),
    );
    let second = ledger.create(&creator, NewTokenType::new("second wave", 5));
    if let Ok(second) = second {
        match ledger.propagate(second, &creator, &[Identity::new("outsider")]) {
            Err(e) => println!("  hook refused: {}", e),
            Ok(_) => println!("  hook unexpectedly accepted"),
        }
    }

    // Step 4: summary
    let stats = ledger.stats();
    println!("\nStep 4: summary");
    println!("{}", "-".repeat(60));
    println!("  Rounds:      {}", rounds);
    println!("  Reach:       {}/{}", ledger.reach(t), 60);
    println!("  Max depth:   {}", ledger.max_depth(t));
    println!("  Holders:     {}", stats.distinct_holders);
    println!("  Events:      {}", ledger.pending_events().len());
    let violations = ledger.verify_invariants();
    if violations.is_empty() {
        println!("  Invariants:  OK");
    } else {
        for v in violations {
            println!("  Violation:   {}", v);
        }
    }
}
