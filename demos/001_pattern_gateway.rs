//! Gateway serving the built-in test pattern.
//!
//! Demonstrates:
//! - Registering stream records in the in-memory registry
//! - Binding a gateway with the synthetic frame source
//! - Printing the per-stream WebSocket URLs clients connect to
//!
//! Usage:
//!   cargo run --example 001_pattern_gateway
//!   cargo run --example 001_pattern_gateway -- --no-wait
//!   cargo run --example 001_pattern_gateway -- --debug
//!   cargo run --example 001_pattern_gateway -- --port 9500 --fps 10

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;

use camgate::{Gateway, MemoryRegistry, Result, StreamRegistry};

// ============================================================================
// Constants
// ============================================================================

const DEMO_FEEDS: [(&str, &str); 2] = [
    ("rtsp://demo.local:554/lobby", "Lobby"),
    ("rtsp://demo.local:554/garage", ""),
];

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Pattern Gateway ===\n");

    // ========================================================================
    // Register Streams
    // ========================================================================

    println!("[1] Registering demo streams...");

    let registry = MemoryRegistry::new();
    let mut records = Vec::new();
    for (url, title) in DEMO_FEEDS {
        let record = registry.create(url, title).await?;
        println!("    ✓ {} ({})", record.title, record.id);
        records.push(record);
    }
    println!();

    // ========================================================================
    // Start Gateway
    // ========================================================================

    println!("[2] Starting gateway on port {}...", args.port);

    let gateway = Gateway::builder()
        .bind_addr(([127, 0, 0, 1], args.port))
        .frame_source(common::pattern_source(&args))
        .build()
        .await?;

    println!("    ✓ Listening at {}\n", gateway.ws_url());

    // ========================================================================
    // Connection Instructions
    // ========================================================================

    println!("[3] Connect a WebSocket client to a stream:");
    for record in &records {
        println!("    {} → {}", record.title, gateway.stream_url(record.id));
    }
    println!();
    println!("    then send:");
    println!("      {{\"type\": \"start_stream\", \"rtsp_url\": \"rtsp://any/url\"}}");
    println!("      {{\"type\": \"set_speed\", \"speed\": 2.0}}");
    println!("      {{\"type\": \"pause\"}} / {{\"type\": \"play\"}}");
    println!("      {{\"type\": \"stop_stream\"}}");
    println!();
    println!("    (the pattern source accepts any URL and synthesizes frames)\n");

    common::wait_for_exit(args.no_wait).await;

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("\n[Cleanup] Shutting down gateway...");
    let live = gateway.session_count();
    gateway.shutdown();
    println!("          ✓ Done ({live} sessions detached)");

    Ok(())
}
