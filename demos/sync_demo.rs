//! Demo client against a running invoice store
//!
//! Fetches the collection, prints it, toggles the payment status of the
//! first invoice, and shows the cache events the mutation produced.
//!
//! ```bash
//! RUST_LOG=invoice_sync=debug cargo run --example sync_demo -- http://localhost:8080
//! ```

use anyhow::Result;
use invoice_sync::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let config = ClientConfig {
        base_url,
        ..ClientConfig::default()
    };

    let store = Arc::new(CacheStore::new(config.event_capacity));
    let gateway: Arc<dyn InvoiceGateway> = Arc::new(HttpInvoiceGateway::new(&config)?);
    let engine = OptimisticUpdateEngine::new(store.clone(), gateway);

    let mut events = store.subscribe();

    let count = engine.refresh().await?;
    println!("fetched {count} invoices");
    for invoice in store.read().records() {
        println!(
            "  {}  {}  paid={}  reviewed={}",
            invoice.display_number(),
            invoice.original_file_name,
            invoice.is_paid,
            invoice.is_reviewed
        );
    }

    let Some(first) = store.read().records().next().cloned() else {
        println!("no invoices to mutate");
        return Ok(());
    };

    let toggled = !first.is_paid;
    println!(
        "toggling payment status of {} to {}",
        first.display_number(),
        toggled
    );
    let updated = engine
        .apply(&first.file_hash, InvoicePatch::paid(toggled))
        .await?;
    println!("server acknowledged: isPaid={}", updated.is_paid);

    while let Ok(envelope) = events.try_recv() {
        println!("cache event: {}", envelope.event.action());
    }

    Ok(())
}
