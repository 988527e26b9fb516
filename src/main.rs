use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storesync::config::Config;
use storesync::db::{AppState, create_pool, init_db, queries};
use storesync::dedup::DedupCache;
use storesync::handlers;
use storesync::models::{UpsertProduct, UpsertVariant};
use storesync::payments::StripeClient;
use storesync::sync::{ApplyFailureSink, reconcile};
use storesync::upstream::{AdminClient, WEBHOOK_TOPICS};

#[derive(Parser, Debug)]
#[command(name = "storesync")]
#[command(about = "Webhook ingestion and catalog sync for a headless storefront")]
struct Cli {
    /// Register webhook subscriptions on the upstream platform and exit
    #[arg(long)]
    register_webhooks: bool,

    /// List the upstream platform's webhook subscriptions and exit
    #[arg(long)]
    list_webhooks: bool,

    /// Delete an upstream webhook subscription by id and exit
    #[arg(long, value_name = "ID")]
    delete_webhook: Option<String>,

    /// Run one reconciliation pass (push, pull, or full) and exit
    #[arg(long, value_name = "MODE")]
    reconcile: Option<String>,

    /// Seed the database with sample catalog data (dev mode only)
    #[arg(long)]
    seed: bool,
}

fn upstream_client(config: &Config) -> AdminClient {
    let (Some(domain), Some(token)) = (&config.upstream_domain, &config.upstream_access_token)
    else {
        eprintln!("UPSTREAM_DOMAIN and UPSTREAM_ACCESS_TOKEN must be set for webhook administration");
        std::process::exit(1);
    };
    AdminClient::new(domain, token, &config.upstream_api_version)
}

/// Webhook subscription administration. Runs interactively, so a failure
/// terminates the process with a non-zero status.
async fn run_webhook_admin(cli: &Cli, config: &Config) {
    let client = upstream_client(config);

    if cli.register_webhooks {
        let base = config.base_url.trim_end_matches('/');
        println!("Registering webhook subscriptions against {}", base);
        for (topic, path) in WEBHOOK_TOPICS {
            let callback_url = format!("{}{}", base, path);
            match client.create_webhook_subscription(topic, &callback_url).await {
                Ok(sub) => println!("  [OK] {} -> {} (id: {})", topic, sub.callback_url, sub.id),
                Err(e) => {
                    eprintln!("  [ERROR] failed to register {}: {}", topic, e);
                    std::process::exit(1);
                }
            }
        }
    } else if cli.list_webhooks {
        match client.list_webhook_subscriptions().await {
            Ok(subs) => {
                if subs.is_empty() {
                    println!("No webhook subscriptions registered.");
                }
                for sub in subs {
                    println!("{}  {}  {}", sub.id, sub.topic, sub.callback_url);
                }
            }
            Err(e) => {
                eprintln!("Failed to list webhook subscriptions: {}", e);
                std::process::exit(1);
            }
        }
    } else if let Some(id) = &cli.delete_webhook {
        match client.delete_webhook_subscription(id).await {
            Ok(()) => println!("Deleted webhook subscription {}", id),
            Err(e) => {
                eprintln!("Failed to delete webhook subscription {}: {}", id, e);
                std::process::exit(1);
            }
        }
    }
}

/// One-shot reconciliation pass. Per-item failures are counted in the summary
/// and do not fail the process; only a pass that cannot run at all does.
async fn run_reconcile(mode: &str, config: &Config) {
    let run_push = matches!(mode, "push" | "full");
    let run_pull = matches!(mode, "pull" | "full");
    if !run_push && !run_pull {
        eprintln!("--reconcile expects push, pull, or full (got: {})", mode);
        std::process::exit(2);
    }

    let Some(secret_key) = &config.stripe_secret_key else {
        eprintln!("STRIPE_SECRET_KEY must be set for reconciliation");
        std::process::exit(1);
    };
    let stripe = StripeClient::new(secret_key);

    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    if run_push {
        match reconcile::push_products(&pool, &stripe).await {
            Ok(summary) => println!(
                "push: {} candidates, {} linked, {} prices created, {} failed",
                summary.candidates, summary.linked, summary.prices_created, summary.failed
            ),
            Err(e) => {
                eprintln!("Push reconciliation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    if run_pull {
        match reconcile::pull_linkages(&pool, &stripe).await {
            Ok(summary) => {
                println!(
                    "pull: {} pages, {} examined, {} linked, {} already linked, {} unmatchable, {} failed",
                    summary.pages,
                    summary.examined,
                    summary.linked,
                    summary.already_linked,
                    summary.unmatchable,
                    summary.failed
                );
                for item in &summary.unmatched {
                    println!(
                        "  [UNMATCHED] remote {} (handle: {}, external_id: {})",
                        item.remote_id,
                        item.handle.as_deref().unwrap_or("-"),
                        item.external_id.as_deref().unwrap_or("-")
                    );
                }
            }
            Err(e) => {
                eprintln!("Pull reconciliation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Seeds the catalog with sample products for local development.
fn seed_dev_catalog(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
        .expect("Failed to count products");
    if count > 0 {
        tracing::info!("Catalog already has data, skipping seed");
        return;
    }

    let samples = [
        ("9001", "sunset-print", "Sunset Print", "9101", 120.00),
        ("9002", "harbor-mug", "Harbor Mug", "9102", 18.50),
    ];

    for (external_id, handle, title, variant_id, price) in samples {
        let product = queries::insert_product(
            &conn,
            &UpsertProduct {
                external_id: external_id.to_string(),
                handle: handle.to_string(),
                title: title.to_string(),
                description_html: Some(format!("<p>{}</p>", title)),
                vendor: Some("Dev Vendor".to_string()),
                product_type: Some("Sample".to_string()),
                status: "active".to_string(),
                published_at: Some(chrono::Utc::now().timestamp()),
                source_updated_at: None,
            },
        )
        .expect("Failed to seed product");

        queries::upsert_variant(
            &conn,
            &product.id,
            &UpsertVariant {
                external_id: variant_id.to_string(),
                title: Some("Default".to_string()),
                sku: Some(format!("DEV-{}", external_id)),
                price_amount: price,
                price_currency: "USD".to_string(),
                compare_at_price_amount: None,
                position: 1,
                inventory_policy: Some("deny".to_string()),
                taxable: true,
                source_updated_at: None,
            },
        )
        .expect("Failed to seed variant");

        tracing::info!("Seeded product: {} ({})", title, handle);
    }
}

/// Runs push then pull on an interval so the catalog converges without
/// operator action. One-shot runs remain available via --reconcile.
fn spawn_reconcile_task(state: AppState, stripe: StripeClient, interval_secs: u64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs);

        loop {
            tokio::time::sleep(interval).await;

            match reconcile::push_products(&state.db, &stripe).await {
                Ok(summary) => {
                    if summary.candidates > 0 {
                        tracing::info!(
                            linked = summary.linked,
                            failed = summary.failed,
                            "scheduled push reconciliation finished"
                        );
                    }
                }
                Err(e) => tracing::warn!("Scheduled push reconciliation failed: {}", e),
            }

            match reconcile::pull_linkages(&state.db, &stripe).await {
                Ok(summary) => {
                    if summary.linked > 0 || !summary.unmatched.is_empty() {
                        tracing::info!(
                            linked = summary.linked,
                            unmatched = summary.unmatched.len(),
                            "scheduled pull reconciliation finished"
                        );
                    }
                }
                Err(e) => tracing::warn!("Scheduled pull reconciliation failed: {}", e),
            }
        }
    });

    tracing::info!(
        "Background reconciliation task started (runs every {}s)",
        interval_secs
    );
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storesync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // Admin one-shot modes run and exit before the server starts
    if cli.register_webhooks || cli.list_webhooks || cli.delete_webhook.is_some() {
        run_webhook_admin(&cli, &config).await;
        return;
    }
    if let Some(mode) = cli.reconcile.as_deref() {
        run_reconcile(mode, &config).await;
        return;
    }

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    if config.webhook_shared_secret.is_none() {
        tracing::warn!(
            "WEBHOOK_SHARED_SECRET is not set - all webhook deliveries will be rejected with 500"
        );
    }

    let state = AppState {
        db: pool,
        webhook_secret: config.webhook_shared_secret.clone(),
        dedup: Arc::new(DedupCache::with_system_clock(config.dedup_ttl_secs)),
        apply_failures: Arc::new(ApplyFailureSink::default()),
    };

    // Seed dev data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set STORESYNC_ENV=dev)");
        } else {
            seed_dev_catalog(&state);
        }
    }

    if config.reconcile_interval_secs > 0 {
        match &config.stripe_secret_key {
            Some(secret_key) => spawn_reconcile_task(
                state.clone(),
                StripeClient::new(secret_key),
                config.reconcile_interval_secs,
            ),
            None => tracing::warn!(
                "RECONCILE_INTERVAL_SECS is set but STRIPE_SECRET_KEY is missing - scheduled reconciliation disabled"
            ),
        }
    }

    let app = Router::new()
        .merge(handlers::webhooks::router())
        .merge(handlers::status::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("storesync listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
