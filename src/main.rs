use std::net::SocketAddr;

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use comptoir::config::Config;
use comptoir::crypto::MasterKey;
use comptoir::db::{AppState, create_pool, init_db, queries};
use comptoir::handlers;
use comptoir::models::{CreateProduct, CreateStore};

#[derive(Parser, Debug)]
#[command(name = "comptoir")]
#[command(about = "Multi-provider payment orchestration and webhook reconciliation for storefronts")]
struct Cli {
    /// Seed the database with dev data (a store and a few products)
    #[arg(long)]
    seed: bool,
}

/// Seeds a store with a small catalog so the checkout flow can be exercised
/// locally. Only runs in dev mode and when the database is empty of stores.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM stores", [], |row| row.get(0))
        .expect("Failed to count stores");
    if existing > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let store = queries::create_store(
        &conn,
        &CreateStore {
            name: "Boutique Dev".to_string(),
            currency: "XOF".to_string(),
        },
    )
    .expect("Failed to create dev store");

    for (name, price) in [("T-shirt", 8000), ("Casquette", 5000), ("Mug", 3500)] {
        queries::create_product(
            &conn,
            &store.id,
            &CreateProduct {
                name: name.to_string(),
                price,
            },
        )
        .expect("Failed to create dev product");
    }

    tracing::info!("============================================");
    tracing::info!("SEEDED DEV STORE");
    tracing::info!("Store ID: {}", store.id);
    tracing::info!("Configure providers via PUT /stores/{}/payment-config/<provider>", store.id);
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("comptoir=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let master_key = match &config.master_key {
        Some(encoded) => MasterKey::from_base64(encoded)
            .map_err(|e| anyhow::anyhow!("MASTER_KEY invalid: {}", e))?,
        None if config.dev_mode => {
            tracing::warn!(
                "No MASTER_KEY set; using an ephemeral dev key. \
                 Stored provider credentials will not survive a restart."
            );
            MasterKey::from_base64(&MasterKey::generate())
                .map_err(|e| anyhow::anyhow!("key generation failed: {}", e))?
        }
        None => anyhow::bail!("MASTER_KEY is required outside dev mode (base64, 32 bytes)"),
    };

    let pool = create_pool(&config.database_path)?;
    init_db(&pool).map_err(|e| anyhow::anyhow!("database init failed: {}", e))?;

    let state = AppState {
        db: pool,
        master_key,
        base_url: config.base_url.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set COMPTOIR_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = handlers::router(Some(config.checkout_rate_limit_rpm))
        .layer(TraceLayer::new_for_http())
        // The checkout surface is called from storefront pages on other
        // origins.
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("comptoir listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
