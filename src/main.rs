use std::sync::Arc;

use anyhow::Context;

use inbox_triage::api::{AppState, api_routes};
use inbox_triage::config::AppConfig;
use inbox_triage::llm::ModelGateway;
use inbox_triage::pipeline::{EmailProcessor, ProcessorConfig};
use inbox_triage::seed;
use inbox_triage::store::{Database, LibSqlBackend};

const USAGE: &str = "usage: inbox-triage [serve|process|seed|reset]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    if !matches!(command.as_str(), "serve" | "process" | "seed" | "reset") {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let config = AppConfig::from_env().context("invalid configuration")?;

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Model gateway ────────────────────────────────────────────────────
    let gateway = Arc::new(ModelGateway::from_configs(&config.providers));
    if gateway.configured_count() == 0 {
        tracing::warn!("No LLM API keys set (GEMINI_API_KEY, GROQ_API_KEY); model output will be degraded");
    }

    let processor = Arc::new(EmailProcessor::new(
        Arc::clone(&db),
        Arc::clone(&gateway),
        ProcessorConfig {
            category_policy: config.category_policy,
        },
    ));

    match command.as_str() {
        "process" => {
            let report = processor.process_all().await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        "seed" => {
            let emails = seed::create_mock_emails(db.as_ref()).await?;
            let prompts = seed::create_default_prompts(db.as_ref()).await?;
            eprintln!("Seeded {emails} emails and {prompts} prompts");
        }
        "reset" => {
            let summary = seed::reset_demo(db.as_ref()).await?;
            eprintln!(
                "Deleted {} drafts and {} emails; default prompts ensured",
                summary.drafts_deleted, summary.emails_deleted
            );
        }
        _ => serve(config, db, processor, gateway).await?,
    }

    Ok(())
}

async fn serve(
    config: AppConfig,
    db: Arc<dyn Database>,
    processor: Arc<EmailProcessor>,
    gateway: Arc<ModelGateway>,
) -> anyhow::Result<()> {
    seed::create_default_prompts(db.as_ref()).await?;

    eprintln!("📬 Inbox Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Category policy: {}", config.category_policy);
    eprintln!("   API: http://0.0.0.0:{}", config.port);

    let app = api_routes(AppState {
        db,
        processor,
        gateway,
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
