use std::sync::Arc;
use tracing::info;

use launchpad_backend::adapters::{
    ContentGenerator, HttpContentGenerator, HttpImageStudio, HttpRequestParser, ImageStudio,
    InMemoryLedger, KeywordRequestParser, RequestParser, TemplateContentGenerator,
    PlaceholderImageStudio,
};
use launchpad_backend::api::{router, AppState};
use launchpad_backend::{
    AdmissionController, AntiBotEngine, DeploymentOrchestrator, DeploymentStore, FeeRouter,
    LiquidityLocker, MetadataAssembler, PlatformConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = PlatformConfig::load();
    let timeout = config.adapters.request_timeout_secs.0;

    // Collaborator adapters: remote endpoints when configured, the built-in
    // local implementations otherwise.
    let parser: Arc<dyn RequestParser> = match &config.adapters.parser_endpoint {
        Some(endpoint) => Arc::new(HttpRequestParser::new(endpoint.clone(), timeout)),
        None => Arc::new(KeywordRequestParser),
    };
    let content: Arc<dyn ContentGenerator> = match &config.adapters.content_endpoint {
        Some(endpoint) => Arc::new(HttpContentGenerator::new(endpoint.clone(), timeout)),
        None => Arc::new(TemplateContentGenerator),
    };
    let imagery: Arc<dyn ImageStudio> = match &config.adapters.imagery_endpoint {
        Some(endpoint) => Arc::new(HttpImageStudio::new(endpoint.clone(), timeout)),
        None => Arc::new(PlaceholderImageStudio),
    };
    // Real RPC submission plugs in behind LedgerClient; the simulated ledger
    // keeps local runs self-contained.
    let ledger = Arc::new(InMemoryLedger::new());
    info!("✅ Collaborator adapters initialized");

    let admission = Arc::new(AdmissionController::new(config.admission.clone()));
    let store = Arc::new(DeploymentStore::new());
    let protection = Arc::new(AntiBotEngine::new());
    let locker = Arc::new(LiquidityLocker::new(config.escrow.clone()));
    let fees = Arc::new(FeeRouter::new(&config.fees));
    let assembler = Arc::new(MetadataAssembler::new(content, imagery));
    info!("✅ Launch platform components initialized");

    let orchestrator = Arc::new(DeploymentOrchestrator::new(
        config.deployment.clone(),
        config.normalizer.clone(),
        config.protection.clone(),
        store.clone(),
        assembler,
        ledger,
        protection.clone(),
        locker.clone(),
        fees.clone(),
    ));

    let app = router(AppState {
        admission,
        parser,
        orchestrator,
        store,
        protection,
        locker,
        fees,
    });

    info!("🔧 Routes configured:");
    info!("  - POST /api/v1/launch (token launch pipeline)");
    info!("  - GET  /api/v1/deployments/:request_id");
    info!("  - GET  /api/v1/protection/:token_id");
    info!("  - GET  /api/v1/locks/:lock_id");
    info!("  - GET  /api/v1/fees/:token_id");
    info!("  - GET  /api/v1/admission/stats");
    info!("  - GET  /health");
    info!("🚀 Starting server on {}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
