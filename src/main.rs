// Civic report API: photo analysis and report e-mail for the urban-problem app.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use civic_report_api::{
    analyzer::{client::GeminiClient, Analyzer},
    config::Config,
    create_router,
    dispatcher::{relay::HttpMailRelay, Dispatcher, Mailbox},
    AppState, ANALYZE_PATH, SEND_EMAIL_PATH,
};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "civic_report_api=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;

    let analyzer = Analyzer::new(
        Arc::new(GeminiClient::new(config.gemini.clone())),
        config.prompt,
    );
    let dispatcher = Dispatcher::new(
        Arc::new(HttpMailRelay::new(&config.mail)),
        Mailbox::from(&config.mail),
    )
    .context("report template failed to compile")?;

    let app = create_router(AppState::new(analyzer, dispatcher), config.body_limit);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %config.bind_addr,
        model = %config.gemini.model,
        "serving {} and {}",
        ANALYZE_PATH,
        SEND_EMAIL_PATH
    );

    axum::serve(listener, app).await?;
    Ok(())
}
