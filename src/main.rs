use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gitgram::accounts::AccountLinker;
use gitgram::commands::CommandHandler;
use gitgram::config::Config;
use gitgram::dispatch::NotificationDispatcher;
use gitgram::github::{GithubOauth, GithubPermissions};
use gitgram::ingress::Ingress;
use gitgram::server::{build_router, AppState};
use gitgram::storage::Database;
use gitgram::subscriptions::SubscriptionManager;
use gitgram::telegram::{poll, TelegramApi};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gitgram=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let db = Database::open(&config.database_path)
        .await
        .context("opening database")?;

    let telegram = TelegramApi::new(&config.telegram_bot_token);
    let oauth = Arc::new(GithubOauth::new(
        config.github_client_id.clone(),
        config.github_client_secret.clone(),
        config.oauth_redirect_url.clone(),
    ));
    let permissions = Arc::new(GithubPermissions::new());

    let dispatcher = NotificationDispatcher::new(db.clone(), Arc::new(telegram.clone()));
    let ingress = Ingress::new(
        config.webhook_secret.clone().into_bytes(),
        db.clone(),
        dispatcher,
    );
    let linker = AccountLinker::new(db.clone(), oauth);
    let subscriptions = SubscriptionManager::new(
        db.clone(),
        permissions,
        Arc::new(telegram.clone()),
        config.github_app_slug.clone(),
    );
    let handler = CommandHandler::new(linker.clone(), subscriptions);

    tokio::spawn(poll::run(telegram, handler));

    let router = build_router(AppState::new(ingress, linker));
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, router).await.context("serving")?;
    Ok(())
}
