use idleapi::api::{Gateway, ReqwestApiClient};
use idleapi::bot;
use idleapi::breaker::{DatabaseOutageStore, InMemoryOutageStore, OutageBreaker, OutageStore};
use idleapi::config::{Config, OutageStoreKind};
use idleapi::connectors::discord::serenity::Data;
use idleapi::paginator::Timeouts;
use idleapi::store::SeaOrmProtectedItemsRepository;
use log::{LevelFilter, info};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use migration::MigratorTrait;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    let stdout = ConsoleAppender::builder().build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("idleapi", level))
        .build(Root::builder().appender("stdout").build(LevelFilter::Warn))?;
    log4rs::init_config(config)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::new()?;
    init_logging(&config.bot.log_level)?;

    let db = sea_orm::Database::connect(&config.database.url).await?;
    migration::Migrator::up(&db, None).await?;

    let store: Arc<dyn OutageStore> = match config.outage.store {
        OutageStoreKind::Memory => Arc::new(InMemoryOutageStore::new()),
        OutageStoreKind::Database => Arc::new(DatabaseOutageStore::new(db.clone())),
    };
    let breaker = OutageBreaker::new(store, config.outage.key.clone(), config.outage.window());
    let client = ReqwestApiClient::new(&config.api.token, config.api.request_timeout())?;
    let gateway = Gateway::new(Arc::new(client), breaker, config.api.base_url.clone());

    let data = Data {
        gateway,
        protected_items: SeaOrmProtectedItemsRepository::new(db),
        timeouts: Timeouts::from(&config.interaction),
        prefix: config.bot.prefix.clone(),
        developer_id: config.bot.developer_id,
        bans: config.bot.bans.iter().copied().collect::<HashSet<_>>(),
        started_at: chrono::Utc::now(),
    };

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let framework = poise::Framework::<Data, anyhow::Error>::builder()
        .options(poise::FrameworkOptions {
            commands: bot::commands(Duration::from_secs(config.bot.api_cooldown_secs)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.bot.prefix.clone()),
                mention_as_prefix: true,
                ..Default::default()
            },
            owners: bot::owners(config.bot.developer_id),
            initialize_owners: false,
            command_check: Some(|ctx| Box::pin(bot::not_banned(ctx))),
            on_error: |error| Box::pin(bot::on_error(error)),
            ..Default::default()
        })
        .setup(|_ctx, ready, _framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.bot.token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    Ok(())
}
