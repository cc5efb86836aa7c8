use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;

/// A migrated Postgres database for the bot's stores.
pub struct TestContext {
    #[allow(dead_code)] // dropping the container stops the database
    pub container: ContainerAsync<Postgres>,
    pub db: DatabaseConnection,
}

/// Starts Postgres, applies the bot's migrations and installs a test log subscriber.
pub async fn setup() -> anyhow::Result<TestContext> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let container = Postgres::default().start().await?;
    let db = Database::connect(database_url(&container).await?).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(TestContext { container, db })
}

async fn database_url(container: &ContainerAsync<Postgres>) -> anyhow::Result<String> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    Ok(format!("postgres://postgres:postgres@{host}:{port}/postgres"))
}
