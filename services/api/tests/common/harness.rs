//! Disposable Postgres databases for store-level tests.
//!
//! One container is started per test binary and reused. Every test gets its own freshly
//! migrated database inside it, so tests never see each other's rows.
//!
//! Set `TEST_DATABASE_URL` to run against an existing server instead of a container.

use api_lib::adapters::DbAdapter;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Server shared by every test in the binary.
struct SharedPostgres {
    admin_url: String,
    // Keeps the container alive for the whole run.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();

impl SharedPostgres {
    async fn init() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        if let Ok(admin_url) = std::env::var("TEST_DATABASE_URL") {
            return Self {
                admin_url,
                _container: None,
            };
        }

        let container = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .expect("Failed to start Postgres container");
        let host = container.get_host().await.expect("container host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("container port");

        Self {
            admin_url: format!("postgres://postgres:postgres@{}:{}/postgres", host, port),
            _container: Some(container),
        }
    }

    async fn get() -> &'static Self {
        SHARED_POSTGRES.get_or_init(Self::init).await
    }
}

/// A migrated, empty database with a `DbAdapter` over it.
pub struct TestDatabase {
    pub pool: PgPool,
    pub store: DbAdapter,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let shared = SharedPostgres::get().await;
        let admin_options =
            PgConnectOptions::from_str(&shared.admin_url).expect("valid TEST_DATABASE_URL");

        let name = format!("doc_parser_test_{}", Uuid::new_v4().simple());
        let mut admin = admin_options
            .connect()
            .await
            .expect("Failed to connect to the admin database");
        sqlx::query(&format!("CREATE DATABASE {}", name))
            .execute(&mut admin)
            .await
            .expect("Failed to create test database");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(admin_options.database(&name))
            .await
            .expect("Failed to connect to test database");
        let store = DbAdapter::new(pool.clone());
        store.run_migrations().await.expect("Failed to run migrations");

        Self { pool, store }
    }
}
