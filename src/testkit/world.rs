//! A throwaway database with every service wired up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::adapter::outbound::identity::Argon2Hasher;
use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::SqliteAccountStore;
use crate::domain::{Actor, Permission, ADMIN_ROLE_GROUP};
use crate::infrastructure::bootstrap::{self, Services};
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::store::AccountStore;

/// Password every fixture user is registered with.
pub const PASSWORD: &str = "correct-horse-battery";

/// Shared secret used when external tokens are enabled.
pub const EXTERNAL_SECRET: &str = "testkit-external-secret";

/// Temporary SQLite database, removed on drop.
pub struct TestWorld {
    path: PathBuf,
    pub config: Config,
    pub pool: DbPool,
    pub services: Services,
    pub accounts: SqliteAccountStore,
}

impl TestWorld {
    /// Fresh database with local tokens only.
    ///
    /// # Panics
    /// Panics if the database cannot be created.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::build(name, None)
    }

    /// Fresh database that also accepts external tokens signed with
    /// [`EXTERNAL_SECRET`].
    ///
    /// # Panics
    /// Panics if the database cannot be created.
    #[must_use]
    pub fn with_external_tokens(name: &str) -> Self {
        Self::build(name, Some(EXTERNAL_SECRET.to_string()))
    }

    fn build(name: &str, external_secret: Option<String>) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("kastia-{name}-{nanos}.db"));

        let mut config = Config::default();
        config.database.path = path.display().to_string();
        config.database.max_connections = 4;
        config.auth.external_secret = external_secret;

        let pool = bootstrap::open_database(&config).expect("open test database");
        let hasher = Arc::new(Argon2Hasher::fast().expect("argon2 params"));
        let services = Services::new(&pool, &config, hasher);
        let accounts = SqliteAccountStore::new(pool.clone());
        Self {
            path,
            config,
            pool,
            services,
            accounts,
        }
    }

    /// Reload an actor after its rights changed.
    ///
    /// # Panics
    /// Panics if the user does not exist.
    pub async fn refresh(&self, actor: &Actor) -> Actor {
        self.accounts
            .actor(actor.user_id)
            .await
            .expect("load actor")
            .expect("actor exists")
    }

    /// Register a plain user and return it as an actor.
    ///
    /// # Panics
    /// Panics if registration fails.
    pub async fn user(&self, username: &str) -> Actor {
        let account = self
            .services
            .accounts
            .register(username, &format!("{username}@example.com"), PASSWORD)
            .await
            .expect("register user");
        self.accounts
            .actor(account.user.id)
            .await
            .expect("load actor")
            .expect("actor exists")
    }

    /// A user holding explicit permissions.
    pub async fn user_with(&self, username: &str, permissions: &[Permission]) -> Actor {
        let actor = self.user(username).await;
        for permission in permissions {
            self.accounts
                .grant_permission(actor.user_id, *permission)
                .await
                .expect("grant permission");
        }
        self.refresh(&actor).await
    }

    /// A member of the `Admin` role group.
    pub async fn admin(&self, username: &str) -> Actor {
        let actor = self.user(username).await;
        self.services.accounts.setup_roles().await.expect("setup roles");
        self.accounts
            .assign_role(actor.user_id, ADMIN_ROLE_GROUP)
            .await
            .expect("assign admin role");
        self.refresh(&actor).await
    }

    /// Log in with [`PASSWORD`] and return the bearer token.
    ///
    /// # Panics
    /// Panics if login fails.
    pub async fn token(&self, username: &str) -> String {
        self.services
            .accounts
            .login(username, PASSWORD)
            .await
            .expect("login")
            .token
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}
