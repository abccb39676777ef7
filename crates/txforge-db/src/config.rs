use std::env;
use std::time::Duration;

/// Where and how to connect to PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// `postgresql://[user[:pass]@]host[:port]/dbname[?params]`
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/txforge";

    /// Consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "TXFORGE_DATABASE_URL";

    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

    /// `TXFORGE_DATABASE_URL`, or [`Self::DEFAULT_URL`] when unset.
    pub fn from_env() -> Self {
        Self::new(env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned()))
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Split the URL into `(server, database, query)`.
    fn parts(&self) -> Option<(&str, &str, Option<&str>)> {
        let (path, query) = match self.database_url.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (self.database_url.as_str(), None),
        };
        let scheme_end = path.find("://").map_or(0, |i| i + 3);
        let slash = path[scheme_end..].rfind('/')? + scheme_end;
        Some((&path[..slash], &path[slash + 1..], query))
    }

    /// The database name, or `None` when the URL has no path segment.
    pub fn database_name(&self) -> Option<&str> {
        self.parts()
            .map(|(_, name, _)| name)
            .filter(|name| !name.is_empty())
    }

    /// Same server and parameters, but the `postgres` maintenance database.
    pub fn maintenance_url(&self) -> String {
        match self.parts() {
            Some((server, _, Some(query))) => format!("{server}/postgres?{query}"),
            Some((server, _, None)) => format!("{server}/postgres"),
            None => format!("{}/postgres", self.database_url.trim_end_matches('/')),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
