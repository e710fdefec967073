use serde::Deserialize;

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres URL. `None` runs the server on in-memory stores.
    pub database_url: Option<String>,
    pub port: u16,
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub groq_model: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Never log the API key or database credentials
        tracing::info!("Configuration loaded successfully");
        match config.database_url {
            Some(ref url) => tracing::debug!("Database URL: {}", redact_database_url(url)),
            None => tracing::warn!("DATABASE_URL not set, leads and users will be kept in memory"),
        }
        tracing::debug!("Groq Base URL: {}", config.groq_base_url);
        tracing::debug!("Groq model: {}", config.groq_model);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = match non_empty("DATABASE_URL").or_else(|| non_empty("DB_URL")) {
            Some(url) => {
                if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                    anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                }
                Some(url)
            }
            None => None,
        };

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            None => DEFAULT_PORT,
        };

        let groq_api_key = non_empty("GROQ_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("GROQ_API_KEY não configurada no ambiente"))?;

        let groq_base_url = non_empty("GROQ_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string());
        if !groq_base_url.starts_with("http://") && !groq_base_url.starts_with("https://") {
            anyhow::bail!("GROQ_BASE_URL must start with http:// or https://");
        }

        let groq_model = non_empty("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());

        Ok(Self {
            database_url,
            port,
            groq_api_key,
            groq_base_url: groq_base_url.trim_end_matches('/').to_string(),
            groq_model,
        })
    }
}

/// The database URL with any `user:password@` part masked.
pub fn redact_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    match authority.rsplit_once('@') {
        Some((_, host)) => format!("{}://***@{}{}", scheme, host, tail),
        None => url.to_string(),
    }
}
