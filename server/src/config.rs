use anyhow::{anyhow, Context, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BulkInsertMode {
    /// Reject the whole batch when any candidate duplicates an existing
    /// row or another candidate; nothing is inserted.
    Strict,
    /// Insert non-duplicates, skip duplicates, report both.
    BestEffort,
}

impl BulkInsertMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "strict" => Ok(BulkInsertMode::Strict),
            "best-effort" => Ok(BulkInsertMode::BestEffort),
            other => Err(anyhow!(
                "invalid BULK_INSERT_MODE {other:?}; expected \"strict\" or \"best-effort\""
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub bulk_insert_mode: BulkInsertMode,
    pub open_registration: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL missing")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET missing")?;
        if jwt_secret.len() < 16 {
            return Err(anyhow!("JWT_SECRET must be at least 16 bytes"));
        }

        let token_ttl_minutes = match std::env::var("TOKEN_TTL_MINUTES") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or_else(|| anyhow!("invalid TOKEN_TTL_MINUTES {raw:?}"))?,
            Err(_) => 30,
        };

        let bulk_insert_mode = match std::env::var("BULK_INSERT_MODE") {
            Ok(raw) => BulkInsertMode::parse(raw.trim())?,
            Err(_) => BulkInsertMode::Strict,
        };

        let open_registration = std::env::var("OPEN_REGISTRATION")
            .ok()
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            database_url,
            jwt_secret,
            token_ttl_minutes,
            bulk_insert_mode,
            open_registration,
            cors_allowed_origins,
        })
    }
}
