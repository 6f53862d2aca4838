use std::env;

use crate::error::ConfigError;

/// Process configuration, read once at startup from the environment
/// (`.env` supported via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub mail: Option<MailConfig>,
}

/// SMTP settings for the admin notification mail. Absent credentials mean
/// notifications are skipped, order creation is unaffected.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let mail = match (env::var("GMAIL_USER"), env::var("GMAIL_PASS")) {
            (Ok(username), Ok(password)) => Some(MailConfig {
                smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            mail,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
