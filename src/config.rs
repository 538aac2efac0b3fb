use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Which transport delivers outgoing mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Only log the message (development).
    Log,
    Smtp,
    /// POST `{to, subject, html}` to an HTTP email endpoint.
    Endpoint,
    Resend,
}

impl MailTransport {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "log" | "dev" => Ok(Self::Log),
            "smtp" => Ok(Self::Smtp),
            "endpoint" | "http" => Ok(Self::Endpoint),
            "resend" => Ok(Self::Resend),
            other => anyhow::bail!("unknown MAIL_TRANSPORT {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub from: String,
    pub smtp: SmtpConfig,
    pub endpoint_url: Option<String>,
    pub resend_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub storage_dir: String,
    /// Public origin of the web client, used to build links in emails.
    pub base_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env_or("DATABASE_URL", "sqlite://travelle.db");
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "travelle"),
            audience: env_or("JWT_AUDIENCE", "travelle-users"),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let smtp = SmtpConfig {
            host: env_or("SMTP_HOST", "smtp.gmail.com"),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            secure: std::env::var("SMTP_SECURE")
                .map(|v| v == "true")
                .unwrap_or(false),
            username: env_or("SMTP_USERNAME", ""),
            password: env_or("SMTP_PASSWORD", ""),
        };
        let from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| format!("\"Travelle\" <{}>", smtp.username));
        let mail = MailConfig {
            transport: MailTransport::parse(&env_or("MAIL_TRANSPORT", "log"))?,
            from,
            smtp,
            endpoint_url: std::env::var("EMAIL_ENDPOINT_URL").ok(),
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
        };

        Ok(Self {
            database_url,
            storage_dir: env_or("STORAGE_DIR", "./data/storage"),
            base_url: env_or("APP_BASE_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            jwt,
            mail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_transport_accepts_known_names() {
        assert_eq!(MailTransport::parse("SMTP").unwrap(), MailTransport::Smtp);
        assert_eq!(MailTransport::parse(" dev ").unwrap(), MailTransport::Log);
        assert_eq!(MailTransport::parse("http").unwrap(), MailTransport::Endpoint);
        assert_eq!(MailTransport::parse("resend").unwrap(), MailTransport::Resend);
        assert!(MailTransport::parse("pigeon").is_err());
    }
}
