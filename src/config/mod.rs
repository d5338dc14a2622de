use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub auth: AuthConfig,
    pub smtp: SmtpConfig,
    pub upload: UploadConfig,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expires_min: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expires_min", &self.jwt_expires_min)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_upload_mb: usize,
}

impl UploadConfig {
    pub fn max_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let server = ServerConfig {
            host: env_or("HOST", "127.0.0.1"),
            port: env_or("PORT", "5000").parse()?,
        };
        let auth = AuthConfig {
            jwt_secret: env_or("JWT_SECRET", "dev_secret"),
            jwt_expires_min: env_or("JWT_EXPIRES_MIN", "1440").parse()?,
        };
        let smtp = SmtpConfig {
            host: env_or("SMTP_HOST", "localhost"),
            port: env_or("SMTP_PORT", "1025").parse()?,
            username: std::env::var("SMTP_USER").ok().filter(|v| !v.is_empty()),
            password: std::env::var("SMTP_PASS").ok().filter(|v| !v.is_empty()),
            from: env_or("SMTP_FROM", "Smart Campus <noreply@smartcampus.test>"),
        };
        let upload = UploadConfig {
            dir: PathBuf::from(env_or("UPLOAD_DIR", "uploads")),
            max_upload_mb: env_or("MAX_CONTENT_LENGTH_MB", "10").parse()?,
        };
        let cors_origins = env_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(AppConfig {
            server,
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            auth,
            smtp,
            upload,
            cors_origins,
        })
    }
}
