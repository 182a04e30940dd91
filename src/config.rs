use std::env;

/// Credentials for the transactional-email API. Only present when every
/// identifier is configured.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_url: String,
    pub service_id: String,
    pub user_id: String,
    pub contact_template_id: String,
    pub reset_template_id: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub app_base_url: String,
    pub public_menu_base_url: String,
    pub secure_cookies: bool,
    pub mail: Option<MailConfig>,
}

const DEFAULT_MAIL_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env is fine in deployments that inject variables directly.
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }

        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
        let app_base_url = env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();
        let public_menu_base_url = env::var("PUBLIC_MENU_BASE_URL")
            .unwrap_or_else(|_| "https://paycamenu.com".into())
            .trim_end_matches('/')
            .to_string();
        let secure_cookies = env::var("SECURE_COOKIES")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            rust_log,
            bind_addr,
            app_base_url,
            public_menu_base_url,
            secure_cookies,
            mail: MailConfig::from_env(),
        })
    }
}

impl MailConfig {
    fn from_env() -> Option<Self> {
        let config = Self {
            api_url: env::var("MAIL_API_URL").unwrap_or_else(|_| DEFAULT_MAIL_API_URL.into()),
            service_id: env::var("MAIL_SERVICE_ID").ok()?,
            user_id: env::var("MAIL_USER_ID").ok()?,
            contact_template_id: env::var("MAIL_CONTACT_TEMPLATE_ID").ok()?,
            reset_template_id: env::var("MAIL_RESET_TEMPLATE_ID").ok()?,
        };
        Some(config)
    }
}
