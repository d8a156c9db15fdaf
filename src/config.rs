use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    /// Origin used when building public image URLs, without trailing slash.
    pub public_base_url: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub projects_per_page: u32,
    pub notification_ttl: Duration,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Portfolio admin backend with image ingestion")]
pub struct Args {
    /// Host to bind to (overrides PORTFOLIO_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORTFOLIO_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded images are stored (overrides PORTFOLIO_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides PORTFOLIO_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Origin for public image URLs (overrides PORTFOLIO_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Projects per page on the public listing (overrides PORTFOLIO_PROJECTS_PER_PAGE)
    #[arg(long)]
    pub projects_per_page: Option<u32>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::merge(args, |name| env::var(name))?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over variables read through `lookup` over defaults.
    pub fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|_| default.into());
        let optional = |name: &str| lookup(name).ok().filter(|v| !v.trim().is_empty());

        let env_port = parse_var(&lookup, "PORTFOLIO_PORT", 3000u16)?;
        let env_per_page = parse_var(&lookup, "PORTFOLIO_PROJECTS_PER_PAGE", 6u32)?;
        let ttl_ms = parse_var(&lookup, "PORTFOLIO_NOTIFICATION_TTL_MS", 3000u64)?;
        let max_upload_bytes = parse_var(
            &lookup,
            "PORTFOLIO_MAX_UPLOAD_BYTES",
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;

        let cfg = Self {
            host: args
                .host
                .unwrap_or_else(|| text("PORTFOLIO_HOST", "0.0.0.0")),
            port: args.port.unwrap_or(env_port),
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| text("PORTFOLIO_STORAGE_DIR", "./data/objects")),
            database_url: args.database_url.unwrap_or_else(|| {
                text(
                    "PORTFOLIO_DATABASE_URL",
                    "sqlite://./data/meta/portfolio.db",
                )
            }),
            public_base_url: args
                .public_base_url
                .unwrap_or_else(|| text("PORTFOLIO_PUBLIC_BASE_URL", "http://localhost:3000"))
                .trim_end_matches('/')
                .to_string(),
            admin_email: optional("PORTFOLIO_ADMIN_EMAIL"),
            admin_password: optional("PORTFOLIO_ADMIN_PASSWORD"),
            projects_per_page: args.projects_per_page.unwrap_or(env_per_page),
            notification_ttl: Duration::from_millis(ttl_ms),
            max_upload_bytes,
        };

        if cfg.projects_per_page == 0 {
            bail!("projects_per_page must be at least 1");
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_without_env_or_args() {
        let cfg = AppConfig::merge(Args::default(), lookup(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.projects_per_page, 6);
        assert_eq!(cfg.notification_ttl, Duration::from_secs(3));
        assert_eq!(cfg.public_base_url, "http://localhost:3000");
        assert_eq!(cfg.admin_email, None);
    }

    #[test]
    fn args_override_env() {
        let args = Args::parse_from(["portfolio-admin", "--port", "8080", "--projects-per-page", "9"]);
        let cfg = AppConfig::merge(
            args,
            lookup(&[
                ("PORTFOLIO_PORT", "4000"),
                ("PORTFOLIO_HOST", "127.0.0.1"),
                ("PORTFOLIO_PUBLIC_BASE_URL", "https://rhakelino.dev/"),
                ("PORTFOLIO_ADMIN_EMAIL", "admin@example.com"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.projects_per_page, 9);
        assert_eq!(cfg.public_base_url, "https://rhakelino.dev");
        assert_eq!(cfg.admin_email.as_deref(), Some("admin@example.com"));
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = AppConfig::merge(Args::default(), lookup(&[("PORTFOLIO_PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORTFOLIO_PORT"));

        let err = AppConfig::merge(
            Args::default(),
            lookup(&[("PORTFOLIO_PROJECTS_PER_PAGE", "0")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("projects_per_page"));
    }
}
