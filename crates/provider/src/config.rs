//! §6.3: `DATABASE_URL` classification.
//!
//! Adapter construction is out of scope for the core — callers owning an
//! adapter crate match on [`ProviderKind`] to build the concrete
//! [`crate::Provider`]. The core itself only constructs the `Memory` arm.

use std::env;

/// The backend a `DATABASE_URL` value (or its absence) selects, per the
/// table in §6.3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Filesystem { path: String },
    Sqlite { path: String },
    LibSql { url: String },
    ChDb { path: String },
    ClickHouse {
        host: String,
        port: u16,
        db: String,
    },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Memory
    }
}

impl ProviderConfig {
    /// Read `DATABASE_URL` from the environment and classify it. Absent the
    /// variable, resolves to a filesystem provider rooted at `.`.
    pub fn from_env() -> Self {
        match env::var("DATABASE_URL") {
            Ok(url) => Self::parse(&url),
            Err(_) => ProviderConfig {
                kind: ProviderKind::Filesystem {
                    path: ".".to_string(),
                },
            },
        }
    }

    /// Classify a `DATABASE_URL` value per the table in §6.3. Never fails —
    /// an unrecognized scheme falls back to treating the whole string as a
    /// filesystem path, and the caller's provider-construction step is
    /// responsible for falling back further to the in-memory provider on
    /// load failure (logged via `tracing::warn!`, per §6.3).
    pub fn parse(url: &str) -> Self {
        let kind = if url == ":memory:" {
            ProviderKind::Memory
        } else if let Some(rest) = url.strip_prefix("sqlite://") {
            ProviderKind::Sqlite {
                path: rest.to_string(),
            }
        } else if url.starts_with("libsql://") {
            ProviderKind::LibSql {
                url: url.to_string(),
            }
        } else if let Some(rest) = url.strip_prefix("chdb://") {
            ProviderKind::ChDb {
                path: rest.to_string(),
            }
        } else if let Some(rest) = url.strip_prefix("clickhouse://") {
            parse_clickhouse(rest)
        } else {
            ProviderKind::Filesystem {
                path: url.to_string(),
            }
        };
        ProviderConfig { kind }
    }
}

fn parse_clickhouse(rest: &str) -> ProviderKind {
    let (host_port, db) = rest.split_once('/').unwrap_or((rest, ""));
    let (host, port) = host_port
        .split_once(':')
        .map(|(h, p)| (h, p.parse::<u16>().unwrap_or(8123)))
        .unwrap_or((host_port, 8123));
    ProviderKind::ClickHouse {
        host: host.to_string(),
        port,
        db: db.to_string(),
    }
}
