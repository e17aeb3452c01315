//! Runtime configuration
//!
//! All knobs come from the environment with workable defaults, read once at
//! startup into a `Config` that is injected everywhere.

use std::time::Duration;

/// A ticket category offered in the creation flow.
///
/// `backend_id` is the ticketing backend's category id for this label and is
/// site-specific; adjust the table below to match the target installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub label: &'static str,
    pub backend_id: u32,
}

/// Categories presented to the user, in menu order (1-based).
pub const CATEGORIES: &[Category] = &[
    Category { label: "Software", backend_id: 35 },
    Category { label: "E-mail & accounts", backend_id: 9 },
    Category { label: "Network & internet", backend_id: 42 },
    Category { label: "Printers", backend_id: 78 },
    Category { label: "Hardware", backend_id: 15 },
    Category { label: "Mobile devices", backend_id: 80 },
    Category { label: "Access management", backend_id: 8 },
    Category { label: "General question", backend_id: 3 },
    Category { label: "Other", backend_id: 85 },
];

/// Backend numeric ticket status at and above which a ticket is no longer
/// considered open (5 = solved, 6 = closed).
pub const STATUS_SOLVED: i64 = 5;

/// Backend numeric status written when the user closes a ticket.
pub const STATUS_CLOSED: i64 = 6;

/// Human label for a backend numeric ticket status.
pub fn status_label(status: i64) -> &'static str {
    match status {
        1 => "New",
        2 => "In progress (assigned)",
        3 => "In progress (planned)",
        4 => "Pending",
        5 => "Solved",
        6 => "Closed",
        _ => "Unknown",
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the ticketing backend REST API.
    pub backend_url: String,
    /// Application token for the ticketing backend.
    pub app_token: String,
    /// User token used to open backend sessions.
    pub user_token: String,
    /// Port the webhook ingress listens on.
    pub webhook_port: u16,
    /// Path of the persisted user-to-address mapping.
    pub address_book_path: String,
    /// Inactivity window after which a session is force-terminated.
    pub inactivity: Duration,
    /// Maximum accepted ticket title length, in characters.
    pub title_max: usize,
    /// Minimum accepted ticket description length, in characters (after trim).
    pub description_min: usize,
    /// Window during which a self-caused update notification is suppressed.
    pub suppression_cooldown: Duration,
    /// Delay before a received update notification is processed.
    pub webhook_delay: Duration,
    /// Link offered by the procedures menu entry.
    pub kb_url: String,
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            backend_url: env_or("HELPDESK_BACKEND_URL", "http://localhost/apirest.php"),
            app_token: env_or("HELPDESK_APP_TOKEN", ""),
            user_token: env_or("HELPDESK_USER_TOKEN", ""),
            webhook_port: env_parse("HELPDESK_WEBHOOK_PORT", 3000),
            address_book_path: env_or("HELPDESK_ADDRESS_BOOK_PATH", "./user_addresses.json"),
            inactivity: Duration::from_secs(60 * env_parse("HELPDESK_INACTIVITY_MINUTES", 5u64)),
            title_max: env_parse("HELPDESK_TITLE_MAX", 70),
            description_min: env_parse("HELPDESK_DESCRIPTION_MIN", 20),
            suppression_cooldown: Duration::from_secs(env_parse(
                "HELPDESK_SUPPRESSION_COOLDOWN_SECS",
                30u64,
            )),
            webhook_delay: Duration::from_secs(env_parse("HELPDESK_WEBHOOK_DELAY_SECS", 7u64)),
            kb_url: env_or("HELPDESK_KB_URL", "https://example.com/it-procedures"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
