use recruitctl_server::db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("discord returned {status} for {path}")]
    Discord { status: u16, path: String },

    #[error("webhook returned {status}")]
    Webhook { status: u16 },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("bot is not configured: {0} is missing")]
    Config(&'static str),
}

pub type Result<T> = std::result::Result<T, BotError>;
