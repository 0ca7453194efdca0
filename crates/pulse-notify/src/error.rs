use pulse_db::DbError;

pub type Result<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("push client: {0}")]
    Http(#[from] reqwest::Error),
}
