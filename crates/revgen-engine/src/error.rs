use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Db(#[from] revgen_db::DbError),

    #[error("generation error: {0}")]
    Ai(#[from] revgen_ai::AiError),

    #[error("settings error: {0}")]
    Settings(#[from] revgen_core::SettingsError),
}
