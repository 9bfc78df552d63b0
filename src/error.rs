use thiserror::Error;

/// 对账引擎错误
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// 引用的流水/分录/匹配不存在, 或流水缺少银行账户
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// 存储层错误, 原样上抛, 不重试
    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
