use thiserror::Error;

/// NGINX Plus API 中表示路径不存在的错误码
pub const PATH_NOT_FOUND_CODE: &str = "PathNotFound";

/// NGINX Plus API 返回的结构化错误
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub text: String,
    pub code: String,
    pub request_id: Option<String>,
    pub href: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "error.status={}; error.text={}; error.code={}; request_id={}; href={}",
            self.status,
            self.text,
            self.code,
            self.request_id.as_deref().unwrap_or(""),
            self.href.as_deref().unwrap_or("")
        )
    }
}

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("传输错误: {0}")]
    Transport(String),

    #[error("{context}: 期望响应码 {expected}，实际 {status}，响应体无法解析: {body}")]
    HttpStatus {
        context: String,
        expected: u16,
        status: u16,
        body: String,
    },

    #[error("{context}: {error}")]
    Api { context: String, error: ApiError },

    #[error("stub_status 解析失败: {0}")]
    Parse(String),

    #[error("响应解析失败: {0}")]
    InvalidResponse(String),

    #[error("客户端 API 版本 {required} 不被 NGINX Plus 支持，可用版本: {available:?}")]
    UnsupportedVersion { required: u32, available: Vec<u32> },

    #[error("创建客户端失败，已尝试 {attempts} 次: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    #[error("服务器 {server} 已存在于 upstream {upstream}")]
    ServerExists { upstream: String, server: String },

    #[error("服务器 {server} 不存在于 upstream {upstream}")]
    ServerNotFound { upstream: String, server: String },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 应用程序Result类型别名
pub type AppResult<T> = Result<T, AppError>;

/// 错误构造辅助函数
impl AppError {
    pub fn transport<T: Into<String>>(msg: T) -> Self {
        Self::Transport(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_response<T: Into<String>>(msg: T) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    /// 为错误附加操作上下文，保留结构化的 API 错误信息
    pub fn context<T: Into<String>>(self, ctx: T) -> Self {
        let ctx = ctx.into();
        match self {
            Self::Transport(msg) => Self::Transport(format!("{}: {}", ctx, msg)),
            Self::HttpStatus {
                context,
                expected,
                status,
                body,
            } => Self::HttpStatus {
                context: format!("{}: {}", ctx, context),
                expected,
                status,
                body,
            },
            Self::Api { context, error } => Self::Api {
                context: format!("{}: {}", ctx, context),
                error,
            },
            Self::InvalidResponse(msg) => Self::InvalidResponse(format!("{}: {}", ctx, msg)),
            other => other,
        }
    }

    /// 结构化 API 错误码（如果有）
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { error, .. } => Some(error.code.as_str()),
            _ => None,
        }
    }

    /// 是否为 "PathNotFound" 错误，用于可选的统计子资源
    pub fn is_path_not_found(&self) -> bool {
        self.api_code() == Some(PATH_NOT_FOUND_CODE)
    }
}
