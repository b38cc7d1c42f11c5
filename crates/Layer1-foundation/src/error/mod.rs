//! Error types for repomap
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// repomap 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No repo map found at {0}. Run init first.")]
    MapNotFound(String),

    #[error("Repo map already exists at {0}. Use force to rebuild or run update to refresh.")]
    MapExists(String),

    // ========================================================================
    // AST 도구 관련
    // ========================================================================
    #[error("AST tool not installed: {0}")]
    ToolNotInstalled(String),

    #[error("AST tool version {found} is older than required {required}")]
    ToolVersion { found: String, required: String },

    #[error("AST tool error: {0}")]
    Tool(String),

    // ========================================================================
    // Git / 스캔 관련
    // ========================================================================
    #[error("Git error: {0}")]
    Git(String),

    #[error("Cannot compute changes since the recorded commit: {0}")]
    UnknownDiff(String),

    #[error("No supported languages detected in {0}")]
    NoLanguages(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자 조치가 필요한 사전조건 에러인지 확인 (재시도 안 함)
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::ToolNotInstalled(_)
                | Error::ToolVersion { .. }
                | Error::NoLanguages(_)
                | Error::MapNotFound(_)
                | Error::MapExists(_)
        )
    }

    /// AST 도구 설치/버전 문제인지 확인
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, Error::ToolNotInstalled(_) | Error::ToolVersion { .. })
    }

    /// 전체 재빌드로만 복구 가능한 에러인지 확인
    pub fn requires_full_rebuild(&self) -> bool {
        matches!(self, Error::UnknownDiff(_))
    }

    /// 버전 에러 생성 헬퍼
    pub fn tool_version(found: impl Into<String>, required: impl Into<String>) -> Self {
        Error::ToolVersion {
            found: found.into(),
            required: required.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
