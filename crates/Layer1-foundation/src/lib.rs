//! # repomap-foundation
//!
//! Foundation layer for repomap:
//! - Error: 공통 에러 타입과 Result
//! - Storage: JsonStore (원자적 JSON 저장/로드)
//! - Config: RepoMapSettings (도구, 스캔, 업데이트, 저장 위치)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  repomap-cli (repomap binary)               │
//! │                     │                       │
//! │                     ▼                       │
//! │  repomap-core (RepoMapper, Scanner, ...)    │
//! │                     │                       │
//! │          ┌──────────┴──────────┐            │
//! │          ▼                     ▼            │
//! │   RepoMapSettings          JsonStore        │
//! │   (.repomap/settings)  (.repomap/*.json)    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    RepoMapSettings, ScanSettings, StorageSettings, ToolSettings, UpdateSettings,
    DEFAULT_MAP_FILE, DEFAULT_STATE_DIR, SETTINGS_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
