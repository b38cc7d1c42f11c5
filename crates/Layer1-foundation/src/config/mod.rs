//! Config - repomap 설정
//!
//! - `settings.rs` - RepoMapSettings (도구/스캔/업데이트/저장)

mod settings;

pub use settings::{
    RepoMapSettings, ScanSettings, StorageSettings, ToolSettings, UpdateSettings,
    DEFAULT_MAP_FILE, DEFAULT_STATE_DIR, SETTINGS_FILE,
};
