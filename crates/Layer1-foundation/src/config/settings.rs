//! RepoMap Settings - 스캔/업데이트/저장 설정
//!
//! `<root>/.repomap/settings.json` 이 있으면 읽고, 없으면 기본값을 사용한다.
//! 모든 필드는 생략 가능하다.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 기본 상태 디렉토리 이름
pub const DEFAULT_STATE_DIR: &str = ".repomap";

/// 기본 맵 파일 이름
pub const DEFAULT_MAP_FILE: &str = "repo-map.json";

/// 설정 파일명
pub const SETTINGS_FILE: &str = "settings.json";

// ============================================================================
// RepoMap Settings (통합)
// ============================================================================

/// repomap 통합 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoMapSettings {
    /// AST 도구 설정
    pub tool: ToolSettings,

    /// 스캔 설정
    pub scan: ScanSettings,

    /// 증분 업데이트 설정
    pub update: UpdateSettings,

    /// 저장 위치 설정
    pub storage: StorageSettings,
}

impl RepoMapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로젝트 설정 로드 (파일이 없으면 기본값)
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let store = JsonStore::project(root, DEFAULT_STATE_DIR);
        match store.load_optional::<RepoMapSettings>(SETTINGS_FILE)? {
            Some(settings) => {
                debug!("Loaded settings from {}", store.file_path(SETTINGS_FILE).display());
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }
}

// ============================================================================
// Tool Settings
// ============================================================================

/// AST 도구 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    /// 탐색할 바이너리 이름 (순서대로)
    pub binaries: Vec<String>,

    /// 최소 요구 버전 (major.minor.patch)
    pub min_version: String,

    /// 쿼리 1회 타임아웃 (초)
    pub query_timeout_secs: u64,

    /// `--version` 확인 타임아웃 (초)
    pub version_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            binaries: vec!["ast-grep".into(), "sg".into()],
            min_version: "0.30.0".into(),
            query_timeout_secs: 60,
            version_timeout_secs: 10,
        }
    }
}

impl ToolSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }

    pub fn version_timeout(&self) -> Duration {
        Duration::from_secs(self.version_timeout_secs.max(1))
    }
}

// ============================================================================
// Scan Settings
// ============================================================================

/// 스캔 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanSettings {
    /// 한 번의 도구 호출에 넘기는 최대 파일 수
    pub batch_size: usize,

    /// 파일 단위 재시도 동시 실행 수
    pub concurrency: usize,

    /// 언어별 최대 파일 수 (None = 무제한)
    pub max_files_per_language: Option<usize>,

    /// 디렉토리 탐색 최대 깊이
    pub max_depth: usize,

    /// 탐색할 최대 엔트리 수
    pub max_walk_entries: usize,

    /// 제외 디렉토리 이름
    pub ignored_dirs: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            batch_size: 200,
            concurrency: 4,
            max_files_per_language: None,
            max_depth: 32,
            max_walk_entries: 200_000,
            ignored_dirs: [
                "node_modules",
                "target",
                "dist",
                "build",
                "out",
                "vendor",
                "third_party",
                "__pycache__",
                ".venv",
                "venv",
                "env",
                "coverage",
                ".next",
                ".nuxt",
                ".git",
                ".svn",
                ".hg",
                DEFAULT_STATE_DIR,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ScanSettings {
    /// 제외할 디렉토리인지 확인
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }
}

// ============================================================================
// Update Settings
// ============================================================================

/// 증분 업데이트 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSettings {
    /// 이 커밋 수 이상 뒤처지면 전체 재빌드 권장
    pub full_rebuild_threshold: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            full_rebuild_threshold: 100,
        }
    }
}

// ============================================================================
// Storage Settings
// ============================================================================

/// 저장 위치 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// 루트 기준 상태 디렉토리
    pub state_dir: String,

    /// 맵 파일 이름
    pub map_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            state_dir: DEFAULT_STATE_DIR.into(),
            map_file: DEFAULT_MAP_FILE.into(),
        }
    }
}
