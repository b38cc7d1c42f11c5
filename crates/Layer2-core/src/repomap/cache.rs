//! Cache Store - 맵 JSON 파일 관리
//!
//! 위치는 `<root>/<stateDir>/<mapFile>` (기본 `.repomap/repo-map.json`).
//! 파일을 쓰는 것은 이 모듈뿐이다.

use super::types::RepoMap;
use chrono::{DateTime, Utc};
use repomap_foundation::{JsonStore, Result, StorageSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 맵 파일의 필수 최상위 키
const REQUIRED_KEYS: [&str; 7] = [
    "generated",
    "updated",
    "git",
    "project",
    "files",
    "dependencies",
    "stats",
];

/// 저장된 맵 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub generated: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub commit: Option<String>,
    pub branch: Option<String>,
    pub files: usize,
    pub symbols: u64,
    pub languages: BTreeSet<String>,
}

impl CacheStatus {
    pub fn from_map(map: &RepoMap) -> Self {
        Self {
            generated: map.generated,
            updated: map.updated,
            commit: map.git.commit.clone(),
            branch: map.git.branch.clone(),
            files: map.file_count(),
            symbols: map.stats.total_symbols,
            languages: map.project.languages.clone(),
        }
    }
}

/// 맵 캐시 저장소
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    settings: StorageSettings,
}

impl CacheStore {
    pub fn new(settings: StorageSettings) -> Self {
        Self { settings }
    }

    fn store(&self, root: &Path) -> JsonStore {
        JsonStore::project(root, &self.settings.state_dir)
    }

    /// 맵 파일 경로
    pub fn map_path(&self, root: &Path) -> PathBuf {
        self.store(root).file_path(&self.settings.map_file)
    }

    pub fn exists(&self, root: &Path) -> bool {
        self.store(root).exists(&self.settings.map_file)
    }

    /// 맵 로드
    ///
    /// 파일이 없거나 깨졌으면 None (깨진 경우 경고 로그)
    pub fn load(&self, root: &Path) -> Option<RepoMap> {
        let store = self.store(root);
        let value = match store.load_optional::<serde_json::Value>(&self.settings.map_file) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!("Ignoring unreadable repo map: {}", e);
                return None;
            }
        };

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| value.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            warn!(
                "Ignoring repo map at {}: missing keys {:?}",
                self.map_path(root).display(),
                missing
            );
            return None;
        }

        match serde_json::from_value::<RepoMap>(value) {
            Ok(map) => Some(map),
            Err(e) => {
                warn!(
                    "Ignoring invalid repo map at {}: {}",
                    self.map_path(root).display(),
                    e
                );
                None
            }
        }
    }

    /// 맵 저장 (통계 재계산 후 원자적 쓰기)
    pub fn save(&self, root: &Path, map: &mut RepoMap) -> Result<()> {
        map.recompute_stats();
        self.store(root).save(&self.settings.map_file, map)?;
        debug!(
            "Saved repo map ({} files, {} symbols) to {}",
            map.file_count(),
            map.stats.total_symbols,
            self.map_path(root).display()
        );
        Ok(())
    }

    /// 저장된 맵 요약
    pub fn status(&self, root: &Path) -> Option<CacheStatus> {
        self.load(root).map(|map| CacheStatus::from_map(&map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repomap::types::{FileEntry, FileSymbols, Symbol};

    fn sample_map() -> RepoMap {
        let mut map = RepoMap::new();
        let mut symbols = FileSymbols::default();
        symbols.exports.push(Symbol::new("login", 1, 1));
        symbols.functions.push(Symbol::new("login", 1, 8));
        map.insert_file("src/auth.ts", FileEntry::new(symbols), vec!["./db".into()]);
        map.insert_file("src/empty.ts", FileEntry::default(), vec![]);
        map.project.languages.insert("typescript".into());
        map.git.commit = Some("abc123".into());
        map.git.branch = Some("main".into());
        map.stats.scan_duration_ms = 42;
        map
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::default();
        let mut map = sample_map();

        assert!(!cache.exists(dir.path()));
        cache.save(dir.path(), &mut map).unwrap();
        assert!(cache.exists(dir.path()));
        assert_eq!(map.stats.total_symbols, 2);

        let loaded = cache.load(dir.path()).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn test_map_path_location() {
        let cache = CacheStore::default();
        let path = cache.map_path(Path::new("/repo"));
        assert_eq!(path, PathBuf::from("/repo/.repomap/repo-map.json"));
    }

    #[test]
    fn test_save_recomputes_stats() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::default();
        let mut map = sample_map();
        map.stats.total_symbols = 999;

        cache.save(dir.path(), &mut map).unwrap();
        assert_eq!(cache.load(dir.path()).unwrap().stats.total_symbols, 2);
    }

    #[test]
    fn test_missing_map_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::default();
        assert!(cache.load(dir.path()).is_none());
        assert!(cache.status(dir.path()).is_none());
    }

    #[test]
    fn test_corrupt_map_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::default();
        let path = cache.map_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        std::fs::write(&path, "{ not json").unwrap();
        assert!(cache.load(dir.path()).is_none());

        // valid JSON, but structurally incomplete
        std::fs::write(&path, r#"{ "files": {}, "stats": {} }"#).unwrap();
        assert!(cache.load(dir.path()).is_none());
        assert!(cache.exists(dir.path()));
    }

    #[test]
    fn test_status() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::default();
        cache.save(dir.path(), &mut sample_map()).unwrap();

        let status = cache.status(dir.path()).unwrap();
        assert_eq!(status.files, 2);
        assert_eq!(status.symbols, 2);
        assert_eq!(status.commit.as_deref(), Some("abc123"));
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert!(status.languages.contains("typescript"));
    }

    #[test]
    fn test_custom_storage_settings() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(StorageSettings {
            state_dir: ".cache/map".into(),
            map_file: "symbols.json".into(),
        });
        cache.save(dir.path(), &mut sample_map()).unwrap();
        assert!(dir.path().join(".cache/map/symbols.json").is_file());
    }
}
