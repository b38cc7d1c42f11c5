//! Language Detector - 저장소 언어 감지 및 소스 파일 수집
//!
//! `.gitignore` 를 존중하는 제한된 탐색으로 확장자를 세고,
//! 루트의 마커 파일(Cargo.toml, go.mod 등)로 보강한다.

use super::language::Language;
use repomap_foundation::ScanSettings;
use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 언어 감지기
pub struct LanguageDetector {
    /// 루트 경로
    root: PathBuf,
    /// 스캔 설정
    settings: ScanSettings,
}

impl LanguageDetector {
    pub fn new(root: impl Into<PathBuf>, settings: ScanSettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }

    /// 저장소에 존재하는 언어 감지
    ///
    /// 아무것도 인식하지 못하면 빈 집합을 반환한다.
    pub fn detect(&self) -> BTreeSet<Language> {
        let mut counts: BTreeMap<Language, usize> = BTreeMap::new();
        for path in self.walk() {
            if let Some(lang) = Language::from_path(&path) {
                *counts.entry(lang).or_default() += 1;
            }
        }
        debug!("Source file counts: {:?}", counts);

        let mut languages: BTreeSet<Language> = counts.into_keys().collect();
        languages.extend(self.detect_markers());
        languages
    }

    /// 루트 마커 파일로 언어 감지
    fn detect_markers(&self) -> BTreeSet<Language> {
        let has = |name: &str| self.root.join(name).is_file();
        Language::ALL
            .into_iter()
            .filter(|lang| match lang {
                // TS 프로젝트도 package.json 을 가지므로 tsconfig 가 없을 때만 JS 로 본다
                Language::JavaScript => has("package.json") && !has("tsconfig.json"),
                _ => lang.marker_files().iter().any(|m| has(m)),
            })
            .collect()
    }

    /// 언어별 소스 파일 수집 (정렬 후 언어별 상한 적용)
    pub fn collect_files(
        &self,
        languages: &BTreeSet<Language>,
        max_per_language: Option<usize>,
    ) -> BTreeMap<Language, Vec<String>> {
        let mut files: BTreeMap<Language, Vec<String>> = BTreeMap::new();
        for path in self.walk() {
            if let Some(lang) = Language::from_path(&path) {
                if languages.contains(&lang) {
                    files.entry(lang).or_default().push(path);
                }
            }
        }

        for list in files.values_mut() {
            list.sort();
            if let Some(max) = max_per_language {
                list.truncate(max);
            }
        }
        files
    }

    /// 전체 스캔이 포함할 모든 소스 파일 (언어별 상한 적용)
    ///
    /// 증분 갱신은 git 이 알려준 경로를 이 집합으로 거른다. 탐색 규칙
    /// (`.gitignore`, 숨김 파일, 깊이, 상한)이 전체 재빌드와 같아야
    /// 두 경로의 맵이 일치한다.
    pub fn scannable_files(&self, max_per_language: Option<usize>) -> BTreeSet<String> {
        let all: BTreeSet<Language> = Language::ALL.into_iter().collect();
        self.collect_files(&all, max_per_language)
            .into_values()
            .flatten()
            .collect()
    }

    /// 제한된 탐색으로 파일 상대 경로 수집
    fn walk(&self) -> Vec<String> {
        let ignored = self.settings.ignored_dirs.clone();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .require_git(false)
            .max_depth(Some(self.settings.max_depth))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !ignored.iter().any(|d| d == name.as_ref())
            })
            .build();

        let mut paths = Vec::new();
        for result in walker.take(self.settings.max_walk_entries) {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(rel) = relative_key(&self.root, entry.path()) {
                paths.push(rel);
            }
        }
        paths
    }
}

/// 루트 기준 상대 경로 키 (`/` 구분자)
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// 외부 도구/git 이 돌려준 경로를 맵 키 형식으로 정규화
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let mut rest = path.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_string()
}
