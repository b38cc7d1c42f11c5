//! Drift 요약 - 맵에서 제한된 크기의 개요 생성
//!
//! 맵 전체를 넘기지 않고 심볼이 많은 파일 위주로 잘라서 보여준다.
//! 잘린 경우에도 원래 개수를 함께 보고한다.

use super::language::Language;
use super::options::{SummaryLimits, SummaryOptions};
use super::types::{FileSymbols, GitInfo, RepoMap, RepoStats, SymbolCategory};
use super::updater::Staleness;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 언어 프로파일에 포함되기 위한 최소 비테스트 파일 수
const MIN_NON_TEST_FILES: usize = 5;

/// 언어 프로파일에 포함되기 위한 최소 비테스트 파일 비율
const MIN_NON_TEST_RATIO: f64 = 0.25;

const TEST_DIRS: [&str; 9] = [
    "test",
    "tests",
    "__tests__",
    "spec",
    "specs",
    "fixtures",
    "__mocks__",
    "testdata",
    "e2e",
];

// ============================================================================
// Types
// ============================================================================

/// 언어별 파일 수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageUsage {
    pub language: String,
    pub files: usize,
    pub non_test_files: usize,
}

/// 요약에 포함된 파일
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub path: String,
    /// 자르기 전 전체 심볼 수
    pub symbol_count: usize,
    /// 카테고리별 자르기 전 개수
    pub symbol_counts: BTreeMap<String, usize>,
    pub symbols: FileSymbols,
    pub dependencies: Vec<String>,
    /// 자르기 전 의존성 수
    pub dependency_count: usize,
}

/// drift 감지용 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftSummary {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<RepoStats>,
    #[serde(default)]
    pub total_files: usize,
    /// 비테스트 코드 기준 언어 프로파일
    #[serde(default)]
    pub languages: Vec<LanguageUsage>,
    #[serde(default)]
    pub files: Vec<FileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staleness: Option<Staleness>,
}

impl DriftSummary {
    /// 맵이 없을 때
    pub fn unavailable() -> Self {
        Self {
            available: false,
            generated: None,
            updated: None,
            git: None,
            stats: None,
            total_files: 0,
            languages: Vec::new(),
            files: Vec::new(),
            staleness: None,
        }
    }
}

// ============================================================================
// Summarize
// ============================================================================

/// 맵 요약 생성 (staleness 는 호출자가 계산해서 넘긴다)
pub fn summarize(
    map: &RepoMap,
    options: &SummaryOptions,
    staleness: Option<Staleness>,
) -> DriftSummary {
    let limits = options.limits();

    DriftSummary {
        available: true,
        generated: Some(map.generated),
        updated: Some(map.updated),
        git: Some(map.git.clone()),
        stats: Some(map.stats.clone()),
        total_files: map.file_count(),
        languages: language_profile(map.files.keys().map(|k| k.as_str())),
        files: top_files(map, &limits),
        staleness: if limits.include_staleness {
            staleness
        } else {
            None
        },
    }
}

/// 심볼 수 내림차순, 같으면 경로 오름차순
fn top_files(map: &RepoMap, limits: &SummaryLimits) -> Vec<FileSummary> {
    let mut ranked: Vec<(&String, usize)> = map
        .files
        .iter()
        .map(|(path, entry)| (path, entry.symbol_count()))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limits.max_files)
        .filter_map(|(path, count)| {
            let entry = map.files.get(path)?;
            let deps = map.dependencies.get(path).map(|d| d.as_slice()).unwrap_or(&[]);
            Some(FileSummary {
                path: path.clone(),
                symbol_count: count,
                symbol_counts: SymbolCategory::ALL
                    .iter()
                    .map(|c| (c.as_str().to_string(), entry.symbols.get(*c).len()))
                    .collect(),
                symbols: entry.symbols.truncated(limits.max_symbols_per_type),
                dependencies: deps
                    .iter()
                    .take(limits.max_dependencies_per_file)
                    .cloned()
                    .collect(),
                dependency_count: deps.len(),
            })
        })
        .collect()
}

/// 테스트 코드를 뺀 언어 프로파일
///
/// 비테스트 파일이 5개 이상이거나 전체의 25% 이상인 언어만 포함한다.
pub fn language_profile<'a>(paths: impl Iterator<Item = &'a str>) -> Vec<LanguageUsage> {
    let mut counts: BTreeMap<Language, (usize, usize)> = BTreeMap::new();
    for path in paths {
        let Some(lang) = Language::from_path(path) else {
            continue;
        };
        let slot = counts.entry(lang).or_default();
        slot.0 += 1;
        if !is_test_path(path) {
            slot.1 += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, (total, non_test))| {
            *non_test >= MIN_NON_TEST_FILES
                || (*total > 0 && *non_test as f64 / *total as f64 >= MIN_NON_TEST_RATIO)
        })
        .map(|(lang, (files, non_test_files))| LanguageUsage {
            language: lang.id().to_string(),
            files,
            non_test_files,
        })
        .collect()
}

/// 테스트/픽스처 경로인지 확인
pub fn is_test_path(path: &str) -> bool {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(name) = segments.pop() else {
        return false;
    };

    if segments
        .iter()
        .any(|s| TEST_DIRS.contains(&s.to_lowercase().as_str()))
    {
        return true;
    }

    name.contains(".test.")
        || name.contains(".spec.")
        || name.ends_with("_test.go")
        || (name.ends_with(".py") && (name.starts_with("test_") || name.ends_with("_test.py")))
        || name.ends_with("Test.java")
        || name.ends_with("Tests.java")
}
