//! Repository Map 타입 정의
//!
//! 디스크에 저장되는 JSON 구조와 1:1로 대응한다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 심볼 종류 (저장 포맷의 카테고리 키)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolCategory {
    Export,
    Function,
    Class,
    Type,
    Constant,
}

impl SymbolCategory {
    /// 모든 카테고리 (저장 순서)
    pub const ALL: [SymbolCategory; 5] = [
        Self::Export,
        Self::Function,
        Self::Class,
        Self::Type,
        Self::Constant,
    ];

    /// JSON 키 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "exports",
            Self::Function => "functions",
            Self::Class => "classes",
            Self::Type => "types",
            Self::Constant => "constants",
        }
    }
}

/// 소스 위치 (1-based)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// 심볼 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// 심볼 이름
    pub name: String,
    /// 정의 위치
    pub location: Location,
}

impl Symbol {
    pub fn new(name: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            name: name.into(),
            location: Location::new(line, column),
        }
    }
}

/// 파일 하나의 카테고리별 심볼 목록
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSymbols {
    pub exports: Vec<Symbol>,
    pub functions: Vec<Symbol>,
    pub classes: Vec<Symbol>,
    pub types: Vec<Symbol>,
    pub constants: Vec<Symbol>,
}

impl FileSymbols {
    pub fn get(&self, category: SymbolCategory) -> &[Symbol] {
        match category {
            SymbolCategory::Export => &self.exports,
            SymbolCategory::Function => &self.functions,
            SymbolCategory::Class => &self.classes,
            SymbolCategory::Type => &self.types,
            SymbolCategory::Constant => &self.constants,
        }
    }

    pub fn get_mut(&mut self, category: SymbolCategory) -> &mut Vec<Symbol> {
        match category {
            SymbolCategory::Export => &mut self.exports,
            SymbolCategory::Function => &mut self.functions,
            SymbolCategory::Class => &mut self.classes,
            SymbolCategory::Type => &mut self.types,
            SymbolCategory::Constant => &mut self.constants,
        }
    }

    /// 모든 카테고리의 심볼 수 합계
    pub fn total(&self) -> usize {
        SymbolCategory::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// (카테고리, 심볼) 순회
    pub fn iter(&self) -> impl Iterator<Item = (SymbolCategory, &Symbol)> {
        SymbolCategory::ALL
            .into_iter()
            .flat_map(move |c| self.get(c).iter().map(move |s| (c, s)))
    }

    /// 각 카테고리를 `max`개로 자른 사본
    pub fn truncated(&self, max: usize) -> Self {
        let mut out = Self::default();
        for category in SymbolCategory::ALL {
            *out.get_mut(category) = self.get(category).iter().take(max).cloned().collect();
        }
        out
    }
}

/// 파일 엔트리
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub symbols: FileSymbols,
}

impl FileEntry {
    pub fn new(symbols: FileSymbols) -> Self {
        Self { symbols }
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.total()
    }
}

/// 맵이 반영하는 git 상태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub branch: Option<String>,
}

/// 프로젝트 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub languages: BTreeSet<String>,
}

/// 집계 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStats {
    pub total_symbols: u64,
    pub scan_duration_ms: u64,
}

/// Repository Map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMap {
    /// 최초 생성 시간
    pub generated: DateTime<Utc>,
    /// 마지막 갱신 시간
    pub updated: DateTime<Utc>,
    pub git: GitInfo,
    pub project: ProjectInfo,
    /// 상대 경로 -> 파일 엔트리
    pub files: BTreeMap<String, FileEntry>,
    /// 상대 경로 -> 임포트 대상
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub stats: RepoStats,
}

impl RepoMap {
    /// 빈 맵 생성
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            generated: now,
            updated: now,
            git: GitInfo::default(),
            project: ProjectInfo::default(),
            files: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            stats: RepoStats::default(),
        }
    }

    /// 파일 엔트리를 통째로 교체
    pub fn insert_file(&mut self, path: impl Into<String>, entry: FileEntry, deps: Vec<String>) {
        let path = path.into();
        if deps.is_empty() {
            self.dependencies.remove(&path);
        } else {
            self.dependencies.insert(path.clone(), deps);
        }
        self.files.insert(path, entry);
    }

    /// 파일 엔트리 제거 (존재했으면 true)
    pub fn remove_file(&mut self, path: &str) -> bool {
        self.dependencies.remove(path);
        self.files.remove(path).is_some()
    }

    /// 전체 심볼 수 계산
    pub fn count_symbols(&self) -> u64 {
        self.files.values().map(|f| f.symbol_count() as u64).sum()
    }

    /// `stats.totalSymbols` 재계산
    pub fn recompute_stats(&mut self) {
        self.stats.total_symbols = self.count_symbols();
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl Default for RepoMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(functions: &[&str]) -> FileEntry {
        let mut symbols = FileSymbols::default();
        for (i, name) in functions.iter().enumerate() {
            symbols.functions.push(Symbol::new(*name, i as u32 + 1, 1));
        }
        FileEntry::new(symbols)
    }

    #[test]
    fn test_category_keys() {
        let keys: Vec<&str> = SymbolCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(keys, vec!["exports", "functions", "classes", "types", "constants"]);
    }

    #[test]
    fn test_recompute_stats() {
        let mut map = RepoMap::new();
        map.insert_file("a.ts", entry(&["one", "two"]), vec![]);
        map.insert_file("b.ts", entry(&["three"]), vec!["./a".into()]);
        map.recompute_stats();

        assert_eq!(map.stats.total_symbols, 3);
        assert_eq!(map.dependencies.len(), 1);
    }

    #[test]
    fn test_insert_replaces_dependencies() {
        let mut map = RepoMap::new();
        map.insert_file("a.ts", entry(&[]), vec!["x".into()]);
        map.insert_file("a.ts", entry(&["f"]), vec![]);

        assert!(!map.dependencies.contains_key("a.ts"));
        assert_eq!(map.files["a.ts"].symbol_count(), 1);
    }

    #[test]
    fn test_remove_file() {
        let mut map = RepoMap::new();
        map.insert_file("a.ts", entry(&["f"]), vec!["x".into()]);

        assert!(map.remove_file("a.ts"));
        assert!(!map.remove_file("a.ts"));
        assert!(map.dependencies.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let mut map = RepoMap::new();
        map.insert_file("src/a.ts", entry(&["login"]), vec!["./b".into()]);
        map.project.languages.insert("typescript".into());
        map.recompute_stats();

        let value = serde_json::to_value(&map).unwrap();
        for key in ["generated", "updated", "git", "project", "files", "dependencies", "stats"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value["stats"]["totalSymbols"], 1);
        assert!(value["stats"].get("scanDurationMs").is_some());
        assert_eq!(
            value["files"]["src/a.ts"]["symbols"]["functions"][0]["name"],
            "login"
        );
        assert_eq!(value["project"]["languages"][0], "typescript");
    }

    #[test]
    fn test_truncated_symbols() {
        let symbols = entry(&["a", "b", "c"]).symbols;
        let cut = symbols.truncated(2);
        assert_eq!(cut.functions.len(), 2);
        assert_eq!(cut.total(), 2);
    }

    #[test]
    fn test_iter_order() {
        let mut symbols = FileSymbols::default();
        symbols.constants.push(Symbol::new("MAX", 1, 1));
        symbols.exports.push(Symbol::new("login", 2, 1));
        let order: Vec<SymbolCategory> = symbols.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec![SymbolCategory::Export, SymbolCategory::Constant]);
    }
}
