//! Scanner - AST 도구로 심볼/임포트 추출
//!
//! 언어와 dialect 별로 파일을 배치로 묶어 구조 쿼리를 실행하고,
//! 결과를 `FileEntry` / 의존성 목록으로 정규화한다.
//!
//! 배치가 실패하면 같은 쿼리를 파일 단위로 재시도하고, 그래도 실패한
//! 파일만 결과에서 빠진다. 도구가 사라진 경우(`NotInstalled`)만 스캔 전체가
//! 실패한다.

use super::detector::{normalize_path, LanguageDetector};
use super::language::Language;
use super::queries::{
    dedup_preserving_order, is_identifier, parse_export_list, parse_imports, passes_filter,
    queries_for, DeclaredSymbol, ExportRule, NameFilter, QueryTarget,
};
use super::tool::{AstMatch, AstTool, ToolError};
use super::types::{FileEntry, FileSymbols, Location, RepoMap, Symbol, SymbolCategory};
use futures::stream::{self, StreamExt};
use repomap_foundation::{Result, ScanSettings};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

// ============================================================================
// Output
// ============================================================================

/// 파일 목록 스캔 결과
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    /// 성공한 파일 (심볼이 없어도 포함)
    pub files: BTreeMap<String, FileEntry>,
    /// 임포트가 있는 파일만
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// 성공한 파일이 하나라도 있는 언어
    pub languages: BTreeSet<Language>,
    /// 재시도 후에도 실패한 파일
    pub failed: Vec<String>,
    pub duration_ms: u64,
}

impl ScanOutput {
    pub fn symbol_count(&self) -> usize {
        self.files.values().map(|f| f.symbol_count()).sum()
    }

    fn merge(&mut self, other: ScanOutput) {
        self.files.extend(other.files);
        self.dependencies.extend(other.dependencies);
        self.languages.extend(other.languages);
        self.failed.extend(other.failed);
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// 구조 검색 기반 스캐너
pub struct Scanner {
    tool: Arc<dyn AstTool>,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(tool: Arc<dyn AstTool>, settings: ScanSettings) -> Self {
        Self { tool, settings }
    }

    /// 전체 스캔으로 새 맵 생성 (git 정보는 호출자가 채운다)
    pub async fn full_scan(
        &self,
        root: &Path,
        languages: &BTreeSet<Language>,
        max_files_per_language: Option<usize>,
    ) -> Result<RepoMap> {
        let started = Instant::now();
        let detector = LanguageDetector::new(root, self.settings.clone());
        let groups = detector.collect_files(languages, max_files_per_language);

        // 마커 파일로만 감지된 언어는 맵에 남기지 않는다
        let scanned_languages: BTreeSet<String> = groups
            .iter()
            .filter(|(_, files)| !files.is_empty())
            .map(|(lang, _)| lang.id().to_string())
            .collect();
        for lang in languages {
            if !scanned_languages.contains(lang.id()) {
                debug!("No {} files found, dropping language", lang);
            }
        }

        let total: usize = groups.values().map(|v| v.len()).sum();
        info!(
            "Scanning {} files across {} languages",
            total,
            groups.len()
        );

        let output = self.scan_groups(root, groups).await?;

        let mut map = RepoMap::new();
        map.project.languages = scanned_languages;
        map.files = output.files;
        map.dependencies = output.dependencies;
        map.recompute_stats();
        map.stats.scan_duration_ms = started.elapsed().as_millis() as u64;

        if !output.failed.is_empty() {
            warn!("{} files could not be scanned", output.failed.len());
        }
        info!(
            "Full scan complete: {} files, {} symbols in {}ms",
            map.file_count(),
            map.stats.total_symbols,
            map.stats.scan_duration_ms
        );
        Ok(map)
    }

    /// 지정한 파일만 스캔 (지원하지 않는 확장자는 무시)
    pub async fn scan_files(&self, root: &Path, paths: &[String]) -> Result<ScanOutput> {
        let started = Instant::now();
        let mut groups: BTreeMap<Language, Vec<String>> = BTreeMap::new();
        for path in paths {
            let key = normalize_path(path);
            match Language::from_path(&key) {
                Some(lang) => groups.entry(lang).or_default().push(key),
                None => debug!("Skipping unsupported file: {}", key),
            }
        }
        for list in groups.values_mut() {
            list.sort();
            list.dedup();
        }

        let mut output = self.scan_groups(root, groups).await?;
        output.duration_ms = started.elapsed().as_millis() as u64;
        Ok(output)
    }

    async fn scan_groups(
        &self,
        root: &Path,
        groups: BTreeMap<Language, Vec<String>>,
    ) -> Result<ScanOutput> {
        let mut output = ScanOutput::default();
        for (lang, files) in groups {
            let result = self.scan_language(root, lang, &files).await?;
            if result.files.is_empty() && !files.is_empty() {
                warn!(
                    "No {} files could be scanned; {} contributes zero symbols",
                    lang, lang
                );
            }
            output.merge(result);
        }
        output.failed.sort();
        Ok(output)
    }

    /// 한 언어의 파일을 dialect 별 배치로 스캔
    async fn scan_language(&self, root: &Path, lang: Language, files: &[String]) -> Result<ScanOutput> {
        let mut by_dialect: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for file in files {
            by_dialect
                .entry(lang.dialect_for(file))
                .or_default()
                .push(file.clone());
        }

        let rule = ExportRule::for_language(lang);
        let batch_size = self.settings.batch_size.max(1);
        let mut output = ScanOutput::default();

        for (dialect, paths) in by_dialect {
            for (i, batch) in paths.chunks(batch_size).enumerate() {
                debug!(
                    "{} [{}] batch {} ({} files)",
                    lang,
                    dialect,
                    i + 1,
                    batch.len()
                );
                let (accumulated, failed) = self.run_batch(root, lang, dialect, batch).await?;
                for (path, acc) in accumulated {
                    let (entry, deps) = acc.finish(rule);
                    if !deps.is_empty() {
                        output.dependencies.insert(path.clone(), deps);
                    }
                    output.files.insert(path, entry);
                    output.languages.insert(lang);
                }
                output.failed.extend(failed);
            }
        }
        Ok(output)
    }

    /// 배치 실행, 실패 시 파일 단위 재시도
    async fn run_batch(
        &self,
        root: &Path,
        lang: Language,
        dialect: &str,
        batch: &[String],
    ) -> Result<(BTreeMap<String, FileAccumulator>, Vec<String>)> {
        match self.query_paths(root, lang, dialect, batch).await {
            Ok(accumulated) => Ok((accumulated, Vec::new())),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) if batch.len() == 1 => {
                warn!("Skipping {}: {}", batch[0], e);
                Ok((BTreeMap::new(), batch.to_vec()))
            }
            Err(e) => {
                warn!(
                    "{} batch of {} files failed ({}), retrying per file",
                    lang,
                    batch.len(),
                    e
                );
                self.retry_per_file(root, lang, dialect, batch).await
            }
        }
    }

    async fn retry_per_file(
        &self,
        root: &Path,
        lang: Language,
        dialect: &str,
        batch: &[String],
    ) -> Result<(BTreeMap<String, FileAccumulator>, Vec<String>)> {
        let results: Vec<(String, std::result::Result<BTreeMap<String, FileAccumulator>, ToolError>)> =
            stream::iter(batch.iter().cloned())
                .map(|path| async move {
                    let single = std::slice::from_ref(&path);
                    let result = self.query_paths(root, lang, dialect, single).await;
                    (path, result)
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

        let mut accumulated = BTreeMap::new();
        let mut failed = Vec::new();
        for (path, result) in results {
            match result {
                Ok(files) => accumulated.extend(files),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    failed.push(path);
                }
            }
        }
        failed.sort();
        Ok((accumulated, failed))
    }

    /// 언어의 모든 쿼리를 `paths` 에 실행하고 파일별로 모은다
    async fn query_paths(
        &self,
        root: &Path,
        lang: Language,
        dialect: &str,
        paths: &[String],
    ) -> std::result::Result<BTreeMap<String, FileAccumulator>, ToolError> {
        let mut accumulated: BTreeMap<String, FileAccumulator> = paths
            .iter()
            .map(|p| (p.clone(), FileAccumulator::default()))
            .collect();

        for query in queries_for(lang) {
            let matches = self
                .tool
                .run_query(root, dialect, query.pattern, query.selector, paths)
                .await?;
            for m in matches {
                let key = normalize_path(&m.file);
                match accumulated.get_mut(&key) {
                    Some(acc) => acc.absorb(lang, query.target, query.filter, &m),
                    None => debug!("Ignoring match outside batch: {}", key),
                }
            }
        }
        Ok(accumulated)
    }
}

// ============================================================================
// 파일별 정규화
// ============================================================================

/// 한 파일의 쿼리 결과 모음
#[derive(Debug, Default)]
struct FileAccumulator {
    declared: Vec<DeclaredSymbol>,
    explicit_exports: Vec<Symbol>,
    listed_exports: Vec<Symbol>,
    imports: Vec<String>,
}

impl FileAccumulator {
    fn absorb(
        &mut self,
        lang: Language,
        target: QueryTarget,
        filter: NameFilter,
        m: &AstMatch,
    ) {
        match target {
            QueryTarget::Import => self.imports.extend(parse_imports(lang, m)),
            QueryTarget::ExportList => {
                for name in parse_export_list(lang, &m.text) {
                    self.listed_exports.push(Symbol::new(name, m.line, m.column));
                }
            }
            QueryTarget::Symbol(category) => {
                let Some(name) = m.capture("NAME").map(str::trim) else {
                    return;
                };
                if !is_identifier(name) || !passes_filter(filter, name, m.column) {
                    return;
                }
                let symbol = Symbol::new(name, m.line, m.column);
                if category == SymbolCategory::Export {
                    self.explicit_exports.push(symbol);
                } else {
                    self.declared.push(DeclaredSymbol {
                        category,
                        symbol,
                        text: m.text.clone(),
                    });
                }
            }
        }
    }

    fn finish(self, rule: ExportRule) -> (FileEntry, Vec<String>) {
        let mut symbols = FileSymbols::default();

        // `const f = () => ...` 는 함수로만 남긴다
        let function_sites: HashSet<(String, Location)> = self
            .declared
            .iter()
            .filter(|d| d.category == SymbolCategory::Function)
            .map(|d| (d.symbol.name.clone(), d.symbol.location))
            .collect();

        for declared in &self.declared {
            if declared.category == SymbolCategory::Constant
                && function_sites.contains(&(declared.symbol.name.clone(), declared.symbol.location))
            {
                continue;
            }
            symbols
                .get_mut(declared.category)
                .push(declared.symbol.clone());
        }

        let listed = self.resolve_listed(&self.listed_exports);
        symbols.exports = match rule {
            ExportRule::Explicit => {
                let mut exports = self.explicit_exports;
                exports.extend(listed);
                exports
            }
            ExportRule::DunderAll if !listed.is_empty() => listed,
            _ => rule.select(&self.declared),
        };

        for category in SymbolCategory::ALL {
            let list = symbols.get_mut(category);
            *list = sort_and_dedup(std::mem::take(list), category == SymbolCategory::Export);
        }

        let deps = dedup_preserving_order(
            self.imports
                .into_iter()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
        );
        (FileEntry::new(symbols), deps)
    }

    /// 목록 export 는 같은 이름의 선언 위치를 우선 사용
    fn resolve_listed(&self, listed: &[Symbol]) -> Vec<Symbol> {
        let declared_at: HashMap<&str, Location> = self
            .declared
            .iter()
            .rev()
            .map(|d| (d.symbol.name.as_str(), d.symbol.location))
            .collect();
        listed
            .iter()
            .map(|s| match declared_at.get(s.name.as_str()) {
                Some(loc) => Symbol {
                    name: s.name.clone(),
                    location: *loc,
                },
                None => s.clone(),
            })
            .collect()
    }
}

/// 위치순 정렬 후 (이름, 라인) 중복 제거. export 는 이름 기준으로 한 번만.
fn sort_and_dedup(mut symbols: Vec<Symbol>, unique_names: bool) -> Vec<Symbol> {
    symbols.sort_by(|a, b| a.location.cmp(&b.location).then_with(|| a.name.cmp(&b.name)));
    let mut seen_sites = HashSet::new();
    let mut seen_names = HashSet::new();
    symbols
        .into_iter()
        .filter(|s| seen_sites.insert((s.name.clone(), s.location.line)))
        .filter(|s| !unique_names || seen_names.insert(s.name.clone()))
        .collect()
}
