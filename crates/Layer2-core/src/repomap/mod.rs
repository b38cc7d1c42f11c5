//! Repository Map - 구조 검색 기반 저장소 심볼 맵
//!
//! 외부 AST 도구(ast-grep)로 파일별 심볼과 임포트를 추출해서
//! `<root>/.repomap/repo-map.json` 에 저장하고, git diff 로 증분 갱신한다.
//!
//! ## 구성
//! - `detector`: 언어 감지, 소스 파일 수집
//! - `tool` / `installer`: AST 도구 호출, 설치/버전 확인
//! - `queries` / `scanner`: 언어별 구조 쿼리, 배치 스캔과 정규화
//! - `cache`: 맵 JSON 저장/로드 (원자적 쓰기)
//! - `updater`: 증분 갱신, 신선도 확인
//! - `summary` / `evidence`: drift 요약, 용어/기능 evidence 검색
//! - `mapper`: 공개 API (`RepoMapper`)
//!
//! ## 지원 언어
//! - JavaScript, TypeScript, Python, Rust, Go, Java

mod cache;
mod detector;
mod evidence;
mod installer;
mod language;
mod mapper;
mod options;
mod queries;
mod scanner;
mod summary;
mod tool;
mod types;
mod updater;

pub use cache::{CacheStatus, CacheStore};
pub use detector::{normalize_path, relative_key, LanguageDetector};
pub use evidence::{
    feature_keywords, find_evidence, find_feature_evidence, normalize_term, EvidenceIndex,
    EvidenceMatch, EvidenceReport, FeatureEvidence, FeatureEvidenceReport, TermEvidence,
};
pub use installer::{InstallCheck, Installer, ToolVersion};
pub use language::Language;
pub use mapper::{InitOutcome, RepoMapper, StatusDetails, StatusReport, UpdateOutcome};
pub use options::{
    clamp_limit, EvidenceLimits, EvidenceOptions, InitOptions, SummaryLimits, SummaryOptions,
    UpdateOptions,
};
pub use queries::{queries_for, ExportRule, QueryTarget, StructuralQuery};
pub use scanner::{ScanOutput, Scanner};
pub use summary::{
    is_test_path, language_profile, summarize, DriftSummary, FileSummary, LanguageUsage,
};
pub use tool::{
    extract_version, parse_ast_grep_json, AstGrepCli, AstMatch, AstTool, ToolError,
    ToolInstallation,
};
pub use types::{
    FileEntry, FileSymbols, GitInfo, Location, ProjectInfo, RepoMap, RepoStats, Symbol,
    SymbolCategory,
};
pub use updater::{ChangeSummary, IncrementalUpdate, StaleReason, Staleness, Updater};
