//! repomap-core: 저장소 심볼 맵 엔진
//!
//! Layer2 - 스캔/저장/갱신/조회 레이어
//!
//! # 주요 모듈
//!
//! - `repomap`: 언어 감지, AST 도구 어댑터, 스캐너, 캐시, 증분 갱신, evidence 검색
//! - `git`: git 조회 (HEAD, 브랜치, 변경 파일)
//!
//! # 사용 예시
//!
//! ```ignore
//! use repomap_core::{RepoMapper, InitOptions, EvidenceOptions};
//! use repomap_foundation::RepoMapSettings;
//!
//! let root = std::path::Path::new(".");
//! let mapper = RepoMapper::with_defaults(RepoMapSettings::load(root)?);
//!
//! // 맵 생성
//! let outcome = mapper.init(root, &InitOptions::default()).await;
//!
//! // 검색
//! let report = mapper.find_evidence(root, &["login".into()], &EvidenceOptions::default());
//! ```

// Core modules
pub mod git;
pub mod repomap;

// Re-exports: Git
pub use git::{ChangeSet, GitCli, GitError, GitProvider};

// Re-exports: Repo Map
pub use repomap::{
    AstGrepCli, AstMatch, AstTool, CacheStatus, CacheStore, ChangeSummary, DriftSummary,
    EvidenceOptions, EvidenceReport, FeatureEvidenceReport, FileEntry, FileSymbols, InitOptions,
    InitOutcome, InstallCheck, Installer, Language, LanguageDetector, Location, RepoMap,
    RepoMapper, ScanOutput, Scanner, StaleReason, Staleness, StatusReport, SummaryOptions, Symbol,
    SymbolCategory, ToolError, ToolInstallation, UpdateOptions, UpdateOutcome, Updater,
};
