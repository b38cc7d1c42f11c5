//! RepoMapper - 저장소 심볼 맵 공개 API
//!
//! 도구와 git 구현을 명시적으로 주입받는다. 맵은 호출마다 root 기준으로
//! 디스크에서 읽으며 프로세스 전역 상태는 없다.
//!
//! ```text
//! init:    Cache.exists → Installer → Detector → Scanner → git → Cache.save
//! update:  Installer → Cache.load → Updater (diff → 부분 스캔) → Cache.save
//! 읽기:    Cache.load → summary / evidence (맵 변경 없음)
//! ```

use super::cache::{CacheStatus, CacheStore};
use super::detector::LanguageDetector;
use super::evidence::{self, EvidenceReport, FeatureEvidenceReport};
use super::installer::Installer;
use super::language::Language;
use super::options::{clamp_limit, EvidenceOptions, InitOptions, SummaryOptions, UpdateOptions};
use super::scanner::Scanner;
use super::summary::{self, DriftSummary};
use super::tool::{AstGrepCli, AstTool};
use super::types::{GitInfo, RepoMap};
use super::updater::{ChangeSummary, Staleness, Updater};
use crate::git::{GitCli, GitProvider};
use repomap_foundation::{Error, RepoMapSettings, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// Outcomes
// ============================================================================

/// init 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<RepoMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_suggestion: Option<String>,
}

/// update 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<RepoMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staleness: Option<Staleness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_suggestion: Option<String>,
}

/// status 상세
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    #[serde(flatten)]
    pub cache: CacheStatus,
    pub staleness: Staleness,
}

/// status 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusDetails>,
}

// ============================================================================
// RepoMapper
// ============================================================================

/// 저장소 심볼 맵 파사드
pub struct RepoMapper {
    tool: Arc<dyn AstTool>,
    git: Arc<dyn GitProvider>,
    settings: RepoMapSettings,
}

impl RepoMapper {
    pub fn new(
        tool: Arc<dyn AstTool>,
        git: Arc<dyn GitProvider>,
        settings: RepoMapSettings,
    ) -> Self {
        Self {
            tool,
            git,
            settings,
        }
    }

    /// ast-grep CLI + git CLI 구현 사용
    pub fn with_defaults(settings: RepoMapSettings) -> Self {
        let tool = Arc::new(AstGrepCli::new(settings.tool.clone()));
        Self::new(tool, Arc::new(GitCli::new()), settings)
    }

    pub fn settings(&self) -> &RepoMapSettings {
        &self.settings
    }

    fn cache(&self) -> CacheStore {
        CacheStore::new(self.settings.storage.clone())
    }

    fn installer(&self) -> Installer {
        Installer::new(self.tool.clone(), &self.settings.tool)
    }

    fn scanner(&self) -> Scanner {
        Scanner::new(self.tool.clone(), self.settings.scan.clone())
    }

    fn updater(&self) -> Updater {
        Updater::new(
            self.tool.clone(),
            self.git.clone(),
            self.settings.scan.clone(),
            self.settings.update.clone(),
        )
    }

    // ========================================================================
    // init
    // ========================================================================

    /// 맵 새로 생성
    pub async fn init(&self, root: &Path, options: &InitOptions) -> InitOutcome {
        match self.try_init(root, options).await {
            Ok(map) => InitOutcome {
                success: true,
                map: Some(map),
                error: None,
                install_suggestion: None,
            },
            Err(e) => {
                warn!("init failed: {}", e);
                InitOutcome {
                    success: false,
                    map: None,
                    install_suggestion: self.suggestion_for(&e),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_init(&self, root: &Path, options: &InitOptions) -> Result<RepoMap> {
        let cache = self.cache();
        if cache.exists(root) && !options.force {
            return Err(Error::MapExists(cache.map_path(root).display().to_string()));
        }
        self.installer().ensure_ready().await?;

        let languages = match options.languages.as_deref() {
            Some(ids) if !ids.is_empty() => parse_languages(ids)?,
            _ => self.detect_languages(root),
        };
        if languages.is_empty() {
            return Err(Error::NoLanguages(root.display().to_string()));
        }

        let max_files = options
            .max_files_per_language
            .map(|n| clamp_limit(Some(n), 0))
            .or(self.settings.scan.max_files_per_language);

        let mut map = self.full_build(root, &languages, max_files).await?;
        cache.save(root, &mut map)?;
        info!(
            "Repo map created: {} files, {} symbols",
            map.file_count(),
            map.stats.total_symbols
        );
        Ok(map)
    }

    fn detect_languages(&self, root: &Path) -> BTreeSet<Language> {
        LanguageDetector::new(root, self.settings.scan.clone()).detect()
    }

    async fn full_build(
        &self,
        root: &Path,
        languages: &BTreeSet<Language>,
        max_files: Option<usize>,
    ) -> Result<RepoMap> {
        let mut map = self.scanner().full_scan(root, languages, max_files).await?;
        map.git = self.git_info(root);
        Ok(map)
    }

    fn git_info(&self, root: &Path) -> GitInfo {
        if !self.git.is_repository(root) {
            return GitInfo::default();
        }
        GitInfo {
            commit: self.git.current_commit(root).ok(),
            branch: self.git.current_branch(root).ok().flatten(),
        }
    }

    // ========================================================================
    // update
    // ========================================================================

    /// 맵 갱신 (기본은 증분)
    pub async fn update(&self, root: &Path, options: &UpdateOptions) -> UpdateOutcome {
        match self.try_update(root, options).await {
            Ok((map, changes)) => {
                let staleness = self.updater().check_staleness(root, &map);
                UpdateOutcome {
                    success: true,
                    map: Some(map),
                    error: None,
                    changes,
                    staleness: Some(staleness),
                    install_suggestion: None,
                }
            }
            Err(e) => {
                warn!("update failed: {}", e);
                let (error, staleness) = if e.requires_full_rebuild() {
                    (
                        format!("{}. Run a full update to rebuild the map.", e),
                        Some(Staleness::unknown_diff()),
                    )
                } else {
                    (e.to_string(), None)
                };
                UpdateOutcome {
                    success: false,
                    map: None,
                    install_suggestion: self.suggestion_for(&e),
                    error: Some(error),
                    changes: None,
                    staleness,
                }
            }
        }
    }

    async fn try_update(
        &self,
        root: &Path,
        options: &UpdateOptions,
    ) -> Result<(RepoMap, Option<ChangeSummary>)> {
        self.installer().ensure_ready().await?;
        let cache = self.cache();
        let existing = cache.load(root);

        if options.full {
            let languages = self.detect_languages(root);
            if languages.is_empty() {
                return Err(Error::NoLanguages(root.display().to_string()));
            }
            let mut map = self
                .full_build(root, &languages, self.settings.scan.max_files_per_language)
                .await?;
            if let Some(previous) = &existing {
                map.generated = previous.generated;
            }
            cache.save(root, &mut map)?;
            info!("Repo map rebuilt: {} files", map.file_count());
            return Ok((map, None));
        }

        let Some(existing) = existing else {
            return Err(Error::MapNotFound(cache.map_path(root).display().to_string()));
        };
        let result = self.updater().incremental_update(root, &existing).await?;
        let mut map = result.map;
        cache.save(root, &mut map)?;
        Ok((map, Some(result.changes)))
    }

    fn suggestion_for(&self, e: &Error) -> Option<String> {
        e.is_tool_missing()
            .then(|| self.installer().install_instructions())
    }

    // ========================================================================
    // 읽기 전용
    // ========================================================================

    /// 저장된 맵 상태
    pub fn status(&self, root: &Path) -> StatusReport {
        let cache = self.cache();
        let status = cache.load(root).map(|map| StatusDetails {
            cache: CacheStatus::from_map(&map),
            staleness: self.updater().check_staleness(root, &map),
        });
        StatusReport {
            exists: cache.exists(root),
            status,
        }
    }

    /// drift 감지용 요약
    pub fn summarize_for_drift(&self, root: &Path, options: &SummaryOptions) -> DriftSummary {
        let Some(map) = self.cache().load(root) else {
            return DriftSummary::unavailable();
        };
        let staleness = options
            .limits()
            .include_staleness
            .then(|| self.updater().check_staleness(root, &map));
        summary::summarize(&map, options, staleness)
    }

    /// 검색어별 evidence
    pub fn find_evidence(
        &self,
        root: &Path,
        terms: &[String],
        options: &EvidenceOptions,
    ) -> EvidenceReport {
        let map = self.cache().load(root);
        evidence::find_evidence(map.as_ref(), terms, options)
    }

    /// 기능 설명별 evidence
    pub fn find_feature_evidence(
        &self,
        root: &Path,
        features: &[String],
        options: &EvidenceOptions,
    ) -> FeatureEvidenceReport {
        let map = self.cache().load(root);
        evidence::find_feature_evidence(map.as_ref(), features, options)
    }
}

/// 언어 ID 목록 파싱
fn parse_languages(ids: &[String]) -> Result<BTreeSet<Language>> {
    ids.iter()
        .map(|id| {
            Language::from_id(id)
                .ok_or_else(|| Error::InvalidInput(format!("unsupported language: {}", id)))
        })
        .collect()
}
