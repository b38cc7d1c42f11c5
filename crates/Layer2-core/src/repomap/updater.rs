//! Updater - git diff 기반 증분 갱신
//!
//! 맵에 기록된 커밋부터 HEAD 까지 바뀐 파일만 다시 스캔해서
//! 기존 맵의 사본에 병합한다. 변경 범위를 알 수 없으면 추측하지 않고
//! `Error::UnknownDiff` 로 전체 재빌드를 요구한다.

use super::detector::{normalize_path, LanguageDetector};
use super::scanner::Scanner;
use super::tool::AstTool;
use super::types::RepoMap;
use crate::git::{ChangeSet, GitProvider};
use chrono::Utc;
use repomap_foundation::{Error, Result, ScanSettings, UpdateSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// Types
// ============================================================================

/// 증분 갱신으로 영향받은 파일
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    /// 다시 스캔하지 못해 맵에서 빠진 파일
    pub failed: Vec<String>,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.failed.is_empty()
    }
}

/// 증분 갱신 결과
#[derive(Debug, Clone)]
pub struct IncrementalUpdate {
    pub map: RepoMap,
    pub changes: ChangeSummary,
}

/// 맵이 뒤처진 이유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaleReason {
    CommitChanged,
    BranchChanged,
    UnknownDiff,
}

/// 신선도 보고
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staleness {
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StaleReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commits_behind: Option<u64>,
    pub suggest_full_rebuild: bool,
}

impl Staleness {
    pub fn fresh() -> Self {
        Self {
            stale: false,
            reason: None,
            commits_behind: None,
            suggest_full_rebuild: false,
        }
    }

    pub fn unknown_diff() -> Self {
        Self {
            stale: true,
            reason: Some(StaleReason::UnknownDiff),
            commits_behind: None,
            suggest_full_rebuild: true,
        }
    }
}

// ============================================================================
// Updater
// ============================================================================

/// 증분 갱신기
pub struct Updater {
    scanner: Scanner,
    git: Arc<dyn GitProvider>,
    scan: ScanSettings,
    update: UpdateSettings,
}

impl Updater {
    pub fn new(
        tool: Arc<dyn AstTool>,
        git: Arc<dyn GitProvider>,
        scan: ScanSettings,
        update: UpdateSettings,
    ) -> Self {
        Self {
            scanner: Scanner::new(tool, scan.clone()),
            git,
            scan,
            update,
        }
    }

    /// 기록된 커밋 이후 변경분만 반영한 새 맵 생성
    ///
    /// `existing` 은 건드리지 않는다.
    pub async fn incremental_update(
        &self,
        root: &Path,
        existing: &RepoMap,
    ) -> Result<IncrementalUpdate> {
        let (base, head, branch) = self.resolve_range(root, existing)?;

        let mut changes = if head == base {
            ChangeSummary::default()
        } else {
            let diff = self
                .git
                .changed_files_since(root, &base)
                .map_err(|e| Error::UnknownDiff(e.to_string()))?;
            debug!(
                "Diff {}..{}: +{} ~{} -{}",
                short(&base),
                short(&head),
                diff.added.len(),
                diff.modified.len(),
                diff.deleted.len()
            );
            let scannable = LanguageDetector::new(root, self.scan.clone())
                .scannable_files(self.scan.max_files_per_language);
            self.classify(existing, &diff, &scannable)
        };
        let to_scan: Vec<String> = changes
            .added
            .iter()
            .chain(changes.modified.iter())
            .cloned()
            .collect();

        let mut map = existing.clone();
        for path in &changes.deleted {
            map.remove_file(path);
        }

        if !to_scan.is_empty() {
            let output = self.scanner.scan_files(root, &to_scan).await?;
            for path in &output.failed {
                if map.remove_file(path) {
                    warn!("Dropping stale entry for {} (rescan failed)", path);
                }
            }
            changes.added.retain(|p| !output.failed.contains(p));
            changes.modified.retain(|p| !output.failed.contains(p));
            changes.failed = output.failed.clone();

            for (path, entry) in output.files {
                let deps = output.dependencies.get(&path).cloned().unwrap_or_default();
                map.insert_file(path, entry, deps);
            }
            map.project
                .languages
                .extend(output.languages.iter().map(|l| l.id().to_string()));
            map.stats.scan_duration_ms = output.duration_ms;
        }

        map.recompute_stats();
        map.git.commit = Some(head);
        map.git.branch = branch;
        map.updated = Utc::now();

        info!(
            "Incremental update: {} added, {} modified, {} deleted, {} failed",
            changes.added.len(),
            changes.modified.len(),
            changes.deleted.len(),
            changes.failed.len()
        );
        Ok(IncrementalUpdate { map, changes })
    }

    /// (기록된 커밋, HEAD, 현재 브랜치)
    fn resolve_range(
        &self,
        root: &Path,
        existing: &RepoMap,
    ) -> Result<(String, String, Option<String>)> {
        if !self.git.is_repository(root) {
            return Err(Error::UnknownDiff(format!(
                "{} is not a git repository",
                root.display()
            )));
        }
        let Some(base) = existing.git.commit.clone() else {
            return Err(Error::UnknownDiff("map has no recorded commit".into()));
        };
        if !self.git.commit_exists(root, &base) {
            return Err(Error::UnknownDiff(format!(
                "recorded commit {} is not in history",
                short(&base)
            )));
        }
        let head = self
            .git
            .current_commit(root)
            .map_err(|e| Error::UnknownDiff(e.to_string()))?;
        let branch = self.git.current_branch(root).ok().flatten();
        Ok((base, head, branch))
    }

    /// git 변경을 맵 기준으로 분류
    ///
    /// `scannable` 은 전체 재빌드가 지금 트리에서 스캔할 파일 집합이다.
    /// 여기에 없는 경로는 추가하지 않고, 맵에 있던 경로라면 삭제로 본다
    /// (파일이 사라졌거나 새로 ignore 됨).
    fn classify(
        &self,
        existing: &RepoMap,
        diff: &ChangeSet,
        scannable: &BTreeSet<String>,
    ) -> ChangeSummary {
        let mut added = BTreeSet::new();
        let mut modified = BTreeSet::new();
        let mut deleted = BTreeSet::new();

        for path in diff.deleted.iter().map(|p| normalize_path(p)) {
            if existing.files.contains_key(&path) {
                deleted.insert(path);
            }
        }

        for path in diff
            .added
            .iter()
            .chain(diff.modified.iter())
            .map(|p| normalize_path(p))
        {
            if scannable.contains(&path) {
                deleted.remove(&path);
                if existing.files.contains_key(&path) {
                    modified.insert(path);
                } else {
                    added.insert(path);
                }
            } else if existing.files.contains_key(&path) {
                deleted.insert(path);
            }
        }

        // 언어별 상한이 있으면 상한 밖으로 밀려난 기존 파일도 뺀다
        if self.scan.max_files_per_language.is_some() {
            for path in existing.files.keys() {
                if !scannable.contains(path) {
                    deleted.insert(path.clone());
                }
            }
        }

        ChangeSummary {
            added: added.into_iter().collect(),
            modified: modified.into_iter().collect(),
            deleted: deleted.into_iter().collect(),
            failed: Vec::new(),
        }
    }

    /// 맵이 현재 작업 트리보다 뒤처졌는지 확인
    pub fn check_staleness(&self, root: &Path, map: &RepoMap) -> Staleness {
        if !self.git.is_repository(root) {
            return Staleness::unknown_diff();
        }
        let Some(base) = map.git.commit.as_deref() else {
            return Staleness::unknown_diff();
        };
        let Ok(head) = self.git.current_commit(root) else {
            return Staleness::unknown_diff();
        };
        let branch = self.git.current_branch(root).ok().flatten();

        let branch_changed = match (&map.git.branch, &branch) {
            (Some(recorded), Some(current)) => recorded != current,
            _ => false,
        };

        if head == base && !branch_changed {
            return Staleness::fresh();
        }
        if !self.git.commit_exists(root, base) {
            return Staleness::unknown_diff();
        }

        let commits_behind = if head == base {
            Some(0)
        } else {
            self.git.commits_since(root, base).ok()
        };

        if branch_changed {
            return Staleness {
                stale: true,
                reason: Some(StaleReason::BranchChanged),
                commits_behind,
                suggest_full_rebuild: true,
            };
        }

        match commits_behind {
            Some(behind) => Staleness {
                stale: true,
                reason: Some(StaleReason::CommitChanged),
                commits_behind: Some(behind),
                suggest_full_rebuild: behind > self.update.full_rebuild_threshold,
            },
            None => Staleness::unknown_diff(),
        }
    }
}

fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitError;
    use crate::repomap::language::Language;
    use crate::repomap::tool::{AstMatch, ToolError, ToolInstallation};
    use crate::repomap::types::{FileEntry, FileSymbols, Symbol};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// 모든 파일에 `scanned` 함수 하나를 돌려주는 도구
    #[derive(Default)]
    struct OneSymbolTool {
        broken: HashSet<String>,
        fatal: bool,
    }

    #[async_trait]
    impl AstTool for OneSymbolTool {
        async fn is_installed(&self) -> ToolInstallation {
            ToolInstallation::found(Some("0.30.1".into()), None)
        }

        async fn run_query(
            &self,
            _root: &Path,
            _dialect: &str,
            pattern: &str,
            _selector: Option<&str>,
            paths: &[String],
        ) -> std::result::Result<Vec<AstMatch>, ToolError> {
            if self.fatal {
                return Err(ToolError::NotInstalled("ast-grep".into()));
            }
            if paths.iter().any(|p| self.broken.contains(p)) {
                return Err(ToolError::Timeout(std::time::Duration::from_secs(1)));
            }
            if pattern != "function $NAME($$$ARGS) { $$$BODY }" {
                return Ok(Vec::new());
            }
            Ok(paths
                .iter()
                .map(|p| AstMatch {
                    file: p.clone(),
                    text: "function scanned() {}".into(),
                    line: 1,
                    column: 1,
                    captures: [("NAME".to_string(), "scanned".to_string())].into(),
                })
                .collect())
        }
    }

    struct FakeGit {
        repo: bool,
        head: String,
        branch: Option<String>,
        known: HashSet<String>,
        changes: ChangeSet,
        behind: u64,
        diff_calls: Mutex<usize>,
    }

    impl FakeGit {
        fn new(head: &str) -> Self {
            Self {
                repo: true,
                head: head.into(),
                branch: Some("main".into()),
                known: HashSet::from(["base".to_string(), head.to_string()]),
                changes: ChangeSet::default(),
                behind: 1,
                diff_calls: Mutex::new(0),
            }
        }
    }

    impl GitProvider for FakeGit {
        fn is_repository(&self, _root: &Path) -> bool {
            self.repo
        }
        fn current_commit(&self, _root: &Path) -> std::result::Result<String, GitError> {
            Ok(self.head.clone())
        }
        fn current_branch(&self, _root: &Path) -> std::result::Result<Option<String>, GitError> {
            Ok(self.branch.clone())
        }
        fn changed_files_since(
            &self,
            _root: &Path,
            _commit: &str,
        ) -> std::result::Result<ChangeSet, GitError> {
            *self.diff_calls.lock().unwrap() += 1;
            Ok(self.changes.clone())
        }
        fn commit_exists(&self, _root: &Path, commit: &str) -> bool {
            self.known.contains(commit)
        }
        fn commits_since(&self, _root: &Path, _commit: &str) -> std::result::Result<u64, GitError> {
            Ok(self.behind)
        }
    }

    fn entry(name: &str) -> FileEntry {
        let mut symbols = FileSymbols::default();
        symbols.functions.push(Symbol::new(name, 1, 1));
        FileEntry::new(symbols)
    }

    fn base_map() -> RepoMap {
        let mut map = RepoMap::new();
        map.insert_file("src/c.ts", entry("old"), vec!["./x".into()]);
        map.insert_file("src/d.ts", entry("gone"), vec!["./y".into()]);
        map.insert_file("src/e.ts", entry("kept"), vec![]);
        map.project.languages.insert("typescript".into());
        map.git.commit = Some("base".into());
        map.git.branch = Some("main".into());
        map.stats.scan_duration_ms = 77;
        map.recompute_stats();
        map
    }

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x").unwrap();
    }

    fn updater(tool: OneSymbolTool, git: FakeGit) -> Updater {
        Updater::new(
            Arc::new(tool),
            Arc::new(git),
            ScanSettings::default(),
            UpdateSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_incremental_add_modify_delete() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["src/a.ts", "src/b.ts", "src/c.ts", "src/e.ts"] {
            write(dir.path(), f);
        }
        let mut git = FakeGit::new("head");
        git.changes = ChangeSet {
            added: vec!["src/a.ts".into(), "src/b.ts".into(), "README.md".into()],
            modified: vec!["src/c.ts".into()],
            deleted: vec!["src/d.ts".into()],
        };

        let existing = base_map();
        let result = updater(OneSymbolTool::default(), git)
            .incremental_update(dir.path(), &existing)
            .await
            .unwrap();
        let map = result.map;

        let files: Vec<&str> = map.files.keys().map(|k| k.as_str()).collect();
        assert_eq!(files, vec!["src/a.ts", "src/b.ts", "src/c.ts", "src/e.ts"]);
        assert_eq!(map.files["src/c.ts"].symbols.functions[0].name, "scanned");
        assert_eq!(map.files["src/e.ts"], existing.files["src/e.ts"]);
        assert!(!map.dependencies.contains_key("src/d.ts"));
        // rescanned c.ts has no imports any more
        assert!(!map.dependencies.contains_key("src/c.ts"));
        assert_eq!(map.stats.total_symbols, map.count_symbols());
        assert_eq!(map.git.commit.as_deref(), Some("head"));

        assert_eq!(result.changes.added, vec!["src/a.ts", "src/b.ts"]);
        assert_eq!(result.changes.modified, vec!["src/c.ts"]);
        assert_eq!(result.changes.deleted, vec!["src/d.ts"]);

        // caller's map untouched
        assert_eq!(existing.files.len(), 3);
    }

    #[tokio::test]
    async fn test_incremental_matches_full_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "generated/\n").unwrap();
        write(dir.path(), "src/c.ts");

        let tool = Arc::new(OneSymbolTool::default());
        let scanner = Scanner::new(tool.clone(), ScanSettings::default());
        let languages = BTreeSet::from([Language::TypeScript, Language::JavaScript]);
        let mut existing = scanner.full_scan(dir.path(), &languages, None).await.unwrap();
        existing.git.commit = Some("base".into());

        let new_files = ["src/e.ts", "generated/out.ts", ".eslintrc.js", "node_modules/x/index.js"];
        for f in new_files {
            write(dir.path(), f);
        }
        let mut git = FakeGit::new("head");
        git.changes = ChangeSet {
            added: new_files.iter().map(|f| f.to_string()).collect(),
            modified: vec!["src/c.ts".into()],
            deleted: vec![],
        };

        let updater = Updater::new(
            tool.clone(),
            Arc::new(git),
            ScanSettings::default(),
            UpdateSettings::default(),
        );
        let result = updater.incremental_update(dir.path(), &existing).await.unwrap();
        let rebuilt = scanner.full_scan(dir.path(), &languages, None).await.unwrap();

        assert_eq!(result.map.files, rebuilt.files);
        assert_eq!(result.map.dependencies, rebuilt.dependencies);
        assert_eq!(result.changes.added, vec!["src/e.ts"]);
        assert_eq!(result.changes.modified, vec!["src/c.ts"]);
    }

    #[tokio::test]
    async fn test_newly_ignored_file_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/c.ts");
        std::fs::write(dir.path().join(".gitignore"), "src/c.ts\n").unwrap();
        let mut git = FakeGit::new("head");
        git.changes.modified = vec!["src/c.ts".into()];

        let result = updater(OneSymbolTool::default(), git)
            .incremental_update(dir.path(), &base_map())
            .await
            .unwrap();
        assert!(!result.map.files.contains_key("src/c.ts"));
        assert_eq!(result.changes.deleted, vec!["src/c.ts"]);
    }

    #[tokio::test]
    async fn test_cap_prunes_files_pushed_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["src/a.ts", "src/c.ts", "src/e.ts"] {
            write(dir.path(), f);
        }
        let mut git = FakeGit::new("head");
        git.changes.added = vec!["src/a.ts".into()];
        let settings = ScanSettings {
            max_files_per_language: Some(2),
            ..Default::default()
        };
        let updater = Updater::new(
            Arc::new(OneSymbolTool::default()),
            Arc::new(git),
            settings,
            UpdateSettings::default(),
        );

        let mut existing = base_map();
        existing.remove_file("src/d.ts");
        let result = updater.incremental_update(dir.path(), &existing).await.unwrap();

        let files: Vec<&str> = result.map.files.keys().map(|k| k.as_str()).collect();
        assert_eq!(files, vec!["src/a.ts", "src/c.ts"]);
        assert_eq!(result.changes.added, vec!["src/a.ts"]);
        assert_eq!(result.changes.deleted, vec!["src/e.ts"]);
    }

    #[tokio::test]
    async fn test_modified_but_missing_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let mut git = FakeGit::new("head");
        git.changes.modified = vec!["src/c.ts".into()];

        let result = updater(OneSymbolTool::default(), git)
            .incremental_update(dir.path(), &base_map())
            .await
            .unwrap();
        assert!(!result.map.files.contains_key("src/c.ts"));
        assert_eq!(result.changes.deleted, vec!["src/c.ts"]);
    }

    #[tokio::test]
    async fn test_modified_unknown_file_is_added() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "lib/new.py");
        let mut git = FakeGit::new("head");
        git.changes.modified = vec!["lib/new.py".into()];

        let result = updater(OneSymbolTool::default(), git)
            .incremental_update(dir.path(), &base_map())
            .await
            .unwrap();
        assert_eq!(result.changes.added, vec!["lib/new.py"]);
        assert!(result.map.files.contains_key("lib/new.py"));
        // language set only widens
        assert!(result.map.project.languages.contains("python"));
        assert!(result.map.project.languages.contains("typescript"));
    }

    #[tokio::test]
    async fn test_failed_rescan_drops_stale_entry() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/c.ts");
        let mut git = FakeGit::new("head");
        git.changes.modified = vec!["src/c.ts".into()];
        let tool = OneSymbolTool {
            broken: HashSet::from(["src/c.ts".to_string()]),
            ..Default::default()
        };

        let result = updater(tool, git)
            .incremental_update(dir.path(), &base_map())
            .await
            .unwrap();
        assert!(!result.map.files.contains_key("src/c.ts"));
        assert!(!result.map.dependencies.contains_key("src/c.ts"));
        assert_eq!(result.changes.failed, vec!["src/c.ts"]);
        assert!(result.changes.modified.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_tool_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/c.ts");
        let mut git = FakeGit::new("head");
        git.changes.modified = vec!["src/c.ts".into()];
        let tool = OneSymbolTool {
            fatal: true,
            ..Default::default()
        };

        let err = updater(tool, git)
            .incremental_update(dir.path(), &base_map())
            .await
            .unwrap_err();
        assert!(err.is_tool_missing());
    }

    #[tokio::test]
    async fn test_same_commit_changes_only_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let git = FakeGit::new("base");
        let existing = base_map();

        let updater = updater(OneSymbolTool::default(), git);
        let result = updater
            .incremental_update(dir.path(), &existing)
            .await
            .unwrap();

        let mut expected = existing.clone();
        expected.updated = result.map.updated;
        assert_eq!(result.map, expected);
        assert!(result.changes.is_empty());
        assert_eq!(result.map.stats.scan_duration_ms, 77);
    }

    #[tokio::test]
    async fn test_unknown_diff_conditions() {
        let dir = tempfile::tempdir().unwrap();

        let mut git = FakeGit::new("head");
        git.repo = false;
        let err = updater(OneSymbolTool::default(), git)
            .incremental_update(dir.path(), &base_map())
            .await
            .unwrap_err();
        assert!(err.requires_full_rebuild());

        let mut map = base_map();
        map.git.commit = None;
        let err = updater(OneSymbolTool::default(), FakeGit::new("head"))
            .incremental_update(dir.path(), &map)
            .await
            .unwrap_err();
        assert!(err.requires_full_rebuild());

        let mut map = base_map();
        map.git.commit = Some("rewritten".into());
        let err = updater(OneSymbolTool::default(), FakeGit::new("head"))
            .incremental_update(dir.path(), &map)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDiff(_)));
    }

    #[test]
    fn test_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let map = base_map();

        let fresh = updater(OneSymbolTool::default(), FakeGit::new("base"));
        assert_eq!(fresh.check_staleness(dir.path(), &map), Staleness::fresh());

        let mut git = FakeGit::new("head");
        git.behind = 3;
        let stale = updater(OneSymbolTool::default(), git).check_staleness(dir.path(), &map);
        assert!(stale.stale);
        assert_eq!(stale.reason, Some(StaleReason::CommitChanged));
        assert_eq!(stale.commits_behind, Some(3));
        assert!(!stale.suggest_full_rebuild);

        let mut git = FakeGit::new("head");
        git.behind = 500;
        let far = updater(OneSymbolTool::default(), git).check_staleness(dir.path(), &map);
        assert!(far.suggest_full_rebuild);

        let mut git = FakeGit::new("base");
        git.branch = Some("feature".into());
        let switched = updater(OneSymbolTool::default(), git).check_staleness(dir.path(), &map);
        assert_eq!(switched.reason, Some(StaleReason::BranchChanged));
        assert!(switched.suggest_full_rebuild);

        let mut git = FakeGit::new("head");
        git.repo = false;
        let unknown = updater(OneSymbolTool::default(), git).check_staleness(dir.path(), &map);
        assert_eq!(unknown, Staleness::unknown_diff());
    }

    #[test]
    fn test_stale_reason_wire_format() {
        let value = serde_json::to_value(Staleness::unknown_diff()).unwrap();
        assert_eq!(value["reason"], "unknown-diff");
        assert_eq!(value["suggestFullRebuild"], true);
        assert!(value.get("commitsBehind").is_none());
    }
}
