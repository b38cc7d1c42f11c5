//! Git Operations
//!
//! 맵 갱신에 필요한 최소한의 git 조회를 shell 명령으로 수행한다.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Git command failed: {0}")]
    CommandFailed(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GitError> for repomap_foundation::Error {
    fn from(e: GitError) -> Self {
        repomap_foundation::Error::Git(e.to_string())
    }
}

// ============================================================================
// Change Set
// ============================================================================

/// 두 커밋 사이에 바뀐 파일 (루트 기준 상대 경로)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

/// `git diff --name-status -z` 출력 파싱
///
/// rename/copy 는 `--no-renames` 로 꺼져 있어야 하지만, 들어오면
/// 원본 삭제 + 대상 추가로 취급한다.
pub fn parse_name_status(output: &str) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut tokens = output.split('\0').filter(|t| !t.is_empty());

    while let Some(status) = tokens.next() {
        let status = status.trim();
        let Some(kind) = status.chars().next() else {
            continue;
        };
        match kind {
            'R' | 'C' => {
                let (Some(from), Some(to)) = (tokens.next(), tokens.next()) else {
                    break;
                };
                if kind == 'R' {
                    changes.deleted.push(from.to_string());
                }
                changes.added.push(to.to_string());
            }
            _ => {
                let Some(path) = tokens.next() else {
                    break;
                };
                let path = path.to_string();
                match kind {
                    'A' => changes.added.push(path),
                    'D' => changes.deleted.push(path),
                    // M, T (type change), U (unmerged) 등
                    _ => changes.modified.push(path),
                }
            }
        }
    }
    changes
}

// ============================================================================
// Git Provider
// ============================================================================

/// 맵 갱신이 사용하는 git 조회 인터페이스
pub trait GitProvider: Send + Sync {
    /// git 저장소 안인지 확인
    fn is_repository(&self, root: &Path) -> bool;

    /// HEAD 커밋 해시
    fn current_commit(&self, root: &Path) -> Result<String, GitError>;

    /// 현재 브랜치 (detached HEAD 면 None)
    fn current_branch(&self, root: &Path) -> Result<Option<String>, GitError>;

    /// `commit..HEAD` 사이의 변경 파일
    fn changed_files_since(&self, root: &Path, commit: &str) -> Result<ChangeSet, GitError>;

    /// 커밋이 히스토리에 존재하는지
    fn commit_exists(&self, root: &Path, commit: &str) -> bool;

    /// `commit..HEAD` 커밋 수
    fn commits_since(&self, root: &Path, commit: &str) -> Result<u64, GitError>;
}

/// `git` CLI 구현
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    /// Find the git repository root
    fn find_git_root(path: &Path) -> Result<PathBuf, GitError> {
        let mut current = if path.is_file() {
            path.parent().unwrap_or(path).to_path_buf()
        } else {
            path.to_path_buf()
        };

        loop {
            if current.join(".git").exists() {
                return Ok(current);
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                return Err(GitError::NotARepository(path.to_path_buf()));
            }
        }
    }

    /// Run a git command
    fn run_git(&self, root: &Path, args: &[&str]) -> Result<String, GitError> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git").args(args).current_dir(root).output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(GitError::CommandFailed(stderr.trim().to_string()))
        }
    }
}

impl GitProvider for GitCli {
    fn is_repository(&self, root: &Path) -> bool {
        Self::find_git_root(root).is_ok()
    }

    fn current_commit(&self, root: &Path) -> Result<String, GitError> {
        Self::find_git_root(root)?;
        self.run_git(root, &["rev-parse", "HEAD"])
    }

    fn current_branch(&self, root: &Path) -> Result<Option<String>, GitError> {
        Self::find_git_root(root)?;
        let branch = self.run_git(root, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok((!branch.is_empty() && branch != "HEAD").then_some(branch))
    }

    fn changed_files_since(&self, root: &Path, commit: &str) -> Result<ChangeSet, GitError> {
        Self::find_git_root(root)?;
        if !self.commit_exists(root, commit) {
            return Err(GitError::CommitNotFound(commit.to_string()));
        }
        // --relative: root 가 저장소 하위 디렉토리여도 root 기준 경로
        let output = self.run_git(
            root,
            &[
                "diff",
                "--name-status",
                "--no-renames",
                "--relative",
                "-z",
                commit,
                "HEAD",
            ],
        )?;
        Ok(parse_name_status(&output))
    }

    fn commit_exists(&self, root: &Path, commit: &str) -> bool {
        let spec = format!("{}^{{commit}}", commit);
        self.run_git(root, &["cat-file", "-e", &spec]).is_ok()
    }

    fn commits_since(&self, root: &Path, commit: &str) -> Result<u64, GitError> {
        let range = format!("{}..HEAD", commit);
        let count = self.run_git(root, &["rev-list", "--count", &range])?;
        count
            .parse()
            .map_err(|_| GitError::CommandFailed(format!("unexpected rev-list output: {}", count)))
    }
}

// ============================================================================
// Tests
// ============================================================================
