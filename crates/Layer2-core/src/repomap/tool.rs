//! AST Tool - 구조 검색 도구 추상화
//!
//! 코어는 `is_installed` / `run_query` 두 가지만 가정한다.
//! `AstGrepCli` 는 ast-grep CLI 를 subprocess 로 호출하는 기본 구현이다.

use async_trait::async_trait;
use regex::Regex;
use repomap_foundation::ToolSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

lazy_static::lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"\d+\.\d+\.\d+").unwrap();
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("AST tool binary not found: {0}")]
    NotInstalled(String),

    #[error("AST tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("AST tool exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Failed to parse AST tool output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// 재시도해도 소용없는 에러 (도구 자체가 사라짐)
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::NotInstalled(_))
    }
}

impl From<ToolError> for repomap_foundation::Error {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::NotInstalled(bin) => repomap_foundation::Error::ToolNotInstalled(bin),
            ToolError::Timeout(d) => {
                repomap_foundation::Error::Timeout(format!("AST query exceeded {:?}", d))
            }
            other => repomap_foundation::Error::Tool(other.to_string()),
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// 도구 설치 상태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInstallation {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ToolInstallation {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn found(version: Option<String>, path: Option<PathBuf>) -> Self {
        Self {
            found: true,
            version,
            path,
        }
    }
}

/// 도구 종류와 무관한 매치 레코드
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AstMatch {
    /// 파일 경로 (도구가 돌려준 그대로)
    pub file: String,
    /// 매치된 노드 전체 텍스트
    pub text: String,
    /// 1-based 라인
    pub line: u32,
    /// 1-based 컬럼
    pub column: u32,
    /// 메타변수 캡처 (`$NAME` -> "NAME")
    pub captures: HashMap<String, String>,
}

impl AstMatch {
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(|s| s.as_str())
    }
}

/// 구조 검색 도구 인터페이스
#[async_trait]
pub trait AstTool: Send + Sync {
    /// 설치 여부와 버전
    async fn is_installed(&self) -> ToolInstallation;

    /// `paths` (root 기준 상대 경로) 에 패턴 쿼리 실행
    ///
    /// `selector` 가 있으면 패턴은 파싱 문맥일 뿐이고, 그 안의 해당 종류
    /// 노드만 매치 대상이 된다 (예: 클래스 본문 안의 `field_declaration`).
    async fn run_query(
        &self,
        root: &Path,
        dialect: &str,
        pattern: &str,
        selector: Option<&str>,
        paths: &[String],
    ) -> Result<Vec<AstMatch>, ToolError>;
}

// ============================================================================
// ast-grep CLI
// ============================================================================

/// ast-grep CLI 구현
pub struct AstGrepCli {
    settings: ToolSettings,
    binary: OnceLock<Option<PathBuf>>,
}

impl AstGrepCli {
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            settings,
            binary: OnceLock::new(),
        }
    }

    /// 설정된 이름 순서대로 바이너리 탐색
    async fn locate(&self) -> Option<(PathBuf, String)> {
        for name in &self.settings.binaries {
            let Ok(path) = which::which(name) else {
                continue;
            };
            match self.version_output(&path).await {
                Some(output) => {
                    // Linux 의 `sg` 는 shadow-utils 의 setgroups 일 수 있다
                    if name == "sg" && !output.to_lowercase().contains("ast-grep") {
                        debug!("Ignoring {} (not ast-grep)", path.display());
                        continue;
                    }
                    return Some((path, output));
                }
                None => continue,
            }
        }
        None
    }

    async fn version_output(&self, path: &Path) -> Option<String> {
        let result = tokio::time::timeout(
            self.settings.version_timeout(),
            Command::new(path)
                .arg("--version")
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(Ok(_)) | Ok(Err(_)) => None,
            Err(_) => {
                debug!("{} --version timed out", path.display());
                None
            }
        }
    }

    fn cached_binary(&self) -> Option<PathBuf> {
        self.binary.get().cloned().flatten()
    }
}

#[async_trait]
impl AstTool for AstGrepCli {
    async fn is_installed(&self) -> ToolInstallation {
        match self.locate().await {
            Some((path, output)) => {
                let _ = self.binary.set(Some(path.clone()));
                ToolInstallation::found(extract_version(&output), Some(path))
            }
            None => ToolInstallation::missing(),
        }
    }

    async fn run_query(
        &self,
        root: &Path,
        dialect: &str,
        pattern: &str,
        selector: Option<&str>,
        paths: &[String],
    ) -> Result<Vec<AstMatch>, ToolError> {
        let binary = match self.cached_binary() {
            Some(path) => path,
            None => {
                let located = self.locate().await.map(|(p, _)| p);
                let _ = self.binary.set(located.clone());
                located.ok_or_else(|| ToolError::NotInstalled(self.settings.binaries.join("/")))?
            }
        };

        let mut cmd = Command::new(&binary);
        cmd.arg("run")
            .arg("--pattern")
            .arg(pattern)
            .arg("--lang")
            .arg(dialect)
            .arg("--json=compact");
        if let Some(kind) = selector {
            cmd.arg("--selector").arg(kind);
        }
        cmd.args(paths)
            .current_dir(root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = self.settings.query_timeout();
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotInstalled(binary.display().to_string()));
            }
            Ok(Err(e)) => return Err(ToolError::Io(e)),
            Err(_) => return Err(ToolError::Timeout(timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_ast_grep_json(&stdout) {
            Ok(matches) => Ok(matches),
            Err(parse_err) if output.status.success() => Err(parse_err),
            Err(_) => Err(ToolError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

// ============================================================================
// ast-grep JSON 출력
// ============================================================================

#[derive(Debug, Deserialize)]
struct SgMatch {
    file: String,
    text: String,
    range: SgRange,
    #[serde(default, rename = "metaVariables")]
    meta_variables: Option<SgMetaVariables>,
}

#[derive(Debug, Deserialize)]
struct SgRange {
    start: SgPosition,
}

#[derive(Debug, Deserialize)]
struct SgPosition {
    line: u32,
    column: u32,
}

#[derive(Debug, Default, Deserialize)]
struct SgMetaVariables {
    #[serde(default)]
    single: HashMap<String, SgCapture>,
    #[serde(default)]
    multi: HashMap<String, Vec<SgCapture>>,
}

#[derive(Debug, Deserialize)]
struct SgCapture {
    text: String,
}

/// ast-grep `--json` 출력 파싱 (0-based 위치를 1-based 로 변환)
pub fn parse_ast_grep_json(stdout: &str) -> Result<Vec<AstMatch>, ToolError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<SgMatch> =
        serde_json::from_str(trimmed).map_err(|e| ToolError::Parse(e.to_string()))?;

    Ok(raw
        .into_iter()
        .map(|m| {
            let mut captures = HashMap::new();
            if let Some(meta) = m.meta_variables {
                for (name, capture) in meta.single {
                    captures.insert(name, capture.text);
                }
                for (name, parts) in meta.multi {
                    let joined: Vec<String> = parts.into_iter().map(|p| p.text).collect();
                    captures.entry(name).or_insert_with(|| joined.join(""));
                }
            }
            AstMatch {
                file: m.file,
                text: m.text,
                line: m.range.start.line + 1,
                column: m.range.start.column + 1,
                captures,
            }
        })
        .collect())
}

/// 자유 형식 출력에서 `major.minor.patch` 추출
pub fn extract_version(output: &str) -> Option<String> {
    VERSION_RE.find(output).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ast_grep_json() {
        let json = r#"[
            {
                "text": "export function login(user) { return true }",
                "range": { "byteOffset": { "start": 0, "end": 10 },
                           "start": { "line": 4, "column": 0 },
                           "end": { "line": 4, "column": 44 } },
                "file": "./src/auth.ts",
                "lines": "export function login(user) { return true }",
                "language": "TypeScript",
                "metaVariables": {
                    "single": { "NAME": { "text": "login", "range": {} } },
                    "multi": { "ARGS": [ { "text": "user" } ] },
                    "transformed": {}
                }
            }
        ]"#;

        let matches = parse_ast_grep_json(json).unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.file, "./src/auth.ts");
        assert_eq!(m.line, 5);
        assert_eq!(m.column, 1);
        assert_eq!(m.capture("NAME"), Some("login"));
        assert_eq!(m.capture("ARGS"), Some("user"));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_ast_grep_json("").unwrap().is_empty());
        assert!(parse_ast_grep_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = parse_ast_grep_json("error: bad pattern").unwrap_err();
        assert!(matches!(err, ToolError::Parse(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_extract_version() {
        assert_eq!(extract_version("ast-grep 0.25.1"), Some("0.25.1".into()));
        assert_eq!(extract_version("sg 1.2.3-beta"), Some("1.2.3".into()));
        assert_eq!(extract_version("unknown"), None);
    }

    #[test]
    fn test_not_installed_is_fatal() {
        assert!(ToolError::NotInstalled("sg".into()).is_fatal());
        assert!(!ToolError::Timeout(Duration::from_secs(1)).is_fatal());
    }

    #[tokio::test]
    async fn test_missing_binaries_report_not_found() {
        let tool = AstGrepCli::new(ToolSettings {
            binaries: vec!["definitely-not-a-real-ast-tool-binary".into()],
            ..Default::default()
        });
        let installation = tool.is_installed().await;
        assert!(!installation.found);
        assert!(installation.version.is_none());

        let err = tool
            .run_query(Path::new("."), "rust", "fn $NAME() {}", None, &[])
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
