//! 지원 언어 정의
//!
//! 확장자, 마커 파일, AST 도구 dialect 매핑을 한 곳에서 관리한다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// 스캔 가능한 언어
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
    Go,
    Java,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Self::JavaScript,
        Self::TypeScript,
        Self::Python,
        Self::Rust,
        Self::Go,
        Self::Java,
    ];

    /// 저장 포맷에 쓰는 언어 ID
    pub fn id(&self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Java => "java",
        }
    }

    /// 언어 ID 파싱 (별칭 허용)
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "javascript" | "js" | "jsx" => Some(Self::JavaScript),
            "typescript" | "ts" | "tsx" => Some(Self::TypeScript),
            "python" | "py" => Some(Self::Python),
            "rust" | "rs" => Some(Self::Rust),
            "go" | "golang" => Some(Self::Go),
            "java" => Some(Self::Java),
            _ => None,
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Self::TypeScript => &["ts", "tsx", "mts", "cts"],
            Self::Python => &["py", "pyi"],
            Self::Rust => &["rs"],
            Self::Go => &["go"],
            Self::Java => &["java"],
        }
    }

    /// 루트에 있으면 해당 언어 프로젝트로 보는 파일들
    pub fn marker_files(&self) -> &'static [&'static str] {
        match self {
            Self::JavaScript => &["package.json"],
            Self::TypeScript => &["tsconfig.json"],
            Self::Python => &["pyproject.toml", "setup.py", "requirements.txt"],
            Self::Rust => &["Cargo.toml"],
            Self::Go => &["go.mod"],
            Self::Java => &["pom.xml", "build.gradle", "build.gradle.kts"],
        }
    }

    /// 경로로 언어 판별 (소스 파일이 아니면 None)
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".min.js") || name.ends_with(".d.ts") {
            return None;
        }
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext))
    }

    /// 파일에 사용할 AST 도구 dialect
    pub fn dialect_for(&self, path: &str) -> &'static str {
        match self {
            Self::TypeScript if path.ends_with(".tsx") => "tsx",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
