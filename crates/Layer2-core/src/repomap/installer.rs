//! Installer Adapter - AST 도구 설치/버전 확인
//!
//! 조회만 하고 아무것도 설치하지 않는다. 실패는 재시도 없이
//! 호출자에게 사전조건 에러로 전달된다.

use super::tool::{AstTool, ToolInstallation};
use repomap_foundation::{Error, Result, ToolSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 도구 버전 (major.minor.patch 순서로 비교)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// 버전 문자열 파싱 (예: "0.25.1", "ast-grep 0.25.1", "v1.2")
    pub fn parse(s: &str) -> Option<Self> {
        let start = s.find(|c: char| c.is_ascii_digit())?;
        let core: String = s[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = core.split('.').filter(|p| !p.is_empty());

        let major = parts.next()?.parse::<u32>().ok()?;
        let minor = parts.next().map(|p| p.parse::<u32>()).transpose().ok()?.unwrap_or(0);
        let patch = parts.next().map(|p| p.parse::<u32>()).transpose().ok()?.unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 설치 확인 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallCheck {
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub meets_minimum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl InstallCheck {
    pub fn is_ready(&self) -> bool {
        self.installed && self.meets_minimum
    }
}

/// AST 도구 설치 상태 어댑터
pub struct Installer {
    tool: Arc<dyn AstTool>,
    min_version: String,
}

impl Installer {
    pub fn new(tool: Arc<dyn AstTool>, settings: &ToolSettings) -> Self {
        Self {
            tool,
            min_version: settings.min_version.clone(),
        }
    }

    pub fn min_version(&self) -> &str {
        &self.min_version
    }

    /// 도구 존재 여부와 버전
    pub async fn check_installed(&self) -> ToolInstallation {
        self.tool.is_installed().await
    }

    /// 최소 버전 충족 여부 (파싱 불가 버전은 불충족)
    pub fn meets_minimum_version(&self, version: &str) -> bool {
        let Some(required) = ToolVersion::parse(&self.min_version) else {
            return true;
        };
        match ToolVersion::parse(version) {
            Some(found) => found >= required,
            None => false,
        }
    }

    /// 설치 안내 문구
    pub fn install_instructions(&self) -> String {
        format!(
            "ast-grep (>= {}) is required to build the repo map. Install it with one of:\n\
             \x20 cargo install ast-grep --locked\n\
             \x20 npm install --global @ast-grep/cli\n\
             \x20 brew install ast-grep\n\
             \x20 pip install ast-grep-cli\n\
             Then make sure `ast-grep` (or `sg`) is on your PATH.",
            self.min_version
        )
    }

    /// 설치 + 버전 확인 통합
    pub async fn check(&self) -> InstallCheck {
        let installation = self.check_installed().await;
        debug!("AST tool installation: {:?}", installation);

        if !installation.found {
            return InstallCheck {
                installed: false,
                version: None,
                path: None,
                meets_minimum: false,
                suggestion: Some(self.install_instructions()),
            };
        }

        let meets_minimum = installation
            .version
            .as_deref()
            .map(|v| self.meets_minimum_version(v))
            .unwrap_or(false);

        InstallCheck {
            installed: true,
            version: installation.version,
            path: installation.path.map(|p| p.display().to_string()),
            meets_minimum,
            suggestion: (!meets_minimum).then(|| self.install_instructions()),
        }
    }

    /// 사용 가능한 상태가 아니면 사전조건 에러
    pub async fn ensure_ready(&self) -> Result<InstallCheck> {
        let check = self.check().await;
        if !check.installed {
            return Err(Error::ToolNotInstalled("ast-grep".into()));
        }
        if !check.meets_minimum {
            return Err(Error::tool_version(
                check.version.clone().unwrap_or_else(|| "unknown".into()),
                self.min_version.clone(),
            ));
        }
        Ok(check)
    }
}
