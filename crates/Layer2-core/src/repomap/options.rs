//! 공개 API 옵션
//!
//! 숫자 옵션은 외부 입력(JSON, CLI)을 그대로 받을 수 있도록 부호 있는
//! 정수로 받고, 사용할 때 0 이상으로 자른다. 생략하면 기본값.

use serde::{Deserialize, Serialize};

/// `None` 이면 기본값, 음수는 0
pub fn clamp_limit(value: Option<i64>, default: usize) -> usize {
    match value {
        Some(v) => usize::try_from(v.max(0)).unwrap_or(usize::MAX),
        None => default,
    }
}

/// init 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitOptions {
    /// 기존 맵이 있어도 다시 만든다
    pub force: bool,
    /// 감지 대신 사용할 언어 목록
    pub languages: Option<Vec<String>>,
    pub max_files_per_language: Option<i64>,
}

/// update 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateOptions {
    /// 증분 대신 전체 재빌드
    pub full: bool,
}

/// drift 요약 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryOptions {
    pub max_files: Option<i64>,
    pub max_symbols_per_type: Option<i64>,
    pub max_dependencies_per_file: Option<i64>,
    pub include_staleness: Option<bool>,
}

/// 적용된 요약 한도
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    pub max_files: usize,
    pub max_symbols_per_type: usize,
    pub max_dependencies_per_file: usize,
    pub include_staleness: bool,
}

impl SummaryOptions {
    pub fn limits(&self) -> SummaryLimits {
        SummaryLimits {
            max_files: clamp_limit(self.max_files, 50),
            max_symbols_per_type: clamp_limit(self.max_symbols_per_type, 10),
            max_dependencies_per_file: clamp_limit(self.max_dependencies_per_file, 10),
            include_staleness: self.include_staleness.unwrap_or(true),
        }
    }
}

/// evidence 검색 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvidenceOptions {
    pub max_terms: Option<i64>,
    pub max_matches_per_term: Option<i64>,
    pub max_symbols_per_type: Option<i64>,
    pub max_symbols_per_match: Option<i64>,
}

/// 적용된 검색 한도
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidenceLimits {
    pub max_terms: usize,
    pub max_matches_per_term: usize,
    pub max_symbols_per_type: usize,
    pub max_symbols_per_match: usize,
}

impl EvidenceOptions {
    pub fn limits(&self) -> EvidenceLimits {
        EvidenceLimits {
            max_terms: clamp_limit(self.max_terms, 20),
            max_matches_per_term: clamp_limit(self.max_matches_per_term, 5),
            max_symbols_per_type: clamp_limit(self.max_symbols_per_type, 5),
            max_symbols_per_match: clamp_limit(self.max_symbols_per_match, 10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 7), 7);
        assert_eq!(clamp_limit(Some(-3), 7), 0);
        assert_eq!(clamp_limit(Some(0), 7), 0);
        assert_eq!(clamp_limit(Some(12), 7), 12);
    }

    #[test]
    fn test_defaults() {
        let summary = SummaryOptions::default().limits();
        assert_eq!(summary.max_files, 50);
        assert_eq!(summary.max_symbols_per_type, 10);
        assert_eq!(summary.max_dependencies_per_file, 10);
        assert!(summary.include_staleness);

        let evidence = EvidenceOptions::default().limits();
        assert_eq!(evidence.max_terms, 20);
        assert_eq!(evidence.max_matches_per_term, 5);
        assert_eq!(evidence.max_symbols_per_type, 5);
        assert_eq!(evidence.max_symbols_per_match, 10);
    }

    #[test]
    fn test_wire_names() {
        let options: EvidenceOptions =
            serde_json::from_str(r#"{ "maxTerms": -1, "maxSymbolsPerMatch": 3 }"#).unwrap();
        let limits = options.limits();
        assert_eq!(limits.max_terms, 0);
        assert_eq!(limits.max_symbols_per_match, 3);
        assert_eq!(limits.max_matches_per_term, 5);

        let init: InitOptions =
            serde_json::from_str(r#"{ "force": true, "maxFilesPerLanguage": 10 }"#).unwrap();
        assert!(init.force);
        assert_eq!(init.max_files_per_language, Some(10));
    }
}
