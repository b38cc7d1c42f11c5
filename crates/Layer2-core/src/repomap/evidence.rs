//! Evidence 검색 - 용어/기능 설명으로 관련 파일 찾기
//!
//! 호출마다 경로 + 심볼 이름으로 검색 텍스트를 만들고 토큰 부분 문자열로
//! 매칭한다. 스코프 해석은 하지 않는 휴리스틱이다.

use super::options::{EvidenceLimits, EvidenceOptions};
use super::types::{FileEntry, FileSymbols, RepoMap, Symbol, SymbolCategory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 이보다 짧은 토큰은 버린다
const MIN_TOKEN_LEN: usize = 3;

/// 기능 설명에서 키워드로 쓰지 않는 단어
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "that", "this", "these", "those", "are", "was",
    "were", "been", "being", "should", "must", "can", "could", "will", "would", "when", "which",
    "where", "while", "its", "has", "have", "had", "not", "but", "all", "any", "each", "also",
    "able", "add", "adds", "support", "supports", "implement", "feature", "allow", "allows",
    "new", "use", "uses", "using", "via", "then", "than", "there", "their", "them", "they",
    "our", "your", "you", "per", "out", "about", "over", "under", "between", "without",
];

// ============================================================================
// Normalization
// ============================================================================

/// 검색어를 토큰으로 정규화
///
/// 소문자화 후 `[a-z0-9/_-]` 이외 문자는 구분자로 보고, 3자 미만 토큰은
/// 버리고 중복을 제거한다.
pub fn normalize_term(term: &str) -> Vec<String> {
    let cleaned: String = term
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '/' | '_' | '-') {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .filter(|t| seen.insert(t.to_string()))
        .map(|t| t.to_string())
        .collect()
}

/// 기능 설명에서 키워드 추출
pub fn feature_keywords(description: &str) -> Vec<String> {
    normalize_term(description)
        .into_iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

// ============================================================================
// Types
// ============================================================================

/// 파일 하나의 매치
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceMatch {
    pub path: String,
    /// 경로 자체가 토큰을 포함
    pub path_match: bool,
    /// 토큰을 포함하는 심볼
    pub symbols: FileSymbols,
}

/// 검색어 하나의 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermEvidence {
    pub term: String,
    pub tokens: Vec<String>,
    pub matches: Vec<EvidenceMatch>,
}

/// `find_evidence` 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceReport {
    pub available: bool,
    pub terms: Vec<TermEvidence>,
    /// 토큰이 없거나 아무 파일과도 맞지 않은 검색어
    pub unmatched: Vec<String>,
}

impl EvidenceReport {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            terms: Vec::new(),
            unmatched: Vec::new(),
        }
    }
}

/// 기능 설명 하나의 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEvidence {
    pub feature: String,
    pub keywords: Vec<String>,
    pub matches: Vec<EvidenceMatch>,
    pub unmatched_keywords: Vec<String>,
}

/// `find_feature_evidence` 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEvidenceReport {
    pub available: bool,
    pub features: Vec<FeatureEvidence>,
}

impl FeatureEvidenceReport {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            features: Vec::new(),
        }
    }
}

// ============================================================================
// Index
// ============================================================================

struct IndexedFile<'a> {
    path: &'a str,
    lower_path: String,
    search_text: String,
    entry: &'a FileEntry,
}

/// 호출 단위 검색 인덱스 (맵을 빌려 쓴다)
pub struct EvidenceIndex<'a> {
    files: Vec<IndexedFile<'a>>,
}

impl<'a> EvidenceIndex<'a> {
    /// 경로 순서로 인덱스 생성
    pub fn build(map: &'a RepoMap) -> Self {
        let files = map
            .files
            .iter()
            .map(|(path, entry)| {
                let lower_path = path.to_lowercase();
                let mut search_text = lower_path.clone();
                for (_, symbol) in entry.symbols.iter() {
                    search_text.push('\n');
                    search_text.push_str(&symbol.name.to_lowercase());
                }
                IndexedFile {
                    path,
                    lower_path,
                    search_text,
                    entry,
                }
            })
            .collect();
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 토큰 중 하나라도 포함하는 파일 (경로 순, 최대 `max_matches`)
    pub fn search(&self, tokens: &[String], limits: &EvidenceLimits) -> Vec<EvidenceMatch> {
        if tokens.is_empty() {
            return Vec::new();
        }
        self.files
            .iter()
            .filter(|f| tokens.iter().any(|t| f.search_text.contains(t.as_str())))
            .take(limits.max_matches_per_term)
            .map(|f| EvidenceMatch {
                path: f.path.to_string(),
                path_match: tokens.iter().any(|t| f.lower_path.contains(t.as_str())),
                symbols: matching_symbols(&f.entry.symbols, tokens, limits),
            })
            .collect()
    }
}

/// 토큰을 포함하는 심볼 (카테고리별, 전체 한도 적용)
fn matching_symbols(symbols: &FileSymbols, tokens: &[String], limits: &EvidenceLimits) -> FileSymbols {
    let mut out = FileSymbols::default();
    let mut total = 0;
    for category in SymbolCategory::ALL {
        let picked: Vec<Symbol> = symbols
            .get(category)
            .iter()
            .filter(|s| {
                let name = s.name.to_lowercase();
                tokens.iter().any(|t| name.contains(t.as_str()))
            })
            .take(limits.max_symbols_per_type)
            .take(limits.max_symbols_per_match.saturating_sub(total))
            .cloned()
            .collect();
        total += picked.len();
        *out.get_mut(category) = picked;
    }
    out
}

// ============================================================================
// Queries
// ============================================================================

/// 검색어별 evidence
pub fn find_evidence(
    map: Option<&RepoMap>,
    terms: &[String],
    options: &EvidenceOptions,
) -> EvidenceReport {
    let Some(map) = map else {
        return EvidenceReport::unavailable();
    };
    let limits = options.limits();
    let index = EvidenceIndex::build(map);

    let mut report = EvidenceReport {
        available: true,
        terms: Vec::new(),
        unmatched: Vec::new(),
    };

    for (term, tokens) in dedup_terms(terms, limits.max_terms) {
        let matches = index.search(&tokens, &limits);
        if matches.is_empty() {
            report.unmatched.push(term.clone());
        }
        report.terms.push(TermEvidence {
            term,
            tokens,
            matches,
        });
    }
    report
}

/// 정규화 형태 기준 중복 제거 후 `max_terms` 개까지
fn dedup_terms(terms: &[String], max_terms: usize) -> Vec<(String, Vec<String>)> {
    let mut seen = HashSet::new();
    terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter_map(|t| {
            let tokens = normalize_term(t);
            let key = if tokens.is_empty() {
                format!("\0{}", t.to_lowercase())
            } else {
                tokens.join(" ")
            };
            seen.insert(key).then(|| (t.to_string(), tokens))
        })
        .take(max_terms)
        .collect()
}

/// 기능 설명별 evidence
pub fn find_feature_evidence(
    map: Option<&RepoMap>,
    features: &[String],
    options: &EvidenceOptions,
) -> FeatureEvidenceReport {
    let Some(map) = map else {
        return FeatureEvidenceReport::unavailable();
    };
    let limits = options.limits();
    let index = EvidenceIndex::build(map);

    let features = features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(|feature| {
            let keywords: Vec<String> = feature_keywords(feature)
                .into_iter()
                .take(limits.max_terms)
                .collect();

            let mut merged: BTreeMap<String, EvidenceMatch> = BTreeMap::new();
            let mut order: Vec<String> = Vec::new();
            let mut unmatched_keywords = Vec::new();

            for keyword in &keywords {
                let matches = index.search(std::slice::from_ref(keyword), &limits);
                if matches.is_empty() {
                    unmatched_keywords.push(keyword.clone());
                }
                for m in matches {
                    match merged.get_mut(&m.path) {
                        Some(existing) => merge_match(existing, m, &limits),
                        None => {
                            order.push(m.path.clone());
                            merged.insert(m.path.clone(), m);
                        }
                    }
                }
            }

            let matches = order
                .into_iter()
                .filter_map(|p| merged.remove(&p))
                .take(limits.max_matches_per_term)
                .collect();

            FeatureEvidence {
                feature: feature.to_string(),
                keywords,
                matches,
                unmatched_keywords,
            }
        })
        .collect();

    FeatureEvidenceReport {
        available: true,
        features,
    }
}

/// 같은 파일의 매치를 합친다 (한도 유지)
fn merge_match(into: &mut EvidenceMatch, other: EvidenceMatch, limits: &EvidenceLimits) {
    into.path_match |= other.path_match;
    let mut total = into.symbols.total();
    for category in SymbolCategory::ALL {
        for symbol in other.symbols.get(category) {
            let list = into.symbols.get_mut(category);
            if total >= limits.max_symbols_per_match || list.len() >= limits.max_symbols_per_type {
                break;
            }
            if !list.contains(symbol) {
                list.push(symbol.clone());
                total += 1;
            }
        }
    }
}
