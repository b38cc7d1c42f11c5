//! 언어별 구조 검색 쿼리와 정규화 규칙
//!
//! 패턴은 ast-grep 문법(`$NAME`, `$$$ARGS`)을 따른다. 심볼 이름은 항상
//! `NAME` 캡처에서 가져오고, 임포트는 매치 텍스트를 언어별로 파싱한다.

use super::language::Language;
use super::tool::AstMatch;
use super::types::{Symbol, SymbolCategory};
use regex::Regex;
use std::collections::HashSet;

lazy_static::lazy_static! {
    static ref QUOTED_RE: Regex = Regex::new(r#"["'`]([^"'`]+)["'`]"#).unwrap();
}

/// 쿼리 결과를 어디에 쓰는지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    /// 해당 카테고리 심볼 (`$NAME` 캡처)
    Symbol(SymbolCategory),
    /// 임포트 문
    Import,
    /// 이름 목록 형태의 export (`export { a, b }`, `__all__ = [...]`)
    ExportList,
}

/// 이름 필터
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFilter {
    Any,
    /// 최상위(1열) + 대문자 이름만 (Python 모듈 상수)
    TopLevelUpperCase,
}

/// 구조 검색 쿼리 하나
#[derive(Debug, Clone, Copy)]
pub struct StructuralQuery {
    pub target: QueryTarget,
    pub pattern: &'static str,
    /// 패턴 안에서 실제로 매치할 노드 종류
    pub selector: Option<&'static str>,
    pub filter: NameFilter,
}

const fn symbol(category: SymbolCategory, pattern: &'static str) -> StructuralQuery {
    StructuralQuery {
        target: QueryTarget::Symbol(category),
        pattern,
        selector: None,
        filter: NameFilter::Any,
    }
}

const fn import(pattern: &'static str) -> StructuralQuery {
    StructuralQuery {
        target: QueryTarget::Import,
        pattern,
        selector: None,
        filter: NameFilter::Any,
    }
}

const fn export_list(pattern: &'static str) -> StructuralQuery {
    StructuralQuery {
        target: QueryTarget::ExportList,
        pattern,
        selector: None,
        filter: NameFilter::Any,
    }
}

/// 단독으로는 다른 노드로 파싱되는 선언을 문맥 안에서 고른다
const fn selected(
    category: SymbolCategory,
    pattern: &'static str,
    selector: &'static str,
) -> StructuralQuery {
    StructuralQuery {
        target: QueryTarget::Symbol(category),
        pattern,
        selector: Some(selector),
        filter: NameFilter::Any,
    }
}

use SymbolCategory::{Class, Constant, Export, Function, Type};

const JAVASCRIPT_QUERIES: &[StructuralQuery] = &[
    symbol(Function, "function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "async function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "const $NAME = ($$$ARGS) => $BODY"),
    symbol(Function, "const $NAME = async ($$$ARGS) => $BODY"),
    symbol(Class, "class $NAME { $$$BODY }"),
    symbol(Class, "class $NAME extends $BASE { $$$BODY }"),
    symbol(Constant, "const $NAME = $VALUE"),
    symbol(Export, "export function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Export, "export async function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Export, "export default function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Export, "export class $NAME { $$$BODY }"),
    symbol(Export, "export class $NAME extends $BASE { $$$BODY }"),
    symbol(Export, "export default class $NAME { $$$BODY }"),
    symbol(Export, "export const $NAME = $VALUE"),
    symbol(Export, "export let $NAME = $VALUE"),
    export_list("export { $$$NAMES }"),
    import("import $$$CLAUSE from $SOURCE"),
    import("import $SOURCE"),
    import("require($SOURCE)"),
];

const TYPESCRIPT_QUERIES: &[StructuralQuery] = &[
    symbol(Function, "function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "function $NAME($$$ARGS): $RET { $$$BODY }"),
    symbol(Function, "async function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "async function $NAME($$$ARGS): $RET { $$$BODY }"),
    symbol(Function, "const $NAME = ($$$ARGS) => $BODY"),
    symbol(Function, "const $NAME = ($$$ARGS): $RET => $BODY"),
    symbol(Function, "const $NAME = async ($$$ARGS) => $BODY"),
    symbol(Function, "const $NAME = async ($$$ARGS): $RET => $BODY"),
    symbol(Class, "class $NAME { $$$BODY }"),
    symbol(Class, "class $NAME extends $BASE { $$$BODY }"),
    symbol(Class, "abstract class $NAME { $$$BODY }"),
    symbol(Type, "interface $NAME { $$$BODY }"),
    symbol(Type, "type $NAME = $TYPE"),
    symbol(Type, "enum $NAME { $$$BODY }"),
    symbol(Constant, "const $NAME = $VALUE"),
    symbol(Constant, "const $NAME: $TYPE = $VALUE"),
    symbol(Export, "export function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Export, "export function $NAME($$$ARGS): $RET { $$$BODY }"),
    symbol(Export, "export async function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Export, "export async function $NAME($$$ARGS): $RET { $$$BODY }"),
    symbol(Export, "export default function $NAME($$$ARGS) { $$$BODY }"),
    symbol(Export, "export default function $NAME($$$ARGS): $RET { $$$BODY }"),
    symbol(Export, "export class $NAME { $$$BODY }"),
    symbol(Export, "export class $NAME extends $BASE { $$$BODY }"),
    symbol(Export, "export abstract class $NAME { $$$BODY }"),
    symbol(Export, "export interface $NAME { $$$BODY }"),
    symbol(Export, "export type $NAME = $TYPE"),
    symbol(Export, "export enum $NAME { $$$BODY }"),
    symbol(Export, "export const $NAME = $VALUE"),
    symbol(Export, "export const $NAME: $TYPE = $VALUE"),
    export_list("export { $$$NAMES }"),
    import("import $$$CLAUSE from $SOURCE"),
    import("import $SOURCE"),
    import("require($SOURCE)"),
];

const PYTHON_QUERIES: &[StructuralQuery] = &[
    symbol(Function, "def $NAME($$$ARGS): $$$BODY"),
    symbol(Function, "async def $NAME($$$ARGS): $$$BODY"),
    symbol(Class, "class $NAME: $$$BODY"),
    symbol(Class, "class $NAME($$$BASES): $$$BODY"),
    StructuralQuery {
        target: QueryTarget::Symbol(Constant),
        pattern: "$NAME = $VALUE",
        selector: None,
        filter: NameFilter::TopLevelUpperCase,
    },
    export_list("__all__ = $NAMES"),
    import("import $$$MODULES"),
    import("from $MODULE import $$$NAMES"),
];

const RUST_QUERIES: &[StructuralQuery] = &[
    symbol(Function, "fn $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "fn $NAME($$$ARGS) -> $RET { $$$BODY }"),
    symbol(Function, "pub fn $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "pub fn $NAME($$$ARGS) -> $RET { $$$BODY }"),
    symbol(Function, "async fn $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "pub async fn $NAME($$$ARGS) { $$$BODY }"),
    symbol(Type, "struct $NAME { $$$FIELDS }"),
    symbol(Type, "pub struct $NAME { $$$FIELDS }"),
    symbol(Type, "struct $NAME($$$FIELDS);"),
    symbol(Type, "pub struct $NAME($$$FIELDS);"),
    symbol(Type, "enum $NAME { $$$VARIANTS }"),
    symbol(Type, "pub enum $NAME { $$$VARIANTS }"),
    symbol(Type, "trait $NAME { $$$ITEMS }"),
    symbol(Type, "pub trait $NAME { $$$ITEMS }"),
    symbol(Type, "type $NAME = $TYPE;"),
    symbol(Type, "pub type $NAME = $TYPE;"),
    symbol(Constant, "const $NAME: $TYPE = $VALUE;"),
    symbol(Constant, "pub const $NAME: $TYPE = $VALUE;"),
    symbol(Constant, "static $NAME: $TYPE = $VALUE;"),
    symbol(Constant, "pub static $NAME: $TYPE = $VALUE;"),
    import("use $PATH;"),
    import("pub use $PATH;"),
];

const GO_QUERIES: &[StructuralQuery] = &[
    symbol(Function, "func $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "func $NAME($$$ARGS) $RET { $$$BODY }"),
    symbol(Function, "func ($RECV) $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "func ($RECV) $NAME($$$ARGS) $RET { $$$BODY }"),
    symbol(Type, "type $NAME struct { $$$FIELDS }"),
    symbol(Type, "type $NAME interface { $$$METHODS }"),
    symbol(Type, "type $NAME $TYPE"),
    symbol(Constant, "const $NAME = $VALUE"),
    symbol(Constant, "const $NAME $TYPE = $VALUE"),
    import("import $SOURCE"),
    import("import $ALIAS $SOURCE"),
    import("import ($$$SPECS)"),
];

const JAVA_QUERIES: &[StructuralQuery] = &[
    symbol(Class, "class $NAME { $$$BODY }"),
    symbol(Class, "public class $NAME { $$$BODY }"),
    symbol(Class, "class $NAME extends $BASE { $$$BODY }"),
    symbol(Class, "public class $NAME extends $BASE { $$$BODY }"),
    symbol(Type, "interface $NAME { $$$BODY }"),
    symbol(Type, "public interface $NAME { $$$BODY }"),
    symbol(Type, "enum $NAME { $$$BODY }"),
    symbol(Type, "public enum $NAME { $$$BODY }"),
    symbol(Type, "record $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "$RET $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "public $RET $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "protected $RET $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "private $RET $NAME($$$ARGS) { $$$BODY }"),
    symbol(Function, "public static $RET $NAME($$$ARGS) { $$$BODY }"),
    // 클래스 밖에서는 지역 변수 선언으로 파싱되므로 필드 노드를 고른다
    selected(
        Constant,
        "class $CLASS { static final $TYPE $NAME = $VALUE; }",
        "field_declaration",
    ),
    selected(
        Constant,
        "class $CLASS { public static final $TYPE $NAME = $VALUE; }",
        "field_declaration",
    ),
    selected(
        Constant,
        "class $CLASS { protected static final $TYPE $NAME = $VALUE; }",
        "field_declaration",
    ),
    selected(
        Constant,
        "class $CLASS { private static final $TYPE $NAME = $VALUE; }",
        "field_declaration",
    ),
    import("import $PATH;"),
    import("import static $PATH;"),
];

/// 언어별 쿼리 목록
pub fn queries_for(language: Language) -> &'static [StructuralQuery] {
    match language {
        Language::JavaScript => JAVASCRIPT_QUERIES,
        Language::TypeScript => TYPESCRIPT_QUERIES,
        Language::Python => PYTHON_QUERIES,
        Language::Rust => RUST_QUERIES,
        Language::Go => GO_QUERIES,
        Language::Java => JAVA_QUERIES,
    }
}

// ============================================================================
// Export 규칙
// ============================================================================

/// 언어별 export 판정 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRule {
    /// `export ...` 쿼리 결과만 사용
    Explicit,
    /// 선언이 `pub ` 으로 시작 (`pub(crate)` 는 제외)
    PubVisibility,
    /// 이름 앞에 `public` 수식어, 감싸는 타입도 모두 public
    PublicModifier,
    /// 대문자로 시작하는 이름
    Capitalized,
    /// `__all__` 이 있으면 그 목록, 없으면 `_` 로 시작하지 않는 최상위 이름
    DunderAll,
}

impl ExportRule {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::JavaScript | Language::TypeScript => Self::Explicit,
            Language::Rust => Self::PubVisibility,
            Language::Java => Self::PublicModifier,
            Language::Go => Self::Capitalized,
            Language::Python => Self::DunderAll,
        }
    }

    /// 선언 심볼이 이 규칙으로 export 되는지
    pub fn exports(&self, declared: &DeclaredSymbol) -> bool {
        match self {
            Self::Explicit | Self::DunderAll => {
                matches!(self, Self::DunderAll)
                    && declared.symbol.location.column == 1
                    && !declared.symbol.name.starts_with('_')
            }
            Self::PubVisibility => declared.text.trim_start().starts_with("pub "),
            Self::PublicModifier => has_public_modifier(declared),
            Self::Capitalized => declared
                .symbol
                .name
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false),
        }
    }

    /// 파일의 선언 목록에서 export 선택
    ///
    /// `PublicModifier` 는 선언 자체뿐 아니라 감싸는 타입 선언까지 본다.
    /// package-private 클래스의 public 메서드는 패키지 밖에서 보이지 않는다.
    pub fn select(&self, declared: &[DeclaredSymbol]) -> Vec<Symbol> {
        match self {
            Self::PublicModifier => {
                let types: Vec<&DeclaredSymbol> = declared
                    .iter()
                    .filter(|d| matches!(d.category, SymbolCategory::Class | SymbolCategory::Type))
                    .collect();
                declared
                    .iter()
                    .filter(|d| has_public_modifier(d))
                    .filter(|d| {
                        types
                            .iter()
                            .filter(|t| t.encloses(d))
                            .all(|t| has_public_modifier(t))
                    })
                    .map(|d| d.symbol.clone())
                    .collect()
            }
            _ => declared
                .iter()
                .filter(|d| self.exports(d))
                .map(|d| d.symbol.clone())
                .collect(),
        }
    }
}

fn has_public_modifier(declared: &DeclaredSymbol) -> bool {
    let prefix = declared
        .text
        .find(declared.symbol.name.as_str())
        .map(|i| &declared.text[..i])
        .unwrap_or("");
    prefix.split_whitespace().any(|w| w == "public")
}

/// export 판정을 위해 원문을 보존한 선언 심볼
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSymbol {
    pub category: SymbolCategory,
    pub symbol: Symbol,
    pub text: String,
}

impl DeclaredSymbol {
    fn start(&self) -> (u32, u32) {
        (self.symbol.location.line, self.symbol.location.column)
    }

    /// 매치 텍스트 끝 위치 (line, column)
    fn end(&self) -> (u32, u32) {
        let (line, column) = self.start();
        let newlines = self.text.matches('\n').count() as u32;
        match self.text.rsplit_once('\n') {
            Some((_, last)) => (line + newlines, last.chars().count() as u32 + 1),
            None => (line, column + self.text.chars().count() as u32),
        }
    }

    /// `other` 의 시작 위치가 이 선언 범위 안에 있는지
    fn encloses(&self, other: &DeclaredSymbol) -> bool {
        let at = other.start();
        self.start() < at && at < self.end()
    }
}

// ============================================================================
// 매치 파싱
// ============================================================================

/// 이름 필터 적용
pub fn passes_filter(filter: NameFilter, name: &str, column: u32) -> bool {
    match filter {
        NameFilter::Any => true,
        NameFilter::TopLevelUpperCase => {
            column == 1
                && name.chars().any(|c| c.is_ascii_uppercase())
                && name
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        }
    }
}

/// 심볼 이름으로 쓸 수 있는 식별자인지
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// 임포트 매치에서 의존성 식별자 추출
pub fn parse_imports(language: Language, m: &AstMatch) -> Vec<String> {
    let text = m.text.trim();
    match language {
        Language::JavaScript | Language::TypeScript => m
            .capture("SOURCE")
            .and_then(first_quoted)
            .or_else(|| first_quoted(text))
            .into_iter()
            .collect(),
        Language::Go => QUOTED_RE
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect(),
        Language::Python => parse_python_import(text),
        Language::Rust => {
            let rest = text.strip_prefix("pub ").unwrap_or(text);
            rest.strip_prefix("use ")
                .map(|r| r.trim_end_matches(';').trim().to_string())
                .filter(|r| !r.is_empty())
                .into_iter()
                .collect()
        }
        Language::Java => {
            let rest = text.strip_prefix("import ").unwrap_or(text);
            let rest = rest.strip_prefix("static ").unwrap_or(rest);
            let rest = rest.trim_end_matches(';').trim();
            if rest.is_empty() {
                Vec::new()
            } else {
                vec![rest.to_string()]
            }
        }
    }
}

fn first_quoted(text: &str) -> Option<String> {
    QUOTED_RE.captures(text).map(|c| c[1].to_string())
}

fn parse_python_import(text: &str) -> Vec<String> {
    if let Some(rest) = text.strip_prefix("from ") {
        return rest
            .split_whitespace()
            .next()
            .map(|m| vec![m.to_string()])
            .unwrap_or_default();
    }
    let Some(rest) = text.strip_prefix("import ") else {
        return Vec::new();
    };
    rest.split(',')
        .filter_map(|part| part.split_whitespace().next())
        .map(|m| m.to_string())
        .collect()
}

/// 이름 목록 형태 export 파싱
pub fn parse_export_list(language: Language, text: &str) -> Vec<String> {
    match language {
        Language::Python => QUOTED_RE
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect(),
        Language::JavaScript | Language::TypeScript => {
            let Some(start) = text.find('{') else {
                return Vec::new();
            };
            let end = text[start..].find('}').map(|i| start + i).unwrap_or(text.len());
            text[start + 1..end]
                .split(',')
                .filter_map(|item| {
                    let item = item.trim();
                    let item = item.strip_prefix("type ").unwrap_or(item);
                    let name = match item.split_once(" as ") {
                        Some((_, alias)) => alias.trim(),
                        None => item,
                    };
                    (is_identifier(name) && name != "default").then(|| name.to_string())
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

/// 순서를 유지하며 중복 제거
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(text: &str) -> AstMatch {
        AstMatch {
            file: "f".into(),
            text: text.into(),
            line: 1,
            column: 1,
            ..Default::default()
        }
    }

    fn declared(name: &str, text: &str, column: u32) -> DeclaredSymbol {
        DeclaredSymbol {
            category: SymbolCategory::Function,
            symbol: Symbol::new(name, 1, column),
            text: text.into(),
        }
    }

    #[test]
    fn test_every_language_has_queries() {
        for lang in Language::ALL {
            let queries = queries_for(lang);
            assert!(queries.iter().any(|q| q.target == QueryTarget::Import));
            assert!(queries
                .iter()
                .any(|q| q.target == QueryTarget::Symbol(SymbolCategory::Function)));
            for q in queries {
                if let QueryTarget::Symbol(_) = q.target {
                    assert!(q.pattern.contains("$NAME"), "{}", q.pattern);
                }
            }
        }
    }

    #[test]
    fn test_js_imports() {
        let mut m = matched("import { login } from './auth'");
        assert_eq!(parse_imports(Language::TypeScript, &m), vec!["./auth"]);

        m.captures.insert("SOURCE".into(), "\"react\"".into());
        assert_eq!(parse_imports(Language::JavaScript, &m), vec!["react"]);

        let m = matched("require('lodash')");
        assert_eq!(parse_imports(Language::JavaScript, &m), vec!["lodash"]);
    }

    #[test]
    fn test_python_imports() {
        assert_eq!(
            parse_imports(Language::Python, &matched("import os, sys")),
            vec!["os", "sys"]
        );
        assert_eq!(
            parse_imports(Language::Python, &matched("import numpy as np")),
            vec!["numpy"]
        );
        assert_eq!(
            parse_imports(Language::Python, &matched("from collections import deque, defaultdict")),
            vec!["collections"]
        );
        assert_eq!(
            parse_imports(Language::Python, &matched("from .utils import helper")),
            vec![".utils"]
        );
    }

    #[test]
    fn test_rust_go_java_imports() {
        assert_eq!(
            parse_imports(
                Language::Rust,
                &matched("use std::collections::{HashMap, HashSet};")
            ),
            vec!["std::collections::{HashMap, HashSet}"]
        );
        assert_eq!(
            parse_imports(Language::Rust, &matched("pub use crate::types::Symbol;")),
            vec!["crate::types::Symbol"]
        );
        assert_eq!(
            parse_imports(Language::Go, &matched("import pkg \"os\"")),
            vec!["os"]
        );
        assert_eq!(
            parse_imports(Language::Go, &matched("import (\n\t\"fmt\"\n\t\"strings\"\n)")),
            vec!["fmt", "strings"]
        );
        assert_eq!(
            parse_imports(
                Language::Java,
                &matched("import static java.util.Collections.emptyList;")
            ),
            vec!["java.util.Collections.emptyList"]
        );
    }

    #[test]
    fn test_export_lists() {
        assert_eq!(
            parse_export_list(
                Language::Python,
                "__all__ = [\"PublicClass\", 'public_function']"
            ),
            vec!["PublicClass", "public_function"]
        );
        assert_eq!(
            parse_export_list(
                Language::TypeScript,
                "export { login, logout as signOut, type Session, x as default }"
            ),
            vec!["login", "signOut", "Session"]
        );
    }

    #[test]
    fn test_pub_visibility_rule() {
        let rule = ExportRule::for_language(Language::Rust);
        assert!(rule.exports(&declared("public_fn", "pub fn public_fn() -> i32 { 1 }", 1)));
        assert!(!rule.exports(&declared("private_fn", "fn private_fn() -> i32 { 2 }", 1)));
        assert!(!rule.exports(&declared("scoped", "pub(crate) fn scoped() {}", 1)));
    }

    #[test]
    fn test_public_modifier_rule() {
        let rule = ExportRule::for_language(Language::Java);
        assert!(rule.exports(&declared(
            "add",
            "public int add(int a, int b) { return a + b; }",
            5
        )));
        assert!(!rule.exports(&declared("secret", "private void secret() {}", 5)));
        // `public` inside the body does not count
        assert!(!rule.exports(&declared(
            "PackagePrivate",
            "class PackagePrivate {\n    public int value() { return 1; }\n}",
            1
        )));
    }

    #[test]
    fn test_public_members_follow_enclosing_type() {
        let decl = |category, name: &str, line, column, text: &str| DeclaredSymbol {
            category,
            symbol: Symbol::new(name, line, column),
            text: text.into(),
        };
        let declared = vec![
            decl(Class, "Sample", 1, 1, "public class Sample {\n    public int add() { return 1; }\n}"),
            decl(Function, "add", 2, 5, "public int add() { return 1; }"),
            decl(Class, "Hidden", 4, 1, "class Hidden {\n    public int value() { return 1; }\n}"),
            decl(Function, "value", 5, 5, "public int value() { return 1; }"),
            decl(Class, "Consts", 7, 1, "public class Consts { public static final int MAX = 10; }"),
            decl(Constant, "MAX", 7, 23, "public static final int MAX = 10;"),
        ];

        let rule = ExportRule::for_language(Language::Java);
        let exported: Vec<String> = rule.select(&declared).into_iter().map(|s| s.name).collect();
        assert_eq!(exported, vec!["Sample", "add", "Consts", "MAX"]);
    }

    #[test]
    fn test_java_constants_are_field_selections() {
        let constants: Vec<&StructuralQuery> = queries_for(Language::Java)
            .iter()
            .filter(|q| q.target == QueryTarget::Symbol(SymbolCategory::Constant))
            .collect();
        assert!(!constants.is_empty());
        for q in constants {
            assert_eq!(q.selector, Some("field_declaration"));
            assert!(q.pattern.starts_with("class $CLASS {"), "{}", q.pattern);
        }
    }

    #[test]
    fn test_typescript_functions_allow_return_types() {
        let patterns: Vec<&str> = queries_for(Language::TypeScript)
            .iter()
            .map(|q| q.pattern)
            .collect();
        assert!(patterns.contains(&"function $NAME($$$ARGS): $RET { $$$BODY }"));
        assert!(patterns.contains(&"export function $NAME($$$ARGS): $RET { $$$BODY }"));
        assert!(patterns.contains(&"export async function $NAME($$$ARGS): $RET { $$$BODY }"));
    }

    #[test]
    fn test_capitalized_rule() {
        let rule = ExportRule::for_language(Language::Go);
        assert!(rule.exports(&declared("PublicFunc", "func PublicFunc() {}", 1)));
        assert!(!rule.exports(&declared("privateFunc", "func privateFunc() {}", 1)));
    }

    #[test]
    fn test_python_default_rule() {
        let rule = ExportRule::for_language(Language::Python);
        assert!(rule.exports(&declared("public_function", "def public_function(v): ...", 1)));
        assert!(!rule.exports(&declared("_PrivateClass", "class _PrivateClass: pass", 1)));
        // nested method
        assert!(!rule.exports(&declared("method", "def method(self): ...", 5)));
    }

    #[test]
    fn test_explicit_rule_never_derives() {
        let rule = ExportRule::for_language(Language::TypeScript);
        assert!(!rule.exports(&declared("login", "function login() {}", 1)));
    }

    #[test]
    fn test_top_level_upper_case_filter() {
        assert!(passes_filter(NameFilter::TopLevelUpperCase, "MAX_SIZE", 1));
        assert!(passes_filter(NameFilter::TopLevelUpperCase, "V2", 1));
        assert!(!passes_filter(NameFilter::TopLevelUpperCase, "max_size", 1));
        assert!(!passes_filter(NameFilter::TopLevelUpperCase, "MAX_SIZE", 5));
        assert!(!passes_filter(NameFilter::TopLevelUpperCase, "__all__", 1));
        assert!(passes_filter(NameFilter::Any, "anything", 9));
    }

    #[test]
    fn test_dedup_preserving_order() {
        let items = vec!["b".to_string(), "a".into(), "b".into(), "c".into()];
        assert_eq!(dedup_preserving_order(items), vec!["b", "a", "c"]);
    }
}
