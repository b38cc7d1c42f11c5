//! Git Integration Module
//!
//! 맵 갱신에 필요한 git 조회:
//! - HEAD 커밋 / 브랜치
//! - `commit..HEAD` 변경 파일 (added / modified / deleted)
//! - 커밋 존재 여부, 뒤처진 커밋 수

pub mod ops;

pub use ops::{parse_name_status, ChangeSet, GitCli, GitError, GitProvider};
