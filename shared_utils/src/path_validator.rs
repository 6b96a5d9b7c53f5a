//! Path Validation Module
//!
//! UTF-8 conversion for paths handed to external tools, and same-file
//! detection for input/output conflicts.
//! 路径验证模块：外部工具参数转换与输入输出冲突检测。

use crate::errors::{ArchiveError, Result};
use std::path::{Path, PathBuf};

/// Convert a path to `&str` for use as an external tool argument.
/// 安全地将 Path 转换为 &str，失败时返回错误而不是 panic
pub fn path_to_str_safe(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| ArchiveError::InvalidPath(path.to_path_buf()))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

/// True when `a` and `b` name the same file.
/// 检查两个路径是否指向同一文件
///
/// Existing files are compared by canonical path, so symlinks and `..`
/// components resolve. Otherwise the lexical absolute paths are compared.
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => absolute(a) == absolute(b),
    }
}
