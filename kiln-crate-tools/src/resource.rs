use std::path::{Path, PathBuf};

/// 统一路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导）。
///
/// # 使用示例
/// ```ignore
/// let config = KilnPath::config_path("kiln.toml"); // config/kiln.toml
/// ```
pub struct KilnPath {}
impl KilnPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        // kiln-crate-tools 直接位于工作区根目录下
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().unwrap_or(manifest_dir).to_path_buf()
    }

    /// 获取 `config/` 目录下的文件路径
    pub fn config_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("config").join(filename)
    }

    pub fn target_path() -> PathBuf {
        Self::workspace_path().join("target")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        let path = KilnPath::config_path("kiln.toml");
        assert!(path.ends_with("config/kiln.toml"));
        assert!(path.starts_with(KilnPath::workspace_path()));
    }
}
