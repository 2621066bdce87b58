use std::fs;
use std::path::Path;

use anyhow::Context;
use kiln_gfx::headless::HeadlessDeviceConfig;
use kiln_render_graph::PassGraphConfig;

/// 输出尺寸与 back buffer 数量
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub back_buffer_count: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            back_buffer_count: 2,
        }
    }
}

/// kiln-headless 配置
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    /// 运行的帧数
    pub frame_count: u32,
    pub output: OutputConfig,
    pub device: HeadlessDeviceConfig,
    pub graph: PassGraphConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            frame_count: 8,
            output: OutputConfig::default(),
            device: HeadlessDeviceConfig::default(),
            graph: PassGraphConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.output.width > 0 && self.output.height > 0, "输出尺寸不能为 0");
        anyhow::ensure!(self.output.back_buffer_count > 0, "back buffer 数量不能为 0");
        anyhow::ensure!(self.device.frames_in_flight > 0, "frames_in_flight 不能为 0");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: AppConfig = toml::from_str(
            r#"
            frame_count = 3

            [graph]
            enable_aliasing = true
            "#,
        )
        .unwrap();

        assert_eq!(config.frame_count, 3);
        assert!(config.graph.enable_aliasing);
        assert_eq!(config.output, OutputConfig::default());
        assert_eq!(config.device, HeadlessDeviceConfig::default());
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.output.width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_workspace_config_parses() {
        let path = kiln_crate_tools::resource::KilnPath::config_path("kiln.toml");
        let config = AppConfig::from_file(path).unwrap();
        assert!(!config.device.auto_flush);
    }
}
