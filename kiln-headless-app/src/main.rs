//! kiln-headless
//!
//! 在 headless 后端上运行一个延迟渲染管线：gbuffer、async compute 上的 SSAO、
//! 光照与 tonemap，用来观察 Pass Graph 的调度结果。
//!
//! ```text
//! kiln-headless [config.toml]
//! ```

mod app;
mod config;
mod passes;

use std::path::PathBuf;

use kiln_crate_tools::init_log::{init_log_with_level, parse_level};
use kiln_crate_tools::resource::KilnPath;

use crate::app::HeadlessApp;
use crate::config::AppConfig;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| KilnPath::config_path("kiln.toml"));

    let (config, loaded) = if config_path.exists() {
        (AppConfig::from_file(&config_path)?, true)
    } else {
        (AppConfig::default(), false)
    };

    init_log_with_level(parse_level(&config.log_level));
    if loaded {
        log::info!("config loaded from {:?}", config_path);
    } else {
        log::warn!("config {:?} not found, using defaults", config_path);
    }

    let mut app = HeadlessApp::new(config)?;
    app.run()
}
