//! 浏览器获取：启动无头浏览器，或连接已有浏览器的调试端口

mod connection;
mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;

use chromiumoxide::Browser;

use crate::config::Config;
use crate::error::RenderError;

/// 按配置获取浏览器
pub async fn open_browser(config: &Config) -> Result<Browser, RenderError> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_headless_browser(config.chrome_executable.as_deref()).await,
    }
}
