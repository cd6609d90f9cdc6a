//! # LiveShow SDK
//!
//! 直播带货模拟引擎核心库 - 纯本地、确定性可测的直播间模拟
//!
//! ## 功能特性
//!
//! - 💬 **评论调度**: 预置脚本按每条记录的延迟自动播放，可随时暂停 / 手动步进
//! - 📈 **观众数模拟**: 软边界随机游走，带外自动纠偏，支持种子复现
//! - 🎛️ **开关存储**: 贴纸、商品卡、点赞动效、背景模式等展示开关统一管理
//! - ⌨️ **键盘路由**: 按键别名表（含输入法位移字符）映射到语义命令
//! - 📜 **吸底滚动**: 观众上翻即松手，回到底部自动恢复跟随
//! - 📡 **事件广播**: 所有状态变更通过事件流通知展示层，核心不反向依赖
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use liveshow_sdk::{FocusRole, LiveShowConfig, LiveShowSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 初始化会话（内置演示脚本）
//!     let config = LiveShowConfig::builder()
//!         .rng_seed(42)
//!         .build();
//!     let session = LiveShowSession::initialize(config).await?;
//!
//!     // 订阅事件
//!     let mut events = session.subscribe();
//!
//!     // 空格键播放下一条评论
//!     session.handle_key("Space", FocusRole::None);
//!
//!     let event = events.recv().await?;
//!     println!("收到事件: {}", event.event_type());
//!
//!     // 关闭会话
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod keyboard;
pub mod scheduler;
pub mod script;
pub mod scroll;
pub mod session;
pub mod toggles;
pub mod version;
pub mod viewer;

pub use error::{LiveShowError, Result};
pub use events::{EventFilter, EventManager, EventStats, FilteredEventReceiver, LiveEvent};
pub use keyboard::{default_bindings, FocusRole, KeyBinding, KeyCommand, KeyCommandRouter};
pub use scheduler::{CommentScheduler, SchedulerStats};
pub use script::{CommentRecord, CommentScript, ProductInfo, DEFAULT_COMMENT_DELAY_MS};
pub use scroll::{AutoScrollPolicy, DEFAULT_STICK_TOLERANCE};
pub use session::{LiveShowConfig, LiveShowConfigBuilder, LiveShowSession, LiveSnapshot};
pub use toggles::{
    toggle_names, BackgroundMode, BackgroundSettings, ToggleError, ToggleStore, ToggleValue,
};
pub use version::SDK_VERSION;
pub use viewer::{
    format_viewer_count, ViewerCountConfig, ViewerCountSimulator, ViewerCountStats,
};
