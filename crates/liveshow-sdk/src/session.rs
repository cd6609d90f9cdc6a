//! 统一会话接口 - LiveShowSession 主入口
//!
//! 分层架构设计：
//! ```text
//! LiveShowSession (会话门面)
//!   ├── CommentScheduler (评论调度层)
//!   ├── ViewerCountSimulator (观众数模拟层)
//!   ├── ToggleStore (开关存储层)
//!   ├── KeyCommandRouter (键盘路由层)
//!   ├── AutoScrollPolicy (吸底滚动策略)
//!   └── EventManager (事件系统层)
//! ```
//!
//! 设计原则：
//! - 每个存储只有一个逻辑所有者，只通过声明的操作变更
//! - 展示层只读：通过事件订阅 + 快照观察状态，核心不反向依赖
//! - 视频采集 / 渲染 / 网络发送都是外部协作方，核心只给参数

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{LiveShowError, Result};
use crate::events::{now_millis, EventFilter, EventManager, FilteredEventReceiver, LiveEvent};
use crate::keyboard::{FocusRole, KeyCommand, KeyCommandRouter};
use crate::scheduler::CommentScheduler;
use crate::script::{CommentRecord, CommentScript, ProductInfo};
use crate::scroll::{AutoScrollPolicy, DEFAULT_STICK_TOLERANCE};
use crate::toggles::{BackgroundSettings, ToggleStore, ToggleValue};
use crate::viewer::{format_viewer_count, ViewerCountConfig, ViewerCountSimulator};

/// 会话配置
#[derive(Debug, Clone)]
pub struct LiveShowConfig {
    /// 事件缓冲区大小
    pub event_buffer_size: usize,
    /// 观众数模拟配置
    pub viewer_config: ViewerCountConfig,
    /// 随机种子；None 表示熵种子
    pub rng_seed: Option<u64>,
    /// 初始化完成后是否立即启动观众数模拟
    pub auto_start_viewer: bool,
    /// 吸底滚动容差
    pub scroll_tolerance: f64,
    /// 商品卡数据；None 表示不带商品
    pub product: Option<ProductInfo>,
}

impl Default for LiveShowConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            viewer_config: ViewerCountConfig::default(),
            rng_seed: None,
            auto_start_viewer: true,
            scroll_tolerance: DEFAULT_STICK_TOLERANCE,
            product: Some(ProductInfo::demo()),
        }
    }
}

impl LiveShowConfig {
    pub fn builder() -> LiveShowConfigBuilder {
        LiveShowConfigBuilder::new()
    }
}

/// 会话配置构建器
pub struct LiveShowConfigBuilder {
    config: LiveShowConfig,
}

impl LiveShowConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: LiveShowConfig::default(),
        }
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.config.event_buffer_size = size;
        self
    }

    pub fn viewer_config(mut self, config: ViewerCountConfig) -> Self {
        self.config.viewer_config = config;
        self
    }

    /// 注入固定随机种子，观众数游走可复现
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.config.rng_seed = Some(seed);
        self
    }

    pub fn auto_start_viewer(mut self, enabled: bool) -> Self {
        self.config.auto_start_viewer = enabled;
        self
    }

    pub fn scroll_tolerance(mut self, tolerance: f64) -> Self {
        self.config.scroll_tolerance = tolerance;
        self
    }

    pub fn product(mut self, product: Option<ProductInfo>) -> Self {
        self.config.product = product;
        self
    }

    pub fn build(self) -> LiveShowConfig {
        self.config
    }
}

impl Default for LiveShowConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 展示层只读快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSnapshot {
    /// 主播用户名（脚本下标 0）
    pub host_username: String,
    /// 主播头像
    pub host_avatar_url: String,
    /// 可见评论流
    pub visible_comments: Vec<CommentRecord>,
    /// 观众数
    pub viewer_count: i64,
    /// 观众数展示串（"2.5K"）
    pub viewer_count_display: String,
    /// 全部开关状态
    pub toggles: HashMap<String, ToggleValue>,
    /// 自动播放是否开启
    pub auto_flowing: bool,
    /// 脚本是否已播完
    pub exhausted: bool,
    /// 评论流增长时是否应滚到底
    pub stick_to_end: bool,
    /// 背景/采集参数
    pub background: BackgroundSettings,
    /// 商品卡数据
    pub product: Option<ProductInfo>,
    /// 快照时间戳（UTC 毫秒）
    pub timestamp: u64,
}

/// 直播模拟会话
pub struct LiveShowSession {
    /// 会话配置
    config: LiveShowConfig,
    /// 评论脚本
    script: Arc<CommentScript>,
    /// 事件管理器
    event_manager: Arc<EventManager>,
    /// 评论调度器
    scheduler: Arc<CommentScheduler>,
    /// 观众数模拟器
    viewer: Arc<ViewerCountSimulator>,
    /// 开关存储
    toggles: Arc<ToggleStore>,
    /// 吸底滚动策略
    scroll: Arc<AutoScrollPolicy>,
    /// 键盘路由器
    router: Arc<KeyCommandRouter>,
    /// 是否已初始化
    initialized: Arc<RwLock<bool>>,
    /// 是否正在关闭
    shutting_down: Arc<RwLock<bool>>,
}

impl LiveShowSession {
    /// 使用内置演示脚本初始化会话
    pub async fn initialize(config: LiveShowConfig) -> Result<Arc<Self>> {
        Self::initialize_with_script(config, CommentScript::demo()).await
    }

    /// 使用外部脚本初始化会话
    ///
    /// 分层初始化顺序：事件层 → 存储层 → 定时层 → 路由层。
    pub async fn initialize_with_script(
        config: LiveShowConfig,
        script: CommentScript,
    ) -> Result<Arc<Self>> {
        info!("正在初始化 LiveShowSession...");

        if config.event_buffer_size == 0 {
            return Err(LiveShowError::Config(
                "event_buffer_size 必须大于 0".to_string(),
            ));
        }

        let script = Arc::new(script);

        // === 第1层：事件管理器 ===
        let event_manager = Arc::new(EventManager::new(config.event_buffer_size));

        // === 第2层：开关存储 ===
        let toggles = Arc::new(ToggleStore::new(event_manager.clone()));
        info!("开关存储初始化完成");

        // === 第3层：评论调度器 ===
        let scheduler = Arc::new(CommentScheduler::new(script.clone(), event_manager.clone()));
        info!(
            "评论调度器初始化完成: 主播 {}，共 {} 条评论",
            script.host().username,
            script.comment_count()
        );

        // === 第4层：观众数模拟器 ===
        let viewer = Arc::new(match config.rng_seed {
            Some(seed) => ViewerCountSimulator::with_seed(
                event_manager.clone(),
                config.viewer_config.clone(),
                seed,
            ),
            None => {
                ViewerCountSimulator::with_config(event_manager.clone(), config.viewer_config.clone())
            }
        });

        // === 第5层：吸底滚动策略 ===
        let scroll = Arc::new(AutoScrollPolicy::with_tolerance(config.scroll_tolerance));

        // === 第6层：键盘路由器 ===
        let router = Arc::new(KeyCommandRouter::new(
            scheduler.clone(),
            toggles.clone(),
            viewer.clone(),
            event_manager.clone(),
        ));
        info!("键盘路由器初始化完成");

        let session = Arc::new(Self {
            config,
            script,
            event_manager,
            scheduler,
            viewer,
            toggles,
            scroll,
            router,
            initialized: Arc::new(RwLock::new(true)),
            shutting_down: Arc::new(RwLock::new(false)),
        });

        if session.config.auto_start_viewer {
            session.viewer.start();
        }

        info!("✅ LiveShowSession 初始化完成");
        Ok(session)
    }

    /// 订阅全部事件
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.event_manager.subscribe()
    }

    /// 订阅过滤后的事件
    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredEventReceiver {
        self.event_manager.subscribe_filtered(filter)
    }

    /// 处理宿主转发的按键事件
    pub fn handle_key(&self, key: &str, focus: FocusRole) -> Option<KeyCommand> {
        self.router.handle_key(key, focus)
    }

    /// 展示层只读快照
    pub fn snapshot(&self) -> LiveSnapshot {
        let host = self.script.host();
        let viewer_count = self.viewer.count();

        LiveSnapshot {
            host_username: host.username.clone(),
            host_avatar_url: host.avatar_url.clone(),
            visible_comments: self.scheduler.visible_comments(),
            viewer_count,
            viewer_count_display: format_viewer_count(viewer_count),
            toggles: self.toggles.snapshot(),
            auto_flowing: self.scheduler.is_auto_flowing(),
            exhausted: self.scheduler.is_exhausted(),
            stick_to_end: self.scroll.should_follow(),
            background: self.toggles.background_settings(),
            product: self.config.product.clone(),
            timestamp: now_millis(),
        }
    }

    /// 用户发送的评论：接受并丢弃
    ///
    /// 网络发送不在本模拟范围内；内容校验后仅记日志。
    pub async fn submit_comment(&self, text: &str) -> Result<()> {
        if *self.shutting_down.read().await {
            return Err(LiveShowError::ShuttingDown("会话正在关闭".to_string()));
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LiveShowError::InvalidInput("评论内容为空".to_string()));
        }
        debug!("丢弃用户评论（发送功能不在模拟范围）: {}", trimmed);
        Ok(())
    }

    /// 交给视频采集提供方的背景参数
    pub fn background_settings(&self) -> BackgroundSettings {
        self.toggles.background_settings()
    }

    /// 评论调度器
    pub fn scheduler(&self) -> &Arc<CommentScheduler> {
        &self.scheduler
    }

    /// 观众数模拟器
    pub fn viewer(&self) -> &Arc<ViewerCountSimulator> {
        &self.viewer
    }

    /// 开关存储
    pub fn toggles(&self) -> &Arc<ToggleStore> {
        &self.toggles
    }

    /// 吸底滚动策略
    pub fn scroll_policy(&self) -> &Arc<AutoScrollPolicy> {
        &self.scroll
    }

    /// 键盘路由器
    pub fn router(&self) -> &Arc<KeyCommandRouter> {
        &self.router
    }

    /// 事件管理器
    pub fn event_manager(&self) -> &Arc<EventManager> {
        &self.event_manager
    }

    /// 评论脚本
    pub fn script(&self) -> &Arc<CommentScript> {
        &self.script
    }

    /// 检查会话是否已初始化
    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// 检查会话是否正在关闭
    pub async fn is_shutting_down(&self) -> bool {
        *self.shutting_down.read().await
    }

    /// 关闭会话
    ///
    /// 每个已启动的定时器都在这里配对取消。
    pub async fn shutdown(&self) -> Result<()> {
        info!("正在关闭 LiveShowSession...");

        {
            let mut shutting_down = self.shutting_down.write().await;
            *shutting_down = true;
        }

        self.scheduler.set_auto_flowing(false);
        self.viewer.stop();

        {
            let mut initialized = self.initialized.write().await;
            *initialized = false;
        }

        info!("LiveShowSession 关闭完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toggles::toggle_names;
    use std::time::Duration;

    fn quiet_config() -> LiveShowConfig {
        // 关掉自动观众数模拟，测试里手动控制时间
        LiveShowConfig::builder()
            .auto_start_viewer(false)
            .rng_seed(7)
            .build()
    }

    #[tokio::test]
    async fn test_initialize_and_snapshot() {
        let session = LiveShowSession::initialize(quiet_config()).await.unwrap();
        assert!(session.is_initialized().await);

        let snapshot = session.snapshot();
        assert!(!snapshot.host_username.is_empty());
        assert_eq!(snapshot.visible_comments.len(), 0);
        assert_eq!(snapshot.viewer_count, 1250);
        assert_eq!(snapshot.viewer_count_display, "1.2K");
        assert!(!snapshot.auto_flowing);
        assert!(snapshot.stick_to_end);
        assert!(snapshot.product.is_some());
        assert!(snapshot.toggles.contains_key(toggle_names::STICKER_VISIBLE));
    }

    #[tokio::test]
    async fn test_zero_event_buffer_rejected() {
        let config = LiveShowConfig::builder().event_buffer_size(0).build();
        assert!(LiveShowSession::initialize(config).await.is_err());
    }

    #[tokio::test]
    async fn test_key_driven_flow_through_facade() {
        let session = LiveShowSession::initialize(quiet_config()).await.unwrap();

        // Space 前进一条；H 藏贴纸；] 加观众
        session.handle_key("Space", FocusRole::None);
        session.handle_key("h", FocusRole::None);
        session.handle_key("]", FocusRole::None);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.visible_comments.len(), 1);
        assert_eq!(
            snapshot.toggles.get(toggle_names::STICKER_VISIBLE),
            Some(&ToggleValue::Bool(false))
        );
        assert_eq!(snapshot.viewer_count, 1260);
    }

    #[tokio::test]
    async fn test_submit_comment_is_accept_and_discard() {
        let session = LiveShowSession::initialize(quiet_config()).await.unwrap();

        let before = session.snapshot();
        session.submit_comment("主播好漂亮").await.unwrap();
        let after = session.snapshot();

        // 可见评论流不变：发送只是吞掉
        assert_eq!(
            before.visible_comments.len(),
            after.visible_comments.len()
        );

        assert!(session.submit_comment("   ").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timers() {
        let config = LiveShowConfig::builder().rng_seed(3).build();
        let session = LiveShowSession::initialize(config).await.unwrap();

        session.scheduler().set_auto_flowing(true);
        tokio::time::sleep(Duration::from_millis(5)).await;

        session.shutdown().await.unwrap();
        assert!(session.is_shutting_down().await);
        assert!(!session.is_initialized().await);
        assert!(!session.scheduler().is_auto_flowing());

        let frozen_comments = session.scheduler().visible_len();
        let frozen_count = session.viewer().count();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(session.scheduler().visible_len(), frozen_comments);
        assert_eq!(session.viewer().count(), frozen_count);

        assert!(session.submit_comment("还在吗").await.is_err());
    }

    #[tokio::test]
    async fn test_background_settings_follow_toggles() {
        let session = LiveShowSession::initialize(quiet_config()).await.unwrap();

        session
            .toggles()
            .set(toggle_names::BACKGROUND_MODE, "color")
            .unwrap();
        session
            .toggles()
            .set(toggle_names::BACKGROUND_COLOR, "#00FF00")
            .unwrap();

        let settings = session.background_settings();
        assert_eq!(settings.mode.as_str(), "color");
        assert_eq!(settings.color, "#00FF00");
    }
}
