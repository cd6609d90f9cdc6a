//! 键盘命令路由模块
//!
//! 功能包括：
//! - 固定按键表：一个命令可声明多个按键别名（含泰文键位变体）
//! - 焦点抑制：文本输入框持有焦点时，所有快捷键整体失效
//! - 同步分发：一个按键事件最多触发一次操作
//!
//! 重载会话（R）在核心层是空操作，只广播事件，由宿主环境执行。

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::{now_millis, EventManager, LiveEvent};
use crate::scheduler::CommentScheduler;
use crate::script::STICKER_ROTATION;
use crate::toggles::{toggle_names, ToggleStore};
use crate::viewer::ViewerCountSimulator;

/// 快捷键调整观众数的步长
pub const VIEWER_NUDGE: i64 = 10;

/// 当前焦点元素的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusRole {
    /// 无特殊焦点，快捷键生效
    None,
    /// 文本输入框持有焦点，全部快捷键失效
    TextInput,
}

/// 逻辑命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCommand {
    /// 手动前进一条评论（Space）
    AdvanceComment,
    /// 请求宿主重载会话（R）
    ReloadSession,
    /// 贴纸整体显示/隐藏（H，泰文 ้）
    ToggleStickerVisible,
    /// 商品卡显示/隐藏（J/K）
    ToggleProductCard,
    /// 贴纸两路轮换（4，泰文 ๔）
    CycleSticker,
    /// 自动点赞流开关（Y，泰文 ั）
    ToggleAutoLikes,
    /// 设置面板开关（C）
    ToggleSettings,
    /// 自动播放开关（A）
    ToggleAutoFlow,
    /// 观众数 +10（]）
    ViewerCountUp,
    /// 观众数 -10（[）
    ViewerCountDown,
}

/// 一条按键绑定：一个命令 + 它的全部按键别名
///
/// 别名是同一绑定的不同拼写（如大小写、本地化键位），不是独立绑定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBinding {
    /// 触发的命令
    pub command: KeyCommand,
    /// 按键别名列表
    pub aliases: Vec<String>,
}

impl KeyBinding {
    fn new(command: KeyCommand, aliases: &[&str]) -> Self {
        Self {
            command,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 缺省按键表
///
/// 泰文别名来自本地化键盘上同一物理键的 shift 变体。
pub fn default_bindings() -> Vec<KeyBinding> {
    vec![
        KeyBinding::new(KeyCommand::AdvanceComment, &["Space", " "]),
        KeyBinding::new(KeyCommand::ReloadSession, &["r", "R"]),
        KeyBinding::new(KeyCommand::ToggleStickerVisible, &["h", "H", "้"]),
        KeyBinding::new(KeyCommand::ToggleProductCard, &["j", "J", "k", "K"]),
        KeyBinding::new(KeyCommand::CycleSticker, &["4", "๔"]),
        KeyBinding::new(KeyCommand::ToggleAutoLikes, &["y", "Y", "ั"]),
        KeyBinding::new(KeyCommand::ToggleSettings, &["c", "C"]),
        KeyBinding::new(KeyCommand::ToggleAutoFlow, &["a", "A"]),
        KeyBinding::new(KeyCommand::ViewerCountUp, &["]"]),
        KeyBinding::new(KeyCommand::ViewerCountDown, &["["]),
    ]
}

/// 路由统计信息
#[derive(Debug, Clone, Default)]
pub struct RouterStats {
    /// 已分发的命令数
    pub dispatched: u64,
    /// 因焦点在输入框被抑制的按键数
    pub suppressed: u64,
    /// 未命中按键表的按键数
    pub unmatched: u64,
}

/// 键盘命令路由器
pub struct KeyCommandRouter {
    /// 按键表
    bindings: Vec<KeyBinding>,
    /// 评论调度器
    scheduler: Arc<CommentScheduler>,
    /// 开关存储
    toggles: Arc<ToggleStore>,
    /// 观众数模拟器
    viewer: Arc<ViewerCountSimulator>,
    /// 事件管理器
    event_manager: Arc<EventManager>,
    /// 统计
    stats: RwLock<RouterStats>,
}

impl KeyCommandRouter {
    /// 使用缺省按键表创建路由器
    pub fn new(
        scheduler: Arc<CommentScheduler>,
        toggles: Arc<ToggleStore>,
        viewer: Arc<ViewerCountSimulator>,
        event_manager: Arc<EventManager>,
    ) -> Self {
        Self::with_bindings(scheduler, toggles, viewer, event_manager, default_bindings())
    }

    /// 使用自定义按键表创建
    pub fn with_bindings(
        scheduler: Arc<CommentScheduler>,
        toggles: Arc<ToggleStore>,
        viewer: Arc<ViewerCountSimulator>,
        event_manager: Arc<EventManager>,
        bindings: Vec<KeyBinding>,
    ) -> Self {
        Self {
            bindings,
            scheduler,
            toggles,
            viewer,
            event_manager,
            stats: RwLock::new(RouterStats::default()),
        }
    }

    /// 当前按键表（只读）
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// 处理一次按键事件
    ///
    /// 焦点在文本输入框时整体抑制；否则按表命中第一条绑定并同步
    /// 执行一次对应操作。返回实际分发的命令。
    pub fn handle_key(&self, key: &str, focus: FocusRole) -> Option<KeyCommand> {
        if focus == FocusRole::TextInput {
            self.stats.write().suppressed += 1;
            debug!("Key {:?} suppressed: text input has focus", key);
            return None;
        }

        let command = match self
            .bindings
            .iter()
            .find(|binding| binding.aliases.iter().any(|alias| alias == key))
        {
            Some(binding) => binding.command,
            None => {
                self.stats.write().unmatched += 1;
                return None;
            }
        };

        self.dispatch(command);
        self.stats.write().dispatched += 1;
        Some(command)
    }

    fn dispatch(&self, command: KeyCommand) {
        debug!("Dispatching key command: {:?}", command);
        match command {
            KeyCommand::AdvanceComment => {
                self.scheduler.advance_one();
            }
            KeyCommand::ReloadSession => {
                // 核心层不执行重载，只通知宿主
                self.event_manager.emit(LiveEvent::SessionReloadRequested {
                    timestamp: now_millis(),
                });
            }
            KeyCommand::ToggleStickerVisible => {
                self.toggle_or_warn(toggle_names::STICKER_VISIBLE);
            }
            KeyCommand::ToggleProductCard => {
                self.toggle_or_warn(toggle_names::PRODUCT_CARD);
            }
            KeyCommand::CycleSticker => {
                if let Err(e) = self.toggles.cycle(toggle_names::STICKER, STICKER_ROTATION) {
                    warn!("⚠️ 贴纸轮换失败: {}", e);
                }
            }
            KeyCommand::ToggleAutoLikes => {
                self.toggle_or_warn(toggle_names::AUTO_LIKES);
            }
            KeyCommand::ToggleSettings => {
                self.toggle_or_warn(toggle_names::SETTINGS_OPEN);
            }
            KeyCommand::ToggleAutoFlow => {
                let enabled = self.scheduler.is_auto_flowing();
                self.scheduler.set_auto_flowing(!enabled);
            }
            KeyCommand::ViewerCountUp => {
                self.viewer.apply_delta(VIEWER_NUDGE);
            }
            KeyCommand::ViewerCountDown => {
                self.viewer.apply_delta(-VIEWER_NUDGE);
            }
        }
    }

    fn toggle_or_warn(&self, name: &str) {
        // 按键表只引用已声明的开关，走到这里的错误属于编程错误：记日志不致命
        if let Err(e) = self.toggles.toggle(name) {
            warn!("⚠️ 开关 {} 翻转失败: {}", name, e);
        }
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> RouterStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::CommentScript;

    struct Fixture {
        router: KeyCommandRouter,
        scheduler: Arc<CommentScheduler>,
        toggles: Arc<ToggleStore>,
        viewer: Arc<ViewerCountSimulator>,
    }

    fn fixture() -> Fixture {
        let manager = Arc::new(EventManager::new(100));
        let script = Arc::new(CommentScript::demo());
        let scheduler = Arc::new(CommentScheduler::new(script, manager.clone()));
        let toggles = Arc::new(ToggleStore::new(manager.clone()));
        let viewer = Arc::new(ViewerCountSimulator::with_seed(
            manager.clone(),
            Default::default(),
            1,
        ));
        let router = KeyCommandRouter::new(
            scheduler.clone(),
            toggles.clone(),
            viewer.clone(),
            manager,
        );
        Fixture {
            router,
            scheduler,
            toggles,
            viewer,
        }
    }

    #[tokio::test]
    async fn test_text_input_focus_suppresses_every_mapped_key() {
        let f = fixture();
        let before_toggles = f.toggles.snapshot();
        let before_cursor = f.scheduler.cursor();
        let before_count = f.viewer.count();

        for binding in default_bindings() {
            for alias in &binding.aliases {
                assert_eq!(f.router.handle_key(alias, FocusRole::TextInput), None);
            }
        }

        // 零状态变更
        assert_eq!(f.toggles.snapshot(), before_toggles);
        assert_eq!(f.scheduler.cursor(), before_cursor);
        assert_eq!(f.viewer.count(), before_count);
        assert!(!f.scheduler.is_auto_flowing());
        assert!(f.router.get_stats().suppressed > 0);
        assert_eq!(f.router.get_stats().dispatched, 0);
    }

    #[tokio::test]
    async fn test_space_advances_exactly_one_comment() {
        let f = fixture();
        let result = f.router.handle_key("Space", FocusRole::None);
        assert_eq!(result, Some(KeyCommand::AdvanceComment));
        assert_eq!(f.scheduler.visible_len(), 1);
    }

    #[tokio::test]
    async fn test_locale_alias_maps_to_same_command() {
        let f = fixture();
        // H 和泰文 ้ 是同一绑定的两个拼写
        assert_eq!(
            f.router.handle_key("h", FocusRole::None),
            Some(KeyCommand::ToggleStickerVisible)
        );
        assert_eq!(
            f.router.handle_key("้", FocusRole::None),
            Some(KeyCommand::ToggleStickerVisible)
        );
        // 翻转两次回到初值
        assert_eq!(
            f.toggles.get_bool(toggle_names::STICKER_VISIBLE),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_sticker_cycle_key() {
        let f = fixture();
        f.router.handle_key("4", FocusRole::None);
        assert_eq!(
            f.toggles.get_choice(toggle_names::STICKER),
            Some("THUMBS_UP".to_string())
        );
        f.router.handle_key("๔", FocusRole::None);
        assert_eq!(
            f.toggles.get_choice(toggle_names::STICKER),
            Some("PRE499".to_string())
        );
    }

    #[tokio::test]
    async fn test_viewer_count_nudge_keys() {
        let f = fixture();
        let before = f.viewer.count();
        f.router.handle_key("]", FocusRole::None);
        assert_eq!(f.viewer.count(), before + VIEWER_NUDGE);
        f.router.handle_key("[", FocusRole::None);
        assert_eq!(f.viewer.count(), before);
    }

    #[tokio::test]
    async fn test_auto_flow_key_toggles_flag() {
        let f = fixture();
        f.router.handle_key("a", FocusRole::None);
        assert!(f.scheduler.is_auto_flowing());
        f.router.handle_key("A", FocusRole::None);
        assert!(!f.scheduler.is_auto_flowing());
    }

    #[tokio::test]
    async fn test_reload_publishes_event_without_mutation() {
        let manager = Arc::new(EventManager::new(100));
        let script = Arc::new(CommentScript::demo());
        let scheduler = Arc::new(CommentScheduler::new(script, manager.clone()));
        let toggles = Arc::new(ToggleStore::new(manager.clone()));
        let viewer = Arc::new(ViewerCountSimulator::with_seed(
            manager.clone(),
            Default::default(),
            1,
        ));
        let router = KeyCommandRouter::new(
            scheduler.clone(),
            toggles,
            viewer,
            manager.clone(),
        );

        let mut receiver = manager.subscribe();
        router.handle_key("r", FocusRole::None);

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event_type(), "session_reload_requested");
        assert_eq!(scheduler.cursor(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_key_is_counted() {
        let f = fixture();
        assert_eq!(f.router.handle_key("z", FocusRole::None), None);
        assert_eq!(f.router.get_stats().unmatched, 1);
        assert_eq!(f.router.get_stats().dispatched, 0);
    }
}
