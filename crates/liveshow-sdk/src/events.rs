//! 事件系统模块 - 直播模拟核心的状态变更广播
//!
//! 功能包括：
//! - 评论追加 / 脚本播完事件
//! - 自动播放开关事件
//! - 观众数变更事件
//! - 开关（贴纸、商品卡、背景等）变更事件
//! - 事件广播和订阅机制
//!
//! 展示层只读订阅这些事件来刷新画面，核心不反向依赖展示层。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::script::CommentRecord;
use crate::toggles::ToggleValue;

/// 取当前 UTC 毫秒时间戳
pub(crate) fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// 直播模拟事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiveEvent {
    /// 一条评论进入可见评论流
    CommentAppended {
        /// 刚刚展示的评论记录
        record: CommentRecord,
        /// 追加后的脚本游标
        cursor: usize,
        timestamp: u64,
    },
    /// 脚本播完（终态，游标冻结在末尾）
    ScriptExhausted { timestamp: u64 },
    /// 自动播放开关变更（含播完自动熄灭）
    AutoFlowChanged { enabled: bool, timestamp: u64 },
    /// 观众数变更
    ViewerCountChanged {
        old_value: i64,
        new_value: i64,
        delta: i64,
        timestamp: u64,
    },
    /// 开关变更（布尔开关或枚举开关）
    ToggleChanged {
        name: String,
        value: ToggleValue,
        timestamp: u64,
    },
    /// 请求宿主环境重载会话（核心层不执行任何动作）
    SessionReloadRequested { timestamp: u64 },
}

impl LiveEvent {
    /// 获取事件类型字符串
    pub fn event_type(&self) -> &'static str {
        match self {
            LiveEvent::CommentAppended { .. } => "comment_appended",
            LiveEvent::ScriptExhausted { .. } => "script_exhausted",
            LiveEvent::AutoFlowChanged { .. } => "auto_flow_changed",
            LiveEvent::ViewerCountChanged { .. } => "viewer_count_changed",
            LiveEvent::ToggleChanged { .. } => "toggle_changed",
            LiveEvent::SessionReloadRequested { .. } => "session_reload_requested",
        }
    }

    /// 获取事件时间戳（UTC 毫秒）
    pub fn timestamp(&self) -> u64 {
        match self {
            LiveEvent::CommentAppended { timestamp, .. } => *timestamp,
            LiveEvent::ScriptExhausted { timestamp } => *timestamp,
            LiveEvent::AutoFlowChanged { timestamp, .. } => *timestamp,
            LiveEvent::ViewerCountChanged { timestamp, .. } => *timestamp,
            LiveEvent::ToggleChanged { timestamp, .. } => *timestamp,
            LiveEvent::SessionReloadRequested { timestamp } => *timestamp,
        }
    }
}

/// 事件过滤器
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// 事件类型过滤器；None 表示不过滤
    pub event_types: Option<Vec<String>>,
}

impl EventFilter {
    /// 创建新的事件过滤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加事件类型过滤
    pub fn with_event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    /// 检查事件是否匹配过滤器
    pub fn matches(&self, event: &LiveEvent) -> bool {
        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| t == event.event_type()) {
                return false;
            }
        }
        true
    }
}

/// 事件监听器类型
pub type EventListener = Arc<dyn Fn(&LiveEvent) + Send + Sync>;

/// 事件统计信息
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    /// 总事件数
    pub total_events: u64,
    /// 按类型分组的事件数
    pub events_by_type: HashMap<String, u64>,
    /// 监听器数量
    pub listener_count: usize,
    /// 最后事件时间
    pub last_event_time: Option<u64>,
}

/// 事件管理器
///
/// emit 是同步的：按键触发的状态变更和定时器回调在单个逻辑所有者内
/// 串行执行，广播本身不需要 await。
pub struct EventManager {
    /// 广播发送器
    sender: broadcast::Sender<LiveEvent>,
    /// 事件监听器映射（"*" 为通配监听器）
    listeners: Arc<RwLock<HashMap<String, Vec<EventListener>>>>,
    /// 事件统计
    stats: Arc<RwLock<EventStats>>,
}

impl EventManager {
    /// 创建新的事件管理器
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        Self {
            sender,
            listeners: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(EventStats::default())),
        }
    }

    /// 发布事件
    pub fn emit(&self, event: LiveEvent) {
        debug!("Emitting event: {}", event.event_type());

        // 更新统计
        {
            let mut stats = self.stats.write();
            stats.total_events += 1;
            *stats
                .events_by_type
                .entry(event.event_type().to_string())
                .or_insert(0) += 1;
            stats.last_event_time = Some(event.timestamp());
        }

        // 广播事件（无订阅者时 send 会失败，属正常场景如无 UI 的压测，仅打 debug）
        if let Err(e) = self.sender.send(event.clone()) {
            debug!("Failed to broadcast event (no active receivers): {}", e);
        }

        // 先在锁内快照再调用：监听器回调里允许注册/清除监听器
        let to_call: Vec<EventListener> = {
            let listeners = self.listeners.read();
            let mut to_call = Vec::new();
            if let Some(event_listeners) = listeners.get(event.event_type()) {
                to_call.extend(event_listeners.iter().cloned());
            }
            // 通配监听器
            if let Some(general_listeners) = listeners.get("*") {
                to_call.extend(general_listeners.iter().cloned());
            }
            to_call
        };
        for listener in to_call {
            listener(&event);
        }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }

    /// 订阅特定类型的事件
    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredEventReceiver {
        let receiver = self.sender.subscribe();
        FilteredEventReceiver::new(receiver, filter)
    }

    /// 添加事件监听器
    pub fn add_listener<F>(&self, event_type: &str, listener: F)
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write();
        listeners
            .entry(event_type.to_string())
            .or_insert_with(Vec::new)
            .push(Arc::new(listener));

        // 更新监听器统计
        let mut stats = self.stats.write();
        stats.listener_count = listeners.values().map(|v| v.len()).sum();

        info!("Added listener for event type: {}", event_type);
    }

    /// 移除所有监听器
    pub fn clear_listeners(&self) {
        let mut listeners = self.listeners.write();
        listeners.clear();

        let mut stats = self.stats.write();
        stats.listener_count = 0;

        info!("Cleared all event listeners");
    }

    /// 获取事件统计
    pub fn get_stats(&self) -> EventStats {
        self.stats.read().clone()
    }

    /// 获取活跃订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// 过滤事件接收器
pub struct FilteredEventReceiver {
    receiver: broadcast::Receiver<LiveEvent>,
    filter: EventFilter,
}

impl FilteredEventReceiver {
    /// 创建新的过滤事件接收器
    pub fn new(receiver: broadcast::Receiver<LiveEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// 接收下一个匹配的事件
    pub async fn recv(&mut self) -> Result<LiveEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// 尝试接收事件（非阻塞）
    pub fn try_recv(&mut self) -> Result<LiveEvent, broadcast::error::TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}
