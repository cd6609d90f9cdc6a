//! 开关存储模块 - 直播间装饰层的布尔/枚举状态
//!
//! 功能包括：
//! - 固定声明的开关集合（贴纸可见、自动点赞、商品卡、设置面板、背景模式等）
//! - 布尔开关翻转（toggle）、枚举开关赋值（set）、N 路轮换（cycle）
//! - 域校验：background_mode ∈ {video, color}，sticker ∈ 贴纸目录
//! - 所有读写同步完成，无最终一致性延迟
//!
//! 开关集合在构造时一次性声明完整，任何时刻每个键都有值（无半初始化状态）。

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{now_millis, EventManager, LiveEvent};
use crate::script::STICKER_CATALOG;

/// 已声明的开关名
pub mod toggle_names {
    /// 贴纸整体可见（布尔，按键 H）
    pub const STICKER_VISIBLE: &str = "sticker_visible";
    /// 右侧自动点赞流（布尔，按键 Y）
    pub const AUTO_LIKES: &str = "auto_likes";
    /// 商品卡可见（布尔，按键 J/K）
    pub const PRODUCT_CARD: &str = "product_card";
    /// 设置面板展开（布尔，按键 C）
    pub const SETTINGS_OPEN: &str = "settings_open";
    /// 背景模式（枚举：video | color）
    pub const BACKGROUND_MODE: &str = "background_mode";
    /// 背景纯色（开放域，色值字符串）
    pub const BACKGROUND_COLOR: &str = "background_color";
    /// 当前贴纸（枚举：贴纸目录，按键 4 轮换）
    pub const STICKER: &str = "sticker";
    /// 摄像头设备 ID（开放域，空串表示默认设备）
    pub const CAMERA_DEVICE: &str = "camera_device";
}

/// 开关取值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleValue {
    /// 布尔开关
    Bool(bool),
    /// 枚举/字符串开关
    Choice(String),
}

/// 开关操作错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToggleError {
    #[error("未声明的开关: {name}")]
    UnknownToggle { name: String },

    #[error("开关 {name} 的取值 {value} 不在声明域内")]
    InvalidValue { name: String, value: String },
}

/// 背景模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundMode {
    /// 摄像头画面
    Video,
    /// 纯色（色度键）
    Color,
}

impl BackgroundMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundMode::Video => "video",
            BackgroundMode::Color => "color",
        }
    }
}

impl std::fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackgroundMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(BackgroundMode::Video),
            "color" => Ok(BackgroundMode::Color),
            _ => Err(()),
        }
    }
}

/// 背景/采集参数 - 交给外部视频采集提供方
///
/// 核心只负责给参数，不触碰帧数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundSettings {
    /// 背景模式
    pub mode: BackgroundMode,
    /// 纯色模式的色值
    pub color: String,
    /// 指定摄像头设备；None 表示默认设备
    pub device_id: Option<String>,
}

/// 单个开关条目
#[derive(Debug, Clone)]
struct ToggleEntry {
    /// 当前值
    value: ToggleValue,
    /// 枚举开关的合法取值域；None 为开放域
    domain: Option<Vec<String>>,
}

/// 开关统计信息
#[derive(Debug, Clone, Default)]
pub struct ToggleStats {
    /// 成功变更次数
    pub total_changes: u64,
    /// 被拒绝的变更次数（UnknownToggle / InvalidValue）
    pub rejected_changes: u64,
}

/// 开关存储
pub struct ToggleStore {
    /// 开关条目
    entries: RwLock<HashMap<String, ToggleEntry>>,
    /// 事件管理器
    event_manager: Arc<EventManager>,
    /// 统计
    stats: RwLock<ToggleStats>,
}

impl ToggleStore {
    /// 创建开关存储，声明全部开关及初始值
    pub fn new(event_manager: Arc<EventManager>) -> Self {
        let mut entries = HashMap::new();

        let bool_entry = |v: bool| ToggleEntry {
            value: ToggleValue::Bool(v),
            domain: None,
        };
        entries.insert(toggle_names::STICKER_VISIBLE.to_string(), bool_entry(true));
        entries.insert(toggle_names::AUTO_LIKES.to_string(), bool_entry(true));
        entries.insert(toggle_names::PRODUCT_CARD.to_string(), bool_entry(true));
        entries.insert(toggle_names::SETTINGS_OPEN.to_string(), bool_entry(false));

        entries.insert(
            toggle_names::BACKGROUND_MODE.to_string(),
            ToggleEntry {
                value: ToggleValue::Choice("video".to_string()),
                domain: Some(vec!["video".to_string(), "color".to_string()]),
            },
        );
        entries.insert(
            toggle_names::BACKGROUND_COLOR.to_string(),
            ToggleEntry {
                value: ToggleValue::Choice("#FF00FF".to_string()),
                domain: None,
            },
        );
        entries.insert(
            toggle_names::STICKER.to_string(),
            ToggleEntry {
                value: ToggleValue::Choice(STICKER_CATALOG[0].to_string()),
                domain: Some(STICKER_CATALOG.iter().map(|s| s.to_string()).collect()),
            },
        );
        entries.insert(
            toggle_names::CAMERA_DEVICE.to_string(),
            ToggleEntry {
                value: ToggleValue::Choice(String::new()),
                domain: None,
            },
        );

        Self {
            entries: RwLock::new(entries),
            event_manager,
            stats: RwLock::new(ToggleStats::default()),
        }
    }

    /// 翻转布尔开关，返回翻转后的值
    pub fn toggle(&self, name: &str) -> Result<bool, ToggleError> {
        let new_value = {
            let mut entries = self.entries.write();
            let entry = match entries.get_mut(name) {
                Some(entry) => entry,
                None => return Err(self.reject_unknown(name)),
            };
            match entry.value {
                ToggleValue::Bool(current) => {
                    entry.value = ToggleValue::Bool(!current);
                    !current
                }
                // 枚举开关不能 toggle，视同未声明的布尔开关
                ToggleValue::Choice(_) => return Err(self.reject_unknown(name)),
            }
        };

        self.record_change(name, ToggleValue::Bool(new_value));
        Ok(new_value)
    }

    /// 为枚举开关赋值
    ///
    /// 有声明域的开关（background_mode / sticker）会做域校验，
    /// 域外取值被拒绝且保留原值。
    pub fn set(&self, name: &str, value: &str) -> Result<(), ToggleError> {
        {
            let mut entries = self.entries.write();
            let entry = match entries.get_mut(name) {
                Some(entry) => entry,
                None => return Err(self.reject_unknown(name)),
            };
            match entry.value {
                ToggleValue::Choice(_) => {}
                ToggleValue::Bool(_) => return Err(self.reject_unknown(name)),
            }
            if let Some(ref domain) = entry.domain {
                if !domain.iter().any(|v| v == value) {
                    return Err(self.reject_invalid(name, value));
                }
            }
            entry.value = ToggleValue::Choice(value.to_string());
        }

        self.record_change(name, ToggleValue::Choice(value.to_string()));
        Ok(())
    }

    /// 按固定序列轮换枚举开关，返回轮换后的值
    ///
    /// 当前值不在序列里时回到 candidates[0]；应用 len(candidates) 次
    /// 必然回到原值。
    pub fn cycle(&self, name: &str, candidates: &[&str]) -> Result<String, ToggleError> {
        if candidates.is_empty() {
            return Err(self.reject_invalid(name, "<empty candidates>"));
        }

        let current = match self.get(name) {
            Some(ToggleValue::Choice(v)) => v,
            Some(ToggleValue::Bool(_)) | None => return Err(self.reject_unknown(name)),
        };

        let next = match candidates.iter().position(|c| *c == current) {
            Some(pos) => candidates[(pos + 1) % candidates.len()],
            None => candidates[0],
        };

        self.set(name, next)?;
        Ok(next.to_string())
    }

    /// 读取开关当前值
    pub fn get(&self, name: &str) -> Option<ToggleValue> {
        self.entries.read().get(name).map(|e| e.value.clone())
    }

    /// 读取布尔开关
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ToggleValue::Bool(v)) => Some(v),
            _ => None,
        }
    }

    /// 读取枚举开关
    pub fn get_choice(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(ToggleValue::Choice(v)) => Some(v),
            _ => None,
        }
    }

    /// 全量快照（展示层只读）
    pub fn snapshot(&self) -> HashMap<String, ToggleValue> {
        self.entries
            .read()
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    /// 组装交给视频采集提供方的背景参数
    pub fn background_settings(&self) -> BackgroundSettings {
        let mode = self
            .get_choice(toggle_names::BACKGROUND_MODE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(BackgroundMode::Video);
        let color = self
            .get_choice(toggle_names::BACKGROUND_COLOR)
            .unwrap_or_else(|| "#FF00FF".to_string());
        let device_id = self
            .get_choice(toggle_names::CAMERA_DEVICE)
            .filter(|v| !v.is_empty());

        BackgroundSettings {
            mode,
            color,
            device_id,
        }
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> ToggleStats {
        self.stats.read().clone()
    }

    fn record_change(&self, name: &str, value: ToggleValue) {
        self.stats.write().total_changes += 1;
        debug!("Toggle changed: {} -> {:?}", name, value);
        self.event_manager.emit(LiveEvent::ToggleChanged {
            name: name.to_string(),
            value,
            timestamp: now_millis(),
        });
    }

    fn reject_unknown(&self, name: &str) -> ToggleError {
        self.stats.write().rejected_changes += 1;
        ToggleError::UnknownToggle {
            name: name.to_string(),
        }
    }

    fn reject_invalid(&self, name: &str, value: &str) -> ToggleError {
        self.stats.write().rejected_changes += 1;
        ToggleError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}
