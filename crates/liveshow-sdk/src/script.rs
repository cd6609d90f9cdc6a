//! 评论脚本模块 - 直播间的"台本"数据
//!
//! 功能包括：
//! - 评论记录（CommentRecord）与脚本（CommentScript）数据结构
//! - 第 0 条记录约定为主播身份（用户名 + 头像），永远不进入可见评论流
//! - 每条评论可携带自己的播放延迟，缺省 6000ms
//! - 从 JSON 载入外部脚本，或使用内置演示脚本
//! - 贴纸素材目录与商品卡数据

use serde::{Deserialize, Serialize};

use crate::error::{LiveShowError, Result};

/// 缺省评论延迟（毫秒）- 脚本未指定 delay_ms 时使用
pub const DEFAULT_COMMENT_DELAY_MS: u64 = 6000;

// ========== 贴纸素材目录 ==========

/// 贴纸 ID：预售 499 角标
pub const STICKER_PRE499: &str = "PRE499";
/// 贴纸 ID：点赞（按键 4 与 PRE499 轮换）
pub const STICKER_THUMBS_UP: &str = "THUMBS_UP";
/// 贴纸 ID：大笑
pub const STICKER_LAUGH: &str = "LAUGH";
/// 贴纸 ID：惊讶
pub const STICKER_WOW: &str = "WOW";

/// 已声明的贴纸目录（sticker 开关的合法取值域）
pub const STICKER_CATALOG: &[&str] = &[
    STICKER_PRE499,
    STICKER_THUMBS_UP,
    STICKER_LAUGH,
    STICKER_WOW,
];

/// 按键 4 的两路轮换序列
pub const STICKER_ROTATION: &[&str] = &[STICKER_PRE499, STICKER_THUMBS_UP];

/// 查询贴纸对应的素材路径
pub fn sticker_asset(sticker_id: &str) -> Option<&'static str> {
    match sticker_id {
        STICKER_PRE499 => Some("/sticker/box199.png"),
        STICKER_THUMBS_UP => Some("/sticker/boxpre499.png"),
        STICKER_LAUGH => Some("/sticker/199discount.png"),
        STICKER_WOW => Some("/sticker/199discount.png"),
        _ => None,
    }
}

// ========== 数据结构 ==========

/// 评论记录
///
/// 完全来自外部脚本提供方，不可变；数组下标即播放顺序。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    /// 记录 ID（脚本内唯一即可）
    pub id: u64,
    /// 用户名
    pub username: String,
    /// 头像 URL
    #[serde(default)]
    pub avatar_url: String,
    /// 评论内容
    #[serde(default)]
    pub text: String,
    /// 展示该条后、播放下一条前的延迟（毫秒）；None 时使用缺省 6000ms
    #[serde(default, alias = "delay")]
    pub delay_ms: Option<u64>,
}

impl CommentRecord {
    /// 该条生效的延迟（毫秒）
    pub fn effective_delay_ms(&self) -> u64 {
        self.delay_ms.unwrap_or(DEFAULT_COMMENT_DELAY_MS)
    }
}

/// 商品卡数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    /// 商品 ID
    pub id: u64,
    /// 商品名称
    pub name: String,
    /// 价格（展示字符串）
    pub price: String,
    /// 商品图片路径
    pub image: String,
}

impl ProductInfo {
    /// 内置演示商品
    pub fn demo() -> Self {
        Self {
            id: 1,
            name: "幸运盲盒".to_string(),
            price: "199".to_string(),
            image: "/sticker/box.png".to_string(),
        }
    }
}

/// 评论脚本 - 固定有序的评论记录列表
///
/// 约定：下标 0 为主播身份记录，只用于头部展示，永远不进入可见评论流。
#[derive(Debug, Clone)]
pub struct CommentScript {
    records: Vec<CommentRecord>,
}

impl CommentScript {
    /// 从记录列表构建脚本
    ///
    /// 至少要有 1 条记录（主播身份记录）。
    pub fn from_records(records: Vec<CommentRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(LiveShowError::InvalidScript(
                "脚本为空：至少需要下标 0 的主播身份记录".to_string(),
            ));
        }
        Ok(Self { records })
    }

    /// 从 JSON 数组载入脚本
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<CommentRecord> = serde_json::from_str(json)
            .map_err(|e| LiveShowError::InvalidScript(format!("JSON 解析失败: {}", e)))?;
        Self::from_records(records)
    }

    /// 主播身份记录（下标 0）
    pub fn host(&self) -> &CommentRecord {
        &self.records[0]
    }

    /// 脚本总长度（含主播记录）
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 脚本不可能为空（构造时已校验），提供此方法仅为惯例
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 可播放的评论条数（不含主播记录）
    pub fn comment_count(&self) -> usize {
        self.records.len() - 1
    }

    /// 按下标取记录
    pub fn get(&self, index: usize) -> Option<&CommentRecord> {
        self.records.get(index)
    }

    /// 全部记录（只读）
    pub fn records(&self) -> &[CommentRecord] {
        &self.records
    }

    /// 内置演示脚本 - 盲盒带货专场
    pub fn demo() -> Self {
        let records = vec![
            CommentRecord {
                id: 0,
                username: "小雅好物直播间".to_string(),
                avatar_url: "/avatar/host.png".to_string(),
                text: String::new(),
                delay_ms: None,
            },
            CommentRecord {
                id: 1,
                username: "爱吃草莓的兔子".to_string(),
                avatar_url: "/avatar/u1.png".to_string(),
                text: "主播晚上好！今天有什么福利呀".to_string(),
                delay_ms: Some(2500),
            },
            CommentRecord {
                id: 2,
                username: "北极星_77".to_string(),
                avatar_url: "/avatar/u2.png".to_string(),
                text: "盲盒 199 真的假的，里面都有什么".to_string(),
                delay_ms: Some(3000),
            },
            CommentRecord {
                id: 3,
                username: "momo".to_string(),
                avatar_url: "/avatar/u3.png".to_string(),
                text: "上次抢到了！隐藏款超值".to_string(),
                delay_ms: Some(2000),
            },
            CommentRecord {
                id: 4,
                username: "深夜买手".to_string(),
                avatar_url: "/avatar/u4.png".to_string(),
                text: "求上链接！！".to_string(),
                delay_ms: Some(1500),
            },
            CommentRecord {
                id: 5,
                username: "蓝色多瑙河".to_string(),
                avatar_url: "/avatar/u5.png".to_string(),
                text: "已拍两单，坐等发货".to_string(),
                delay_ms: Some(4000),
            },
            CommentRecord {
                id: 6,
                username: "一只咸鱼".to_string(),
                avatar_url: "/avatar/u6.png".to_string(),
                text: "这个价格还要什么自行车".to_string(),
                delay_ms: Some(3500),
            },
            CommentRecord {
                id: 7,
                username: "爱吃草莓的兔子".to_string(),
                avatar_url: "/avatar/u1.png".to_string(),
                text: "拍下了拍下了，主播记得备注".to_string(),
                delay_ms: Some(5000),
            },
            CommentRecord {
                id: 8,
                username: "路过的风".to_string(),
                avatar_url: "/avatar/u7.png".to_string(),
                text: "还有库存吗？手慢了".to_string(),
                delay_ms: None,
            },
        ];
        // 演示数据固定非空，unwrap 安全
        Self::from_records(records).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_script_rejected() {
        let result = CommentScript::from_records(Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_demo_script_shape() {
        let script = CommentScript::demo();
        // 主播记录不计入评论数
        assert_eq!(script.comment_count(), script.len() - 1);
        assert!(script.comment_count() >= 3);
        assert!(!script.host().username.is_empty());
    }

    #[test]
    fn test_default_delay() {
        let record = CommentRecord {
            id: 1,
            username: "u".to_string(),
            avatar_url: String::new(),
            text: "hi".to_string(),
            delay_ms: None,
        };
        assert_eq!(record.effective_delay_ms(), DEFAULT_COMMENT_DELAY_MS);

        let record_with_delay = CommentRecord {
            delay_ms: Some(1200),
            ..record
        };
        assert_eq!(record_with_delay.effective_delay_ms(), 1200);
    }

    #[test]
    fn test_from_json_with_delay_alias() {
        let json = r#"[
            {"id": 0, "username": "主播", "avatar_url": "/a.png"},
            {"id": 1, "username": "观众", "text": "你好", "delay": 1000}
        ]"#;
        let script = CommentScript::from_json(json).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script.get(1).unwrap().delay_ms, Some(1000));
    }

    #[test]
    fn test_sticker_catalog() {
        for id in STICKER_CATALOG {
            assert!(sticker_asset(id).is_some());
        }
        assert!(sticker_asset("NOPE").is_none());
        // 轮换序列必须是目录子集
        for id in STICKER_ROTATION {
            assert!(STICKER_CATALOG.contains(id));
        }
    }
}
