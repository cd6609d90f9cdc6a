//! 吸底滚动策略
//!
//! 观众停在列表末尾时，新评论到来自动滚到底；一旦观众手动往上翻，
//! 追加评论不再强制拉回底部。

use parking_lot::RwLock;

/// 判定"在末尾"的容差（与视口同单位）
pub const DEFAULT_STICK_TOLERANCE: f64 = 20.0;

/// 吸底滚动策略
pub struct AutoScrollPolicy {
    /// 当前是否吸底（初始为 true）
    stick_to_end: RwLock<bool>,
    /// 容差
    tolerance: f64,
}

impl AutoScrollPolicy {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_STICK_TOLERANCE)
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            stick_to_end: RwLock::new(true),
            tolerance,
        }
    }

    /// 展示层在每次用户滚动后上报视口位置
    ///
    /// `scroll_top` 已滚距离、`scroll_height` 内容总高、`viewport_height` 视口高。
    pub fn observe_scroll(&self, scroll_top: f64, scroll_height: f64, viewport_height: f64) {
        let at_end = scroll_height - scroll_top <= viewport_height + self.tolerance;
        *self.stick_to_end.write() = at_end;
    }

    /// 评论流增长时是否应滚到底
    pub fn should_follow(&self) -> bool {
        *self.stick_to_end.read()
    }
}

impl Default for AutoScrollPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initially_sticks_to_end() {
        let policy = AutoScrollPolicy::new();
        assert!(policy.should_follow());
    }

    #[test]
    fn test_scrolling_up_releases_stick() {
        let policy = AutoScrollPolicy::new();
        // 内容高 1000，视口 400，滚到 100 处：离底部很远
        policy.observe_scroll(100.0, 1000.0, 400.0);
        assert!(!policy.should_follow());
    }

    #[test]
    fn test_scrolling_back_within_tolerance_restores_stick() {
        let policy = AutoScrollPolicy::new();
        policy.observe_scroll(100.0, 1000.0, 400.0);
        assert!(!policy.should_follow());

        // 585 + 400 + 20 >= 1000，在容差内算到底
        policy.observe_scroll(585.0, 1000.0, 400.0);
        assert!(policy.should_follow());
    }

    #[test]
    fn test_exact_end() {
        let policy = AutoScrollPolicy::new();
        policy.observe_scroll(600.0, 1000.0, 400.0);
        assert!(policy.should_follow());
    }
}
