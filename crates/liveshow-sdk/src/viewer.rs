//! 观众数模拟模块 - 软边界随机游走
//!
//! 功能包括：
//! - 独立定时器自驱动：每个 tick 给观众数加一个随机增量
//! - 软边界 [1250, 3500]：越界时只偏置游走方向，不做硬夹紧
//! - 手动增减（快捷键 ±10），不干扰定时器节奏
//! - 可注入随机种子，便于测试复现
//!
//! 下一次 tick 的间隔取自 [100ms, 2000ms) 均匀分布；取消依赖代数计数器，
//! 过期任务在醒来时发现代数不符即自行退出。

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::events::{now_millis, EventManager, LiveEvent};

/// 观众数模拟配置
#[derive(Debug, Clone)]
pub struct ViewerCountConfig {
    /// 初始观众数
    pub initial_count: i64,
    /// 软下界
    pub soft_min: i64,
    /// 软上界
    pub soft_max: i64,
    /// 单步随机增量下界（含）
    pub step_min: i64,
    /// 单步随机增量上界（含）
    pub step_max: i64,
    /// 越界时的纠偏附加量
    pub correction: i64,
    /// tick 间隔下界（毫秒，含）
    pub tick_interval_min_ms: u64,
    /// tick 间隔上界（毫秒，不含）
    pub tick_interval_max_ms: u64,
}

impl Default for ViewerCountConfig {
    fn default() -> Self {
        Self {
            initial_count: 1250,
            soft_min: 1250,
            soft_max: 3500,
            step_min: -15,          // 轻微右偏的居中随机步
            step_max: 20,
            correction: 5,
            tick_interval_min_ms: 100,
            tick_interval_max_ms: 2000,
        }
    }
}

/// 计算单个 tick 的增量
///
/// 带内：uniform[step_min, step_max]；低于软下界强制 |delta|+correction；
/// 高于软上界强制 -|delta|-correction。只偏置方向，不夹紧取值。
pub(crate) fn compute_delta(rng: &mut StdRng, value: i64, config: &ViewerCountConfig) -> i64 {
    let delta = rng.gen_range(config.step_min..=config.step_max);
    if value < config.soft_min {
        delta.abs() + config.correction
    } else if value > config.soft_max {
        -delta.abs() - config.correction
    } else {
        delta
    }
}

/// 观众数统计信息
#[derive(Debug, Clone, Default)]
pub struct ViewerCountStats {
    /// 已执行的自动 tick 数
    pub ticks: u64,
    /// 手动增减次数
    pub manual_nudges: u64,
}

/// 观众数模拟器
pub struct ViewerCountSimulator {
    /// 当前观众数
    value: Arc<AtomicI64>,
    /// 定时器代数（取消令牌）
    generation: Arc<AtomicU64>,
    /// 随机源（可注入种子）
    rng: Arc<Mutex<StdRng>>,
    /// 配置
    config: ViewerCountConfig,
    /// 事件管理器
    event_manager: Arc<EventManager>,
    /// tick 计数
    tick_count: Arc<AtomicU64>,
    /// 手动增减计数
    nudge_count: Arc<AtomicU64>,
}

impl ViewerCountSimulator {
    /// 创建新的观众数模拟器（熵种子）
    pub fn new(event_manager: Arc<EventManager>) -> Self {
        Self::with_config(event_manager, ViewerCountConfig::default())
    }

    /// 使用自定义配置创建（熵种子）
    pub fn with_config(event_manager: Arc<EventManager>, config: ViewerCountConfig) -> Self {
        // 使用 StdRng 而不是 thread_rng()，thread_rng() 不是 Send 的，不能跨 await 持有
        Self::build(event_manager, config, StdRng::from_entropy())
    }

    /// 使用固定种子创建，随机游走可复现
    pub fn with_seed(event_manager: Arc<EventManager>, config: ViewerCountConfig, seed: u64) -> Self {
        Self::build(event_manager, config, StdRng::seed_from_u64(seed))
    }

    fn build(event_manager: Arc<EventManager>, config: ViewerCountConfig, rng: StdRng) -> Self {
        Self {
            value: Arc::new(AtomicI64::new(config.initial_count)),
            generation: Arc::new(AtomicU64::new(0)),
            rng: Arc::new(Mutex::new(rng)),
            config,
            event_manager,
            tick_count: Arc::new(AtomicU64::new(0)),
            nudge_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 当前观众数
    pub fn count(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// 启动自驱动随机游走
    ///
    /// 第一个 tick 立即执行，之后按随机间隔自排程。重复 start 会让
    /// 旧任务在下次醒来时退出，不会出现双重排程。
    pub fn start(&self) {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let value = self.value.clone();
        let generation = self.generation.clone();
        let rng = self.rng.clone();
        let config = self.config.clone();
        let event_manager = self.event_manager.clone();
        let tick_count = self.tick_count.clone();

        info!("📈 观众数模拟启动: 初始 {}", value.load(Ordering::SeqCst));

        tokio::spawn(async move {
            loop {
                // 代数不符说明已被 stop() 或新一轮 start() 取代
                if generation.load(Ordering::SeqCst) != my_generation {
                    debug!("Viewer count tick superseded, exiting");
                    break;
                }

                let delta = {
                    let mut rng = rng.lock();
                    compute_delta(&mut rng, value.load(Ordering::SeqCst), &config)
                };
                // fetch_add 与 apply_delta 串行化，落在中间的手动增减不会被吞掉
                let old_value = value.fetch_add(delta, Ordering::SeqCst);
                let new_value = old_value + delta;
                tick_count.fetch_add(1, Ordering::SeqCst);

                event_manager.emit(LiveEvent::ViewerCountChanged {
                    old_value,
                    new_value,
                    delta,
                    timestamp: now_millis(),
                });

                let wait_ms = {
                    let mut rng = rng.lock();
                    rng.gen_range(config.tick_interval_min_ms..config.tick_interval_max_ms)
                };
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
        });
    }

    /// 停止随机游走，取消未触发的 tick
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!("📉 观众数模拟停止: 当前 {}", self.count());
    }

    /// 手动增减观众数（快捷键 ±10）
    ///
    /// 只改数值并广播，不碰定时器的排程。
    pub fn apply_delta(&self, delta: i64) {
        let old_value = self.value.fetch_add(delta, Ordering::SeqCst);
        self.nudge_count.fetch_add(1, Ordering::SeqCst);

        self.event_manager.emit(LiveEvent::ViewerCountChanged {
            old_value,
            new_value: old_value + delta,
            delta,
            timestamp: now_millis(),
        });
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> ViewerCountStats {
        ViewerCountStats {
            ticks: self.tick_count.load(Ordering::SeqCst),
            manual_nudges: self.nudge_count.load(Ordering::SeqCst),
        }
    }
}

/// 观众数展示格式化：1000 以上显示为 "x.yK"
pub fn format_viewer_count(count: i64) -> String {
    if count >= 1000 {
        format!("{:.1}K", count as f64 / 1000.0)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ViewerCountConfig {
        ViewerCountConfig::default()
    }

    #[test]
    fn test_delta_below_min_is_corrective() {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        // 低于软下界时，增量必须是 |delta|+5，严格为正且幅度 >= 5
        for _ in 0..100 {
            let delta = compute_delta(&mut rng, 1200, &config);
            assert!(delta >= config.correction);
        }
    }

    #[test]
    fn test_delta_above_max_is_corrective() {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let delta = compute_delta(&mut rng, 4000, &config);
            assert!(delta <= -config.correction);
        }
    }

    #[test]
    fn test_delta_in_band_is_unbiased() {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let delta = compute_delta(&mut rng, 2000, &config);
            assert!(delta >= config.step_min && delta <= config.step_max);
        }
    }

    #[test]
    fn test_trajectory_from_below_min_is_non_decreasing() {
        let config = test_config();
        let mut rng = StdRng::seed_from_u64(42);
        let mut value = 1000i64;
        // 带下方向上漂移：低于软下界期间轨迹单调不减
        while value < config.soft_min {
            let delta = compute_delta(&mut rng, value, &config);
            assert!(delta > 0);
            value += delta;
        }
        assert!(value >= config.soft_min);
    }

    #[test]
    fn test_format_viewer_count() {
        assert_eq!(format_viewer_count(999), "999");
        assert_eq!(format_viewer_count(2500), "2.5K");
        assert_eq!(format_viewer_count(3100), "3.1K");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_applies_immediately() {
        let manager = Arc::new(EventManager::new(100));
        let config = ViewerCountConfig {
            initial_count: 1200, // 低于软下界
            ..ViewerCountConfig::default()
        };
        let sim = ViewerCountSimulator::with_seed(manager, config, 1);

        sim.start();
        // 让已生成的任务跑到第一次 sleep
        tokio::time::sleep(Duration::from_millis(1)).await;

        // 第一个 tick 立即执行，且低于下界必须上漂
        assert!(sim.count() > 1200);
        assert!(sim.get_stats().ticks >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_tick() {
        let manager = Arc::new(EventManager::new(100));
        let sim = ViewerCountSimulator::with_seed(manager, test_config(), 2);

        sim.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        sim.stop();

        let frozen = sim.count();
        let ticks = sim.get_stats().ticks;
        // 已取消：再过很久也不会有新 tick
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(sim.count(), frozen);
        assert_eq!(sim.get_stats().ticks, ticks);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_nudges_survive_ticks() {
        let manager = Arc::new(EventManager::new(16));
        // 带内且步长为 0：tick 不改数值，只和手动增减竞争同一个计数器
        let config = ViewerCountConfig {
            initial_count: 2000,
            soft_min: 0,
            soft_max: 1_000_000,
            step_min: 0,
            step_max: 0,
            tick_interval_min_ms: 1,
            tick_interval_max_ms: 2,
            ..ViewerCountConfig::default()
        };
        let sim = Arc::new(ViewerCountSimulator::with_seed(manager, config, 9));
        sim.start();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let sim = sim.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                for _ in 0..20_000 {
                    sim.apply_delta(1);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        sim.stop();

        // 每一次手动增减都必须计入，tick 的读-改-写不能吞掉任何一次
        assert_eq!(sim.count(), 2000 + 4 * 20_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_nudge_does_not_touch_timer() {
        let manager = Arc::new(EventManager::new(100));
        let sim = ViewerCountSimulator::with_seed(manager, test_config(), 3);

        sim.apply_delta(10);
        sim.apply_delta(-10);

        let stats = sim.get_stats();
        assert_eq!(stats.manual_nudges, 2);
        // 未 start：没有任何自动 tick
        assert_eq!(stats.ticks, 0);
        assert_eq!(sim.count(), 1250);
    }
}
