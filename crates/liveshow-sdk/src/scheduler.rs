//! 评论调度模块 - 按脚本回放观众评论
//!
//! 功能包括：
//! - 手动单步前进（快捷键 Space）
//! - 自动播放：展示一条后按该条自带的延迟自排程下一条
//! - 播完自动熄灭（auto 标志自动清除，可被订阅方观察到）
//! - 代数计数器取消：关掉再打开不会双重排程
//!
//! 终态策略：游标冻结在脚本末尾，不回绕到开头。延迟只影响"何时"
//! 前进，从不影响"下一条是什么"，因此回放是确定性的。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::events::{now_millis, EventManager, LiveEvent};
use crate::script::{CommentRecord, CommentScript};

/// 调度器内部状态
///
/// 游标从 1 起（下标 0 为主播记录），可见评论数恒等于 cursor - 1。
struct SchedulerState {
    /// 脚本游标 ∈ [1, script_len]
    cursor: usize,
    /// 可见评论流（只增）
    visible: Vec<CommentRecord>,
    /// 自动播放标志
    auto_flowing: bool,
}

/// 单步推进结果
enum StepOutcome {
    /// 前进了一步；Some(delay) 表示还有下一条要排程，None 表示这步到达末尾
    Advanced(Option<u64>),
    /// 已在终态，静默无操作
    AlreadyExhausted,
}

/// 调度器统计信息
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    /// 当前游标
    pub cursor: usize,
    /// 可见评论数
    pub visible_count: usize,
    /// 自动播放是否开启
    pub auto_flowing: bool,
    /// 是否已播完
    pub exhausted: bool,
}

/// 评论调度器
pub struct CommentScheduler {
    /// 评论脚本（不可变）
    script: Arc<CommentScript>,
    /// 内部状态
    state: Arc<RwLock<SchedulerState>>,
    /// 自动播放任务代数（取消令牌）
    generation: Arc<AtomicU64>,
    /// 事件管理器
    event_manager: Arc<EventManager>,
}

impl CommentScheduler {
    /// 创建新的评论调度器
    pub fn new(script: Arc<CommentScript>, event_manager: Arc<EventManager>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SchedulerState {
                cursor: 1,
                visible: Vec::new(),
                auto_flowing: false,
            })),
            generation: Arc::new(AtomicU64::new(0)),
            script,
            event_manager,
        }
    }

    /// 手动前进一条
    ///
    /// 已播完时静默无操作并返回 false，不会 panic。
    pub fn advance_one(&self) -> bool {
        !matches!(
            Self::advance_step(&self.script, &self.state, &self.event_manager),
            StepOutcome::AlreadyExhausted
        )
    }

    /// 开关自动播放
    ///
    /// 开启时立即前进一条，随后按刚展示那条的延迟自排程，直到播完或
    /// 被关闭。每次调用都会使旧任务的代数失效，旧定时器醒来后发现
    /// 代数不符即自行退出，因此关掉再打开不会双重排程。
    pub fn set_auto_flowing(&self, enabled: bool) {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !enabled {
            let was_flowing = {
                let mut state = self.state.write();
                let was = state.auto_flowing;
                state.auto_flowing = false;
                was
            };
            if was_flowing {
                info!("⏸️ 自动播放关闭");
                self.event_manager.emit(LiveEvent::AutoFlowChanged {
                    enabled: false,
                    timestamp: now_millis(),
                });
            }
            return;
        }

        {
            let mut state = self.state.write();
            if state.cursor >= self.script.len() {
                // 已播完：开启请求被忽略，标志保持 false
                debug!("Auto flow requested but script is exhausted");
                return;
            }
            state.auto_flowing = true;
        }
        info!("▶️ 自动播放开启");
        self.event_manager.emit(LiveEvent::AutoFlowChanged {
            enabled: true,
            timestamp: now_millis(),
        });

        let script = self.script.clone();
        let state = self.state.clone();
        let generation = self.generation.clone();
        let event_manager = self.event_manager.clone();

        tokio::spawn(async move {
            loop {
                // 代数不符说明本任务已被取代（关闭或重新开启）
                if generation.load(Ordering::SeqCst) != my_generation {
                    debug!("Auto flow task superseded, exiting");
                    break;
                }

                match Self::advance_step(&script, &state, &event_manager) {
                    StepOutcome::Advanced(Some(delay_ms)) => {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    // 到达末尾（标志已在推进时清除）或被手动推到终态
                    StepOutcome::Advanced(None) | StepOutcome::AlreadyExhausted => break,
                }
            }
        });
    }

    /// 推进一步并广播；锁内只改状态，事件在锁外发出
    fn advance_step(
        script: &CommentScript,
        state: &RwLock<SchedulerState>,
        event_manager: &EventManager,
    ) -> StepOutcome {
        let (record, cursor, exhausted, auto_cleared) = {
            let mut state = state.write();
            if state.cursor >= script.len() {
                return StepOutcome::AlreadyExhausted;
            }
            state.cursor += 1;
            let record = match script.get(state.cursor - 1) {
                Some(record) => record.clone(),
                None => return StepOutcome::AlreadyExhausted,
            };
            state.visible.push(record.clone());

            let exhausted = state.cursor == script.len();
            let auto_cleared = exhausted && state.auto_flowing;
            if auto_cleared {
                state.auto_flowing = false;
            }
            (record, state.cursor, exhausted, auto_cleared)
        };

        let delay_ms = record.effective_delay_ms();
        event_manager.emit(LiveEvent::CommentAppended {
            record,
            cursor,
            timestamp: now_millis(),
        });

        if exhausted {
            info!("🏁 脚本播完，游标冻结在末尾");
            event_manager.emit(LiveEvent::ScriptExhausted {
                timestamp: now_millis(),
            });
            if auto_cleared {
                event_manager.emit(LiveEvent::AutoFlowChanged {
                    enabled: false,
                    timestamp: now_millis(),
                });
            }
            StepOutcome::Advanced(None)
        } else {
            StepOutcome::Advanced(Some(delay_ms))
        }
    }

    /// 当前脚本游标
    pub fn cursor(&self) -> usize {
        self.state.read().cursor
    }

    /// 可见评论流快照
    pub fn visible_comments(&self) -> Vec<CommentRecord> {
        self.state.read().visible.clone()
    }

    /// 可见评论数
    pub fn visible_len(&self) -> usize {
        self.state.read().visible.len()
    }

    /// 自动播放是否开启
    pub fn is_auto_flowing(&self) -> bool {
        self.state.read().auto_flowing
    }

    /// 是否已播完
    pub fn is_exhausted(&self) -> bool {
        self.state.read().cursor >= self.script.len()
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> SchedulerStats {
        let state = self.state.read();
        SchedulerStats {
            cursor: state.cursor,
            visible_count: state.visible.len(),
            auto_flowing: state.auto_flowing,
            exhausted: state.cursor >= self.script.len(),
        }
    }
}
