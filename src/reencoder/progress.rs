//! # 进度与取消
//!
//! ## 设计思路
//!
//! - 进度事件是返回给调用方的结构化数据，核心不假设存在控制台或界面。
//! - 同一任务内百分比单调不减：上报器会把回退的百分比钳制到已发出的最大值。
//! - 终态事件（completed / cancelled / failed）只发一次，之后的事件全部丢弃。
//! - 取消是协作式的：`CancellationFlag` 在阶段之间、档位启动前、每次试编码前被检查。

use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const PERCENT_DECODED: u8 = 10;
pub const PERCENT_ANALYZED: u8 = 25;
pub const PERCENT_PLANNED: u8 = 40;
pub const PERCENT_ENCODING: u8 = 60;
pub const PERCENT_DONE: u8 = 100;

/// 进度事件状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Progress,
    Skipped,
    Completed,
    Cancelled,
    Failed,
}

impl ProgressStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Skipped => "skipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

/// 一条进度通知。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// 服务层请求 ID（直接调用处理器时为空）。
    pub request_id: Option<String>,
    pub percent: u8,
    pub status: ProgressStatus,
    pub message: String,
    /// 与该事件相关的档位名。
    pub profile: Option<String>,
    pub stage: Option<&'static str>,
    pub error_code: Option<&'static str>,
}

impl ProgressEvent {
    pub fn new(percent: u8, status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            request_id: None,
            percent,
            status,
            message: message.into(),
            profile: None,
            stage: None,
            error_code: None,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_error(mut self, stage: &'static str, code: &'static str) -> Self {
        self.stage = Some(stage);
        self.error_code = Some(code);
        self
    }
}

#[derive(Debug, Default)]
struct ReporterState {
    last_percent: u8,
    finished: bool,
}

/// 单调进度上报器。
pub struct ProgressReporter<P>
where
    P: Fn(ProgressEvent) + Send + Sync,
{
    sink: P,
    state: Mutex<ReporterState>,
}

impl<P> ProgressReporter<P>
where
    P: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(sink: P) -> Self {
        Self {
            sink,
            state: Mutex::new(ReporterState::default()),
        }
    }

    /// 发出事件；百分比被钳制为不小于上一次，终态之后静默。
    pub fn emit(&self, mut event: ProgressEvent) {
        {
            let mut guard = match self.state.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            if guard.finished {
                return;
            }
            event.percent = event.percent.min(PERCENT_DONE).max(guard.last_percent);
            guard.last_percent = event.percent;
            guard.finished = event.status.is_terminal();
        }
        (self.sink)(event);
    }

    pub fn progress(&self, percent: u8, message: impl Into<String>) {
        self.emit(ProgressEvent::new(percent, ProgressStatus::Progress, message));
    }

    pub fn last_percent(&self) -> u8 {
        self.state.lock().map(|s| s.last_percent).unwrap_or(0)
    }
}

/// 编码阶段 60~99 之间按完成档位数线性推进。
pub fn encoding_percent(finished: usize, total: usize) -> u8 {
    if total == 0 {
        return PERCENT_ENCODING;
    }
    let span = (PERCENT_DONE - 1 - PERCENT_ENCODING) as usize;
    let step = span * finished.min(total) / total;
    PERCENT_ENCODING + step as u8
}

/// 协作式取消标志。克隆共享同一个底层标志。
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
