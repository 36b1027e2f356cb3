//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `ReencodeService` 作为长生命周期状态，替代全局单例函数：
//! 调用方（CLI、上层应用）持有一个实例，按请求 ID 发起任务、按请求 ID 取消。
//!
//! ## 实现思路
//!
//! 对外仅暴露少量稳定 API：
//! - `process`：执行完整重编码链路，事件带上请求 ID
//! - `cancel` / `cancel_all`：按请求 ID（或全部）置位取消标志
//! - `set_performance_profile` / `get_performance_profile`：字符串形式切档

use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    CancellationFlag, ImageSource, OutputProfile, PerformanceProfile, ProgressEvent,
    ReencodeConfig, ReencodeError, Reencoder, RunReport,
};

/// 重编码服务状态。
pub struct ReencodeService {
    handler: Reencoder,
    cancel_flags: Mutex<HashMap<String, CancellationFlag>>,
}

impl ReencodeService {
    /// 使用默认配置创建服务。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use adaptive_reencode::reencoder::ReencodeService;
    ///
    /// let service = ReencodeService::new()?;
    /// # Ok::<(), adaptive_reencode::reencoder::ReencodeError>(())
    /// ```
    pub fn new() -> Result<Self, ReencodeError> {
        Self::with_config(ReencodeConfig::default())
    }

    /// 使用自定义配置创建服务。
    pub fn with_config(config: ReencodeConfig) -> Result<Self, ReencodeError> {
        Ok(Self::with_handler(Reencoder::new(config)?))
    }

    /// 包装一个已构建的重编码器（例如注入了自定义编码器）。
    pub fn with_handler(handler: Reencoder) -> Self {
        Self {
            handler,
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn handler(&self) -> &Reencoder {
        &self.handler
    }

    /// 执行一次任务；任务结束（无论成败）后注销取消标志。
    pub async fn process<P>(
        &self,
        request_id: &str,
        source: ImageSource,
        profiles: Vec<OutputProfile>,
        on_progress: P,
    ) -> Result<RunReport, ReencodeError>
    where
        P: Fn(ProgressEvent) + Send + Sync,
    {
        let cancel_flag = CancellationFlag::new();
        {
            let mut guard = self
                .cancel_flags
                .lock()
                .map_err(|_| ReencodeError::ResourceLimit("取消标志锁已中毒".to_string()))?;
            if guard.contains_key(request_id) {
                return Err(ReencodeError::Config(format!(
                    "请求 ID 重复：{}",
                    request_id
                )));
            }
            guard.insert(request_id.to_string(), cancel_flag.clone());
        }

        let tagged = |mut event: ProgressEvent| {
            event.request_id = Some(request_id.to_string());
            on_progress(event);
        };

        let result = self
            .handler
            .run(source, profiles, tagged, &cancel_flag)
            .await;

        // 锁中毒时取回内部表继续注销，结果照常返回
        self.cancel_flags
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(request_id);

        result
    }

    /// 取消进行中的请求；请求不存在（已结束或从未开始）时返回 `false`。
    pub fn cancel(&self, request_id: &str) -> Result<bool, ReencodeError> {
        let guard = self
            .cancel_flags
            .lock()
            .map_err(|_| ReencodeError::ResourceLimit("取消标志锁已中毒".to_string()))?;

        match guard.get(request_id) {
            Some(flag) => {
                flag.cancel();
                log::info!("⏹️ 已请求取消任务 {}", request_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 取消所有进行中的请求，返回被置位的请求数。
    pub fn cancel_all(&self) -> Result<usize, ReencodeError> {
        let guard = self
            .cancel_flags
            .lock()
            .map_err(|_| ReencodeError::ResourceLimit("取消标志锁已中毒".to_string()))?;

        for (request_id, flag) in guard.iter() {
            flag.cancel();
            log::info!("⏹️ 已请求取消任务 {}", request_id);
        }
        Ok(guard.len())
    }

    /// 当前进行中的请求数。
    pub fn active_requests(&self) -> usize {
        self.cancel_flags.lock().map(|g| g.len()).unwrap_or(0)
    }

    /// 设置性能档位。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use adaptive_reencode::reencoder::ReencodeService;
    ///
    /// let service = ReencodeService::new()?;
    /// service.set_performance_profile("speed")?;
    /// # Ok::<(), adaptive_reencode::reencoder::ReencodeError>(())
    /// ```
    pub fn set_performance_profile(&self, profile: &str) -> Result<(), ReencodeError> {
        let profile = PerformanceProfile::from_str(profile)?;
        self.handler.set_performance_profile(profile)
    }

    /// 获取当前生效性能档位（字符串）。
    pub fn get_performance_profile(&self) -> Result<String, ReencodeError> {
        let profile = self.handler.get_performance_profile()?;
        Ok(profile.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reencoder::ProgressStatus;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn service_set_and_get_profile_roundtrip() {
        let service = ReencodeService::new().expect("service init failed");

        for name in ["quality", "speed", "balanced"] {
            service.set_performance_profile(name).expect("set profile should succeed");
            let current = service.get_performance_profile().expect("get profile should succeed");
            assert_eq!(current, name);
        }
    }

    #[test]
    fn service_rejects_invalid_profile() {
        let service = ReencodeService::new().expect("service init failed");
        let result = service.set_performance_profile("unknown-profile");
        assert!(matches!(result, Err(ReencodeError::Config(_))));
    }

    #[test]
    fn service_profile_concurrent_access_stress() {
        let service = Arc::new(ReencodeService::new().expect("service init failed"));

        let workers = 8;
        let iterations = 200;
        let mut handles = Vec::with_capacity(workers);

        for worker in 0..workers {
            let service = Arc::clone(&service);
            handles.push(thread::spawn(move || {
                for i in 0..iterations {
                    let profile = match (worker + i) % 3 {
                        0 => "quality",
                        1 => "balanced",
                        _ => "speed",
                    };
                    service.set_performance_profile(profile).expect("set should succeed");
                    let current = service.get_performance_profile().expect("get should succeed");
                    assert!(matches!(current.as_str(), "quality" | "balanced" | "speed"));
                }
            }));
        }

        for handle in handles {
            handle.join().expect("worker thread panicked");
        }
    }

    #[test]
    fn cancel_unknown_request_returns_false() {
        let service = ReencodeService::new().expect("service init failed");
        assert!(!service.cancel("missing").expect("cancel should not fail"));
        assert_eq!(service.active_requests(), 0);
    }

    #[tokio::test]
    async fn events_carry_request_id_and_registry_is_cleaned_up() {
        let service = ReencodeService::new().expect("service init failed");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = Arc::clone(&events);
            move |event: ProgressEvent| events.lock().expect("events").push(event)
        };

        let result = service
            .process(
                "req-1",
                ImageSource::from_bytes(Vec::new(), None),
                vec![OutputProfile::new("m", 864, 4, 40)],
                sink,
            )
            .await;

        assert!(matches!(result, Err(ReencodeError::Decode(_))));
        assert_eq!(service.active_requests(), 0);
        assert!(!service.cancel("req-1").expect("cancel"));

        let events = events.lock().expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].request_id.as_deref(), Some("req-1"));
        assert_eq!(events[0].status, ProgressStatus::Failed);
    }

    #[tokio::test]
    async fn poisoned_registry_keeps_run_result_and_still_unregisters() {
        let service = Arc::new(ReencodeService::new().expect("service init failed"));
        let poison = {
            let service = Arc::clone(&service);
            move |_: ProgressEvent| {
                let service = Arc::clone(&service);
                let _ = thread::spawn(move || {
                    let _guard = service.cancel_flags.lock();
                    panic!("poison the registry");
                })
                .join();
            }
        };

        let result = service
            .process(
                "req-poison",
                ImageSource::from_bytes(Vec::new(), None),
                vec![OutputProfile::new("m", 864, 4, 40)],
                poison,
            )
            .await;

        assert!(matches!(result, Err(ReencodeError::Decode(_))));
        assert!(service.cancel_flags.is_poisoned());
        let registry = service
            .cancel_flags
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn cancel_all_stops_running_request() {
        let service = Arc::new(ReencodeService::new().expect("service init failed"));
        let cancelled = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let on_progress = {
            let service = Arc::clone(&service);
            let cancelled = Arc::clone(&cancelled);
            move |event: ProgressEvent| {
                if event.status == ProgressStatus::Progress {
                    let count = service.cancel_all().expect("cancel all");
                    cancelled.fetch_add(count, std::sync::atomic::Ordering::SeqCst);
                }
            }
        };

        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            64,
            64,
            image::Rgba([40, 80, 120, 255]),
        ))
        .write_to(&mut png, image::ImageFormat::Png)
        .expect("encode png fixture");

        let result = service
            .process(
                "req-interrupt",
                ImageSource::from_bytes(png.into_inner(), None),
                vec![OutputProfile::new("m", 864, 4, 40)],
                on_progress,
            )
            .await;

        assert!(matches!(result, Err(ReencodeError::Cancelled(_))));
        assert!(cancelled.load(std::sync::atomic::Ordering::SeqCst) >= 1);
        assert_eq!(service.active_requests(), 0);
        assert_eq!(service.cancel_all().expect("cancel all"), 0);
    }
}
