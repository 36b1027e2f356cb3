//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `Reencoder` 只负责流程编排与配置管理，不绑定任何界面或输出方式。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节并嗅探格式
//! 3. 解码为只读 RGBA 源图（阻塞线程池）
//! 4. 特征提取 + 分类（整次任务只做一次）
//! 5. 校验档位，非法档位单独上报
//! 6. 每个档位并发执行：缩放 → 增强 → 预算 → 自适应编码
//! 7. 汇总结果，按宽度降序输出
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ReencodeConfig>>` 支持运行时动态切档。
//! - 单次任务内使用“同一配置快照”，避免处理中途配置漂移。
//! - 档位任务通过 `JoinSet` + `spawn_blocking` 分发，并发数由 `Semaphore` 限制。
//! - 级联缩放时先在一个阻塞任务内按“大档位 → 小档位”串行缩放，
//!   目标尺寸始终按原图计算，之后增强与编码仍按档位并发。
//! - 记录 `load/decode/analyze/encode/total` 阶段耗时，便于性能诊断。

use image::RgbaImage;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::classifier::{self, Classification};
use super::codec::Codec;
use super::features::{self, FeatureVector};
use super::profile::{OutputProfile, partition_profiles};
use super::progress::{
    CancellationFlag, PERCENT_ANALYZED, PERCENT_DECODED, PERCENT_DONE, PERCENT_ENCODING,
    PERCENT_PLANNED, ProgressEvent, ProgressReporter, ProgressStatus, encoding_percent,
};
use super::source::SourceImage;
use super::transform::{self, Transform};
use super::{
    ImageSource, PerformanceProfile, ReencodeConfig, ReencodeError, budget, encoder, resize,
};

/// 单个档位的输出。
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    pub profile: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub size: u64,
    pub quality: f64,
    pub target_bytes: u64,
    pub budget_met: bool,
    /// 预算不可达时的提示（不是失败）。
    #[serde(skip)]
    pub budget_warning: Option<ReencodeError>,
    pub mime_type: &'static str,
    pub extension: &'static str,
    pub transforms: Vec<Transform>,
    pub elapsed_ms: u64,
    /// 输出体积 / 原始体积。
    pub compression_ratio: f64,
}

/// 被跳过的档位（非法配置或档位级错误）。
#[derive(Debug, Clone, Serialize)]
pub struct ProfileFailure {
    pub profile: String,
    pub stage: &'static str,
    pub error_code: &'static str,
    pub message: String,
}

impl ProfileFailure {
    fn new(profile: impl Into<String>, err: &ReencodeError) -> Self {
        Self {
            profile: profile.into(),
            stage: err.stage(),
            error_code: err.code(),
            message: err.to_string(),
        }
    }
}

/// 一次任务的完整报告。
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// 按宽度降序排列。
    pub results: Vec<CompressionResult>,
    pub failures: Vec<ProfileFailure>,
    pub classification: Classification,
    pub features: FeatureVector,
    pub file_name: Option<String>,
    pub mime_type: String,
    pub original_size: u64,
    pub width: u32,
    pub height: u32,
    pub total_ms: u64,
    /// RFC 3339 时间戳。
    pub processed_at: String,
}

impl RunReport {
    pub fn result(&self, profile: &str) -> Option<&CompressionResult> {
        self.results.iter().find(|r| r.profile == profile)
    }
}

/// 图片重编码器。
///
/// 封装了配置状态与可替换的编码器，并编排各子模块实现完整流程。
pub struct Reencoder {
    pub(super) config: Arc<RwLock<ReencodeConfig>>,
    codec_override: Option<Arc<dyn Codec>>,
}

/// 一个待执行的档位：目标尺寸按原图计算。
struct PlannedProfile {
    profile: OutputProfile,
    width: u32,
    height: u32,
}

/// 档位任务共享的只读上下文。
struct TaskContext {
    source: Arc<SourceImage>,
    features: Arc<FeatureVector>,
    classification: Arc<Classification>,
    config: Arc<ReencodeConfig>,
    codec: Arc<dyn Codec>,
    cancel: CancellationFlag,
}

impl Reencoder {
    /// 根据初始配置创建重编码器。
    ///
    /// # 示例
    /// ```rust
    /// use adaptive_reencode::reencoder::{ReencodeConfig, Reencoder};
    ///
    /// let reencoder = Reencoder::new(ReencodeConfig::default())?;
    /// # Ok::<(), adaptive_reencode::reencoder::ReencodeError>(())
    /// ```
    pub fn new(config: ReencodeConfig) -> Result<Self, ReencodeError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            codec_override: None,
        })
    }

    /// 使用自定义编码器替代配置中的内置编码器。
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec_override = Some(codec);
        self
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次任务链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<ReencodeConfig, ReencodeError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ReencodeError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置（先校验）。
    pub fn update_config(&self, next: ReencodeConfig) -> Result<(), ReencodeError> {
        next.validate()?;
        let mut config = self
            .config
            .write()
            .map_err(|_| ReencodeError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        *config = next;
        Ok(())
    }

    /// 设置性能档位。
    pub fn set_performance_profile(&self, profile: PerformanceProfile) -> Result<(), ReencodeError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ReencodeError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_performance_profile(profile);

        log::info!(
            "⚙️ 已切换重编码性能档位：{:?}（grid={}, sample={}, filter={:?}, cascade={}）",
            profile,
            config.grid_size,
            config.max_sample_size,
            config.resize_filter,
            config.cascade_resize
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_performance_profile(&self) -> Result<PerformanceProfile, ReencodeError> {
        let config = self
            .config
            .read()
            .map_err(|_| ReencodeError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_performance_profile())
    }

    fn codec_for(&self, config: &ReencodeConfig) -> Arc<dyn Codec> {
        match &self.codec_override {
            Some(codec) => Arc::clone(codec),
            None => config.codec.build(),
        }
    }

    /// 处理主入口：一张图 → 多个档位的重编码结果。
    ///
    /// 运行级错误以 `failed` 终态事件结束并返回 `Err`；
    /// 取消以 `cancelled` 终态事件结束并返回 `Err(Cancelled)`，不产出任何结果。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use adaptive_reencode::reencoder::{
    ///     CancellationFlag, ImageSource, ReencodeConfig, Reencoder, default_profiles,
    /// };
    ///
    /// # async fn demo() -> Result<(), adaptive_reencode::reencoder::ReencodeError> {
    /// let reencoder = Reencoder::new(ReencodeConfig::default())?;
    /// let report = reencoder
    ///     .run(
    ///         ImageSource::FilePath("photo.jpg".into()),
    ///         default_profiles(),
    ///         |event| println!("{}% {}", event.percent, event.message),
    ///         &CancellationFlag::new(),
    ///     )
    ///     .await?;
    /// assert!(!report.results.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<P>(
        &self,
        source: ImageSource,
        profiles: Vec<OutputProfile>,
        on_progress: P,
        cancel: &CancellationFlag,
    ) -> Result<RunReport, ReencodeError>
    where
        P: Fn(ProgressEvent) + Send + Sync,
    {
        let reporter = ProgressReporter::new(on_progress);
        let result = self.run_inner(source, profiles, &reporter, cancel).await;
        let percent = reporter.last_percent();

        match &result {
            Ok(report) => {
                reporter.emit(ProgressEvent::new(
                    PERCENT_DONE,
                    ProgressStatus::Completed,
                    format!(
                        "完成：{} 个档位成功，{} 个跳过",
                        report.results.len(),
                        report.failures.len()
                    ),
                ));
            }
            Err(ReencodeError::Cancelled(_)) => {
                log::info!("⏹️ 重编码任务已取消（进度 {}%）", percent);
                reporter.emit(
                    ProgressEvent::new(percent, ProgressStatus::Cancelled, "任务已取消")
                        .with_error("cancel", "E_CANCELLED"),
                );
            }
            Err(err) => {
                log::error!("❌ 重编码任务失败 - stage={} code={} {}", err.stage(), err.code(), err);
                reporter.emit(
                    ProgressEvent::new(percent, ProgressStatus::Failed, err.to_string())
                        .with_error(err.stage(), err.code()),
                );
            }
        }

        result
    }

    async fn run_inner<P>(
        &self,
        source: ImageSource,
        profiles: Vec<OutputProfile>,
        reporter: &ProgressReporter<P>,
        cancel: &CancellationFlag,
    ) -> Result<RunReport, ReencodeError>
    where
        P: Fn(ProgressEvent) + Send + Sync,
    {
        let config = Arc::new(self.config_snapshot()?);
        let codec = self.codec_for(&config);
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = self.load_source(source, &config)?;
        let load_elapsed = load_start.elapsed();
        ensure_not_cancelled(cancel)?;

        let decode_start = Instant::now();
        let source = {
            let config = Arc::clone(&config);
            tokio::task::spawn_blocking(move || Self::decode_source(raw, &config))
                .await
                .map_err(|e| ReencodeError::ResourceLimit(format!("解码任务异常退出：{}", e)))??
        };
        let source = Arc::new(source);
        let decode_elapsed = decode_start.elapsed();
        reporter.progress(
            PERCENT_DECODED,
            format!("已解码 {}x{}", source.width(), source.height()),
        );
        ensure_not_cancelled(cancel)?;

        let analyze_start = Instant::now();
        let (features, classification) = {
            let source = Arc::clone(&source);
            let config = Arc::clone(&config);
            tokio::task::spawn_blocking(move || {
                let features = features::analyze(source.pixels(), &config);
                let classification = classifier::classify(&features, source.meta());
                (features, classification)
            })
            .await
            .map_err(|e| ReencodeError::ResourceLimit(format!("分析任务异常退出：{}", e)))?
        };
        let analyze_elapsed = analyze_start.elapsed();
        reporter.progress(
            PERCENT_ANALYZED,
            format!(
                "分类：{} ({:.0}%)",
                classification.subtype.as_str(),
                classification.confidence
            ),
        );
        ensure_not_cancelled(cancel)?;

        let (valid, rejected) = partition_profiles(profiles);
        let mut failures = Vec::with_capacity(rejected.len());
        for (name, err) in rejected {
            log::warn!("⚠️ 跳过非法档位 `{}`：{}", name, err);
            reporter.emit(
                ProgressEvent::new(reporter.last_percent(), ProgressStatus::Skipped, err.to_string())
                    .with_profile(name.clone())
                    .with_error(err.stage(), err.code()),
            );
            failures.push(ProfileFailure::new(name, &err));
        }

        let planned = plan_profiles(valid, source.width(), source.height())?;
        reporter.progress(PERCENT_PLANNED, format!("已规划 {} 个档位", planned.len()));
        ensure_not_cancelled(cancel)?;

        let encode_start = Instant::now();
        let bitmaps: Vec<Option<Arc<RgbaImage>>> = if config.cascade_resize {
            let cascaded = {
                let source = Arc::clone(&source);
                let filter = config.resize_filter;
                let cancel = cancel.clone();
                let sizes: Vec<(String, u32, u32)> = planned
                    .iter()
                    .map(|p| (p.profile.name.clone(), p.width, p.height))
                    .collect();
                tokio::task::spawn_blocking(move || cascade_resize(&source, &sizes, filter, &cancel))
                    .await
                    .map_err(|e| ReencodeError::ResourceLimit(format!("缩放任务异常退出：{}", e)))??
            };
            cascaded.into_iter().map(Some).collect()
        } else {
            vec![None; planned.len()]
        };

        let context = Arc::new(TaskContext {
            source: Arc::clone(&source),
            features: Arc::new(features.clone()),
            classification: Arc::new(classification.clone()),
            config: Arc::clone(&config),
            codec,
            cancel: cancel.clone(),
        });

        reporter.progress(
            PERCENT_ENCODING,
            format!("开始编码（{} 个档位）", planned.len()),
        );

        let semaphore = Arc::new(Semaphore::new(config.effective_concurrency().max(1)));
        let mut pending: Vec<String> = planned.iter().map(|p| p.profile.name.clone()).collect();
        let mut tasks = JoinSet::new();
        for (plan, bitmap) in planned.into_iter().zip(bitmaps) {
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let name = plan.profile.name.clone();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            name,
                            Err(ReencodeError::ResourceLimit("并发信号量已关闭".to_string())),
                        );
                    }
                };
                let result = tokio::task::spawn_blocking(move || {
                    process_profile(&context, &plan, bitmap)
                })
                .await
                .unwrap_or_else(|e| Err(ReencodeError::Encode(format!("档位任务异常退出：{}", e))));
                (name, result)
            });
        }

        let total = tasks.len();
        let mut finished = 0usize;
        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            finished += 1;
            let (name, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    log::error!("❌ 档位任务 join 失败：{}", e);
                    continue;
                }
            };
            pending.retain(|p| p != &name);

            match result {
                Ok(result) => {
                    reporter.emit(
                        ProgressEvent::new(
                            encoding_percent(finished, total),
                            ProgressStatus::Progress,
                            format!(
                                "档位 {} 完成：{}x{} {} 字节 q={:.2}",
                                name, result.width, result.height, result.size, result.quality
                            ),
                        )
                        .with_profile(name),
                    );
                    results.push(result);
                }
                Err(ReencodeError::Cancelled(_)) => {}
                Err(err) if err.is_profile_scoped() => {
                    log::warn!("⚠️ 档位 `{}` 处理失败，已跳过：{}", name, err);
                    reporter.emit(
                        ProgressEvent::new(
                            encoding_percent(finished, total),
                            ProgressStatus::Skipped,
                            err.to_string(),
                        )
                        .with_profile(name.clone())
                        .with_error(err.stage(), err.code()),
                    );
                    failures.push(ProfileFailure::new(name, &err));
                }
                Err(err) => {
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }
        let encode_elapsed = encode_start.elapsed();

        ensure_not_cancelled(cancel)?;

        // 没有回传结果的任务（外层 join 失败）同样记为档位失败
        for name in pending {
            let err = ReencodeError::Encode("档位任务未返回结果".to_string());
            reporter.emit(
                ProgressEvent::new(reporter.last_percent(), ProgressStatus::Skipped, err.to_string())
                    .with_profile(name.clone())
                    .with_error(err.stage(), err.code()),
            );
            failures.push(ProfileFailure::new(name, &err));
        }

        results.sort_by(|a, b| b.width.cmp(&a.width).then_with(|| a.profile.cmp(&b.profile)));

        let total_elapsed = total_start.elapsed();
        log::info!(
            "✅ 重编码完成 - {} load={}ms decode={}ms analyze={}ms encode={}ms total={}ms",
            classification.subtype.as_str(),
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            analyze_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_elapsed.as_millis()
        );

        let meta = source.meta();
        Ok(RunReport {
            results,
            failures,
            classification,
            features,
            file_name: meta.file_name.clone(),
            mime_type: meta.mime_type.clone(),
            original_size: meta.file_size,
            width: source.width(),
            height: source.height(),
            total_ms: total_elapsed.as_millis() as u64,
            processed_at: chrono::Local::now().to_rfc3339(),
        })
    }
}

fn ensure_not_cancelled(cancel: &CancellationFlag) -> Result<(), ReencodeError> {
    if cancel.is_cancelled() {
        return Err(ReencodeError::Cancelled("任务已取消".to_string()));
    }
    Ok(())
}

/// 按最长边上限降序排列，目标尺寸一律按原图计算。
fn plan_profiles(
    profiles: Vec<OutputProfile>,
    width: u32,
    height: u32,
) -> Result<Vec<PlannedProfile>, ReencodeError> {
    let mut planned = profiles
        .into_iter()
        .map(|profile| {
            let (w, h) = resize::compute_dimensions(width, height, profile.max_dimension)?;
            Ok(PlannedProfile {
                profile,
                width: w,
                height: h,
            })
        })
        .collect::<Result<Vec<_>, ReencodeError>>()?;
    planned.sort_by(|a, b| {
        b.profile
            .max_dimension
            .cmp(&a.profile.max_dimension)
            .then_with(|| a.profile.name.cmp(&b.profile.name))
    });
    Ok(planned)
}

/// 级联缩放：每一档以上一档（更大）的结果为源。
fn cascade_resize(
    source: &SourceImage,
    sizes: &[(String, u32, u32)],
    filter: image::imageops::FilterType,
    cancel: &CancellationFlag,
) -> Result<Vec<Arc<RgbaImage>>, ReencodeError> {
    let mut outputs: Vec<Arc<RgbaImage>> = Vec::with_capacity(sizes.len());
    for (name, width, height) in sizes {
        ensure_not_cancelled(cancel)?;
        let input = outputs.last().map(|b| b.as_ref()).unwrap_or(source.pixels());
        let start = Instant::now();
        let resized = resize::resample(input, *width, *height, filter)?;
        log::debug!(
            "🔻 级联缩放 [{}] {}x{} → {}x{} ({}ms)",
            name,
            input.width(),
            input.height(),
            width,
            height,
            start.elapsed().as_millis()
        );
        outputs.push(Arc::new(resized));
    }
    Ok(outputs)
}

/// 单个档位：缩放 → 增强 → 预算 → 编码。
fn process_profile(
    context: &TaskContext,
    plan: &PlannedProfile,
    resized: Option<Arc<RgbaImage>>,
) -> Result<CompressionResult, ReencodeError> {
    ensure_not_cancelled(&context.cancel)?;
    let start = Instant::now();
    let profile = &plan.profile;
    let source = &context.source;

    let mut bitmap = match resized {
        Some(bitmap) => Arc::unwrap_or_clone(bitmap),
        None => resize::resample(
            source.pixels(),
            plan.width,
            plan.height,
            context.config.resize_filter,
        )?,
    };

    let scale = plan.width.max(plan.height) as f64 / source.width().max(source.height()) as f64;
    let transforms = transform::enhancement_plan(
        context.classification.subtype,
        &context.features,
        scale,
        profile.max_dimension,
        &context.config,
    );
    transform::apply_all(&mut bitmap, &transforms);

    let target_bytes = budget::plan(profile, &context.classification, &context.features);
    let cancel = &context.cancel;
    let outcome = encoder::encode(
        context.codec.as_ref(),
        &bitmap,
        target_bytes,
        context.classification.subtype,
        || cancel.is_cancelled(),
    )?;

    let size = outcome.bytes.len() as u64;
    let budget_warning = (!outcome.budget_met).then(|| ReencodeError::EncodeBudgetUnreachable {
        profile: profile.name.clone(),
        target: target_bytes,
        achieved: size,
    });
    let original_size = source.meta().file_size;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    log::info!(
        "📦 [{}] {}x{} {} 字节 (目标 {}) q={:.3} trials={} {}ms{}",
        profile.name,
        bitmap.width(),
        bitmap.height(),
        size,
        target_bytes,
        outcome.quality,
        outcome.trials,
        elapsed_ms,
        if transforms.is_empty() {
            String::new()
        } else {
            format!(
                " [{}]",
                transforms.iter().map(Transform::label).collect::<Vec<_>>().join(", ")
            )
        }
    );

    Ok(CompressionResult {
        profile: profile.name.clone(),
        width: bitmap.width(),
        height: bitmap.height(),
        size,
        quality: outcome.quality,
        target_bytes,
        budget_met: outcome.budget_met,
        budget_warning,
        mime_type: context.codec.mime_type(),
        extension: context.codec.extension(),
        transforms,
        elapsed_ms,
        compression_ratio: if original_size == 0 {
            0.0
        } else {
            size as f64 / original_size as f64
        },
        bytes: outcome.bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// 体积只与像素数和质量有关的确定性编码器。
    struct AreaCodec;

    impl Codec for AreaCodec {
        fn mime_type(&self) -> &'static str {
            "application/x-area"
        }

        fn extension(&self) -> &'static str {
            "bin"
        }

        fn encode(&self, image: &RgbaImage, quality: f64) -> Result<Vec<u8>, ReencodeError> {
            let pixels = image.width() as f64 * image.height() as f64;
            Ok(vec![0u8; (pixels * quality / 4.0) as usize + 64])
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 251) as u8, (y % 241) as u8, ((x * y) % 239) as u8, 255])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("encode png fixture");
        cursor.into_inner()
    }

    fn reencoder(config: ReencodeConfig) -> Reencoder {
        Reencoder::new(config)
            .expect("reencoder init")
            .with_codec(Arc::new(AreaCodec))
    }

    #[test]
    fn plan_sorts_largest_first_and_uses_original_dimensions() {
        let planned = plan_profiles(
            vec![
                OutputProfile::new("s", 480, 2, 18),
                OutputProfile::new("l", 1080, 8, 80),
                OutputProfile::new("xl", 4000, 8, 80),
            ],
            2000,
            1000,
        )
        .expect("plan");
        let dims: Vec<(&str, u32, u32)> = planned
            .iter()
            .map(|p| (p.profile.name.as_str(), p.width, p.height))
            .collect();
        assert_eq!(dims, vec![("xl", 2000, 1000), ("l", 1080, 540), ("s", 480, 240)]);
    }

    #[test]
    fn cascade_matches_target_dimensions() {
        let source = SourceImage::new(
            RgbaImage::from_pixel(1000, 750, Rgba([10, 20, 30, 255])),
            Default::default(),
        );
        let sizes = vec![("l".to_string(), 640, 480), ("s".to_string(), 333, 250)];
        let out = cascade_resize(
            &source,
            &sizes,
            image::imageops::FilterType::CatmullRom,
            &CancellationFlag::new(),
        )
        .expect("cascade");
        assert_eq!(out[0].dimensions(), (640, 480));
        assert_eq!(out[1].dimensions(), (333, 250));
    }

    #[tokio::test]
    async fn run_produces_one_result_per_valid_profile() {
        let reencoder = reencoder(ReencodeConfig::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = Arc::clone(&events);
            move |event: ProgressEvent| events.lock().expect("events").push(event)
        };

        let report = reencoder
            .run(
                ImageSource::from_bytes(png_bytes(1200, 800), Some("fixture.png")),
                vec![
                    OutputProfile::new("s", 420, 2, 18),
                    OutputProfile::new("broken", 0, 2, 18),
                    OutputProfile::new("m", 864, 4, 40),
                ],
                sink,
                &CancellationFlag::new(),
            )
            .await
            .expect("run");

        let names: Vec<&str> = report.results.iter().map(|r| r.profile.as_str()).collect();
        assert_eq!(names, vec!["m", "s"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error_code, "E_INVALID_PROFILE");
        assert_eq!(report.result("m").map(|r| r.width), Some(864));
        assert_eq!(report.file_name.as_deref(), Some("fixture.png"));
        for result in &report.results {
            assert!(result.size <= result.target_bytes || !result.budget_met);
        }

        let events = events.lock().expect("events");
        let percents: Vec<u8> = events.iter().map(|e| e.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(events.last().map(|e| e.status), Some(ProgressStatus::Completed));
        assert!(events.iter().any(|e| e.status == ProgressStatus::Skipped
            && e.profile.as_deref() == Some("broken")));
    }

    #[tokio::test]
    async fn decode_failure_emits_failed_event() {
        let reencoder = reencoder(ReencodeConfig::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = Arc::clone(&events);
            move |event: ProgressEvent| events.lock().expect("events").push(event)
        };

        let result = reencoder
            .run(
                ImageSource::from_bytes(b"plain text, not an image".to_vec(), None),
                vec![OutputProfile::new("m", 864, 4, 40)],
                sink,
                &CancellationFlag::new(),
            )
            .await;

        assert!(matches!(result, Err(ReencodeError::Decode(_))));
        let events = events.lock().expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, ProgressStatus::Failed);
        assert_eq!(events[0].error_code, Some("E_DECODE"));
    }

    /// 小于 500 像素宽的档位在编码时 panic。
    struct PanicOnSmallCodec;

    impl Codec for PanicOnSmallCodec {
        fn mime_type(&self) -> &'static str {
            "application/x-area"
        }

        fn extension(&self) -> &'static str {
            "bin"
        }

        fn encode(&self, image: &RgbaImage, quality: f64) -> Result<Vec<u8>, ReencodeError> {
            if image.width() < 500 {
                panic!("encoder crashed on {}px", image.width());
            }
            AreaCodec.encode(image, quality)
        }
    }

    #[tokio::test]
    async fn panicking_profile_task_is_recorded_as_failure() {
        let reencoder = Reencoder::new(ReencodeConfig::default())
            .expect("reencoder init")
            .with_codec(Arc::new(PanicOnSmallCodec));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = Arc::clone(&events);
            move |event: ProgressEvent| events.lock().expect("events").push(event)
        };

        let report = reencoder
            .run(
                ImageSource::from_bytes(png_bytes(1200, 800), None),
                vec![
                    OutputProfile::new("m", 864, 4, 40),
                    OutputProfile::new("s", 420, 2, 18),
                ],
                sink,
                &CancellationFlag::new(),
            )
            .await
            .expect("run survives a crashed profile");

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].profile, "m");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].profile, "s");
        assert_eq!(report.failures[0].error_code, "E_ENCODE");

        let events = events.lock().expect("events");
        assert!(events.iter().any(|e| e.status == ProgressStatus::Skipped
            && e.profile.as_deref() == Some("s")));
        assert_eq!(events.last().map(|e| e.status), Some(ProgressStatus::Completed));
    }

    #[tokio::test]
    async fn pre_cancelled_run_yields_cancelled_event_only() {
        let reencoder = reencoder(ReencodeConfig::default());
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = Arc::clone(&events);
            move |event: ProgressEvent| events.lock().expect("events").push(event)
        };

        let result = reencoder
            .run(
                ImageSource::from_bytes(png_bytes(64, 64), None),
                vec![OutputProfile::new("m", 864, 4, 40)],
                sink,
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(ReencodeError::Cancelled(_))));
        let events = events.lock().expect("events");
        assert!(events.iter().all(|e| e.status != ProgressStatus::Failed));
        assert_eq!(events.last().map(|e| e.status), Some(ProgressStatus::Cancelled));
    }

    #[tokio::test]
    async fn cascade_and_independent_resize_agree_on_dimensions() {
        let profiles = || {
            vec![
                OutputProfile::new("l", 1080, 8, 80),
                OutputProfile::new("s", 480, 2, 18),
            ]
        };
        let mut independent = ReencodeConfig::default();
        independent.apply_performance_profile(PerformanceProfile::Quality);

        let cascaded = reencoder(ReencodeConfig::default())
            .run(
                ImageSource::from_bytes(png_bytes(1500, 1000), None),
                profiles(),
                |_| {},
                &CancellationFlag::new(),
            )
            .await
            .expect("cascade run");
        let direct = reencoder(independent)
            .run(
                ImageSource::from_bytes(png_bytes(1500, 1000), None),
                profiles(),
                |_| {},
                &CancellationFlag::new(),
            )
            .await
            .expect("direct run");

        let dims = |report: &RunReport| -> Vec<(u32, u32)> {
            report.results.iter().map(|r| (r.width, r.height)).collect()
        };
        assert_eq!(dims(&cascaded), vec![(1080, 720), (480, 320)]);
        assert_eq!(dims(&cascaded), dims(&direct));
    }

    #[test]
    fn performance_profile_roundtrip() {
        let reencoder = Reencoder::new(ReencodeConfig::default()).expect("reencoder init");
        reencoder
            .set_performance_profile(PerformanceProfile::Speed)
            .expect("set speed");
        assert_eq!(
            reencoder.get_performance_profile().expect("get"),
            PerformanceProfile::Speed
        );
        let mut invalid = ReencodeConfig::default();
        invalid.grid_size = 0;
        assert!(reencoder.update_config(invalid).is_err());
        assert_eq!(
            reencoder.get_performance_profile().expect("get"),
            PerformanceProfile::Speed
        );
    }
}
