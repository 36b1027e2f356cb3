//! # reencode — 命令行入口
//!
//! 本文件仅负责参数解析、日志初始化、中断处理与结果落盘。
//! 业务逻辑分布在 `reencoder` 各子模块中，详见 `lib.rs` 架构文档。

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use adaptive_reencode::error::AppError;
use adaptive_reencode::reencoder::{
    CancellationFlag, CodecKind, ImageSource, PerformanceProfile, ProgressEvent, ProgressStatus,
    ReencodeConfig, ReencodeError, ReencodeService, RunReport,
};
use adaptive_reencode::settings::{self, AppSettings};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "reencode", version, about = "按内容类型自适应压缩图片到各档位体积预算")]
struct Cli {
    /// 输入图片路径（可多个，按顺序处理）
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 档位文件（JSON 数组），覆盖设置文件中的档位
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// 设置文件（JSON）
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 性能档位：quality / balanced / speed
    #[arg(long)]
    performance: Option<String>,

    /// 输出编码：webp / jpeg
    #[arg(long)]
    codec: Option<String>,

    /// 输出目录（默认当前目录）
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// 以 JSON 打印报告
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let app_settings = match &cli.settings {
        Some(path) => AppSettings::load(path)?,
        None => AppSettings::default(),
    };

    let mut config = ReencodeConfig::default();
    app_settings.apply(&mut config)?;
    if let Some(performance) = &cli.performance {
        config.apply_performance_profile(PerformanceProfile::from_str(performance)?);
    }
    if let Some(codec) = &cli.codec {
        config.codec = CodecKind::from_str(codec)?;
    }

    let profiles = match &cli.profiles {
        Some(path) => settings::load_profiles(path)?,
        None => app_settings.profiles_or_default(),
    };

    fs::create_dir_all(&cli.out_dir)?;
    let service = Arc::new(ReencodeService::with_config(config)?);
    let interrupted = CancellationFlag::new();
    let watcher = spawn_interrupt_watcher(Arc::clone(&service), interrupted.clone());

    let total = cli.inputs.len();
    let mut reports = Vec::with_capacity(total);
    let mut failed = 0usize;

    for (index, input) in cli.inputs.iter().enumerate() {
        if interrupted.is_cancelled() {
            break;
        }
        let request_id = format!("{}:{}", index, input.display());
        let result = service
            .process(
                &request_id,
                ImageSource::FilePath(input.display().to_string()),
                profiles.clone(),
                log_progress,
            )
            .await;

        match result {
            Ok(report) => {
                write_variants(&report, input, &cli.out_dir)?;
                if !cli.json {
                    print_summary(input, &report);
                }
                reports.push(report);
            }
            Err(err @ ReencodeError::Cancelled(_)) => {
                watcher.abort();
                return Err(err.into());
            }
            Err(err) => {
                failed += 1;
                log::error!("❌ {} 处理失败：{}", input.display(), err);
            }
        }
    }
    watcher.abort();

    if interrupted.is_cancelled() {
        return Err(ReencodeError::Cancelled("收到中断信号".to_string()).into());
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| AppError::Settings(format!("序列化报告失败: {}", e)))?;
        println!("{}", json);
    }

    if failed > 0 {
        return Err(AppError::Batch { failed, total });
    }
    Ok(())
}

/// Ctrl-C 时取消进行中的请求，并阻止后续输入开始。
fn spawn_interrupt_watcher(
    service: Arc<ReencodeService>,
    interrupted: CancellationFlag,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("⚠️ 无法监听中断信号：{}", e);
            return;
        }
        log::warn!("⏹️ 收到中断信号，正在取消");
        interrupted.cancel();
        if let Err(e) = service.cancel_all() {
            log::error!("❌ 取消进行中的任务失败：{}", e);
        }
    })
}

fn log_progress(event: ProgressEvent) {
    match event.status {
        ProgressStatus::Skipped | ProgressStatus::Failed => log::warn!(
            "[{:>3}%] {} {}",
            event.percent,
            event.profile.as_deref().unwrap_or("-"),
            event.message
        ),
        _ => log::debug!("[{:>3}%] {}", event.percent, event.message),
    }
}

fn write_variants(report: &RunReport, input: &Path, out_dir: &Path) -> Result<(), AppError> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    for result in &report.results {
        let path = out_dir.join(format!("{}-{}.{}", stem, result.profile, result.extension));
        fs::write(&path, &result.bytes)?;
        log::debug!("💾 已写入 {}", path.display());
    }
    Ok(())
}

fn print_summary(input: &Path, report: &RunReport) {
    println!(
        "{} {}x{} {}KB → {} ({:.0}%) {}ms",
        input.display(),
        report.width,
        report.height,
        report.original_size / 1024,
        report.classification.subtype.as_str(),
        report.classification.confidence,
        report.total_ms
    );
    for result in &report.results {
        println!(
            "  {:<6} {:>5}x{:<5} {:>7.1}KB / {:>6.1}KB q={:.2} {:.1}%{}",
            result.profile,
            result.width,
            result.height,
            result.size as f64 / 1024.0,
            result.target_bytes as f64 / 1024.0,
            result.quality,
            result.compression_ratio * 100.0,
            if result.budget_met { "" } else { " ⚠️ 超出预算" }
        );
    }
    for failure in &report.failures {
        println!("  {:<6} 跳过：{}", failure.profile, failure.message);
    }
}
