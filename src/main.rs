//! # 图片分享工具 — 命令行入口
//!
//! 本文件只负责参数解析、组件装配与结果输出。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use image_share::error::AppError;
use image_share::history::{HistoryStore, UploadRecord};
use image_share::image_handler::SharedImage;
use image_share::secret::{DEFAULT_SERVICE, FileSecretStore};
use image_share::settings::ConfigState;
use image_share::storage::SharedContainer;
use image_share::upload::{LargeFileChoice, UploadOptions, UploadPipeline, UploadState, size_in_mb};

#[derive(Parser, Debug)]
#[command(name = "image-share")]
#[command(about = "把图片上传到自建服务并获取分享链接")]
struct Cli {
    /// 共享容器目录（默认取环境变量或系统数据目录）
    #[arg(long, global = true)]
    container: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 保存服务地址与访问令牌
    Configure {
        #[arg(long)]
        url: String,
        #[arg(long)]
        token: String,
    },
    /// 查看配置状态
    Status,
    /// 清除服务配置
    Logout,
    /// 上传图片并记录到历史
    Upload {
        path: PathBuf,
        /// 大文件时先缩放再上传
        #[arg(long, conflicts_with = "force")]
        resize: bool,
        /// 大文件时原样上传（硬上限以下）
        #[arg(long)]
        force: bool,
    },
    /// 列出上传历史
    History {
        #[arg(long)]
        json: bool,
    },
    /// 删除一条历史记录
    Delete {
        id: String,
        /// 只删本地记录，远端删除失败不报错
        #[arg(long)]
        local_only: bool,
    },
    /// 清空本地历史
    Clear,
    /// 测试服务连接
    Test,
    /// 查看共享容器信息
    Info,
}

struct App {
    container: SharedContainer,
    history: Arc<HistoryStore>,
    pipeline: UploadPipeline,
}

impl App {
    fn open(custom_dir: Option<String>) -> Result<Self, AppError> {
        let container = SharedContainer::resolve(custom_dir)?;
        let secrets = Arc::new(FileSecretStore::new(container.secrets_dir(), DEFAULT_SERVICE));
        let config = ConfigState::in_container(&container, secrets);
        let history = Arc::new(HistoryStore::in_container(&container));
        let pipeline = UploadPipeline::new(config, UploadOptions::default())?;

        log::debug!("📁 共享容器: {}", container.root().display());

        Ok(Self {
            container,
            history,
            pipeline,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let app = App::open(cli.container)?;

    match cli.command {
        Command::Configure { url, token } => {
            app.pipeline.config().save(&url, &token)?;
            println!("已保存配置");
        }
        Command::Status => {
            let config = app.pipeline.config();
            match config.backend_url()? {
                Some(url) => println!("服务地址: {}", url),
                None => println!("服务地址: (未设置)"),
            }
            println!("已配置: {}", if config.is_configured() { "是" } else { "否" });
        }
        Command::Logout => {
            app.pipeline.config().clear()?;
            println!("已清除配置");
        }
        Command::Upload {
            path,
            resize,
            force,
        } => upload(&app, path, resize, force).await?,
        Command::History { json } => {
            let records = app.history.load_all()?;
            if json {
                let text = serde_json::to_string_pretty(&records)
                    .map_err(|e| AppError::FileSystem(format!("无法序列化历史：{}", e)))?;
                println!("{}", text);
            } else if records.is_empty() {
                println!("暂无上传记录");
            } else {
                for record in &records {
                    print_record(record);
                }
            }
        }
        Command::Delete { id, local_only } => {
            let record = app
                .history
                .get(&id)?
                .ok_or_else(|| AppError::FileSystem(format!("历史中没有记录 {}", id)))?;
            if local_only {
                app.pipeline.delete_local_only(&app.history, &record).await?;
            } else {
                app.pipeline
                    .delete_remote_then_local(&app.history, &record)
                    .await?;
            }
            println!("已删除 {}", id);
        }
        Command::Clear => {
            app.history.clear()?;
            println!("已清空历史");
        }
        Command::Test => {
            app.pipeline.test_connection().await?;
            println!("连接正常");
        }
        Command::Info => {
            let info = app.container.info();
            println!("路径: {}", info.path);
            println!("文件数: {}", info.file_count);
            println!("占用: {} bytes", info.total_size);
        }
    }

    Ok(())
}

async fn upload(app: &App, path: PathBuf, resize: bool, force: bool) -> Result<(), AppError> {
    let shared = SharedImage::from_file(&path)?;
    log::info!("📤 准备上传 - 文件: {}, {:.2} MB", shared.filename, shared.size_mb());

    let state = app
        .pipeline
        .share_and_record(&app.history, shared.bytes, &shared.filename)
        .await;

    match state {
        UploadState::Succeeded(record) => {
            print_record(&record);
            Ok(())
        }
        UploadState::NotConfigured => Err(AppError::NotConfigured),
        UploadState::Failed(error) => Err(error),
        UploadState::TooLarge { bytes, filename } => {
            let choice = match (resize, force) {
                (true, _) => LargeFileChoice::Resize,
                (_, true) => LargeFileChoice::ForceUpload,
                _ => {
                    let options: Vec<&str> = app
                        .pipeline
                        .large_file_choices(bytes.len())
                        .into_iter()
                        .map(|choice| match choice {
                            LargeFileChoice::Resize => "--resize",
                            LargeFileChoice::ForceUpload => "--force",
                            LargeFileChoice::Cancel => "(取消)",
                        })
                        .collect();
                    println!(
                        "文件较大（{:.1} MB），可选: {}",
                        size_in_mb(bytes.len()),
                        options.join(" ")
                    );
                    return Err(AppError::Cancelled);
                }
            };

            let record = app
                .pipeline
                .resolve_too_large(choice, bytes, &filename, print_progress)
                .await?;
            eprintln!();
            app.history.save(record.clone())?;
            print_record(&record);
            Ok(())
        }
        UploadState::Idle | UploadState::Preparing | UploadState::Uploading(_) => Ok(()),
    }
}

fn print_progress(fraction: f64) {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\r上传中 {:>3.0}%", fraction * 100.0);
    let _ = stderr.flush();
}

fn print_record(record: &UploadRecord) {
    println!(
        "{}  {}  {}  {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        record.id,
        record.url,
        record.original_filename.as_deref().unwrap_or("-")
    );
}

fn report_error(error: &AppError) {
    let presentation = error.presentation();
    eprintln!("❌ {}：{}", presentation.title, presentation.message);
    if let Some(remedy) = presentation.remedy {
        eprintln!("   {}", remedy);
    }
    log::debug!("错误码: {}", error.code());
}
