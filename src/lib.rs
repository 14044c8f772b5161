//! # 图片分享工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            宿主应用 / 分享扩展 / 命令行 (main.rs)          │
//! │                                                          │
//! │   设置页 ── 历史列表 ── 分享面板                           │
//! │      ↕          ↕          ↕                             │
//! └──────┼──────────┼──────────┼─────────────────────────────┘
//!        ↕          ↕          ↕   Result<T, AppError>
//! ┌──────┼──────────┼──────────┼─────────────────────────────┐
//! │      ↕          ↕          ↕        核心库 (Rust)         │
//! │                                                          │
//! │  ┌─ error ──────── AppError + 展示文案                     │
//! │  │                                                       │
//! │  ├─ upload ─────── UploadPipeline (multipart + 进度 + 取消) │
//! │  │   └─ flows      大文件补救 / 连接测试 / 删除流程          │
//! │  │                                                       │
//! │  ├─ image_handler  缩放 · 压缩 · 缩略图 · 分享加载          │
//! │  ├─ history ────── history.json (≤100 条，原子替换)        │
//! │  ├─ settings ───── settings.json + 令牌                    │
//! │  ├─ secret ─────── 令牌存储 (SecretStore)                  │
//! │  └─ storage ────── 共享容器目录                            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，错误码与展示文案 |
//! | [`upload`] | 上传 / 删除 / 取消，状态发布，大文件补救 |
//! | [`image_handler`] | 解码、等比缩放、JPEG 压缩、缩略图、分享交接加载 |
//! | [`history`] | 上传历史的读写、去重、截断 |
//! | [`settings`] | 服务地址与配置标志，凭据读取 |
//! | [`secret`] | 访问令牌的安全存储 |
//! | [`storage`] | 共享容器路径与原子写入 |

pub mod error;
pub mod history;
pub mod image_handler;
pub mod secret;
pub mod settings;
pub mod storage;
pub mod upload;
