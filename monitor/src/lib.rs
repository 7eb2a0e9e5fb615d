//! # SanktaBoot 监控程序核心
//!
//! 让同一套命令在多种磁盘文件系统上工作，并在没有操作系统的阶段
//! 保护直接写物理内存的加载操作。
//!
//! ## 组成
//!
//! - [`FsRegistry`] - 按顺序排列的文件系统类型描述符
//! - [`detect`] - 把设备/分区绑定到第一个探测成功的类型，得到 [`Session`]
//! - [`FsDispatch`] - "同一时刻一个活动会话、每次操作后关闭" 的公共接口
//! - [`DirStream`] - 自带会话的目录流
//! - [`loader`] - 带保留区检查的文件加载
//! - [`cmd`] - `load`、`ls`、`save` 等文件系统命令
//! - [`env`] / [`config`] / [`console`] - 环境变量、板级常量与日志输出

#![no_std]

extern crate alloc;

pub mod cmd;
pub mod config;
pub mod console;
pub mod detect;
pub mod env;
pub mod listing;
pub mod loader;

mod dir_stream;
mod dispatch;
mod registry;
mod session;

pub use dir_stream::DirStream;
pub use dispatch::FsDispatch;
pub use env::Environment;
pub use registry::FsRegistry;
pub use session::Session;
