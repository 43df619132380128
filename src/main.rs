// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态文件 Web 服务器
//!
//! 启动流程：初始化日志 → 读取配置 → 绑定端口并启动工作线程。
//! 用法：`fast_httpd [配置文件路径]`，不传配置文件时使用默认配置。

use std::{env, process::ExitCode, sync::Arc};

use fast_httpd::{
    param::{SERVER_NAME, SERVER_VERSION},
    server, Config,
};
use log::{error, info, warn, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};

const LOG_CONFIG_PATH: &str = "config/log4rs.yaml";

fn main() -> ExitCode {
    // 1. 初始化日志系统
    init_logging();

    // 2. 载入配置
    let config = match env::args().nth(1) {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => {
                info!(
                    "配置文件{}已载入：document_root = {}, cpu_limit = {}",
                    path,
                    config.document_root(),
                    config.cpu_limit()
                );
                config
            }
            Err(e) => {
                error!("无法从配置文件{}构建配置：{}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("没有传入配置文件，使用默认配置");
            Config::new()
        }
    };

    // 3. 监听并服务
    info!(
        "{} v{} is listening on port {}",
        SERVER_NAME,
        SERVER_VERSION,
        config.port()
    );
    match server::listen_and_serve(Arc::new(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("服务器启动失败：{}", e);
            ExitCode::FAILURE
        }
    }
}

/// 优先从 YAML 文件载入 log4rs 配置，失败时退回到 info 级别的控制台输出
fn init_logging() {
    let reason = match log4rs::init_file(LOG_CONFIG_PATH, Default::default()) {
        Ok(()) => return,
        Err(e) => e,
    };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {T} - {m}{n}",
        )))
        .build();
    let fallback = log4rs::config::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match fallback.map(log4rs::init_config) {
        Ok(Ok(_)) => warn!("无法载入{}（{}），日志输出到控制台", LOG_CONFIG_PATH, reason),
        Ok(Err(e)) => eprintln!("无法初始化日志系统：{}", e),
        Err(e) => eprintln!("无法构建日志配置：{}", e),
    }
}
