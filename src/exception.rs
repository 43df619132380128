// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在运行过程中可能出现的两类错误。
//!
//! ## 设计意图
//! - **请求级异常**：`Exception` 覆盖请求解析、文件解析过程中的所有可恢复失败，
//!   每个变体都能通过 [`Exception::status`] 转换为一个完整的错误响应，连接不会被直接丢弃。
//! - **启动级错误**：`StartupError` 代表无法继续运行的情况（配置错误、端口绑定失败等），
//!   记录日志后进程以非零状态码退出。

use std::{fmt, io};

use crate::param::HttpStatus;

/// 请求处理过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 缓冲区中只有空白行，没有任何请求内容
    EmptyRequest,
    /// 请求方法不是 GET 或 HEAD
    UnsupportedMethod,
    /// 找不到以空格结束的 URI
    MissingUri,
    /// 解码后的 URI 不以 `/` 开头、不是合法的 UTF-8 或包含 NUL 字节
    InvalidUri,
    /// 协议版本既不是 HTTP/1.0 也不是 HTTP/1.1，或其后没有行结束符
    UnsupportedHttpVersion,
    /// 实际解析出的头部行数与预先统计的数量不一致
    HeaderCountMismatch,
    /// 头部块没有以空行结束
    UnterminatedHeaders,
    /// 头部块超过了配置的大小上限
    HeaderTooLarge,
    /// 文件不存在（或路径的某个部分不是目录、名字过长、符号链接过多）
    FileNotFound,
    /// 没有访问权限、路径中包含 `/..`，或目录下没有首页文件
    Forbidden,
    /// 其他无法归类的文件系统错误
    FileSystem(io::ErrorKind),
}

use Exception::*;

impl Exception {
    /// 该异常对应的响应状态码
    pub fn status(&self) -> HttpStatus {
        match self {
            EmptyRequest | MissingUri | InvalidUri | UnsupportedHttpVersion
            | HeaderCountMismatch | UnterminatedHeaders | HeaderTooLarge => HttpStatus::BadRequest,
            UnsupportedMethod => HttpStatus::MethodNotAllowed,
            Forbidden => HttpStatus::Forbidden,
            FileNotFound => HttpStatus::NotFound,
            FileSystem(_) => HttpStatus::InternalServerError,
        }
    }
}

impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyRequest => write!(f, "Empty request"),
            UnsupportedMethod => write!(f, "Unsupported request method"),
            MissingUri => write!(f, "Request URI is missing"),
            InvalidUri => write!(f, "Request URI is not a valid path"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            HeaderCountMismatch => write!(f, "Header count mismatch"),
            UnterminatedHeaders => write!(f, "Header block is not terminated"),
            HeaderTooLarge => write!(f, "Header block is too large"),
            FileNotFound => write!(f, "File not found (404)"),
            Forbidden => write!(f, "Access forbidden (403)"),
            FileSystem(kind) => write!(f, "File system error: {}", kind),
        }
    }
}

/// 启动阶段的致命错误。
#[derive(Debug)]
pub enum StartupError {
    /// 配置文件不存在
    ConfigNotFound(String),
    /// 配置文件读取失败
    ConfigRead(String, io::Error),
    /// 配置文件内容无法解析
    ConfigParse(String),
    /// 缺少必填的配置项
    MissingKey(&'static str),
    /// 配置项的值不合法
    InvalidValue(&'static str, String),
    /// 监听端口不合法
    InvalidPort(i64),
    /// 无法创建或绑定监听套接字
    Bind(u16, io::Error),
    /// 一个工作线程都没有启动
    NoWorkers,
    /// 降权失败
    PrivilegeDrop(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::ConfigNotFound(path) => write!(f, "no such config file: {}", path),
            StartupError::ConfigRead(path, e) => write!(f, "unable to read {}: {}", path, e),
            StartupError::ConfigParse(msg) => write!(f, "unable to parse config: {}", msg),
            StartupError::MissingKey(key) => write!(f, "missing config key: {}", key),
            StartupError::InvalidValue(key, value) => {
                write!(f, "invalid value for {}: {}", key, value)
            }
            StartupError::InvalidPort(port) => write!(f, "invalid port: {}", port),
            StartupError::Bind(port, e) => write!(f, "unable to bind port {}: {}", port, e),
            StartupError::NoWorkers => write!(f, "no worker could be started"),
            StartupError::PrivilegeDrop(msg) => write!(f, "unable to drop privilege: {}", msg),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::ConfigRead(_, e) | StartupError::Bind(_, e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_are_bad_request() {
        for e in [
            EmptyRequest,
            MissingUri,
            InvalidUri,
            UnsupportedHttpVersion,
            HeaderCountMismatch,
            UnterminatedHeaders,
            HeaderTooLarge,
        ] {
            assert_eq!(e.status(), HttpStatus::BadRequest, "{}", e);
        }
    }

    #[test]
    fn test_resource_errors() {
        assert_eq!(UnsupportedMethod.status(), HttpStatus::MethodNotAllowed);
        assert_eq!(FileNotFound.status(), HttpStatus::NotFound);
        assert_eq!(Forbidden.status(), HttpStatus::Forbidden);
        assert_eq!(
            FileSystem(io::ErrorKind::Other).status(),
            HttpStatus::InternalServerError
        );
    }

    #[test]
    fn test_startup_error_display() {
        let e = StartupError::MissingKey("document_root");
        assert_eq!(e.to_string(), "missing config key: document_root");
        let e = StartupError::InvalidPort(70000);
        assert_eq!(e.to_string(), "invalid port: 70000");
    }
}
