// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了服务器遵循的 HTTP/1.0 与 HTTP/1.1 子集相关的常量和强类型枚举，包括：
//! - 请求方法、协议版本与响应状态码。
//! - 固定的响应头文本（已包含行结束符，序列化时直接按字节拷贝）。
//! - 启动时使用的默认值。

use std::fmt;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "FastHttpServer";

/// 服务器版本号，随 `Server` 头一起发送
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 请求头块的结束标记（空行）
pub const HEADER_BLOCK_END: &[u8] = b"\r\n\r\n";

/// 目录请求时回退查找的首页文件
pub const INDEX_FILE_NAME: &str = "index.html";

/// 未提供配置文件时使用的监听端口
pub const DEFAULT_PORT: u16 = 80;

/// 以 root 启动时降权的目标账户
pub const DEFAULT_USER: &str = "httpd";

/// 读取系统时钟失败时使用的占位日期头
pub const DEFAULT_DATE_HEADER: &str = "Date: Thu, 1 Jan 1970 00:00:00 GMT\r\n";

pub const CONNECTION_KEEP_ALIVE_HEADER: &str = "Connection: keep-alive\r\n";
pub const CONNECTION_CLOSE_HEADER: &str = "Connection: close\r\n";
pub const CONTENT_LENGTH_ZERO_HEADER: &str = "Content-Length: 0\r\n";

/// 支持的 HTTP 请求方法
///
/// `Undefined` 表示请求行中的方法不在支持列表内。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpRequestMethod {
    Undefined,
    /// 获取资源的元数据（不包含响应体）
    Head,
    /// 获取资源
    Get,
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Undefined,
    /// HTTP/1.0 版本
    V1_0,
    /// HTTP/1.1 版本
    V1_1,
}

/// 服务器会发出的全部响应状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Undefined,
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl HttpRequestMethod {
    /// 请求行中出现的方法记号
    pub const TOKENS: [(&'static [u8], HttpRequestMethod); 2] = [
        (b"GET", HttpRequestMethod::Get),
        (b"HEAD", HttpRequestMethod::Head),
    ];

    /// 该方法是否需要传输响应体
    pub fn wants_body(&self) -> bool {
        *self == HttpRequestMethod::Get
    }
}

impl HttpVersion {
    /// 请求行结尾处的版本记号
    pub const TOKENS: [(&'static [u8], HttpVersion); 2] = [
        (b"HTTP/1.0", HttpVersion::V1_0),
        (b"HTTP/1.1", HttpVersion::V1_1),
    ];

    /// 识别一个完整的版本记号，未知记号返回 `None`
    pub fn from_token(token: &[u8]) -> Option<Self> {
        Self::TOKENS
            .iter()
            .find(|(text, _)| *text == token)
            .map(|(_, version)| *version)
    }

    /// 写入状态行的版本文本，未定义版本按 HTTP/1.0 发送
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::V1_1 => "HTTP/1.1",
            HttpVersion::V1_0 | HttpVersion::Undefined => "HTTP/1.0",
        }
    }
}

impl HttpStatus {
    /// 状态码数值，未定义状态按 500 处理
    pub fn code(&self) -> u16 {
        match self {
            HttpStatus::Ok => 200,
            HttpStatus::BadRequest => 400,
            HttpStatus::Forbidden => 403,
            HttpStatus::NotFound => 404,
            HttpStatus::MethodNotAllowed => 405,
            HttpStatus::InternalServerError | HttpStatus::Undefined => 500,
        }
    }

    /// 标准原因短语（Reason Phrase）
    pub fn reason(&self) -> &'static str {
        match self {
            HttpStatus::Ok => "OK",
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::Forbidden => "Forbidden",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::MethodNotAllowed => "Method Not Allowed",
            HttpStatus::InternalServerError | HttpStatus::Undefined => "Internal Server Error",
        }
    }

    /// 由数值反查状态，只识别服务器会发出的六种状态
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(HttpStatus::Ok),
            400 => Some(HttpStatus::BadRequest),
            403 => Some(HttpStatus::Forbidden),
            404 => Some(HttpStatus::NotFound),
            405 => Some(HttpStatus::MethodNotAllowed),
            500 => Some(HttpStatus::InternalServerError),
            _ => None,
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::Undefined => write!(f, "VERSION_UNDEFINED"),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Undefined => write!(f, "METHOD_UNDEFINED"),
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}
