// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应构建模块
//!
//! 根据解析好的请求构建响应：选择状态码、按固定顺序生成头部
//! （`Connection`、`Date`、`Content-Length`、`Content-Type`、`Server`），
//! 并把解析到的文件挂在响应上，由连接层负责发送响应体。

use std::{
    borrow::Cow,
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::{
    exception::Exception,
    file_system::{self, ResolvedFile},
    mime::Mime,
    param::*,
    request::Request,
};

/// 当前时间的来源，读取失败时返回 `None`
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> Option<DateTime<Utc>>;
}

/// 读取系统时钟
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        DateTime::from_timestamp(elapsed.as_secs() as i64, elapsed.subsec_nanos())
    }
}

/// 一行完整的响应头，文本已包含行尾的 `\r\n`，序列化时直接拷贝字节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine(Cow<'static, str>);

impl HeaderLine {
    /// 使用预先写好的头部文本
    pub const fn fixed(text: &'static str) -> Self {
        Self(Cow::Borrowed(text))
    }

    /// 由名称和值构建一行头部，值中含有行结束符时构建失败
    pub fn build(name: &str, value: &str) -> Option<Self> {
        if value.contains(['\r', '\n']) || name.contains(['\r', '\n', ':']) {
            return None;
        }
        Some(Self(Cow::Owned(format!("{}: {}{}", name, value, CRLF))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn date_header(clock: &dyn Clock) -> HeaderLine {
    match clock.now() {
        Some(now) => HeaderLine(Cow::Owned(
            now.format("Date: %a, %d %b %Y %H:%M:%S GMT\r\n").to_string(),
        )),
        None => {
            warn!("无法读取系统时间，使用默认的Date头");
            HeaderLine::fixed(DEFAULT_DATE_HEADER)
        }
    }
}

fn server_header() -> HeaderLine {
    HeaderLine(Cow::Owned(format!(
        "Server: {}/{}{}",
        SERVER_NAME, SERVER_VERSION, CRLF
    )))
}

#[derive(Debug)]
pub struct Response {
    status: HttpStatus,
    version: HttpVersion,
    headers: Vec<HeaderLine>,
    file: Option<ResolvedFile>,
}

impl Response {
    /// 为请求构建响应，使用系统时钟生成 `Date` 头。
    pub fn build(request: &Request, document_root: &str, id: u128) -> Result<Self, Exception> {
        Self::build_with_clock(request, document_root, &SystemClock, id)
    }

    /// 为请求构建响应。
    ///
    /// 文件解析失败时返回对应的 `Exception`（404 / 403 / 500），由调用方发送错误响应；
    /// `Content-Length`、`Content-Type` 构建失败只会导致该头部被省略。
    pub fn build_with_clock(
        request: &Request,
        document_root: &str,
        clock: &dyn Clock,
        id: u128,
    ) -> Result<Self, Exception> {
        let mut headers = Vec::with_capacity(5);

        // 1. Connection：只有 HTTP/1.1 保持连接
        headers.push(match request.version() {
            HttpVersion::V1_1 => HeaderLine::fixed(CONNECTION_KEEP_ALIVE_HEADER),
            _ => HeaderLine::fixed(CONNECTION_CLOSE_HEADER),
        });

        // 2. Date
        headers.push(date_header(clock));

        // 3. 解析文件，只有 GET 需要保留文件句柄
        let file = match file_system::resolve(
            document_root,
            request.uri(),
            request.method().wants_body(),
        ) {
            Ok(file) => file,
            Err(state) => {
                debug!("[ID{}]文件解析失败：{:?}", id, state);
                return Err(state.into());
            }
        };
        debug!(
            "[ID{}]File to send: {}, len: {}, mime-type: {}",
            id,
            file.path().display(),
            file.len(),
            file.mime()
        );

        // 4. Content-Length 与 Content-Type
        match HeaderLine::build("Content-Length", &file.len().to_string()) {
            Some(h) => headers.push(h),
            None => warn!("[ID{}]无法构建Content-Length头", id),
        }
        match HeaderLine::build("Content-Type", file.mime().as_str()) {
            Some(h) => headers.push(h),
            None => warn!("[ID{}]无法构建Content-Type头", id),
        }

        // 5. Server 总是最后一个
        headers.push(server_header());

        Ok(Self {
            status: HttpStatus::Ok,
            version: request.version(),
            headers,
            file: Some(file),
        })
    }

    /// 构建最小的错误响应：固定 HTTP/1.0、关闭连接、没有响应体。
    pub fn error(status: HttpStatus, clock: &dyn Clock) -> Self {
        let status = match status {
            HttpStatus::Ok | HttpStatus::Undefined => HttpStatus::InternalServerError,
            other => other,
        };
        Self {
            status,
            version: HttpVersion::V1_0,
            headers: vec![
                HeaderLine::fixed(CONNECTION_CLOSE_HEADER),
                date_header(clock),
                HeaderLine::fixed(CONTENT_LENGTH_ZERO_HEADER),
                server_header(),
            ],
            file: None,
        }
    }

    /// 把状态行、全部头部和结束空行写入输出缓冲区
    pub fn write_head(&self, out: &mut BytesMut) {
        let status_line = format!(
            "{} {} {}{}",
            self.version.as_str(),
            self.status.code(),
            self.status.reason(),
            CRLF
        );
        let total = status_line.len()
            + self.headers.iter().map(HeaderLine::len).sum::<usize>()
            + CRLF.len();
        out.reserve(total);
        out.put_slice(status_line.as_bytes());
        for header in &self.headers {
            out.put_slice(header.as_str().as_bytes());
        }
        out.put_slice(CRLF.as_bytes());
    }

    /// 序列化响应头部
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut out = BytesMut::new();
        self.write_head(&mut out);
        out.to_vec()
    }

    /// 响应发送完毕后是否保持连接
    pub fn keep_alive(&self) -> bool {
        self.headers
            .iter()
            .any(|h| h.as_str() == CONNECTION_KEEP_ALIVE_HEADER)
    }

    /// 取走挂在响应上的文件，所有权转移给连接层
    pub fn take_file(&mut self) -> Option<ResolvedFile> {
        self.file.take()
    }
}

impl Response {
    pub fn status(&self) -> HttpStatus {
        self.status
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn headers(&self) -> &[HeaderLine] {
        &self.headers
    }

    pub fn file(&self) -> Option<&ResolvedFile> {
        self.file.as_ref()
    }

    pub fn content_type(&self) -> Option<Mime> {
        self.file.as_ref().map(ResolvedFile::mime)
    }
}
