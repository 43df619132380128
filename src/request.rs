// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责把连接上读到的一个完整头部块（以空行结束）解析为 `Request`。
//! 解析器只对输入缓冲区做一次顺序扫描，方法、版本和头部行都以切片的形式
//! 指向原始缓冲区，不做任何拷贝；只有 URI 因为需要百分号解码而单独分配。
//!
//! 解析步骤：
//! 1. 跳过开头多余的行结束符，空请求判定为 400。
//! 2. 匹配方法记号（GET / HEAD），其他方法判定为 405。
//! 3. 读取 URI 记号，百分号解码后去掉查询字符串；结果必须以 `/` 开头。
//! 4. 匹配协议版本记号 `HTTP/1.0` 或 `HTTP/1.1`，其后必须紧跟行结束符。
//! 5. 按预先统计的数量收集头部行，直到遇到结束空行。

use log::{debug, info};

use crate::{
    exception::Exception,
    param::{HttpRequestMethod, HttpVersion, CRLF, HEADER_BLOCK_END},
};

/// 请求中的一行头部。
///
/// `text` 指向原始缓冲区，且包含行尾的 `\r\n`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    text: &'a [u8],
}

impl<'a> Header<'a> {
    /// 包含行结束符的完整字节
    pub fn text(&self) -> &'a [u8] {
        self.text
    }

    /// 不含行结束符的内容
    pub fn line(&self) -> &'a [u8] {
        &self.text[..self.text.len() - CRLF.len()]
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len() == CRLF.len()
    }
}

/// 表示一个解析完成的 HTTP 请求。
///
/// URI 已经过百分号解码并去掉了查询字符串，可以直接交给文件解析模块。
#[derive(Debug, Clone)]
pub struct Request<'a> {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 解码后的资源路径（不含查询字符串）
    uri: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 按出现顺序排列的头部行
    headers: Vec<Header<'a>>,
}

fn find_crlf(bytes: &[u8]) -> Option<usize> {
    bytes.windows(CRLF.len()).position(|w| w == CRLF.as_bytes())
}

fn skip_line_terminators(buffer: &[u8]) -> &[u8] {
    let start = buffer
        .iter()
        .position(|b| *b != b'\r' && *b != b'\n')
        .unwrap_or(buffer.len());
    &buffer[start..]
}

/// 查找头部块结束空行的位置，返回头部块（含空行）的总长度
pub fn find_header_block_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_BLOCK_END.len())
        .position(|w| w == HEADER_BLOCK_END)
        .map(|pos| pos + HEADER_BLOCK_END.len())
}

/// 统计请求行之后、结束空行之前的头部行数。
///
/// 开头多余的行结束符会被跳过，与解析器的处理保持一致；
/// 找不到结束空行时返回 `None`。
pub fn count_header_lines(buffer: &[u8]) -> Option<usize> {
    let request = skip_line_terminators(buffer);
    let block_end = find_header_block_end(request)?;
    // 结束空行之前的每一个 CRLF 都结束一行，其中第一行是请求行
    let block = &request[..block_end - CRLF.len()];
    let line_ends = block
        .windows(CRLF.len())
        .filter(|w| *w == CRLF.as_bytes())
        .count();
    Some(line_ends.saturating_sub(1))
}

/// 百分号解码，从左到右扫描一次。
///
/// 只有紧跟两位十六进制数字的 `%` 才会被替换，其余的 `%` 原样保留；
/// 解码得到的 `%` 不会再次参与解码。
pub fn percent_decode(input: &[u8]) -> Vec<u8> {
    fn hex_value(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                input.get(i + 1).copied().and_then(hex_value),
                input.get(i + 2).copied().and_then(hex_value),
            ) {
                output.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        output.push(input[i]);
        i += 1;
    }
    output
}

impl<'a> Request<'a> {
    /// 解析一个完整的头部块，头部行数由 [`count_header_lines`] 预先统计。
    ///
    /// # 参数
    /// * `buffer` - 以空行结束的请求头部块。
    /// * `id` - 连接 ID，用于日志追踪。
    pub fn parse(buffer: &'a [u8], id: u128) -> Result<Self, Exception> {
        let expected = count_header_lines(buffer).unwrap_or(0);
        debug!("[ID{}]Headers count: {}", id, expected);
        Self::parse_with_capacity(buffer, expected, id)
    }

    /// 按给定的头部行数解析请求。
    ///
    /// 头部存储按 `expected_headers` 预先分配，实际行数超过或少于该值都判定为 400，
    /// 不会越界写入。
    pub fn parse_with_capacity(
        buffer: &'a [u8],
        expected_headers: usize,
        id: u128,
    ) -> Result<Self, Exception> {
        // 1. 跳过开头的空行
        let request = skip_line_terminators(buffer);
        if request.is_empty() {
            info!("[ID{}]跳过了一个空请求", id);
            return Err(Exception::EmptyRequest);
        }

        let line_len = find_crlf(request).unwrap_or(request.len());
        let request_line = &request[..line_len];

        // 2. 方法记号，没有任何空格的请求行视为格式错误
        let method_end = match request_line.iter().position(|b| *b == b' ') {
            Some(pos) => pos,
            None => {
                debug!("[ID{}]请求行中没有空格，判定为格式错误", id);
                return Err(Exception::MissingUri);
            }
        };
        let method = HttpRequestMethod::TOKENS
            .iter()
            .find(|(token, _)| *token == &request_line[..method_end])
            .map(|(_, method)| *method)
            .unwrap_or(HttpRequestMethod::Undefined);
        debug!("[ID{}]HTTP request method parsed: {}", id, method);
        if method == HttpRequestMethod::Undefined {
            return Err(Exception::UnsupportedMethod);
        }

        // 3. URI 记号
        let after_method = &request_line[method_end + 1..];
        let uri_end = match after_method.iter().position(|b| *b == b' ') {
            Some(pos) => pos,
            None => {
                debug!("[ID{}]找不到URI之后的空格", id);
                return Err(Exception::MissingUri);
            }
        };
        let mut decoded = percent_decode(&after_method[..uri_end]);
        if let Some(query_start) = decoded.iter().position(|b| *b == b'?') {
            decoded.truncate(query_start);
        }
        if decoded.first() != Some(&b'/') {
            debug!("[ID{}]URI不是以/开头的绝对路径", id);
            return Err(Exception::InvalidUri);
        }
        if decoded.contains(&0) {
            debug!("[ID{}]URI中包含NUL字节", id);
            return Err(Exception::InvalidUri);
        }
        let uri = match String::from_utf8(decoded) {
            Ok(uri) => uri,
            Err(_) => {
                debug!("[ID{}]URI解码后不是合法的UTF-8", id);
                return Err(Exception::InvalidUri);
            }
        };
        debug!("[ID{}]HTTP request URI parsed: {}", id, uri);

        // 4. 协议版本记号，各自按自身长度比较
        let version_token = &after_method[uri_end + 1..];
        let version = match HttpVersion::from_token(version_token) {
            Some(v) if line_len < request.len() => v,
            _ => {
                debug!(
                    "[ID{}]无法识别的协议版本：{}",
                    id,
                    String::from_utf8_lossy(version_token)
                );
                return Err(Exception::UnsupportedHttpVersion);
            }
        };
        debug!("[ID{}]HTTP request protocol version parsed: {}", id, version);

        // 5. 头部行
        let mut headers = Vec::with_capacity(expected_headers);
        let mut rest = &request[line_len + CRLF.len()..];
        loop {
            let header_len = match find_crlf(rest) {
                Some(n) => n,
                None => {
                    debug!("[ID{}]无法解析头部：没有遇到结束空行", id);
                    return Err(Exception::UnterminatedHeaders);
                }
            };
            if header_len == 0 {
                break;
            }
            if headers.len() == expected_headers {
                debug!("[ID{}]头部行数超过了预先分配的{}行", id, expected_headers);
                return Err(Exception::HeaderCountMismatch);
            }
            let (text, tail) = rest.split_at(header_len + CRLF.len());
            headers.push(Header { text });
            rest = tail;
        }
        if headers.len() != expected_headers {
            debug!(
                "[ID{}]头部行数不一致：预期{}行，实际{}行",
                id,
                expected_headers,
                headers.len()
            );
            return Err(Exception::HeaderCountMismatch);
        }

        Ok(Self {
            method,
            uri,
            version,
            headers,
        })
    }
}

// --- Getter 访问器实现 ---

impl<'a> Request<'a> {
    /// 获取 HTTP 协议版本
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 获取解码后的请求路径
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 获取请求方法
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 获取按顺序排列的头部行
    pub fn headers(&self) -> &[Header<'a>] {
        &self.headers
    }
}
