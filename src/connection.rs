// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理模块
//!
//! 每个 TCP 连接由一个 `Connection` 负责，按下面的状态机运行：
//!
//! ```text
//! Reading ──找到空行──▶ Parsed ──构建成功──▶ Responding ──▶ Draining ──keep-alive──▶ Reading
//!    │                    │                                   │
//!    │                    └──解析/构建失败（错误响应）──────────▶│
//!    └──对端关闭 / 超时 / 传输错误──────────────────────────────┴──close──▶ Closed
//! ```
//!
//! 唯一的挂起点是 Reading（等待更多输入）和 Draining（等待输出写完），
//! 两者都受 `read_timeout` 限制：Reading 中每次读取、Draining 中每次写入都必须在时限内有进展。
//! 任何传输层错误（包括超时）都会直接进入 Closed，并释放套接字和文件句柄。

use std::{fs::File, future::Future, io, sync::Arc, time::Duration};

use bytes::BytesMut;
use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    config::Config,
    exception::Exception,
    param::HttpStatus,
    request::{find_header_block_end, Request},
    response::{Response, SystemClock},
};

/// 每次读取前至少预留的缓冲区空间
const READ_CHUNK: usize = 4096;

/// 发送响应体时每次从文件读取的字节数
const WRITE_CHUNK: usize = 64 * 1024;

/// 连接所处的阶段
#[derive(Debug)]
pub enum ConnectionState {
    /// 正在积累输入，等待完整的头部块
    Reading,
    /// 输入缓冲区前 `head_len` 个字节是一个完整的头部块
    Parsed { head_len: usize },
    /// 响应已构建，等待序列化
    Responding(Response),
    /// 输出缓冲区非空，等待写完；`body` 是随后要发送的文件及其长度
    Draining {
        keep_alive: bool,
        body: Option<(File, u64)>,
    },
    Closed,
}

pub struct Connection<S> {
    id: u128,
    stream: S,
    config: Arc<Config>,
    input: BytesMut,
    output: BytesMut,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: u128, stream: S, config: Arc<Config>) -> Self {
        Self {
            id,
            stream,
            config,
            input: BytesMut::with_capacity(READ_CHUNK),
            output: BytesMut::new(),
            state: ConnectionState::Reading,
        }
    }

    /// 驱动状态机直到连接关闭
    pub async fn run(mut self) {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::Reading => self.read_request().await,
                ConnectionState::Parsed { head_len } => self.handle_request(head_len),
                ConnectionState::Responding(response) => self.queue_response(response),
                ConnectionState::Draining { keep_alive, body } => {
                    self.drain(keep_alive, body).await
                }
                ConnectionState::Closed => break,
            };
        }
        debug!("[ID{}]连接已关闭", self.id);
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    async fn read_request(&mut self) -> ConnectionState {
        loop {
            if let Some(head_len) = find_header_block_end(&self.input) {
                return ConnectionState::Parsed { head_len };
            }
            if self.input.len() > self.config.max_header_size() {
                warn!(
                    "[ID{}]头部块超过{}字节仍未结束",
                    self.id,
                    self.config.max_header_size()
                );
                return self.fail(Exception::HeaderTooLarge);
            }

            self.input.reserve(READ_CHUNK);
            let result = match self.config.read_timeout() {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.stream.read_buf(&mut self.input)).await
                    {
                        Ok(result) => result,
                        Err(_) => {
                            debug!("[ID{}]{}秒内没有收到数据，关闭连接", self.id, limit.as_secs());
                            return ConnectionState::Closed;
                        }
                    }
                }
                None => self.stream.read_buf(&mut self.input).await,
            };
            match result {
                Ok(0) => {
                    debug!("[ID{}]对端关闭了连接", self.id);
                    return ConnectionState::Closed;
                }
                Ok(n) => debug!("[ID{}]读取了{}字节", self.id, n),
                Err(e) => {
                    error!("[ID{}]读取TCPStream时遇到错误: {}", self.id, e);
                    return ConnectionState::Closed;
                }
            }
        }
    }

    fn handle_request(&mut self, head_len: usize) -> ConnectionState {
        // 头部块之后的字节留在缓冲区里，作为下一个请求
        let head = self.input.split_to(head_len).freeze();
        let request = match Request::parse(&head, self.id) {
            Ok(request) => request,
            Err(e) => {
                warn!("[ID{}]解析HTTP请求失败: {}", self.id, e);
                return self.fail(e);
            }
        };
        debug!("[ID{}]成功解析HTTP请求", self.id);

        match Response::build(&request, self.config.document_root(), self.id) {
            Ok(response) => {
                summarize(self.id, &request, response.status());
                ConnectionState::Responding(response)
            }
            Err(e) => {
                warn!("[ID{}]请求的路径：{} 无法响应：{}", self.id, request.uri(), e);
                summarize(self.id, &request, e.status());
                self.fail(e)
            }
        }
    }

    /// 把错误转换为最小错误响应，直接进入 Draining
    fn fail(&mut self, e: Exception) -> ConnectionState {
        let status = e.status();
        if status == HttpStatus::InternalServerError {
            error!("[ID{}]处理请求时发生内部错误: {}", self.id, e);
        }
        self.queue_response(Response::error(status, &SystemClock))
    }

    fn queue_response(&mut self, mut response: Response) -> ConnectionState {
        response.write_head(&mut self.output);
        let keep_alive = response.keep_alive();
        let body = response.take_file().and_then(|mut file| {
            let len = file.len();
            file.take_handle().map(|handle| (handle, len))
        });
        ConnectionState::Draining { keep_alive, body }
    }

    async fn drain(&mut self, keep_alive: bool, body: Option<(File, u64)>) -> ConnectionState {
        let limit = self.config.read_timeout();
        if let Err(e) = within(limit, self.stream.write_all_buf(&mut self.output)).await {
            error!("[ID{}]发送响应头失败: {}", self.id, e);
            return ConnectionState::Closed;
        }

        if let Some((file, len)) = body {
            match self.send_body(file, len, limit).await {
                Ok(sent) if sent == len => debug!("[ID{}]响应体发送完成，共{}字节", self.id, sent),
                Ok(sent) => {
                    // 文件在打开后被截断，已发出的 Content-Length 无法兑现
                    warn!("[ID{}]文件只发送了{}/{}字节，关闭连接", self.id, sent, len);
                    return ConnectionState::Closed;
                }
                Err(e) => {
                    error!("[ID{}]发送响应体失败: {}", self.id, e);
                    return ConnectionState::Closed;
                }
            }
        }

        if let Err(e) = within(limit, self.stream.flush()).await {
            error!("[ID{}]刷新输出失败: {}", self.id, e);
            return ConnectionState::Closed;
        }

        if keep_alive {
            ConnectionState::Reading
        } else {
            if !self.input.is_empty() {
                debug!("[ID{}]丢弃{}字节未处理的输入", self.id, self.input.len());
                self.input.clear();
            }
            if let Err(e) = within(limit, self.stream.shutdown()).await {
                debug!("[ID{}]关闭写端失败: {}", self.id, e);
            }
            ConnectionState::Closed
        }
    }

    /// 分块发送文件内容，返回实际发送的字节数
    async fn send_body(&mut self, file: File, len: u64, limit: Option<Duration>) -> io::Result<u64> {
        let mut file = tokio::fs::File::from_std(file).take(len);
        let mut buffer = vec![0u8; WRITE_CHUNK.min(len as usize).max(1)];
        let mut sent = 0u64;
        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            within(limit, self.stream.write_all(&buffer[..n])).await?;
            sent += n as u64;
        }
        Ok(sent)
    }
}

/// 在 `limit` 内完成一次 I/O 操作，超时按传输错误处理
async fn within<T>(
    limit: Option<Duration>,
    op: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, op).await.unwrap_or_else(|_| {
            Err(io::Error::new(io::ErrorKind::TimedOut, "peer stopped reading"))
        }),
        None => op.await,
    }
}

fn summarize(id: u128, request: &Request, status: HttpStatus) {
    info!(
        "[ID{}] {}, {}, {}, {}",
        id,
        request.method(),
        request.uri(),
        request.version(),
        status.code()
    );
}
