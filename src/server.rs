// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 监听与工作线程模块
//!
//! 启动流程：
//! 1. 在所有工作线程启动之前创建并绑定唯一的监听套接字（`0.0.0.0:<port>`）。
//! 2. 以 root 运行时降权。
//! 3. 启动 `cpu_limit` 个工作线程，每个线程拥有监听套接字的一个副本和一个单线程 Tokio 运行时，
//!    各自独立地 accept 并处理连接，由内核在它们之间分配新连接。
//!
//! 除了监听套接字和只读的配置之外，工作线程之间没有任何共享状态。

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::{net::TcpListener, runtime::Builder};

use crate::{
    config::Config, connection::Connection, exception::StartupError, privilege,
};

/// 监听队列长度
const LISTEN_BACKLOG: i32 = 1024;

/// accept 失败后的等待时间，避免在文件描述符耗尽时空转
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// 绑定监听端口、降权并启动工作线程，阻塞直到所有工作线程退出。
pub fn listen_and_serve(config: Arc<Config>) -> Result<(), StartupError> {
    let listener = bind(config.port())?;
    info!("端口{}绑定完成", config.port());

    privilege::drop_privilege(config.user())?;

    let workers = spawn_workers(listener, config)?;
    for worker in workers {
        let name = worker.thread().name().unwrap_or("worker").to_string();
        if worker.join().is_err() {
            error!("工作线程{}异常退出", name);
        }
    }
    Ok(())
}

fn open_listener(addr: SocketAddr) -> io::Result<StdTcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// 创建非阻塞的监听套接字
pub fn bind(port: u16) -> Result<StdTcpListener, StartupError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    open_listener(addr).map_err(|e| {
        error!("无法绑定端口：{}，错误：{}", port, e);
        StartupError::Bind(port, e)
    })
}

/// 在给定的监听套接字上启动 `config.cpu_limit()` 个工作线程。
///
/// 单个工作线程创建失败只记录日志；一个都没有启动时返回 `StartupError::NoWorkers`。
pub fn spawn_workers(
    listener: StdTcpListener,
    config: Arc<Config>,
) -> Result<Vec<JoinHandle<()>>, StartupError> {
    let count = config.cpu_limit().max(1);
    let mut workers = Vec::with_capacity(count);
    for index in 0..count {
        let listener = match listener.try_clone() {
            Ok(l) => l,
            Err(e) => {
                error!("无法为工作线程{}复制监听套接字：{}", index, e);
                continue;
            }
        };
        let config = Arc::clone(&config);
        let spawned = thread::Builder::new()
            .name(format!("worker-{}", index))
            .spawn(move || run_worker(index, count, listener, config));
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => error!("无法启动工作线程{}：{}", index, e),
        }
    }

    if workers.is_empty() {
        return Err(StartupError::NoWorkers);
    }
    info!("已启动{}个工作线程", workers.len());
    Ok(workers)
}

fn run_worker(index: usize, count: usize, listener: StdTcpListener, config: Arc<Config>) {
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("工作线程{}无法创建运行时：{}", index, e);
            return;
        }
    };
    runtime.block_on(async move {
        let listener = match TcpListener::from_std(listener) {
            Ok(l) => l,
            Err(e) => {
                error!("工作线程{}无法注册监听套接字：{}", index, e);
                return;
            }
        };
        debug!("工作线程{}开始接受连接", index);
        accept_loop(index, count, listener, config).await;
    });
}

async fn accept_loop(index: usize, count: usize, listener: TcpListener, config: Arc<Config>) {
    // 连接 ID 按工作线程交错分配，保证全局唯一
    let mut id = index as u128;
    let step = count as u128;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("[ID{}]TCP连接已建立：{}", id, addr);
                let config = Arc::clone(&config);
                tokio::spawn(Connection::new(id, stream, config).run());
                id += step;
            }
            Err(e) => {
                error!("工作线程{}接受连接失败：{}", index, e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
