// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 文件解析模块
//!
//! 把请求 URI 映射到文档根目录下的一个可发送的普通文件：
//! 1. 拼接文档根目录与请求路径，拒绝任何包含 `/..` 的路径。
//! 2. 路径指向目录时回退到该目录下的 `index.html`，没有首页文件的目录一律禁止访问。
//! 3. 打开文件并记录长度与 MIME 类型；只有需要响应体的方法（GET）才保留文件句柄。
//!
//! `/..` 检查是纯文本检查，不会对路径做规范化，因此它只是纵深防御的一层，
//! 无法拦截文档根目录内指向外部的符号链接。

use std::{
    fs::{File, OpenOptions},
    io::{self, Seek, SeekFrom},
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

use log::{debug, error};
use nix::{errno::Errno, fcntl::OFlag};

use crate::{
    exception::Exception,
    mime::{self, Mime},
    param::INDEX_FILE_NAME,
};

/// 文件解析失败的原因（仅在解析器与响应构建器之间使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    NotFound,
    Forbidden,
    InternalError(io::ErrorKind),
}

impl From<FileState> for Exception {
    fn from(state: FileState) -> Self {
        match state {
            FileState::NotFound => Exception::FileNotFound,
            FileState::Forbidden => Exception::Forbidden,
            FileState::InternalError(kind) => Exception::FileSystem(kind),
        }
    }
}

/// 解析成功的文件。
///
/// 长度在打开文件时确定；若文件随后被并发修改，实际发送的字节数以该长度为准。
#[derive(Debug)]
pub struct ResolvedFile {
    path: PathBuf,
    len: u64,
    file: Option<File>,
    mime: Mime,
}

impl ResolvedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn mime(&self) -> Mime {
        self.mime
    }

    /// 是否持有可读取响应体的文件句柄
    pub fn has_handle(&self) -> bool {
        self.file.is_some()
    }

    /// 取出文件句柄，所有权转移给负责传输的一方
    pub fn take_handle(&mut self) -> Option<File> {
        self.file.take()
    }
}

/// 把操作系统错误归类为 `FileState`
fn errno_to_file_state(err: &io::Error) -> FileState {
    match err.raw_os_error().map(Errno::from_raw) {
        Some(Errno::EFAULT)
        | Some(Errno::ELOOP)
        | Some(Errno::ENAMETOOLONG)
        | Some(Errno::ENOENT)
        | Some(Errno::ENOTDIR) => FileState::NotFound,
        Some(Errno::EACCES) => FileState::Forbidden,
        _ => FileState::InternalError(err.kind()),
    }
}

fn open_with(path: &Path, flags: OFlag) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags((flags | OFlag::O_NONBLOCK).bits())
        .open(path)
}

/// 解析请求路径。
///
/// # 参数
/// * `document_root` - 文档根目录，直接与请求路径做字符串拼接。
/// * `request_path` - 已解码、已去掉查询字符串的 URI，必须以 `/` 开头。
/// * `want_body` - 是否保留文件句柄用于发送响应体。
pub fn resolve(
    document_root: &str,
    request_path: &str,
    want_body: bool,
) -> Result<ResolvedFile, FileState> {
    // 不以 / 开头的路径会拼接出文档根目录的兄弟目录
    if !request_path.starts_with('/') {
        debug!("请求路径{}不是绝对路径，拒绝访问", request_path);
        return Err(FileState::Forbidden);
    }

    let mut absolute_path = String::with_capacity(document_root.len() + request_path.len());
    absolute_path.push_str(document_root);
    absolute_path.push_str(request_path);
    if absolute_path.ends_with('/') {
        absolute_path.pop();
    }
    debug!("Absolute path: {}", absolute_path);

    if absolute_path.contains("/..") {
        debug!("路径{}包含/..，拒绝访问", absolute_path);
        return Err(FileState::Forbidden);
    }

    let mut path = PathBuf::from(absolute_path);
    let mut file = match open_with(&path, OFlag::O_DIRECTORY) {
        Ok(dir) => {
            debug!("路径{}指向目录，查找首页文件", path.display());
            drop(dir);
            path.push(INDEX_FILE_NAME);
            match open_with(&path, OFlag::empty()) {
                Ok(f) => f,
                Err(e) => {
                    error!("无法打开首页文件{}：{}", path.display(), e);
                    return Err(FileState::Forbidden);
                }
            }
        }
        Err(e) if e.raw_os_error() == Some(Errno::ENOTDIR as i32) => {
            debug!("路径{}指向普通文件", path.display());
            match open_with(&path, OFlag::empty()) {
                Ok(f) => f,
                Err(e) => {
                    error!("无法打开文件{}：{}", path.display(), e);
                    return Err(errno_to_file_state(&e));
                }
            }
        }
        Err(e) => {
            error!("无法按绝对路径{}打开文件：{}", path.display(), e);
            return Err(errno_to_file_state(&e));
        }
    };

    match file.metadata() {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            error!("{}不是普通文件", path.display());
            return Err(FileState::Forbidden);
        }
        Err(e) => {
            error!("无法获取{}的元数据：{}", path.display(), e);
            return Err(errno_to_file_state(&e));
        }
    }

    let len = match file.seek(SeekFrom::End(0)).and_then(|len| {
        file.seek(SeekFrom::Start(0))?;
        Ok(len)
    }) {
        Ok(len) => len,
        Err(e) => {
            error!("无法通过seek获取{}的长度：{}", path.display(), e);
            return Err(errno_to_file_state(&e));
        }
    };
    debug!("File length: {}", len);

    let mime = mime::classify(&path);
    Ok(ResolvedFile {
        path,
        len,
        file: if want_body { Some(file) } else { None },
        mime,
    })
}
