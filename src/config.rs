// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 配置模块
//!
//! 配置在启动时构建一次，之后以 `Arc<Config>` 的形式只读地分发给所有工作线程。
//! 支持两种文件格式：
//! - 扩展名为 `.toml` 的文件按 TOML 反序列化；
//! - 其他文件按 `httpd.conf` 纯文本格式读取，每行一个 `key value`，`#` 之后为注释。
//!
//! 两种格式中 `cpu_limit` 与 `document_root` 都是必填项。

use std::{fs, io, path::Path, time::Duration};

use log::{debug, warn};
use serde_derive::Deserialize;

use crate::{
    exception::StartupError,
    param::{DEFAULT_PORT, DEFAULT_USER},
};

const DEFAULT_CPU_LIMIT: usize = 1;
const DEFAULT_READ_TIMEOUT: u64 = 30;
const DEFAULT_MAX_HEADER_SIZE: usize = 65536;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    cpu_limit: usize,
    document_root: String,
    port: u16,
    user: String,
    read_timeout: u64,
    max_header_size: usize,
}

/// 从文件中读到的原始配置，校验之后才会转换为 `Config`
#[derive(Deserialize, Debug, Default)]
struct RawConfig {
    cpu_limit: Option<i64>,
    document_root: Option<String>,
    port: Option<i64>,
    user: Option<String>,
    read_timeout: Option<i64>,
    max_header_size: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// 没有配置文件时使用的默认配置：1 个工作线程、默认端口、空的文档根目录
    pub fn new() -> Self {
        Self {
            cpu_limit: DEFAULT_CPU_LIMIT,
            document_root: String::new(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }

    /// 按扩展名选择格式并读取配置文件
    pub fn from_file(filename: &str) -> Result<Self, StartupError> {
        let content = match fs::read_to_string(filename) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StartupError::ConfigNotFound(filename.to_string()))
            }
            Err(e) => return Err(StartupError::ConfigRead(filename.to_string(), e)),
        };
        let is_toml = Path::new(filename)
            .extension()
            .map_or(false, |ext| ext == "toml");
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_conf_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, StartupError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| StartupError::ConfigParse(e.to_string()))?;
        raw.validate()
    }

    /// 读取 `httpd.conf` 格式。
    ///
    /// 同一个键出现多次时以第一次为准；无法识别的键只记录警告。
    pub fn from_conf_str(content: &str) -> Result<Self, StartupError> {
        let mut raw = RawConfig::default();
        for line in content.lines() {
            let line = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let mut tokens = line.split_whitespace();
            let key = match tokens.next() {
                Some(k) => k,
                None => continue,
            };
            // 值在第一个空白处截断
            let value = match tokens.next() {
                Some(v) => v,
                None => {
                    return Err(StartupError::ConfigParse(format!(
                        "key {} has no value",
                        key
                    )))
                }
            };
            debug!("Found {}", key);
            let duplicated = match key {
                "cpu_limit" => set_once(&mut raw.cpu_limit, parse_int("cpu_limit", value)?),
                "port" => set_once(&mut raw.port, parse_int("port", value)?),
                "read_timeout" => set_once(&mut raw.read_timeout, parse_int("read_timeout", value)?),
                "max_header_size" => set_once(
                    &mut raw.max_header_size,
                    parse_int("max_header_size", value)?,
                ),
                "document_root" => set_once(&mut raw.document_root, value.to_string()),
                "user" => set_once(&mut raw.user, value.to_string()),
                _ => {
                    warn!("忽略未知的配置项：{}", key);
                    false
                }
            };
            if duplicated {
                warn!("配置项{}重复出现，使用第一次的值", key);
            }
        }
        raw.validate()
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return true;
    }
    *slot = Some(value);
    false
}

fn parse_int(key: &'static str, value: &str) -> Result<i64, StartupError> {
    value
        .parse()
        .map_err(|_| StartupError::InvalidValue(key, value.to_string()))
}

fn non_negative(key: &'static str, value: i64) -> Result<u64, StartupError> {
    u64::try_from(value).map_err(|_| StartupError::InvalidValue(key, value.to_string()))
}

impl RawConfig {
    fn validate(self) -> Result<Config, StartupError> {
        let cpu_limit = self.cpu_limit.ok_or(StartupError::MissingKey("cpu_limit"))?;
        let cpu_limit = non_negative("cpu_limit", cpu_limit)?;
        let document_root = self
            .document_root
            .ok_or(StartupError::MissingKey("document_root"))?;

        let port = match self.port {
            Some(p) => match u16::try_from(p) {
                Ok(p) if p != 0 => p,
                _ => return Err(StartupError::InvalidPort(p)),
            },
            None => DEFAULT_PORT,
        };

        let max_header_size = match self.max_header_size {
            Some(size) => match usize::try_from(size) {
                Ok(size) if size > 0 => size,
                _ => return Err(StartupError::InvalidValue("max_header_size", size.to_string())),
            },
            None => DEFAULT_MAX_HEADER_SIZE,
        };

        let read_timeout = match self.read_timeout {
            Some(t) => non_negative("read_timeout", t)?,
            None => DEFAULT_READ_TIMEOUT,
        };

        let cpu_limit = match cpu_limit {
            0 => num_cpus::get(),
            n => usize::try_from(n)
                .map_err(|_| StartupError::InvalidValue("cpu_limit", n.to_string()))?,
        };

        Ok(Config {
            cpu_limit,
            document_root,
            port,
            user: self.user.unwrap_or_else(|| DEFAULT_USER.to_string()),
            read_timeout,
            max_header_size,
        })
    }
}

impl Config {
    pub fn with_document_root(mut self, document_root: impl Into<String>) -> Self {
        self.document_root = document_root.into();
        self
    }

    pub fn with_cpu_limit(mut self, cpu_limit: usize) -> Self {
        self.cpu_limit = cpu_limit.max(1);
        self
    }

    pub fn with_read_timeout(mut self, seconds: u64) -> Self {
        self.read_timeout = seconds;
        self
    }

    pub fn with_max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size.max(1);
        self
    }
}

impl Config {
    pub fn cpu_limit(&self) -> usize {
        self.cpu_limit
    }

    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// 空闲读取超时，配置为 0 时不限制
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn max_header_size(&self) -> usize {
        self.max_header_size
    }
}
