// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # MIME 类型识别
//!
//! 按文件后缀名把待发送文件归入固定的几种内容类型，用于设置 `Content-Type`。
//! 无法识别的后缀统一回退为 `application/octet-stream`。

use std::{collections::HashMap, fmt, path::Path};

use lazy_static::lazy_static;
use log::warn;

/// 服务器能够识别的内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mime {
    ApplicationOctetStream,
    TextHtml,
    TextCss,
    ApplicationJavascript,
    ImageJpeg,
    ImagePng,
    ImageGif,
    ApplicationXShockwaveFlash,
}

lazy_static! {
    /// 文件后缀名到 MIME 类型的映射表（区分大小写）。
    pub static ref MIME_TYPES: HashMap<&'static str, Mime> = {
        let mut map = HashMap::new();
        map.insert("html", Mime::TextHtml);
        map.insert("css", Mime::TextCss);
        map.insert("js", Mime::ApplicationJavascript);
        map.insert("jpg", Mime::ImageJpeg);
        map.insert("jpeg", Mime::ImageJpeg);
        map.insert("png", Mime::ImagePng);
        map.insert("gif", Mime::ImageGif);
        map.insert("swf", Mime::ApplicationXShockwaveFlash);
        map
    };
}

impl Mime {
    /// `Content-Type` 头中使用的文本
    pub fn as_str(&self) -> &'static str {
        match self {
            Mime::ApplicationOctetStream => "application/octet-stream",
            Mime::TextHtml => "text/html",
            Mime::TextCss => "text/css",
            Mime::ApplicationJavascript => "application/javascript",
            Mime::ImageJpeg => "image/jpeg",
            Mime::ImagePng => "image/png",
            Mime::ImageGif => "image/gif",
            Mime::ApplicationXShockwaveFlash => "application/x-shockwave-flash",
        }
    }
}

impl fmt::Display for Mime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 根据路径的后缀名判定 MIME 类型。
///
/// 没有后缀或后缀不在表中时返回 `Mime::ApplicationOctetStream`，并记录一条警告。
/// `.html` 这样的隐藏文件没有后缀，整个文件名都是主干部分。
pub fn classify(path: &Path) -> Mime {
    let extension = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => {
            warn!("文件{}没有可识别的扩展名，按二进制流处理", path.display());
            return Mime::ApplicationOctetStream;
        }
    };
    match MIME_TYPES.get(extension) {
        Some(mime) => *mime,
        None => {
            warn!("未知的文件扩展名：.{}", extension);
            Mime::ApplicationOctetStream
        }
    }
}
