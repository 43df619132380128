// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 降权模块
//!
//! 监听端口绑定完成后，如果进程以 root 身份运行，就切换到配置中指定的普通账户。
//! 顺序是先清空附加组、再切换组、最后切换用户，切换用户之后就无法再修改组。

use log::{debug, info};
use nix::unistd::{self, User};

use crate::exception::StartupError;

/// 按账户名查找用户
fn lookup(user: &str) -> Result<User, StartupError> {
    match User::from_name(user) {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err(StartupError::PrivilegeDrop(format!("no such user: {}", user))),
        Err(e) => Err(StartupError::PrivilegeDrop(format!(
            "unable to look up {}: {}",
            user, e
        ))),
    }
}

/// 以 root 运行时切换到 `user` 账户，非 root 时什么也不做。
pub fn drop_privilege(user: &str) -> Result<(), StartupError> {
    if !unistd::geteuid().is_root() {
        debug!("当前不是root用户，无需降权");
        return Ok(());
    }

    let account = lookup(user)?;
    let fail = |step: &str, e: nix::Error| {
        StartupError::PrivilegeDrop(format!("{} for {} failed: {}", step, user, e))
    };
    unistd::setgroups(&[account.gid]).map_err(|e| fail("setgroups", e))?;
    unistd::setgid(account.gid).map_err(|e| fail("setgid", e))?;
    unistd::setuid(account.uid).map_err(|e| fail("setuid", e))?;
    info!(
        "已降权到用户{}（uid={}, gid={}）",
        user, account.uid, account.gid
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_root() {
        let account = lookup("root").unwrap();
        assert!(account.uid.is_root());
    }

    #[test]
    fn test_lookup_unknown_user() {
        assert!(matches!(
            lookup("no-such-user-fast-httpd"),
            Err(StartupError::PrivilegeDrop(_))
        ));
    }

    #[test]
    fn test_non_root_is_noop() {
        if unistd::geteuid().is_root() {
            // 以 root 运行测试时会真正切换身份，跳过
            return;
        }
        assert!(drop_privilege("no-such-user-fast-httpd").is_ok());
    }
}
