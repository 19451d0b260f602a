use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // 未知错误
    UnknownError = 2000,
    // 模块装配配置错误（缺少必需回调等）
    ConfigurationError = 2001,
    // 连接层错误
    ConnectivityError = 2002,
    // 持久化存储错误
    PersistenceError = 2003,
    // 协议编解码错误
    ProtocolError = 2004,
}

/// 模块统一错误类型
#[derive(Debug)]
pub struct ModuleError {
    pub code: ErrorCode,
    pub msg: String,
}

impl ModuleError {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        ModuleError {
            code,
            msg: msg.into(),
        }
    }
}

impl Display for ModuleError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "module error code: {}, msg: {}", self.code as u32, self.msg)
    }
}

impl Error for ModuleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code_and_msg() {
        let err = ModuleError::new(ErrorCode::ConfigurationError, "actuation handler not set");
        let text = format!("{}", err);
        assert!(text.contains("2001"));
        assert!(text.contains("actuation handler not set"));
    }
}
