use std::fmt;

use crate::toggles::ToggleError;

#[derive(Debug)]
pub enum LiveShowError {
    /// 配置错误
    Config(String),
    /// 脚本数据不合法（缺少主播记录、JSON 解析失败等）
    InvalidScript(String),
    /// 引用了未声明的开关名
    UnknownToggle(String),
    /// 枚举开关被赋予了域外的值
    InvalidValue { name: String, value: String },
    /// 正在关闭错误
    ShuttingDown(String),
    /// 无效输入（如空白评论）
    InvalidInput(String),
}

impl fmt::Display for LiveShowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveShowError::Config(e) => write!(f, "Config error: {}", e),
            LiveShowError::InvalidScript(e) => write!(f, "Invalid script: {}", e),
            LiveShowError::UnknownToggle(name) => write!(f, "Unknown toggle: {}", name),
            LiveShowError::InvalidValue { name, value } => {
                write!(f, "Invalid value for toggle {}: {}", name, value)
            }
            LiveShowError::ShuttingDown(e) => write!(f, "Shutting down: {}", e),
            LiveShowError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
        }
    }
}

impl std::error::Error for LiveShowError {}

impl From<ToggleError> for LiveShowError {
    fn from(error: ToggleError) -> Self {
        match error {
            ToggleError::UnknownToggle { name } => LiveShowError::UnknownToggle(name),
            ToggleError::InvalidValue { name, value } => {
                LiveShowError::InvalidValue { name, value }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LiveShowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_error_bridges_to_sdk_error() {
        let err: LiveShowError = ToggleError::UnknownToggle {
            name: "nope".to_string(),
        }
        .into();
        assert!(matches!(err, LiveShowError::UnknownToggle(_)));

        let err: LiveShowError = ToggleError::InvalidValue {
            name: "sticker".to_string(),
            value: "NOPE".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Invalid value for toggle sticker: NOPE");
    }
}
