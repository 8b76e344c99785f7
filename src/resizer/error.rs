//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载“加载 → 解码 → 合成 → 编码”链路中的所有错误来源。
//! 这些错误只对单张图片或单个（图片, 尺寸）组合致命，由批处理层决定跳过还是上报。
//! 元数据写入失败不在此列：它总是在 `density` 中就地回退。

/// 图片处理统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ResizeError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("尺寸错误：{0}")]
    InvalidSize(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("文件错误：{0}")]
    FileSystem(String),
}

impl ResizeError {
    /// 稳定错误码，供宿主界面区分错误类型。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_FAILED",
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::InvalidSize(_) => "INVALID_SIZE",
            Self::Encode(_) => "ENCODE_FAILED",
            Self::ResourceLimit(_) => "RESOURCE_LIMIT",
            Self::FileSystem(_) => "FILE_SYSTEM",
        }
    }

    /// 出错阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::FileSystem(_) | Self::InvalidFormat(_) => "load",
            Self::Decode(_) | Self::ResourceLimit(_) => "decode",
            Self::InvalidSize(_) => "geometry",
            Self::Encode(_) => "encode",
        }
    }
}

impl From<ResizeError> for String {
    fn from(error: ResizeError) -> Self {
        error.to_string()
    }
}
