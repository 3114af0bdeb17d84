//! 填充请求与位置数据
//!
//! 所有坐标都使用页面坐标系：原点在左上角，y 轴向下。

use serde::{Deserialize, Serialize};

/// 放置矩形
///
/// 不做几何校验：`right <= left` 的退化矩形按原样接受。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PosData {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PosData {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// 字体资源名与字号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// 资源名，不带前导 `/`，例如 `Helv`
    pub name: String,
    pub size: f32,
}

impl FontSpec {
    pub fn new(name: impl Into<String>, size: f32) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// RGB 颜色，分量范围 [0, 1]
pub type Color = [f32; 3];

pub const BLACK: Color = [0.0, 0.0, 0.0];

/// 新增文本框
#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    pub pos: PosData,
    pub editable: bool,
    pub font: FontSpec,
    pub color: Color,
    pub widget_name: Option<String>,
    pub value: String,
    pub page: usize,
}

/// 新增签名域
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureData {
    pub pos: PosData,
    pub widget_name: Option<String>,
    pub font: FontSpec,
    /// PKCS#12 证书路径
    pub file: Option<String>,
    pub password: Option<String>,
    pub visible: bool,
    pub page: usize,
    /// 可见签名的图章图片
    pub image: Option<String>,
    pub reason: Option<String>,
    pub location: Option<String>,
}

/// 新增图片
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub pos: PosData,
    pub file_name: String,
    pub page: usize,
}

/// 填充请求的类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillType {
    Invalid,
    FieldId,
    FieldName,
    AddTextField,
    AddSignature,
    AddImage,
}

/// 一条已解析的填充请求
///
/// 标签由变体决定，消费端必须穷尽匹配。
#[derive(Debug, Clone, PartialEq)]
pub enum FillRequest {
    ById { page: usize, id: i64, value: String },
    ByName { name: String, value: String },
    AddTextField(TextData),
    AddSignature(SignatureData),
    AddImage(ImageData),
    Invalid { reason: String },
}

impl FillRequest {
    pub fn invalid(reason: impl Into<String>) -> Self {
        FillRequest::Invalid {
            reason: reason.into(),
        }
    }

    pub fn fill_type(&self) -> FillType {
        match self {
            FillRequest::ById { .. } => FillType::FieldId,
            FillRequest::ByName { .. } => FillType::FieldName,
            FillRequest::AddTextField(_) => FillType::AddTextField,
            FillRequest::AddSignature(_) => FillType::AddSignature,
            FillRequest::AddImage(_) => FillType::AddImage,
            FillRequest::Invalid { .. } => FillType::Invalid,
        }
    }

    /// 新增控件类请求在所有字段填充之后执行
    pub fn is_addition(&self) -> bool {
        matches!(
            self,
            FillRequest::AddTextField(_) | FillRequest::AddSignature(_) | FillRequest::AddImage(_)
        )
    }

    /// 用于日志和跳过记录的简短描述
    pub fn describe(&self) -> String {
        match self {
            FillRequest::ById { page, id, .. } => format!("{}.{}", page, id),
            FillRequest::ByName { name, .. } => name.clone(),
            FillRequest::AddTextField(text) => format!("textfield@{}", text.page),
            FillRequest::AddSignature(sig) => format!("signature@{}", sig.page),
            FillRequest::AddImage(img) => format!("image:{}", img.file_name),
            FillRequest::Invalid { reason } => format!("invalid ({})", reason),
        }
    }
}

/// 可配置的默认尺寸与字体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillDefaults {
    pub sig_width: f32,
    pub sig_height: f32,
    pub text_width: f32,
    pub text_height: f32,
    pub font_name: String,
    pub font_size: f32,
    pub sig_visible: bool,
}

impl Default for FillDefaults {
    fn default() -> Self {
        Self {
            sig_width: 100.0,
            sig_height: 100.0,
            text_width: 140.0,
            text_height: 14.0,
            font_name: "Helv".to_string(),
            font_size: 9.0,
            sig_visible: true,
        }
    }
}

impl FillDefaults {
    pub fn font(&self) -> FontSpec {
        FontSpec::new(self.font_name.clone(), self.font_size)
    }
}
