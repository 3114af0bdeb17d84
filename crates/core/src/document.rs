//! 统一文档接口定义
//!
//! 遍历引擎、填充引擎和完成流程只通过 `FormDocument` 访问文档，
//! 具体的 PDF 对象模型由实现方（`pdffill-pdf`）负责。

use crate::sign::Signer;
use crate::types::{FontSpec, ImageData, PosData, SignatureData, TextData};
use crate::Result;
use serde::Serialize;
use std::path::Path;

/// 控件在文档中的稳定句柄（PDF 对象号 + 代号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WidgetHandle(pub u32, pub u16);

/// 控件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Text,
    Checkbox,
    Radio,
    PushButton,
    ComboBox,
    ListBox,
    Signature,
    Unknown,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Text => "text",
            WidgetKind::Checkbox => "checkbox",
            WidgetKind::Radio => "radio",
            WidgetKind::PushButton => "pushbutton",
            WidgetKind::ComboBox => "combobox",
            WidgetKind::ListBox => "listbox",
            WidgetKind::Signature => "signature",
            WidgetKind::Unknown => "unknown",
        }
    }
}

/// 页面上一个控件的快照
///
/// `index` 为控件在页面遍历顺序中的位置，从 0 开始。
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub handle: WidgetHandle,
    pub page: usize,
    pub index: usize,
    /// 完整字段名（父字段名以 `.` 连接）
    pub name: String,
    pub kind: WidgetKind,
    pub value: Option<String>,
    pub rect: PosData,
    pub font: Option<FontSpec>,
    pub read_only: bool,
    /// 选择框的选项，或复选框/单选框的开启状态名
    pub options: Vec<String>,
}

/// 标注模式下绘制在控件上的标签
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLabel {
    pub rect: PosData,
    pub text: String,
}

/// 保存时的签名参数
pub struct SignRequest<'a> {
    /// 承载签名值的签名域
    pub field: WidgetHandle,
    pub signer: &'a dyn Signer,
    pub reason: Option<String>,
    pub location: Option<String>,
    /// 为 CMS 签名预留的字节数
    pub reserve: usize,
}

/// 表单文档接口
///
/// 同一次打开期间，`widgets` 对同一页面的多次调用必须返回相同顺序。
pub trait FormDocument {
    fn page_count(&self) -> usize;

    /// 按遍历顺序列出页面上的控件
    fn widgets(&self, page: usize) -> Result<Vec<Widget>>;

    /// 按控件类型写入值
    ///
    /// 返回 `Ok(false)` 表示文档拒绝了该值（例如按钮或未知的复选状态）。
    fn set_widget_value(&mut self, widget: &Widget, value: &str) -> Result<bool>;

    fn set_read_only(&mut self, widget: WidgetHandle, read_only: bool) -> Result<()>;

    fn add_text_field(&mut self, text: &TextData) -> Result<WidgetHandle>;

    fn add_signature_field(&mut self, sig: &SignatureData) -> Result<WidgetHandle>;

    fn add_image(&mut self, image: &ImageData) -> Result<()>;

    /// 在页面内容上绘制标签框
    fn draw_labels(&mut self, page: usize, labels: &[OverlayLabel]) -> Result<()>;

    /// 保存到 `path`；给出 `signing` 时先签名再写出
    fn save(&mut self, path: &Path, signing: Option<SignRequest<'_>>) -> Result<()>;
}
