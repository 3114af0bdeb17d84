//! 页面坐标换算
//!
//! 外部坐标以页面左上角为原点，y 向下；PDF 用户空间以左下角为原点。

use lopdf::{Document, Object, ObjectId};
use pdffill_core::PosData;

/// 继承链的最大深度
const MAX_DEPTH: usize = 32;

/// 从 Object 获取数值
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// 从数组对象中提取矩形 `[x1 y1 x2 y2]`
pub fn rect_values(arr: &[Object]) -> Option<[f32; 4]> {
    let values: Vec<f32> = arr.iter().filter_map(number).collect();
    if values.len() == 4 {
        Some([values[0], values[1], values[2], values[3]])
    } else {
        None
    }
}

pub fn rect_object(rect: [f32; 4]) -> Object {
    Object::Array(rect.iter().map(|v| Object::Real(*v)).collect())
}

/// 读取字典中的矩形，支持间接引用
pub fn dict_rect(doc: &Document, dict: &lopdf::Dictionary, key: &[u8]) -> Option<[f32; 4]> {
    match dict.get(key).ok()? {
        Object::Array(arr) => rect_values(arr),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Array(arr) => rect_values(arr),
            _ => None,
        },
        _ => None,
    }
}

/// 页面的有效边界
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    pub const LETTER: PageBox = PageBox {
        llx: 0.0,
        lly: 0.0,
        urx: 612.0,
        ury: 792.0,
    };

    pub fn from_rect(rect: [f32; 4]) -> Self {
        PageBox {
            llx: rect[0].min(rect[2]),
            lly: rect[1].min(rect[3]),
            urx: rect[0].max(rect[2]),
            ury: rect[1].max(rect[3]),
        }
    }

    /// 页面坐标 -> PDF 矩形 `[x1 y1 x2 y2]`
    pub fn to_pdf(&self, pos: &PosData) -> [f32; 4] {
        [
            self.llx + pos.left,
            self.ury - pos.bottom,
            self.llx + pos.right,
            self.ury - pos.top,
        ]
    }

    /// PDF 矩形 -> 页面坐标，端点顺序任意
    pub fn from_pdf(&self, rect: [f32; 4]) -> PosData {
        let (x_min, x_max) = (rect[0].min(rect[2]), rect[0].max(rect[2]));
        let (y_min, y_max) = (rect[1].min(rect[3]), rect[1].max(rect[3]));
        PosData::new(
            x_min - self.llx,
            self.ury - y_max,
            x_max - self.llx,
            self.ury - y_min,
        )
    }
}

/// 沿 Parent 链查找可继承的页面属性
fn inherited_rect(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<[f32; 4]> {
    let mut current = page_id;
    for _ in 0..MAX_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Some(rect) = dict_rect(doc, dict, key) {
            return Some(rect);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// 获取页面的有效边界框（优先使用 CropBox，否则使用 MediaBox）
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    if let Some(rect) = inherited_rect(doc, page_id, b"CropBox") {
        return PageBox::from_rect(rect);
    }
    if let Some(rect) = inherited_rect(doc, page_id, b"MediaBox") {
        return PageBox::from_rect(rect);
    }
    log::debug!("page {:?} has no box, using Letter", page_id);
    PageBox::LETTER
}
