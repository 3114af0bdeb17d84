//! 输入映射
//!
//! 把 JSON 片段转换为数值、字符串、颜色、字体和矩形。
//! 缺失或类型不符的属性一律回退到默认值，不视为错误。

use crate::types::{
    Color, FillDefaults, FillRequest, FontSpec, ImageData, PosData, SignatureData, TextData, BLACK,
};
use serde_json::{Map, Value};

/// 读取数值属性
///
/// 属性存在、为数字且不小于 `min` 时返回该值，否则返回 `default`。
pub fn get_number(object: &Value, property: &str, default: f32, min: f32) -> f32 {
    match object.get(property).and_then(Value::as_f64) {
        Some(n) if n as f32 >= min => n as f32,
        _ => default,
    }
}

/// 读取放置矩形
///
/// 缺失的边由 `default_xy` 和宽高默认值推导，例如缺 `right` 时取 `left + width`。
/// `width` / `height` 属性可覆盖默认宽高。给出的边不做几何校验，退化矩形原样返回。
pub fn get_position(
    object: &Value,
    default_xy: f32,
    default_width: f32,
    default_height: f32,
) -> PosData {
    let left = get_number(object, "left", default_xy, 0.0);
    let top = get_number(object, "top", default_xy, 0.0);
    let width = get_number(object, "width", default_width, 0.0);
    let height = get_number(object, "height", default_height, 0.0);
    let right = get_number(object, "right", left + width, 0.0);
    let bottom = get_number(object, "bottom", top + height, 0.0);
    PosData {
        left,
        top,
        right,
        bottom,
    }
}

pub fn get_string<'a>(object: &'a Value, property: &str) -> Option<&'a str> {
    object.get(property).and_then(Value::as_str)
}

/// 布尔属性，也接受数字（非零为真）
pub fn get_bool(object: &Value, property: &str, default: bool) -> bool {
    match object.get(property) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(default),
        _ => default,
    }
}

pub fn get_page(object: &Value) -> usize {
    get_number(object, "page", 0.0, 0.0) as usize
}

/// 颜色：`[r, g, b]` 浮点数组或 `"#rrggbb"`
pub fn get_color(object: &Value, property: &str) -> Option<Color> {
    match object.get(property)? {
        Value::Array(items) if items.len() == 3 => {
            let mut color = BLACK;
            for (slot, item) in color.iter_mut().zip(items) {
                *slot = (item.as_f64()? as f32).clamp(0.0, 1.0);
            }
            Some(color)
        }
        Value::String(hex) => parse_hex_color(hex),
        _ => None,
    }
}

fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let mut color = BLACK;
    for (i, slot) in color.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
        *slot = byte as f32 / 255.0;
    }
    Some(color)
}

/// 字体：`"Helv"`、`"Helv 12"` 或 `"font": "Helv", "font_size": 12`
pub fn get_font(object: &Value, defaults: &FillDefaults) -> FontSpec {
    let mut font = defaults.font();
    if let Some(spec) = get_string(object, "font") {
        let mut parts = spec.split_whitespace();
        if let Some(name) = parts.next() {
            let name = name.trim_start_matches('/');
            if !name.is_empty() {
                font.name = name.to_string();
            }
        }
        if let Some(size) = parts.next().and_then(|s| s.parse::<f32>().ok()) {
            if size >= 1.0 {
                font.size = size;
            }
        }
    }
    font.size = get_number(object, "font_size", font.size, 1.0);
    font
}

/// 标量转为字段值；数组与对象不是合法的字段值
pub fn scalar_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `"<page>.<id>"` 形式的键
fn parse_page_id(key: &str) -> Option<(usize, i64)> {
    let (page, id) = key.split_once('.')?;
    if !is_all_digits(page) || !is_all_digits(id) {
        return None;
    }
    Some((page.parse().ok()?, id.parse().ok()?))
}

/// 解析一条填充输入
///
/// 判定顺序：显式 `id` > 显式 `name` > `add` 指令 > 模板形状。
/// 模板中同名键为对象时，先合并模板属性再解析。
pub fn resolve_fill_data(
    key: &str,
    value: &Value,
    template: Option<&Value>,
    defaults: &FillDefaults,
) -> FillRequest {
    if let Some(Value::Object(tpl)) = template.and_then(|t| t.get(key)) {
        if !key.is_empty() {
            let mut merged = tpl.clone();
            match value {
                Value::Object(props) => {
                    for (k, v) in props {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                scalar => {
                    merged.insert("value".to_string(), scalar.clone());
                }
            }
            return resolve_object(key, &merged, defaults);
        }
    }

    match value {
        Value::Object(obj) => resolve_object(key, obj, defaults),
        Value::Array(_) => FillRequest::invalid(format!("`{}`: array is not a field value", key)),
        scalar => resolve_key(key, scalar_value(scalar).unwrap_or_default(), 0),
    }
}

fn resolve_key(key: &str, value: String, page: usize) -> FillRequest {
    if let Some((page, id)) = parse_page_id(key) {
        return FillRequest::ById { page, id, value };
    }
    if is_all_digits(key) {
        return match key.parse::<i64>() {
            Ok(id) => FillRequest::ById { page, id, value },
            Err(_) => FillRequest::invalid(format!("field id `{}` too large", key)),
        };
    }
    if key.is_empty() {
        return FillRequest::invalid("entry has neither id, name nor add instruction");
    }
    FillRequest::ByName {
        name: key.to_string(),
        value,
    }
}

fn resolve_object(key: &str, obj: &Map<String, Value>, defaults: &FillDefaults) -> FillRequest {
    let object = Value::Object(obj.clone());
    let value = obj.get("value").and_then(scalar_value);

    if let Some(id) = obj.get("id") {
        let Some(id) = id.as_i64() else {
            return FillRequest::invalid("field id must be an integer");
        };
        let Some(value) = value else {
            return FillRequest::invalid(format!("field id {} has no value", id));
        };
        return FillRequest::ById {
            page: get_page(&object),
            id,
            value,
        };
    }

    if let Some(name) = obj.get("name") {
        let Some(name) = name.as_str() else {
            return FillRequest::invalid("field name must be a string");
        };
        let Some(value) = value else {
            return FillRequest::invalid(format!("field `{}` has no value", name));
        };
        return FillRequest::ByName {
            name: name.to_string(),
            value,
        };
    }

    if let Some(add) = obj.get("add") {
        return match add.as_str() {
            Some("textfield") | Some("text") => {
                FillRequest::AddTextField(map_textfield(&object, defaults))
            }
            Some("signature") => FillRequest::AddSignature(map_signature(&object, defaults)),
            Some("image") => map_image(&object, defaults),
            Some(other) => FillRequest::invalid(format!("unknown add instruction `{}`", other)),
            None => FillRequest::invalid("add instruction must be a string"),
        };
    }

    match value {
        Some(value) if !key.is_empty() => resolve_key(key, value, get_page(&object)),
        _ => FillRequest::invalid(format!("unrecognized fill entry `{}`", key)),
    }
}

pub fn map_textfield(object: &Value, defaults: &FillDefaults) -> TextData {
    TextData {
        pos: get_position(object, 0.0, defaults.text_width, defaults.text_height),
        editable: get_bool(object, "editable", false),
        font: get_font(object, defaults),
        color: get_color(object, "color").unwrap_or(BLACK),
        widget_name: get_string(object, "widget_name").map(str::to_string),
        value: object
            .get("value")
            .and_then(scalar_value)
            .unwrap_or_default(),
        page: get_page(object),
    }
}

pub fn map_signature(object: &Value, defaults: &FillDefaults) -> SignatureData {
    SignatureData {
        pos: get_position(object, 0.0, defaults.sig_width, defaults.sig_height),
        widget_name: get_string(object, "widget_name").map(str::to_string),
        font: get_font(object, defaults),
        file: get_string(object, "file").map(str::to_string),
        password: get_string(object, "password").map(str::to_string),
        visible: get_bool(object, "visible", defaults.sig_visible),
        page: get_page(object),
        image: get_string(object, "image").map(str::to_string),
        reason: get_string(object, "reason").map(str::to_string),
        location: get_string(object, "location").map(str::to_string),
    }
}

/// 图片缺省尺寸与签名域相同
fn map_image(object: &Value, defaults: &FillDefaults) -> FillRequest {
    let Some(file) = get_string(object, "file").filter(|f| !f.is_empty()) else {
        return FillRequest::invalid("image entry needs a `file`");
    };
    FillRequest::AddImage(ImageData {
        pos: get_position(object, 0.0, defaults.sig_width, defaults.sig_height),
        file_name: file.to_string(),
        page: get_page(object),
    })
}
