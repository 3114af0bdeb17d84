//! 外观流生成
//!
//! 文本框与签名域的 /AP /N 表单 XObject，以及标注模式的标签框。

use crate::fields::ensure_acroform;
use crate::text::{single_byte, unencodable};
use crate::PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pdffill_core::{Color, FontSpec};

/// 标签字号
const LABEL_FONT_SIZE: f32 = 6.0;

/// 标签使用的页面字体资源名
pub const LABEL_FONT: &str = "PfLbl";

/// 解析默认外观字符串中的字体与颜色
pub fn parse_da(da: &str) -> (Option<FontSpec>, Color) {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let mut font = None;
    let mut color = [0.0; 3];
    let num = |i: usize| tokens.get(i).and_then(|t| t.parse::<f32>().ok());
    for (i, token) in tokens.iter().enumerate() {
        match *token {
            "Tf" if i >= 2 => {
                if let (Some(name), Some(size)) = (tokens[i - 2].strip_prefix('/'), num(i - 1)) {
                    font = Some(FontSpec::new(name, size));
                }
            }
            "rg" if i >= 3 => {
                if let (Some(r), Some(g), Some(b)) = (num(i - 3), num(i - 2), num(i - 1)) {
                    color = [r, g, b];
                }
            }
            "g" if i >= 1 => {
                if let Some(gray) = num(i - 1) {
                    color = [gray; 3];
                }
            }
            _ => {}
        }
    }
    (font, color)
}

/// 表单资源别名对应的标准 14 字体
pub fn standard_font(alias: &str) -> &str {
    match alias {
        "Helv" => "Helvetica",
        "HeBo" => "Helvetica-Bold",
        "TiRo" => "Times-Roman",
        "TiBo" => "Times-Bold",
        "Cour" => "Courier",
        "ZaDb" => "ZapfDingbats",
        "Symb" => "Symbol",
        other => other,
    }
}

fn standard_font_dict(alias: &str) -> Dictionary {
    let base = standard_font(alias);
    let mut dict = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
    };
    if base != "ZapfDingbats" && base != "Symbol" {
        dict.set("Encoding", "WinAnsiEncoding");
    }
    dict
}

/// 取出字典条目；引用则连同对象 ID 一起返回
fn owned_dict(doc: &Document, obj: Option<&Object>) -> (Option<ObjectId>, Dictionary) {
    match obj {
        Some(Object::Reference(id)) => match doc.get_dictionary(*id) {
            Ok(dict) => (Some(*id), dict.clone()),
            Err(_) => (None, Dictionary::new()),
        },
        Some(Object::Dictionary(dict)) => (None, dict.clone()),
        _ => (None, Dictionary::new()),
    }
}

/// 确保 AcroForm /DR 中有该字体，返回字体对象
pub fn ensure_font(doc: &mut Document, alias: &str) -> Result<ObjectId, PdfError> {
    let acroform_id = ensure_acroform(doc)?;
    let (dr_id, mut dr) = owned_dict(doc, doc.get_dictionary(acroform_id)?.get(b"DR").ok());
    let (fonts_id, mut fonts) = owned_dict(doc, dr.get(b"Font").ok());

    let font_id = match fonts.get(alias.as_bytes()) {
        Ok(Object::Reference(id)) => return Ok(*id),
        Ok(Object::Dictionary(inline)) => doc.add_object(inline.clone()),
        _ => {
            log::debug!("adding font {} ({}) to form resources", alias, standard_font(alias));
            doc.add_object(standard_font_dict(alias))
        }
    };
    fonts.set(alias, Object::Reference(font_id));

    match fonts_id {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(fonts));
        }
        None => dr.set("Font", fonts),
    }
    match dr_id {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(dr));
        }
        None => doc.get_dictionary_mut(acroform_id)?.set("DR", dr),
    }
    Ok(font_id)
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

fn form_xobject(width: f32, height: f32, resources: Dictionary, ops: Vec<Operation>) -> Result<Stream, PdfError> {
    let content = Content { operations: ops }.encode()?;
    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![real(0.0), real(0.0), real(width), real(height)],
            "Resources" => resources,
        },
        content,
    ))
}

/// 自动字号（0）按控件高度估算
fn effective_size(font: &FontSpec, height: f32) -> f32 {
    if font.size > 0.0 {
        font.size
    } else {
        (height * 0.7).clamp(4.0, 12.0)
    }
}

/// 文本框外观
pub fn text_stream(
    width: f32,
    height: f32,
    font: &FontSpec,
    font_id: ObjectId,
    color: &Color,
    value: &str,
    multiline: bool,
) -> Result<Stream, PdfError> {
    let size = effective_size(font, height);
    let lost = unencodable(value);
    if lost > 0 {
        log::warn!(
            "{} character(s) of {:?} cannot be drawn with /{} and will show as `?`",
            lost,
            value,
            font.name
        );
    }
    let mut ops = vec![
        Operation::new("BMC", vec![Object::Name(b"Tx".to_vec())]),
        Operation::new("q", vec![]),
        Operation::new("re", vec![real(1.0), real(1.0), real((width - 2.0).max(0.0)), real((height - 2.0).max(0.0))]),
        Operation::new("W", vec![]),
        Operation::new("n", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(font.name.as_bytes().to_vec()), real(size)]),
        Operation::new("rg", color.iter().map(|c| real(*c)).collect()),
    ];
    if multiline {
        let leading = size * 1.15;
        ops.push(Operation::new("TL", vec![real(leading)]));
        ops.push(Operation::new("Td", vec![real(2.0), real(height - 2.0 - size)]));
        for line in value.lines() {
            ops.push(Operation::new("Tj", vec![Object::String(single_byte(line), StringFormat::Literal)]));
            ops.push(Operation::new("T*", vec![]));
        }
    } else {
        let baseline = ((height - size) / 2.0 + size * 0.22).max(1.0);
        ops.push(Operation::new("Td", vec![real(2.0), real(baseline)]));
        ops.push(Operation::new("Tj", vec![Object::String(single_byte(value), StringFormat::Literal)]));
    }
    ops.push(Operation::new("ET", vec![]));
    ops.push(Operation::new("Q", vec![]));
    ops.push(Operation::new("EMC", vec![]));

    let resources = dictionary! {
        "Font" => dictionary! { font.name.as_str() => font_id },
    };
    form_xobject(width, height, resources, ops)
}

/// 签名域外观：边框、可选图章与签名人文字
pub fn signature_stream(
    width: f32,
    height: f32,
    label: &str,
    font: &FontSpec,
    font_id: ObjectId,
    stamp: Option<ObjectId>,
) -> Result<Stream, PdfError> {
    let size = effective_size(font, height);
    let mut ops = vec![Operation::new("q", vec![])];
    let mut resources = dictionary! {
        "Font" => dictionary! { font.name.as_str() => font_id },
    };
    if let Some(stamp) = stamp {
        resources.set("XObject", dictionary! { "Stamp" => stamp });
        ops.extend([
            Operation::new("q", vec![]),
            Operation::new("cm", vec![real(width), real(0.0), real(0.0), real(height), real(0.0), real(0.0)]),
            Operation::new("Do", vec![Object::Name(b"Stamp".to_vec())]),
            Operation::new("Q", vec![]),
        ]);
    }
    ops.extend([
        Operation::new("G", vec![real(0.0)]),
        Operation::new("w", vec![real(0.5)]),
        Operation::new("re", vec![real(0.25), real(0.25), real((width - 0.5).max(0.0)), real((height - 0.5).max(0.0))]),
        Operation::new("S", vec![]),
    ]);
    if !label.is_empty() {
        ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.name.as_bytes().to_vec()), real(size)]),
            Operation::new("g", vec![real(0.0)]),
            Operation::new("Td", vec![real(2.0), real(2.0)]),
            Operation::new("Tj", vec![Object::String(single_byte(label), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }
    ops.push(Operation::new("Q", vec![]));
    form_xobject(width, height, resources, ops)
}

/// 空外观，用于不可见签名域
pub fn empty_stream() -> Result<Stream, PdfError> {
    form_xobject(0.0, 0.0, Dictionary::new(), Vec::new())
}

/// 标注模式的红色标签框；矩形为 PDF 坐标 `[x1 y1 x2 y2]`
pub fn label_operations(labels: &[([f32; 4], String)]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("RG", vec![real(1.0), real(0.0), real(0.0)]),
        Operation::new("rg", vec![real(1.0), real(0.0), real(0.0)]),
        Operation::new("w", vec![real(0.5)]),
    ];
    for (rect, text) in labels {
        let [x1, y1, x2, y2] = *rect;
        ops.push(Operation::new("re", vec![real(x1), real(y1), real(x2 - x1), real(y2 - y1)]));
        ops.push(Operation::new("S", vec![]));
        ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(LABEL_FONT.as_bytes().to_vec()), real(LABEL_FONT_SIZE)]),
            Operation::new("Td", vec![real(x1 + 1.0), real(y2 - LABEL_FONT_SIZE - 1.0)]),
            Operation::new("Tj", vec![Object::String(single_byte(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }
    ops.push(Operation::new("Q", vec![]));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::acroform_id;
    use crate::testing::sample_form;

    #[test]
    fn test_parse_da() {
        let (font, color) = parse_da("/Helv 12 Tf 0 0 1 rg");
        assert_eq!(font, Some(FontSpec::new("Helv", 12.0)));
        assert_eq!(color, [0.0, 0.0, 1.0]);
        let (font, color) = parse_da("0.5 g /Cour 0 Tf");
        assert_eq!(font, Some(FontSpec::new("Cour", 0.0)));
        assert_eq!(color, [0.5; 3]);
        assert_eq!(parse_da("garbage"), (None, [0.0; 3]));
    }

    #[test]
    fn test_ensure_font_reuses_and_adds() {
        let (mut doc, _) = sample_form();
        let helv = ensure_font(&mut doc, "Helv").unwrap();
        assert_eq!(ensure_font(&mut doc, "Helv").unwrap(), helv);

        let cour = ensure_font(&mut doc, "Cour").unwrap();
        assert_ne!(cour, helv);
        let font = doc.get_dictionary(cour).unwrap();
        assert!(matches!(font.get(b"BaseFont"), Ok(Object::Name(n)) if n == b"Courier"));
        let acroform = doc.get_dictionary(acroform_id(&doc).unwrap()).unwrap();
        let Ok(Object::Dictionary(dr)) = acroform.get(b"DR") else {
            panic!("missing DR");
        };
        let Ok(Object::Dictionary(fonts)) = dr.get(b"Font") else {
            panic!("missing DR fonts");
        };
        assert!(fonts.has(b"Cour"));
    }

    #[test]
    fn test_text_stream_content() {
        let stream = text_stream(
            200.0,
            20.0,
            &FontSpec::new("Helv", 9.0),
            (5, 0),
            &[0.0, 0.0, 1.0],
            "Ada",
            false,
        )
        .unwrap();
        let content = Content::decode(&stream.content).unwrap();
        let ops: Vec<&str> = content.operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(ops.first(), Some(&"BMC"));
        assert!(ops.contains(&"Tj"));
        assert_eq!(ops.last(), Some(&"EMC"));
        assert!(String::from_utf8_lossy(&stream.content).contains("(Ada)"));
    }

    #[test]
    fn test_label_operations_per_label() {
        let ops = label_operations(&[
            ([10.0, 10.0, 50.0, 30.0], "0.0".to_string()),
            ([10.0, 40.0, 50.0, 60.0], "0.1 name".to_string()),
        ]);
        let rects = ops.iter().filter(|op| op.operator == "re").count();
        let texts = ops.iter().filter(|op| op.operator == "Tj").count();
        assert_eq!((rects, texts), (2, 2));
    }
}
