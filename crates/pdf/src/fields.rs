//! 表单字段模块
//!
//! AcroForm 字段树与页面 Widget 注释的读取和修改

use crate::text::object_text;
use crate::PdfError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdffill_core::WidgetKind;
use std::collections::HashSet;

pub const FF_READ_ONLY: i64 = 1;
pub const FF_MULTILINE: i64 = 1 << 12;
pub const FF_RADIO: i64 = 1 << 15;
pub const FF_PUSH_BUTTON: i64 = 1 << 16;
pub const FF_COMBO: i64 = 1 << 17;
pub const FF_EDIT: i64 = 1 << 18;

/// Parent 链的最大深度
const MAX_DEPTH: usize = 32;

/// 解开一层间接引用
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
  match obj {
    Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
    _ => obj,
  }
}

fn reference_ids(doc: &Document, obj: &Object) -> Vec<ObjectId> {
  match resolve(doc, obj) {
    Object::Array(arr) => arr
      .iter()
      .filter_map(|o| match o {
        Object::Reference(id) => Some(*id),
        _ => None,
      })
      .collect(),
    _ => Vec::new(),
  }
}

/// 获取文档 Catalog 的 ObjectId
pub fn catalog_id(doc: &Document) -> Result<ObjectId, PdfError> {
  match doc.trailer.get(b"Root") {
    Ok(Object::Reference(id)) => Ok(*id),
    _ => Err(PdfError::Form("无法获取文档 Catalog".to_string())),
  }
}

pub fn acroform_id(doc: &Document) -> Option<ObjectId> {
  let catalog = doc.get_dictionary(catalog_id(doc).ok()?).ok()?;
  match catalog.get(b"AcroForm") {
    Ok(Object::Reference(id)) => Some(*id),
    _ => None,
  }
}

/// 获取 AcroForm，内联字典会被移为独立对象，缺失时创建
pub fn ensure_acroform(doc: &mut Document) -> Result<ObjectId, PdfError> {
  if let Some(id) = acroform_id(doc) {
    return Ok(id);
  }
  let catalog_id = catalog_id(doc)?;
  let inline = match doc.get_dictionary(catalog_id)?.get(b"AcroForm") {
    Ok(Object::Dictionary(dict)) => dict.clone(),
    _ => {
      let mut dict = Dictionary::new();
      dict.set("Fields", Object::Array(Vec::new()));
      dict.set("DA", Object::string_literal("/Helv 0 Tf 0 g"));
      dict
    }
  };
  let id = doc.add_object(Object::Dictionary(inline));
  doc.get_dictionary_mut(catalog_id)?.set("AcroForm", Object::Reference(id));
  log::debug!("AcroForm object {:?}", id);
  Ok(id)
}

/// 页面上的 Widget 注释，保持 /Annots 中的顺序
pub fn page_widget_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
  let Ok(page) = doc.get_dictionary(page_id) else {
    return Vec::new();
  };
  let Ok(annots) = page.get(b"Annots") else {
    return Vec::new();
  };
  reference_ids(doc, annots)
    .into_iter()
    .filter(|id| {
      matches!(
        doc.get_dictionary(*id).map(|d| d.get(b"Subtype")),
        Ok(Ok(Object::Name(n))) if n == b"Widget"
      )
    })
    .collect()
}

/// 把注释追加到页面 /Annots
pub fn push_annot(doc: &mut Document, page_id: ObjectId, annot_id: ObjectId) -> Result<(), PdfError> {
  let annots = doc.get_dictionary(page_id)?.get(b"Annots").ok().cloned();
  match annots {
    Some(Object::Reference(arr_id)) => match doc.get_object_mut(arr_id)? {
      Object::Array(arr) => arr.push(Object::Reference(annot_id)),
      _ => return Err(PdfError::Form(format!("page {:?} has malformed /Annots", page_id))),
    },
    Some(Object::Array(mut arr)) => {
      arr.push(Object::Reference(annot_id));
      doc.get_dictionary_mut(page_id)?.set("Annots", Object::Array(arr));
    }
    _ => {
      doc
        .get_dictionary_mut(page_id)?
        .set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
    }
  }
  Ok(())
}

/// 把顶层字段追加到 AcroForm /Fields
pub fn push_field(doc: &mut Document, field_id: ObjectId) -> Result<(), PdfError> {
  let acroform_id = ensure_acroform(doc)?;
  let fields = doc.get_dictionary(acroform_id)?.get(b"Fields").ok().cloned();
  match fields {
    Some(Object::Reference(arr_id)) => {
      if let Object::Array(arr) = doc.get_object_mut(arr_id)? {
        arr.push(Object::Reference(field_id));
        return Ok(());
      }
      Err(PdfError::Form("AcroForm /Fields is not an array".to_string()))
    }
    Some(Object::Array(mut arr)) => {
      arr.push(Object::Reference(field_id));
      doc.get_dictionary_mut(acroform_id)?.set("Fields", Object::Array(arr));
      Ok(())
    }
    _ => {
      doc
        .get_dictionary_mut(acroform_id)?
        .set("Fields", Object::Array(vec![Object::Reference(field_id)]));
      Ok(())
    }
  }
}

/// 控件及其祖先字段，从控件自身开始
fn chain(doc: &Document, id: ObjectId) -> Vec<(ObjectId, &Dictionary)> {
  let mut out = Vec::new();
  let mut current = Some(id);
  while let Some(id) = current {
    if out.len() >= MAX_DEPTH {
      break;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
      break;
    };
    out.push((id, dict));
    current = match dict.get(b"Parent") {
      Ok(Object::Reference(parent)) => Some(*parent),
      _ => None,
    };
  }
  out
}

/// 字段的直接子对象
pub fn kids(doc: &Document, id: ObjectId) -> Vec<ObjectId> {
  match doc.get_dictionary(id).map(|d| d.get(b"Kids")) {
    Ok(Ok(kids)) => reference_ids(doc, kids),
    _ => Vec::new(),
  }
}

/// 沿 Parent 链查找可继承的字段属性
pub fn inherited<'a>(doc: &'a Document, id: ObjectId, key: &[u8]) -> Option<&'a Object> {
  chain(doc, id)
    .into_iter()
    .find_map(|(_, dict)| dict.get(key).ok())
    .map(|obj| resolve(doc, obj))
}

/// 完整字段名，各级 /T 以 `.` 连接
pub fn full_name(doc: &Document, id: ObjectId) -> String {
  let mut parts: Vec<String> = chain(doc, id)
    .into_iter()
    .filter_map(|(_, dict)| dict.get(b"T").ok().and_then(object_text))
    .collect();
  parts.reverse();
  parts.join(".")
}

/// 持有 /T 与 /V 的字段对象；合并式控件即自身
pub fn field_owner(doc: &Document, id: ObjectId) -> ObjectId {
  chain(doc, id)
    .into_iter()
    .find(|(_, dict)| dict.has(b"T"))
    .map(|(owner, _)| owner)
    .unwrap_or(id)
}

pub fn field_flags(doc: &Document, id: ObjectId) -> i64 {
  match inherited(doc, id, b"Ff") {
    Some(Object::Integer(ff)) => *ff,
    _ => 0,
  }
}

pub fn widget_kind(doc: &Document, id: ObjectId) -> WidgetKind {
  let flags = field_flags(doc, id);
  match inherited(doc, id, b"FT") {
    Some(Object::Name(ft)) => match ft.as_slice() {
      b"Tx" => WidgetKind::Text,
      b"Btn" if flags & FF_PUSH_BUTTON != 0 => WidgetKind::PushButton,
      b"Btn" if flags & FF_RADIO != 0 => WidgetKind::Radio,
      b"Btn" => WidgetKind::Checkbox,
      b"Ch" if flags & FF_COMBO != 0 => WidgetKind::ComboBox,
      b"Ch" => WidgetKind::ListBox,
      b"Sig" => WidgetKind::Signature,
      _ => WidgetKind::Unknown,
    },
    _ => WidgetKind::Unknown,
  }
}

/// 复选框/单选框的开启状态名（/AP /N 中除 Off 以外的键）
pub fn on_states(doc: &Document, widget_id: ObjectId) -> Vec<String> {
  let Ok(widget) = doc.get_dictionary(widget_id) else {
    return Vec::new();
  };
  let Some(Object::Dictionary(ap)) = widget.get(b"AP").ok().map(|o| resolve(doc, o)) else {
    return Vec::new();
  };
  match ap.get(b"N").ok().map(|o| resolve(doc, o)) {
    Some(Object::Dictionary(normal)) => normal
      .iter()
      .filter(|(name, _)| name.as_slice() != b"Off")
      .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
      .collect(),
    _ => Vec::new(),
  }
}

/// 选择框选项；`[导出值 显示值]` 形式取导出值
pub fn choice_options(doc: &Document, id: ObjectId) -> Vec<String> {
  match inherited(doc, id, b"Opt") {
    Some(Object::Array(opts)) => opts
      .iter()
      .filter_map(|opt| match resolve(doc, opt) {
        Object::Array(pair) => pair.first().and_then(object_text),
        other => object_text(other),
      })
      .collect(),
    _ => Vec::new(),
  }
}

/// 当前值；多选列表以 `, ` 连接
pub fn field_value(doc: &Document, id: ObjectId) -> Option<String> {
  match inherited(doc, id, b"V")? {
    Object::Array(items) => {
      let values: Vec<String> = items.iter().filter_map(object_text).collect();
      Some(values.join(", "))
    }
    Object::Dictionary(_) => None,
    other => object_text(other),
  }
}

/// 字段的默认外观，退回到 AcroForm 的 /DA
pub fn default_appearance(doc: &Document, id: ObjectId) -> Option<String> {
  if let Some(da) = inherited(doc, id, b"DA").and_then(object_text) {
    return Some(da);
  }
  let acroform = doc.get_dictionary(acroform_id(doc)?).ok()?;
  acroform.get(b"DA").ok().and_then(object_text)
}

/// 设置或清除字段标志位
pub fn set_flag(doc: &mut Document, id: ObjectId, bit: i64, on: bool) -> Result<(), PdfError> {
  let owner = field_owner(doc, id);
  let current = field_flags(doc, owner);
  let flags = if on { current | bit } else { current & !bit };
  doc.get_dictionary_mut(owner)?.set("Ff", Object::Integer(flags));
  Ok(())
}

/// 递归收集 AcroForm 中的字段名
pub fn field_names(doc: &Document) -> HashSet<String> {
  let mut names = HashSet::new();
  let Some(acroform) = acroform_id(doc).and_then(|id| doc.get_dictionary(id).ok()) else {
    return names;
  };
  let Ok(fields) = acroform.get(b"Fields") else {
    return names;
  };
  let mut stack = reference_ids(doc, fields);
  let mut seen = HashSet::new();
  while let Some(id) = stack.pop() {
    if !seen.insert(id) {
      continue;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
      continue;
    };
    if dict.has(b"T") {
      names.insert(full_name(doc, id));
    }
    stack.extend(kids(doc, id));
  }
  names
}
