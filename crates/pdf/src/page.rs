//! 页面资源与内容流的追加

use crate::PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

const MAX_DEPTH: usize = 32;

/// 页面自身或继承而来的 /Resources 副本
fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
  let mut current = page_id;
  for _ in 0..MAX_DEPTH {
    let Ok(dict) = doc.get_dictionary(current) else {
      break;
    };
    match dict.get(b"Resources") {
      Ok(Object::Dictionary(res)) => return res.clone(),
      Ok(Object::Reference(id)) => {
        if let Ok(res) = doc.get_dictionary(*id) {
          return res.clone();
        }
      }
      _ => {}
    }
    match dict.get(b"Parent") {
      Ok(Object::Reference(parent)) => current = *parent,
      _ => break,
    }
  }
  Dictionary::new()
}

/// 在页面资源的某一类（Font、XObject）下登记对象
///
/// 页面最终持有一份内联的 /Resources。
pub fn add_resource(
  doc: &mut Document,
  page_id: ObjectId,
  category: &str,
  name: &str,
  target: ObjectId,
) -> Result<(), PdfError> {
  let mut resources = page_resources(doc, page_id);
  let mut entries = match resources.get(category.as_bytes()) {
    Ok(Object::Dictionary(dict)) => dict.clone(),
    Ok(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
    _ => Dictionary::new(),
  };
  entries.set(name, Object::Reference(target));
  resources.set(category, entries);
  doc.get_dictionary_mut(page_id)?.set("Resources", resources);
  Ok(())
}

/// 在页面内容末尾追加绘制操作
///
/// 原内容包在 `q ... Q` 中，新增内容从初始图形状态开始。
pub fn append_content(doc: &mut Document, page_id: ObjectId, ops: Vec<Operation>) -> Result<(), PdfError> {
  let mut body = b"Q\n".to_vec();
  body.extend(Content { operations: ops }.encode()?);
  let mut stream = Stream::new(Dictionary::new(), body);
  stream.compress().ok();
  let added = Object::Reference(doc.add_object(stream));
  let save = Object::Reference(doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())));

  let existing = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();
  let mut contents = vec![save];
  match existing {
    Some(Object::Reference(id)) => match doc.get_object(id) {
      Ok(Object::Array(arr)) => contents.extend(arr.iter().cloned()),
      _ => contents.push(Object::Reference(id)),
    },
    Some(Object::Array(arr)) => contents.extend(arr),
    _ => {}
  }
  contents.push(added);
  doc.get_dictionary_mut(page_id)?.set("Contents", contents);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::sample_form;
  use lopdf::dictionary;

  #[test]
  fn test_append_content_wraps_existing() {
    let (mut doc, pages) = sample_form();
    let original = doc.add_object(Stream::new(Dictionary::new(), b"1 0 0 1 50 50 cm".to_vec()));
    doc.get_dictionary_mut(pages[0]).unwrap().set("Contents", original);

    append_content(&mut doc, pages[0], vec![Operation::new("S", vec![])]).unwrap();
    let content = doc.get_page_content(pages[0]).unwrap();
    let text = String::from_utf8_lossy(&content);
    let q = text.find('q').unwrap();
    let cm = text.find("cm").unwrap();
    let restore = text.find('Q').unwrap();
    assert!(q < cm && cm < restore);
  }

  #[test]
  fn test_add_resource_keeps_inherited_entries() {
    let (mut doc, pages) = sample_form();
    let font = doc.add_object(dictionary! { "Type" => "Font" });
    let pages_id = match doc.get_dictionary(pages[0]).unwrap().get(b"Parent") {
      Ok(Object::Reference(id)) => *id,
      _ => panic!("no parent"),
    };
    doc.get_dictionary_mut(pages_id).unwrap().set(
      "Resources",
      dictionary! { "Font" => dictionary! { "F1" => font } },
    );

    add_resource(&mut doc, pages[0], "Font", "F2", font).unwrap();
    let page = doc.get_dictionary(pages[0]).unwrap();
    let Ok(Object::Dictionary(res)) = page.get(b"Resources") else {
      panic!("resources not inline");
    };
    let Ok(Object::Dictionary(fonts)) = res.get(b"Font") else {
      panic!("no fonts");
    };
    assert!(fonts.has(b"F1") && fonts.has(b"F2"));
  }
}
