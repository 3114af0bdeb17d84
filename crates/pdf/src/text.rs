//! PDF 文本字符串编解码

use lopdf::{Object, StringFormat};

/// 解码文本字符串：UTF-16BE（带 BOM）、UTF-8（带 BOM），否则按 Latin-1
pub fn decode_text(bytes: &[u8]) -> String {
  if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
    let units: Vec<u16> = rest
      .chunks_exact(2)
      .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
      .collect();
    return String::from_utf16_lossy(&units);
  }
  if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
    return String::from_utf8_lossy(rest).into_owned();
  }
  bytes.iter().map(|&b| b as char).collect()
}

/// 编码文本字符串；超出 Latin-1 时使用 UTF-16BE
pub fn encode_text(text: &str) -> Object {
  if text.chars().all(|c| (c as u32) < 0x100) {
    return Object::String(text.chars().map(|c| c as u8).collect(), StringFormat::Literal);
  }
  let mut bytes = vec![0xFE, 0xFF];
  for unit in text.encode_utf16() {
    bytes.extend_from_slice(&unit.to_be_bytes());
  }
  Object::String(bytes, StringFormat::Hexadecimal)
}

/// 名称或字符串对象的文本
pub fn object_text(obj: &Object) -> Option<String> {
  match obj {
    Object::String(bytes, _) => Some(decode_text(bytes)),
    Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
    _ => None,
  }
}

/// 外观流中的单字节文本，不可表示的字符替换为 `?`
/// 单字节编码无法表示、会显示为 `?` 的字符数
pub fn unencodable(text: &str) -> usize {
  text.chars().filter(|c| (*c as u32) >= 0x100).count()
}

pub fn single_byte(text: &str) -> Vec<u8> {
  text
    .chars()
    .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unencodable_count() {
    assert_eq!(unencodable("Ada Lovelace"), 0);
    assert_eq!(unencodable("Zoë"), 0);
    assert_eq!(unencodable("王小明 Wang"), 3);
    assert_eq!(single_byte("王a"), b"?a".to_vec());
  }

  #[test]
  fn test_text_encoding() {
    assert!(matches!(
      encode_text("Ada"),
      Object::String(ref b, StringFormat::Literal) if b == b"Ada"
    ));
    let wide = encode_text("名字");
    match &wide {
      Object::String(bytes, StringFormat::Hexadecimal) => {
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text(bytes), "名字");
      }
      other => panic!("unexpected {:?}", other),
    }
    assert_eq!(decode_text(b"caf\xe9"), "café");
    assert_eq!(decode_text(b"\xEF\xBB\xBFok"), "ok");
  }

  #[test]
  fn test_object_text_and_single_byte() {
    assert_eq!(object_text(&Object::Name(b"Yes".to_vec())).as_deref(), Some("Yes"));
    assert_eq!(object_text(&Object::Integer(1)), None);
    assert_eq!(single_byte("a名b"), b"a?b".to_vec());
  }
}
