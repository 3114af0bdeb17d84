//! 签名字典与字节范围
//!
//! 保存时先写入占位的 /ByteRange 与全零 /Contents，序列化后回填实际
//! 范围，再把签名值写进占位区。

use crate::text::encode_text;
use crate::PdfError;
use chrono::{DateTime, Local};
use lopdf::{dictionary, Dictionary, Object, StringFormat};
use pdffill_core::{SignError, Signer};

/// 占位值足够宽，回填后长度不变
const BYTE_RANGE_PLACEHOLDER: i64 = 9_999_999_999;

/// PDF 日期格式 D:YYYYMMDDHHmmSS+hh'mm'
pub fn pdf_date(time: &DateTime<Local>) -> String {
  let offset = time.format("%z").to_string();
  let (hours, minutes) = offset.split_at(offset.len().saturating_sub(2));
  format!("D:{}{}'{}'", time.format("%Y%m%d%H%M%S"), hours, minutes)
}

pub fn signature_dictionary(reserve: usize, reason: Option<&str>, location: Option<&str>) -> Dictionary {
  let mut dict = dictionary! {
    "Type" => "Sig",
    "Filter" => "Adobe.PPKLite",
    "SubFilter" => "adbe.pkcs7.detached",
    "ByteRange" => vec![
      Object::Integer(0),
      Object::Integer(BYTE_RANGE_PLACEHOLDER),
      Object::Integer(BYTE_RANGE_PLACEHOLDER),
      Object::Integer(BYTE_RANGE_PLACEHOLDER),
    ],
    "Contents" => Object::String(vec![0; reserve], StringFormat::Hexadecimal),
    "M" => Object::string_literal(pdf_date(&Local::now())),
  };
  if let Some(reason) = reason {
    dict.set("Reason", encode_text(reason));
  }
  if let Some(location) = location {
    dict.set("Location", encode_text(location));
  }
  dict
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
  if from > haystack.len() {
    return None;
  }
  haystack[from..]
    .windows(needle.len())
    .position(|w| w == needle)
    .map(|pos| pos + from)
}

/// 已序列化文档中的占位区位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholders {
  /// `/Contents` 十六进制串，含尖括号
  contents: (usize, usize),
  /// `/ByteRange` 数组，含方括号
  byte_range: (usize, usize),
}

fn locate(bytes: &[u8], reserve: usize) -> Result<Placeholders, PdfError> {
  let mut pattern = Vec::with_capacity(reserve * 2 + 2);
  pattern.push(b'<');
  pattern.resize(reserve * 2 + 1, b'0');
  pattern.push(b'>');
  let start = find(bytes, &pattern, 0)
    .ok_or_else(|| PdfError::Form("signature /Contents placeholder not found".to_string()))?;
  let contents = (start, start + pattern.len());

  let placeholder = BYTE_RANGE_PLACEHOLDER.to_string();
  let mut from = 0;
  while let Some(key) = find(bytes, b"/ByteRange", from) {
    from = key + 1;
    let Some(open) = find(bytes, b"[", key) else {
      break;
    };
    let Some(close) = find(bytes, b"]", open) else {
      break;
    };
    if find(&bytes[open..close], placeholder.as_bytes(), 0).is_some() {
      return Ok(Placeholders {
        contents,
        byte_range: (open, close + 1),
      });
    }
  }
  Err(PdfError::Form("signature /ByteRange placeholder not found".to_string()))
}

/// 回填字节范围、计算签名并写入 /Contents
pub fn sign_serialized(bytes: &mut [u8], reserve: usize, signer: &dyn Signer) -> Result<[usize; 4], PdfError> {
  let spots = locate(bytes, reserve)?;
  let (c_start, c_end) = spots.contents;
  let range = [0, c_start, c_end, bytes.len() - c_end];

  let (b_start, b_end) = spots.byte_range;
  let width = b_end - b_start;
  let mut text = format!("[{} {} {} {}]", range[0], range[1], range[2], range[3]).into_bytes();
  if text.len() > width {
    return Err(PdfError::Form("byte range does not fit its placeholder".to_string()));
  }
  text.resize(width, b' ');
  bytes[b_start..b_end].copy_from_slice(&text);

  let mut signed = Vec::with_capacity(range[1] + range[3]);
  signed.extend_from_slice(&bytes[..c_start]);
  signed.extend_from_slice(&bytes[c_end..]);
  let signature = signer.sign(&signed)?;
  if signature.len() > reserve {
    return Err(SignError::Capacity {
      needed: signature.len(),
      reserved: reserve,
    }
    .into());
  }
  let encoded = hex::encode_upper(&signature);
  bytes[c_start + 1..c_start + 1 + encoded.len()].copy_from_slice(encoded.as_bytes());
  log::info!("signature embedded ({} bytes, range {:?})", signature.len(), range);
  Ok(range)
}
