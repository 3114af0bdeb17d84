use crate::PdfError;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

/// 文件内容的 SHA-256（十六进制）
pub fn digest(bytes: &[u8]) -> String {
  hex::encode(Sha256::digest(bytes))
}

/// 同一文档内按内容去重的图片 XObject
#[derive(Debug, Default)]
pub struct ImageCache {
  by_digest: HashMap<String, ObjectId>,
}

impl ImageCache {
  pub fn len(&self) -> usize {
    self.by_digest.len()
  }

  /// 读取图片文件并嵌入；相同内容只嵌入一次
  pub fn embed_file(&mut self, doc: &mut Document, path: &Path) -> Result<ObjectId, PdfError> {
    let bytes = std::fs::read(path)?;
    let key = digest(&bytes);
    if let Some(id) = self.by_digest.get(&key) {
      log::debug!("图片 {} 已嵌入为 {:?}", path.display(), id);
      return Ok(*id);
    }
    let id = embed_image(doc, &bytes)?;
    log::info!("嵌入图片 {} -> {:?}", path.display(), id);
    self.by_digest.insert(key, id);
    Ok(id)
  }
}

/// 解码图片并写入 DeviceRGB XObject，有透明度时附带 SMask
pub fn embed_image(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId, PdfError> {
  let rgba = image::load_from_memory(bytes)?.to_rgba8();
  let (width, height) = rgba.dimensions();
  if width == 0 || height == 0 {
    return Err(PdfError::Form("image has zero dimensions".to_string()));
  }

  let mut rgb = Vec::with_capacity((width * height * 3) as usize);
  let mut alpha = Vec::with_capacity((width * height) as usize);
  for pixel in rgba.pixels() {
    let [r, g, b, a] = pixel.0;
    rgb.extend_from_slice(&[r, g, b]);
    alpha.push(a);
  }

  let mut dict = dictionary! {
    "Type" => "XObject",
    "Subtype" => "Image",
    "Width" => width as i64,
    "Height" => height as i64,
    "ColorSpace" => "DeviceRGB",
    "BitsPerComponent" => 8,
  };

  if alpha.iter().any(|&a| a != u8::MAX) {
    let mut smask = Stream::new(
      dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceGray",
        "BitsPerComponent" => 8,
      },
      alpha,
    );
    smask.compress().ok();
    let smask_id = doc.add_object(smask);
    dict.set("SMask", Object::Reference(smask_id));
  }

  let mut stream = Stream::new(dict, rgb);
  stream.compress().ok();
  Ok(doc.add_object(stream))
}
