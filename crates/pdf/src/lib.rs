//! `FormDocument` implementation over lopdf.

mod appearance;
mod fields;
mod geometry;
mod images;
mod page;
mod signature;
mod text;

#[cfg(test)]
mod testing;

pub use geometry::PageBox;

use appearance::{ensure_font, parse_da, LABEL_FONT};
use fields::{field_flags, field_owner, widget_kind, FF_EDIT, FF_MULTILINE, FF_READ_ONLY};
use geometry::{dict_rect, page_box, rect_object};
use lopdf::content::Operation;
use lopdf::{dictionary, Document, Object, ObjectId};
use pdffill_core::fill::da_string;
use pdffill_core::{
    FillError, FontSpec, FormDocument, ImageData, OverlayLabel, SignError, SignRequest,
    SignatureData, TextData, Widget, WidgetHandle, WidgetKind,
};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("form error: {0}")]
    Form(String),

    #[error(transparent)]
    Sign(#[from] SignError),
}

impl From<PdfError> for FillError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Sign(err) => FillError::Signing(err),
            PdfError::Io(err) => FillError::Io(err),
            other => FillError::Document(other.to_string()),
        }
    }
}

/// 复选框与单选框接受的开/关写法
fn toggle_state(value: &str, on_state: &str) -> Option<bool> {
    let lower = value.trim().to_ascii_lowercase();
    if value == on_state || matches!(lower.as_str(), "yes" | "true" | "on" | "1") {
        Some(true)
    } else if matches!(lower.as_str(), "off" | "no" | "false" | "0" | "") {
        Some(false)
    } else {
        None
    }
}

fn object_id(handle: WidgetHandle) -> ObjectId {
    (handle.0, handle.1)
}

fn handle(id: ObjectId) -> WidgetHandle {
    WidgetHandle(id.0, id.1)
}

/// An open PDF with its AcroForm.
pub struct PdfForm {
    doc: Document,
    pages: Vec<ObjectId>,
    images: images::ImageCache,
}

impl PdfForm {
    pub fn load(path: &Path) -> Result<Self, PdfError> {
        let doc = Document::load(path)?;
        log::info!("loaded {}", path.display());
        Ok(Self::from_document(doc))
    }

    pub fn load_mem(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(Self::from_document(Document::load_mem(bytes)?))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self {
            doc,
            pages,
            images: images::ImageCache::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    fn page_id(&self, page: usize) -> Result<ObjectId, PdfError> {
        self.pages.get(page).copied().ok_or_else(|| {
            PdfError::Form(format!("page {} out of range ({} pages)", page, self.pages.len()))
        })
    }

    fn read_widget(&self, page: usize, page_box: &PageBox, index: usize, id: ObjectId) -> Widget {
        let doc = &self.doc;
        let kind = widget_kind(doc, id);
        let rect = doc
            .get_dictionary(id)
            .ok()
            .and_then(|dict| dict_rect(doc, dict, b"Rect"))
            .map(|rect| page_box.from_pdf(rect))
            .unwrap_or_default();
        let options = match kind {
            WidgetKind::ComboBox | WidgetKind::ListBox => fields::choice_options(doc, id),
            WidgetKind::Checkbox | WidgetKind::Radio => fields::on_states(doc, id),
            _ => Vec::new(),
        };
        Widget {
            handle: handle(id),
            page,
            index,
            name: fields::full_name(doc, id),
            kind,
            value: fields::field_value(doc, id),
            rect,
            font: fields::default_appearance(doc, id).and_then(|da| parse_da(&da).0),
            read_only: field_flags(doc, id) & FF_READ_ONLY != 0,
            options,
        }
    }

    /// 新字段名；显式名称重复时报错，否则取 `<prefix><n>` 中第一个空闲的
    fn new_field_name(&self, requested: Option<&str>, prefix: &str) -> Result<String, PdfError> {
        let names = fields::field_names(&self.doc);
        if let Some(name) = requested {
            if names.contains(name) {
                return Err(PdfError::Form(format!("field `{}` already exists", name)));
            }
            return Ok(name.to_string());
        }
        Ok((1..)
            .map(|n| format!("{}{}", prefix, n))
            .find(|name| !names.contains(name))
            .unwrap_or_else(|| prefix.to_string()))
    }

    fn widget_size(&self, id: ObjectId) -> (f32, f32) {
        self.doc
            .get_dictionary(id)
            .ok()
            .and_then(|dict| dict_rect(&self.doc, dict, b"Rect"))
            .map(|r| ((r[2] - r[0]).abs(), (r[3] - r[1]).abs()))
            .unwrap_or((0.0, 0.0))
    }

    fn set_normal_appearance(&mut self, id: ObjectId, stream: lopdf::Stream) -> Result<(), PdfError> {
        let ap_id = self.doc.add_object(stream);
        self.doc
            .get_dictionary_mut(id)?
            .set("AP", dictionary! { "N" => ap_id });
        Ok(())
    }

    fn set_acroform_entry(&mut self, key: &str, value: Object) -> Result<(), PdfError> {
        let acroform_id = fields::ensure_acroform(&mut self.doc)?;
        self.doc.get_dictionary_mut(acroform_id)?.set(key, value);
        Ok(())
    }

    fn set_text(&mut self, id: ObjectId, value: &str) -> Result<(), PdfError> {
        let owner = field_owner(&self.doc, id);
        self.doc.get_dictionary_mut(owner)?.set("V", text::encode_text(value));

        let (font, color) = match fields::default_appearance(&self.doc, id) {
            Some(da) => parse_da(&da),
            None => (None, [0.0; 3]),
        };
        let font = font.unwrap_or_else(|| FontSpec::new("Helv", 0.0));
        let font_id = ensure_font(&mut self.doc, &font.name)?;
        let (width, height) = self.widget_size(id);
        let multiline = field_flags(&self.doc, id) & FF_MULTILINE != 0;
        let stream = appearance::text_stream(width, height, &font, font_id, &color, value, multiline)?;
        self.set_normal_appearance(id, stream)?;
        // 同一字段的其他控件由阅读器重建外观
        self.set_acroform_entry("NeedAppearances", Object::Boolean(true))
    }

    fn set_checkbox(&mut self, id: ObjectId, value: &str) -> Result<bool, PdfError> {
        let on = fields::on_states(&self.doc, id)
            .into_iter()
            .next()
            .unwrap_or_else(|| "Yes".to_string());
        let state = match toggle_state(value, &on) {
            Some(true) => on,
            Some(false) => "Off".to_string(),
            None => return Ok(false),
        };
        let owner = field_owner(&self.doc, id);
        self.doc.get_dictionary_mut(owner)?.set("V", Object::Name(state.clone().into_bytes()));
        self.doc.get_dictionary_mut(id)?.set("AS", Object::Name(state.into_bytes()));
        Ok(true)
    }

    /// 单选组：值为某个按钮的开启状态名，或对当前按钮的开/关
    fn set_radio(&mut self, id: ObjectId, value: &str) -> Result<bool, PdfError> {
        let owner = field_owner(&self.doc, id);
        let mut buttons = fields::kids(&self.doc, owner);
        if buttons.is_empty() {
            buttons.push(id);
        }
        let states: Vec<(ObjectId, Vec<String>)> = buttons
            .into_iter()
            .map(|b| (b, fields::on_states(&self.doc, b)))
            .collect();

        let state = if states.iter().any(|(_, on)| on.iter().any(|s| s == value)) {
            value.to_string()
        } else {
            let own = fields::on_states(&self.doc, id).into_iter().next();
            match (own, toggle_state(value, "")) {
                (Some(on), Some(true)) => on,
                (_, Some(false)) => "Off".to_string(),
                _ => return Ok(false),
            }
        };

        self.doc
            .get_dictionary_mut(owner)?
            .set("V", Object::Name(state.clone().into_bytes()));
        for (button, on) in states {
            let appearance = if on.contains(&state) { state.as_str() } else { "Off" };
            self.doc
                .get_dictionary_mut(button)?
                .set("AS", Object::Name(appearance.as_bytes().to_vec()));
        }
        Ok(true)
    }

    fn set_choice(&mut self, id: ObjectId, kind: WidgetKind, value: &str) -> Result<bool, PdfError> {
        let options = fields::choice_options(&self.doc, id);
        let editable = kind == WidgetKind::ComboBox && field_flags(&self.doc, id) & FF_EDIT != 0;
        if !options.is_empty() && !editable && !options.iter().any(|o| o == value) {
            return Ok(false);
        }
        self.set_text(id, value)?;
        Ok(true)
    }

    /// 签名域的值作为可见的签名人文字
    fn set_signature_label(&mut self, id: ObjectId, value: &str) -> Result<(), PdfError> {
        let (width, height) = self.widget_size(id);
        let font = FontSpec::new("Helv", 0.0);
        let font_id = ensure_font(&mut self.doc, &font.name)?;
        let stream = appearance::signature_stream(width, height, value, &font, font_id, None)?;
        self.set_normal_appearance(id, stream)
    }

    fn add_field(&mut self, page_id: ObjectId, dict: lopdf::Dictionary) -> Result<ObjectId, PdfError> {
        let id = self.doc.add_object(dict);
        fields::push_annot(&mut self.doc, page_id, id)?;
        fields::push_field(&mut self.doc, id)?;
        Ok(id)
    }

    fn stamp_info(&mut self) {
        let info_id = match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => *id,
            _ => {
                let id = self.doc.add_object(lopdf::Dictionary::new());
                self.doc.trailer.set("Info", id);
                id
            }
        };
        let producer = format!("pdffill {}", env!("CARGO_PKG_VERSION"));
        let date = signature::pdf_date(&chrono::Local::now());
        if let Ok(info) = self.doc.get_dictionary_mut(info_id) {
            info.set("Producer", Object::string_literal(producer));
            info.set("ModDate", Object::string_literal(date));
        }
    }

    fn prepare_signature(&mut self, request: &SignRequest<'_>) -> Result<(), PdfError> {
        let field = field_owner(&self.doc, object_id(request.field));
        let dict = signature::signature_dictionary(
            request.reserve,
            request.reason.as_deref(),
            request.location.as_deref(),
        );
        let sig_id = self.doc.add_object(dict);
        self.doc.get_dictionary_mut(field)?.set("V", sig_id);
        self.set_acroform_entry("SigFlags", Object::Integer(3))?;
        // 签名后不允许阅读器改写外观
        self.set_acroform_entry("NeedAppearances", Object::Boolean(false))
    }

    /// 序列化，可选签名
    pub fn to_bytes(&mut self, signing: Option<&SignRequest<'_>>) -> Result<Vec<u8>, PdfError> {
        self.stamp_info();
        if let Some(request) = signing {
            self.prepare_signature(request)?;
        }
        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| PdfError::Form(format!("serialize: {}", e)))?;
        if let Some(request) = signing {
            signature::sign_serialized(&mut bytes, request.reserve, request.signer)?;
        }
        Ok(bytes)
    }
}

/// 写入同目录下的临时文件后重命名
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PdfError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl FormDocument for PdfForm {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn widgets(&self, page: usize) -> pdffill_core::Result<Vec<Widget>> {
        let page_id = self.page_id(page)?;
        let page_box = page_box(&self.doc, page_id);
        Ok(fields::page_widget_ids(&self.doc, page_id)
            .into_iter()
            .enumerate()
            .map(|(index, id)| self.read_widget(page, &page_box, index, id))
            .collect())
    }

    fn set_widget_value(&mut self, widget: &Widget, value: &str) -> pdffill_core::Result<bool> {
        let id = object_id(widget.handle);
        let kind = widget_kind(&self.doc, id);
        let accepted = match kind {
            WidgetKind::Text => {
                self.set_text(id, value)?;
                true
            }
            WidgetKind::ComboBox | WidgetKind::ListBox => self.set_choice(id, kind, value)?,
            WidgetKind::Checkbox => self.set_checkbox(id, value)?,
            WidgetKind::Radio => self.set_radio(id, value)?,
            WidgetKind::Signature => {
                self.set_signature_label(id, value)?;
                true
            }
            WidgetKind::PushButton | WidgetKind::Unknown => false,
        };
        Ok(accepted)
    }

    fn set_read_only(&mut self, widget: WidgetHandle, read_only: bool) -> pdffill_core::Result<()> {
        fields::set_flag(&mut self.doc, object_id(widget), FF_READ_ONLY, read_only)?;
        Ok(())
    }

    fn add_text_field(&mut self, text: &TextData) -> pdffill_core::Result<WidgetHandle> {
        let page_id = self.page_id(text.page)?;
        let name = self.new_field_name(text.widget_name.as_deref(), "Text")?;
        let rect = page_box(&self.doc, page_id).to_pdf(&text.pos);
        let font_id = ensure_font(&mut self.doc, &text.font.name)?;
        let stream = appearance::text_stream(
            text.pos.width(),
            text.pos.height(),
            &text.font,
            font_id,
            &text.color,
            &text.value,
            false,
        )?;
        let ap_id = self.doc.add_object(stream);
        let dict = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => text::encode_text(&name),
            "Rect" => rect_object(rect),
            "F" => 4,
            "P" => page_id,
            "DA" => Object::string_literal(da_string(&text.font, &text.color)),
            "V" => text::encode_text(&text.value),
            "AP" => dictionary! { "N" => ap_id },
        };
        let id = self.add_field(page_id, dict)?;
        log::debug!("text field `{}` -> {:?}", name, id);
        Ok(handle(id))
    }

    fn add_signature_field(&mut self, sig: &SignatureData) -> pdffill_core::Result<WidgetHandle> {
        let page_id = self.page_id(sig.page)?;
        let name = self.new_field_name(sig.widget_name.as_deref(), "Signature")?;
        let (rect, flags, stream) = if sig.visible {
            let stamp = match &sig.image {
                Some(path) => Some(self.images.embed_file(&mut self.doc, Path::new(path))?),
                None => None,
            };
            let font_id = ensure_font(&mut self.doc, &sig.font.name)?;
            let stream = appearance::signature_stream(
                sig.pos.width(),
                sig.pos.height(),
                "",
                &sig.font,
                font_id,
                stamp,
            )?;
            (page_box(&self.doc, page_id).to_pdf(&sig.pos), 4, stream)
        } else {
            ([0.0; 4], 2, appearance::empty_stream()?)
        };
        let ap_id = self.doc.add_object(stream);
        let dict = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Sig",
            "T" => text::encode_text(&name),
            "Rect" => rect_object(rect),
            "F" => flags,
            "P" => page_id,
            "DA" => Object::string_literal(da_string(&sig.font, &[0.0; 3])),
            "AP" => dictionary! { "N" => ap_id },
        };
        let id = self.add_field(page_id, dict)?;
        self.set_acroform_entry("SigFlags", Object::Integer(3))?;
        log::debug!("signature field `{}` -> {:?}", name, id);
        Ok(handle(id))
    }

    fn add_image(&mut self, image: &ImageData) -> pdffill_core::Result<()> {
        let page_id = self.page_id(image.page)?;
        let image_id = self
            .images
            .embed_file(&mut self.doc, Path::new(&image.file_name))?;
        let name = format!("PfIm{}", image_id.0);
        page::add_resource(&mut self.doc, page_id, "XObject", &name, image_id)?;

        let [x1, y1, x2, y2] = page_box(&self.doc, page_id).to_pdf(&image.pos);
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(x2 - x1),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(y2 - y1),
                    Object::Real(x1),
                    Object::Real(y1),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];
        page::append_content(&mut self.doc, page_id, ops)?;
        Ok(())
    }

    fn draw_labels(&mut self, page: usize, labels: &[OverlayLabel]) -> pdffill_core::Result<()> {
        let page_id = self.page_id(page)?;
        let page_box = page_box(&self.doc, page_id);
        let font_id = ensure_font(&mut self.doc, "Helv")?;
        page::add_resource(&mut self.doc, page_id, "Font", LABEL_FONT, font_id)?;
        let placed: Vec<([f32; 4], String)> = labels
            .iter()
            .map(|label| (page_box.to_pdf(&label.rect), label.text.clone()))
            .collect();
        page::append_content(&mut self.doc, page_id, appearance::label_operations(&placed))?;
        Ok(())
    }

    fn save(&mut self, path: &Path, signing: Option<SignRequest<'_>>) -> pdffill_core::Result<()> {
        let bytes = self.to_bytes(signing.as_ref())?;
        write_atomic(path, &bytes)?;
        log::info!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
