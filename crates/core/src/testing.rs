//! In-memory `FormDocument` for engine tests.

use crate::document::{FormDocument, OverlayLabel, SignRequest, Widget, WidgetHandle, WidgetKind};
use crate::types::{ImageData, PosData, SignatureData, TextData};
use crate::{FillError, Result};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

pub(crate) fn text_widget(page: usize, index: usize, name: &str) -> Widget {
    Widget {
        handle: WidgetHandle((page * 100 + index + 1) as u32, 0),
        page,
        index,
        name: name.to_string(),
        kind: WidgetKind::Text,
        value: None,
        rect: PosData::new(10.0, 10.0 + 20.0 * index as f32, 150.0, 24.0 + 20.0 * index as f32),
        font: None,
        read_only: false,
        options: Vec::new(),
    }
}

#[derive(Default)]
pub(crate) struct MemoryForm {
    pub pages: Vec<Vec<Widget>>,
    pub labels: Vec<(usize, Vec<OverlayLabel>)>,
    pub images: Vec<ImageData>,
    pub saved: Vec<PathBuf>,
    pub signed_with: Option<Vec<u8>>,
    next_handle: u32,
}

impl MemoryForm {
    pub fn new(pages: Vec<Vec<&str>>) -> Self {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(page, names)| {
                names
                    .into_iter()
                    .enumerate()
                    .map(|(index, name)| text_widget(page, index, name))
                    .collect()
            })
            .collect();
        Self {
            pages,
            next_handle: 10_000,
            ..Default::default()
        }
    }

    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.pages.iter().flatten().find(|w| w.name == name)
    }

    pub fn value_of(&self, name: &str) -> Option<String> {
        self.widget(name).and_then(|w| w.value.clone())
    }

    fn widget_mut(&mut self, handle: WidgetHandle) -> Option<&mut Widget> {
        self.pages
            .iter_mut()
            .flatten()
            .find(|w| w.handle == handle)
    }

    fn push(&mut self, page: usize, name: String, kind: WidgetKind, rect: PosData) -> WidgetHandle {
        self.next_handle += 1;
        let handle = WidgetHandle(self.next_handle, 0);
        let widgets = &mut self.pages[page];
        widgets.push(Widget {
            handle,
            page,
            index: widgets.len(),
            name,
            kind,
            value: None,
            rect,
            font: None,
            read_only: false,
            options: Vec::new(),
        });
        handle
    }

    pub fn snapshot(&self) -> Value {
        let mut fields = Map::new();
        for w in self.pages.iter().flatten() {
            fields.insert(
                w.name.clone(),
                json!({"value": w.value, "read_only": w.read_only}),
            );
        }
        Value::Object(fields)
    }
}

impl FormDocument for MemoryForm {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn widgets(&self, page: usize) -> Result<Vec<Widget>> {
        self.pages
            .get(page)
            .cloned()
            .ok_or_else(|| FillError::Document(format!("no page {}", page)))
    }

    fn set_widget_value(&mut self, widget: &Widget, value: &str) -> Result<bool> {
        let target = self
            .widget_mut(widget.handle)
            .ok_or_else(|| FillError::Document("stale widget".into()))?;
        if target.kind == WidgetKind::PushButton {
            return Ok(false);
        }
        target.value = Some(value.to_string());
        Ok(true)
    }

    fn set_read_only(&mut self, widget: WidgetHandle, read_only: bool) -> Result<()> {
        let target = self
            .widget_mut(widget)
            .ok_or_else(|| FillError::Document("stale widget".into()))?;
        target.read_only = read_only;
        Ok(())
    }

    fn add_text_field(&mut self, text: &TextData) -> Result<WidgetHandle> {
        let name = text
            .widget_name
            .clone()
            .unwrap_or_else(|| format!("text{}", self.next_handle + 1));
        let handle = self.push(text.page, name, WidgetKind::Text, text.pos);
        if let Some(w) = self.widget_mut(handle) {
            w.value = Some(text.value.clone());
        }
        Ok(handle)
    }

    fn add_signature_field(&mut self, sig: &SignatureData) -> Result<WidgetHandle> {
        let name = sig
            .widget_name
            .clone()
            .unwrap_or_else(|| format!("Signature{}", self.next_handle + 1));
        Ok(self.push(sig.page, name, WidgetKind::Signature, sig.pos))
    }

    fn add_image(&mut self, image: &ImageData) -> Result<()> {
        self.images.push(image.clone());
        Ok(())
    }

    fn draw_labels(&mut self, page: usize, labels: &[OverlayLabel]) -> Result<()> {
        self.labels.push((page, labels.to_vec()));
        Ok(())
    }

    fn save(&mut self, path: &Path, signing: Option<SignRequest<'_>>) -> Result<()> {
        let body = serde_json::to_vec(&self.snapshot())?;
        if let Some(request) = signing {
            self.signed_with = Some(request.signer.sign(&body)?);
        }
        std::fs::write(path, body)?;
        self.saved.push(path.to_path_buf());
        Ok(())
    }
}
