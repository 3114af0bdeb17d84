//! 字段导出为 JSON 列表或映射

use super::Visitor;
use crate::document::{FormDocument, Widget, WidgetKind};
use crate::{PdfEnv, Result};
use serde_json::{json, Map, Value};

/// 列表和映射共用的字段描述
pub fn widget_json(widget: &Widget) -> Map<String, Value> {
    let mut item = Map::new();
    item.insert("page".into(), json!(widget.page));
    item.insert("id".into(), json!(widget.index));
    item.insert("name".into(), json!(widget.name));
    item.insert("type".into(), json!(widget.kind.as_str()));
    item.insert("value".into(), json!(widget.value));
    item.insert("left".into(), json!(widget.rect.left));
    item.insert("top".into(), json!(widget.rect.top));
    item.insert("right".into(), json!(widget.rect.right));
    item.insert("bottom".into(), json!(widget.rect.bottom));
    if let Some(font) = &widget.font {
        item.insert("font".into(), json!(font.name));
        item.insert("font_size".into(), json!(font.size));
    }
    item.insert("read_only".into(), json!(widget.read_only));
    match widget.kind {
        WidgetKind::ComboBox | WidgetKind::ListBox => {
            item.insert("options".into(), json!(widget.options));
        }
        WidgetKind::Checkbox | WidgetKind::Radio => {
            item.insert("on_states".into(), json!(widget.options));
        }
        _ => {}
    }
    item
}

/// 每个控件一条记录
#[derive(Default)]
pub struct JsonListVisitor {
    root: Option<Vec<Value>>,
    output: Option<Value>,
}

impl<D: FormDocument> Visitor<D> for JsonListVisitor {
    fn pre_visit_doc(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        self.root = Some(Vec::new());
        Ok(())
    }

    fn visit_widget(&mut self, _env: &mut PdfEnv<D>, widget: &Widget, _index: usize) -> Result<()> {
        if let Some(root) = self.root.as_mut() {
            root.push(Value::Object(widget_json(widget)));
        }
        Ok(())
    }

    fn post_visit_doc(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        self.output = self.root.take().map(Value::Array);
        Ok(())
    }

    fn take_output(&mut self) -> Option<Value> {
        self.output.take()
    }
}

/// 字段名 -> 当前值；无名控件以 `<页>.<序号>` 为键
///
/// 输出可以直接作为 `complete` 的数据或模板文件。
#[derive(Default)]
pub struct JsonMapVisitor {
    root: Option<Map<String, Value>>,
    output: Option<Value>,
}

impl<D: FormDocument> Visitor<D> for JsonMapVisitor {
    fn pre_visit_doc(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        self.root = Some(Map::new());
        Ok(())
    }

    fn visit_widget(&mut self, _env: &mut PdfEnv<D>, widget: &Widget, index: usize) -> Result<()> {
        let Some(root) = self.root.as_mut() else {
            return Ok(());
        };
        let key = if widget.name.is_empty() {
            format!("{}.{}", widget.page, index)
        } else {
            widget.name.clone()
        };
        // 单选组的多个控件共用一个字段名
        if !root.contains_key(&key) {
            root.insert(key, json!(widget.value.clone().unwrap_or_default()));
        }
        Ok(())
    }

    fn post_visit_doc(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        self.output = self.root.take().map(Value::Object);
        Ok(())
    }

    fn take_output(&mut self) -> Option<Value> {
        self.output.take()
    }
}
