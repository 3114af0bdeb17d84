//! 字体列表

use super::Visitor;
use crate::document::{FormDocument, Widget};
use crate::{PdfEnv, Result};
use serde_json::Value;
use std::collections::HashSet;

/// 去掉前导 `/` 和空白后的字体名
pub fn normalize_font_name(name: &str) -> &str {
    name.trim().trim_start_matches('/').trim()
}

/// 收集控件引用的字体，每个规范化名称只输出一次，保持首次出现的顺序
#[derive(Default)]
pub struct FontListVisitor {
    seen: HashSet<String>,
    fonts: Vec<String>,
    page_start: usize,
    output: Option<Value>,
}

impl<D: FormDocument> Visitor<D> for FontListVisitor {
    fn pre_visit_page(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        self.page_start = self.fonts.len();
        Ok(())
    }

    fn visit_widget(&mut self, _env: &mut PdfEnv<D>, widget: &Widget, _index: usize) -> Result<()> {
        let Some(font) = &widget.font else {
            return Ok(());
        };
        let name = normalize_font_name(&font.name);
        if !name.is_empty() && self.seen.insert(name.to_string()) {
            self.fonts.push(name.to_string());
        }
        Ok(())
    }

    fn post_visit_page(&mut self, env: &mut PdfEnv<D>) -> Result<()> {
        log::debug!(
            "page {}: {} new font(s)",
            env.page_num,
            self.fonts.len() - self.page_start
        );
        Ok(())
    }

    fn post_visit_doc(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        self.output = Some(Value::Array(
            self.fonts.drain(..).map(Value::String).collect(),
        ));
        Ok(())
    }

    fn take_output(&mut self) -> Option<Value> {
        self.output.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryForm;
    use crate::types::FontSpec;
    use crate::visit::traverse;
    use crate::{Command, FilesEnv};
    use serde_json::json;

    #[test]
    fn test_fonts_emitted_once() {
        let mut form = MemoryForm::new(vec![vec!["a", "b", "c"], vec!["d", "e"]]);
        form.pages[0][0].font = Some(FontSpec::new("Helv", 9.0));
        form.pages[0][1].font = Some(FontSpec::new("/Helv", 12.0));
        form.pages[0][2].font = Some(FontSpec::new("TiRo", 9.0));
        form.pages[1][0].font = Some(FontSpec::new(" Helv ", 0.0));
        form.pages[1][1].font = Some(FontSpec::new("Cour", 9.0));
        let mut env = PdfEnv::new(form, Command::FontList, FilesEnv::default());
        let mut visitor = FontListVisitor::default();
        traverse(&mut env, &mut visitor).unwrap();
        let output = Visitor::<MemoryForm>::take_output(&mut visitor).unwrap();
        assert_eq!(output, json!(["Helv", "TiRo", "Cour"]));
    }

    #[test]
    fn test_normalize_font_name() {
        assert_eq!(normalize_font_name("/Helv"), "Helv");
        assert_eq!(normalize_font_name("  /ZaDb "), "ZaDb");
        assert_eq!(normalize_font_name(""), "");
    }
}
