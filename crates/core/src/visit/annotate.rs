//! 字段标注
//!
//! 把每个控件的 `<页>.<序号>` 写入文本框并在页面上画出标签框，
//! 便于人工确认按序号填充时的目标控件。

use super::Visitor;
use crate::complete::check_output_path;
use crate::document::{FormDocument, OverlayLabel, Widget, WidgetKind};
use crate::{fill, FillError, PdfEnv, Result};
use std::path::PathBuf;

#[derive(Default)]
pub struct AnnotateVisitor {
    output: Option<PathBuf>,
    labels: Vec<OverlayLabel>,
    annotated: usize,
}

impl<D: FormDocument> Visitor<D> for AnnotateVisitor {
    fn pre_visit_doc(&mut self, env: &mut PdfEnv<D>) -> Result<()> {
        self.output = Some(check_output_path(&env.files)?);
        Ok(())
    }

    fn pre_visit_page(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        self.labels.clear();
        Ok(())
    }

    fn visit_widget(&mut self, env: &mut PdfEnv<D>, widget: &Widget, index: usize) -> Result<()> {
        let label = format!("{}.{}", env.page_num, index);
        if widget.kind == WidgetKind::Text && !widget.read_only {
            match fill::set_widget_value(env, widget, &label) {
                Ok(_) => {}
                Err(err) if err.is_recoverable() => log::warn!("{}: {}", label, err),
                Err(err) => return Err(err),
            }
        }
        let text = if widget.name.is_empty() {
            label
        } else {
            format!("{} {}", label, widget.name)
        };
        self.labels.push(OverlayLabel {
            rect: widget.rect,
            text,
        });
        Ok(())
    }

    fn post_visit_page(&mut self, env: &mut PdfEnv<D>) -> Result<()> {
        if self.labels.is_empty() {
            return Ok(());
        }
        env.doc.draw_labels(env.page_num, &self.labels)?;
        self.annotated += self.labels.len();
        self.labels.clear();
        Ok(())
    }

    fn post_visit_doc(&mut self, env: &mut PdfEnv<D>) -> Result<()> {
        let output = self.output.take().ok_or(FillError::MissingOutput)?;
        env.doc.save(&output, None)?;
        log::info!("annotated {} widget(s), saved {}", self.annotated, output.display());
        Ok(())
    }
}
