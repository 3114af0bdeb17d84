//! 文档遍历
//!
//! 每个命令实现一个 `Visitor`，遍历引擎按页序、控件序各调用一次。

mod annotate;
mod fonts;
mod json;

pub use annotate::AnnotateVisitor;
pub use fonts::FontListVisitor;
pub use json::{JsonListVisitor, JsonMapVisitor};

use crate::document::{FormDocument, Widget};
use crate::{Command, FillError, PdfEnv, Result};
use serde_json::Value;

/// 遍历钩子，全部默认为空操作
pub trait Visitor<D: FormDocument> {
    fn pre_visit_doc(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        Ok(())
    }

    fn pre_visit_page(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        Ok(())
    }

    fn visit_widget(&mut self, _env: &mut PdfEnv<D>, _widget: &Widget, _index: usize) -> Result<()> {
        Ok(())
    }

    fn post_visit_page(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        Ok(())
    }

    fn post_visit_doc(&mut self, _env: &mut PdfEnv<D>) -> Result<()> {
        Ok(())
    }

    /// 遍历结束后交给调用方的 JSON 结果
    fn take_output(&mut self) -> Option<Value> {
        None
    }
}

/// 遍历整份文档，或只遍历 `env.requested_page` 指定的一页
pub fn traverse<D: FormDocument>(env: &mut PdfEnv<D>, visitor: &mut dyn Visitor<D>) -> Result<()> {
    env.page_count = env.doc.page_count();
    let pages = match env.requested_page {
        Some(page) if page >= env.page_count => {
            return Err(FillError::PageOutOfRange {
                page,
                count: env.page_count,
            })
        }
        Some(page) => page..page + 1,
        None => 0..env.page_count,
    };

    log::debug!("{}: visiting pages {:?}", env.cmd.name(), pages);
    visitor.pre_visit_doc(env)?;
    for page in pages {
        env.page_num = page;
        visitor.pre_visit_page(env)?;
        let widgets = env.doc.widgets(page)?;
        for (index, widget) in widgets.iter().enumerate() {
            visitor.visit_widget(env, widget, index)?;
        }
        visitor.post_visit_page(env)?;
    }
    visitor.post_visit_doc(env)
}

/// 命令对应的访问者；完成类命令不走遍历，返回 `None`
pub fn visitor_for<D: FormDocument>(cmd: Command) -> Option<Box<dyn Visitor<D>>> {
    match cmd {
        Command::AnnotateFields => Some(Box::new(AnnotateVisitor::default())),
        Command::JsonList => Some(Box::new(JsonListVisitor::default())),
        Command::JsonMap => Some(Box::new(JsonMapVisitor::default())),
        Command::FontList => Some(Box::new(FontListVisitor::default())),
        Command::Complete | Command::CompleteStdin => None,
    }
}
