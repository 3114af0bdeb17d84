//! 控件查找
//!
//! 只读操作；顺序由文档的遍历顺序决定。

use crate::document::{FormDocument, Widget};
use crate::Result;

/// 按遍历位置查找；负数或越界返回 `None`
pub fn find_by_id(widgets: &[Widget], id: i64) -> Option<&Widget> {
    usize::try_from(id).ok().and_then(|index| widgets.get(index))
}

/// 按完整字段名精确匹配（区分大小写），返回第一个命中
pub fn find_by_name<'a>(widgets: &'a [Widget], name: &str) -> Option<&'a Widget> {
    widgets.iter().find(|w| w.name == name)
}

pub fn find_widget_id<D: FormDocument>(doc: &D, page: usize, id: i64) -> Result<Option<Widget>> {
    if page >= doc.page_count() {
        return Ok(None);
    }
    let widgets = doc.widgets(page)?;
    Ok(find_by_id(&widgets, id).cloned())
}

pub fn find_widget_name<D: FormDocument>(
    doc: &D,
    page: usize,
    name: &str,
) -> Result<Option<Widget>> {
    if page >= doc.page_count() {
        return Ok(None);
    }
    let widgets = doc.widgets(page)?;
    Ok(find_by_name(&widgets, name).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{text_widget, MemoryForm};

    fn widgets() -> Vec<Widget> {
        vec![
            text_widget(0, 0, "name"),
            text_widget(0, 1, "age"),
            text_widget(0, 2, "Name"),
        ]
    }

    #[test]
    fn test_find_by_id_bounds() {
        let widgets = widgets();
        assert_eq!(find_by_id(&widgets, 0).map(|w| w.name.as_str()), Some("name"));
        assert_eq!(find_by_id(&widgets, 2).map(|w| w.name.as_str()), Some("Name"));
        assert!(find_by_id(&widgets, 3).is_none());
        assert!(find_by_id(&widgets, -1).is_none());
        assert!(find_by_id(&widgets, i64::MAX).is_none());
        assert!(find_by_id(&[], 0).is_none());
    }

    #[test]
    fn test_find_by_name_exact() {
        let widgets = widgets();
        assert_eq!(find_by_name(&widgets, "Name").map(|w| w.index), Some(2));
        assert_eq!(find_by_name(&widgets, "name").map(|w| w.index), Some(0));
        assert!(find_by_name(&widgets, "NAME").is_none());
        assert!(find_by_name(&widgets, "").is_none());
        assert!(find_by_name(&widgets, "名字").is_none());
    }

    #[test]
    fn test_find_on_document_page() {
        let form = MemoryForm::new(vec![vec!["a", "b"], vec!["c"]]);
        let found = find_widget_name(&form, 1, "c").unwrap().unwrap();
        assert_eq!((found.page, found.index), (1, 0));
        assert!(find_widget_name(&form, 0, "c").unwrap().is_none());
        assert!(find_widget_id(&form, 5, 0).unwrap().is_none());
        assert!(find_widget_id(&form, 0, 5).unwrap().is_none());
    }
}
