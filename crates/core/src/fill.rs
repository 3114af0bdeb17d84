//! 填充引擎
//!
//! 把已解析的填充请求落到文档上：定位控件并写值，或新增控件。

use crate::document::{FormDocument, Widget, WidgetHandle};
use crate::locate;
use crate::map_input::resolve_fill_data;
use crate::types::{Color, FillDefaults, FillRequest, FontSpec, ImageData, SignatureData, TextData};
use crate::{FillError, PdfEnv, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;

#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Filled(WidgetHandle),
    /// 新增的控件；图片没有句柄
    Added(Option<WidgetHandle>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillReport {
    pub filled: usize,
    pub added: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// 默认外观字符串：`/<字体> <字号> Tf <r> <g> <b> rg`
pub fn da_string(font: &FontSpec, color: &Color) -> String {
    format!(
        "/{} {} Tf {} {} {} rg",
        font.name, font.size, color[0], color[1], color[2]
    )
}

/// 执行一条填充请求
///
/// 找不到控件时不修改文档。
pub fn fill_field<D: FormDocument>(env: &mut PdfEnv<D>, request: &FillRequest) -> Result<FillOutcome> {
    match request {
        FillRequest::ById { page, id, value } => {
            let widget = locate::find_widget_id(&env.doc, *page, *id)?
                .ok_or_else(|| FillError::FieldNotFound(format!("{}.{}", page, id)))?;
            set_widget_value(env, &widget, value)
        }
        FillRequest::ByName { name, value } => {
            let widget = find_named(env, name)?
                .ok_or_else(|| FillError::FieldNotFound(name.clone()))?;
            set_widget_value(env, &widget, value)
        }
        FillRequest::AddTextField(text) => {
            add_textfield(env, text).map(|handle| FillOutcome::Added(Some(handle)))
        }
        FillRequest::AddSignature(sig) => {
            add_signature(env, sig).map(|handle| FillOutcome::Added(Some(handle)))
        }
        FillRequest::AddImage(image) => add_image(env, image).map(|_| FillOutcome::Added(None)),
        FillRequest::Invalid { reason } => {
            env.fill.err_msg = Some(reason.clone());
            Err(FillError::InvalidRequest(reason.clone()))
        }
    }
}

/// 名称查找：指定了页面时只查该页，否则按页序查找第一个命中
fn find_named<D: FormDocument>(env: &PdfEnv<D>, name: &str) -> Result<Option<Widget>> {
    let pages = match env.requested_page {
        Some(page) => page..page + 1,
        None => 0..env.doc.page_count(),
    };
    for page in pages {
        if let Some(widget) = locate::find_widget_name(&env.doc, page, name)? {
            return Ok(Some(widget));
        }
    }
    Ok(None)
}

pub fn set_widget_value<D: FormDocument>(
    env: &mut PdfEnv<D>,
    widget: &Widget,
    value: &str,
) -> Result<FillOutcome> {
    if !env.doc.set_widget_value(widget, value)? {
        return Err(FillError::SetRejected(format!(
            "{} ({}) = {:?}",
            widget.name,
            widget.kind.as_str(),
            value
        )));
    }
    log::info!(
        "page {} widget {} `{}` <- {:?}",
        widget.page,
        widget.index,
        widget.name,
        value
    );
    env.fill.touched.insert(widget.handle);
    Ok(FillOutcome::Filled(widget.handle))
}

pub fn add_textfield<D: FormDocument>(env: &mut PdfEnv<D>, text: &TextData) -> Result<WidgetHandle> {
    env.check_page(text.page)?;
    let handle = env.doc.add_text_field(text)?;
    if !text.editable {
        env.fill.touched.insert(handle);
    }
    log::info!("added text field {:?} on page {} at {:?}", handle, text.page, text.pos);
    Ok(handle)
}

pub fn add_signature<D: FormDocument>(
    env: &mut PdfEnv<D>,
    sig: &SignatureData,
) -> Result<WidgetHandle> {
    env.check_page(sig.page)?;
    let handle = env.doc.add_signature_field(sig)?;
    if let Some((previous, _)) = env.fill.signature.replace((handle, sig.clone())) {
        log::warn!("signature field {:?} replaced by {:?} as signing target", previous, handle);
    }
    log::info!("added signature field {:?} on page {} at {:?}", handle, sig.page, sig.pos);
    Ok(handle)
}

pub fn add_image<D: FormDocument>(env: &mut PdfEnv<D>, image: &ImageData) -> Result<()> {
    env.check_page(image.page)?;
    env.doc.add_image(image)?;
    log::info!("added image {} on page {} at {:?}", image.file_name, image.page, image.pos);
    Ok(())
}

/// 读取整份填充数据
///
/// 对象按文件中的键顺序展开；数组的每个元素是一条请求对象。
/// JSON 解析失败直接返回错误。
pub fn read_requests<R: Read>(
    reader: R,
    template: Option<&Value>,
    defaults: &FillDefaults,
) -> Result<Vec<(String, FillRequest)>> {
    let data: Value = serde_json::from_reader(reader)?;
    let entries: Vec<(String, Value)> = match data {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items.into_iter().map(|v| (String::new(), v)).collect(),
        _ => {
            return Err(FillError::InvalidRequest(
                "fill data must be a JSON object or array".to_string(),
            ))
        }
    };
    Ok(entries
        .into_iter()
        .map(|(key, value)| {
            let request = resolve_fill_data(&key, &value, template, defaults);
            (key, request)
        })
        .collect())
}

/// 逐条执行请求；单条的形状错误或查找失败记录后跳过，新增控件失败与文档错误直接返回
pub fn apply_requests<D: FormDocument>(
    env: &mut PdfEnv<D>,
    requests: &[(String, FillRequest)],
    report: &mut FillReport,
) -> Result<()> {
    for (key, request) in requests {
        let key = if key.is_empty() {
            request.describe()
        } else {
            key.clone()
        };
        env.fill.input_key = Some(key.clone());
        env.fill.input_data = match request {
            FillRequest::ById { value, .. } | FillRequest::ByName { value, .. } => {
                Some(value.clone())
            }
            _ => None,
        };
        match fill_field(env, request) {
            Ok(FillOutcome::Filled(_)) => report.filled += 1,
            Ok(FillOutcome::Added(_)) => report.added += 1,
            Err(err) if err.is_recoverable() && !request.is_addition() => {
                log::warn!("skipping `{}`: {}", key, err);
                report.skipped.push(SkippedEntry {
                    key,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// 批量填充：先写全部字段，再执行新增控件的请求
pub fn fill_all<D: FormDocument, R: Read>(
    env: &mut PdfEnv<D>,
    reader: R,
    template: Option<&Value>,
) -> Result<FillReport> {
    let requests = read_requests(reader, template, &env.defaults)?;
    let (additions, fields): (Vec<_>, Vec<_>) =
        requests.into_iter().partition(|(_, r)| r.is_addition());
    let mut report = FillReport::default();
    apply_requests(env, &fields, &mut report)?;
    apply_requests(env, &additions, &mut report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryForm;
    use crate::types::{FillType, PosData};
    use crate::{Command, FilesEnv};
    use serde_json::json;

    fn env(pages: Vec<Vec<&str>>) -> PdfEnv<MemoryForm> {
        PdfEnv::new(MemoryForm::new(pages), Command::Complete, FilesEnv::default())
    }

    #[test]
    fn test_da_string() {
        assert_eq!(
            da_string(&FontSpec::new("Helv", 9.0), &[0.0, 0.5, 1.0]),
            "/Helv 9 Tf 0 0.5 1 rg"
        );
    }

    #[test]
    fn test_fill_by_name_and_id() {
        let mut env = env(vec![vec!["name", "age"], vec!["city"]]);
        let outcome = fill_field(
            &mut env,
            &FillRequest::ByName {
                name: "city".into(),
                value: "Paris".into(),
            },
        )
        .unwrap();
        assert!(matches!(outcome, FillOutcome::Filled(_)));
        assert_eq!(env.doc.value_of("city").as_deref(), Some("Paris"));

        fill_field(
            &mut env,
            &FillRequest::ById {
                page: 0,
                id: 1,
                value: "36".into(),
            },
        )
        .unwrap();
        assert_eq!(env.doc.value_of("age").as_deref(), Some("36"));
        assert_eq!(env.fill.touched.len(), 2);
    }

    #[test]
    fn test_fill_missing_field_leaves_document() {
        let mut env = env(vec![vec!["a", "b", "c"]]);
        let before = env.doc.snapshot();
        let err = fill_field(
            &mut env,
            &FillRequest::ById {
                page: 0,
                id: 5,
                value: "x".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FillError::FieldNotFound(_)));
        assert_eq!(env.doc.snapshot(), before);
        assert!(env.fill.touched.is_empty());
    }

    #[test]
    fn test_requested_page_limits_name_lookup() {
        let mut env = env(vec![vec!["a"], vec!["b"]]).with_page(Some(0));
        let err = fill_field(
            &mut env,
            &FillRequest::ByName {
                name: "b".into(),
                value: "x".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FillError::FieldNotFound(_)));
    }

    #[test]
    fn test_invalid_request_sets_err_msg() {
        let mut env = env(vec![vec!["a"]]);
        let err = fill_field(&mut env, &FillRequest::invalid("bad")).unwrap_err();
        assert!(matches!(err, FillError::InvalidRequest(_)));
        assert_eq!(env.fill.err_msg.as_deref(), Some("bad"));
    }

    #[test]
    fn test_add_on_missing_page() {
        let mut env = env(vec![vec!["a"]]);
        let text = TextData {
            pos: PosData::new(0.0, 0.0, 10.0, 10.0),
            editable: false,
            font: FontSpec::new("Helv", 9.0),
            color: [0.0; 3],
            widget_name: None,
            value: String::new(),
            page: 3,
        };
        let err = add_textfield(&mut env, &text).unwrap_err();
        assert!(matches!(err, FillError::PageOutOfRange { page: 3, count: 1 }));
    }

    #[test]
    fn test_fill_all_skips_and_counts() {
        let mut env = env(vec![vec!["name", "age"]]);
        let data = json!({
            "name": "Ada",
            "missing": "x",
            "age": 36,
            "bad": [1, 2],
            "note": {"add": "textfield", "left": 10, "top": 300, "editable": true, "value": "hi"}
        });
        let report = fill_all(&mut env, data.to_string().as_bytes(), None).unwrap();
        assert_eq!(report.filled, 2);
        assert_eq!(report.added, 1);
        let skipped: Vec<_> = report.skipped.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(skipped, vec!["missing", "bad"]);
        assert_eq!(env.doc.value_of("age").as_deref(), Some("36"));
        // 可编辑的新文本框不参与展平
        assert_eq!(env.fill.touched.len(), 2);
    }

    #[test]
    fn test_fill_all_parse_failure_aborts() {
        let mut env = env(vec![vec!["name"]]);
        let err = fill_all(&mut env, "{\"name\": ".as_bytes(), None).unwrap_err();
        assert!(matches!(err, FillError::DataParse(_)));
        assert!(env.doc.value_of("name").is_none());
    }

    #[test]
    fn test_read_requests_array_entries() {
        let data = json!([{"id": 0, "value": "x"}, {"name": "n", "value": "y"}, {"foo": 1}]);
        let requests =
            read_requests(data.to_string().as_bytes(), None, &FillDefaults::default())
                .unwrap();
        let types: Vec<_> = requests.iter().map(|(_, r)| r.fill_type()).collect();
        assert_eq!(
            types,
            vec![FillType::FieldId, FillType::FieldName, FillType::Invalid]
        );
    }
}
