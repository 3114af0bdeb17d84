//! 完成流程
//!
//! 填充 → 新增控件 → 展平 → 签名（可选）→ 保存。
//! 任一步失败都不会写出输出文件。

use crate::document::{FormDocument, SignRequest, WidgetHandle};
use crate::fill::{self, FillOutcome, FillReport, SkippedEntry};
use crate::map_input::{is_all_digits, resolve_fill_data};
use crate::sign::{Credential, SignError, SignerProvider};
use crate::types::{FillRequest, PosData, SignatureData};
use crate::{FilesEnv, FillError, PdfEnv, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

/// 填充数据来源
pub enum FillSource {
    /// 命令行给出的单个字段
    Single { key: String, value: Value },
    /// 数据文件或标准输入
    Data(Box<dyn Read>),
    /// 不填充，只展平、签名并保存
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    #[default]
    Opened,
    Iterating,
    Adding,
    Flattening,
    Signing,
    Saved,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub filled: usize,
    pub added: usize,
    pub skipped: Vec<SkippedEntry>,
    pub signed: bool,
    pub state: CompletionState,
}

impl CompletionReport {
    fn new() -> Self {
        Self {
            filled: 0,
            added: 0,
            skipped: Vec::new(),
            signed: false,
            state: CompletionState::Opened,
        }
    }

    fn enter(&mut self, state: CompletionState) {
        log::debug!("completion: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn absorb(&mut self, report: FillReport) {
        self.filled += report.filled;
        self.added += report.added;
        self.skipped.extend(report.skipped);
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if let Ok(real) = path.canonicalize() {
        return Ok(real);
    }
    let base = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    // 输出文件通常还不存在，规范化其父目录
    match (base.parent().and_then(|p| p.canonicalize().ok()), base.file_name()) {
        (Some(parent), Some(name)) => Ok(parent.join(name)),
        _ => Ok(base),
    }
}

/// 输出路径必须给出且不同于输入路径
pub fn check_output_path(files: &FilesEnv) -> Result<PathBuf> {
    let output = files.output.as_ref().ok_or(FillError::MissingOutput)?;
    if absolute(output)? == absolute(&files.input)? {
        return Err(FillError::SameOutputPath(output.clone()));
    }
    Ok(output.clone())
}

pub fn load_template(files: &FilesEnv) -> Result<Option<Value>> {
    match &files.template {
        Some(path) => {
            let bytes = std::fs::read(path)?;
            Ok(Some(serde_json::from_slice(&bytes)?))
        }
        None => Ok(None),
    }
}

/// 执行一次完整的填充并保存
///
/// `provider` 为 `None` 时遇到证书直接报签名错误。
/// 结束状态同时记在 `env.fill.state`，失败时为 `Failed`。
pub fn complete<D: FormDocument>(
    env: &mut PdfEnv<D>,
    source: FillSource,
    provider: Option<&dyn SignerProvider>,
) -> Result<CompletionReport> {
    let mut report = CompletionReport::new();
    let result = run(env, source, provider, &mut report);
    if let Err(err) = &result {
        log::error!("completion failed while {:?}: {}", report.state, err);
        report.enter(CompletionState::Failed);
    }
    env.fill.state = report.state;
    result.map(|()| report)
}

fn run<D: FormDocument>(
    env: &mut PdfEnv<D>,
    source: FillSource,
    provider: Option<&dyn SignerProvider>,
    report: &mut CompletionReport,
) -> Result<()> {
    let output = check_output_path(&env.files)?;
    let template = load_template(&env.files)?;

    report.enter(CompletionState::Iterating);
    match source {
        FillSource::Single { key, value } => {
            let request = single_request(env, &key, &value, template.as_ref());
            env.fill.input_key = Some(key);
            if request.is_addition() {
                report.enter(CompletionState::Adding);
            }
            match fill::fill_field(env, &request)? {
                FillOutcome::Filled(_) => report.filled += 1,
                FillOutcome::Added(_) => report.added += 1,
            }
        }
        FillSource::Data(reader) => {
            let requests = fill::read_requests(reader, template.as_ref(), &env.defaults)?;
            let (additions, fields): (Vec<_>, Vec<_>) =
                requests.into_iter().partition(|(_, r)| r.is_addition());
            let mut fill_report = FillReport::default();
            fill::apply_requests(env, &fields, &mut fill_report)?;
            if !additions.is_empty() {
                report.enter(CompletionState::Adding);
                fill::apply_requests(env, &additions, &mut fill_report)?;
            }
            report.absorb(fill_report);
        }
        FillSource::Empty => {}
    }

    report.enter(CompletionState::Flattening);
    flatten(env)?;

    let signing = match credential(env) {
        Some(credential) => {
            report.enter(CompletionState::Signing);
            let provider = provider.ok_or(SignError::Unavailable)?;
            let signer = provider.signer_for(&credential)?;
            let (field, sig) = signature_field(env)?;
            log::info!("signing with {}", credential.cert.display());
            Some((field, sig, signer, provider.reserve()))
        }
        None => None,
    };

    let request = signing.as_ref().map(|(field, sig, signer, reserve)| SignRequest {
        field: *field,
        signer: signer.as_ref(),
        reason: sig.reason.clone(),
        location: sig.location.clone(),
        reserve: *reserve,
    });
    report.signed = request.is_some();
    env.doc.save(&output, request)?;
    report.enter(CompletionState::Saved);
    log::info!(
        "saved {} ({} filled, {} added, {} skipped)",
        output.display(),
        report.filled,
        report.added,
        report.skipped.len()
    );
    Ok(())
}

/// 单字段请求；纯数字键在指定页面时按该页查找
fn single_request<D: FormDocument>(
    env: &PdfEnv<D>,
    key: &str,
    value: &Value,
    template: Option<&Value>,
) -> FillRequest {
    let request = resolve_fill_data(key, value, template, &env.defaults);
    match (request, env.requested_page) {
        (FillRequest::ById { id, value, .. }, Some(page)) if is_all_digits(key) => {
            FillRequest::ById { page, id, value }
        }
        (request, _) => request,
    }
}

fn flatten<D: FormDocument>(env: &mut PdfEnv<D>) -> Result<()> {
    let touched: Vec<WidgetHandle> = env.fill.touched.iter().copied().collect();
    for handle in &touched {
        env.doc.set_read_only(*handle, true)?;
    }
    log::info!("flattened {} field(s)", touched.len());
    Ok(())
}

/// 签名请求中的证书优先，其次是命令行证书
fn credential<D: FormDocument>(env: &PdfEnv<D>) -> Option<Credential> {
    if let Some((_, sig)) = &env.fill.signature {
        if let Some(file) = &sig.file {
            return Some(Credential {
                cert: PathBuf::from(file),
                password: sig.password.clone().unwrap_or_default(),
            });
        }
    }
    env.files.cert.as_ref().map(|cert| Credential {
        cert: cert.clone(),
        password: env.files.cert_password.clone().unwrap_or_default(),
    })
}

/// 签名目标；没有签名请求时在首页加一个不可见签名域
fn signature_field<D: FormDocument>(env: &mut PdfEnv<D>) -> Result<(WidgetHandle, SignatureData)> {
    if let Some(found) = &env.fill.signature {
        return Ok(found.clone());
    }
    let sig = SignatureData {
        pos: PosData::default(),
        widget_name: None,
        font: env.defaults.font(),
        file: None,
        password: None,
        visible: false,
        page: 0,
        image: None,
        reason: None,
        location: None,
    };
    let handle = fill::add_signature(env, &sig)?;
    Ok((handle, sig))
}
