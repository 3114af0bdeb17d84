//! pdffill 命令行入口

pub mod cli;
pub mod config;
pub mod signer;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{single_value, Args, Commands};
use config::AppConfig;
use pdffill_core::complete::check_output_path;
use pdffill_core::{complete, traverse, visitor_for, FillSource, PdfEnv};
use pdffill_pdf::PdfForm;
use signer::OpensslProvider;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// 解析参数并执行；返回进程退出码
///
/// 参数错误由 clap 直接以 2 退出。
pub fn run() -> i32 {
    let args = Args::parse();
    let config = match config::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            return 1;
        }
    };
    init_logging(args.verbose, config.log_level.as_deref());

    match execute(&args, &config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {:#}", err);
            1
        }
    }
}

fn init_logging(verbose: u8, configured: Option<&str>) {
    let mut builder = match verbose {
        0 => env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(configured.unwrap_or("warn")),
        ),
        n => {
            let mut builder = env_logger::Builder::new();
            builder.parse_filters(match n {
                1 => "info",
                2 => "debug",
                _ => "trace",
            });
            builder
        }
    };
    builder
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .try_init()
        .ok();
}

pub fn execute(args: &Args, config: &AppConfig) -> Result<()> {
    let cmd = args.command.command();
    let files = args.command.files();
    let form = PdfForm::load(&files.input)
        .with_context(|| format!("cannot open {}", files.input.display()))?;
    let listing_output = files.output.clone();
    let mut env = PdfEnv::new(form, cmd, files)
        .with_page(args.page)
        .with_defaults(config.defaults.clone());

    let source = match &args.command {
        Commands::Complete(complete) => match (&complete.key, &complete.value, &complete.data) {
            (Some(key), Some(value), _) => FillSource::Single {
                key: key.clone(),
                value: single_value(value),
            },
            (_, _, Some(path)) => {
                let file = File::open(path)
                    .with_context(|| format!("cannot open data {}", path.display()))?;
                FillSource::Data(Box::new(file))
            }
            _ => FillSource::Empty,
        },
        Commands::CompleteStdin(_) => FillSource::Data(Box::new(io::stdin())),
        _ => {
            if listing_output.is_some() {
                check_output_path(&env.files)?;
            }
            let mut visitor = visitor_for(cmd)
                .with_context(|| format!("{} has no field visitor", cmd.name()))?;
            traverse(&mut env, visitor.as_mut())
                .with_context(|| format!("{} failed", cmd.name()))?;
            if let Some(value) = visitor.take_output() {
                write_json(&value, listing_output.as_deref())?;
            }
            return Ok(());
        }
    };

    let provider = OpensslProvider::new(config.openssl_path.clone(), config.signature_size);
    let report = complete(&mut env, source, Some(&provider))
        .with_context(|| format!("{} failed", cmd.name()))?;
    log::info!(
        "filled {}, added {}, skipped {}, signed: {}",
        report.filled,
        report.added,
        report.skipped.len(),
        report.signed
    );
    Ok(())
}

fn write_json(value: &serde_json::Value, output: Option<&Path>) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(())
}
