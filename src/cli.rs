use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use pdffill_core::{Command, FilesEnv};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pdffill")]
#[command(about = "Fill, annotate and sign PDF forms", long_about = None)]
#[command(version)]
pub struct Args {
    /// Config file (defaults to $PDFFILL_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only visit this page (0-based)
    #[arg(long, global = true, value_name = "N")]
    pub page: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Label every field with its page.index id and save a copy
    AnnotateFields {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// List fields as JSON
    JsonList(ListArgs),

    /// Print a fill template keyed by field name
    JsonMap(ListArgs),

    /// List fonts referenced by field appearances
    FontList(ListArgs),

    /// Fill from a data file or a single key/value pair
    Complete(CompleteArgs),

    /// Fill from JSON read on stdin
    CompleteStdin(StdinArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    pub input: PathBuf,

    /// Write the JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Default)]
pub struct SigningArgs {
    /// PKCS#12 certificate used to sign the output
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Certificate password
    #[arg(long, requires = "cert")]
    pub password: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct CompleteArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    /// JSON fill data
    #[arg(long, value_name = "FILE", conflicts_with = "key")]
    pub data: Option<PathBuf>,

    /// JSON template merged under every request
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Field name, index or page.index
    #[arg(long, requires = "value")]
    pub key: Option<String>,

    /// Field value, or a JSON object request
    #[arg(long, requires = "key", allow_hyphen_values = true)]
    pub value: Option<String>,

    #[command(flatten)]
    pub signing: SigningArgs,
}

#[derive(ClapArgs, Debug)]
pub struct StdinArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    #[command(flatten)]
    pub signing: SigningArgs,
}

impl Commands {
    pub fn command(&self) -> Command {
        match self {
            Commands::AnnotateFields { .. } => Command::AnnotateFields,
            Commands::JsonList(_) => Command::JsonList,
            Commands::JsonMap(_) => Command::JsonMap,
            Commands::FontList(_) => Command::FontList,
            Commands::Complete(_) => Command::Complete,
            Commands::CompleteStdin(_) => Command::CompleteStdin,
        }
    }

    pub fn files(&self) -> FilesEnv {
        match self {
            Commands::AnnotateFields { input, output } => FilesEnv {
                input: input.clone(),
                output: Some(output.clone()),
                ..Default::default()
            },
            Commands::JsonList(args) | Commands::JsonMap(args) | Commands::FontList(args) => {
                FilesEnv {
                    input: args.input.clone(),
                    output: args.output.clone(),
                    ..Default::default()
                }
            }
            Commands::Complete(args) => FilesEnv {
                input: args.input.clone(),
                output: Some(args.output.clone()),
                data: args.data.clone(),
                template: args.template.clone(),
                cert: args.signing.cert.clone(),
                cert_password: args.signing.password.clone(),
            },
            Commands::CompleteStdin(args) => FilesEnv {
                input: args.input.clone(),
                output: Some(args.output.clone()),
                data: None,
                template: args.template.clone(),
                cert: args.signing.cert.clone(),
                cert_password: args.signing.password.clone(),
            },
        }
    }
}

/// `--value` 若是 JSON 对象则按请求解析，否则当作纯文本
pub fn single_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::String(raw.to_string()),
    }
}
