//! openssl 命令行签名
//!
//! PKCS#12 先解成临时 PEM，再用 `openssl cms` 生成 DER 格式的分离签名。

use pdffill_core::{Credential, SignError, Signer, SignerProvider};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const PASSWORD_ENV: &str = "PDFFILL_P12_PASSWORD";

fn run(cmd: &mut Command) -> Result<Output, SignError> {
    cmd.output().map_err(|err| match err.kind() {
        ErrorKind::NotFound => SignError::Unavailable,
        _ => SignError::Tool(err.to_string()),
    })
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

pub struct OpensslSigner {
    binary: PathBuf,
    /// 私钥与证书，随签名器一起删除
    pem: NamedTempFile,
}

impl OpensslSigner {
    pub fn new(binary: &Path, credential: &Credential) -> Result<Self, SignError> {
        if !credential.cert.is_file() {
            return Err(SignError::Credential(format!(
                "certificate not found: {}",
                credential.cert.display()
            )));
        }

        let pem = NamedTempFile::new()?;
        let output = run(Command::new(binary)
            .arg("pkcs12")
            .arg("-in")
            .arg(&credential.cert)
            .arg("-passin")
            .arg(format!("env:{}", PASSWORD_ENV))
            .arg("-nodes")
            .arg("-out")
            .arg(pem.path())
            .env(PASSWORD_ENV, &credential.password))?;

        if !output.status.success() {
            return Err(SignError::Credential(stderr_text(&output)));
        }
        log::debug!("unpacked {}", credential.cert.display());

        Ok(Self {
            binary: binary.to_path_buf(),
            pem,
        })
    }
}

impl Signer for OpensslSigner {
    fn sign(&self, content: &[u8]) -> Result<Vec<u8>, SignError> {
        let mut input = NamedTempFile::new()?;
        input.write_all(content)?;
        input.flush()?;

        let output = run(Command::new(&self.binary)
            .args(["cms", "-sign", "-binary", "-outform", "DER", "-md", "sha256"])
            .arg("-in")
            .arg(input.path())
            .arg("-signer")
            .arg(self.pem.path())
            .arg("-inkey")
            .arg(self.pem.path()))?;

        if !output.status.success() {
            return Err(SignError::Tool(stderr_text(&output)));
        }
        if output.stdout.is_empty() {
            return Err(SignError::Tool("openssl produced no signature".into()));
        }
        log::info!(
            "signed {} bytes, signature is {} bytes",
            content.len(),
            output.stdout.len()
        );
        Ok(output.stdout)
    }
}

pub struct OpensslProvider {
    binary: PathBuf,
    reserve: usize,
}

impl OpensslProvider {
    pub fn new(binary: impl Into<PathBuf>, reserve: usize) -> Self {
        Self {
            binary: binary.into(),
            reserve,
        }
    }
}

impl SignerProvider for OpensslProvider {
    fn signer_for(&self, credential: &Credential) -> Result<Box<dyn Signer>, SignError> {
        Ok(Box::new(OpensslSigner::new(&self.binary, credential)?))
    }

    fn reserve(&self) -> usize {
        self.reserve
    }
}
