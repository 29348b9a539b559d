use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::PatchError;
use crate::format::module::ExtensionModule;

/// Values the extension module is assembled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildParams {
    /// Size of the unpatched image; the module is placed right after it.
    pub image_size: usize,
    /// Load address of the game's key handler, called back by the module.
    pub key_handler: u16,
}

/// Produces the extension module appended to the game image.
pub trait ModuleBuilder {
    /// # Errors
    /// Returns `PatchError::BuilderFailure` when the module cannot be produced.
    fn build(&self, params: &BuildParams) -> Result<ExtensionModule, PatchError>;
}

/// Assembles the module from source with NASM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NasmBuilder {
    pub program: OsString,
    pub source: PathBuf,
    pub output: PathBuf,
}

impl Default for NasmBuilder {
    fn default() -> Self {
        Self {
            program: OsString::from("nasm"),
            source: PathBuf::from("patch.asm"),
            output: PathBuf::from("patch.bin"),
        }
    }
}

impl NasmBuilder {
    pub const ENV_PROGRAM: &'static str = "KBFIX_NASM";
    pub const ENV_SOURCE: &'static str = "KBFIX_PATCH_SOURCE";
    pub const ENV_OUTPUT: &'static str = "KBFIX_PATCH_OUTPUT";

    /// Defaults, overridden by `KBFIX_NASM`, `KBFIX_PATCH_SOURCE` and `KBFIX_PATCH_OUTPUT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let defaults = Self::default();
        Self {
            program: lookup(Self::ENV_PROGRAM).unwrap_or(defaults.program),
            source: lookup(Self::ENV_SOURCE).map_or(defaults.source, PathBuf::from),
            output: lookup(Self::ENV_OUTPUT).map_or(defaults.output, PathBuf::from),
        }
    }

    fn command(&self, params: &BuildParams) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("-dGAME_SIZE={}", params.image_size))
            .arg(format!("-dGAME_KEY_HANDLER={}", params.key_handler))
            .args(["-f", "bin", "-o"])
            .arg(&self.output)
            .arg(&self.source);
        cmd
    }

    fn failure(&self, reason: impl Into<String>) -> PatchError {
        PatchError::BuilderFailure {
            program: self.program.to_string_lossy().into_owned(),
            reason: reason.into(),
        }
    }
}

impl ModuleBuilder for NasmBuilder {
    fn build(&self, params: &BuildParams) -> Result<ExtensionModule, PatchError> {
        let mut cmd = self.command(params);
        debug!(?cmd, "assembling extension module");
        let status = cmd
            .status()
            .map_err(|err| self.failure(format!("could not start: {err}")))?;
        if !status.success() {
            return Err(self.failure(format!("exited with {status}")));
        }
        let bytes = std::fs::read(&self.output).map_err(|err| {
            self.failure(format!("could not read {}: {err}", self.output.display()))
        })?;
        Ok(ExtensionModule::parse(bytes)?)
    }
}

/// A module assembled ahead of time, handed out unchanged for every build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedModule {
    bytes: Vec<u8>,
}

impl FixedModule {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl ModuleBuilder for FixedModule {
    fn build(&self, _params: &BuildParams) -> Result<ExtensionModule, PatchError> {
        Ok(ExtensionModule::parse(self.bytes.clone())?)
    }
}
