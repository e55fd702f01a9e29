//! Optional external optimizers.
//!
//! After the built-in encoder has written a compressed staging file, a
//! command-line tool may shrink it further:
//!
//! - `pngquant` for PNG compression, with a quality range derived from the
//!   compress level.
//! - `cwebp` as a second pass over lossy WebP at the same quality.
//!
//! Tools are located on `PATH` once, when the optimizer is built. Every step
//! is best effort: a missing tool, a non-zero exit, or a result that is empty
//! or no smaller than the plain encode leaves the plain encode in place and
//! logs why.

use super::params::EncodeOptions;
use crate::config::OptimizerConfig;
use crate::staging::StagedFile;
use crate::types::TargetFormat;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// pngquant exit codes meaning "result would be too large / too ugly".
const PNGQUANT_KEPT_ORIGINAL: [i32; 2] = [98, 99];

#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    pngquant: Option<PathBuf>,
    cwebp: Option<PathBuf>,
}

impl Optimizer {
    /// An optimizer that never runs anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Locate the configured tools on `PATH`.
    pub fn detect(config: &OptimizerConfig) -> Self {
        if !config.enabled {
            debug!("external optimizers disabled");
            return Self::disabled();
        }
        Self {
            pngquant: locate(&config.pngquant),
            cwebp: locate(&config.cwebp),
        }
    }

    pub fn with_pngquant(mut self, program: impl Into<PathBuf>) -> Self {
        self.pngquant = Some(program.into());
        self
    }

    pub fn with_cwebp(mut self, program: impl Into<PathBuf>) -> Self {
        self.cwebp = Some(program.into());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.pngquant.is_some() || self.cwebp.is_some()
    }

    /// Post-process a freshly encoded staging file in place.
    ///
    /// Returns the name of the tool that rewrote `staged`, or `None` when
    /// the plain encode was kept.
    pub fn optimize(
        &self,
        staged: &Path,
        format: TargetFormat,
        options: &EncodeOptions,
    ) -> Option<&'static str> {
        match (format, options) {
            (TargetFormat::Png, EncodeOptions::Png { compress_level }) => {
                let program = self.pngquant.as_deref()?;
                let range = compress_level.quant_range();
                run_tool("pngquant", program, staged, |out| {
                    vec![
                        OsString::from(format!("--quality={range}")),
                        "--force".into(),
                        "--skip-if-larger".into(),
                        "--strip".into(),
                        "--output".into(),
                        out.into(),
                        "--".into(),
                        staged.into(),
                    ]
                })
            }
            (TargetFormat::Webp, EncodeOptions::Lossy { quality }) => {
                let program = self.cwebp.as_deref()?;
                let q = quality.value().to_string();
                run_tool("cwebp", program, staged, |out| {
                    vec![
                        OsString::from("-quiet"),
                        "-q".into(),
                        q.into(),
                        "-metadata".into(),
                        "none".into(),
                        staged.into(),
                        "-o".into(),
                        out.into(),
                    ]
                })
            }
            _ => None,
        }
    }
}

fn locate(program: &str) -> Option<PathBuf> {
    match which::which(program) {
        Ok(path) => {
            debug!(tool = program, path = %path.display(), "found optimizer");
            Some(path)
        }
        Err(e) => {
            debug!(tool = program, error = %e, "optimizer not available");
            None
        }
    }
}

/// Run `program` writing into a fresh staging sibling, then move the result
/// over `staged`.
fn run_tool(
    name: &'static str,
    program: &Path,
    staged: &Path,
    args: impl FnOnce(&Path) -> Vec<OsString>,
) -> Option<&'static str> {
    let out = match StagedFile::reserve(staged) {
        Ok(out) => out,
        Err(e) => {
            warn!(tool = name, error = %e, "could not reserve optimizer output");
            return None;
        }
    };

    let result = Command::new(program).args(args(out.path())).output();
    match result {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            let code = output.status.code();
            if name == "pngquant" && code.is_some_and(|c| PNGQUANT_KEPT_ORIGINAL.contains(&c)) {
                debug!(tool = name, ?code, "optimizer kept the plain encode");
            } else {
                warn!(
                    tool = name,
                    ?code,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "optimizer failed, keeping plain encode"
                );
            }
            return None;
        }
        Err(e) => {
            warn!(tool = name, error = %e, "could not run optimizer, keeping plain encode");
            return None;
        }
    }

    let plain_len = fs::metadata(staged).map(|m| m.len()).unwrap_or(u64::MAX);
    match fs::metadata(out.path()) {
        Ok(meta) if meta.len() == 0 => {
            warn!(tool = name, "optimizer produced no output, keeping plain encode");
            return None;
        }
        Ok(meta) if meta.len() >= plain_len => {
            debug!(
                tool = name,
                plain_len,
                optimized_len = meta.len(),
                "no gain, keeping plain encode"
            );
            return None;
        }
        Ok(_) => {}
        Err(e) => {
            warn!(tool = name, error = %e, "optimizer output unreadable, keeping plain encode");
            return None;
        }
    }

    match out.persist(staged) {
        Ok(()) => {
            debug!(tool = name, path = %staged.display(), "optimized");
            Some(name)
        }
        Err(e) => {
            warn!(tool = name, error = %e, "could not replace staged file");
            None
        }
    }
}
