use crate::mei::primitive_parser::decode_text;
use crate::oracle::{Oracle, PitchGrids, SpelledPitch, SpellingRequest};
use crate::transcriber::tuning::{Mode, Tuning};
use crate::DiplomatError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

const PITCH_KEY_TOOLS: &str = "tools.music.PitchKeyTools";
const CONVERTER: &str = "tbp.editor.Editor";
// the Java side cannot take empty arguments
const EMPTY_ARG: &str = "__EMPTY__";
// converter options, always passed with their default values
const CONVERTER_OPTIONS: &str = "-u -t -y -h";
const CONVERTER_DEFAULTS: &str = "i y i n/a";

/// Oracle backed by the abtab Java tools, one JVM run per request.
#[derive(Debug, Clone)]
pub struct JavaOracle {
    java: String,
    classpath: String,
    dev: bool,
}

#[derive(Deserialize)]
struct Converted {
    content: String,
}

impl JavaOracle {
    pub fn new(java: impl Into<String>, classpath: impl Into<String>, dev: bool) -> Self {
        Self {
            java: java.into(),
            classpath: classpath.into(),
            dev,
        }
    }

    fn command_line(&self, class: &str, args: &[String]) -> Vec<String> {
        let mut line = vec![
            "-cp".to_string(),
            self.classpath.clone(),
            class.to_string(),
            self.dev.to_string(),
        ];
        line.extend(args.iter().map(|arg| {
            if arg.is_empty() {
                EMPTY_ARG.to_string()
            } else {
                arg.clone()
            }
        }));
        line
    }

    /// Runs `class` and parses its stdout as JSON.
    fn call(&self, class: &str, args: &[String]) -> Result<serde_json::Value, DiplomatError> {
        let line = self.command_line(class, args);
        log::debug!("Calling {} {}", self.java, line.join(" "));
        let output = Command::new(&self.java).args(&line).output().map_err(|err| {
            DiplomatError::OracleError(format!("could not run {}: {err}", self.java))
        })?;
        let stdout = decode_text(&output.stdout);
        let stderr = decode_text(&output.stderr);
        if !output.status.success() {
            return Err(DiplomatError::OracleError(format!(
                "{class} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        serde_json::from_str(&stdout).map_err(|err| {
            DiplomatError::OracleError(format!(
                "{class} answered with non-JSON output ({err}): {}",
                stderr.trim()
            ))
        })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Oracle for JavaOracle {
    fn convert(&self, source: &Path) -> Result<String, DiplomatError> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let args = [
            CONVERTER_OPTIONS.to_string(),
            CONVERTER_DEFAULTS.to_string(),
            String::new(),
            "false".to_string(),
            path_arg(source),
            format!("{stem}.mei"),
        ];
        let converted: Converted = serde_json::from_value(self.call(CONVERTER, &args)?)?;
        Ok(converted.content)
    }

    fn estimate_key(&self, tuning: Tuning, source: &Path) -> Result<i32, DiplomatError> {
        let args = ["key".to_string(), tuning.label().to_string(), path_arg(source)];
        let answer = self.call(PITCH_KEY_TOOLS, &args)?;
        crate::oracle::int_or_string(answer).map_err(|err| {
            DiplomatError::OracleError(format!("key estimation did not return a key: {err}"))
        })
    }

    fn pitch_grids(&self, key: i32, mode: Mode) -> Result<PitchGrids, DiplomatError> {
        let args = [
            "grids".to_string(),
            key.to_string(),
            mode.oracle_code().to_string(),
        ];
        Ok(serde_json::from_value(self.call(PITCH_KEY_TOOLS, &args)?)?)
    }

    fn spell(
        &self,
        request: &SpellingRequest<'_>,
    ) -> Result<HashMap<String, SpelledPitch>, DiplomatError> {
        let args = [
            "pitch".to_string(),
            serde_json::to_string(request.notes)?,
            request.key.to_string(),
            serde_json::to_string(&request.grids.mpc_grid)?,
            serde_json::to_string(&request.grids.alt_grid)?,
            serde_json::to_string(&request.grids.pc_grid)?,
            request.layout.oracle_code().to_string(),
        ];
        Ok(serde_json::from_value(self.call(PITCH_KEY_TOOLS, &args)?)?)
    }
}
