use std::{fs::File, io::Read, path::Path};

use anyhow::{anyhow, Context, Result};
use tracing::info;

use super::{Interpreter, Value};

/// Runs a source file in the global environment so its bindings are visible to what follows
pub fn load_prelude(interpreter: &mut Interpreter, path: &Path) -> Result<()> {
    let mut file = File::open(path)
        .with_context(|| format!("Unable to open prelude {}", path.display()))?;
    let mut source = String::new();
    file.read_to_string(&mut source)
        .with_context(|| format!("Unable to read prelude {}", path.display()))?;

    match interpreter.eval_source(&source) {
        Ok(Some(Value::Error(error))) => {
            Err(anyhow!(error)).with_context(|| format!("Unable to load prelude {}", path.display()))
        }
        Ok(_) => {
            info!(path = %path.display(), "loaded prelude");
            Ok(())
        }
        Err(errors) => {
            let details = errors
                .0
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            Err(anyhow!(errors))
                .context(details)
                .with_context(|| format!("Unable to parse prelude {}", path.display()))
        }
    }
}

#[cfg(test)]
mod test {
    use std::{env, fs, process};

    use super::*;
    use crate::interpreter::CaptureOutput;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("monkey-{}-{}.mk", process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_prelude_bindings_are_global() {
        let path = write_temp("double", "let double = fn(x) { x * 2 };");
        let mut interpreter = Interpreter::with_output(CaptureOutput::new());
        load_prelude(&mut interpreter, &path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(
            Some(Value::Integer(42)),
            interpreter.eval_source("double(21)").unwrap()
        );
    }

    #[test]
    fn test_prelude_runtime_error() {
        let path = write_temp("broken", "let x = 1 + true;");
        let mut interpreter = Interpreter::with_output(CaptureOutput::new());
        let error = load_prelude(&mut interpreter, &path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(format!("{:#}", error).contains("type mismatch: INTEGER + BOOLEAN"));
    }

    #[test]
    fn test_prelude_syntax_error() {
        let path = write_temp("syntax", "let = 1;");
        let mut interpreter = Interpreter::with_output(CaptureOutput::new());
        let error = load_prelude(&mut interpreter, &path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(error.to_string().starts_with("Unable to parse prelude"));
        assert!(format!("{:#}", error).contains("1 syntax error"));
    }

    #[test]
    fn test_missing_prelude() {
        let mut interpreter = Interpreter::with_output(CaptureOutput::new());
        let error = load_prelude(&mut interpreter, Path::new("/nonexistent/prelude.mk")).unwrap_err();
        assert!(error.to_string().starts_with("Unable to open prelude"));
    }
}
