//! Test doubles for tool runners and live reload.

use crate::context::BuildContext;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose;
use frontforge_config::BuildOptions;
use frontforge_core::{
    LiveReload, LogLine, LogSender, Result, ToolExit, ToolRunner, ToolSpec, Variant,
};
use futures::channel::mpsc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Behavior = Box<dyn Fn(&ToolSpec) -> ToolExit + Send + Sync>;

/// Records every invocation and emulates the default tools by writing the
/// files they would produce.
pub(crate) struct RecordingRunner {
    calls: Mutex<Vec<ToolSpec>>,
    behavior: Behavior,
}

impl RecordingRunner {
    pub fn new(behavior: impl Fn(&ToolSpec) -> ToolExit + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            behavior: Box::new(behavior),
        }
    }

    pub fn emulating() -> Self {
        Self::new(emulate_tool)
    }

    pub fn failing(label: &'static str) -> Self {
        Self::new(move |spec| {
            if spec.label == label {
                ToolExit::failure(Some(1))
            } else {
                emulate_tool(spec)
            }
        })
    }

    pub fn calls(&self) -> Vec<ToolSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call(&self, label: &str) -> Option<ToolSpec> {
        self.calls().into_iter().find(|c| c.label == label)
    }
}

#[async_trait]
impl ToolRunner for RecordingRunner {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn run(&self, spec: ToolSpec, _logs: LogSender) -> Result<ToolExit> {
        let exit = (self.behavior)(&spec);
        self.calls.lock().unwrap().push(spec);
        Ok(exit)
    }
}

fn arg_after<'a>(spec: &'a ToolSpec, flag: &str) -> Option<&'a str> {
    spec.args
        .iter()
        .position(|a| a == flag)
        .and_then(|idx| spec.args.get(idx + 1))
        .map(String::as_str)
}

fn write(path: &str, content: &str) {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Stand-ins for sass, browserify and uglifyjs with their default
/// argument templates.
pub(crate) fn emulate_tool(spec: &ToolSpec) -> ToolExit {
    let has = |flag: &str| spec.args.iter().any(|a| a == flag);
    match spec.label.as_str() {
        "styles" => {
            if let Some(output) = spec.args.iter().find(|a| a.ends_with(".css")) {
                let mut css = if has("--style=compressed") {
                    "body{color:red}".to_string()
                } else {
                    "body {\n  color: red;\n}\n".to_string()
                };
                if has("--embed-source-map") {
                    css.push_str("\n/*# sourceMappingURL=data:application/json;base64,e30= */\n");
                }
                write(output, &css);
            }
        }
        "scripts" => {
            if let Some(output) = arg_after(spec, "-o") {
                let mut js = "console.log( 'app' );\n".to_string();
                if has("--debug") {
                    let map = general_purpose::STANDARD
                        .encode(r#"{"version":3,"sources":["bootstrapper.js"]}"#);
                    js.push_str(&format!(
                        "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}\n",
                        map
                    ));
                }
                write(output, &js);
            }
        }
        "minifier" => {
            if let Some(output) = arg_after(spec, "-o") {
                write(output, "console.log(\"app\");");
            }
        }
        _ => {}
    }
    ToolExit::success()
}

/// Collects notified paths.
#[derive(Default)]
pub(crate) struct RecordingReload {
    pub paths: Mutex<Vec<String>>,
}

impl LiveReload for RecordingReload {
    fn notify(&self, paths: &[String]) {
        self.paths.lock().unwrap().extend(paths.iter().cloned());
    }
}

/// Create a project directory populated with `files`.
pub(crate) fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        write(&dir.path().join(rel).to_string_lossy(), content);
    }
    dir
}

pub(crate) fn context(
    root: &Path,
    variant: &str,
    runner: Arc<RecordingRunner>,
    watching: bool,
) -> (BuildContext, mpsc::UnboundedReceiver<LogLine>) {
    context_with(root, variant, runner, watching, BuildOptions::default())
}

pub(crate) fn context_with(
    root: &Path,
    variant: &str,
    runner: Arc<RecordingRunner>,
    watching: bool,
    options: BuildOptions,
) -> (BuildContext, mpsc::UnboundedReceiver<LogLine>) {
    let (logs, rx) = mpsc::unbounded();
    let ctx = BuildContext {
        variant: Variant::new(variant).unwrap(),
        watching,
        options: Arc::new(options),
        root: PathBuf::from(root),
        tools: runner,
        reload: None,
        logs,
    };
    (ctx, rx)
}
