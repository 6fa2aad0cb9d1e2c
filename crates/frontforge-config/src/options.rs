//! Build options parsing.

use crate::package::read_package_info;
use crate::{ConfigError, ConfigResult};
use frontforge_core::StepKind;
use kdl::{KdlDocument, KdlNode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Everything a build needs to know about the project. Immutable for the
/// duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    pub project: ProjectInfo,
    pub project_type: ProjectType,
    pub server_port: u16,
    pub live_reload_port: u16,
    pub paths: PathsConfig,
    /// Base file name of the css and js bundles (without extension).
    pub bundle_filename: String,
    /// Browser support list handed to the prefixer.
    pub autoprefixer: Vec<String>,
    /// Globs excluded from revisioning.
    pub revision_exclude: Vec<String>,
    pub manifest: Option<ManifestOptions>,
    pub post_build: Vec<PostBuildAction>,
    pub hooks: Hooks,
    pub analysis: AnalysisOptions,
    pub test: TestOptions,
    pub tools: ToolCommands,
    pub capabilities: Capabilities,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            project: ProjectInfo::default(),
            project_type: ProjectType::Frontend,
            server_port: 5000,
            live_reload_port: 35729,
            paths: PathsConfig::default(),
            bundle_filename: "main".to_string(),
            autoprefixer: vec!["last 2 versions".to_string(), "> 1%".to_string()],
            revision_exclude: Vec::new(),
            manifest: None,
            post_build: Vec::new(),
            hooks: Hooks::default(),
            analysis: AnalysisOptions::default(),
            test: TestOptions::default(),
            tools: ToolCommands::default(),
            capabilities: Capabilities::for_project(ProjectType::Frontend),
        }
    }
}

/// Project name and version, used in the release script header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// An application with views, styles, scripts and a dev server.
    Frontend,
    /// A library: only tests and analysis apply.
    Module,
}

/// Folder layout, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub distribution: String,
    pub temporary: String,
    pub bootstrappers: String,
    pub views: String,
    pub images: String,
    pub assets: String,
    pub styles: String,
    pub scripts: String,
    pub index: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            distribution: "dist".to_string(),
            temporary: "tmp".to_string(),
            bootstrappers: "bootstrappers".to_string(),
            views: "views".to_string(),
            images: "images".to_string(),
            assets: "assets".to_string(),
            styles: "styles".to_string(),
            scripts: "scripts".to_string(),
            index: "index.html".to_string(),
        }
    }
}

/// Application cache manifest settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestOptions {
    pub filename: String,
    pub network: Vec<String>,
    pub fallback: Vec<String>,
    pub exclude: Vec<String>,
    /// Append a content hash comment so any change invalidates the cache.
    pub hash: bool,
    /// Append a generation timestamp comment.
    pub timestamp: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            filename: "app.manifest".to_string(),
            network: vec!["*".to_string()],
            fallback: Vec::new(),
            exclude: Vec::new(),
            hash: false,
            timestamp: true,
        }
    }
}

/// Copy files matching `source` into `<dist>/<name>/<dest>`, optionally
/// replacing their extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostBuildAction {
    pub source: String,
    pub dest: String,
    pub ext: Option<String>,
}

/// Shell commands run before and after a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hooks {
    pub pre_build: Option<String>,
    pub post_build: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub input: String,
    pub output: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            input: "scripts".to_string(),
            output: "reports/analysis".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOptions {
    pub config: String,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            config: "karma.conf.js".to_string(),
        }
    }
}

/// A program and its argument template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Command templates for every external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommands {
    pub styles: ToolCommand,
    pub prefixer: Option<ToolCommand>,
    pub bundler: ToolCommand,
    pub minifier: ToolCommand,
    pub test: ToolCommand,
    pub analysis: ToolCommand,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            styles: ToolCommand::new("sass", ["--load-path=.", "${input}", "${output}"]),
            prefixer: Some(ToolCommand::new(
                "postcss",
                ["${output}", "--use", "autoprefixer", "--replace"],
            )),
            bundler: ToolCommand::new(
                "browserify",
                [
                    "${input}",
                    "--basedir",
                    ".",
                    "--full-paths",
                    "-t",
                    "[",
                    "babelify",
                    "--extensions",
                    ".es6",
                    "--extensions",
                    ".es",
                    "]",
                    "-o",
                    "${output}",
                ],
            ),
            minifier: ToolCommand::new(
                "uglifyjs",
                ["${input}", "--compress", "--mangle", "-o", "${output}"],
            ),
            test: ToolCommand::new("karma", ["start", "${config}"]),
            analysis: ToolCommand::new("plato", ["-r", "-d", "${output}", "${input}"]),
        }
    }
}

/// Which steps and commands a project supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub views: bool,
    pub styles: bool,
    pub images: bool,
    pub assets: bool,
    pub scripts: bool,
    pub rev: bool,
    pub manifest: bool,
    pub post_build: bool,
    pub serve: bool,
    pub watch: bool,
}

impl Capabilities {
    pub fn for_project(project_type: ProjectType) -> Self {
        let on = project_type == ProjectType::Frontend;
        Self {
            views: on,
            styles: on,
            images: on,
            assets: on,
            scripts: on,
            rev: on,
            manifest: on,
            post_build: on,
            serve: on,
            watch: on,
        }
    }

    /// Whether any build step is enabled at all.
    pub fn can_build(&self) -> bool {
        self.views || self.styles || self.images || self.assets || self.scripts
    }

    /// Whether `kind` may run. Clean, hooks, test and analysis are always
    /// allowed.
    pub fn allows(&self, kind: StepKind) -> bool {
        match kind {
            StepKind::Views => self.views,
            StepKind::Styles => self.styles,
            StepKind::Images => self.images,
            StepKind::Assets => self.assets,
            StepKind::Scripts => self.scripts,
            StepKind::Rev => self.rev,
            StepKind::Manifest => self.manifest,
            StepKind::PostBuild => self.post_build,
            StepKind::Clean | StepKind::PreBuild | StepKind::Test | StepKind::Analysis => true,
        }
    }

    fn set(&mut self, name: &str, value: bool) -> ConfigResult<()> {
        let flag = match name {
            "views" => &mut self.views,
            "styles" => &mut self.styles,
            "images" => &mut self.images,
            "assets" => &mut self.assets,
            "scripts" | "browserify" => &mut self.scripts,
            "rev" => &mut self.rev,
            "manifest" => &mut self.manifest,
            "post-build" => &mut self.post_build,
            "serve" => &mut self.serve,
            "watch" => &mut self.watch,
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "steps".to_string(),
                    message: format!("unknown step: {}", other),
                });
            }
        };
        *flag = value;
        Ok(())
    }
}

/// Read and parse a configuration file. Project name and version fall back
/// to the `package.json` next to the file when the KDL leaves them out.
pub fn load_options(path: &Path) -> ConfigResult<BuildOptions> {
    let content = std::fs::read_to_string(path)?;
    let mut options = parse_options(&content)?;

    if options.project.name.is_empty() || options.project.version.is_empty() {
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        if let Some(package) = read_package_info(&root.join("package.json"))? {
            debug!(name = %package.name, "Using project metadata from package.json");
            if options.project.name.is_empty() {
                options.project.name = package.name;
            }
            if options.project.version.is_empty() {
                options.project.version = package.version;
            }
        }
    }

    Ok(options)
}

/// Parse build options from KDL text.
pub fn parse_options(kdl: &str) -> ConfigResult<BuildOptions> {
    let doc: KdlDocument = kdl.parse()?;
    let mut options = BuildOptions::default();
    let mut step_overrides = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                options.project.name = get_first_string_arg(node).unwrap_or_default();
                if let Some(version) = get_string_prop(node, "version") {
                    options.project.version = version;
                }
                if let Some(kind) = get_string_prop(node, "type") {
                    options.project_type = parse_project_type(&kind)?;
                }
            }
            "server" => {
                if let Some(port) = get_port_prop(node, "port")? {
                    options.server_port = port;
                }
                if let Some(port) = get_port_prop(node, "live-reload-port")? {
                    options.live_reload_port = port;
                }
            }
            "paths" => parse_paths(node, &mut options.paths)?,
            "bundle" => {
                options.bundle_filename = get_first_string_arg(node)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ConfigError::MissingField("bundle file name".to_string()))?;
            }
            "autoprefixer" => {
                options.autoprefixer = get_all_string_args(node);
            }
            "revision" => {
                options.revision_exclude = get_string_list_prop(node, "exclude");
            }
            "manifest" => {
                if options.manifest.is_some() {
                    return Err(ConfigError::Duplicate("manifest".to_string()));
                }
                options.manifest = Some(parse_manifest(node));
            }
            "post-build" => {
                options.post_build = parse_post_build(node)?;
            }
            "hooks" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "pre-build" => options.hooks.pre_build = get_first_string_arg(child),
                            "post-build" => options.hooks.post_build = get_first_string_arg(child),
                            _ => {}
                        }
                    }
                }
            }
            "analysis" => {
                if let Some(input) = get_string_prop(node, "input") {
                    options.analysis.input = input;
                }
                if let Some(output) = get_string_prop(node, "output") {
                    options.analysis.output = output;
                }
            }
            "test" => {
                if let Some(config) = get_string_prop(node, "config") {
                    options.test.config = config;
                }
            }
            "tools" => parse_tools(node, &mut options.tools)?,
            "steps" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        let enabled = child
                            .entries()
                            .iter()
                            .find(|e| e.name().is_none())
                            .and_then(|e| e.value().as_bool())
                            .ok_or_else(|| ConfigError::InvalidValue {
                                field: format!("steps.{}", child.name().value()),
                                message: "expected #true or #false".to_string(),
                            })?;
                        step_overrides.push((child.name().value().to_string(), enabled));
                    }
                }
            }
            _ => {} // Ignore unknown nodes
        }
    }

    // Overrides apply on top of the project type, whatever order they appear in.
    options.capabilities = Capabilities::for_project(options.project_type);
    for (name, enabled) in step_overrides {
        options.capabilities.set(&name, enabled)?;
    }

    Ok(options)
}

fn parse_project_type(value: &str) -> ConfigResult<ProjectType> {
    match value {
        "frontend" => Ok(ProjectType::Frontend),
        "module" => Ok(ProjectType::Module),
        other => Err(ConfigError::InvalidValue {
            field: "project type".to_string(),
            message: format!("unknown project type: {}", other),
        }),
    }
}

fn parse_paths(node: &KdlNode, paths: &mut PathsConfig) -> ConfigResult<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        let name = child.name().value();
        let value = get_first_string_arg(child)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingField(format!("paths.{}", name)))?;
        match name {
            "distribution" => paths.distribution = value,
            "temporary" => paths.temporary = value,
            "bootstrappers" | "targets" => paths.bootstrappers = value,
            "views" => paths.views = value,
            "images" => paths.images = value,
            "assets" => paths.assets = value,
            "styles" => paths.styles = value,
            "scripts" => paths.scripts = value,
            "index" => paths.index = value,
            _ => {}
        }
    }

    if paths.distribution == paths.temporary {
        return Err(ConfigError::InvalidValue {
            field: "paths.temporary".to_string(),
            message: "must differ from the distribution folder".to_string(),
        });
    }

    Ok(())
}

fn parse_manifest(node: &KdlNode) -> ManifestOptions {
    let mut manifest = ManifestOptions::default();

    if let Some(filename) = get_string_prop(node, "filename") {
        manifest.filename = filename;
    }
    if let Some(hash) = get_bool_prop(node, "hash") {
        manifest.hash = hash;
    }
    if let Some(timestamp) = get_bool_prop(node, "timestamp") {
        manifest.timestamp = timestamp;
    }

    if let Some(children) = node.children() {
        let mut network = Vec::new();
        for child in children.nodes() {
            match child.name().value() {
                "network" => network.extend(get_all_string_args(child)),
                "fallback" => manifest.fallback.extend(get_all_string_args(child)),
                "exclude" => manifest.exclude.extend(get_all_string_args(child)),
                _ => {}
            }
        }
        if !network.is_empty() {
            manifest.network = network;
        }
    }

    manifest
}

fn parse_post_build(node: &KdlNode) -> ConfigResult<Vec<PostBuildAction>> {
    let mut actions = Vec::new();
    let Some(children) = node.children() else {
        return Ok(actions);
    };

    for child in children.nodes() {
        if child.name().value() != "copy" {
            continue;
        }
        let source = get_string_prop(child, "source")
            .ok_or_else(|| ConfigError::MissingField("post-build copy source".to_string()))?;
        let dest = get_string_prop(child, "dest").unwrap_or_default();
        let ext = get_string_prop(child, "ext")
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty());
        actions.push(PostBuildAction { source, dest, ext });
    }

    Ok(actions)
}

fn parse_tools(node: &KdlNode, tools: &mut ToolCommands) -> ConfigResult<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        let name = child.name().value();

        // `prefixer #false` disables vendor prefixing.
        if name == "prefixer" && get_bool_arg(child) == Some(false) {
            tools.prefixer = None;
            continue;
        }

        let mut parts = get_all_string_args(child).into_iter();
        let program = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::MissingField(format!("program for tool '{}'", name)))?;
        let command = ToolCommand {
            program,
            args: parts.collect(),
        };

        match name {
            "styles" => tools.styles = command,
            "prefixer" => tools.prefixer = Some(command),
            "bundler" => tools.bundler = command,
            "minifier" => tools.minifier = command,
            "test" => tools.test = command,
            "analysis" => tools.analysis = command,
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "tools".to_string(),
                    message: format!("unknown tool: {}", other),
                });
            }
        }
    }

    Ok(())
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_bool_arg(node: &KdlNode) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}

fn get_port_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<u16>> {
    let Some(value) = node.get(name) else {
        return Ok(None);
    };
    value
        .as_integer()
        .and_then(|n| u16::try_from(n).ok())
        .filter(|n| *n != 0)
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("expected a port number, got {:?}", value),
        })
}

fn get_string_list_prop(node: &KdlNode, name: &str) -> Vec<String> {
    let mut result = Vec::new();

    // Repeated attributes like exclude="a" exclude="b"
    for entry in node.entries() {
        if let Some(entry_name) = entry.name() {
            if entry_name.value() == name {
                if let Some(s) = entry.value().as_string() {
                    result.push(s.to_string());
                }
            }
        }
    }

    if !result.is_empty() {
        return result;
    }

    // Block syntax
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == name {
                result.extend(get_all_string_args(child));
            }
        }
    }

    result
}
