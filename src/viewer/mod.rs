use super::*;

mod containment;
mod interceptor;
mod load_cycle;
mod probe;

pub use containment::{ContainmentReport, contain_declarative_navigation};
pub use interceptor::{InterceptorInstall, install_navigation_interceptor, should_intercept_href};
pub use probe::{AccessDenial, FrameAccess, FrameHandles, probe_frame};

/// Window property that marks the capturing click interceptor as installed.
pub const DEFAULT_INTERCEPTOR_MARKER: &str = "__doxydochub_nav_listener_installed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// URL path the static server publishes documentation sets under.
    pub docs_root: String,
    /// Entry document every uploaded version contains.
    pub entry_document: String,
    pub interceptor_marker: String,
    pub loading_text: String,
    pub back_label: String,
    pub trace_log_limit: usize,
    pub trace_level: TraceLevel,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            docs_root: "/docs".to_string(),
            entry_document: "index.html".to_string(),
            interceptor_marker: DEFAULT_INTERCEPTOR_MARKER.to_string(),
            loading_text: "Loading documentation...".to_string(),
            back_label: "⬅ Back".to_string(),
            trace_log_limit: 10_000,
            trace_level: TraceLevel::Info,
        }
    }
}

impl ViewerConfig {
    pub fn with_docs_root(mut self, docs_root: &str) -> Self {
        self.docs_root = docs_root.to_string();
        self
    }

    pub fn with_entry_document(mut self, entry_document: &str) -> Self {
        self.entry_document = entry_document.to_string();
        self
    }

    pub fn with_interceptor_marker(mut self, marker: &str) -> Self {
        self.interceptor_marker = marker.to_string();
        self
    }

    pub fn with_trace_level(mut self, level: TraceLevel) -> Self {
        self.trace_level = level;
        self
    }

    pub fn with_trace_log_limit(mut self, max_entries: usize) -> Self {
        self.trace_log_limit = max_entries;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Showing,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Probing,
    Contained,
    Uncontained,
    Visible,
}

/// What the last completed load cycle managed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Contained {
        window: WindowId,
        report: ContainmentReport,
        interceptor: InterceptorInstall,
    },
    Uncontained(AccessDenial),
}

/// Viewer state for one shown version. The frame element belongs to the
/// session and is discarded with it.
#[derive(Debug, Clone)]
pub struct DocSession {
    project: Project,
    version: ProjectVersion,
    entry_path: String,
    frame: FrameId,
    indicator: IndicatorState,
    phase: LoadPhase,
    load_cycles: u64,
    last_outcome: Option<LoadOutcome>,
}

impl DocSession {
    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn version(&self) -> &ProjectVersion {
        &self.version
    }

    pub fn entry_path(&self) -> &str {
        &self.entry_path
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn indicator(&self) -> IndicatorState {
        self.indicator
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Number of `load` events handled for this session's frame.
    pub fn load_cycles(&self) -> u64 {
        self.load_cycles
    }

    pub fn last_outcome(&self) -> Option<&LoadOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn title(&self) -> String {
        format!("{} – {}", self.project.name, self.version.version)
    }
}

#[derive(Debug, Clone)]
pub enum PaneContent {
    Empty,
    ProjectDetails(Project),
    Documentation(DocSession),
}

/// Owns the portal's content pane once a version is shown inline.
#[derive(Debug)]
pub struct DocViewer {
    config: ViewerConfig,
    pane: PaneContent,
    trace: TraceState,
}

impl DocViewer {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        let mut trace = TraceState {
            min_level: config.trace_level,
            ..TraceState::default()
        };
        trace.set_log_limit(config.trace_log_limit)?;
        Ok(Self {
            config,
            pane: PaneContent::Empty,
            trace,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn pane(&self) -> &PaneContent {
        &self.pane
    }

    pub fn session(&self) -> Option<&DocSession> {
        match &self.pane {
            PaneContent::Documentation(session) => Some(session),
            _ => None,
        }
    }

    fn session_mut(&mut self) -> Option<&mut DocSession> {
        match &mut self.pane {
            PaneContent::Documentation(session) => Some(session),
            _ => None,
        }
    }

    /// Shows `version` of `project` inline: header, loading indicator and a
    /// hidden frame pointed at the version's entry document. Any frame of a
    /// previous session is discarded first.
    pub fn show_version(
        &mut self,
        browser: &mut EmbeddedBrowser,
        project: &Project,
        version: &ProjectVersion,
    ) -> Result<FrameId> {
        if !version.has_docs {
            return Err(Error::NoDocumentation {
                project: project.name.clone(),
                version: version.version.clone(),
            });
        }
        let entry_path = entry_document_path(&self.config, project, version)?;

        self.teardown(browser);
        let frame = browser.create_frame(&entry_path)?;
        browser.frame_mut(frame)?.set_hidden(true);

        self.trace.info(format!(
            "[viewer] showing {} {} from {entry_path} in {frame}",
            project.name, version.version
        ));
        self.pane = PaneContent::Documentation(DocSession {
            project: project.clone(),
            version: version.clone(),
            entry_path,
            frame,
            indicator: IndicatorState::Showing,
            phase: LoadPhase::Loading,
            load_cycles: 0,
            last_outcome: None,
        });
        Ok(frame)
    }

    /// Back affordance: discards the frame and returns the pane to the
    /// project's details.
    pub fn back(&mut self, browser: &mut EmbeddedBrowser) {
        let project = self.session().map(|session| session.project.clone());
        self.teardown(browser);
        if let Some(project) = project {
            self.trace
                .info(format!("[viewer] back to project {}", project.name));
            self.pane = PaneContent::ProjectDetails(project);
        }
    }

    /// Shows project details without a documentation session.
    pub fn show_project(&mut self, browser: &mut EmbeddedBrowser, project: &Project) {
        self.teardown(browser);
        self.pane = PaneContent::ProjectDetails(project.clone());
    }

    fn teardown(&mut self, browser: &mut EmbeddedBrowser) {
        let Some(frame) = self.session().map(DocSession::frame) else {
            return;
        };
        if let Err(err) = browser.remove_frame(frame) {
            self.trace
                .debug(format!("[viewer] {frame} already gone at teardown: {err}"));
        }
        self.pane = PaneContent::Empty;
    }

    /// Markup of the content pane for the current session.
    pub fn render(&self, browser: &EmbeddedBrowser) -> Option<String> {
        let session = self.session()?;
        let frame_hidden = browser
            .frame(session.frame)
            .map(FrameElement::is_hidden)
            .unwrap_or(true);
        let loader_style = match session.indicator {
            IndicatorState::Showing => "",
            IndicatorState::Hidden => " style=\"display: none\"",
        };
        let frame_class = if frame_hidden { " class=\"hidden\"" } else { "" };
        Some(format!(
            concat!(
                "<div class=\"version-header\">",
                "<button class=\"back-btn\">{back}</button>",
                "<h2>{title}</h2>",
                "</div>",
                "<div id=\"iframe-loader\" class=\"loader\"{loader_style}>",
                "<p>{loading}</p>",
                "</div>",
                "<iframe id=\"docs-frame\" src=\"{src}\"{frame_class}></iframe>"
            ),
            back = escape_html_text(&self.config.back_label),
            title = escape_html_text(&session.title()),
            loader_style = loader_style,
            loading = escape_html_text(&self.config.loading_text),
            src = escape_html_attr(&session.entry_path),
            frame_class = frame_class,
        ))
    }

    pub fn take_trace_logs(&mut self) -> Vec<TraceEntry> {
        self.trace.take()
    }

    pub fn set_trace_enabled(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }
}

fn escape_html_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
