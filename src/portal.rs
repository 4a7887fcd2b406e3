use super::*;

/// Upper bound on load rounds per settle, so a page that navigates itself
/// on every load cannot spin forever.
const MAX_SETTLE_ROUNDS: usize = 64;

/// The portal shell: its browsing environment, the project resources the
/// API serves, and the documentation viewer living in the content pane.
#[derive(Debug)]
pub struct Portal {
    browser: EmbeddedBrowser,
    viewer: DocViewer,
    project_resources: HashMap<String, String>,
    trace: TraceState,
}

impl Portal {
    pub fn new(portal_url: &str) -> Result<Self> {
        Self::with_config(portal_url, ViewerConfig::default())
    }

    pub fn with_config(portal_url: &str, config: ViewerConfig) -> Result<Self> {
        let mut trace = TraceState {
            min_level: config.trace_level,
            ..TraceState::default()
        };
        trace.set_log_limit(config.trace_log_limit)?;
        let mut browser = EmbeddedBrowser::new(portal_url)?;
        browser.set_trace_level(config.trace_level);
        Ok(Self {
            browser,
            viewer: DocViewer::new(config)?,
            project_resources: HashMap::new(),
            trace,
        })
    }

    pub fn browser(&self) -> &EmbeddedBrowser {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut EmbeddedBrowser {
        &mut self.browser
    }

    pub fn viewer(&self) -> &DocViewer {
        &self.viewer
    }

    /// Publishes the JSON the API returns for `/api/projects/<id>`.
    pub fn serve_project_json(&mut self, project_id: &str, json: &str) {
        self.project_resources
            .insert(project_id.to_string(), json.to_string());
    }

    /// Fetches and decodes a project record. Failures are logged and
    /// returned; the content pane is left as it was.
    pub fn load_project(&mut self, project_id: &str) -> Result<Project> {
        let url = format!("/api/projects/{project_id}");
        let result = match self.project_resources.get(project_id) {
            None => Err(Error::FetchFailure {
                url: url.clone(),
                reason: "404 Not Found".into(),
            }),
            Some(json) => Project::from_json(json).map_err(|err| Error::FetchFailure {
                url: url.clone(),
                reason: err.to_string(),
            }),
        };
        if let Err(err) = &result {
            self.trace.warn(format!("[portal] failed to fetch project: {err}"));
        }
        result
    }

    /// Shows a project's details in the content pane.
    pub fn show_project(&mut self, project: &Project) {
        self.viewer.show_project(&mut self.browser, project);
    }

    /// The viewer's single entry operation: show this version's
    /// documentation inline, then run load cycles until the frame settles.
    pub fn show_version_docs(&mut self, project: &Project, version: &ProjectVersion) -> Result<FrameId> {
        let frame = self.viewer.show_version(&mut self.browser, project, version)?;
        self.settle();
        Ok(frame)
    }

    /// Same as [`Portal::show_version_docs`] but leaves the first load
    /// pending, so the `Loading` state can be observed.
    pub fn begin_version_docs(&mut self, project: &Project, version: &ProjectVersion) -> Result<FrameId> {
        self.viewer.show_version(&mut self.browser, project, version)
    }

    pub fn back(&mut self) {
        self.viewer.back(&mut self.browser);
        self.settle();
    }

    /// Processes navigations and load events until nothing is pending.
    pub fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let events = self.browser.pump();
            if events.is_empty() {
                return;
            }
            for event in events {
                self.viewer.handle_frame_load(&mut self.browser, event);
            }
        }
        self.trace.warn(format!(
            "[portal] frame still navigating after {MAX_SETTLE_ROUNDS} load rounds"
        ));
    }

    fn current_frame(&self) -> Result<FrameId> {
        self.viewer
            .session()
            .map(DocSession::frame)
            .ok_or(Error::NoActiveSession)
    }

    /// URL of the document currently shown in the viewer's frame.
    pub fn frame_url(&self) -> Option<String> {
        let frame = self.current_frame().ok()?;
        self.browser
            .frame(frame)
            .ok()?
            .inspect_window()
            .map(ContentWindow::location_href)
    }

    pub fn frame_window(&self) -> Option<ContentWindow> {
        let frame = self.current_frame().ok()?;
        self.browser.frame(frame).ok()?.inspect_window().cloned()
    }

    pub fn click_in_frame(&mut self, selector: &str) -> Result<()> {
        let frame = self.current_frame()?;
        self.browser.click(frame, selector)?;
        self.settle();
        Ok(())
    }

    pub fn submit_in_frame(&mut self, selector: &str) -> Result<()> {
        let frame = self.current_frame()?;
        self.browser.submit(frame, selector)?;
        self.settle();
        Ok(())
    }

    pub fn run_frame_script<R>(&mut self, script: impl FnOnce(&ContentWindow) -> R) -> Result<R> {
        let frame = self.current_frame()?;
        let out = self.browser.run_script(frame, script)?;
        self.settle();
        Ok(out)
    }

    pub fn go_back_in_frame(&mut self) -> Result<bool> {
        let frame = self.current_frame()?;
        let moved = self.browser.go_back(frame)?;
        self.settle();
        Ok(moved)
    }

    pub fn refire_frame_load(&mut self) -> Result<()> {
        let frame = self.current_frame()?;
        self.browser.refire_load(frame)?;
        self.settle();
        Ok(())
    }

    pub fn render_pane(&self) -> Option<String> {
        self.viewer.render(&self.browser)
    }

    /// Turns the buffered logs on or off. Lines still reach `tracing`.
    pub fn set_trace_enabled(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
        self.viewer.set_trace_enabled(enabled);
        self.browser.set_trace_enabled(enabled);
    }

    /// Drains portal, viewer and browser diagnostics, in that order.
    pub fn take_trace_logs(&mut self) -> Vec<TraceEntry> {
        let mut logs = self.trace.take();
        logs.extend(self.viewer.take_trace_logs());
        logs.extend(self.browser.take_trace_logs());
        logs
    }
}
