use super::*;

/// A script the embedded page runs while it loads, before its `load` event.
pub type PageScript = Rc<dyn Fn(&ContentWindow)>;

const NOT_FOUND_HTML: &str = "<html><body><h1>404 Not Found</h1></body></html>";

/// Session history entries kept per frame; the oldest are dropped first.
pub(crate) const MAX_FRAME_HISTORY: usize = 50;
pub(crate) const MAX_NAVIGATION_LOG: usize = 1_000;

/// One static document of a documentation set, plus the scripts it carries.
#[derive(Clone)]
pub struct PageSource {
    pub(crate) html: String,
    pub(crate) scripts: Vec<PageScript>,
}

impl fmt::Debug for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSource")
            .field("html", &self.html)
            .field("scripts", &self.scripts.len())
            .finish()
    }
}

impl PageSource {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            scripts: Vec::new(),
        }
    }

    pub fn with_script(mut self, script: impl Fn(&ContentWindow) + 'static) -> Self {
        self.scripts.push(Rc::new(script));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLoadEvent {
    pub frame: FrameId,
    pub window: WindowId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeKind {
    /// The top-level portal page was navigated away.
    TopLevel,
    /// A new tab or popup was opened.
    NewContext,
}

/// A navigation that left the embedded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapedNavigation {
    pub frame: FrameId,
    pub kind: EscapeKind,
    pub url: String,
    pub target: String,
}

/// An `<iframe>` element of the portal page.
#[derive(Debug)]
pub struct FrameElement {
    id: FrameId,
    embedder_origin: String,
    src: String,
    sandbox: Option<String>,
    hidden: bool,
    window: Option<ContentWindow>,
    pending_load: Option<String>,
    history: Vec<ContentWindow>,
    history_index: usize,
    navigations: Vec<String>,
}

impl FrameElement {
    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn sandbox(&self) -> Option<&str> {
        self.sandbox.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn has_pending_load(&self) -> bool {
        self.pending_load.is_some()
    }

    /// In-frame navigations the frame has performed, oldest first. Only the
    /// most recent `MAX_NAVIGATION_LOG` are kept.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// `iframe.contentWindow`, subject to the same-origin policy.
    pub fn content_window(&self) -> Result<ContentWindow> {
        let window = self.window.as_ref().ok_or(Error::NoFrameContent(self.id.0))?;
        self.check_access(window)?;
        Ok(window.clone())
    }

    /// `iframe.contentDocument`, subject to the same-origin policy.
    pub fn content_document(&self) -> Result<ContentDocument> {
        Ok(self.content_window()?.document())
    }

    /// Unrestricted view of the frame's window for the embedding driver,
    /// bypassing the same-origin check.
    pub fn inspect_window(&self) -> Option<&ContentWindow> {
        self.window.as_ref()
    }

    fn check_access(&self, window: &ContentWindow) -> Result<()> {
        if let Some(sandbox) = &self.sandbox {
            if !sandbox
                .split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("allow-same-origin"))
            {
                return Err(Error::SecurityPolicyDenied(format!(
                    "{} is sandboxed without allow-same-origin",
                    self.id
                )));
            }
        }
        let frame_origin = window.origin();
        if frame_origin != self.embedder_origin {
            return Err(Error::CrossOriginAccessDenied {
                frame_origin,
                embedder_origin: self.embedder_origin.clone(),
            });
        }
        Ok(())
    }
}

/// The portal page's browsing environment: its frames, the static server
/// that feeds them, and the record of navigations that escaped a frame.
#[derive(Debug)]
pub struct EmbeddedBrowser {
    portal_url: String,
    portal_origin: String,
    top_url: String,
    pages: HashMap<String, PageSource>,
    frames: BTreeMap<FrameId, FrameElement>,
    next_frame_id: u64,
    next_window_id: u64,
    load_queue: VecDeque<FrameLoadEvent>,
    escapes: Vec<EscapedNavigation>,
    trace: TraceState,
}

impl EmbeddedBrowser {
    pub fn new(portal_url: &str) -> Result<Self> {
        let parts = LocationParts::parse(portal_url)
            .filter(|parts| parts.has_authority)
            .ok_or_else(|| Error::InvalidUrl(portal_url.to_string()))?;
        Ok(Self {
            portal_url: parts.href(),
            portal_origin: parts.origin(),
            top_url: parts.href(),
            pages: HashMap::new(),
            frames: BTreeMap::new(),
            next_frame_id: 1,
            next_window_id: 1,
            load_queue: VecDeque::new(),
            escapes: Vec::new(),
            trace: TraceState::default(),
        })
    }

    pub fn portal_url(&self) -> &str {
        &self.portal_url
    }

    pub fn portal_origin(&self) -> &str {
        &self.portal_origin
    }

    /// Current URL of the top-level page. Changes only when a navigation
    /// escapes to the top-level context.
    pub fn top_url(&self) -> &str {
        &self.top_url
    }

    pub fn serve_html(&mut self, url: &str, html: &str) -> Result<()> {
        self.serve_page(url, PageSource::new(html))
    }

    /// Publishes a document at `url` (resolved against the portal URL).
    pub fn serve_page(&mut self, url: &str, page: PageSource) -> Result<()> {
        let key = self.document_key(url)?;
        self.pages.insert(key, page);
        Ok(())
    }

    pub fn create_frame(&mut self, src: &str) -> Result<FrameId> {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        self.frames.insert(
            id,
            FrameElement {
                id,
                embedder_origin: self.portal_origin.clone(),
                src: String::new(),
                sandbox: None,
                hidden: false,
                window: None,
                pending_load: None,
                history: Vec::new(),
                history_index: 0,
                navigations: Vec::new(),
            },
        );
        self.set_frame_src(id, src)?;
        Ok(id)
    }

    /// Reassigns `iframe.src`. A load still pending for the frame is
    /// abandoned in favour of the new one.
    pub fn set_frame_src(&mut self, id: FrameId, src: &str) -> Result<()> {
        let resolved = resolve_url(src, &self.portal_url)?;
        let frame = self.frame_mut(id)?;
        frame.src = resolved.clone();
        if let Some(previous) = frame.pending_load.replace(resolved.clone()) {
            self.trace
                .debug(format!("[frame] {id} load of {previous} superseded by {resolved}"));
        }
        Ok(())
    }

    pub fn set_frame_sandbox(&mut self, id: FrameId, sandbox: Option<&str>) -> Result<()> {
        self.frame_mut(id)?.sandbox = sandbox.map(str::to_string);
        Ok(())
    }

    /// Detaches the frame element. Queued load events for it are dropped.
    pub fn remove_frame(&mut self, id: FrameId) -> Result<()> {
        self.frames.remove(&id).ok_or(Error::UnknownFrame(id.0))?;
        self.load_queue.retain(|event| event.frame != id);
        self.trace.debug(format!("[frame] {id} removed"));
        Ok(())
    }

    pub fn frame(&self, id: FrameId) -> Result<&FrameElement> {
        self.frames.get(&id).ok_or(Error::UnknownFrame(id.0))
    }

    pub fn frame_mut(&mut self, id: FrameId) -> Result<&mut FrameElement> {
        self.frames.get_mut(&id).ok_or(Error::UnknownFrame(id.0))
    }

    pub fn frame_ids(&self) -> Vec<FrameId> {
        self.frames.keys().copied().collect()
    }

    pub fn escapes(&self) -> &[EscapedNavigation] {
        &self.escapes
    }

    pub fn take_escapes(&mut self) -> Vec<EscapedNavigation> {
        std::mem::take(&mut self.escapes)
    }

    /// Applies navigation requests made by frame windows, performs pending
    /// loads and returns the load events they produced, oldest first.
    pub fn pump(&mut self) -> Vec<FrameLoadEvent> {
        self.settle_requests();
        let pending = self
            .frames
            .iter()
            .filter_map(|(id, frame)| frame.pending_load.clone().map(|url| (*id, url)))
            .collect::<Vec<_>>();
        for (id, url) in pending {
            self.load_frame_document(id, &url);
        }
        self.load_queue.drain(..).collect()
    }

    /// Fires `load` again for the frame's current window object, as a
    /// restore from the back/forward cache does.
    pub fn refire_load(&mut self, id: FrameId) -> Result<()> {
        let frame = self.frame(id)?;
        let window = frame
            .window
            .as_ref()
            .ok_or(Error::NoFrameContent(id.0))?
            .id();
        self.load_queue.push_back(FrameLoadEvent { frame: id, window });
        Ok(())
    }

    /// History traversal inside the frame. The previous window object is
    /// restored as-is, then `load` fires for it.
    pub fn go_back(&mut self, id: FrameId) -> Result<bool> {
        let frame = self.frame_mut(id)?;
        if frame.history_index == 0 || frame.history.is_empty() {
            return Ok(false);
        }
        frame.history_index -= 1;
        let window = frame.history[frame.history_index].clone();
        frame.pending_load = None;
        frame.window = Some(window.clone());
        self.trace.debug(format!(
            "[frame] {id} restored {} at {}",
            window.id(),
            window.location_href()
        ));
        self.load_queue.push_back(FrameLoadEvent {
            frame: id,
            window: window.id(),
        });
        Ok(true)
    }

    /// Clicks the first element matching `selector` inside the frame, then
    /// runs the default activation behavior unless a listener prevented it.
    pub fn click(&mut self, id: FrameId, selector: &str) -> Result<()> {
        let window = self.driver_window(id)?;
        let document = window.document();
        let target = document
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))?;
        let event = document.dispatch_event(DomEvent::new("click", target))?;
        if !event.default_prevented() {
            if let Some(anchor) = document.closest(target, "a") {
                if document.has_attr(anchor, "href") {
                    self.follow_hyperlink(id, &window, anchor, "href")?;
                }
            } else if let Some(form) = submitter_form(&document, target) {
                self.submit_form_node(id, &window, form)?;
            }
        }
        self.settle_requests();
        Ok(())
    }

    /// Submits the form matching `selector` inside the frame.
    pub fn submit(&mut self, id: FrameId, selector: &str) -> Result<()> {
        let window = self.driver_window(id)?;
        let document = window.document();
        let form = document
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))?;
        if document.tag_name(form).as_deref() != Some("form") {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form".into(),
                actual: document.tag_name(form).unwrap_or_default(),
            });
        }
        self.submit_form_node(id, &window, form)?;
        self.settle_requests();
        Ok(())
    }

    /// Runs `script` inside the frame's current window, as an inline script
    /// or a timer callback of the embedded page would.
    pub fn run_script<R>(&mut self, id: FrameId, script: impl FnOnce(&ContentWindow) -> R) -> Result<R> {
        let window = self.driver_window(id)?;
        let out = script(&window);
        self.settle_requests();
        Ok(out)
    }

    fn driver_window(&self, id: FrameId) -> Result<ContentWindow> {
        self.frame(id)?
            .window
            .clone()
            .ok_or(Error::NoFrameContent(id.0))
    }

    fn submit_form_node(&mut self, id: FrameId, window: &ContentWindow, form: NodeId) -> Result<()> {
        let document = window.document();
        let event = document.dispatch_event(DomEvent::new("submit", form))?;
        if event.default_prevented() {
            return Ok(());
        }
        self.follow_hyperlink(id, window, form, "action")
    }

    /// Default navigation of an anchor or form, honouring its `target` and
    /// the document's `<base target>`.
    fn follow_hyperlink(
        &mut self,
        id: FrameId,
        window: &ContentWindow,
        node: NodeId,
        url_attr: &str,
    ) -> Result<()> {
        let document = window.document();
        let raw = document.attr(node, url_attr).unwrap_or_default();
        if is_javascript_scheme(&raw) {
            return Ok(());
        }
        let url = resolve_url(&raw, &document.url())?;
        let target = document
            .attr(node, "target")
            .or_else(|| document.base_target())
            .unwrap_or_default();
        let request = match target.to_ascii_lowercase().as_str() {
            "" | "_self" => NavigationRequest::Location(url),
            "_top" | "_parent" => NavigationRequest::TopLevel(url),
            _ => NavigationRequest::NewContext { url, target },
        };
        self.apply_request(id, request);
        Ok(())
    }

    fn settle_requests(&mut self) {
        let windows = self
            .frames
            .iter()
            .filter_map(|(id, frame)| frame.window.clone().map(|window| (*id, window)))
            .collect::<Vec<_>>();
        for (id, window) in windows {
            for request in window.take_requests() {
                self.apply_request(id, request);
            }
        }
    }

    fn apply_request(&mut self, id: FrameId, request: NavigationRequest) {
        match request {
            NavigationRequest::Location(url) => self.navigate_frame(id, url),
            NavigationRequest::TopLevel(url) => {
                self.trace
                    .info(format!("[escape] {id} navigated the top-level page to {url}"));
                self.top_url = url.clone();
                self.escapes.push(EscapedNavigation {
                    frame: id,
                    kind: EscapeKind::TopLevel,
                    url,
                    target: "_top".to_string(),
                });
            }
            NavigationRequest::NewContext { url, target } => {
                self.trace
                    .info(format!("[escape] {id} opened {url} in new context {target}"));
                self.escapes.push(EscapedNavigation {
                    frame: id,
                    kind: EscapeKind::NewContext,
                    url,
                    target,
                });
            }
        }
    }

    fn navigate_frame(&mut self, id: FrameId, url: String) {
        let Some(frame) = self.frames.get_mut(&id) else {
            return;
        };
        frame.navigations.push(url.clone());
        if frame.navigations.len() > MAX_NAVIGATION_LOG {
            let overflow = frame.navigations.len() - MAX_NAVIGATION_LOG;
            frame.navigations.drain(..overflow);
        }
        if let Some(window) = &frame.window {
            if frame.pending_load.is_none() && is_same_document(&window.location_href(), &url) {
                window.document().set_url(url);
                return;
            }
        }
        frame.src = url.clone();
        frame.pending_load = Some(url);
    }

    fn load_frame_document(&mut self, id: FrameId, url: &str) {
        let page = match self.document_key(url) {
            Ok(key) => self.pages.get(&key).cloned(),
            Err(_) => None,
        };
        let page = page.unwrap_or_else(|| {
            self.trace.info(format!("[frame] {id} 404 for {url}"));
            PageSource::new(NOT_FOUND_HTML)
        });
        let dom = match parse_html(&page.html) {
            Ok(dom) => dom,
            Err(err) => {
                self.trace
                    .warn(format!("[frame] {id} could not parse {url}: {err}"));
                Dom::new()
            }
        };

        let window_id = WindowId(self.next_window_id);
        self.next_window_id += 1;
        let window = ContentWindow::new(window_id, ContentDocument::new(url.to_string(), dom));

        let Some(frame) = self.frames.get_mut(&id) else {
            return;
        };
        frame.pending_load = None;
        if !frame.history.is_empty() {
            frame.history.truncate(frame.history_index + 1);
        }
        frame.history.push(window.clone());
        if frame.history.len() > MAX_FRAME_HISTORY {
            let overflow = frame.history.len() - MAX_FRAME_HISTORY;
            frame.history.drain(..overflow);
        }
        frame.history_index = frame.history.len() - 1;
        frame.window = Some(window.clone());

        for script in &page.scripts {
            script(&window);
        }
        self.trace
            .debug(format!("[frame] {id} loaded {url} into {window_id}"));
        self.load_queue.push_back(FrameLoadEvent {
            frame: id,
            window: window_id,
        });
    }

    fn document_key(&self, url: &str) -> Result<String> {
        let resolved = resolve_url(url, &self.portal_url)?;
        LocationParts::parse(&resolved)
            .map(|parts| parts.document_href())
            .ok_or(Error::InvalidUrl(resolved))
    }

    pub fn take_trace_logs(&mut self) -> Vec<TraceEntry> {
        self.trace.take()
    }

    pub fn set_trace_level(&mut self, level: TraceLevel) {
        self.trace.min_level = level;
    }

    pub fn set_trace_enabled(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }
}

/// Form submitted by clicking `target`, if `target` is a submit control.
fn submitter_form(document: &ContentDocument, target: NodeId) -> Option<NodeId> {
    let tag = document.tag_name(target)?;
    let kind = document
        .attr(target, "type")
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_submit = match tag.as_str() {
        "button" => kind.is_empty() || kind == "submit",
        "input" => kind == "submit" || kind == "image",
        _ => false,
    };
    if !is_submit {
        return None;
    }
    document.closest(target, "form")
}
