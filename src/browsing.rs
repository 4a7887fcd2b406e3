use super::*;

pub type ListenerCallback = Rc<dyn Fn(&mut DomEvent)>;

/// Replacement for a window's `open`. Receives the requested URL and target
/// name and returns the handle a script would get back.
pub type OpenHandler = Rc<dyn Fn(&str, &str) -> Option<ContentWindow>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

#[derive(Debug, Clone)]
pub struct DomEvent {
    event_type: String,
    target: NodeId,
    current_target: NodeId,
    phase: EventPhase,
    bubbles: bool,
    cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            phase: EventPhase::None,
            bubbles: true,
            cancelable: true,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) capture: bool,
    pub(crate) callback: ListenerCallback,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListenerStore {
    pub(crate) map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node_id: NodeId, event: String, listener: Listener) {
        let listeners = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default();

        // Same callback object registered twice for the same phase is a no-op,
        // as in browsers. Distinct closures always accumulate.
        if listeners.iter().any(|existing| {
            existing.capture == listener.capture && Rc::ptr_eq(&existing.callback, &listener.callback)
        }) {
            return;
        }

        listeners.push(listener);
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node_id: NodeId, event: &str, capture: bool) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| listeners.iter().filter(|l| l.capture == capture).count())
            .unwrap_or(0)
    }
}

/// DOM operations the embedded page's own scripts have made throw.
#[derive(Debug, Default)]
pub(crate) struct DocumentFaults {
    pub(crate) failing_selectors: HashSet<String>,
    pub(crate) listeners_blocked: bool,
}

#[derive(Debug)]
pub(crate) struct DocumentState {
    pub(crate) dom: Dom,
    pub(crate) url: String,
    pub(crate) listeners: ListenerStore,
    pub(crate) faults: DocumentFaults,
}

/// Shared handle to a document living inside an embedded frame.
#[derive(Debug, Clone)]
pub struct ContentDocument(Rc<RefCell<DocumentState>>);

impl PartialEq for ContentDocument {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub struct WeakContentDocument(Weak<RefCell<DocumentState>>);

impl WeakContentDocument {
    pub fn upgrade(&self) -> Option<ContentDocument> {
        self.0.upgrade().map(ContentDocument)
    }
}

impl ContentDocument {
    pub(crate) fn new(url: String, dom: Dom) -> Self {
        Self(Rc::new(RefCell::new(DocumentState {
            dom,
            url,
            listeners: ListenerStore::default(),
            faults: DocumentFaults::default(),
        })))
    }

    pub fn downgrade(&self) -> WeakContentDocument {
        WeakContentDocument(Rc::downgrade(&self.0))
    }

    /// The document's current location, fragment included.
    pub fn url(&self) -> String {
        self.0.borrow().url.clone()
    }

    pub(crate) fn set_url(&self, url: String) {
        self.0.borrow_mut().url = url;
    }

    pub fn root(&self) -> NodeId {
        self.0.borrow().dom.root
    }

    pub fn body(&self) -> NodeId {
        self.0.borrow().dom.body()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.0.borrow().dom.by_id(id)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let state = self.0.borrow();
        if state.faults.failing_selectors.contains(selector) {
            return Err(Error::TransientDomMutationFailure(format!(
                "querySelectorAll('{selector}') threw"
            )));
        }
        state.dom.query_selector_all(selector)
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.0.borrow().dom.tag_name(node).map(str::to_string)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.0.borrow().dom.attr(node, name)
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.0.borrow().dom.has_attr(node, name)
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.0.borrow_mut().dom.set_attr(node, name, value)
    }

    pub fn remove_attr(&self, node: NodeId, name: &str) -> Result<bool> {
        self.0.borrow_mut().dom.remove_attr(node, name)
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.0.borrow().dom.text_content(node)
    }

    /// Nearest inclusive ancestor of `node` with the given tag.
    pub fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.0.borrow().dom.closest_tag(node, tag)
    }

    /// Inserts a new element under `parent`, the way a page script would
    /// after load.
    pub fn append_element(
        &self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<NodeId> {
        let mut state = self.0.borrow_mut();
        if !state.dom.contains(parent) {
            return Err(Error::TransientDomMutationFailure(format!(
                "unknown parent node {}",
                parent.0
            )));
        }
        let attrs = attrs
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
            .collect();
        Ok(state.dom.create_element(parent, tag.to_string(), attrs))
    }

    pub fn append_text(&self, parent: NodeId, text: &str) -> Result<NodeId> {
        let mut state = self.0.borrow_mut();
        if !state.dom.contains(parent) {
            return Err(Error::TransientDomMutationFailure(format!(
                "unknown parent node {}",
                parent.0
            )));
        }
        Ok(state.dom.create_text(parent, text.to_string()))
    }

    pub fn add_event_listener(
        &self,
        node: NodeId,
        event: &str,
        capture: bool,
        callback: ListenerCallback,
    ) -> Result<()> {
        let mut state = self.0.borrow_mut();
        if state.faults.listeners_blocked {
            return Err(Error::TransientDomMutationFailure(format!(
                "addEventListener('{event}') threw"
            )));
        }
        if !state.dom.contains(node) {
            return Err(Error::TransientDomMutationFailure(format!(
                "unknown listener target {}",
                node.0
            )));
        }
        state
            .listeners
            .add(node, event.to_string(), Listener { capture, callback });
        Ok(())
    }

    pub fn listener_count(&self, node: NodeId, event: &str, capture: bool) -> usize {
        self.0.borrow().listeners.count(node, event, capture)
    }

    /// Makes `query_selector_all(selector)` throw, as a page that patched
    /// its own DOM APIs would.
    pub fn fail_selector(&self, selector: &str) {
        self.0
            .borrow_mut()
            .faults
            .failing_selectors
            .insert(selector.to_string());
    }

    /// Makes every later `add_event_listener` call throw.
    pub fn block_listeners(&self) {
        self.0.borrow_mut().faults.listeners_blocked = true;
    }

    /// Dispatches `event` through capture, target and bubble phases. No
    /// document borrow is held while a callback runs, so listeners may read
    /// and mutate the document freely.
    pub fn dispatch_event(&self, mut event: DomEvent) -> Result<DomEvent> {
        let path = {
            let state = self.0.borrow();
            if !state.dom.contains(event.target) {
                return Err(Error::SelectorNotFound(format!("node {}", event.target.0)));
            }
            state.dom.event_path(event.target)
        };
        let Some((&target, ancestors)) = path.split_last() else {
            return Ok(event);
        };

        stacker::grow(32 * 1024 * 1024, || {
            for node in ancestors {
                event.phase = EventPhase::Capturing;
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, true);
                if event.propagation_stopped {
                    return;
                }
            }

            event.phase = EventPhase::AtTarget;
            event.current_target = target;
            self.invoke_listeners(target, &mut event, true);
            if event.propagation_stopped {
                return;
            }
            self.invoke_listeners(target, &mut event, false);
            if event.propagation_stopped || !event.bubbles {
                return;
            }

            for node in ancestors.iter().rev() {
                event.phase = EventPhase::Bubbling;
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, false);
                if event.propagation_stopped {
                    return;
                }
            }
        });

        event.phase = EventPhase::None;
        Ok(event)
    }

    fn invoke_listeners(&self, node: NodeId, event: &mut DomEvent, capture: bool) {
        let listeners = self
            .0
            .borrow()
            .listeners
            .get(node, &event.event_type, capture);
        for listener in listeners {
            (listener.callback)(event);
        }
    }

    /// Value of `<base target>` when the document declares one.
    pub(crate) fn base_target(&self) -> Option<String> {
        let state = self.0.borrow();
        let base = state.dom.query_selector("base[target]").ok().flatten()?;
        state.dom.attr(base, "target")
    }
}

/// A navigation a window has asked its host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NavigationRequest {
    /// Navigate the window's own browsing context.
    Location(String),
    /// Navigate the top-level page.
    TopLevel(String),
    /// Open a new browsing context (tab or popup).
    NewContext { url: String, target: String },
}

pub(crate) struct WindowState {
    pub(crate) id: WindowId,
    pub(crate) document: ContentDocument,
    pub(crate) properties: HashMap<String, serde_json::Value>,
    pub(crate) frozen: HashSet<String>,
    pub(crate) open_handler: Option<OpenHandler>,
    pub(crate) requests: Vec<NavigationRequest>,
}

impl fmt::Debug for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowState")
            .field("id", &self.id)
            .field("document", &self.document)
            .field("properties", &self.properties)
            .field("frozen", &self.frozen)
            .field("open_overridden", &self.open_handler.is_some())
            .field("requests", &self.requests)
            .finish()
    }
}

/// Shared handle to the window object of an embedded browsing context.
#[derive(Debug, Clone)]
pub struct ContentWindow(Rc<RefCell<WindowState>>);

impl PartialEq for ContentWindow {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub struct WeakContentWindow(Weak<RefCell<WindowState>>);

impl WeakContentWindow {
    pub fn upgrade(&self) -> Option<ContentWindow> {
        self.0.upgrade().map(ContentWindow)
    }
}

impl ContentWindow {
    pub(crate) fn new(id: WindowId, document: ContentDocument) -> Self {
        Self(Rc::new(RefCell::new(WindowState {
            id,
            document,
            properties: HashMap::new(),
            frozen: HashSet::new(),
            open_handler: None,
            requests: Vec::new(),
        })))
    }

    pub fn downgrade(&self) -> WeakContentWindow {
        WeakContentWindow(Rc::downgrade(&self.0))
    }

    pub fn id(&self) -> WindowId {
        self.0.borrow().id
    }

    pub fn document(&self) -> ContentDocument {
        self.0.borrow().document.clone()
    }

    pub fn location_href(&self) -> String {
        self.0.borrow().document.url()
    }

    pub fn origin(&self) -> String {
        origin_of(&self.location_href()).unwrap_or_else(|_| "null".to_string())
    }

    /// `window.location.href = url`: resolves against the current location
    /// and asks the host to navigate this browsing context.
    pub fn set_location(&self, url: &str) -> Result<()> {
        let resolved = resolve_url(url, &self.location_href())?;
        self.push_request(NavigationRequest::Location(resolved));
        Ok(())
    }

    /// `window.open(url, target)`. An installed override takes the call;
    /// otherwise the default behavior opens a new browsing context.
    pub fn open(&self, url: &str, target: &str) -> Option<ContentWindow> {
        let handler = self.0.borrow().open_handler.clone();
        if let Some(handler) = handler {
            return handler(url, target);
        }

        let resolved = match resolve_url(url, &self.location_href()) {
            Ok(resolved) => resolved,
            Err(_) => return None,
        };
        let request = match target {
            "_self" => NavigationRequest::Location(resolved),
            "_top" | "_parent" => NavigationRequest::TopLevel(resolved),
            "" => NavigationRequest::NewContext {
                url: resolved,
                target: "_blank".to_string(),
            },
            other => NavigationRequest::NewContext {
                url: resolved,
                target: other.to_string(),
            },
        };
        self.push_request(request);
        None
    }

    pub fn set_open_handler(&self, handler: OpenHandler) -> Result<()> {
        let mut state = self.0.borrow_mut();
        if state.frozen.contains("open") {
            return Err(Error::TransientDomMutationFailure(
                "window.open is not writable".into(),
            ));
        }
        state.open_handler = Some(handler);
        Ok(())
    }

    pub fn has_open_override(&self) -> bool {
        self.0.borrow().open_handler.is_some()
    }

    pub fn property(&self, name: &str) -> Option<serde_json::Value> {
        self.0.borrow().properties.get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: serde_json::Value) -> Result<()> {
        let mut state = self.0.borrow_mut();
        if state.frozen.contains(name) {
            return Err(Error::TransientDomMutationFailure(format!(
                "window.{name} is not writable"
            )));
        }
        state.properties.insert(name.to_string(), value);
        Ok(())
    }

    /// Marks a window property read-only, as `Object.defineProperty` with
    /// `writable: false` would.
    pub fn freeze_property(&self, name: &str) {
        self.0.borrow_mut().frozen.insert(name.to_string());
    }

    pub(crate) fn push_request(&self, request: NavigationRequest) {
        self.0.borrow_mut().requests.push(request);
    }

    pub(crate) fn take_requests(&self) -> Vec<NavigationRequest> {
        std::mem::take(&mut self.0.borrow_mut().requests)
    }
}
