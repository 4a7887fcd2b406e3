use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::error::Error as StdError;
use std::fmt;
use std::rc::{Rc, Weak};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    InvalidUrl(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    /// Reading a frame's window or document across origins.
    CrossOriginAccessDenied {
        frame_origin: String,
        embedder_origin: String,
    },
    SecurityPolicyDenied(String),
    /// A DOM call made by the viewer threw inside the embedded page.
    TransientDomMutationFailure(String),
    FetchFailure {
        url: String,
        reason: String,
    },
    ProjectParse(String),
    InvalidSlug {
        kind: &'static str,
        slug: String,
    },
    NoDocumentation {
        project: String,
        version: String,
    },
    NoActiveSession,
    UnknownFrame(u64),
    NoFrameContent(u64),
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::InvalidUrl(url) => write!(f, "invalid url: {url}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::CrossOriginAccessDenied {
                frame_origin,
                embedder_origin,
            } => write!(
                f,
                "blocked a frame with origin {embedder_origin} from accessing a frame with origin {frame_origin}"
            ),
            Self::SecurityPolicyDenied(msg) => write!(f, "security policy denied access: {msg}"),
            Self::TransientDomMutationFailure(msg) => write!(f, "dom operation failed: {msg}"),
            Self::FetchFailure { url, reason } => write!(f, "fetch of {url} failed: {reason}"),
            Self::ProjectParse(msg) => write!(f, "project record parse error: {msg}"),
            Self::InvalidSlug { kind, slug } => write!(f, "invalid {kind} slug: {slug:?}"),
            Self::NoDocumentation { project, version } => {
                write!(f, "no documentation uploaded for {project} {version}")
            }
            Self::NoActiveSession => write!(f, "no documentation is being shown"),
            Self::UnknownFrame(id) => write!(f, "unknown frame: frame#{id}"),
            Self::NoFrameContent(id) => write!(f, "frame#{id} has no content yet"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl StdError for Error {}

mod browsing;
mod dom;
mod host;
mod html;
mod portal;
mod project;
mod selector;
mod trace;
mod url;
mod viewer;

use browsing::*;
use dom::*;
use html::*;
use trace::*;
use url::*;

pub use browsing::{
    ContentDocument, ContentWindow, DomEvent, EventPhase, ListenerCallback, OpenHandler,
    WeakContentDocument, WeakContentWindow, WindowId,
};
pub use dom::NodeId;
pub use host::{
    EmbeddedBrowser, EscapeKind, EscapedNavigation, FrameElement, FrameId, FrameLoadEvent,
    PageScript, PageSource,
};
pub use portal::Portal;
pub use project::{Project, ProjectVersion, entry_document_path};
pub use trace::{TraceEntry, TraceLevel};
pub use url::{is_fragment_only, is_javascript_scheme, origin_of, resolve_url};
pub use viewer::{
    AccessDenial, ContainmentReport, DEFAULT_INTERCEPTOR_MARKER, DocSession, DocViewer,
    FrameAccess, FrameHandles, IndicatorState, InterceptorInstall, LoadOutcome, LoadPhase,
    PaneContent, ViewerConfig, contain_declarative_navigation, install_navigation_interceptor,
    probe_frame, should_intercept_href,
};
