use super::*;

/// Readable handles to a frame's current window and document.
#[derive(Debug, Clone)]
pub struct FrameHandles {
    pub window: ContentWindow,
    pub document: ContentDocument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenial {
    CrossOrigin {
        frame_origin: String,
        embedder_origin: String,
    },
    SecurityPolicy(String),
    /// The frame has not committed a document yet.
    NoContent,
}

impl fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrossOrigin {
                frame_origin,
                embedder_origin,
            } => write!(
                f,
                "cross-origin content ({frame_origin} embedded in {embedder_origin})"
            ),
            Self::SecurityPolicy(reason) => write!(f, "security policy: {reason}"),
            Self::NoContent => write!(f, "frame has no content"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FrameAccess {
    Accessible(FrameHandles),
    Denied(AccessDenial),
}

impl FrameAccess {
    pub fn is_accessible(&self) -> bool {
        matches!(self, Self::Accessible(_))
    }
}

/// Reads the frame's content window and document afresh. Nothing is cached:
/// the same frame may move between same-origin and cross-origin pages.
pub fn probe_frame(frame: &FrameElement) -> FrameAccess {
    let access = frame
        .content_window()
        .and_then(|window| frame.content_document().map(|document| (window, document)));
    match access {
        Ok((window, document)) => FrameAccess::Accessible(FrameHandles { window, document }),
        Err(Error::CrossOriginAccessDenied {
            frame_origin,
            embedder_origin,
        }) => FrameAccess::Denied(AccessDenial::CrossOrigin {
            frame_origin,
            embedder_origin,
        }),
        Err(Error::NoFrameContent(_)) => FrameAccess::Denied(AccessDenial::NoContent),
        Err(other) => FrameAccess::Denied(AccessDenial::SecurityPolicy(other.to_string())),
    }
}
