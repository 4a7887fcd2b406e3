use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorInstall {
    /// True when this call registered the capturing click listener.
    pub click_listener_installed: bool,
    /// True when the window already carried the marker.
    pub already_installed: bool,
    pub open_overridden: bool,
    pub failures: Vec<String>,
}

/// Whether a click on an anchor with this `href` must be redirected into the
/// frame. Fragment-only and `javascript:` links keep their default behavior.
pub fn should_intercept_href(href: Option<&str>) -> bool {
    match href {
        None => false,
        Some(href) => !href.is_empty() && !is_fragment_only(href) && !is_javascript_scheme(href),
    }
}

/// Installs the capturing click listener (once per window object) and the
/// `window.open` override on an accessible frame.
pub fn install_navigation_interceptor(handles: &FrameHandles, marker: &str) -> InterceptorInstall {
    let mut install = InterceptorInstall {
        click_listener_installed: false,
        already_installed: false,
        open_overridden: false,
        failures: Vec::new(),
    };

    match handles.window.set_open_handler(open_in_frame(&handles.window)) {
        Ok(()) => install.open_overridden = true,
        Err(err) => install.failures.push(format!("window.open override: {err}")),
    }

    if marker_is_set(&handles.window, marker) {
        install.already_installed = true;
        return install;
    }

    let document = &handles.document;
    let listener = intercept_anchor_clicks(&handles.window, document);
    match document.add_event_listener(document.root(), "click", true, listener) {
        Ok(()) => {
            install.click_listener_installed = true;
            if let Err(err) = handles
                .window
                .set_property(marker, serde_json::Value::Bool(true))
            {
                install.failures.push(format!("interceptor marker: {err}"));
            }
        }
        Err(err) => install.failures.push(format!("click listener: {err}")),
    }

    install
}

fn marker_is_set(window: &ContentWindow, marker: &str) -> bool {
    matches!(window.property(marker), Some(serde_json::Value::Bool(true)))
}

fn intercept_anchor_clicks(window: &ContentWindow, document: &ContentDocument) -> ListenerCallback {
    let window = window.downgrade();
    let document = document.downgrade();
    Rc::new(move |event: &mut DomEvent| {
        let (Some(window), Some(document)) = (window.upgrade(), document.upgrade()) else {
            return;
        };
        let Some(anchor) = document.closest(event.target(), "a") else {
            return;
        };
        let href = document.attr(anchor, "href");
        if !should_intercept_href(href.as_deref()) {
            return;
        }
        let Some(href) = href else {
            return;
        };

        // Cancel only once the frame has a navigation to take instead.
        let navigated =
            resolve_url(&href, &document.url()).and_then(|url| window.set_location(&url));
        match navigated {
            Ok(()) => {
                event.prevent_default();
                event.stop_propagation();
            }
            Err(err) => tracing::warn!(
                target: "doxydochub_viewer",
                "[interceptor] left click on {href} to the page: {err}"
            ),
        }
    })
}

fn open_in_frame(window: &ContentWindow) -> OpenHandler {
    let window = window.downgrade();
    Rc::new(move |url: &str, _target: &str| -> Option<ContentWindow> {
        let window = window.upgrade()?;
        let navigated =
            resolve_url(url, &window.location_href()).and_then(|resolved| window.set_location(&resolved));
        if let Err(err) = navigated {
            tracing::warn!(
                target: "doxydochub_viewer",
                "[interceptor] window.open({url}) not followed: {err}"
            );
        }
        None
    })
}
