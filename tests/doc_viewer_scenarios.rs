use doxydochub_viewer::{
    AccessDenial, EscapeKind, Error, IndicatorState, LoadOutcome, LoadPhase, PageSource,
    PaneContent, Portal, Project, ProjectVersion, Result, TraceLevel,
};

const PORTAL_URL: &str = "https://portal.example/";
const DOCS_DIR: &str = "https://portal.example/docs/my-project/1-2-0/";

const PROJECT_JSON: &str = r#"{
    "id": "p1",
    "name": "My Project",
    "name_slug": "my-project",
    "versions": [
        {"id": "v1", "version": "1.2.0", "version_slug": "1-2-0", "has_docs": true},
        {"id": "v2", "version": "2.0.0", "version_slug": "2-0-0", "has_docs": false}
    ]
}"#;

const PAGE_HTML: &str = r##"
<!DOCTYPE html>
<html>
  <head><title>My Project: Main Page</title><base target="_top"></head>
  <body>
    <div id="nav">
      <a id="classes" href="classes.html" target="_top">Classes</a>
      <a id="files" href="files.html"><b id="files-label">Files</b></a>
      <a id="section" href="#details">Details</a>
      <a id="toggle" href="javascript:toggleNav()">Toggle</a>
    </div>
    <form id="search" action="search.html" target="_blank">
      <input id="q" name="q">
      <button id="go" type="submit">Search</button>
    </form>
    <h2 id="details">Details</h2>
  </body>
</html>
"##;

fn portal_with_docs() -> Result<Portal> {
    let mut portal = Portal::new(PORTAL_URL)?;
    portal.serve_project_json("p1", PROJECT_JSON);
    for page in ["index.html", "classes.html", "files.html", "search.html", "annotated.html"] {
        portal
            .browser_mut()
            .serve_html(&format!("{DOCS_DIR}{page}"), PAGE_HTML)?;
    }
    Ok(portal)
}

fn project_and_version(portal: &mut Portal) -> Result<(Project, ProjectVersion)> {
    let project = portal.load_project("p1")?;
    let version = project
        .version("1.2.0")
        .cloned()
        .ok_or_else(|| Error::InvalidConfig("fixture lacks 1.2.0".into()))?;
    Ok((project, version))
}

fn shown_portal() -> Result<Portal> {
    let mut portal = portal_with_docs()?;
    let (project, version) = project_and_version(&mut portal)?;
    portal.show_version_docs(&project, &version)?;
    Ok(portal)
}

fn click_listeners(portal: &Portal) -> usize {
    portal
        .frame_window()
        .map(|window| {
            let document = window.document();
            document.listener_count(document.root(), "click", true)
        })
        .unwrap_or(0)
}

fn load_cycles(portal: &Portal) -> u64 {
    portal
        .viewer()
        .session()
        .map(|session| session.load_cycles())
        .unwrap_or(0)
}

#[test]
fn links_in_a_same_origin_doc_set_stay_in_the_viewer() -> Result<()> {
    let mut portal = shown_portal()?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}index.html")));

    portal.click_in_frame("#classes")?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}classes.html")));
    portal.click_in_frame("#files-label")?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}files.html")));

    assert!(portal.browser().escapes().is_empty());
    assert_eq!(portal.browser().top_url(), PORTAL_URL);
    assert_eq!(load_cycles(&portal), 3);
    assert_eq!(click_listeners(&portal), 1);

    let session = portal.viewer().session().ok_or(Error::NoActiveSession)?;
    assert_eq!(session.phase(), LoadPhase::Visible);
    assert_eq!(session.indicator(), IndicatorState::Hidden);
    assert_eq!(session.title(), "My Project – 1.2.0");
    Ok(())
}

#[test]
fn fragment_links_scroll_without_reloading() -> Result<()> {
    let mut portal = shown_portal()?;
    portal.click_in_frame("#section")?;

    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}index.html#details")));
    assert_eq!(load_cycles(&portal), 1);
    assert!(portal.browser().escapes().is_empty());
    Ok(())
}

#[test]
fn script_links_are_left_alone() -> Result<()> {
    let mut portal = shown_portal()?;
    portal.click_in_frame("#toggle")?;

    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}index.html")));
    assert_eq!(load_cycles(&portal), 1);
    assert!(portal.browser().escapes().is_empty());
    Ok(())
}

#[test]
fn anchors_added_by_page_scripts_after_load_are_contained() -> Result<()> {
    let mut portal = shown_portal()?;
    portal.run_frame_script(|window| {
        let document = window.document();
        document.append_element(
            document.body(),
            "a",
            &[("id", "late"), ("href", "annotated.html"), ("target", "_top")],
        )
    })??;

    portal.click_in_frame("#late")?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}annotated.html")));
    assert!(portal.browser().escapes().is_empty());
    Ok(())
}

#[test]
fn window_open_with_a_relative_url_navigates_the_frame() -> Result<()> {
    let mut portal = shown_portal()?;
    let handle = portal.run_frame_script(|window| window.open("annotated.html", "_blank"))?;

    assert!(handle.is_none());
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}annotated.html")));
    assert!(portal.browser().escapes().is_empty());
    Ok(())
}

#[test]
fn form_submission_stays_in_the_frame() -> Result<()> {
    let mut portal = shown_portal()?;
    portal.click_in_frame("#go")?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}search.html")));

    portal.submit_in_frame("#search")?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}search.html")));
    assert!(portal.browser().escapes().is_empty());
    assert_eq!(load_cycles(&portal), 3);
    Ok(())
}

#[test]
fn repeated_load_events_install_one_listener() -> Result<()> {
    let mut portal = shown_portal()?;
    portal.refire_frame_load()?;
    portal.refire_frame_load()?;

    assert_eq!(load_cycles(&portal), 3);
    assert_eq!(click_listeners(&portal), 1);
    let frame = portal
        .viewer()
        .session()
        .map(|session| session.frame())
        .ok_or(Error::NoActiveSession)?;

    portal.click_in_frame("#classes")?;
    assert_eq!(
        portal.browser().frame(frame)?.navigations(),
        &[format!("{DOCS_DIR}classes.html")]
    );
    Ok(())
}

#[test]
fn history_restore_keeps_the_existing_listener() -> Result<()> {
    let mut portal = shown_portal()?;
    let first_window = portal.frame_window().ok_or(Error::NoActiveSession)?;
    portal.click_in_frame("#classes")?;

    assert!(portal.go_back_in_frame()?);
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}index.html")));
    assert_eq!(portal.frame_window(), Some(first_window));
    assert_eq!(click_listeners(&portal), 1);
    assert_eq!(load_cycles(&portal), 3);
    assert!(matches!(
        portal.viewer().session().and_then(|session| session.last_outcome()),
        Some(LoadOutcome::Contained { interceptor, .. }) if interceptor.already_installed
    ));

    portal.click_in_frame("#files")?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}files.html")));
    assert!(portal.browser().escapes().is_empty());
    Ok(())
}

#[test]
fn back_before_the_first_load_discards_the_frame() -> Result<()> {
    let mut portal = portal_with_docs()?;
    let (project, version) = project_and_version(&mut portal)?;
    let frame = portal.begin_version_docs(&project, &version)?;
    assert_eq!(
        portal.viewer().session().map(|session| session.phase()),
        Some(LoadPhase::Loading)
    );

    portal.back();
    assert!(portal.browser().frame(frame).is_err());
    assert!(portal.browser().frame_ids().is_empty());
    assert!(matches!(portal.viewer().pane(), PaneContent::ProjectDetails(_)));
    assert_eq!(portal.render_pane(), None);
    assert_eq!(portal.click_in_frame("#classes"), Err(Error::NoActiveSession));
    Ok(())
}

#[test]
fn cross_origin_docs_are_shown_without_containment() -> Result<()> {
    let mut portal = portal_with_docs()?;
    portal.browser_mut().serve_page(
        &format!("{DOCS_DIR}index.html"),
        PageSource::new("<body>moved</body>").with_script(|window| {
            let _ = window.set_location("https://mirror.example/docs/index.html");
        }),
    )?;
    portal
        .browser_mut()
        .serve_html("https://mirror.example/docs/index.html", PAGE_HTML)?;
    let (project, version) = project_and_version(&mut portal)?;
    portal.show_version_docs(&project, &version)?;

    assert_eq!(
        portal.frame_url().as_deref(),
        Some("https://mirror.example/docs/index.html")
    );
    let session = portal.viewer().session().ok_or(Error::NoActiveSession)?;
    assert_eq!(session.indicator(), IndicatorState::Hidden);
    assert!(matches!(
        session.last_outcome(),
        Some(LoadOutcome::Uncontained(AccessDenial::CrossOrigin { .. }))
    ));
    let markup = portal.render_pane().ok_or(Error::NoActiveSession)?;
    assert!(!markup.contains("class=\"hidden\""));

    let warnings = portal
        .take_trace_logs()
        .into_iter()
        .filter(|entry| entry.level == TraceLevel::Warn)
        .collect::<Vec<_>>();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].line.contains("cannot access content"));

    // Nothing rewrote the page, so its own targets still apply.
    portal.click_in_frame("#classes")?;
    let escapes = portal.browser_mut().take_escapes();
    assert_eq!(escapes.len(), 1);
    assert_eq!(escapes[0].kind, EscapeKind::TopLevel);
    assert_eq!(escapes[0].url, "https://mirror.example/docs/classes.html");
    Ok(())
}

#[test]
fn sandboxed_frames_degrade_like_cross_origin_ones() -> Result<()> {
    let mut portal = portal_with_docs()?;
    let (project, version) = project_and_version(&mut portal)?;
    let frame = portal.begin_version_docs(&project, &version)?;
    portal
        .browser_mut()
        .set_frame_sandbox(frame, Some("allow-scripts allow-popups"))?;
    portal.settle();

    let session = portal.viewer().session().ok_or(Error::NoActiveSession)?;
    assert_eq!(session.phase(), LoadPhase::Visible);
    assert!(matches!(
        session.last_outcome(),
        Some(LoadOutcome::Uncontained(AccessDenial::SecurityPolicy(_)))
    ));
    assert!(!portal.browser().frame(frame)?.is_hidden());
    Ok(())
}

#[test]
fn deeply_nested_pages_are_still_contained() -> Result<()> {
    let mut portal = portal_with_docs()?;
    let page = format!(
        "<body>{}<a id=\"deep\" href=\"classes.html\" target=\"_blank\">Deep link</a></body>",
        "<div>".repeat(100_000)
    );
    portal
        .browser_mut()
        .serve_html(&format!("{DOCS_DIR}index.html"), &page)?;
    let (project, version) = project_and_version(&mut portal)?;
    portal.show_version_docs(&project, &version)?;

    let session = portal.viewer().session().ok_or(Error::NoActiveSession)?;
    assert_eq!(session.phase(), LoadPhase::Visible);
    assert!(matches!(
        session.last_outcome(),
        Some(LoadOutcome::Contained { report, .. }) if report.is_clean()
    ));
    let document = portal.frame_window().ok_or(Error::NoActiveSession)?.document();
    assert_eq!(document.text_content(document.body()), "Deep link");

    portal.click_in_frame("#deep")?;
    assert_eq!(portal.frame_url(), Some(format!("{DOCS_DIR}classes.html")));
    assert!(portal.browser().escapes().is_empty());
    Ok(())
}

#[test]
fn project_fetch_failures_are_reported() -> Result<()> {
    let mut portal = Portal::new(PORTAL_URL)?;
    portal.serve_project_json("broken", "{\"id\": ");

    assert_eq!(
        portal.load_project("missing"),
        Err(Error::FetchFailure {
            url: "/api/projects/missing".into(),
            reason: "404 Not Found".into(),
        })
    );
    assert!(matches!(
        portal.load_project("broken"),
        Err(Error::FetchFailure { url, .. }) if url == "/api/projects/broken"
    ));
    let warnings = portal
        .take_trace_logs()
        .into_iter()
        .filter(|entry| entry.level == TraceLevel::Warn)
        .count();
    assert_eq!(warnings, 2);
    Ok(())
}

#[test]
fn undocumented_versions_cannot_be_shown() -> Result<()> {
    let mut portal = portal_with_docs()?;
    let project = portal.load_project("p1")?;
    let undocumented = project
        .version("2.0.0")
        .cloned()
        .ok_or_else(|| Error::InvalidConfig("fixture lacks 2.0.0".into()))?;

    portal.show_project(&project);
    assert!(matches!(
        portal.show_version_docs(&project, &undocumented),
        Err(Error::NoDocumentation { .. })
    ));
    assert!(matches!(portal.viewer().pane(), PaneContent::ProjectDetails(_)));
    Ok(())
}
