use super::*;

#[test]
fn version_without_docs_is_refused() -> Result<()> {
    let mut browser = docs_browser()?;
    let mut viewer = DocViewer::new(ViewerConfig::default())?;
    let project = sample_project()?;
    let undocumented = project
        .version("2.0.0")
        .cloned()
        .ok_or_else(|| Error::InvalidConfig("fixture lacks 2.0.0".into()))?;

    assert_eq!(
        viewer.show_version(&mut browser, &project, &undocumented),
        Err(Error::NoDocumentation {
            project: "My Project".into(),
            version: "2.0.0".into(),
        })
    );
    assert!(matches!(viewer.pane(), PaneContent::Empty));
    assert!(browser.frame_ids().is_empty());
    Ok(())
}

#[test]
fn pane_markup_follows_the_load_cycle() -> Result<()> {
    let mut browser = docs_browser()?;
    let mut viewer = DocViewer::new(ViewerConfig::default())?;
    let project = sample_project()?;
    let version = documented_version(&project)?;
    assert_eq!(viewer.render(&browser), None);

    viewer.show_version(&mut browser, &project, &version)?;
    let loading = viewer
        .render(&browser)
        .ok_or(Error::NoActiveSession)?;
    assert!(loading.contains("<h2>My Project – 1.2.0</h2>"));
    assert!(loading.contains("<button class=\"back-btn\">⬅ Back</button>"));
    assert!(loading.contains("<div id=\"iframe-loader\" class=\"loader\"><p>Loading documentation...</p>"));
    assert!(loading.contains(
        "<iframe id=\"docs-frame\" src=\"/docs/my-project/1-2-0/index.html\" class=\"hidden\"></iframe>"
    ));

    settle(&mut browser, &mut viewer);
    let shown = viewer
        .render(&browser)
        .ok_or(Error::NoActiveSession)?;
    assert!(shown.contains("class=\"loader\" style=\"display: none\""));
    assert!(shown.contains("src=\"/docs/my-project/1-2-0/index.html\"></iframe>"));
    Ok(())
}

#[test]
fn pane_markup_escapes_project_names() -> Result<()> {
    let mut browser = EmbeddedBrowser::new(PORTAL_URL)?;
    let mut viewer = DocViewer::new(ViewerConfig::default())?;
    let mut project = sample_project()?;
    project.name = "<Tools & Co>".into();
    let version = documented_version(&project)?;

    viewer.show_version(&mut browser, &project, &version)?;
    let markup = viewer
        .render(&browser)
        .ok_or(Error::NoActiveSession)?;
    assert!(markup.contains("<h2>&lt;Tools &amp; Co&gt; – 1.2.0</h2>"));
    Ok(())
}

#[test]
fn back_discards_the_frame_and_returns_to_project_details() -> Result<()> {
    let mut browser = docs_browser()?;
    let mut viewer = DocViewer::new(ViewerConfig::default())?;
    let project = sample_project()?;
    let version = documented_version(&project)?;
    let frame = viewer.show_version(&mut browser, &project, &version)?;
    settle(&mut browser, &mut viewer);

    viewer.back(&mut browser);
    assert!(browser.frame(frame).is_err());
    match viewer.pane() {
        PaneContent::ProjectDetails(shown) => assert_eq!(shown, &project),
        other => {
            return Err(Error::InvalidConfig(format!(
                "expected project details, got {other:?}"
            )));
        }
    }
    assert_eq!(viewer.render(&browser), None);
    Ok(())
}

#[test]
fn showing_another_version_replaces_the_session() -> Result<()> {
    let mut browser = docs_browser()?;
    let mut viewer = DocViewer::new(ViewerConfig::default())?;
    let project = sample_project()?;
    let version = documented_version(&project)?;

    let first = viewer.show_version(&mut browser, &project, &version)?;
    settle(&mut browser, &mut viewer);
    viewer.show_project(&mut browser, &project);
    assert!(browser.frame(first).is_err());
    assert!(viewer.session().is_none());

    let second = viewer.show_version(&mut browser, &project, &version)?;
    assert_eq!(browser.frame_ids(), vec![second]);
    assert_eq!(
        viewer.session().map(DocSession::entry_path),
        Some("/docs/my-project/1-2-0/index.html")
    );
    Ok(())
}

#[test]
fn zero_trace_limit_is_a_config_error() {
    assert!(matches!(
        DocViewer::new(ViewerConfig::default().with_trace_log_limit(0)),
        Err(Error::InvalidConfig(_))
    ));
}
