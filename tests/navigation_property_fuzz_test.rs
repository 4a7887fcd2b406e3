use doxydochub_viewer::{Error, LoadPhase, Portal, origin_of, resolve_url};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const NAVIGATION_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/navigation_property_fuzz_test.txt";
const DEFAULT_NAVIGATION_PROPTEST_CASES: u32 = 64;

const PORTAL_URL: &str = "https://portal.example/";
const DOCS_DIR: &str = "https://portal.example/docs/lib/3-1/";
const ENTRY_URL: &str = "https://portal.example/docs/lib/3-1/index.html";

const PROJECT_JSON: &str = r#"{
    "id": "lib",
    "name": "Lib",
    "name_slug": "lib",
    "versions": [{"version": "3.1", "version_slug": "3-1", "has_docs": true}]
}"#;

const PAGES: [&str; 3] = ["index.html", "classes.html", "files.html"];

const PAGE_HTML: &str = r##"
<html><head><base target="_top"></head>
<body>
  <a id="index" href="index.html" target="_top">Main</a>
  <a id="classes" href="classes.html" target="_blank">Classes</a>
  <a id="files" href="files.html"><span id="files-label">Files</span></a>
  <a id="section" href="#members">Members</a>
  <form id="search" action="index.html" target="_top"><button id="go">Go</button></form>
  <h2 id="members">Members</h2>
</body></html>
"##;

#[derive(Clone, Debug)]
enum ViewerAction {
    Click(&'static str),
    Submit,
    OpenRelative(usize),
    AppendAndClick(usize),
    RefireLoad,
    GoBack,
}

fn navigation_proptest_cases() -> u32 {
    std::env::var("DOXYDOCHUB_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_NAVIGATION_PROPTEST_CASES)
}

fn viewer_action_strategy() -> BoxedStrategy<ViewerAction> {
    prop_oneof![
        4 => prop_oneof![
            Just("#index"),
            Just("#classes"),
            Just("#files-label"),
            Just("#section"),
            Just("#go"),
        ]
        .prop_map(ViewerAction::Click),
        1 => Just(ViewerAction::Submit),
        2 => (0..PAGES.len()).prop_map(ViewerAction::OpenRelative),
        2 => (0..PAGES.len()).prop_map(ViewerAction::AppendAndClick),
        2 => Just(ViewerAction::RefireLoad),
        2 => Just(ViewerAction::GoBack),
    ]
    .boxed()
}

fn path_segment_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        4 => "[a-z0-9_-]{1,8}",
        1 => Just("..".to_string()),
        1 => Just(".".to_string()),
    ]
    .boxed()
}

fn fail(err: Error) -> TestCaseError {
    TestCaseError::fail(format!("{err:?}"))
}

fn shown_portal() -> Result<Portal, Error> {
    let mut portal = Portal::new(PORTAL_URL)?;
    portal.serve_project_json("lib", PROJECT_JSON);
    for page in PAGES {
        portal
            .browser_mut()
            .serve_html(&format!("{DOCS_DIR}{page}"), PAGE_HTML)?;
    }
    let project = portal.load_project("lib")?;
    let version = project
        .version("3.1")
        .cloned()
        .ok_or_else(|| Error::InvalidConfig("fixture lacks 3.1".into()))?;
    portal.show_version_docs(&project, &version)?;
    Ok(portal)
}

fn run_action(portal: &mut Portal, action: &ViewerAction) -> Result<(), Error> {
    match action {
        ViewerAction::Click(selector) => portal.click_in_frame(selector),
        ViewerAction::Submit => portal.submit_in_frame("#search"),
        ViewerAction::OpenRelative(page) => {
            portal.run_frame_script(|window| window.open(PAGES[*page], "_blank"))?;
            Ok(())
        }
        ViewerAction::AppendAndClick(page) => {
            portal.run_frame_script(|window| {
                let document = window.document();
                document.append_element(
                    document.body(),
                    "a",
                    &[("id", "late"), ("href", PAGES[*page]), ("target", "_top")],
                )
            })??;
            portal.click_in_frame("#late")
        }
        ViewerAction::RefireLoad => portal.refire_frame_load(),
        ViewerAction::GoBack => portal.go_back_in_frame().map(|_| ()),
    }
}

fn assert_navigation_stays_contained(actions: &[ViewerAction]) -> TestCaseResult {
    let mut portal = shown_portal().map_err(fail)?;

    for (step, action) in actions.iter().enumerate() {
        let outcome = run_action(&mut portal, action);
        prop_assert!(
            outcome.is_ok(),
            "action failed at step {step}: {action:?}, error={outcome:?}, actions={actions:?}"
        );

        prop_assert!(
            portal.browser().escapes().is_empty(),
            "navigation escaped at step {step}: {:?}",
            portal.browser().escapes()
        );
        prop_assert_eq!(portal.browser().top_url(), PORTAL_URL);

        let frame_url = portal.frame_url().unwrap_or_default();
        prop_assert!(
            frame_url.starts_with(DOCS_DIR),
            "frame left the doc set at step {step}: {frame_url}"
        );

        let session = portal.viewer().session();
        prop_assert_eq!(session.map(|session| session.phase()), Some(LoadPhase::Visible));

        let listeners = portal
            .frame_window()
            .map(|window| {
                let document = window.document();
                document.listener_count(document.root(), "click", true)
            })
            .unwrap_or(0);
        prop_assert_eq!(listeners, 1, "listener count at step {}: {:?}", step, action);
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: navigation_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(NAVIGATION_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn random_navigation_never_leaves_the_frame(actions in vec(viewer_action_strategy(), 1..=16)) {
        assert_navigation_stays_contained(&actions)?;
    }

    #[test]
    fn relative_links_resolve_within_the_portal_origin(segments in vec(path_segment_strategy(), 1..=6)) {
        let href = segments.join("/");
        let resolved = resolve_url(&href, ENTRY_URL).map_err(fail)?;
        prop_assert_eq!(origin_of(&resolved).map_err(fail)?, "https://portal.example");
        prop_assert!(resolved.starts_with(PORTAL_URL));
        prop_assert!(!resolved.contains("/../"), "unnormalized path: {}", resolved);
        prop_assert!(!resolved.contains("/./"), "unnormalized path: {}", resolved);
    }

    #[test]
    fn fragment_links_resolve_to_the_same_document(fragment in "[a-z][a-z0-9_]{0,12}") {
        let resolved = resolve_url(&format!("#{fragment}"), ENTRY_URL).map_err(fail)?;
        prop_assert_eq!(resolved, format!("{ENTRY_URL}#{fragment}"));
    }
}
