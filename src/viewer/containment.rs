use super::*;

/// Counts from one static containment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainmentReport {
    pub base_targets_removed: usize,
    pub anchors_retargeted: usize,
    pub forms_retargeted: usize,
    /// Steps that threw; the remaining steps still ran.
    pub failures: Vec<String>,
}

impl ContainmentReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Static pass over the elements present right now: drops `<base target>`
/// and points every anchor and form at the frame itself. Elements inserted
/// later are left to the click interceptor.
pub fn contain_declarative_navigation(document: &ContentDocument) -> ContainmentReport {
    let mut report = ContainmentReport::default();

    match remove_base_targets(document) {
        Ok(count) => report.base_targets_removed = count,
        Err(err) => report.failures.push(format!("base target: {err}")),
    }
    match retarget_all(document, "a") {
        Ok(count) => report.anchors_retargeted = count,
        Err(err) => report.failures.push(format!("anchors: {err}")),
    }
    match retarget_all(document, "form") {
        Ok(count) => report.forms_retargeted = count,
        Err(err) => report.failures.push(format!("forms: {err}")),
    }

    report
}

fn remove_base_targets(document: &ContentDocument) -> Result<usize> {
    let mut removed = 0;
    for base in document.query_selector_all("base[target]")? {
        if document.remove_attr(base, "target")? {
            removed += 1;
        }
    }
    Ok(removed)
}

fn retarget_all(document: &ContentDocument, selector: &str) -> Result<usize> {
    let nodes = document.query_selector_all(selector)?;
    for node in &nodes {
        document.set_attr(*node, "target", "_self")?;
    }
    Ok(nodes.len())
}
