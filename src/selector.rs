use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorAttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectorStep {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<SelectorAttrCondition>,
}

/// A descendant chain such as `nav a[href]`; steps are outermost first.
pub(crate) type SelectorChain = Vec<SelectorStep>;

pub(crate) fn parse_selector_groups(selector: &str) -> Result<Vec<SelectorChain>> {
    let mut groups = Vec::new();
    for group in selector.split(',') {
        let group = group.trim();
        if group.is_empty() {
            return Err(Error::UnsupportedSelector(selector.into()));
        }
        let chain = group
            .split_ascii_whitespace()
            .map(parse_selector_step)
            .collect::<Result<Vec<_>>>()?;
        groups.push(chain);
    }
    Ok(groups)
}

pub(crate) fn parse_selector_step(part: &str) -> Result<SelectorStep> {
    let part = part.trim();
    if part.is_empty() {
        return Err(Error::UnsupportedSelector(part.into()));
    }

    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = SelectorStep::default();
    let mut universal = false;

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if universal || step.tag.is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                universal = true;
                i += 1;
            }
            b'#' => {
                let Some((id, next)) = parse_selector_ident(part, i + 1) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                if step.id.replace(id).is_some() {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                i = next;
            }
            b'.' => {
                let Some((class_name, next)) = parse_selector_ident(part, i + 1) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.classes.push(class_name);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_selector_attr_condition(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            _ => {
                if step.tag.is_some()
                    || step.id.is_some()
                    || !step.classes.is_empty()
                    || universal
                {
                    return Err(Error::UnsupportedSelector(part.into()));
                }
                let Some((tag, next)) = parse_selector_ident(part, i) else {
                    return Err(Error::UnsupportedSelector(part.into()));
                };
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    Ok(step)
}

fn parse_selector_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() || !is_selector_ident_char(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_selector_ident_char(bytes[end]) {
        end += 1;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn is_selector_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn parse_selector_attr_condition(
    src: &str,
    open_bracket: usize,
) -> Result<(SelectorAttrCondition, usize)> {
    let close = src[open_bracket..]
        .find(']')
        .map(|pos| open_bracket + pos)
        .ok_or_else(|| Error::UnsupportedSelector(src.into()))?;
    let body = src[open_bracket + 1..close].trim();

    let cond = match body.split_once('=') {
        None => {
            if body.is_empty() || !body.bytes().all(is_selector_attr_name_char) {
                return Err(Error::UnsupportedSelector(src.into()));
            }
            SelectorAttrCondition::Exists {
                key: body.to_ascii_lowercase(),
            }
        }
        Some((key, value)) => {
            let key = key.trim();
            if key.is_empty() || !key.bytes().all(is_selector_attr_name_char) {
                return Err(Error::UnsupportedSelector(src.into()));
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            SelectorAttrCondition::Eq {
                key: key.to_ascii_lowercase(),
                value: value.to_string(),
            }
        }
    };

    Ok((cond, close + 1))
}

fn is_selector_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b':'
}

impl Dom {
    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        Ok(self
            .all_elements()
            .into_iter()
            .filter(|node| groups.iter().any(|chain| self.matches_chain(*node, chain)))
            .collect())
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn matches_chain(&self, node: NodeId, chain: &[SelectorStep]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !self.matches_step(node, last) {
            return false;
        }
        let mut cursor = self.parent(node);
        for step in ancestors.iter().rev() {
            loop {
                let Some(current) = cursor else {
                    return false;
                };
                cursor = self.parent(current);
                if self.matches_step(current, step) {
                    break;
                }
            }
        }
        true
    }

    fn matches_step(&self, node: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };
        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &step.id {
            if element.attrs.get("id") != Some(id) {
                return false;
            }
        }
        if !step.classes.is_empty() {
            let class_attr = element.attrs.get("class").map(String::as_str).unwrap_or("");
            let tokens = class_attr.split_ascii_whitespace().collect::<Vec<_>>();
            if !step.classes.iter().all(|class| tokens.contains(&class.as_str())) {
                return false;
            }
        }
        step.attrs.iter().all(|cond| match cond {
            SelectorAttrCondition::Exists { key } => element.attrs.contains_key(key),
            SelectorAttrCondition::Eq { key, value } => element.attrs.get(key) == Some(value),
        })
    }
}
