use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: BTreeMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").cloned();
        let id = self.create_node(
            Some(parent),
            NodeType::Element(Element {
                tag_name: tag_name.to_ascii_lowercase(),
                attrs,
            }),
        );
        if let Some(id_attr) = id_attr {
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn contains(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0).and_then(|node| node.parent)
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attrs.get(name).cloned())
    }

    pub(crate) fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|element| element.attrs.contains_key(name))
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let element = self.element_mut(node_id).ok_or_else(|| {
            Error::TransientDomMutationFailure(format!("node {} is not an element", node_id.0))
        })?;
        element
            .attrs
            .insert(name.to_ascii_lowercase(), value.to_string());
        if name.eq_ignore_ascii_case("id") {
            self.id_index.insert(value.to_string(), node_id);
        }
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<bool> {
        let element = self.element_mut(node_id).ok_or_else(|| {
            Error::TransientDomMutationFailure(format!("node {} is not an element", node_id.0))
        })?;
        Ok(element.attrs.remove(&name.to_ascii_lowercase()).is_some())
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn body(&self) -> NodeId {
        self.all_elements()
            .into_iter()
            .find(|node| self.tag_name(*node) == Some("body"))
            .unwrap_or(self.root)
    }

    /// Elements in document order, starting below the document node.
    /// Walks with an explicit stack so nesting depth is bounded only by memory.
    pub(crate) fn all_elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![self.root];
        while let Some(node) = pending.pop() {
            if self.element(node).is_some() {
                out.push(node);
            }
            if let Some(entry) = self.nodes.get(node.0) {
                pending.extend(entry.children.iter().rev().copied());
            }
        }
        out
    }

    /// Nearest inclusive ancestor whose tag matches `tag`.
    pub(crate) fn closest_tag(&self, node_id: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = Some(node_id);
        while let Some(current) = cursor {
            if self
                .tag_name(current)
                .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Path from the document node down to `node_id`, inclusive.
    pub(crate) fn event_path(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.parent(node);
        }
        path.reverse();
        path
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut pending = vec![node_id];
        while let Some(node) = pending.pop() {
            let Some(entry) = self.nodes.get(node.0) else {
                continue;
            };
            match &entry.node_type {
                NodeType::Text(text) => out.push_str(text),
                _ => pending.extend(entry.children.iter().rev().copied()),
            }
        }
        out
    }
}
