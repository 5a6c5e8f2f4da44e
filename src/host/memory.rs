// In-memory host module
// A document tree and virtual clock for headless embedding and tests

use std::collections::BTreeMap;

use log::debug;

use crate::host::{Host, ImageInfo, ListenKind, TimerId};

/// Handle to a node in a [`MemoryHost`] tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef(usize);

#[derive(Debug, Default)]
struct NodeData {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    parent: Option<usize>,
    children: Vec<usize>,
    image: Option<ImageFacts>,
}

/// Loading state of an image node; the source attributes live in `attrs`
#[derive(Debug, Clone, Copy, Default)]
struct ImageFacts {
    complete: bool,
    natural_width: u32,
    natural_height: u32,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    id: TimerId,
    due_ms: u64,
    period_ms: Option<u32>,
}

/// In-memory implementation of [`Host`].
///
/// Keeps a document tree, a listener registry, and a virtual clock. There
/// is no native subtree observer or navigation event source: the embedder
/// drives the runtime explicitly — report added nodes, advance the clock
/// and deliver due timers, fire the requested animation frame. The test
/// suite uses exactly this loop.
///
/// Selector support covers the descendant chains documentation sites use
/// (`tag`, `.class`, `#id`, and compounds like `.markdown img`). Anything
/// else panics, mirroring how an invalid selector surfaces as an uncaught
/// failure from the browser's query call.
#[derive(Debug)]
pub struct MemoryHost {
    nodes: Vec<NodeData>,
    body: usize,
    has_document: bool,
    location: String,
    scroll_locked: bool,
    focused: Option<usize>,
    listeners: Vec<(usize, ListenKind)>,
    escape_listener: bool,
    subtree_observed: bool,
    navigation_observed: bool,
    clock_ms: u64,
    next_timer: u64,
    timers: Vec<Scheduled>,
    frame_requested: bool,
}

impl MemoryHost {
    /// A host with an empty document body at location "/".
    pub fn new() -> Self {
        let body = NodeData {
            tag: "body".to_string(),
            ..NodeData::default()
        };
        Self {
            nodes: vec![body],
            body: 0,
            has_document: true,
            location: "/".to_string(),
            scroll_locked: false,
            focused: None,
            listeners: Vec::new(),
            escape_listener: false,
            subtree_observed: false,
            navigation_observed: false,
            clock_ms: 0,
            next_timer: 0,
            timers: Vec::new(),
            frame_requested: false,
        }
    }

    /// A host with no document at all, as in a non-interactive context.
    pub fn detached() -> Self {
        let mut host = Self::new();
        host.has_document = false;
        host
    }

    /// The document body.
    pub fn body(&self) -> NodeRef {
        NodeRef(self.body)
    }

    /// Append a new element under `parent`.
    pub fn append_child(&mut self, parent: &NodeRef, tag: &str) -> NodeRef {
        let node = self.alloc(tag);
        self.attach(node.0, parent.0);
        node
    }

    /// Append a loaded image with known natural dimensions.
    pub fn add_image(&mut self, parent: &NodeRef, src: &str, width: u32, height: u32) -> NodeRef {
        let node = self.append_child(parent, "img");
        self.nodes[node.0]
            .attrs
            .insert("src".to_string(), src.to_string());
        self.nodes[node.0].image = Some(ImageFacts {
            complete: true,
            natural_width: width,
            natural_height: height,
        });
        node
    }

    /// Append an image that has not finished loading (dimensions unknown).
    pub fn add_loading_image(&mut self, parent: &NodeRef, src: &str) -> NodeRef {
        let node = self.append_child(parent, "img");
        self.nodes[node.0]
            .attrs
            .insert("src".to_string(), src.to_string());
        self.nodes[node.0].image = Some(ImageFacts::default());
        node
    }

    /// Make natural dimensions known before the load completes, as when
    /// image metadata arrives ahead of the full resource.
    pub fn set_image_dimensions(&mut self, image: &NodeRef, width: u32, height: u32) {
        if let Some(facts) = self.nodes[image.0].image.as_mut() {
            facts.natural_width = width;
            facts.natural_height = height;
        }
    }

    /// Complete an image load with final natural dimensions. The embedder
    /// then reports the load event to the runtime if a listener was
    /// registered.
    pub fn finish_image_load(&mut self, image: &NodeRef, width: u32, height: u32) {
        if let Some(facts) = self.nodes[image.0].image.as_mut() {
            facts.complete = true;
            facts.natural_width = width;
            facts.natural_height = height;
        }
    }

    /// Change the location path, as a single-page router would.
    pub fn set_location(&mut self, path: &str) {
        self.location = path.to_string();
    }

    /// Advance the virtual clock and collect the timers that come due, in
    /// firing order. Intervals are rescheduled; one-shots are consumed.
    /// The embedder delivers each returned id to the runtime.
    pub fn advance_clock(&mut self, ms: u64) -> Vec<TimerId> {
        self.clock_ms += ms;
        let now = self.clock_ms;
        let mut due: Vec<Scheduled> = self
            .timers
            .iter()
            .copied()
            .filter(|t| t.due_ms <= now)
            .collect();
        due.sort_by_key(|t| t.due_ms);

        for fired in &due {
            match fired.period_ms {
                Some(period) => {
                    if let Some(entry) = self.timers.iter_mut().find(|t| t.id == fired.id) {
                        entry.due_ms = now + u64::from(period);
                    }
                }
                None => self.timers.retain(|t| t.id != fired.id),
            }
        }
        due.iter().map(|t| t.id).collect()
    }

    /// Consume a pending animation-frame request, if any.
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    /// All connected elements carrying the given class, in document order.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeRef> {
        let mut out = Vec::new();
        self.walk(self.body, &mut |idx, node| {
            if node.classes.iter().any(|c| c == class) {
                out.push(NodeRef(idx));
            }
        });
        out
    }

    /// Whether a listener of the given kind is registered on the node.
    pub fn has_listener(&self, node: &NodeRef, kind: ListenKind) -> bool {
        self.listeners.iter().any(|(n, k)| *n == node.0 && *k == kind)
    }

    /// Total registered element-scoped listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether the document-level Escape listener is registered.
    pub fn escape_listener_active(&self) -> bool {
        self.escape_listener
    }

    /// Whether subtree observation has been requested.
    pub fn is_observing_subtree(&self) -> bool {
        self.subtree_observed
    }

    /// Whether navigation observation has been requested.
    pub fn is_observing_navigation(&self) -> bool {
        self.navigation_observed
    }

    /// Whether page scroll is currently locked.
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    /// The currently focused node, if any.
    pub fn focused(&self) -> Option<NodeRef> {
        self.focused.map(NodeRef)
    }

    /// The node's parent, if attached.
    pub fn parent_of(&self, node: &NodeRef) -> Option<NodeRef> {
        self.nodes[node.0].parent.map(NodeRef)
    }

    /// The node's children, in order.
    pub fn children_of(&self, node: &NodeRef) -> Vec<NodeRef> {
        self.nodes[node.0].children.iter().map(|&i| NodeRef(i)).collect()
    }

    /// The node's tag name.
    pub fn tag_of(&self, node: &NodeRef) -> &str {
        &self.nodes[node.0].tag
    }

    /// Whether the node carries the given class.
    pub fn has_class(&self, node: &NodeRef, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|c| c == class)
    }

    /// An inline style property value, if set.
    pub fn style_of(&self, node: &NodeRef, property: &str) -> Option<&str> {
        self.nodes[node.0].styles.get(property).map(String::as_str)
    }

    /// Whether the node is attached to the document body.
    pub fn is_connected(&self, node: &NodeRef) -> bool {
        let mut current = node.0;
        loop {
            if current == self.body {
                return true;
            }
            match self.nodes[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn alloc(&mut self, tag: &str) -> NodeRef {
        self.nodes.push(NodeData {
            tag: tag.to_string(),
            image: tag
                .eq_ignore_ascii_case("img")
                .then(ImageFacts::default),
            ..NodeData::default()
        });
        NodeRef(self.nodes.len() - 1)
    }

    fn attach(&mut self, child: usize, parent: usize) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    fn detach(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }

    /// Preorder walk over the connected tree.
    fn walk(&self, from: usize, visit: &mut impl FnMut(usize, &NodeData)) {
        visit(from, &self.nodes[from]);
        for &child in &self.nodes[from].children {
            self.walk(child, visit);
        }
    }

    fn matches_chain(&self, node: usize, chain: &[SimpleSelector]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !self.matches_simple(node, last) {
            return false;
        }
        // Each remaining selector must match some strict ancestor, in order.
        let mut remaining = ancestors;
        let mut current = self.nodes[node].parent;
        while let Some((deepest, rest)) = remaining.split_last() {
            let mut found = false;
            while let Some(idx) = current {
                current = self.nodes[idx].parent;
                if self.matches_simple(idx, deepest) {
                    found = true;
                    break;
                }
            }
            if !found {
                return false;
            }
            remaining = rest;
        }
        true
    }

    fn matches_simple(&self, node: usize, sel: &SimpleSelector) -> bool {
        let data = &self.nodes[node];
        if let Some(tag) = &sel.tag {
            if !data.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &sel.id {
            if data.attrs.get("id") != Some(id) {
                return false;
            }
        }
        sel.classes
            .iter()
            .all(|class| data.classes.iter().any(|c| c == class))
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

/// One compound selector: optional tag plus any number of class/id parts
#[derive(Debug, Default, Clone)]
struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

/// Parse a whitespace-separated descendant chain of compound selectors.
/// Panics on syntax outside the supported subset.
fn parse_selector(selector: &str) -> Vec<SimpleSelector> {
    let chain: Vec<SimpleSelector> = selector
        .split_whitespace()
        .map(parse_compound)
        .collect();
    if chain.is_empty() {
        panic!("unsupported selector: {selector:?}");
    }
    chain
}

fn parse_compound(token: &str) -> SimpleSelector {
    let mut sel = SimpleSelector::default();
    let mut rest = token;
    if !rest.starts_with('.') && !rest.starts_with('#') {
        let end = rest
            .find(['.', '#'])
            .unwrap_or(rest.len());
        let (tag, tail) = rest.split_at(end);
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            panic!("unsupported selector token: {token:?}");
        }
        sel.tag = Some(tag.to_string());
        rest = tail;
    }
    while !rest.is_empty() {
        let marker = rest.as_bytes()[0];
        let body = &rest[1..];
        let end = body.find(['.', '#']).unwrap_or(body.len());
        let (name, tail) = body.split_at(end);
        if name.is_empty() {
            panic!("unsupported selector token: {token:?}");
        }
        match marker {
            b'.' => sel.classes.push(name.to_string()),
            b'#' => sel.id = Some(name.to_string()),
            _ => panic!("unsupported selector token: {token:?}"),
        }
        rest = tail;
    }
    sel
}

impl Host for MemoryHost {
    type Node = NodeRef;

    fn has_document(&self) -> bool {
        self.has_document
    }

    fn query_selector_all(&self, selector: &str) -> Vec<NodeRef> {
        let chain = parse_selector(selector);
        let mut out = Vec::new();
        self.walk(self.body, &mut |idx, _| {
            if idx != self.body && self.matches_chain(idx, &chain) {
                out.push(NodeRef(idx));
            }
        });
        out
    }

    fn is_inside_anchor(&self, node: &NodeRef) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(idx) = current {
            if self.nodes[idx].tag.eq_ignore_ascii_case("a") {
                return true;
            }
            current = self.nodes[idx].parent;
        }
        false
    }

    fn node_adds_images(&self, node: &NodeRef) -> bool {
        let mut found = false;
        self.walk(node.0, &mut |_, data| {
            if data.tag.eq_ignore_ascii_case("img") {
                found = true;
            }
        });
        found
    }

    fn image_info(&self, node: &NodeRef) -> Option<ImageInfo> {
        let data = &self.nodes[node.0];
        let facts = data.image?;
        Some(ImageInfo {
            complete: facts.complete,
            natural_width: facts.natural_width,
            natural_height: facts.natural_height,
            src: data.attrs.get("src").cloned().unwrap_or_default(),
            srcset: data.attrs.get("srcset").cloned(),
            alt: data.attrs.get("alt").cloned(),
            zoom_src: data.attrs.get(crate::wrapper::ZOOM_SRC_ATTR).cloned(),
        })
    }

    fn attribute(&self, node: &NodeRef, name: &str) -> Option<String> {
        self.nodes[node.0].attrs.get(name).cloned()
    }

    fn location_path(&self) -> String {
        self.location.clone()
    }

    fn create_element(&mut self, tag: &str) -> NodeRef {
        self.alloc(tag)
    }

    fn set_attribute(&mut self, node: &NodeRef, name: &str, value: &str) {
        self.nodes[node.0]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&mut self, node: &NodeRef, name: &str) {
        self.nodes[node.0].attrs.remove(name);
    }

    fn add_class(&mut self, node: &NodeRef, class: &str) {
        let classes = &mut self.nodes[node.0].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, node: &NodeRef, class: &str) {
        self.nodes[node.0].classes.retain(|c| c != class);
    }

    fn set_style(&mut self, node: &NodeRef, property: &str, value: &str) {
        self.nodes[node.0]
            .styles
            .insert(property.to_string(), value.to_string());
    }

    fn wrap_element(&mut self, target: &NodeRef, wrapper: &NodeRef) -> bool {
        let Some(parent) = self.nodes[target.0].parent else {
            return false;
        };
        let position = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == target.0)
            .unwrap_or(0);
        self.detach(target.0);
        self.nodes[wrapper.0].parent = Some(parent);
        self.nodes[parent].children.insert(position, wrapper.0);
        self.attach(target.0, wrapper.0);
        true
    }

    fn unwrap_element(&mut self, wrapper: &NodeRef, target: &NodeRef) -> bool {
        if self.nodes[target.0].parent != Some(wrapper.0) {
            return false;
        }
        let Some(parent) = self.nodes[wrapper.0].parent else {
            return false;
        };
        let position = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == wrapper.0)
            .unwrap_or(0);
        self.detach(target.0);
        self.detach(wrapper.0);
        self.nodes[target.0].parent = Some(parent);
        self.nodes[parent].children.insert(position, target.0);
        true
    }

    fn append_to_body(&mut self, node: &NodeRef) {
        self.detach(node.0);
        self.attach(node.0, self.body);
    }

    fn remove_element(&mut self, node: &NodeRef) {
        self.detach(node.0);
        if self.focused == Some(node.0) {
            self.focused = None;
        }
    }

    fn focus(&mut self, node: &NodeRef) {
        self.focused = Some(node.0);
    }

    fn lock_scroll(&mut self, locked: bool) {
        self.scroll_locked = locked;
    }

    fn listen(&mut self, node: &NodeRef, kind: ListenKind) {
        if !self.has_listener(node, kind) {
            self.listeners.push((node.0, kind));
        }
    }

    fn unlisten(&mut self, node: &NodeRef, kind: ListenKind) {
        self.listeners.retain(|(n, k)| !(*n == node.0 && *k == kind));
    }

    fn set_escape_listener(&mut self, active: bool) {
        self.escape_listener = active;
    }

    fn observe_subtree(&mut self, active: bool) {
        // No native observer; the embedder reports added nodes itself.
        self.subtree_observed = active;
        debug!("subtree observation {}", if active { "on" } else { "off" });
    }

    fn observe_navigation(&mut self, active: bool) {
        // No native navigation events; the fallback poll covers detection.
        self.navigation_observed = active;
    }

    fn request_frame(&mut self) {
        self.frame_requested = true;
    }

    fn set_timeout(&mut self, delay_ms: u32) -> TimerId {
        let id = self.alloc_timer();
        self.timers.push(Scheduled {
            id,
            due_ms: self.clock_ms + u64::from(delay_ms),
            period_ms: None,
        });
        id
    }

    fn set_interval(&mut self, period_ms: u32) -> TimerId {
        let id = self.alloc_timer();
        self.timers.push(Scheduled {
            id,
            due_ms: self.clock_ms + u64::from(period_ms),
            period_ms: Some(period_ms),
        });
        id
    }

    fn clear_timer(&mut self, id: TimerId) {
        self.timers.retain(|t| t.id != id);
    }
}

impl MemoryHost {
    fn alloc_timer(&mut self) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markdown_page() -> (MemoryHost, NodeRef) {
        let mut host = MemoryHost::new();
        let body = host.body();
        let content = host.append_child(&body, "div");
        host.add_class(&content, "markdown");
        (host, content)
    }

    // Descendant selector matches only images under the scoped container.
    #[test]
    fn selector_scoping() {
        let (mut host, content) = markdown_page();
        let inside = host.add_image(&content, "in.png", 200, 200);
        let body = host.body();
        let _outside = host.add_image(&body, "out.png", 200, 200);

        let hits = host.query_selector_all(".markdown img");
        assert_eq!(hits, vec![inside]);
    }

    // Compound selectors combine tag, class, and id parts.
    #[test]
    fn compound_selector() {
        let mut host = MemoryHost::new();
        let body = host.body();
        let hero = host.add_image(&body, "hero.png", 200, 200);
        host.add_class(&hero, "hero");
        host.set_attribute(&hero, "id", "banner");
        let _plain = host.add_image(&body, "plain.png", 200, 200);

        assert_eq!(host.query_selector_all("img.hero"), vec![hero]);
        assert_eq!(host.query_selector_all("img#banner.hero"), vec![hero]);
        assert_eq!(host.query_selector_all("img").len(), 2);
    }

    // Unsupported selector syntax fails loudly, like a browser query throw.
    #[test]
    #[should_panic(expected = "unsupported selector")]
    fn invalid_selector_panics() {
        let host = MemoryHost::new();
        host.query_selector_all("div > img");
    }

    // Wrap inserts at the target's position; unwrap restores it.
    #[test]
    fn wrap_unwrap_round_trip() {
        let mut host = MemoryHost::new();
        let body = host.body();
        let first = host.append_child(&body, "p");
        let img = host.add_image(&body, "a.png", 200, 200);
        let last = host.append_child(&body, "p");

        let wrapper = host.create_element("div");
        assert!(host.wrap_element(&img, &wrapper));
        assert_eq!(host.children_of(&body), vec![first, wrapper, last]);
        assert_eq!(host.parent_of(&img), Some(wrapper));

        assert!(host.unwrap_element(&wrapper, &img));
        assert_eq!(host.children_of(&body), vec![first, img, last]);
        assert!(!host.is_connected(&wrapper));
    }

    // Wrapping a detached node reports failure without touching the tree.
    #[test]
    fn wrap_detached_fails() {
        let mut host = MemoryHost::new();
        let body = host.body();
        let img = host.add_image(&body, "a.png", 200, 200);
        host.remove_element(&img);

        let wrapper = host.create_element("div");
        assert!(!host.wrap_element(&img, &wrapper));
        assert!(!host.is_connected(&wrapper));
    }

    // One-shot timers fire once; intervals keep rescheduling.
    #[test]
    fn virtual_clock() {
        let mut host = MemoryHost::new();
        let once = host.set_timeout(300);
        let repeating = host.set_interval(1000);

        assert_eq!(host.advance_clock(299), vec![]);
        assert_eq!(host.advance_clock(1), vec![once]);
        assert_eq!(host.advance_clock(700), vec![repeating]);
        assert_eq!(host.advance_clock(1000), vec![repeating]);

        host.clear_timer(repeating);
        assert_eq!(host.advance_clock(5000), vec![]);
    }
}
