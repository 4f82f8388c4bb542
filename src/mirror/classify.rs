//! Node classification
//!
//! Turns one host node into the data to mirror for it, the node to traverse
//! next (a frame document or shadow root) and the side effects the mirror has
//! to apply. Classification only reads the host tree.

use crate::config::MirrorConfig;
use crate::error::Result;
use crate::host::{DoctypeData, ElementData, HostTree, Namespace, NodeKind, NodeRef, ReadyState};
use crate::mirror::observe::{ObservationManager, RootKind};
use crate::mirror::record::{
    BASE_ATTRIBUTE, DOCUMENT_TAG, IFRAME_PREFIX, NodeData, POLYFILL_SHADOW_DOM_TAG,
    SAME_ORIGIN_ATTRIBUTE, SHADOW_DOM_TAG, SVG_PREFIX, Source, TEXT_TAG,
};
use crate::mirror::registry::Registry;
use crate::mirror::style;
use crate::mirror::writer::NodeStore;
use crate::sink::{Diagnostic, Dimension, LogCode, Severity};
use indexmap::IndexMap;
use std::collections::HashMap;
use url::Url;

/// Attributes never copied into a record
const IGNORED_ATTRIBUTES: &[&str] = &[
    "title",
    "alt",
    "onload",
    "onfocus",
    "onerror",
    "data-drupal-form-submit-last",
    "aria-label",
];

const LINKED_DATA_TYPE: &str = "application/ld+json";

/// Element kinds with their own mirroring rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Html,
    Script,
    Noscript,
    Meta,
    Head,
    Base,
    Style,
    Iframe,
    Link,
    /// VIDEO, AUDIO and SOURCE
    Media,
    Other,
}

impl ElementKind {
    pub fn of(element: &ElementData) -> Self {
        if element.namespace == Namespace::Svg {
            return Self::Other;
        }
        match element.tag.as_str() {
            "HTML" => Self::Html,
            "SCRIPT" => Self::Script,
            "NOSCRIPT" => Self::Noscript,
            "META" => Self::Meta,
            "HEAD" => Self::Head,
            "BASE" => Self::Base,
            "STYLE" => Self::Style,
            "IFRAME" => Self::Iframe,
            "LINK" => Self::Link,
            "VIDEO" | "AUDIO" | "SOURCE" => Self::Media,
            _ => Self::Other,
        }
    }
}

/// Side effect requested by a classification
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Collect the regions of the top document
    ParseRegions(NodeRef),
    /// Re-check the adopted stylesheets of a document or shadow root
    CheckStyles(NodeRef),
    /// Start watching a root
    Observe(NodeRef, RootKind),
    /// Map a frame element to its content document
    RegisterFrame { frame: NodeRef, document: NodeRef },
    /// Bind a load listener on a frame element
    Monitor(NodeRef),
    /// Release everything held for a frame element
    Teardown(NodeRef),
    Dimension(Dimension, String),
    Schema(serde_json::Value),
    /// Replace the base location carried by a HEAD record
    SetBase { head: NodeRef, base: String },
    /// Re-process a STYLE element whose text changed
    Restyle(NodeRef),
    Log(Diagnostic),
}

/// Data to commit for a node
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub parent: Option<NodeRef>,
    pub data: NodeData,
}

/// Outcome of classifying one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub write: Option<Write>,
    /// Node whose subtree must be traversed next
    pub follow: Option<NodeRef>,
    pub effects: Vec<Effect>,
}

impl Classification {
    fn write(parent: Option<NodeRef>, data: NodeData) -> Self {
        Self {
            write: Some(Write { parent, data }),
            ..Self::default()
        }
    }

    /// A write with an empty tag, which the writer drops
    fn skip() -> Self {
        Self::write(None, NodeData::new(""))
    }

    fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Mirror state a classification reads
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub tree: &'a HostTree,
    pub config: &'a MirrorConfig,
    pub registry: &'a Registry,
    pub store: &'a NodeStore,
    pub observer: &'a ObservationManager,
    /// Base locations patched in by BASE elements, by HEAD element
    pub bases: &'a HashMap<NodeRef, String>,
    pub regions_parsed: bool,
}

impl Context<'_> {
    fn is_mirrored(&self, node: NodeRef) -> bool {
        self.store.mirrored(self.registry, node).is_some()
    }

    /// Parent element, else parent node; a frame document stands in for its frame
    fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        let parent = self
            .tree
            .parent_element(node)
            .or_else(|| self.tree.parent_node(node))?;
        Some(self.observer.frame_element(parent).unwrap_or(parent))
    }

    fn in_frame(&self, node: NodeRef) -> bool {
        !self.tree.in_top_document(node)
    }

    fn document_url(&self, node: NodeRef) -> Option<&str> {
        let doc = self.tree.owner_document(node)?;
        self.tree.document_data(doc).map(|d| d.url.as_str())
    }
}

/// Classify `node` for mirroring
pub fn classify(ctx: &Context<'_>, node: NodeRef, source: Source) -> Result<Classification> {
    let Some(kind) = ctx.tree.kind(node) else {
        return Ok(Classification::default());
    };
    match kind {
        NodeKind::Doctype(doctype) => {
            let attributes = doctype_attributes(doctype);
            let tag = if ctx.in_frame(node) {
                format!("{}{}", IFRAME_PREFIX, DOCUMENT_TAG)
            } else {
                DOCUMENT_TAG.to_string()
            };
            Ok(Classification::write(
                ctx.parent(node),
                NodeData::new(tag).with_attributes(attributes),
            ))
        }
        NodeKind::Document(_) => Ok(document(ctx, node)),
        NodeKind::Fragment(fragment) => {
            let Some(host) = fragment.host else {
                return Ok(Classification::default());
            };
            let classification = if fragment.is_native() {
                let mut attributes = IndexMap::new();
                attributes.insert("style".to_string(), String::new());
                Classification::write(
                    Some(host),
                    NodeData::new(SHADOW_DOM_TAG).with_attributes(attributes),
                )
                .effect(Effect::Observe(node, RootKind::ShadowRoot))
            } else {
                Classification::write(Some(host), NodeData::new(POLYFILL_SHADOW_DOM_TAG))
            };
            Ok(classification.effect(Effect::CheckStyles(node)))
        }
        NodeKind::Text(data) => Ok(text(ctx, node, data)),
        NodeKind::Element(element) => element_node(ctx, node, element, source),
    }
}

/// Doctype attributes; a missing name reads as "html"
pub(crate) fn doctype_attributes(doctype: &DoctypeData) -> IndexMap<String, String> {
    let mut attributes = IndexMap::new();
    let name = doctype.name.clone().unwrap_or_else(|| "html".to_string());
    attributes.insert("name".to_string(), name);
    attributes.insert("publicId".to_string(), doctype.public_id.clone());
    attributes.insert("systemId".to_string(), doctype.system_id.clone());
    attributes
}

fn document(ctx: &Context<'_>, node: NodeRef) -> Classification {
    let top = node == ctx.tree.document();
    let mut classification = Classification::default();
    if top && !ctx.regions_parsed {
        classification.effects.push(Effect::ParseRegions(node));
    }
    let kind = if top {
        RootKind::Document
    } else {
        RootKind::FrameDocument
    };
    classification
        .effect(Effect::CheckStyles(node))
        .effect(Effect::Observe(node, kind))
}

fn text(ctx: &Context<'_>, node: NodeRef, data: &str) -> Classification {
    let parent = ctx
        .tree
        .parent_element(node)
        .or_else(|| ctx.tree.parent_node(node));
    let parent_tag = parent.and_then(|p| ctx.tree.tag(p));

    if let (Some(style), Some("STYLE")) = (parent, parent_tag) {
        return Classification::default().effect(Effect::Restyle(style));
    }

    let opaque = matches!(parent_tag, Some("NOSCRIPT" | "SCRIPT"));
    let parent_mirrored = parent.is_some_and(|p| ctx.is_mirrored(p));
    let data = NodeData::new(TEXT_TAG).with_value(data);
    if parent_mirrored && !opaque {
        Classification::write(parent, data)
    } else if ctx.is_mirrored(node) {
        // removed, or moved somewhere text is not recorded
        Classification::write(None, data)
    } else {
        Classification::default()
    }
}

fn element_node(
    ctx: &Context<'_>,
    node: NodeRef,
    element: &ElementData,
    source: Source,
) -> Result<Classification> {
    let parent = ctx.parent(node);
    let removed = source == Source::ChildListRemove;

    if element.namespace == Namespace::Svg {
        let data = NodeData::new(format!("{}{}", SVG_PREFIX, element.tag))
            .with_attributes(attributes(element));
        return Ok(Classification::write(parent, data));
    }

    let data = NodeData::new(element.tag.clone()).with_attributes(attributes(element));
    let classification = match ElementKind::of(element) {
        ElementKind::Html => {
            let tag = if ctx.in_frame(node) {
                format!("{}{}", IFRAME_PREFIX, element.tag)
            } else {
                element.tag.clone()
            };
            Classification::write(parent, NodeData { tag, ..data })
        }
        ElementKind::Script => {
            let mut classification = Classification::skip();
            if !removed && element.attributes.get("type").map(String::as_str) == Some(LINKED_DATA_TYPE) {
                let text = ctx.tree.text_content(node).replace(['\r', '\n'], "");
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                    classification.effects.push(Effect::Schema(value));
                }
            }
            classification
        }
        ElementKind::Noscript => Classification::write(parent, NodeData::new("NOSCRIPT").with_value("")),
        ElementKind::Meta => {
            let mut classification = Classification::skip();
            if !removed {
                classification.effects.extend(meta(element));
            }
            classification
        }
        ElementKind::Head => {
            let mut data = data;
            let mut classification = Classification::default();
            match ctx.bases.get(&node) {
                Some(base) => {
                    data.attributes.insert(BASE_ATTRIBUTE.to_string(), base.clone());
                }
                None => match ctx.document_url(node).map(base_location) {
                    Some(Ok(base)) => {
                        data.attributes.insert(BASE_ATTRIBUTE.to_string(), base);
                    }
                    Some(Err(e)) => classification.effects.push(invalid_url(e)),
                    None => {}
                },
            }
            classification.write = Some(Write { parent, data });
            classification
        }
        ElementKind::Base => {
            let mut classification = Classification::skip();
            if removed {
                return Ok(classification);
            }
            let href = element.attributes.get("href");
            let head = head_of(ctx.tree, node);
            if let (Some(href), Some(head), Some(url)) = (href, head, ctx.document_url(node)) {
                match Url::parse(url).and_then(|u| u.join(href)) {
                    Ok(resolved) => classification.effects.push(Effect::SetBase {
                        head,
                        base: format_base(&resolved),
                    }),
                    Err(e) => classification.effects.push(invalid_url(e)),
                }
            }
            classification
        }
        ElementKind::Style => {
            let extracted = style::style_value(ctx.tree, node)?;
            let mut classification = Classification::write(parent, data.with_value(extracted.css));
            classification.effects.extend(extracted.warning.map(Effect::Log));
            classification
        }
        ElementKind::Iframe => iframe(ctx, node, element, parent, data, removed),
        ElementKind::Link => {
            let stylesheet = element
                .attributes
                .get("rel")
                .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"));
            let local = ctx
                .document_url(node)
                .and_then(|u| Url::parse(u).ok())
                .is_some_and(|u| u.scheme() == "file");
            if stylesheet && local && ctx.config.inline_local_stylesheets {
                let extracted = style::css_rules(element.sheet.as_ref())?;
                let data = NodeData {
                    tag: "STYLE".to_string(),
                    ..data
                };
                let mut classification = Classification::write(parent, data.with_value(extracted.css));
                classification.effects.extend(extracted.warning.map(Effect::Log));
                classification
            } else {
                Classification::write(parent, data)
            }
        }
        ElementKind::Media => {
            let mut data = data;
            if let Some(src) = data.attributes.get_mut("src") {
                if src.starts_with("data:") {
                    src.clear();
                }
            }
            Classification::write(parent, data)
        }
        ElementKind::Other => {
            let mut classification = Classification::write(parent, data);
            classification.follow = element.shadow_root;
            classification
        }
    };
    Ok(classification)
}

fn iframe(
    ctx: &Context<'_>,
    node: NodeRef,
    element: &ElementData,
    parent: Option<NodeRef>,
    mut data: NodeData,
    removed: bool,
) -> Classification {
    if removed {
        return Classification::write(parent, data).effect(Effect::Teardown(node));
    }
    let document = element.content_document.filter(|_| !element.cross_origin);
    let Some(document) = document else {
        return Classification::write(parent, data);
    };

    data.attributes
        .insert(SAME_ORIGIN_ATTRIBUTE.to_string(), "true".to_string());
    let mut classification = Classification::write(parent, data).effect(Effect::RegisterFrame {
        frame: node,
        document,
    });
    if !ctx.is_mirrored(node) {
        classification.effects.push(Effect::Monitor(node));
    }
    let loading = ctx
        .tree
        .document_data(document)
        .is_none_or(|d| d.ready_state == ReadyState::Loading);
    if !loading {
        classification.follow = Some(document);
    }
    classification
}

/// Attributes worth mirroring, in read order
pub fn attributes(element: &ElementData) -> IndexMap<String, String> {
    let mut out: IndexMap<String, String> = element
        .attributes
        .iter()
        .filter(|(name, _)| !IGNORED_ATTRIBUTES.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    if element.tag == "INPUT" && !out.contains_key("value") {
        if let Some(value) = element.value.as_ref().filter(|v| !v.is_empty()) {
            out.insert("value".to_string(), value.clone());
        }
    }
    out
}

fn meta(element: &ElementData) -> Option<Effect> {
    let key = element
        .attributes
        .get("property")
        .or_else(|| element.attributes.get("name"))?;
    let content = element.attributes.get("content")?;
    let dimension = match key.as_str() {
        "og:title" => Dimension::MetaTitle,
        "og:type" => Dimension::MetaType,
        "generator" => Dimension::Generator,
        _ => return None,
    };
    Some(Effect::Dimension(dimension, content.clone()))
}

/// HEAD element a BASE element applies to
fn head_of(tree: &HostTree, base: NodeRef) -> Option<NodeRef> {
    if let Some(parent) = tree.parent_element(base).filter(|&p| tree.tag(p) == Some("HEAD")) {
        return Some(parent);
    }
    let doc = tree.owner_document(base)?;
    tree.descendants(doc)
        .into_iter()
        .find(|&n| tree.tag(n) == Some("HEAD") && tree.element(n).is_some_and(|e| e.namespace == Namespace::Html))
}

/// Scheme, host and path of a document location
pub fn base_location(url: &str) -> std::result::Result<String, url::ParseError> {
    Url::parse(url).map(|u| format_base(&u))
}

fn format_base(url: &Url) -> String {
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    };
    format!("{}://{}{}", url.scheme(), host, url.path())
}

fn invalid_url(error: url::ParseError) -> Effect {
    log::warn!("unresolvable document location: {}", error);
    Effect::Log(Diagnostic::new(
        LogCode::InvalidUrl,
        Severity::Warning,
        Some(error.to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StyleSheet;
    use crate::mirror::writer::Scope;

    struct Fixture {
        tree: HostTree,
        config: MirrorConfig,
        registry: Registry,
        store: NodeStore,
        observer: ObservationManager,
        bases: HashMap<NodeRef, String>,
    }

    impl Fixture {
        fn new(url: &str) -> Self {
            let tree = HostTree::new(url);
            let mut registry = Registry::new();
            registry.reset(tree.document());
            Self {
                tree,
                config: MirrorConfig::default(),
                registry,
                store: NodeStore::new(),
                observer: ObservationManager::new(),
                bases: HashMap::new(),
            }
        }

        fn classify(&self, node: NodeRef, source: Source) -> Classification {
            let ctx = Context {
                tree: &self.tree,
                config: &self.config,
                registry: &self.registry,
                store: &self.store,
                observer: &self.observer,
                bases: &self.bases,
                regions_parsed: false,
            };
            classify(&ctx, node, source).unwrap()
        }

        fn element(&mut self, tag: &str, attributes: &[(&str, &str)]) -> NodeRef {
            let doc = self.tree.document();
            let node = self.tree.create_element(tag);
            self.tree.append_child(doc, node).unwrap();
            for (name, value) in attributes {
                self.tree.set_attribute(node, name, value).unwrap();
            }
            node
        }
    }

    fn written(classification: &Classification) -> &NodeData {
        &classification.write.as_ref().unwrap().data
    }

    #[test]
    fn test_element_kind_dispatch() {
        let mut tree = HostTree::new("https://example.com/");
        let doc = tree.document();
        let video = tree.create_element("video");
        let svg = tree.create_svg_element_in(doc, "style").unwrap();
        assert_eq!(ElementKind::of(tree.element(video).unwrap()), ElementKind::Media);
        assert_eq!(ElementKind::of(tree.element(svg).unwrap()), ElementKind::Other);
    }

    #[test]
    fn test_ignored_attributes_and_input_value() {
        let mut fx = Fixture::new("https://example.com/");
        let input = fx.element("input", &[("title", "t"), ("name", "q"), ("aria-label", "search")]);
        fx.tree.set_value(input, "typed").unwrap();

        let classification = fx.classify(input, Source::Discover);
        let data = written(&classification);
        assert_eq!(data.tag, "INPUT");
        assert_eq!(
            data.attributes.iter().collect::<Vec<_>>(),
            vec![
                (&"name".to_string(), &"q".to_string()),
                (&"value".to_string(), &"typed".to_string())
            ]
        );
    }

    #[test]
    fn test_meta_is_not_mirrored() {
        let mut fx = Fixture::new("https://example.com/");
        let meta = fx.element("meta", &[("property", "og:title"), ("content", "X")]);

        let classification = fx.classify(meta, Source::Discover);
        assert_eq!(written(&classification).tag, "");
        assert_eq!(
            classification.effects,
            vec![Effect::Dimension(Dimension::MetaTitle, "X".to_string())]
        );
    }

    #[test]
    fn test_media_data_src_is_stripped() {
        let mut fx = Fixture::new("https://example.com/");
        let video = fx.element("video", &[("src", "data:video/mp4;base64,AAAA")]);
        let audio = fx.element("audio", &[("src", "https://cdn.test/a.mp3")]);

        assert_eq!(written(&fx.classify(video, Source::Discover)).attributes["src"], "");
        assert_eq!(
            written(&fx.classify(audio, Source::Discover)).attributes["src"],
            "https://cdn.test/a.mp3"
        );
    }

    #[test]
    fn test_script_linked_data() {
        let mut fx = Fixture::new("https://example.com/");
        let script = fx.element("script", &[("type", LINKED_DATA_TYPE)]);
        let body = fx.tree.create_text("{\"@type\":\n\"Product\"}");
        fx.tree.append_child(script, body).unwrap();
        let broken = fx.element("script", &[("type", LINKED_DATA_TYPE)]);
        let junk = fx.tree.create_text("{not json");
        fx.tree.append_child(broken, junk).unwrap();

        let classification = fx.classify(script, Source::Discover);
        assert_eq!(written(&classification).tag, "");
        assert_eq!(
            classification.effects,
            vec![Effect::Schema(serde_json::json!({"@type": "Product"}))]
        );
        assert!(fx.classify(broken, Source::Discover).effects.is_empty());
    }

    #[test]
    fn test_noscript_is_an_empty_shell() {
        let mut fx = Fixture::new("https://example.com/");
        let noscript = fx.element("noscript", &[("class", "fallback")]);
        let data = fx.classify(noscript, Source::Discover).write.unwrap().data;
        assert_eq!(data, NodeData::new("NOSCRIPT").with_value(""));
    }

    #[test]
    fn test_head_base_from_location() {
        let mut fx = Fixture::new("https://example.com:8080/shop/cart?item=1#top");
        let head = fx.element("head", &[]);
        let data = fx.classify(head, Source::Discover).write.unwrap().data;
        assert_eq!(data.attributes[BASE_ATTRIBUTE], "https://example.com:8080/shop/cart");
    }

    #[test]
    fn test_base_patches_head() {
        let mut fx = Fixture::new("https://example.com/a/b");
        let head = fx.element("head", &[]);
        let base = fx.tree.create_element("base");
        fx.tree.append_child(head, base).unwrap();
        fx.tree.set_attribute(base, "href", "/static/").unwrap();

        let classification = fx.classify(base, Source::Discover);
        assert_eq!(written(&classification).tag, "");
        assert_eq!(
            classification.effects,
            vec![Effect::SetBase {
                head,
                base: "https://example.com/static/".to_string()
            }]
        );
    }

    #[test]
    fn test_style_value_and_text_routing() {
        let mut fx = Fixture::new("https://example.com/");
        let style = fx.element("style", &[("id", "theme")]);
        let text = fx.tree.create_text(".stale{}");
        fx.tree.append_child(style, text).unwrap();
        fx.tree.set_sheet(style, StyleSheet::new([".live{}"])).unwrap();

        assert_eq!(
            written(&fx.classify(style, Source::Discover)).value.as_deref(),
            Some(".live{}")
        );
        let routed = fx.classify(text, Source::CharacterData);
        assert!(routed.write.is_none());
        assert_eq!(routed.effects, vec![Effect::Restyle(style)]);
    }

    #[test]
    fn test_text_requires_mirrored_parent() {
        let mut fx = Fixture::new("https://example.com/");
        let div = fx.element("div", &[]);
        let text = fx.tree.create_text("hello");
        fx.tree.append_child(div, text).unwrap();

        assert_eq!(fx.classify(text, Source::Discover), Classification::default());
    }

    #[test]
    fn test_mirrored_text_moved_under_noscript_is_released() {
        let mut fx = Fixture::new("https://example.com/");
        let doc = fx.tree.document();
        let div = fx.element("div", &[]);
        let noscript = fx.element("noscript", &[]);
        let text = fx.tree.create_text("hello");
        fx.tree.append_child(div, text).unwrap();
        let regions = HashMap::new();
        let scope = Scope {
            tree: &fx.tree,
            config: &fx.config,
            regions: &regions,
        };
        for (node, parent, data) in [
            (div, doc, NodeData::new("DIV")),
            (noscript, doc, NodeData::new("NOSCRIPT")),
            (text, div, NodeData::new(TEXT_TAG).with_value("hello")),
        ] {
            fx.store
                .write(&mut fx.registry, &scope, node, Some(parent), data, Source::Discover);
        }

        let edited = fx.classify(text, Source::CharacterData);
        assert_eq!(edited.write.as_ref().unwrap().parent, Some(div));

        fx.tree.remove(text).unwrap();
        fx.tree.append_child(noscript, text).unwrap();
        let moved = fx.classify(text, Source::ChildListAdd);
        let write = moved.write.unwrap();
        assert_eq!(write.parent, None);
        assert_eq!(write.data.tag, TEXT_TAG);
    }

    #[test]
    fn test_doctype_name_defaults_to_html() {
        let mut fx = Fixture::new("https://example.com/");
        let doc = fx.tree.document();
        let doctype = fx.tree.create_doctype_in(doc, None, "", "").unwrap();
        fx.tree.append_child(doc, doctype).unwrap();

        let data = fx.classify(doctype, Source::Discover).write.unwrap().data;
        assert_eq!(data.tag, DOCUMENT_TAG);
        assert_eq!(data.attributes["name"], "html");
        assert_eq!(data.attributes["publicId"], "");
    }

    #[test]
    fn test_local_stylesheet_link_is_inlined() {
        let mut fx = Fixture::new("file:///home/user/page.html");
        let link = fx.element(
            "link",
            &[("rel", "stylesheet"), ("href", "site.css"), ("media", "print")],
        );
        fx.tree.set_sheet(link, StyleSheet::new(["body{margin:0}"])).unwrap();

        let data = fx.classify(link, Source::Discover).write.unwrap().data;
        assert_eq!(data.tag, "STYLE");
        assert_eq!(data.value.as_deref(), Some("body{margin:0}"));
        assert_eq!(data.attributes["media"], "print");
        assert_eq!(data.attributes["href"], "site.css");

        fx.config.inline_local_stylesheets = false;
        assert_eq!(written(&fx.classify(link, Source::Discover)).tag, "LINK");
    }

    #[test]
    fn test_same_origin_iframe() {
        let mut fx = Fixture::new("https://example.com/");
        let frame = fx.element("iframe", &[("src", "/inner")]);
        let doc = fx
            .tree
            .attach_frame_document(frame, "https://example.com/inner", true)
            .unwrap();

        let loading = fx.classify(frame, Source::Discover);
        assert_eq!(written(&loading).attributes[SAME_ORIGIN_ATTRIBUTE], "true");
        assert_eq!(loading.follow, None);
        assert!(loading.effects.contains(&Effect::Monitor(frame)));

        fx.tree.set_ready_state(doc, ReadyState::Interactive).unwrap();
        assert_eq!(fx.classify(frame, Source::Discover).follow, Some(doc));

        let removed = fx.classify(frame, Source::ChildListRemove);
        assert_eq!(removed.effects, vec![Effect::Teardown(frame)]);
    }

    #[test]
    fn test_cross_origin_iframe_is_plain() {
        let mut fx = Fixture::new("https://example.com/");
        let frame = fx.element("iframe", &[]);
        fx.tree
            .attach_frame_document(frame, "https://other.test/", false)
            .unwrap();

        let classification = fx.classify(frame, Source::Discover);
        assert!(!written(&classification).attributes.contains_key(SAME_ORIGIN_ATTRIBUTE));
        assert!(classification.effects.is_empty());
        assert_eq!(classification.follow, None);
    }

    #[test]
    fn test_shadow_roots() {
        let mut fx = Fixture::new("https://example.com/");
        let host = fx.element("my-widget", &[]);
        let shadow = fx.tree.attach_shadow(host).unwrap();
        let other = fx.element("legacy-widget", &[]);
        let polyfill = fx.tree.attach_polyfill_shadow(other).unwrap();

        assert_eq!(fx.classify(host, Source::Discover).follow, Some(shadow));

        let native = fx.classify(shadow, Source::Discover);
        let write = native.write.as_ref().unwrap();
        assert_eq!(write.parent, Some(host));
        assert_eq!(write.data.tag, SHADOW_DOM_TAG);
        assert_eq!(write.data.attributes["style"], "");
        assert!(native.effects.contains(&Effect::Observe(shadow, RootKind::ShadowRoot)));

        let polyfilled = fx.classify(polyfill, Source::Discover);
        assert_eq!(written(&polyfilled).tag, POLYFILL_SHADOW_DOM_TAG);
        assert_eq!(polyfilled.effects, vec![Effect::CheckStyles(polyfill)]);
    }

    #[test]
    fn test_document_effects() {
        let fx = Fixture::new("https://example.com/");
        let doc = fx.tree.document();
        assert_eq!(
            fx.classify(doc, Source::Discover).effects,
            vec![
                Effect::ParseRegions(doc),
                Effect::CheckStyles(doc),
                Effect::Observe(doc, RootKind::Document)
            ]
        );
    }

    #[test]
    fn test_svg_prefix() {
        let mut fx = Fixture::new("https://example.com/");
        let doc = fx.tree.document();
        let svg = fx.tree.create_svg_element_in(doc, "circle").unwrap();
        fx.tree.append_child(doc, svg).unwrap();
        assert_eq!(written(&fx.classify(svg, Source::Discover)).tag, "svg:circle");
    }
}
