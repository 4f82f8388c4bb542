use crate::host::{HostTree, NodeRef};
use crate::mirror::registry::Registry;
use crate::sink::Region;
use std::collections::HashMap;

/// Named regions of a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Regions {
    /// Region name by region root element
    pub names: HashMap<NodeRef, String>,
    /// Regions in document order, as reported to the sink
    pub regions: Vec<Region>,
}

/// Collect every element of `document` carrying `attribute`
///
/// Region roots get their ids here, before they are mirrored.
pub fn parse(tree: &HostTree, registry: &mut Registry, document: NodeRef, attribute: &str) -> Regions {
    let mut out = Regions::default();
    for node in tree.descendants(document) {
        let Some(name) = tree.attribute(node, attribute).filter(|n| !n.is_empty()) else {
            continue;
        };
        out.names.insert(node, name.to_string());
        out.regions.push(Region {
            id: registry.id_for(node),
            name: name.to_string(),
        });
    }
    log::debug!("found {} regions", out.regions.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::record::NodeId;

    #[test]
    fn test_parse_regions_in_order() {
        let mut tree = HostTree::new("https://example.com/");
        let doc = tree.document();
        let header = tree.create_element("header");
        let main = tree.create_element("main");
        let unnamed = tree.create_element("aside");
        for node in [header, main, unnamed] {
            tree.append_child(doc, node).unwrap();
        }
        tree.set_attribute(header, "data-mirror-region", "header").unwrap();
        tree.set_attribute(main, "data-mirror-region", "checkout").unwrap();
        tree.set_attribute(unnamed, "data-mirror-region", "").unwrap();

        let mut registry = Registry::new();
        registry.reset(doc);
        let regions = parse(&tree, &mut registry, doc, "data-mirror-region");

        assert_eq!(
            regions.regions,
            vec![
                Region { id: NodeId(2), name: "header".to_string() },
                Region { id: NodeId(3), name: "checkout".to_string() },
            ]
        );
        assert_eq!(regions.names.get(&main).map(String::as_str), Some("checkout"));
        assert!(!registry.has(unnamed));
    }
}
