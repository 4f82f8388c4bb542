use crate::mirror::record::NodeData;

/// Build the selector of a node from its data and its parent's selector
///
/// An `id` anchors the selector on its own; otherwise the tag (plus its first
/// class) is appended to the parent's selector.
pub fn selector(parent: Option<&str>, data: &NodeData) -> String {
    if let Some(id) = data.attributes.get("id").filter(|id| !id.is_empty()) {
        return format!("#{}", id);
    }

    let step = match data
        .attributes
        .get("class")
        .and_then(|class| class.split_whitespace().next())
    {
        Some(class) => format!("{}.{}", data.tag, class),
        None => data.tag.clone(),
    };

    match parent {
        Some(parent) if !parent.is_empty() => format!("{}>{}", parent, step),
        _ => step,
    }
}

/// Short, stable base-36 hash of a selector
pub fn hash(input: &str) -> String {
    let units: Vec<u16> = input.encode_utf16().collect();
    let mut one: i32 = 5381;
    let mut two: i32 = 5381;
    for pair in units.chunks(2) {
        one = (one << 5).wrapping_add(one) ^ i32::from(pair[0]);
        if let Some(&unit) = pair.get(1) {
            two = (two << 5).wrapping_add(two) ^ i32::from(unit);
        }
    }
    let combined = (i64::from(one) + i64::from(two) * 11579).unsigned_abs();
    to_base36(combined)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
