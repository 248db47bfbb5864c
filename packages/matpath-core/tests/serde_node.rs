#[cfg(feature = "serde")]
#[test]
fn node_json_keeps_plain_attribute_values() {
    use matpath_core::{attrs, AttrValue, Node, NodeId};

    let mut attributes = attrs([("name", "Boss of company 1")]);
    attributes.insert("rank".into(), AttrValue::Integer(3));
    attributes.insert("score".into(), AttrValue::Float(1.5));
    attributes.insert("retired".into(), AttrValue::Null);
    let node = Node::from_parts(NodeId(7), Some("1.7".into()), attributes);

    let json = serde_json::to_string(&node).expect("serialize Node");
    // Stores keep the attribute map as a plain JSON object; tagged values would break that.
    assert!(
        json.contains(r#""rank":3"#) && json.contains(r#""name":"Boss of company 1""#),
        "expected untagged attribute values, got: {json}"
    );

    let roundtrip: Node = serde_json::from_str(&json).expect("deserialize Node");
    assert_eq!(roundtrip, node);
    assert_eq!(roundtrip.id(), Some(NodeId(7)));
}

#[cfg(feature = "serde")]
#[test]
fn order_by_deserializes_from_request_shape() {
    use matpath_core::{Column, Direction, OrderBy};

    let order: OrderBy =
        serde_json::from_str(r#"{"column":{"Attribute":"name"},"direction":"desc"}"#)
            .expect("deserialize OrderBy");
    assert_eq!(order, OrderBy::attribute("name", Direction::Desc));
    assert_eq!(
        serde_json::to_string(&Column::Path).unwrap(),
        r#""Path""#
    );
}
