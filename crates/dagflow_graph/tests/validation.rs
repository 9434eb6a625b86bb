//! Integration tests for structural checks on graph mutation and for
//! [`Graph::validate`].


use dagflow_graph::dag::InvalidEdge;
use dagflow_graph::graph::{Graph, GraphError, ValidationError};
use dagflow_system::field::{Direction, Field, FieldError};
use dagflow_system::value::ValueType;
use test_utils::{Add, Constant, Counting, Sum, add_scenario, counting_chain};

// ═══════════════════════════════════════════════════════════════════════════════
// LINK CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn closing_a_cycle_is_rejected() {
    let (mut graph, ids, _) = counting_chain(4);
    let (a, d) = (&ids[0], &ids[3]);
    let order_before = graph.topological_order().to_vec();

    let err = graph.connect(d, "value", a, "value").unwrap_err();
    assert_eq!(
        err,
        GraphError::CycleDetected {
            from: d.clone(),
            to: a.clone(),
        }
    );
    assert_eq!(graph.link_count(), 3);
    assert_eq!(graph.topological_order(), order_before.as_slice());
    assert!(!graph.has_path(d, a));
}

#[test]
fn self_loops_and_duplicates_are_invalid() {
    let (mut graph, ids, _) = counting_chain(2);

    let err = graph.connect(&ids[0], "value", &ids[0], "value").unwrap_err();
    assert!(matches!(
        err,
        GraphError::InvalidLink {
            reason: InvalidEdge::SelfLoop,
            ..
        }
    ));

    let mut graph_with_sum = Graph::new();
    let constant = graph_with_sum.add_operation(Constant::int(1)).unwrap();
    let sum = graph_with_sum.add_operation(Sum).unwrap();
    graph_with_sum.connect(&constant, "value", &sum, "values").unwrap();
    let err = graph_with_sum
        .connect(&constant, "value", &sum, "values")
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::InvalidLink {
            reason: InvalidEdge::Duplicate,
            ..
        }
    ));
    assert_eq!(graph.link_count(), 1);
}

#[test]
fn incompatible_types_are_rejected() {
    let mut graph = Graph::new();
    let list = graph.add_operation(Constant::ints(&[1, 2])).unwrap();
    let add = graph.add_operation(Add).unwrap();

    let err = graph.connect(&list, "value", &add, "a").unwrap_err();
    assert!(matches!(
        err,
        GraphError::IncompatibleTypes { ref found, .. }
            if *found == ValueType::list_of(ValueType::Int)
    ));
    assert_eq!(graph.link_count(), 0);
}

#[test]
fn unknown_nodes_and_ports_are_rejected() {
    let scenario = add_scenario(1, 1);
    let mut graph = scenario.graph;

    let err = graph
        .connect(&scenario.a, "missing", &scenario.c, "a")
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Field {
            source: FieldError::NotFound {
                direction: Direction::Output,
                ..
            },
            ..
        }
    ));

    let ghost = dagflow_system::id::NodeId::from_string("ghost");
    assert_eq!(
        graph.connect(&ghost, "value", &scenario.c, "a").unwrap_err(),
        GraphError::NodeNotFound(ghost)
    );
}

#[test]
fn single_inputs_accept_one_link() {
    let scenario = add_scenario(1, 1);
    let mut graph = scenario.graph;
    let extra = graph.add_operation(Constant::int(9)).unwrap();

    let err = graph.connect(&extra, "value", &scenario.c, "a").unwrap_err();
    assert!(matches!(err, GraphError::InputAlreadyLinked { .. }));
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE AND FIELD EDITS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn removing_a_node_drops_its_links() {
    let scenario = add_scenario(1, 1);
    let mut graph = scenario.graph;

    let (node, links) = graph.remove_node(&scenario.a).unwrap();
    assert_eq!(node.id(), &scenario.a);
    assert_eq!(links.len(), 1);
    assert_eq!(graph.link_count(), 1);
    assert_eq!(graph.topological_order(), [scenario.b.clone(), scenario.c.clone()]);
    assert_eq!(
        graph.remove_node(&scenario.a).unwrap_err(),
        GraphError::NodeNotFound(scenario.a)
    );
}

#[test]
fn incoming_links_keep_insertion_order() {
    let scenario = add_scenario(1, 1);
    let incoming = scenario.graph.incoming_links(&scenario.c);
    let sources: Vec<_> = incoming.iter().map(|link| link.source().clone()).collect();
    assert_eq!(sources, [scenario.a.clone(), scenario.b.clone()]);
    assert_eq!(scenario.graph.outgoing_links(&scenario.a).len(), 1);
}

#[test]
fn field_edits_check_keys_and_fixed_ports() {
    let mut graph = Graph::new();
    let node = graph.add_operation(Counting::new()).unwrap();

    let err = graph
        .add_field(&node, Field::output("value", ValueType::Int))
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Field {
            source: FieldError::DuplicateKey { .. },
            ..
        }
    ));

    graph
        .add_field(&node, Field::input("pinned", ValueType::Int).fixed())
        .unwrap();
    let err = graph
        .remove_field(&node, Direction::Input, "pinned")
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Field {
            source: FieldError::IllegalOperation(_),
            ..
        }
    ));
}

#[test]
fn removing_a_field_drops_its_links() {
    let (mut graph, ids, _) = counting_chain(2);
    let (field, links) = graph
        .remove_field(&ids[1], Direction::Input, "value")
        .unwrap();
    assert_eq!(field.key().as_str(), "value");
    assert_eq!(links.len(), 1);
    assert_eq!(graph.link_count(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn fully_linked_graph_validates() {
    assert_eq!(add_scenario(2, 3).graph.validate(), Ok(()));
}

#[test]
fn unbound_required_inputs_are_reported() {
    let mut graph = Graph::new();
    let add = graph.add_operation(Add).unwrap();

    let errors = graph.validate().unwrap_err();
    assert_eq!(
        errors,
        [
            ValidationError::UnboundInput {
                node: add.clone(),
                field: "a".into(),
            },
            ValidationError::UnboundInput {
                node: add,
                field: "b".into(),
            },
        ]
    );
}
