//! Integration tests for structural reflection: describe a graph, push the
//! descriptor through JSON, restore it through a registry, and run it.


use dagflow_graph::descriptor::GraphDescriptor;
use dagflow_graph::graph::{Graph, GraphError};
use dagflow_graph::macro_node::{MacroKind, MacroNode};
use dagflow_graph::node::Node;
use dagflow_graph::processor::{Processor, ProcessorState};
use dagflow_system::context::Context;
use dagflow_system::field::{Direction, Field};
use dagflow_system::registry::{NodeRegistry, RegistryError};
use dagflow_system::value::{Value, ValueType};
use test_utils::{Constant, output, test_registry};

fn registry() -> NodeRegistry {
    let mut registry = test_registry();
    registry
        .register_factory("test:two", || Box::new(Constant::int(2)))
        .unwrap()
        .register_factory("test:three", || Box::new(Constant::int(3)))
        .unwrap()
        .register_factory("test:firsts", || Box::new(Constant::ints(&[1, 2, 3])))
        .unwrap()
        .register_factory("test:seconds", || Box::new(Constant::ints(&[10, 20])))
        .unwrap();
    registry
}

fn through_json(descriptor: &GraphDescriptor) -> GraphDescriptor {
    let json = serde_json::to_string(descriptor).expect("serialize");
    serde_json::from_str(&json).expect("deserialize")
}

fn run(graph: &Graph) -> Context {
    let mut processor = Processor::new(graph);
    processor.reset(Context::new());
    assert_eq!(processor.step_all(), ProcessorState::Complete);
    processor.into_context()
}

#[test]
fn plain_graph_round_trips() {
    let registry = registry();
    let mut graph = Graph::new();
    let a = graph.add_node(Node::from_registry(&registry, "test:two").unwrap()).unwrap();
    let b = graph.add_node(Node::from_registry(&registry, "test:three").unwrap()).unwrap();
    let c = graph
        .add_node(
            Node::from_registry(&registry, "test:add")
                .unwrap()
                .with_name("total")
                .with_breakpoint(true),
        )
        .unwrap();
    graph.connect(&a, "value", &c, "a").unwrap();
    graph.connect(&b, "value", &c, "b").unwrap();
    graph
        .add_field(&c, Field::output("note", ValueType::Text))
        .unwrap();

    let descriptor = through_json(&graph.describe());
    assert_eq!(descriptor, graph.describe());

    let restored = Graph::restore(&descriptor, &registry).unwrap();
    assert_eq!(restored.topological_order(), graph.topological_order());
    assert_eq!(restored.link_count(), 2);
    let total = restored.node(&c).unwrap();
    assert_eq!(total.name(), "total");
    assert!(total.has_breakpoint());
    assert_eq!(total.type_uri(), Some("test:add"));
    assert!(total.output("note").is_some());

    let mut processor = Processor::new(&restored);
    processor.reset(Context::new());
    assert!(processor.step_all().is_halted());
    processor.step_all();
    assert_eq!(output(processor.context(), &c, "result"), Some(&Value::Int(5)));
}

#[test]
fn removed_declared_ports_stay_removed() {
    let registry = registry();
    let mut graph = Graph::new();
    let a = graph.add_node(Node::from_registry(&registry, "test:two").unwrap()).unwrap();
    let adder = graph
        .add_node(Node::from_registry(&registry, "test:add_optional").unwrap())
        .unwrap();
    graph.connect(&a, "value", &adder, "a").unwrap();
    graph.remove_field(&adder, Direction::Output, "saw_b").unwrap();

    let keys = |graph: &Graph| -> Vec<String> {
        graph
            .node(&adder)
            .unwrap()
            .outputs()
            .iter()
            .map(|field| field.key().as_str().to_owned())
            .collect()
    };
    assert_eq!(keys(&graph), ["result"]);

    let restored = Graph::restore(&through_json(&graph.describe()), &registry).unwrap();
    assert_eq!(keys(&restored), ["result"]);
    assert_eq!(
        restored.node(&adder).unwrap().ports(),
        graph.node(&adder).unwrap().ports()
    );

    let context = run(&restored);
    assert_eq!(output(&context, &adder, "result"), Some(&Value::Int(2)));
}

#[test]
fn macros_round_trip_with_their_mappings() {
    let registry = registry();
    let mut inner_graph = Graph::new();
    let inner = inner_graph
        .add_node(Node::from_registry(&registry, "test:add_optional").unwrap())
        .unwrap();

    let mut graph = Graph::new();
    let firsts = graph.add_node(Node::from_registry(&registry, "test:firsts").unwrap()).unwrap();
    let seconds = graph.add_node(Node::from_registry(&registry, "test:seconds").unwrap()).unwrap();
    let adder = graph
        .add_operation(MacroNode::iteration("adder").with_graph(inner_graph))
        .unwrap();
    graph.publish(&adder, Direction::Input, "a", &inner, "a").unwrap();
    graph.publish(&adder, Direction::Input, "b", &inner, "b").unwrap();
    graph
        .publish(&adder, Direction::Output, "result", &inner, "result")
        .unwrap();
    graph.connect(&firsts, "value", &adder, "a").unwrap();
    graph.connect(&seconds, "value", &adder, "b").unwrap();

    let descriptor = through_json(&graph.describe());
    let macro_descriptor = descriptor
        .nodes
        .iter()
        .find_map(|node| node.macro_graph.as_ref())
        .unwrap();
    assert_eq!(macro_descriptor.kind, MacroKind::Iteration);
    assert_eq!(macro_descriptor.published.len(), 3);
    assert_eq!(macro_descriptor.graph.nodes.len(), 1);

    let restored = Graph::restore(&descriptor, &registry).unwrap();
    let restored_macro = restored.macro_node(&adder).unwrap();
    assert!(restored_macro.is_iteration());
    assert_eq!(
        restored_macro.published(),
        graph.macro_node(&adder).unwrap().published()
    );
    assert_eq!(
        restored.node(&adder).unwrap().ports(),
        graph.node(&adder).unwrap().ports()
    );

    let context = run(&restored);
    assert_eq!(
        output(&context, &adder, "result"),
        Some(&Value::from(vec![11_i64, 22, 3]))
    );
}

#[test]
fn unknown_type_uri_fails_restore() {
    let registry = registry();
    let mut graph = Graph::new();
    graph
        .add_node(Node::from_registry(&registry, "test:two").unwrap())
        .unwrap();
    let descriptor = graph.describe();

    let err = Graph::restore(&descriptor, &NodeRegistry::new()).unwrap_err();
    assert_eq!(
        err,
        GraphError::Registry(RegistryError::UnknownNodeType("test:two".to_owned()))
    );
}
