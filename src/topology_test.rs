#![allow(clippy::unwrap_used)] // Tests can use unwrap for brevity
#![allow(clippy::expect_used)] // Tests can use expect for better error messages

use super::*;
use crate::config::Config;

fn spec_with_workers(workers: i32) -> ClusterSpec {
    Config {
        workers,
        ..Config::default()
    }
    .cluster_spec()
    .expect("default config should be valid")
}

#[test]
fn test_render_one_control_plane_then_workers() {
    for workers in [0, 1, 2, 5, 17] {
        let descriptor = render(&spec_with_workers(workers)).expect("render should succeed");

        assert_eq!(descriptor.node_count(), workers as usize + 1);
        assert_eq!(descriptor.control_plane_count(), 1);
        assert_eq!(descriptor.worker_count(), workers as usize);
        assert_eq!(descriptor.nodes[0].role, NodeRole::ControlPlane);
        assert!(descriptor.nodes[1..]
            .iter()
            .all(|n| n.role == NodeRole::Worker));
    }
}

#[test]
fn test_render_rejects_negative_workers() {
    for workers in [-1, -2, i32::MIN] {
        let result = render(&spec_with_workers(workers));
        assert!(
            matches!(result, Err(Error::InvalidSpec(_))),
            "workers={} should be rejected",
            workers
        );
    }
}

#[test]
fn test_render_rejects_empty_image() {
    let mut spec = spec_with_workers(1);
    spec.node_image = "  ".to_string();

    assert!(matches!(render(&spec), Err(Error::InvalidSpec(_))));
}

#[test]
fn test_render_is_deterministic() {
    let spec = spec_with_workers(3);

    let first = render(&spec).unwrap().to_yaml().unwrap();
    let second = render(&spec).unwrap().to_yaml().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_render_pins_node_image_on_every_node() {
    let mut spec = spec_with_workers(2);
    spec.node_image = "kindest/node:v1.30.0".to_string();

    let descriptor = render(&spec).unwrap();

    assert!(descriptor
        .nodes
        .iter()
        .all(|n| n.image == "kindest/node:v1.30.0"));
}

#[test]
fn test_yaml_matches_kind_schema() {
    let descriptor = render(&spec_with_workers(2)).unwrap();

    let yaml = descriptor.to_yaml().unwrap();

    assert!(yaml.contains("kind: Cluster"));
    assert!(yaml.contains("apiVersion: kind.x-k8s.io/v1alpha4"));
    assert!(yaml.contains("apiServerPort: 6443"));
    assert!(yaml.contains("role: control-plane"));
    assert_eq!(yaml.matches("role: worker").count(), 2);

    // Round-trips through the same schema
    let parsed: Descriptor = serde_yaml::from_str(&yaml).expect("Failed to parse descriptor");
    assert_eq!(parsed, descriptor);
}
